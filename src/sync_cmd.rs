//! `skills sync` and `skills job`.
//!
//! Wires the SQLite store and the GitHub source into the core sync job and
//! prints a summary. The same job runs behind `POST /sync`.

use anyhow::{bail, Result};

use skill_catalog_core::store::CatalogStore;
use skill_catalog_core::sync::{self, SyncSummary};

use crate::config::Config;
use crate::db;
use crate::github::GitHubSource;
use crate::sqlite_store::SqliteStore;

/// Run one sync of the configured repository, optionally overriding the
/// repository and branch.
pub async fn run_sync(
    config: &Config,
    repo: Option<&str>,
    branch: Option<&str>,
) -> Result<SyncSummary> {
    let settings = config.sync_settings(repo, branch);
    if !crate::config::is_valid_repo(&settings.repo) {
        bail!("invalid repo: '{}' is not in 'owner/name' form", settings.repo);
    }

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let source = GitHubSource::new(&config.github)?;

    let result = sync::run_sync(&store, &source, &settings).await;
    pool.close().await;
    let summary = result?;

    println!("sync {}@{}", settings.repo, settings.branch);
    println!("  job: {}", summary.job_id);
    println!("  commit: {}", summary.commit_sha);
    println!("  scanned: {}", summary.scanned);
    println!("  imported: {}", summary.imported);
    println!("  updated: {}", summary.updated);
    println!("  errored: {}", summary.errored);
    println!("  archived: {}", summary.archived);
    for failure in &summary.failures {
        println!("  ! {}: {}", failure.path, failure.message);
    }
    println!("ok");

    Ok(summary)
}

/// Print the status of a sync job.
pub async fn run_job(config: &Config, job_id: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let job = store.get_job(job_id).await;
    pool.close().await;

    let job = match job? {
        Some(j) => j,
        None => bail!("sync job not found: {}", job_id),
    };

    println!("--- Sync job ---");
    println!("id:          {}", job.id);
    println!("repo:        {}", job.repo);
    println!("state:       {}", job.state);
    println!("started_at:  {}", format_ts_iso(job.started_at));
    match job.finished_at {
        Some(ts) => println!("finished_at: {}", format_ts_iso(ts)),
        None => println!("finished_at: -"),
    }
    println!("scanned:     {}", job.scanned);
    println!("imported:    {}", job.imported);
    println!("updated:     {}", job.updated);
    println!("errored:     {}", job.errored);
    if let Some(ref log) = job.log {
        println!("log:         {}", log);
    }

    Ok(())
}

pub(crate) fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}
