//! GitHub catalog synchronization.
//!
//! Reconciles the skill documents of one remote repository branch against
//! the catalog and records the run as a [`SyncJob`].
//!
//! # Algorithm
//!
//! 1. Open a job in `running`.
//! 2. List the branch tree. Failure here fails the job and is returned.
//! 3. For each path: fetch, normalize, fingerprint, then look the record up
//!    by `(repo, path)`:
//!    - missing → create with a fresh slug, `published` (`imported`);
//!    - fingerprint differs → overwrite content, keep slug (`updated`);
//!    - fingerprint equal → no write.
//!
//!    Every path that gets this far is *touched*. Any error in this step is
//!    counted in `errored` and the path stays untouched.
//! 4. Archive every synced record of the repo whose path was not touched.
//! 5. Close the job as `success` with the counters.
//!
//! Runs are not locked against each other; two concurrent runs for the same
//! repository may both decide to create the same path, in which case the
//! loser fails on the unique source identity and counts one error.

use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::models::{
    version_label, JobCompletion, JobState, Skill, SkillStatus, SkillVersion, SourceKind,
    UserRole, UserTier,
};
use crate::normalize::normalize_skill;
use crate::slug::disambiguate;
use crate::source::RemoteSource;
use crate::store::CatalogStore;

/// Random bytes appended to slugs of newly imported skills.
const SYNC_SLUG_SUFFIX_BYTES: usize = 3;

/// What to sync and who owns the imported records.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub repo: String,
    pub branch: String,
    pub author_email: String,
    pub author_name: String,
}

/// Result of reconciling one path that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathOutcome {
    Imported,
    Updated,
    Unchanged,
}

/// A document that could not be synced in this run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathFailure {
    pub path: String,
    pub message: String,
}

/// Counters reported to the caller of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub job_id: String,
    pub commit_sha: String,
    #[serde(rename = "importedCount")]
    pub imported: i64,
    #[serde(rename = "updatedCount")]
    pub updated: i64,
    #[serde(rename = "errorCount")]
    pub errored: i64,
    pub scanned: i64,
    pub archived: u64,
    #[serde(skip)]
    pub failures: Vec<PathFailure>,
}

/// Run one synchronization of `settings.repo` at `settings.branch`.
///
/// Returns the summary when the job finishes in `success`. When the run
/// fails as a whole (tree listing, author provisioning, archival, or the
/// final job write) the job is closed as `failed` with the cause and the
/// error is returned.
pub async fn run_sync(
    store: &dyn CatalogStore,
    source: &dyn RemoteSource,
    settings: &SyncSettings,
) -> Result<SyncSummary> {
    let job = store
        .create_job(&settings.repo, Utc::now().timestamp())
        .await
        .context("failed to open sync job")?;

    tracing::info!(
        job_id = %job.id,
        repo = %settings.repo,
        branch = %settings.branch,
        "sync started"
    );

    match reconcile(store, source, settings, &job.id).await {
        Ok(summary) => {
            tracing::info!(
                job_id = %summary.job_id,
                imported = summary.imported,
                updated = summary.updated,
                errored = summary.errored,
                archived = summary.archived,
                scanned = summary.scanned,
                "sync finished"
            );
            Ok(summary)
        }
        Err(e) => {
            let cause = format!("{:#}", e);
            tracing::error!(job_id = %job.id, error = %cause, "sync failed");
            let completion = JobCompletion::failed(Utc::now().timestamp(), cause);
            if let Err(finish_err) = store.finish_job(&job.id, &completion).await {
                tracing::error!(
                    job_id = %job.id,
                    error = %finish_err,
                    "could not record sync failure"
                );
            }
            Err(e)
        }
    }
}

async fn reconcile(
    store: &dyn CatalogStore,
    source: &dyn RemoteSource,
    settings: &SyncSettings,
    job_id: &str,
) -> Result<SyncSummary> {
    let repo = settings.repo.as_str();
    let branch = settings.branch.as_str();

    let tree = source
        .list_skill_paths(repo, branch)
        .await
        .with_context(|| format!("failed to list skills in {}@{}", repo, branch))?;

    let author = store
        .get_or_create_user(
            &settings.author_email,
            &settings.author_name,
            UserRole::Admin,
            UserTier::Enterprise,
        )
        .await
        .context("failed to resolve sync author")?;

    let mut summary = SyncSummary {
        job_id: job_id.to_string(),
        commit_sha: tree.commit_sha.clone(),
        imported: 0,
        updated: 0,
        errored: 0,
        scanned: tree.paths.len() as i64,
        archived: 0,
        failures: Vec::new(),
    };
    let mut touched: HashSet<String> = HashSet::new();

    for path in &tree.paths {
        let ctx = PathContext {
            store,
            source,
            settings,
            commit_sha: &tree.commit_sha,
            author_id: &author.id,
        };
        match sync_path(&ctx, path).await {
            Ok(outcome) => {
                match outcome {
                    PathOutcome::Imported => summary.imported += 1,
                    PathOutcome::Updated => summary.updated += 1,
                    PathOutcome::Unchanged => {}
                }
                touched.insert(path.clone());
            }
            Err(e) => {
                let message = format!("{:#}", e);
                tracing::warn!(path = %path, error = %message, "skill sync failed");
                summary.errored += 1;
                summary.failures.push(PathFailure {
                    path: path.clone(),
                    message,
                });
            }
        }
    }

    summary.archived = store
        .archive_missing(repo, &touched, Utc::now().timestamp())
        .await
        .context("failed to archive removed skills")?;

    store
        .finish_job(
            job_id,
            &JobCompletion {
                state: JobState::Success,
                finished_at: Utc::now().timestamp(),
                imported: summary.imported,
                updated: summary.updated,
                errored: summary.errored,
                scanned: summary.scanned,
                log: None,
            },
        )
        .await
        .context("failed to close sync job")?;

    Ok(summary)
}

struct PathContext<'a> {
    store: &'a dyn CatalogStore,
    source: &'a dyn RemoteSource,
    settings: &'a SyncSettings,
    commit_sha: &'a str,
    author_id: &'a str,
}

async fn sync_path(ctx: &PathContext<'_>, path: &str) -> Result<PathOutcome> {
    let repo = ctx.settings.repo.as_str();
    let branch = ctx.settings.branch.as_str();

    let raw = ctx
        .source
        .fetch_document(repo, branch, path)
        .await
        .with_context(|| format!("failed to fetch {}", path))?;
    let doc = normalize_skill(repo, path, &raw, ctx.commit_sha);
    let content_hash = doc.fingerprint();
    let now = Utc::now().timestamp();

    let existing = ctx.store.find_by_source(repo, path).await?;

    match existing {
        None => {
            let skill = Skill {
                id: uuid::Uuid::new_v4().to_string(),
                slug: disambiguate(&doc.slug_base(), SYNC_SLUG_SUFFIX_BYTES),
                title: doc.title,
                description: doc.description,
                content: doc.content,
                category: doc.category,
                tags: doc.tags,
                compatibility: doc.compatibility,
                source_kind: SourceKind::GithubSync,
                source_repo: Some(repo.to_string()),
                source_path: Some(path.to_string()),
                source_sha: Some(doc.source_sha),
                github_url: Some(ctx.source.web_url(repo, branch, path)),
                content_hash,
                is_public: true,
                status: SkillStatus::Published,
                published_at: Some(now),
                downloads: 0,
                rating: None,
                rating_count: 0,
                author_id: ctx.author_id.to_string(),
                created_at: now,
                updated_at: now,
            };
            let version = SkillVersion::snapshot(&skill, version_label(0), now);
            ctx.store.create_skill(&skill, &version).await?;
            Ok(PathOutcome::Imported)
        }
        Some(mut skill) if skill.content_hash != content_hash => {
            skill.title = doc.title;
            skill.description = doc.description;
            skill.content = doc.content;
            skill.category = doc.category;
            skill.tags = doc.tags;
            skill.compatibility = doc.compatibility;
            skill.source_sha = Some(doc.source_sha);
            skill.content_hash = content_hash;
            skill.status = SkillStatus::Published;
            skill.published_at.get_or_insert(now);
            skill.updated_at = now;

            let existing_versions = ctx.store.count_versions(&skill.id).await?;
            let version = SkillVersion::snapshot(&skill, version_label(existing_versions), now);
            ctx.store.update_skill(&skill, &version).await?;
            Ok(PathOutcome::Updated)
        }
        Some(_) => Ok(PathOutcome::Unchanged),
    }
}
