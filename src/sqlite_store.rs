//! SQLite-backed [`CatalogStore`] implementation.
//!
//! The versioned writes run inside a transaction so a record and its
//! version snapshot land together. Tags and compatibility lists are stored
//! as JSON text.

use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use skill_catalog_core::models::{
    JobCompletion, JobState, Skill, SkillStatus, SkillVersion, SourceKind, SyncJob, User,
    UserRole, UserTier,
};
use skill_catalog_core::store::CatalogStore;

/// SQLite implementation of the [`CatalogStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

const SKILL_COLUMNS: &str = "id, slug, title, description, content, category, tags_json, \
    compatibility_json, source_kind, source_repo, source_path, source_sha, github_url, \
    content_hash, is_public, status, published_at, downloads, rating, rating_count, \
    author_id, created_at, updated_at";

const JOB_COLUMNS: &str =
    "id, repo, state, started_at, finished_at, imported, updated, errored, scanned, log";

const USER_COLUMNS: &str = "id, email, name, role, tier, skills_created, created_at";

fn skill_from_row(row: &SqliteRow) -> Result<Skill> {
    let tags_json: String = row.get("tags_json");
    let compatibility_json: String = row.get("compatibility_json");
    let source_kind: String = row.get("source_kind");
    let status: String = row.get("status");

    Ok(Skill {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        description: row.get("description"),
        content: row.get("content"),
        category: row.get("category"),
        tags: serde_json::from_str(&tags_json).context("corrupt tags_json")?,
        compatibility: serde_json::from_str(&compatibility_json)
            .context("corrupt compatibility_json")?,
        source_kind: source_kind.parse()?,
        source_repo: row.get("source_repo"),
        source_path: row.get("source_path"),
        source_sha: row.get("source_sha"),
        github_url: row.get("github_url"),
        content_hash: row.get("content_hash"),
        is_public: row.get("is_public"),
        status: status.parse()?,
        published_at: row.get("published_at"),
        downloads: row.get("downloads"),
        rating: row.get("rating"),
        rating_count: row.get("rating_count"),
        author_id: row.get("author_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn version_from_row(row: &SqliteRow) -> Result<SkillVersion> {
    let metadata_json: String = row.get("metadata_json");
    Ok(SkillVersion {
        id: row.get("id"),
        skill_id: row.get("skill_id"),
        version: row.get("version"),
        content: row.get("content"),
        metadata: serde_json::from_str(&metadata_json).context("corrupt metadata_json")?,
        content_hash: row.get("content_hash"),
        created_at: row.get("created_at"),
    })
}

fn job_from_row(row: &SqliteRow) -> Result<SyncJob> {
    let state: String = row.get("state");
    Ok(SyncJob {
        id: row.get("id"),
        repo: row.get("repo"),
        state: state.parse()?,
        started_at: row.get("started_at"),
        finished_at: row.get("finished_at"),
        imported: row.get("imported"),
        updated: row.get("updated"),
        errored: row.get("errored"),
        scanned: row.get("scanned"),
        log: row.get("log"),
    })
}

fn user_from_row(row: &SqliteRow) -> Result<User> {
    let role: String = row.get("role");
    let tier: String = row.get("tier");
    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        role: role.parse()?,
        tier: tier.parse()?,
        skills_created: row.get("skills_created"),
        created_at: row.get("created_at"),
    })
}

async fn insert_version(tx: &mut Transaction<'_, Sqlite>, version: &SkillVersion) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO skill_versions (id, skill_id, version, content, metadata_json,
                                    content_hash, created_at, seq)
        VALUES (?, ?, ?, ?, ?, ?, ?,
                (SELECT COUNT(*) FROM skill_versions WHERE skill_id = ?))
        "#,
    )
    .bind(&version.id)
    .bind(&version.skill_id)
    .bind(&version.version)
    .bind(&version.content)
    .bind(serde_json::to_string(&version.metadata)?)
    .bind(&version.content_hash)
    .bind(version.created_at)
    .bind(&version.skill_id)
    .execute(&mut **tx)
    .await
    .with_context(|| format!("failed to write version {}", version.version))?;
    Ok(())
}

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn find_by_source(&self, repo: &str, path: &str) -> Result<Option<Skill>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM skills WHERE source_repo = ? AND source_path = ?",
            SKILL_COLUMNS
        ))
        .bind(repo)
        .bind(path)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(skill_from_row).transpose()
    }

    async fn get_skill(&self, id: &str) -> Result<Option<Skill>> {
        let row = sqlx::query(&format!("SELECT {} FROM skills WHERE id = ?", SKILL_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(skill_from_row).transpose()
    }

    async fn get_skill_by_slug(&self, slug: &str) -> Result<Option<Skill>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM skills WHERE slug = ?",
            SKILL_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(skill_from_row).transpose()
    }

    async fn create_skill(&self, skill: &Skill, version: &SkillVersion) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            "INSERT INTO skills ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            SKILL_COLUMNS
        ))
        .bind(&skill.id)
        .bind(&skill.slug)
        .bind(&skill.title)
        .bind(&skill.description)
        .bind(&skill.content)
        .bind(&skill.category)
        .bind(serde_json::to_string(&skill.tags)?)
        .bind(serde_json::to_string(&skill.compatibility)?)
        .bind(skill.source_kind.as_str())
        .bind(&skill.source_repo)
        .bind(&skill.source_path)
        .bind(&skill.source_sha)
        .bind(&skill.github_url)
        .bind(&skill.content_hash)
        .bind(skill.is_public)
        .bind(skill.status.as_str())
        .bind(skill.published_at)
        .bind(skill.downloads)
        .bind(skill.rating)
        .bind(skill.rating_count)
        .bind(&skill.author_id)
        .bind(skill.created_at)
        .bind(skill.updated_at)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("failed to insert skill '{}'", skill.slug))?;

        if skill.source_kind == SourceKind::User {
            let result =
                sqlx::query("UPDATE users SET skills_created = skills_created + 1 WHERE id = ?")
                    .bind(&skill.author_id)
                    .execute(&mut *tx)
                    .await?;
            if result.rows_affected() == 0 {
                bail!("author not found: {}", skill.author_id);
            }
        }

        insert_version(&mut tx, version).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update_skill(&self, skill: &Skill, version: &SkillVersion) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE skills SET
                slug = ?, title = ?, description = ?, content = ?, category = ?,
                tags_json = ?, compatibility_json = ?, source_sha = ?, github_url = ?,
                content_hash = ?, is_public = ?, status = ?, published_at = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&skill.slug)
        .bind(&skill.title)
        .bind(&skill.description)
        .bind(&skill.content)
        .bind(&skill.category)
        .bind(serde_json::to_string(&skill.tags)?)
        .bind(serde_json::to_string(&skill.compatibility)?)
        .bind(&skill.source_sha)
        .bind(&skill.github_url)
        .bind(&skill.content_hash)
        .bind(skill.is_public)
        .bind(skill.status.as_str())
        .bind(skill.published_at)
        .bind(skill.updated_at)
        .bind(&skill.id)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("failed to update skill '{}'", skill.slug))?;

        if result.rows_affected() == 0 {
            bail!("skill not found: {}", skill.id);
        }

        insert_version(&mut tx, version).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn archive_missing(
        &self,
        repo: &str,
        touched: &HashSet<String>,
        now: i64,
    ) -> Result<u64> {
        let touched_json = serde_json::to_string(&touched.iter().collect::<Vec<_>>())?;
        let result = sqlx::query(
            r#"
            UPDATE skills SET status = ?, updated_at = ?
            WHERE source_repo = ?
              AND source_kind = ?
              AND status != ?
              AND (source_path IS NULL
                   OR source_path NOT IN (SELECT value FROM json_each(?)))
            "#,
        )
        .bind(SkillStatus::Archived.as_str())
        .bind(now)
        .bind(repo)
        .bind(SourceKind::GithubSync.as_str())
        .bind(SkillStatus::Archived.as_str())
        .bind(touched_json)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn list_versions(&self, skill_id: &str) -> Result<Vec<SkillVersion>> {
        let rows = sqlx::query(
            "SELECT id, skill_id, version, content, metadata_json, content_hash, created_at \
             FROM skill_versions WHERE skill_id = ? ORDER BY seq ASC",
        )
        .bind(skill_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(version_from_row).collect()
    }

    async fn count_versions(&self, skill_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM skill_versions WHERE skill_id = ?")
            .bind(skill_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create_job(&self, repo: &str, started_at: i64) -> Result<SyncJob> {
        let job = SyncJob {
            id: uuid::Uuid::new_v4().to_string(),
            repo: repo.to_string(),
            state: JobState::Running,
            started_at,
            finished_at: None,
            imported: 0,
            updated: 0,
            errored: 0,
            scanned: 0,
            log: None,
        };

        sqlx::query("INSERT INTO sync_jobs (id, repo, state, started_at) VALUES (?, ?, ?, ?)")
            .bind(&job.id)
            .bind(&job.repo)
            .bind(job.state.as_str())
            .bind(job.started_at)
            .execute(&self.pool)
            .await?;

        Ok(job)
    }

    async fn finish_job(&self, job_id: &str, completion: &JobCompletion) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE sync_jobs SET
                state = ?, finished_at = ?, imported = ?, updated = ?,
                errored = ?, scanned = ?, log = ?
            WHERE id = ? AND state = ?
            "#,
        )
        .bind(completion.state.as_str())
        .bind(completion.finished_at)
        .bind(completion.imported)
        .bind(completion.updated)
        .bind(completion.errored)
        .bind(completion.scanned)
        .bind(&completion.log)
        .bind(job_id)
        .bind(JobState::Running.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            match self.get_job(job_id).await? {
                Some(job) => bail!("sync job {} is already {}", job_id, job.state),
                None => bail!("sync job not found: {}", job_id),
            }
        }
        Ok(())
    }

    async fn get_job(&self, job_id: &str) -> Result<Option<SyncJob>> {
        let row = sqlx::query(&format!("SELECT {} FROM sync_jobs WHERE id = ?", JOB_COLUMNS))
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(job_from_row).transpose()
    }

    async fn get_or_create_user(
        &self,
        email: &str,
        name: &str,
        role: UserRole,
        tier: UserTier,
    ) -> Result<User> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, role, tier, skills_created, created_at)
            VALUES (?, ?, ?, ?, ?, 0, ?)
            ON CONFLICT(email) DO NOTHING
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(email)
        .bind(name)
        .bind(role.as_str())
        .bind(tier.as_str())
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("user vanished after insert: {}", email))?;
        user_from_row(&row)
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }
}
