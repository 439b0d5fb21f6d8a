//! In-memory [`CatalogStore`] implementation for tests and embedding.
//!
//! All tables live behind a single `std::sync::RwLock`, so each trait
//! method observes and mutates a consistent snapshot; the versioned writes
//! are atomic because they happen under one write guard.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::models::{
    JobCompletion, JobState, Skill, SkillStatus, SkillVersion, SourceKind, SyncJob, User,
    UserRole, UserTier,
};

use super::CatalogStore;

#[derive(Default)]
struct Tables {
    skills: HashMap<String, Skill>,
    versions: Vec<SkillVersion>,
    jobs: HashMap<String, SyncJob>,
    users: HashMap<String, User>,
}

/// In-memory catalog store.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records, in no particular order. Test helper.
    pub fn skills(&self) -> Vec<Skill> {
        self.tables.read().unwrap().skills.values().cloned().collect()
    }

    /// All sync jobs, in no particular order. Test helper.
    pub fn jobs(&self) -> Vec<SyncJob> {
        self.tables.read().unwrap().jobs.values().cloned().collect()
    }

    /// Insert a record without a version row, bypassing validation.
    pub fn seed_skill(&self, skill: Skill) {
        self.tables
            .write()
            .unwrap()
            .skills
            .insert(skill.id.clone(), skill);
    }
}

fn check_unique(tables: &Tables, skill: &Skill) -> Result<()> {
    for other in tables.skills.values() {
        if other.id == skill.id {
            continue;
        }
        if other.slug == skill.slug {
            bail!("slug already exists: {}", skill.slug);
        }
        if skill.source_repo.is_some()
            && skill.source_path.is_some()
            && other.source_repo == skill.source_repo
            && other.source_path == skill.source_path
        {
            bail!(
                "source already exists: {}:{}",
                skill.source_repo.as_deref().unwrap_or_default(),
                skill.source_path.as_deref().unwrap_or_default()
            );
        }
    }
    Ok(())
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn find_by_source(&self, repo: &str, path: &str) -> Result<Option<Skill>> {
        let tables = self.tables.read().unwrap();
        Ok(tables
            .skills
            .values()
            .find(|s| {
                s.source_repo.as_deref() == Some(repo) && s.source_path.as_deref() == Some(path)
            })
            .cloned())
    }

    async fn get_skill(&self, id: &str) -> Result<Option<Skill>> {
        Ok(self.tables.read().unwrap().skills.get(id).cloned())
    }

    async fn get_skill_by_slug(&self, slug: &str) -> Result<Option<Skill>> {
        let tables = self.tables.read().unwrap();
        Ok(tables.skills.values().find(|s| s.slug == slug).cloned())
    }

    async fn create_skill(&self, skill: &Skill, version: &SkillVersion) -> Result<()> {
        let mut tables = self.tables.write().unwrap();
        if tables.skills.contains_key(&skill.id) {
            bail!("skill already exists: {}", skill.id);
        }
        check_unique(&tables, skill)?;
        if skill.source_kind == SourceKind::User {
            match tables.users.get_mut(&skill.author_id) {
                Some(user) => user.skills_created += 1,
                None => bail!("author not found: {}", skill.author_id),
            }
        }
        tables.skills.insert(skill.id.clone(), skill.clone());
        tables.versions.push(version.clone());
        Ok(())
    }

    async fn update_skill(&self, skill: &Skill, version: &SkillVersion) -> Result<()> {
        let mut tables = self.tables.write().unwrap();
        check_unique(&tables, skill)?;
        let stored = match tables.skills.get_mut(&skill.id) {
            Some(s) => s,
            None => bail!("skill not found: {}", skill.id),
        };
        let preserved = (
            stored.downloads,
            stored.rating,
            stored.rating_count,
            stored.created_at,
        );
        *stored = skill.clone();
        (
            stored.downloads,
            stored.rating,
            stored.rating_count,
            stored.created_at,
        ) = preserved;
        tables.versions.push(version.clone());
        Ok(())
    }

    async fn archive_missing(
        &self,
        repo: &str,
        touched: &HashSet<String>,
        now: i64,
    ) -> Result<u64> {
        let mut tables = self.tables.write().unwrap();
        let mut archived = 0u64;
        for skill in tables.skills.values_mut() {
            let in_scope = skill.source_kind == SourceKind::GithubSync
                && skill.status != SkillStatus::Archived
                && skill.source_repo.as_deref() == Some(repo);
            let untouched = skill
                .source_path
                .as_ref()
                .map(|p| !touched.contains(p))
                .unwrap_or(true);
            if in_scope && untouched {
                skill.status = SkillStatus::Archived;
                skill.updated_at = now;
                archived += 1;
            }
        }
        Ok(archived)
    }

    async fn list_versions(&self, skill_id: &str) -> Result<Vec<SkillVersion>> {
        let tables = self.tables.read().unwrap();
        Ok(tables
            .versions
            .iter()
            .filter(|v| v.skill_id == skill_id)
            .cloned()
            .collect())
    }

    async fn count_versions(&self, skill_id: &str) -> Result<i64> {
        let tables = self.tables.read().unwrap();
        Ok(tables
            .versions
            .iter()
            .filter(|v| v.skill_id == skill_id)
            .count() as i64)
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
        self.tables
            .write()
            .unwrap()
            .jobs
            .insert(job.id.clone(), job.clone());
        Ok(job)
    }

    async fn finish_job(&self, job_id: &str, completion: &JobCompletion) -> Result<()> {
        let mut tables = self.tables.write().unwrap();
        let job = match tables.jobs.get_mut(job_id) {
            Some(j) => j,
            None => bail!("sync job not found: {}", job_id),
        };
        if job.state.is_terminal() {
            bail!("sync job {} is already {}", job_id, job.state);
        }
        job.state = completion.state;
        job.finished_at = Some(completion.finished_at);
        job.imported = completion.imported;
        job.updated = completion.updated;
        job.errored = completion.errored;
        job.scanned = completion.scanned;
        job.log = completion.log.clone();
        Ok(())
    }

    async fn get_job(&self, job_id: &str) -> Result<Option<SyncJob>> {
        Ok(self.tables.read().unwrap().jobs.get(job_id).cloned())
    }

    async fn get_or_create_user(
        &self,
        email: &str,
        name: &str,
        role: UserRole,
        tier: UserTier,
    ) -> Result<User> {
        let mut tables = self.tables.write().unwrap();
        if let Some(existing) = tables.users.values().find(|u| u.email == email) {
            return Ok(existing.clone());
        }
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: name.to_string(),
            role,
            tier,
            skills_created: 0,
            created_at: chrono::Utc::now().timestamp(),
        };
        tables.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.tables.read().unwrap().users.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_finish_job_only_once() {
        let store = InMemoryStore::new();
        let job = store.create_job("acme/skills", 10).await.unwrap();
        assert_eq!(job.state, JobState::Running);

        store
            .finish_job(&job.id, &JobCompletion::failed(11, "boom"))
            .await
            .unwrap();
        let err = store
            .finish_job(&job.id, &JobCompletion::failed(12, "again"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already failed"));

        let stored = store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.finished_at, Some(11));
        assert_eq!(stored.log.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_get_or_create_user_is_idempotent() {
        let store = InMemoryStore::new();
        let a = store
            .get_or_create_user("bot@example.com", "Bot", UserRole::Admin, UserTier::Enterprise)
            .await
            .unwrap();
        let b = store
            .get_or_create_user("bot@example.com", "Other Name", UserRole::User, UserTier::Trial)
            .await
            .unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(b.name, "Bot");
        assert!(b.is_admin());
        assert_eq!(b.tier, UserTier::Enterprise);
    }
}
