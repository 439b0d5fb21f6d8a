//! Storage abstraction for the skill catalog.
//!
//! The [`CatalogStore`] trait defines every persistence operation the sync
//! job and the catalog operations need, so the reconciliation algorithm can
//! run against SQLite in production and against [`memory::InMemoryStore`] in
//! tests.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{JobCompletion, Skill, SkillVersion, SyncJob, User, UserRole, UserTier};

/// Abstract storage backend for the catalog.
///
/// Every method is individually atomic. The two versioned writes,
/// [`create_skill`](CatalogStore::create_skill) and
/// [`update_skill`](CatalogStore::update_skill), persist the record and its
/// version snapshot all-or-nothing.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`find_by_source`](CatalogStore::find_by_source) | Lookup by `(source_repo, source_path)` |
/// | [`get_skill`](CatalogStore::get_skill) | Lookup by id |
/// | [`get_skill_by_slug`](CatalogStore::get_skill_by_slug) | Lookup by slug |
/// | [`create_skill`](CatalogStore::create_skill) | Insert record + first version |
/// | [`update_skill`](CatalogStore::update_skill) | Overwrite record + append version |
/// | [`archive_missing`](CatalogStore::archive_missing) | Bulk soft delete of untouched synced records |
/// | [`create_job`](CatalogStore::create_job) / [`finish_job`](CatalogStore::finish_job) | Sync job lifecycle |
/// | [`get_or_create_user`](CatalogStore::get_or_create_user) | Idempotent user provisioning |
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Find the synced record for a source identity.
    async fn find_by_source(&self, repo: &str, path: &str) -> Result<Option<Skill>>;

    async fn get_skill(&self, id: &str) -> Result<Option<Skill>>;

    async fn get_skill_by_slug(&self, slug: &str) -> Result<Option<Skill>>;

    /// Insert a new record together with its first version snapshot.
    ///
    /// For `user` records the author's `skills_created` counter is bumped in
    /// the same write. Fails without writing anything if the slug or the
    /// source identity is already taken, or the author does not exist.
    async fn create_skill(&self, skill: &Skill, version: &SkillVersion) -> Result<()>;

    /// Overwrite the mutable fields of an existing record and append a
    /// version snapshot.
    ///
    /// Aggregates owned by the review subsystem (`downloads`, `rating`,
    /// `rating_count`) and `created_at` are left untouched.
    async fn update_skill(&self, skill: &Skill, version: &SkillVersion) -> Result<()>;

    /// Archive every non-archived `github_sync` record of `repo` whose path
    /// is not in `touched`. Returns the number of records transitioned.
    async fn archive_missing(&self, repo: &str, touched: &HashSet<String>, now: i64)
        -> Result<u64>;

    /// Version snapshots for a record, oldest first.
    async fn list_versions(&self, skill_id: &str) -> Result<Vec<SkillVersion>>;

    async fn count_versions(&self, skill_id: &str) -> Result<i64>;

    /// Open a new job in the `running` state.
    async fn create_job(&self, repo: &str, started_at: i64) -> Result<SyncJob>;

    /// Move a running job to its terminal state.
    ///
    /// Errors if the job does not exist or is already terminal.
    async fn finish_job(&self, job_id: &str, completion: &JobCompletion) -> Result<()>;

    async fn get_job(&self, job_id: &str) -> Result<Option<SyncJob>>;

    /// Return the user with `email`, creating it with `name`, `role` and
    /// `tier` if absent. An existing row is returned unchanged.
    ///
    /// Safe to call concurrently: the unique email constraint decides the
    /// winner and every caller gets the same row back.
    async fn get_or_create_user(
        &self,
        email: &str,
        name: &str,
        role: UserRole,
        tier: UserTier,
    ) -> Result<User>;

    async fn get_user(&self, id: &str) -> Result<Option<User>>;
}
