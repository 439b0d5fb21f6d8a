//! User-authored skill operations.
//!
//! Create and update paths for skills written by users. Input is validated
//! before anything touches the store, and every write persists the record
//! together with a version snapshot.

use anyhow::{bail, Result};
use chrono::Utc;
use serde::Deserialize;

use crate::fingerprint::fingerprint;
use crate::models::{version_label, Skill, SkillStatus, SkillVersion, SourceKind};
use crate::normalize::SYNC_COMPATIBILITY;
use crate::slug::{disambiguate, make_slug};
use crate::store::CatalogStore;

const USER_SLUG_SUFFIX_BYTES: usize = 2;

const TITLE_LEN: (usize, usize) = (3, 120);
const DESCRIPTION_LEN: (usize, usize) = (10, 300);
const CONTENT_LEN: (usize, usize) = (20, 100_000);
const CATEGORY_LEN: (usize, usize) = (2, 50);
const LABEL_LEN: (usize, usize) = (1, 40);
const MAX_TAGS: usize = 20;
const MAX_COMPATIBILITY: usize = 10;

/// Input for [`create_skill`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewSkill {
    pub title: String,
    pub description: String,
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_compatibility")]
    pub compatibility: Vec<String>,
    #[serde(default = "default_true")]
    pub is_public: bool,
    #[serde(default = "default_status")]
    pub status: SkillStatus,
}

fn default_compatibility() -> Vec<String> {
    vec![SYNC_COMPATIBILITY.to_string()]
}
fn default_true() -> bool {
    true
}
fn default_status() -> SkillStatus {
    SkillStatus::Published
}

/// Partial update for [`update_skill`]. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SkillUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub compatibility: Option<Vec<String>>,
    pub is_public: Option<bool>,
    pub status: Option<SkillStatus>,
}

fn check_len(field: &str, value: &str, (min, max): (usize, usize)) -> Result<()> {
    let len = value.chars().count();
    if len < min || len > max {
        bail!(
            "invalid {}: must be between {} and {} characters (got {})",
            field,
            min,
            max,
            len
        );
    }
    Ok(())
}

fn check_labels(field: &str, values: &[String], max_items: usize) -> Result<()> {
    if values.len() > max_items {
        bail!("invalid {}: at most {} entries allowed", field, max_items);
    }
    for v in values {
        check_len(field, v, LABEL_LEN)?;
    }
    Ok(())
}

fn lower_all(values: Vec<String>) -> Vec<String> {
    values.into_iter().map(|v| v.to_lowercase()).collect()
}

impl NewSkill {
    fn validate(&self) -> Result<()> {
        check_len("title", &self.title, TITLE_LEN)?;
        check_len("description", &self.description, DESCRIPTION_LEN)?;
        check_len("content", &self.content, CONTENT_LEN)?;
        check_len("category", &self.category, CATEGORY_LEN)?;
        check_labels("tags", &self.tags, MAX_TAGS)?;
        check_labels("compatibility", &self.compatibility, MAX_COMPATIBILITY)?;
        Ok(())
    }
}

impl SkillUpdate {
    fn validate(&self) -> Result<()> {
        if let Some(v) = &self.title {
            check_len("title", v, TITLE_LEN)?;
        }
        if let Some(v) = &self.description {
            check_len("description", v, DESCRIPTION_LEN)?;
        }
        if let Some(v) = &self.content {
            check_len("content", v, CONTENT_LEN)?;
        }
        if let Some(v) = &self.category {
            check_len("category", v, CATEGORY_LEN)?;
        }
        if let Some(v) = &self.tags {
            check_labels("tags", v, MAX_TAGS)?;
        }
        if let Some(v) = &self.compatibility {
            check_labels("compatibility", v, MAX_COMPATIBILITY)?;
        }
        Ok(())
    }
}

/// Look a skill up by id, then by slug.
pub async fn find_skill(store: &dyn CatalogStore, id_or_slug: &str) -> Result<Option<Skill>> {
    if let Some(skill) = store.get_skill(id_or_slug).await? {
        return Ok(Some(skill));
    }
    store.get_skill_by_slug(id_or_slug).await
}

/// Create a user-authored skill owned by `author_id`.
///
/// Trial accounts are refused once they have authored
/// [`TRIAL_SKILL_LIMIT`](crate::models::TRIAL_SKILL_LIMIT) skills.
pub async fn create_skill(
    store: &dyn CatalogStore,
    author_id: &str,
    input: NewSkill,
) -> Result<Skill> {
    input.validate()?;

    let author = match store.get_user(author_id).await? {
        Some(u) => u,
        None => bail!("author not found: {}", author_id),
    };
    if !author.can_create_skill() {
        bail!(
            "trial limit reached: {} skills created, upgrade to create more",
            author.skills_created
        );
    }

    let now = Utc::now().timestamp();
    let slug = disambiguate(&make_slug(&input.title), USER_SLUG_SUFFIX_BYTES);
    let content_hash = fingerprint(&input.content);
    let published_at = (input.status == SkillStatus::Published).then_some(now);

    let skill = Skill {
        id: uuid::Uuid::new_v4().to_string(),
        slug,
        title: input.title,
        description: input.description,
        content: input.content,
        category: input.category,
        tags: lower_all(input.tags),
        compatibility: lower_all(input.compatibility),
        source_kind: SourceKind::User,
        source_repo: None,
        source_path: None,
        source_sha: None,
        github_url: None,
        content_hash,
        is_public: input.is_public,
        status: input.status,
        published_at,
        downloads: 0,
        rating: None,
        rating_count: 0,
        author_id: author_id.to_string(),
        created_at: now,
        updated_at: now,
    };

    let version = SkillVersion::snapshot(&skill, version_label(0), now);
    store.create_skill(&skill, &version).await?;

    Ok(skill)
}

/// Apply a partial update to the skill named by id or slug.
///
/// A title change regenerates the slug from the new title plus the last
/// four characters of the id. The publish timestamp is only set the first
/// time the skill becomes published.
pub async fn update_skill(
    store: &dyn CatalogStore,
    id_or_slug: &str,
    input: SkillUpdate,
) -> Result<Skill> {
    input.validate()?;

    let mut skill = match find_skill(store, id_or_slug).await? {
        Some(s) => s,
        None => bail!("skill not found: {}", id_or_slug),
    };

    let now = Utc::now().timestamp();

    if let Some(title) = input.title {
        let id_tail: String = {
            let chars: Vec<char> = skill.id.chars().collect();
            chars[chars.len().saturating_sub(4)..].iter().collect()
        };
        skill.slug = format!("{}-{}", make_slug(&title), id_tail);
        skill.title = title;
    }
    if let Some(description) = input.description {
        skill.description = description;
    }
    if let Some(content) = input.content {
        skill.content = content;
    }
    if let Some(category) = input.category {
        skill.category = category;
    }
    if let Some(tags) = input.tags {
        skill.tags = lower_all(tags);
    }
    if let Some(compatibility) = input.compatibility {
        skill.compatibility = lower_all(compatibility);
    }
    if let Some(is_public) = input.is_public {
        skill.is_public = is_public;
    }
    if let Some(status) = input.status {
        skill.status = status;
        if status == SkillStatus::Published {
            skill.published_at.get_or_insert(now);
        }
    }

    skill.content_hash = fingerprint(&skill.content);
    skill.updated_at = now;

    let existing_versions = store.count_versions(&skill.id).await?;
    let version = SkillVersion::snapshot(&skill, version_label(existing_versions), now);
    store.update_skill(&skill, &version).await?;

    Ok(skill)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{UserRole, UserTier};
    use crate::store::memory::InMemoryStore;

    fn sample() -> NewSkill {
        NewSkill {
            title: "Release Notes Writer".to_string(),
            description: "Drafts release notes from merged PRs".to_string(),
            content: "Collect merged pull requests and group them by label.".to_string(),
            category: "writing".to_string(),
            tags: vec!["Release".to_string(), "Docs".to_string()],
            compatibility: vec!["Claude".to_string()],
            is_public: true,
            status: SkillStatus::Published,
        }
    }

    async fn author(store: &InMemoryStore) -> String {
        store
            .get_or_create_user("dev@example.com", "Dev", UserRole::User, UserTier::Pro)
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_create_writes_record_and_first_version() {
        let store = InMemoryStore::new();
        let author_id = author(&store).await;

        let skill = create_skill(&store, &author_id, sample()).await.unwrap();
        assert!(skill.slug.starts_with("release-notes-writer-"));
        assert_eq!(skill.slug.len(), "release-notes-writer-".len() + 4);
        assert_eq!(skill.tags, vec!["release", "docs"]);
        assert_eq!(skill.compatibility, vec!["claude"]);
        assert_eq!(skill.source_kind, SourceKind::User);
        assert_eq!(skill.content_hash, fingerprint(&skill.content));
        assert!(skill.published_at.is_some());

        let versions = store.list_versions(&skill.id).await.unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].version, "1.0.0");
        assert_eq!(versions[0].content_hash, skill.content_hash);

        let user = store.get_user(&author_id).await.unwrap().unwrap();
        assert_eq!(user.skills_created, 1);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input_before_writing() {
        let store = InMemoryStore::new();
        let author_id = author(&store).await;

        let mut input = sample();
        input.content = "too short".to_string();
        let err = create_skill(&store, &author_id, input).await.unwrap_err();
        assert!(err.to_string().contains("invalid content"));

        let mut input = sample();
        input.tags = (0..21).map(|i| format!("t{}", i)).collect();
        let err = create_skill(&store, &author_id, input).await.unwrap_err();
        assert!(err.to_string().contains("invalid tags"));

        assert!(store.skills().is_empty());
    }

    #[tokio::test]
    async fn test_draft_has_no_publish_timestamp_until_published() {
        let store = InMemoryStore::new();
        let author_id = author(&store).await;

        let mut input = sample();
        input.status = SkillStatus::Draft;
        let draft = create_skill(&store, &author_id, input).await.unwrap();
        assert_eq!(draft.published_at, None);

        let published = update_skill(
            &store,
            &draft.id,
            SkillUpdate {
                status: Some(SkillStatus::Published),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let first = published.published_at.unwrap();

        let republished = update_skill(
            &store,
            &draft.slug,
            SkillUpdate {
                status: Some(SkillStatus::Published),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(republished.published_at, Some(first));
    }

    #[tokio::test]
    async fn test_update_title_regenerates_slug_and_appends_version() {
        let store = InMemoryStore::new();
        let author_id = author(&store).await;
        let skill = create_skill(&store, &author_id, sample()).await.unwrap();

        let updated = update_skill(
            &store,
            &skill.slug,
            SkillUpdate {
                title: Some("Changelog Writer".to_string()),
                content: Some("Summarize merged pull requests into a changelog.".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let tail = &skill.id[skill.id.len() - 4..];
        assert_eq!(updated.slug, format!("changelog-writer-{}", tail));
        assert_eq!(updated.content_hash, fingerprint(&updated.content));

        let versions = store.list_versions(&skill.id).await.unwrap();
        let labels: Vec<_> = versions.iter().map(|v| v.version.as_str()).collect();
        assert_eq!(labels, vec!["1.0.0", "1.0.1"]);
    }

    #[tokio::test]
    async fn test_trial_author_is_capped() {
        let store = InMemoryStore::new();
        let trial = store
            .get_or_create_user("new@example.com", "New", UserRole::User, UserTier::Trial)
            .await
            .unwrap();

        for _ in 0..3 {
            create_skill(&store, &trial.id, sample()).await.unwrap();
        }
        let err = create_skill(&store, &trial.id, sample()).await.unwrap_err();
        assert!(err.to_string().contains("trial limit reached"));

        assert_eq!(store.skills().len(), 3);
        let user = store.get_user(&trial.id).await.unwrap().unwrap();
        assert_eq!(user.skills_created, 3);
    }

    #[tokio::test]
    async fn test_unknown_author_writes_nothing() {
        let store = InMemoryStore::new();
        let err = create_skill(&store, "ghost", sample()).await.unwrap_err();
        assert!(err.to_string().contains("author not found"));
        assert!(store.skills().is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_skill() {
        let store = InMemoryStore::new();
        let err = update_skill(&store, "nope", SkillUpdate::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
