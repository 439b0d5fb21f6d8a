//! Core data models for the skill catalog.
//!
//! These types represent the skills, version snapshots, sync jobs, and users
//! that flow between the sync pipeline, the catalog operations, and the
//! storage backends. Timestamps are Unix seconds, as stored in SQLite.

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Where a skill record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Written by a user through the catalog operations.
    User,
    /// Imported from a GitHub repository by the sync job.
    GithubSync,
}

/// Publication state of a skill record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillStatus {
    Draft,
    Published,
    /// Soft-deleted: still readable by id, excluded from public listings.
    Archived,
}

/// Lifecycle state of a sync job. Jobs are created directly in `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Running,
    Success,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

/// Account plan. New accounts start on `Trial`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserTier {
    Trial,
    Pro,
    Enterprise,
}

/// Number of skills a `Trial` account may author.
pub const TRIAL_SKILL_LIMIT: i64 = 3;

macro_rules! string_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => bail!("unknown {}: '{}'", stringify!($ty), other),
                }
            }
        }
    };
}

string_enum!(SourceKind { User => "user", GithubSync => "github_sync" });
string_enum!(SkillStatus { Draft => "draft", Published => "published", Archived => "archived" });
string_enum!(JobState { Running => "running", Success => "success", Failed => "failed" });
string_enum!(UserRole { User => "user", Admin => "admin" });
string_enum!(UserTier { Trial => "trial", Pro => "pro", Enterprise => "enterprise" });

impl JobState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Running)
    }
}

/// A persisted skill document.
///
/// `content_hash` is always the SHA-256 hex digest of `content` after a
/// successful write; it is the only signal the sync job uses to decide
/// whether an upstream document changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Skill {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub compatibility: Vec<String>,
    pub source_kind: SourceKind,
    pub source_repo: Option<String>,
    pub source_path: Option<String>,
    pub source_sha: Option<String>,
    pub github_url: Option<String>,
    pub content_hash: String,
    pub is_public: bool,
    pub status: SkillStatus,
    pub published_at: Option<i64>,
    pub downloads: i64,
    pub rating: Option<f64>,
    pub rating_count: i64,
    pub author_id: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Immutable snapshot appended on every content-affecting write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillVersion {
    pub id: String,
    pub skill_id: String,
    pub version: String,
    pub content: String,
    pub metadata: serde_json::Value,
    pub content_hash: String,
    pub created_at: i64,
}

impl SkillVersion {
    /// Snapshot the current state of `skill` under the given version label.
    pub fn snapshot(skill: &Skill, version: String, now: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            skill_id: skill.id.clone(),
            version,
            content: skill.content.clone(),
            metadata: serde_json::json!({
                "title": skill.title,
                "description": skill.description,
                "tags": skill.tags,
                "compatibility": skill.compatibility,
                "status": skill.status.as_str(),
            }),
            content_hash: skill.content_hash.clone(),
            created_at: now,
        }
    }
}

/// Version label for the next snapshot given how many already exist.
///
/// The first snapshot is `1.0.0`; after that the patch number is the
/// number of snapshots already recorded.
pub fn version_label(existing: i64) -> String {
    format!("1.0.{}", existing.max(0))
}

/// One row per synchronization run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncJob {
    pub id: String,
    pub repo: String,
    pub state: JobState,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub imported: i64,
    pub updated: i64,
    pub errored: i64,
    pub scanned: i64,
    /// Job-level failure cause. Never set for per-document failures.
    pub log: Option<String>,
}

/// Terminal transition for a [`SyncJob`], applied exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct JobCompletion {
    pub state: JobState,
    pub finished_at: i64,
    pub imported: i64,
    pub updated: i64,
    pub errored: i64,
    pub scanned: i64,
    pub log: Option<String>,
}

impl JobCompletion {
    pub fn failed(finished_at: i64, log: impl Into<String>) -> Self {
        Self {
            state: JobState::Failed,
            finished_at,
            imported: 0,
            updated: 0,
            errored: 0,
            scanned: 0,
            log: Some(log.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub tier: UserTier,
    pub skills_created: i64,
    pub created_at: i64,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Whether this account may author another skill.
    pub fn can_create_skill(&self) -> bool {
        can_create_skill(self.tier, self.skills_created)
    }
}

pub fn can_create_skill(tier: UserTier, skills_created: i64) -> bool {
    match tier {
        UserTier::Trial => skills_created < TRIAL_SKILL_LIMIT,
        UserTier::Pro | UserTier::Enterprise => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_round_trip_through_strings() {
        assert_eq!("github_sync".parse::<SourceKind>().unwrap(), SourceKind::GithubSync);
        assert_eq!(SkillStatus::Archived.to_string(), "archived");
        assert!("pending".parse::<JobState>().is_err());
    }

    #[test]
    fn test_version_labels() {
        assert_eq!(version_label(0), "1.0.0");
        assert_eq!(version_label(1), "1.0.1");
        assert_eq!(version_label(7), "1.0.7");
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Success.is_terminal());
        assert!(JobState::Failed.is_terminal());
    }

    #[test]
    fn test_trial_accounts_stop_at_limit() {
        assert!(can_create_skill(UserTier::Trial, 2));
        assert!(!can_create_skill(UserTier::Trial, 3));
        assert!(can_create_skill(UserTier::Pro, 999));
        assert!(can_create_skill(UserTier::Enterprise, 999));
        assert_eq!("enterprise".parse::<UserTier>().unwrap(), UserTier::Enterprise);
    }
}
