//! Skill document normalization.
//!
//! Turns a raw `SKILL.md` file from a remote repository into the canonical
//! shape stored in the catalog. Normalization never fails: every field has a
//! fallback when the front matter omits it or gives it the wrong type.
//!
//! | Field | Front matter | Fallback |
//! |-------|--------------|----------|
//! | title | `title`, then `name` | path without `/SKILL.md` |
//! | description | `description` | `Imported from <repo>:<path>` |
//! | category | `category` | keyword match on the path, else `general` |
//! | tags | `tags` (lower-cased) | `[category, "claude-skill"]` |
//! | compatibility | (none) | `["claude"]` |

use serde::Serialize;

use crate::fingerprint::fingerprint;
use crate::frontmatter::split_front_matter;
use crate::slug::make_slug;

/// File name that marks a directory as a skill, matched at any depth.
pub const MARKER_FILE: &str = "SKILL.md";

/// Tag added to synced skills that declare no tags of their own.
pub const MARKER_TAG: &str = "claude-skill";

/// Category used when neither front matter nor the path names one.
pub const DEFAULT_CATEGORY: &str = "general";

/// The assistant every synced skill is declared compatible with.
pub const SYNC_COMPATIBILITY: &str = "claude";

/// Path keywords checked in order; the first substring hit wins.
const CATEGORY_KEYWORDS: &[(&str, &str)] = &[
    ("automation", "automation"),
    ("security", "security"),
    ("data", "data"),
];

/// A skill document in catalog shape, ready for reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedSkill {
    pub source_path: String,
    pub source_sha: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub compatibility: Vec<String>,
    pub content: String,
}

impl NormalizedSkill {
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.content)
    }

    /// Slug base for a new record: from the title, or from the path when
    /// the title has no sluggable characters.
    pub fn slug_base(&self) -> String {
        let from_title = make_slug(&self.title);
        if from_title.is_empty() {
            make_slug(strip_marker(&self.source_path))
        } else {
            from_title
        }
    }
}

/// Remove the trailing `/SKILL.md` from a document path.
pub fn strip_marker(path: &str) -> &str {
    path.strip_suffix("/SKILL.md").unwrap_or(path)
}

/// Infer a category from a document path, case-insensitively.
pub fn infer_category(path: &str) -> &'static str {
    let lower = path.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, category)| *category)
        .unwrap_or(DEFAULT_CATEGORY)
}

/// Normalize one raw document read from `repo` at commit `sha`.
pub fn normalize_skill(repo: &str, path: &str, raw: &str, sha: &str) -> NormalizedSkill {
    let (fm, body) = split_front_matter(raw);

    let title = fm
        .str_field("title")
        .or_else(|| fm.str_field("name"))
        .unwrap_or_else(|| strip_marker(path))
        .to_string();

    let description = fm
        .str_field("description")
        .map(str::to_string)
        .unwrap_or_else(|| format!("Imported from {}:{}", repo, path));

    let category = fm
        .str_field("category")
        .map(str::to_string)
        .unwrap_or_else(|| infer_category(path).to_string());

    let tags = match fm.list_field("tags") {
        Some(tags) => tags.into_iter().map(|t| t.to_lowercase()).collect(),
        None => vec![category.clone(), MARKER_TAG.to_string()],
    };

    NormalizedSkill {
        source_path: path.to_string(),
        source_sha: sha.to_string(),
        title,
        description,
        category,
        tags,
        compatibility: vec![SYNC_COMPATIBILITY.to_string()],
        content: body.trim().to_string(),
    }
}
