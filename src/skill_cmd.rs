//! `skills skill add|update|show`.
//!
//! User-authored skills are written as Markdown files with YAML front
//! matter. The front matter supplies the metadata and the body becomes the
//! skill content.
//!
//! ```text
//! ---
//! title: Release Notes Writer
//! description: Drafts release notes from merged pull requests
//! category: writing
//! tags: [release, docs]
//! status: draft
//! ---
//! Collect merged pull requests and group them by label...
//! ```

use anyhow::{bail, Context, Result};
use std::path::Path;

use skill_catalog_core::catalog::{self, NewSkill, SkillUpdate};
use skill_catalog_core::frontmatter::{split_front_matter, FrontMatter};
use skill_catalog_core::models::{Skill, SkillStatus, UserRole, UserTier};
use skill_catalog_core::normalize::{DEFAULT_CATEGORY, SYNC_COMPATIBILITY};
use skill_catalog_core::store::CatalogStore;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;
use crate::sync_cmd::format_ts_iso;

fn read_document(path: &Path) -> Result<(FrontMatter, String)> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read skill file: {}", path.display()))?;
    let (fm, body) = split_front_matter(&raw);
    Ok((fm, body.trim().to_string()))
}

fn status_field(fm: &FrontMatter) -> Result<Option<SkillStatus>> {
    fm.str_field("status")
        .map(|s| s.parse::<SkillStatus>())
        .transpose()
        .context("invalid status")
}

/// Build a [`NewSkill`] from a Markdown file.
pub fn parse_new_skill(path: &Path) -> Result<NewSkill> {
    let (fm, body) = read_document(path)?;

    let title = match fm.str_field("title").or_else(|| fm.str_field("name")) {
        Some(t) => t.to_string(),
        None => bail!("invalid title: front matter must set 'title'"),
    };

    Ok(NewSkill {
        title,
        description: fm.str_field("description").unwrap_or_default().to_string(),
        content: body,
        category: fm
            .str_field("category")
            .unwrap_or(DEFAULT_CATEGORY)
            .to_string(),
        tags: fm.list_field("tags").unwrap_or_default(),
        compatibility: fm
            .list_field("compatibility")
            .unwrap_or_else(|| vec![SYNC_COMPATIBILITY.to_string()]),
        is_public: fm
            .get("public")
            .and_then(|v| v.as_bool())
            .unwrap_or(true),
        status: status_field(&fm)?.unwrap_or(SkillStatus::Published),
    })
}

/// Build a [`SkillUpdate`] from a Markdown file. Only the fields present in
/// the file change; an empty body leaves the content alone.
pub fn parse_skill_update(path: &Path) -> Result<SkillUpdate> {
    let (fm, body) = read_document(path)?;

    Ok(SkillUpdate {
        title: fm.str_field("title").map(str::to_string),
        description: fm.str_field("description").map(str::to_string),
        content: (!body.is_empty()).then_some(body),
        category: fm.str_field("category").map(str::to_string),
        tags: fm.list_field("tags"),
        compatibility: fm.list_field("compatibility"),
        is_public: fm.get("public").and_then(|v| v.as_bool()),
        status: status_field(&fm)?,
    })
}

/// `skills skill add <file>`: create a user-authored skill owned by
/// `author_email`, provisioning that user on the trial tier if needed.
pub async fn run_skill_add(config: &Config, file: &Path, author_email: &str) -> Result<Skill> {
    let input = parse_new_skill(file)?;

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());

    let result = async {
        let name = author_email.split('@').next().unwrap_or(author_email);
        let author = store
            .get_or_create_user(author_email, name, UserRole::User, UserTier::Trial)
            .await?;
        catalog::create_skill(&store, &author.id, input).await
    }
    .await;
    pool.close().await;
    let skill = result?;

    println!("created {}", skill.slug);
    println!("  id: {}", skill.id);
    println!("  status: {}", skill.status);
    println!("  version: 1.0.0");
    Ok(skill)
}

/// `skills skill update <id-or-slug> <file>`.
pub async fn run_skill_update(config: &Config, id_or_slug: &str, file: &Path) -> Result<Skill> {
    let input = parse_skill_update(file)?;

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let result = async {
        let skill = catalog::update_skill(&store, id_or_slug, input).await?;
        let versions = store.count_versions(&skill.id).await?;
        Ok::<_, anyhow::Error>((skill, versions))
    }
    .await;
    pool.close().await;
    let (skill, versions) = result?;

    println!("updated {}", skill.slug);
    println!("  id: {}", skill.id);
    println!("  status: {}", skill.status);
    println!("  versions: {}", versions);
    Ok(skill)
}

/// `skills skill show <id-or-slug>`.
pub async fn run_skill_show(config: &Config, id_or_slug: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let result = async {
        let skill = match catalog::find_skill(&store, id_or_slug).await? {
            Some(s) => s,
            None => bail!("skill not found: {}", id_or_slug),
        };
        let versions = store.list_versions(&skill.id).await?;
        Ok::<_, anyhow::Error>((skill, versions))
    }
    .await;
    pool.close().await;
    let (skill, versions) = result?;

    println!("--- Skill ---");
    println!("id:            {}", skill.id);
    println!("slug:          {}", skill.slug);
    println!("title:         {}", skill.title);
    println!("description:   {}", skill.description);
    println!("category:      {}", skill.category);
    println!("tags:          {}", skill.tags.join(", "));
    println!("compatibility: {}", skill.compatibility.join(", "));
    println!("status:        {}", skill.status);
    println!("source:        {}", skill.source_kind);
    if let (Some(repo), Some(path)) = (&skill.source_repo, &skill.source_path) {
        println!("source_path:   {}:{}", repo, path);
    }
    if let Some(ref url) = skill.github_url {
        println!("github_url:    {}", url);
    }
    println!("content_hash:  {}", skill.content_hash);
    println!("updated_at:    {}", format_ts_iso(skill.updated_at));
    println!();

    println!("--- Content ---");
    println!("{}", skill.content);
    println!();

    println!("--- Versions ({}) ---", versions.len());
    for v in &versions {
        println!("{}  {}  {}", v.version, format_ts_iso(v.created_at), v.content_hash);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(tmp: &TempDir, name: &str, text: &str) -> std::path::PathBuf {
        let path = tmp.path().join(name);
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_parse_new_skill_reads_front_matter() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            &tmp,
            "notes.md",
            "---\ntitle: Release Notes Writer\ndescription: Drafts release notes\n\
             tags: [Release, docs]\nstatus: draft\npublic: false\n---\n\nGroup merged PRs by label.\n",
        );

        let input = parse_new_skill(&path).unwrap();
        assert_eq!(input.title, "Release Notes Writer");
        assert_eq!(input.category, "general");
        assert_eq!(input.tags, vec!["Release", "docs"]);
        assert_eq!(input.compatibility, vec!["claude"]);
        assert_eq!(input.status, SkillStatus::Draft);
        assert!(!input.is_public);
        assert_eq!(input.content, "Group merged PRs by label.");
    }

    #[test]
    fn test_parse_new_skill_requires_title() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, "bare.md", "Just a body with no front matter at all.");
        let err = parse_new_skill(&path).unwrap_err();
        assert!(err.to_string().contains("invalid title"));
    }

    #[test]
    fn test_parse_rejects_unknown_status() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, "s.md", "---\ntitle: Thing\nstatus: pending\n---\nbody");
        let err = parse_new_skill(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid status"));
    }

    #[test]
    fn test_parse_update_only_sets_present_fields() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, "u.md", "---\ncategory: writing\n---\n");
        let update = parse_skill_update(&path).unwrap();
        assert_eq!(update.category.as_deref(), Some("writing"));
        assert!(update.title.is_none());
        assert!(update.content.is_none());
        assert!(update.status.is_none());
    }
}
