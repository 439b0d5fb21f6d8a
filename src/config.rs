//! TOML configuration.
//!
//! Every section except `[db]` is optional; missing keys take the defaults
//! below. [`load_config`] parses and validates the file, and environment
//! lookups for secrets happen lazily through the helpers on each section.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use skill_catalog_core::sync::SyncSettings;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub trigger: TriggerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}

/// Where skills are synced from and how GitHub is reached.
#[derive(Debug, Deserialize, Clone)]
pub struct GithubConfig {
    #[serde(default = "default_repo")]
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_raw_base")]
    pub raw_base: String,
    #[serde(default = "default_web_base")]
    pub web_base: String,
    /// Name of the environment variable holding the API token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            repo: default_repo(),
            branch: default_branch(),
            api_base: default_api_base(),
            raw_base: default_raw_base(),
            web_base: default_web_base(),
            token_env: default_token_env(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GithubConfig {
    /// The API token, if the configured variable is set and non-empty.
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
    }
}

fn default_repo() -> String {
    "ComposioHQ/awesome-claude-skills".to_string()
}
fn default_branch() -> String {
    "master".to_string()
}
fn default_api_base() -> String {
    "https://api.github.com".to_string()
}
fn default_raw_base() -> String {
    "https://raw.githubusercontent.com".to_string()
}
fn default_web_base() -> String {
    "https://github.com".to_string()
}
fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}
fn default_user_agent() -> String {
    "synapse-sync-bot".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

/// Owner of records created by the sync job.
#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    #[serde(default = "default_author_email")]
    pub author_email: String,
    #[serde(default = "default_author_name")]
    pub author_name: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            author_email: default_author_email(),
            author_name: default_author_name(),
        }
    }
}

pub const AUTHOR_EMAIL_ENV: &str = "SYSTEM_AUTHOR_EMAIL";

impl SyncConfig {
    /// The sync author email. `SYSTEM_AUTHOR_EMAIL` wins over the file.
    pub fn resolved_author_email(&self) -> String {
        std::env::var(AUTHOR_EMAIL_ENV)
            .ok()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| self.author_email.clone())
    }
}

fn default_author_email() -> String {
    "sync-bot@synapse.local".to_string()
}
fn default_author_name() -> String {
    "Synapse Sync Bot".to_string()
}

/// Gating for the HTTP sync trigger.
#[derive(Debug, Deserialize, Clone)]
pub struct TriggerConfig {
    #[serde(default = "default_cron_secret_env")]
    pub cron_secret_env: String,
    #[serde(default = "default_max_per_hour")]
    pub max_per_hour: u32,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            cron_secret_env: default_cron_secret_env(),
            max_per_hour: default_max_per_hour(),
        }
    }
}

impl TriggerConfig {
    /// The shared scheduler secret. `None` disables bearer authentication.
    pub fn cron_secret(&self) -> Option<String> {
        std::env::var(&self.cron_secret_env)
            .ok()
            .filter(|s| !s.is_empty())
    }
}

fn default_cron_secret_env() -> String {
    "CRON_SECRET".to_string()
}
fn default_max_per_hour() -> u32 {
    10
}

impl Config {
    /// Sync settings for the configured repository, with optional
    /// overrides from the command line.
    pub fn sync_settings(&self, repo: Option<&str>, branch: Option<&str>) -> SyncSettings {
        SyncSettings {
            repo: repo.unwrap_or(&self.github.repo).to_string(),
            branch: branch.unwrap_or(&self.github.branch).to_string(),
            author_email: self.sync.resolved_author_email(),
            author_name: self.sync.author_name.clone(),
        }
    }
}

/// `owner/name`, each part non-empty and free of whitespace.
pub fn is_valid_repo(repo: &str) -> bool {
    match repo.split_once('/') {
        Some((owner, name)) => {
            !owner.is_empty()
                && !name.is_empty()
                && !name.contains('/')
                && !repo.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

/// Checks that apply no matter where the config came from.
pub fn validate(config: &Config) -> Result<()> {
    if !is_valid_repo(&config.github.repo) {
        anyhow::bail!(
            "github.repo must be in 'owner/name' form, got '{}'",
            config.github.repo
        );
    }

    if config.github.branch.trim().is_empty() {
        anyhow::bail!("github.branch must not be empty");
    }

    if config.github.timeout_secs == 0 {
        anyhow::bail!("github.timeout_secs must be > 0");
    }

    if config.trigger.max_per_hour < 1 {
        anyhow::bail!("trigger.max_per_hour must be >= 1");
    }

    if config.sync.author_email.trim().is_empty() {
        anyhow::bail!("sync.author_email must not be empty");
    }

    Ok(())
}
