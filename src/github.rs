//! GitHub [`RemoteSource`].
//!
//! Lists skill documents through the Git data API and fetches their text
//! from the raw content host:
//!
//! 1. `GET {api}/repos/{repo}/git/ref/heads/{branch}` → commit URL
//! 2. `GET {commit_url}` → commit sha and tree URL
//! 3. `GET {tree_url}?recursive=1` → every blob in the branch
//! 4. `GET {raw}/{repo}/{branch}/{path}` per document
//!
//! Requests carry the configured user agent, and a bearer token when one is
//! set. Nothing is retried; a failed listing aborts the run and a failed
//! fetch only loses that document.

use anyhow::{bail, Result};
use async_trait::async_trait;
use globset::{Glob, GlobSet, GlobSetBuilder};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use skill_catalog_core::normalize::MARKER_FILE;
use skill_catalog_core::source::{RemoteSource, RemoteTree};

use crate::config::GithubConfig;

const GITHUB_JSON: &str = "application/vnd.github+json";

#[derive(Deserialize)]
struct RefResponse {
    object: GitObject,
}

#[derive(Deserialize)]
struct GitObject {
    url: String,
}

#[derive(Deserialize)]
struct CommitResponse {
    sha: String,
    tree: GitObject,
}

#[derive(Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

/// Remote source backed by the GitHub REST API.
pub struct GitHubSource {
    client: reqwest::Client,
    api_base: String,
    raw_base: String,
    web_base: String,
    marker: GlobSet,
}

impl GitHubSource {
    pub fn new(config: &GithubConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_str(&config.user_agent)?);
        if let Some(token) = config.token() {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            raw_base: config.raw_base.trim_end_matches('/').to_string(),
            web_base: config.web_base.trim_end_matches('/').to_string(),
            marker: marker_globset()?,
        })
    }

    /// Whether a tree path names a skill document.
    pub fn is_skill_path(&self, path: &str) -> bool {
        self.marker.is_match(path)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = self
            .client
            .get(url)
            .header(ACCEPT, GITHUB_JSON)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("GitHub request to {} failed: {}", url, e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            bail!("GitHub request failed (HTTP {}) for {}", status, url);
        }

        resp.json::<T>()
            .await
            .map_err(|e| anyhow::anyhow!("Invalid GitHub response from {}: {}", url, e))
    }
}

fn marker_globset() -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    builder.add(Glob::new(&format!("**/{}", MARKER_FILE))?);
    Ok(builder.build()?)
}

#[async_trait]
impl RemoteSource for GitHubSource {
    async fn list_skill_paths(&self, repo: &str, branch: &str) -> Result<RemoteTree> {
        let ref_url = format!("{}/repos/{}/git/ref/heads/{}", self.api_base, repo, branch);
        let git_ref: RefResponse = self.get_json(&ref_url).await?;
        let commit: CommitResponse = self.get_json(&git_ref.object.url).await?;
        let tree: TreeResponse = self
            .get_json(&format!("{}?recursive=1", commit.tree.url))
            .await?;

        // A partial listing would archive every record outside it.
        if tree.truncated {
            bail!(
                "GitHub truncated the tree listing for {}@{} ({} entries returned)",
                repo,
                branch,
                tree.tree.len()
            );
        }

        let paths = tree
            .tree
            .into_iter()
            .filter(|e| e.kind == "blob" && self.is_skill_path(&e.path))
            .map(|e| e.path)
            .collect();

        Ok(RemoteTree {
            commit_sha: commit.sha,
            paths,
        })
    }

    async fn fetch_document(&self, repo: &str, branch: &str, path: &str) -> Result<String> {
        let url = format!("{}/{}/{}/{}", self.raw_base, repo, branch, path);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("GitHub raw request to {} failed: {}", url, e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            bail!("GitHub raw request failed (HTTP {}) for {}", status, path);
        }

        Ok(resp.text().await?)
    }

    fn web_url(&self, repo: &str, branch: &str, path: &str) -> String {
        format!("{}/{}/blob/{}/{}", self.web_base, repo, branch, path)
    }
}
