//! Remote document source abstraction.
//!
//! A [`RemoteSource`] lists the skill documents present in a repository at
//! a branch and fetches their raw text. The GitHub implementation lives in
//! the native crate; tests use scripted in-memory sources.

use anyhow::Result;
use async_trait::async_trait;

/// The resolved file listing of a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTree {
    /// Commit the branch pointed at when the tree was listed.
    pub commit_sha: String,
    /// Paths of every skill document, in listing order.
    pub paths: Vec<String>,
}

#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Resolve `branch` to a commit and list every skill document path in
    /// its recursive tree.
    ///
    /// Any failure here aborts the whole sync run.
    async fn list_skill_paths(&self, repo: &str, branch: &str) -> Result<RemoteTree>;

    /// Fetch the raw text of one document. Failures are isolated to the
    /// document.
    async fn fetch_document(&self, repo: &str, branch: &str, path: &str) -> Result<String>;

    /// Browser URL for a document, recorded on synced records.
    fn web_url(&self, repo: &str, branch: &str, path: &str) -> String {
        format!("https://github.com/{}/blob/{}/{}", repo, branch, path)
    }
}
