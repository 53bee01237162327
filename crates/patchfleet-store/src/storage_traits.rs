//! Remote host trait definitions for patchfleet
//!
//! The hosting service is modelled as four narrow capabilities:
//! - `RepositorySearch`: find candidate repositories
//! - `BranchStore`: read branches and create branch refs
//! - `ContentStore`: versioned get/create/update/delete of single files
//! - `PullRequestStore`: open (and look up) pull requests
//!
//! `RemoteHost` bundles all four. Every trait is async and backend-agnostic;
//! an in-memory implementation lives in the `fakes` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::StoreError;

/// Result type for remote host operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Data model
// ---------------------------------------------------------------------------

/// Identity of a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    /// Owning user or organization
    pub owner: String,
    /// Repository name
    pub name: String,
    /// Name of the default branch (pull request base)
    pub default_branch: String,
}

impl RepoRef {
    pub fn new(owner: &str, name: &str, default_branch: &str) -> Self {
        RepoRef {
            owner: owner.to_string(),
            name: name.to_string(),
            default_branch: default_branch.to_string(),
        }
    }

    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A named branch and the commit it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub head_sha: String,
}

/// Opaque content version token (blob SHA) required by conditional writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(token: impl Into<String>) -> Self {
        VersionToken(token.into())
    }

    /// Derive a token from file bytes, git-blob style (`blob <len>\0<bytes>`).
    pub fn for_content(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(format!("blob {}\0", content.len()).as_bytes());
        hasher.update(content);
        VersionToken(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VersionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A file as currently stored on a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub path: String,
    /// Decoded bytes
    pub content: Vec<u8>,
    /// Token to pass to `update_file` / `delete_file`
    pub version: VersionToken,
}

/// The commit produced by a file write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRef {
    pub sha: String,
    pub url: Option<String>,
}

/// Branch, path and commit message addressed by a single file write.
#[derive(Debug, Clone, Copy)]
pub struct FileTarget<'a> {
    pub branch: &'a str,
    pub path: &'a str,
    pub message: &'a str,
}

/// Request body for opening a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPullRequest {
    pub title: String,
    pub head: String,
    pub base: String,
    pub body: String,
}

/// An open pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    /// Human-facing URL
    pub url: String,
    pub head: String,
    pub base: String,
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Repository discovery.
#[async_trait]
pub trait RepositorySearch: Send + Sync {
    /// Return at most `limit` repositories matching `query`.
    async fn search_repositories(&self, query: &str, limit: u32) -> StoreResult<Vec<RepoRef>>;
}

/// Branch lookup and creation.
///
/// Guarantees:
/// - `get_branch` returns `StoreError::NotFound` for a missing branch.
/// - `create_branch_ref` returns `StoreError::Conflict` if the ref exists.
#[async_trait]
pub trait BranchStore: Send + Sync {
    async fn get_branch(&self, repo: &RepoRef, name: &str) -> StoreResult<Branch>;

    async fn create_branch_ref(&self, repo: &RepoRef, name: &str, sha: &str) -> StoreResult<()>;
}

/// Versioned single-file storage within a branch.
///
/// Guarantees:
/// - `read_file` returns `Ok(None)` when the path is absent.
/// - `create_file` fails with `Conflict` if the path already exists.
/// - `update_file` / `delete_file` fail with `Conflict` when `version` is not
///   the file's current token, leaving the stored content unchanged, and with
///   `NotFound` when the path is absent.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn read_file(
        &self,
        repo: &RepoRef,
        branch: &str,
        path: &str,
    ) -> StoreResult<Option<RemoteFile>>;

    async fn create_file(
        &self,
        repo: &RepoRef,
        target: FileTarget<'_>,
        content: &[u8],
    ) -> StoreResult<CommitRef>;

    async fn update_file(
        &self,
        repo: &RepoRef,
        target: FileTarget<'_>,
        content: &[u8],
        version: &VersionToken,
    ) -> StoreResult<CommitRef>;

    async fn delete_file(
        &self,
        repo: &RepoRef,
        target: FileTarget<'_>,
        version: &VersionToken,
    ) -> StoreResult<CommitRef>;
}

/// Pull request creation.
#[async_trait]
pub trait PullRequestStore: Send + Sync {
    async fn create_pull_request(
        &self,
        repo: &RepoRef,
        request: &NewPullRequest,
    ) -> StoreResult<PullRequest>;

    /// The open pull request from `head` into `base`, if one exists.
    async fn find_open_pull_request(
        &self,
        repo: &RepoRef,
        head: &str,
        base: &str,
    ) -> StoreResult<Option<PullRequest>>;
}

/// Everything the patch pipeline needs from a hosting service.
pub trait RemoteHost: RepositorySearch + BranchStore + ContentStore + PullRequestStore {}

impl<T> RemoteHost for T where T: RepositorySearch + BranchStore + ContentStore + PullRequestStore {}
