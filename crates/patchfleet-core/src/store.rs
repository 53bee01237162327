//! Versioned file access on one branch of one repository.
//!
//! `FileStore` wraps a `ContentStore` with the pipeline's view of files:
//! UTF-8 text, absent-is-a-value reads, per-call deadlines, and store
//! conflicts mapped to `PatchError::Conflict` with the file path attached.

use std::time::Duration;

use patchfleet_store::{CommitRef, ContentStore, FileTarget, RepoRef, StoreError, VersionToken};

use crate::deadline::bounded;
use crate::diff::split_lines;
use crate::domain::{PatchError, Result};

/// A text file read from the remote, with the token for a conditioned write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFile {
    pub path: String,
    pub text: String,
    pub version: VersionToken,
}

impl TextFile {
    pub fn lines(&self) -> Vec<String> {
        split_lines(&self.text)
    }
}

/// Files on `branch` of `repo`.
pub struct FileStore<'a, H: ?Sized> {
    host: &'a H,
    repo: &'a RepoRef,
    branch: &'a str,
    call_timeout: Duration,
}

impl<'a, H> FileStore<'a, H>
where
    H: ContentStore + ?Sized,
{
    pub fn new(host: &'a H, repo: &'a RepoRef, branch: &'a str, call_timeout: Duration) -> Self {
        FileStore {
            host,
            repo,
            branch,
            call_timeout,
        }
    }

    pub fn branch(&self) -> &str {
        self.branch
    }

    /// Current content of `path`, or `None` when it does not exist.
    pub async fn read(&self, path: &str) -> Result<Option<TextFile>> {
        let file = bounded(
            &format!("read {path}"),
            self.call_timeout,
            self.host.read_file(self.repo, self.branch, path),
        )
        .await?;

        let Some(file) = file else {
            return Ok(None);
        };
        let text = String::from_utf8(file.content).map_err(|_| {
            PatchError::Unsupported(format!("{path} is not UTF-8 text"))
        })?;
        Ok(Some(TextFile {
            path: file.path,
            text,
            version: file.version,
        }))
    }

    /// Like [`read`](Self::read), but a missing file is an error.
    pub async fn read_existing(&self, path: &str) -> Result<TextFile> {
        self.read(path).await?.ok_or_else(|| PatchError::MissingFile {
            path: path.to_string(),
            branch: self.branch.to_string(),
        })
    }

    /// Create `path`; conflicts if it already exists.
    pub async fn create(&self, path: &str, content: &str, message: &str) -> Result<CommitRef> {
        let target = self.target(path, message);
        let call = self.host.create_file(self.repo, target, content.as_bytes());
        self.finish(path, bounded(&format!("create {path}"), self.call_timeout, call).await)
    }

    /// Replace `path`, conditioned on `version` still being current.
    pub async fn update(
        &self,
        path: &str,
        content: &str,
        message: &str,
        version: &VersionToken,
    ) -> Result<CommitRef> {
        let target = self.target(path, message);
        let call = self
            .host
            .update_file(self.repo, target, content.as_bytes(), version);
        self.finish(path, bounded(&format!("update {path}"), self.call_timeout, call).await)
    }

    /// Remove `path`, conditioned on `version` still being current.
    pub async fn delete(
        &self,
        path: &str,
        message: &str,
        version: &VersionToken,
    ) -> Result<CommitRef> {
        let target = self.target(path, message);
        let call = self.host.delete_file(self.repo, target, version);
        self.finish(path, bounded(&format!("delete {path}"), self.call_timeout, call).await)
    }

    fn target<'t>(&'t self, path: &'t str, message: &'t str) -> FileTarget<'t> {
        FileTarget {
            branch: self.branch,
            path,
            message,
        }
    }

    fn finish(&self, path: &str, result: Result<CommitRef>) -> Result<CommitRef> {
        result.map_err(|err| match err {
            PatchError::Remote(StoreError::Conflict { detail, .. }) => PatchError::Conflict {
                path: format!("{}:{}", self.repo.full_name(), path),
                detail,
            },
            PatchError::Remote(StoreError::NotFound { .. }) => PatchError::MissingFile {
                path: path.to_string(),
                branch: self.branch.to_string(),
            },
            other => other,
        })
    }
}
