//! Error taxonomy for the patch pipeline.

use patchfleet_store::StoreError;
use serde::{Deserialize, Serialize};

/// Errors produced while parsing, applying or committing a patch.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// Bad user input: credentials, selection buffer, empty diff.
    #[error("input error: {0}")]
    Input(String),

    #[error("malformed diff at line {line}: {reason}")]
    DiffParse { line: usize, reason: String },

    /// A hunk's context or removed lines do not match the prior content.
    #[error("patch does not apply to {path} (hunk {hunk}): {reason}")]
    PatchDoesNotApply {
        path: String,
        hunk: usize,
        reason: String,
    },

    /// A file the diff modifies or deletes is absent on the branch.
    #[error("{path} does not exist on branch {branch}")]
    MissingFile { path: String, branch: String },

    /// Stale version token, path already exists, or ref already exists.
    #[error("conflict on {path}: {detail}")]
    Conflict { path: String, detail: String },

    #[error("{operation} timed out after {after_ms} ms")]
    Timeout { operation: String, after_ms: u64 },

    #[error("remote error: {0}")]
    Remote(#[from] StoreError),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification used in reports and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Input,
    Conflict,
    NotFound,
    Transport,
    Unsupported,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Input => "input",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Transport => "transport",
            ErrorKind::Unsupported => "unsupported",
        };
        f.write_str(s)
    }
}

impl PatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PatchError::Input(_) | PatchError::DiffParse { .. } | PatchError::Io(_) => {
                ErrorKind::Input
            }
            PatchError::PatchDoesNotApply { .. } | PatchError::Conflict { .. } => {
                ErrorKind::Conflict
            }
            PatchError::MissingFile { .. } => ErrorKind::NotFound,
            PatchError::Timeout { .. } => ErrorKind::Transport,
            PatchError::Unsupported(_) => ErrorKind::Unsupported,
            PatchError::Remote(e) => match e {
                StoreError::NotFound { .. } => ErrorKind::NotFound,
                StoreError::Conflict { .. } => ErrorKind::Conflict,
                StoreError::Unsupported(_) => ErrorKind::Unsupported,
                StoreError::PermissionDenied(_)
                | StoreError::RateLimited(_)
                | StoreError::Timeout(_)
                | StoreError::Transport(_)
                | StoreError::Api { .. }
                | StoreError::Decode(_) => ErrorKind::Transport,
            },
        }
    }
}

/// Result type for patch operations.
pub type Result<T> = std::result::Result<T, PatchError>;
