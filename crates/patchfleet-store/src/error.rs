//! Error types for patchfleet-store

use thiserror::Error;

/// Errors returned by a remote repository host.
///
/// `NotFound` is the only variant callers are expected to branch on; every
/// other variant is fatal to the repository being patched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The addressed resource (branch, file, repository) does not exist
    #[error("not found: {resource}")]
    NotFound { resource: String },

    /// Optimistic-concurrency or uniqueness violation (stale version token,
    /// path already exists, ref already exists)
    #[error("conflict on {resource}: {detail}")]
    Conflict { resource: String, detail: String },

    /// Authentication or authorization failure
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The host throttled the request
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The request did not complete within its deadline
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Connection-level failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Any other non-success response from the host
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Payload could not be decoded (bad base64, unexpected JSON shape)
    #[error("decode error: {0}")]
    Decode(String),

    /// The host does not support the requested operation
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

impl StoreError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        StoreError::NotFound {
            resource: resource.into(),
        }
    }

    pub fn conflict(resource: impl Into<String>, detail: impl Into<String>) -> Self {
        StoreError::Conflict {
            resource: resource.into(),
            detail: detail.into(),
        }
    }

    /// `true` for the expected "absent" outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// `true` for optimistic-concurrency and uniqueness violations.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_displays_resource_and_detail() {
        let err = StoreError::conflict("org/app:bar.txt", "sha does not match");
        let msg = err.to_string();
        assert!(msg.contains("org/app:bar.txt"));
        assert!(msg.contains("sha does not match"));
        assert!(err.is_conflict());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_not_found_is_classified() {
        assert!(StoreError::not_found("branch fix-typo").is_not_found());
        assert!(!StoreError::Timeout("GET /repos".into()).is_not_found());
    }
}
