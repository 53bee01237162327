//! Error types for patchfleet-github

use patchfleet_store::StoreError;
use thiserror::Error;

/// Errors raised while setting up the GitHub client
#[derive(Error, Debug)]
pub enum GithubError {
    /// API base URL could not be parsed or cannot carry path segments
    #[error("Invalid API URL {url}: {reason}")]
    InvalidApiUrl { url: String, reason: String },

    /// The HTTP client could not be built
    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),
}

impl From<reqwest::Error> for GithubError {
    fn from(err: reqwest::Error) -> Self {
        GithubError::ClientSetup(err.to_string())
    }
}

/// Map a failed request (no response received) to a store error.
pub(crate) fn transport_error(err: reqwest::Error, what: &str) -> StoreError {
    if err.is_timeout() {
        StoreError::Timeout(what.to_string())
    } else if err.is_decode() {
        StoreError::Decode(format!("{what}: {err}"))
    } else {
        StoreError::Transport(format!("{what}: {err}"))
    }
}

/// Map a non-success HTTP status to a store error.
///
/// GitHub reports an exhausted primary rate limit as `403` with
/// `x-ratelimit-remaining: 0`, and secondary limits as `429`.
pub(crate) fn status_error(
    status: u16,
    rate_limit_exhausted: bool,
    what: &str,
    message: String,
) -> StoreError {
    match status {
        404 => StoreError::not_found(what),
        409 | 422 => StoreError::conflict(what, message),
        429 => StoreError::RateLimited(format!("{what}: {message}")),
        403 if rate_limit_exhausted => StoreError::RateLimited(format!("{what}: {message}")),
        401 | 403 => StoreError::PermissionDenied(format!("{what}: {message}")),
        _ => StoreError::Api { status, message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_not_found() {
        let err = status_error(404, false, "branch fix", "Not Found".into());
        assert!(err.is_not_found());
    }

    #[test]
    fn test_sha_mismatch_maps_to_conflict() {
        let err = status_error(409, false, "bar.txt", "does not match abc".into());
        assert!(matches!(err, StoreError::Conflict { ref detail, .. } if detail.contains("abc")));
        assert!(status_error(422, false, "foo.txt", "sha wasn't supplied".into()).is_conflict());
    }

    #[test]
    fn test_rate_limit_detection() {
        assert!(matches!(
            status_error(403, true, "search", "API rate limit exceeded".into()),
            StoreError::RateLimited(_)
        ));
        assert!(matches!(
            status_error(429, false, "search", "secondary".into()),
            StoreError::RateLimited(_)
        ));
        assert!(matches!(
            status_error(403, false, "search", "Resource not accessible".into()),
            StoreError::PermissionDenied(_)
        ));
    }

    #[test]
    fn test_other_status_is_api_error() {
        let err = status_error(502, false, "pulls", "Bad Gateway".into());
        assert_eq!(
            err,
            StoreError::Api {
                status: 502,
                message: "Bad Gateway".into()
            }
        );
    }
}
