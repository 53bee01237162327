//! Per-call deadlines for remote operations.

use std::future::Future;
use std::time::Duration;

use patchfleet_store::StoreResult;

use crate::domain::{PatchError, Result};

/// Run one remote call, failing with `PatchError::Timeout` if it does not
/// finish within `limit`. Expiry is final; the call is not retried.
pub async fn bounded<T, F>(operation: &str, limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(PatchError::from),
        Err(_) => Err(PatchError::Timeout {
            operation: operation.to_string(),
            after_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}
