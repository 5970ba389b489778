//! Per-call deadlines for store operations.

use std::future::Future;
use std::time::Duration;

use super::error::{Result, ServiceError};

/// Awaits a store call, failing with [`ServiceError::Timeout`] if it takes
/// longer than `after`.
///
/// A call that times out is reported as failed even though the remote side
/// may still complete it; callers must not assume either outcome.
pub async fn bounded<T, E, F>(
    operation: &'static str,
    after: Duration,
    call: F,
    map_err: impl FnOnce(E) -> ServiceError,
) -> Result<T>
where
    F: Future<Output = std::result::Result<T, E>>,
{
    match tokio::time::timeout(after, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(map_err(err)),
        Err(_) => {
            tracing::warn!(operation, timeout_ms = after.as_millis() as u64, "Store call timed out");
            Err(ServiceError::Timeout { operation, after })
        }
    }
}
