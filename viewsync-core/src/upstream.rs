//! Bounded collaborator calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{Operation, ServiceError, ServiceResult, SyncError};

/// Awaits one collaborator call, bounded by `limit`, and maps its failure to a
/// [`SyncError`] tagged with `operation`.
///
/// Failures are logged at `warn`; the terminal `error` belongs to the entry point.
pub async fn call<T, F>(operation: Operation, limit: Duration, fut: F) -> Result<T, SyncError>
where
    F: Future<Output = ServiceResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(ServiceError::NotFound(what))) => {
            warn!(%operation, what = %what, "Upstream reported not found");
            Err(SyncError::NotFound { operation, what })
        }
        Ok(Err(ServiceError::Failed(source))) => {
            warn!(%operation, error = %source, "Upstream call failed");
            Err(SyncError::Upstream { operation, source })
        }
        Err(_) => {
            warn!(%operation, timeout_ms = limit.as_millis() as u64, "Upstream call timed out");
            Err(SyncError::UpstreamTimeout {
                operation,
                timeout: limit,
            })
        }
    }
}
