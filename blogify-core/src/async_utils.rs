//! Async utilities

use crate::error::{BlogifyError, BlogifyResult, ErrorContext};
use tokio::time::{timeout, Duration};
use tracing::warn;

/// Bound an async operation by `timeout_ms`, mapping expiry to `BlogifyError::Timeout`
pub async fn with_timeout<F, T>(future: F, timeout_ms: u64, operation_name: &str) -> BlogifyResult<T>
where
    F: std::future::Future<Output = T>,
{
    match timeout(Duration::from_millis(timeout_ms), future).await {
        Ok(result) => Ok(result),
        Err(_) => {
            warn!(
                operation = operation_name,
                timeout_ms, "Operation timed out"
            );
            Err(BlogifyError::Timeout {
                operation: operation_name.to_string(),
                duration_ms: timeout_ms,
                context: ErrorContext::new("async_utils")
                    .with_operation("timeout")
                    .with_metadata("timeout_ms", &timeout_ms.to_string())
                    .with_suggestion("Check the availability of the backing store"),
            })
        }
    }
}
