//! Folio Client Retry
//!
//! Exponential backoff around store requests.
//!
//! @version 0.1.0
//! @author Folio Development Team

use folio_common::{FolioError, RetryConfig};
use std::future::Future;
use tracing::warn;

/// Run `op`, retrying retryable failures with exponential backoff. The last
/// error is returned once `policy.max_retries` retries are spent; other
/// errors are returned immediately.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryConfig,
    operation: &str,
    mut op: F,
) -> Result<T, FolioError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FolioError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_retries => {
                let delay = policy.delay_for_attempt(attempt);
                attempt += 1;
                warn!(
                    operation,
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Retrying store request"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
