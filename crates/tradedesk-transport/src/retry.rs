//! Exponential backoff for retryable backend calls.

use std::future::Future;
use std::time::Duration;

use crate::{FailedCall, classify, is_retryable_error};

/// Delay before the first retry.
pub const BASE_RETRY_DELAY: Duration = Duration::from_millis(1_000);

/// Upper bound on any single retry delay.
pub const MAX_RETRY_DELAY: Duration = Duration::from_millis(16_000);

/// Delay before retry number `attempt` (zero-based):
/// `min(1000 * 2^attempt, 16000)` milliseconds.
///
/// ```rust
/// use std::time::Duration;
/// use tradedesk_transport::retry_delay;
///
/// assert_eq!(retry_delay(0), Duration::from_millis(1_000));
/// assert_eq!(retry_delay(3), Duration::from_millis(8_000));
/// assert_eq!(retry_delay(10), Duration::from_millis(16_000));
/// ```
pub fn retry_delay(attempt: u32) -> Duration {
    let base = BASE_RETRY_DELAY.as_millis() as u64;
    let max = MAX_RETRY_DELAY.as_millis() as u64;
    let millis = 2u64
        .checked_pow(attempt)
        .and_then(|factor| base.checked_mul(factor))
        .map_or(max, |ms| ms.min(max));
    Duration::from_millis(millis)
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or has
/// been retried `max_retries` times.
///
/// Waits [`retry_delay`] between attempts. The last failure is returned
/// unchanged so the caller can classify it itself.
pub async fn with_retry<T, F, Fut>(max_retries: u32, mut op: F) -> Result<T, FailedCall>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FailedCall>>,
{
    let mut attempt = 0u32;
    loop {
        let failed = match op().await {
            Ok(value) => return Ok(value),
            Err(failed) => failed,
        };

        let classified = classify(&failed);
        if attempt >= max_retries || !is_retryable_error(&classified) {
            return Err(failed);
        }

        let delay = retry_delay(attempt);
        tracing::debug!(
            attempt,
            kind = %classified.kind,
            delay_ms = delay.as_millis() as u64,
            "retrying backend call"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
