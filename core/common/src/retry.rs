// core/common/src/retry.rs
// Bounded exponential backoff for startup connections

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

const MAX_DELAY_MS: u64 = 10_000;

/// Run `operation` until it succeeds or `max_attempts` is reached,
/// doubling the delay after each failure. The last error is returned.
pub async fn retry_with_backoff<F, Fut, T, E>(
    name: &str,
    mut operation: F,
    max_attempts: u32,
    initial_delay_ms: u64,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = max_attempts.max(1);
    let mut delay_ms = initial_delay_ms;
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= max_attempts => {
                tracing::error!(dependency = name, attempts = attempt, error = %e, "Giving up");
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(
                    dependency = name,
                    attempt = attempt,
                    retry_in_ms = delay_ms,
                    error = %e,
                    "Connection attempt failed"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                delay_ms = delay_ms.saturating_mul(2).min(MAX_DELAY_MS);
                attempt += 1;
            }
        }
    }
}
