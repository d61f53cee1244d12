//! Retry with exponential back-off and jitter for outbound provider calls.
//!
//! [`retry_with_backoff`] wraps any fallible async operation and retries on
//! transient errors (network failures, 429, 5xx). Credential and parse errors
//! are returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::SentimentError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:**
/// - Network-level failures: timeout, connection reset.
/// - HTTP 429 and 5xx responses.
///
/// **Not retriable:**
/// - [`SentimentError::Unauthorized`]: the key is wrong; retrying won't fix it.
/// - [`SentimentError::Api`] with a 4xx status.
/// - [`SentimentError::Deserialize`] / [`SentimentError::Xml`]: malformed response.
pub(crate) fn is_retriable(err: &SentimentError) -> bool {
    match err {
        SentimentError::Http(e) => {
            e.is_timeout()
                || e.is_connect()
                || e.status()
                    .is_some_and(|s| s.is_server_error() || s.as_u16() == 429)
        }
        SentimentError::RateLimited { .. } => true,
        SentimentError::Api { status, .. } => *status >= 500,
        SentimentError::Unauthorized { .. }
        | SentimentError::Blocked { .. }
        | SentimentError::Deserialize { .. }
        | SentimentError::Xml(_)
        | SentimentError::InvalidBaseUrl { .. }
        | SentimentError::Location(_) => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
///
/// Back-off schedule with `backoff_base_ms = 2_000`:
///
/// | Attempt | Sleep before next attempt        |
/// |---------|----------------------------------|
/// | 1       | 2 000 ms × 2⁰ ± 25 % jitter     |
/// | 2       | 2 000 ms × 2¹ ± 25 % jitter     |
/// | 3       | 2 000 ms × 2² ± 25 % jitter     |
///
/// Delay is capped at 60 s. Non-retriable errors are returned immediately.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, SentimentError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SentimentError>>,
{
    const MAX_DELAY_MS: u64 = 60_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient provider error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
