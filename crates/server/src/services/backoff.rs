//! Bounded exponential backoff for rate-limited remote calls.
//!
//! Only 429 responses are retried; every other remote failure surfaces
//! immediately and becomes an error sentinel in the sheet.

use std::time::Duration;

use rand::Rng;

/// Total attempts per call, the first one included.
pub const MAX_ATTEMPTS: u32 = 3;

const BASE_DELAY_MS: u64 = 500;

/// Implemented by client errors that can signal a 429.
pub trait RateLimit {
    /// Whether this error is a rate-limit response.
    fn is_rate_limit(&self) -> bool;

    /// Server-provided `Retry-After` delay, when one was sent.
    fn retry_after(&self) -> Option<Duration>;
}

/// Parse the `Retry-After` header of a 429 response, in whole seconds.
pub fn retry_after_secs(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// Run `op`, retrying up to [`MAX_ATTEMPTS`] times on rate-limit errors.
///
/// The delay honors the server's `Retry-After` when present, otherwise
/// doubles from 500ms with jitter.
///
/// # Errors
///
/// Returns the operation's error unchanged once attempts are exhausted or
/// for any non-rate-limit failure.
pub async fn retry_rate_limited<T, E, F, Fut>(what: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RateLimit + std::fmt::Display,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Err(err) if err.is_rate_limit() && attempt + 1 < MAX_ATTEMPTS => {
                attempt += 1;
                let delay = err.retry_after().unwrap_or_else(|| backoff_delay(attempt));
                tracing::warn!(
                    error = %err,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "{what} rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
            }
            other => return other,
        }
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let exponential = BASE_DELAY_MS.saturating_mul(1 << attempt.min(6));
    let jitter = rand::rng().random_range(0..=BASE_DELAY_MS / 2);
    Duration::from_millis(exponential.saturating_add(jitter))
}
