//! Retry logic with exponential backoff
//!
//! Used by the HTTP client to retry a single logical request. This is
//! independent of the scheduler's cycle backoff: the client retries within
//! one request, the scheduler backs off across whole poll cycles.
//!
//! # Example
//!
//! ```no_run
//! use gdelt_dl::retry::{IsRetryable, with_retry};
//! use gdelt_dl::config::RetryConfig;
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! let shutdown = CancellationToken::new();
//! with_retry(&config, &shutdown, || async { Ok::<_, MyError>(()) }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::RequestError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Server statuses worth retrying within a single request
pub const RETRYABLE_STATUSES: [u16; 4] = [500, 502, 503, 504];

/// Trait for errors that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for RequestError {
    fn is_retryable(&self) -> bool {
        match self {
            RequestError::Status { status, .. } => RETRYABLE_STATUSES.contains(status),
            // Connect failures, timeouts and reset connections
            RequestError::Transport { .. } => true,
            RequestError::Cancelled { .. } => false,
        }
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// The operation runs once, then up to `config.max_attempts` more times
/// while it fails with a retryable error. Delays start at
/// `config.initial_delay`, grow by `config.backoff_multiplier` and never
/// exceed `config.max_delay` (before jitter).
///
/// Cancelling `shutdown` ends a pending backoff sleep at once.
///
/// Returns the successful result or the last error.
pub async fn with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    shutdown: &CancellationToken,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay.min(config.max_delay);

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::debug!(attempts = attempt + 1, "request succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                attempt += 1;

                tracing::debug!(
                    error = %e,
                    attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis(),
                    "request failed, retrying"
                );

                let wait = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => {
                        tracing::debug!(error = %e, attempt, "retry abandoned on shutdown");
                        return Err(e);
                    }
                    _ = tokio::time::sleep(wait) => {}
                }

                let next_delay =
                    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next_delay.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::debug!(
                        error = %e,
                        attempts = attempt + 1,
                        "request failed after all retry attempts exhausted"
                    );
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// The result lies between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
