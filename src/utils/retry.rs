//! Retry utilities for resilient transport calls
//!
//! Exponential backoff with a caller-supplied predicate deciding which errors
//! are worth another attempt.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,

    /// Base delay in milliseconds for exponential backoff
    pub base_delay_ms: u64,

    /// Maximum delay in milliseconds (caps exponential growth)
    pub max_delay_ms: u64,

    /// Multiplier for exponential backoff (default: 2.0)
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with custom max retries
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Create a retry configuration with custom delays
    pub fn with_delays(max_retries: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms,
            backoff_multiplier: 2.0,
        }
    }

    /// Calculate delay for a given attempt using exponential backoff
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay_ms = if attempt == 0 {
            0
        } else {
            let exponential =
                self.base_delay_ms as f64 * self.backoff_multiplier.powi((attempt - 1) as i32);
            (exponential as u64).min(self.max_delay_ms)
        };

        Duration::from_millis(delay_ms)
    }
}

/// Execute an operation with retry logic, using a custom retry predicate
///
/// Errors rejected by `should_retry` are returned immediately. When every
/// attempt fails, the last error is returned.
///
/// # Example
///
/// ```no_run
/// use ytmeta::utils::retry::{with_retry_if, RetryConfig};
///
/// async fn fetch_data() -> Result<String, std::io::Error> {
///     Ok("data".to_string())
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let config = RetryConfig::default();
///     let result = with_retry_if(
///         &config,
///         || async { fetch_data().await },
///         |e| e.kind() == std::io::ErrorKind::TimedOut,
///     )
///     .await;
///     assert!(result.is_ok());
/// }
/// ```
pub async fn with_retry_if<T, E, F, Fut, P>(
    config: &RetryConfig,
    operation: F,
    should_retry: P,
) -> Result<T, E>
where
    E: Display,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = config.calculate_delay(attempt);
            debug!(
                attempt = attempt,
                delay_ms = delay.as_millis(),
                "Retrying operation after delay"
            );
            tokio::time::sleep(delay).await;
        }

        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(attempt = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) => {
                if !should_retry(&e) {
                    warn!(error = %e, "Non-retryable error encountered");
                    return Err(e);
                }

                if attempt >= config.max_retries {
                    warn!(
                        attempt = attempt,
                        max_retries = config.max_retries,
                        error = %e,
                        "Retries exhausted"
                    );
                    return Err(e);
                }

                warn!(
                    attempt = attempt,
                    max_retries = config.max_retries,
                    error = %e,
                    "Operation failed, will retry"
                );
                attempt += 1;
            }
        }
    }
}
