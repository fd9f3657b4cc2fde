//! Bounded retry with configurable pauses
//!
//! This module provides the retry primitive used by every file transfer. A policy is
//! described by [`RetryConfig`]: a total number of attempts, the pause after the first
//! failure, an optional backoff multiplier (1.0 keeps the pause fixed), a cap, and
//! optional jitter. No pause follows the final failed attempt.
//!
//! # Example
//!
//! ```no_run
//! use model_harvest::retry::{IsRetryable, with_retry};
//! use model_harvest::config::RetryConfig;
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
//! let value = with_retry(&config, |_attempt| async {
//!     // Your operation here
//!     Ok::<_, MyError>(42)
//! })
//! .await
//! .into_result()?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::{Error, FetchError, TransferError};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (network errors, server errors) should return `true`.
/// Permanent failures (local disk errors, undecodable payloads) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network { .. } => true,
            // Any HTTP error status is worth another try, including 4xx from CDNs
            FetchError::Status { .. } => true,
            FetchError::Decode { .. } => false,
        }
    }
}

impl IsRetryable for TransferError {
    fn is_retryable(&self) -> bool {
        match self {
            TransferError::Remote(e) => e.is_retryable(),
            TransferError::Local { .. } => false,
        }
    }
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Fetch(e) => e.is_retryable(),
            Error::Io(_) | Error::IoAt { .. } => false,
            Error::Config { .. } => false,
            Error::Serialization(_) => false,
            Error::ExternalTool(_) => false,
            Error::Other(_) => false,
        }
    }
}

/// Result of running an operation under a retry policy
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    /// The operation eventually succeeded
    Succeeded {
        /// Value returned by the successful attempt
        value: T,
        /// Number of attempts made, including the successful one
        attempts: u32,
    },
    /// The operation failed for good
    Failed {
        /// Error of the last attempt
        error: E,
        /// Number of attempts made
        attempts: u32,
    },
}

impl<T, E> RetryOutcome<T, E> {
    /// Number of attempts that were made
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Succeeded { attempts, .. } | RetryOutcome::Failed { attempts, .. } => {
                *attempts
            }
        }
    }

    /// Drop the attempt count and return a plain `Result`
    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryOutcome::Succeeded { value, .. } => Ok(value),
            RetryOutcome::Failed { error, .. } => Err(error),
        }
    }
}

/// Execute an async operation under the given retry policy
///
/// The operation receives the 1-based attempt number. A retryable error is followed by
/// a pause (see [`pause_before_retry`]) and another attempt, until `max_attempts`
/// attempts have been made. A non-retryable error ends the loop immediately.
///
/// # Arguments
///
/// * `config` - Retry configuration (attempts, delays, backoff multiplier, jitter)
/// * `operation` - Async closure that returns `Result<T, E>` where `E` implements `IsRetryable`
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "Operation succeeded after retry");
                }
                return RetryOutcome::Succeeded {
                    value,
                    attempts: attempt,
                };
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = pause_before_retry(config, attempt);

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    delay_ms = delay.as_millis(),
                    "Attempt failed, retrying"
                );

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt,
                        "Attempt failed, all retry attempts exhausted"
                    );
                } else {
                    tracing::error!(
                        error = %e,
                        attempt = attempt,
                        "Attempt failed with non-retryable error"
                    );
                }
                return RetryOutcome::Failed {
                    error: e,
                    attempts: attempt,
                };
            }
        }
    }
}

/// Pause that follows the `failed_attempt`-th failure (1-based)
///
/// `delay * backoff_multiplier^(failed_attempt - 1)`, capped at `max_delay`, then
/// jittered if enabled.
pub fn pause_before_retry(config: &RetryConfig, failed_attempt: u32) -> Duration {
    let exponent = failed_attempt.saturating_sub(1) as i32;
    let scaled = config.delay.as_secs_f64() * config.backoff_multiplier.powi(exponent);
    let base = if scaled.is_finite() {
        Duration::from_secs_f64(scaled).min(config.max_delay)
    } else {
        config.max_delay
    };

    if config.jitter { add_jitter(base) } else { base }
}

/// Add random jitter to a delay
///
/// Jitter is uniformly distributed between 0% and 100% of the delay, so the actual
/// delay lies between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    let jittered_secs = delay.as_secs_f64() * (1.0 + jitter_factor);
    Duration::from_secs_f64(jittered_secs)
}
