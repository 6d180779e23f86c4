//! Retries for reads that fail because of the network.

use std::{future::Future, time::Duration};

use crate::error::RelayError;

/// How transient failures are retried at the point of failure.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// The number of attempts, including the first one.
    pub max_attempts: u32,
    /// The delay before the first retry, in milliseconds.
    pub initial_backoff_ms: u64,
    /// The upper bound for the doubling delay, in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 500,
            max_backoff_ms: 10_000,
        }
    }
}

impl RetryConfig {
    /// The delay before the first retry.
    #[must_use]
    pub const fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    /// The upper bound for the retry delay.
    #[must_use]
    pub const fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

/// Runs `operation` until it succeeds, fails with a non-transient error, or runs out of
/// attempts.
///
/// Only errors for which [`RelayError::is_transient`] holds are retried; the delay doubles after
/// every failure, capped at [`RetryConfig::max_backoff`].
///
/// # Errors
/// Returns the last error if the operation does not succeed.
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    operation: &str,
    mut f: F,
) -> Result<T, RelayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RelayError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut backoff = config.initial_backoff();
    let mut attempt = 1;

    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < max_attempts => {
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts,
                    backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "Transient failure, retrying"
                );
                tokio::time::sleep(backoff).await;
                backoff = backoff.saturating_mul(2).min(config.max_backoff());
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
