//! Bounded retries with exponential backoff.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Delay before the first retry. Each later retry doubles it.
pub const BASE_DELAY: Duration = Duration::from_millis(1000);

/// Waits between attempts.
///
/// Production code sleeps on the tokio timer; tests substitute an
/// implementation that records the requested delays.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Wait for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How many times to retry, and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts allowed after the first one
    pub max_retries: u32,
    /// Delay before retry 0
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Policy with the default 1s base delay.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: BASE_DELAY,
        }
    }

    /// Set the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Delay after the failed 0-indexed `attempt`: `2^attempt * base_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Total attempts including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2)
    }
}

/// Run `op` until it succeeds or the policy is exhausted.
///
/// `op` receives the 0-indexed attempt number. Errors that retrying cannot
/// fix are returned unchanged; once every attempt has failed the last error
/// is wrapped in [`Error::PublishExhausted`].
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    name: &str,
    mut op: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) if attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                log::warn!(
                    "Upload failed for {} (attempt {}): {}. Retrying after {}ms",
                    name,
                    attempt + 1,
                    err,
                    delay.as_millis()
                );
                sleeper.sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                log::error!("All retries failed for {}: {}", name, err);
                return Err(Error::PublishExhausted {
                    name: name.to_string(),
                    attempts: attempt + 1,
                    cause: Box::new(err),
                });
            }
        }
    }
}
