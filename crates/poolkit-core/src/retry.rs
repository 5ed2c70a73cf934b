//! Retry policy for resource creation.
//!
//! Pool configurations carry `max_retries` and backoff settings. Creation
//! retries are opt-in: a [`RetryPolicy::disabled`] policy runs the operation
//! exactly once, which is the default for every pool.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::PoolError;

/// Configuration for exponential backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoff {
    /// Initial delay before first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier applied after each retry.
    pub multiplier: f64,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff configuration.
    #[must_use]
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial_delay: initial,
            max_delay: max.max(initial),
            multiplier: 2.0,
        }
    }

    /// Set the multiplier.
    #[must_use]
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    /// Calculate delay for attempt number (0-indexed).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(base.min(self.max_delay.as_secs_f64()))
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30))
    }
}

/// Decides whether and how often a failed creation is retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Whether retries are performed at all.
    pub enabled: bool,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay schedule between attempts.
    pub backoff: ExponentialBackoff,
}

impl RetryPolicy {
    /// A policy that retries up to `max_retries` times.
    #[must_use]
    pub fn new(max_retries: u32, backoff: ExponentialBackoff) -> Self {
        Self {
            enabled: true,
            max_retries,
            backoff,
        }
    }

    /// A policy that runs the operation once.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            max_retries: 0,
            backoff: ExponentialBackoff::default(),
        }
    }

    /// Total number of attempts this policy allows.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        if self.enabled {
            self.max_retries.saturating_add(1)
        } else {
            1
        }
    }

    /// Run `operation`, retrying retryable failures with backoff.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut attempt_fn: F) -> Result<T, PoolError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PoolError>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 0;

        loop {
            match attempt_fn().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(operation, attempt, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if attempt + 1 < max_attempts && e.is_retryable() => {
                    let delay = self.backoff.delay_for_attempt(attempt);
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        max_attempts,
                        error = %e,
                        ?delay,
                        "operation failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}
