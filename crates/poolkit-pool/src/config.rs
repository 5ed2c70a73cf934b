//! Generic pool configuration.

use std::time::Duration;

use poolkit_core::{ExponentialBackoff, RetryPolicy, duration_serde};
use serde::{Deserialize, Serialize};

/// Configuration for a [`ResourcePool`](crate::ResourcePool).
///
/// Zero durations and a zero maximum are replaced with defaults when the pool
/// is built; a minimum above the maximum is clamped. See [`PoolConfig::normalized`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Resources created by `start()` and kept through idle eviction.
    pub min_connections: usize,
    /// Upper bound on active plus idle resources.
    pub max_connections: usize,
    /// Deadline for a single `create()` call.
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
    /// Idle resources above the minimum are closed after this long.
    #[serde(with = "duration_serde")]
    pub idle_timeout: Duration,
    /// Idle resources older than this are closed.
    #[serde(with = "duration_serde")]
    pub max_lifetime: Duration,
    /// Period of the background health-check pass.
    #[serde(with = "duration_serde")]
    pub health_check_interval: Duration,
    /// Deadline for a single `validate()` call.
    #[serde(with = "duration_serde")]
    pub health_check_timeout: Duration,
    /// Retries after a failed `create()` when retrying is enabled.
    pub max_retries: u32,
    /// Initial delay between creation attempts.
    #[serde(with = "duration_serde")]
    pub retry_interval: Duration,
    /// Whether failed creations are retried at all.
    pub retry_on_create: bool,
}

impl PoolConfig {
    /// Create a new pool configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum number of resources.
    #[must_use]
    pub const fn min_connections(mut self, min: usize) -> Self {
        self.min_connections = min;
        self
    }

    /// Set the maximum number of resources.
    #[must_use]
    pub const fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the creation deadline.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the idle timeout.
    #[must_use]
    pub const fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the maximum resource lifetime.
    #[must_use]
    pub const fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    /// Set the health check interval.
    #[must_use]
    pub const fn health_check_interval(mut self, interval: Duration) -> Self {
        self.health_check_interval = interval;
        self
    }

    /// Set the validation deadline used by health checks.
    #[must_use]
    pub const fn health_check_timeout(mut self, timeout: Duration) -> Self {
        self.health_check_timeout = timeout;
        self
    }

    /// Set the maximum number of creation retries.
    #[must_use]
    pub const fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the initial delay between creation attempts.
    #[must_use]
    pub const fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Enable or disable retrying failed creations.
    #[must_use]
    pub const fn retry_on_create(mut self, enabled: bool) -> Self {
        self.retry_on_create = enabled;
        self
    }

    /// Return a copy with zero values defaulted and `min` clamped to `max`.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();
        if self.max_connections == 0 {
            self.max_connections = defaults.max_connections;
        }
        self.min_connections = self.min_connections.min(self.max_connections);
        for (value, default) in [
            (&mut self.connect_timeout, defaults.connect_timeout),
            (&mut self.idle_timeout, defaults.idle_timeout),
            (&mut self.max_lifetime, defaults.max_lifetime),
            (&mut self.health_check_interval, defaults.health_check_interval),
            (&mut self.health_check_timeout, defaults.health_check_timeout),
            (&mut self.retry_interval, defaults.retry_interval),
        ] {
            if value.is_zero() {
                *value = default;
            }
        }
        self
    }

    /// Period of the cleanup pass: half the idle timeout.
    #[must_use]
    pub fn cleanup_interval(&self) -> Duration {
        self.idle_timeout / 2
    }

    /// The creation retry policy described by this configuration.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        if self.retry_on_create {
            RetryPolicy::new(
                self.max_retries,
                ExponentialBackoff::new(self.retry_interval, self.retry_interval * 30),
            )
        } else {
            RetryPolicy::disabled()
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: 5,
            max_connections: 50,
            connect_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(300),
            max_lifetime: Duration::from_secs(1800),
            health_check_interval: Duration::from_secs(30),
            health_check_timeout: Duration::from_secs(5),
            max_retries: 3,
            retry_interval: Duration::from_secs(1),
            retry_on_create: false,
        }
    }
}
