//! P2P pool configuration.

use std::time::Duration;

use poolkit_core::{ExponentialBackoff, RetryPolicy, duration_serde};
use serde::{Deserialize, Serialize};

/// Configuration for a [`P2pConnectionPool`](crate::P2pConnectionPool).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct P2pConfig {
    /// Concurrent sends allowed on one peer connection.
    pub max_connections_per_peer: usize,
    /// Deadline for establishing a peer connection.
    #[serde(with = "duration_serde")]
    pub connection_timeout: Duration,
    /// A connected peer unused for this long is reported as idle.
    #[serde(with = "duration_serde")]
    pub keep_alive_interval: Duration,
    /// Period of the background health-check pass.
    #[serde(with = "duration_serde")]
    pub health_check_interval: Duration,
    /// Deadline for a single probe during a health check.
    #[serde(with = "duration_serde")]
    pub health_check_timeout: Duration,
    /// Retries after a failed connect when retrying is enabled.
    pub max_retries: u32,
    /// Initial delay between connect attempts.
    #[serde(with = "duration_serde")]
    pub retry_backoff: Duration,
    /// Upper bound on the delay between connect attempts.
    #[serde(with = "duration_serde")]
    pub max_retry_backoff: Duration,
    /// Connections unused for this long are evicted.
    #[serde(with = "duration_serde")]
    pub idle_timeout: Duration,
    /// Connections older than this are evicted.
    #[serde(with = "duration_serde")]
    pub max_lifetime: Duration,
    /// Whether failed connects are retried at all.
    pub retry_on_connect: bool,
}

impl P2pConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the concurrent send limit per peer.
    #[must_use]
    pub const fn max_connections_per_peer(mut self, max: usize) -> Self {
        self.max_connections_per_peer = max;
        self
    }

    /// Set the connect deadline.
    #[must_use]
    pub const fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the keep-alive interval.
    #[must_use]
    pub const fn keep_alive_interval(mut self, interval: Duration) -> Self {
        self.keep_alive_interval = interval;
        self
    }

    /// Set the health check interval.
    #[must_use]
    pub const fn health_check_interval(mut self, interval: Duration) -> Self {
        self.health_check_interval = interval;
        self
    }

    /// Set the probe deadline.
    #[must_use]
    pub const fn health_check_timeout(mut self, timeout: Duration) -> Self {
        self.health_check_timeout = timeout;
        self
    }

    /// Set the maximum number of connect retries.
    #[must_use]
    pub const fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the initial and maximum delay between connect attempts.
    #[must_use]
    pub const fn retry_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.retry_backoff = initial;
        self.max_retry_backoff = max;
        self
    }

    /// Set the idle timeout.
    #[must_use]
    pub const fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the maximum connection lifetime.
    #[must_use]
    pub const fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    /// Enable or disable retrying failed connects.
    #[must_use]
    pub const fn retry_on_connect(mut self, enabled: bool) -> Self {
        self.retry_on_connect = enabled;
        self
    }

    /// Return a copy with zero values replaced by defaults.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();
        if self.max_connections_per_peer == 0 {
            self.max_connections_per_peer = defaults.max_connections_per_peer;
        }
        for (value, default) in [
            (&mut self.connection_timeout, defaults.connection_timeout),
            (&mut self.keep_alive_interval, defaults.keep_alive_interval),
            (&mut self.health_check_interval, defaults.health_check_interval),
            (&mut self.health_check_timeout, defaults.health_check_timeout),
            (&mut self.retry_backoff, defaults.retry_backoff),
            (&mut self.max_retry_backoff, defaults.max_retry_backoff),
            (&mut self.idle_timeout, defaults.idle_timeout),
            (&mut self.max_lifetime, defaults.max_lifetime),
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

    /// The connect retry policy described by this configuration.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        if self.retry_on_connect {
            RetryPolicy::new(
                self.max_retries,
                ExponentialBackoff::new(self.retry_backoff, self.max_retry_backoff),
            )
        } else {
            RetryPolicy::disabled()
        }
    }
}

impl Default for P2pConfig {
    fn default() -> Self {
        Self {
            max_connections_per_peer: 5,
            connection_timeout: Duration::from_secs(10),
            keep_alive_interval: Duration::from_secs(30),
            health_check_interval: Duration::from_secs(60),
            health_check_timeout: Duration::from_secs(5),
            max_retries: 3,
            retry_backoff: Duration::from_secs(1),
            max_retry_backoff: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(300),
            max_lifetime: Duration::from_secs(1800),
            retry_on_connect: false,
        }
    }
}
