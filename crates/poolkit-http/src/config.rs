//! HTTP pool configuration and transport construction.

use std::time::Duration;

use poolkit_core::{PoolError, duration_serde};
use serde::{Deserialize, Serialize};

/// Configuration for an [`HttpConnectionPool`](crate::HttpConnectionPool).
///
/// The knobs are applied to the shared `reqwest` transport. `reqwest` keeps
/// no global idle cap, so `max_idle_conns` only bounds the per-host value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpPoolConfig {
    /// Idle keep-alive connections kept per host.
    pub max_idle_conns_per_host: usize,
    /// Idle keep-alive connections kept across all hosts.
    pub max_idle_conns: usize,
    /// Concurrent requests per host; 0 means unlimited.
    pub max_conns_per_host: usize,
    /// Idle transport connections and host clients are dropped after this long.
    #[serde(with = "duration_serde")]
    pub idle_conn_timeout: Duration,
    /// TCP connect deadline.
    #[serde(with = "duration_serde")]
    pub dial_timeout: Duration,
    /// TCP keep-alive interval.
    #[serde(with = "duration_serde")]
    pub keep_alive: Duration,
    /// TLS handshake deadline, added to the connect deadline.
    #[serde(with = "duration_serde")]
    pub tls_handshake_timeout: Duration,
    /// Deadline for the server to start responding.
    #[serde(with = "duration_serde")]
    pub response_header_timeout: Duration,
    /// Deadline for a whole request.
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,
    /// Allow HTTP/2; when false the transport speaks HTTP/1.1 only.
    pub enable_http2: bool,
    /// Transparently request and decode gzip bodies.
    pub enable_compression: bool,
    /// Reuse connections between requests.
    pub enable_keep_alive: bool,
}

impl HttpPoolConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-host idle connection limit.
    #[must_use]
    pub const fn max_idle_conns_per_host(mut self, max: usize) -> Self {
        self.max_idle_conns_per_host = max;
        self
    }

    /// Set the total idle connection limit.
    #[must_use]
    pub const fn max_idle_conns(mut self, max: usize) -> Self {
        self.max_idle_conns = max;
        self
    }

    /// Set the concurrent request limit per host.
    #[must_use]
    pub const fn max_conns_per_host(mut self, max: usize) -> Self {
        self.max_conns_per_host = max;
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub const fn idle_conn_timeout(mut self, timeout: Duration) -> Self {
        self.idle_conn_timeout = timeout;
        self
    }

    /// Set the dial timeout.
    #[must_use]
    pub const fn dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    /// Set the TCP keep-alive interval.
    #[must_use]
    pub const fn keep_alive(mut self, interval: Duration) -> Self {
        self.keep_alive = interval;
        self
    }

    /// Set the TLS handshake timeout.
    #[must_use]
    pub const fn tls_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.tls_handshake_timeout = timeout;
        self
    }

    /// Set the response header timeout.
    #[must_use]
    pub const fn response_header_timeout(mut self, timeout: Duration) -> Self {
        self.response_header_timeout = timeout;
        self
    }

    /// Set the whole-request timeout.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Enable or disable HTTP/2.
    #[must_use]
    pub const fn enable_http2(mut self, enabled: bool) -> Self {
        self.enable_http2 = enabled;
        self
    }

    /// Enable or disable gzip compression.
    #[must_use]
    pub const fn enable_compression(mut self, enabled: bool) -> Self {
        self.enable_compression = enabled;
        self
    }

    /// Enable or disable connection reuse.
    #[must_use]
    pub const fn enable_keep_alive(mut self, enabled: bool) -> Self {
        self.enable_keep_alive = enabled;
        self
    }

    /// Return a copy with zero limits and durations replaced by defaults.
    ///
    /// `max_conns_per_host` is left alone since zero means unlimited.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();
        if self.max_idle_conns == 0 {
            self.max_idle_conns = defaults.max_idle_conns;
        }
        if self.max_idle_conns_per_host == 0 {
            self.max_idle_conns_per_host = defaults.max_idle_conns_per_host;
        }
        for (value, default) in [
            (&mut self.idle_conn_timeout, defaults.idle_conn_timeout),
            (&mut self.dial_timeout, defaults.dial_timeout),
            (&mut self.keep_alive, defaults.keep_alive),
            (&mut self.tls_handshake_timeout, defaults.tls_handshake_timeout),
            (&mut self.response_header_timeout, defaults.response_header_timeout),
            (&mut self.request_timeout, defaults.request_timeout),
        ] {
            if value.is_zero() {
                *value = default;
            }
        }
        self
    }

    /// Idle connections kept per host by the transport.
    #[must_use]
    pub fn effective_idle_per_host(&self) -> usize {
        if self.enable_keep_alive {
            self.max_idle_conns_per_host.min(self.max_idle_conns)
        } else {
            0
        }
    }

    /// Build the shared transport described by this configuration.
    pub fn build_transport(&self) -> Result<reqwest::Client, PoolError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(self.dial_timeout + self.tls_handshake_timeout)
            .read_timeout(self.response_header_timeout)
            .timeout(self.request_timeout)
            .pool_idle_timeout(self.idle_conn_timeout)
            .pool_max_idle_per_host(self.effective_idle_per_host())
            .gzip(self.enable_compression);

        builder = if self.enable_keep_alive {
            builder.tcp_keepalive(self.keep_alive)
        } else {
            builder.tcp_keepalive(None::<Duration>)
        };
        if !self.enable_http2 {
            builder = builder.http1_only();
        }

        builder
            .build()
            .map_err(|e| PoolError::invalid_config(format!("failed to build HTTP transport: {e}")))
    }
}

impl Default for HttpPoolConfig {
    fn default() -> Self {
        Self {
            max_idle_conns_per_host: 10,
            max_idle_conns: 100,
            max_conns_per_host: 0,
            idle_conn_timeout: Duration::from_secs(90),
            dial_timeout: Duration::from_secs(30),
            keep_alive: Duration::from_secs(30),
            tls_handshake_timeout: Duration::from_secs(10),
            response_header_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(60),
            enable_http2: true,
            enable_compression: true,
            enable_keep_alive: true,
        }
    }
}
