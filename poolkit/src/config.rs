//! Aggregate configuration for all three pools.

use std::path::Path;

use poolkit_core::PoolError;
use poolkit_http::HttpPoolConfig;
use poolkit_p2p::P2pConfig;
use poolkit_pool::PoolConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration document covering every pool in a node.
///
/// Each section is optional in JSON and falls back to its defaults, as do
/// the fields within a section. Durations are written in milliseconds.
///
/// ```json
/// {
///   "resource": { "min_connections": 5, "max_connections": 50 },
///   "http": { "max_idle_conns_per_host": 10, "request_timeout": 60000 },
///   "p2p": { "max_connections_per_peer": 5, "idle_timeout": 300000 }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolkitConfig {
    /// Generic resource pool settings.
    pub resource: PoolConfig,
    /// HTTP connection pool settings.
    pub http: HttpPoolConfig,
    /// P2P connection pool settings.
    pub p2p: P2pConfig,
}

impl PoolkitConfig {
    /// Parse a configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, PoolError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PoolError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        debug!(path = %path.display(), "loaded pool configuration");
        Ok(config)
    }

    /// Reject settings that cannot be reconciled by defaulting.
    ///
    /// Zero values are not errors: each pool replaces them with defaults when
    /// it is constructed. Contradictory bounds are.
    pub fn validate(&self) -> Result<(), PoolError> {
        let resource = &self.resource;
        if resource.max_connections != 0 && resource.min_connections > resource.max_connections {
            return Err(PoolError::invalid_config(format!(
                "resource.min_connections ({}) exceeds resource.max_connections ({})",
                resource.min_connections, resource.max_connections
            )));
        }

        let http = &self.http;
        if http.max_idle_conns != 0 && http.max_idle_conns_per_host > http.max_idle_conns {
            return Err(PoolError::invalid_config(format!(
                "http.max_idle_conns_per_host ({}) exceeds http.max_idle_conns ({})",
                http.max_idle_conns_per_host, http.max_idle_conns
            )));
        }

        let p2p = &self.p2p;
        if !p2p.max_retry_backoff.is_zero() && p2p.retry_backoff > p2p.max_retry_backoff {
            return Err(PoolError::invalid_config(format!(
                "p2p.retry_backoff ({:?}) exceeds p2p.max_retry_backoff ({:?})",
                p2p.retry_backoff, p2p.max_retry_backoff
            )));
        }

        Ok(())
    }
}
