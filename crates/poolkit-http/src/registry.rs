//! Named registry of independently configured HTTP pools.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use poolkit_core::PoolError;
use tracing::{debug, warn};

use crate::config::HttpPoolConfig;
use crate::pool::HttpConnectionPool;
use crate::stats::HttpPoolStats;

/// Keeps one [`HttpConnectionPool`] per logical name.
///
/// Pools are created lazily with the same double-checked locking the pools
/// use for their host clients.
#[derive(Debug)]
pub struct HttpClientPool {
    default_config: HttpPoolConfig,
    pools: RwLock<HashMap<String, Arc<HttpConnectionPool>>>,
}

impl HttpClientPool {
    /// Create a registry whose pools default to `default_config`.
    #[must_use]
    pub fn new(default_config: HttpPoolConfig) -> Self {
        Self {
            default_config,
            pools: RwLock::new(HashMap::new()),
        }
    }

    /// Get the pool registered under `name`.
    pub fn get_pool(&self, name: &str) -> Option<Arc<HttpConnectionPool>> {
        self.pools
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    /// Get the pool registered under `name`, creating it with `config` (or
    /// the registry default) when absent.
    ///
    /// `config` is ignored when the pool already exists.
    pub fn get_or_create(
        &self,
        name: &str,
        config: Option<HttpPoolConfig>,
    ) -> Result<Arc<HttpConnectionPool>, PoolError> {
        if let Some(pool) = self.get_pool(name) {
            return Ok(pool);
        }

        let mut pools = self.pools.write().unwrap_or_else(|e| e.into_inner());
        if let Some(pool) = pools.get(name) {
            return Ok(Arc::clone(pool));
        }

        let config = config.unwrap_or_else(|| self.default_config.clone());
        let pool = Arc::new(HttpConnectionPool::new(config)?);
        pools.insert(name.to_string(), Arc::clone(&pool));
        debug!(name, "registered HTTP pool");
        Ok(pool)
    }

    /// Remove and close the pool registered under `name`.
    pub fn remove(&self, name: &str) -> Option<Arc<HttpConnectionPool>> {
        let pool = self
            .pools
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(name)?;
        if let Err(e) = pool.close() {
            warn!(name, error = %e, "failed to close removed HTTP pool");
        }
        Some(pool)
    }

    /// Names of the registered pools, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .pools
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Statistics of every registered pool, keyed by name.
    pub fn stats(&self) -> BTreeMap<String, HttpPoolStats> {
        self.pools
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(name, pool)| (name.clone(), pool.stats()))
            .collect()
    }

    /// Close every registered pool and empty the registry.
    pub fn close_all(&self) -> Result<(), PoolError> {
        let drained: Vec<_> = self
            .pools
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .drain()
            .collect();

        let mut first_error = None;
        for (name, pool) in drained {
            if let Err(e) = pool.close() {
                warn!(name = %name, error = %e, "failed to close HTTP pool");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Default for HttpClientPool {
    fn default() -> Self {
        Self::new(HttpPoolConfig::default())
    }
}
