//! The per-peer connection pool.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use poolkit_core::{BackgroundTasks, ErrorKind, PoolError, RetryPolicy, StatsCell};
use tokio::sync::{OnceCell, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::P2pConfig;
use crate::connection::{PeerConnection, PeerConnectionInfo};
use crate::connector::{PeerConnector, StaticAddressConnector};
use crate::stats::P2pStats;

/// At most one connection record per peer, aged out by background passes.
///
/// There is no global cap; the map is bounded by `idle_timeout` and
/// `max_lifetime`. Records are shared and never returned to the pool.
pub struct P2pConnectionPool {
    shared: Arc<Shared>,
    tasks: BackgroundTasks,
    started: AtomicBool,
}

struct Shared {
    config: P2pConfig,
    connector: Box<dyn PeerConnector>,
    retry: RetryPolicy,
    connections: RwLock<HashMap<String, Arc<PeerConnection>>>,
    /// Connects in flight, one cell per peer. Callers for the same peer
    /// share the cell; the map lock is never held while connecting.
    connecting: Mutex<HashMap<String, PendingConnect>>,
    stopped: AtomicBool,
    stats: StatsCell<P2pStats>,
}

type PendingConnect = Arc<OnceCell<Arc<PeerConnection>>>;

impl P2pConnectionPool {
    /// Create a pool that assigns placeholder `peer-<id>` addresses.
    #[must_use]
    pub fn new(config: P2pConfig) -> Self {
        Self::with_connector(config, StaticAddressConnector)
    }

    /// Create a pool driving links through `connector`.
    #[must_use]
    pub fn with_connector<C>(config: P2pConfig, connector: C) -> Self
    where
        C: PeerConnector,
    {
        let config = config.normalized();
        let retry = config.retry_policy();
        Self {
            shared: Arc::new(Shared {
                config,
                connector: Box::new(connector),
                retry,
                connections: RwLock::new(HashMap::new()),
                connecting: Mutex::new(HashMap::new()),
                stopped: AtomicBool::new(false),
                stats: StatsCell::new(P2pStats::new()),
            }),
            tasks: BackgroundTasks::new(),
            started: AtomicBool::new(false),
        }
    }

    /// Get the pool configuration.
    pub fn config(&self) -> &P2pConfig {
        &self.shared.config
    }

    /// Get a snapshot of the pool statistics.
    pub async fn stats(&self) -> P2pStats {
        let keep_alive = self.shared.config.keep_alive_interval;
        let idle = self
            .shared
            .connections
            .read()
            .await
            .values()
            .filter(|c| c.is_connected() && c.last_used().elapsed() > keep_alive)
            .count();
        let mut stats = self.shared.stats.snapshot();
        stats.idle_connections = idle;
        stats
    }

    /// Number of peer records currently held.
    pub async fn peer_count(&self) -> usize {
        self.shared.connections.read().await.len()
    }

    /// Per-peer snapshots, keyed by peer id.
    pub async fn connection_stats(&self) -> BTreeMap<String, PeerConnectionInfo> {
        self.shared
            .connections
            .read()
            .await
            .iter()
            .map(|(peer_id, conn)| (peer_id.clone(), conn.info()))
            .collect()
    }

    /// Get the connection to `peer_id`, connecting when there is none or the
    /// existing record is down.
    pub async fn get_connection(&self, peer_id: &str) -> Result<Arc<PeerConnection>, PoolError> {
        if self.tasks.is_shutdown() {
            return Err(PoolError::Closed);
        }
        self.shared.get_connection(peer_id).await
    }

    /// Send `payload` to `peer_id`, connecting first if needed.
    pub async fn send_message(&self, peer_id: &str, payload: &[u8]) -> Result<(), PoolError> {
        let shared = &self.shared;
        let conn = self.get_connection(peer_id).await?;

        let _permit = conn
            .limiter
            .acquire()
            .await
            .map_err(|_| PoolError::peer(peer_id, PoolError::Closed))?;

        let started = Instant::now();
        match shared.connector.send(&conn, payload).await {
            Ok(()) => {
                conn.record_sent(payload.len());
                let elapsed = started.elapsed();
                shared.stats.update(|s| {
                    s.messages_sent += 1;
                    s.bytes_sent += payload.len() as u64;
                    s.average_latency = elapsed;
                    s.last_activity = Some(Utc::now());
                });
                Ok(())
            }
            Err(e) => {
                conn.record_error();
                shared.stats.update(|s| match e.kind() {
                    ErrorKind::Timeout => s.timeout_errors += 1,
                    ErrorKind::Connection => s.connection_errors += 1,
                    _ => s.protocol_errors += 1,
                });
                debug!(peer_id, error = %e, "send failed");
                Err(PoolError::peer(peer_id, e))
            }
        }
    }

    /// Record `payload` as received from `peer_id`.
    ///
    /// Creates a record for an unknown peer. Never fails; a peer that cannot
    /// be connected still has the message counted pool-wide.
    pub async fn receive_message(&self, peer_id: &str, payload: &[u8]) {
        if self.tasks.is_shutdown() {
            return;
        }
        let shared = &self.shared;

        let existing = shared.connections.read().await.get(peer_id).cloned();
        let conn = match existing {
            Some(conn) => Some(conn),
            None => shared.connect(peer_id).await.ok(),
        };
        if let Some(conn) = conn {
            conn.record_received(payload.len());
        }

        shared.stats.update(|s| {
            s.messages_received += 1;
            s.bytes_received += payload.len() as u64;
            s.last_activity = Some(Utc::now());
        });
    }

    /// Mark the link to `peer_id` down. The record is removed by the next
    /// health-check or cleanup pass. Returns `false` for an unknown peer.
    pub async fn disconnect(&self, peer_id: &str) -> bool {
        let conn = self.shared.connections.read().await.get(peer_id).cloned();
        match conn {
            Some(conn) => {
                self.shared.retire(&conn).await;
                true
            }
            None => false,
        }
    }

    /// Run one health-check pass.
    pub async fn health_check(&self) {
        self.shared.health_check().await;
    }

    /// Run one cleanup pass. Returns the number of records removed.
    pub async fn cleanup(&self) -> usize {
        self.shared.cleanup().await
    }

    /// Launch the health-check and cleanup tasks.
    pub fn start(&self) -> Result<(), PoolError> {
        if self.started.swap(true, Ordering::SeqCst) || self.tasks.is_shutdown() {
            return Err(PoolError::AlreadyStarted);
        }
        let config = &self.shared.config;

        let shared = Arc::clone(&self.shared);
        self.tasks
            .spawn_periodic("p2p-health-check", config.health_check_interval, move || {
                let shared = Arc::clone(&shared);
                async move { shared.health_check().await }
            });

        let shared = Arc::clone(&self.shared);
        self.tasks
            .spawn_periodic("p2p-cleanup", config.cleanup_interval(), move || {
                let shared = Arc::clone(&shared);
                async move {
                    shared.cleanup().await;
                }
            });

        info!(
            idle_timeout = ?config.idle_timeout,
            max_lifetime = ?config.max_lifetime,
            "P2P connection pool started"
        );
        Ok(())
    }

    /// Stop the background tasks, then close and remove every record.
    ///
    /// Later lookups fail with [`PoolError::Closed`]. Calling `stop` again
    /// does nothing.
    pub async fn stop(&self) {
        let first = !self.tasks.is_shutdown();
        self.tasks.shutdown().await;
        self.shared.stopped.store(true, Ordering::SeqCst);

        let drained: Vec<_> = {
            let mut connections = self.shared.connections.write().await;
            connections.drain().map(|(_, conn)| conn).collect()
        };
        self.shared.lock_connecting().clear();
        let closed = drained.len();
        for conn in &drained {
            self.shared.retire(conn).await;
        }
        self.shared.stats.update(|s| s.total_connections = 0);

        if first {
            info!(closed, "P2P connection pool stopped");
        }
    }
}

impl Drop for P2pConnectionPool {
    fn drop(&mut self) {
        self.tasks.shutdown_token().cancel();
    }
}

impl std::fmt::Debug for P2pConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("P2pConnectionPool")
            .field("config", &self.shared.config)
            .field("started", &self.started.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Shared {
    async fn get_connection(&self, peer_id: &str) -> Result<Arc<PeerConnection>, PoolError> {
        let existing = self.connections.read().await.get(peer_id).cloned();
        if let Some(conn) = existing.filter(|c| c.is_connected()) {
            conn.touch();
            self.stats.update(|s| s.last_activity = Some(Utc::now()));
            return Ok(conn);
        }
        self.connect(peer_id).await
    }

    fn lock_connecting(&self) -> MutexGuard<'_, HashMap<String, PendingConnect>> {
        self.connecting.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Connect to `peer_id`, or join a connect already in flight for it.
    ///
    /// A failed attempt leaves the cell empty, so the next waiter on it tries
    /// again. The cell leaves the map once it holds a record.
    async fn connect(&self, peer_id: &str) -> Result<Arc<PeerConnection>, PoolError> {
        let pending = Arc::clone(
            self.lock_connecting()
                .entry(peer_id.to_string())
                .or_default(),
        );

        let conn = pending
            .get_or_try_init(|| self.establish(peer_id))
            .await
            .map(Arc::clone)?;

        let mut connecting = self.lock_connecting();
        if connecting
            .get(peer_id)
            .is_some_and(|c| Arc::ptr_eq(c, &pending))
        {
            connecting.remove(peer_id);
        }
        Ok(conn)
    }

    async fn establish(&self, peer_id: &str) -> Result<Arc<PeerConnection>, PoolError> {
        let existing = self.connections.read().await.get(peer_id).cloned();
        if let Some(conn) = existing.filter(|c| c.is_connected()) {
            conn.touch();
            return Ok(conn);
        }

        let started = Instant::now();
        let timeout = self.config.connection_timeout;
        let connector = &self.connector;
        let stats = &self.stats;
        let result = self
            .retry
            .run("connect", move || async move {
                match tokio::time::timeout(timeout, connector.connect(peer_id)).await {
                    Ok(result) => result,
                    Err(_) => {
                        stats.update(|s| s.timeout_errors += 1);
                        Err(PoolError::timeout("connect", timeout))
                    }
                }
            })
            .await;

        let address = match result {
            Ok(address) => address,
            Err(e) => {
                self.stats.update(|s| s.failed_connections += 1);
                warn!(peer_id, error = %e, "failed to connect to peer");
                return Err(PoolError::peer(peer_id, e));
            }
        };

        let conn = Arc::new(PeerConnection::new(
            peer_id,
            address,
            self.config.max_connections_per_peer,
        ));

        let total = {
            let mut connections = self.connections.write().await;
            if self.stopped.load(Ordering::SeqCst) {
                None
            } else {
                // a record found above is already down, so replacing it frees no slot
                connections.insert(peer_id.to_string(), Arc::clone(&conn));
                Some(connections.len())
            }
        };
        let Some(total) = total else {
            conn.close();
            self.connector.disconnect(&conn).await;
            return Err(PoolError::Closed);
        };

        let elapsed = started.elapsed();
        self.stats.update(|s| {
            s.connections_created += 1;
            s.active_connections += 1;
            s.total_connections = total;
            s.average_connect_time = elapsed;
            s.last_activity = Some(Utc::now());
        });
        debug!(peer_id, address = conn.address(), "connected to peer");
        Ok(conn)
    }

    /// Mark `conn` down and tear down its link. Safe to call more than once.
    async fn retire(&self, conn: &PeerConnection) {
        if conn.close() {
            self.stats
                .update(|s| s.active_connections = s.active_connections.saturating_sub(1));
            self.connector.disconnect(conn).await;
        }
    }

    async fn probe(&self, conn: &PeerConnection) -> bool {
        let timeout = self.config.health_check_timeout;
        match tokio::time::timeout(timeout, self.connector.probe(conn)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                debug!(peer_id = conn.peer_id(), error = %e, "peer probe failed");
                false
            }
            Err(_) => {
                self.stats.update(|s| s.timeout_errors += 1);
                false
            }
        }
    }

    async fn health_check(&self) {
        let snapshot: Vec<_> = self.connections.read().await.values().cloned().collect();
        let (idle_timeout, max_lifetime) = (self.config.idle_timeout, self.config.max_lifetime);

        let mut failed_probe = Vec::new();
        for conn in snapshot {
            if conn.is_healthy(idle_timeout, max_lifetime) && !self.probe(&conn).await {
                failed_probe.push(conn);
            }
        }

        // Age and idleness are judged under the lock; a send during the
        // probes above keeps its record.
        let (evicted, total) = {
            let mut connections = self.connections.write().await;
            let mut evicted = Vec::new();
            connections.retain(|_, conn| {
                let due = !conn.is_healthy(idle_timeout, max_lifetime)
                    || failed_probe.iter().any(|f| Arc::ptr_eq(f, conn));
                if due {
                    evicted.push(Arc::clone(conn));
                }
                !due
            });
            (evicted, connections.len())
        };

        let count = evicted.len();
        for conn in &evicted {
            self.retire(conn).await;
            debug!(peer_id = conn.peer_id(), "health check evicted peer");
        }
        if count > 0 {
            self.stats.update(|s| {
                s.connection_errors += count as u64;
                s.connections_evicted += count as u64;
                s.total_connections = total;
            });
        }
    }

    async fn cleanup(&self) -> usize {
        let (idle_timeout, max_lifetime) = (self.config.idle_timeout, self.config.max_lifetime);
        let (evicted, total) = {
            let mut connections = self.connections.write().await;
            let mut evicted = Vec::new();
            connections.retain(|_, conn| {
                let keep = conn.is_healthy(idle_timeout, max_lifetime);
                if !keep {
                    evicted.push(Arc::clone(conn));
                }
                keep
            });
            (evicted, connections.len())
        };
        self.lock_connecting()
            .retain(|_, pending| Arc::strong_count(pending) > 1);

        let count = evicted.len();
        for conn in &evicted {
            self.retire(conn).await;
        }
        self.stats.update(|s| {
            s.connections_evicted += count as u64;
            s.total_connections = total;
        });
        if count > 0 {
            debug!(evicted = count, "P2P cleanup removed peers");
        }
        count
    }
}
