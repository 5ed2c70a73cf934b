//! The per-host HTTP client pool.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use chrono::Utc;
use poolkit_core::{BackgroundTasks, HttpErrorKind, PoolError, StatsCell};
use reqwest::{Method, Request, RequestBuilder, Response, Url};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::client::{HostClient, host_key};
use crate::config::HttpPoolConfig;
use crate::stats::HttpPoolStats;

/// One long-lived client per destination host over one shared transport.
///
/// Clients are created lazily and at most once per host. Because every
/// client shares the pool's transport, the transport's keep-alive limits are
/// the real bound on open connections.
pub struct HttpConnectionPool {
    shared: Arc<Shared>,
    tasks: BackgroundTasks,
    started: AtomicBool,
}

struct Shared {
    config: HttpPoolConfig,
    transport: RwLock<reqwest::Client>,
    clients: RwLock<HashMap<String, Arc<HostClient>>>,
    stats: StatsCell<HttpPoolStats>,
}

impl HttpConnectionPool {
    /// Create a pool. The configuration is normalized first.
    pub fn new(config: HttpPoolConfig) -> Result<Self, PoolError> {
        let config = config.normalized();
        let transport = config.build_transport()?;
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                transport: RwLock::new(transport),
                clients: RwLock::new(HashMap::new()),
                stats: StatsCell::new(HttpPoolStats::new()),
            }),
            tasks: BackgroundTasks::new(),
            started: AtomicBool::new(false),
        })
    }

    /// Get the pool configuration.
    pub fn config(&self) -> &HttpPoolConfig {
        &self.shared.config
    }

    /// Get a snapshot of the pool statistics.
    pub fn stats(&self) -> HttpPoolStats {
        self.shared.stats.snapshot()
    }

    /// Number of host clients currently held.
    pub fn client_count(&self) -> usize {
        self.shared.read_clients().len()
    }

    /// Get the client for `host`, creating it on first use.
    pub fn get_client(&self, host: &str) -> Arc<HostClient> {
        self.shared.get_client(host)
    }

    /// Start a request through the client for `url`'s host.
    ///
    /// Send the built request with [`execute`](Self::execute) so that it is
    /// counted and subject to the per-host limit.
    pub fn request(&self, method: Method, url: &str) -> Result<RequestBuilder, PoolError> {
        let url = Url::parse(url).map_err(|e| {
            PoolError::http(HttpErrorKind::Request, format!("invalid URL {url:?}: {e}"))
        })?;
        let client = self.shared.get_client(&host_key(&url)?);
        Ok(client.client().request(method, url))
    }

    /// Execute a GET request for `url`.
    pub async fn get(&self, url: &str) -> Result<Response, PoolError> {
        let request = self
            .request(Method::GET, url)?
            .build()
            .map_err(|e| request_error(&e))?;
        self.execute(request).await
    }

    /// Execute `request` through the client for its host.
    ///
    /// Only transport failures count as failed requests; an error status
    /// from the server is still a successful round trip.
    pub async fn execute(&self, request: Request) -> Result<Response, PoolError> {
        let shared = &self.shared;
        let host = host_key(request.url())?;
        let client = shared.get_client(&host);
        let _permit = client.permit().await?;

        let started = Instant::now();
        let result = client.client().execute(request).await;
        let elapsed = started.elapsed();

        let failure = result.as_ref().err().map(classify);
        shared.stats.update(|s| {
            s.total_requests += 1;
            s.average_response_time = elapsed;
            s.last_activity = Some(Utc::now());
            match failure {
                None => s.successful_requests += 1,
                Some(kind) => {
                    s.failed_requests += 1;
                    match kind {
                        HttpErrorKind::Timeout => s.timeout_errors += 1,
                        HttpErrorKind::Dns => s.dns_errors += 1,
                        HttpErrorKind::Connection | HttpErrorKind::Request => {
                            s.connection_errors += 1;
                        }
                    }
                }
            }
        });

        result.map_err(|e| {
            let kind = failure.unwrap_or(HttpErrorKind::Connection);
            debug!(host = %host, error = %e, "request failed");
            PoolError::Http {
                kind,
                message: format!("request to {host} failed: {e}"),
                source: Some(Box::new(e)),
            }
        })
    }

    /// Drop every pooled transport connection and every host client.
    ///
    /// The shared transport is rebuilt, so the pool stays usable.
    pub fn close_idle_connections(&self) -> Result<(), PoolError> {
        let released = self.shared.reset()?;
        debug!(released, "closed idle HTTP connections");
        Ok(())
    }

    /// Release all connections and host clients.
    pub fn close(&self) -> Result<(), PoolError> {
        self.shared.reset().map(drop)
    }

    /// Launch the cleanup task that drops host clients idle for longer
    /// than `idle_conn_timeout`.
    pub fn start(&self) -> Result<(), PoolError> {
        if self.started.swap(true, Ordering::SeqCst) || self.tasks.is_shutdown() {
            return Err(PoolError::AlreadyStarted);
        }
        let interval = self.shared.config.idle_conn_timeout / 2;
        let shared = Arc::clone(&self.shared);
        self.tasks.spawn_periodic("http-cleanup", interval, move || {
            let shared = Arc::clone(&shared);
            async move {
                shared.cleanup();
            }
        });
        info!("HTTP connection pool started");
        Ok(())
    }

    /// Stop the cleanup task and release every connection.
    ///
    /// A stopped pool still serves requests but cannot be started again.
    pub async fn stop(&self) -> Result<(), PoolError> {
        let first = !self.tasks.is_shutdown();
        self.tasks.shutdown().await;
        self.close()?;
        if first && self.started.load(Ordering::SeqCst) {
            info!("HTTP connection pool stopped");
        }
        Ok(())
    }

    /// Run one cleanup pass over the host clients.
    pub fn cleanup(&self) -> usize {
        self.shared.cleanup()
    }
}

impl Drop for HttpConnectionPool {
    fn drop(&mut self) {
        self.tasks.shutdown_token().cancel();
    }
}

impl std::fmt::Debug for HttpConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConnectionPool")
            .field("config", &self.shared.config)
            .field("clients", &self.client_count())
            .finish_non_exhaustive()
    }
}

impl Shared {
    fn read_clients(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<HostClient>>> {
        self.clients.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_clients(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<HostClient>>> {
        self.clients.write().unwrap_or_else(|e| e.into_inner())
    }

    fn get_client(&self, host: &str) -> Arc<HostClient> {
        if let Some(client) = self.read_clients().get(host) {
            client.touch();
            return Arc::clone(client);
        }

        let mut clients = self.write_clients();
        if let Some(client) = clients.get(host) {
            client.touch();
            return Arc::clone(client);
        }

        let transport = self
            .transport
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let client = Arc::new(HostClient::new(
            host,
            transport,
            self.config.max_conns_per_host,
        ));
        clients.insert(host.to_string(), Arc::clone(&client));
        let active = clients.len();
        self.stats.update(|s| {
            s.clients_created += 1;
            s.active_clients = active;
        });
        debug!(host, "created HTTP client");
        client
    }

    /// Rebuild the transport and clear the host map. Returns the number of
    /// host clients dropped.
    fn reset(&self) -> Result<usize, PoolError> {
        let fresh = self.config.build_transport()?;
        let mut clients = self.write_clients();
        *self.transport.write().unwrap_or_else(|e| e.into_inner()) = fresh;
        let released = clients.len();
        clients.clear();
        self.stats.update(|s| s.active_clients = 0);
        Ok(released)
    }

    fn cleanup(&self) -> usize {
        let timeout = self.config.idle_conn_timeout;
        let mut clients = self.write_clients();
        let before = clients.len();
        clients.retain(|host, client| {
            let keep = !client.is_idle(timeout);
            if !keep {
                debug!(host = %host, "evicting idle HTTP client");
            }
            keep
        });
        let evicted = before - clients.len();
        let active = clients.len();
        self.stats.update(|s| s.active_clients = active);
        if evicted > 0 {
            debug!(evicted, "HTTP cleanup dropped idle clients");
        }
        evicted
    }
}

fn request_error(e: &reqwest::Error) -> PoolError {
    warn!(error = %e, "could not build HTTP request");
    PoolError::http(HttpErrorKind::Request, e.to_string())
}

/// Pick the statistics category of a transport failure.
fn classify(e: &reqwest::Error) -> HttpErrorKind {
    if e.is_timeout() {
        HttpErrorKind::Timeout
    } else if e.is_connect() && is_dns_failure(e) {
        HttpErrorKind::Dns
    } else {
        HttpErrorKind::Connection
    }
}

/// hyper-util reports resolver failures as a connect error reading "dns error".
fn is_dns_failure(e: &reqwest::Error) -> bool {
    let mut source = std::error::Error::source(e);
    while let Some(cause) = source {
        if cause.to_string().contains("dns error") {
            return true;
        }
        source = std::error::Error::source(cause);
    }
    false
}
