//! Per-host client handle.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use poolkit_core::{HttpErrorKind, PoolError};
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::time::Instant;

/// The client serving one destination host.
///
/// Every `HostClient` of a pool wraps a clone of the same transport, so they
/// share its keep-alive connections. When `max_conns_per_host` is set, the
/// handle also carries the semaphore that bounds concurrent requests.
#[derive(Debug)]
pub struct HostClient {
    host: String,
    client: reqwest::Client,
    limiter: Option<Arc<Semaphore>>,
    created_at: Instant,
    last_used: Mutex<Instant>,
}

impl HostClient {
    pub(crate) fn new(host: impl Into<String>, client: reqwest::Client, max_conns: usize) -> Self {
        let now = Instant::now();
        Self {
            host: host.into(),
            client,
            limiter: (max_conns > 0).then(|| Arc::new(Semaphore::new(max_conns))),
            created_at: now,
            last_used: Mutex::new(now),
        }
    }

    /// The host key, `host` or `host:port`.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The underlying transport handle.
    ///
    /// Requests sent through it directly bypass the pool's statistics and
    /// per-host limit.
    #[must_use]
    pub const fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// When this handle was constructed.
    #[must_use]
    pub const fn created_at(&self) -> Instant {
        self.created_at
    }

    /// When this handle was last resolved.
    #[must_use]
    pub fn last_used(&self) -> Instant {
        *self.last_used.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether the handle has been unused for longer than `timeout`.
    #[must_use]
    pub fn is_idle(&self, timeout: Duration) -> bool {
        self.last_used().elapsed() > timeout
    }

    pub(crate) fn touch(&self) {
        *self.last_used.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }

    /// Requests that may still start without waiting, if the host is limited.
    #[must_use]
    pub fn available_permits(&self) -> Option<usize> {
        self.limiter.as_ref().map(|l| l.available_permits())
    }

    pub(crate) async fn permit(&self) -> Result<Option<SemaphorePermit<'_>>, PoolError> {
        match &self.limiter {
            Some(limiter) => limiter
                .acquire()
                .await
                .map(Some)
                .map_err(|_| PoolError::http(HttpErrorKind::Connection, "host limiter closed")),
            None => Ok(None),
        }
    }
}

/// Pool key for a URL: the host, plus the port when one is given explicitly.
pub(crate) fn host_key(url: &reqwest::Url) -> Result<String, PoolError> {
    let host = url
        .host_str()
        .ok_or_else(|| PoolError::http(HttpErrorKind::Request, format!("URL has no host: {url}")))?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}
