//! The bounded resource pool.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use poolkit_core::{BackgroundTasks, CancellationToken, PoolError, RetryPolicy, StatsCell};
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::PoolConfig;
use crate::factory::ResourceFactory;
use crate::resource::PooledResource;
use crate::stats::PoolStats;

/// A bounded pool of homogeneous resources obtained through a [`ResourceFactory`].
///
/// At every observable instant `active + idle <= max_connections`. Resources
/// handed out of the idle store have just passed `validate()`.
///
/// Call [`start`](Self::start) once to pre-warm the pool and launch the
/// health-check and cleanup tasks, and [`stop`](Self::stop) to shut it down.
/// A pool that is never started still serves `get` and `put`.
pub struct ResourcePool<R>
where
    R: Send + Sync + 'static,
{
    shared: Arc<Shared<R>>,
    tasks: BackgroundTasks,
    started: AtomicBool,
}

struct Shared<R>
where
    R: Send + Sync + 'static,
{
    config: PoolConfig,
    factory: Box<dyn ResourceFactory<R>>,
    retry: RetryPolicy,
    state: Mutex<PoolState<R>>,
    released: Notify,
    closing: CancellationToken,
    stats: StatsCell<PoolStats>,
    next_id: AtomicU64,
}

struct PoolState<R> {
    idle: VecDeque<PooledResource<R>>,
    /// Checked out, including slots reserved for a creation in flight.
    active: usize,
    /// Taken out of the idle store by a health-check pass.
    checking: usize,
    closed: bool,
}

impl<R> PoolState<R> {
    fn total(&self) -> usize {
        self.active + self.idle.len() + self.checking
    }
}

enum Checkout<R> {
    Idle(PooledResource<R>),
    Create,
    Full,
    Closed,
}

/// An active slot taken by `get`, given back unless handed to the caller.
///
/// Dropping an armed reservation (creation failed, or the caller's future was
/// dropped mid-await) frees the slot and wakes one waiter. An idle resource
/// still held goes back to the front of the idle store.
struct Reservation<'a, R>
where
    R: Send + Sync + 'static,
{
    shared: &'a Shared<R>,
    held: Option<PooledResource<R>>,
    armed: bool,
}

impl<'a, R> Reservation<'a, R>
where
    R: Send + Sync + 'static,
{
    fn new(shared: &'a Shared<R>, held: Option<PooledResource<R>>) -> Self {
        Self {
            shared,
            held,
            armed: true,
        }
    }

    async fn validate_held(&self) -> Result<(), PoolError> {
        match &self.held {
            Some(resource) => self.shared.validate(resource.get_ref()).await,
            None => Ok(()),
        }
    }

    fn take_held(&mut self) -> Option<PooledResource<R>> {
        self.held.take()
    }

    /// The slot now belongs to the caller.
    fn complete(mut self) {
        self.armed = false;
    }
}

impl<R> Drop for Reservation<'_, R>
where
    R: Send + Sync + 'static,
{
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        {
            let mut state = self.shared.lock_state();
            state.active = state.active.saturating_sub(1);
            if let Some(resource) = self.held.take() {
                if state.closed {
                    // stop has drained the store already
                    self.shared.stats.update(|s| s.connections_closed += 1);
                    drop(resource);
                } else {
                    state.idle.push_front(resource);
                }
            }
            self.shared.sync_gauges(&state);
        }
        self.shared.released.notify_one();
    }
}

impl<R> ResourcePool<R>
where
    R: Send + Sync + 'static,
{
    /// Create a pool. The configuration is normalized first.
    pub fn new<F>(config: PoolConfig, factory: F) -> Self
    where
        F: ResourceFactory<R>,
    {
        let config = config.normalized();
        let retry = config.retry_policy();
        Self {
            shared: Arc::new(Shared {
                config,
                factory: Box::new(factory),
                retry,
                state: Mutex::new(PoolState {
                    idle: VecDeque::new(),
                    active: 0,
                    checking: 0,
                    closed: false,
                }),
                released: Notify::new(),
                closing: CancellationToken::new(),
                stats: StatsCell::new(PoolStats::new()),
                next_id: AtomicU64::new(1),
            }),
            tasks: BackgroundTasks::new(),
            started: AtomicBool::new(false),
        }
    }

    /// Get the pool configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    /// Whether the pool has been started and not yet stopped.
    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::SeqCst) && !self.shared.lock_state().closed
    }

    /// Get a snapshot of the pool statistics.
    pub fn stats(&self) -> PoolStats {
        self.shared.stats.snapshot()
    }

    /// Pre-create `min_connections` resources and launch the background tasks.
    ///
    /// Fails with [`PoolError::AlreadyStarted`] when called on a running pool,
    /// and with a creation error when a pre-warm resource cannot be created.
    pub async fn start(&self) -> Result<(), PoolError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(PoolError::AlreadyStarted);
        }
        if let Err(e) = self.shared.prewarm().await {
            self.started.store(false, Ordering::SeqCst);
            return Err(e);
        }

        let config = &self.shared.config;

        let shared = Arc::clone(&self.shared);
        self.tasks
            .spawn_periodic("health-check", config.health_check_interval, move || {
                let shared = Arc::clone(&shared);
                async move { shared.health_check().await }
            });

        let shared = Arc::clone(&self.shared);
        self.tasks
            .spawn_periodic("cleanup", config.cleanup_interval(), move || {
                let shared = Arc::clone(&shared);
                async move { shared.cleanup().await }
            });

        info!(
            min = config.min_connections,
            max = config.max_connections,
            "resource pool started"
        );
        Ok(())
    }

    /// Stop the background tasks and close every idle resource.
    ///
    /// Waits for both background tasks to exit before closing anything.
    /// Afterwards `get` fails with [`PoolError::Closed`] and `put` closes the
    /// returned resource. Calling `stop` again does nothing.
    pub async fn stop(&self) {
        let first = {
            let mut state = self.shared.lock_state();
            !std::mem::replace(&mut state.closed, true)
        };
        self.shared.closing.cancel();
        self.tasks.shutdown().await;

        let drained: Vec<_> = {
            let mut state = self.shared.lock_state();
            let drained = state.idle.drain(..).collect();
            self.shared.sync_gauges(&state);
            drained
        };
        let closed = drained.len();
        for resource in drained {
            self.shared.close_resource(resource).await;
        }
        self.shared.released.notify_waiters();

        if first {
            info!(closed, "resource pool stopped");
        }
    }

    /// Check out a resource.
    ///
    /// Serves a validated idle resource if one exists, otherwise creates one
    /// while below `max_connections`, otherwise waits until a resource is
    /// returned or `cancel` fires.
    pub async fn get(&self, cancel: &CancellationToken) -> Result<PooledResource<R>, PoolError> {
        let started = Instant::now();
        let result = self.shared.acquire(cancel).await;
        self.shared.stats.update(|s| {
            s.average_wait_time = started.elapsed();
            s.last_activity = Some(Utc::now());
        });
        result
    }

    /// Return a checked-out resource to the pool.
    ///
    /// A resource that fails validation is closed and its error returned. A
    /// valid resource goes back to the idle store, or is closed when the store
    /// is full or the pool has been stopped.
    pub async fn put(&self, resource: PooledResource<R>) -> Result<(), PoolError> {
        self.shared.release(resource).await
    }

    /// Run one health-check pass over the idle store.
    pub async fn health_check(&self) {
        self.shared.health_check().await;
    }

    /// Run one cleanup pass over the idle store.
    pub async fn cleanup(&self) {
        self.shared.cleanup().await;
    }
}

impl<R> Drop for ResourcePool<R>
where
    R: Send + Sync + 'static,
{
    fn drop(&mut self) {
        // Background tasks hold the shared state; without this they outlive the pool.
        self.tasks.shutdown_token().cancel();
        self.shared.closing.cancel();
    }
}

impl<R> std::fmt::Debug for ResourcePool<R>
where
    R: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourcePool")
            .field("config", &self.shared.config)
            .field("started", &self.started.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<R> Shared<R>
where
    R: Send + Sync + 'static,
{
    fn lock_state(&self) -> MutexGuard<'_, PoolState<R>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Mirror the gauges into the statistics. Call with the state lock held.
    fn sync_gauges(&self, state: &PoolState<R>) {
        self.stats.update(|s| {
            s.active_connections = state.active;
            s.idle_connections = state.idle.len();
            s.total_connections = state.total();
        });
    }

    fn checkout(&self) -> Checkout<R> {
        let mut state = self.lock_state();
        if state.closed {
            return Checkout::Closed;
        }
        if let Some(resource) = state.idle.pop_front() {
            state.active += 1;
            self.sync_gauges(&state);
            return Checkout::Idle(resource);
        }
        if state.total() < self.config.max_connections {
            state.active += 1;
            self.sync_gauges(&state);
            return Checkout::Create;
        }
        Checkout::Full
    }

    async fn acquire(&self, cancel: &CancellationToken) -> Result<PooledResource<R>, PoolError> {
        loop {
            if cancel.is_cancelled() {
                return Err(PoolError::Cancelled);
            }

            // Register interest before inspecting the state so a release in
            // between is not missed.
            let notified = self.released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.checkout() {
                Checkout::Closed => return Err(PoolError::Closed),
                Checkout::Idle(resource) => {
                    let mut reservation = Reservation::new(self, Some(resource));
                    let checked = reservation.validate_held().await;
                    let Some(mut resource) = reservation.take_held() else {
                        continue;
                    };
                    match checked {
                        Ok(()) => {
                            reservation.complete();
                            resource.touch();
                            self.stats.update(|s| s.connections_reused += 1);
                            return Ok(resource);
                        }
                        Err(e) => {
                            debug!(id = resource.id(), error = %e, "idle resource failed validation");
                            drop(reservation);
                            self.close_resource(resource).await;
                        }
                    }
                }
                Checkout::Create => {
                    let reservation = Reservation::new(self, None);
                    let created = tokio::select! {
                        () = cancel.cancelled() => return Err(PoolError::Cancelled),
                        result = self.create_resource() => result,
                    };
                    return match created {
                        Ok(resource) => {
                            reservation.complete();
                            Ok(resource)
                        }
                        Err(e) => {
                            drop(reservation);
                            self.stats.update(|s| s.connection_errors += 1);
                            warn!(error = %e, "failed to create connection");
                            Err(PoolError::creation("failed to create connection", e))
                        }
                    };
                }
                Checkout::Full => {
                    tokio::select! {
                        () = cancel.cancelled() => return Err(PoolError::Cancelled),
                        () = self.closing.cancelled() => return Err(PoolError::Closed),
                        () = notified => {}
                    }
                }
            }
        }
    }

    async fn create_resource(&self) -> Result<PooledResource<R>, PoolError> {
        let started = Instant::now();
        let timeout = self.config.connect_timeout;
        let factory = &self.factory;
        let stats = &self.stats;

        let resource = self
            .retry
            .run("create", move || async move {
                match tokio::time::timeout(timeout, factory.create()).await {
                    Ok(result) => result,
                    Err(_) => {
                        stats.update(|s| s.timeout_errors += 1);
                        Err(PoolError::timeout("create", timeout))
                    }
                }
            })
            .await?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.stats.update(|s| {
            s.connections_created += 1;
            s.average_connect_time = started.elapsed();
        });
        debug!(id, "created resource");
        Ok(PooledResource::new(resource, id))
    }

    async fn validate(&self, resource: &R) -> Result<(), PoolError> {
        let timeout = self.config.health_check_timeout;
        match tokio::time::timeout(timeout, self.factory.validate(resource)).await {
            Ok(result) => result,
            Err(_) => {
                self.stats.update(|s| s.timeout_errors += 1);
                Err(PoolError::timeout("validate", timeout))
            }
        }
    }

    async fn close_resource(&self, resource: PooledResource<R>) {
        let id = resource.id();
        if let Err(e) = self.factory.close(resource.into_inner()).await {
            debug!(id, error = %e, "error closing resource");
        }
        self.stats.update(|s| s.connections_closed += 1);
    }

    /// Close a checked-out resource and free its slot.
    async fn discard_active(&self, resource: PooledResource<R>) {
        {
            let mut state = self.lock_state();
            state.active = state.active.saturating_sub(1);
            self.sync_gauges(&state);
        }
        self.close_resource(resource).await;
        self.released.notify_one();
    }

    async fn release(&self, mut resource: PooledResource<R>) -> Result<(), PoolError> {
        self.stats.update(|s| s.last_activity = Some(Utc::now()));

        let closed = self.lock_state().closed;
        if closed {
            self.discard_active(resource).await;
            return Ok(());
        }

        if let Err(e) = self.validate(resource.get_ref()).await {
            debug!(id = resource.id(), error = %e, "returned resource failed validation");
            self.discard_active(resource).await;
            return Err(e);
        }

        resource.touch();
        let rejected = {
            let mut state = self.lock_state();
            state.active = state.active.saturating_sub(1);
            let rejected = if state.closed || state.idle.len() >= self.config.max_connections {
                Some(resource)
            } else {
                state.idle.push_back(resource);
                None
            };
            self.sync_gauges(&state);
            rejected
        };

        if let Some(resource) = rejected {
            self.close_resource(resource).await;
        }
        self.released.notify_one();
        Ok(())
    }

    async fn prewarm(&self) -> Result<(), PoolError> {
        for _ in 0..self.config.min_connections {
            let resource = match self.create_resource().await {
                Ok(resource) => resource,
                Err(e) => {
                    self.stats.update(|s| s.connection_errors += 1);
                    warn!(error = %e, "failed to create initial connection");
                    return Err(PoolError::creation("failed to create initial connection", e));
                }
            };

            let rejected = {
                let mut state = self.lock_state();
                let rejected = if state.closed || state.total() >= self.config.max_connections {
                    Some(resource)
                } else {
                    state.idle.push_back(resource);
                    None
                };
                self.sync_gauges(&state);
                rejected
            };

            if let Some(resource) = rejected {
                self.close_resource(resource).await;
            }
        }
        self.released.notify_waiters();
        Ok(())
    }

    async fn health_check(&self) {
        let pending = self.lock_state().idle.len();
        let mut unhealthy = 0usize;

        for _ in 0..pending {
            let resource = {
                let mut state = self.lock_state();
                if state.closed {
                    break;
                }
                match state.idle.pop_front() {
                    Some(resource) => {
                        state.checking += 1;
                        self.sync_gauges(&state);
                        resource
                    }
                    None => break,
                }
            };

            let healthy = self.validate(resource.get_ref()).await.is_ok();

            let rejected = {
                let mut state = self.lock_state();
                state.checking = state.checking.saturating_sub(1);
                let rejected = if !healthy
                    || state.closed
                    || state.idle.len() >= self.config.max_connections
                {
                    Some(resource)
                } else {
                    state.idle.push_back(resource);
                    None
                };
                self.sync_gauges(&state);
                rejected
            };

            if let Some(resource) = rejected {
                if !healthy {
                    unhealthy += 1;
                    self.stats.update(|s| s.health_check_errors += 1);
                }
                self.close_resource(resource).await;
            }
            self.released.notify_one();
        }

        if unhealthy > 0 {
            debug!(checked = pending, unhealthy, "health check closed unhealthy resources");
        }
    }

    async fn cleanup(&self) {
        let config = &self.config;
        let evicted: Vec<_> = {
            let mut state = self.lock_state();
            if state.closed {
                return;
            }

            let mut evicted = Vec::new();
            while state.total() > config.max_connections {
                match state.idle.pop_back() {
                    Some(resource) => evicted.push(resource),
                    None => break,
                }
            }

            let mut remaining = state.idle.len();
            let mut kept = VecDeque::with_capacity(remaining);
            while let Some(resource) = state.idle.pop_front() {
                let expired = resource.is_expired(config.max_lifetime);
                let stale =
                    resource.is_idle(config.idle_timeout) && remaining > config.min_connections;
                if expired || stale {
                    remaining -= 1;
                    evicted.push(resource);
                } else {
                    kept.push_back(resource);
                }
            }
            state.idle = kept;
            self.sync_gauges(&state);
            evicted
        };

        if evicted.is_empty() {
            return;
        }

        let count = evicted.len();
        for resource in evicted {
            self.close_resource(resource).await;
        }
        self.released.notify_waiters();
        debug!(evicted = count, "cleanup closed idle resources");
    }
}
