//! Mock resource factory and mock peer connector.
//!
//! Both mocks are cheap handles over shared state: clone one into the pool
//! and keep the other to flip failure switches and read counters.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use poolkit_core::{ErrorKind, PoolError};
use poolkit_p2p::{PeerConnection, PeerConnector};
use poolkit_pool::ResourceFactory;
use tokio::time::Instant;

/// A resource produced by [`MockFactory`].
#[derive(Debug)]
pub struct MockResource {
    /// Sequence number, starting at 1, in creation order.
    pub serial: u64,
    /// When the factory created this resource.
    pub created_at: Instant,
}

#[derive(Debug, Default)]
struct FactoryState {
    created: AtomicU64,
    validated: AtomicU64,
    closed: AtomicU64,
    peak_live: AtomicU64,
    fail_create: AtomicBool,
    fail_validate: AtomicBool,
    settings: Mutex<FactorySettings>,
}

#[derive(Debug, Default, Clone, Copy)]
struct FactorySettings {
    create_delay: Duration,
    max_valid_age: Option<Duration>,
}

/// A [`ResourceFactory`] for tests.
///
/// Counts every call and tracks how many resources are alive (created and
/// not yet closed), including the high-water mark.
#[derive(Debug, Clone, Default)]
pub struct MockFactory {
    state: Arc<FactoryState>,
}

impl MockFactory {
    /// Create a factory whose operations all succeed immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `delay` inside every `create` call.
    #[must_use]
    pub fn with_create_delay(self, delay: Duration) -> Self {
        self.settings().create_delay = delay;
        self
    }

    /// Fail validation of resources older than `age`.
    #[must_use]
    pub fn with_max_valid_age(self, age: Duration) -> Self {
        self.settings().max_valid_age = Some(age);
        self
    }

    /// Make `create` fail (or succeed again).
    pub fn fail_create(&self, fail: bool) {
        self.state.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Make `validate` fail (or succeed again).
    pub fn fail_validate(&self, fail: bool) {
        self.state.fail_validate.store(fail, Ordering::SeqCst);
    }

    /// Resources created so far.
    #[must_use]
    pub fn created(&self) -> u64 {
        self.state.created.load(Ordering::SeqCst)
    }

    /// Validation calls so far.
    #[must_use]
    pub fn validated(&self) -> u64 {
        self.state.validated.load(Ordering::SeqCst)
    }

    /// Resources closed so far.
    #[must_use]
    pub fn closed(&self) -> u64 {
        self.state.closed.load(Ordering::SeqCst)
    }

    /// Resources created and not yet closed.
    #[must_use]
    pub fn live(&self) -> u64 {
        self.created().saturating_sub(self.closed())
    }

    /// Highest value [`live`](Self::live) has reached.
    #[must_use]
    pub fn peak_live(&self) -> u64 {
        self.state.peak_live.load(Ordering::SeqCst)
    }

    fn settings(&self) -> std::sync::MutexGuard<'_, FactorySettings> {
        self.state
            .settings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ResourceFactory<MockResource> for MockFactory {
    async fn create(&self) -> Result<MockResource, PoolError> {
        let delay = self.settings().create_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.state.fail_create.load(Ordering::SeqCst) {
            return Err(PoolError::factory("mock create failure"));
        }

        let serial = self.state.created.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.peak_live.fetch_max(self.live(), Ordering::SeqCst);
        Ok(MockResource {
            serial,
            created_at: Instant::now(),
        })
    }

    async fn validate(&self, resource: &MockResource) -> Result<(), PoolError> {
        self.state.validated.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_validate.load(Ordering::SeqCst) {
            return Err(PoolError::validation("mock validation failure"));
        }
        let max_age = self.settings().max_valid_age;
        match max_age {
            Some(age) if resource.created_at.elapsed() > age => Err(PoolError::validation(
                format!("resource {} is stale", resource.serial),
            )),
            _ => Ok(()),
        }
    }

    async fn close(&self, _resource: MockResource) -> Result<(), PoolError> {
        self.state.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ConnectorState {
    connects: AtomicU64,
    sends: AtomicU64,
    probes: AtomicU64,
    disconnects: AtomicU64,
    fail_connect: AtomicBool,
    fail_probe: AtomicBool,
    send_failure: Mutex<Option<ErrorKind>>,
    connect_delay: Mutex<Duration>,
}

/// A [`PeerConnector`] for tests.
///
/// Addresses are `mock://<peer_id>`. Send failures are produced with the
/// requested [`ErrorKind`] so that the pool's error accounting can be
/// checked per category.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    state: Arc<ConnectorState>,
}

impl MockConnector {
    /// Create a connector whose operations all succeed immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `delay` inside every `connect` call.
    #[must_use]
    pub fn with_connect_delay(self, delay: Duration) -> Self {
        *self
            .state
            .connect_delay
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = delay;
        self
    }

    /// Make `connect` fail (or succeed again).
    pub fn fail_connect(&self, fail: bool) {
        self.state.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Make `probe` fail (or succeed again).
    pub fn fail_probe(&self, fail: bool) {
        self.state.fail_probe.store(fail, Ordering::SeqCst);
    }

    /// Make `send` fail with an error of `kind`, or succeed with `None`.
    pub fn fail_send(&self, kind: Option<ErrorKind>) {
        *self
            .state
            .send_failure
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = kind;
    }

    /// Connect calls so far.
    #[must_use]
    pub fn connects(&self) -> u64 {
        self.state.connects.load(Ordering::SeqCst)
    }

    /// Successful sends so far.
    #[must_use]
    pub fn sends(&self) -> u64 {
        self.state.sends.load(Ordering::SeqCst)
    }

    /// Probe calls so far.
    #[must_use]
    pub fn probes(&self) -> u64 {
        self.state.probes.load(Ordering::SeqCst)
    }

    /// Disconnect calls so far.
    #[must_use]
    pub fn disconnects(&self) -> u64 {
        self.state.disconnects.load(Ordering::SeqCst)
    }
}

fn error_of_kind(kind: ErrorKind) -> PoolError {
    match kind {
        ErrorKind::Timeout => PoolError::timeout("send", Duration::ZERO),
        ErrorKind::Connection => PoolError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "mock link reset",
        )),
        _ => PoolError::validation("mock frame rejected"),
    }
}

#[async_trait]
impl PeerConnector for MockConnector {
    async fn connect(&self, peer_id: &str) -> Result<String, PoolError> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        let delay = *self
            .state
            .connect_delay
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.state.fail_connect.load(Ordering::SeqCst) {
            return Err(PoolError::factory(format!("mock peer {peer_id} unreachable")));
        }
        Ok(format!("mock://{peer_id}"))
    }

    async fn send(&self, _connection: &PeerConnection, _payload: &[u8]) -> Result<(), PoolError> {
        let failure = *self
            .state
            .send_failure
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        match failure {
            Some(kind) => Err(error_of_kind(kind)),
            None => {
                self.state.sends.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
    }

    async fn probe(&self, connection: &PeerConnection) -> Result<(), PoolError> {
        self.state.probes.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_probe.load(Ordering::SeqCst) {
            return Err(PoolError::validation(format!(
                "mock probe of {} failed",
                connection.peer_id()
            )));
        }
        Ok(())
    }

    async fn disconnect(&self, _connection: &PeerConnection) {
        self.state.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}
