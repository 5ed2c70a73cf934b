//! Per-peer connection records.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use poolkit_core::duration_serde;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::time::Instant;

/// The pool's record of one peer link.
///
/// Records are shared: every caller asking for the same peer gets the same
/// `Arc<PeerConnection>`. A record moves from connected to disconnected
/// exactly once and is then removed by the next health-check or cleanup pass.
#[derive(Debug)]
pub struct PeerConnection {
    peer_id: String,
    address: String,
    created_at: Instant,
    pub(crate) limiter: Semaphore,
    state: Mutex<LinkState>,
}

#[derive(Debug)]
struct LinkState {
    connected: bool,
    last_used: Instant,
    messages_sent: u64,
    messages_received: u64,
    bytes_sent: u64,
    bytes_received: u64,
    errors: u64,
}

impl PeerConnection {
    /// Create a connected record.
    pub fn new(peer_id: impl Into<String>, address: impl Into<String>, max_in_flight: usize) -> Self {
        let now = Instant::now();
        Self {
            peer_id: peer_id.into(),
            address: address.into(),
            created_at: now,
            limiter: Semaphore::new(max_in_flight.max(1)),
            state: Mutex::new(LinkState {
                connected: true,
                last_used: now,
                messages_sent: 0,
                messages_received: 0,
                bytes_sent: 0,
                bytes_received: 0,
                errors: 0,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, LinkState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The peer this record connects to.
    #[must_use]
    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    /// The remote address the connector resolved.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// When the record was created.
    #[must_use]
    pub const fn created_at(&self) -> Instant {
        self.created_at
    }

    /// When the record was last used.
    #[must_use]
    pub fn last_used(&self) -> Instant {
        self.state().last_used
    }

    /// Whether the link is still up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().connected
    }

    /// Mark the record as used now.
    pub fn touch(&self) {
        self.state().last_used = Instant::now();
    }

    pub(crate) fn record_sent(&self, bytes: usize) {
        let mut state = self.state();
        state.messages_sent += 1;
        state.bytes_sent += bytes as u64;
        state.last_used = Instant::now();
    }

    pub(crate) fn record_received(&self, bytes: usize) {
        let mut state = self.state();
        state.messages_received += 1;
        state.bytes_received += bytes as u64;
        state.last_used = Instant::now();
    }

    pub(crate) fn record_error(&self) {
        self.state().errors += 1;
    }

    /// Mark the link down. Returns `false` if it already was.
    pub(crate) fn close(&self) -> bool {
        std::mem::replace(&mut self.state().connected, false)
    }

    /// Whether the record is connected, younger than `max_lifetime` and used
    /// within `idle_timeout`.
    #[must_use]
    pub fn is_healthy(&self, idle_timeout: Duration, max_lifetime: Duration) -> bool {
        let state = self.state();
        state.connected
            && self.created_at.elapsed() <= max_lifetime
            && state.last_used.elapsed() <= idle_timeout
    }

    /// Snapshot of the record's counters.
    #[must_use]
    pub fn info(&self) -> PeerConnectionInfo {
        let state = self.state();
        PeerConnectionInfo {
            peer_id: self.peer_id.clone(),
            address: self.address.clone(),
            connected: state.connected,
            messages_sent: state.messages_sent,
            messages_received: state.messages_received,
            bytes_sent: state.bytes_sent,
            bytes_received: state.bytes_received,
            errors: state.errors,
            age: self.created_at.elapsed(),
            idle_for: state.last_used.elapsed(),
        }
    }
}

/// Serializable snapshot of a [`PeerConnection`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerConnectionInfo {
    /// The peer identity.
    pub peer_id: String,
    /// The resolved remote address.
    pub address: String,
    /// Whether the link was up.
    pub connected: bool,
    /// Messages sent over the link.
    pub messages_sent: u64,
    /// Messages received over the link.
    pub messages_received: u64,
    /// Payload bytes sent.
    pub bytes_sent: u64,
    /// Payload bytes received.
    pub bytes_received: u64,
    /// Failed sends.
    pub errors: u64,
    /// Time since the record was created.
    #[serde(with = "duration_serde")]
    pub age: Duration,
    /// Time since the record was last used.
    #[serde(with = "duration_serde")]
    pub idle_for: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_close_transitions_once() {
        let conn = PeerConnection::new("node-1", "peer-node-1", 5);
        assert!(conn.is_connected());
        assert!(conn.close());
        assert!(!conn.close());
        assert!(!conn.is_connected());
    }

    #[test]
    fn test_counters() {
        let conn = PeerConnection::new("node-1", "peer-node-1", 5);
        conn.record_sent(128);
        conn.record_sent(64);
        conn.record_received(32);
        conn.record_error();

        let info = conn.info();
        assert_eq!(info.messages_sent, 2);
        assert_eq!(info.bytes_sent, 192);
        assert_eq!(info.messages_received, 1);
        assert_eq!(info.bytes_received, 32);
        assert_eq!(info.errors, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_by_age_and_idleness() {
        let idle = Duration::from_secs(60);
        let lifetime = Duration::from_secs(300);
        let conn = PeerConnection::new("node-1", "peer-node-1", 5);
        assert!(conn.is_healthy(idle, lifetime));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(!conn.is_healthy(idle, lifetime));

        conn.touch();
        assert!(conn.is_healthy(idle, lifetime));

        tokio::time::advance(Duration::from_secs(240)).await;
        conn.touch();
        assert!(!conn.is_healthy(idle, lifetime), "past max lifetime");
    }

    #[tokio::test(start_paused = true)]
    async fn test_info_serializes_with_millisecond_durations() {
        let conn = PeerConnection::new("node-1", "peer-node-1", 5);
        tokio::time::advance(Duration::from_millis(500)).await;
        conn.record_sent(16);
        tokio::time::advance(Duration::from_millis(1000)).await;

        let json = serde_json::to_value(conn.info()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "peer_id": "node-1",
                "address": "peer-node-1",
                "connected": true,
                "messages_sent": 1,
                "messages_received": 0,
                "bytes_sent": 16,
                "bytes_received": 0,
                "errors": 0,
                "age": 1500,
                "idle_for": 1000,
            })
        );
    }
}
