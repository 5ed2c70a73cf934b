//! P2P pool statistics.

use std::time::Duration;

use chrono::{DateTime, Utc};
use poolkit_core::duration_serde;
use serde::Serialize;

/// Point-in-time statistics of a [`P2pConnectionPool`](crate::P2pConnectionPool).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct P2pStats {
    /// Peer records currently held.
    pub total_connections: usize,
    /// Records whose link is up.
    pub active_connections: usize,
    /// Connected records unused for longer than `keep_alive_interval`.
    pub idle_connections: usize,

    /// Links established.
    pub connections_created: u64,
    /// Records removed by health-check or cleanup passes.
    pub connections_evicted: u64,
    /// Connect attempts that failed.
    pub failed_connections: u64,

    /// Messages sent.
    pub messages_sent: u64,
    /// Messages received.
    pub messages_received: u64,
    /// Payload bytes sent.
    pub bytes_sent: u64,
    /// Payload bytes received.
    pub bytes_received: u64,

    /// Duration of the most recent send. Last sample, not a mean.
    #[serde(with = "duration_serde")]
    pub average_latency: Duration,
    /// Duration of the most recent connect. Last sample, not a mean.
    #[serde(with = "duration_serde")]
    pub average_connect_time: Duration,

    /// Records removed by a health check, and sends that failed at the link.
    pub connection_errors: u64,
    /// Connects, probes or sends that hit a deadline.
    pub timeout_errors: u64,
    /// Sends rejected for any other reason.
    pub protocol_errors: u64,

    /// When the pool was constructed.
    pub start_time: DateTime<Utc>,
    /// Time of the most recent lookup, send or receive.
    pub last_activity: Option<DateTime<Utc>>,
}

impl P2pStats {
    pub(crate) fn new() -> Self {
        Self {
            total_connections: 0,
            active_connections: 0,
            idle_connections: 0,
            connections_created: 0,
            connections_evicted: 0,
            failed_connections: 0,
            messages_sent: 0,
            messages_received: 0,
            bytes_sent: 0,
            bytes_received: 0,
            average_latency: Duration::ZERO,
            average_connect_time: Duration::ZERO,
            connection_errors: 0,
            timeout_errors: 0,
            protocol_errors: 0,
            start_time: Utc::now(),
            last_activity: None,
        }
    }
}
