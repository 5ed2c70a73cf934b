//! Generic pool statistics.

use std::time::Duration;

use chrono::{DateTime, Utc};
use poolkit_core::duration_serde;
use serde::Serialize;

/// Point-in-time statistics of a [`ResourcePool`](crate::ResourcePool).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Resources currently checked out.
    pub active_connections: usize,
    /// Resources waiting in the idle store.
    pub idle_connections: usize,
    /// Resources owned by the pool, checked out or idle.
    pub total_connections: usize,

    /// Resources created by the factory.
    pub connections_created: u64,
    /// Resources passed to the factory's `close`.
    pub connections_closed: u64,
    /// Hand-outs served from the idle store.
    pub connections_reused: u64,

    /// Failed creations.
    pub connection_errors: u64,
    /// Idle resources that failed a health-check pass.
    pub health_check_errors: u64,
    /// Creations or validations that exceeded their deadline.
    pub timeout_errors: u64,

    /// Duration of the most recent `get` call. Last sample, not a mean.
    #[serde(with = "duration_serde")]
    pub average_wait_time: Duration,
    /// Duration of the most recent successful creation. Last sample, not a mean.
    #[serde(with = "duration_serde")]
    pub average_connect_time: Duration,

    /// When the pool was constructed.
    pub start_time: DateTime<Utc>,
    /// Time of the most recent `get` or `put`.
    pub last_activity: Option<DateTime<Utc>>,
}

impl PoolStats {
    pub(crate) fn new() -> Self {
        Self {
            active_connections: 0,
            idle_connections: 0,
            total_connections: 0,
            connections_created: 0,
            connections_closed: 0,
            connections_reused: 0,
            connection_errors: 0,
            health_check_errors: 0,
            timeout_errors: 0,
            average_wait_time: Duration::ZERO,
            average_connect_time: Duration::ZERO,
            start_time: Utc::now(),
            last_activity: None,
        }
    }
}
