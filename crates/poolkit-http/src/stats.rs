//! HTTP pool statistics.

use std::time::Duration;

use chrono::{DateTime, Utc};
use poolkit_core::duration_serde;
use serde::Serialize;

/// Point-in-time statistics of an [`HttpConnectionPool`](crate::HttpConnectionPool).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpPoolStats {
    /// Requests executed through the pool.
    pub total_requests: u64,
    /// Requests that produced a response.
    pub successful_requests: u64,
    /// Requests that failed at the transport level.
    pub failed_requests: u64,
    /// Failed requests that hit a deadline.
    pub timeout_errors: u64,
    /// Failed requests whose host name could not be resolved.
    pub dns_errors: u64,
    /// Other failed requests that did not hit a deadline.
    pub connection_errors: u64,

    /// Host clients constructed over the pool's life.
    pub clients_created: u64,
    /// Host clients currently held.
    pub active_clients: usize,

    /// Duration of the most recent request. Last sample, not a mean.
    #[serde(with = "duration_serde")]
    pub average_response_time: Duration,

    /// When the pool was constructed.
    pub start_time: DateTime<Utc>,
    /// Time of the most recent request.
    pub last_activity: Option<DateTime<Utc>>,
}

impl HttpPoolStats {
    pub(crate) fn new() -> Self {
        Self {
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            timeout_errors: 0,
            dns_errors: 0,
            connection_errors: 0,
            clients_created: 0,
            active_clients: 0,
            average_response_time: Duration::ZERO,
            start_time: Utc::now(),
            last_activity: None,
        }
    }
}
