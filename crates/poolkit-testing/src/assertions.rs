//! Assertions over pool statistics.

use poolkit_pool::PoolStats;

/// Assert that a pool never held more than `max` resources.
///
/// # Panics
///
/// Panics if the gauges exceed `max`.
pub fn assert_pool_bound(stats: &PoolStats, max: usize) {
    assert!(
        stats.total_connections <= max,
        "pool holds {} resources, bound is {}",
        stats.total_connections,
        max
    );
    assert!(
        stats.active_connections + stats.idle_connections <= stats.total_connections,
        "active ({}) + idle ({}) exceeds total ({})",
        stats.active_connections,
        stats.idle_connections,
        stats.total_connections
    );
}

/// Assert that lifetime counters agree with the gauges.
///
/// Every resource the pool currently holds was created and not yet closed.
/// Only meaningful while no `get` is in the middle of creating a resource.
///
/// # Panics
///
/// Panics if `connections_created - connections_closed` differs from
/// `total_connections`.
pub fn assert_counters_consistent(stats: &PoolStats) {
    let held = stats
        .connections_created
        .saturating_sub(stats.connections_closed);
    assert_eq!(
        held, stats.total_connections as u64,
        "created ({}) - closed ({}) does not match total ({})",
        stats.connections_created, stats.connections_closed, stats.total_connections
    );
}
