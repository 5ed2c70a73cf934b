//! Benchmarks for poolkit.
//!
//! This crate contains Criterion benchmarks for measuring:
//!
//! - **Resource pool**: checkout/return latency, uncontended and under
//!   contention at the `max_connections` bound
//! - **Keyed pools**: per-host client and per-peer record lookups on the hot
//!   (already created) path
//!
//! ## Running Benchmarks
//!
//! Run all benchmarks:
//! ```bash
//! cargo bench --package poolkit-benches
//! ```
//!
//! Run a specific benchmark:
//! ```bash
//! cargo bench --package poolkit-benches --bench resource_pool
//! cargo bench --package poolkit-benches --bench keyed_pools
//! ```
//!
//! Results are written to `target/criterion/` with HTML reports.
//!
//! ## Benchmark Groups
//!
//! ### Resource pool (`benches/resource_pool.rs`)
//! - `get_put`: one checkout and return against a warm idle store
//! - `contended`: N tasks sharing a pool of 4
//!
//! ### Keyed pools (`benches/keyed_pools.rs`)
//! - `http_get_client`: host client lookup
//! - `p2p_get_connection`: peer record lookup

// This is a benchmark-only crate, no library code needed.
