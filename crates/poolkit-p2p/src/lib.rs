//! # poolkit-p2p
//!
//! Connection records for peer-to-peer links, one per peer id.
//!
//! [`P2pConnectionPool`] creates a record on first use, hands the same shared
//! record to every caller, and ages records out in two background passes:
//! a health check that also probes each link through the [`PeerConnector`],
//! and a cleanup pass that removes records past `idle_timeout` or
//! `max_lifetime`. There is no global connection cap.
//!
//! The pool does no I/O of its own. A [`PeerConnector`] supplies the address
//! for a new record and carries the payloads; the default
//! [`StaticAddressConnector`] assigns `peer-<id>` addresses and accepts every
//! send.
//!
//! # Example
//!
//! ```rust
//! use poolkit_p2p::{P2pConfig, P2pConnectionPool};
//!
//! # tokio_test::block_on(async {
//! let pool = P2pConnectionPool::new(P2pConfig::default());
//! pool.send_message("node-1", b"hello").await?;
//! pool.receive_message("node-1", b"world").await;
//!
//! let stats = pool.stats().await;
//! assert_eq!(stats.connections_created, 1);
//! assert_eq!(stats.messages_sent, 1);
//! assert_eq!(stats.bytes_received, 5);
//! # Ok::<(), poolkit_core::PoolError>(())
//! # });
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod connection;
pub mod connector;
pub mod pool;
pub mod stats;

pub use config::P2pConfig;
pub use connection::{PeerConnection, PeerConnectionInfo};
pub use connector::{PeerConnector, StaticAddressConnector};
pub use pool::P2pConnectionPool;
pub use stats::P2pStats;
