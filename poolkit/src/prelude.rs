//! Convenient imports for poolkit users.
//!
//! ```rust
//! use poolkit::prelude::*;
//! ```

pub use crate::config::PoolkitConfig;
pub use poolkit_core::{CancellationToken, ErrorKind, HttpErrorKind, PoolError, Result};
pub use poolkit_http::{HttpClientPool, HttpConnectionPool, HttpPoolConfig, HttpPoolStats};
pub use poolkit_p2p::{P2pConfig, P2pConnectionPool, P2pStats, PeerConnector};
pub use poolkit_pool::{PoolConfig, PoolStats, PooledResource, ResourceFactory, ResourcePool};
