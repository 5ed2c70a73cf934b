//! The link-level capability the P2P pool drives.

use async_trait::async_trait;
use poolkit_core::PoolError;

use crate::connection::PeerConnection;

/// Establishes and operates peer links on behalf of the pool.
///
/// Only [`connect`](PeerConnector::connect) is required. The other hooks
/// default to no-ops, which is enough for a pool that only does bookkeeping.
#[async_trait]
pub trait PeerConnector: Send + Sync + 'static {
    /// Establish a link to `peer_id` and return its remote address.
    async fn connect(&self, peer_id: &str) -> Result<String, PoolError>;

    /// Deliver `payload` over an established link.
    async fn send(&self, _connection: &PeerConnection, _payload: &[u8]) -> Result<(), PoolError> {
        Ok(())
    }

    /// Check that a link is still alive. Called by the health-check pass.
    async fn probe(&self, _connection: &PeerConnection) -> Result<(), PoolError> {
        Ok(())
    }

    /// Tear down a link the pool has removed.
    async fn disconnect(&self, _connection: &PeerConnection) {}
}

/// A connector that assigns the placeholder address `peer-<id>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticAddressConnector;

#[async_trait]
impl PeerConnector for StaticAddressConnector {
    async fn connect(&self, peer_id: &str) -> Result<String, PoolError> {
        Ok(format!("peer-{peer_id}"))
    }
}

#[async_trait]
impl<C> PeerConnector for std::sync::Arc<C>
where
    C: PeerConnector + ?Sized,
{
    async fn connect(&self, peer_id: &str) -> Result<String, PoolError> {
        (**self).connect(peer_id).await
    }

    async fn send(&self, connection: &PeerConnection, payload: &[u8]) -> Result<(), PoolError> {
        (**self).send(connection, payload).await
    }

    async fn probe(&self, connection: &PeerConnection) -> Result<(), PoolError> {
        (**self).probe(connection).await
    }

    async fn disconnect(&self, connection: &PeerConnection) {
        (**self).disconnect(connection).await;
    }
}
