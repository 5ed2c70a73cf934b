//! Pooled resource wrapper.

use std::ops::{Deref, DerefMut};
use std::time::Duration;

use tokio::time::Instant;

/// A resource checked out of a [`ResourcePool`](crate::ResourcePool).
///
/// Tracks creation and last-use times so the pool can age resources out.
/// Hand it back with [`ResourcePool::put`](crate::ResourcePool::put).
///
/// The wrapped value cannot be moved out, since that would leave its slot
/// counted as active:
///
/// ```compile_fail
/// fn detach(resource: poolkit_pool::PooledResource<u32>) -> u32 {
///     resource.into_inner()
/// }
/// ```
#[derive(Debug)]
pub struct PooledResource<R> {
    resource: R,
    id: u64,
    created_at: Instant,
    last_used: Instant,
}

impl<R> PooledResource<R> {
    pub(crate) fn new(resource: R, id: u64) -> Self {
        let now = Instant::now();
        Self {
            resource,
            id,
            created_at: now,
            last_used: now,
        }
    }

    /// Pool-unique identifier of this resource.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// When the resource was created.
    #[must_use]
    pub const fn created_at(&self) -> Instant {
        self.created_at
    }

    /// When the resource was last handed out or returned.
    #[must_use]
    pub const fn last_used(&self) -> Instant {
        self.last_used
    }

    /// Mark the resource as used now.
    pub fn touch(&mut self) {
        self.last_used = Instant::now();
    }

    /// Whether the resource has been unused for longer than `timeout`.
    #[must_use]
    pub fn is_idle(&self, timeout: Duration) -> bool {
        self.last_used.elapsed() > timeout
    }

    /// Whether the resource has existed for longer than `lifetime`.
    #[must_use]
    pub fn is_expired(&self, lifetime: Duration) -> bool {
        self.created_at.elapsed() > lifetime
    }

    /// Borrow the underlying resource.
    #[must_use]
    pub const fn get_ref(&self) -> &R {
        &self.resource
    }

    /// Take the underlying resource out of the wrapper. Only the pool does
    /// this, once the slot has been accounted for.
    pub(crate) fn into_inner(self) -> R {
        self.resource
    }
}

impl<R> Deref for PooledResource<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.resource
    }
}

impl<R> DerefMut for PooledResource<R> {
    fn deref_mut(&mut self) -> &mut R {
        &mut self.resource
    }
}
