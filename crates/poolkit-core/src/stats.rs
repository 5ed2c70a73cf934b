//! Serialized statistics storage.
//!
//! Each pool owns exactly one statistics record. All writes go through
//! [`StatsCell::update`], which applies a closure under an exclusive lock, so
//! a concurrent [`StatsCell::snapshot`] never observes a half-applied update.

use std::sync::RwLock;

/// A statistics record guarded by a reader-writer lock.
#[derive(Debug, Default)]
pub struct StatsCell<S> {
    inner: RwLock<S>,
}

impl<S> StatsCell<S> {
    /// Create a new cell holding `initial`.
    #[must_use]
    pub const fn new(initial: S) -> Self {
        Self {
            inner: RwLock::new(initial),
        }
    }

    /// Apply `f` to the record under the exclusive lock.
    pub fn update<T>(&self, f: impl FnOnce(&mut S) -> T) -> T {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    /// Read from the record under the shared lock.
    pub fn read<T>(&self, f: impl FnOnce(&S) -> T) -> T {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }
}

impl<S: Clone> StatsCell<S> {
    /// Return a copy of the current record.
    #[must_use]
    pub fn snapshot(&self) -> S {
        self.read(Clone::clone)
    }
}
