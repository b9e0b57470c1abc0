//! Thread-safe handle to a slab registry

use super::allocator::{RegistryStats, SlabRegistry, TeardownReport};
use super::size_class::{Recycled, SizeClass, SlabStatus};
use super::slot::Address;
use crate::error::Result;
use parking_lot::Mutex;
use std::sync::Arc;

/// Cloneable handle that serializes every call through one lock
#[derive(Debug, Clone, Default)]
pub struct SharedRegistry {
    inner: Arc<Mutex<SlabRegistry>>,
}

impl SharedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&self, size_class: SizeClass) -> Address {
        self.inner.lock().allocate(size_class)
    }

    pub fn deallocate(&self, size_class: SizeClass, address: Address) -> Result<Recycled> {
        self.inner.lock().deallocate(size_class, address)
    }

    pub fn status(&self, size_class: SizeClass) -> Result<SlabStatus> {
        self.inner.lock().status(size_class)
    }

    pub fn stats(&self) -> RegistryStats {
        self.inner.lock().stats()
    }

    pub fn teardown(&self) -> TeardownReport {
        self.inner.lock().teardown()
    }

    /// Run `f` with exclusive access to the registry
    pub fn with<R>(&self, f: impl FnOnce(&mut SlabRegistry) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl From<SlabRegistry> for SharedRegistry {
    fn from(registry: SlabRegistry) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
        }
    }
}
