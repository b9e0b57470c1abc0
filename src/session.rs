//! Interactive session state
//!
//! A session drives one registry at a fixed object size and remembers the
//! addresses the user currently holds, newest last. The menu's "deallocate last
//! allocated object" and "simulate one cycle" actions are built on it.

use crate::error::{Error, Result};
use crate::slab::{Address, Recycled, SizeClass, SlabRegistry, SlabStatus};
use serde::Serialize;
use tracing::debug;

/// Result of one allocate + deallocate cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub allocated: Address,
    pub deallocated: Address,
    pub recycled: bool,
    pub status: SlabStatus,
}

/// Outcome of a "deallocate last" action
///
/// The address leaves the session's holdings whether or not the engine
/// accepted it, matching what the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deallocation {
    pub address: Address,
    pub outcome: Result<Recycled>,
}

#[derive(Debug)]
pub struct Session {
    registry: SlabRegistry,
    size_class: SizeClass,
    live: Vec<Address>,
}

impl Session {
    pub fn new(size_class: SizeClass) -> Self {
        Self::with_registry(SlabRegistry::new(), size_class)
    }

    pub fn with_registry(registry: SlabRegistry, size_class: SizeClass) -> Self {
        Self {
            registry,
            size_class,
            live: Vec::new(),
        }
    }

    pub fn size_class(&self) -> SizeClass {
        self.size_class
    }

    /// Addresses currently held, oldest first
    pub fn live(&self) -> &[Address] {
        &self.live
    }

    pub fn registry(&self) -> &SlabRegistry {
        &self.registry
    }

    pub fn allocate(&mut self) -> Address {
        let address = self.registry.allocate(self.size_class);
        self.live.push(address);
        address
    }

    /// Deallocate the most recently allocated address still held
    pub fn deallocate_last(&mut self) -> Result<Deallocation> {
        let address = self.live.pop().ok_or(Error::NothingToDeallocate)?;
        let outcome = self.registry.deallocate(self.size_class, address);
        debug!(%address, ok = outcome.is_ok(), "Session deallocation");
        Ok(Deallocation { address, outcome })
    }

    pub fn status(&self) -> Result<SlabStatus> {
        self.registry.status(self.size_class)
    }

    /// Allocate one object, then immediately deallocate the newest held one
    pub fn simulate_cycle(&mut self) -> Result<CycleReport> {
        let allocated = self.allocate();
        let dealloc = self.deallocate_last()?;
        Ok(CycleReport {
            allocated,
            deallocated: dealloc.address,
            recycled: dealloc.outcome.is_ok(),
            status: self.status()?,
        })
    }

    /// Tear the session down, releasing all engine memory
    pub fn finish(mut self) -> crate::slab::TeardownReport {
        self.live.clear();
        self.registry.teardown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(bytes: usize) -> Session {
        Session::new(SizeClass::new(bytes).unwrap())
    }

    #[test]
    fn test_deallocate_last_is_lifo() -> Result<()> {
        let mut s = session(16);
        let a = s.allocate();
        let b = s.allocate();

        let d = s.deallocate_last()?;
        assert_eq!(d.address, b);
        assert!(d.outcome.is_ok());
        assert_eq!(s.live(), &[a]);
        assert_eq!(s.status()?, SlabStatus { allocated: 1, free: 1 });
        Ok(())
    }

    #[test]
    fn test_deallocate_with_nothing_held() {
        let mut s = session(16);
        assert_eq!(s.deallocate_last().unwrap_err(), Error::NothingToDeallocate);
        assert_eq!(s.status(), Err(Error::NotFound(s.size_class())));
    }

    #[test]
    fn test_simulate_cycle_reuses_block() -> Result<()> {
        let mut s = session(32);

        let first = s.simulate_cycle()?;
        assert_eq!(first.allocated, first.deallocated);
        assert!(first.recycled);
        assert_eq!(first.status, SlabStatus { allocated: 0, free: 1 });

        let second = s.simulate_cycle()?;
        assert_eq!(second.allocated, first.allocated);
        assert_eq!(s.registry().slab(s.size_class()).unwrap().total_blocks(), 1);
        Ok(())
    }

    #[test]
    fn test_finish_releases_everything() {
        let mut s = session(64);
        s.allocate();
        s.allocate();
        s.simulate_cycle().unwrap();

        let report = s.finish();
        assert_eq!(report.slabs, 1);
        assert_eq!(report.blocks_released, 3);
    }
}
