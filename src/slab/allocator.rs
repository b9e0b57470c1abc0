//! Slab registry implementation

use super::size_class::{Recycled, SizeClass, Slab, SlabStatus};
use super::slot::Address;
use crate::error::{Error, Result};
use crate::metrics;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

/// Registry of slabs keyed by size class
///
/// Slabs are created lazily on first allocation and live until teardown.
/// Every block handed out is owned here, so dropping the registry releases
/// all memory exactly once.
#[derive(Debug, Default)]
pub struct SlabRegistry {
    slabs: HashMap<SizeClass, Slab>,
}

impl SlabRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate one object of `size_class` bytes
    pub fn allocate(&mut self, size_class: SizeClass) -> Address {
        let slab = self.slabs.entry(size_class).or_insert_with(|| {
            info!(%size_class, "Creating slab");
            Slab::new(size_class)
        });

        let address = slab.allocate();
        metrics::record_status(size_class, slab.status());
        address
    }

    /// Return an object to its slab
    pub fn deallocate(&mut self, size_class: SizeClass, address: Address) -> Result<Recycled> {
        let slab = self.slabs.get_mut(&size_class).ok_or_else(|| {
            debug!(%size_class, %address, "Deallocate against unknown size class");
            Error::UnknownSizeClass(size_class)
        })?;

        let recycled = slab.deallocate(address)?;
        metrics::record_status(size_class, slab.status());
        Ok(recycled)
    }

    /// Allocated/free counts for a size class
    pub fn status(&self, size_class: SizeClass) -> Result<SlabStatus> {
        self.slabs
            .get(&size_class)
            .map(Slab::status)
            .ok_or(Error::NotFound(size_class))
    }

    /// Look up the slab for a size class
    pub fn slab(&self, size_class: SizeClass) -> Option<&Slab> {
        self.slabs.get(&size_class)
    }

    /// Known size classes, smallest first
    pub fn size_classes(&self) -> Vec<SizeClass> {
        let mut classes: Vec<_> = self.slabs.keys().copied().collect();
        classes.sort_unstable();
        classes
    }

    pub fn is_empty(&self) -> bool {
        self.slabs.is_empty()
    }

    /// Get statistics about the registry
    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats::default();

        for size_class in self.size_classes() {
            let slab = &self.slabs[&size_class];
            let status = slab.status();
            let class_stats = SizeClassStats {
                size_class,
                allocated: status.allocated,
                free: status.free,
                total_blocks: slab.total_blocks(),
                reserved_bytes: slab.reserved_bytes(),
            };
            stats.reserved_bytes += class_stats.reserved_bytes;
            stats.size_classes.push(class_stats);
        }

        stats
    }

    /// Release every block of every slab and discard the slabs
    ///
    /// Safe to call more than once; later calls release nothing.
    pub fn teardown(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();

        for (size_class, mut slab) in self.slabs.drain() {
            let released = slab.release_all();
            report.slabs += 1;
            report.blocks_released += released;
            report.bytes_released += released * size_class.bytes();
            metrics::record_status(size_class, SlabStatus::default());
        }

        if report.slabs > 0 {
            info!(
                slabs = report.slabs,
                blocks = report.blocks_released,
                bytes = report.bytes_released,
                "Slab registry torn down"
            );
        }
        report
    }
}

impl Drop for SlabRegistry {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Statistics for the slab registry
#[derive(Debug, Default, Clone, Serialize)]
pub struct RegistryStats {
    pub size_classes: Vec<SizeClassStats>,
    pub reserved_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeClassStats {
    pub size_class: SizeClass,
    pub allocated: usize,
    pub free: usize,
    pub total_blocks: usize,
    pub reserved_bytes: usize,
}

/// What a teardown released
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TeardownReport {
    pub slabs: usize,
    pub blocks_released: usize,
    pub bytes_released: usize,
}
