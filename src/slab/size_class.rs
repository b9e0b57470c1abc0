//! Size class management for slab allocator

use super::slot::{Address, Block, BlockState};
use crate::error::{Error, Result};
use crate::metrics;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use tracing::{debug, warn};

/// Object size in bytes served by one slab
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct SizeClass(NonZeroUsize);

impl SizeClass {
    /// Create a size class, rejecting zero-sized objects
    pub fn new(bytes: usize) -> Result<Self> {
        NonZeroUsize::new(bytes)
            .map(Self)
            .ok_or(Error::InvalidSizeClass(bytes))
    }

    /// Bytes per object
    pub fn bytes(self) -> usize {
        self.0.get()
    }
}

impl TryFrom<usize> for SizeClass {
    type Error = Error;

    fn try_from(bytes: usize) -> Result<Self> {
        Self::new(bytes)
    }
}

impl From<SizeClass> for usize {
    fn from(sc: SizeClass) -> usize {
        sc.bytes()
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}B", self.0)
    }
}

/// Allocated/free counts of a slab
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlabStatus {
    pub allocated: usize,
    pub free: usize,
}

impl SlabStatus {
    /// Every block ever obtained for the class
    pub fn total(&self) -> usize {
        self.allocated + self.free
    }
}

/// Outcome of a successful deallocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recycled {
    pub size_class: SizeClass,
    pub address: Address,
}

/// Pool of fixed-size blocks for one size class
///
/// Blocks live in an arena and never move. `index` maps an address back to its
/// arena slot, and `free` is a LIFO stack of slots ready for reuse, so the most
/// recently freed block is handed out first.
#[derive(Debug)]
pub struct Slab {
    size_class: SizeClass,
    blocks: Vec<Block>,
    index: HashMap<Address, usize>,
    free: Vec<usize>,
}

impl Slab {
    /// Create an empty slab
    pub fn new(size_class: SizeClass) -> Self {
        Self {
            size_class,
            blocks: Vec::new(),
            index: HashMap::new(),
            free: Vec::new(),
        }
    }

    pub fn size_class(&self) -> SizeClass {
        self.size_class
    }

    /// Allocate a block from this slab
    ///
    /// Reuses a free block when one exists; otherwise obtains fresh memory.
    pub fn allocate(&mut self) -> Address {
        // Try to reuse a free block first
        if let Some(slot) = self.free.pop() {
            let block = &mut self.blocks[slot];
            block.allocate();
            let address = block.address();

            metrics::record_allocation(self.size_class, false);
            debug!(size_class = %self.size_class, %address, "Reused free block");
            return address;
        }

        // Otherwise, obtain a fresh block
        let block = Block::fresh(self.size_class.bytes());
        let address = block.address();
        self.index.insert(address, self.blocks.len());
        self.blocks.push(block);

        metrics::record_allocation(self.size_class, true);
        debug!(size_class = %self.size_class, %address, "Allocated fresh block");
        address
    }

    /// Return a block to the free pool
    ///
    /// Misuse leaves the slab untouched and is reported as an error.
    pub fn deallocate(&mut self, address: Address) -> Result<Recycled> {
        let slot = match self.index.get(&address) {
            Some(&slot) => slot,
            None => {
                warn!(size_class = %self.size_class, %address, "Deallocating unmanaged address");
                metrics::record_deallocation(self.size_class, "unmanaged");
                return Err(Error::UnmanagedAddress {
                    size_class: self.size_class,
                    address,
                });
            }
        };

        let block = &mut self.blocks[slot];
        if block.state() == BlockState::Free {
            warn!(size_class = %self.size_class, %address, "Double free detected");
            metrics::record_deallocation(self.size_class, "double_free");
            return Err(Error::DoubleFree {
                size_class: self.size_class,
                address,
            });
        }

        block.free();
        self.free.push(slot);

        metrics::record_deallocation(self.size_class, "recycled");
        debug!(size_class = %self.size_class, %address, "Recycled block");
        Ok(Recycled {
            size_class: self.size_class,
            address,
        })
    }

    /// Current allocated/free counts
    pub fn status(&self) -> SlabStatus {
        SlabStatus {
            allocated: self.blocks.len() - self.free.len(),
            free: self.free.len(),
        }
    }

    /// Number of blocks ever obtained for this slab
    pub fn total_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Bytes held by this slab, allocated or free
    pub fn reserved_bytes(&self) -> usize {
        self.blocks.len() * self.size_class.bytes()
    }

    /// Check whether this slab issued `address`
    pub fn contains(&self, address: Address) -> bool {
        self.index.contains_key(&address)
    }

    /// Check whether `address` is currently handed out
    pub fn is_allocated(&self, address: Address) -> bool {
        self.index
            .get(&address)
            .is_some_and(|&slot| self.blocks[slot].is_allocated())
    }

    /// Release every block, returning how many were released
    pub(crate) fn release_all(&mut self) -> usize {
        let released = self.blocks.len();
        self.index.clear();
        self.free.clear();
        self.blocks.clear();
        released
    }
}
