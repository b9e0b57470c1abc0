//! Slab Allocator
//!
//! Hands out fixed-size blocks grouped by size class. Each size class owns a
//! slab that recycles freed blocks before obtaining fresh memory.
//!
//! # Architecture
//!
//! ```text
//! SlabRegistry
//!   ├─→ Slab(16B)   → Allocated: [A1, A2]  Free: [A0]
//!   ├─→ Slab(64B)   → Allocated: [B0]      Free: []
//!   └─→ Slab(512B)  → Allocated: []        Free: [C0, C1]
//! ```
//!
//! Slabs are created on first allocation. Blocks are only released when the
//! registry is torn down; deallocation returns them to their slab's free stack.
//! Deallocating an address the slab never issued, or one already free, is
//! reported as an error and changes nothing.

pub mod allocator;
pub mod shared;
pub mod size_class;
pub mod slot;

pub use allocator::{RegistryStats, SizeClassStats, SlabRegistry, TeardownReport};
pub use shared::SharedRegistry;
pub use size_class::{Recycled, SizeClass, Slab, SlabStatus};
pub use slot::{Address, Block, BlockState};
