//! Block and address management for the slab allocator

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque address of a block handed out by a slab
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(usize);

impl Address {
    /// Wrap a raw address value
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }

    /// Raw pointer-sized value
    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl FromStr for Address {
    type Err = Error;

    /// Parses hex with an optional `0x` prefix
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        usize::from_str_radix(digits, 16)
            .map(Address)
            .map_err(|e| Error::InvalidAddress(format!("{:?}: {}", s, e)))
    }
}

/// Which side of the allocated/free partition a block sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockState {
    Allocated,
    Free,
}

/// A fixed-size region of raw memory owned by a slab
///
/// The backing buffer is never resized or moved, so its address is stable for
/// the block's whole life. Dropping the block releases the memory.
#[derive(Debug)]
pub struct Block {
    memory: Box<[u8]>,
    state: BlockState,
}

impl Block {
    /// Obtain fresh memory of `size` bytes; the block starts out allocated
    pub fn fresh(size: usize) -> Self {
        Self {
            memory: vec![0u8; size].into_boxed_slice(),
            state: BlockState::Allocated,
        }
    }

    pub fn address(&self) -> Address {
        Address(self.memory.as_ptr() as usize)
    }

    pub fn size(&self) -> usize {
        self.memory.len()
    }

    pub fn state(&self) -> BlockState {
        self.state
    }

    pub fn is_allocated(&self) -> bool {
        self.state == BlockState::Allocated
    }

    /// Hand this block out
    pub fn allocate(&mut self) {
        self.state = BlockState::Allocated;
    }

    /// Return this block to the pool
    pub fn free(&mut self) {
        self.state = BlockState::Free;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_display_and_parse() -> Result<()> {
        let addr = Address::new(0xdead);
        assert_eq!(addr.to_string(), "0xdead");

        assert_eq!("0xdead".parse::<Address>()?, addr);
        assert_eq!("DEAD".parse::<Address>()?, addr);
        assert_eq!("  0XdEaD ".parse::<Address>()?, addr);
        Ok(())
    }

    #[test]
    fn test_address_parse_rejects_garbage() {
        let err = "0xzz".parse::<Address>().unwrap_err();
        assert!(matches!(err, Error::InvalidAddress(_)));
        assert!("".parse::<Address>().is_err());
    }

    #[test]
    fn test_block_lifecycle() {
        let mut block = Block::fresh(64);

        assert_eq!(block.size(), 64);
        assert!(block.is_allocated());
        assert_ne!(block.address().get(), 0);

        let addr = block.address();
        block.free();
        assert_eq!(block.state(), BlockState::Free);

        block.allocate();
        assert!(block.is_allocated());
        // Address is stable across state changes
        assert_eq!(block.address(), addr);
    }

    #[test]
    fn test_fresh_blocks_have_distinct_addresses() {
        let a = Block::fresh(16);
        let b = Block::fresh(16);
        assert_ne!(a.address(), b.address());
    }
}
