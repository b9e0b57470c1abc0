// slabsim - Slab Allocator Simulator
// Size-class object pools with reuse-first allocation and misuse detection

#![warn(rust_2018_idioms)]

pub mod config;
pub mod metrics;
pub mod session;
pub mod slab;

// Re-exports for convenience
pub use session::Session;
pub use slab::{Address, SharedRegistry, SizeClass, Slab, SlabRegistry, SlabStatus};

/// slabsim error types
pub mod error {
    use crate::slab::{Address, SizeClass};
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum Error {
        #[error("Unmanaged address {address} for size class {size_class}")]
        UnmanagedAddress {
            size_class: SizeClass,
            address: Address,
        },

        #[error("Double free of {address} in size class {size_class}")]
        DoubleFree {
            size_class: SizeClass,
            address: Address,
        },

        #[error("Unknown size class: {0}")]
        UnknownSizeClass(SizeClass),

        #[error("Not found: no slab allocated yet for {0}")]
        NotFound(SizeClass),

        #[error("Invalid size class: {0} bytes (must be positive)")]
        InvalidSizeClass(usize),

        #[error("Invalid address: {0}")]
        InvalidAddress(String),

        #[error("Nothing to deallocate")]
        NothingToDeallocate,

        #[error("Configuration error: {0}")]
        Config(String),
    }

    impl Error {
        /// True for errors caused by handing the engine something it never issued
        /// or no longer owns on the caller's behalf.
        pub fn is_misuse(&self) -> bool {
            matches!(
                self,
                Error::UnmanagedAddress { .. }
                    | Error::DoubleFree { .. }
                    | Error::UnknownSizeClass(_)
                    | Error::NothingToDeallocate
            )
        }
    }

    pub type Result<T> = std::result::Result<T, Error>;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::error::Error;
    use super::*;

    #[test]
    fn test_version_format() {
        assert!(!VERSION.is_empty());
        assert_eq!(VERSION.split('.').count(), 3);
    }

    #[test]
    fn test_misuse_classification() {
        let sc = SizeClass::new(16).unwrap();
        let addr = Address::new(0xdead);

        assert!(Error::UnmanagedAddress {
            size_class: sc,
            address: addr
        }
        .is_misuse());
        assert!(Error::DoubleFree {
            size_class: sc,
            address: addr
        }
        .is_misuse());
        assert!(Error::UnknownSizeClass(sc).is_misuse());
        assert!(!Error::NotFound(sc).is_misuse());
        assert!(!Error::InvalidSizeClass(0).is_misuse());
    }

    #[test]
    fn test_error_messages() {
        let sc = SizeClass::new(32).unwrap();
        assert_eq!(
            Error::NotFound(sc).to_string(),
            "Not found: no slab allocated yet for 32B"
        );
        assert_eq!(
            Error::UnmanagedAddress {
                size_class: sc,
                address: Address::new(0xdead),
            }
            .to_string(),
            "Unmanaged address 0xdead for size class 32B"
        );
    }
}
