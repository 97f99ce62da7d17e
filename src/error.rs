//! The error type reported by growth policies.

use core::fmt::{self, Display, Formatter};

/// The error type returned when a growth policy cannot provide the requested
/// number of slots.
///
/// The array types treat every one of these as fatal in their default API;
/// the `try_*` methods hand them back to the caller instead.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CapacityError {
    /// The storage cannot grow beyond its current capacity.
    FixedCapacity {
        /// The number of slots the storage is limited to.
        capacity: usize,
    },
    /// The requested capacity cannot be represented as an allocation size.
    Overflow {
        /// The number of slots that was asked for.
        requested: usize,
    },
    /// The global allocator returned null.
    AllocFailed {
        /// The size of the failed allocation in bytes.
        bytes: usize,
    },
}

impl Display for CapacityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::FixedCapacity { capacity } => {
                write!(f, "exceeded fixed capacity of {}", capacity)
            }
            Self::Overflow { requested } => {
                write!(f, "capacity of {} slots overflows the address space", requested)
            }
            Self::AllocFailed { bytes } => {
                write!(f, "allocation of {} bytes failed", bytes)
            }
        }
    }
}

impl core::error::Error for CapacityError {}

/// A specialized [`Result`](core::result::Result) type for operations that
/// request storage.
pub type Result<T> = core::result::Result<T, CapacityError>;
