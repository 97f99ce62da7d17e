#![no_std]
#![cfg_attr(docs_rs, feature(doc_cfg))]
#![warn(missing_docs)]

//! Growable arrays that are generic over their growth policy.
//!
//! A [`DynArray`] tracks which of its slots hold elements; the memory itself
//! is owned by a [`GrowthPolicy`](storage::GrowthPolicy) that decides how
//! much to allocate and where each slot lives. The policies in
//! [`storage`] cover a reallocating heap block, a fixed inline buffer, an
//! inline buffer that spills to the heap, a list of fixed-size pages, and a
//! borrowed slice.
//!
//! ```
//! use polyvec::{BlockArray, FixedArray, HeapArray};
//!
//! let mut heap = HeapArray::<u8>::new(0, 4);
//! heap.add_multiple_to_tail_from(&[3, 1, 2]);
//! heap.sort();
//! assert_eq!(heap, [1, 2, 3]);
//!
//! let mut fixed = FixedArray::<u8, 8>::default();
//! fixed.add_vector_to_tail(&heap);
//! assert_eq!(fixed.find(&2), Some(1));
//!
//! let mut pages = BlockArray::new(2, 0);
//! pages.assign(&fixed);
//! assert_eq!(pages.storage().page_count(), 2);
//! ```

extern crate alloc;
#[cfg(test)]
extern crate std;

pub mod array;
pub mod collections;
pub mod error;
pub mod storage;

#[cfg(test)]
mod test_utils;

pub use crate::array::DynArray;
pub use crate::collections::{
    BlockArray, CopyableArray, FixedArray, FixedGrowableArray, HeapArray, SliceArray,
};
#[cfg(feature = "sync")]
#[cfg_attr(docs_rs, doc(cfg(feature = "sync")))]
pub use crate::collections::LockedArray;
pub use crate::error::{CapacityError, Result};
