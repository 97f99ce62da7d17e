//! Traits providing genericity over growth policies.
//!
//! A growth policy owns the memory backing a [`DynArray`](crate::DynArray),
//! decides how much to allocate when the array runs out of room, and knows
//! how to address and move the slots it owns. It never tracks which slots
//! are initialized; that is the array's job.
//!
//! Five policies are provided:
//!
//! * [`HeapStorage`] – a single heap allocation, reallocated on growth.
//! * [`InlineStorage`] – a fixed number of slots stored inline.
//! * [`HybridStorage`] – inline slots that spill to the heap for good once
//!   exceeded.
//! * [`PagedStorage`] – independently allocated fixed-size pages; growing
//!   never moves elements already placed.
//! * [`SliceStorage`] – a borrowed slice of uninitialized memory that is
//!   never grown.

use crate::error::{CapacityError, Result};

use core::mem::size_of;
use core::ptr;

mod heap;
mod hybrid;
mod inline;
mod paged;
mod slice;

pub use heap::HeapStorage;
pub use hybrid::HybridStorage;
pub use inline::InlineStorage;
pub use paged::PagedStorage;
pub use slice::SliceStorage;

/// An interface for the memory backing a growable array.
///
/// # Safety
/// Implementors must ensure that:
/// * `ptr_at` and `mut_ptr_at` return properly aligned, dereferenceable
///   pointers for every index less than `capacity()`, and that distinct
///   indices never alias;
/// * the addresses returned for indices below some `len` only change inside
///   `try_grow`, `purge` and `swap`, and that these preserve the bits stored
///   in the slots `0..len` at their respective indices;
/// * `CONTIGUOUS` is `true` only if `mut_ptr_at(i) == mut_ptr_at(0).add(i)`
///   for all `i <= capacity()`.
pub unsafe trait GrowthPolicy<T>: Sized {
    /// Whether all slots live in a single contiguous block of memory.
    const CONTIGUOUS: bool;

    /// Returns the number of slots currently allocated.
    fn capacity(&self) -> usize;

    /// Returns the growth increment hint, in slots. Zero selects doubling.
    fn grow_size(&self) -> usize;

    /// Sets the growth increment hint used by subsequent growth.
    fn set_grow_size(&mut self, grow_size: usize);

    /// Returns a pointer to the slot at position `index`.
    ///
    /// The value it points to may not be initialized.
    fn ptr_at(&self, index: usize) -> *const T;

    /// Returns a mutable pointer to the slot at position `index`.
    ///
    /// The value it points to may not be initialized.
    fn mut_ptr_at(&mut self, index: usize) -> *mut T;

    /// Makes sure at least `min_capacity` slots exist, keeping the contents
    /// of the first `len` slots.
    ///
    /// This may relocate every slot. How far past `min_capacity` the storage
    /// grows is up to the policy; see [`grown_capacity`] for the default.
    fn try_grow(&mut self, len: usize, min_capacity: usize) -> Result<()>;

    /// Releases storage, keeping room for at least `max(len, keep)` slots
    /// and the contents of the first `len` slots.
    fn purge(&mut self, len: usize, keep: usize);

    /// Moves `count` slots starting at `src` to start at `dst` by copying
    /// their bits. The ranges may overlap.
    ///
    /// The default implementation moves one slot at a time, which is correct
    /// for any addressing scheme.
    ///
    /// # Safety
    /// Both `src + count` and `dst + count` must be less than or equal to
    /// `capacity()`. Afterwards, slots in the source range that are not also
    /// in the destination range must be treated as uninitialized.
    unsafe fn shift(&mut self, src: usize, dst: usize, count: usize) {
        if src == dst || count == 0 {
            return;
        }

        if dst < src {
            for i in 0..count {
                let from = self.ptr_at(src + i);
                let to = self.mut_ptr_at(dst + i);
                ptr::copy_nonoverlapping(from, to, 1);
            }
        } else {
            for i in (0..count).rev() {
                let from = self.ptr_at(src + i);
                let to = self.mut_ptr_at(dst + i);
                ptr::copy_nonoverlapping(from, to, 1);
            }
        }
    }

    /// Exchanges the storage owned by `self` and `other` without touching
    /// any of the slots' contents.
    #[inline]
    fn swap(&mut self, other: &mut Self) {
        core::mem::swap(self, other);
    }
}

/// A growth policy that keeps all slots in a single block of memory.
///
/// # Safety
/// Implementors must set [`GrowthPolicy::CONTIGUOUS`] to `true`.
pub unsafe trait Contiguous<T>: GrowthPolicy<T> {
    /// Returns a pointer to the first slot.
    #[inline]
    fn as_ptr(&self) -> *const T {
        self.ptr_at(0)
    }

    /// Returns a mutable pointer to the first slot.
    #[inline]
    fn as_mut_ptr(&mut self) -> *mut T {
        self.mut_ptr_at(0)
    }
}

/// A growth policy that can allocate its own memory.
pub trait OwnedStorage<T>: GrowthPolicy<T> {
    /// Creates a new storage block with at least `capacity` slots and the
    /// given growth increment hint.
    fn try_with_capacity(grow_size: usize, capacity: usize) -> Result<Self>;
}

/// Shared `shift` implementation for contiguous policies.
///
/// # Safety
/// `base` must be valid for reads and writes of `max(src, dst) + count`
/// elements.
#[inline]
pub(crate) unsafe fn shift_contiguous<T>(base: *mut T, src: usize, dst: usize, count: usize) {
    if src != dst && count != 0 {
        ptr::copy(base.add(src), base.add(dst), count);
    }
}

/// Returns the number of slots a growable policy allocates when it first
/// has to grow with no increment hint set.
///
/// Small elements start out with roughly 32 bytes worth of slots, large
/// ones with a single slot.
#[inline]
pub fn initial_capacity<T>() -> usize {
    match size_of::<T>() {
        0 => usize::MAX,
        size => usize::max(1, (31 + size) / size),
    }
}

/// Computes the capacity to grow to, given the current capacity, the
/// requested minimum and a growth increment hint.
///
/// With a non-zero `grow_size`, `min_capacity` is rounded up to a multiple
/// of it. Otherwise the capacity doubles, starting from
/// [`initial_capacity`], until it covers `min_capacity`.
///
/// # Examples
/// ```
/// use polyvec::storage::grown_capacity;
/// assert_eq!(grown_capacity::<u64>(4, 5, 0), Ok(8));
/// assert_eq!(grown_capacity::<u64>(4, 17, 0), Ok(32));
/// assert_eq!(grown_capacity::<u64>(4, 5, 3), Ok(6));
/// assert_eq!(grown_capacity::<u64>(0, 1, 0), Ok(4));
/// ```
pub fn grown_capacity<T>(current: usize, min_capacity: usize, grow_size: usize) -> Result<usize> {
    if min_capacity <= current {
        return Ok(current);
    }

    if grow_size > 0 {
        let rounded = min_capacity
            .checked_add(grow_size - 1)
            .ok_or(CapacityError::Overflow {
                requested: min_capacity,
            })?;
        return Ok(rounded / grow_size * grow_size);
    }

    let mut capacity = if current == 0 {
        initial_capacity::<T>()
    } else {
        current
    };
    while capacity < min_capacity {
        capacity = capacity.checked_mul(2).unwrap_or(min_capacity);
    }

    Ok(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_capacity_scales_with_element_size() {
        assert_eq!(initial_capacity::<u8>(), 32);
        assert_eq!(initial_capacity::<u32>(), 8);
        assert_eq!(initial_capacity::<[u8; 100]>(), 1);
        assert_eq!(initial_capacity::<()>(), usize::MAX);
    }

    #[test]
    fn doubling_saturates_at_the_request() {
        let huge = usize::MAX - 3;
        assert_eq!(grown_capacity::<u8>(usize::MAX / 2 + 1, huge, 0), Ok(huge));
    }

    #[test]
    fn increment_rounding_reports_overflow() {
        assert_eq!(
            grown_capacity::<u8>(0, usize::MAX, 16),
            Err(CapacityError::Overflow { requested: usize::MAX })
        );
    }

    #[test]
    fn no_growth_needed() {
        assert_eq!(grown_capacity::<u8>(10, 10, 0), Ok(10));
        assert_eq!(grown_capacity::<u8>(10, 3, 7), Ok(10));
    }
}
