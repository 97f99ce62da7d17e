use super::{shift_contiguous, Contiguous, GrowthPolicy, OwnedStorage};
use crate::error::{CapacityError, Result};

use core::mem::MaybeUninit;

/// A fixed number of slots stored inline, i.e. wherever the owning array
/// itself lives.
///
/// Requests for more than `N` slots fail with
/// [`CapacityError::FixedCapacity`].
///
/// # Examples
/// ```
/// use polyvec::storage::{GrowthPolicy, InlineStorage};
/// let mut storage = InlineStorage::<char, 4>::new();
/// assert_eq!(storage.capacity(), 4);
/// assert!(storage.try_grow(0, 4).is_ok());
/// assert!(storage.try_grow(0, 5).is_err());
/// ```
pub struct InlineStorage<T, const N: usize> {
    buf: [MaybeUninit<T>; N],
}

impl<T, const N: usize> InlineStorage<T, N> {
    /// Creates a block of `N` uninitialized slots.
    #[inline]
    pub fn new() -> Self {
        InlineStorage {
            // an array of `MaybeUninit` needs no initialization
            buf: unsafe { MaybeUninit::<[MaybeUninit<T>; N]>::uninit().assume_init() },
        }
    }
}

impl<T, const N: usize> Default for InlineStorage<T, N> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl<T, const N: usize> GrowthPolicy<T> for InlineStorage<T, N> {
    const CONTIGUOUS: bool = true;

    #[inline]
    fn capacity(&self) -> usize {
        N
    }

    #[inline]
    fn grow_size(&self) -> usize {
        0
    }

    #[inline]
    fn set_grow_size(&mut self, _grow_size: usize) {}

    #[inline]
    fn ptr_at(&self, index: usize) -> *const T {
        debug_assert!(index <= N);
        self.buf.as_ptr().wrapping_add(index).cast()
    }

    #[inline]
    fn mut_ptr_at(&mut self, index: usize) -> *mut T {
        debug_assert!(index <= N);
        self.buf.as_mut_ptr().wrapping_add(index).cast()
    }

    #[inline]
    fn try_grow(&mut self, _len: usize, min_capacity: usize) -> Result<()> {
        if min_capacity > N {
            return Err(CapacityError::FixedCapacity { capacity: N });
        }
        Ok(())
    }

    #[inline]
    fn purge(&mut self, _len: usize, _keep: usize) {}

    #[inline]
    unsafe fn shift(&mut self, src: usize, dst: usize, count: usize) {
        shift_contiguous(self.buf.as_mut_ptr().cast::<T>(), src, dst, count);
    }
}

unsafe impl<T, const N: usize> Contiguous<T> for InlineStorage<T, N> {}

impl<T, const N: usize> OwnedStorage<T> for InlineStorage<T, N> {
    #[inline]
    fn try_with_capacity(_grow_size: usize, capacity: usize) -> Result<Self> {
        if capacity > N {
            return Err(CapacityError::FixedCapacity { capacity: N });
        }
        Ok(Self::new())
    }
}
