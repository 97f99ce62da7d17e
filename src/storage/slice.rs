use super::{shift_contiguous, Contiguous, GrowthPolicy};
use crate::error::{CapacityError, Result};

use core::mem::MaybeUninit;

/// Shorthand for `&'a mut [MaybeUninit<T>]` for use with
/// [`DynArray`](crate::DynArray).
///
/// The borrowed slice is the whole of the storage; it is never grown,
/// purged or freed.
///
/// # Examples
/// ```
/// use core::mem::MaybeUninit;
/// use polyvec::SliceArray;
/// let mut backing = [MaybeUninit::<u8>::uninit(); 4];
/// let mut array = SliceArray::from(&mut backing[..]);
/// array.add_to_tail(1);
/// array.add_to_tail(2);
/// assert_eq!(array.capacity(), 4);
/// assert_eq!(array.try_insert_before(0, 0), Ok(0));
/// ```
pub type SliceStorage<'a, T> = &'a mut [MaybeUninit<T>];

unsafe impl<T> GrowthPolicy<T> for SliceStorage<'_, T> {
    const CONTIGUOUS: bool = true;

    #[inline]
    fn capacity(&self) -> usize {
        <[MaybeUninit<T>]>::len(self)
    }

    #[inline]
    fn grow_size(&self) -> usize {
        0
    }

    #[inline]
    fn set_grow_size(&mut self, _grow_size: usize) {}

    #[inline]
    fn ptr_at(&self, index: usize) -> *const T {
        debug_assert!(index <= self.len());
        <[MaybeUninit<T>]>::as_ptr(self).wrapping_add(index).cast()
    }

    #[inline]
    fn mut_ptr_at(&mut self, index: usize) -> *mut T {
        debug_assert!(index <= self.len());
        <[MaybeUninit<T>]>::as_mut_ptr(self).wrapping_add(index).cast()
    }

    #[inline]
    fn try_grow(&mut self, _len: usize, min_capacity: usize) -> Result<()> {
        if min_capacity > self.len() {
            return Err(CapacityError::FixedCapacity {
                capacity: self.len(),
            });
        }
        Ok(())
    }

    #[inline]
    fn purge(&mut self, _len: usize, _keep: usize) {}

    #[inline]
    unsafe fn shift(&mut self, src: usize, dst: usize, count: usize) {
        shift_contiguous(<[MaybeUninit<T>]>::as_mut_ptr(self).cast::<T>(), src, dst, count);
    }
}

unsafe impl<T> Contiguous<T> for SliceStorage<'_, T> {}
