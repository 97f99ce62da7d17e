use super::{grown_capacity, shift_contiguous, Contiguous, GrowthPolicy, OwnedStorage};
use crate::error::{CapacityError, Result};

use alloc::alloc::{alloc, dealloc, realloc, Layout};
use core::marker::PhantomData;
use core::mem::size_of;
use core::ptr::NonNull;

/// A single heap allocation that is reallocated whenever more room is needed.
///
/// Growth relocates every slot, so no address handed out before a growth
/// step remains valid afterwards.
///
/// # Examples
/// ```
/// use polyvec::storage::{GrowthPolicy, HeapStorage};
/// let mut storage = HeapStorage::<u32>::with_grow_size(0);
/// assert_eq!(storage.capacity(), 0);
/// storage.try_grow(0, 5).unwrap();
/// assert_eq!(storage.capacity(), 8);
/// ```
pub struct HeapStorage<T> {
    ptr: NonNull<T>,
    cap: usize,
    grow_size: usize,
    elem: PhantomData<T>,
}

unsafe impl<T: Send> Send for HeapStorage<T> {}
unsafe impl<T: Sync> Sync for HeapStorage<T> {}

impl<T> HeapStorage<T> {
    /// Creates an empty storage block that doubles its capacity on growth.
    #[inline]
    pub fn new() -> Self {
        Self::with_grow_size(0)
    }

    /// Creates an empty storage block with the given growth increment hint.
    ///
    /// Zero-sized types never allocate and report a capacity of `usize::MAX`.
    pub fn with_grow_size(grow_size: usize) -> Self {
        HeapStorage {
            ptr: NonNull::dangling(),
            cap: if size_of::<T>() == 0 { usize::MAX } else { 0 },
            grow_size,
            elem: PhantomData,
        }
    }

    fn resize_to(&mut self, new_cap: usize) -> Result<()> {
        if size_of::<T>() == 0 || new_cap == self.cap {
            return Ok(());
        }

        if new_cap == 0 {
            self.release();
            return Ok(());
        }

        let new_layout =
            Layout::array::<T>(new_cap).map_err(|_| CapacityError::Overflow { requested: new_cap })?;

        let raw = unsafe {
            if self.cap == 0 {
                alloc(new_layout)
            } else {
                let old_layout = Layout::array::<T>(self.cap).unwrap_unchecked();
                realloc(self.ptr.as_ptr().cast(), old_layout, new_layout.size())
            }
        };

        // on failure the old block is untouched and still owned by us
        self.ptr = NonNull::new(raw.cast()).ok_or(CapacityError::AllocFailed {
            bytes: new_layout.size(),
        })?;
        self.cap = new_cap;
        Ok(())
    }

    fn release(&mut self) {
        if size_of::<T>() == 0 || self.cap == 0 {
            return;
        }

        unsafe {
            let layout = Layout::array::<T>(self.cap).unwrap_unchecked();
            dealloc(self.ptr.as_ptr().cast(), layout);
        }
        self.ptr = NonNull::dangling();
        self.cap = 0;
    }
}

impl<T> Default for HeapStorage<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for HeapStorage<T> {
    fn drop(&mut self) {
        self.release();
    }
}

unsafe impl<T> GrowthPolicy<T> for HeapStorage<T> {
    const CONTIGUOUS: bool = true;

    #[inline]
    fn capacity(&self) -> usize {
        self.cap
    }

    #[inline]
    fn grow_size(&self) -> usize {
        self.grow_size
    }

    #[inline]
    fn set_grow_size(&mut self, grow_size: usize) {
        self.grow_size = grow_size;
    }

    #[inline]
    fn ptr_at(&self, index: usize) -> *const T {
        debug_assert!(index <= self.cap);
        self.ptr.as_ptr().wrapping_add(index)
    }

    #[inline]
    fn mut_ptr_at(&mut self, index: usize) -> *mut T {
        debug_assert!(index <= self.cap);
        self.ptr.as_ptr().wrapping_add(index)
    }

    fn try_grow(&mut self, _len: usize, min_capacity: usize) -> Result<()> {
        if min_capacity <= self.cap {
            return Ok(());
        }

        let new_cap = grown_capacity::<T>(self.cap, min_capacity, self.grow_size)?;
        self.resize_to(new_cap)
    }

    fn purge(&mut self, len: usize, keep: usize) {
        let keep = usize::max(len, keep);
        if keep < self.cap {
            // a failed shrink keeps the larger block
            let _ = self.resize_to(keep);
        }
    }

    #[inline]
    unsafe fn shift(&mut self, src: usize, dst: usize, count: usize) {
        shift_contiguous(self.ptr.as_ptr(), src, dst, count);
    }
}

unsafe impl<T> Contiguous<T> for HeapStorage<T> {}

impl<T> OwnedStorage<T> for HeapStorage<T> {
    fn try_with_capacity(grow_size: usize, capacity: usize) -> Result<Self> {
        let mut storage = Self::with_grow_size(grow_size);
        if capacity > storage.cap {
            storage.resize_to(capacity)?;
        }
        Ok(storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growth_preserves_contents() {
        let mut storage = HeapStorage::<u64>::try_with_capacity(0, 2).unwrap();
        assert_eq!(storage.capacity(), 2);
        unsafe {
            storage.mut_ptr_at(0).write(11);
            storage.mut_ptr_at(1).write(22);
        }

        storage.try_grow(2, 3).unwrap();
        assert_eq!(storage.capacity(), 4);
        unsafe {
            assert_eq!(storage.ptr_at(0).read(), 11);
            assert_eq!(storage.ptr_at(1).read(), 22);
        }
    }

    #[test]
    fn grow_size_rounds_up() {
        let mut storage = HeapStorage::<u16>::with_grow_size(10);
        storage.try_grow(0, 1).unwrap();
        assert_eq!(storage.capacity(), 10);
        storage.try_grow(0, 11).unwrap();
        assert_eq!(storage.capacity(), 20);
    }

    #[test]
    fn purge_shrinks_but_keeps_live_slots() {
        let mut storage = HeapStorage::<u32>::try_with_capacity(0, 16).unwrap();
        unsafe {
            for i in 0..3 {
                storage.mut_ptr_at(i).write(i as u32 * 7);
            }
        }

        storage.purge(3, 0);
        assert_eq!(storage.capacity(), 3);
        unsafe {
            assert_eq!(storage.ptr_at(2).read(), 14);
        }

        storage.purge(0, 0);
        assert_eq!(storage.capacity(), 0);
    }

    #[test]
    fn zero_sized_types_never_allocate() {
        let mut storage = HeapStorage::<()>::new();
        assert_eq!(storage.capacity(), usize::MAX);
        storage.try_grow(0, 1000).unwrap();
        storage.purge(0, 0);
        assert_eq!(storage.capacity(), usize::MAX);
    }

    #[test]
    fn overflowing_layout_is_reported() {
        let mut storage = HeapStorage::<u64>::with_grow_size(1);
        assert_eq!(
            storage.try_grow(0, usize::MAX / 4),
            Err(CapacityError::Overflow { requested: usize::MAX / 4 })
        );
        assert_eq!(storage.capacity(), 0);
    }
}
