use super::{
    grown_capacity, shift_contiguous, Contiguous, GrowthPolicy, HeapStorage, InlineStorage,
    OwnedStorage,
};
use crate::error::Result;

use core::ptr;

enum Backing<T, const N: usize> {
    Inline(InlineStorage<T, N>),
    Heap(HeapStorage<T>),
}

/// Inline storage for `N` slots that switches to a heap allocation once
/// more are requested.
///
/// The switch is permanent: purging a spilled block shrinks the heap
/// allocation but never moves the contents back inline.
///
/// # Examples
/// ```
/// use polyvec::storage::{GrowthPolicy, HybridStorage};
/// let mut storage = HybridStorage::<u32, 4>::new();
/// assert!(storage.is_inline());
/// storage.try_grow(0, 5).unwrap();
/// assert!(!storage.is_inline());
/// storage.purge(0, 0);
/// assert!(!storage.is_inline());
/// ```
pub struct HybridStorage<T, const N: usize> {
    backing: Backing<T, N>,
    grow_size: usize,
}

impl<T, const N: usize> HybridStorage<T, N> {
    /// Creates a block of `N` inline slots that doubles on growth.
    #[inline]
    pub fn new() -> Self {
        Self::with_grow_size(0)
    }

    /// Creates a block of `N` inline slots with the given growth increment
    /// hint for the heap phase.
    #[inline]
    pub fn with_grow_size(grow_size: usize) -> Self {
        HybridStorage {
            backing: Backing::Inline(InlineStorage::new()),
            grow_size,
        }
    }

    /// Returns `true` while the slots are still stored inline.
    #[inline]
    pub fn is_inline(&self) -> bool {
        matches!(self.backing, Backing::Inline(_))
    }

    fn spill(&mut self, len: usize, min_capacity: usize) -> Result<()> {
        let new_cap = grown_capacity::<T>(N, min_capacity, self.grow_size)?;
        let mut heap = HeapStorage::try_with_capacity(self.grow_size, new_cap)?;
        if let Backing::Inline(inline) = &self.backing {
            let len = usize::min(len, N);
            unsafe {
                ptr::copy_nonoverlapping(inline.ptr_at(0), heap.mut_ptr_at(0), len);
            }
        }
        self.backing = Backing::Heap(heap);
        Ok(())
    }
}

impl<T, const N: usize> Default for HybridStorage<T, N> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl<T, const N: usize> GrowthPolicy<T> for HybridStorage<T, N> {
    const CONTIGUOUS: bool = true;

    #[inline]
    fn capacity(&self) -> usize {
        match &self.backing {
            Backing::Inline(inline) => inline.capacity(),
            Backing::Heap(heap) => heap.capacity(),
        }
    }

    #[inline]
    fn grow_size(&self) -> usize {
        self.grow_size
    }

    fn set_grow_size(&mut self, grow_size: usize) {
        self.grow_size = grow_size;
        if let Backing::Heap(heap) = &mut self.backing {
            heap.set_grow_size(grow_size);
        }
    }

    #[inline]
    fn ptr_at(&self, index: usize) -> *const T {
        match &self.backing {
            Backing::Inline(inline) => inline.ptr_at(index),
            Backing::Heap(heap) => heap.ptr_at(index),
        }
    }

    #[inline]
    fn mut_ptr_at(&mut self, index: usize) -> *mut T {
        match &mut self.backing {
            Backing::Inline(inline) => inline.mut_ptr_at(index),
            Backing::Heap(heap) => heap.mut_ptr_at(index),
        }
    }

    fn try_grow(&mut self, len: usize, min_capacity: usize) -> Result<()> {
        if let Backing::Heap(heap) = &mut self.backing {
            return heap.try_grow(len, min_capacity);
        }

        if min_capacity <= N {
            return Ok(());
        }
        self.spill(len, min_capacity)
    }

    fn purge(&mut self, len: usize, keep: usize) {
        if let Backing::Heap(heap) = &mut self.backing {
            heap.purge(len, keep);
        }
    }

    #[inline]
    unsafe fn shift(&mut self, src: usize, dst: usize, count: usize) {
        shift_contiguous(self.mut_ptr_at(0), src, dst, count);
    }
}

unsafe impl<T, const N: usize> Contiguous<T> for HybridStorage<T, N> {}

impl<T, const N: usize> OwnedStorage<T> for HybridStorage<T, N> {
    fn try_with_capacity(grow_size: usize, capacity: usize) -> Result<Self> {
        let mut storage = Self::with_grow_size(grow_size);
        storage.try_grow(0, capacity)?;
        Ok(storage)
    }
}
