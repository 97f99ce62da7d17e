use super::{GrowthPolicy, OwnedStorage};
use crate::error::{CapacityError, Result};

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::mem::{size_of, MaybeUninit};
use smallvec::SmallVec;

type Page<T> = Box<[MaybeUninit<T>]>;

/// Storage made up of independently allocated pages of `page_size` slots.
///
/// Growing appends pages instead of reallocating, so elements placed in
/// earlier pages never move when the storage grows. Slots are contiguous
/// within a page only; slot `i` lives in page `i / page_size` at offset
/// `i % page_size`.
///
/// The page size is the growth increment hint. A hint of zero picks a page
/// of roughly 4 KiB.
///
/// # Examples
/// ```
/// use polyvec::storage::{GrowthPolicy, PagedStorage};
/// let mut storage = PagedStorage::<u64>::with_page_size(4);
/// storage.try_grow(0, 10).unwrap();
/// assert_eq!(storage.page_count(), 3);
/// assert_eq!(storage.capacity(), 12);
/// assert_eq!(storage.page_location(5), (1, 1));
/// ```
pub struct PagedStorage<T> {
    pages: SmallVec<[Page<T>; 4]>,
    page_size: usize,
}

/// Returns the page size used when no growth increment is given.
#[inline]
pub(crate) fn default_page_size<T>() -> usize {
    match size_of::<T>() {
        0 => usize::MAX,
        size => usize::max(1, 4096 / size),
    }
}

fn new_page<T>(page_size: usize) -> Page<T> {
    let mut page = Vec::with_capacity(page_size);
    // uninitialized `MaybeUninit`s are valid
    unsafe { page.set_len(page_size) };
    page.into_boxed_slice()
}

impl<T> PagedStorage<T> {
    /// Creates an empty storage with the default page size.
    #[inline]
    pub fn new() -> Self {
        Self::with_page_size(0)
    }

    /// Creates an empty storage with pages of `page_size` slots; zero picks
    /// the default.
    #[inline]
    pub fn with_page_size(page_size: usize) -> Self {
        PagedStorage {
            pages: SmallVec::new(),
            page_size: if page_size == 0 {
                default_page_size::<T>()
            } else {
                page_size
            },
        }
    }

    /// Returns the number of slots per page.
    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns the number of pages currently allocated.
    #[inline]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Returns the page index and the offset within that page of slot `index`.
    #[inline]
    pub fn page_location(&self, index: usize) -> (usize, usize) {
        (index / self.page_size, index % self.page_size)
    }

    /// Returns the slots of page `page` as a slice of [`MaybeUninit<T>`].
    ///
    /// # Panics
    /// Panics if `page >= page_count()`.
    #[inline]
    pub fn page(&self, page: usize) -> &[MaybeUninit<T>] {
        &self.pages[page]
    }

    #[inline]
    fn pages_for(&self, slots: usize) -> usize {
        slots / self.page_size + (slots % self.page_size != 0) as usize
    }
}

impl<T> Default for PagedStorage<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl<T> GrowthPolicy<T> for PagedStorage<T> {
    const CONTIGUOUS: bool = false;

    #[inline]
    fn capacity(&self) -> usize {
        self.pages.len().saturating_mul(self.page_size)
    }

    #[inline]
    fn grow_size(&self) -> usize {
        self.page_size
    }

    /// Changes the page size.
    ///
    /// # Panics
    /// Panics if pages are already allocated and `grow_size` differs from
    /// the current page size.
    fn set_grow_size(&mut self, grow_size: usize) {
        #[cold]
        #[inline(never)]
        #[track_caller]
        fn assert_failed(current: usize, requested: usize) -> ! {
            panic!(
                "cannot change page size (is {}) to {} while pages are allocated",
                current, requested
            );
        }

        let grow_size = if grow_size == 0 {
            default_page_size::<T>()
        } else {
            grow_size
        };
        if grow_size != self.page_size && !self.pages.is_empty() {
            assert_failed(self.page_size, grow_size);
        }
        self.page_size = grow_size;
    }

    #[inline]
    fn ptr_at(&self, index: usize) -> *const T {
        let (page, offset) = self.page_location(index);
        self.pages[page][offset].as_ptr()
    }

    #[inline]
    fn mut_ptr_at(&mut self, index: usize) -> *mut T {
        let (page, offset) = self.page_location(index);
        self.pages[page][offset].as_mut_ptr()
    }

    fn try_grow(&mut self, _len: usize, min_capacity: usize) -> Result<()> {
        if min_capacity <= self.capacity() {
            return Ok(());
        }

        let wanted = self.pages_for(min_capacity);
        if wanted.checked_mul(self.page_size).is_none() && size_of::<T>() != 0 {
            return Err(CapacityError::Overflow {
                requested: min_capacity,
            });
        }

        self.pages.reserve(wanted - self.pages.len());
        while self.pages.len() < wanted {
            self.pages.push(new_page(self.page_size));
        }
        Ok(())
    }

    fn purge(&mut self, len: usize, keep: usize) {
        let wanted = self.pages_for(usize::max(len, keep));
        if wanted < self.pages.len() {
            self.pages.truncate(wanted);
            self.pages.shrink_to_fit();
        }
    }
}

impl<T> OwnedStorage<T> for PagedStorage<T> {
    fn try_with_capacity(grow_size: usize, capacity: usize) -> Result<Self> {
        let mut storage = Self::with_page_size(grow_size);
        storage.try_grow(0, capacity)?;
        Ok(storage)
    }
}
