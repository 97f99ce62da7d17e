//! Specializations of [`DynArray`] built by composition.
//!
//! The aliases pick a growth policy; [`CopyableArray`] adds element-wise
//! cloning, and [`LockedArray`] (feature `sync`) puts an array behind a
//! mutex.

use crate::array::DynArray;
use crate::storage::{
    GrowthPolicy, HeapStorage, HybridStorage, InlineStorage, OwnedStorage, PagedStorage,
    SliceStorage,
};

use core::fmt::{self, Debug, Formatter};
use core::ops::{Deref, DerefMut};

/// An array backed by a single, reallocating heap block.
pub type HeapArray<T> = DynArray<T, HeapStorage<T>>;

/// An array of at most `N` elements stored inline.
///
/// # Examples
/// ```
/// use polyvec::FixedArray;
/// let mut array = FixedArray::<u32, 2>::default();
/// array.add_to_tail(1);
/// array.add_to_tail(2);
/// assert_eq!(array.capacity(), 2);
/// ```
///
/// Growing past `N` elements panics:
/// ```should_panic
/// use polyvec::FixedArray;
/// let mut array = FixedArray::<u32, 2>::default();
/// array.add_to_tail(1);
/// array.add_to_tail(2);
/// array.add_to_tail(3);
/// ```
pub type FixedArray<T, const N: usize> = DynArray<T, InlineStorage<T, N>>;

/// An array that stores up to `N` elements inline, then moves to the heap.
pub type FixedGrowableArray<T, const N: usize> = DynArray<T, HybridStorage<T, N>>;

/// An array made of fixed-size pages. Growth never moves elements already
/// placed.
///
/// # Examples
/// ```
/// use polyvec::BlockArray;
/// let mut array = BlockArray::new(4, 0);
/// for i in 0..10 {
///     array.add_to_tail(i);
/// }
/// assert_eq!(array.storage().page_count(), 3);
/// assert_eq!(array.storage().page_location(5), (1, 1));
/// ```
pub type BlockArray<T> = DynArray<T, PagedStorage<T>>;

/// An array using a borrowed slice of uninitialized memory for storage.
pub type SliceArray<'a, T> = DynArray<T, SliceStorage<'a, T>>;

/// A [`DynArray`] that can be cloned element by element.
///
/// `DynArray` itself is not [`Clone`]; wrap it in this type where copies are
/// wanted.
///
/// # Examples
/// ```
/// use polyvec::{CopyableArray, HeapArray};
/// let mut original: CopyableArray<&str> = CopyableArray::from(HeapArray::new(0, 0));
/// original.add_multiple_to_tail_from(&["a", "b"]);
/// let copy = original.clone();
/// original.remove_all();
/// assert_eq!(copy.len(), 2);
/// assert_ne!(copy, original);
/// ```
pub struct CopyableArray<T, P = HeapStorage<T>>
where
    P: GrowthPolicy<T>,
{
    inner: DynArray<T, P>,
}

impl<T, P> CopyableArray<T, P>
where
    P: GrowthPolicy<T>,
{
    /// Unwraps the inner array.
    #[inline]
    pub fn into_inner(self) -> DynArray<T, P> {
        self.inner
    }
}

impl<T, P> From<DynArray<T, P>> for CopyableArray<T, P>
where
    P: GrowthPolicy<T>,
{
    #[inline]
    fn from(inner: DynArray<T, P>) -> Self {
        CopyableArray { inner }
    }
}

impl<T, P> Default for CopyableArray<T, P>
where
    P: OwnedStorage<T>,
{
    #[inline]
    fn default() -> Self {
        CopyableArray {
            inner: DynArray::default(),
        }
    }
}

impl<T, P> Deref for CopyableArray<T, P>
where
    P: GrowthPolicy<T>,
{
    type Target = DynArray<T, P>;

    #[inline]
    fn deref(&self) -> &DynArray<T, P> {
        &self.inner
    }
}

impl<T, P> DerefMut for CopyableArray<T, P>
where
    P: GrowthPolicy<T>,
{
    #[inline]
    fn deref_mut(&mut self) -> &mut DynArray<T, P> {
        &mut self.inner
    }
}

impl<T, P> Clone for CopyableArray<T, P>
where
    T: Clone,
    P: OwnedStorage<T>,
{
    /// Allocates a copy with the same growth increment and room for exactly
    /// the source's elements.
    fn clone(&self) -> Self {
        let mut inner = DynArray::new(self.inner.grow_size(), self.inner.len());
        inner.assign(&self.inner);
        CopyableArray { inner }
    }

    fn clone_from(&mut self, source: &Self) {
        self.inner.assign(&source.inner);
    }
}

impl<T, P> Debug for CopyableArray<T, P>
where
    T: Debug,
    P: GrowthPolicy<T>,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

impl<T, U, P, Q> PartialEq<CopyableArray<U, Q>> for CopyableArray<T, P>
where
    T: PartialEq<U>,
    P: GrowthPolicy<T>,
    Q: GrowthPolicy<U>,
{
    #[inline]
    fn eq(&self, other: &CopyableArray<U, Q>) -> bool {
        self.inner == other.inner
    }
}

impl<T, P> Eq for CopyableArray<T, P>
where
    T: Eq,
    P: GrowthPolicy<T>,
{
}

#[cfg(feature = "sync")]
pub use self::locked::LockedArray;

#[cfg(feature = "sync")]
mod locked {
    use crate::array::DynArray;
    use crate::storage::{GrowthPolicy, HeapStorage, OwnedStorage};

    use core::fmt::{self, Debug, Formatter};
    use parking_lot::lock_api::{Mutex, MutexGuard, RawMutex};

    /// A [`DynArray`] guarded by a mutex.
    ///
    /// The raw mutex `R` defaults to [`parking_lot::RawMutex`]; any
    /// [`lock_api::RawMutex`](parking_lot::lock_api::RawMutex) works. Every
    /// access goes through a guard, so a sequence of calls is only atomic
    /// while one guard is held across all of them.
    ///
    /// # Examples
    /// ```
    /// use polyvec::{HeapArray, LockedArray};
    /// let shared: LockedArray<u32> = LockedArray::from(HeapArray::new(0, 0));
    /// {
    ///     let mut array = shared.lock();
    ///     array.add_to_tail(1);
    ///     array.add_to_tail(2);
    ///     assert!(shared.is_locked());
    ///     assert!(shared.try_lock().is_none());
    /// }
    /// assert_eq!(shared.lock().len(), 2);
    /// ```
    pub struct LockedArray<T, P = HeapStorage<T>, R = parking_lot::RawMutex>
    where
        P: GrowthPolicy<T>,
        R: RawMutex,
    {
        inner: Mutex<R, DynArray<T, P>>,
    }

    impl<T, P, R> LockedArray<T, P, R>
    where
        P: GrowthPolicy<T>,
        R: RawMutex,
    {
        /// Puts `array` behind a new, unlocked mutex.
        #[inline]
        pub fn new(array: DynArray<T, P>) -> Self {
            LockedArray {
                inner: Mutex::new(array),
            }
        }

        /// Blocks until the array can be locked, and returns a guard that
        /// unlocks it when dropped.
        #[inline]
        pub fn lock(&self) -> MutexGuard<'_, R, DynArray<T, P>> {
            self.inner.lock()
        }

        /// Locks the array if it is not already locked.
        #[inline]
        pub fn try_lock(&self) -> Option<MutexGuard<'_, R, DynArray<T, P>>> {
            self.inner.try_lock()
        }

        /// Returns `true` if the array is currently locked.
        #[inline]
        pub fn is_locked(&self) -> bool {
            self.inner.is_locked()
        }

        /// Returns the array without locking; the exclusive borrow already
        /// rules out other accessors.
        #[inline]
        pub fn get_mut(&mut self) -> &mut DynArray<T, P> {
            self.inner.get_mut()
        }

        /// Consumes the mutex and returns the array.
        #[inline]
        pub fn into_inner(self) -> DynArray<T, P> {
            self.inner.into_inner()
        }
    }

    impl<T, P, R> From<DynArray<T, P>> for LockedArray<T, P, R>
    where
        P: GrowthPolicy<T>,
        R: RawMutex,
    {
        #[inline]
        fn from(array: DynArray<T, P>) -> Self {
            Self::new(array)
        }
    }

    impl<T, P, R> Default for LockedArray<T, P, R>
    where
        P: OwnedStorage<T>,
        R: RawMutex,
    {
        #[inline]
        fn default() -> Self {
            Self::new(DynArray::default())
        }
    }

    impl<T, P, R> Debug for LockedArray<T, P, R>
    where
        T: Debug,
        P: GrowthPolicy<T>,
        R: RawMutex,
    {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            match self.inner.try_lock() {
                Some(array) => f.debug_struct("LockedArray").field("data", &*array).finish(),
                None => f.debug_struct("LockedArray").field("data", &"<locked>").finish(),
            }
        }
    }
}
