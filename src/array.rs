//! A growable array generic over its growth policy.
//!
//! [`DynArray`] keeps a count of live elements and delegates everything
//! about memory to a [`GrowthPolicy`]: how much to allocate, where each slot
//! lives, and how ranges of slots are moved. The same algorithms therefore
//! work on a reallocating heap block, a fixed inline buffer, a buffer that
//! spills to the heap, independently allocated pages, or a borrowed slice.
//!
//! Indices are plain `usize` positions in `0..len()`. They are not stable:
//! inserting or removing shifts every element after the affected position,
//! and growth may relocate all of them.
//!
//! Operations that need more room than the policy can provide panic; the
//! `try_*` methods report the failure instead. Allocation failure is routed
//! to [`handle_alloc_error`].

use crate::error::{CapacityError, Result};
use crate::storage::{Contiguous, GrowthPolicy, HeapStorage, OwnedStorage};

use alloc::alloc::{handle_alloc_error, Layout};
use core::cmp::Ordering;
use core::fmt::{self, Debug, Formatter};
use core::marker::PhantomData;
use core::mem::{align_of, size_of, ManuallyDrop};
use core::ops::{Deref, DerefMut, Index, IndexMut};
use core::ptr;
use core::slice;

/// A growable array whose memory is managed by the growth policy `P`.
///
/// See the [module-level documentation](crate::array) for more.
///
/// # Examples
/// ```
/// use polyvec::DynArray;
/// let mut array: DynArray<i32> = DynArray::new(0, 4);
/// array.add_to_tail(1);
/// array.add_to_tail(2);
/// array.add_to_tail(3);
/// array.insert_before(1, 9);
/// assert_eq!(array, [1, 9, 2, 3]);
///
/// assert_eq!(array.fast_remove(0), 1);
/// assert_eq!(array, [3, 9, 2]);
/// assert_eq!(array.find(&9), Some(1));
/// ```
pub struct DynArray<T, P = HeapStorage<T>>
where
    P: GrowthPolicy<T>,
{
    len: usize,
    buf: P,
    elem: PhantomData<T>,
}

#[cold]
#[inline(never)]
#[track_caller]
fn growth_failed<T>(error: CapacityError) -> ! {
    if let CapacityError::AllocFailed { bytes } = error {
        if let Ok(layout) = Layout::from_size_align(bytes, align_of::<T>()) {
            handle_alloc_error(layout);
        }
    }
    panic!("array cannot grow: {}", error)
}

#[cold]
#[inline(never)]
#[track_caller]
fn index_out_of_bounds(index: usize, len: usize) -> ! {
    panic!("index (is {}) should be < len (is {})", index, len)
}

#[cold]
#[inline(never)]
#[track_caller]
fn empty_array(accessor: &str) -> ! {
    panic!("{} called on an empty array", accessor)
}

#[cold]
#[inline(never)]
#[track_caller]
fn insertion_out_of_bounds(index: usize, len: usize) -> ! {
    panic!("insertion index (is {}) should be <= len (is {})", index, len)
}

impl<T, P> From<P> for DynArray<T, P>
where
    P: GrowthPolicy<T>,
{
    /// Wraps a growth policy in an empty array.
    fn from(buf: P) -> Self {
        DynArray {
            len: 0,
            buf,
            elem: PhantomData,
        }
    }
}

impl<T, P> DynArray<T, P>
where
    P: OwnedStorage<T>,
{
    /// Creates an empty array with room for `initial_capacity` elements.
    ///
    /// A `grow_size` of zero makes the array double its capacity whenever it
    /// runs out of room; otherwise capacity is always rounded up to a multiple
    /// of `grow_size`.
    ///
    /// # Panics
    /// Panics if the policy cannot provide `initial_capacity` slots. See
    /// [`try_new`](DynArray::try_new) for a checked version.
    #[track_caller]
    pub fn new(grow_size: usize, initial_capacity: usize) -> Self {
        match Self::try_new(grow_size, initial_capacity) {
            Ok(array) => array,
            Err(error) => growth_failed::<T>(error),
        }
    }

    /// Creates an empty array with room for `initial_capacity` elements, or
    /// returns the reason the policy could not provide them.
    ///
    /// # Examples
    /// ```
    /// use polyvec::{CapacityError, FixedArray};
    /// assert!(FixedArray::<u8, 4>::try_new(0, 4).is_ok());
    /// assert_eq!(
    ///     FixedArray::<u8, 4>::try_new(0, 5).err(),
    ///     Some(CapacityError::FixedCapacity { capacity: 4 })
    /// );
    /// ```
    pub fn try_new(grow_size: usize, initial_capacity: usize) -> Result<Self> {
        P::try_with_capacity(grow_size, initial_capacity).map(Self::from)
    }
}

impl<T, P> Default for DynArray<T, P>
where
    P: OwnedStorage<T>,
{
    #[track_caller]
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl<T, P> DynArray<T, P>
where
    P: GrowthPolicy<T>,
{
    /// Creates an array from a growth policy whose first `len` slots are
    /// already initialized.
    ///
    /// # Safety
    /// The slots `0..len` of `buf` must hold initialized values of type `T`,
    /// which the array takes ownership of.
    ///
    /// # Panics
    /// Panics if `len` exceeds the capacity of `buf`.
    ///
    /// # Examples
    /// ```
    /// use core::mem::MaybeUninit;
    /// use polyvec::SliceArray;
    /// let mut backing = [MaybeUninit::new(1u8), MaybeUninit::new(2), MaybeUninit::uninit()];
    /// let mut array = unsafe { SliceArray::from_raw_parts(&mut backing[..], 2) };
    /// array.add_to_tail(3);
    /// assert_eq!(array, [1, 2, 3]);
    /// ```
    #[track_caller]
    pub unsafe fn from_raw_parts(buf: P, len: usize) -> Self {
        #[cold]
        #[inline(never)]
        #[track_caller]
        fn assert_failed(len: usize, capacity: usize) -> ! {
            panic!("length (is {}) should be <= capacity (is {})", len, capacity)
        }

        if len > buf.capacity() {
            assert_failed(len, buf.capacity());
        }

        DynArray {
            len,
            buf,
            elem: PhantomData,
        }
    }

    /// Decomposes the array into its growth policy and length.
    ///
    /// The elements are not dropped; the first `len` slots of the returned
    /// policy hold them.
    pub fn into_raw_parts(self) -> (P, usize) {
        let this = ManuallyDrop::new(self);
        // `this` is never dropped, so the policy is moved out exactly once
        let buf = unsafe { ptr::read(&this.buf) };
        (buf, this.len)
    }

    /// Returns a reference to the growth policy.
    #[inline]
    pub fn storage(&self) -> &P {
        &self.buf
    }

    /// Returns the number of elements in the array.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn set_len(&mut self, new_len: usize) {
        debug_assert!(new_len <= self.buf.capacity());
        self.len = new_len;
    }

    /// Returns `true` if the array contains no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of elements the array can hold without growing.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Same as [`capacity`](DynArray::capacity).
    #[inline]
    pub fn num_allocated(&self) -> usize {
        self.buf.capacity()
    }

    /// Returns the growth increment hint of the policy.
    #[inline]
    pub fn grow_size(&self) -> usize {
        self.buf.grow_size()
    }

    /// Returns `true` if `index` refers to a live element.
    #[inline]
    pub fn is_valid_index(&self, index: usize) -> bool {
        index < self.len
    }

    #[inline]
    fn at(&self, index: usize) -> &T {
        debug_assert!(index < self.len);
        unsafe { &*self.buf.ptr_at(index) }
    }

    #[inline]
    fn at_mut(&mut self, index: usize) -> &mut T {
        debug_assert!(index < self.len);
        unsafe { &mut *self.buf.mut_ptr_at(index) }
    }

    fn elements(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len).map(move |i| self.at(i))
    }

    /// Returns a reference to the element at `index`, or [`None`] if it is
    /// out of bounds.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index < self.len {
            Some(self.at(index))
        } else {
            None
        }
    }

    /// Returns a mutable reference to the element at `index`, or [`None`] if
    /// it is out of bounds.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index < self.len {
            Some(self.at_mut(index))
        } else {
            None
        }
    }

    /// Returns a reference to the element at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    #[inline]
    #[track_caller]
    pub fn element(&self, index: usize) -> &T {
        if index >= self.len {
            index_out_of_bounds(index, self.len);
        }
        self.at(index)
    }

    /// Returns a mutable reference to the element at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    #[inline]
    #[track_caller]
    pub fn element_mut(&mut self, index: usize) -> &mut T {
        if index >= self.len {
            index_out_of_bounds(index, self.len);
        }
        self.at_mut(index)
    }

    /// Returns a reference to the first element.
    ///
    /// # Panics
    /// Panics if the array is empty.
    #[inline]
    #[track_caller]
    pub fn head(&self) -> &T {
        if self.is_empty() {
            empty_array("head");
        }
        self.at(0)
    }

    /// Returns a mutable reference to the first element.
    ///
    /// # Panics
    /// Panics if the array is empty.
    #[inline]
    #[track_caller]
    pub fn head_mut(&mut self) -> &mut T {
        if self.is_empty() {
            empty_array("head_mut");
        }
        self.at_mut(0)
    }

    /// Returns a reference to the last element.
    ///
    /// # Panics
    /// Panics if the array is empty.
    #[inline]
    #[track_caller]
    pub fn tail(&self) -> &T {
        if self.is_empty() {
            empty_array("tail");
        }
        self.at(self.len - 1)
    }

    /// Returns a mutable reference to the last element.
    ///
    /// # Panics
    /// Panics if the array is empty.
    #[inline]
    #[track_caller]
    pub fn tail_mut(&mut self) -> &mut T {
        if self.is_empty() {
            empty_array("tail_mut");
        }
        let last = self.len - 1;
        self.at_mut(last)
    }

    #[inline]
    fn try_grow_to(&mut self, min_capacity: usize) -> Result<()> {
        if min_capacity > self.buf.capacity() {
            self.buf.try_grow(self.len, min_capacity)?;
        }
        Ok(())
    }

    #[inline]
    #[track_caller]
    fn grow_to(&mut self, min_capacity: usize) {
        if let Err(error) = self.try_grow_to(min_capacity) {
            growth_failed::<T>(error);
        }
    }

    /// Grows the storage to hold `num` more elements and moves `elem..len`
    /// up by `num` slots, leaving `elem..elem + num` uninitialized.
    /// The length is left unchanged.
    fn make_gap(&mut self, elem: usize, num: usize) -> Result<()> {
        debug_assert!(elem <= self.len);
        let new_len = self
            .len
            .checked_add(num)
            .ok_or(CapacityError::Overflow { requested: usize::MAX })?;
        self.try_grow_to(new_len)?;
        unsafe { self.buf.shift(elem, elem + num, self.len - elem) };
        Ok(())
    }

    /// Fills vacated slots with `0xDD` bytes in debug builds.
    #[inline]
    fn poison(&mut self, from: usize, to: usize) {
        if cfg!(debug_assertions) && size_of::<T>() != 0 {
            for i in from..to {
                unsafe { ptr::write_bytes(self.buf.mut_ptr_at(i).cast::<u8>(), 0xDD, size_of::<T>()) };
            }
        }
    }

    /// Panics unless the array's bookkeeping is consistent.
    #[track_caller]
    pub fn validate(&self) {
        assert!(
            self.len <= self.buf.capacity(),
            "length (is {}) exceeds capacity (is {})",
            self.len,
            self.buf.capacity()
        );
    }

    /// Inserts `value` at position `elem`, shifting all elements after it to
    /// the right, and returns `elem`.
    ///
    /// # Panics
    /// Panics if `elem > len()`, or if the array needs to grow and the policy
    /// cannot provide more room. See
    /// [`try_insert_before`](DynArray::try_insert_before) for a version that
    /// reports the latter.
    #[track_caller]
    pub fn insert_before(&mut self, elem: usize, value: T) -> usize {
        if elem > self.len {
            insertion_out_of_bounds(elem, self.len);
        }
        if let Err(error) = self.make_gap(elem, 1) {
            growth_failed::<T>(error);
        }

        unsafe { self.buf.mut_ptr_at(elem).write(value) };
        self.set_len(self.len + 1);
        elem
    }

    /// Inserts `value` at position `elem`, shifting all elements after it to
    /// the right.
    ///
    /// Returns back `Err(value)` if the array would need to grow and the
    /// policy cannot provide more room.
    ///
    /// # Panics
    /// Panics if `elem > len()`.
    ///
    /// # Examples
    /// ```
    /// use polyvec::FixedArray;
    /// let mut array = FixedArray::<char, 2>::default();
    /// assert_eq!(array.try_insert_before(0, 'b'), Ok(0));
    /// assert_eq!(array.try_insert_before(0, 'a'), Ok(0));
    /// assert_eq!(array.try_insert_before(1, 'x'), Err('x'));
    /// assert_eq!(array, ['a', 'b']);
    /// ```
    #[track_caller]
    pub fn try_insert_before(&mut self, elem: usize, value: T) -> core::result::Result<usize, T> {
        if elem > self.len {
            insertion_out_of_bounds(elem, self.len);
        }
        if self.make_gap(elem, 1).is_err() {
            return Err(value);
        }

        unsafe { self.buf.mut_ptr_at(elem).write(value) };
        self.set_len(self.len + 1);
        Ok(elem)
    }

    /// Inserts `value` right after position `elem` and returns its index.
    ///
    /// # Panics
    /// Panics if `elem >= len()`, or if the array cannot grow.
    #[inline]
    #[track_caller]
    pub fn insert_after(&mut self, elem: usize, value: T) -> usize {
        if elem >= self.len {
            index_out_of_bounds(elem, self.len);
        }
        self.insert_before(elem + 1, value)
    }

    /// Inserts `value` at the front of the array and returns `0`.
    ///
    /// # Panics
    /// Panics if the array cannot grow.
    #[inline]
    #[track_caller]
    pub fn add_to_head(&mut self, value: T) -> usize {
        self.insert_before(0, value)
    }

    /// Appends `value` to the back of the array and returns its index.
    ///
    /// # Panics
    /// Panics if the array cannot grow.
    #[inline]
    #[track_caller]
    pub fn add_to_tail(&mut self, value: T) -> usize {
        self.insert_before(self.len, value)
    }

    /// Inserts clones of the elements of `values` at position `elem`,
    /// shifting all elements after them to the right. Returns `elem`.
    ///
    /// # Panics
    /// Panics if `elem > len()`, or if the array cannot grow.
    ///
    /// # Examples
    /// ```
    /// use polyvec::BlockArray;
    /// let mut array = BlockArray::new(2, 0);
    /// array.add_multiple_to_tail_from(&[1, 5]);
    /// array.insert_multiple_before_from(1, &[2, 3, 4]);
    /// assert_eq!(array, [1, 2, 3, 4, 5]);
    /// ```
    #[track_caller]
    pub fn insert_multiple_before_from(&mut self, elem: usize, values: &[T]) -> usize
    where
        T: Clone,
    {
        let mut source = values.iter();
        self.insert_multiple_with(elem, values.len(), || match source.next() {
            Some(value) => value.clone(),
            None => unreachable!(),
        })
    }

    /// Appends clones of the elements of `values` and returns the index of
    /// the first one.
    ///
    /// # Panics
    /// Panics if the array cannot grow.
    #[inline]
    #[track_caller]
    pub fn add_multiple_to_tail_from(&mut self, values: &[T]) -> usize
    where
        T: Clone,
    {
        self.insert_multiple_before_from(self.len, values)
    }

    #[track_caller]
    fn insert_multiple_with<F: FnMut() -> T>(&mut self, elem: usize, num: usize, mut make: F) -> usize {
        let len = self.len;
        if elem > len {
            insertion_out_of_bounds(elem, len);
        }
        if let Err(error) = self.make_gap(elem, num) {
            growth_failed::<T>(error);
        }

        // elements moved past the gap leak if `make` panics
        self.len = elem;
        for i in elem..elem + num {
            unsafe { self.buf.mut_ptr_at(i).write(make()) };
        }
        self.set_len(len + num);
        elem
    }

    /// Removes the element at `elem` and returns it, moving the last element
    /// into its place.
    ///
    /// This does not preserve ordering, but it is O(1).
    ///
    /// # Panics
    /// Panics if `elem` is out of bounds.
    ///
    /// # Examples
    /// ```
    /// use polyvec::DynArray;
    /// let mut array: DynArray<u32> = DynArray::new(0, 4);
    /// array.add_multiple_to_tail_from(&[1, 2, 3, 4]);
    /// assert_eq!(array.fast_remove(1), 2);
    /// assert_eq!(array, [1, 4, 3]);
    /// ```
    #[track_caller]
    pub fn fast_remove(&mut self, elem: usize) -> T {
        let len = self.len;
        if elem >= len {
            index_out_of_bounds(elem, len);
        }

        let last = len - 1;
        let value = unsafe { self.buf.ptr_at(elem).read() };
        if elem != last {
            unsafe {
                let from = self.buf.ptr_at(last);
                let to = self.buf.mut_ptr_at(elem);
                ptr::copy_nonoverlapping(from, to, 1);
            }
        }
        self.len = last;
        self.poison(last, len);
        value
    }

    /// Removes the element at `elem` and returns it, shifting all elements
    /// after it to the left.
    ///
    /// # Panics
    /// Panics if `elem` is out of bounds.
    #[track_caller]
    pub fn remove(&mut self, elem: usize) -> T {
        let len = self.len;
        if elem >= len {
            index_out_of_bounds(elem, len);
        }

        let value = unsafe { self.buf.ptr_at(elem).read() };
        unsafe { self.buf.shift(elem + 1, elem, len - elem - 1) };
        self.len = len - 1;
        self.poison(len - 1, len);
        value
    }

    /// Drops the `num` elements starting at `elem`, shifting all elements
    /// after them to the left.
    ///
    /// # Panics
    /// Panics if `elem + num > len()`.
    #[track_caller]
    pub fn remove_multiple(&mut self, elem: usize, num: usize) {
        #[cold]
        #[inline(never)]
        #[track_caller]
        fn assert_failed(elem: usize, num: usize, len: usize) -> ! {
            panic!(
                "removal range (is {}..{}) should be within len (is {})",
                elem,
                elem.saturating_add(num),
                len
            )
        }

        let len = self.len;
        let end = match elem.checked_add(num) {
            Some(end) if end <= len => end,
            _ => assert_failed(elem, num, len),
        };
        if num == 0 {
            return;
        }

        // elements after the range leak if a destructor panics
        self.len = elem;
        for i in elem..end {
            unsafe { ptr::drop_in_place(self.buf.mut_ptr_at(i)) };
        }
        unsafe { self.buf.shift(end, elem, len - end) };
        self.len = len - num;
        self.poison(len - num, len);
    }

    /// Drops all elements. The storage is kept.
    pub fn remove_all(&mut self) {
        let len = self.len;
        self.len = 0;
        if len == 0 {
            return;
        }

        if P::CONTIGUOUS {
            unsafe {
                ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.buf.mut_ptr_at(0), len));
            }
        } else {
            for i in 0..len {
                unsafe { ptr::drop_in_place(self.buf.mut_ptr_at(i)) };
            }
        }
    }

    /// Makes sure the array can hold at least `num` elements without growing
    /// again.
    ///
    /// # Panics
    /// Panics if the policy cannot provide the room.
    #[inline]
    #[track_caller]
    pub fn ensure_capacity(&mut self, num: usize) {
        self.grow_to(num);
    }

    /// Makes sure the array can hold at least `num` elements without growing
    /// again, or returns the reason the policy could not provide the room.
    #[inline]
    pub fn try_ensure_capacity(&mut self, num: usize) -> Result<()> {
        self.try_grow_to(num)
    }

    /// Shrinks the storage to fit the current length as closely as the
    /// policy allows.
    pub fn compact(&mut self) {
        self.buf.purge(self.len, self.len);
    }

    /// Drops all elements and releases as much storage as the policy allows.
    pub fn purge(&mut self) {
        self.remove_all();
        self.buf.purge(0, 0);
    }

    /// Sets the growth increment hint used by subsequent growth.
    ///
    /// # Panics
    /// [`PagedStorage`](crate::storage::PagedStorage) panics if pages are
    /// already allocated and the page size would change.
    #[inline]
    #[track_caller]
    pub fn set_grow_size(&mut self, grow_size: usize) {
        self.buf.set_grow_size(grow_size);
    }

    /// Exchanges the contents of two arrays without moving any elements.
    ///
    /// # Examples
    /// ```
    /// use polyvec::HeapArray;
    /// let mut a = HeapArray::new(0, 0);
    /// let mut b = HeapArray::new(0, 0);
    /// a.add_to_tail("a");
    /// b.add_multiple_to_tail_from(&["b", "b"]);
    /// a.swap(&mut b);
    /// assert_eq!(a, ["b", "b"]);
    /// assert_eq!(b, ["a"]);
    /// ```
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        core::mem::swap(&mut self.len, &mut other.len);
        self.buf.swap(&mut other.buf);
    }

    /// Returns the index of the first element equal to `value`.
    pub fn find(&self, value: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        self.elements().position(|elem| elem == value)
    }

    /// Returns `true` if any element equals `value`.
    #[inline]
    pub fn has_element(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.find(value).is_some()
    }

    /// Removes the first element equal to `value`, preserving the order of
    /// the others. Returns `true` if one was found.
    pub fn find_and_remove(&mut self, value: &T) -> bool
    where
        T: PartialEq,
    {
        match self.find(value) {
            Some(index) => {
                self.remove(index);
                true
            }
            None => false,
        }
    }

    /// Appends clones of all elements of `other` and returns the index of
    /// the first one.
    ///
    /// `other` may use a different growth policy.
    #[track_caller]
    pub fn add_vector_to_tail<Q>(&mut self, other: &DynArray<T, Q>) -> usize
    where
        T: Clone,
        Q: GrowthPolicy<T>,
    {
        let mut source = other.elements();
        self.insert_multiple_with(self.len, other.len, || match source.next() {
            Some(value) => value.clone(),
            None => unreachable!(),
        })
    }

    #[track_caller]
    fn overwrite_with<'s, F>(&mut self, count: usize, mut source: F)
    where
        T: Clone + 's,
        F: FnMut(usize) -> &'s T,
    {
        if self.len > count {
            self.remove_multiple(count, self.len - count);
        }
        for i in 0..self.len {
            self.at_mut(i).clone_from(source(i));
        }

        self.grow_to(count);
        for i in self.len..count {
            let value = source(i).clone();
            unsafe { self.buf.mut_ptr_at(i).write(value) };
            self.set_len(i + 1);
        }
    }

    /// Makes `self` a copy of `values`, reusing existing elements through
    /// [`Clone::clone_from`].
    ///
    /// # Panics
    /// Panics if the array cannot grow to `values.len()`.
    #[track_caller]
    pub fn copy_array(&mut self, values: &[T])
    where
        T: Clone,
    {
        self.overwrite_with(values.len(), move |i| &values[i]);
    }

    /// Makes `self` a copy of `other`, reusing existing elements through
    /// [`Clone::clone_from`]. `other` may use a different growth policy.
    ///
    /// # Examples
    /// ```
    /// use polyvec::{BlockArray, HeapArray};
    /// let mut pages = BlockArray::new(2, 0);
    /// pages.add_multiple_to_tail_from(&[3, 1, 4, 1, 5]);
    /// let mut flat = HeapArray::new(0, 0);
    /// flat.add_to_tail(9);
    /// flat.assign(&pages);
    /// assert_eq!(flat, [3, 1, 4, 1, 5]);
    /// ```
    #[track_caller]
    pub fn assign<Q>(&mut self, other: &DynArray<T, Q>)
    where
        T: Clone,
        Q: GrowthPolicy<T>,
    {
        self.overwrite_with(other.len, move |i| other.at(i));
    }

    fn swap_slots(&mut self, a: usize, b: usize) {
        let pa = self.buf.mut_ptr_at(a);
        let pb = self.buf.mut_ptr_at(b);
        unsafe { ptr::swap(pa, pb) };
    }

    fn sift_down<F>(&mut self, mut node: usize, end: usize, cmp: &mut F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        loop {
            let mut child = 2 * node + 1;
            if child >= end {
                break;
            }
            if child + 1 < end && cmp(self.at(child), self.at(child + 1)) == Ordering::Less {
                child += 1;
            }
            if cmp(self.at(node), self.at(child)) != Ordering::Less {
                break;
            }
            self.swap_slots(node, child);
            node = child;
        }
    }

    fn heap_sort_by<F>(&mut self, cmp: &mut F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        let len = self.len;
        for node in (0..len / 2).rev() {
            self.sift_down(node, len, cmp);
        }
        for end in (1..len).rev() {
            self.swap_slots(0, end);
            self.sift_down(0, end, cmp);
        }
    }

    /// Sorts the array with a comparator function.
    ///
    /// The sort is not stable. Contiguous storage is sorted as a slice;
    /// paged storage is heapsorted in place, which is O(n log n) as well.
    ///
    /// # Examples
    /// ```
    /// use polyvec::BlockArray;
    /// let mut array = BlockArray::new(3, 0);
    /// array.add_multiple_to_tail_from(&[5, 2, 8, 1, 9, 3, 7]);
    /// array.sort_by(|a, b| b.cmp(a));
    /// assert_eq!(array, [9, 8, 7, 5, 3, 2, 1]);
    /// ```
    pub fn sort_by<F>(&mut self, mut cmp: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        if self.len < 2 {
            return;
        }

        if P::CONTIGUOUS {
            let elements = unsafe { slice::from_raw_parts_mut(self.buf.mut_ptr_at(0), self.len) };
            elements.sort_unstable_by(cmp);
        } else {
            self.heap_sort_by(&mut cmp);
        }
    }

    /// Sorts the array in ascending order. The sort is not stable.
    #[inline]
    pub fn sort(&mut self)
    where
        T: Ord,
    {
        self.sort_by(T::cmp);
    }
}

impl<T, P> DynArray<T, P>
where
    T: Default,
    P: GrowthPolicy<T>,
{
    /// Inserts a default value at position `elem` and returns `elem`.
    ///
    /// # Panics
    /// Panics if `elem > len()`, or if the array cannot grow.
    #[inline]
    #[track_caller]
    pub fn insert_default_before(&mut self, elem: usize) -> usize {
        self.insert_before(elem, T::default())
    }

    /// Appends a default value and returns its index.
    ///
    /// # Panics
    /// Panics if the array cannot grow.
    #[inline]
    #[track_caller]
    pub fn add_default_to_tail(&mut self) -> usize {
        self.insert_before(self.len, T::default())
    }

    /// Inserts `num` default values at position `elem`, shifting all elements
    /// after them to the right. Returns `elem`.
    ///
    /// # Panics
    /// Panics if `elem > len()`, or if the array cannot grow.
    #[inline]
    #[track_caller]
    pub fn insert_multiple_before(&mut self, elem: usize, num: usize) -> usize {
        self.insert_multiple_with(elem, num, T::default)
    }

    /// Inserts `num` default values right after position `elem` and returns
    /// the index of the first one.
    ///
    /// # Panics
    /// Panics if `elem >= len()`, or if the array cannot grow.
    #[inline]
    #[track_caller]
    pub fn insert_multiple_after(&mut self, elem: usize, num: usize) -> usize {
        if elem >= self.len {
            index_out_of_bounds(elem, self.len);
        }
        self.insert_multiple_before(elem + 1, num)
    }

    /// Inserts `num` default values at the front of the array and returns `0`.
    #[inline]
    #[track_caller]
    pub fn add_multiple_to_head(&mut self, num: usize) -> usize {
        self.insert_multiple_before(0, num)
    }

    /// Appends `num` default values and returns the index of the first one.
    #[inline]
    #[track_caller]
    pub fn add_multiple_to_tail(&mut self, num: usize) -> usize {
        self.insert_multiple_before(self.len, num)
    }

    /// Appends default values until the array holds at least `num` elements.
    #[track_caller]
    pub fn ensure_count(&mut self, num: usize) {
        if num > self.len {
            self.add_multiple_to_tail(num - self.len);
        }
    }

    /// Drops all elements, then fills the array with `num` default values.
    ///
    /// # Examples
    /// ```
    /// use polyvec::HeapArray;
    /// let mut array = HeapArray::new(0, 0);
    /// array.add_to_tail(7u8);
    /// array.set_count(3);
    /// assert_eq!(array, [0, 0, 0]);
    /// ```
    #[track_caller]
    pub fn set_count(&mut self, num: usize) {
        self.remove_all();
        self.add_multiple_to_tail(num);
    }

    /// Same as [`set_count`](DynArray::set_count).
    #[inline]
    #[track_caller]
    pub fn set_size(&mut self, num: usize) {
        self.set_count(num);
    }
}

impl<T, P> Drop for DynArray<T, P>
where
    P: GrowthPolicy<T>,
{
    fn drop(&mut self) {
        self.remove_all();
    }
}

impl<T, P> Deref for DynArray<T, P>
where
    P: Contiguous<T>,
{
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.buf.as_ptr(), self.len) }
    }
}

impl<T, P> DerefMut for DynArray<T, P>
where
    P: Contiguous<T>,
{
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        unsafe { slice::from_raw_parts_mut(self.buf.as_mut_ptr(), self.len) }
    }
}

impl<T, P> Index<usize> for DynArray<T, P>
where
    P: GrowthPolicy<T>,
{
    type Output = T;

    #[inline]
    #[track_caller]
    fn index(&self, index: usize) -> &T {
        self.element(index)
    }
}

impl<T, P> IndexMut<usize> for DynArray<T, P>
where
    P: GrowthPolicy<T>,
{
    #[inline]
    #[track_caller]
    fn index_mut(&mut self, index: usize) -> &mut T {
        self.element_mut(index)
    }
}

impl<T, P> Debug for DynArray<T, P>
where
    T: Debug,
    P: GrowthPolicy<T>,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.elements()).finish()
    }
}

impl<T, U, P, Q> PartialEq<DynArray<U, Q>> for DynArray<T, P>
where
    T: PartialEq<U>,
    P: GrowthPolicy<T>,
    Q: GrowthPolicy<U>,
{
    fn eq(&self, other: &DynArray<U, Q>) -> bool {
        self.len == other.len && self.elements().zip(other.elements()).all(|(a, b)| a == b)
    }
}

impl<T, P> Eq for DynArray<T, P>
where
    T: Eq,
    P: GrowthPolicy<T>,
{
}

impl<T, U, P> PartialEq<[U]> for DynArray<T, P>
where
    T: PartialEq<U>,
    P: GrowthPolicy<T>,
{
    fn eq(&self, other: &[U]) -> bool {
        self.len == other.len() && self.elements().zip(other).all(|(a, b)| a == b)
    }
}

impl<T, U, P> PartialEq<&[U]> for DynArray<T, P>
where
    T: PartialEq<U>,
    P: GrowthPolicy<T>,
{
    #[inline]
    fn eq(&self, other: &&[U]) -> bool {
        *self == **other
    }
}

impl<T, U, P, const N: usize> PartialEq<[U; N]> for DynArray<T, P>
where
    T: PartialEq<U>,
    P: GrowthPolicy<T>,
{
    #[inline]
    fn eq(&self, other: &[U; N]) -> bool {
        *self == other[..]
    }
}

impl<T, P> Extend<T> for DynArray<T, P>
where
    P: GrowthPolicy<T>,
{
    #[track_caller]
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        self.grow_to(self.len.saturating_add(lower));
        for value in iter {
            self.add_to_tail(value);
        }
    }
}

impl<T, P> FromIterator<T> for DynArray<T, P>
where
    P: OwnedStorage<T>,
{
    #[track_caller]
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut array = Self::new(0, iter.size_hint().0);
        array.extend(iter);
        array
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{HybridStorage, InlineStorage, PagedStorage};
    use crate::test_utils::{DropCounter, Droppable, RNG_SEED};
    use alloc::vec::Vec;

    type Paged<T> = DynArray<T, PagedStorage<T>>;

    #[test]
    fn insert_fast_remove_find_scenario() {
        let mut array: DynArray<i32> = DynArray::new(0, 4);
        array.add_to_tail(1);
        array.add_to_tail(2);
        array.add_to_tail(3);
        assert_eq!(array, [1, 2, 3]);

        assert_eq!(array.insert_before(1, 9), 1);
        assert_eq!(array, [1, 9, 2, 3]);

        assert_eq!(array.fast_remove(0), 1);
        assert_eq!(array, [3, 9, 2]);
        assert_eq!(array.find(&9), Some(1));
        assert_eq!(array.find(&1), None);
        assert_eq!(array.capacity(), 4);
    }

    #[test]
    fn fixed_capacity_accepts_up_to_its_bound() {
        let mut array = DynArray::<u8, InlineStorage<u8, 2>>::default();
        array.add_to_tail(1);
        array.add_to_tail(2);
        assert_eq!(array.try_insert_before(2, 3), Err(3));
        assert_eq!(array, [1, 2]);
    }

    #[test]
    #[should_panic(expected = "exceeded fixed capacity of 2")]
    fn fixed_capacity_panics_past_its_bound() {
        let mut array = DynArray::<u8, InlineStorage<u8, 2>>::default();
        array.add_to_tail(1);
        array.add_to_tail(2);
        array.add_to_tail(3);
    }

    #[test]
    fn paged_growth_keeps_earlier_pages_in_place() {
        let mut array: Paged<u64> = DynArray::new(4, 0);
        array.add_to_tail(0);
        let first = &array[0] as *const u64;

        let mut addresses = Vec::new();
        for i in 1..10 {
            array.add_to_tail(i);
            addresses.push(&array[0] as *const u64);
        }

        assert_eq!(array.len(), 10);
        assert_eq!(array.storage().page_count(), 3);
        assert_eq!(array.storage().page_location(5), (1, 1));
        assert!(addresses.iter().all(|&p| p == first));
        assert_eq!(&array[5] as *const u64, array.storage().ptr_at(5));
    }

    #[test]
    fn insert_shifts_tail_right() {
        let mut array: Paged<u32> = DynArray::new(3, 0);
        array.add_multiple_to_tail_from(&[0, 1, 2, 3, 4, 5, 6]);
        array.insert_before(2, 100);
        assert_eq!(array, [0, 1, 100, 2, 3, 4, 5, 6]);
        array.insert_after(7, 200);
        assert_eq!(*array.tail(), 200);
        array.add_to_head(300);
        assert_eq!(*array.head(), 300);
        assert_eq!(array.len(), 10);
    }

    #[test]
    fn remove_preserves_order() {
        let mut array: DynArray<char> = DynArray::new(0, 0);
        array.add_multiple_to_tail_from(&['a', 'b', 'c', 'd']);
        assert_eq!(array.remove(1), 'b');
        assert_eq!(array, ['a', 'c', 'd']);
        assert!(array.find_and_remove(&'d'));
        assert!(!array.find_and_remove(&'z'));
        assert_eq!(array, ['a', 'c']);
    }

    #[test]
    fn multiple_inserts_and_removals() {
        let mut array: DynArray<u16, HybridStorage<u16, 4>> = DynArray::new(0, 0);
        array.add_multiple_to_tail(3);
        array.insert_multiple_after(0, 2);
        array.add_multiple_to_head(1);
        assert_eq!(array.len(), 6);
        assert!(!array.storage().is_inline());

        for i in 0..array.len() {
            array[i] = i as u16;
        }
        array.remove_multiple(1, 3);
        assert_eq!(array, [0, 4, 5]);

        array.remove_multiple(3, 0);
        assert_eq!(array.insert_multiple_before(3, 0), 3);
        assert_eq!(array, [0, 4, 5]);
    }

    #[test]
    #[should_panic(expected = "should be within len")]
    fn remove_multiple_past_the_end() {
        let mut array: DynArray<u8> = DynArray::new(0, 0);
        array.add_multiple_to_tail(4);
        array.remove_multiple(2, 3);
    }

    #[test]
    #[should_panic(expected = "insertion index (is 2) should be <= len (is 1)")]
    fn insertion_index_out_of_bounds() {
        let mut array: DynArray<u8> = DynArray::new(0, 0);
        array.add_to_tail(1);
        array.insert_before(2, 2);
    }

    #[test]
    #[should_panic(expected = "head called on an empty array")]
    fn head_of_empty_array() {
        let array: DynArray<u8> = DynArray::new(0, 0);
        array.head();
    }

    #[test]
    fn checked_access() {
        let mut array: Paged<i8> = DynArray::new(2, 0);
        array.add_multiple_to_tail_from(&[1, 2, 3]);
        assert_eq!(array.get(2), Some(&3));
        assert_eq!(array.get(3), None);
        *array.get_mut(0).unwrap() = -1;
        *array.tail_mut() = -3;
        *array.head_mut() -= 1;
        assert_eq!(array, [-2, 2, -3]);
        assert!(array.is_valid_index(2));
        assert!(!array.is_valid_index(3));
    }

    #[test]
    fn swap_exchanges_without_touching_elements() {
        let drop_count = DropCounter::new();
        let mut a: DynArray<Droppable<u32>> = DynArray::new(0, 0);
        let mut b: DynArray<Droppable<u32>> = DynArray::new(0, 0);
        for i in 0..3 {
            a.add_to_tail(drop_count.new_droppable(i));
        }
        b.add_to_tail(drop_count.new_droppable(10));

        let a_ptr = a.storage().ptr_at(0);
        a.swap(&mut b);
        assert_eq!(drop_count.dropped(), 0);
        assert_eq!(b.storage().ptr_at(0), a_ptr);
        assert_eq!(a.len(), 1);
        assert_eq!(b[2].value, 2);
    }

    #[test]
    fn set_size_fill_and_find() {
        let mut array: Paged<usize> = DynArray::new(8, 0);
        array.set_size(20);
        for i in 0..20 {
            array[i] = i * 3;
        }
        for i in 0..20 {
            assert_eq!(array.find(&(i * 3)), Some(i));
        }
        assert!(!array.has_element(&1));
    }

    #[test]
    fn compact_after_remove_multiple() {
        let mut array: DynArray<u32> = DynArray::new(0, 0);
        array.add_multiple_to_tail_from(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        let before = array.capacity();
        array.remove_multiple(2, 6);
        array.compact();
        assert!(array.capacity() < before);
        assert_eq!(array.capacity(), 4);
        assert_eq!(array, [1, 2, 9, 10]);

        let mut paged: Paged<u32> = DynArray::new(4, 16);
        paged.add_multiple_to_tail_from(&[1, 2, 3, 4, 5]);
        paged.compact();
        assert_eq!(paged.storage().page_count(), 2);
        paged.purge();
        assert_eq!(paged.storage().page_count(), 0);
        assert!(paged.is_empty());
    }

    #[test]
    fn ensure_capacity_and_count() {
        let mut array: DynArray<u8> = DynArray::new(10, 0);
        array.ensure_capacity(3);
        assert_eq!(array.capacity(), 10);
        assert_eq!(array.try_ensure_capacity(11), Ok(()));
        assert_eq!(array.num_allocated(), 20);

        array.add_to_tail(5);
        array.ensure_count(3);
        assert_eq!(array, [5, 0, 0]);
        array.ensure_count(1);
        assert_eq!(array.len(), 3);
        array.add_default_to_tail();
        array.insert_default_before(0);
        assert_eq!(array, [0, 5, 0, 0, 0]);

        array.set_grow_size(0);
        assert_eq!(array.grow_size(), 0);
    }

    #[test]
    fn copy_array_reuses_and_trims() {
        let drop_count = DropCounter::new();
        let mut array: DynArray<Droppable<u8>> = DynArray::new(0, 0);
        for i in 0..5 {
            array.add_to_tail(drop_count.new_droppable(i));
        }

        let source: Vec<_> = (10..12).map(|i| drop_count.new_droppable(i)).collect();
        array.copy_array(&source);
        assert_eq!(drop_count.dropped(), 5);
        assert_eq!(array.len(), 2);
        assert_eq!(array[1].value, 11);

        let longer: Vec<_> = (20..24).map(|i| drop_count.new_droppable(i)).collect();
        array.copy_array(&longer);
        assert_eq!(array, &longer[..]);
    }

    #[test]
    fn add_vector_to_tail_across_policies() {
        let mut paged: Paged<u8> = DynArray::new(2, 0);
        paged.add_multiple_to_tail_from(&[4, 5, 6]);
        let mut fixed = DynArray::<u8, InlineStorage<u8, 8>>::default();
        fixed.add_multiple_to_tail_from(&[1, 2]);

        assert_eq!(fixed.add_vector_to_tail(&paged), 2);
        assert_eq!(fixed, [1, 2, 4, 5, 6]);
        assert_eq!(paged, [4, 5, 6]);
        assert_eq!(fixed.iter().sum::<u8>(), 18);
    }

    #[test]
    fn drops_every_element_exactly_once() {
        let drop_count = DropCounter::new();
        {
            let mut array: Paged<Droppable> = DynArray::new(3, 0);
            for _ in 0..10 {
                array.add_to_tail(drop_count.new_droppable(()));
            }

            drop(array.remove(4));
            drop(array.fast_remove(0));
            assert_eq!(drop_count.dropped(), 2);

            array.remove_multiple(1, 3);
            assert_eq!(drop_count.dropped(), 5);
        }
        assert_eq!(drop_count.dropped(), 10);
    }

    #[test]
    fn into_raw_parts_does_not_drop() {
        let drop_count = DropCounter::new();
        let mut array: DynArray<Droppable> = DynArray::new(0, 0);
        array.add_to_tail(drop_count.new_droppable(()));
        array.add_to_tail(drop_count.new_droppable(()));

        let (buf, len) = array.into_raw_parts();
        assert_eq!(drop_count.dropped(), 0);

        let array: DynArray<Droppable> = unsafe { DynArray::from_raw_parts(buf, len) };
        assert_eq!(array.len(), 2);
        drop(array);
        assert_eq!(drop_count.dropped(), 2);
    }

    #[test]
    fn zero_sized_elements() {
        let mut array: DynArray<()> = DynArray::new(0, 0);
        for _ in 0..1000 {
            array.add_to_tail(());
        }
        array.remove_multiple(10, 500);
        assert_eq!(array.len(), 500);
        assert_eq!(array.capacity(), usize::MAX);
    }

    #[test]
    #[cfg(debug_assertions)]
    fn vacated_slots_are_poisoned() {
        let mut array: DynArray<u32> = DynArray::new(0, 4);
        array.add_multiple_to_tail_from(&[1, 2, 3]);
        array.remove(0);
        let bytes = unsafe { (array.storage().ptr_at(2) as *const [u8; 4]).read() };
        assert_eq!(bytes, [0xDD; 4]);
    }

    #[test]
    fn debug_formats_like_a_list() {
        let mut array: Paged<u8> = DynArray::new(2, 0);
        array.add_multiple_to_tail_from(&[1, 2, 3]);
        assert_eq!(alloc::format!("{:?}", array), "[1, 2, 3]");
    }

    #[test]
    fn collect_and_extend() {
        let mut array: DynArray<u32> = (0..5).collect();
        array.extend(5..8);
        assert_eq!(array, [0, 1, 2, 3, 4, 5, 6, 7]);
        array.validate();
    }

    #[test]
    fn randomized_sort_matches_slice_sort() {
        use rand::{rngs::SmallRng, Rng, SeedableRng};
        let mut rng = SmallRng::from_seed(RNG_SEED);

        for _ in 0..50 {
            let len = rng.gen_range(0..200);
            let values: Vec<u16> = (0..len).map(|_| rng.gen()).collect();
            let mut expected = values.clone();
            expected.sort_unstable();

            let mut paged: Paged<u16> = DynArray::new(rng.gen_range(1..16), 0);
            paged.add_multiple_to_tail_from(&values);
            paged.sort();
            assert_eq!(paged, &expected[..]);

            let mut flat: DynArray<u16> = DynArray::new(0, 0);
            flat.add_multiple_to_tail_from(&values);
            flat.sort();
            assert_eq!(flat, paged);
        }
    }

    #[test]
    fn randomized_edits_match_a_vec() {
        use rand::{rngs::SmallRng, Rng, SeedableRng};
        let mut rng = SmallRng::from_seed(RNG_SEED);

        let mut model = Vec::new();
        let mut array: Paged<u32> = DynArray::new(5, 0);
        for step in 0..2000u32 {
            match rng.gen_range(0..4) {
                0 | 1 => {
                    let at = rng.gen_range(0..=model.len());
                    model.insert(at, step);
                    array.insert_before(at, step);
                }
                2 if !model.is_empty() => {
                    let at = rng.gen_range(0..model.len());
                    assert_eq!(array.remove(at), model.remove(at));
                }
                3 if !model.is_empty() => {
                    let at = rng.gen_range(0..model.len());
                    assert_eq!(array.fast_remove(at), model.swap_remove(at));
                }
                _ => {}
            }
            assert_eq!(array.len(), model.len());
        }
        assert_eq!(array, &model[..]);
    }
}
