//! Fixed-capacity element block with chain links.
//!
//! A node stores up to `K` elements in `[0, len)` of an uninitialized
//! array. Every slot below `len` is initialized; every slot at or above it
//! is not. Dropping a node drops exactly its live elements.
//!
//! Iterators hold element references across node boundaries, so the
//! `raw_*` accessors read fields through the node pointer without ever
//! materializing a `&Node` or `&mut Node`.

use std::mem::{ManuallyDrop, MaybeUninit};
use std::ptr::{self, NonNull};
use std::slice;

/// Link to a neighbouring node (`None` past either end of the chain).
pub(crate) type Link<T, const K: usize> = Option<NonNull<Node<T, K>>>;

pub(crate) struct Node<T, const K: usize> {
    pub(crate) prev: Link<T, K>,
    pub(crate) next: Link<T, K>,
    len: usize,
    elems: [MaybeUninit<T>; K],
}

impl<T, const K: usize> Node<T, K> {
    pub(crate) const fn new() -> Node<T, K> {
        return Node {
            prev: None,
            next: None,
            len: 0,
            elems: [const { MaybeUninit::uninit() }; K],
        };
    }

    #[inline(always)]
    pub(crate) fn len(&self) -> usize {
        return self.len;
    }

    #[inline(always)]
    pub(crate) fn is_empty(&self) -> bool {
        return self.len == 0;
    }

    #[inline(always)]
    pub(crate) fn is_full(&self) -> bool {
        return self.len == K;
    }

    #[inline(always)]
    fn base(&self) -> *const T {
        return self.elems.as_ptr().cast();
    }

    #[inline(always)]
    fn base_mut(&mut self) -> *mut T {
        return self.elems.as_mut_ptr().cast();
    }

    pub(crate) fn as_slice(&self) -> &[T] {
        // Safety: `[0, len)` is initialized.
        return unsafe { slice::from_raw_parts(self.base(), self.len) };
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [T] {
        // Safety: `[0, len)` is initialized.
        return unsafe { slice::from_raw_parts_mut(self.base_mut(), self.len) };
    }

    // ------------------------------------------------------------------
    // Raw access for iterators
    // ------------------------------------------------------------------

    /// # Safety
    ///
    /// `node` must point to a live node.
    #[inline(always)]
    pub(crate) unsafe fn raw_len(node: NonNull<Self>) -> usize {
        return unsafe { (*node.as_ptr()).len };
    }

    /// # Safety
    ///
    /// `node` must point to a live node.
    #[inline(always)]
    pub(crate) unsafe fn raw_next(node: NonNull<Self>) -> Link<T, K> {
        return unsafe { (*node.as_ptr()).next };
    }

    /// # Safety
    ///
    /// `node` must point to a live node.
    #[inline(always)]
    pub(crate) unsafe fn raw_prev(node: NonNull<Self>) -> Link<T, K> {
        return unsafe { (*node.as_ptr()).prev };
    }

    /// Pointer to slot `index` of `node`.
    ///
    /// # Safety
    ///
    /// `node` must point to a live node and `index < K`.
    #[inline(always)]
    pub(crate) unsafe fn raw_slot(node: NonNull<Self>, index: usize) -> *mut T {
        debug_assert!(index < K);
        return unsafe { (&raw mut (*node.as_ptr()).elems).cast::<T>().add(index) };
    }

    // ------------------------------------------------------------------
    // In-node mutation
    // ------------------------------------------------------------------

    /// Shift `[offset, len)` one slot right, leaving a hole at `offset`.
    ///
    /// The returned guard either fills the hole ([`Gap::fill`]) or, if it is
    /// dropped first (e.g. while unwinding), shifts the elements back.
    pub(crate) fn open_gap(&mut self, offset: usize) -> Gap<'_, T, K> {
        assert!(!self.is_full(), "open_gap on a full node");
        assert!(offset <= self.len, "gap offset {offset} past length {}", self.len);
        let base = self.base_mut();
        // Safety: `len < K`, so `[offset + 1, len + 1)` is in bounds.
        unsafe { ptr::copy(base.add(offset), base.add(offset + 1), self.len - offset) };
        return Gap { node: self, offset };
    }

    pub(crate) fn push(&mut self, value: T) {
        assert!(!self.is_full(), "push on a full node");
        // Safety: slot `len` is in bounds and uninitialized.
        unsafe { self.base_mut().add(self.len).write(value) };
        self.len += 1;
    }

    /// Remove the element at `offset`, closing the hole.
    pub(crate) fn remove(&mut self, offset: usize) -> T {
        assert!(offset < self.len, "remove offset {offset} past length {}", self.len);
        let base = self.base_mut();
        // Safety: `offset < len`; the tail shift stays within `[0, len)`.
        unsafe {
            let value = base.add(offset).read();
            ptr::copy(base.add(offset + 1), base.add(offset), self.len - offset - 1);
            self.len -= 1;
            return value;
        }
    }

    pub(crate) fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // Safety: slot `len` was initialized and is now outside the live range.
        return Some(unsafe { self.base().add(self.len).read() });
    }

    /// Move all of `other`'s elements after this node's, leaving `other` empty.
    pub(crate) fn append(&mut self, other: &mut Node<T, K>) {
        assert!(self.len + other.len <= K, "append overflows node");
        // Safety: distinct nodes; destination range is uninitialized and in bounds.
        unsafe {
            ptr::copy_nonoverlapping(other.base(), self.base_mut().add(self.len), other.len);
        }
        self.len += other.len;
        other.len = 0;
    }

    /// Move all of `other`'s elements before this node's, leaving `other` empty.
    pub(crate) fn prepend(&mut self, other: &mut Node<T, K>) {
        assert!(self.len + other.len <= K, "prepend overflows node");
        let shift = other.len;
        let base = self.base_mut();
        // Safety: the shifted run ends at `len + shift <= K`; the freed prefix
        // receives exactly `shift` elements from a distinct node.
        unsafe {
            ptr::copy(base, base.add(shift), self.len);
            ptr::copy_nonoverlapping(other.base(), base, shift);
        }
        self.len += shift;
        other.len = 0;
    }

    /// Move every element into `dst`, skipping one slot at `hole`.
    ///
    /// Afterwards the node is empty and `dst[hole]` is uninitialized.
    ///
    /// # Safety
    ///
    /// `dst` must be valid for `len + 1` writes and not overlap this node.
    pub(crate) unsafe fn move_out_around(&mut self, dst: *mut T, hole: usize) {
        assert!(hole <= self.len);
        let base = self.base();
        unsafe {
            ptr::copy_nonoverlapping(base, dst, hole);
            ptr::copy_nonoverlapping(base.add(hole), dst.add(hole + 1), self.len - hole);
        }
        self.len = 0;
    }

    /// Take ownership of `count` elements starting at `src`.
    ///
    /// # Safety
    ///
    /// The node must be empty, `count <= K`, and `src` must hold `count`
    /// initialized elements that the caller will no longer use.
    pub(crate) unsafe fn move_in(&mut self, src: *const T, count: usize) {
        assert!(self.len == 0 && count <= K);
        unsafe { ptr::copy_nonoverlapping(src, self.base_mut(), count) };
        self.len = count;
    }
}

impl<T, const K: usize> Drop for Node<T, K> {
    fn drop(&mut self) {
        // Safety: exactly the live range is dropped, once.
        unsafe { ptr::drop_in_place(self.as_mut_slice()) };
    }
}

/// An open hole inside a node.
///
/// While the gap is open, `[offset + 1, len + 1)` holds the shifted elements
/// and the node's `len` has not changed.
pub(crate) struct Gap<'a, T, const K: usize> {
    node: &'a mut Node<T, K>,
    offset: usize,
}

impl<T, const K: usize> Gap<'_, T, K> {
    /// Write `value` into the hole and commit the shift.
    pub(crate) fn fill(self, value: T) {
        let mut this = ManuallyDrop::new(self);
        let offset = this.offset;
        // Safety: the hole at `offset` is in bounds and uninitialized.
        unsafe { this.node.base_mut().add(offset).write(value) };
        this.node.len += 1;
    }
}

impl<T, const K: usize> Drop for Gap<'_, T, K> {
    fn drop(&mut self) {
        let len = self.node.len;
        let base = self.node.base_mut();
        // Safety: undoes the shift performed by `open_gap`.
        unsafe { ptr::copy(base.add(self.offset + 1), base.add(self.offset), len - self.offset) };
    }
}
