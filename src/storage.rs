//! Storage strategies for nodes and element blocks.
//!
//! A list never calls the global allocator directly. Every block it needs
//! comes from its [`Storage`], tagged with the [`Shape`] of the request:
//!
//! ```text
//! Shape::Node      one Node<T, K>: K element slots + count + two links
//! Shape::Elements  a staging run of K + 1 element slots used while splitting
//! ```
//!
//! Strategies are cheap `Clone` handles. Cloning a list clones its storage;
//! swapping two lists swaps their storages along with their nodes.

use std::alloc::{self, Layout};
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::error::{AllocError, capacity_overflow};

/// What a block is going to hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    /// A chain node.
    Node,
    /// A contiguous run of elements.
    Elements,
}

/// An allocation strategy.
///
/// # Safety
///
/// Implementations must return blocks that are valid for reads and writes of
/// `layout.size()` bytes, aligned to `layout.align()`, and not aliased by any
/// other live block. A block handed out by one clone may be deallocated
/// through any other clone of the same strategy.
///
/// The list never requests zero-sized blocks.
pub unsafe trait Storage: Clone {
    /// Allocate a block for `shape` with the given layout.
    fn allocate(&self, shape: Shape, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Release a block.
    ///
    /// # Safety
    ///
    /// `ptr` must come from [`Storage::allocate`] on this strategy (or a
    /// clone of it) with the same `shape` and `layout`, and must not be used
    /// afterwards.
    unsafe fn deallocate(&self, shape: Shape, ptr: NonNull<u8>, layout: Layout);
}

/// The process-wide allocator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Global;

unsafe impl Storage for Global {
    #[inline]
    fn allocate(&self, _shape: Shape, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        debug_assert!(layout.size() != 0);
        // Safety: the list never requests zero-sized layouts.
        let ptr = unsafe { alloc::alloc(layout) };
        return NonNull::new(ptr).ok_or(AllocError::new(layout));
    }

    #[inline]
    unsafe fn deallocate(&self, _shape: Shape, ptr: NonNull<u8>, layout: Layout) {
        // Safety: caller guarantees `ptr` came from `allocate` with `layout`.
        unsafe { alloc::dealloc(ptr.as_ptr(), layout) };
    }
}

/// Scratch run of uninitialized element slots, released on drop.
///
/// Holds no live elements as far as drop is concerned: whoever writes into
/// the slots is responsible for moving them out again before it goes away.
pub(crate) struct Staging<'s, T, S: Storage> {
    ptr: NonNull<T>,
    layout: Layout,
    storage: &'s S,
    _marker: PhantomData<T>,
}

impl<'s, T, S: Storage> Staging<'s, T, S> {
    pub(crate) fn allocate(storage: &'s S, slots: usize) -> Result<Staging<'s, T, S>, AllocError> {
        let layout = Layout::array::<T>(slots).unwrap_or_else(|_| capacity_overflow());
        let ptr = if layout.size() == 0 {
            NonNull::dangling()
        } else {
            storage.allocate(Shape::Elements, layout)?.cast::<T>()
        };
        return Ok(Staging {
            ptr,
            layout,
            storage,
            _marker: PhantomData,
        });
    }

    #[inline]
    pub(crate) fn as_mut_ptr(&mut self) -> *mut T {
        return self.ptr.as_ptr();
    }
}

impl<T, S: Storage> Drop for Staging<'_, T, S> {
    fn drop(&mut self) {
        if self.layout.size() != 0 {
            // Safety: allocated in `Staging::allocate` with this shape and layout.
            unsafe { self.storage.deallocate(Shape::Elements, self.ptr.cast(), self.layout) };
        }
    }
}
