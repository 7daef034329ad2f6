//! The doubly-linked chain of nodes.
//!
//! Owns head/tail, the cached element count, and the storage strategy.
//! Everything here keeps the link invariants intact on return:
//!
//! ```text
//! head.is_none() <=> tail.is_none() <=> len == 0
//! node.next.prev == node, node.prev.next == node
//! len == sum of node lengths
//! ```

use std::alloc::Layout;
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::ptr::NonNull;

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::cursor::Position;
use crate::error::{AllocError, Error};
use crate::node::{Link, Node};
use crate::storage::{Shape, Storage};

pub(crate) struct Chain<T, const K: usize, S: Storage> {
    pub(crate) head: Link<T, K>,
    pub(crate) tail: Link<T, K>,
    pub(crate) len: usize,
    pub(crate) storage: S,
    _marker: PhantomData<Box<Node<T, K>>>,
}

/// A node that has been allocated but not linked yet.
///
/// Released back to storage if dropped before [`Orphan::adopt`].
pub(crate) struct Orphan<'s, T, const K: usize, S: Storage> {
    node: NonNull<Node<T, K>>,
    storage: &'s S,
}

impl<T, const K: usize, S: Storage> Orphan<'_, T, K, S> {
    #[inline]
    pub(crate) fn node_mut(&mut self) -> &mut Node<T, K> {
        // Safety: the orphan exclusively owns a live, unlinked node.
        return unsafe { self.node.as_mut() };
    }

    /// Give up the guard; the caller now owns the node.
    #[inline]
    pub(crate) fn adopt(self) -> NonNull<Node<T, K>> {
        let this = ManuallyDrop::new(self);
        return this.node;
    }
}

impl<T, const K: usize, S: Storage> Drop for Orphan<'_, T, K, S> {
    fn drop(&mut self) {
        log::trace!("releasing unlinked node {:p}", self.node);
        // Safety: never linked, so nothing else refers to it.
        unsafe { release(self.storage, self.node) };
    }
}

#[inline]
fn node_layout<T, const K: usize>() -> Layout {
    return Layout::new::<Node<T, K>>();
}

/// Drop a node's live elements and return its block to storage.
///
/// # Safety
///
/// `node` must have been allocated by `storage` (or a clone) and must not be
/// reachable from any chain.
unsafe fn release<T, const K: usize, S: Storage>(storage: &S, node: NonNull<Node<T, K>>) {
    unsafe {
        node.as_ptr().drop_in_place();
        storage.deallocate(Shape::Node, node.cast(), node_layout::<T, K>());
    }
}

impl<T, const K: usize, S: Storage> Chain<T, K, S> {
    pub(crate) const fn new_in(storage: S) -> Chain<T, K, S> {
        const { assert!(K > 0, "node capacity must be positive") };
        return Chain {
            head: None,
            tail: None,
            len: 0,
            storage,
            _marker: PhantomData,
        };
    }

    // ------------------------------------------------------------------
    // Node lifecycle
    // ------------------------------------------------------------------

    pub(crate) fn alloc_node(&self) -> Result<Orphan<'_, T, K, S>, AllocError> {
        let layout = node_layout::<T, K>();
        let block = match self.storage.allocate(Shape::Node, layout) {
            Ok(block) => block,
            Err(err) => {
                log::debug!("node allocation failed: {err}");
                return Err(err);
            }
        };
        let node = block.cast::<Node<T, K>>();
        // Safety: fresh block sized and aligned for a node.
        unsafe { node.as_ptr().write(Node::new()) };
        log::trace!("allocated node {:p}", node);
        return Ok(Orphan { node, storage: &self.storage });
    }

    /// Drop a node's elements and deallocate it.
    ///
    /// # Safety
    ///
    /// `node` must belong to this chain and already be unlinked.
    pub(crate) unsafe fn free_node(&self, node: NonNull<Node<T, K>>) {
        log::trace!("freeing node {:p}", node);
        unsafe { release(&self.storage, node) };
    }

    // ------------------------------------------------------------------
    // Linking
    // ------------------------------------------------------------------

    /// # Safety
    ///
    /// `node` must be live and unlinked.
    pub(crate) unsafe fn link_front(&mut self, node: NonNull<Node<T, K>>) {
        unsafe {
            (*node.as_ptr()).prev = None;
            (*node.as_ptr()).next = self.head;
            match self.head {
                Some(head) => (*head.as_ptr()).prev = Some(node),
                None => self.tail = Some(node),
            }
        }
        self.head = Some(node);
    }

    /// # Safety
    ///
    /// `node` must be live and unlinked.
    pub(crate) unsafe fn link_back(&mut self, node: NonNull<Node<T, K>>) {
        unsafe {
            (*node.as_ptr()).next = None;
            (*node.as_ptr()).prev = self.tail;
            match self.tail {
                Some(tail) => (*tail.as_ptr()).next = Some(node),
                None => self.head = Some(node),
            }
        }
        self.tail = Some(node);
    }

    /// # Safety
    ///
    /// `at` must be linked into this chain; `node` must be live and unlinked.
    pub(crate) unsafe fn link_after(&mut self, at: NonNull<Node<T, K>>, node: NonNull<Node<T, K>>) {
        unsafe {
            let next = (*at.as_ptr()).next;
            (*node.as_ptr()).prev = Some(at);
            (*node.as_ptr()).next = next;
            match next {
                Some(next) => (*next.as_ptr()).prev = Some(node),
                None => self.tail = Some(node),
            }
            (*at.as_ptr()).next = Some(node);
        }
    }

    /// # Safety
    ///
    /// `node` must be linked into this chain.
    pub(crate) unsafe fn unlink(&mut self, node: NonNull<Node<T, K>>) {
        unsafe {
            let prev = (*node.as_ptr()).prev.take();
            let next = (*node.as_ptr()).next.take();
            match prev {
                Some(prev) => (*prev.as_ptr()).next = next,
                None => self.head = next,
            }
            match next {
                Some(next) => (*next.as_ptr()).prev = prev,
                None => self.tail = prev,
            }
        }
    }

    /// Unlink and free every node.
    pub(crate) fn clear(&mut self) {
        let mut cursor = self.head.take();
        self.tail = None;
        self.len = 0;
        while let Some(node) = cursor {
            // Safety: the detached chain is walked front to back, each node once.
            unsafe {
                cursor = (*node.as_ptr()).next;
                self.free_node(node);
            }
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub(crate) fn nodes(&self) -> Nodes<'_, T, K> {
        return Nodes {
            cursor: self.head,
            _marker: PhantomData,
        };
    }

    pub(crate) fn node_lens(&self) -> SmallVec<[usize; 8]> {
        return self.nodes().map(Node::len).collect();
    }

    /// Position of the element at `index`; the end sentinel for `index >= len`.
    ///
    /// Walks from whichever end is closer.
    pub(crate) fn locate(&self, index: usize) -> Position<T, K> {
        if index >= self.len {
            return Position::END;
        }

        if index < self.len / 2 {
            let mut remaining = index;
            let mut cursor = self.head;
            while let Some(node) = cursor {
                // Safety: linked nodes are live.
                let node_len = unsafe { Node::raw_len(node) };
                if remaining < node_len {
                    return Position::new(node, remaining);
                }
                remaining -= node_len;
                cursor = unsafe { Node::raw_next(node) };
            }
        } else {
            let mut remaining = self.len - index;
            let mut cursor = self.tail;
            while let Some(node) = cursor {
                // Safety: linked nodes are live.
                let node_len = unsafe { Node::raw_len(node) };
                if remaining <= node_len {
                    return Position::new(node, node_len - remaining);
                }
                remaining -= node_len;
                cursor = unsafe { Node::raw_prev(node) };
            }
        }

        unreachable!("cached length exceeds node contents");
    }

    /// Check every structural invariant, reporting the first violation.
    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.head.is_none() != self.tail.is_none() {
            return Err(Error::Corrupt("head and tail disagree on emptiness"));
        }
        if self.head.is_none() && self.len != 0 {
            return Err(Error::Corrupt("empty chain reports a nonzero length"));
        }

        let mut seen: FxHashSet<NonNull<Node<T, K>>> = FxHashSet::default();
        let mut total = 0usize;
        let mut prev: Link<T, K> = None;
        let mut cursor = self.head;
        while let Some(node) = cursor {
            if !seen.insert(node) {
                return Err(Error::Corrupt("node links form a cycle"));
            }
            // Safety: reachable nodes are live.
            let current = unsafe { node.as_ref() };
            if current.prev != prev {
                return Err(Error::Corrupt("prev link does not mirror next link"));
            }
            if current.is_empty() {
                return Err(Error::Corrupt("reachable node holds no elements"));
            }
            total += current.len();
            prev = Some(node);
            cursor = current.next;
        }

        if prev != self.tail {
            return Err(Error::Corrupt("tail is not the last reachable node"));
        }
        if total != self.len {
            return Err(Error::Corrupt("cached length differs from node contents"));
        }
        return Ok(());
    }
}

impl<T, const K: usize, S: Storage> Drop for Chain<T, K, S> {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Front-to-back walk over the chain's nodes.
pub(crate) struct Nodes<'a, T, const K: usize> {
    cursor: Link<T, K>,
    _marker: PhantomData<&'a Node<T, K>>,
}

impl<'a, T, const K: usize> Iterator for Nodes<'a, T, K> {
    type Item = &'a Node<T, K>;

    fn next(&mut self) -> Option<&'a Node<T, K>> {
        let node = self.cursor?;
        // Safety: the chain is borrowed for 'a, so linked nodes stay live.
        let node = unsafe { node.as_ref() };
        self.cursor = node.next;
        return Some(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Global;

    fn chain_with(groups: &[&[u32]]) -> Chain<u32, 4, Global> {
        let mut chain = Chain::new_in(Global);
        for group in groups {
            let mut orphan = chain.alloc_node().unwrap();
            for &v in *group {
                orphan.node_mut().push(v);
            }
            let node = orphan.adopt();
            unsafe { chain.link_back(node) };
            chain.len += group.len();
        }
        return chain;
    }

    #[test]
    fn empty_chain_is_valid() {
        let chain: Chain<u32, 4, Global> = Chain::new_in(Global);
        assert_eq!(chain.validate(), Ok(()));
        assert!(chain.locate(0).is_end());
        assert!(chain.node_lens().is_empty());
    }

    #[test]
    fn link_and_unlink_keep_invariants() {
        let mut chain = chain_with(&[&[1, 2], &[3], &[4, 5, 6]]);
        assert_eq!(chain.validate(), Ok(()));
        assert_eq!(chain.node_lens().as_slice(), &[2, 1, 3]);

        let middle = unsafe { chain.head.unwrap().as_ref().next.unwrap() };
        unsafe {
            chain.unlink(middle);
            chain.free_node(middle);
        }
        chain.len -= 1;
        assert_eq!(chain.validate(), Ok(()));
        assert_eq!(chain.node_lens().as_slice(), &[2, 3]);
    }

    #[test]
    fn link_after_tail_moves_tail() {
        let mut chain = chain_with(&[&[1]]);
        let mut orphan = chain.alloc_node().unwrap();
        orphan.node_mut().push(2);
        let node = orphan.adopt();
        let head = chain.head.unwrap();
        unsafe { chain.link_after(head, node) };
        chain.len += 1;
        assert_eq!(chain.tail, Some(node));
        assert_eq!(chain.validate(), Ok(()));
    }

    #[test]
    fn locate_from_both_ends() {
        let chain = chain_with(&[&[0, 1, 2], &[3], &[4, 5], &[6, 7, 8, 9]]);
        for index in 0..10 {
            let pos = chain.locate(index);
            let node = pos.node.unwrap();
            let value = unsafe { node.as_ref().as_slice()[pos.offset] };
            assert_eq!(value, index as u32);
        }
        assert!(chain.locate(10).is_end());
    }

    #[test]
    fn validate_reports_bad_length() {
        let mut chain = chain_with(&[&[1, 2]]);
        chain.len = 5;
        assert_eq!(chain.validate(), Err(Error::Corrupt("cached length differs from node contents")));
        chain.len = 2;
    }

    #[test]
    fn dropped_orphan_is_released() {
        let chain: Chain<String, 4, Global> = Chain::new_in(Global);
        let mut orphan = chain.alloc_node().unwrap();
        orphan.node_mut().push(String::from("discarded"));
        drop(orphan);
        assert_eq!(chain.validate(), Ok(()));
    }
}
