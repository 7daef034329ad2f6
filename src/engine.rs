//! Mutation engine: insert, erase, and the boundary fast paths.
//!
//! Insert at a position takes one of three routes:
//!
//! ```text
//! end of list       -> push_back
//! node has room     -> open a gap at the offset, produce, fill
//! node is full      -> split: stage K + 1 elements, refill the node with
//!                      the first SPLIT_AT, move the rest to a new sibling
//! ```
//!
//! Erase closes the hole, frees the node if it became empty, and otherwise
//! tries to merge an under-half node with a neighbour.
//!
//! Values are produced by a closure that runs *after* every allocation the
//! route needs has succeeded. Allocation failure hands the closure back
//! untouched; a panicking closure unwinds through guards that restore the
//! node and release the allocations.

use std::ptr::NonNull;

use crate::chain::Chain;
use crate::cursor::Position;
use crate::error::AllocError;
use crate::node::Node;
use crate::storage::{Staging, Storage};

/// An allocation failed; the producer was never called.
pub(crate) type Rejected<F> = (F, AllocError);

impl<T, const K: usize, S: Storage> Chain<T, K, S> {
    /// Elements kept by the original node when a full node splits.
    ///
    /// `ceil((K + 1) / 2)`; the sibling receives the remaining
    /// `K + 1 - SPLIT_AT`.
    pub(crate) const SPLIT_AT: usize = (K + 2) / 2;

    // ------------------------------------------------------------------
    // Stepping
    // ------------------------------------------------------------------

    pub(crate) fn advance(&self, pos: Position<T, K>) -> Position<T, K> {
        let Some(node) = pos.node else {
            return pos;
        };
        // Safety: positions held by a borrower of the chain point at live nodes.
        unsafe {
            if pos.offset + 1 < Node::raw_len(node) {
                return Position::new(node, pos.offset + 1);
            }
            return Position::start_of(Node::raw_next(node));
        }
    }

    pub(crate) fn retreat(&self, pos: Position<T, K>) -> Position<T, K> {
        // Safety: as in `advance`; linked nodes are never empty.
        unsafe {
            let prev = match pos.node {
                None => self.tail,
                Some(_) if pos.offset > 0 => return Position { offset: pos.offset - 1, ..pos },
                Some(node) => Node::raw_prev(node),
            };
            return match prev {
                Some(prev) => Position::new(prev, Node::raw_len(prev) - 1),
                None => Position::END,
            };
        }
    }

    // ------------------------------------------------------------------
    // Insert
    // ------------------------------------------------------------------

    /// Insert before `pos`; returns the position of the new element.
    pub(crate) fn insert_with<F>(&mut self, pos: Position<T, K>, produce: F) -> Result<Position<T, K>, Rejected<F>>
    where
        F: FnOnce() -> T,
    {
        let Some(node) = pos.node else {
            return self.push_back_with(produce);
        };

        // Safety: `pos` refers to a live node of this chain.
        if unsafe { node.as_ref() }.is_full() {
            return self.split_insert(node, pos.offset, produce);
        }

        // Safety: exclusive access through `&mut self`.
        let gap = unsafe { (*node.as_ptr()).open_gap(pos.offset) };
        gap.fill(produce());
        self.len += 1;
        return Ok(pos);
    }

    fn split_insert<F>(&mut self, node: NonNull<Node<T, K>>, offset: usize, produce: F) -> Result<Position<T, K>, Rejected<F>>
    where
        F: FnOnce() -> T,
    {
        let mut staging = match Staging::<T, S>::allocate(&self.storage, K + 1) {
            Ok(staging) => staging,
            Err(err) => return Err((produce, err)),
        };
        let mut sibling = match self.alloc_node() {
            Ok(sibling) => sibling,
            Err(err) => return Err((produce, err)),
        };

        let value = produce();

        let split_at = Self::SPLIT_AT;
        let buf = staging.as_mut_ptr();
        // Safety: the staging block holds K + 1 slots; the node is full, so
        // moving it out around `offset` fills every slot but `offset`, which
        // receives the new value. Both halves then move back out exactly once.
        unsafe {
            let original = &mut *node.as_ptr();
            original.move_out_around(buf, offset);
            buf.add(offset).write(value);
            original.move_in(buf, split_at);
            sibling.node_mut().move_in(buf.add(split_at), K + 1 - split_at);
        }
        drop(staging);

        let sibling = sibling.adopt();
        // Safety: `node` is linked, `sibling` is fresh.
        unsafe { self.link_after(node, sibling) };
        self.len += 1;
        log::trace!("split node {:p} at {split_at}, new sibling {:p}", node, sibling);

        if offset < split_at {
            return Ok(Position::new(node, offset));
        }
        return Ok(Position::new(sibling, offset - split_at));
    }

    // ------------------------------------------------------------------
    // Boundary fast paths
    // ------------------------------------------------------------------

    pub(crate) fn push_front_with<F>(&mut self, produce: F) -> Result<Position<T, K>, Rejected<F>>
    where
        F: FnOnce() -> T,
    {
        if let Some(head) = self.head {
            // Safety: head is live; exclusive access through `&mut self`.
            let head_node = unsafe { &mut *head.as_ptr() };
            if !head_node.is_full() {
                head_node.open_gap(0).fill(produce());
                self.len += 1;
                return Ok(Position::new(head, 0));
            }
        }

        let mut orphan = match self.alloc_node() {
            Ok(orphan) => orphan,
            Err(err) => return Err((produce, err)),
        };
        orphan.node_mut().push(produce());
        let node = orphan.adopt();
        // Safety: fresh, unlinked node.
        unsafe { self.link_front(node) };
        self.len += 1;
        return Ok(Position::new(node, 0));
    }

    pub(crate) fn push_back_with<F>(&mut self, produce: F) -> Result<Position<T, K>, Rejected<F>>
    where
        F: FnOnce() -> T,
    {
        if let Some(tail) = self.tail {
            // Safety: tail is live; exclusive access through `&mut self`.
            let tail_node = unsafe { &mut *tail.as_ptr() };
            if !tail_node.is_full() {
                tail_node.push(produce());
                self.len += 1;
                return Ok(Position::new(tail, tail_node.len() - 1));
            }
        }

        let mut orphan = match self.alloc_node() {
            Ok(orphan) => orphan,
            Err(err) => return Err((produce, err)),
        };
        orphan.node_mut().push(produce());
        let node = orphan.adopt();
        // Safety: fresh, unlinked node.
        unsafe { self.link_back(node) };
        self.len += 1;
        return Ok(Position::new(node, 0));
    }

    pub(crate) fn pop_front(&mut self) -> Option<T> {
        let head = self.head?;
        // Safety: head is live; exclusive access through `&mut self`.
        let head_node = unsafe { &mut *head.as_ptr() };
        let value = head_node.remove(0);
        self.len -= 1;
        if head_node.is_empty() {
            // Safety: head is linked; once unlinked nothing refers to it.
            unsafe {
                self.unlink(head);
                self.free_node(head);
            }
        }
        return Some(value);
    }

    pub(crate) fn pop_back(&mut self) -> Option<T> {
        let tail = self.tail?;
        // Safety: tail is live; exclusive access through `&mut self`.
        let tail_node = unsafe { &mut *tail.as_ptr() };
        let value = tail_node.pop()?;
        self.len -= 1;
        if tail_node.is_empty() {
            // Safety: tail is linked; once unlinked nothing refers to it.
            unsafe {
                self.unlink(tail);
                self.free_node(tail);
            }
        }
        return Some(value);
    }

    // ------------------------------------------------------------------
    // Erase
    // ------------------------------------------------------------------

    /// Remove the element at `pos`.
    ///
    /// Returns the element and the position of the one that followed it.
    /// Erasing at the end sentinel does nothing.
    pub(crate) fn erase(&mut self, pos: Position<T, K>) -> Option<(T, Position<T, K>)> {
        let node = pos.node?;
        // Safety: `pos` refers to a live node; exclusive access through `&mut self`.
        let current = unsafe { &mut *node.as_ptr() };
        let value = current.remove(pos.offset);
        self.len -= 1;

        if current.is_empty() {
            let next = current.next;
            // Safety: linked and now empty; nothing else refers to it.
            unsafe {
                self.unlink(node);
                self.free_node(node);
            }
            return Some((value, Position::start_of(next)));
        }

        let mut offset = pos.offset;
        if current.len() < K / 2 {
            if self.fits_with(current.next, current.len()) {
                self.absorb_next(node);
            } else if self.fits_with(current.prev, current.len()) {
                offset += self.absorb_prev(node);
            }
        }

        // Safety: `node` survived any merge.
        let current = unsafe { node.as_ref() };
        if offset < current.len() {
            return Some((value, Position::new(node, offset)));
        }
        return Some((value, Position::start_of(current.next)));
    }

    fn fits_with(&self, neighbour: Option<NonNull<Node<T, K>>>, len: usize) -> bool {
        let Some(other) = neighbour else {
            return false;
        };
        // Safety: linked neighbours are live.
        let other_len = unsafe { Node::raw_len(other) };
        return other_len + len <= K;
    }

    /// Move the next node's elements onto the end of `node` and free it.
    fn absorb_next(&mut self, node: NonNull<Node<T, K>>) {
        // Safety: caller checked `next` exists and fits; distinct live nodes.
        unsafe {
            let Some(next) = (*node.as_ptr()).next else {
                return;
            };
            (*node.as_ptr()).append(&mut *next.as_ptr());
            self.unlink(next);
            self.free_node(next);
            log::trace!("merged {:p} into {:p}", next, node);
        }
    }

    /// Move the previous node's elements in front of `node` and free it.
    ///
    /// Returns how many elements were moved in.
    fn absorb_prev(&mut self, node: NonNull<Node<T, K>>) -> usize {
        // Safety: caller checked `prev` exists and fits; distinct live nodes.
        unsafe {
            let Some(prev) = (*node.as_ptr()).prev else {
                return 0;
            };
            let moved = Node::raw_len(prev);
            (*node.as_ptr()).prepend(&mut *prev.as_ptr());
            self.unlink(prev);
            self.free_node(prev);
            log::trace!("merged {:p} into {:p}", prev, node);
            return moved;
        }
    }
}
