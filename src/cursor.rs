//! Cursors over an [`UnrolledList`](crate::UnrolledList).
//!
//! A cursor sits on one element, identified by the node holding it and the
//! offset inside that node, or on the end sentinel ("one past the last
//! element"). The end sentinel sits between the back and the front:
//!
//! ```text
//!   end -> [a b c] <-> [d e] <-> [f] -> end
//!  move_prev from end lands on f; move_prev from a lands on end.
//!  move_next from f lands on end; move_next from end stays there.
//! ```
//!
//! [`Position`] is a copyable snapshot of where a cursor is. Positions
//! compare structurally (same node, same offset) and are never dereferenced
//! on their own, so holding a stale one is harmless.

use std::fmt;
use std::iter;
use std::ptr::NonNull;

use crate::chain::Chain;
use crate::error::{AllocError, Error, InsertError, alloc_failed};
use crate::node::{Link, Node};
use crate::storage::Storage;

/// Where a cursor points: a node and an offset within it, or the end.
pub struct Position<T, const K: usize> {
    pub(crate) node: Link<T, K>,
    pub(crate) offset: usize,
}

impl<T, const K: usize> Position<T, K> {
    /// The end sentinel.
    pub const END: Position<T, K> = Position { node: None, offset: 0 };

    #[inline]
    pub(crate) fn new(node: NonNull<Node<T, K>>, offset: usize) -> Position<T, K> {
        return Position { node: Some(node), offset };
    }

    /// First element of `node`, or the end sentinel.
    #[inline]
    pub(crate) fn start_of(node: Link<T, K>) -> Position<T, K> {
        return Position { node, offset: 0 };
    }

    /// Whether this is the end sentinel.
    #[inline]
    pub fn is_end(&self) -> bool {
        return self.node.is_none();
    }

    /// Offset of the element inside its node.
    #[inline]
    pub fn offset(&self) -> usize {
        return self.offset;
    }
}

impl<T, const K: usize> Clone for Position<T, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, const K: usize> Copy for Position<T, K> {}

impl<T, const K: usize> PartialEq for Position<T, K> {
    fn eq(&self, other: &Self) -> bool {
        return self.node == other.node && self.offset == other.offset;
    }
}

impl<T, const K: usize> Eq for Position<T, K> {}

impl<T, const K: usize> fmt::Debug for Position<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node {
            Some(node) => write!(f, "Position({:p}, {})", node, self.offset),
            None => f.write_str("Position(end)"),
        }
    }
}

/// A read-only cursor.
pub struct Cursor<'a, T, const K: usize, S: Storage> {
    pos: Position<T, K>,
    chain: &'a Chain<T, K, S>,
}

impl<'a, T, const K: usize, S: Storage> Cursor<'a, T, K, S> {
    pub(crate) fn new(chain: &'a Chain<T, K, S>, pos: Position<T, K>) -> Cursor<'a, T, K, S> {
        return Cursor { pos, chain };
    }

    /// The element under the cursor, or `None` at the end sentinel.
    pub fn current(&self) -> Option<&'a T> {
        let node = self.pos.node?;
        // Safety: the chain is borrowed for 'a and the position is kept valid.
        return Some(unsafe { &*Node::raw_slot(node, self.pos.offset) });
    }

    pub fn move_next(&mut self) {
        self.pos = self.chain.advance(self.pos);
    }

    pub fn move_prev(&mut self) {
        self.pos = self.chain.retreat(self.pos);
    }

    pub fn position(&self) -> Position<T, K> {
        return self.pos;
    }

    pub fn is_end(&self) -> bool {
        return self.pos.is_end();
    }
}

impl<T, const K: usize, S: Storage> Clone for Cursor<'_, T, K, S> {
    fn clone(&self) -> Self {
        return Cursor { pos: self.pos, chain: self.chain };
    }
}

impl<T: fmt::Debug, const K: usize, S: Storage> fmt::Debug for Cursor<'_, T, K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cursor").field(&self.current()).finish()
    }
}

/// A cursor that can edit the list.
///
/// Inserting places the new element *before* the cursor and leaves the
/// cursor on it. Removing leaves the cursor on the element that followed
/// the removed one.
pub struct CursorMut<'a, T, const K: usize, S: Storage> {
    pos: Position<T, K>,
    chain: &'a mut Chain<T, K, S>,
}

impl<'a, T, const K: usize, S: Storage> CursorMut<'a, T, K, S> {
    pub(crate) fn new(chain: &'a mut Chain<T, K, S>, pos: Position<T, K>) -> CursorMut<'a, T, K, S> {
        return CursorMut { pos, chain };
    }

    pub fn current(&mut self) -> Option<&mut T> {
        let node = self.pos.node?;
        // Safety: exclusive borrow of the chain; the position is kept valid.
        return Some(unsafe { &mut *Node::raw_slot(node, self.pos.offset) });
    }

    pub fn move_next(&mut self) {
        self.pos = self.chain.advance(self.pos);
    }

    pub fn move_prev(&mut self) {
        self.pos = self.chain.retreat(self.pos);
    }

    pub fn position(&self) -> Position<T, K> {
        return self.pos;
    }

    pub fn is_end(&self) -> bool {
        return self.pos.is_end();
    }

    /// A read-only view at the same position.
    pub fn as_cursor(&self) -> Cursor<'_, T, K, S> {
        return Cursor::new(&*self.chain, self.pos);
    }

    // ------------------------------------------------------------------
    // Insertion
    // ------------------------------------------------------------------

    /// Insert `value` before the cursor and move onto it.
    ///
    /// Aborts through [`std::alloc::handle_alloc_error`] if storage fails;
    /// use [`CursorMut::try_insert`] to recover instead.
    pub fn insert(&mut self, value: T) {
        if let Err(err) = self.try_insert(value) {
            alloc_failed(err.alloc_error());
        }
    }

    /// Insert `value` before the cursor and move onto it.
    ///
    /// # Errors
    ///
    /// On allocation failure the list and the cursor are unchanged and the
    /// value is handed back.
    pub fn try_insert(&mut self, value: T) -> Result<(), InsertError<T>> {
        self.pos = self.chain.insert_with(self.pos, move || value).map_err(InsertError::reclaim)?;
        return Ok(());
    }

    /// Insert the value produced by `produce` before the cursor.
    ///
    /// `produce` runs after any node allocation the insert needs. If it
    /// panics, the list is restored before the panic propagates.
    pub fn insert_with<F: FnOnce() -> T>(&mut self, produce: F) {
        if let Err(err) = self.try_insert_with(produce) {
            alloc_failed(err);
        }
    }

    /// Fallible form of [`CursorMut::insert_with`]; `produce` is dropped
    /// uncalled on allocation failure.
    pub fn try_insert_with<F: FnOnce() -> T>(&mut self, produce: F) -> Result<(), AllocError> {
        self.pos = self.chain.insert_with(self.pos, produce).map_err(|(_, err)| err)?;
        return Ok(());
    }

    /// Insert `count` clones of `value` before the cursor.
    ///
    /// The cursor ends on the element it started on (or the end sentinel).
    pub fn insert_n(&mut self, count: usize, value: T)
    where
        T: Clone,
    {
        self.insert_iter(iter::repeat_n(value, count));
    }

    /// Insert every value of `values`, in order, before the cursor.
    ///
    /// Each element is inserted on its own; a failure part way leaves the
    /// earlier elements in place.
    pub fn insert_iter<I: IntoIterator<Item = T>>(&mut self, values: I) {
        for value in values {
            self.insert(value);
            self.move_next();
        }
    }

    // ------------------------------------------------------------------
    // Removal
    // ------------------------------------------------------------------

    /// Remove the element under the cursor, moving onto its successor.
    ///
    /// Returns `None` (and does nothing) at the end sentinel.
    pub fn remove_current(&mut self) -> Option<T> {
        let (value, next) = self.chain.erase(self.pos)?;
        self.pos = next;
        return Some(value);
    }

    /// Remove elements from the cursor up to, not including, `last`.
    ///
    /// Returns how many elements were removed. The cursor ends on what
    /// `last` referred to.
    ///
    /// # Errors
    ///
    /// [`Error::Unreachable`] if `last` cannot be reached by moving forward
    /// from the cursor; nothing is removed.
    pub fn remove_until(&mut self, last: Position<T, K>) -> Result<usize, Error> {
        let mut probe = self.pos;
        let mut count = 0usize;
        while probe != last {
            if probe.is_end() {
                return Err(Error::Unreachable);
            }
            probe = self.chain.advance(probe);
            count += 1;
        }

        for _ in 0..count {
            self.remove_current();
        }
        return Ok(count);
    }
}

impl<T: fmt::Debug, const K: usize, S: Storage> fmt::Debug for CursorMut<'_, T, K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CursorMut").field(&self.as_cursor().current()).finish()
    }
}
