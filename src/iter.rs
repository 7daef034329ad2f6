//! Borrowing and owning iterators.
//!
//! `Iter` and `IterMut` keep a position at each end plus the number of
//! elements still between them. They only touch nodes through raw pointers,
//! so references already handed out stay valid while the walk continues.

use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;

use crate::cursor::Position;
use crate::list::UnrolledList;
use crate::node::{Link, Node};
use crate::storage::Storage;

/// Forward step without touching the chain itself.
///
/// # Safety
///
/// `pos` must refer to a live element.
#[inline]
unsafe fn step_next<T, const K: usize>(pos: Position<T, K>) -> Position<T, K> {
    let Some(node) = pos.node else {
        return pos;
    };
    unsafe {
        if pos.offset + 1 < Node::raw_len(node) {
            return Position::new(node, pos.offset + 1);
        }
        return Position::start_of(Node::raw_next(node));
    }
}

/// Backward step; stepping back from the head yields the end sentinel.
///
/// # Safety
///
/// `pos` must refer to a live element.
#[inline]
unsafe fn step_prev<T, const K: usize>(pos: Position<T, K>) -> Position<T, K> {
    let Some(node) = pos.node else {
        return pos;
    };
    if pos.offset > 0 {
        return Position::new(node, pos.offset - 1);
    }
    unsafe { last_of(Node::raw_prev(node)) }
}

/// Last element of `node`, or the end sentinel.
///
/// # Safety
///
/// `node`, if any, must be live and nonempty.
#[inline]
pub(crate) unsafe fn last_of<T, const K: usize>(node: Link<T, K>) -> Position<T, K> {
    return match node {
        Some(node) => Position::new(node, unsafe { Node::raw_len(node) } - 1),
        None => Position::END,
    };
}

// ----------------------------------------------------------------------
// Iter
// ----------------------------------------------------------------------

/// Shared iterator returned by [`UnrolledList::iter`].
pub struct Iter<'a, T, const K: usize> {
    front: Position<T, K>,
    back: Position<T, K>,
    remaining: usize,
    _marker: PhantomData<&'a T>,
}

impl<'a, T, const K: usize> Iter<'a, T, K> {
    pub(crate) fn new(head: Link<T, K>, tail: Link<T, K>, len: usize) -> Iter<'a, T, K> {
        return Iter {
            front: Position::start_of(head),
            // Safety: the tail of a borrowed chain is live and nonempty.
            back: unsafe { last_of(tail) },
            remaining: len,
            _marker: PhantomData,
        };
    }
}

impl<'a, T, const K: usize> Iterator for Iter<'a, T, K> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.front.node?;
        self.remaining -= 1;
        // Safety: `remaining > 0` keeps `front` on a live element of the
        // borrowed list.
        unsafe {
            let item = &*Node::raw_slot(node, self.front.offset);
            self.front = step_next(self.front);
            return Some(item);
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        return (self.remaining, Some(self.remaining));
    }
}

impl<'a, T, const K: usize> DoubleEndedIterator for Iter<'a, T, K> {
    fn next_back(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.back.node?;
        self.remaining -= 1;
        // Safety: as in `next`.
        unsafe {
            let item = &*Node::raw_slot(node, self.back.offset);
            self.back = step_prev(self.back);
            return Some(item);
        }
    }
}

impl<T, const K: usize> ExactSizeIterator for Iter<'_, T, K> {}
impl<T, const K: usize> FusedIterator for Iter<'_, T, K> {}

impl<T, const K: usize> Clone for Iter<'_, T, K> {
    fn clone(&self) -> Self {
        return Iter { ..*self };
    }
}

impl<T: fmt::Debug, const K: usize> fmt::Debug for Iter<'_, T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

// Safety: behaves like `&'a [T]`.
unsafe impl<T: Sync, const K: usize> Send for Iter<'_, T, K> {}
unsafe impl<T: Sync, const K: usize> Sync for Iter<'_, T, K> {}

// ----------------------------------------------------------------------
// IterMut
// ----------------------------------------------------------------------

/// Mutable iterator returned by [`UnrolledList::iter_mut`].
pub struct IterMut<'a, T, const K: usize> {
    front: Position<T, K>,
    back: Position<T, K>,
    remaining: usize,
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T, const K: usize> IterMut<'a, T, K> {
    pub(crate) fn new(head: Link<T, K>, tail: Link<T, K>, len: usize) -> IterMut<'a, T, K> {
        return IterMut {
            front: Position::start_of(head),
            // Safety: the tail of a borrowed chain is live and nonempty.
            back: unsafe { last_of(tail) },
            remaining: len,
            _marker: PhantomData,
        };
    }
}

impl<'a, T, const K: usize> Iterator for IterMut<'a, T, K> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<&'a mut T> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.front.node?;
        self.remaining -= 1;
        // Safety: each slot is yielded once; `remaining` stops the two ends
        // from handing out the same element.
        unsafe {
            let item = &mut *Node::raw_slot(node, self.front.offset);
            self.front = step_next(self.front);
            return Some(item);
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        return (self.remaining, Some(self.remaining));
    }
}

impl<'a, T, const K: usize> DoubleEndedIterator for IterMut<'a, T, K> {
    fn next_back(&mut self) -> Option<&'a mut T> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.back.node?;
        self.remaining -= 1;
        // Safety: as in `next`.
        unsafe {
            let item = &mut *Node::raw_slot(node, self.back.offset);
            self.back = step_prev(self.back);
            return Some(item);
        }
    }
}

impl<T, const K: usize> ExactSizeIterator for IterMut<'_, T, K> {}
impl<T, const K: usize> FusedIterator for IterMut<'_, T, K> {}

impl<T, const K: usize> fmt::Debug for IterMut<'_, T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IterMut").field("remaining", &self.remaining).finish()
    }
}

// Safety: behaves like `&'a mut [T]`.
unsafe impl<T: Send, const K: usize> Send for IterMut<'_, T, K> {}
unsafe impl<T: Sync, const K: usize> Sync for IterMut<'_, T, K> {}

// ----------------------------------------------------------------------
// IntoIter
// ----------------------------------------------------------------------

/// Owning iterator returned by [`UnrolledList::into_iter`].
///
/// Elements not yet yielded are dropped with the iterator.
pub struct IntoIter<T, const K: usize, S: Storage> {
    list: UnrolledList<T, K, S>,
}

impl<T, const K: usize, S: Storage> IntoIter<T, K, S> {
    pub(crate) fn new(list: UnrolledList<T, K, S>) -> IntoIter<T, K, S> {
        return IntoIter { list };
    }
}

impl<T, const K: usize, S: Storage> Iterator for IntoIter<T, K, S> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        return self.list.pop_front();
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.list.len();
        return (len, Some(len));
    }
}

impl<T, const K: usize, S: Storage> DoubleEndedIterator for IntoIter<T, K, S> {
    #[inline]
    fn next_back(&mut self) -> Option<T> {
        return self.list.pop_back();
    }
}

impl<T, const K: usize, S: Storage> ExactSizeIterator for IntoIter<T, K, S> {}
impl<T, const K: usize, S: Storage> FusedIterator for IntoIter<T, K, S> {}

impl<T: fmt::Debug, const K: usize, S: Storage> fmt::Debug for IntoIter<T, K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntoIter").field(&self.list).finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::UnrolledList;

    #[test]
    fn meets_in_the_middle() {
        let list: UnrolledList<u32, 3> = (0..10).collect();
        let mut iter = list.iter();
        assert_eq!(iter.len(), 10);
        assert_eq!(iter.next(), Some(&0));
        assert_eq!(iter.next_back(), Some(&9));
        let middle: Vec<u32> = iter.by_ref().copied().collect();
        assert_eq!(middle, (1..9).collect::<Vec<_>>());
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next_back(), None);
    }

    #[test]
    fn alternating_ends_yield_each_once() {
        let list: UnrolledList<u32, 2> = (0..7).collect();
        let mut iter = list.iter();
        let mut seen = Vec::new();
        loop {
            match iter.next() {
                Some(v) => seen.push(*v),
                None => break,
            }
            match iter.next_back() {
                Some(v) => seen.push(*v),
                None => break,
            }
        }
        assert_eq!(seen, vec![0, 6, 1, 5, 2, 4, 3]);
    }

    #[test]
    fn iter_mut_updates_in_place() {
        let mut list: UnrolledList<u32, 4> = (1..=9).collect();
        for v in list.iter_mut().rev() {
            *v *= 10;
        }
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), (1..=9).map(|v| v * 10).collect::<Vec<_>>());
    }

    #[test]
    fn into_iter_from_both_ends() {
        let list: UnrolledList<String, 2> = ["a", "b", "c", "d", "e"].into_iter().map(String::from).collect();
        let mut iter = list.into_iter();
        assert_eq!(iter.next_back().as_deref(), Some("e"));
        assert_eq!(iter.next().as_deref(), Some("a"));
        assert_eq!(iter.len(), 3);
        let rest: Vec<String> = iter.collect();
        assert_eq!(rest, ["b", "c", "d"]);
    }

    #[test]
    fn empty_list_iterates_nothing() {
        let mut list: UnrolledList<u32, 3> = UnrolledList::new();
        assert_eq!(list.iter().next(), None);
        assert_eq!(list.iter().next_back(), None);
        assert_eq!(list.iter_mut().next(), None);
        assert_eq!(list.into_iter().next(), None);
    }
}
