//! The public list type.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter;
use std::mem;
use std::ops::{Index, IndexMut};

use smallvec::SmallVec;

use crate::chain::Chain;
use crate::cursor::{Cursor, CursorMut, Position};
use crate::error::{AllocError, Error, InsertError, alloc_failed};
use crate::iter::{IntoIter, Iter, IterMut, last_of};
use crate::node::Node;
use crate::storage::{Global, Storage};

/// A sequence stored as a doubly-linked chain of nodes, each holding up to
/// `K` elements inline.
///
/// Inserting into a full node splits it in two; removing from a node that
/// drops under half full merges it with a neighbour when the two fit in one
/// node. Positions are reached by walking nodes, so indexed access costs
/// `O(len / K)` while edits at a cursor cost `O(K)`.
///
/// Nodes and split scratch space come from the storage strategy `S`.
pub struct UnrolledList<T, const K: usize = 10, S: Storage = Global> {
    chain: Chain<T, K, S>,
}

// Safety: the list owns its nodes and elements outright, like `LinkedList`.
unsafe impl<T: Send, const K: usize, S: Storage + Send> Send for UnrolledList<T, K, S> {}
unsafe impl<T: Sync, const K: usize, S: Storage + Sync> Sync for UnrolledList<T, K, S> {}

impl<T, const K: usize> UnrolledList<T, K, Global> {
    /// An empty list on the global allocator. Does not allocate.
    pub const fn new() -> Self {
        return UnrolledList::new_in(Global);
    }

    /// A list of `count` clones of `value`.
    pub fn from_elem(count: usize, value: T) -> Self
    where
        T: Clone,
    {
        return UnrolledList::from_elem_in(count, value, Global);
    }
}

impl<T, const K: usize, S: Storage> UnrolledList<T, K, S> {
    /// Elements the first node keeps when a full node splits.
    pub const SPLIT_AT: usize = Chain::<T, K, S>::SPLIT_AT;

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// An empty list drawing nodes from `storage`. Does not allocate.
    pub const fn new_in(storage: S) -> Self {
        return UnrolledList { chain: Chain::new_in(storage) };
    }

    pub fn from_elem_in(count: usize, value: T, storage: S) -> Self
    where
        T: Clone,
    {
        return UnrolledList::from_iter_in(iter::repeat_n(value, count), storage);
    }

    /// Collect `values` into a list drawing from `storage`.
    ///
    /// If the iterator panics, the elements gathered so far are dropped and
    /// every node is returned to storage before the panic continues.
    pub fn from_iter_in<I: IntoIterator<Item = T>>(values: I, storage: S) -> Self {
        let mut list = UnrolledList::new_in(storage);
        list.extend(values);
        return list;
    }

    /// Like [`UnrolledList::from_iter_in`], but reports allocation failure.
    ///
    /// # Errors
    ///
    /// [`Error::Alloc`] if storage refuses a node; the partial list and the
    /// rejected element are dropped.
    pub fn try_from_iter_in<I: IntoIterator<Item = T>>(values: I, storage: S) -> Result<Self, Error> {
        let mut list = UnrolledList::new_in(storage);
        for value in values {
            list.try_push_back(value).map_err(|err| err.alloc_error())?;
        }
        return Ok(list);
    }

    /// Clone the elements into a new list drawing from `storage`.
    pub fn clone_in(&self, storage: S) -> Self
    where
        T: Clone,
    {
        return UnrolledList::from_iter_in(self.iter().cloned(), storage);
    }

    /// Replace the contents with `values`.
    ///
    /// The list is cleared first; if the iterator or an allocation fails
    /// part way, the list holds whatever was appended before the failure.
    pub fn assign<I: IntoIterator<Item = T>>(&mut self, values: I) {
        self.clear();
        self.extend(values);
    }

    /// Exchange contents, storage included, with `other`.
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(&mut self.chain, &mut other.chain);
    }

    pub fn storage(&self) -> &S {
        return &self.chain.storage;
    }

    // ------------------------------------------------------------------
    // Capacity
    // ------------------------------------------------------------------

    #[inline]
    pub fn len(&self) -> usize {
        return self.chain.len;
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.chain.len == 0;
    }

    /// Upper bound on the number of elements, from the node size.
    pub fn max_len(&self) -> usize {
        let nodes = isize::MAX as usize / mem::size_of::<Node<T, K>>();
        return nodes.saturating_mul(K).min(isize::MAX as usize);
    }

    pub fn node_count(&self) -> usize {
        return self.chain.nodes().count();
    }

    /// Element count of each node, front to back.
    pub fn node_lens(&self) -> SmallVec<[usize; 8]> {
        return self.chain.node_lens();
    }

    /// Check the structural invariants.
    ///
    /// # Errors
    ///
    /// [`Error::Corrupt`] naming the first invariant that does not hold.
    pub fn validate(&self) -> Result<(), Error> {
        return self.chain.validate();
    }

    // ------------------------------------------------------------------
    // Access
    // ------------------------------------------------------------------

    pub fn front(&self) -> Option<&T> {
        let head = self.chain.head?;
        // Safety: linked nodes are live while the list is borrowed.
        return unsafe { head.as_ref() }.as_slice().first();
    }

    pub fn front_mut(&mut self) -> Option<&mut T> {
        let mut head = self.chain.head?;
        // Safety: exclusive borrow of the list.
        return unsafe { head.as_mut() }.as_mut_slice().first_mut();
    }

    pub fn back(&self) -> Option<&T> {
        let tail = self.chain.tail?;
        // Safety: linked nodes are live while the list is borrowed.
        return unsafe { tail.as_ref() }.as_slice().last();
    }

    pub fn back_mut(&mut self) -> Option<&mut T> {
        let mut tail = self.chain.tail?;
        // Safety: exclusive borrow of the list.
        return unsafe { tail.as_mut() }.as_mut_slice().last_mut();
    }

    /// The element at `index`, or `None` if out of range. `O(len / K)`.
    pub fn get(&self, index: usize) -> Option<&T> {
        let pos = self.chain.locate(index);
        let node = pos.node?;
        // Safety: `locate` only returns positions of live elements.
        return Some(unsafe { &*Node::raw_slot(node, pos.offset) });
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        let pos = self.chain.locate(index);
        let node = pos.node?;
        // Safety: as in `get`, with an exclusive borrow.
        return Some(unsafe { &mut *Node::raw_slot(node, pos.offset) });
    }

    /// Bounds-checked access.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] if `index >= len`.
    pub fn at(&self, index: usize) -> Result<&T, Error> {
        let len = self.len();
        return self.get(index).ok_or(Error::OutOfRange { index, len });
    }

    /// Bounds-checked mutable access.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] if `index >= len`.
    pub fn at_mut(&mut self, index: usize) -> Result<&mut T, Error> {
        let len = self.len();
        return self.get_mut(index).ok_or(Error::OutOfRange { index, len });
    }

    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        return self.iter().any(|v| v == value);
    }

    // ------------------------------------------------------------------
    // Iteration and cursors
    // ------------------------------------------------------------------

    pub fn iter(&self) -> Iter<'_, T, K> {
        return Iter::new(self.chain.head, self.chain.tail, self.chain.len);
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, T, K> {
        return IterMut::new(self.chain.head, self.chain.tail, self.chain.len);
    }

    /// Cursor on the first element (the end sentinel if empty).
    pub fn cursor_front(&self) -> Cursor<'_, T, K, S> {
        return Cursor::new(&self.chain, Position::start_of(self.chain.head));
    }

    /// Cursor on the last element (the end sentinel if empty).
    pub fn cursor_back(&self) -> Cursor<'_, T, K, S> {
        // Safety: the tail is live and nonempty.
        let pos = unsafe { last_of(self.chain.tail) };
        return Cursor::new(&self.chain, pos);
    }

    pub fn cursor_end(&self) -> Cursor<'_, T, K, S> {
        return Cursor::new(&self.chain, Position::END);
    }

    /// Cursor on the element at `index`; `index == len` gives the end
    /// sentinel and anything larger gives `None`.
    pub fn cursor_at(&self, index: usize) -> Option<Cursor<'_, T, K, S>> {
        if index > self.len() {
            return None;
        }
        return Some(Cursor::new(&self.chain, self.chain.locate(index)));
    }

    pub fn cursor_front_mut(&mut self) -> CursorMut<'_, T, K, S> {
        let pos = Position::start_of(self.chain.head);
        return CursorMut::new(&mut self.chain, pos);
    }

    pub fn cursor_back_mut(&mut self) -> CursorMut<'_, T, K, S> {
        // Safety: the tail is live and nonempty.
        let pos = unsafe { last_of(self.chain.tail) };
        return CursorMut::new(&mut self.chain, pos);
    }

    pub fn cursor_end_mut(&mut self) -> CursorMut<'_, T, K, S> {
        return CursorMut::new(&mut self.chain, Position::END);
    }

    pub fn cursor_at_mut(&mut self, index: usize) -> Option<CursorMut<'_, T, K, S>> {
        if index > self.len() {
            return None;
        }
        let pos = self.chain.locate(index);
        return Some(CursorMut::new(&mut self.chain, pos));
    }

    // ------------------------------------------------------------------
    // Both ends
    // ------------------------------------------------------------------

    pub fn push_front(&mut self, value: T) {
        if let Err(err) = self.try_push_front(value) {
            alloc_failed(err.alloc_error());
        }
    }

    /// # Errors
    ///
    /// On allocation failure the list is unchanged and the value is
    /// handed back.
    pub fn try_push_front(&mut self, value: T) -> Result<(), InsertError<T>> {
        self.chain.push_front_with(move || value).map_err(InsertError::reclaim)?;
        return Ok(());
    }

    /// Push the value produced by `produce`, which runs after any needed
    /// allocation. A panicking producer leaves the list unchanged.
    pub fn push_front_with<F: FnOnce() -> T>(&mut self, produce: F) {
        if let Err(err) = self.try_push_front_with(produce) {
            alloc_failed(err);
        }
    }

    /// # Errors
    ///
    /// On allocation failure the list is unchanged and `produce` is
    /// dropped without being called.
    pub fn try_push_front_with<F: FnOnce() -> T>(&mut self, produce: F) -> Result<(), AllocError> {
        self.chain.push_front_with(produce).map_err(|(_, err)| err)?;
        return Ok(());
    }

    pub fn push_back(&mut self, value: T) {
        if let Err(err) = self.try_push_back(value) {
            alloc_failed(err.alloc_error());
        }
    }

    /// # Errors
    ///
    /// On allocation failure the list is unchanged and the value is
    /// handed back.
    pub fn try_push_back(&mut self, value: T) -> Result<(), InsertError<T>> {
        self.chain.push_back_with(move || value).map_err(InsertError::reclaim)?;
        return Ok(());
    }

    pub fn push_back_with<F: FnOnce() -> T>(&mut self, produce: F) {
        if let Err(err) = self.try_push_back_with(produce) {
            alloc_failed(err);
        }
    }

    /// # Errors
    ///
    /// On allocation failure the list is unchanged and `produce` is
    /// dropped without being called.
    pub fn try_push_back_with<F: FnOnce() -> T>(&mut self, produce: F) -> Result<(), AllocError> {
        self.chain.push_back_with(produce).map_err(|(_, err)| err)?;
        return Ok(());
    }

    pub fn pop_front(&mut self) -> Option<T> {
        return self.chain.pop_front();
    }

    pub fn pop_back(&mut self) -> Option<T> {
        return self.chain.pop_back();
    }

    // ------------------------------------------------------------------
    // By index
    // ------------------------------------------------------------------

    /// Insert `value` so that it ends up at `index`.
    ///
    /// # Panics
    ///
    /// If `index > len`.
    pub fn insert(&mut self, index: usize, value: T) {
        if let Err(err) = self.try_insert(index, value) {
            alloc_failed(err.alloc_error());
        }
    }

    /// # Errors
    ///
    /// On allocation failure the list is unchanged and the value is
    /// handed back.
    ///
    /// # Panics
    ///
    /// If `index > len`.
    pub fn try_insert(&mut self, index: usize, value: T) -> Result<(), InsertError<T>> {
        let len = self.len();
        assert!(index <= len, "insertion index (is {index}) should be <= len (is {len})");
        let pos = self.chain.locate(index);
        self.chain.insert_with(pos, move || value).map_err(InsertError::reclaim)?;
        return Ok(());
    }

    /// Remove and return the element at `index`, or `None` if out of range.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        let pos = self.chain.locate(index);
        let (value, _) = self.chain.erase(pos)?;
        return Some(value);
    }

    /// Drop every element and return every node to storage.
    pub fn clear(&mut self) {
        self.chain.clear();
    }
}

// ----------------------------------------------------------------------
// Trait impls
// ----------------------------------------------------------------------

impl<T, const K: usize, S: Storage + Default> Default for UnrolledList<T, K, S> {
    fn default() -> Self {
        return UnrolledList::new_in(S::default());
    }
}

impl<T: Clone, const K: usize, S: Storage> Clone for UnrolledList<T, K, S> {
    fn clone(&self) -> Self {
        return self.clone_in(self.chain.storage.clone());
    }

    /// Builds the copy on the side, so a panicking `Clone` leaves `self`
    /// as it was.
    fn clone_from(&mut self, source: &Self) {
        let mut fresh = source.clone_in(self.chain.storage.clone());
        self.swap(&mut fresh);
    }
}

impl<T: fmt::Debug, const K: usize, S: Storage> fmt::Debug for UnrolledList<T, K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T, U, const K: usize, const K2: usize, S: Storage, S2: Storage> PartialEq<UnrolledList<U, K2, S2>> for UnrolledList<T, K, S>
where
    T: PartialEq<U>,
{
    fn eq(&self, other: &UnrolledList<U, K2, S2>) -> bool {
        return self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b);
    }
}

impl<T: Eq, const K: usize, S: Storage> Eq for UnrolledList<T, K, S> {}

impl<T: Hash, const K: usize, S: Storage> Hash for UnrolledList<T, K, S> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        for value in self {
            value.hash(state);
        }
    }
}

impl<T, const K: usize, S: Storage> Index<usize> for UnrolledList<T, K, S> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        let len = self.len();
        match self.get(index) {
            Some(value) => value,
            None => panic!("index {index} is out of range for a list of length {len}"),
        }
    }
}

impl<T, const K: usize, S: Storage> IndexMut<usize> for UnrolledList<T, K, S> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        let len = self.len();
        match self.get_mut(index) {
            Some(value) => value,
            None => panic!("index {index} is out of range for a list of length {len}"),
        }
    }
}

impl<T, const K: usize, S: Storage> Extend<T> for UnrolledList<T, K, S> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, values: I) {
        for value in values {
            self.push_back(value);
        }
    }
}

impl<'a, T: Copy + 'a, const K: usize, S: Storage> Extend<&'a T> for UnrolledList<T, K, S> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, values: I) {
        self.extend(values.into_iter().copied());
    }
}

impl<T, const K: usize, S: Storage + Default> FromIterator<T> for UnrolledList<T, K, S> {
    fn from_iter<I: IntoIterator<Item = T>>(values: I) -> Self {
        return UnrolledList::from_iter_in(values, S::default());
    }
}

impl<T, const N: usize, const K: usize, S: Storage + Default> From<[T; N]> for UnrolledList<T, K, S> {
    fn from(values: [T; N]) -> Self {
        return UnrolledList::from_iter_in(values, S::default());
    }
}

impl<T, const K: usize, S: Storage> IntoIterator for UnrolledList<T, K, S> {
    type Item = T;
    type IntoIter = IntoIter<T, K, S>;

    fn into_iter(self) -> IntoIter<T, K, S> {
        return IntoIter::new(self);
    }
}

impl<'a, T, const K: usize, S: Storage> IntoIterator for &'a UnrolledList<T, K, S> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T, K>;

    fn into_iter(self) -> Iter<'a, T, K> {
        return self.iter();
    }
}

impl<'a, T, const K: usize, S: Storage> IntoIterator for &'a mut UnrolledList<T, K, S> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T, K>;

    fn into_iter(self) -> IterMut<'a, T, K> {
        return self.iter_mut();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_does_not_allocate() {
        let list: UnrolledList<String> = UnrolledList::new();
        assert!(list.is_empty());
        assert_eq!(list.node_count(), 0);
        assert_eq!(list.front(), None);
        assert_eq!(list.back(), None);
    }

    #[test]
    fn default_capacity_is_ten() {
        let list: UnrolledList<u8> = (0..25).collect();
        assert_eq!(list.node_lens().as_slice(), &[10, 10, 5]);
        assert_eq!(UnrolledList::<u8>::SPLIT_AT, 6);
    }

    #[test]
    fn index_access_across_nodes() {
        let mut list: UnrolledList<u32, 3> = (0..10).collect();
        for i in 0..10 {
            assert_eq!(list[i], i as u32);
        }
        list[7] = 70;
        *list.get_mut(0).unwrap() = 100;
        assert_eq!(list.get(7), Some(&70));
        assert_eq!(list.front(), Some(&100));
        assert_eq!(list.back(), Some(&9));
        assert_eq!(list.get(10), None);
    }

    #[test]
    fn at_reports_out_of_range() {
        let mut list: UnrolledList<u32, 3> = UnrolledList::from([1, 2]);
        assert_eq!(list.at(1), Ok(&2));
        assert_eq!(list.at(2), Err(Error::OutOfRange { index: 2, len: 2 }));
        assert_eq!(list.at_mut(5), Err(Error::OutOfRange { index: 5, len: 2 }));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn index_panics_past_end() {
        let list: UnrolledList<u32, 3> = UnrolledList::from([1]);
        let _ = list[1];
    }

    #[test]
    fn insert_and_remove_by_index() {
        let mut list: UnrolledList<u32, 2> = UnrolledList::new();
        list.insert(0, 2);
        list.insert(0, 0);
        list.insert(1, 1);
        list.insert(3, 3);
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert_eq!(list.remove(1), Some(1));
        assert_eq!(list.remove(9), None);
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), vec![0, 2, 3]);
        assert_eq!(list.validate(), Ok(()));
    }

    #[test]
    fn equality_ignores_layout() {
        let a: UnrolledList<u32, 2> = (0..9).collect();
        let b: UnrolledList<u32, 7> = (0..9).collect();
        let c: UnrolledList<u32, 7> = (0..8).collect();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a.node_lens(), b.node_lens());
    }

    #[test]
    fn max_len_is_bounded() {
        let list: UnrolledList<u64, 16> = UnrolledList::new();
        assert!(list.max_len() > 0);
        assert!(list.max_len() <= isize::MAX as usize);
    }

    #[test]
    fn contains_searches_every_node() {
        let list: UnrolledList<u32, 3> = (0..10).collect();
        assert!(list.contains(&0));
        assert!(list.contains(&5));
        assert!(list.contains(&9));
        assert!(!list.contains(&10));
        assert!(!UnrolledList::<u32, 3>::new().contains(&0));
    }

    #[test]
    fn hash_follows_elements_not_layout() {
        use rustc_hash::FxHasher;

        fn hash_of<const K: usize>(list: &UnrolledList<u32, K>) -> u64 {
            let mut hasher = FxHasher::default();
            list.hash(&mut hasher);
            return hasher.finish();
        }

        let a: UnrolledList<u32, 2> = (0..9).collect();
        let b: UnrolledList<u32, 7> = (0..9).collect();
        let c: UnrolledList<u32, 2> = (0..8).collect();
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_ne!(hash_of(&a), hash_of(&c));
    }

    #[test]
    fn extend_from_references_copies() {
        let source = [4u32, 5, 6];
        let mut list: UnrolledList<u32, 2> = UnrolledList::from([1, 2, 3]);
        list.extend(&source);
        list.extend(source.iter().rev());
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6, 6, 5, 4]);
        assert_eq!(source, [4, 5, 6]);
        assert_eq!(list.validate(), Ok(()));
    }

    #[test]
    fn debug_lists_elements() {
        let list: UnrolledList<u32, 2> = UnrolledList::from([1, 2, 3]);
        assert_eq!(format!("{list:?}"), "[1, 2, 3]");
    }
}
