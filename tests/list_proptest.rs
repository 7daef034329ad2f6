//! Model-based property tests against `VecDeque`.

mod common;

use std::collections::VecDeque;

use proptest::prelude::*;
use unrolled::UnrolledList;

// =============================================================================
// Test helpers
// =============================================================================

#[derive(Clone, Debug)]
enum Op {
    PushFront(u16),
    PushBack(u16),
    PopFront,
    PopBack,
    /// Insert before the element at `pos_pct` of the current length.
    Insert { pos_pct: f64, value: u16 },
    /// Remove the element at `pos_pct` of the current length.
    Remove { pos_pct: f64 },
    /// Remove a run of up to `count` elements through a cursor.
    RemoveRun { pos_pct: f64, count: usize },
}

fn arbitrary_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<u16>().prop_map(Op::PushFront),
        any::<u16>().prop_map(Op::PushBack),
        Just(Op::PopFront),
        Just(Op::PopBack),
        (0.0..=1.0f64, any::<u16>()).prop_map(|(pos_pct, value)| Op::Insert { pos_pct, value }),
        (0.0..=1.0f64).prop_map(|pos_pct| Op::Remove { pos_pct }),
        (0.0..=1.0f64, 0..6usize).prop_map(|(pos_pct, count)| Op::RemoveRun { pos_pct, count }),
    ]
}

fn scaled(pos_pct: f64, len: usize) -> usize {
    return ((pos_pct * len as f64) as usize).min(len);
}

fn apply<const K: usize>(list: &mut UnrolledList<u16, K>, model: &mut VecDeque<u16>, op: &Op) {
    match op {
        Op::PushFront(v) => {
            list.push_front(*v);
            model.push_front(*v);
        }
        Op::PushBack(v) => {
            list.push_back(*v);
            model.push_back(*v);
        }
        Op::PopFront => assert_eq!(list.pop_front(), model.pop_front()),
        Op::PopBack => assert_eq!(list.pop_back(), model.pop_back()),
        Op::Insert { pos_pct, value } => {
            let index = scaled(*pos_pct, model.len());
            let mut cursor = list.cursor_at_mut(index).unwrap();
            cursor.insert(*value);
            assert_eq!(cursor.current(), Some(&mut value.clone()));
            model.insert(index, *value);
        }
        Op::Remove { pos_pct } => {
            let index = scaled(*pos_pct, model.len());
            assert_eq!(list.remove(index), model.remove(index));
        }
        Op::RemoveRun { pos_pct, count } => {
            let start = scaled(*pos_pct, model.len());
            let end = (start + count).min(model.len());
            let last = list.cursor_at(end).unwrap().position();
            let mut cursor = list.cursor_at_mut(start).unwrap();
            assert_eq!(cursor.remove_until(last), Ok(end - start));
            assert_eq!(cursor.current().copied(), model.get(end).copied());
            model.drain(start..end).for_each(drop);
        }
    }
}

fn check<const K: usize>(list: &UnrolledList<u16, K>, model: &VecDeque<u16>) -> Result<(), TestCaseError> {
    prop_assert_eq!(list.validate(), Ok(()));
    prop_assert_eq!(list.len(), model.len());
    prop_assert!(list.node_lens().iter().all(|&n| (1..=K).contains(&n)));
    prop_assert!(list.iter().eq(model.iter()));
    prop_assert!(list.iter().rev().eq(model.iter().rev()));
    return Ok(());
}

// =============================================================================
// Model equivalence
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every operation sequence matches VecDeque and keeps node counts in range.
    #[test]
    fn matches_vecdeque_k4(ops in prop::collection::vec(arbitrary_op(), 1..120)) {
        common::init_logging();
        let mut list: UnrolledList<u16, 4> = UnrolledList::new();
        let mut model = VecDeque::new();
        for op in &ops {
            apply(&mut list, &mut model, op);
            check(&list, &model)?;
        }
    }

    /// Odd capacity exercises the uneven split.
    #[test]
    fn matches_vecdeque_k5(ops in prop::collection::vec(arbitrary_op(), 1..120)) {
        let mut list: UnrolledList<u16, 5> = UnrolledList::new();
        let mut model = VecDeque::new();
        for op in &ops {
            apply(&mut list, &mut model, op);
            check(&list, &model)?;
        }
    }

    /// Capacity one: every node holds a single element.
    #[test]
    fn matches_vecdeque_k1(ops in prop::collection::vec(arbitrary_op(), 1..60)) {
        let mut list: UnrolledList<u16, 1> = UnrolledList::new();
        let mut model = VecDeque::new();
        for op in &ops {
            apply(&mut list, &mut model, op);
            check(&list, &model)?;
        }
        prop_assert_eq!(list.node_count(), model.len());
    }

    /// Inserting and then erasing at the same index restores the sequence.
    #[test]
    fn insert_then_remove_restores(
        values in prop::collection::vec(any::<u16>(), 0..60),
        pos_pct in 0.0..=1.0f64,
        value in any::<u16>(),
    ) {
        let mut list: UnrolledList<u16, 3> = values.iter().copied().collect();
        let index = scaled(pos_pct, values.len());
        list.insert(index, value);
        prop_assert_eq!(list.get(index), Some(&value));
        prop_assert_eq!(list.remove(index), Some(value));
        prop_assert!(list.iter().eq(values.iter()));
        prop_assert_eq!(list.validate(), Ok(()));
    }
}
