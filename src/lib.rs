//! Unrolled - an unrolled doubly-linked list.
//!
//! Elements live in fixed-capacity nodes of `K` slots that are linked into a
//! chain. Full nodes split on insert; sparse nodes merge with a neighbour on
//! erase. Every node on the chain holds between 1 and `K` elements.
//!
//! # Quick Start
//!
//! ```
//! use unrolled::UnrolledList;
//!
//! let mut list: UnrolledList<u32, 4> = (1..=6).collect();
//! assert_eq!(list.node_lens().as_slice(), &[4, 2]);
//!
//! // Insert 30 before the element at index 2.
//! let mut cursor = list.cursor_at_mut(2).unwrap();
//! cursor.insert(30);
//! assert_eq!(cursor.current(), Some(&mut 30));
//!
//! list.push_front(0);
//! assert_eq!(list.iter().copied().collect::<Vec<_>>(), [0, 1, 2, 30, 3, 4, 5, 6]);
//! assert!(list.validate().is_ok());
//! ```
//!
//! # Failure behaviour
//!
//! Inserts and pushes either complete or leave the list exactly as it was:
//! allocation failure is reported through the `try_*` methods (handing the
//! value back), and a panicking value producer unwinds through guards that
//! restore the node and release whatever was allocated. Removals never fail.

mod chain;
mod engine;
mod node;

pub mod cursor;
pub mod error;
pub mod iter;
pub mod list;
pub mod storage;

pub use cursor::{Cursor, CursorMut, Position};
pub use error::{AllocError, Error, InsertError};
pub use iter::{IntoIter, Iter, IterMut};
pub use list::UnrolledList;
pub use storage::{Global, Shape, Storage};
