//! Error types.
//!
//! Three failure families exist:
//!
//! - [`Error::OutOfRange`] - an index was not less than the list length.
//! - [`AllocError`] - the storage strategy could not satisfy a request.
//!   Value-taking `try_*` operations wrap it in [`InsertError`], which hands
//!   the rejected value back.
//! - Panics raised by user code (a producer closure, `Clone`, a source
//!   iterator). These are not represented here; mutating operations restore
//!   their pre-call state before the panic continues unwinding.

use std::alloc::Layout;
use std::fmt;

/// The storage strategy could not provide a block.
#[derive(Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("storage failed to allocate {} bytes (align {})", .layout.size(), .layout.align())]
pub struct AllocError {
    layout: Layout,
}

impl AllocError {
    /// Create an error for a failed request of `layout`.
    pub fn new(layout: Layout) -> AllocError {
        return AllocError { layout };
    }

    /// The layout that could not be allocated.
    pub fn layout(&self) -> Layout {
        return self.layout;
    }
}

impl fmt::Debug for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllocError")
            .field("size", &self.layout.size())
            .field("align", &self.layout.align())
            .finish()
    }
}

/// A value that could not be inserted because allocation failed.
///
/// The list is unchanged; the value is returned untouched.
#[derive(thiserror::Error)]
#[error("could not insert value: {source}")]
pub struct InsertError<T> {
    value: T,
    #[source]
    source: AllocError,
}

impl<T> InsertError<T> {
    pub(crate) fn new(value: T, source: AllocError) -> InsertError<T> {
        return InsertError { value, source };
    }

    /// Rebuild the error from an engine rejection, recovering the value
    /// from the (never invoked) producer closure.
    pub(crate) fn reclaim<F: FnOnce() -> T>((produce, source): (F, AllocError)) -> InsertError<T> {
        return InsertError::new(produce(), source);
    }

    /// Take back the value that was not inserted.
    pub fn into_value(self) -> T {
        return self.value;
    }

    /// Borrow the value that was not inserted.
    pub fn value(&self) -> &T {
        return &self.value;
    }

    /// The underlying allocation failure.
    pub fn alloc_error(&self) -> AllocError {
        return self.source;
    }
}

impl<T> fmt::Debug for InsertError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsertError").field("source", &self.source).finish_non_exhaustive()
    }
}

/// Errors reported by list operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Indexed access at or beyond the current length.
    #[error("index {index} is out of range for a list of length {len}")]
    OutOfRange { index: usize, len: usize },

    /// The storage strategy refused an allocation.
    #[error(transparent)]
    Alloc(#[from] AllocError),

    /// A range end was not reachable by advancing from the range start.
    #[error("range end is not reachable from the cursor")]
    Unreachable,

    /// A structural invariant does not hold.
    #[error("list structure is corrupt: {0}")]
    Corrupt(&'static str),
}

/// Abort on an allocation failure the caller chose not to handle.
///
/// Mirrors what std collections do for infallible-signature operations.
pub(crate) fn alloc_failed(err: AllocError) -> ! {
    log::debug!("unhandled allocation failure: {err}");
    std::alloc::handle_alloc_error(err.layout())
}

/// Panic for a layout computation that overflowed `isize`.
pub(crate) fn capacity_overflow() -> ! {
    panic!("capacity overflow");
}
