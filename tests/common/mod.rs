//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::alloc::Layout;
use std::cell::Cell;
use std::ptr::NonNull;
use std::rc::Rc;

use unrolled::{AllocError, Global, Shape, Storage};

// =============================================================================
// Logging
// =============================================================================

/// Route `log` output through the test harness (`RUST_LOG=unrolled=trace`).
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// =============================================================================
// Counting storage
// =============================================================================

#[derive(Debug, Default)]
pub struct Counters {
    pub node_allocs: Cell<usize>,
    pub node_frees: Cell<usize>,
    pub element_allocs: Cell<usize>,
    pub element_frees: Cell<usize>,
    /// Number of further allocations to allow before failing; `None` never fails.
    pub fail_after: Cell<Option<usize>>,
}

impl Counters {
    pub fn live_nodes(&self) -> usize {
        return self.node_allocs.get() - self.node_frees.get();
    }

    pub fn balanced(&self) -> bool {
        return self.node_allocs.get() == self.node_frees.get()
            && self.element_allocs.get() == self.element_frees.get();
    }
}

/// Storage that counts allocations by shape and can be told to fail.
#[derive(Clone, Debug, Default)]
pub struct CountingStorage {
    pub counters: Rc<Counters>,
}

impl CountingStorage {
    pub fn new() -> CountingStorage {
        return CountingStorage::default();
    }

    /// Let `count` more allocations succeed, then fail every one after.
    pub fn fail_after(&self, count: usize) {
        self.counters.fail_after.set(Some(count));
    }

    pub fn stop_failing(&self) {
        self.counters.fail_after.set(None);
    }
}

unsafe impl Storage for CountingStorage {
    fn allocate(&self, shape: Shape, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if let Some(left) = self.counters.fail_after.get() {
            if left == 0 {
                return Err(AllocError::new(layout));
            }
            self.counters.fail_after.set(Some(left - 1));
        }
        let ptr = Global.allocate(shape, layout)?;
        let counter = match shape {
            Shape::Node => &self.counters.node_allocs,
            Shape::Elements => &self.counters.element_allocs,
        };
        counter.set(counter.get() + 1);
        return Ok(ptr);
    }

    unsafe fn deallocate(&self, shape: Shape, ptr: NonNull<u8>, layout: Layout) {
        let counter = match shape {
            Shape::Node => &self.counters.node_frees,
            Shape::Elements => &self.counters.element_frees,
        };
        counter.set(counter.get() + 1);
        unsafe { Global.deallocate(shape, ptr, layout) };
    }
}

// =============================================================================
// Element types
// =============================================================================

/// Counts its own drops; can be armed to panic on the Nth clone.
#[derive(Debug)]
pub struct Tracked {
    pub value: u32,
    pub drops: Rc<Cell<usize>>,
    pub clones: Rc<Cell<usize>>,
    pub panic_on_clone: Option<usize>,
}

impl Tracked {
    pub fn batch(values: impl IntoIterator<Item = u32>, panic_on_clone: Option<usize>) -> (Vec<Tracked>, Rc<Cell<usize>>) {
        let drops = Rc::new(Cell::new(0));
        let clones = Rc::new(Cell::new(0));
        let batch = values
            .into_iter()
            .map(|value| Tracked {
                value,
                drops: drops.clone(),
                clones: clones.clone(),
                panic_on_clone,
            })
            .collect();
        return (batch, drops);
    }
}

impl Clone for Tracked {
    fn clone(&self) -> Self {
        let n = self.clones.get() + 1;
        self.clones.set(n);
        if self.panic_on_clone == Some(n) {
            panic!("clone #{n} failed");
        }
        return Tracked {
            value: self.value,
            drops: self.drops.clone(),
            clones: self.clones.clone(),
            panic_on_clone: self.panic_on_clone,
        };
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

/// A type with no `Default` and no `Clone`.
#[derive(Debug, PartialEq, Eq)]
pub struct NoDefault(pub u32);

/// Stands in for a value whose construction fails.
pub fn construction_failed() -> u32 {
    panic!("value construction failed");
}
