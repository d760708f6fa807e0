use std::sync::atomic::{AtomicU32, Ordering};
use crate::index_vec::Idx;

/// Identifies a binding within a single function's scope tree.
///
/// Each function body gets its own [`DefIdGenerator`], so a `DefId` is only
/// unique within the frame that produced it — it does not identify a
/// binding across the whole program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DefId(pub u32);

impl Idx for DefId {
    fn from_usize(idx: usize) -> Self {
        DefId(idx as u32)
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Hands out sequential `DefId`s for one function's scope tree.
///
/// Atomic rather than a plain counter so the parallel per-function analysis
/// pass (bodies analyzed concurrently via `rayon`) never needs a `&mut`
/// generator shared across threads — though in practice each generator is
/// only ever touched by the single thread analyzing its function.
pub struct DefIdGenerator {
    counter: AtomicU32,
}

impl DefIdGenerator {
    pub fn new() -> Self {
        Self { counter: AtomicU32::new(0) }
    }

    pub fn next(&self) -> DefId {
        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        if id == u32::MAX {
            panic!("DefId overflow in a single function body");
        }
        DefId(id)
    }
}

impl Default for DefIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
