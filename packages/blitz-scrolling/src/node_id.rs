//! Scrolling node identifiers
//!
//! A [`ScrollingNodeId`] names one scrollable area on both sides of the thread
//! boundary: the main thread's state node and the scrolling thread's tree node share
//! it. Ids are never reused within a process and `0` is never a valid id.

use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScrollingNodeId(NonZeroU64);

impl ScrollingNodeId {
    /// Returns `None` for the reserved value `0`
    pub fn new(value: u64) -> Option<Self> {
        NonZeroU64::new(value).map(Self)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for ScrollingNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out strictly increasing [`ScrollingNodeId`]s starting at 1
///
/// Coordinators use the process-wide [`ScrollingNodeIdAllocator::global`] instance
/// unless given their own, which lets tests inspect and reset a private counter.
#[derive(Debug)]
pub struct ScrollingNodeIdAllocator {
    next: AtomicU64,
}

impl ScrollingNodeIdAllocator {
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Process-wide allocator, initialized on first access
    pub fn global() -> Arc<ScrollingNodeIdAllocator> {
        static INSTANCE: OnceLock<Arc<ScrollingNodeIdAllocator>> = OnceLock::new();
        INSTANCE
            .get_or_init(|| Arc::new(ScrollingNodeIdAllocator::new()))
            .clone()
    }

    pub fn allocate(&self) -> ScrollingNodeId {
        let value = self.next.fetch_add(1, Ordering::Relaxed);
        // The counter starts at 1 and would need 2^64 allocations to wrap
        match NonZeroU64::new(value) {
            Some(value) => ScrollingNodeId(value),
            None => ScrollingNodeId(NonZeroU64::MIN),
        }
    }

    /// The value the next call to [`allocate`](Self::allocate) will return
    pub fn peek_next(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }

    /// Restart numbering at 1. Only meaningful for allocators private to a test.
    pub fn reset(&self) {
        self.next.store(1, Ordering::Relaxed);
    }
}

impl Default for ScrollingNodeIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
