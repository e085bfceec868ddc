//! Memory management
//!
//! The kernel runs identity-mapped with the MMU off, so all there is to
//! manage is the heap backing PCBs, process stacks and the scheduler's
//! bookkeeping.

#[cfg(target_os = "none")]
mod heap;

#[cfg(target_os = "none")]
pub use heap::{heap_stats, HeapStats};

/// Bring up the kernel heap. Hosted builds use the system allocator.
pub fn init() {
    #[cfg(target_os = "none")]
    heap::init_heap();
}
