//! Kernel heap allocator
//!
//! A buddy allocator over a static region in `.bss`. Every call runs with
//! IRQs masked: the allocator's spin lock must never be held by a process
//! that gets preempted.

use core::alloc::{GlobalAlloc, Layout};
use core::ptr::{addr_of_mut, NonNull};
use core::sync::atomic::{AtomicBool, Ordering};

use buddy_system_allocator::LockedHeap;
use log::{error, info};

use crate::arch;
use crate::config::KERNEL_HEAP_SIZE;

static mut HEAP_SPACE: [u8; KERNEL_HEAP_SIZE] = [0; KERNEL_HEAP_SIZE];

static HEAP_INITIALISED: AtomicBool = AtomicBool::new(false);

struct KernelHeap {
    inner: LockedHeap<32>,
}

unsafe impl GlobalAlloc for KernelHeap {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let flags = arch::irq_save();
        let ptr = self
            .inner
            .lock()
            .alloc(layout)
            .map_or(core::ptr::null_mut(), NonNull::as_ptr);
        arch::irq_restore(flags);
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if let Some(ptr) = NonNull::new(ptr) {
            let flags = arch::irq_save();
            self.inner.lock().dealloc(ptr, layout);
            arch::irq_restore(flags);
        }
    }
}

#[global_allocator]
static HEAP_ALLOCATOR: KernelHeap = KernelHeap {
    inner: LockedHeap::empty(),
};

pub fn init_heap() {
    if HEAP_INITIALISED.swap(true, Ordering::SeqCst) {
        error!("[mm] heap already initialised");
        return;
    }
    let start = unsafe { addr_of_mut!(HEAP_SPACE) } as usize;
    let flags = arch::irq_save();
    unsafe {
        HEAP_ALLOCATOR.inner.lock().init(start, KERNEL_HEAP_SIZE);
    }
    arch::irq_restore(flags);
    info!(
        "[mm] kernel heap {:#x}..{:#x} ({} KB)",
        start,
        start + KERNEL_HEAP_SIZE,
        KERNEL_HEAP_SIZE / 1024
    );
}

#[derive(Debug, Clone, Copy)]
pub struct HeapStats {
    pub total: usize,
    pub allocated: usize,
}

pub fn heap_stats() -> HeapStats {
    let flags = arch::irq_save();
    let stats = {
        let heap = HEAP_ALLOCATOR.inner.lock();
        HeapStats {
            total: heap.stats_total_bytes(),
            allocated: heap.stats_alloc_actual(),
        }
    };
    arch::irq_restore(flags);
    stats
}
