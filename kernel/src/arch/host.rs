//! Hosted stand-ins for the AArch64 primitives.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::task::ProcessContext;

static IRQS_ENABLED: AtomicBool = AtomicBool::new(false);

pub fn install_vectors() {}

pub fn irq_save() -> u64 {
    IRQS_ENABLED.swap(false, Ordering::Relaxed) as u64
}

pub fn irq_restore(flags: u64) {
    IRQS_ENABLED.store(flags != 0, Ordering::Relaxed);
}

pub fn enable_irqs() {
    IRQS_ENABLED.store(true, Ordering::Relaxed);
}

pub fn disable_irqs() {
    IRQS_ENABLED.store(false, Ordering::Relaxed);
}

pub fn wait_for_interrupt() {
    core::hint::spin_loop();
}

pub fn halt() -> ! {
    panic!("core halted");
}

pub fn read_esr() -> u64 {
    0
}

pub fn read_far() -> u64 {
    0
}

pub fn read_counter() -> u64 {
    0
}

/// # Safety
/// Never valid on a hosted build.
pub unsafe fn context_switch(_current: *mut ProcessContext, _next: *const ProcessContext) {
    unimplemented!("context switching needs the bare-metal target");
}

/// # Safety
/// Never valid on a hosted build.
pub unsafe fn restore_context(_next: *const ProcessContext) -> ! {
    unimplemented!("context switching needs the bare-metal target");
}

pub fn dump_system_registers() {}
