//! AArch64 EL1 support: boot entry, exception vectors, context switch
//! and the handful of system-register operations the kernel needs.

use core::arch::{asm, global_asm};

use aarch64_cpu::asm::barrier;
use aarch64_cpu::registers::*;
use tock_registers::interfaces::{Readable, Writeable};

use crate::task::ProcessContext;

global_asm!(include_str!("entry.S"));
global_asm!(include_str!("vectors.S"));
global_asm!(include_str!("switch.S"));

extern "C" {
    fn __exception_vectors();
    fn __switch(current_cx_ptr: *mut ProcessContext, next_cx_ptr: *const ProcessContext);
    fn __restore_context(next_cx_ptr: *const ProcessContext) -> !;
}

/// Point VBAR_EL1 at the vector table.
pub fn install_vectors() {
    VBAR_EL1.set(__exception_vectors as usize as u64);
    barrier::isb(barrier::SY);
}

/// Mask IRQs and return the previous DAIF value.
#[inline]
pub fn irq_save() -> u64 {
    let flags = DAIF.get();
    unsafe { asm!("msr daifset, #2", options(nomem, nostack)) };
    flags
}

/// Restore a DAIF value obtained from [`irq_save`].
#[inline]
pub fn irq_restore(flags: u64) {
    DAIF.set(flags);
}

#[inline]
pub fn enable_irqs() {
    unsafe { asm!("msr daifclr, #2", options(nomem, nostack)) };
}

#[inline]
pub fn disable_irqs() {
    unsafe { asm!("msr daifset, #2", options(nomem, nostack)) };
}

#[inline]
pub fn wait_for_interrupt() {
    aarch64_cpu::asm::wfi();
}

/// Park the core for good.
pub fn halt() -> ! {
    disable_irqs();
    loop {
        aarch64_cpu::asm::wfi();
    }
}

pub fn read_esr() -> u64 {
    ESR_EL1.get()
}

pub fn read_far() -> u64 {
    FAR_EL1.get()
}

/// Raw physical counter, for busy waits.
pub fn read_counter() -> u64 {
    CNTPCT_EL0.get()
}

/// Save the running context into `current` and resume `next`.
///
/// # Safety
/// Both pointers must reference live, properly aligned contexts, and `next`
/// must have been produced by a previous switch or by
/// `ProcessContext::new_process`. IRQs must be masked.
pub unsafe fn context_switch(current: *mut ProcessContext, next: *const ProcessContext) {
    __switch(current, next);
}

/// Resume `next` without saving anything; the caller's stack is abandoned.
///
/// # Safety
/// Same requirements on `next` as [`context_switch`].
pub unsafe fn restore_context(next: *const ProcessContext) -> ! {
    __restore_context(next)
}

pub fn dump_system_registers() {
    log::info!("CurrentEL: EL{}", CurrentEL.read(CurrentEL::EL));
    log::info!("DAIF:      {:#x}", DAIF.get());
    log::info!("VBAR_EL1:  {:#018x}", VBAR_EL1.get());
    log::info!("SCTLR_EL1: {:#018x}", SCTLR_EL1.get());
    log::info!("ESR_EL1:   {:#018x}", ESR_EL1.get());
    log::info!("FAR_EL1:   {:#018x}", FAR_EL1.get());
    log::info!("ELR_EL1:   {:#018x}", ELR_EL1.get());
    log::info!("SPSR_EL1:  {:#018x}", SPSR_EL1.get());
}
