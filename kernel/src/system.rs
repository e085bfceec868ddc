//! The kernel's single shared context.
//!
//! Built once at boot from fully initialised subsystems and never torn
//! down. Everything reachable from interrupt or syscall context hangs off
//! [`System`], each part behind its own [`IrqMutex`].

use spin::Once;

use crate::error::{KernelError, KernelResult};
use crate::interrupts::gic::MmioGic;
use crate::interrupts::InterruptController;
use crate::sync::IrqMutex;
use crate::syscall::SyscallTable;
use crate::task::Scheduler;
use crate::timer::{GenericTimer, SystemTimer};

pub struct System {
    pub interrupts: IrqMutex<InterruptController<MmioGic>>,
    pub timer: IrqMutex<SystemTimer<GenericTimer>>,
    pub scheduler: IrqMutex<Scheduler>,
    pub syscalls: IrqMutex<SyscallTable>,
}

impl System {
    pub fn new(
        interrupts: InterruptController<MmioGic>,
        timer: SystemTimer<GenericTimer>,
        scheduler: Scheduler,
        syscalls: SyscallTable,
    ) -> Self {
        Self {
            interrupts: IrqMutex::new(interrupts),
            timer: IrqMutex::new(timer),
            scheduler: IrqMutex::new(scheduler),
            syscalls: IrqMutex::new(syscalls),
        }
    }
}

static SYSTEM: Once<System> = Once::new();

/// Publish the context. Only the first call has any effect.
pub fn install(system: System) -> &'static System {
    SYSTEM.call_once(|| system)
}

/// `None` until [`install`] has run.
pub fn get() -> Option<&'static System> {
    SYSTEM.get()
}

pub fn try_get() -> KernelResult<&'static System> {
    get().ok_or(KernelError::NotInitialized("system"))
}

pub fn is_installed() -> bool {
    SYSTEM.is_completed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_before_install() {
        // Unit tests never install the hardware-backed context.
        assert!(get().is_none());
        assert!(!is_installed());
        assert!(matches!(try_get(), Err(KernelError::NotInitialized("system"))));
    }
}
