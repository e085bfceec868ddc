//! Process management
//!
//! The [`Scheduler`] decides; this module is the kernel-facing surface that
//! takes the scheduler lock, drops it, and then performs the switch.

mod context;
mod process;
mod scheduler;
mod switch;

pub use context::{ProcessContext, ProcessEntry};
pub use process::{Pid, ProcessControlBlock, ProcessInfo, ProcessStack, ProcessState};
pub use scheduler::{Scheduler, SchedulerStats};
pub use switch::SwitchPlan;

use alloc::vec::Vec;

use log::{debug, error, info};

use crate::config::QUANTUM_TICKS;
use crate::error::KernelResult;
use crate::fs::{self, FileDescriptor};
use crate::{arch, system};

/// Build the scheduler around a fresh idle process.
pub fn init() -> KernelResult<Scheduler> {
    let idle = ProcessControlBlock::new(idle_main, "idle")?;
    info!("[task] idle process pid {}", idle.pid());
    Ok(Scheduler::new(idle, QUANTUM_TICKS))
}

/// Create a process and queue it.
pub fn process_create(entry: ProcessEntry, name: &'static str) -> KernelResult<Pid> {
    let system = system::try_get()?;
    let pcb = ProcessControlBlock::new(entry, name)?;
    let pid = system.scheduler.lock().admit(pcb);
    info!("[task] created process {} ({})", pid, name);
    Ok(pid)
}

/// Terminate the calling process.
pub fn process_exit() -> ! {
    let exited = system::try_get().and_then(|system| system.scheduler.lock().exit_current());
    match exited {
        Ok(pid) => info!("[task] process {} exited", pid),
        Err(err) => {
            error!("[task] process_exit: {}", err);
            arch::halt();
        }
    }
    yield_now();
    error!("[task] exited process was resumed");
    arch::halt()
}

pub fn process_current() -> Option<Pid> {
    system::get().and_then(|system| system.scheduler.lock().current())
}

pub fn process_by_pid(pid: Pid) -> Option<ProcessInfo> {
    system::get().and_then(|system| system.scheduler.lock().info(pid))
}

pub fn process_list() -> Vec<ProcessInfo> {
    system::get().map_or_else(Vec::new, |system| system.scheduler.lock().processes())
}

pub fn scheduler_add_process(pid: Pid) -> KernelResult<()> {
    system::try_get()?.scheduler.lock().add(pid)
}

pub fn scheduler_remove_process(pid: Pid) -> bool {
    system::get().is_some_and(|system| system.scheduler.lock().remove(pid))
}

pub fn scheduler_get_stats() -> SchedulerStats {
    system::get().map_or_else(SchedulerStats::default, |system| system.scheduler.lock().stats())
}

/// The running process's binding for `fd`. Before the scheduler starts the
/// kernel writes through the standard console bindings.
pub fn current_descriptor(fd: usize) -> Option<FileDescriptor> {
    let Some(system) = system::get() else {
        return fs::standard(fd);
    };
    let scheduler = system.scheduler.lock();
    match scheduler.current() {
        Some(_) => scheduler.current_descriptor(fd),
        None => fs::standard(fd),
    }
}

/// Give up the CPU if anything else is ready. Does nothing before
/// [`scheduler_start`].
pub fn yield_now() {
    let Some(system) = system::get() else {
        return;
    };
    // IRQs stay masked from the decision until the switch has happened.
    let flags = arch::irq_save();
    let plan = system.scheduler.lock().schedule();
    if let Some(plan) = plan {
        debug!("[task] switch {:?} -> {}", plan.from(), plan.to());
        unsafe { plan.execute() };
        // Running again, on our own stack.
        system.scheduler.lock().reap_zombies();
    }
    arch::irq_restore(flags);
}

/// Timer hook: account the tick against the running process.
pub fn scheduler_tick() {
    if let Some(system) = system::get() {
        system.scheduler.lock().tick();
    }
}

/// Carry out a preemption requested by [`scheduler_tick`]. Called on the
/// IRQ exit path once the interrupt has been completed.
pub fn preempt_if_needed() {
    let Some(system) = system::get() else {
        return;
    };
    if system.scheduler.lock().take_need_resched() {
        yield_now();
    }
}

/// Dispatch the first ready process. Never returns.
pub fn scheduler_start() -> ! {
    arch::disable_irqs();
    let plan = system::try_get().and_then(|system| system.scheduler.lock().start());
    match plan {
        Ok(plan) => {
            info!("[task] starting scheduler with process {}", plan.to());
            unsafe { plan.execute() };
            error!("[task] bootstrap context resumed");
            arch::halt()
        }
        Err(err) => {
            error!("[task] cannot start scheduler: {}", err);
            arch::halt()
        }
    }
}

extern "C" fn idle_main() -> ! {
    loop {
        arch::wait_for_interrupt();
        yield_now();
    }
}
