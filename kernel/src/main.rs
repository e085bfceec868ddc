//! Kestrel kernel image
//!
//! `_start` (in `entry.S`) parks secondary cores, sets up the boot stack and
//! calls [`kernel_main`], which brings the subsystems up in dependency order
//! and hands the CPU to the scheduler.

#![cfg_attr(target_os = "none", no_std, no_main)]

#[cfg(target_os = "none")]
mod demo;

#[cfg(target_os = "none")]
use kestrel_kernel::{
    arch, console, interrupts, logging, mm, println, syscall, system, task, timer, KernelResult,
};

#[cfg(target_os = "none")]
#[no_mangle]
pub extern "C" fn kernel_main() -> ! {
    clear_bss();
    console::init();
    logging::init();
    mm::init();
    print_banner();

    if let Err(err) = boot() {
        log::error!("[kernel] boot failed: {}", err);
        arch::dump_system_registers();
        arch::halt();
    }
    task::scheduler_start()
}

/// Everything that can fail. IRQs stay masked until the system context is
/// installed, so no handler can observe a half-built kernel.
#[cfg(target_os = "none")]
fn boot() -> KernelResult<()> {
    let mut irqs = interrupts::init();
    let timer = timer::init(&mut irqs)?;
    let scheduler = task::init()?;
    let syscalls = syscall::init();
    system::install(system::System::new(irqs, timer, scheduler, syscalls));

    interrupts::enable();
    timer::start()?;

    demo::spawn()?;
    log::info!("[kernel] {} processes ready", task::scheduler_get_stats().running_processes);
    Ok(())
}

#[cfg(target_os = "none")]
fn clear_bss() {
    extern "C" {
        fn sbss();
        fn ebss();
    }
    // The boot stack sits below `sbss` and is left alone.
    unsafe {
        core::slice::from_raw_parts_mut(sbss as usize as *mut u8, ebss as usize - sbss as usize)
            .fill(0);
    }
}

#[cfg(target_os = "none")]
fn print_banner() {
    println!("=================================");
    println!("Kestrel Kernel v{}", env!("CARGO_PKG_VERSION"));
    println!("=================================");
    println!("[kernel] AArch64 EL1, QEMU virt");
}

#[cfg(not(target_os = "none"))]
fn main() {
    eprintln!("kestrel-kernel only runs on aarch64-unknown-none-softfloat");
}
