//! Kestrel: a single-core AArch64 kernel.
//!
//! Boots at EL1 on the QEMU `virt` machine, takes exceptions through a
//! sixteen-entry vector table, drives the GICv2 and the generic timer, and
//! time-slices kernel processes round-robin. Processes reach the kernel
//! through `svc #0`.
//!
//! Hosted builds (`cargo test`) replace the architecture layer with inert
//! stand-ins so the scheduling, interrupt and syscall logic can be tested
//! against register models.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[macro_use]
pub mod console;
pub mod arch;
pub mod config;
pub mod drivers;
pub mod error;
pub mod fs;
pub mod interrupts;
#[cfg(target_os = "none")]
mod lang_items;
pub mod logging;
pub mod mm;
pub mod sync;
pub mod syscall;
pub mod system;
pub mod task;
pub mod timer;
pub mod trap;

#[cfg(test)]
mod testing;

pub use error::{KernelError, KernelResult};
