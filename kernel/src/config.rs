//! Kernel configuration constants

/// Kernel heap size (8MB)
pub const KERNEL_HEAP_SIZE: usize = 0x80_0000;

/// Per-process stack size (16KB)
pub const PROCESS_STACK_SIZE: usize = 4096 * 4;

/// Timer ticks a process may run before it is preempted
pub const QUANTUM_TICKS: u64 = 10;

/// Logical timer rate, independent of the counter frequency (10ms ticks)
pub const TIMER_HZ: u64 = 100;

/// EL1 physical timer PPI
pub const TIMER_IRQ: u32 = 30;

/// Interrupt IDs at or above this are special or spurious on GICv2
pub const MAX_IRQ: usize = 1020;

/// Size of the syscall table
pub const MAX_SYSCALLS: usize = 32;

/// Descriptor slots per process
pub const MAX_OPEN_FILES: usize = 16;

/// GICv2 distributor base on QEMU virt
pub const GICD_BASE: usize = 0x0800_0000;

/// GICv2 CPU interface base on QEMU virt
pub const GICC_BASE: usize = 0x0801_0000;

/// PL011 UART base on QEMU virt
pub const UART_BASE: usize = 0x0900_0000;
