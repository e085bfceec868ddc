//! Trap frame saved by the vector entry code

use core::fmt;

/// Bytes reserved on the stack by each vector entry.
pub const TRAP_FRAME_SIZE: usize = 272;

/// Register file at the moment of the trap.
///
/// The layout is fixed by `vectors.S`: `x0..x30` in order, then the
/// interrupted stack pointer, `ELR_EL1` and `SPSR_EL1`.
#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct TrapFrame {
    pub x: [u64; 31],
    pub sp: u64,
    pub elr: u64,
    pub spsr: u64,
}

const _: () = assert!(core::mem::size_of::<TrapFrame>() == TRAP_FRAME_SIZE);
const _: () = assert!(TRAP_FRAME_SIZE % 16 == 0);

impl TrapFrame {
    /// Syscall number, passed in `x8`.
    pub fn syscall_number(&self) -> u64 {
        self.x[8]
    }

    /// The six argument registers `x0..x5`.
    pub fn syscall_args(&self) -> [u64; 6] {
        [self.x[0], self.x[1], self.x[2], self.x[3], self.x[4], self.x[5]]
    }

    /// Result slot seen by the trapping code after `eret`.
    pub fn set_return_value(&mut self, value: u64) {
        self.x[0] = value;
    }

    pub fn pc(&self) -> u64 {
        self.elr
    }
}

impl fmt::Debug for TrapFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pair) in self.x.chunks(2).enumerate() {
            match pair {
                [a, b] => writeln!(f, "x{:<2} {:#018x}  x{:<2} {:#018x}", 2 * i, a, 2 * i + 1, b)?,
                [a] => writeln!(f, "x{:<2} {:#018x}", 2 * i, a)?,
                _ => {}
            }
        }
        write!(
            f,
            "sp  {:#018x}  pc  {:#018x}  pstate {:#010x}",
            self.sp, self.elr, self.spsr
        )
    }
}
