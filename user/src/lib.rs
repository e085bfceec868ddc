//! Syscall interface for Kestrel processes.
//!
//! A call traps with `svc #0`: the number goes in `x8`, arguments in
//! `x0..x5`, and the result comes back in `x0`. A result of `-1` means the
//! kernel rejected the call.

#![no_std]

use core::fmt::{self, Write};

pub const SYSCALL_EXIT: usize = 0;
pub const SYSCALL_WRITE: usize = 1;
pub const SYSCALL_READ: usize = 2;
pub const SYSCALL_GETPID: usize = 3;
pub const SYSCALL_YIELD: usize = 4;
pub const SYSCALL_SLEEP: usize = 5;
pub const SYSCALL_FORK: usize = 6;
pub const SYSCALL_EXEC: usize = 7;
pub const SYSCALL_WAIT: usize = 8;
pub const SYSCALL_OPEN: usize = 9;
pub const SYSCALL_CLOSE: usize = 10;

pub const STDIN: usize = 0;
pub const STDOUT: usize = 1;
pub const STDERR: usize = 2;

#[cfg(target_arch = "aarch64")]
#[inline(always)]
pub fn syscall(id: usize, args: [usize; 6]) -> isize {
    let mut ret: isize;
    unsafe {
        core::arch::asm!(
            "svc #0",
            inlateout("x0") args[0] => ret,
            in("x1") args[1],
            in("x2") args[2],
            in("x3") args[3],
            in("x4") args[4],
            in("x5") args[5],
            in("x8") id,
        );
    }
    ret
}

#[cfg(not(target_arch = "aarch64"))]
pub fn syscall(id: usize, _args: [usize; 6]) -> isize {
    unimplemented!("syscall {} needs an aarch64 kernel", id)
}

pub fn exit(code: i32) -> ! {
    syscall(SYSCALL_EXIT, [code as usize, 0, 0, 0, 0, 0]);
    unreachable!("exit returned")
}

pub fn write(fd: usize, buf: &[u8]) -> isize {
    syscall(SYSCALL_WRITE, [fd, buf.as_ptr() as usize, buf.len(), 0, 0, 0])
}

pub fn read(fd: usize, buf: &mut [u8]) -> isize {
    syscall(SYSCALL_READ, [fd, buf.as_mut_ptr() as usize, buf.len(), 0, 0, 0])
}

pub fn getpid() -> isize {
    syscall(SYSCALL_GETPID, [0; 6])
}

pub fn yield_() -> isize {
    syscall(SYSCALL_YIELD, [0; 6])
}

struct Stdout;

impl Write for Stdout {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if write(STDOUT, s.as_bytes()) < 0 {
            return Err(fmt::Error);
        }
        Ok(())
    }
}

pub fn _print(args: fmt::Arguments) {
    let _ = Stdout.write_fmt(args);
}

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {
        $crate::_print(core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! println {
    () => {
        $crate::print!("\n")
    };
    ($($arg:tt)*) => {
        $crate::print!("{}\n", core::format_args!($($arg)*))
    };
}
