//! System call dispatch
//!
//! A process traps with `svc #0`, the call number in `x8` and up to six
//! arguments in `x0..x5`. The trap layer hands those to [`dispatch`] and
//! writes the result back into `x0`.

mod fs;
mod process;

use log::{error, trace};

use crate::config::MAX_SYSCALLS;
use crate::system;

pub const SYSCALL_EXIT: usize = 0;
pub const SYSCALL_WRITE: usize = 1;
pub const SYSCALL_READ: usize = 2;
pub const SYSCALL_GETPID: usize = 3;
pub const SYSCALL_YIELD: usize = 4;
// Reserved, no handler yet.
pub const SYSCALL_SLEEP: usize = 5;
pub const SYSCALL_FORK: usize = 6;
pub const SYSCALL_EXEC: usize = 7;
pub const SYSCALL_WAIT: usize = 8;
pub const SYSCALL_OPEN: usize = 9;
pub const SYSCALL_CLOSE: usize = 10;

/// Returned for unknown calls and failed ones; -1 as seen by the caller.
pub const SYSCALL_FAILED: u64 = u64::MAX;

/// Every handler sees all six argument registers.
pub type SyscallHandler = fn(&[u64; 6]) -> u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyscallStats {
    pub total: u64,
    pub per_call: [u64; MAX_SYSCALLS],
}

pub struct SyscallTable {
    handlers: [Option<SyscallHandler>; MAX_SYSCALLS],
    stats: SyscallStats,
}

impl SyscallTable {
    pub const fn empty() -> Self {
        Self {
            handlers: [None; MAX_SYSCALLS],
            stats: SyscallStats {
                total: 0,
                per_call: [0; MAX_SYSCALLS],
            },
        }
    }

    pub fn with_defaults() -> Self {
        let mut table = Self::empty();
        table.handlers[SYSCALL_EXIT] = Some(process::sys_exit);
        table.handlers[SYSCALL_WRITE] = Some(fs::sys_write);
        table.handlers[SYSCALL_READ] = Some(fs::sys_read);
        table.handlers[SYSCALL_GETPID] = Some(process::sys_getpid);
        table.handlers[SYSCALL_YIELD] = Some(process::sys_yield);
        table
    }

    /// Install `handler` for `num`. Returns false if `num` is out of range.
    pub fn register(&mut self, num: usize, handler: SyscallHandler) -> bool {
        match self.handlers.get_mut(num) {
            Some(slot) => {
                *slot = Some(handler);
                true
            }
            None => false,
        }
    }

    pub fn is_registered(&self, num: usize) -> bool {
        self.handlers.get(num).is_some_and(Option::is_some)
    }

    /// Look up the handler for `num` and count the call. Unknown numbers
    /// are logged and not counted.
    pub fn resolve(&mut self, num: u64) -> Option<SyscallHandler> {
        let handler = usize::try_from(num)
            .ok()
            .and_then(|index| Some((index, self.handlers.get(index).copied().flatten()?)));
        match handler {
            Some((index, handler)) => {
                self.stats.total += 1;
                self.stats.per_call[index] += 1;
                Some(handler)
            }
            None => {
                error!("[syscall] invalid syscall number {}", num);
                None
            }
        }
    }

    pub fn stats(&self) -> SyscallStats {
        self.stats
    }
}

impl Default for SyscallTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn invoke(handler: Option<SyscallHandler>, args: &[u64; 6]) -> u64 {
    handler.map_or(SYSCALL_FAILED, |handler| handler(args))
}

pub fn init() -> SyscallTable {
    SyscallTable::with_defaults()
}

/// Run syscall `num`. The table lock is released before the handler runs,
/// since `exit` and `yield` switch processes.
pub fn dispatch(num: u64, args: [u64; 6]) -> u64 {
    let Some(system) = system::get() else {
        error!("[syscall] call {} before the system was installed", num);
        return SYSCALL_FAILED;
    };
    trace!("[syscall] {} {:x?}", num, args);
    let handler = system.syscalls.lock().resolve(num);
    invoke(handler, &args)
}

pub fn syscall_stats() -> SyscallStats {
    system::get().map_or(SyscallTable::empty().stats(), |system| system.syscalls.lock().stats())
}
