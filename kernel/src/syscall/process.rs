use log::info;

use super::SYSCALL_FAILED;
use crate::task;

/// exit(code): never returns to the caller.
pub fn sys_exit(args: &[u64; 6]) -> u64 {
    info!(
        "[syscall] process {:?} exit with code {}",
        task::process_current(),
        args[0] as i32
    );
    task::process_exit()
}

pub fn sys_getpid(_args: &[u64; 6]) -> u64 {
    task::process_current().map_or(SYSCALL_FAILED, |pid| pid.0)
}

pub fn sys_yield(_args: &[u64; 6]) -> u64 {
    task::yield_now();
    0
}
