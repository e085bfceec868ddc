use log::warn;

use super::SYSCALL_FAILED;
use crate::fs::FileDescriptor;
use crate::{console, task};

/// write(fd, buf, len): `fd` must be open for writing in the caller's table.
pub fn sys_write(args: &[u64; 6]) -> u64 {
    let (fd, buf, len) = (args[0] as usize, args[1] as *const u8, args[2] as usize);
    if !task::current_descriptor(fd).is_some_and(FileDescriptor::is_writable) {
        warn!("[syscall] write to unwritable fd {}", fd);
        return SYSCALL_FAILED;
    }
    if len == 0 {
        return 0;
    }
    if buf.is_null() {
        warn!("[syscall] write from null buffer");
        return SYSCALL_FAILED;
    }
    // Processes share the kernel's address space; the buffer is directly
    // addressable.
    let bytes = unsafe { core::slice::from_raw_parts(buf, len) };
    console::write_bytes(bytes);
    len as u64
}

/// read(fd, buf, len): there is no input source yet.
pub fn sys_read(args: &[u64; 6]) -> u64 {
    warn!("[syscall] read(fd {}, {} bytes) is not supported", args[0], args[2]);
    0
}
