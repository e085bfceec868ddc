//! Per-process file descriptor table.
//!
//! There is no filesystem yet. Descriptors 0, 1 and 2 are bound to the
//! console and every other slot starts closed.

use alloc::boxed::Box;

use log::debug;

use crate::config::MAX_OPEN_FILES;
use crate::error::KernelResult;

pub const STDIN: usize = 0;
pub const STDOUT: usize = 1;
pub const STDERR: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileDescriptor {
    ConsoleIn,
    ConsoleOut,
}

impl FileDescriptor {
    pub fn is_writable(self) -> bool {
        self == Self::ConsoleOut
    }
}

/// What `fd` is bound to in a freshly created table.
pub fn standard(fd: usize) -> Option<FileDescriptor> {
    match fd {
        STDIN => Some(FileDescriptor::ConsoleIn),
        STDOUT | STDERR => Some(FileDescriptor::ConsoleOut),
        _ => None,
    }
}

pub struct FdTable {
    slots: [Option<FileDescriptor>; MAX_OPEN_FILES],
}

impl FdTable {
    /// Table with the three standard descriptors open.
    pub fn create() -> KernelResult<Box<Self>> {
        let mut table = Box::new(Self {
            slots: [None; MAX_OPEN_FILES],
        });
        for fd in [STDIN, STDOUT, STDERR] {
            table.slots[fd] = standard(fd);
        }
        Ok(table)
    }

    pub fn get(&self, fd: usize) -> Option<FileDescriptor> {
        self.slots.get(fd).copied().flatten()
    }

    pub fn open_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

impl Drop for FdTable {
    fn drop(&mut self) {
        debug!("[fs] closing {} descriptors", self.open_count());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_descriptors_are_open() {
        let table = FdTable::create().unwrap();
        assert_eq!(table.open_count(), 3);
        assert_eq!(table.get(STDIN), Some(FileDescriptor::ConsoleIn));
        assert!(table.get(STDOUT).unwrap().is_writable());
        assert!(table.get(STDERR).unwrap().is_writable());
        assert!(!table.get(STDIN).unwrap().is_writable());
        assert_eq!(table.get(3), None);
        assert_eq!(table.get(MAX_OPEN_FILES + 1), None);
    }

    #[test]
    fn standard_bindings_match_a_new_table() {
        let table = FdTable::create().unwrap();
        for fd in 0..MAX_OPEN_FILES {
            assert_eq!(standard(fd), table.get(fd));
        }
    }
}
