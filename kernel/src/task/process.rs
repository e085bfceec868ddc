//! Process Control Block

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use super::context::{ProcessContext, ProcessEntry};
use crate::config::{PROCESS_STACK_SIZE, QUANTUM_TICKS};
use crate::error::{KernelError, KernelResult};
use crate::fs::FdTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(pub u64);

static NEXT_PID: AtomicU64 = AtomicU64::new(1);

impl Pid {
    fn allocate() -> Self {
        Pid(NEXT_PID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process State
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProcessState {
    Ready,
    Running,
    /// Off the CPU and off the ready queue: removed with `remove` (and
    /// brought back by `add`), or the idle process while others run.
    Suspended,
    Zombie,
}

/// Owned stack memory for one process.
pub struct ProcessStack {
    memory: Vec<u8>,
}

impl ProcessStack {
    pub fn allocate(size: usize) -> KernelResult<Self> {
        let mut memory = Vec::new();
        memory
            .try_reserve_exact(size)
            .map_err(|_| KernelError::OutOfMemory)?;
        memory.resize(size, 0);
        Ok(Self { memory })
    }

    pub fn base(&self) -> usize {
        self.memory.as_ptr() as usize
    }

    pub fn size(&self) -> usize {
        self.memory.len()
    }

    /// Highest 16-byte aligned address inside the stack.
    pub fn top(&self) -> usize {
        (self.base() + self.size()) & !0xF
    }
}

pub struct ProcessControlBlock {
    pid: Pid,
    name: &'static str,
    pub(super) state: ProcessState,
    pub(super) context: ProcessContext,
    stack: ProcessStack,
    pub(super) remaining_quantum: u64,
    pub(super) total_time: u64,
    pub(super) fd_table: Option<Box<FdTable>>,
    /// Ready-queue link
    pub(super) next: Option<Pid>,
}

impl ProcessControlBlock {
    /// Allocate a stack and descriptor table and point the context at
    /// `entry`. The process is not scheduled yet.
    pub fn new(entry: ProcessEntry, name: &'static str) -> KernelResult<Box<Self>> {
        let stack = ProcessStack::allocate(PROCESS_STACK_SIZE)?;
        let fd_table = FdTable::create()?;
        let context = ProcessContext::new_process(entry, stack.top());
        Ok(Box::new(Self {
            pid: Pid::allocate(),
            name,
            state: ProcessState::Ready,
            context,
            stack,
            remaining_quantum: QUANTUM_TICKS,
            total_time: 0,
            fd_table: Some(fd_table),
            next: None,
        }))
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn context(&self) -> &ProcessContext {
        &self.context
    }

    pub fn stack(&self) -> &ProcessStack {
        &self.stack
    }

    pub fn remaining_quantum(&self) -> u64 {
        self.remaining_quantum
    }

    pub fn total_time(&self) -> u64 {
        self.total_time
    }

    pub fn fd_table(&self) -> Option<&FdTable> {
        self.fd_table.as_deref()
    }

    pub fn info(&self) -> ProcessInfo {
        ProcessInfo {
            pid: self.pid,
            name: self.name,
            state: self.state,
            remaining_quantum: self.remaining_quantum,
            total_time: self.total_time,
        }
    }
}

/// Snapshot of a PCB for callers outside the scheduler lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: Pid,
    pub name: &'static str,
    pub state: ProcessState,
    pub remaining_quantum: u64,
    pub total_time: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn entry() -> ! {
        loop {}
    }

    #[test]
    fn new_process_is_ready_at_entry() {
        let pcb = ProcessControlBlock::new(entry, "worker").unwrap();
        assert_eq!(pcb.state(), ProcessState::Ready);
        assert_eq!(pcb.name(), "worker");
        assert_eq!(pcb.remaining_quantum(), QUANTUM_TICKS);
        assert_eq!(pcb.total_time(), 0);
        assert!(pcb.fd_table().is_some());

        let cx = pcb.context();
        let stack = pcb.stack();
        assert_eq!(cx.lr, entry as usize as u64);
        assert_eq!(cx.sp as usize, stack.top());
        assert_eq!(cx.sp % 16, 0);
        assert!(stack.top() > stack.base());
        assert!(stack.top() <= stack.base() + stack.size());
        assert!(stack.base() + stack.size() - stack.top() < 16);
    }

    #[test]
    fn pids_increase() {
        let a = ProcessControlBlock::new(entry, "a").unwrap();
        let b = ProcessControlBlock::new(entry, "b").unwrap();
        assert!(b.pid() > a.pid());
        assert!(a.pid().0 >= 1);
    }
}
