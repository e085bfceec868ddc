//! Scheduler
//!
//! Round-robin over a FIFO ready queue. The queue is threaded through the
//! PCBs' `next` links; the scheduler owns every PCB, including the idle
//! process, which is never queued.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use super::process::{Pid, ProcessControlBlock, ProcessInfo, ProcessState};
use super::switch::SwitchPlan;
use crate::error::{KernelError, KernelResult};
use crate::fs::FileDescriptor;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub total_processes: u64,
    pub running_processes: u64,
    pub context_switches: u64,
}

pub struct Scheduler {
    procs: BTreeMap<Pid, Box<ProcessControlBlock>>,
    head: Option<Pid>,
    tail: Option<Pid>,
    current: Option<Pid>,
    idle: Pid,
    quantum: u64,
    need_resched: bool,
    stats: SchedulerStats,
}

impl Scheduler {
    pub fn new(mut idle: Box<ProcessControlBlock>, quantum: u64) -> Self {
        let idle_pid = idle.pid();
        idle.remaining_quantum = quantum;
        // Parked until the queue runs dry.
        idle.state = ProcessState::Suspended;
        let mut procs = BTreeMap::new();
        procs.insert(idle_pid, idle);
        Self {
            procs,
            head: None,
            tail: None,
            current: None,
            idle: idle_pid,
            quantum,
            need_resched: false,
            stats: SchedulerStats::default(),
        }
    }

    pub fn idle_pid(&self) -> Pid {
        self.idle
    }

    pub fn quantum(&self) -> u64 {
        self.quantum
    }

    pub fn current(&self) -> Option<Pid> {
        self.current
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Look `fd` up in the running process's table.
    pub fn current_descriptor(&self, fd: usize) -> Option<FileDescriptor> {
        self.pcb(self.current?)?.fd_table()?.get(fd)
    }

    fn pcb(&self, pid: Pid) -> Option<&ProcessControlBlock> {
        self.procs.get(&pid).map(|pcb| &**pcb)
    }

    fn pcb_mut(&mut self, pid: Pid) -> Option<&mut ProcessControlBlock> {
        self.procs.get_mut(&pid).map(|pcb| &mut **pcb)
    }

    fn state_of(&self, pid: Pid) -> Option<ProcessState> {
        self.pcb(pid).map(|pcb| pcb.state)
    }

    fn set_state(&mut self, pid: Pid, state: ProcessState) {
        if let Some(pcb) = self.pcb_mut(pid) {
            pcb.state = state;
        }
    }

    /// Take ownership of a new PCB and queue it.
    pub fn admit(&mut self, mut pcb: Box<ProcessControlBlock>) -> Pid {
        let pid = pcb.pid();
        pcb.remaining_quantum = self.quantum;
        pcb.next = None;
        self.procs.insert(pid, pcb);
        self.push_back(pid);
        self.set_state(pid, ProcessState::Ready);
        self.stats.total_processes += 1;
        self.stats.running_processes += 1;
        pid
    }

    /// Put a suspended process back at the tail of the ready queue.
    pub fn add(&mut self, pid: Pid) -> KernelResult<()> {
        let state = self.state_of(pid).ok_or(KernelError::UnknownProcess(pid))?;
        if pid == self.idle || state != ProcessState::Suspended {
            return Err(KernelError::InvalidState);
        }
        self.push_back(pid);
        self.set_state(pid, ProcessState::Ready);
        self.stats.total_processes += 1;
        self.stats.running_processes += 1;
        Ok(())
    }

    /// Unlink `pid` from the ready queue, suspending it. Returns whether it
    /// was queued.
    pub fn remove(&mut self, pid: Pid) -> bool {
        let mut prev: Option<Pid> = None;
        let mut cursor = self.head;
        while let Some(at) = cursor {
            let next = self.pcb(at).and_then(|pcb| pcb.next);
            if at == pid {
                match prev {
                    Some(prev) => {
                        if let Some(pcb) = self.pcb_mut(prev) {
                            pcb.next = next;
                        }
                    }
                    None => self.head = next,
                }
                if self.tail == Some(pid) {
                    self.tail = prev;
                }
                if let Some(pcb) = self.pcb_mut(pid) {
                    pcb.next = None;
                    if pcb.state == ProcessState::Ready {
                        pcb.state = ProcessState::Suspended;
                    }
                }
                self.stats.running_processes = self.stats.running_processes.saturating_sub(1);
                return true;
            }
            prev = Some(at);
            cursor = next;
        }
        false
    }

    fn push_back(&mut self, pid: Pid) {
        match self.tail {
            Some(tail) => {
                if let Some(pcb) = self.pcb_mut(tail) {
                    pcb.next = Some(pid);
                }
            }
            None => self.head = Some(pid),
        }
        self.tail = Some(pid);
    }

    fn pop_front(&mut self) -> Option<Pid> {
        let pid = self.head?;
        let next = self.pcb_mut(pid).and_then(|pcb| pcb.next.take());
        self.head = next;
        if next.is_none() {
            self.tail = None;
        }
        Some(pid)
    }

    /// Pick the process to run next, re-queueing the current one if it is
    /// still runnable.
    pub fn select_next(&mut self) -> Pid {
        let runnable = self
            .current
            .filter(|&pid| pid != self.idle && self.state_of(pid) == Some(ProcessState::Running));

        if self.head.is_none() {
            return runnable.unwrap_or(self.idle);
        }
        if let Some(pid) = runnable {
            self.set_state(pid, ProcessState::Ready);
            self.push_back(pid);
        }
        self.pop_front().unwrap_or(self.idle)
    }

    /// Decide a voluntary or preemptive switch. `None` means the current
    /// process keeps the CPU.
    pub fn schedule(&mut self) -> Option<SwitchPlan> {
        let from = self.current?;
        let to = self.select_next();
        if to == from {
            self.set_state(to, ProcessState::Running);
            return None;
        }
        if self.state_of(from) == Some(ProcessState::Running) {
            // Ready means queued, and idle never is.
            let parked = if from == self.idle {
                ProcessState::Suspended
            } else {
                ProcessState::Ready
            };
            self.set_state(from, parked);
        }
        self.need_resched = false;
        Some(self.switch_to(Some(from), to))
    }

    /// First dispatch. There is no outgoing context to save.
    pub fn start(&mut self) -> KernelResult<SwitchPlan> {
        if self.current.is_some() {
            return Err(KernelError::InvalidState);
        }
        let to = self.pop_front().ok_or(KernelError::NoRunnableProcess)?;
        Ok(self.switch_to(None, to))
    }

    fn switch_to(&mut self, from: Option<Pid>, to: Pid) -> SwitchPlan {
        self.set_state(to, ProcessState::Running);
        self.current = Some(to);
        self.stats.context_switches += 1;

        let from = from.and_then(|pid| {
            self.pcb_mut(pid)
                .map(|pcb| (pid, &mut pcb.context as *mut _))
        });
        let to_cx = self
            .pcb(to)
            .map_or(core::ptr::null(), |pcb| &pcb.context as *const _);
        SwitchPlan::new(from, (to, to_cx))
    }

    /// Timer hook. Returns true when the current process's quantum ran out
    /// and another process is waiting.
    pub fn tick(&mut self) -> bool {
        let Some(pid) = self.current else {
            return false;
        };
        let quantum = self.quantum;
        let others_ready = self.head.is_some();
        let Some(pcb) = self.pcb_mut(pid) else {
            return false;
        };

        pcb.total_time += 1;
        pcb.remaining_quantum = pcb.remaining_quantum.saturating_sub(1);
        if pcb.remaining_quantum > 0 {
            return false;
        }
        pcb.remaining_quantum = quantum;
        if others_ready {
            self.need_resched = true;
        }
        others_ready
    }

    /// Clear and return the pending preemption request.
    pub fn take_need_resched(&mut self) -> bool {
        core::mem::take(&mut self.need_resched)
    }

    /// Retire the running process: it becomes a zombie, loses its
    /// descriptor table and leaves the queue. The caller must switch away.
    pub fn exit_current(&mut self) -> KernelResult<Pid> {
        let pid = self.current.ok_or(KernelError::NotInitialized("scheduler"))?;
        if pid == self.idle {
            return Err(KernelError::InvalidState);
        }
        if let Some(pcb) = self.pcb_mut(pid) {
            pcb.state = ProcessState::Zombie;
            pcb.fd_table = None;
        }
        if !self.remove(pid) {
            self.stats.running_processes = self.stats.running_processes.saturating_sub(1);
        }
        Ok(pid)
    }

    /// Free exited processes other than the one whose stack is in use.
    pub fn reap_zombies(&mut self) -> usize {
        let current = self.current;
        let before = self.procs.len();
        self.procs
            .retain(|&pid, pcb| pcb.state != ProcessState::Zombie || Some(pid) == current);
        before - self.procs.len()
    }

    pub fn info(&self, pid: Pid) -> Option<ProcessInfo> {
        self.pcb(pid).map(ProcessControlBlock::info)
    }

    pub fn processes(&self) -> Vec<ProcessInfo> {
        self.procs.values().map(|pcb| pcb.info()).collect()
    }

    /// Ready queue from head to tail.
    pub fn ready_queue(&self) -> Vec<Pid> {
        let mut queue = Vec::new();
        let mut cursor = self.head;
        while let Some(pid) = cursor {
            if queue.len() > self.procs.len() {
                break;
            }
            queue.push(pid);
            cursor = self.pcb(pid).and_then(|pcb| pcb.next);
        }
        queue
    }
}

#[cfg(test)]
mod tests {
    use alloc::collections::BTreeSet;

    use super::*;
    use crate::fs::{STDERR, STDIN, STDOUT};

    extern "C" fn body() -> ! {
        loop {}
    }

    fn pcb(name: &'static str) -> Box<ProcessControlBlock> {
        ProcessControlBlock::new(body, name).unwrap()
    }

    fn scheduler(quantum: u64) -> Scheduler {
        Scheduler::new(pcb("idle"), quantum)
    }

    /// Ready-state PCBs must be exactly the queue contents.
    fn assert_queue_consistent(s: &Scheduler) {
        let queue = s.ready_queue();
        let unique: BTreeSet<Pid> = queue.iter().copied().collect();
        assert_eq!(unique.len(), queue.len(), "duplicate in ready queue");
        let ready: BTreeSet<Pid> = s
            .processes()
            .iter()
            .filter(|p| p.state == ProcessState::Ready)
            .map(|p| p.pid)
            .collect();
        assert_eq!(ready, unique);
        assert_eq!(s.tail, queue.last().copied());
        if let Some(current) = s.current() {
            assert!(!unique.contains(&current));
        }
    }

    #[test]
    fn admit_appends_in_order() {
        let mut s = scheduler(10);
        let a = s.admit(pcb("a"));
        let b = s.admit(pcb("b"));
        let c = s.admit(pcb("c"));
        assert_eq!(s.ready_queue(), vec![a, b, c]);
        assert_eq!(s.stats().total_processes, 3);
        assert_eq!(s.stats().running_processes, 3);
        assert_queue_consistent(&s);
    }

    #[test]
    fn remove_head_middle_tail_and_absent() {
        let mut s = scheduler(10);
        let pids: Vec<Pid> = ["a", "b", "c", "d", "e"].iter().map(|n| s.admit(pcb(n))).collect();

        assert!(s.remove(pids[2]));
        assert_eq!(s.ready_queue(), vec![pids[0], pids[1], pids[3], pids[4]]);
        assert_eq!(s.info(pids[2]).unwrap().state, ProcessState::Suspended);
        assert_queue_consistent(&s);
        assert!(s.remove(pids[0]));
        assert!(s.remove(pids[4]));
        assert_eq!(s.ready_queue(), vec![pids[1], pids[3]]);
        assert_eq!(s.tail, Some(pids[3]));

        let running = s.stats().running_processes;
        assert!(!s.remove(pids[0]));
        assert!(!s.remove(Pid(u64::MAX)));
        assert_eq!(s.stats().running_processes, running);

        // A removed process can be queued again at the tail.
        s.add(pids[0]).unwrap();
        assert_eq!(s.ready_queue(), vec![pids[1], pids[3], pids[0]]);
        assert_eq!(s.info(pids[0]).unwrap().state, ProcessState::Ready);
        assert_queue_consistent(&s);
    }

    #[test]
    fn add_rejects_bad_targets() {
        let mut s = scheduler(10);
        let a = s.admit(pcb("a"));
        assert_eq!(s.add(a), Err(KernelError::InvalidState));
        assert_eq!(s.add(s.idle_pid()), Err(KernelError::InvalidState));
        assert_eq!(s.add(Pid(u64::MAX)), Err(KernelError::UnknownProcess(Pid(u64::MAX))));
    }

    #[test]
    fn empty_queue_selects_idle() {
        let mut s = scheduler(10);
        assert_eq!(s.select_next(), s.idle_pid());
        assert!(matches!(s.start(), Err(KernelError::NoRunnableProcess)));
    }

    #[test]
    fn start_runs_the_head() {
        let mut s = scheduler(10);
        let a = s.admit(pcb("a"));
        let b = s.admit(pcb("b"));
        let plan = s.start().unwrap();
        assert_eq!(plan.from(), None);
        assert_eq!(plan.to(), a);
        assert_eq!(s.current(), Some(a));
        assert_eq!(s.info(a).unwrap().state, ProcessState::Running);
        assert_eq!(s.ready_queue(), vec![b]);
        assert_eq!(s.stats().context_switches, 1);
        assert!(matches!(s.start(), Err(KernelError::InvalidState)));
    }

    #[test]
    fn schedule_before_start_does_nothing() {
        let mut s = scheduler(10);
        s.admit(pcb("a"));
        assert!(s.schedule().is_none());
        assert_eq!(s.stats().context_switches, 0);
    }

    #[test]
    fn round_robin_visits_everyone_twice_in_order() {
        let mut s = scheduler(10);
        let pids: Vec<Pid> = ["a", "b", "c", "d"].iter().map(|n| s.admit(pcb(n))).collect();
        let n = pids.len();

        let mut order = vec![s.start().unwrap().to()];
        for _ in 1..2 * n {
            let plan = s.schedule().expect("another process is ready");
            assert_ne!(plan.to(), s.idle_pid());
            order.push(plan.to());
            assert_queue_consistent(&s);
        }

        assert_eq!(&order[..n], &pids[..]);
        assert_eq!(&order[n..], &pids[..]);
    }

    #[test]
    fn lone_process_keeps_running() {
        let quantum = 3;
        let mut s = scheduler(quantum);
        let a = s.admit(pcb("a"));
        let _ = s.start().unwrap();

        for _ in 0..10 * quantum {
            assert!(!s.tick());
            assert!(!s.take_need_resched());
        }
        assert!(s.schedule().is_none());
        assert_eq!(s.current(), Some(a));
        assert_eq!(s.info(a).unwrap().state, ProcessState::Running);
        assert_eq!(s.info(a).unwrap().total_time, 10 * quantum);
        assert_eq!(s.stats().context_switches, 1);
    }

    #[test]
    fn quantum_expiry_requests_preemption() {
        let mut s = scheduler(2);
        let a = s.admit(pcb("a"));
        s.admit(pcb("b"));
        let _ = s.start().unwrap();

        assert!(!s.tick());
        assert_eq!(s.info(a).unwrap().remaining_quantum, 1);
        assert!(s.tick());
        assert_eq!(s.info(a).unwrap().remaining_quantum, 2);
        assert!(s.take_need_resched());
        assert!(!s.take_need_resched());
    }

    #[test]
    fn quantum_scenario_counts_three_switches() {
        let mut s = scheduler(2);
        let a = s.admit(pcb("A"));
        let b = s.admit(pcb("B"));

        assert_eq!(s.start().unwrap().to(), a);

        assert!(!s.tick());
        assert!(s.tick());
        let plan = s.schedule().unwrap();
        assert_eq!((plan.from(), plan.to()), (Some(a), b));

        assert!(!s.tick());
        assert!(s.tick());
        let plan = s.schedule().unwrap();
        assert_eq!((plan.from(), plan.to()), (Some(b), a));

        assert_eq!(s.stats().context_switches, 3);
        assert_queue_consistent(&s);
    }

    #[test]
    fn exit_moves_to_idle_and_reaps() {
        let mut s = scheduler(10);
        let a = s.admit(pcb("a"));
        let _ = s.start().unwrap();

        assert_eq!(s.exit_current(), Ok(a));
        assert_eq!(s.info(a).unwrap().state, ProcessState::Zombie);
        assert_eq!(s.stats().running_processes, 0);

        // Still current until the switch away, so it is not reaped yet.
        assert_eq!(s.reap_zombies(), 0);
        let plan = s.schedule().unwrap();
        assert_eq!(plan.to(), s.idle_pid());
        assert_eq!(s.reap_zombies(), 1);
        assert!(s.info(a).is_none());
        assert_queue_consistent(&s);
    }

    #[test]
    fn descriptors_follow_the_running_process() {
        let mut s = scheduler(10);
        assert_eq!(s.current_descriptor(STDOUT), None);

        let _a = s.admit(pcb("a"));
        let _ = s.start().unwrap();
        assert!(s.current_descriptor(STDOUT).is_some_and(FileDescriptor::is_writable));
        assert!(s.current_descriptor(STDERR).is_some_and(FileDescriptor::is_writable));
        assert_eq!(s.current_descriptor(STDIN), Some(FileDescriptor::ConsoleIn));
        assert_eq!(s.current_descriptor(7), None);

        // The table goes away on exit, before the switch.
        s.exit_current().unwrap();
        assert_eq!(s.current_descriptor(STDOUT), None);
    }

    #[test]
    fn exited_process_is_never_requeued() {
        let mut s = scheduler(10);
        let a = s.admit(pcb("a"));
        let b = s.admit(pcb("b"));
        let _ = s.start().unwrap();
        s.exit_current().unwrap();

        let plan = s.schedule().unwrap();
        assert_eq!(plan.to(), b);
        assert!(s.schedule().is_none());
        assert!(!s.ready_queue().contains(&a));
        assert_eq!(s.add(a), Err(KernelError::InvalidState));
    }

    #[test]
    fn idle_gives_way_to_new_work() {
        let mut s = scheduler(10);
        let a = s.admit(pcb("a"));
        let _ = s.start().unwrap();
        s.exit_current().unwrap();
        assert_eq!(s.schedule().unwrap().to(), s.idle_pid());

        // Idle yielding with nothing queued stays put.
        assert!(s.schedule().is_none());

        let b = s.admit(pcb("b"));
        let plan = s.schedule().unwrap();
        assert_eq!(plan.to(), b);
        assert!(s.ready_queue().is_empty());
        assert_ne!(a, b);
        assert_eq!(s.info(s.idle_pid()).unwrap().state, ProcessState::Suspended);
        assert_queue_consistent(&s);
    }

    #[test]
    fn idle_is_never_ready() {
        let mut s = scheduler(10);
        let idle = s.idle_pid();
        assert_eq!(s.info(idle).unwrap().state, ProcessState::Suspended);
        assert_queue_consistent(&s);

        let _ = s.admit(pcb("a"));
        let _ = s.start().unwrap();
        s.exit_current().unwrap();
        let _ = s.schedule().unwrap();
        assert_eq!(s.info(idle).unwrap().state, ProcessState::Running);
        assert_queue_consistent(&s);

        let _ = s.admit(pcb("b"));
        let _ = s.schedule().unwrap();
        assert_ne!(s.info(idle).unwrap().state, ProcessState::Ready);
        assert_queue_consistent(&s);
        assert_eq!(s.add(idle), Err(KernelError::InvalidState));
    }

    #[test]
    fn idle_cannot_exit() {
        let mut s = scheduler(10);
        let _ = s.admit(pcb("a"));
        let _ = s.start().unwrap();
        s.exit_current().unwrap();
        let _ = s.schedule().unwrap();
        assert_eq!(s.exit_current(), Err(KernelError::InvalidState));
    }

    #[test]
    fn queue_stays_consistent_under_mixed_operations() {
        let mut s = scheduler(2);
        let mut pids = Vec::new();
        for name in ["a", "b", "c", "d", "e", "f"] {
            pids.push(s.admit(pcb(name)));
        }
        let _ = s.start().unwrap();
        assert_queue_consistent(&s);

        // Deterministic pseudo-random walk over the operations.
        let mut seed = 0x2545_f491_u32;
        for _ in 0..200 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let pid = pids[seed as usize % pids.len()];
            match seed % 4 {
                0 => {
                    s.remove(pid);
                }
                1 => {
                    let _ = s.add(pid);
                }
                2 => {
                    let _ = s.schedule();
                }
                _ => {
                    if s.tick() {
                        let _ = s.schedule();
                    }
                }
            }
            assert_queue_consistent(&s);
        }
    }
}
