//! In-memory hardware models for unit tests.

use alloc::vec;
use alloc::vec::Vec;
use core::cell::Cell;

use crate::interrupts::gic::{
    GicRegisters, CTLR_ACK_CTL, CTLR_ENABLE_GRP0, CTLR_ENABLE_GRP1, GROUP1_PENDING_INTID,
    SPURIOUS_INTID,
};
use crate::timer::{CounterHardware, TimerControl};

/// GICv2 register model with a pending list and an in-service set.
///
/// Acknowledge follows a GICv2 without security extensions: a line is
/// delivered only if its group is enabled at both the distributor and the
/// CPU interface, and a group 1 line reads as 1022 unless AckCtl is set.
pub struct FakeGic {
    pub typer: u32,
    pub distributor_control: u32,
    pub cpu_control: u32,
    pub priority_mask: u32,
    pub binary_point: u32,
    pub group: Vec<u32>,
    pub enabled: Vec<u32>,
    pub priority: Vec<u32>,
    pub targets: Vec<u32>,
    pub config: Vec<u32>,
    pub sgi_writes: Vec<u32>,
    pub pending: Vec<u32>,
    pub in_service: Vec<u32>,
}

impl FakeGic {
    /// `lines` must be a multiple of 32.
    pub fn new(lines: usize) -> Self {
        Self {
            typer: (lines / 32 - 1) as u32,
            distributor_control: 0,
            cpu_control: 0,
            priority_mask: 0,
            binary_point: 7,
            group: vec![0; lines / 32],
            enabled: vec![0; lines / 32],
            priority: vec![0; lines / 4],
            targets: vec![0; lines / 4],
            config: vec![0xAAAA_AAAA; lines / 16],
            sgi_writes: Vec::new(),
            pending: Vec::new(),
            in_service: Vec::new(),
        }
    }

    /// Assert a line; it is delivered once enabled and not in service.
    pub fn raise(&mut self, line: u32) {
        if !self.pending.contains(&line) {
            self.pending.push(line);
        }
    }

    fn is_enabled(&self, line: u32) -> bool {
        self.enabled[line as usize / 32] & (1 << (line % 32)) != 0
    }

    fn is_group1(&self, line: u32) -> bool {
        self.group[line as usize / 32] & (1 << (line % 32)) != 0
    }

    fn group_enabled(&self, line: u32) -> bool {
        let bit = if self.is_group1(line) {
            CTLR_ENABLE_GRP1
        } else {
            CTLR_ENABLE_GRP0
        };
        self.distributor_control & bit != 0 && self.cpu_control & bit != 0
    }
}

impl GicRegisters for FakeGic {
    fn typer(&self) -> u32 {
        self.typer
    }

    fn write_distributor_control(&mut self, value: u32) {
        self.distributor_control = value;
    }

    fn write_group(&mut self, index: usize, value: u32) {
        self.group[index] = value;
    }

    fn write_set_enable(&mut self, index: usize, mask: u32) {
        self.enabled[index] |= mask;
    }

    fn write_clear_enable(&mut self, index: usize, mask: u32) {
        self.enabled[index] &= !mask;
    }

    fn read_enable(&self, index: usize) -> u32 {
        self.enabled[index]
    }

    fn read_priority(&self, index: usize) -> u32 {
        self.priority[index]
    }

    fn write_priority(&mut self, index: usize, value: u32) {
        self.priority[index] = value;
    }

    fn write_targets(&mut self, index: usize, value: u32) {
        self.targets[index] = value;
    }

    fn write_config(&mut self, index: usize, value: u32) {
        self.config[index] = value;
    }

    fn write_sgi(&mut self, value: u32) {
        self.sgi_writes.push(value);
    }

    fn write_cpu_control(&mut self, value: u32) {
        self.cpu_control = value;
    }

    fn write_priority_mask(&mut self, value: u32) {
        self.priority_mask = value;
    }

    fn write_binary_point(&mut self, value: u32) {
        self.binary_point = value;
    }

    fn read_acknowledge(&mut self) -> u32 {
        let next = self
            .pending
            .iter()
            .position(|&line| {
                self.is_enabled(line) && self.group_enabled(line) && !self.in_service.contains(&line)
            });
        match next {
            Some(index) if self.is_group1(self.pending[index]) && self.cpu_control & CTLR_ACK_CTL == 0 => {
                GROUP1_PENDING_INTID
            }
            Some(index) => {
                let line = self.pending.remove(index);
                self.in_service.push(line);
                line
            }
            None => SPURIOUS_INTID,
        }
    }

    fn write_end_of_interrupt(&mut self, value: u32) {
        match self.in_service.iter().position(|&line| line == value) {
            Some(index) => {
                self.in_service.remove(index);
            }
            None => panic!("end of interrupt for line {} which is not in service", value),
        }
    }
}

/// Generic timer model. Every counter read advances time by `step`.
pub struct FakeCounter {
    pub frequency: u64,
    pub now: Cell<u64>,
    pub step: u64,
    pub intervals: Vec<u64>,
    pub control: TimerControl,
}

impl FakeCounter {
    pub fn new(frequency: u64) -> Self {
        Self {
            frequency,
            now: Cell::new(0),
            step: 1,
            intervals: Vec::new(),
            control: TimerControl::ENABLE,
        }
    }
}

impl CounterHardware for FakeCounter {
    fn frequency(&self) -> u64 {
        self.frequency
    }

    fn counter(&self) -> u64 {
        let now = self.now.get();
        self.now.set(now + self.step);
        now
    }

    fn set_interval(&mut self, ticks: u64) {
        self.intervals.push(ticks);
    }

    fn set_control(&mut self, control: TimerControl) {
        self.control = control;
    }

    fn control(&self) -> TimerControl {
        self.control
    }
}
