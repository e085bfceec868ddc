//! EL1 physical timer (CNTP_*) of the ARM generic timer.

use aarch64_cpu::registers::{CNTFRQ_EL0, CNTPCT_EL0, CNTP_CTL_EL0, CNTP_TVAL_EL0};
use tock_registers::interfaces::{Readable, Writeable};

use super::{CounterHardware, TimerControl};

#[derive(Debug, Default, Clone, Copy)]
pub struct GenericTimer;

impl CounterHardware for GenericTimer {
    fn frequency(&self) -> u64 {
        CNTFRQ_EL0.get()
    }

    fn counter(&self) -> u64 {
        CNTPCT_EL0.get()
    }

    fn set_interval(&mut self, ticks: u64) {
        CNTP_TVAL_EL0.set(ticks);
    }

    fn set_control(&mut self, control: TimerControl) {
        CNTP_CTL_EL0.set(control.bits());
    }

    fn control(&self) -> TimerControl {
        TimerControl::from_bits_truncate(CNTP_CTL_EL0.get())
    }
}
