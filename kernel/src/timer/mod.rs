//! Periodic tick from the generic timer.
//!
//! The timer fires [`TIMER_HZ`] times a second whatever the counter
//! frequency is; each firing re-arms the countdown, bumps the tick count
//! and hands control to the scheduler's tick hook.

mod generic;

pub use generic::GenericTimer;

use bitflags::bitflags;
use log::{debug, info};

use crate::config::{TIMER_HZ, TIMER_IRQ};
use crate::error::{KernelError, KernelResult};
use crate::interrupts::gic::{priority, GicRegisters};
use crate::interrupts::{InterruptController, IrqHandler};
use crate::{system, task};

bitflags! {
    /// CNTP_CTL_EL0
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TimerControl: u64 {
        const ENABLE = 1 << 0;
        const IMASK = 1 << 1;
        /// Condition met (read-only)
        const ISTATUS = 1 << 2;
    }
}

/// The counter/countdown pair behind the tick.
pub trait CounterHardware {
    /// Counter frequency in Hz.
    fn frequency(&self) -> u64;
    /// Free-running counter value.
    fn counter(&self) -> u64;
    /// Load the countdown; the line fires when it reaches zero.
    fn set_interval(&mut self, ticks: u64);
    fn set_control(&mut self, control: TimerControl);
    fn control(&self) -> TimerControl;
}

pub struct SystemTimer<H> {
    hw: H,
    ticks: u64,
    frequency: u64,
    interval: u64,
    running: bool,
}

impl<H: CounterHardware> SystemTimer<H> {
    pub const fn new(hw: H) -> Self {
        Self {
            hw,
            ticks: 0,
            frequency: 0,
            interval: 0,
            running: false,
        }
    }

    /// Program the countdown and claim the timer line, leaving the timer
    /// stopped.
    pub fn init<R: GicRegisters>(
        &mut self,
        irqs: &mut InterruptController<R>,
        handler: IrqHandler,
    ) -> KernelResult<()> {
        let frequency = self.hw.frequency();
        let interval = frequency / TIMER_HZ;
        if interval == 0 {
            return Err(KernelError::BadFrequency(frequency));
        }

        self.hw.set_control(TimerControl::empty());
        self.hw.set_interval(interval);

        irqs.register(TIMER_IRQ, handler)?;
        irqs.gic_mut().set_priority(TIMER_IRQ, priority::HIGH)?;
        irqs.gic_mut().enable(TIMER_IRQ)?;

        self.frequency = frequency;
        self.interval = interval;
        self.ticks = 0;
        self.running = false;
        Ok(())
    }

    /// Must follow [`SystemTimer::init`] and the global IRQ unmask.
    pub fn start(&mut self) -> KernelResult<()> {
        if self.interval == 0 {
            return Err(KernelError::NotInitialized("timer"));
        }
        self.hw.set_interval(self.interval);
        self.hw.set_control(TimerControl::ENABLE);
        self.running = true;
        Ok(())
    }

    /// Account one firing and re-arm. Returns the new tick count.
    pub fn on_fire(&mut self) -> u64 {
        self.ticks += 1;
        self.hw.set_interval(self.interval);
        self.ticks
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn uptime_ms(&self) -> u64 {
        self.ticks * 1000 / TIMER_HZ
    }

    pub fn uptime_sec(&self) -> u64 {
        self.ticks / TIMER_HZ
    }

    /// Counter frequency, or 0 before [`SystemTimer::init`].
    pub fn frequency(&self) -> u64 {
        self.frequency
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn hardware(&self) -> &H {
        &self.hw
    }
}

/// Spin on the raw counter for `ms` milliseconds.
pub fn busy_wait_ms<H: CounterHardware>(hw: &H, frequency: u64, ms: u64) {
    let wait = frequency / 1000 * ms;
    let start = hw.counter();
    while hw.counter().wrapping_sub(start) < wait {
        core::hint::spin_loop();
    }
}

/// Set up the EL1 physical timer on its PPI.
pub fn init<R: GicRegisters>(
    irqs: &mut InterruptController<R>,
) -> KernelResult<SystemTimer<GenericTimer>> {
    let mut timer = SystemTimer::new(GenericTimer);
    timer.init(irqs, handle_timer_irq)?;
    info!(
        "[timer] {} Hz counter, {} Hz tick, interval {}",
        timer.frequency(),
        TIMER_HZ,
        timer.interval()
    );
    Ok(timer)
}

pub fn start() -> KernelResult<()> {
    system::try_get()?.timer.lock().start()?;
    info!("[timer] started");
    Ok(())
}

pub fn ticks() -> u64 {
    system::get().map_or(0, |s| s.timer.lock().ticks())
}

pub fn uptime_ms() -> u64 {
    system::get().map_or(0, |s| s.timer.lock().uptime_ms())
}

pub fn uptime_sec() -> u64 {
    system::get().map_or(0, |s| s.timer.lock().uptime_sec())
}

pub fn frequency() -> u64 {
    system::get().map_or_else(|| GenericTimer.frequency(), |s| s.timer.lock().frequency())
}

/// Busy-wait without holding the timer lock, so ticks keep counting.
pub fn delay_ms(ms: u64) {
    busy_wait_ms(&GenericTimer, frequency(), ms);
}

fn handle_timer_irq() {
    let Some(system) = system::get() else {
        return;
    };
    let ticks = system.timer.lock().on_fire();
    if ticks % TIMER_HZ == 0 {
        debug!("[timer] uptime {}s", ticks / TIMER_HZ);
    }
    task::scheduler_tick();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCounter, FakeGic};

    const QEMU_FREQ: u64 = 62_500_000;

    fn noop() {}

    fn setup() -> (SystemTimer<FakeCounter>, InterruptController<FakeGic>) {
        let mut irqs = InterruptController::new(FakeGic::new(64));
        irqs.init();
        let mut timer = SystemTimer::new(FakeCounter::new(QEMU_FREQ));
        timer.init(&mut irqs, noop).unwrap();
        (timer, irqs)
    }

    #[test]
    fn init_programs_but_does_not_start() {
        let (timer, irqs) = setup();
        assert_eq!(timer.interval(), QEMU_FREQ / 100);
        assert_eq!(timer.frequency(), QEMU_FREQ);
        assert_eq!(timer.hardware().control, TimerControl::empty());
        assert_eq!(timer.hardware().intervals, vec![625_000]);
        assert!(!timer.is_running());

        assert!(irqs.handler(TIMER_IRQ).is_some());
        assert!(irqs.gic().is_enabled(TIMER_IRQ));
        assert_eq!(irqs.gic().priority(TIMER_IRQ), Some(priority::HIGH));
        assert_eq!(irqs.gic().priority(TIMER_IRQ + 1), Some(priority::DEFAULT));
    }

    #[test]
    fn start_enables_countdown() {
        let (mut timer, _irqs) = setup();
        timer.start().unwrap();
        assert!(timer.is_running());
        assert_eq!(timer.hardware().control, TimerControl::ENABLE);
    }

    #[test]
    fn start_before_init_fails() {
        let mut timer = SystemTimer::new(FakeCounter::new(QEMU_FREQ));
        assert_eq!(timer.start(), Err(KernelError::NotInitialized("timer")));
    }

    #[test]
    fn slow_counter_is_rejected() {
        let mut irqs = InterruptController::new(FakeGic::new(64));
        irqs.init();
        let mut timer = SystemTimer::new(FakeCounter::new(50));
        assert_eq!(timer.init(&mut irqs, noop), Err(KernelError::BadFrequency(50)));
        assert!(irqs.handler(TIMER_IRQ).is_none());
    }

    #[test]
    fn each_fire_rearms_and_counts() {
        let (mut timer, _irqs) = setup();
        timer.start().unwrap();
        for expected in 1..=3 {
            assert_eq!(timer.on_fire(), expected);
        }
        // init, start, then one reload per fire
        assert_eq!(timer.hardware().intervals, vec![625_000; 5]);
    }

    #[test]
    fn uptime_is_derived_from_ticks() {
        let (mut timer, _irqs) = setup();
        for _ in 0..250 {
            timer.on_fire();
        }
        assert_eq!(timer.ticks(), 250);
        assert_eq!(timer.uptime_ms(), 2500);
        assert_eq!(timer.uptime_sec(), 2);
    }

    #[test]
    fn busy_wait_reads_the_counter() {
        let mut counter = FakeCounter::new(1_000_000);
        counter.step = 100;
        busy_wait_ms(&counter, 1_000_000, 3);
        // 3 ms at 1 MHz is 3000 counts; the loop stops on the first read
        // at least that far from the start.
        assert_eq!(counter.now.get(), 3100);
    }
}
