//! Exception entry and dispatch.
//!
//! `vectors.S` funnels all sixteen vector entries into
//! [`handle_exception`] with the entry's (source, kind) tag and a pointer to
//! the saved [`TrapFrame`]. Supervisor calls become syscalls, IRQs go to the
//! interrupt layer, everything else is fatal.

pub mod context;
pub mod syndrome;

pub use context::{TrapFrame, TRAP_FRAME_SIZE};
pub use syndrome::Syndrome;

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use log::{error, warn};

use crate::{arch, interrupts, syscall};

/// Where the trap came from; the first index into the vector table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionSource {
    CurrentElSp0 = 0,
    CurrentElSpx = 1,
    LowerElAarch64 = 2,
    LowerElAarch32 = 3,
}

/// What kind of exception; the second index into the vector table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind {
    Synchronous = 0,
    Irq = 1,
    Fiq = 2,
    SError = 3,
}

impl ExceptionSource {
    pub const ALL: [Self; 4] = [
        Self::CurrentElSp0,
        Self::CurrentElSpx,
        Self::LowerElAarch64,
        Self::LowerElAarch32,
    ];

    pub fn from_raw(raw: u64) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }
}

impl ExceptionKind {
    pub const ALL: [Self; 4] = [Self::Synchronous, Self::Irq, Self::Fiq, Self::SError];

    pub fn from_raw(raw: u64) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }
}

impl fmt::Display for ExceptionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CurrentElSp0 => "current EL, SP0",
            Self::CurrentElSpx => "current EL, SPx",
            Self::LowerElAarch64 => "lower EL, AArch64",
            Self::LowerElAarch32 => "lower EL, AArch32",
        })
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Synchronous => "Synchronous",
            Self::Irq => "IRQ",
            Self::Fiq => "FIQ",
            Self::SError => "SError",
        })
    }
}

/// Byte offset of a vector entry from VBAR_EL1.
pub const fn vector_offset(source: ExceptionSource, kind: ExceptionKind) -> usize {
    (source as usize * 4 + kind as usize) * 0x80
}

/// One counter per vector entry. Never reset.
pub struct ExceptionStats {
    counters: [AtomicU64; 16],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExceptionTotals {
    pub synchronous: u64,
    pub irq: u64,
    pub fiq: u64,
    pub serror: u64,
}

impl ExceptionStats {
    pub const fn new() -> Self {
        Self {
            counters: [const { AtomicU64::new(0) }; 16],
        }
    }

    fn slot(source: ExceptionSource, kind: ExceptionKind) -> usize {
        source as usize * 4 + kind as usize
    }

    pub fn record(&self, source: ExceptionSource, kind: ExceptionKind) {
        self.counters[Self::slot(source, kind)].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self, source: ExceptionSource, kind: ExceptionKind) -> u64 {
        self.counters[Self::slot(source, kind)].load(Ordering::Relaxed)
    }

    pub fn totals(&self) -> ExceptionTotals {
        let mut totals = ExceptionTotals::default();
        for source in ExceptionSource::ALL {
            totals.synchronous += self.count(source, ExceptionKind::Synchronous);
            totals.irq += self.count(source, ExceptionKind::Irq);
            totals.fiq += self.count(source, ExceptionKind::Fiq);
            totals.serror += self.count(source, ExceptionKind::SError);
        }
        totals
    }
}

static STATS: ExceptionStats = ExceptionStats::new();

pub fn stats() -> &'static ExceptionStats {
    &STATS
}

/// Install the vector table.
pub fn init() {
    arch::install_vectors();
    log::info!("[trap] vector table installed");
}

/// Called from `vectors.S` for every trap, with IRQs masked.
#[no_mangle]
pub extern "C" fn handle_exception(source: u64, kind: u64, frame: &mut TrapFrame) {
    let (Some(source), Some(kind)) = (ExceptionSource::from_raw(source), ExceptionKind::from_raw(kind))
    else {
        error!("[trap] bad vector tag source={} kind={}", source, kind);
        arch::halt();
    };
    STATS.record(source, kind);

    match kind {
        ExceptionKind::Synchronous => {
            let syndrome = Syndrome::new(arch::read_esr());
            if syndrome.is_supervisor_call() {
                service_call(frame, syscall::dispatch);
            } else {
                fatal(source, kind, frame, syndrome, arch::read_far());
            }
        }
        ExceptionKind::Irq => interrupts::handle_irq(),
        // Group 0 is signalled as IRQ (FIQEn clear), so a FIQ is never expected.
        ExceptionKind::Fiq => warn!("[trap] unexpected FIQ from {}", source),
        ExceptionKind::SError => {
            fatal(source, kind, frame, Syndrome::new(arch::read_esr()), arch::read_far())
        }
    }
}

/// Run a supervisor call against the saved registers: number from `x8`,
/// arguments from `x0..x5`, result back into `x0`.
pub fn service_call<F>(frame: &mut TrapFrame, dispatch: F)
where
    F: FnOnce(u64, [u64; 6]) -> u64,
{
    let result = dispatch(frame.syscall_number(), frame.syscall_args());
    frame.set_return_value(result);
}

/// Print everything known about the trap and park the core.
pub fn fatal(
    source: ExceptionSource,
    kind: ExceptionKind,
    frame: &TrapFrame,
    syndrome: Syndrome,
    far: u64,
) -> ! {
    error!("========== UNHANDLED EXCEPTION ==========");
    error!("type:   {}", kind);
    error!("source: {}", source);
    error!("class:  {:#04x} ({})", syndrome.class(), syndrome.class_name());
    error!("PC:     {:#018x}", frame.pc());
    error!("SP:     {:#018x}", frame.sp);
    error!("ESR:    {:#018x}", syndrome.raw());
    error!("FAR:    {:#018x}", far);
    error!("PSTATE: {:#010x}", frame.spsr);
    error!("registers:\n{:?}", frame);
    error!("system halted");
    arch::halt()
}
