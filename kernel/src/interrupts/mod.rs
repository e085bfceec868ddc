//! Interrupt lines: handler table, GIC programming and the IRQ path.

pub mod gic;

use log::{error, info, warn};

use crate::config::{GICC_BASE, GICD_BASE, MAX_IRQ};
use crate::error::{KernelError, KernelResult};
use crate::sync::IrqMutex;
use crate::{arch, system, task, trap};
use gic::{Gic, GicRegisters, MmioGic};

/// Handler for one interrupt line. Runs with IRQs masked.
pub type IrqHandler = fn();

/// Result of claiming an interrupt from the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledged {
    /// Nothing valid pending; there is nothing to complete.
    Spurious(u32),
    /// `line` is now in service and must be completed exactly once.
    Line { line: u32, handler: Option<IrqHandler> },
}

pub struct InterruptController<R> {
    gic: Gic<R>,
    handlers: [Option<IrqHandler>; MAX_IRQ],
}

impl<R: GicRegisters> InterruptController<R> {
    pub fn new(regs: R) -> Self {
        Self {
            gic: Gic::new(regs),
            handlers: [None; MAX_IRQ],
        }
    }

    pub fn init(&mut self) {
        self.handlers = [None; MAX_IRQ];
        self.gic.init();
    }

    pub fn gic(&self) -> &Gic<R> {
        &self.gic
    }

    pub fn gic_mut(&mut self) -> &mut Gic<R> {
        &mut self.gic
    }

    pub fn register(&mut self, line: u32, handler: IrqHandler) -> KernelResult<()> {
        let slot = self.slot(line)?;
        *slot = Some(handler);
        Ok(())
    }

    /// Clearing a line that has no handler is fine.
    pub fn unregister(&mut self, line: u32) -> KernelResult<()> {
        let slot = self.slot(line)?;
        *slot = None;
        Ok(())
    }

    pub fn handler(&self, line: u32) -> Option<IrqHandler> {
        self.handlers.get(line as usize).copied().flatten()
    }

    fn slot(&mut self, line: u32) -> KernelResult<&mut Option<IrqHandler>> {
        match self.handlers.get_mut(line as usize) {
            Some(slot) => Ok(slot),
            None => {
                error!("[irq] invalid IRQ number {}", line);
                Err(KernelError::InvalidIrq(line))
            }
        }
    }

    pub fn acknowledge(&mut self) -> Acknowledged {
        let line = self.gic.acknowledge();
        if line as usize >= MAX_IRQ {
            return Acknowledged::Spurious(line);
        }
        Acknowledged::Line {
            line,
            handler: self.handler(line),
        }
    }

    pub fn complete(&mut self, line: u32) {
        self.gic.end_of_interrupt(line);
    }

}

fn run_handler(line: u32, handler: Option<IrqHandler>) {
    match handler {
        Some(handler) => handler(),
        None => warn!("[irq] unhandled IRQ {}", line),
    }
}

/// Install the vectors and bring up the GIC. IRQs stay masked.
pub fn init() -> InterruptController<MmioGic> {
    arch::disable_irqs();
    trap::init();
    let mut controller = InterruptController::new(unsafe { MmioGic::new(GICD_BASE, GICC_BASE) });
    controller.init();
    info!(
        "[irq] GICv2 ready, {} lines",
        controller.gic().line_count()
    );
    controller
}

/// Unmask IRQs at the CPU. Calling it again changes nothing.
pub fn enable() {
    arch::enable_irqs();
}

pub fn disable() {
    arch::disable_irqs();
}

pub fn register_handler(line: u32, handler: IrqHandler) -> KernelResult<()> {
    system::try_get()?.interrupts.lock().register(line, handler)
}

pub fn unregister_handler(line: u32) -> KernelResult<()> {
    system::try_get()?.interrupts.lock().unregister(line)
}

/// Claim, run and complete one interrupt, then call `preempt`.
///
/// The controller lock is not held while the handler runs, so handlers may
/// use the controller themselves. A spurious ID gets no end-of-interrupt; a
/// valid line is completed even without a handler. `preempt` runs only after
/// completion, so a switch never leaves the line in service.
pub fn dispatch_irq<R, F>(controller: &IrqMutex<InterruptController<R>>, preempt: F) -> Option<u32>
where
    R: GicRegisters,
    F: FnOnce(),
{
    let acknowledged = controller.lock().acknowledge();
    let serviced = match acknowledged {
        Acknowledged::Spurious(_) => None,
        Acknowledged::Line { line, handler } => {
            run_handler(line, handler);
            controller.lock().complete(line);
            Some(line)
        }
    };
    preempt();
    serviced
}

/// IRQ vector body.
pub fn handle_irq() {
    let Some(system) = system::get() else {
        warn!("[irq] interrupt before the system was installed");
        return;
    };
    dispatch_irq(&system.interrupts, task::preempt_if_needed);
}
