//! The unsafe edge of a context switch.
//!
//! The scheduler decides under its lock and hands back a [`SwitchPlan`];
//! the caller drops the lock and then executes the plan.

use super::{Pid, ProcessContext};
use crate::arch;

#[must_use]
pub struct SwitchPlan {
    from: Option<(Pid, *mut ProcessContext)>,
    to: (Pid, *const ProcessContext),
}

impl SwitchPlan {
    pub(super) fn new(
        from: Option<(Pid, *mut ProcessContext)>,
        to: (Pid, *const ProcessContext),
    ) -> Self {
        Self { from, to }
    }

    pub fn from(&self) -> Option<Pid> {
        self.from.map(|(pid, _)| pid)
    }

    pub fn to(&self) -> Pid {
        self.to.0
    }

    /// Save into the outgoing context and resume the incoming one. Returns
    /// once something switches back to the outgoing process; without an
    /// outgoing process it never returns.
    ///
    /// # Safety
    /// IRQs must be masked and the scheduler lock released. Both PCBs must
    /// stay alive until the switch completes, which the scheduler ensures
    /// by reaping zombies only from a different stack.
    pub unsafe fn execute(self) {
        match self.from {
            Some((_, from_cx)) => arch::context_switch(from_cx, self.to.1),
            None => arch::restore_context(self.to.1),
        }
    }
}
