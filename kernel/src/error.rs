//! Kernel error type

use core::fmt;

use crate::task::Pid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// The heap could not satisfy an allocation
    OutOfMemory,
    /// Interrupt line outside the controller's range
    InvalidIrq(u32),
    /// The scheduler was started with nothing to run
    NoRunnableProcess,
    /// A subsystem was used before it was brought up
    NotInitialized(&'static str),
    UnknownProcess(Pid),
    /// The operation does not apply to the object's current state
    InvalidState,
    /// The counter reported a frequency too low for the tick rate
    BadFrequency(u64),
}

pub type KernelResult<T> = Result<T, KernelError>;

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory => write!(f, "out of memory"),
            Self::InvalidIrq(line) => write!(f, "invalid interrupt line {}", line),
            Self::NoRunnableProcess => write!(f, "no runnable process"),
            Self::NotInitialized(what) => write!(f, "{} is not initialized", what),
            Self::UnknownProcess(pid) => write!(f, "no process with pid {}", pid),
            Self::InvalidState => write!(f, "operation invalid in current state"),
            Self::BadFrequency(hz) => write!(f, "unusable counter frequency {} Hz", hz),
        }
    }
}
