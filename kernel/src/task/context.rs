//! Process Context
//!
//! Callee-saved state carried across `__switch`. Trap state lives in the
//! trap frame on the process's own stack, not here.

/// Entry point of a kernel process.
pub type ProcessEntry = extern "C" fn() -> !;

/// Field order matches the stores in `switch.S`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessContext {
    /// x19..=x28
    pub callee_saved: [u64; 10],
    /// x29
    pub fp: u64,
    /// x30; where `__switch` returns to
    pub lr: u64,
    pub sp: u64,
    /// Interrupt mask to resume with
    pub daif: u64,
}

const _: () = assert!(core::mem::size_of::<ProcessContext>() == 112);

impl ProcessContext {
    /// Create a zero-initialized context
    pub const fn zero_init() -> Self {
        Self {
            callee_saved: [0; 10],
            fp: 0,
            lr: 0,
            sp: 0,
            daif: 0,
        }
    }

    /// A context that looks as if the process had switched out right
    /// before its first instruction: restoring it returns into `entry` on
    /// an empty, 16-byte aligned stack with interrupts unmasked.
    pub fn new_process(entry: ProcessEntry, stack_top: usize) -> Self {
        let sp = (stack_top & !0xF) as u64;
        Self {
            callee_saved: [0; 10],
            fp: sp,
            lr: entry as usize as u64,
            sp,
            daif: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn entry() -> ! {
        loop {}
    }

    #[test]
    fn synthetic_context_returns_into_entry() {
        let cx = ProcessContext::new_process(entry, 0x4010_0008);
        assert_eq!(cx.lr, entry as usize as u64);
        assert_eq!(cx.sp, 0x4010_0000);
        assert_eq!(cx.fp, cx.sp);
        assert_eq!(cx.callee_saved, [0; 10]);
        assert_eq!(cx.daif, 0);
    }

    #[test]
    fn layout_matches_switch_code() {
        let cx = ProcessContext::zero_init();
        let base = &cx as *const ProcessContext as usize;
        assert_eq!(&cx.fp as *const u64 as usize - base, 80);
        assert_eq!(&cx.lr as *const u64 as usize - base, 88);
        assert_eq!(&cx.sp as *const u64 as usize - base, 96);
        assert_eq!(&cx.daif as *const u64 as usize - base, 104);
    }
}
