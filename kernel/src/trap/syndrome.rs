//! ESR_EL1 decoding

/// Exception class values
pub mod ec {
    pub const UNKNOWN: u8 = 0x00;
    pub const WFI_WFE: u8 = 0x01;
    pub const SIMD_FP: u8 = 0x07;
    pub const ILLEGAL_EXECUTION: u8 = 0x0E;
    pub const SVC_AARCH32: u8 = 0x11;
    pub const SVC_AARCH64: u8 = 0x15;
    pub const HVC_AARCH64: u8 = 0x16;
    pub const SMC_AARCH64: u8 = 0x17;
    pub const SYS_INSTRUCTION: u8 = 0x18;
    pub const INSTRUCTION_ABORT_LOWER: u8 = 0x20;
    pub const INSTRUCTION_ABORT_SAME: u8 = 0x21;
    pub const PC_ALIGNMENT: u8 = 0x22;
    pub const DATA_ABORT_LOWER: u8 = 0x24;
    pub const DATA_ABORT_SAME: u8 = 0x25;
    pub const SP_ALIGNMENT: u8 = 0x26;
    pub const SERROR: u8 = 0x2F;
    pub const BREAKPOINT_LOWER: u8 = 0x30;
    pub const BREAKPOINT_SAME: u8 = 0x31;
    pub const BRK_AARCH64: u8 = 0x3C;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Syndrome(u64);

impl Syndrome {
    pub const fn new(esr: u64) -> Self {
        Self(esr)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }

    pub const fn class(&self) -> u8 {
        ((self.0 >> 26) & 0x3F) as u8
    }

    pub const fn iss(&self) -> u32 {
        (self.0 & 0x1FF_FFFF) as u32
    }

    /// `svc` executed in AArch64 state. The return address in ELR already
    /// points past the instruction.
    pub const fn is_supervisor_call(&self) -> bool {
        self.class() == ec::SVC_AARCH64
    }

    pub fn class_name(&self) -> &'static str {
        match self.class() {
            ec::UNKNOWN => "Unknown reason",
            ec::WFI_WFE => "WFI/WFE trapped",
            ec::SIMD_FP => "SIMD/FP access",
            ec::ILLEGAL_EXECUTION => "Illegal execution state",
            ec::SVC_AARCH32 => "SVC (AArch32)",
            ec::SVC_AARCH64 => "SVC (AArch64)",
            ec::HVC_AARCH64 => "HVC (AArch64)",
            ec::SMC_AARCH64 => "SMC (AArch64)",
            ec::SYS_INSTRUCTION => "MSR/MRS/SYS trapped",
            ec::INSTRUCTION_ABORT_LOWER => "Instruction abort (lower EL)",
            ec::INSTRUCTION_ABORT_SAME => "Instruction abort (same EL)",
            ec::PC_ALIGNMENT => "PC alignment fault",
            ec::DATA_ABORT_LOWER => "Data abort (lower EL)",
            ec::DATA_ABORT_SAME => "Data abort (same EL)",
            ec::SP_ALIGNMENT => "SP alignment fault",
            ec::SERROR => "SError",
            ec::BREAKPOINT_LOWER => "Breakpoint (lower EL)",
            ec::BREAKPOINT_SAME => "Breakpoint (same EL)",
            ec::BRK_AARCH64 => "BRK (AArch64)",
            _ => "Reserved",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn svc_is_recognised() {
        // EC=0x15, IL=1, imm16=0
        let esr = Syndrome::new(0x5600_0000);
        assert_eq!(esr.class(), ec::SVC_AARCH64);
        assert!(esr.is_supervisor_call());
        assert_eq!(esr.class_name(), "SVC (AArch64)");
    }

    #[test]
    fn data_abort_is_not_a_call() {
        let esr = Syndrome::new(((ec::DATA_ABORT_SAME as u64) << 26) | (1 << 25) | 0x45);
        assert!(!esr.is_supervisor_call());
        assert_eq!(esr.iss(), 0x45);
        assert_eq!(esr.class_name(), "Data abort (same EL)");
    }

    #[test]
    fn unassigned_class_is_reserved() {
        assert_eq!(Syndrome::new(0x3Bu64 << 26).class_name(), "Reserved");
    }
}
