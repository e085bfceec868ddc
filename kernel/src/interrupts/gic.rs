//! GICv2 distributor and CPU interface.
//!
//! [`Gic`] holds the programming model; the registers themselves sit behind
//! [`GicRegisters`] so the same logic drives the MMIO block on hardware and
//! an in-memory model in tests.

use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::register_bitfields;
use tock_registers::register_structs;
use tock_registers::registers::{ReadOnly, ReadWrite, WriteOnly};

use crate::config::MAX_IRQ;
use crate::error::{KernelError, KernelResult};

/// Interrupt priorities; lower value is more urgent.
pub mod priority {
    pub const HIGH: u8 = 0x00;
    pub const NORMAL: u8 = 0x80;
    pub const DEFAULT: u8 = 0xA0;
    pub const LOW: u8 = 0xF0;
    pub const LOWEST: u8 = 0xFF;
}

/// Value read from IAR when nothing is pending.
pub const SPURIOUS_INTID: u32 = 1023;

/// IAR value for a pending group 1 line that a secure read may not claim.
pub const GROUP1_PENDING_INTID: u32 = 1022;

/// Group enable bits, same position in GICD_CTLR and GICC_CTLR.
pub const CTLR_ENABLE_GRP0: u32 = 1 << 0;
pub const CTLR_ENABLE_GRP1: u32 = 1 << 1;
/// GICC_CTLR.AckCtl: secure IAR reads may acknowledge group 1 lines.
pub const CTLR_ACK_CTL: u32 = 1 << 2;

const IAR_INTID_MASK: u32 = 0x3FF;
/// SGIs and PPIs occupy 0..32; their targets are banked and read-only.
const FIRST_SPI: usize = 32;
const SPI_TARGET_CPU0: u32 = 0x0101_0101;

/// Register-level access to one distributor + CPU interface pair.
///
/// Indices are word indices into the respective register arrays.
pub trait GicRegisters {
    fn typer(&self) -> u32;
    fn write_distributor_control(&mut self, value: u32);
    fn write_group(&mut self, index: usize, value: u32);
    fn write_set_enable(&mut self, index: usize, mask: u32);
    fn write_clear_enable(&mut self, index: usize, mask: u32);
    fn read_enable(&self, index: usize) -> u32;
    fn read_priority(&self, index: usize) -> u32;
    fn write_priority(&mut self, index: usize, value: u32);
    fn write_targets(&mut self, index: usize, value: u32);
    fn write_config(&mut self, index: usize, value: u32);
    fn write_sgi(&mut self, value: u32);

    fn write_cpu_control(&mut self, value: u32);
    fn write_priority_mask(&mut self, value: u32);
    fn write_binary_point(&mut self, value: u32);
    fn read_acknowledge(&mut self) -> u32;
    fn write_end_of_interrupt(&mut self, value: u32);
}

pub struct Gic<R> {
    regs: R,
    lines: usize,
}

impl<R: GicRegisters> Gic<R> {
    pub fn new(regs: R) -> Self {
        Self { regs, lines: 0 }
    }

    /// Every line disabled, in group 0, at the default priority, routed to
    /// CPU 0 and level-sensitive; then both halves enabled with no priority
    /// masking.
    ///
    /// QEMU `virt` has no security extensions, so CPU interface accesses are
    /// secure. Group 0 lines are then acknowledged directly, and with
    /// GICC_CTLR.FIQEn clear they are still signalled as IRQ.
    pub fn init(&mut self) {
        self.regs.write_distributor_control(0);

        let lines = ((((self.regs.typer() & 0x1F) + 1) * 32) as usize).min(MAX_IRQ);
        self.lines = lines;

        for index in 0..lines.div_ceil(32) {
            self.regs.write_clear_enable(index, u32::MAX);
            self.regs.write_group(index, 0);
        }
        let default = u32::from_ne_bytes([priority::DEFAULT; 4]);
        for index in 0..lines.div_ceil(4) {
            self.regs.write_priority(index, default);
        }
        for index in FIRST_SPI / 4..lines.div_ceil(4) {
            self.regs.write_targets(index, SPI_TARGET_CPU0);
        }
        for index in FIRST_SPI / 16..lines.div_ceil(16) {
            self.regs.write_config(index, 0);
        }
        self.regs.write_distributor_control(CTLR_ENABLE_GRP0);

        self.regs.write_priority_mask(priority::LOWEST as u32);
        self.regs.write_binary_point(0);
        self.regs.write_cpu_control(CTLR_ENABLE_GRP0);
    }

    pub fn regs(&self) -> &R {
        &self.regs
    }

    pub fn regs_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    /// Lines implemented by the distributor, valid after [`Gic::init`].
    pub fn line_count(&self) -> usize {
        self.lines
    }

    fn check(&self, line: u32) -> KernelResult<usize> {
        let line = line as usize;
        if line < self.lines {
            Ok(line)
        } else {
            Err(KernelError::InvalidIrq(line as u32))
        }
    }

    pub fn enable(&mut self, line: u32) -> KernelResult<()> {
        let line = self.check(line)?;
        self.regs.write_set_enable(line / 32, 1 << (line % 32));
        Ok(())
    }

    pub fn disable(&mut self, line: u32) -> KernelResult<()> {
        let line = self.check(line)?;
        self.regs.write_clear_enable(line / 32, 1 << (line % 32));
        Ok(())
    }

    pub fn is_enabled(&self, line: u32) -> bool {
        match self.check(line) {
            Ok(line) => self.regs.read_enable(line / 32) & (1 << (line % 32)) != 0,
            Err(_) => false,
        }
    }

    /// Byte-wide read-modify-write of the line's priority field.
    pub fn set_priority(&mut self, line: u32, value: u8) -> KernelResult<()> {
        let line = self.check(line)?;
        let shift = (line % 4) * 8;
        let mut word = self.regs.read_priority(line / 4);
        word &= !(0xFF << shift);
        word |= (value as u32) << shift;
        self.regs.write_priority(line / 4, word);
        Ok(())
    }

    pub fn priority(&self, line: u32) -> Option<u8> {
        let line = self.check(line).ok()?;
        Some((self.regs.read_priority(line / 4) >> ((line % 4) * 8)) as u8)
    }

    /// Claim the highest-priority pending line; it stays in service until
    /// [`Gic::end_of_interrupt`].
    pub fn acknowledge(&mut self) -> u32 {
        self.regs.read_acknowledge() & IAR_INTID_MASK
    }

    pub fn end_of_interrupt(&mut self, line: u32) {
        self.regs.write_end_of_interrupt(line);
    }

    /// Raise software-generated interrupt `sgi` on `cpu`.
    pub fn send_sgi(&mut self, sgi: u32, cpu: u32) -> KernelResult<()> {
        if sgi >= 16 {
            return Err(KernelError::InvalidIrq(sgi));
        }
        if cpu >= 8 {
            return Err(KernelError::InvalidState);
        }
        self.regs.write_sgi(((1 << cpu) << 16) | sgi);
        Ok(())
    }
}

register_bitfields! [
    u32,
    GICD_TYPER [
        ITLinesNumber OFFSET(0) NUMBITS(5) []
    ]
];

register_structs! {
    GicdRegisters {
        (0x000 => ctlr: ReadWrite<u32>),
        (0x004 => typer: ReadOnly<u32, GICD_TYPER::Register>),
        (0x008 => _reserved0),
        (0x080 => igroupr: [ReadWrite<u32>; 32]),
        (0x100 => isenabler: [ReadWrite<u32>; 32]),
        (0x180 => icenabler: [ReadWrite<u32>; 32]),
        (0x200 => _reserved1),
        (0x400 => ipriorityr: [ReadWrite<u32>; 255]),
        (0x7fc => _reserved2),
        (0x800 => itargetsr: [ReadWrite<u32>; 255]),
        (0xbfc => _reserved3),
        (0xc00 => icfgr: [ReadWrite<u32>; 64]),
        (0xd00 => _reserved4),
        (0xf00 => sgir: WriteOnly<u32>),
        (0xf04 => @END),
    }
}

register_structs! {
    GiccRegisters {
        (0x000 => ctlr: ReadWrite<u32>),
        (0x004 => pmr: ReadWrite<u32>),
        (0x008 => bpr: ReadWrite<u32>),
        (0x00c => iar: ReadOnly<u32>),
        (0x010 => eoir: WriteOnly<u32>),
        (0x014 => @END),
    }
}

/// Memory-mapped GICv2.
pub struct MmioGic {
    gicd: usize,
    gicc: usize,
}

// Register blocks are device memory owned by this driver alone; all access
// goes through the lock around the interrupt controller.
unsafe impl Send for MmioGic {}

impl MmioGic {
    /// # Safety
    /// Both addresses must point at the distributor and CPU interface of a
    /// GICv2, and nothing else may drive them.
    pub const unsafe fn new(gicd: usize, gicc: usize) -> Self {
        Self { gicd, gicc }
    }

    fn gicd(&self) -> &GicdRegisters {
        unsafe { &*(self.gicd as *const GicdRegisters) }
    }

    fn gicc(&self) -> &GiccRegisters {
        unsafe { &*(self.gicc as *const GiccRegisters) }
    }
}

impl GicRegisters for MmioGic {
    fn typer(&self) -> u32 {
        self.gicd().typer.read(GICD_TYPER::ITLinesNumber)
    }

    fn write_distributor_control(&mut self, value: u32) {
        self.gicd().ctlr.set(value);
    }

    fn write_group(&mut self, index: usize, value: u32) {
        self.gicd().igroupr[index].set(value);
    }

    fn write_set_enable(&mut self, index: usize, mask: u32) {
        self.gicd().isenabler[index].set(mask);
    }

    fn write_clear_enable(&mut self, index: usize, mask: u32) {
        self.gicd().icenabler[index].set(mask);
    }

    fn read_enable(&self, index: usize) -> u32 {
        self.gicd().isenabler[index].get()
    }

    fn read_priority(&self, index: usize) -> u32 {
        self.gicd().ipriorityr[index].get()
    }

    fn write_priority(&mut self, index: usize, value: u32) {
        self.gicd().ipriorityr[index].set(value);
    }

    fn write_targets(&mut self, index: usize, value: u32) {
        self.gicd().itargetsr[index].set(value);
    }

    fn write_config(&mut self, index: usize, value: u32) {
        self.gicd().icfgr[index].set(value);
    }

    fn write_sgi(&mut self, value: u32) {
        self.gicd().sgir.set(value);
    }

    fn write_cpu_control(&mut self, value: u32) {
        self.gicc().ctlr.set(value);
    }

    fn write_priority_mask(&mut self, value: u32) {
        self.gicc().pmr.set(value);
    }

    fn write_binary_point(&mut self, value: u32) {
        self.gicc().bpr.set(value);
    }

    fn read_acknowledge(&mut self) -> u32 {
        self.gicc().iar.get()
    }

    fn write_end_of_interrupt(&mut self, value: u32) {
        self.gicc().eoir.set(value);
    }
}
