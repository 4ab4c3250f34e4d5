use std::fmt::Debug;

use crate::core::{Error, StateBuffer, StatusRegister};

/// The CPU's register file, internal RAM, and interrupt latches.
///
/// Holds everything the CPU owns exclusively. The instruction executor and
/// the bus live on [`Nes`][crate::core::Nes], since every bus access also
/// drives the picture and audio units.
#[derive(Clone)]
pub struct Cpu {
    /// Program counter
    pub pc: u16,
    /// Stack pointer, offset from 0x100
    pub s: u8,
    /// Status register
    pub p: StatusRegister,
    /// Accumulator
    pub a: u8,
    /// X index register
    pub x: u8,
    /// Y index register
    pub y: u8,
    /// 2KB of internal RAM, mirrored every 0x800 bytes below 0x2000
    pub ram: [u8; 0x800],
    /// Master cycle counter, one count per CPU cycle
    pub cycles: u64,
    // Interrupt latches. "pending" is only ever set from "raised" at a bus
    // access boundary, and interrupts are serviced (NMI first) at the start
    // of the next instruction, never mid-instruction.
    pub(crate) nmi_line: bool,
    pub(crate) nmi_raised: bool,
    pub(crate) nmi_pending: bool,
    pub(crate) irq_raised: bool,
    pub(crate) irq_pending: bool,
    /// Countdown until a requested DMC DMA is serviced
    pub(crate) dmc_dma_delay: u8,
    // Controller serial ports
    pub(crate) controller_strobe: bool,
    pub(crate) controller_shift: [u8; 2],
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    pub fn new() -> Cpu {
        Cpu {
            pc: 0,
            s: 0xFD,
            p: StatusRegister::new(),
            a: 0,
            x: 0,
            y: 0,
            ram: [0x00; 0x800],
            cycles: 0,
            nmi_line: false,
            nmi_raised: false,
            nmi_pending: false,
            irq_raised: false,
            irq_pending: false,
            dmc_dma_delay: 0,
            controller_strobe: false,
            controller_shift: [0; 2],
        }
    }

    pub fn save_state(&self, state: &mut StateBuffer) {
        state.store_u64(self.cycles);
        state.store_buffer(&self.ram);
        state.store_u8(self.controller_shift[0]);
        state.store_u8(self.controller_shift[1]);
        state.store_u16(self.pc);
        state.store_u8(self.s);
        state.store_u8(self.p.to_byte());
        state.store_u8(self.a);
        state.store_u8(self.x);
        state.store_u8(self.y);
        state.store_u8(self.dmc_dma_delay);
        state.store_flags(&[
            self.controller_strobe,
            self.nmi_line,
            self.nmi_raised,
            self.nmi_pending,
            self.irq_raised,
            self.irq_pending,
        ]);
    }

    pub fn load_state(&mut self, state: &StateBuffer) -> Result<(), Error> {
        self.cycles = state.extract_u64()?;
        state.extract_buffer(&mut self.ram)?;
        self.controller_shift[0] = state.extract_u8()?;
        self.controller_shift[1] = state.extract_u8()?;
        self.pc = state.extract_u16()?;
        self.s = state.extract_u8()?;
        self.p.from_byte(state.extract_u8()?);
        self.a = state.extract_u8()?;
        self.x = state.extract_u8()?;
        self.y = state.extract_u8()?;
        self.dmc_dma_delay = state.extract_u8()?;
        let flags = state.extract_flags(6)?;
        self.controller_strobe = flags[0];
        self.nmi_line = flags[1];
        self.nmi_raised = flags[2];
        self.nmi_pending = flags[3];
        self.irq_raised = flags[4];
        self.irq_pending = flags[5];
        Ok(())
    }
}

impl Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "A:{:02X} X:{:02X} Y:{:02X} {:?} SP:{:02X} PC:{:04X} CYC:{}",
            self.a, self.x, self.y, self.p, self.s, self.pc, self.cycles
        )
    }
}
