use std::fmt::{Debug, Display};

use crate::core::{
    cartridge::{
        mappers::{CnRom, NRom, SxRom, TxRom, UxRom},
        CartridgeMemory, InesFile,
    },
    Error, StateBuffer,
};

/// The bank-switching hardware on the cartridge, one variant per supported
/// board family.
///
/// A closed enum rather than a trait object so that adding a variant (in
/// particular the IRQ-bearing one) forces every dispatch site to be
/// revisited.
pub enum Mapper {
    NRom(NRom),
    SxRom(SxRom),
    UxRom(UxRom),
    CnRom(CnRom),
    TxRom(TxRom),
}

macro_rules! dispatch {
    ($self: expr, $mapper: ident => $body: expr) => {
        match $self {
            Mapper::NRom($mapper) => $body,
            Mapper::SxRom($mapper) => $body,
            Mapper::UxRom($mapper) => $body,
            Mapper::CnRom($mapper) => $body,
            Mapper::TxRom($mapper) => $body,
        }
    };
}

impl Mapper {
    /// Instantiate the mapper named by the file's header.
    pub fn new(file: &InesFile) -> Result<Mapper, Error> {
        match file.mapper_number {
            0 => Ok(Mapper::NRom(NRom::default())),
            1 => Ok(Mapper::SxRom(SxRom::default())),
            2 => Ok(Mapper::UxRom(UxRom::default())),
            3 => Ok(Mapper::CnRom(CnRom::default())),
            4 => Ok(Mapper::TxRom(TxRom::default())),
            n => Err(Error::UnsupportedMapper(n)),
        }
    }

    pub fn mapper_number(&self) -> u16 {
        match self {
            Mapper::NRom(_) => 0,
            Mapper::SxRom(_) => 1,
            Mapper::UxRom(_) => 2,
            Mapper::CnRom(_) => 3,
            Mapper::TxRom(_) => 4,
        }
    }

    pub fn cpu_read(&self, addr: u16, mem: &CartridgeMemory) -> u8 {
        dispatch!(self, m => m.cpu_read(addr, mem))
    }
    pub fn cpu_write(&mut self, addr: u16, value: u8, mem: &mut CartridgeMemory, cpu_cycle: u64) {
        dispatch!(self, m => m.cpu_write(addr, value, mem, cpu_cycle))
    }
    pub fn ppu_peek(&self, addr: u16, mem: &CartridgeMemory) -> u8 {
        dispatch!(self, m => m.ppu_peek(addr, mem))
    }
    pub fn ppu_write(&mut self, addr: u16, value: u8, mem: &mut CartridgeMemory) {
        dispatch!(self, m => m.ppu_write(addr, value, mem))
    }
    /// Called on every PPU bus address transition. Only MMC3 cares.
    pub fn on_ppu_address(&mut self, addr: u16, _mem: &mut CartridgeMemory, ppu_clock: u64) {
        if let Mapper::TxRom(m) = self {
            m.clock_irq_counter(addr, ppu_clock);
        }
    }
    /// Whether this mapper is asserting the CPU IRQ line. Only MMC3 has an
    /// interrupt source.
    pub fn check_irq(&self) -> bool {
        match self {
            Mapper::TxRom(m) => m.check_irq(),
            _ => false,
        }
    }
    pub fn save_state(&self, state: &mut StateBuffer) {
        dispatch!(self, m => m.save_state(state))
    }
    pub fn load_state(&mut self, state: &StateBuffer) -> Result<(), Error> {
        dispatch!(self, m => m.load_state(state))
    }
}

impl Display for Mapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        dispatch!(self, m => Display::fmt(m, f))
    }
}
impl Debug for Mapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        dispatch!(self, m => Debug::fmt(m, f))
    }
}

/// Address of `offset` within bank `bank_num` of `bank_size` byte banks.
pub fn bank_addr(bank_size: usize, bank_num: usize, offset: usize) -> usize {
    bank_size * bank_num + (offset % bank_size)
}

/// How many banks of `bank_size` bytes fit in `data`.
pub fn num_banks(bank_size: usize, data: &[u8]) -> usize {
    data.len() / bank_size
}
