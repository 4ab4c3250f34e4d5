use std::fmt::{Debug, Display};

use crate::core::{
    cartridge::{
        mapper::{bank_addr, num_banks},
        CartridgeMemory,
    },
    Error, StateBuffer,
};

const BANK_SIZE: usize = 0x4000;

/// UxROM (mapper 2). A single register selecting the 16K PRG bank at
/// 0x8000; the last bank is fixed at 0xC000.
#[derive(Default)]
pub struct UxRom {
    bank: u8,
}

impl UxRom {
    pub fn cpu_read(&self, addr: u16, mem: &CartridgeMemory) -> u8 {
        match addr {
            0x6000..=0x7FFF => mem.read_prg_ram(addr as usize - 0x6000),
            0x8000..=0xBFFF => {
                mem.read_prg_rom(bank_addr(BANK_SIZE, self.bank as usize, addr as usize))
            }
            0xC000..=0xFFFF => mem.read_prg_rom(bank_addr(
                BANK_SIZE,
                num_banks(BANK_SIZE, &mem.prg_rom).saturating_sub(1),
                addr as usize,
            )),
            _ => 0,
        }
    }
    pub fn cpu_write(&mut self, addr: u16, value: u8, mem: &mut CartridgeMemory, _cpu_cycle: u64) {
        match addr {
            0x6000..=0x7FFF => mem.write_prg_ram(addr as usize - 0x6000, value),
            0x8000..=0xFFFF => self.bank = value,
            _ => {}
        }
    }
    pub fn ppu_peek(&self, addr: u16, mem: &CartridgeMemory) -> u8 {
        if addr < 0x2000 {
            mem.read_chr(addr as usize)
        } else {
            mem.nametable_read(addr)
        }
    }
    pub fn ppu_write(&mut self, addr: u16, value: u8, mem: &mut CartridgeMemory) {
        if addr < 0x2000 {
            mem.write_chr(addr as usize, value);
        } else {
            mem.nametable_write(addr, value);
        }
    }
    pub fn save_state(&self, state: &mut StateBuffer) {
        state.store_u8(self.bank);
    }
    pub fn load_state(&mut self, state: &StateBuffer) -> Result<(), Error> {
        self.bank = state.extract_u8()?;
        Ok(())
    }
}

impl Display for UxRom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UxROM")
    }
}
impl Debug for UxRom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UxROM bank={}", self.bank)
    }
}
