use std::fmt::{Debug, Display};

use crate::core::{
    cartridge::{mapper::bank_addr, CartridgeMemory, Mirroring},
    Error, StateBuffer,
};

/// Minimum gap between A12 rises for the IRQ counter to clock, in PPU
/// clocks. Filters the rapid toggling within a single tile fetch.
const A12_DEBOUNCE: u64 = 16;

/// TxROM / MMC3 (mapper 4). Two-mode PRG and CHR banking plus a scanline
/// counter clocked by PPU pattern-table address rises, raising a CPU IRQ
/// when it reaches zero while armed.
#[derive(Default)]
pub struct TxRom {
    prg_mode: u8,
    chr_mode: u8,
    register_address: u8,
    chr_regs: [u8; 6],
    prg_reg_0: u8,
    prg_reg_1: u8,
    prg_ram_enabled: bool,
    prg_ram_write_protect: bool,
    last_a12_high: bool,
    last_rise_clock: u64,
    irq_counter: u8,
    irq_reload_value: u8,
    irq_enabled: bool,
    irq_pending: bool,
}

impl TxRom {
    pub fn cpu_read(&self, addr: u16, mem: &CartridgeMemory) -> u8 {
        match addr {
            0x6000..=0x7FFF => {
                if mem.mirroring != Mirroring::FourScreen && self.prg_ram_enabled {
                    mem.read_prg_ram(addr as usize - 0x6000)
                } else {
                    0
                }
            }
            0x8000..=0xFFFF => {
                let last = mem.prg_rom.len().saturating_sub(0x2000) / 0x2000;
                let second_last = last.saturating_sub(1);
                let (page, offset) = match (self.prg_mode, addr) {
                    (0, 0x8000..=0x9FFF) => (self.prg_reg_0 as usize, addr - 0x8000),
                    (0, 0xA000..=0xBFFF) => (self.prg_reg_1 as usize, addr - 0xA000),
                    (0, 0xC000..=0xDFFF) => (second_last, addr - 0xC000),
                    (0, _) => (last, addr - 0xE000),
                    (_, 0x8000..=0x9FFF) => (second_last, addr - 0x8000),
                    (_, 0xA000..=0xBFFF) => (self.prg_reg_1 as usize, addr - 0xA000),
                    (_, 0xC000..=0xDFFF) => (self.prg_reg_0 as usize, addr - 0xC000),
                    (_, _) => (last, addr - 0xE000),
                };
                mem.read_prg_rom(bank_addr(0x2000, page, offset as usize))
            }
            _ => 0,
        }
    }

    pub fn cpu_write(&mut self, addr: u16, value: u8, mem: &mut CartridgeMemory, _cpu_cycle: u64) {
        match addr {
            0x6000..=0x7FFF => {
                if mem.mirroring != Mirroring::FourScreen
                    && self.prg_ram_enabled
                    && !self.prg_ram_write_protect
                {
                    mem.write_prg_ram(addr as usize - 0x6000, value);
                }
            }
            0x8000..=0x9FFF => {
                if addr % 2 == 0 {
                    self.chr_mode = value >> 7;
                    self.prg_mode = (value >> 6) & 0x01;
                    self.register_address = value & 0x07;
                } else {
                    match self.register_address {
                        r @ 0..=5 => self.chr_regs[r as usize] = value,
                        6 => self.prg_reg_0 = value,
                        _ => self.prg_reg_1 = value,
                    }
                }
            }
            0xA000..=0xBFFF => {
                if addr % 2 == 0 {
                    if mem.mirroring != Mirroring::FourScreen {
                        mem.mirroring = if value & 0x01 == 0 {
                            Mirroring::Vertical
                        } else {
                            Mirroring::Horizontal
                        };
                    }
                } else {
                    self.prg_ram_enabled = value & 0x80 != 0;
                    self.prg_ram_write_protect = value & 0x40 != 0;
                }
            }
            0xC000..=0xDFFF => {
                if addr % 2 == 0 {
                    self.irq_reload_value = value;
                } else {
                    self.irq_counter = 0;
                }
            }
            0xE000..=0xFFFF => {
                if addr % 2 == 0 {
                    self.irq_enabled = false;
                    self.irq_pending = false;
                } else {
                    self.irq_enabled = true;
                }
            }
            _ => {}
        }
    }

    fn chr_addr(&self, addr: u16) -> usize {
        let addr = addr as usize;
        let big = |reg: u8| (reg >> 1) as usize;
        if self.chr_mode == 0 {
            match addr {
                0x0000..=0x07FF => bank_addr(0x0800, big(self.chr_regs[0]), addr),
                0x0800..=0x0FFF => bank_addr(0x0800, big(self.chr_regs[1]), addr),
                0x1000..=0x13FF => bank_addr(0x0400, self.chr_regs[2] as usize, addr),
                0x1400..=0x17FF => bank_addr(0x0400, self.chr_regs[3] as usize, addr),
                0x1800..=0x1BFF => bank_addr(0x0400, self.chr_regs[4] as usize, addr),
                _ => bank_addr(0x0400, self.chr_regs[5] as usize, addr),
            }
        } else {
            match addr {
                0x0000..=0x03FF => bank_addr(0x0400, self.chr_regs[2] as usize, addr),
                0x0400..=0x07FF => bank_addr(0x0400, self.chr_regs[3] as usize, addr),
                0x0800..=0x0BFF => bank_addr(0x0400, self.chr_regs[4] as usize, addr),
                0x0C00..=0x0FFF => bank_addr(0x0400, self.chr_regs[5] as usize, addr),
                0x1000..=0x17FF => bank_addr(0x0800, big(self.chr_regs[0]), addr),
                _ => bank_addr(0x0800, big(self.chr_regs[1]), addr),
            }
        }
    }

    pub fn ppu_peek(&self, addr: u16, mem: &CartridgeMemory) -> u8 {
        if addr < 0x2000 {
            mem.read_chr(self.chr_addr(addr))
        } else {
            mem.nametable_read(addr)
        }
    }
    pub fn ppu_write(&mut self, addr: u16, value: u8, mem: &mut CartridgeMemory) {
        if addr < 0x2000 {
            if mem.chr_rom.is_empty() {
                let a = self.chr_addr(addr);
                mem.write_chr(a, value);
            }
        } else {
            mem.nametable_write(addr, value);
        }
    }

    /// Clock the scanline counter on a debounced rise of PPU address line
    /// 12 (a pattern-table-high fetch).
    pub fn clock_irq_counter(&mut self, addr: u16, ppu_clock: u64) {
        if addr & 0x1000 != 0 {
            if !self.last_a12_high && ppu_clock.wrapping_sub(self.last_rise_clock) >= A12_DEBOUNCE {
                if self.irq_counter == 0 {
                    self.irq_counter = self.irq_reload_value;
                } else {
                    self.irq_counter -= 1;
                }
                if self.irq_enabled && self.irq_counter == 0 {
                    self.irq_pending = true;
                }
            }
            if !self.last_a12_high {
                self.last_rise_clock = ppu_clock;
            }
            self.last_a12_high = true;
        } else {
            self.last_a12_high = false;
        }
    }

    pub fn check_irq(&self) -> bool {
        self.irq_pending
    }

    pub fn save_state(&self, state: &mut StateBuffer) {
        state.store_u8(self.prg_mode);
        state.store_u8(self.chr_mode);
        state.store_u8(self.register_address);
        state.store_buffer(&self.chr_regs);
        state.store_u8(self.prg_reg_0);
        state.store_u8(self.prg_reg_1);
        state.store_u64(self.last_rise_clock);
        state.store_u8(self.irq_counter);
        state.store_u8(self.irq_reload_value);
        state.store_flags(&[
            self.prg_ram_enabled,
            self.prg_ram_write_protect,
            self.last_a12_high,
            self.irq_enabled,
            self.irq_pending,
        ]);
    }
    pub fn load_state(&mut self, state: &StateBuffer) -> Result<(), Error> {
        self.prg_mode = state.extract_u8()?;
        self.chr_mode = state.extract_u8()?;
        self.register_address = state.extract_u8()?;
        state.extract_buffer(&mut self.chr_regs)?;
        self.prg_reg_0 = state.extract_u8()?;
        self.prg_reg_1 = state.extract_u8()?;
        self.last_rise_clock = state.extract_u64()?;
        self.irq_counter = state.extract_u8()?;
        self.irq_reload_value = state.extract_u8()?;
        let flags = state.extract_flags(5)?;
        self.prg_ram_enabled = flags[0];
        self.prg_ram_write_protect = flags[1];
        self.last_a12_high = flags[2];
        self.irq_enabled = flags[3];
        self.irq_pending = flags[4];
        Ok(())
    }
}

impl Display for TxRom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TxROM")
    }
}
impl Debug for TxRom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TxROM prg_mode={} chr_mode={} prg=[{},{}] chr={:?} irq=[counter={} reload={} enabled={}]",
            self.prg_mode,
            self.chr_mode,
            self.prg_reg_0,
            self.prg_reg_1,
            self.chr_regs,
            self.irq_counter,
            self.irq_reload_value,
            self.irq_enabled
        )
    }
}
