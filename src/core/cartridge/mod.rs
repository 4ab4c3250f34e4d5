mod ines;
pub use ines::{InesFile, InesVersion};
mod mapper;
pub use mapper::Mapper;
pub mod mappers;

use crate::core::{Error, StateBuffer};

/// How the two (or four) physical nametable banks map onto the four
/// logical screens.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Mirroring {
    OneScreenLow,
    OneScreenHigh,
    Vertical,
    Horizontal,
    FourScreen,
}

impl Mirroring {
    fn to_byte(self) -> u8 {
        match self {
            Mirroring::OneScreenLow => 0,
            Mirroring::OneScreenHigh => 1,
            Mirroring::Vertical => 2,
            Mirroring::Horizontal => 3,
            Mirroring::FourScreen => 4,
        }
    }
    fn from_byte(byte: u8) -> Result<Mirroring, Error> {
        match byte {
            0 => Ok(Mirroring::OneScreenLow),
            1 => Ok(Mirroring::OneScreenHigh),
            2 => Ok(Mirroring::Vertical),
            3 => Ok(Mirroring::Horizontal),
            4 => Ok(Mirroring::FourScreen),
            _ => Err(Error::CorruptState),
        }
    }
}

/// All memory on the cartridge that isn't mapper-specific registers.
///
/// PRG/CHR ROM are immutable after attach. PRG/CHR RAM keep their
/// non-volatile span at the end, so battery-backed saves are one contiguous
/// slice. Nametable VRAM lives here because four-screen carts carry the
/// extra 2KB themselves, and some mappers remap it entirely.
pub struct CartridgeMemory {
    pub prg_rom: Vec<u8>,
    pub chr_rom: Vec<u8>,
    pub prg_ram: Vec<u8>,
    pub chr_ram: Vec<u8>,
    pub vram: Vec<u8>,
    /// The mirroring currently in effect. Mappers with mirroring control
    /// overwrite this.
    pub mirroring: Mirroring,
    /// The last address driven onto the PPU bus.
    pub(crate) ppu_address: u16,
    prg_nv_ram_size: usize,
    chr_nv_ram_size: usize,
}

impl CartridgeMemory {
    /// Read a byte of PRG ROM, mirrored over the ROM's actual size.
    pub fn read_prg_rom(&self, addr: usize) -> u8 {
        if self.prg_rom.is_empty() {
            return 0;
        }
        self.prg_rom[addr % self.prg_rom.len()]
    }
    pub fn read_prg_ram(&self, addr: usize) -> u8 {
        if self.prg_ram.is_empty() {
            return 0;
        }
        self.prg_ram[addr % self.prg_ram.len()]
    }
    pub fn write_prg_ram(&mut self, addr: usize, value: u8) {
        if !self.prg_ram.is_empty() {
            let i = addr % self.prg_ram.len();
            self.prg_ram[i] = value;
        }
    }
    /// Read CHR data from ROM, or from RAM on CHR-RAM boards.
    pub fn read_chr(&self, addr: usize) -> u8 {
        if self.chr_rom.is_empty() {
            if self.chr_ram.is_empty() {
                return 0;
            }
            return self.chr_ram[addr % self.chr_ram.len()];
        }
        self.chr_rom[addr % self.chr_rom.len()]
    }
    pub fn write_chr(&mut self, addr: usize, value: u8) {
        if !self.chr_ram.is_empty() {
            let i = addr % self.chr_ram.len();
            self.chr_ram[i] = value;
        }
    }

    /// Map a nametable address to physical VRAM using the mirroring
    /// currently in effect. Shared by every mapper without nametable
    /// hardware of its own.
    fn nametable_index(&self, addr: u16) -> usize {
        let addr = (addr as usize - 0x2000) % 0x1000;
        match self.mirroring {
            Mirroring::OneScreenLow => addr % 0x400,
            Mirroring::OneScreenHigh => (addr % 0x400) + 0x400,
            Mirroring::Vertical => {
                if addr < 0x400 || (0x800..0xC00).contains(&addr) {
                    addr % 0x400
                } else {
                    (addr % 0x400) + 0x400
                }
            }
            Mirroring::Horizontal => {
                if addr < 0x800 {
                    addr % 0x400
                } else {
                    (addr % 0x400) + 0x400
                }
            }
            Mirroring::FourScreen => addr,
        }
    }
    pub fn nametable_read(&self, addr: u16) -> u8 {
        self.vram[self.nametable_index(addr)]
    }
    pub fn nametable_write(&mut self, addr: u16, value: u8) {
        let i = self.nametable_index(addr);
        self.vram[i] = value;
    }
}

/// An NES cartridge: the [`CartridgeMemory`] plus the [`Mapper`] that
/// decides how that memory appears on the CPU and PPU buses.
pub struct Cartridge {
    pub memory: CartridgeMemory,
    pub mapper: Mapper,
    has_nv_ram: bool,
}

impl Cartridge {
    /// Build a cartridge from the contents of an iNES (.nes) file.
    ///
    /// * `bytes` - the file contents.
    /// * `savedata` - previously saved battery-backed RAM, if any.
    pub fn from_ines(bytes: &[u8], savedata: Option<&[u8]>) -> Result<Cartridge, Error> {
        let file = InesFile::parse(bytes)?;
        Cartridge::from_file(file, savedata)
    }

    /// Build a cartridge from an already parsed file.
    pub fn from_file(file: InesFile, savedata: Option<&[u8]>) -> Result<Cartridge, Error> {
        let mapper = Mapper::new(&file)?;
        let vram_size = if file.mirroring == Mirroring::FourScreen {
            0x1000
        } else {
            0x800
        };
        let memory = CartridgeMemory {
            prg_ram: vec![0; file.prg_ram_size + file.prg_nv_ram_size],
            chr_ram: vec![0; file.chr_ram_size + file.chr_nv_ram_size],
            vram: vec![0; vram_size],
            mirroring: file.mirroring,
            ppu_address: 0,
            prg_nv_ram_size: file.prg_nv_ram_size,
            chr_nv_ram_size: file.chr_nv_ram_size,
            prg_rom: file.prg_rom,
            chr_rom: file.chr_rom,
        };
        let mut cartridge = Cartridge {
            has_nv_ram: file.has_nv_ram,
            mapper,
            memory,
        };
        if let Some(data) = savedata {
            cartridge.load_nv_ram(data);
        }
        Ok(cartridge)
    }

    /// Read a byte on the CPU bus. Side-effect free for every supported
    /// mapper, so this doubles as the diagnostic peek.
    pub fn cpu_read(&self, addr: u16) -> u8 {
        self.mapper.cpu_read(addr, &self.memory)
    }
    pub fn cpu_peek(&self, addr: u16) -> u8 {
        self.cpu_read(addr)
    }
    /// Write a byte on the CPU bus. `cpu_cycle` lets mappers with
    /// write-spacing rules (MMC1) detect back-to-back writes.
    pub fn cpu_write(&mut self, addr: u16, value: u8, cpu_cycle: u64) {
        self.mapper.cpu_write(addr, value, &mut self.memory, cpu_cycle);
    }

    /// Drive a new address onto the PPU bus. `ppu_clock` lets mappers with
    /// address-transition counters (MMC3) debounce the A12 line.
    pub fn set_ppu_address(&mut self, addr: u16, ppu_clock: u64) {
        self.memory.ppu_address = addr;
        self.mapper.on_ppu_address(addr, &mut self.memory, ppu_clock);
    }
    /// Read the byte at the latched PPU bus address.
    pub fn ppu_read(&mut self) -> u8 {
        self.mapper.ppu_peek(self.memory.ppu_address, &self.memory)
    }
    /// Write a byte at the latched PPU bus address.
    pub fn ppu_write(&mut self, value: u8) {
        let addr = self.memory.ppu_address;
        self.mapper.ppu_write(addr, value, &mut self.memory);
    }
    /// Side-effect-free read of an arbitrary PPU bus address.
    pub fn ppu_peek(&self, addr: u16) -> u8 {
        self.mapper.ppu_peek(addr, &self.memory)
    }

    /// Whether the mapper is currently asserting the CPU IRQ line.
    pub fn check_irq(&self) -> bool {
        self.mapper.check_irq()
    }

    /// `true` if this cartridge carries battery-backed RAM worth persisting.
    pub fn has_battery_backed_ram(&self) -> bool {
        self.has_nv_ram && (self.memory.prg_nv_ram_size + self.memory.chr_nv_ram_size) > 0
    }

    /// The battery-backed portion of PRG and CHR RAM, for writing to a save
    /// file. [`None`] when the cartridge has no battery.
    pub fn nv_ram(&self) -> Option<Vec<u8>> {
        if !self.has_battery_backed_ram() {
            return None;
        }
        let mut data =
            self.memory.prg_ram[self.memory.prg_ram.len() - self.memory.prg_nv_ram_size..].to_vec();
        data.extend_from_slice(
            &self.memory.chr_ram[self.memory.chr_ram.len() - self.memory.chr_nv_ram_size..],
        );
        Some(data)
    }
    /// Restore battery-backed RAM from a save file. Short or absent data is
    /// not an error; whatever is missing stays zeroed.
    pub fn load_nv_ram(&mut self, data: &[u8]) {
        let prg_start = self.memory.prg_ram.len() - self.memory.prg_nv_ram_size;
        let prg_count = self.memory.prg_nv_ram_size.min(data.len());
        self.memory.prg_ram[prg_start..prg_start + prg_count]
            .copy_from_slice(&data[..prg_count]);
        let rest = &data[prg_count..];
        let chr_start = self.memory.chr_ram.len() - self.memory.chr_nv_ram_size;
        let chr_count = self.memory.chr_nv_ram_size.min(rest.len());
        self.memory.chr_ram[chr_start..chr_start + chr_count]
            .copy_from_slice(&rest[..chr_count]);
    }

    pub fn save_state(&self, state: &mut StateBuffer) {
        state.store_buffer(&self.memory.prg_ram);
        state.store_buffer(&self.memory.chr_ram);
        state.store_buffer(&self.memory.vram);
        state.store_u8(self.memory.mirroring.to_byte());
        state.store_u16(self.memory.ppu_address);
        self.mapper.save_state(state);
    }
    pub fn load_state(&mut self, state: &StateBuffer) -> Result<(), Error> {
        state.extract_buffer(&mut self.memory.prg_ram)?;
        state.extract_buffer(&mut self.memory.chr_ram)?;
        state.extract_buffer(&mut self.memory.vram)?;
        self.memory.mirroring = Mirroring::from_byte(state.extract_u8()?)?;
        self.memory.ppu_address = state.extract_u16()?;
        self.mapper.load_state(state)
    }
}
