use log::*;

use crate::core::{cartridge::Mirroring, Error};

/// Which revision of the container format a ROM file uses.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InesVersion {
    Archaic,
    Ines1,
    Ines2,
}

/// A parsed iNES / NES 2.0 file.
///
/// Owns the PRG/CHR data; ownership is transferred to the
/// [`Cartridge`][crate::core::Cartridge] when the file is attached.
pub struct InesFile {
    pub version: InesVersion,
    pub mapper_number: u16,
    pub submapper_number: u8,
    pub prg_rom: Vec<u8>,
    pub chr_rom: Vec<u8>,
    pub misc_rom: Vec<u8>,
    pub prg_ram_size: usize,
    pub prg_nv_ram_size: usize,
    pub chr_ram_size: usize,
    pub chr_nv_ram_size: usize,
    pub has_nv_ram: bool,
    pub mirroring: Mirroring,
}

// NES 2.0 stores RAM sizes as 64 << shift, with 0 meaning no RAM at all
fn ram_size(shift: u8) -> usize {
    if shift == 0 {
        0
    } else {
        64 << shift
    }
}

impl InesFile {
    /// Parse the 16 byte header and split the file into its regions.
    pub fn parse(bytes: &[u8]) -> Result<InesFile, Error> {
        if bytes.len() < 16 {
            return Err(Error::TruncatedRom("header"));
        }
        if &bytes[0..4] != b"NES\x1A" {
            return Err(Error::InvalidHeader);
        }
        let header = &bytes[0..16];
        debug!("Cartridge header: {:02X?}", header);

        let version = if header[7] & 0x0C == 0x08 {
            InesVersion::Ines2
        } else if header[7] & 0x0C == 0x00 && header[12..16].iter().all(|b| *b == 0) {
            InesVersion::Ines1
        } else {
            InesVersion::Archaic
        };
        debug!("Detected {:?} file", version);

        let has_trainer = header[6] & 0x04 != 0;
        let mut offset = 16 + if has_trainer { 512 } else { 0 };

        let prg_rom_size = if version == InesVersion::Ines2 {
            ((header[9] as usize & 0x0F) << 8 | header[4] as usize) * 0x4000
        } else {
            header[4] as usize * 0x4000
        };
        let chr_rom_size = if version == InesVersion::Ines2 {
            ((header[9] as usize & 0xF0) << 4 | header[5] as usize) * 0x2000
        } else {
            header[5] as usize * 0x2000
        };

        if bytes.len() < offset + prg_rom_size {
            return Err(Error::TruncatedRom("PRG ROM"));
        }
        let prg_rom = bytes[offset..offset + prg_rom_size].to_vec();
        offset += prg_rom_size;

        if bytes.len() < offset + chr_rom_size {
            return Err(Error::TruncatedRom("CHR ROM"));
        }
        let chr_rom = bytes[offset..offset + chr_rom_size].to_vec();
        offset += chr_rom_size;

        let misc_rom = if version == InesVersion::Ines2 {
            bytes[offset..].to_vec()
        } else {
            Vec::new()
        };

        let mapper_number = match version {
            InesVersion::Ines2 => {
                ((header[8] as u16 & 0x0F) << 8)
                    | (header[7] as u16 & 0xF0)
                    | (header[6] as u16 >> 4)
            }
            InesVersion::Ines1 => (header[7] as u16 & 0xF0) | (header[6] as u16 >> 4),
            InesVersion::Archaic => header[6] as u16 >> 4,
        };
        let submapper_number = if version == InesVersion::Ines2 {
            header[8] >> 4
        } else {
            0
        };

        let has_nv_ram = header[6] & 0x02 != 0;

        let (prg_ram_size, prg_nv_ram_size, chr_ram_size, chr_nv_ram_size) =
            if version == InesVersion::Ines2 {
                (
                    ram_size(header[10] & 0x0F),
                    ram_size(header[10] >> 4),
                    ram_size(header[11] & 0x0F),
                    ram_size(header[11] >> 4),
                )
            } else {
                let ram = if version == InesVersion::Ines1 && header[8] != 0 {
                    header[8] as usize * 0x2000
                } else {
                    0x2000
                };
                let chr_ram = if chr_rom_size == 0 { 0x2000 } else { 0 };
                if has_nv_ram {
                    (0, ram, chr_ram, 0)
                } else {
                    (ram, 0, chr_ram, 0)
                }
            };

        let mirroring = if header[6] & 0x08 != 0 {
            Mirroring::FourScreen
        } else if header[6] & 0x01 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };
        debug!(
            "Mapper {} (submapper {}), {:X} bytes PRG ROM, {:X} bytes CHR ROM, \
             {:?} mirroring, battery: {}",
            mapper_number, submapper_number, prg_rom_size, chr_rom_size, mirroring, has_nv_ram
        );

        Ok(InesFile {
            version,
            mapper_number,
            submapper_number,
            prg_rom,
            chr_rom,
            misc_rom,
            prg_ram_size,
            prg_nv_ram_size,
            chr_ram_size,
            chr_nv_ram_size,
            has_nv_ram,
            mirroring,
        })
    }
}
