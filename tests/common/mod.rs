#![allow(dead_code)]
use famicore::core::{Cartridge, Nes};

/// Build a bare iNES image with zeroed PRG/CHR data.
pub fn rom_image(mapper: u8, prg_banks: u8, chr_banks: u8) -> Vec<u8> {
    let mut image = vec![
        b'N',
        b'E',
        b'S',
        0x1A,
        prg_banks,
        chr_banks,
        (mapper & 0x0F) << 4,
        mapper & 0xF0,
        0,
        0,
        0,
        0,
        0,
        0,
        0,
        0,
    ];
    image.extend(vec![
        0;
        prg_banks as usize * 0x4000 + chr_banks as usize * 0x2000
    ]);
    image
}

/// A 32K NROM image whose PRG is NOP-filled, with `program` placed at the
/// given CPU address and the reset vector pointing at it. The NMI vector
/// points at 0x9000 and the IRQ vector at 0xA000, both NOP sleds.
pub fn rom_with_program_at(org: u16, program: &[u8], chr_banks: u8) -> Vec<u8> {
    assert!(org >= 0x8000);
    let mut image = rom_image(0, 2, chr_banks);
    let prg = &mut image[16..16 + 0x8000];
    for byte in prg.iter_mut() {
        *byte = 0xEA; // NOP
    }
    let offset = (org - 0x8000) as usize;
    prg[offset..offset + program.len()].copy_from_slice(program);
    // NMI, reset, IRQ vectors
    prg[0x7FFA] = 0x00;
    prg[0x7FFB] = 0x90;
    prg[0x7FFC] = (org & 0xFF) as u8;
    prg[0x7FFD] = (org >> 8) as u8;
    prg[0x7FFE] = 0x00;
    prg[0x7FFF] = 0xA0;
    image
}

pub fn nes_with_program(program: &[u8]) -> Nes {
    nes_with_program_at(0x8000, program)
}

pub fn nes_with_program_at(org: u16, program: &[u8]) -> Nes {
    let image = rom_with_program_at(org, program, 1);
    Nes::with_cartridge(Cartridge::from_ines(&image, None).unwrap())
}

/// A console with CHR RAM instead of CHR ROM, for tests that write the
/// pattern tables.
pub fn nes_with_chr_ram(program: &[u8]) -> Nes {
    let image = rom_with_program_at(0x8000, program, 0);
    Nes::with_cartridge(Cartridge::from_ines(&image, None).unwrap())
}

/// Run past the PPU's power-on warm-up period so register writes land.
pub fn warm_up(nes: &mut Nes) {
    for _ in 0..2 {
        nes.step_frame().unwrap();
    }
}

/// Set the PPU write address through $2006.
pub fn set_ppu_addr(nes: &mut Nes, addr: u16) {
    nes.read(0x2002); // reset the write latch
    nes.write((addr >> 8) as u8, 0x2006);
    nes.write((addr & 0xFF) as u8, 0x2006);
}
