mod common;

use assert_hex::assert_eq_hex;
use common::*;
use famicore::core::{Cartridge, Error, Mirroring};
use test_case::test_case;

/// Build an image whose PRG banks are filled with their bank number and
/// CHR banks with 0x80 + bank number, so bank switches are observable.
fn marked_rom(mapper: u8, prg_banks: u8, chr_banks: u8) -> Vec<u8> {
    let mut image = rom_image(mapper, prg_banks, chr_banks);
    let prg_len = prg_banks as usize * 0x4000;
    for (i, byte) in image[16..16 + prg_len].iter_mut().enumerate() {
        *byte = (i / 0x2000) as u8; // one marker per 8K
    }
    for (i, byte) in image[16 + prg_len..].iter_mut().enumerate() {
        *byte = 0x80 + (i / 0x0400) as u8; // one marker per 1K
    }
    image
}

fn cartridge(image: &[u8]) -> Cartridge {
    Cartridge::from_ines(image, None).unwrap()
}

#[test]
fn test_rejects_bad_header() {
    assert!(matches!(
        Cartridge::from_ines(b"NOPE", None),
        Err(Error::TruncatedRom(_))
    ));
    let mut image = rom_image(0, 1, 1);
    image[0] = b'X';
    assert!(matches!(
        Cartridge::from_ines(&image, None),
        Err(Error::InvalidHeader)
    ));
    // Header promises more PRG data than the file holds
    let image = rom_image(0, 4, 1);
    assert!(matches!(
        Cartridge::from_ines(&image[..0x4000], None),
        Err(Error::TruncatedRom(_))
    ));
}

#[test]
fn test_rejects_unknown_mapper() {
    let image = rom_image(90, 1, 1);
    assert!(matches!(
        Cartridge::from_ines(&image, None),
        Err(Error::UnsupportedMapper(90))
    ));
}

// Each logical nametable address must consistently hit the same physical
// bank for both reads and writes
#[test_case(0x00, 0x2000, 0x2400, 0x2800; "horizontal mirrors across")]
#[test_case(0x01, 0x2000, 0x2800, 0x2400; "vertical mirrors down")]
fn test_mirroring_pairs(flags6: u8, base: u16, mirror: u16, other: u16) {
    let mut image = rom_image(0, 1, 1);
    image[6] |= flags6;
    let mut cart = cartridge(&image);

    cart.set_ppu_address(base, 0);
    cart.ppu_write(0x55);
    assert_eq_hex!(cart.ppu_peek(mirror), 0x55);
    assert_eq_hex!(cart.ppu_peek(other), 0x00);

    cart.set_ppu_address(other + 0x123, 0);
    cart.ppu_write(0x66);
    assert_eq_hex!(cart.ppu_peek(other + 0x123), 0x66);
    assert_eq_hex!(cart.ppu_peek(base + 0x123), 0x00);
}

#[test]
fn test_four_screen_has_four_banks() {
    let mut image = rom_image(0, 1, 1);
    image[6] |= 0x08;
    let mut cart = cartridge(&image);
    for (i, addr) in [0x2000u16, 0x2400, 0x2800, 0x2C00].iter().enumerate() {
        cart.set_ppu_address(addr + 7, 0);
        cart.ppu_write(i as u8 + 1);
    }
    for (i, addr) in [0x2000u16, 0x2400, 0x2800, 0x2C00].iter().enumerate() {
        assert_eq!(cart.ppu_peek(addr + 7), i as u8 + 1);
    }
}

#[test]
fn test_nrom_mirrors_16k_prg() {
    let cart = cartridge(&marked_rom(0, 1, 1));
    assert_eq!(cart.cpu_read(0x8000), cart.cpu_read(0xC000));
}

#[test]
fn test_uxrom_banking() {
    let mut cart = cartridge(&marked_rom(2, 4, 0));
    // The last bank is fixed at 0xC000 regardless of the register
    assert_eq!(cart.cpu_read(0xC000), 6);
    cart.cpu_write(0x8000, 2, 100);
    assert_eq!(cart.cpu_read(0x8000), 4);
    assert_eq!(cart.cpu_read(0xC000), 6);
    cart.cpu_write(0x8000, 0, 200);
    assert_eq!(cart.cpu_read(0x8000), 0);
}

#[test]
fn test_cnrom_chr_banking() {
    let mut cart = cartridge(&marked_rom(3, 1, 4));
    assert_eq_hex!(cart.ppu_peek(0x0000), 0x80);
    cart.cpu_write(0x8000, 2, 100);
    assert_eq_hex!(cart.ppu_peek(0x0000), 0x90);
    assert_eq_hex!(cart.ppu_peek(0x07FF), 0x81 + 0x10);
}

// Program one MMC1 register: a reset write, then five data bits LSB first
fn mmc1_write(cart: &mut Cartridge, addr: u16, value: u8, cycle: &mut u64) {
    for i in 0..5 {
        cart.cpu_write(addr, (value >> i) & 0x1, *cycle);
        *cycle += 10;
    }
}

#[test]
fn test_sxrom_shift_register_banking() {
    let mut cart = cartridge(&marked_rom(1, 4, 0));
    let mut cycle = 100;
    // Control: 16K PRG pages, last page fixed, vertical mirroring
    mmc1_write(&mut cart, 0x8000, 0x0E, &mut cycle);
    mmc1_write(&mut cart, 0xE000, 0x02, &mut cycle);
    assert_eq!(cart.cpu_read(0x8000), 4, "switchable page not selected");
    assert_eq!(cart.cpu_read(0xC000), 6, "last page not fixed");
    assert_eq!(cart.memory.mirroring, Mirroring::Vertical);
}

#[test]
fn test_sxrom_ignores_consecutive_writes() {
    let mut cart = cartridge(&marked_rom(1, 4, 0));
    let mut cycle = 100;
    mmc1_write(&mut cart, 0x8000, 0x0E, &mut cycle);
    // Select page 1, but with a same-cycle double write of the first bit:
    // the duplicate must be dropped, not shifted in
    cart.cpu_write(0xE000, 0x01, cycle);
    cart.cpu_write(0xE000, 0x01, cycle + 1); // ignored
    cycle += 10;
    for _ in 0..4 {
        cart.cpu_write(0xE000, 0x00, cycle);
        cycle += 10;
    }
    assert_eq!(cart.cpu_read(0x8000), 2, "duplicate write corrupted shift");
}

#[test]
fn test_sxrom_reset_bit() {
    let mut cart = cartridge(&marked_rom(1, 4, 0));
    let mut cycle = 100;
    // Two data bits, then a reset; the next full sequence must not see them
    cart.cpu_write(0x8000, 0x01, cycle);
    cycle += 10;
    cart.cpu_write(0x8000, 0x01, cycle);
    cycle += 10;
    cart.cpu_write(0x8000, 0x80, cycle);
    cycle += 10;
    mmc1_write(&mut cart, 0xE000, 0x03, &mut cycle);
    assert_eq!(cart.cpu_read(0x8000), 6);
}

#[test]
fn test_txrom_prg_banking() {
    let mut cart = cartridge(&marked_rom(4, 4, 0));
    // Mode 0: select 8K bank 3 at 0x8000
    cart.cpu_write(0x8000, 0x06, 100);
    cart.cpu_write(0x8001, 0x03, 110);
    assert_eq!(cart.cpu_read(0x8000), 3);
    // 0xC000 holds the second-to-last bank, 0xE000 the last
    assert_eq!(cart.cpu_read(0xC000), 6);
    assert_eq!(cart.cpu_read(0xE000), 7);
    // Mode 1 swaps 0x8000 and 0xC000
    cart.cpu_write(0x8000, 0x46, 120);
    assert_eq!(cart.cpu_read(0x8000), 6);
    assert_eq!(cart.cpu_read(0xC000), 3);
}

#[test]
fn test_txrom_scanline_irq() {
    let mut cart = cartridge(&marked_rom(4, 2, 1));
    cart.cpu_write(0xC000, 3, 0); // reload value
    cart.cpu_write(0xC001, 0, 0); // force reload
    cart.cpu_write(0xE001, 0, 0); // enable
    let mut clock = 0;
    // First rise reloads, the next three count 3 -> 0 and assert the IRQ
    for rise in 1..=4 {
        cart.set_ppu_address(0x0000, clock);
        clock += 100;
        cart.set_ppu_address(0x1000, clock);
        clock += 100;
        assert_eq!(cart.check_irq(), rise == 4, "wrong IRQ state at rise {}", rise);
    }
    // Acknowledging through 0xE000 clears and disables
    cart.cpu_write(0xE000, 0, 0);
    assert!(!cart.check_irq());
}

#[test]
fn test_txrom_irq_debounces_a12() {
    let mut cart = cartridge(&marked_rom(4, 2, 1));
    cart.cpu_write(0xC000, 1, 0);
    cart.cpu_write(0xC001, 0, 0);
    cart.cpu_write(0xE001, 0, 0);
    // Rapid toggles well inside the filter window only count once
    let mut clock = 1_000;
    for _ in 0..8 {
        cart.set_ppu_address(0x0000, clock);
        clock += 2;
        cart.set_ppu_address(0x1000, clock);
        clock += 2;
    }
    assert!(
        !cart.check_irq(),
        "IRQ counted rises faster than the A12 filter allows"
    );
}

#[test]
fn test_battery_ram_round_trip() {
    let mut image = rom_image(0, 1, 1);
    image[6] |= 0x02; // battery flag
    let mut cart = cartridge(&image);
    assert!(cart.has_battery_backed_ram());
    cart.cpu_write(0x6123, 0xAB, 0);
    let saved = cart.nv_ram().unwrap();

    let mut restored = Cartridge::from_ines(&image, Some(&saved)).unwrap();
    assert_eq_hex!(restored.cpu_read(0x6123), 0xAB);
    // An absent or short save file is fine and reads as zeroes
    restored.load_nv_ram(&[]);
    assert_eq_hex!(restored.cpu_read(0x6123), 0xAB);
}

#[test]
fn test_cartridge_state_round_trip() {
    use famicore::core::StateBuffer;
    let mut cart = cartridge(&marked_rom(2, 4, 0));
    cart.cpu_write(0x8000, 2, 100);
    cart.cpu_write(0x6000, 0x77, 110);
    let mut buffer = StateBuffer::new();
    cart.save_state(&mut buffer);
    let buffer = StateBuffer::from_bytes(buffer.into_bytes());

    let mut restored = cartridge(&marked_rom(2, 4, 0));
    restored.load_state(&buffer).unwrap();
    assert_eq!(restored.cpu_read(0x8000), 4);
    assert_eq_hex!(restored.cpu_read(0x6000), 0x77);
}
