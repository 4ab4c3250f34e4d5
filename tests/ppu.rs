mod common;

use common::*;

#[test]
fn test_vblank_flag_sets_and_clears_on_read() {
    let mut nes = nes_with_program(&[]);
    warm_up(&mut nes);
    // Step to the middle of VBlank
    while !(245..250).contains(&nes.ppu.scanline()) {
        nes.step().unwrap();
    }
    let status = nes.read(0x2002);
    assert!(status & 0x80 != 0, "VBlank flag not set during VBlank");
    let status = nes.read(0x2002);
    assert!(status & 0x80 == 0, "VBlank flag survived a status read");
}

#[test]
fn test_nmi_fires_once_per_frame() {
    let mut nes = nes_with_program(&[]);
    warm_up(&mut nes);
    // Enable NMI; the handler at 0x9000 is entered with S dropped by 3
    nes.write(0x80, 0x2000);
    let s_before = nes.cpu.s;
    let mut services = 0;
    let mut last_s = s_before;
    for _ in 0..40_000 {
        nes.step().unwrap();
        if nes.cpu.s != last_s {
            services += 1;
            last_s = nes.cpu.s;
        }
    }
    // ~40k steps is a bit over two frames of NOPs
    assert!(
        (2..=3).contains(&services),
        "expected one NMI per frame, saw {} services",
        services
    );
}

#[test]
fn test_warm_up_ignores_address_writes() {
    // Writes to PPUADDR during warm-up are dropped, so a PPUDATA write
    // lands at address 0 instead of the requested nametable address
    let mut nes = nes_with_chr_ram(&[]);
    set_ppu_addr(&mut nes, 0x2100);
    nes.write(0xAB, 0x2007);
    assert_eq!(nes.cartridge.ppu_peek(0x0000), 0xAB);
    assert_eq!(nes.cartridge.ppu_peek(0x2100), 0x00);

    warm_up(&mut nes);
    set_ppu_addr(&mut nes, 0x2100);
    nes.write(0xCD, 0x2007);
    assert_eq!(nes.cartridge.ppu_peek(0x2100), 0xCD);
}

#[test]
fn test_ppu_data_read_is_buffered() {
    let mut nes = nes_with_chr_ram(&[]);
    warm_up(&mut nes);
    set_ppu_addr(&mut nes, 0x2040);
    nes.write(0x11, 0x2007);
    nes.write(0x22, 0x2007);
    set_ppu_addr(&mut nes, 0x2040);
    // First read returns the stale buffer, the next two the actual data
    nes.read(0x2007);
    assert_eq!(nes.read(0x2007), 0x11);
    assert_eq!(nes.read(0x2007), 0x22);
}

// Drive the clock one CPU cycle (three dots) at a time with plain RAM
// reads, so frame boundaries are observed with a fixed phase
fn count_frame_dots(nes: &mut famicore::core::Nes, frames: usize) -> u64 {
    while !nes.ppu.end_of_frame() {
        nes.read(0x0000);
    }
    let clock = nes.ppu.clock();
    let mut seen = 0;
    while seen < frames {
        nes.read(0x0000);
        if nes.ppu.end_of_frame() {
            seen += 1;
        }
    }
    nes.ppu.clock() - clock
}

#[test]
fn test_frame_cadence() {
    let mut nes = nes_with_program(&[]);
    // With rendering disabled every frame is exactly 341 * 262 dots
    assert_eq!(count_frame_dots(&mut nes, 3), 3 * 341 * 262);
}

#[test]
fn test_odd_frame_skips_one_dot() {
    let mut nes = nes_with_chr_ram(&[]);
    warm_up(&mut nes);
    nes.write(0x08, 0x2001); // show background
    nes.step_frame().unwrap();
    // While rendering, every second frame is one dot short
    assert_eq!(count_frame_dots(&mut nes, 2), 341 * 262 * 2 - 1);
}

fn set_up_opaque_background_and_sprite_zero(nes: &mut famicore::core::Nes) {
    warm_up(nes);
    // Tile 1: low bit plane solid, so every pixel of the tile is opaque
    set_ppu_addr(nes, 0x0010);
    for _ in 0..8 {
        nes.write(0xFF, 0x2007);
    }
    // Point the whole first nametable at tile 1
    set_ppu_addr(nes, 0x2000);
    for _ in 0..960 {
        nes.write(0x01, 0x2007);
    }
    // Sprite 0: tile 1 at (100, 50)
    nes.write(0x00, 0x2003);
    for byte in [50, 0x01, 0x00, 100] {
        nes.write(byte, 0x2004);
    }
}

#[test]
fn test_sprite_zero_hit() {
    let mut nes = nes_with_chr_ram(&[]);
    set_up_opaque_background_and_sprite_zero(&mut nes);
    nes.write(0x18, 0x2001); // show background and sprites
    nes.step_frame().unwrap();
    nes.step_frame().unwrap();
    let status = nes.read(0x2002);
    assert!(status & 0x40 != 0, "sprite zero hit not flagged");
}

#[test]
fn test_no_sprite_zero_hit_without_background() {
    let mut nes = nes_with_chr_ram(&[]);
    set_up_opaque_background_and_sprite_zero(&mut nes);
    nes.write(0x10, 0x2001); // sprites only
    nes.step_frame().unwrap();
    nes.step_frame().unwrap();
    let status = nes.read(0x2002);
    assert!(
        status & 0x40 == 0,
        "sprite zero hit flagged with background disabled"
    );
}

#[test]
fn test_sprite_overflow_flag() {
    let mut nes = nes_with_chr_ram(&[]);
    set_up_opaque_background_and_sprite_zero(&mut nes);
    // Nine sprites on the same scanline
    nes.write(0x00, 0x2003);
    for i in 0..9u8 {
        for byte in [50, 0x01, 0x00, 8 * i] {
            nes.write(byte, 0x2004);
        }
    }
    nes.write(0x18, 0x2001);
    nes.step_frame().unwrap();
    nes.step_frame().unwrap();
    let status = nes.read(0x2002);
    assert!(status & 0x20 != 0, "sprite overflow not flagged");
}

#[test]
fn test_backdrop_fills_idle_frame() {
    let mut nes = nes_with_chr_ram(&[]);
    warm_up(&mut nes);
    // With rendering left off every pixel is the backdrop colour
    set_ppu_addr(&mut nes, 0x3F00);
    nes.write(0x21, 0x2007);
    // Park the PPU address outside palette space, which the idle screen
    // would show instead
    set_ppu_addr(&mut nes, 0x2000);
    nes.step_frame().unwrap();
    assert!(nes.ppu.frame().iter().all(|p| *p == 0x21));
}
