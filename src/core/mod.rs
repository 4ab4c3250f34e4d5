//! The emulation core.
//!
//! Contains the entire state of the machine and advances it with
//! cycle-accurate interleaving: every CPU bus access moves the master clock
//! one CPU cycle, which steps the picture unit three dots and the audio
//! unit one tick.
//! ```no_run
//! use famicore::core::{Cartridge, Controller, Nes};
//! let rom = std::fs::read("game.nes").unwrap();
//! let mut nes = Nes::with_cartridge(Cartridge::from_ines(&rom, None).unwrap());
//! // Advance by one instruction
//! nes.step().unwrap();
//! // Advance to the end of the current frame
//! nes.step_frame().unwrap();
//! // Press start on player 1's controller
//! nes.set_controller(0, Controller { start: true, ..Controller::default() });
//! // Read the screen output as 6-bit colour indices
//! let top_left = nes.ppu.frame()[0];
//! println!("top left pixel is {:?}", famicore::core::PALETTE_RGB[top_left as usize]);
//! ```
mod nes;
pub use nes::Nes;
mod cpu;
pub use cpu::Cpu;
mod status_register;
pub use status_register::StatusRegister;
pub mod opcodes;
mod ppu;
pub use ppu::Ppu;
mod apu;
pub use apu::{
    Apu, DmcUnit, Envelope, LengthCounter, NoiseUnit, PulseUnit, TriangleUnit, LENGTH_TABLE,
    SAMPLE_RATE,
};
mod cartridge;
pub use cartridge::*;
mod controller;
pub use controller::Controller;
mod state;
pub use state::StateBuffer;
mod error;
pub use error::Error;

/// The approximate NTSC CPU clock rate, in hertz.
pub const CPU_CLOCK_SPEED: u32 = 1_789_773;
/// CPU cycles per displayed frame (341 * 262 / 3).
pub const CYCLES_PER_FRAME: u32 = 29780;
/// The non-maskable interrupt vector.
pub const NMI_VECTOR: u16 = 0xFFFA;
/// The reset vector.
pub const RESET_VECTOR: u16 = 0xFFFC;
/// The maskable interrupt / BRK vector.
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// RGB values for each of the 64 colours the picture unit can output.
pub const PALETTE_RGB: [[u8; 3]; 64] = [
    [0x54, 0x54, 0x54], [0x00, 0x1E, 0x74], [0x08, 0x10, 0x90], [0x30, 0x00, 0x88],
    [0x44, 0x00, 0x64], [0x5C, 0x00, 0x30], [0x54, 0x04, 0x00], [0x3C, 0x18, 0x00],
    [0x20, 0x2A, 0x00], [0x08, 0x3A, 0x00], [0x00, 0x40, 0x00], [0x00, 0x3C, 0x00],
    [0x00, 0x32, 0x3C], [0x00, 0x00, 0x00], [0x00, 0x00, 0x00], [0x00, 0x00, 0x00],
    [0x98, 0x96, 0x98], [0x08, 0x4C, 0xC4], [0x30, 0x32, 0xEC], [0x5C, 0x1E, 0xE4],
    [0x88, 0x14, 0xB0], [0xA0, 0x14, 0x64], [0x98, 0x22, 0x20], [0x78, 0x3C, 0x00],
    [0x54, 0x5A, 0x00], [0x28, 0x72, 0x00], [0x08, 0x7C, 0x00], [0x00, 0x76, 0x28],
    [0x00, 0x66, 0x78], [0x00, 0x00, 0x00], [0x00, 0x00, 0x00], [0x00, 0x00, 0x00],
    [0xEC, 0xEE, 0xEC], [0x4C, 0x9A, 0xEC], [0x78, 0x7C, 0xEC], [0xB0, 0x62, 0xEC],
    [0xE4, 0x54, 0xEC], [0xEC, 0x58, 0xB4], [0xEC, 0x6A, 0x64], [0xD4, 0x88, 0x20],
    [0xA0, 0xAA, 0x00], [0x74, 0xC4, 0x00], [0x4C, 0xD0, 0x20], [0x38, 0xCC, 0x6C],
    [0x38, 0xB4, 0xCC], [0x3C, 0x3C, 0x3C], [0x00, 0x00, 0x00], [0x00, 0x00, 0x00],
    [0xEC, 0xEE, 0xEC], [0xA8, 0xCC, 0xEC], [0xBC, 0xBC, 0xEC], [0xD4, 0xB2, 0xEC],
    [0xEC, 0xAE, 0xEC], [0xEC, 0xAE, 0xD4], [0xEC, 0xB4, 0xB0], [0xE4, 0xC4, 0x90],
    [0xCC, 0xD2, 0x78], [0xB4, 0xDE, 0x78], [0xA8, 0xE2, 0x90], [0x98, 0xE2, 0xB4],
    [0xA0, 0xD6, 0xE4], [0xA0, 0xA2, 0xA0], [0x00, 0x00, 0x00], [0x00, 0x00, 0x00],
];
