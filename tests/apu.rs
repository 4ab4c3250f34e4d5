mod common;

use common::*;
use famicore::core::LENGTH_TABLE;

#[test]
fn test_length_counter_loads_while_enabled() {
    let mut nes = nes_with_program(&[]);
    nes.write(0x01, 0x4015); // enable pulse 1
    nes.write(0x08, 0x4003); // load index 1
    assert_eq!(nes.apu.pulse_one.length_counter.value(), LENGTH_TABLE[1]);
    // Disabling zeroes the counter and further loads are ignored
    nes.write(0x00, 0x4015);
    assert_eq!(nes.apu.pulse_one.length_counter.value(), 0);
    nes.write(0x08, 0x4003);
    assert_eq!(nes.apu.pulse_one.length_counter.value(), 0);
}

#[test]
fn test_five_step_write_clocks_immediately() {
    let mut nes = nes_with_program(&[]);
    nes.write(0x01, 0x4015);
    nes.write(0x00, 0x4000); // halt clear
    nes.write(0x08, 0x4003);
    let loaded = nes.apu.pulse_one.length_counter.value();
    // Writing $4017 with bit 7 set clocks the length counter right away,
    // with no sequencer ticks elapsed
    nes.write(0x80, 0x4017);
    assert_eq!(nes.apu.pulse_one.length_counter.value(), loaded - 1);
}

#[test]
fn test_four_step_write_does_not_clock_immediately() {
    let mut nes = nes_with_program(&[]);
    nes.write(0x01, 0x4015);
    nes.write(0x00, 0x4000);
    nes.write(0x08, 0x4003);
    let loaded = nes.apu.pulse_one.length_counter.value();
    nes.write(0x00, 0x4017);
    assert_eq!(nes.apu.pulse_one.length_counter.value(), loaded);
}

#[test]
fn test_length_counter_halt() {
    let mut nes = nes_with_program(&[]);
    nes.write(0x01, 0x4015);
    nes.write(0x20, 0x4000); // halt set
    nes.write(0x08, 0x4003);
    let loaded = nes.apu.pulse_one.length_counter.value();
    nes.write(0x80, 0x4017);
    assert_eq!(nes.apu.pulse_one.length_counter.value(), loaded);
}

#[test]
fn test_frame_interrupt_in_four_step_mode() {
    let mut nes = nes_with_program(&[]);
    nes.write(0x00, 0x4017); // 4-step, interrupts enabled
    // Run past one full sequence
    for _ in 0..30_000 {
        nes.read(0x0000);
    }
    let status = nes.read(0x4015);
    assert!(status & 0x40 != 0, "frame interrupt flag not set");
    // Reading the status register clears it
    let status = nes.read(0x4015);
    assert!(status & 0x40 == 0, "frame interrupt flag survived a read");
}

#[test]
fn test_no_frame_interrupt_in_five_step_mode() {
    let mut nes = nes_with_program(&[]);
    nes.write(0x80, 0x4017);
    for _ in 0..40_000 {
        nes.read(0x0000);
    }
    let status = nes.read(0x4015);
    assert!(status & 0x40 == 0, "frame interrupt raised in 5-step mode");
}

#[test]
fn test_interrupt_inhibit_clears_flag() {
    let mut nes = nes_with_program(&[]);
    nes.write(0x00, 0x4017);
    for _ in 0..30_000 {
        nes.read(0x0000);
    }
    assert!(nes.apu.check_irq());
    // Setting the inhibit bit clears the pending flag immediately
    nes.write(0x40, 0x4017);
    assert!(!nes.apu.check_irq());
}

#[test]
fn test_status_reports_active_channels() {
    let mut nes = nes_with_program(&[]);
    nes.write(0x0F, 0x4015);
    nes.write(0x08, 0x4003); // pulse 1 length
    nes.write(0x08, 0x400B); // triangle length
    let status = nes.read(0x4015);
    assert_eq!(status & 0x0F, 0x05);
}

#[test]
fn test_length_counters_decrement_over_a_sequence() {
    let mut nes = nes_with_program(&[]);
    nes.write(0x01, 0x4015);
    nes.write(0x00, 0x4000);
    nes.write(0x08, 0x4003);
    let loaded = nes.apu.pulse_one.length_counter.value();
    nes.write(0x00, 0x4017);
    // One full 4-step sequence contains two half-frame clocks
    for _ in 0..30_000 {
        nes.read(0x0000);
    }
    assert_eq!(nes.apu.pulse_one.length_counter.value(), loaded - 2);
}

#[test]
fn test_sweep_negate_differs_between_pulse_units() {
    let mut nes = nes_with_program(&[]);
    nes.write(0x03, 0x4015);
    // Period 0x100 on both channels, sweep enabled, negate, shift 1
    for base in [0x4000u16, 0x4004] {
        nes.write(0x00, base + 2);
        nes.write(0x01, base + 3);
        nes.write(0x89, base + 1);
    }
    // Force a half-frame clock
    nes.write(0x80, 0x4017);
    // Pulse one subtracts with ones' complement, landing one short
    assert_eq!(nes.apu.pulse_one.timer_period, 0x100 - 0x80 - 1);
    assert_eq!(nes.apu.pulse_two.timer_period, 0x100 - 0x80);
}

#[test]
fn test_mixer_produces_samples() {
    let mut nes = nes_with_program(&[]);
    for _ in 0..30_000 {
        nes.read(0x0000);
    }
    // ~30k cycles at 60fps is roughly 740 samples
    let samples = nes.apu.sample_queue().len();
    assert!(
        (600..900).contains(&samples),
        "unexpected sample count {}",
        samples
    );
}

#[test]
fn test_dmc_dma_stalls_and_fetches() {
    // Point the DMC at 0xC000 (inside the NOP-filled test ROM), enable it,
    // and check the sample buffer was filled by DMA
    let mut nes = nes_with_program(&[]);
    nes.write(0x0F, 0x4010); // fastest rate, no IRQ
    nes.write(0x00, 0x4012); // sample address 0xC000
    nes.write(0x00, 0x4013); // sample length 1 byte
    let cycles = nes.cpu.cycles;
    nes.write(0x10, 0x4015); // enable DMC, requesting DMA
    // Let the delayed DMA run
    for _ in 0..8 {
        nes.read(0x0000);
    }
    assert!(nes.cpu.cycles > cycles);
    assert!(!nes.apu.dmc.buffer_empty, "DMC buffer not filled by DMA");
    assert_eq!(nes.apu.dmc.sample_buffer, 0xEA);
}
