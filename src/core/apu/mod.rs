//! The audio unit: five channel generators, the frame sequencer, and the
//! nonlinear mixer.
mod envelope;
pub use envelope::Envelope;
mod length_counter;
pub use length_counter::{LengthCounter, LENGTH_TABLE};
mod pulse;
pub use pulse::PulseUnit;
mod triangle;
pub use triangle::TriangleUnit;
mod noise;
pub use noise::NoiseUnit;
mod dmc;
pub use dmc::DmcUnit;

use std::collections::VecDeque;

use crate::core::{Error, StateBuffer, CYCLES_PER_FRAME};

/// Output sample rate the mixer produces for, in hertz.
pub const SAMPLE_RATE: u32 = 44_100;

// 4-step sequence quarter/half frame points, in CPU cycles
const STEP_1: u32 = 7_457;
const STEP_2: u32 = 14_913;
const STEP_3: u32 = 22_371;
const STEP_4: u32 = 29_829;
const SEQUENCE_4_LEN: u32 = 29_830;
// The extra 5-step point
const STEP_5: u32 = 37_281;
const SEQUENCE_5_LEN: u32 = 37_282;

/// The audio processing unit.
///
/// Stepped once per CPU cycle by the bus clock. Produced samples accumulate
/// in [`Apu::sample_queue`] for the host to drain.
pub struct Apu {
    pub pulse_one: PulseUnit,
    pub pulse_two: PulseUnit,
    pub triangle: TriangleUnit,
    pub noise: NoiseUnit,
    pub dmc: DmcUnit,
    clock: u64,
    sequence_count: u32,
    /// True: 5-step sequence, false: 4-step sequence
    long_sequence: bool,
    interrupt_inhibit: bool,
    frame_interrupt: bool,
    frame_reset_countdown: u8,
    mixer: Mixer,
}

impl Default for Apu {
    fn default() -> Self {
        Self::new()
    }
}

impl Apu {
    pub fn new() -> Apu {
        Apu {
            pulse_one: PulseUnit::new(true),
            pulse_two: PulseUnit::new(false),
            triangle: TriangleUnit::default(),
            noise: NoiseUnit::default(),
            dmc: DmcUnit::default(),
            clock: 0,
            sequence_count: 0,
            long_sequence: false,
            interrupt_inhibit: false,
            frame_interrupt: false,
            frame_reset_countdown: 0,
            mixer: Mixer::new(),
        }
    }

    /// Advance the APU by one CPU cycle.
    pub fn step(&mut self) {
        if self.frame_reset_countdown > 0 {
            self.frame_reset_countdown -= 1;
            if self.frame_reset_countdown == 0 {
                self.sequence_count = 0;
            }
        }
        self.sequence_count += 1;
        match self.sequence_count {
            STEP_1 | STEP_3 => self.clock_quarter_frame(),
            STEP_2 => {
                self.clock_quarter_frame();
                self.clock_half_frame();
            }
            STEP_4 => {
                if !self.long_sequence {
                    self.clock_quarter_frame();
                    self.clock_half_frame();
                    if !self.interrupt_inhibit {
                        self.frame_interrupt = true;
                    }
                }
            }
            STEP_5 => {
                if self.long_sequence {
                    self.clock_quarter_frame();
                    self.clock_half_frame();
                }
            }
            _ => {}
        }
        if (!self.long_sequence && self.sequence_count >= SEQUENCE_4_LEN)
            || (self.long_sequence && self.sequence_count >= SEQUENCE_5_LEN)
        {
            self.sequence_count = 0;
        }

        if self.clock % 2 == 0 {
            self.pulse_one.clock_timer();
            self.pulse_two.clock_timer();
        }
        self.triangle.clock_timer();
        self.noise.clock_timer();
        self.dmc.clock_timer();

        self.mixer.clock(
            self.pulse_one.output(),
            self.pulse_two.output(),
            self.triangle.output(),
            self.noise.output(),
            self.dmc.output(),
        );
        self.clock += 1;
    }

    fn clock_quarter_frame(&mut self) {
        self.pulse_one.clock_envelope();
        self.pulse_two.clock_envelope();
        self.noise.clock_envelope();
        self.triangle.clock_linear_counter();
    }
    fn clock_half_frame(&mut self) {
        self.pulse_one.clock_length_counter();
        self.pulse_two.clock_length_counter();
        self.triangle.clock_length_counter();
        self.noise.clock_length_counter();
        self.pulse_one.clock_sweep();
        self.pulse_two.clock_sweep();
    }

    /// Write one of $4000-$4013.
    pub fn write_register(&mut self, addr: u16, value: u8) {
        match addr {
            0x4000..=0x4003 => self.pulse_one.write_register((addr - 0x4000) as u8, value),
            0x4004..=0x4007 => self.pulse_two.write_register((addr - 0x4004) as u8, value),
            0x4008 => self.triangle.write_register(0, value),
            0x400A => self.triangle.write_register(1, value),
            0x400B => self.triangle.write_register(2, value),
            0x400C => self.noise.write_register(0, value),
            0x400E => self.noise.write_register(1, value),
            0x400F => self.noise.write_register(2, value),
            0x4010..=0x4013 => self.dmc.write_register((addr - 0x4010) as u8, value),
            _ => {}
        }
    }

    /// Read the channel/interrupt status register ($4015). Clears the
    /// frame interrupt.
    pub fn read_status(&mut self) -> u8 {
        let mut status = 0;
        if !self.pulse_one.length_counter.silenced() {
            status |= 0x01;
        }
        if !self.pulse_two.length_counter.silenced() {
            status |= 0x02;
        }
        if !self.triangle.length_counter.silenced() {
            status |= 0x04;
        }
        if !self.noise.length_counter.silenced() {
            status |= 0x08;
        }
        if self.dmc.bytes_remaining() > 0 {
            status |= 0x10;
        }
        if self.frame_interrupt {
            status |= 0x40;
        }
        if self.dmc.check_irq() {
            status |= 0x80;
        }
        self.frame_interrupt = false;
        status
    }

    /// Write the channel enable register ($4015).
    pub fn write_status(&mut self, value: u8) {
        self.pulse_one.set_enabled(value & 0x01 != 0);
        self.pulse_two.set_enabled(value & 0x02 != 0);
        self.triangle.set_enabled(value & 0x04 != 0);
        self.noise.set_enabled(value & 0x08 != 0);
        self.dmc.set_enabled(value & 0x10 != 0);
    }

    /// Write the frame counter control register ($4017).
    ///
    /// Resets the sequence after a short start-parity-dependent delay and,
    /// in 5-step mode, clocks the quarter and half frame units immediately.
    pub fn write_frame_counter(&mut self, value: u8) {
        self.long_sequence = value & 0x80 != 0;
        self.interrupt_inhibit = value & 0x40 != 0;
        if self.interrupt_inhibit {
            self.frame_interrupt = false;
        }
        self.frame_reset_countdown = if self.clock % 2 == 0 { 2 } else { 3 };
        if self.long_sequence {
            self.clock_quarter_frame();
            self.clock_half_frame();
        }
    }

    /// Whether the APU is asserting the CPU IRQ line.
    pub fn check_irq(&self) -> bool {
        self.frame_interrupt || self.dmc.check_irq()
    }
    /// Whether the DMC wants a DMA fetch. Clears the request.
    pub fn check_dma_request(&mut self) -> bool {
        self.dmc.take_dma_request()
    }
    /// The CPU bus address of the pending DMC fetch.
    pub fn dma_address(&self) -> u16 {
        self.dmc.dma_address()
    }
    /// Deliver the DMA-fetched byte to the DMC.
    pub fn write_dma_byte(&mut self, byte: u8) {
        self.dmc.write_dma_byte(byte);
    }

    /// The audio output, one [f32] sample per entry. Drained by the host.
    pub fn sample_queue(&mut self) -> &mut VecDeque<f32> {
        &mut self.mixer.samples
    }

    pub fn set_target_frame_rate(&mut self, rate: u32) {
        self.mixer.target_frame_rate = rate.max(1);
        self.mixer.update_cadence();
    }
    pub fn set_turbo(&mut self, enabled: bool) {
        self.mixer.turbo = enabled;
        self.mixer.update_cadence();
    }
    pub fn set_audio_enabled(&mut self, enabled: bool) {
        self.mixer.audio_enabled = enabled;
    }
    pub fn master_volume(&self) -> f32 {
        self.mixer.master_volume
    }
    pub fn set_master_volume(&mut self, volume: f32) {
        self.mixer.master_volume = volume.clamp(0.0, 1.0);
    }
    /// Set one channel's volume scale, indexed pulse 1, pulse 2, triangle,
    /// noise, DMC.
    pub fn set_channel_volume(&mut self, channel: usize, volume: f32) {
        self.mixer.channel_volumes[channel % 5] = volume.clamp(0.0, 1.0);
    }
    pub fn channel_volume(&self, channel: usize) -> f32 {
        self.mixer.channel_volumes[channel % 5]
    }

    pub fn save_state(&self, state: &mut StateBuffer) {
        self.pulse_one.save_state(state);
        self.pulse_two.save_state(state);
        self.triangle.save_state(state);
        self.noise.save_state(state);
        self.dmc.save_state(state);
        state.store_u64(self.clock);
        state.store_u32(self.sequence_count);
        state.store_u8(self.frame_reset_countdown);
        state.store_flags(&[
            self.long_sequence,
            self.interrupt_inhibit,
            self.frame_interrupt,
        ]);
    }
    pub fn load_state(&mut self, state: &StateBuffer) -> Result<(), Error> {
        self.pulse_one.load_state(state)?;
        self.pulse_two.load_state(state)?;
        self.triangle.load_state(state)?;
        self.noise.load_state(state)?;
        self.dmc.load_state(state)?;
        self.clock = state.extract_u64()?;
        self.sequence_count = state.extract_u32()?;
        self.frame_reset_countdown = state.extract_u8()?;
        let flags = state.extract_flags(3)?;
        self.long_sequence = flags[0];
        self.interrupt_inhibit = flags[1];
        self.frame_interrupt = flags[2];
        Ok(())
    }
}

/// Accumulates per-cycle channel output and resolves it through the
/// hardware's two nonlinear summing networks, one sample per
/// `cycles_per_sample` CPU cycles.
struct Mixer {
    pulse_table: [f32; 31],
    tnd_table: [f32; 203],
    accumulators: [f32; 5],
    cycle_count: u32,
    cycles_per_sample: u32,
    cycle_remainder: u32,
    extra_count: u32,
    stretch_sample: bool,
    target_frame_rate: u32,
    turbo: bool,
    audio_enabled: bool,
    master_volume: f32,
    channel_volumes: [f32; 5],
    samples: VecDeque<f32>,
}

impl Mixer {
    fn new() -> Mixer {
        let mut pulse_table = [0.0; 31];
        for (n, entry) in pulse_table.iter_mut().enumerate().skip(1) {
            *entry = 95.52 / (8128.0 / n as f32 + 100.0);
        }
        let mut tnd_table = [0.0; 203];
        for (n, entry) in tnd_table.iter_mut().enumerate().skip(1) {
            *entry = 163.67 / (24329.0 / n as f32 + 100.0);
        }
        let mut mixer = Mixer {
            pulse_table,
            tnd_table,
            accumulators: [0.0; 5],
            cycle_count: 0,
            cycles_per_sample: 0,
            cycle_remainder: 0,
            extra_count: 0,
            stretch_sample: false,
            target_frame_rate: 60,
            turbo: false,
            audio_enabled: true,
            master_volume: 1.0,
            channel_volumes: [1.0; 5],
            samples: VecDeque::new(),
        };
        mixer.update_cadence();
        mixer
    }

    /// Recompute the CPU-cycles-per-sample ratio from the target frame
    /// rate. Turbo stretches the ratio so emulation outruns playback
    /// without shifting pitch.
    fn update_cadence(&mut self) {
        let mut frequency = CYCLES_PER_FRAME * self.target_frame_rate;
        if self.turbo {
            frequency *= 2;
        }
        self.cycles_per_sample = (frequency / SAMPLE_RATE).max(1);
        self.cycle_remainder = frequency % SAMPLE_RATE;
    }

    fn clock(&mut self, p1: u8, p2: u8, t: u8, n: u8, d: u8) {
        for (acc, level) in self
            .accumulators
            .iter_mut()
            .zip([p1, p2, t, n, d].into_iter())
        {
            *acc += level as f32;
        }
        self.cycle_count += 1;
        let target = self.cycles_per_sample + self.stretch_sample as u32;
        if self.cycle_count >= target {
            self.generate_sample();
        }
    }

    fn generate_sample(&mut self) {
        let count = self.cycle_count as f32;
        let mut levels = [0.0; 5];
        for (i, level) in levels.iter_mut().enumerate() {
            *level = self.accumulators[i] / count * self.channel_volumes[i];
        }
        let pulse_index = (levels[0] + levels[1]).round() as usize;
        let tnd_index = (3.0 * levels[2] + 2.0 * levels[3] + levels[4]).round() as usize;
        let sample = (self.pulse_table[pulse_index.min(30)] + self.tnd_table[tnd_index.min(202)])
            * self.master_volume;
        if self.audio_enabled {
            self.samples.push_back(sample);
        }
        self.accumulators = [0.0; 5];
        self.cycle_count = 0;
        // Spread the fractional remainder so cadence drift stays below one
        // sample per second
        self.extra_count += self.cycle_remainder;
        self.stretch_sample = self.extra_count >= SAMPLE_RATE;
        if self.stretch_sample {
            self.extra_count -= SAMPLE_RATE;
        }
    }
}
