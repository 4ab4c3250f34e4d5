use crate::core::{
    apu::{envelope::Envelope, length_counter::LengthCounter},
    Error, StateBuffer,
};

const DUTY_SEQUENCES: [[u8; 8]; 4] = [
    [0, 1, 0, 0, 0, 0, 0, 0],
    [0, 1, 1, 0, 0, 0, 0, 0],
    [0, 1, 1, 1, 1, 0, 0, 0],
    [1, 0, 0, 1, 1, 1, 1, 1],
];

/// One of the two pulse wave channels.
///
/// The two units differ only in their sweep adders: pulse one negates with
/// a ones' complement, so its downward sweeps land one step short.
pub struct PulseUnit {
    pub envelope: Envelope,
    pub length_counter: LengthCounter,
    pub duty: u8,
    pub sequence_count: u8,
    pub timer: u16,
    pub timer_period: u16,
    pub sweep_enabled: bool,
    pub sweep_negate: bool,
    pub sweep_reload: bool,
    pub sweep_shift: u8,
    pub sweep_divider: u8,
    pub sweep_divider_counter: u8,
    pub is_pulse_one: bool,
}

impl PulseUnit {
    pub fn new(is_pulse_one: bool) -> PulseUnit {
        PulseUnit {
            envelope: Envelope::default(),
            length_counter: LengthCounter::default(),
            duty: 0,
            sequence_count: 0,
            timer: 0,
            timer_period: 0,
            sweep_enabled: false,
            sweep_negate: false,
            sweep_reload: false,
            sweep_shift: 0,
            sweep_divider: 0,
            sweep_divider_counter: 0,
            is_pulse_one,
        }
    }

    /// Write one of the four channel registers ($4000-$4003 / $4004-$4007).
    pub fn write_register(&mut self, reg: u8, value: u8) {
        match reg % 4 {
            0 => {
                self.duty = value >> 6;
                self.length_counter.halt = value & 0x20 != 0;
                self.envelope.constant = value & 0x10 != 0;
                self.envelope.volume = value & 0x0F;
            }
            1 => {
                self.sweep_enabled = value & 0x80 != 0;
                self.sweep_divider = (value >> 4) & 0x07;
                self.sweep_negate = value & 0x08 != 0;
                self.sweep_shift = value & 0x07;
                self.sweep_reload = true;
            }
            2 => self.timer_period = (self.timer_period & 0x0700) | value as u16,
            _ => {
                self.timer_period = (self.timer_period & 0x00FF) | ((value as u16 & 0x07) << 8);
                self.length_counter.load(value >> 3);
                self.sequence_count = 0;
                self.envelope.restart();
            }
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.length_counter.set_enabled(enabled);
    }

    /// Clocked every second CPU cycle.
    pub fn clock_timer(&mut self) {
        if self.timer == 0 {
            self.timer = self.timer_period;
            self.sequence_count = (self.sequence_count + 1) % 8;
        } else {
            self.timer -= 1;
        }
    }

    fn sweep_target_period(&self) -> u16 {
        let change = self.timer_period >> self.sweep_shift;
        if self.sweep_negate {
            // Pulse one's adder carries no carry-in, subtracting one extra
            self.timer_period
                .wrapping_sub(change)
                .wrapping_sub(self.is_pulse_one as u16)
        } else {
            self.timer_period + change
        }
    }

    /// Half-frame clock.
    pub fn clock_sweep(&mut self) {
        if self.sweep_divider_counter == 0
            && self.sweep_enabled
            && self.sweep_shift > 0
            && !self.muted()
        {
            self.timer_period = self.sweep_target_period() & 0x07FF;
        }
        if self.sweep_divider_counter == 0 || self.sweep_reload {
            self.sweep_divider_counter = self.sweep_divider;
            self.sweep_reload = false;
        } else {
            self.sweep_divider_counter -= 1;
        }
    }

    /// Quarter-frame clock.
    pub fn clock_envelope(&mut self) {
        self.envelope.clock(self.length_counter.halt);
    }
    /// Half-frame clock.
    pub fn clock_length_counter(&mut self) {
        self.length_counter.clock();
    }

    fn muted(&self) -> bool {
        self.timer_period < 8 || self.sweep_target_period() > 0x07FF
    }

    /// The channel's current contribution to the mixer, 0-15.
    pub fn output(&self) -> u8 {
        if self.muted()
            || self.length_counter.silenced()
            || DUTY_SEQUENCES[self.duty as usize][self.sequence_count as usize] == 0
        {
            0
        } else {
            self.envelope.output()
        }
    }

    pub fn save_state(&self, state: &mut StateBuffer) {
        self.envelope.save_state(state);
        self.length_counter.save_state(state);
        state.store_u8(self.duty);
        state.store_u8(self.sequence_count);
        state.store_u16(self.timer);
        state.store_u16(self.timer_period);
        state.store_u8(self.sweep_shift);
        state.store_u8(self.sweep_divider);
        state.store_u8(self.sweep_divider_counter);
        state.store_flags(&[self.sweep_enabled, self.sweep_negate, self.sweep_reload]);
    }
    pub fn load_state(&mut self, state: &StateBuffer) -> Result<(), Error> {
        self.envelope.load_state(state)?;
        self.length_counter.load_state(state)?;
        self.duty = state.extract_u8()?;
        self.sequence_count = state.extract_u8()?;
        self.timer = state.extract_u16()?;
        self.timer_period = state.extract_u16()?;
        self.sweep_shift = state.extract_u8()?;
        self.sweep_divider = state.extract_u8()?;
        self.sweep_divider_counter = state.extract_u8()?;
        let flags = state.extract_flags(3)?;
        self.sweep_enabled = flags[0];
        self.sweep_negate = flags[1];
        self.sweep_reload = flags[2];
        Ok(())
    }
}
