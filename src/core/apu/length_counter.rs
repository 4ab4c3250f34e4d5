use crate::core::{Error, StateBuffer};

/// Length values indexed by the 5 bit load field of the channel registers.
pub const LENGTH_TABLE: [u8; 32] = [
    10, 254, 20, 2, 40, 4, 80, 6, 160, 8, 60, 10, 14, 12, 26, 14, 12, 16, 24, 18, 48, 20, 96, 22,
    192, 24, 72, 26, 16, 28, 32, 30,
];

/// A length counter. Silences its channel when it reaches zero, and only
/// counts while the channel is enabled and its halt flag is clear.
#[derive(Default)]
pub struct LengthCounter {
    counter: u8,
    enabled: bool,
    /// The halt flag. Doubles as the envelope loop flag on channels that
    /// have one.
    pub halt: bool,
}

impl LengthCounter {
    /// Enable or disable the channel via the status register. Disabling
    /// zeroes the counter immediately.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.counter = 0;
        }
    }
    pub fn enabled(&self) -> bool {
        self.enabled
    }
    /// Reload from the length table. Ignored while the channel is disabled.
    pub fn load(&mut self, index: u8) {
        if self.enabled {
            self.counter = LENGTH_TABLE[index as usize % 32];
        }
    }
    /// Half-frame clock.
    pub fn clock(&mut self) {
        if !self.halt && self.counter > 0 {
            self.counter -= 1;
        }
    }
    pub fn silenced(&self) -> bool {
        self.counter == 0
    }
    pub fn value(&self) -> u8 {
        self.counter
    }

    pub fn save_state(&self, state: &mut StateBuffer) {
        state.store_u8(self.counter);
        state.store_flags(&[self.enabled, self.halt]);
    }
    pub fn load_state(&mut self, state: &StateBuffer) -> Result<(), Error> {
        self.counter = state.extract_u8()?;
        let flags = state.extract_flags(2)?;
        self.enabled = flags[0];
        self.halt = flags[1];
        Ok(())
    }
}
