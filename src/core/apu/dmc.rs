use crate::core::{Error, StateBuffer};

/// NTSC delta playback rates, in CPU cycles per output bit.
const TIMER_PERIODS: [u16; 16] = [
    428, 380, 340, 320, 286, 254, 226, 214, 190, 160, 142, 128, 106, 84, 72, 54,
];

/// The delta modulation channel.
///
/// Plays 1 bit delta-encoded samples fetched from PRG memory over DMA,
/// nudging a 7 bit output level up or down per bit. When its one byte
/// buffer empties with bytes still remaining it raises a DMA request, which
/// the CPU services by stalling and calling [`DmcUnit::write_dma_byte`].
pub struct DmcUnit {
    pub timer: u16,
    pub timer_period: u16,
    pub output_level: u8,
    pub sample_address: u16,
    pub current_address: u16,
    pub sample_length: u16,
    pub bytes_remaining: u16,
    pub sample_buffer: u8,
    pub buffer_empty: bool,
    pub shift_register: u8,
    pub bits_remaining: u8,
    pub silence: bool,
    pub loop_flag: bool,
    pub irq_enabled: bool,
    pub irq_flag: bool,
    pub dma_request: bool,
}

impl Default for DmcUnit {
    fn default() -> Self {
        DmcUnit {
            timer: 0,
            timer_period: TIMER_PERIODS[0],
            output_level: 0,
            sample_address: 0xC000,
            current_address: 0xC000,
            sample_length: 1,
            bytes_remaining: 0,
            sample_buffer: 0,
            buffer_empty: true,
            shift_register: 0,
            bits_remaining: 8,
            silence: true,
            loop_flag: false,
            irq_enabled: false,
            irq_flag: false,
            dma_request: false,
        }
    }
}

impl DmcUnit {
    /// Write one of the channel registers ($4010-$4013).
    pub fn write_register(&mut self, reg: u8, value: u8) {
        match reg % 4 {
            0 => {
                self.irq_enabled = value & 0x80 != 0;
                if !self.irq_enabled {
                    self.irq_flag = false;
                }
                self.loop_flag = value & 0x40 != 0;
                self.timer_period = TIMER_PERIODS[(value & 0x0F) as usize];
            }
            1 => self.output_level = value & 0x7F,
            2 => self.sample_address = 0xC000 + 64 * value as u16,
            _ => self.sample_length = 16 * value as u16 + 1,
        }
    }

    fn restart_sample(&mut self) {
        self.current_address = self.sample_address;
        self.bytes_remaining = self.sample_length;
    }

    /// Enable/disable via the status register. Always clears the interrupt
    /// flag; enabling restarts the sample if it had run out.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.irq_flag = false;
        if enabled {
            if self.bytes_remaining == 0 {
                self.restart_sample();
                if self.buffer_empty {
                    self.dma_request = true;
                }
            }
        } else {
            self.bytes_remaining = 0;
        }
    }

    /// Clocked every CPU cycle.
    pub fn clock_timer(&mut self) {
        if self.timer > 0 {
            self.timer -= 1;
            return;
        }
        self.timer = self.timer_period - 1;
        if !self.silence {
            if self.shift_register & 0x01 != 0 {
                if self.output_level <= 125 {
                    self.output_level += 2;
                }
            } else if self.output_level >= 2 {
                self.output_level -= 2;
            }
        }
        self.shift_register >>= 1;
        self.bits_remaining -= 1;
        if self.bits_remaining == 0 {
            self.bits_remaining = 8;
            if self.buffer_empty {
                self.silence = true;
            } else {
                self.silence = false;
                self.shift_register = self.sample_buffer;
                self.buffer_empty = true;
                if self.bytes_remaining > 0 {
                    self.dma_request = true;
                }
            }
        }
    }

    /// Whether a DMA fetch is wanted. Clears the request.
    pub fn take_dma_request(&mut self) -> bool {
        let request = self.dma_request;
        self.dma_request = false;
        request
    }
    /// The CPU bus address the next sample byte should be fetched from.
    pub fn dma_address(&self) -> u16 {
        self.current_address
    }
    /// Deliver a DMA-fetched sample byte.
    pub fn write_dma_byte(&mut self, byte: u8) {
        self.sample_buffer = byte;
        self.buffer_empty = false;
        // The address wraps from the top of memory back to 0x8000
        self.current_address = if self.current_address == 0xFFFF {
            0x8000
        } else {
            self.current_address + 1
        };
        if self.bytes_remaining > 0 {
            self.bytes_remaining -= 1;
            if self.bytes_remaining == 0 {
                if self.loop_flag {
                    self.restart_sample();
                } else if self.irq_enabled {
                    self.irq_flag = true;
                }
            }
        }
    }

    pub fn bytes_remaining(&self) -> u16 {
        self.bytes_remaining
    }
    pub fn check_irq(&self) -> bool {
        self.irq_flag
    }
    /// The channel's current contribution to the mixer, 0-127.
    pub fn output(&self) -> u8 {
        self.output_level
    }

    pub fn save_state(&self, state: &mut StateBuffer) {
        state.store_u16(self.timer);
        state.store_u16(self.timer_period);
        state.store_u8(self.output_level);
        state.store_u16(self.sample_address);
        state.store_u16(self.current_address);
        state.store_u16(self.sample_length);
        state.store_u16(self.bytes_remaining);
        state.store_u8(self.sample_buffer);
        state.store_u8(self.shift_register);
        state.store_u8(self.bits_remaining);
        state.store_flags(&[
            self.buffer_empty,
            self.silence,
            self.loop_flag,
            self.irq_enabled,
            self.irq_flag,
            self.dma_request,
        ]);
    }
    pub fn load_state(&mut self, state: &StateBuffer) -> Result<(), Error> {
        self.timer = state.extract_u16()?;
        self.timer_period = state.extract_u16()?;
        self.output_level = state.extract_u8()?;
        self.sample_address = state.extract_u16()?;
        self.current_address = state.extract_u16()?;
        self.sample_length = state.extract_u16()?;
        self.bytes_remaining = state.extract_u16()?;
        self.sample_buffer = state.extract_u8()?;
        self.shift_register = state.extract_u8()?;
        self.bits_remaining = state.extract_u8()?;
        let flags = state.extract_flags(6)?;
        self.buffer_empty = flags[0];
        self.silence = flags[1];
        self.loop_flag = flags[2];
        self.irq_enabled = flags[3];
        self.irq_flag = flags[4];
        self.dma_request = flags[5];
        Ok(())
    }
}
