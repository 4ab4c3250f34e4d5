use log::*;

use crate::core::{
    opcodes::{AddressingMode, Instruction, OPCODE_TABLE},
    Apu, Cartridge, Controller, Cpu, Error, Ppu, StateBuffer, IRQ_VECTOR, NMI_VECTOR,
    RESET_VECTOR,
};

const STACK_BASE: u16 = 0x100;

/// The console.
///
/// Owns the [`Cpu`], [`Ppu`], [`Apu`] and [`Cartridge`] and keeps them
/// synchronized: [`Nes::read`] and [`Nes::write`] are the bus primitives
/// every instruction uses, and each call advances the master clock by one
/// CPU cycle, stepping the picture unit three dots and the audio unit once.
/// Changing that interleaving desynchronizes sprite-zero hits and NMI
/// timing from real hardware, so all memory-mapped I/O goes through these
/// two methods.
pub struct Nes {
    pub cpu: Cpu,
    pub ppu: Ppu,
    pub apu: Apu,
    pub cartridge: Cartridge,
    pub controllers: [Controller; 2],
    // Set while an accumulator-mode instruction body runs, so its
    // read/write hit A instead of the bus
    accumulator_mode: bool,
}

impl Default for Nes {
    fn default() -> Self {
        Self::new()
    }
}

impl Nes {
    /// A console with a blank 32K NROM cartridge inserted. Only useful for
    /// tests and documentation examples; use [`Nes::with_cartridge`] for
    /// real emulation.
    pub fn new() -> Nes {
        let image = [
            &b"NES\x1A"[..],
            &[2, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0][..],
            &vec![0; 2 * 0x4000 + 0x2000][..],
        ]
        .concat();
        let cartridge =
            Cartridge::from_ines(&image, None).expect("blank cartridge image is valid");
        Nes::with_cartridge(cartridge)
    }

    /// A console with the given cartridge inserted. The program counter is
    /// initialized from the reset vector.
    pub fn with_cartridge(cartridge: Cartridge) -> Nes {
        let mut nes = Nes {
            cpu: Cpu::new(),
            ppu: Ppu::new(),
            apu: Apu::new(),
            cartridge,
            controllers: [Controller::new(); 2],
            accumulator_mode: false,
        };
        nes.cpu.pc = (nes.peek(RESET_VECTOR.wrapping_add(1)) as u16) << 8
            | nes.peek(RESET_VECTOR) as u16;
        info!("Initialized PC to {:#06X}", nes.cpu.pc);
        nes
    }

    /// Reset the console: reload PC from the reset vector without touching
    /// memory, the way the hardware's reset line does.
    pub fn reset(&mut self) {
        self.cpu.pc =
            (self.peek(RESET_VECTOR.wrapping_add(1)) as u16) << 8 | self.peek(RESET_VECTOR) as u16;
        self.cpu.s = self.cpu.s.wrapping_sub(3);
        self.cpu.p.i = true;
    }

    /// Update one controller's state. The ROM still has to strobe and
    /// shift the port to observe it.
    pub fn set_controller(&mut self, port: usize, state: Controller) {
        self.controllers[port % 2] = state;
    }

    // ---- The master clock ----

    // One CPU cycle: advance the cycle counter and the audio unit, and
    // latch any DMC DMA request with its 4 cycle service delay
    fn tick(&mut self) {
        self.cpu.cycles += 1;
        self.apu.step();
        if self.apu.check_dma_request() {
            self.cpu.dmc_dma_delay = 4;
        }
    }

    // Promote the edge captured on a previous poll to a pending interrupt
    fn capture_nmi(&mut self) {
        if self.cpu.nmi_raised {
            self.cpu.nmi_raised = false;
            self.cpu.nmi_pending = true;
        }
    }

    // Detect a rising edge on the PPU's NMI output
    fn poll_nmi_line(&mut self) {
        let line = self.ppu.nmi_active();
        if !self.cpu.nmi_line && line {
            self.cpu.nmi_raised = true;
        }
        self.cpu.nmi_line = line;
    }

    // Sample the combined IRQ line (APU frame/DMC interrupts OR the
    // mapper's interrupt), masked by the I flag
    fn check_irq_lines(&mut self) {
        let irq = self.apu.check_irq() || self.cartridge.check_irq();
        self.cpu.irq_raised = irq && !self.cpu.p.i;
    }

    /// Read a byte on the CPU bus, advancing the master clock one cycle.
    pub fn read(&mut self, address: u16) -> u8 {
        self.read_with(address, false)
    }

    fn read_with(&mut self, address: u16, no_dma: bool) -> u8 {
        if self.accumulator_mode {
            return self.cpu.a;
        }
        self.cpu.irq_pending = self.cpu.irq_raised;
        self.tick();

        while self.cpu.dmc_dma_delay > 0 && !no_dma {
            self.cpu.dmc_dma_delay -= 1;
            self.read_with(self.cpu.pc, true);
            if self.cpu.dmc_dma_delay == 0 {
                self.do_dmc_dma();
            }
        }

        self.capture_nmi();
        self.ppu.step(&mut self.cartridge);
        self.ppu.step(&mut self.cartridge);

        let value = match address {
            0x0000..=0x1FFF => self.cpu.ram[address as usize % 0x800],
            0x2000..=0x3FFF => match (address - 0x2000) % 8 {
                2 => self.ppu.read_status(),
                4 => self.ppu.read_oam_data(),
                7 => self.ppu.read_data(&mut self.cartridge),
                _ => 0x00,
            },
            0x4015 => self.apu.read_status(),
            0x4016 => self.read_controller_shift(0),
            0x4017 => self.read_controller_shift(1),
            0x4000..=0x401F => 0x00,
            0x4020..=0xFFFF => self.cartridge.cpu_read(address),
        };

        self.ppu.step(&mut self.cartridge);
        self.poll_nmi_line();
        self.check_irq_lines();

        value
    }

    /// Write a byte on the CPU bus, advancing the master clock one cycle.
    pub fn write(&mut self, value: u8, address: u16) {
        self.write_with(value, address, false)
    }

    fn write_with(&mut self, value: u8, address: u16, no_dma: bool) {
        if self.accumulator_mode {
            self.cpu.a = value;
            return;
        }
        self.cpu.irq_pending = self.cpu.irq_raised;
        self.tick();

        if self.cpu.dmc_dma_delay > 0 && !no_dma {
            self.cpu.dmc_dma_delay -= 1;
        }

        self.capture_nmi();
        self.ppu.step(&mut self.cartridge);

        if address == 0x4014 && !no_dma {
            // A DMC DMA requested this cycle slips in before the transfer
            if self.cpu.dmc_dma_delay > 0 {
                self.read_with(self.cpu.pc, true);
                self.read_with(self.cpu.pc, true);
                self.do_dmc_dma();
                self.cpu.dmc_dma_delay = 0;
            }
            self.do_oam_dma(value);
        } else {
            match address {
                0x0000..=0x1FFF => self.cpu.ram[address as usize % 0x800] = value,
                0x2000..=0x3FFF => match (address - 0x2000) % 8 {
                    0 => self.ppu.write_ctrl(value),
                    1 => self.ppu.write_mask(value),
                    3 => self.ppu.write_oam_addr(value),
                    4 => self.ppu.write_oam_data(value),
                    5 => self.ppu.write_scroll(value),
                    6 => self.ppu.write_addr(&mut self.cartridge, value),
                    7 => self.ppu.write_data(&mut self.cartridge, value),
                    _ => {}
                },
                0x4000..=0x4013 => self.apu.write_register(address, value),
                0x4015 => self.apu.write_status(value),
                0x4016 => self.write_controller_strobe(value),
                0x4017 => self.apu.write_frame_counter(value),
                0x4020..=0xFFFF => {
                    let cycle = self.cpu.cycles;
                    self.cartridge.cpu_write(address, value, cycle);
                }
                _ => {}
            }
        }

        self.ppu.step(&mut self.cartridge);
        self.ppu.step(&mut self.cartridge);
        self.poll_nmi_line();
        self.check_irq_lines();
    }

    /// Side-effect-free read, for diagnostics and trace logging. The PPU
    /// and APU register windows read as open bus.
    pub fn peek(&self, address: u16) -> u8 {
        match address {
            0x0000..=0x1FFF => self.cpu.ram[address as usize % 0x800],
            0x4020..=0xFFFF => self.cartridge.cpu_peek(address),
            _ => 0xFF,
        }
    }

    // ---- DMA ----

    fn do_dmc_dma(&mut self) {
        // The DMC's address is a plain CPU bus address; the mapper decides
        // what it reads
        let address = self.apu.dma_address();
        let byte = self.cartridge.cpu_read(address);
        self.apu.write_dma_byte(byte);
    }

    // Copy a page into OAM via $2004. 513 cycles, or 514 with the
    // alignment cycle; a pending DMC DMA is serviced at most once.
    fn do_oam_dma(&mut self, page: u8) {
        let base = (page as u16) << 8;

        if self.cpu.cycles % 2 == 0 {
            self.read_with(self.cpu.pc, true);
            if self.cpu.dmc_dma_delay > 0 {
                self.read_with(self.cpu.pc, true);
                self.read_with(self.cpu.pc, true);
                self.do_dmc_dma();
                self.cpu.dmc_dma_delay = 0;
            }
        }

        self.read_with(self.cpu.pc, true);
        if self.cpu.dmc_dma_delay > 0 {
            self.read_with(self.cpu.pc, true);
            self.read_with(self.cpu.pc, true);
            self.do_dmc_dma();
            self.cpu.dmc_dma_delay = 0;
        }

        for i in 0..0x100u16 {
            let value = self.read_with(base + i, true);
            self.write_with(value, 0x2004, true);

            if self.cpu.dmc_dma_delay > 0 {
                match i {
                    0xFE => {
                        self.read_with(self.cpu.pc, true);
                    }
                    0xFF => {
                        self.read_with(self.cpu.pc, true);
                        self.read_with(self.cpu.pc, true);
                        self.read_with(self.cpu.pc, true);
                    }
                    _ => {
                        self.read_with(self.cpu.pc, true);
                        self.read_with(self.cpu.pc, true);
                    }
                }
                self.do_dmc_dma();
                self.cpu.dmc_dma_delay = 0;
            }
        }
    }

    // ---- Controllers ----

    fn read_controller_shift(&mut self, port: usize) -> u8 {
        if self.cpu.controller_strobe {
            self.cpu.controller_shift[port] = self.controllers[port].to_shift();
        }
        let value = self.cpu.controller_shift[port] & 0x1;
        self.cpu.controller_shift[port] >>= 1;
        value
    }

    fn write_controller_strobe(&mut self, value: u8) {
        self.cpu.controller_strobe = value & 0x1 != 0;
        for port in 0..2 {
            self.cpu.controller_shift[port] = self.controllers[port].to_shift();
        }
    }

    // ---- Interrupt service ----

    fn do_nmi(&mut self) {
        let pc = self.cpu.pc;
        self.read(pc);
        self.read(pc);
        self.push_stack((pc >> 8) as u8);
        self.push_stack((pc & 0xFF) as u8);
        let p = self.cpu.p.to_byte();
        self.push_stack(p);
        self.cpu.p.i = true;
        let low = self.read(NMI_VECTOR) as u16;
        let high = self.read(NMI_VECTOR + 1) as u16;
        self.cpu.pc = (high << 8) | low;
    }

    fn do_irq(&mut self) {
        let pc = self.cpu.pc;
        self.read(pc);
        self.read(pc);
        self.push_stack((pc >> 8) as u8);
        self.push_stack((pc & 0xFF) as u8);
        let p = self.cpu.p.to_byte();
        self.push_stack(p);
        self.cpu.p.i = true;
        let low = self.read(IRQ_VECTOR) as u16;
        let high = self.read(IRQ_VECTOR + 1) as u16;
        self.cpu.pc = (high << 8) | low;
    }

    // ---- Stack helpers ----

    fn push_stack(&mut self, value: u8) {
        let s = self.cpu.s;
        self.write(value, STACK_BASE + s as u16);
        self.cpu.s = s.wrapping_sub(1);
    }
    // Read at the current stack pointer without moving it
    fn read_stack(&mut self) -> u8 {
        self.read(STACK_BASE + self.cpu.s as u16)
    }
    fn increment_s(&mut self) {
        self.cpu.s = self.cpu.s.wrapping_add(1);
    }

    // ---- Execution ----

    /// Execute exactly one instruction, servicing any pending interrupt
    /// (NMI before IRQ) first.
    ///
    /// A halt opcode is fatal and ends the session.
    pub fn step(&mut self) -> Result<(), Error> {
        if self.cpu.nmi_pending {
            self.cpu.nmi_pending = false;
            self.do_nmi();
        } else if self.cpu.irq_pending {
            self.cpu.irq_pending = false;
            self.do_irq();
        }

        if log_enabled!(Level::Trace) {
            trace!("{}", self.trace_line());
        }

        let pc = self.cpu.pc;
        let opcode = self.read(pc);
        self.cpu.pc = pc.wrapping_add(1);
        let info = OPCODE_TABLE[opcode as usize];

        use AddressingMode::*;
        let address = match info.mode {
            Absolute => self.absolute(),
            AbsoluteX => self.absolute_x(info.read_modify_write),
            AbsoluteY => self.absolute_y(info.read_modify_write),
            Accumulator => self.accumulator(),
            Immediate => self.immediate(),
            Indirect => self.indirect(),
            IndirectX => self.indirect_x(),
            IndirectY => self.indirect_y(info.read_modify_write),
            Relative => self.relative(),
            ZeroPage => self.zero_page(),
            ZeroPageX => self.zero_page_x(),
            ZeroPageY => self.zero_page_y(),
            Implied => self.cpu.pc,
        };

        use Instruction::*;
        match info.instruction {
            Adc => self.do_adc(address),
            And => self.do_and(address),
            Asl => self.do_asl(address),
            Bcc => self.do_branch_if(address, !self.cpu.p.c),
            Bcs => self.do_branch_if(address, self.cpu.p.c),
            Beq => self.do_branch_if(address, self.cpu.p.z),
            Bit => self.do_bit(address),
            Bmi => self.do_branch_if(address, self.cpu.p.n),
            Bne => self.do_branch_if(address, !self.cpu.p.z),
            Bpl => self.do_branch_if(address, !self.cpu.p.n),
            Brk => self.do_brk(),
            Bvc => self.do_branch_if(address, !self.cpu.p.v),
            Bvs => self.do_branch_if(address, self.cpu.p.v),
            Clc => self.do_flag(|p| p.c = false),
            Cld => self.do_flag(|p| p.d = false),
            Cli => self.do_flag(|p| p.i = false),
            Clv => self.do_flag(|p| p.v = false),
            Cmp => self.do_cmp(address),
            Cpx => self.do_cpx(address),
            Cpy => self.do_cpy(address),
            Dec => self.do_dec(address),
            Dex => self.do_dex(),
            Dey => self.do_dey(),
            Eor => self.do_eor(address),
            Inc => self.do_inc(address),
            Inx => self.do_inx(),
            Iny => self.do_iny(),
            Jmp => self.cpu.pc = address,
            Jsr => self.do_jsr(),
            Lda => self.do_lda(address),
            Ldx => self.do_ldx(address),
            Ldy => self.do_ldy(address),
            Lsr => self.do_lsr(address),
            Nop => {
                self.read(address);
            }
            Ora => self.do_ora(address),
            Pha => self.do_pha(),
            Php => self.do_php(),
            Pla => self.do_pla(),
            Plp => self.do_plp(),
            Rol => self.do_rol(address),
            Ror => self.do_ror(address),
            Rti => self.do_rti(),
            Rts => self.do_rts(),
            Sbc => self.do_sbc(address),
            Sec => self.do_flag(|p| p.c = true),
            Sed => self.do_flag(|p| p.d = true),
            Sei => self.do_flag(|p| p.i = true),
            Sta => {
                let a = self.cpu.a;
                self.write(a, address);
            }
            Stx => {
                let x = self.cpu.x;
                self.write(x, address);
            }
            Sty => {
                let y = self.cpu.y;
                self.write(y, address);
            }
            Tax => self.do_transfer(|cpu| cpu.a, |cpu, v| cpu.x = v, true),
            Tay => self.do_transfer(|cpu| cpu.a, |cpu, v| cpu.y = v, true),
            Tsx => self.do_transfer(|cpu| cpu.s, |cpu, v| cpu.x = v, true),
            Txa => self.do_transfer(|cpu| cpu.x, |cpu, v| cpu.a = v, true),
            Txs => self.do_transfer(|cpu| cpu.x, |cpu, v| cpu.s = v, false),
            Tya => self.do_transfer(|cpu| cpu.y, |cpu, v| cpu.a = v, true),
            Ahx => self.do_ahx(address),
            Alr => self.do_alr(address),
            Anc => self.do_anc(address),
            Arr => self.do_arr(address),
            Axs => self.do_axs(address),
            Dcp => self.do_dcp(address),
            Isc => self.do_isc(address),
            Las => self.do_las(address),
            Lax => self.do_lax(address),
            Rla => self.do_rla(address),
            Rra => self.do_rra(address),
            Sax => {
                let v = self.cpu.a & self.cpu.x;
                self.write(v, address);
            }
            Shx => self.do_shx(address),
            Shy => self.do_shy(address),
            Slo => self.do_slo(address),
            Sre => self.do_sre(address),
            Tas => self.do_tas(address),
            Xaa => self.do_xaa(address),
            Stp => {
                let halt = Error::CpuHalt { opcode, pc };
                error!("{}", halt);
                return Err(halt);
            }
        }
        self.accumulator_mode = false;
        Ok(())
    }

    /// Run until the picture unit finishes the frame in progress.
    pub fn step_frame(&mut self) -> Result<(), Error> {
        while !self.ppu.end_of_frame() {
            self.step()?;
        }
        Ok(())
    }

    // One trace-log line in the reference format: program counter, opcode,
    // mnemonic (* for unofficial), registers, PPU position, cycle count
    fn trace_line(&self) -> String {
        let pc = self.cpu.pc;
        let opcode = self.peek(pc);
        let info = OPCODE_TABLE[opcode as usize];
        format!(
            "{:04X}  {:02X} {}{} A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} PPU:{:3},{:3} CYC:{}",
            pc,
            opcode,
            if info.official { ' ' } else { '*' },
            info.instruction.mnemonic(),
            self.cpu.a,
            self.cpu.x,
            self.cpu.y,
            self.cpu.p.to_byte(),
            self.cpu.s,
            self.ppu.scanline(),
            self.ppu.dot(),
            self.cpu.cycles,
        )
    }

    // ---- Addressing modes ----
    // Each consumes the documented bus cycles, including the dummy reads
    // real hardware performs.

    fn relative(&mut self) -> u16 {
        let pc = self.cpu.pc;
        self.cpu.pc = pc.wrapping_add(1);
        pc
    }

    fn accumulator(&mut self) -> u16 {
        let pc = self.cpu.pc;
        self.read(pc);
        self.accumulator_mode = true;
        pc
    }

    fn immediate(&mut self) -> u16 {
        let pc = self.cpu.pc;
        self.cpu.pc = pc.wrapping_add(1);
        pc
    }

    fn zero_page(&mut self) -> u16 {
        let pc = self.cpu.pc;
        self.cpu.pc = pc.wrapping_add(1);
        self.read(pc) as u16
    }

    fn zero_page_indexed(&mut self, index: u8) -> u16 {
        let pc = self.cpu.pc;
        self.cpu.pc = pc.wrapping_add(1);
        let initial = self.read(pc);
        let address = initial.wrapping_add(index);
        // The indexed address wraps within the zero page, after a read of
        // the unindexed address
        self.read(initial as u16);
        address as u16
    }
    fn zero_page_x(&mut self) -> u16 {
        self.zero_page_indexed(self.cpu.x)
    }
    fn zero_page_y(&mut self) -> u16 {
        self.zero_page_indexed(self.cpu.y)
    }

    fn absolute(&mut self) -> u16 {
        let low = self.read(self.cpu.pc) as u16;
        self.cpu.pc = self.cpu.pc.wrapping_add(1);
        let high = self.read(self.cpu.pc) as u16;
        self.cpu.pc = self.cpu.pc.wrapping_add(1);
        (high << 8) | low
    }

    fn absolute_indexed(&mut self, index: u8, is_rmw: bool) -> u16 {
        let initial = self.absolute();
        let address = initial.wrapping_add(index as u16);
        if (address & 0xFF00) != (initial & 0xFF00) || is_rmw {
            // Read the partially-carried address the hardware puts on the
            // bus during the fix-up cycle
            self.read((initial & 0xFF00) | (address & 0x00FF));
        }
        address
    }
    fn absolute_x(&mut self, is_rmw: bool) -> u16 {
        self.absolute_indexed(self.cpu.x, is_rmw)
    }
    fn absolute_y(&mut self, is_rmw: bool) -> u16 {
        self.absolute_indexed(self.cpu.y, is_rmw)
    }

    fn indirect(&mut self) -> u16 {
        let low_indirect = self.read(self.cpu.pc) as u16;
        self.cpu.pc = self.cpu.pc.wrapping_add(1);
        let high_indirect = self.read(self.cpu.pc) as u16;
        self.cpu.pc = self.cpu.pc.wrapping_add(1);
        // The pointer's high byte read never crosses the page
        let low = self.read((high_indirect << 8) | low_indirect) as u16;
        let high = self.read((high_indirect << 8) | ((low_indirect + 1) & 0xFF)) as u16;
        (high << 8) | low
    }

    fn indirect_x(&mut self) -> u16 {
        let pc = self.cpu.pc;
        self.cpu.pc = pc.wrapping_add(1);
        let pointer = self.read(pc);
        let low_indirect = pointer.wrapping_add(self.cpu.x);
        let high_indirect = pointer.wrapping_add(self.cpu.x).wrapping_add(1);
        self.read(pointer as u16);
        let low = self.read(low_indirect as u16) as u16;
        let high = self.read(high_indirect as u16) as u16;
        (high << 8) | low
    }

    fn indirect_y(&mut self, is_rmw: bool) -> u16 {
        let pc = self.cpu.pc;
        self.cpu.pc = pc.wrapping_add(1);
        let pointer = self.read(pc);
        let low = self.read(pointer as u16) as u16;
        let high = self.read(pointer.wrapping_add(1) as u16) as u16;
        let initial = (high << 8) | low;
        let address = initial.wrapping_add(self.cpu.y as u16);
        if (address & 0xFF00) != (initial & 0xFF00) || is_rmw {
            self.read((initial & 0xFF00) | (address & 0x00FF));
        }
        address
    }

    // ---- Flag helpers ----

    fn set_zn(&mut self, value: u8) {
        self.cpu.p.z = value == 0;
        self.cpu.p.n = value & 0x80 != 0;
    }

    fn do_flag(&mut self, f: impl FnOnce(&mut crate::core::StatusRegister)) {
        let pc = self.cpu.pc;
        self.read(pc);
        f(&mut self.cpu.p);
    }

    fn do_transfer(
        &mut self,
        from: impl FnOnce(&Cpu) -> u8,
        to: impl FnOnce(&mut Cpu, u8),
        set_flags: bool,
    ) {
        let pc = self.cpu.pc;
        self.read(pc);
        let value = from(&self.cpu);
        to(&mut self.cpu, value);
        if set_flags {
            self.set_zn(value);
        }
    }

    // ---- Official instructions ----

    fn add_to_accumulator(&mut self, operand: u8) {
        let wide = self.cpu.a as u16 + operand as u16 + self.cpu.p.c as u16;
        let result = wide as u8;
        self.cpu.p.c = wide > 0xFF;
        self.cpu.p.v = (result >> 7) != (self.cpu.a >> 7) && (result >> 7) != (operand >> 7);
        self.set_zn(result);
        self.cpu.a = result;
    }

    fn do_adc(&mut self, address: u16) {
        let operand = self.read(address);
        self.add_to_accumulator(operand);
    }

    fn do_and(&mut self, address: u16) {
        let operand = self.read(address);
        self.cpu.a &= operand;
        let a = self.cpu.a;
        self.set_zn(a);
    }

    fn do_asl(&mut self, address: u16) {
        let operand = self.read(address);
        self.write(operand, address);
        let result = operand << 1;
        self.cpu.p.c = operand & 0x80 != 0;
        self.set_zn(result);
        self.write(result, address);
    }

    fn do_branch_if(&mut self, address: u16, condition: bool) {
        let offset = self.read(address) as i8;
        if condition {
            let pc = self.cpu.pc;
            self.read(pc);
            let new_pc = pc.wrapping_add(offset as u16);
            if (pc & 0xFF00) != (new_pc & 0xFF00) {
                self.read((pc & 0xFF00) | (new_pc & 0x00FF));
            }
            self.cpu.pc = new_pc;
        }
    }

    fn do_bit(&mut self, address: u16) {
        let operand = self.read(address);
        self.cpu.p.z = self.cpu.a & operand == 0;
        self.cpu.p.n = operand & 0x80 != 0;
        self.cpu.p.v = operand & 0x40 != 0;
    }

    fn do_brk(&mut self) {
        let pc = self.cpu.pc;
        self.read(pc);
        self.cpu.pc = pc.wrapping_add(1);
        let pc = self.cpu.pc;
        self.push_stack((pc >> 8) as u8);
        self.push_stack((pc & 0xFF) as u8);
        let p = self.cpu.p.to_byte() | 0x10;
        self.push_stack(p);
        self.cpu.p.i = true;
        let low = self.read(IRQ_VECTOR) as u16;
        let high = self.read(IRQ_VECTOR + 1) as u16;
        self.cpu.pc = (high << 8) | low;
    }

    fn compare(&mut self, register: u8, address: u16) {
        let operand = self.read(address);
        self.cpu.p.c = register >= operand;
        self.cpu.p.z = register == operand;
        self.cpu.p.n = register.wrapping_sub(operand) & 0x80 != 0;
    }
    fn do_cmp(&mut self, address: u16) {
        self.compare(self.cpu.a, address);
    }
    fn do_cpx(&mut self, address: u16) {
        self.compare(self.cpu.x, address);
    }
    fn do_cpy(&mut self, address: u16) {
        self.compare(self.cpu.y, address);
    }

    fn do_dec(&mut self, address: u16) {
        let operand = self.read(address);
        self.write(operand, address);
        let result = operand.wrapping_sub(1);
        self.set_zn(result);
        self.write(result, address);
    }
    fn do_dex(&mut self) {
        let pc = self.cpu.pc;
        self.read(pc);
        self.cpu.x = self.cpu.x.wrapping_sub(1);
        let x = self.cpu.x;
        self.set_zn(x);
    }
    fn do_dey(&mut self) {
        let pc = self.cpu.pc;
        self.read(pc);
        self.cpu.y = self.cpu.y.wrapping_sub(1);
        let y = self.cpu.y;
        self.set_zn(y);
    }

    fn do_eor(&mut self, address: u16) {
        let operand = self.read(address);
        self.cpu.a ^= operand;
        let a = self.cpu.a;
        self.set_zn(a);
    }

    fn do_inc(&mut self, address: u16) {
        let operand = self.read(address);
        self.write(operand, address);
        let result = operand.wrapping_add(1);
        self.set_zn(result);
        self.write(result, address);
    }
    fn do_inx(&mut self) {
        let pc = self.cpu.pc;
        self.read(pc);
        self.cpu.x = self.cpu.x.wrapping_add(1);
        let x = self.cpu.x;
        self.set_zn(x);
    }
    fn do_iny(&mut self) {
        let pc = self.cpu.pc;
        self.read(pc);
        self.cpu.y = self.cpu.y.wrapping_add(1);
        let y = self.cpu.y;
        self.set_zn(y);
    }

    fn do_jsr(&mut self) {
        let pc = self.cpu.pc;
        let new_low = self.read(pc);
        self.cpu.pc = pc.wrapping_add(1);
        let pc = self.cpu.pc;
        self.read_stack(); // internal operation
        self.push_stack((pc >> 8) as u8);
        self.push_stack((pc & 0xFF) as u8);
        let new_high = self.read(self.cpu.pc);
        self.cpu.pc = ((new_high as u16) << 8) | new_low as u16;
    }

    fn do_lda(&mut self, address: u16) {
        self.cpu.a = self.read(address);
        let a = self.cpu.a;
        self.set_zn(a);
    }
    fn do_ldx(&mut self, address: u16) {
        self.cpu.x = self.read(address);
        let x = self.cpu.x;
        self.set_zn(x);
    }
    fn do_ldy(&mut self, address: u16) {
        self.cpu.y = self.read(address);
        let y = self.cpu.y;
        self.set_zn(y);
    }

    fn do_lsr(&mut self, address: u16) {
        let operand = self.read(address);
        self.write(operand, address);
        let result = operand >> 1;
        self.cpu.p.c = operand & 0x01 != 0;
        self.set_zn(result);
        self.write(result, address);
    }

    fn do_ora(&mut self, address: u16) {
        let operand = self.read(address);
        self.cpu.a |= operand;
        let a = self.cpu.a;
        self.set_zn(a);
    }

    fn do_pha(&mut self) {
        let pc = self.cpu.pc;
        self.read(pc);
        let a = self.cpu.a;
        self.push_stack(a);
    }
    fn do_php(&mut self) {
        let pc = self.cpu.pc;
        self.read(pc);
        // The break flag reads as set when pushed by an instruction
        let p = self.cpu.p.to_byte() | 0x10;
        self.push_stack(p);
    }
    fn do_pla(&mut self) {
        let pc = self.cpu.pc;
        self.read(pc);
        self.read_stack();
        self.increment_s();
        self.cpu.a = self.read_stack();
        let a = self.cpu.a;
        self.set_zn(a);
    }
    fn do_plp(&mut self) {
        let pc = self.cpu.pc;
        self.read(pc);
        self.read_stack();
        self.increment_s();
        let p = self.read_stack();
        self.cpu.p.from_byte(p);
    }

    fn do_rol(&mut self, address: u16) {
        let operand = self.read(address);
        self.write(operand, address);
        let result = (operand << 1) | self.cpu.p.c as u8;
        self.cpu.p.c = operand & 0x80 != 0;
        self.set_zn(result);
        self.write(result, address);
    }
    fn do_ror(&mut self, address: u16) {
        let operand = self.read(address);
        self.write(operand, address);
        let result = (operand >> 1) | ((self.cpu.p.c as u8) << 7);
        self.cpu.p.c = operand & 0x01 != 0;
        self.set_zn(result);
        self.write(result, address);
    }

    fn do_rti(&mut self) {
        let pc = self.cpu.pc;
        self.read(pc);
        self.read_stack();
        self.increment_s();
        let p = self.read_stack();
        self.cpu.p.from_byte(p);
        self.increment_s();
        let low = self.read_stack() as u16;
        self.increment_s();
        let high = self.read_stack() as u16;
        self.cpu.pc = (high << 8) | low;
    }

    fn do_rts(&mut self) {
        let pc = self.cpu.pc;
        self.read(pc);
        self.read_stack();
        self.increment_s();
        let low = self.read_stack() as u16;
        self.increment_s();
        let high = self.read_stack() as u16;
        self.cpu.pc = (high << 8) | low;
        let pc = self.cpu.pc;
        self.read(pc);
        self.cpu.pc = pc.wrapping_add(1);
    }

    fn subtract_from_accumulator(&mut self, operand: u8) {
        let wide = (self.cpu.a as u16)
            .wrapping_sub(operand as u16)
            .wrapping_sub(1 - self.cpu.p.c as u16);
        let result = wide as u8;
        // No borrow leaves the carry set
        self.cpu.p.c = wide < 0x8000;
        self.cpu.p.v =
            (self.cpu.a >> 7) != (operand >> 7) && (self.cpu.a >> 7) != (result >> 7);
        self.set_zn(result);
        self.cpu.a = result;
    }

    fn do_sbc(&mut self, address: u16) {
        let operand = self.read(address);
        self.subtract_from_accumulator(operand);
    }

    // ---- Undocumented instructions ----

    fn do_ahx(&mut self, address: u16) {
        let high = (address >> 8) as u8;
        let result = self.cpu.a & self.cpu.x & high.wrapping_add(1);
        let address = if address.wrapping_sub(self.cpu.y as u16) < (address & 0xFF00) {
            (address & 0x00FF) | ((result as u16) << 8)
        } else {
            address
        };
        self.write(result, address);
    }

    fn do_alr(&mut self, address: u16) {
        let operand = self.read(address);
        self.cpu.a &= operand;
        self.cpu.p.c = self.cpu.a & 0x01 != 0;
        self.cpu.a >>= 1;
        let a = self.cpu.a;
        self.set_zn(a);
    }

    fn do_anc(&mut self, address: u16) {
        let operand = self.read(address);
        self.cpu.a &= operand;
        let a = self.cpu.a;
        self.set_zn(a);
        self.cpu.p.c = self.cpu.p.n;
    }

    fn do_arr(&mut self, address: u16) {
        let operand = self.read(address);
        self.cpu.a &= operand;
        self.cpu.a = (self.cpu.a >> 1) | ((self.cpu.p.c as u8) << 7);
        let a = self.cpu.a;
        self.set_zn(a);
        self.cpu.p.c = a & 0x40 != 0;
        self.cpu.p.v = ((a & 0x40) ^ ((a & 0x20) << 1)) != 0;
    }

    fn do_axs(&mut self, address: u16) {
        let operand = self.read(address);
        let ax = self.cpu.a & self.cpu.x;
        self.cpu.x = ax.wrapping_sub(operand);
        self.cpu.p.c = ax >= operand;
        self.cpu.p.z = ax == operand;
        self.cpu.p.n = self.cpu.x & 0x80 != 0;
    }

    fn do_dcp(&mut self, address: u16) {
        let operand = self.read(address);
        self.write(operand, address);
        let result = operand.wrapping_sub(1);
        self.cpu.p.c = self.cpu.a >= result;
        self.cpu.p.z = self.cpu.a == result;
        self.cpu.p.n = self.cpu.a.wrapping_sub(result) & 0x80 != 0;
        self.write(result, address);
    }

    fn do_isc(&mut self, address: u16) {
        let operand = self.read(address);
        self.write(operand, address);
        let result = operand.wrapping_add(1);
        self.write(result, address);
        self.subtract_from_accumulator(result);
    }

    fn do_las(&mut self, address: u16) {
        let operand = self.read(address);
        self.cpu.a = self.cpu.s & operand;
        let a = self.cpu.a;
        self.set_zn(a);
    }

    fn do_lax(&mut self, address: u16) {
        let operand = self.read(address);
        self.cpu.a = operand;
        self.cpu.x = operand;
        self.set_zn(operand);
    }

    fn do_rla(&mut self, address: u16) {
        let operand = self.read(address);
        self.write(operand, address);
        let result = (operand << 1) | self.cpu.p.c as u8;
        self.cpu.a &= result;
        self.cpu.p.c = operand & 0x80 != 0;
        let a = self.cpu.a;
        self.set_zn(a);
        self.write(result, address);
    }

    fn do_rra(&mut self, address: u16) {
        let operand = self.read(address);
        self.write(operand, address);
        let result = (operand >> 1) | ((self.cpu.p.c as u8) << 7);
        self.write(result, address);
        self.cpu.p.c = operand & 0x01 != 0;
        self.add_to_accumulator(result);
    }

    fn do_shy(&mut self, address: u16) {
        let high = (address >> 8) as u8;
        let result = self.cpu.y & high.wrapping_add(1);
        let address = if address.wrapping_sub(self.cpu.x as u16) < (address & 0xFF00) {
            (address & 0x00FF) | ((result as u16) << 8)
        } else {
            address
        };
        self.write(result, address);
    }

    fn do_shx(&mut self, address: u16) {
        let high = (address >> 8) as u8;
        let result = self.cpu.x & high.wrapping_add(1);
        let address = if address.wrapping_sub(self.cpu.y as u16) < (address & 0xFF00) {
            (address & 0x00FF) | ((result as u16) << 8)
        } else {
            address
        };
        self.write(result, address);
    }

    fn do_slo(&mut self, address: u16) {
        let operand = self.read(address);
        self.write(operand, address);
        let result = operand << 1;
        self.cpu.a |= result;
        self.cpu.p.c = operand & 0x80 != 0;
        let a = self.cpu.a;
        self.set_zn(a);
        self.write(result, address);
    }

    fn do_sre(&mut self, address: u16) {
        let operand = self.read(address);
        self.write(operand, address);
        let result = operand >> 1;
        self.cpu.a ^= result;
        self.cpu.p.c = operand & 0x01 != 0;
        let a = self.cpu.a;
        self.set_zn(a);
        self.write(result, address);
    }

    fn do_tas(&mut self, address: u16) {
        let high = (address >> 8) as u8;
        let result = self.cpu.a & self.cpu.x & high.wrapping_add(1);
        let address = if address.wrapping_sub(self.cpu.y as u16) < (address & 0xFF00) {
            (address & 0x00FF) | ((result as u16) << 8)
        } else {
            address
        };
        self.cpu.s = self.cpu.a & self.cpu.x;
        self.write(result, address);
    }

    fn do_xaa(&mut self, address: u16) {
        let operand = self.read(address);
        self.cpu.a = (self.cpu.a | 0xEE) & self.cpu.x & operand;
        let a = self.cpu.a;
        self.set_zn(a);
    }

    // ---- Save states ----

    /// Serialize the full console state as four length-prefixed blocks in
    /// fixed order: CPU, picture unit, audio unit, cartridge.
    pub fn save_state(&self) -> Vec<u8> {
        let mut blocks = Vec::new();
        let mut buffer = StateBuffer::new();
        self.cpu.save_state(&mut buffer);
        blocks.push(buffer.into_bytes());
        let mut buffer = StateBuffer::new();
        self.ppu.save_state(&mut buffer);
        blocks.push(buffer.into_bytes());
        let mut buffer = StateBuffer::new();
        self.apu.save_state(&mut buffer);
        blocks.push(buffer.into_bytes());
        let mut buffer = StateBuffer::new();
        self.cartridge.save_state(&mut buffer);
        blocks.push(buffer.into_bytes());

        let mut out = Vec::new();
        for block in blocks {
            out.extend_from_slice(&(block.len() as u32).to_le_bytes());
            out.extend_from_slice(&block);
        }
        out
    }

    /// Restore a state produced by [`Nes::save_state`]. Requires the same
    /// cartridge to already be attached.
    pub fn load_state(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let container = StateBuffer::from_bytes(bytes.to_vec());
        let mut next_block = || -> Result<StateBuffer, Error> {
            let length = container.extract_u32()? as usize;
            Ok(StateBuffer::from_bytes(container.extract_vec(length)?))
        };
        self.cpu.load_state(&next_block()?)?;
        self.ppu.load_state(&next_block()?)?;
        self.apu.load_state(&next_block()?)?;
        self.cartridge.load_state(&next_block()?)?;
        Ok(())
    }
}
