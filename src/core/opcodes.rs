//! The static 6502 decode table.
//!
//! Every opcode maps to an [`OpcodeInfo`] naming the instruction, its
//! addressing mode, whether it is a read-modify-write operation (which
//! changes the dummy-access pattern of the indexed addressing modes) and
//! whether it is an officially documented opcode (which only affects the
//! trace log).

/// Every instruction the CPU can execute, documented or not.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Instruction {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc,
    Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp,
    Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rol, Ror, Rti,
    Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
    // Undocumented instructions
    Ahx, Alr, Anc, Arr, Axs, Dcp, Isc, Las, Lax, Rla, Rra, Sax, Shx, Shy,
    Slo, Sre, Tas, Xaa,
    /// Halts the CPU. Fatal when executed.
    Stp,
}

impl Instruction {
    /// The three letter mnemonic used in trace logs.
    pub fn mnemonic(&self) -> &'static str {
        use Instruction::*;
        match self {
            Adc => "ADC", And => "AND", Asl => "ASL", Bcc => "BCC",
            Bcs => "BCS", Beq => "BEQ", Bit => "BIT", Bmi => "BMI",
            Bne => "BNE", Bpl => "BPL", Brk => "BRK", Bvc => "BVC",
            Bvs => "BVS", Clc => "CLC", Cld => "CLD", Cli => "CLI",
            Clv => "CLV", Cmp => "CMP", Cpx => "CPX", Cpy => "CPY",
            Dec => "DEC", Dex => "DEX", Dey => "DEY", Eor => "EOR",
            Inc => "INC", Inx => "INX", Iny => "INY", Jmp => "JMP",
            Jsr => "JSR", Lda => "LDA", Ldx => "LDX", Ldy => "LDY",
            Lsr => "LSR", Nop => "NOP", Ora => "ORA", Pha => "PHA",
            Php => "PHP", Pla => "PLA", Plp => "PLP", Rol => "ROL",
            Ror => "ROR", Rti => "RTI", Rts => "RTS", Sbc => "SBC",
            Sec => "SEC", Sed => "SED", Sei => "SEI", Sta => "STA",
            Stx => "STX", Sty => "STY", Tax => "TAX", Tay => "TAY",
            Tsx => "TSX", Txa => "TXA", Txs => "TXS", Tya => "TYA",
            Ahx => "AHX", Alr => "ALR", Anc => "ANC", Arr => "ARR",
            Axs => "AXS", Dcp => "DCP", Isc => "ISC", Las => "LAS",
            Lax => "LAX", Rla => "RLA", Rra => "RRA", Sax => "SAX",
            Shx => "SHX", Shy => "SHY", Slo => "SLO", Sre => "SRE",
            Tas => "TAS", Xaa => "XAA", Stp => "STP",
        }
    }
}

/// How an instruction locates its operand.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AddressingMode {
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Accumulator,
    Immediate,
    Implied,
    Indirect,
    IndirectX,
    IndirectY,
    Relative,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
}

/// One entry of the decode table.
#[derive(Clone, Copy, Debug)]
pub struct OpcodeInfo {
    pub instruction: Instruction,
    pub mode: AddressingMode,
    /// Read-modify-write instructions always take the indexed extra cycle
    /// and rewrite the original value before storing the result.
    pub read_modify_write: bool,
    /// Documented opcode. Only affects trace logging.
    pub official: bool,
}

const fn op(
    instruction: Instruction,
    mode: AddressingMode,
    read_modify_write: bool,
    official: bool,
) -> OpcodeInfo {
    OpcodeInfo {
        instruction,
        mode,
        read_modify_write,
        official,
    }
}

use AddressingMode::*;
use Instruction::*;

/// Decode table for all 256 opcodes.
#[rustfmt::skip]
pub const OPCODE_TABLE: [OpcodeInfo; 256] = [
    op(Brk, Implied,     false, true ), // 0x00
    op(Ora, IndirectX,   false, true ), // 0x01
    op(Stp, Implied,     false, false), // 0x02
    op(Slo, IndirectX,   true,  false), // 0x03
    op(Nop, ZeroPage,    false, false), // 0x04
    op(Ora, ZeroPage,    false, true ), // 0x05
    op(Asl, ZeroPage,    true,  true ), // 0x06
    op(Slo, ZeroPage,    true,  false), // 0x07
    op(Php, Implied,     false, true ), // 0x08
    op(Ora, Immediate,   false, true ), // 0x09
    op(Asl, Accumulator, true,  true ), // 0x0A
    op(Anc, Immediate,   false, false), // 0x0B
    op(Nop, Absolute,    false, false), // 0x0C
    op(Ora, Absolute,    false, true ), // 0x0D
    op(Asl, Absolute,    true,  true ), // 0x0E
    op(Slo, Absolute,    true,  false), // 0x0F
    op(Bpl, Relative,    false, true ), // 0x10
    op(Ora, IndirectY,   false, true ), // 0x11
    op(Stp, Implied,     false, false), // 0x12
    op(Slo, IndirectY,   true,  false), // 0x13
    op(Nop, ZeroPageX,   false, false), // 0x14
    op(Ora, ZeroPageX,   false, true ), // 0x15
    op(Asl, ZeroPageX,   true,  true ), // 0x16
    op(Slo, ZeroPageX,   true,  false), // 0x17
    op(Clc, Implied,     false, true ), // 0x18
    op(Ora, AbsoluteY,   false, true ), // 0x19
    op(Nop, Implied,     false, false), // 0x1A
    op(Slo, AbsoluteY,   true,  false), // 0x1B
    op(Nop, AbsoluteX,   false, false), // 0x1C
    op(Ora, AbsoluteX,   false, true ), // 0x1D
    op(Asl, AbsoluteX,   true,  true ), // 0x1E
    op(Slo, AbsoluteX,   true,  false), // 0x1F
    op(Jsr, Implied,     false, true ), // 0x20
    op(And, IndirectX,   false, true ), // 0x21
    op(Stp, Implied,     false, false), // 0x22
    op(Rla, IndirectX,   true,  false), // 0x23
    op(Bit, ZeroPage,    false, true ), // 0x24
    op(And, ZeroPage,    false, true ), // 0x25
    op(Rol, ZeroPage,    true,  true ), // 0x26
    op(Rla, ZeroPage,    true,  false), // 0x27
    op(Plp, Implied,     false, true ), // 0x28
    op(And, Immediate,   false, true ), // 0x29
    op(Rol, Accumulator, true,  true ), // 0x2A
    op(Anc, Immediate,   false, false), // 0x2B
    op(Bit, Absolute,    false, true ), // 0x2C
    op(And, Absolute,    false, true ), // 0x2D
    op(Rol, Absolute,    true,  true ), // 0x2E
    op(Rla, Absolute,    true,  false), // 0x2F
    op(Bmi, Relative,    false, true ), // 0x30
    op(And, IndirectY,   false, true ), // 0x31
    op(Stp, Implied,     false, false), // 0x32
    op(Rla, IndirectY,   true,  false), // 0x33
    op(Nop, ZeroPageX,   false, false), // 0x34
    op(And, ZeroPageX,   false, true ), // 0x35
    op(Rol, ZeroPageX,   false, true ), // 0x36
    op(Rla, ZeroPageX,   true,  false), // 0x37
    op(Sec, Implied,     false, true ), // 0x38
    op(And, AbsoluteY,   false, true ), // 0x39
    op(Nop, Implied,     false, false), // 0x3A
    op(Rla, AbsoluteY,   true,  false), // 0x3B
    op(Nop, AbsoluteX,   false, false), // 0x3C
    op(And, AbsoluteX,   false, true ), // 0x3D
    op(Rol, AbsoluteX,   true,  true ), // 0x3E
    op(Rla, AbsoluteX,   true,  false), // 0x3F
    op(Rti, Implied,     false, true ), // 0x40
    op(Eor, IndirectX,   false, true ), // 0x41
    op(Stp, Implied,     false, false), // 0x42
    op(Sre, IndirectX,   true,  false), // 0x43
    op(Nop, ZeroPage,    false, false), // 0x44
    op(Eor, ZeroPage,    false, true ), // 0x45
    op(Lsr, ZeroPage,    true,  true ), // 0x46
    op(Sre, ZeroPage,    true,  false), // 0x47
    op(Pha, Implied,     false, true ), // 0x48
    op(Eor, Immediate,   false, true ), // 0x49
    op(Lsr, Accumulator, true,  true ), // 0x4A
    op(Alr, Immediate,   false, false), // 0x4B
    op(Jmp, Absolute,    false, true ), // 0x4C
    op(Eor, Absolute,    false, true ), // 0x4D
    op(Lsr, Absolute,    true,  true ), // 0x4E
    op(Sre, Absolute,    true,  false), // 0x4F
    op(Bvc, Relative,    false, true ), // 0x50
    op(Eor, IndirectY,   false, true ), // 0x51
    op(Stp, Implied,     false, false), // 0x52
    op(Sre, IndirectY,   true,  false), // 0x53
    op(Nop, ZeroPageX,   false, false), // 0x54
    op(Eor, ZeroPageX,   false, true ), // 0x55
    op(Lsr, ZeroPageX,   true,  true ), // 0x56
    op(Sre, ZeroPageX,   true,  false), // 0x57
    op(Cli, Implied,     false, true ), // 0x58
    op(Eor, AbsoluteY,   false, true ), // 0x59
    op(Nop, Implied,     false, false), // 0x5A
    op(Sre, AbsoluteY,   true,  false), // 0x5B
    op(Nop, AbsoluteX,   false, false), // 0x5C
    op(Eor, AbsoluteX,   false, true ), // 0x5D
    op(Lsr, AbsoluteX,   true,  true ), // 0x5E
    op(Sre, AbsoluteX,   true,  false), // 0x5F
    op(Rts, Implied,     false, true ), // 0x60
    op(Adc, IndirectX,   false, true ), // 0x61
    op(Stp, Implied,     false, false), // 0x62
    op(Rra, IndirectX,   true,  false), // 0x63
    op(Nop, ZeroPage,    false, false), // 0x64
    op(Adc, ZeroPage,    false, true ), // 0x65
    op(Ror, ZeroPage,    true,  true ), // 0x66
    op(Rra, ZeroPage,    true,  false), // 0x67
    op(Pla, Implied,     false, true ), // 0x68
    op(Adc, Immediate,   false, true ), // 0x69
    op(Ror, Accumulator, true,  true ), // 0x6A
    op(Arr, Immediate,   false, false), // 0x6B
    op(Jmp, Indirect,    false, true ), // 0x6C
    op(Adc, Absolute,    false, true ), // 0x6D
    op(Ror, Absolute,    true,  true ), // 0x6E
    op(Rra, Absolute,    true,  false), // 0x6F
    op(Bvs, Relative,    false, true ), // 0x70
    op(Adc, IndirectY,   false, true ), // 0x71
    op(Stp, Implied,     false, false), // 0x72
    op(Rra, IndirectY,   true,  false), // 0x73
    op(Nop, ZeroPageX,   false, false), // 0x74
    op(Adc, ZeroPageX,   false, true ), // 0x75
    op(Ror, ZeroPageX,   true,  true ), // 0x76
    op(Rra, ZeroPageX,   true,  false), // 0x77
    op(Sei, Implied,     false, true ), // 0x78
    op(Adc, AbsoluteY,   false, true ), // 0x79
    op(Nop, Implied,     false, false), // 0x7A
    op(Rra, AbsoluteY,   true,  false), // 0x7B
    op(Nop, AbsoluteX,   false, false), // 0x7C
    op(Adc, AbsoluteX,   false, true ), // 0x7D
    op(Ror, AbsoluteX,   true,  true ), // 0x7E
    op(Rra, AbsoluteX,   true,  false), // 0x7F
    op(Nop, Immediate,   false, false), // 0x80
    op(Sta, IndirectX,   true,  true ), // 0x81
    op(Nop, Immediate,   false, false), // 0x82
    op(Sax, IndirectX,   true,  false), // 0x83
    op(Sty, ZeroPage,    true,  true ), // 0x84
    op(Sta, ZeroPage,    true,  true ), // 0x85
    op(Stx, ZeroPage,    true,  true ), // 0x86
    op(Sax, ZeroPage,    true,  false), // 0x87
    op(Dey, Implied,     false, true ), // 0x88
    op(Nop, Immediate,   false, false), // 0x89
    op(Txa, Implied,     false, true ), // 0x8A
    op(Xaa, Immediate,   false, false), // 0x8B
    op(Sty, Absolute,    true,  true ), // 0x8C
    op(Sta, Absolute,    true,  true ), // 0x8D
    op(Stx, Absolute,    true,  true ), // 0x8E
    op(Sax, Absolute,    true,  false), // 0x8F
    op(Bcc, Relative,    false, true ), // 0x90
    op(Sta, IndirectY,   true,  true ), // 0x91
    op(Stp, Implied,     false, false), // 0x92
    op(Ahx, IndirectY,   true,  false), // 0x93
    op(Sty, ZeroPageX,   true,  true ), // 0x94
    op(Sta, ZeroPageX,   true,  true ), // 0x95
    op(Stx, ZeroPageY,   true,  true ), // 0x96
    op(Sax, ZeroPageY,   true,  false), // 0x97
    op(Tya, Implied,     false, true ), // 0x98
    op(Sta, AbsoluteY,   true,  true ), // 0x99
    op(Txs, Implied,     false, true ), // 0x9A
    op(Tas, AbsoluteY,   true,  false), // 0x9B
    op(Shy, AbsoluteX,   true,  false), // 0x9C
    op(Sta, AbsoluteX,   true,  true ), // 0x9D
    op(Shx, AbsoluteY,   true,  false), // 0x9E
    op(Ahx, AbsoluteY,   true,  false), // 0x9F
    op(Ldy, Immediate,   false, true ), // 0xA0
    op(Lda, IndirectX,   false, true ), // 0xA1
    op(Ldx, Immediate,   false, true ), // 0xA2
    op(Lax, IndirectX,   false, false), // 0xA3
    op(Ldy, ZeroPage,    false, true ), // 0xA4
    op(Lda, ZeroPage,    false, true ), // 0xA5
    op(Ldx, ZeroPage,    false, true ), // 0xA6
    op(Lax, ZeroPage,    false, false), // 0xA7
    op(Tay, Implied,     false, true ), // 0xA8
    op(Lda, Immediate,   false, true ), // 0xA9
    op(Tax, Implied,     false, true ), // 0xAA
    op(Lax, Immediate,   false, false), // 0xAB
    op(Ldy, Absolute,    false, true ), // 0xAC
    op(Lda, Absolute,    false, true ), // 0xAD
    op(Ldx, Absolute,    false, true ), // 0xAE
    op(Lax, Absolute,    false, false), // 0xAF
    op(Bcs, Relative,    false, true ), // 0xB0
    op(Lda, IndirectY,   false, true ), // 0xB1
    op(Stp, Implied,     false, false), // 0xB2
    op(Lax, IndirectY,   false, false), // 0xB3
    op(Ldy, ZeroPageX,   false, true ), // 0xB4
    op(Lda, ZeroPageX,   false, true ), // 0xB5
    op(Ldx, ZeroPageY,   false, true ), // 0xB6
    op(Lax, ZeroPageY,   false, false), // 0xB7
    op(Clv, Implied,     false, true ), // 0xB8
    op(Lda, AbsoluteY,   false, true ), // 0xB9
    op(Tsx, Implied,     false, true ), // 0xBA
    op(Las, AbsoluteY,   false, false), // 0xBB
    op(Ldy, AbsoluteX,   false, true ), // 0xBC
    op(Lda, AbsoluteX,   false, true ), // 0xBD
    op(Ldx, AbsoluteY,   false, true ), // 0xBE
    op(Lax, AbsoluteY,   false, false), // 0xBF
    op(Cpy, Immediate,   false, true ), // 0xC0
    op(Cmp, IndirectX,   false, true ), // 0xC1
    op(Nop, Immediate,   false, false), // 0xC2
    op(Dcp, IndirectX,   true,  false), // 0xC3
    op(Cpy, ZeroPage,    false, true ), // 0xC4
    op(Cmp, ZeroPage,    false, true ), // 0xC5
    op(Dec, ZeroPage,    true,  true ), // 0xC6
    op(Dcp, ZeroPage,    true,  false), // 0xC7
    op(Iny, Implied,     false, true ), // 0xC8
    op(Cmp, Immediate,   false, true ), // 0xC9
    op(Dex, Implied,     false, true ), // 0xCA
    op(Axs, Immediate,   false, false), // 0xCB
    op(Cpy, Absolute,    false, true ), // 0xCC
    op(Cmp, Absolute,    false, true ), // 0xCD
    op(Dec, Absolute,    true,  true ), // 0xCE
    op(Dcp, Absolute,    true,  false), // 0xCF
    op(Bne, Relative,    false, true ), // 0xD0
    op(Cmp, IndirectY,   false, true ), // 0xD1
    op(Stp, Implied,     false, false), // 0xD2
    op(Dcp, IndirectY,   true,  false), // 0xD3
    op(Nop, ZeroPageX,   false, false), // 0xD4
    op(Cmp, ZeroPageX,   false, true ), // 0xD5
    op(Dec, ZeroPageX,   true,  true ), // 0xD6
    op(Dcp, ZeroPageX,   true,  false), // 0xD7
    op(Cld, Implied,     false, true ), // 0xD8
    op(Cmp, AbsoluteY,   false, true ), // 0xD9
    op(Nop, Implied,     false, false), // 0xDA
    op(Dcp, AbsoluteY,   true,  false), // 0xDB
    op(Nop, AbsoluteX,   false, false), // 0xDC
    op(Cmp, AbsoluteX,   false, true ), // 0xDD
    op(Dec, AbsoluteX,   true,  true ), // 0xDE
    op(Dcp, AbsoluteX,   true,  false), // 0xDF
    op(Cpx, Immediate,   false, true ), // 0xE0
    op(Sbc, IndirectX,   false, true ), // 0xE1
    op(Nop, Immediate,   false, false), // 0xE2
    op(Isc, IndirectX,   true,  false), // 0xE3
    op(Cpx, ZeroPage,    false, true ), // 0xE4
    op(Sbc, ZeroPage,    false, true ), // 0xE5
    op(Inc, ZeroPage,    true,  true ), // 0xE6
    op(Isc, ZeroPage,    true,  false), // 0xE7
    op(Inx, Implied,     false, true ), // 0xE8
    op(Sbc, Immediate,   false, true ), // 0xE9
    op(Nop, Implied,     false, true ), // 0xEA
    op(Sbc, Immediate,   false, false), // 0xEB
    op(Cpx, Absolute,    false, true ), // 0xEC
    op(Sbc, Absolute,    false, true ), // 0xED
    op(Inc, Absolute,    true,  true ), // 0xEE
    op(Isc, Absolute,    true,  false), // 0xEF
    op(Beq, Relative,    false, true ), // 0xF0
    op(Sbc, IndirectY,   false, true ), // 0xF1
    op(Stp, Implied,     false, false), // 0xF2
    op(Isc, IndirectY,   true,  false), // 0xF3
    op(Nop, ZeroPageX,   false, false), // 0xF4
    op(Sbc, ZeroPageX,   false, true ), // 0xF5
    op(Inc, ZeroPageX,   true,  true ), // 0xF6
    op(Isc, ZeroPageX,   true,  false), // 0xF7
    op(Sed, Implied,     false, true ), // 0xF8
    op(Sbc, AbsoluteY,   false, true ), // 0xF9
    op(Nop, Implied,     false, false), // 0xFA
    op(Isc, AbsoluteY,   true,  false), // 0xFB
    op(Nop, AbsoluteX,   false, false), // 0xFC
    op(Sbc, AbsoluteX,   false, true ), // 0xFD
    op(Inc, AbsoluteX,   true,  true ), // 0xFE
    op(Isc, AbsoluteX,   true,  false), // 0xFF
];
