use std::fmt::Display;

use crate::reg::{Reg, SizeMode};

/// One 65C816 machine instruction. Immediate operands are stored widened
/// to `u16`; the emitted width follows the register size in effect at the
/// instruction, which is why `size` and `encode` take the current modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inst {
    // loads
    LdaImm(u16),
    LdxImm(u16),
    LdyImm(u16),
    LdaAbs(u16),
    LdxAbs(u16),
    LdyAbs(u16),
    LdaLong(u32),
    // stores
    StaAbs(u16),
    StxAbs(u16),
    StyAbs(u16),
    StzAbs(u16),
    StaLong(u32),
    // accumulator arithmetic and logic
    AdcImm(u16),
    AdcAbs(u16),
    SbcImm(u16),
    SbcAbs(u16),
    AndImm(u16),
    AndAbs(u16),
    OraImm(u16),
    OraAbs(u16),
    EorImm(u16),
    EorAbs(u16),
    CmpImm(u16),
    CmpAbs(u16),
    // index compares
    CpxImm(u16),
    CpxAbs(u16),
    CpyImm(u16),
    CpyAbs(u16),
    // increments and decrements
    Ina,
    Dea,
    Inx,
    Dex,
    Iny,
    Dey,
    // transfers
    Tax,
    Tay,
    Txa,
    Tya,
    Txy,
    Tyx,
    // stack
    Pha,
    Pla,
    Phx,
    Plx,
    Phy,
    Ply,
    Php,
    Plp,
    Phb,
    Plb,
    Phk,
    Pea(u16),
    // status register
    Sep(u8),
    Rep(u8),
    // control transfer
    Jsr(u16),
    Jsl(u32),
    Jmp(u16),
    Jml(u32),
    Bra(i8),
    Beq(i8),
    Bne(i8),
    Bcc(i8),
    Bcs(i8),
    Bpl(i8),
    Bmi(i8),
    Rts,
    Rtl,
    Nop,
}

fn push16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push24(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes()[..3]);
}

fn push_imm(out: &mut Vec<u8>, value: u16, mode: SizeMode) {
    match mode {
        SizeMode::S8 => out.push(value as u8),
        SizeMode::S16 => push16(out, value),
        SizeMode::Unset => panic!("immediate width is not set"),
    }
}

impl Inst {
    pub fn opcode(&self) -> u8 {
        use Inst::*;
        match self {
            LdaImm(_) => 0xA9,
            LdxImm(_) => 0xA2,
            LdyImm(_) => 0xA0,
            LdaAbs(_) => 0xAD,
            LdxAbs(_) => 0xAE,
            LdyAbs(_) => 0xAC,
            LdaLong(_) => 0xAF,
            StaAbs(_) => 0x8D,
            StxAbs(_) => 0x8E,
            StyAbs(_) => 0x8C,
            StzAbs(_) => 0x9C,
            StaLong(_) => 0x8F,
            AdcImm(_) => 0x69,
            AdcAbs(_) => 0x6D,
            SbcImm(_) => 0xE9,
            SbcAbs(_) => 0xED,
            AndImm(_) => 0x29,
            AndAbs(_) => 0x2D,
            OraImm(_) => 0x09,
            OraAbs(_) => 0x0D,
            EorImm(_) => 0x49,
            EorAbs(_) => 0x4D,
            CmpImm(_) => 0xC9,
            CmpAbs(_) => 0xCD,
            CpxImm(_) => 0xE0,
            CpxAbs(_) => 0xEC,
            CpyImm(_) => 0xC0,
            CpyAbs(_) => 0xCC,
            Ina => 0x1A,
            Dea => 0x3A,
            Inx => 0xE8,
            Dex => 0xCA,
            Iny => 0xC8,
            Dey => 0x88,
            Tax => 0xAA,
            Tay => 0xA8,
            Txa => 0x8A,
            Tya => 0x98,
            Txy => 0x9B,
            Tyx => 0xBB,
            Pha => 0x48,
            Pla => 0x68,
            Phx => 0xDA,
            Plx => 0xFA,
            Phy => 0x5A,
            Ply => 0x7A,
            Php => 0x08,
            Plp => 0x28,
            Phb => 0x8B,
            Plb => 0xAB,
            Phk => 0x4B,
            Pea(_) => 0xF4,
            Sep(_) => 0xE2,
            Rep(_) => 0xC2,
            Jsr(_) => 0x20,
            Jsl(_) => 0x22,
            Jmp(_) => 0x4C,
            Jml(_) => 0x5C,
            Bra(_) => 0x80,
            Beq(_) => 0xF0,
            Bne(_) => 0xD0,
            Bcc(_) => 0x90,
            Bcs(_) => 0xB0,
            Bpl(_) => 0x10,
            Bmi(_) => 0x30,
            Rts => 0x60,
            Rtl => 0x6B,
            Nop => 0xEA,
        }
    }

    /// Encoded length under the given register modes.
    pub fn size(&self, a: SizeMode, xy: SizeMode) -> u16 {
        use Inst::*;
        match self {
            LdaImm(_) | AdcImm(_) | SbcImm(_) | AndImm(_) | OraImm(_) | EorImm(_)
            | CmpImm(_) => 1 + a.bytes(),
            LdxImm(_) | LdyImm(_) | CpxImm(_) | CpyImm(_) => 1 + xy.bytes(),
            LdaAbs(_) | LdxAbs(_) | LdyAbs(_) | StaAbs(_) | StxAbs(_) | StyAbs(_)
            | StzAbs(_) | AdcAbs(_) | SbcAbs(_) | AndAbs(_) | OraAbs(_) | EorAbs(_)
            | CmpAbs(_) | CpxAbs(_) | CpyAbs(_) | Pea(_) | Jsr(_) | Jmp(_) => 3,
            LdaLong(_) | StaLong(_) | Jsl(_) | Jml(_) => 4,
            Sep(_) | Rep(_) => 2,
            Bra(_) | Beq(_) | Bne(_) | Bcc(_) | Bcs(_) | Bpl(_) | Bmi(_) => 2,
            Ina | Dea | Inx | Dex | Iny | Dey | Tax | Tay | Txa | Tya | Txy | Tyx
            | Pha | Pla | Phx | Plx | Phy | Ply | Php | Plp | Phb | Plb | Phk | Rts
            | Rtl | Nop => 1,
        }
    }

    /// Serialize opcode and operand bytes under the given register modes.
    pub fn encode(&self, a: SizeMode, xy: SizeMode, out: &mut Vec<u8>) {
        use Inst::*;
        out.push(self.opcode());
        match *self {
            LdaImm(v) | AdcImm(v) | SbcImm(v) | AndImm(v) | OraImm(v) | EorImm(v)
            | CmpImm(v) => push_imm(out, v, a),
            LdxImm(v) | LdyImm(v) | CpxImm(v) | CpyImm(v) => push_imm(out, v, xy),
            LdaAbs(v) | LdxAbs(v) | LdyAbs(v) | StaAbs(v) | StxAbs(v) | StyAbs(v)
            | StzAbs(v) | AdcAbs(v) | SbcAbs(v) | AndAbs(v) | OraAbs(v) | EorAbs(v)
            | CmpAbs(v) | CpxAbs(v) | CpyAbs(v) | Pea(v) | Jsr(v) | Jmp(v) => {
                push16(out, v)
            }
            LdaLong(v) | StaLong(v) | Jsl(v) | Jml(v) => push24(out, v),
            Sep(m) | Rep(m) => out.push(m),
            Bra(d) | Beq(d) | Bne(d) | Bcc(d) | Bcs(d) | Bpl(d) | Bmi(d) => {
                out.push(d as u8)
            }
            _ => {}
        }
    }

    /// The register whose current width governs this instruction, if any.
    /// The builder refuses to emit such an instruction while the width is
    /// still unset.
    pub fn size_reg(&self) -> Option<Reg> {
        use Inst::*;
        match self {
            LdaImm(_) | LdaAbs(_) | LdaLong(_) | StaAbs(_) | StaLong(_) | StzAbs(_)
            | AdcImm(_) | AdcAbs(_) | SbcImm(_) | SbcAbs(_) | AndImm(_) | AndAbs(_)
            | OraImm(_) | OraAbs(_) | EorImm(_) | EorAbs(_) | CmpImm(_) | CmpAbs(_)
            | Ina | Dea | Pha | Pla | Txa | Tya => Some(Reg::A),
            LdxImm(_) | LdxAbs(_) | StxAbs(_) | CpxImm(_) | CpxAbs(_) | Inx | Dex
            | Phx | Plx | Tax | Tyx => Some(Reg::X),
            LdyImm(_) | LdyAbs(_) | StyAbs(_) | CpyImm(_) | CpyAbs(_) | Iny | Dey
            | Phy | Ply | Tay | Txy => Some(Reg::Y),
            _ => None,
        }
    }

    /// The register this instruction overwrites, if any.
    pub fn writes_reg(&self) -> Option<Reg> {
        use Inst::*;
        match self {
            LdaImm(_) | LdaAbs(_) | LdaLong(_) | AdcImm(_) | AdcAbs(_) | SbcImm(_)
            | SbcAbs(_) | AndImm(_) | AndAbs(_) | OraImm(_) | OraAbs(_) | EorImm(_)
            | EorAbs(_) | Ina | Dea | Pla | Txa | Tya => Some(Reg::A),
            LdxImm(_) | LdxAbs(_) | Inx | Dex | Plx | Tax | Tyx => Some(Reg::X),
            LdyImm(_) | LdyAbs(_) | Iny | Dey | Ply | Tay | Txy => Some(Reg::Y),
            _ => None,
        }
    }

    /// Arithmetic/compare/load/store family over the accumulator, whose
    /// data width follows the memory-size flag.
    pub fn acc_mem_op(&self) -> bool {
        use Inst::*;
        matches!(
            self,
            LdaImm(_)
                | LdaAbs(_)
                | LdaLong(_)
                | StaAbs(_)
                | StaLong(_)
                | StzAbs(_)
                | AdcImm(_)
                | AdcAbs(_)
                | SbcImm(_)
                | SbcAbs(_)
                | AndImm(_)
                | AndAbs(_)
                | OraImm(_)
                | OraAbs(_)
                | EorImm(_)
                | EorAbs(_)
                | CmpImm(_)
                | CmpAbs(_)
        )
    }

    /// Load/store/compare family over the index registers.
    pub fn index_mem_op(&self) -> bool {
        use Inst::*;
        matches!(
            self,
            LdxImm(_)
                | LdxAbs(_)
                | LdyImm(_)
                | LdyAbs(_)
                | StxAbs(_)
                | StyAbs(_)
                | CpxImm(_)
                | CpxAbs(_)
                | CpyImm(_)
                | CpyAbs(_)
        )
    }

    pub fn is_subroutine_call(&self) -> bool {
        matches!(self, Inst::Jsr(_) | Inst::Jsl(_))
    }

    pub fn is_return(&self) -> bool {
        matches!(self, Inst::Rts | Inst::Rtl)
    }

    pub fn mnemonic(&self) -> &'static str {
        use Inst::*;
        match self {
            LdaImm(_) | LdaAbs(_) | LdaLong(_) => "lda",
            LdxImm(_) | LdxAbs(_) => "ldx",
            LdyImm(_) | LdyAbs(_) => "ldy",
            StaAbs(_) | StaLong(_) => "sta",
            StxAbs(_) => "stx",
            StyAbs(_) => "sty",
            StzAbs(_) => "stz",
            AdcImm(_) | AdcAbs(_) => "adc",
            SbcImm(_) | SbcAbs(_) => "sbc",
            AndImm(_) | AndAbs(_) => "and",
            OraImm(_) | OraAbs(_) => "ora",
            EorImm(_) | EorAbs(_) => "eor",
            CmpImm(_) | CmpAbs(_) => "cmp",
            CpxImm(_) | CpxAbs(_) => "cpx",
            CpyImm(_) | CpyAbs(_) => "cpy",
            Ina => "ina",
            Dea => "dea",
            Inx => "inx",
            Dex => "dex",
            Iny => "iny",
            Dey => "dey",
            Tax => "tax",
            Tay => "tay",
            Txa => "txa",
            Tya => "tya",
            Txy => "txy",
            Tyx => "tyx",
            Pha => "pha",
            Pla => "pla",
            Phx => "phx",
            Plx => "plx",
            Phy => "phy",
            Ply => "ply",
            Php => "php",
            Plp => "plp",
            Phb => "phb",
            Plb => "plb",
            Phk => "phk",
            Pea(_) => "pea",
            Sep(_) => "sep",
            Rep(_) => "rep",
            Jsr(_) => "jsr",
            Jsl(_) => "jsl",
            Jmp(_) => "jmp",
            Jml(_) => "jml",
            Bra(_) => "bra",
            Beq(_) => "beq",
            Bne(_) => "bne",
            Bcc(_) => "bcc",
            Bcs(_) => "bcs",
            Bpl(_) => "bpl",
            Bmi(_) => "bmi",
            Rts => "rts",
            Rtl => "rtl",
            Nop => "nop",
        }
    }
}

impl Display for Inst {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Inst::*;
        let mne = self.mnemonic();
        match *self {
            LdaImm(v) | LdxImm(v) | LdyImm(v) | AdcImm(v) | SbcImm(v) | AndImm(v)
            | OraImm(v) | EorImm(v) | CmpImm(v) | CpxImm(v) | CpyImm(v) | Pea(v) => {
                write!(f, "{mne} #${v:x}")
            }
            Sep(m) | Rep(m) => write!(f, "{mne} #${m:02x}"),
            LdaAbs(v) | LdxAbs(v) | LdyAbs(v) | StaAbs(v) | StxAbs(v) | StyAbs(v)
            | StzAbs(v) | AdcAbs(v) | SbcAbs(v) | AndAbs(v) | OraAbs(v) | EorAbs(v)
            | CmpAbs(v) | CpxAbs(v) | CpyAbs(v) | Jsr(v) | Jmp(v) => {
                write!(f, "{mne} ${v:04x}")
            }
            LdaLong(v) | StaLong(v) | Jsl(v) | Jml(v) => write!(f, "{mne} ${v:06x}"),
            Bra(d) | Beq(d) | Bne(d) | Bcc(d) | Bcs(d) | Bpl(d) | Bmi(d) => {
                write!(f, "{mne} {d:+}")
            }
            _ => write!(f, "{mne}"),
        }
    }
}
