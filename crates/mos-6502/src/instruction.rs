//! Mnemonics, addressing modes and instruction classes.

use std::fmt;

/// How an instruction uses its operand. The class picks the tail of the
/// micro-op sequence: a value handed to the ALU, a register written out, a
/// read-modify-write, or a change of PC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstructionType {
    Read,
    Write,
    ReadModifyWrite,
    Jump,
    Branch,
    Stack,
    Implied,
}

/// Operand location scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    XIndirect,
    IndirectY,
    Relative,
}

impl AddressingMode {
    pub const COUNT: usize = 13;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Implied,
        Self::Accumulator,
        Self::Immediate,
        Self::ZeroPage,
        Self::ZeroPageX,
        Self::ZeroPageY,
        Self::Absolute,
        Self::AbsoluteX,
        Self::AbsoluteY,
        Self::Indirect,
        Self::XIndirect,
        Self::IndirectY,
        Self::Relative,
    ];

    /// Operand bytes following the opcode.
    #[must_use]
    pub const fn operand_width(self) -> usize {
        match self {
            Self::Implied | Self::Accumulator => 0,
            Self::Immediate
            | Self::ZeroPage
            | Self::ZeroPageX
            | Self::ZeroPageY
            | Self::XIndirect
            | Self::IndirectY
            | Self::Relative => 1,
            Self::Absolute | Self::AbsoluteX | Self::AbsoluteY | Self::Indirect => 2,
        }
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for AddressingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Implied => "implied",
            Self::Accumulator => "A",
            Self::Immediate => "#imm",
            Self::ZeroPage => "zp",
            Self::ZeroPageX => "zp,X",
            Self::ZeroPageY => "zp,Y",
            Self::Absolute => "abs",
            Self::AbsoluteX => "abs,X",
            Self::AbsoluteY => "abs,Y",
            Self::Indirect => "(abs)",
            Self::XIndirect => "(zp,X)",
            Self::IndirectY => "(zp),Y",
            Self::Relative => "rel",
        };
        f.write_str(name)
    }
}

macro_rules! instructions {
    ($($name:ident => $kind:ident),* $(,)?) => {
        /// The 56 documented NMOS mnemonics plus `HLT`, which stops the CPU.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Instruction {
            $($name),*
        }

        impl Instruction {
            pub const ALL: &'static [Self] = &[$(Self::$name),*];
            pub const COUNT: usize = Self::ALL.len();

            #[must_use]
            pub const fn instruction_type(self) -> InstructionType {
                match self {
                    $(Self::$name => InstructionType::$kind),*
                }
            }

            #[must_use]
            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $(Self::$name => stringify!($name)),*
                }
            }
        }
    };
}

instructions! {
    Adc => Read,
    And => Read,
    Asl => ReadModifyWrite,
    Bcc => Branch,
    Bcs => Branch,
    Beq => Branch,
    Bit => Read,
    Bmi => Branch,
    Bne => Branch,
    Bpl => Branch,
    Brk => Stack,
    Bvc => Branch,
    Bvs => Branch,
    Clc => Implied,
    Cld => Implied,
    Cli => Implied,
    Clv => Implied,
    Cmp => Read,
    Cpx => Read,
    Cpy => Read,
    Dec => ReadModifyWrite,
    Dex => Implied,
    Dey => Implied,
    Eor => Read,
    Hlt => Implied,
    Inc => ReadModifyWrite,
    Inx => Implied,
    Iny => Implied,
    Jmp => Jump,
    Jsr => Stack,
    Lda => Read,
    Ldx => Read,
    Ldy => Read,
    Lsr => ReadModifyWrite,
    Nop => Implied,
    Ora => Read,
    Pha => Stack,
    Php => Stack,
    Pla => Stack,
    Plp => Stack,
    Rol => ReadModifyWrite,
    Ror => ReadModifyWrite,
    Rti => Stack,
    Rts => Stack,
    Sbc => Read,
    Sec => Implied,
    Sed => Implied,
    Sei => Implied,
    Sta => Write,
    Stx => Write,
    Sty => Write,
    Tax => Implied,
    Tay => Implied,
    Tsx => Implied,
    Txa => Implied,
    Txs => Implied,
    Tya => Implied,
}

impl Instruction {
    pub(crate) const fn index(self) -> usize {
        self as usize
    }

    /// Parse an upper- or lower-case mnemonic.
    #[must_use]
    pub fn from_mnemonic(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|i| i.mnemonic().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mnemonic().to_ascii_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifty_seven_mnemonics() {
        assert_eq!(Instruction::COUNT, 57);
        assert_eq!(Instruction::ALL[Instruction::Tya.index()], Instruction::Tya);
    }

    #[test]
    fn classes() {
        assert_eq!(Instruction::Lda.instruction_type(), InstructionType::Read);
        assert_eq!(Instruction::Sta.instruction_type(), InstructionType::Write);
        assert_eq!(Instruction::Ror.instruction_type(), InstructionType::ReadModifyWrite);
        assert_eq!(Instruction::Jsr.instruction_type(), InstructionType::Stack);
        assert_eq!(Instruction::Hlt.instruction_type(), InstructionType::Implied);
    }

    #[test]
    fn mnemonic_lookup_ignores_case() {
        assert_eq!(Instruction::from_mnemonic("lda"), Some(Instruction::Lda));
        assert_eq!(Instruction::from_mnemonic("HLT"), Some(Instruction::Hlt));
        assert_eq!(Instruction::from_mnemonic("XAA"), None);
        assert_eq!(Instruction::Brk.to_string(), "BRK");
    }

    #[test]
    fn operand_widths() {
        assert_eq!(AddressingMode::Accumulator.operand_width(), 0);
        assert_eq!(AddressingMode::Relative.operand_width(), 1);
        assert_eq!(AddressingMode::Indirect.operand_width(), 2);
    }
}
