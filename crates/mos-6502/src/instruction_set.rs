//! Bidirectional opcode table.
//!
//! Maps (mnemonic, addressing mode) pairs to single-byte opcodes and back.
//! Built once; lookups are array indexing.

use std::sync::LazyLock;

use crate::{AddressingMode, Instruction, InstructionSetError};

use AddressingMode::{
    Absolute, AbsoluteX, AbsoluteY, Accumulator, Immediate, Implied, Indirect, IndirectY,
    Relative, XIndirect, ZeroPage, ZeroPageX, ZeroPageY,
};
use Instruction::{
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc, Cld, Cli, Clv, Cmp, Cpx,
    Cpy, Dec, Dex, Dey, Eor, Hlt, Inc, Inx, Iny, Jmp, Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php,
    Pla, Plp, Rol, Ror, Rti, Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
};

/// An (instruction, addressing mode) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstructionKey {
    pub instruction: Instruction,
    pub mode: AddressingMode,
}

impl InstructionKey {
    #[must_use]
    pub const fn new(instruction: Instruction, mode: AddressingMode) -> Self {
        Self { instruction, mode }
    }
}

/// Machine code for one instruction: opcode plus 0-2 operand bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoded {
    bytes: [u8; 3],
    len: usize,
}

impl Encoded {
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    #[must_use]
    pub fn opcode(&self) -> u8 {
        self.bytes[0]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// The opcode table.
#[derive(Debug, Clone)]
pub struct InstructionSet {
    decode: [Option<InstructionKey>; 256],
    encode: [[Option<u8>; AddressingMode::COUNT]; Instruction::COUNT],
}

impl Default for InstructionSet {
    fn default() -> Self {
        Self::new()
    }
}

impl InstructionSet {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            decode: [None; 256],
            encode: [[None; AddressingMode::COUNT]; Instruction::COUNT],
        }
    }

    /// The documented NMOS 6502 set plus `HLT` at $02.
    ///
    /// # Panics
    ///
    /// On first use, if the built-in table has a duplicate entry.
    #[must_use]
    pub fn nmos() -> &'static Self {
        static NMOS: LazyLock<InstructionSet> = LazyLock::new(|| {
            InstructionSet::from_table(NMOS_OPCODES)
                .unwrap_or_else(|e| panic!("built-in 6502 opcode table is inconsistent: {e}"))
        });
        &NMOS
    }

    pub fn from_table(table: &[(Instruction, AddressingMode, u8)]) -> Result<Self, InstructionSetError> {
        let mut set = Self::new();
        for &(instruction, mode, opcode) in table {
            set.register(instruction, mode, opcode)?;
        }
        Ok(set)
    }

    /// Add one pair. Each key and each opcode may be registered once.
    pub fn register(
        &mut self,
        instruction: Instruction,
        mode: AddressingMode,
        opcode: u8,
    ) -> Result<(), InstructionSetError> {
        let slot = &mut self.encode[instruction.index()][mode.index()];
        if slot.is_some() {
            return Err(InstructionSetError::DuplicateKey { instruction, mode });
        }
        if self.decode[usize::from(opcode)].is_some() {
            return Err(InstructionSetError::DuplicateOpcode { opcode });
        }
        *slot = Some(opcode);
        self.decode[usize::from(opcode)] = Some(InstructionKey::new(instruction, mode));
        Ok(())
    }

    /// The pair assigned to `opcode`. Undocumented opcodes are not modelled.
    pub fn decode(&self, opcode: u8) -> Result<InstructionKey, InstructionSetError> {
        self.decode[usize::from(opcode)].ok_or(InstructionSetError::UnrecognisedOpcode { opcode })
    }

    pub fn opcode(&self, instruction: Instruction, mode: AddressingMode) -> Result<u8, InstructionSetError> {
        self.encode[instruction.index()][mode.index()]
            .ok_or(InstructionSetError::UnsupportedMode { instruction, mode })
    }

    /// Assemble one instruction. `operand` is ignored for implied and
    /// accumulator forms; otherwise it must fit the mode's operand width and
    /// is emitted little-endian.
    pub fn encode(
        &self,
        instruction: Instruction,
        mode: AddressingMode,
        operand: u32,
    ) -> Result<Encoded, InstructionSetError> {
        let opcode = self.opcode(instruction, mode)?;
        let width = mode.operand_width();
        let limit = match width {
            0 => u32::MAX,
            1 => 0xFF,
            _ => 0xFFFF,
        };
        if operand > limit {
            return Err(InstructionSetError::OperandOutOfRange {
                mode,
                operand,
                width,
            });
        }
        let [lo, hi, ..] = operand.to_le_bytes();
        Ok(Encoded {
            bytes: [opcode, lo, hi],
            len: 1 + width,
        })
    }

    #[must_use]
    pub fn is_address_mode_supported(&self, instruction: Instruction, mode: AddressingMode) -> bool {
        self.encode[instruction.index()][mode.index()].is_some()
    }

    /// Modes `instruction` has an opcode for, in [`AddressingMode::ALL`] order.
    #[must_use]
    pub fn supported_address_modes(&self, instruction: Instruction) -> Vec<AddressingMode> {
        AddressingMode::ALL
            .into_iter()
            .filter(|&mode| self.is_address_mode_supported(instruction, mode))
            .collect()
    }

    /// Instructions with an opcode in `mode`.
    #[must_use]
    pub fn instructions_with_mode(&self, mode: AddressingMode) -> Vec<Instruction> {
        Instruction::ALL
            .iter()
            .copied()
            .filter(|&instruction| self.is_address_mode_supported(instruction, mode))
            .collect()
    }

    /// Every registered pair with its opcode, in opcode order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, InstructionKey)> + '_ {
        (0..=u8::MAX).filter_map(|opcode| self.decode[usize::from(opcode)].map(|key| (opcode, key)))
    }
}

#[rustfmt::skip]
const NMOS_OPCODES: &[(Instruction, AddressingMode, u8)] = &[
    (Hlt, Implied, 0x02),

    (Adc, Immediate, 0x69), (Adc, ZeroPage, 0x65), (Adc, ZeroPageX, 0x75), (Adc, Absolute, 0x6D),
    (Adc, AbsoluteX, 0x7D), (Adc, AbsoluteY, 0x79), (Adc, XIndirect, 0x61), (Adc, IndirectY, 0x71),
    (And, Immediate, 0x29), (And, ZeroPage, 0x25), (And, ZeroPageX, 0x35), (And, Absolute, 0x2D),
    (And, AbsoluteX, 0x3D), (And, AbsoluteY, 0x39), (And, XIndirect, 0x21), (And, IndirectY, 0x31),
    (Asl, Accumulator, 0x0A), (Asl, ZeroPage, 0x06), (Asl, ZeroPageX, 0x16), (Asl, Absolute, 0x0E),
    (Asl, AbsoluteX, 0x1E),
    (Bcc, Relative, 0x90), (Bcs, Relative, 0xB0), (Beq, Relative, 0xF0), (Bmi, Relative, 0x30),
    (Bne, Relative, 0xD0), (Bpl, Relative, 0x10), (Bvc, Relative, 0x50), (Bvs, Relative, 0x70),
    (Bit, ZeroPage, 0x24), (Bit, Absolute, 0x2C),
    (Brk, Implied, 0x00),
    (Clc, Implied, 0x18), (Cld, Implied, 0xD8), (Cli, Implied, 0x58), (Clv, Implied, 0xB8),
    (Cmp, Immediate, 0xC9), (Cmp, ZeroPage, 0xC5), (Cmp, ZeroPageX, 0xD5), (Cmp, Absolute, 0xCD),
    (Cmp, AbsoluteX, 0xDD), (Cmp, AbsoluteY, 0xD9), (Cmp, XIndirect, 0xC1), (Cmp, IndirectY, 0xD1),
    (Cpx, Immediate, 0xE0), (Cpx, ZeroPage, 0xE4), (Cpx, Absolute, 0xEC),
    (Cpy, Immediate, 0xC0), (Cpy, ZeroPage, 0xC4), (Cpy, Absolute, 0xCC),
    (Dec, ZeroPage, 0xC6), (Dec, ZeroPageX, 0xD6), (Dec, Absolute, 0xCE), (Dec, AbsoluteX, 0xDE),
    (Dex, Implied, 0xCA), (Dey, Implied, 0x88),
    (Eor, Immediate, 0x49), (Eor, ZeroPage, 0x45), (Eor, ZeroPageX, 0x55), (Eor, Absolute, 0x4D),
    (Eor, AbsoluteX, 0x5D), (Eor, AbsoluteY, 0x59), (Eor, XIndirect, 0x41), (Eor, IndirectY, 0x51),
    (Inc, ZeroPage, 0xE6), (Inc, ZeroPageX, 0xF6), (Inc, Absolute, 0xEE), (Inc, AbsoluteX, 0xFE),
    (Inx, Implied, 0xE8), (Iny, Implied, 0xC8),
    (Jmp, Absolute, 0x4C), (Jmp, Indirect, 0x6C),
    (Jsr, Absolute, 0x20),
    (Lda, Immediate, 0xA9), (Lda, ZeroPage, 0xA5), (Lda, ZeroPageX, 0xB5), (Lda, Absolute, 0xAD),
    (Lda, AbsoluteX, 0xBD), (Lda, AbsoluteY, 0xB9), (Lda, XIndirect, 0xA1), (Lda, IndirectY, 0xB1),
    (Ldx, Immediate, 0xA2), (Ldx, ZeroPage, 0xA6), (Ldx, ZeroPageY, 0xB6), (Ldx, Absolute, 0xAE),
    (Ldx, AbsoluteY, 0xBE),
    (Ldy, Immediate, 0xA0), (Ldy, ZeroPage, 0xA4), (Ldy, ZeroPageX, 0xB4), (Ldy, Absolute, 0xAC),
    (Ldy, AbsoluteX, 0xBC),
    (Lsr, Accumulator, 0x4A), (Lsr, ZeroPage, 0x46), (Lsr, ZeroPageX, 0x56), (Lsr, Absolute, 0x4E),
    (Lsr, AbsoluteX, 0x5E),
    (Nop, Implied, 0xEA),
    (Ora, Immediate, 0x09), (Ora, ZeroPage, 0x05), (Ora, ZeroPageX, 0x15), (Ora, Absolute, 0x0D),
    (Ora, AbsoluteX, 0x1D), (Ora, AbsoluteY, 0x19), (Ora, XIndirect, 0x01), (Ora, IndirectY, 0x11),
    (Pha, Implied, 0x48), (Php, Implied, 0x08), (Pla, Implied, 0x68), (Plp, Implied, 0x28),
    (Rol, Accumulator, 0x2A), (Rol, ZeroPage, 0x26), (Rol, ZeroPageX, 0x36), (Rol, Absolute, 0x2E),
    (Rol, AbsoluteX, 0x3E),
    (Ror, Accumulator, 0x6A), (Ror, ZeroPage, 0x66), (Ror, ZeroPageX, 0x76), (Ror, Absolute, 0x6E),
    (Ror, AbsoluteX, 0x7E),
    (Rti, Implied, 0x40), (Rts, Implied, 0x60),
    (Sbc, Immediate, 0xE9), (Sbc, ZeroPage, 0xE5), (Sbc, ZeroPageX, 0xF5), (Sbc, Absolute, 0xED),
    (Sbc, AbsoluteX, 0xFD), (Sbc, AbsoluteY, 0xF9), (Sbc, XIndirect, 0xE1), (Sbc, IndirectY, 0xF1),
    (Sec, Implied, 0x38), (Sed, Implied, 0xF8), (Sei, Implied, 0x78),
    (Sta, ZeroPage, 0x85), (Sta, ZeroPageX, 0x95), (Sta, Absolute, 0x8D), (Sta, AbsoluteX, 0x9D),
    (Sta, AbsoluteY, 0x99), (Sta, XIndirect, 0x81), (Sta, IndirectY, 0x91),
    (Stx, ZeroPage, 0x86), (Stx, ZeroPageY, 0x96), (Stx, Absolute, 0x8E),
    (Sty, ZeroPage, 0x84), (Sty, ZeroPageX, 0x94), (Sty, Absolute, 0x8C),
    (Tax, Implied, 0xAA), (Tay, Implied, 0xA8), (Tsx, Implied, 0xBA), (Txa, Implied, 0x8A),
    (Txs, Implied, 0x9A), (Tya, Implied, 0x98),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nmos_table_size() {
        // 151 documented opcodes plus HLT.
        assert_eq!(InstructionSet::nmos().iter().count(), 152);
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let mut set = InstructionSet::new();
        set.register(Lda, Immediate, 0xA9).unwrap();
        assert_eq!(
            set.register(Lda, Immediate, 0xA8),
            Err(InstructionSetError::DuplicateKey {
                instruction: Lda,
                mode: Immediate
            })
        );
    }

    #[test]
    fn duplicate_opcode_is_rejected() {
        let mut set = InstructionSet::new();
        set.register(Lda, Immediate, 0xA9).unwrap();
        assert_eq!(
            set.register(Ldx, Immediate, 0xA9),
            Err(InstructionSetError::DuplicateOpcode { opcode: 0xA9 })
        );
        assert!(!set.is_address_mode_supported(Ldx, Immediate), "failed register leaves no trace");
    }

    #[test]
    fn unassigned_opcode_fails_to_decode() {
        assert_eq!(
            InstructionSet::nmos().decode(0xFF),
            Err(InstructionSetError::UnrecognisedOpcode { opcode: 0xFF })
        );
    }

    #[test]
    fn encode_widths() {
        let set = InstructionSet::nmos();
        assert_eq!(set.encode(Nop, Implied, 0).unwrap().bytes(), [0xEA]);
        assert_eq!(set.encode(Asl, Accumulator, 0x1234).unwrap().bytes(), [0x0A], "operand ignored");
        assert_eq!(set.encode(Lda, Immediate, 0x10).unwrap().bytes(), [0xA9, 0x10]);
        assert_eq!(set.encode(Jmp, Indirect, 0x20FF).unwrap().bytes(), [0x6C, 0xFF, 0x20]);
    }

    #[test]
    fn encode_rejects_bad_combinations() {
        let set = InstructionSet::nmos();
        assert!(matches!(
            set.encode(Sta, Immediate, 0),
            Err(InstructionSetError::UnsupportedMode { .. })
        ));
        assert!(matches!(
            set.encode(Lda, ZeroPage, 0x100),
            Err(InstructionSetError::OperandOutOfRange { width: 1, .. })
        ));
        assert!(matches!(
            set.encode(Lda, Absolute, 0x1_0000),
            Err(InstructionSetError::OperandOutOfRange { width: 2, .. })
        ));
    }

    #[test]
    fn supported_modes() {
        let set = InstructionSet::nmos();
        assert_eq!(set.supported_address_modes(Jmp), [Absolute, Indirect]);
        assert_eq!(set.supported_address_modes(Stx), [ZeroPage, ZeroPageY, Absolute]);
        assert!(set.is_address_mode_supported(Ldx, ZeroPageY));
        assert!(!set.is_address_mode_supported(Lda, ZeroPageY));
        assert_eq!(set.instructions_with_mode(Indirect), [Jmp]);
    }
}
