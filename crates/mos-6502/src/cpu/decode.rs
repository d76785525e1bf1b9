//! Opcode to micro-op sequence.

use super::{IRQ_VECTOR, Mos6502};
use crate::microcode::{Index, MicroOp};
use crate::{AddressingMode, CpuError, Instruction, InstructionKey, InstructionType};

use AddressingMode as M;

impl Mos6502 {
    /// Queue the cycles after the opcode fetch.
    pub(super) fn queue_instruction(&mut self, key: InstructionKey) -> Result<(), CpuError> {
        let kind = key.instruction.instruction_type();
        match kind {
            InstructionType::Implied => self.queue.push(MicroOp::ExecuteImplied),
            InstructionType::ReadModifyWrite if key.mode == M::Accumulator => {
                self.queue.push(MicroOp::ExecuteImplied)
            }
            InstructionType::Read if key.mode == M::Immediate => self.queue.push(MicroOp::ReadImmediate),
            InstructionType::Read | InstructionType::Write | InstructionType::ReadModifyWrite => {
                self.queue_addressing(kind, key.mode)?;
                self.queue_access(kind, key.mode)
            }
            InstructionType::Jump => self.queue_jump(key.mode),
            InstructionType::Branch => self.queue.push(MicroOp::FetchBranchOffset),
            InstructionType::Stack => self.queue_stack(key.instruction),
        }
    }

    /// Address computation. Indexed reads leave the fix-up and the operand
    /// read to the op that learns whether a page was crossed.
    fn queue_addressing(&mut self, kind: InstructionType, mode: AddressingMode) -> Result<(), CpuError> {
        let read = kind == InstructionType::Read;
        match mode {
            M::ZeroPage => self.queue.push(MicroOp::FetchAddressLo),
            M::ZeroPageX => self
                .queue
                .extend([MicroOp::FetchAddressLo, MicroOp::IndexZeroPage(Index::X)]),
            M::ZeroPageY => self
                .queue
                .extend([MicroOp::FetchAddressLo, MicroOp::IndexZeroPage(Index::Y)]),
            M::Absolute => self
                .queue
                .extend([MicroOp::FetchAddressLo, MicroOp::FetchAddressHi(None)]),
            M::AbsoluteX | M::AbsoluteY => {
                let index = if mode == M::AbsoluteX { Index::X } else { Index::Y };
                self.queue
                    .extend([MicroOp::FetchAddressLo, MicroOp::FetchAddressHi(Some(index))])?;
                if read {
                    Ok(())
                } else {
                    self.queue.push(MicroOp::FixupAddress)
                }
            }
            M::XIndirect => self.queue.extend([
                MicroOp::FetchPointer,
                MicroOp::IndexPointer,
                MicroOp::ReadPointerLo,
                MicroOp::ReadPointerHi(None),
            ]),
            M::IndirectY => {
                self.queue.extend([
                    MicroOp::FetchPointer,
                    MicroOp::ReadPointerLo,
                    MicroOp::ReadPointerHi(Some(Index::Y)),
                ])?;
                if read {
                    Ok(())
                } else {
                    self.queue.push(MicroOp::FixupAddress)
                }
            }
            _ => Err(self.unimplemented()),
        }
    }

    fn queue_access(&mut self, kind: InstructionType, mode: AddressingMode) -> Result<(), CpuError> {
        let indexed_read =
            kind == InstructionType::Read && matches!(mode, M::AbsoluteX | M::AbsoluteY | M::IndirectY);
        match kind {
            InstructionType::Read if indexed_read => Ok(()),
            InstructionType::Read => self.queue.push(MicroOp::ReadOperand),
            InstructionType::Write => self.queue.push(MicroOp::WriteRegister),
            _ => self.queue.extend([
                MicroOp::ReadModify,
                MicroOp::WriteUnmodified,
                MicroOp::WriteModified,
            ]),
        }
    }

    fn queue_jump(&mut self, mode: AddressingMode) -> Result<(), CpuError> {
        match mode {
            M::Absolute => self
                .queue
                .extend([MicroOp::FetchAddressLo, MicroOp::JumpAbsolute]),
            M::Indirect => self.queue.extend([
                MicroOp::FetchAddressLo,
                MicroOp::FetchAddressHi(None),
                MicroOp::ReadIndirectLo,
                MicroOp::JumpIndirect,
            ]),
            _ => Err(self.unimplemented()),
        }
    }

    fn queue_stack(&mut self, instruction: Instruction) -> Result<(), CpuError> {
        match instruction {
            Instruction::Brk => self.queue.extend([
                MicroOp::ReadPcIncrement,
                MicroOp::PushPch,
                MicroOp::PushPcl,
                MicroOp::PushStatus { brk: true },
                MicroOp::VectorLo(IRQ_VECTOR),
                MicroOp::VectorHi {
                    vector: IRQ_VECTOR,
                    hardware: false,
                },
            ]),
            Instruction::Jsr => self.queue.extend([
                MicroOp::FetchAddressLo,
                MicroOp::DummyStackRead,
                MicroOp::PushPch,
                MicroOp::PushPcl,
                MicroOp::JumpAbsolute,
            ]),
            Instruction::Rti => self.queue.extend([
                MicroOp::DummyReadPc,
                MicroOp::DummyStackRead,
                MicroOp::PullStatus,
                MicroOp::PullPcl,
                MicroOp::PullPch,
            ]),
            Instruction::Rts => self.queue.extend([
                MicroOp::DummyReadPc,
                MicroOp::DummyStackRead,
                MicroOp::PullPcl,
                MicroOp::PullPch,
                MicroOp::ReadPcIncrement,
            ]),
            Instruction::Pha => self.queue.extend([MicroOp::DummyReadPc, MicroOp::PushA]),
            Instruction::Php => self
                .queue
                .extend([MicroOp::DummyReadPc, MicroOp::PushStatus { brk: true }]),
            Instruction::Pla => self
                .queue
                .extend([MicroOp::DummyReadPc, MicroOp::DummyStackRead, MicroOp::PullA]),
            Instruction::Plp => self.queue.extend([
                MicroOp::DummyReadPc,
                MicroOp::DummyStackRead,
                MicroOp::PullStatus,
            ]),
            _ => Err(self.unimplemented()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InstructionSet;

    /// Cycles per instruction, not counting page-cross or branch extras.
    fn base_cycles(key: InstructionKey) -> usize {
        let mut cpu = Mos6502::new();
        cpu.current = key;
        cpu.queue_instruction(key).unwrap();
        cpu.queued_cycles() + 1
    }

    #[test]
    fn every_documented_opcode_queues() {
        for (opcode, key) in InstructionSet::nmos().iter() {
            let mut cpu = Mos6502::new();
            cpu.current = key;
            assert!(
                cpu.queue_instruction(key).is_ok(),
                "${opcode:02X} {} {} failed to queue",
                key.instruction,
                key.mode
            );
        }
    }

    #[test]
    fn documented_cycle_counts() {
        let cases = [
            (Instruction::Lda, M::Immediate, 2),
            (Instruction::Lda, M::ZeroPage, 3),
            (Instruction::Lda, M::ZeroPageX, 4),
            (Instruction::Lda, M::Absolute, 4),
            (Instruction::Lda, M::AbsoluteX, 3), // + operand read, + fix-up on page cross
            (Instruction::Lda, M::XIndirect, 6),
            (Instruction::Lda, M::IndirectY, 4), // + operand read, + fix-up on page cross
            (Instruction::Sta, M::AbsoluteX, 5),
            (Instruction::Sta, M::IndirectY, 6),
            (Instruction::Inc, M::ZeroPage, 5),
            (Instruction::Inc, M::AbsoluteX, 7),
            (Instruction::Asl, M::Accumulator, 2),
            (Instruction::Jmp, M::Absolute, 3),
            (Instruction::Jmp, M::Indirect, 5),
            (Instruction::Jsr, M::Absolute, 6),
            (Instruction::Rts, M::Implied, 6),
            (Instruction::Rti, M::Implied, 6),
            (Instruction::Brk, M::Implied, 7),
            (Instruction::Pha, M::Implied, 3),
            (Instruction::Pla, M::Implied, 4),
            (Instruction::Bne, M::Relative, 2),
            (Instruction::Nop, M::Implied, 2),
        ];
        for (instruction, mode, cycles) in cases {
            assert_eq!(
                base_cycles(InstructionKey::new(instruction, mode)),
                cycles,
                "{instruction} {mode}"
            );
        }
    }

    #[test]
    fn unsupported_combination_is_unimplemented() {
        let key = InstructionKey::new(Instruction::Jmp, M::ZeroPage);
        let mut cpu = Mos6502::new();
        cpu.current = key;
        assert_eq!(
            cpu.queue_instruction(key),
            Err(CpuError::Unimplemented {
                instruction: Instruction::Jmp,
                mode: M::ZeroPage
            })
        );
    }
}
