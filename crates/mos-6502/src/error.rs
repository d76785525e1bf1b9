use emu_core::MemoryError;
use thiserror::Error;

use crate::{AddressingMode, Instruction};

/// Instruction table construction and lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstructionSetError {
    #[error("{instruction} {mode}: duplicate instruction key")]
    DuplicateKey {
        instruction: Instruction,
        mode: AddressingMode,
    },

    #[error("${opcode:02X}: duplicate opcode")]
    DuplicateOpcode { opcode: u8 },

    #[error("${opcode:02X}: unrecognised opcode")]
    UnrecognisedOpcode { opcode: u8 },

    #[error("{instruction} has no {mode} form")]
    UnsupportedMode {
        instruction: Instruction,
        mode: AddressingMode,
    },

    #[error("operand ${operand:X} does not fit the {width}-byte operand of {mode}")]
    OperandOutOfRange {
        mode: AddressingMode,
        operand: u32,
        width: usize,
    },
}

/// Conditions that abort execution. None of them is guest-visible
/// behaviour; each points at a modelling bug or a broken address map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Decode(#[from] InstructionSetError),

    #[error("stack overflow: push with S=$00 (PC ${pc:04X})")]
    StackOverflow { pc: u16 },

    #[error("stack underflow: pull with S=$FF (PC ${pc:04X})")]
    StackUnderflow { pc: u16 },

    #[error("micro-op queue overflow ({capacity} slots)")]
    QueueOverflow { capacity: usize },

    #[error("{instruction} {mode} is not implemented")]
    Unimplemented {
        instruction: Instruction,
        mode: AddressingMode,
    },
}
