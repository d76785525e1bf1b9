//! Cycle-accurate MOS 6502 CPU.
//!
//! The 6502 performs one bus access per cycle. Each `tick()` advances
//! exactly one cycle: decoding an opcode queues the micro-operations for
//! the rest of the instruction, and subsequent ticks drain the queue.
//! Between instructions the CPU is *quiescent*, which is the only point at
//! which interrupts are taken and snapshots are meaningful.
//!
//! The [`InstructionSet`] table is usable on its own as an assembler and
//! disassembler back end.

mod alu;
mod cpu;
mod error;
pub mod flags;
mod instruction;
mod instruction_set;
mod microcode;
mod registers;
mod snapshot;

pub use cpu::{IRQ_VECTOR, Mos6502, NMI_VECTOR, QuiescentCallback, RESET_VECTOR, StackPolicy};
pub use error::{CpuError, InstructionSetError};
pub use flags::Status;
pub use instruction::{AddressingMode, Instruction, InstructionType};
pub use instruction_set::{Encoded, InstructionKey, InstructionSet};
pub use microcode::{Index, MicroOp, MicroOpQueue};
pub use registers::{Registers, STACK_PAGE};
pub use snapshot::CpuSnapshot;
