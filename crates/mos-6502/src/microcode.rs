//! Micro-operations: one bus cycle of 6502 work each.
//!
//! Decoding an opcode queues the cycles that follow the opcode fetch. Most
//! sequences are fixed at decode time. Where the cycle count depends on data
//! (indexed reads crossing a page, taken branches) the last queued op
//! appends the extra cycles itself, so the queue always holds at most one
//! instruction.

use crate::CpuError;

/// Which index register an indexed mode adds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Index {
    X,
    Y,
}

/// One bus cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicroOp {
    /// Dummy read at PC while the implied or accumulator operation runs.
    ExecuteImplied,

    /// Read the operand at PC, increment PC, hand it to the ALU.
    ReadImmediate,

    /// Read the low address byte (or a zero-page address) at PC.
    FetchAddressLo,

    /// Read the high address byte at PC, optionally adding an index.
    /// Indexed reads append their own tail: one extra cycle on page cross.
    FetchAddressHi(Option<Index>),

    /// Dummy read of the zero-page base, then index within page zero.
    IndexZeroPage(Index),

    /// Read a zero-page pointer at PC.
    FetchPointer,

    /// Dummy read of the pointer, then add X within page zero.
    IndexPointer,

    /// Read the target low byte through the pointer.
    ReadPointerLo,

    /// Read the target high byte at pointer + 1 (wrapping in page zero),
    /// optionally adding Y.
    ReadPointerHi(Option<Index>),

    /// Dummy read at the indexed address before the carry reached the high
    /// byte; afterwards the effective address is the corrected one.
    FixupAddress,

    /// Read the effective address and hand the value to the ALU.
    ReadOperand,

    /// Store the register the instruction names.
    WriteRegister,

    /// First cycle of read-modify-write: read the operand.
    ReadModify,

    /// Second cycle: write the unmodified value back.
    WriteUnmodified,

    /// Third cycle: write the modified value.
    WriteModified,

    /// Read the high byte at PC and jump (JMP abs, last cycle of JSR).
    JumpAbsolute,

    /// Read the low byte of an indirect jump target.
    ReadIndirectLo,

    /// Read the high byte from `(addr & $FF00) | (addr + 1 & $FF)` and jump.
    JumpIndirect,

    /// Read the branch offset and test the condition.
    FetchBranchOffset,

    /// Dummy read at PC; add the offset to PCL.
    BranchTaken,

    /// Dummy read in the wrong page; correct PCH.
    BranchFixup,

    DummyReadPc,

    /// Read at PC and step past it: BRK's padding byte, RTS's last cycle.
    ReadPcIncrement,

    /// Read at the current stack address without moving S.
    DummyStackRead,

    PushPch,
    PushPcl,

    /// Push P; B set for BRK and PHP, clear for hardware interrupts.
    PushStatus { brk: bool },

    PushA,
    PullStatus,
    PullA,
    PullPcl,

    /// Pull PCH; RTI also leaves the interrupt handler here.
    PullPch,

    /// Load PCL from `vector` and set I.
    VectorLo(u16),

    /// Load PCH from `vector + 1`. A hardware entry ends here.
    VectorHi { vector: u16, hardware: bool },
}

/// Fixed-capacity FIFO of pending micro-ops.
#[derive(Debug, Clone)]
pub struct MicroOpQueue {
    ops: [MicroOp; Self::CAPACITY],
    head: usize,
    len: usize,
}

impl Default for MicroOpQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MicroOpQueue {
    pub const CAPACITY: usize = 16;

    #[must_use]
    pub const fn new() -> Self {
        Self {
            ops: [MicroOp::DummyReadPc; Self::CAPACITY],
            head: 0,
            len: 0,
        }
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Append an op. A full queue means a sequence was modelled wrongly.
    pub fn push(&mut self, op: MicroOp) -> Result<(), CpuError> {
        if self.len == Self::CAPACITY {
            return Err(CpuError::QueueOverflow {
                capacity: Self::CAPACITY,
            });
        }
        self.ops[(self.head + self.len) % Self::CAPACITY] = op;
        self.len += 1;
        Ok(())
    }

    pub fn extend(&mut self, ops: impl IntoIterator<Item = MicroOp>) -> Result<(), CpuError> {
        ops.into_iter().try_for_each(|op| self.push(op))
    }

    pub fn pop(&mut self) -> Option<MicroOp> {
        if self.len == 0 {
            return None;
        }
        let op = self.ops[self.head];
        self.head = (self.head + 1) % Self::CAPACITY;
        self.len -= 1;
        Some(op)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_across_wraparound() {
        let mut queue = MicroOpQueue::new();
        for _ in 0..10 {
            queue.push(MicroOp::DummyReadPc).unwrap();
            queue.pop();
        }
        queue.push(MicroOp::PushPch).unwrap();
        queue.push(MicroOp::PushPcl).unwrap();
        queue.push(MicroOp::PushStatus { brk: true }).unwrap();
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pop(), Some(MicroOp::PushPch));
        assert_eq!(queue.pop(), Some(MicroOp::PushPcl));
        assert_eq!(queue.pop(), Some(MicroOp::PushStatus { brk: true }));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn overflow_is_an_error() {
        let mut queue = MicroOpQueue::new();
        for _ in 0..MicroOpQueue::CAPACITY {
            queue.push(MicroOp::DummyReadPc).unwrap();
        }
        assert_eq!(
            queue.push(MicroOp::DummyReadPc),
            Err(CpuError::QueueOverflow { capacity: 16 })
        );
        assert_eq!(queue.len(), 16);
    }

    #[test]
    fn clear_empties() {
        let mut queue = MicroOpQueue::new();
        queue.extend([MicroOp::PushA, MicroOp::PullA]).unwrap();
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.pop(), None);
    }
}
