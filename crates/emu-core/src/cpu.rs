//! CPU core trait.

use crate::{InterruptSource, Memory, Ticks};

/// A CPU core clocked one bus cycle at a time.
///
/// Memory and the interrupt lines are lent to each tick rather than owned,
/// so the machine can tick its peripherals against the same bus afterwards.
pub trait Cpu {
    type Error;

    /// Register file as seen by tools.
    type Registers;

    /// Advance by exactly one bus cycle.
    fn tick<M, I>(&mut self, memory: &mut M, interrupts: &I) -> Result<(), Self::Error>
    where
        M: Memory + ?Sized,
        I: InterruptSource + ?Sized;

    /// Return to the power-on state and load PC from the reset vector.
    fn reset<M: Memory + ?Sized>(&mut self, memory: &mut M) -> Result<(), Self::Error>;

    fn pc(&self) -> u16;

    fn registers(&self) -> Self::Registers;

    fn is_halted(&self) -> bool;

    /// Between instructions with no interrupt entry in progress: the only
    /// point where state can be captured without tearing an instruction.
    fn is_quiescent(&self) -> bool;

    /// Cycles executed since construction.
    fn cycles(&self) -> Ticks;
}
