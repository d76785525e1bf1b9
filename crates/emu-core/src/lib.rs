//! Core traits and building blocks for cycle-accurate emulation.
//!
//! One bus access per tick. Everything that is clocked implements
//! [`Tickable`]; everything the CPU can address implements [`Memory`].
//! Peripherals expose a register window through [`MemoryMappedDevice`] and
//! report their interrupt lines through [`InterruptSource`].

mod clock;
mod cpu;
mod device;
mod interrupt;
mod memory;
mod observable;
mod region;
mod runner;
mod tickable;
mod ticks;

pub use clock::{BusyWait, ClockSpeed, ClockStrategy, ParseClockSpeedError, Unthrottled};
pub use cpu::Cpu;
pub use device::{Mapped, MemoryMappedDevice, RegisterWindow};
pub use interrupt::{InterruptAggregator, InterruptLines, InterruptSource, NoInterrupts, SourceId};
pub use memory::{CompoundMemory, Memory, MemoryError};
pub use observable::{Observable, Value, subpath};
pub use region::{PagedRom, Ram, Rom, PAGED_ROM_SLOTS};
pub use runner::{RESET_CYCLES, RunOutcome, RunStats, Runner};
pub use tickable::Tickable;
pub use ticks::Ticks;
