//! 6502 register file.

use crate::Status;
use crate::flags::{I, U};

/// Base of the hardware stack page.
pub const STACK_PAGE: u16 = 0x0100;

/// A, X, Y, S, PC and P.
///
/// S indexes page one and points at the next free byte: a push writes
/// `$0100 | S` then decrements, a pull increments then reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub s: u8,
    pub pc: u16,
    pub p: Status,
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers {
    /// Power-on values: S = $FD, I set, everything else clear. PC is loaded
    /// from the reset vector by the CPU.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            s: 0xFD,
            pc: 0,
            p: Status(U | I),
        }
    }

    /// Address S currently points at.
    #[must_use]
    pub const fn stack_addr(&self) -> u16 {
        STACK_PAGE | self.s as u16
    }

    #[must_use]
    pub const fn pch(&self) -> u8 {
        (self.pc >> 8) as u8
    }

    #[must_use]
    pub const fn pcl(&self) -> u8 {
        self.pc as u8
    }
}
