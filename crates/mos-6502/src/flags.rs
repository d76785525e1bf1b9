//! 6502 processor status register (P).

use std::fmt;

/// Carry.
pub const C: u8 = 0x01;

/// Zero.
pub const Z: u8 = 0x02;

/// Interrupt disable. While set, IRQ is ignored; NMI is not.
pub const I: u8 = 0x04;

/// Decimal mode for ADC/SBC.
pub const D: u8 = 0x08;

/// Break. Exists only in the pushed copy of P: set by BRK and PHP, clear
/// when IRQ or NMI push it.
pub const B: u8 = 0x10;

/// Unused bit, always reads as 1.
pub const U: u8 = 0x20;

/// Overflow.
pub const V: u8 = 0x40;

/// Negative.
pub const N: u8 = 0x80;

/// Processor status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status(pub u8);

impl Status {
    #[must_use]
    pub const fn new() -> Self {
        Self(U)
    }

    /// Status as pulled from the stack by PLP or RTI: B is dropped, U forced.
    #[must_use]
    pub const fn pulled(value: u8) -> Self {
        Self((value | U) & !B)
    }

    /// The byte pushed to the stack. `brk` distinguishes BRK/PHP from a
    /// hardware interrupt.
    #[must_use]
    pub const fn pushed(self, brk: bool) -> u8 {
        if brk {
            self.0 | U | B
        } else {
            (self.0 | U) & !B
        }
    }

    #[must_use]
    pub const fn is_set(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    pub fn set_if(&mut self, flag: u8, condition: bool) {
        if condition {
            self.0 |= flag;
        } else {
            self.0 &= !flag;
        }
    }

    pub fn update_nz(&mut self, value: u8) {
        self.set_if(N, value & 0x80 != 0);
        self.set_if(Z, value == 0);
    }

    /// The carry as an addend.
    #[must_use]
    pub const fn carry(self) -> u8 {
        self.0 & C
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Status {
    /// `NV-BDIZC`, upper case for set flags.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(u8, char); 8] = [
            (N, 'N'),
            (V, 'V'),
            (U, '-'),
            (B, 'B'),
            (D, 'D'),
            (I, 'I'),
            (Z, 'Z'),
            (C, 'C'),
        ];
        for (flag, name) in NAMES {
            let shown = if self.is_set(flag) { name } else { name.to_ascii_lowercase() };
            write!(f, "{shown}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pushed_copy_carries_break_only_for_brk() {
        let p = Status(C | N);
        assert_eq!(p.pushed(true), C | N | U | B);
        assert_eq!(p.pushed(false), C | N | U);
    }

    #[test]
    fn pulled_copy_drops_break() {
        assert_eq!(Status::pulled(0xFF), Status(0xFF & !B));
        assert_eq!(Status::pulled(0x00), Status(U));
    }

    #[test]
    fn default_has_the_unused_bit_set() {
        assert_eq!(Status::default(), Status::new());
        assert!(Status::default().is_set(U));
    }

    #[test]
    fn display_shows_set_flags_in_capitals() {
        assert_eq!(Status(N | U | Z | C).to_string(), "Nv-bdiZC");
    }
}
