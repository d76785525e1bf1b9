//! System VIA: a 6522 wired to the keyboard, the IC32 addressable latch
//! and the CRTC vertical sync.
//!
//! Port B bits 0-2 address one bit of IC32 and bit 3 is the value written
//! to it. The latch outputs that matter here:
//!
//! | IC32 bit | Function                                  |
//! |----------|-------------------------------------------|
//! | 3        | Keyboard write enable (1 = free-running)  |
//! | 4, 5     | Screen size selector for hardware scroll  |
//! | 6        | Caps lock LED (active low)                |
//! | 7        | Shift lock LED (active low)               |
//!
//! With the keyboard enabled for reading, port A bits 0-3 select a column
//! and bits 4-6 a row; bit 7 reads back high when that key is down. CA2
//! goes high while any non-modifier key in the selected column (or, when
//! free-running, in any column) is down.

use emu_core::{InterruptSource, MemoryMappedDevice, Observable, Value, subpath};
use mos_via_6522::{Register, Via6522, ViaSnapshot};
use serde::{Deserialize, Serialize};

const IC32_KEYBOARD_WRITE: u8 = 0x08;
const IC32_SCREEN_LO: u8 = 0x10;
const IC32_SCREEN_HI: u8 = 0x20;
const IC32_CAPS_LOCK: u8 = 0x40;
const IC32_SHIFT_LOCK: u8 = 0x80;

/// Columns addressable through port A.
pub const KEY_COLUMNS: usize = 16;
/// Columns that carry keys.
const SCANNED_COLUMNS: usize = 10;
/// Row 0 holds the modifier keys, which never raise CA2.
const ROWS_EXCEPT_MODIFIERS: u8 = 0xFE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemViaSnapshot {
    pub via: ViaSnapshot,
    pub ic32: u8,
}

/// The system VIA at SHEILA &40.
#[derive(Debug, Clone, Default)]
pub struct SystemVia {
    via: Via6522,
    ic32: u8,
    /// One byte per column, one bit per row.
    keys: [u8; KEY_COLUMNS],
}

impl SystemVia {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn via(&self) -> &Via6522 {
        &self.via
    }

    pub fn via_mut(&mut self) -> &mut Via6522 {
        &mut self.via
    }

    pub fn tick(&mut self) {
        self.via.tick();
    }

    /// The CRTC vertical sync drives CA1.
    pub fn set_vsync(&mut self, level: bool) {
        self.via.set_ca1(level);
    }

    #[must_use]
    pub fn ic32(&self) -> u8 {
        self.ic32
    }

    /// Hardware scroll wrap size, 0-3, from IC32 bits 4 and 5.
    #[must_use]
    pub fn screen_size(&self) -> u8 {
        let hi = if self.ic32 & IC32_SCREEN_LO != 0 { 2 } else { 0 };
        let lo = if self.ic32 & IC32_SCREEN_HI != 0 { 1 } else { 0 };
        hi | lo
    }

    #[must_use]
    pub fn is_caps_lock_on(&self) -> bool {
        self.ic32 & IC32_CAPS_LOCK == 0
    }

    #[must_use]
    pub fn is_shift_lock_on(&self) -> bool {
        self.ic32 & IC32_SHIFT_LOCK == 0
    }

    /// True when the keyboard free-runs instead of being read through port A.
    #[must_use]
    pub fn is_keyboard_autoscan(&self) -> bool {
        self.ic32 & IC32_KEYBOARD_WRITE != 0
    }

    /// Press or release the key at `column` (0-15), `row` (0-7).
    pub fn set_key(&mut self, column: u8, row: u8, down: bool) {
        let bit = 1 << (row & 7);
        let rows = &mut self.keys[usize::from(column) % KEY_COLUMNS];
        if down {
            *rows |= bit;
        } else {
            *rows &= !bit;
        }
        self.update_keyboard();
    }

    #[must_use]
    pub fn is_key_down(&self, column: u8, row: u8) -> bool {
        self.keys[usize::from(column) % KEY_COLUMNS] & (1 << (row & 7)) != 0
    }

    pub fn release_all_keys(&mut self) {
        self.keys = [0; KEY_COLUMNS];
        self.update_keyboard();
    }

    #[must_use]
    pub fn snapshot(&self) -> SystemViaSnapshot {
        SystemViaSnapshot {
            via: self.via.snapshot(),
            ic32: self.ic32,
        }
    }

    pub fn restore(&mut self, snapshot: &SystemViaSnapshot) {
        self.via.restore(&snapshot.via);
        self.ic32 = snapshot.ic32;
    }

    fn update_ic32(&mut self) {
        let pb = self.via.port_b_output();
        let bit = 1 << (pb & 0x07);
        let previous = self.ic32;
        if pb & 0x08 != 0 {
            self.ic32 |= bit;
        } else {
            self.ic32 &= !bit;
        }
        if self.ic32 != previous {
            log::trace!("IC32 ${previous:02X} -> ${:02X}", self.ic32);
        }
        self.update_keyboard();
    }

    fn update_keyboard(&mut self) {
        let ca2 = if self.is_keyboard_autoscan() {
            self.keys[..SCANNED_COLUMNS]
                .iter()
                .any(|rows| rows & ROWS_EXCEPT_MODIFIERS != 0)
        } else {
            let pa = self.via.port_a_output();
            let column = usize::from(pa & 0x0F);
            let row = (pa >> 4) & 0x07;
            let down = self.keys[column] & (1 << row) != 0;
            self.via.set_port_a_input(if down { 0xFF } else { 0x7F });
            column < SCANNED_COLUMNS && self.keys[column] & ROWS_EXCEPT_MODIFIERS != 0
        };
        self.via.set_ca2(ca2);
    }
}

impl MemoryMappedDevice for SystemVia {
    fn read_register(&mut self, index: u8) -> u8 {
        let register = Register::from_index(index);
        if matches!(register, Register::Ora | Register::OraNoHandshake) {
            self.update_keyboard();
        }
        self.via.read(register)
    }

    fn write_register(&mut self, index: u8, value: u8) {
        let register = Register::from_index(index);
        self.via.write(register, value);
        match register {
            Register::Orb | Register::Ddrb => self.update_ic32(),
            Register::Ora | Register::Ddra | Register::OraNoHandshake => self.update_keyboard(),
            _ => {}
        }
    }
}

impl InterruptSource for SystemVia {
    fn is_irq(&self) -> bool {
        self.via.is_irq()
    }
}

impl Observable for SystemVia {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "ic32" => Some(self.ic32.into()),
            "screen_size" => Some(self.screen_size().into()),
            "caps_lock" => Some(self.is_caps_lock_on().into()),
            "shift_lock" => Some(self.is_shift_lock_on().into()),
            _ => subpath(path, "via").map_or_else(|| self.via.query(path), |rest| self.via.query(rest)),
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "ic32", "screen_size", "caps_lock", "shift_lock", "ifr", "ier", "acr", "pcr", "t1",
            "t1_latch", "t2", "sr", "port_a", "port_b", "ddra", "ddrb", "irq",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mos_via_6522::irq;

    const ORB: u8 = 0x0;
    const ORA: u8 = 0x1;
    const DDRB: u8 = 0x2;
    const DDRA: u8 = 0x3;
    const PCR: u8 = 0xC;
    const IFR: u8 = 0xD;
    const IER: u8 = 0xE;

    /// Port B low nibble out, port A out except bit 7, as the MOS sets it up.
    fn configured() -> SystemVia {
        let mut via = SystemVia::new();
        via.write_register(DDRB, 0x0F);
        via.write_register(DDRA, 0x7F);
        via.write_register(PCR, 0x04);
        via
    }

    fn set_latch(via: &mut SystemVia, bit: u8, value: bool) {
        via.write_register(ORB, bit | if value { 0x08 } else { 0 });
    }

    #[test]
    fn port_b_drives_ic32() {
        let mut via = configured();
        assert!(via.is_caps_lock_on(), "LEDs are active low");
        assert!(via.is_shift_lock_on());

        set_latch(&mut via, 6, true);
        set_latch(&mut via, 4, true);
        set_latch(&mut via, 5, true);
        assert_eq!(via.ic32(), 0x70);
        assert!(!via.is_caps_lock_on());
        assert!(via.is_shift_lock_on());
        assert_eq!(via.screen_size(), 3);

        set_latch(&mut via, 4, false);
        assert_eq!(via.screen_size(), 1);
    }

    #[test]
    fn key_read_through_port_a() {
        let mut via = configured();
        via.set_key(2, 3, true);

        via.write_register(ORA, 0x32);
        assert_eq!(via.read_register(ORA) & 0x80, 0x80, "selected key is down");

        via.write_register(ORA, 0x42);
        assert_eq!(via.read_register(ORA) & 0x80, 0, "other row in the column");
        assert_eq!(via.read_register(ORA) & 0x7F, 0x42, "output bits read back");
    }

    #[test]
    fn key_in_selected_column_raises_ca2() {
        let mut via = configured();
        via.write_register(IER, 0x80 | irq::CA2);
        via.write_register(ORA, 0x05);
        assert!(!via.is_irq());

        via.set_key(5, 2, true);
        assert!(via.is_irq(), "CA2 rising edge in column 5");

        via.write_register(IFR, irq::CA2);
        via.set_key(5, 2, false);
        via.set_key(6, 2, true);
        assert!(!via.is_irq(), "column 6 is not selected");
    }

    #[test]
    fn autoscan_sees_any_column() {
        let mut via = configured();
        via.write_register(IER, 0x80 | irq::CA2);
        set_latch(&mut via, 3, true);
        assert!(via.is_keyboard_autoscan());

        via.set_key(0, 0, true);
        assert!(!via.is_irq(), "modifier keys do not interrupt");
        via.set_key(9, 7, true);
        assert!(via.is_irq());
    }

    #[test]
    fn vsync_reaches_ca1() {
        let mut via = configured();
        via.write_register(IER, 0x80 | irq::CA1);
        via.set_vsync(true);
        assert!(!via.is_irq(), "PCR selects the falling edge");
        via.set_vsync(false);
        assert!(via.is_irq());
        assert_eq!(via.query("ifr"), Some(Value::U8(0x80 | irq::CA1)));
        assert_eq!(via.query("via.ifr"), via.query("ifr"));
    }

    #[test]
    fn snapshot_keeps_ic32() {
        let mut via = configured();
        set_latch(&mut via, 7, true);
        let snap = via.snapshot();

        let mut other = SystemVia::new();
        other.restore(&snap);
        assert_eq!(other.ic32(), 0x80);
        assert_eq!(other.via().snapshot(), snap.via);
    }
}
