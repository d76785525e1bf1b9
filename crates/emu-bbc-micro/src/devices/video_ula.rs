//! Video ULA: display mode control and the 16-entry palette.
//!
//! Both registers are write-only. Register 0 is the video control register:
//!
//! | Bit | Meaning                                   |
//! |-----|-------------------------------------------|
//! | 7   | Master cursor size                        |
//! | 5-6 | Cursor width / bits per pixel (1, 2, 4)   |
//! | 4   | 2 MHz character clock                     |
//! | 2-3 | Characters per line (10, 20, 40, 80)      |
//! | 1   | Teletext output                           |
//! | 0   | Flash colour select                       |
//!
//! Register 1 loads one palette entry: the high nibble is the logical
//! colour, the low nibble the physical colour with its RGB bits inverted.

use emu_core::{InterruptSource, MemoryMappedDevice, Observable, Value};
use serde::{Deserialize, Serialize};

const PALETTE_SIZE: usize = 16;

/// Control register and palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoUlaSnapshot {
    pub control: u8,
    pub palette: [u8; PALETTE_SIZE],
}

/// The Video ULA at SHEILA &20.
#[derive(Debug, Clone)]
pub struct VideoUla {
    control: u8,
    palette: [u8; PALETTE_SIZE],
}

impl Default for VideoUla {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoUla {
    /// Control register clear and an identity palette.
    #[must_use]
    pub fn new() -> Self {
        Self {
            control: 0,
            palette: std::array::from_fn(|i| i as u8),
        }
    }

    #[must_use]
    pub fn control(&self) -> u8 {
        self.control
    }

    /// Physical colour currently assigned to `logical` (low four bits).
    #[must_use]
    pub fn palette(&self, logical: u8) -> u8 {
        self.palette[usize::from(logical & 0x0F)]
    }

    #[must_use]
    pub fn master_cursor_size(&self) -> u8 {
        self.control >> 7
    }

    /// Cursor width in bytes, which is also the number of bits per pixel.
    #[must_use]
    pub fn cursor_width(&self) -> u8 {
        match (self.control >> 5) & 0x03 {
            2 => 2,
            3 => 4,
            _ => 1,
        }
    }

    #[must_use]
    pub fn bits_per_pixel(&self) -> u8 {
        self.cursor_width()
    }

    #[must_use]
    pub fn pixels_per_character(&self) -> u8 {
        8 / self.cursor_width()
    }

    #[must_use]
    pub fn is_fast_clock(&self) -> bool {
        self.control & 0x10 != 0
    }

    #[must_use]
    pub fn characters_per_line(&self) -> u8 {
        match (self.control >> 2) & 0x03 {
            0 => 10,
            1 => 20,
            2 => 40,
            _ => 80,
        }
    }

    #[must_use]
    pub fn is_teletext(&self) -> bool {
        self.control & 0x02 != 0
    }

    #[must_use]
    pub fn flash_index(&self) -> u8 {
        self.control & 0x01
    }

    #[must_use]
    pub fn is_cursor_enabled(&self) -> bool {
        self.master_cursor_size() > 0 || self.cursor_width() > 1
    }

    /// Logical colour of pixel `position` (0 = leftmost) in a screen byte,
    /// at the current bits per pixel. Pixels are interleaved across the
    /// byte: in 2 bpp, pixel 0 is bits 7 and 3.
    #[must_use]
    pub fn logical_colour(&self, byte: u8, position: u8) -> u8 {
        match self.bits_per_pixel() {
            4 => {
                let bits = (byte << (position & 1)) & 0xAA;
                ((bits >> 4) & 8) | ((bits >> 3) & 4) | ((bits >> 2) & 2) | ((bits >> 1) & 1)
            }
            2 => {
                let bits = (byte << (position & 3)) & 0x88;
                ((bits >> 6) & 2) | ((bits >> 3) & 1)
            }
            _ => (byte >> (7 - (position & 7))) & 1,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> VideoUlaSnapshot {
        VideoUlaSnapshot {
            control: self.control,
            palette: self.palette,
        }
    }

    pub fn restore(&mut self, snapshot: &VideoUlaSnapshot) {
        self.control = snapshot.control;
        self.palette = snapshot.palette;
    }
}

impl MemoryMappedDevice for VideoUla {
    fn read_register(&mut self, index: u8) -> u8 {
        log::warn!("read of write-only video ULA register {}", index & 1);
        0
    }

    fn write_register(&mut self, index: u8, value: u8) {
        if index & 1 == 0 {
            self.control = value;
        } else {
            let logical = usize::from(value >> 4);
            self.palette[logical] = (value & 0x0F) ^ 0x07;
        }
    }
}

impl InterruptSource for VideoUla {}

impl Observable for VideoUla {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(entry) = path.strip_prefix("palette.") {
            return entry
                .parse::<u8>()
                .ok()
                .filter(|&i| usize::from(i) < PALETTE_SIZE)
                .map(|i| self.palette(i).into());
        }
        match path {
            "control" => Some(self.control.into()),
            "chars_per_line" => Some(self.characters_per_line().into()),
            "bits_per_pixel" => Some(self.bits_per_pixel().into()),
            "teletext" => Some(self.is_teletext().into()),
            "fast_clock" => Some(self.is_fast_clock().into()),
            "flash" => Some(self.flash_index().into()),
            "cursor_enabled" => Some(self.is_cursor_enabled().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "control",
            "chars_per_line",
            "bits_per_pixel",
            "teletext",
            "fast_clock",
            "flash",
            "cursor_enabled",
            "palette.<0-15>",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_0_control_byte() {
        let mut ula = VideoUla::new();
        ula.write_register(0, 0x9C);
        assert_eq!(ula.characters_per_line(), 80);
        assert!(ula.is_fast_clock());
        assert_eq!(ula.cursor_width(), 1);
        assert_eq!(ula.pixels_per_character(), 8);
        assert!(ula.is_cursor_enabled(), "master cursor bit set");
        assert!(!ula.is_teletext());
    }

    #[test]
    fn mode_2_is_four_bits_per_pixel() {
        let mut ula = VideoUla::new();
        ula.write_register(0, 0xF4);
        assert_eq!(ula.bits_per_pixel(), 4);
        assert_eq!(ula.pixels_per_character(), 2);
        assert_eq!(ula.characters_per_line(), 20);
    }

    #[test]
    fn mode_7_is_teletext() {
        let mut ula = VideoUla::new();
        ula.write_register(0, 0x4B);
        assert!(ula.is_teletext());
        assert_eq!(ula.flash_index(), 1);
        assert_eq!(ula.characters_per_line(), 40);
    }

    #[test]
    fn palette_write_inverts_physical_colour() {
        let mut ula = VideoUla::new();
        assert_eq!(ula.palette(5), 5, "identity at power on");
        // Logical 3 -> physical 1 (red) is written as 1 ^ 7 = 6.
        ula.write_register(1, 0x36);
        assert_eq!(ula.palette(3), 1);
        // Any odd index reaches the palette.
        ula.write_register(0x0F, 0xF0);
        assert_eq!(ula.palette(15), 7);
    }

    #[test]
    fn registers_read_as_zero() {
        let mut ula = VideoUla::new();
        ula.write_register(0, 0xFF);
        assert_eq!(ula.read_register(0), 0);
        assert_eq!(ula.read_register(1), 0);
    }

    #[test]
    fn logical_colour_extraction() {
        let mut ula = VideoUla::new();
        ula.write_register(0, 0x00);
        assert_eq!(ula.logical_colour(0b1000_0001, 0), 1);
        assert_eq!(ula.logical_colour(0b1000_0001, 1), 0);
        assert_eq!(ula.logical_colour(0b1000_0001, 7), 1);

        ula.write_register(0, 0x40);
        assert_eq!(ula.bits_per_pixel(), 2);
        assert_eq!(ula.logical_colour(0b1000_1000, 0), 3);
        assert_eq!(ula.logical_colour(0b0000_1000, 0), 1);
        assert_eq!(ula.logical_colour(0b1000_0000, 0), 2);
        assert_eq!(ula.logical_colour(0b0001_0000, 3), 2);

        ula.write_register(0, 0x60);
        assert_eq!(ula.logical_colour(0b1010_1010, 0), 15);
        assert_eq!(ula.logical_colour(0b1010_1010, 1), 0);
        assert_eq!(ula.logical_colour(0b0000_0010, 0), 1);
        assert_eq!(ula.logical_colour(0b1000_0000, 0), 8);
        assert_eq!(ula.logical_colour(0b0000_0001, 1), 1);
    }

    #[test]
    fn observable_paths() {
        let mut ula = VideoUla::new();
        ula.write_register(1, 0x27);
        assert_eq!(ula.query("palette.2"), Some(Value::U8(0)));
        assert_eq!(ula.query("palette.16"), None);
        assert_eq!(ula.query("chars_per_line"), Some(Value::U8(10)));
    }
}
