//! Register-window peripherals.

use crate::{Memory, MemoryError};

/// A peripheral addressed through a small bank of registers.
///
/// The device sees register indices, never bus addresses; [`Mapped`] does the
/// translation. Reads take `&mut self` because reading a register can have
/// side effects (clearing an interrupt flag, for instance).
pub trait MemoryMappedDevice {
    fn read_register(&mut self, index: u8) -> u8;
    fn write_register(&mut self, index: u8, value: u8);
}

/// Where a device sits in the address space and how addresses fold onto its
/// registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterWindow {
    start: u16,
    size: u16,
    mask: u8,
}

impl RegisterWindow {
    /// A window of `size` bytes (1..=256) at `start`. Every byte maps to its
    /// own register index until narrowed with [`Self::mirrored`].
    #[must_use]
    pub const fn new(start: u16, size: u16) -> Self {
        let mask = if size == 0 || size > 0x100 {
            0xFF
        } else {
            (size - 1) as u8
        };
        Self { start, size, mask }
    }

    /// Fold the window onto fewer registers: index = offset & `mask`.
    #[must_use]
    pub const fn mirrored(self, mask: u8) -> Self {
        Self { mask, ..self }
    }

    #[must_use]
    pub const fn start(&self) -> u16 {
        self.start
    }

    #[must_use]
    pub const fn size(&self) -> u16 {
        self.size
    }

    #[must_use]
    pub fn contains(&self, address: u16) -> bool {
        address >= self.start && u32::from(address) < u32::from(self.start) + u32::from(self.size)
    }

    /// Register index for `address`, or `None` outside the window.
    #[must_use]
    pub fn index(&self, address: u16) -> Option<u8> {
        self.contains(address)
            .then(|| (address.wrapping_sub(self.start) & 0xFF) as u8 & self.mask)
    }
}

/// A device placed on the bus through a [`RegisterWindow`].
#[derive(Debug, Clone)]
pub struct Mapped<D> {
    window: RegisterWindow,
    device: D,
}

impl<D: MemoryMappedDevice> Mapped<D> {
    pub fn new(window: RegisterWindow, device: D) -> Self {
        Self { window, device }
    }

    pub fn window(&self) -> RegisterWindow {
        self.window
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    fn index(&self, address: u16) -> Result<u8, MemoryError> {
        self.window.index(address).ok_or(MemoryError::OutOfRange {
            address,
            start: self.window.start,
            len: usize::from(self.window.size),
        })
    }
}

impl<D: MemoryMappedDevice> Memory for Mapped<D> {
    fn has_address(&self, address: u16) -> bool {
        self.window.contains(address)
    }

    fn read_byte(&mut self, address: u16) -> Result<u8, MemoryError> {
        let index = self.index(address)?;
        let value = self.device.read_register(index);
        log::trace!("device read ${address:04X} (r{index}) = ${value:02X}");
        Ok(value)
    }

    fn write_byte(&mut self, address: u16, value: u8) -> Result<(), MemoryError> {
        let index = self.index(address)?;
        log::trace!("device write ${address:04X} (r{index}) <- ${value:02X}");
        self.device.write_register(index, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Latch {
        regs: [u8; 4],
        reads: usize,
    }

    impl MemoryMappedDevice for Latch {
        fn read_register(&mut self, index: u8) -> u8 {
            self.reads += 1;
            self.regs[usize::from(index)]
        }

        fn write_register(&mut self, index: u8, value: u8) {
            self.regs[usize::from(index)] = value;
        }
    }

    #[test]
    fn window_bounds() {
        let window = RegisterWindow::new(0xFE40, 0x20);
        assert!(window.contains(0xFE40));
        assert!(window.contains(0xFE5F));
        assert!(!window.contains(0xFE60));
        assert!(!window.contains(0xFE3F));
        assert_eq!(window.index(0xFE5F), Some(0x1F));
        assert_eq!(window.index(0xFE60), None);
    }

    #[test]
    fn window_at_top_of_memory() {
        let window = RegisterWindow::new(0xFF00, 0x100);
        assert!(window.contains(0xFFFF));
        assert_eq!(window.index(0xFFFF), Some(0xFF));
    }

    #[test]
    fn mirrored_window_folds_addresses() {
        let mut mapped = Mapped::new(RegisterWindow::new(0xFE00, 0x10).mirrored(0x03), Latch::default());
        mapped.write_byte(0xFE01, 0x77).unwrap();
        assert_eq!(mapped.read_byte(0xFE05).unwrap(), 0x77);
        assert_eq!(mapped.read_byte(0xFE0D).unwrap(), 0x77);
        assert_eq!(mapped.device().reads, 2);
    }

    #[test]
    fn access_outside_window_is_rejected() {
        let mut mapped = Mapped::new(RegisterWindow::new(0xFE00, 4), Latch::default());
        assert!(mapped.read_byte(0xFE04).is_err());
        assert_eq!(mapped.device().reads, 0);
    }
}
