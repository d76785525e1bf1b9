//! Plain storage regions: RAM, ROM and a bank-switched ROM window.

use std::io;
use std::path::Path;

use crate::{Memory, MemoryError};

/// Number of sideways banks a [`PagedRom`] window can select between.
pub const PAGED_ROM_SLOTS: usize = 16;

fn offset(start: u16, len: usize, address: u16) -> Option<usize> {
    let offset = usize::from(address.wrapping_sub(start));
    (address >= start && offset < len).then_some(offset)
}

/// Read/write storage decoding `start..start + len`.
#[derive(Debug, Clone)]
pub struct Ram {
    start: u16,
    data: Vec<u8>,
}

impl Ram {
    /// Zero-filled RAM. `len` may reach past $FFFF only as far as the
    /// address space does; anything beyond is never decoded.
    #[must_use]
    pub fn new(start: u16, len: usize) -> Self {
        Self {
            start,
            data: vec![0; len],
        }
    }

    #[must_use]
    pub fn start(&self) -> u16 {
        self.start
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Copy `bytes` in at `address`. Fails if any byte falls outside.
    pub fn load(&mut self, address: u16, bytes: &[u8]) -> Result<(), MemoryError> {
        let start = offset(self.start, self.data.len(), address).ok_or(self.out_of_range(address))?;
        let end = start + bytes.len();
        if end > self.data.len() {
            let last = address.wrapping_add(u16::try_from(bytes.len() - 1).unwrap_or(u16::MAX));
            return Err(self.out_of_range(last));
        }
        self.data[start..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Replace the whole contents. The image must be exactly the region size.
    pub fn restore(&mut self, bytes: &[u8]) -> Result<(), MemoryError> {
        if bytes.len() != self.data.len() {
            let past_end = self.start.wrapping_add(u16::try_from(bytes.len()).unwrap_or(u16::MAX));
            return Err(self.out_of_range(past_end));
        }
        self.data.copy_from_slice(bytes);
        Ok(())
    }

    fn out_of_range(&self, address: u16) -> MemoryError {
        MemoryError::OutOfRange {
            address,
            start: self.start,
            len: self.data.len(),
        }
    }
}

impl Memory for Ram {
    fn has_address(&self, address: u16) -> bool {
        offset(self.start, self.data.len(), address).is_some()
    }

    fn read_byte(&mut self, address: u16) -> Result<u8, MemoryError> {
        let i = offset(self.start, self.data.len(), address).ok_or(self.out_of_range(address))?;
        Ok(self.data[i])
    }

    fn write_byte(&mut self, address: u16, value: u8) -> Result<(), MemoryError> {
        let i = offset(self.start, self.data.len(), address).ok_or(self.out_of_range(address))?;
        self.data[i] = value;
        Ok(())
    }
}

/// Read-only storage. Writes are rejected with [`MemoryError::ReadOnly`].
#[derive(Debug, Clone)]
pub struct Rom {
    start: u16,
    data: Vec<u8>,
}

impl Rom {
    #[must_use]
    pub fn new(start: u16, data: Vec<u8>) -> Self {
        Self { start, data }
    }

    /// Load an image from disk. The region is exactly as long as the file.
    pub fn from_file(start: u16, path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(start, std::fs::read(path)?))
    }

    #[must_use]
    pub fn start(&self) -> u16 {
        self.start
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Memory for Rom {
    fn has_address(&self, address: u16) -> bool {
        offset(self.start, self.data.len(), address).is_some()
    }

    fn read_byte(&mut self, address: u16) -> Result<u8, MemoryError> {
        offset(self.start, self.data.len(), address)
            .map(|i| self.data[i])
            .ok_or(MemoryError::OutOfRange {
                address,
                start: self.start,
                len: self.data.len(),
            })
    }

    fn write_byte(&mut self, address: u16, value: u8) -> Result<(), MemoryError> {
        log::warn!("ROM write ignored: ${value:02X} -> ${address:04X}");
        Err(MemoryError::ReadOnly { address, value })
    }
}

/// A fixed window onto one of [`PAGED_ROM_SLOTS`] ROM banks.
///
/// Writes are ignored: on the BBC Micro, code routinely writes into the
/// sideways area. An empty slot reads as zero, as does any address past the
/// end of a short image.
#[derive(Debug, Clone)]
pub struct PagedRom {
    start: u16,
    len: usize,
    banks: [Option<Vec<u8>>; PAGED_ROM_SLOTS],
    selected: u8,
}

impl PagedRom {
    #[must_use]
    pub fn new(start: u16, len: usize) -> Self {
        Self {
            start,
            len,
            banks: Default::default(),
            selected: 0,
        }
    }

    /// Install an image in `slot` (masked to the slot count), replacing
    /// whatever was there. Images longer than the window are rejected.
    pub fn insert(&mut self, slot: u8, image: Vec<u8>) -> Result<Option<Vec<u8>>, MemoryError> {
        if image.len() > self.len {
            return Err(MemoryError::OutOfRange {
                address: self.start.wrapping_add(u16::try_from(self.len).unwrap_or(u16::MAX)),
                start: self.start,
                len: self.len,
            });
        }
        Ok(self.banks[Self::slot_index(slot)].replace(image))
    }

    #[must_use]
    pub fn is_occupied(&self, slot: u8) -> bool {
        self.banks[Self::slot_index(slot)].is_some()
    }

    /// Select the bank the window shows. Only the low four bits count.
    pub fn select(&mut self, bank: u8) {
        let bank = bank & 0x0F;
        if bank != self.selected {
            log::debug!("paged ROM bank {} -> {bank}", self.selected);
        }
        self.selected = bank;
    }

    #[must_use]
    pub fn selected(&self) -> u8 {
        self.selected
    }

    fn slot_index(slot: u8) -> usize {
        usize::from(slot) % PAGED_ROM_SLOTS
    }
}

impl Memory for PagedRom {
    fn has_address(&self, address: u16) -> bool {
        offset(self.start, self.len, address).is_some()
    }

    fn read_byte(&mut self, address: u16) -> Result<u8, MemoryError> {
        let i = offset(self.start, self.len, address).ok_or(MemoryError::OutOfRange {
            address,
            start: self.start,
            len: self.len,
        })?;
        Ok(self.banks[usize::from(self.selected)]
            .as_ref()
            .and_then(|image| image.get(i).copied())
            .unwrap_or(0))
    }

    fn write_byte(&mut self, address: u16, value: u8) -> Result<(), MemoryError> {
        log::trace!("paged ROM write ignored: ${value:02X} -> ${address:04X}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ram_decodes_its_window_only() {
        let mut ram = Ram::new(0x1000, 0x100);
        assert!(ram.has_address(0x1000));
        assert!(ram.has_address(0x10FF));
        assert!(!ram.has_address(0x0FFF));
        assert!(!ram.has_address(0x1100));

        ram.write_byte(0x1080, 0x5A).unwrap();
        assert_eq!(ram.read_byte(0x1080).unwrap(), 0x5A);
        assert!(matches!(
            ram.read_byte(0x2000),
            Err(MemoryError::OutOfRange { address: 0x2000, .. })
        ));
    }

    #[test]
    fn ram_reaching_top_of_memory() {
        let mut ram = Ram::new(0xFF00, 0x100);
        assert!(ram.has_address(0xFFFF));
        ram.write_byte(0xFFFF, 1).unwrap();
        assert_eq!(ram.bytes()[0xFF], 1);
    }

    #[test]
    fn ram_load_checks_bounds() {
        let mut ram = Ram::new(0x0000, 0x10);
        ram.load(0x000E, &[1, 2]).unwrap();
        assert_eq!(ram.read_byte(0x000F).unwrap(), 2);
        assert!(ram.load(0x000F, &[1, 2]).is_err());
    }

    #[test]
    fn rom_rejects_writes() {
        let mut rom = Rom::new(0xC000, vec![0xAA; 0x4000]);
        assert_eq!(
            rom.write_byte(0xC000, 0x00),
            Err(MemoryError::ReadOnly {
                address: 0xC000,
                value: 0x00
            })
        );
        assert_eq!(rom.read_byte(0xC000).unwrap(), 0xAA);
        assert!(rom.has_address(0xFFFF));
    }

    #[test]
    fn paged_rom_follows_selected_bank() {
        let mut paged = PagedRom::new(0x8000, 0x4000);
        paged.insert(15, vec![0xBA; 0x4000]).unwrap();
        paged.insert(3, vec![0x03; 0x10]).unwrap();

        assert_eq!(paged.read_byte(0x8000).unwrap(), 0, "empty bank 0");

        paged.select(15);
        assert_eq!(paged.read_byte(0xBFFF).unwrap(), 0xBA);

        paged.select(0x13);
        assert_eq!(paged.selected(), 3, "only the low nibble selects");
        assert_eq!(paged.read_byte(0x8000).unwrap(), 0x03);
        assert_eq!(paged.read_byte(0x8010).unwrap(), 0, "past a short image");
    }

    #[test]
    fn paged_rom_ignores_writes() {
        let mut paged = PagedRom::new(0x8000, 0x4000);
        paged.insert(0, vec![0x11; 0x4000]).unwrap();
        paged.write_byte(0x8000, 0x99).unwrap();
        assert_eq!(paged.read_byte(0x8000).unwrap(), 0x11);
    }

    #[test]
    fn paged_rom_rejects_oversized_image() {
        let mut paged = PagedRom::new(0x8000, 0x10);
        assert!(paged.insert(0, vec![0; 0x11]).is_err());
        assert!(!paged.is_occupied(0));
    }
}
