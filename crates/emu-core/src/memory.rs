//! Addressable byte storage and first-match address decoding.

use thiserror::Error;

/// Failure of a single bus access.
///
/// All of these indicate a broken address map or a region being used
/// outside its declared range. The CPU aborts the run rather than invent a
/// value for the guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// No region claims the address.
    #[error("cannot access address ${address:04X}: no region claims it")]
    Unmapped { address: u16 },

    /// A write reached a read-only region.
    #[error("write of ${value:02X} to read-only address ${address:04X}")]
    ReadOnly { address: u16, value: u8 },

    /// A region was asked for an address it does not own.
    #[error("address ${address:04X} is outside region ${start:04X}+{len:#X}")]
    OutOfRange { address: u16, start: u16, len: usize },
}

/// Something the CPU can address.
///
/// `has_address`, `read_byte` and `write_byte` are the whole capability.
/// Word accesses are two independent little-endian byte accesses, exactly as
/// the 6502 performs them on the bus.
pub trait Memory {
    /// Returns true if this region decodes `address`.
    fn has_address(&self, address: u16) -> bool;

    /// Read one byte.
    fn read_byte(&mut self, address: u16) -> Result<u8, MemoryError>;

    /// Write one byte.
    fn write_byte(&mut self, address: u16, value: u8) -> Result<(), MemoryError>;

    /// Read a little-endian word. The high byte address wraps at $FFFF.
    fn read_word(&mut self, address: u16) -> Result<u16, MemoryError> {
        let lo = self.read_byte(address)?;
        let hi = self.read_byte(address.wrapping_add(1))?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    /// Write a little-endian word, low byte first.
    fn write_word(&mut self, address: u16, value: u16) -> Result<(), MemoryError> {
        let [lo, hi] = value.to_le_bytes();
        self.write_byte(address, lo)?;
        self.write_byte(address.wrapping_add(1), hi)
    }
}

impl<M: Memory + ?Sized> Memory for Box<M> {
    fn has_address(&self, address: u16) -> bool {
        (**self).has_address(address)
    }

    fn read_byte(&mut self, address: u16) -> Result<u8, MemoryError> {
        (**self).read_byte(address)
    }

    fn write_byte(&mut self, address: u16, value: u8) -> Result<(), MemoryError> {
        (**self).write_byte(address, value)
    }
}

/// An ordered list of regions; every access goes to the first region that
/// claims the address.
///
/// Order is the decoding priority. Device windows are pushed ahead of the
/// RAM or ROM they shadow.
#[derive(Debug)]
pub struct CompoundMemory<R = Box<dyn Memory>> {
    regions: Vec<R>,
}

impl<R> Default for CompoundMemory<R> {
    fn default() -> Self {
        Self {
            regions: Vec::new(),
        }
    }
}

impl<R: Memory> CompoundMemory<R> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_regions(regions: Vec<R>) -> Self {
        Self { regions }
    }

    /// Append a region at the lowest priority so far. Returns its index.
    pub fn push(&mut self, region: R) -> usize {
        self.regions.push(region);
        self.regions.len() - 1
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn regions(&self) -> impl Iterator<Item = &R> {
        self.regions.iter()
    }

    pub fn regions_mut(&mut self) -> impl Iterator<Item = &mut R> {
        self.regions.iter_mut()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&R> {
        self.regions.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut R> {
        self.regions.get_mut(index)
    }

    /// Index of the region that decodes `address`.
    pub fn region_index(&self, address: u16) -> Result<usize, MemoryError> {
        self.regions
            .iter()
            .position(|r| r.has_address(address))
            .ok_or(MemoryError::Unmapped { address })
    }

    fn region_for(&mut self, address: u16) -> Result<&mut R, MemoryError> {
        let index = self.region_index(address)?;
        Ok(&mut self.regions[index])
    }
}

impl<R: Memory> Memory for CompoundMemory<R> {
    fn has_address(&self, address: u16) -> bool {
        self.regions.iter().any(|r| r.has_address(address))
    }

    fn read_byte(&mut self, address: u16) -> Result<u8, MemoryError> {
        self.region_for(address)?.read_byte(address)
    }

    fn write_byte(&mut self, address: u16, value: u8) -> Result<(), MemoryError> {
        self.region_for(address)?.write_byte(address, value)
    }
}
