use emu_core::MemoryMappedDevice;

/// The paged ROM select latch at SHEILA &30 (IC20).
///
/// Write-only. The low four bits pick the sideways bank; the machine picks
/// up the change after the tick and switches the paged ROM region.
#[derive(Debug, Clone, Default)]
pub struct RomSelect {
    bank: u8,
    pending: Option<u8>,
}

impl RomSelect {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last bank written.
    #[must_use]
    pub fn bank(&self) -> u8 {
        self.bank
    }

    /// A bank written since the last call, if any.
    pub fn take_bank(&mut self) -> Option<u8> {
        self.pending.take()
    }

    /// Set the latch without signalling a switch, for snapshot restore.
    pub fn restore(&mut self, bank: u8) {
        self.bank = bank & 0x0F;
        self.pending = None;
    }
}

impl MemoryMappedDevice for RomSelect {
    fn read_register(&mut self, _index: u8) -> u8 {
        0
    }

    fn write_register(&mut self, _index: u8, value: u8) {
        self.bank = value & 0x0F;
        self.pending = Some(self.bank);
    }
}
