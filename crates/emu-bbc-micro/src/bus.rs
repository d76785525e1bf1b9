//! Model B address map.
//!
//! Regions are decoded first match wins, so the SHEILA devices come ahead
//! of the catch-all that covers the rest of &FE00-&FEFF, and SHEILA comes
//! ahead of the OS ROM it shadows.
//!
//! | Region        | Start  | Size  |
//! |---------------|--------|-------|
//! | CRTC          | &FE00  | 8     |
//! | Video ULA     | &FE20  | 16    |
//! | ROM select    | &FE30  | 16    |
//! | System VIA    | &FE40  | 32    |
//! | User VIA      | &FE60  | 32    |
//! | SHEILA        | &FE00  | 256   |
//! | RAM           | &0000  | 32K   |
//! | Paged ROM     | &8000  | 16K   |
//! | OS ROM        | &C000  | 16K   |

use emu_core::{
    CompoundMemory, InterruptSource, Mapped, Memory, MemoryError, PagedRom, Ram, RegisterWindow,
    Rom,
};
use mos_via_6522::Via6522;
use motorola_6845::Crtc6845;

use crate::devices::{RomSelect, Sheila, SystemVia, VideoUla};

pub const SHEILA: u16 = 0xFE00;
pub const CRTC_WINDOW: RegisterWindow = RegisterWindow::new(SHEILA, 8);
pub const VIDEO_ULA_WINDOW: RegisterWindow = RegisterWindow::new(SHEILA + 0x20, 16);
pub const ROM_SELECT_WINDOW: RegisterWindow = RegisterWindow::new(SHEILA + 0x30, 16);
pub const SYSTEM_VIA_WINDOW: RegisterWindow = RegisterWindow::new(SHEILA + 0x40, 32).mirrored(0x0F);
pub const USER_VIA_WINDOW: RegisterWindow = RegisterWindow::new(SHEILA + 0x60, 32).mirrored(0x0F);
pub const SHEILA_WINDOW: RegisterWindow = RegisterWindow::new(SHEILA, 256);

pub const PAGED_ROM_START: u16 = 0x8000;
pub const OS_ROM_START: u16 = 0xC000;
/// Size of the paged and OS ROM windows.
pub const ROM_SIZE: usize = 0x4000;

/// The Model B bus.
pub type BbcBus = CompoundMemory<Region>;

/// Something a device raised during its tick, for another device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// CRTC vertical sync changed to this level.
    Vsync(bool),
    /// ROM select latch written.
    RomBank(u8),
}

/// One entry in the address map.
#[derive(Debug, Clone)]
pub enum Region {
    Crtc(Mapped<Crtc6845>),
    VideoUla(Mapped<VideoUla>),
    RomSelect(Mapped<RomSelect>),
    SystemVia(Mapped<SystemVia>),
    UserVia(Mapped<Via6522>),
    Sheila(Mapped<Sheila>),
    Ram(Ram),
    PagedRom(PagedRom),
    Rom(Rom),
}

impl Region {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Crtc(_) => "crtc",
            Self::VideoUla(_) => "ula",
            Self::RomSelect(_) => "romsel",
            Self::SystemVia(_) => "sysvia",
            Self::UserVia(_) => "uservia",
            Self::Sheila(_) => "sheila",
            Self::Ram(_) => "ram",
            Self::PagedRom(_) => "paged_rom",
            Self::Rom(_) => "os_rom",
        }
    }

    /// Advance one 2 MHz cycle. The VIAs only count on `one_mhz` cycles.
    pub(crate) fn tick(&mut self, one_mhz: bool, signals: &mut Vec<Signal>) {
        match self {
            Self::Crtc(crtc) => {
                if let Some(edge) = crtc.device_mut().tick() {
                    signals.push(Signal::Vsync(edge.level()));
                }
            }
            Self::SystemVia(via) if one_mhz => via.device_mut().tick(),
            Self::UserVia(via) if one_mhz => via.device_mut().tick(),
            Self::RomSelect(latch) => {
                if let Some(bank) = latch.device_mut().take_bank() {
                    signals.push(Signal::RomBank(bank));
                }
            }
            _ => {}
        }
    }

    /// Apply a signal raised elsewhere. Regions it does not concern ignore it.
    pub(crate) fn deliver(&mut self, signal: Signal) {
        match (self, signal) {
            (Self::SystemVia(via), Signal::Vsync(level)) => via.device_mut().set_vsync(level),
            (Self::PagedRom(rom), Signal::RomBank(bank)) => rom.select(bank),
            _ => {}
        }
    }

    /// The interrupt outputs of this region, if it has any.
    #[must_use]
    pub fn interrupt_source(&self) -> Option<&dyn InterruptSource> {
        let source: &dyn InterruptSource = match self {
            Self::Crtc(crtc) => crtc.device(),
            Self::VideoUla(ula) => ula.device(),
            Self::SystemVia(via) => via.device(),
            Self::UserVia(via) => via.device(),
            _ => return None,
        };
        Some(source)
    }

    fn memory(&self) -> &dyn Memory {
        match self {
            Self::Crtc(m) => m,
            Self::VideoUla(m) => m,
            Self::RomSelect(m) => m,
            Self::SystemVia(m) => m,
            Self::UserVia(m) => m,
            Self::Sheila(m) => m,
            Self::Ram(m) => m,
            Self::PagedRom(m) => m,
            Self::Rom(m) => m,
        }
    }

    fn memory_mut(&mut self) -> &mut dyn Memory {
        match self {
            Self::Crtc(m) => m,
            Self::VideoUla(m) => m,
            Self::RomSelect(m) => m,
            Self::SystemVia(m) => m,
            Self::UserVia(m) => m,
            Self::Sheila(m) => m,
            Self::Ram(m) => m,
            Self::PagedRom(m) => m,
            Self::Rom(m) => m,
        }
    }
}

impl Memory for Region {
    fn has_address(&self, address: u16) -> bool {
        self.memory().has_address(address)
    }

    fn read_byte(&mut self, address: u16) -> Result<u8, MemoryError> {
        self.memory_mut().read_byte(address)
    }

    fn write_byte(&mut self, address: u16, value: u8) -> Result<(), MemoryError> {
        self.memory_mut().write_byte(address, value)
    }
}

/// Lay out the Model B map in decode order.
#[must_use]
pub fn model_b(ram_size: usize, paged: PagedRom, os: Rom) -> BbcBus {
    CompoundMemory::from_regions(vec![
        Region::Crtc(Mapped::new(CRTC_WINDOW, Crtc6845::new())),
        Region::VideoUla(Mapped::new(VIDEO_ULA_WINDOW, VideoUla::new())),
        Region::RomSelect(Mapped::new(ROM_SELECT_WINDOW, RomSelect::new())),
        Region::SystemVia(Mapped::new(SYSTEM_VIA_WINDOW, SystemVia::new())),
        Region::UserVia(Mapped::new(USER_VIA_WINDOW, Via6522::new())),
        Region::Sheila(Mapped::new(SHEILA_WINDOW, Sheila)),
        Region::Ram(Ram::new(0x0000, ram_size)),
        Region::PagedRom(paged),
        Region::Rom(os),
    ])
}
