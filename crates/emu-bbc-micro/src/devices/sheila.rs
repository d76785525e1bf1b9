use emu_core::MemoryMappedDevice;

/// Catch-all for the unpopulated parts of SHEILA (&FE00-&FEFF): the
/// serial ULA, ADC, Econet, disc and tube addresses. Reads return zero and
/// writes are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sheila;

impl MemoryMappedDevice for Sheila {
    fn read_register(&mut self, index: u8) -> u8 {
        log::trace!("unpopulated SHEILA read &FE{index:02X}");
        0
    }

    fn write_register(&mut self, index: u8, value: u8) {
        log::trace!("unpopulated SHEILA write &FE{index:02X} <- &{value:02X}");
    }
}
