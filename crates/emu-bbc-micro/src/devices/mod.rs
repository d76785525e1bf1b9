//! Model B peripherals that live only in this machine.

mod rom_select;
mod sheila;
mod system_via;
mod video_ula;

pub use rom_select::RomSelect;
pub use sheila::Sheila;
pub use system_via::{KEY_COLUMNS, SystemVia, SystemViaSnapshot};
pub use video_ula::{VideoUla, VideoUlaSnapshot};
