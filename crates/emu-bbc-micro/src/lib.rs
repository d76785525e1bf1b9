//! BBC Micro Model B.
//!
//! The machine runs on a 2 MHz master clock: the 6502 and the CRTC tick
//! every cycle, the two VIAs every other cycle. Devices sit on the bus
//! through register windows in SHEILA (&FE00-&FEFF); everything else is
//! 32K of RAM, a 16K paged ROM window at &8000 and the 16K MOS at &C000.
//!
//! Rendering, sound, disc and keyboard translation are left to the
//! front end; this crate exposes the device state they would read.

pub mod bus;
pub mod config;
pub mod devices;
mod error;
mod machine;
mod snapshot;

pub use bus::{BbcBus, Region, Signal};
pub use config::{BbcConfig, SidewaysRom};
pub use devices::{RomSelect, Sheila, SystemVia, VideoUla};
pub use error::MachineError;
pub use machine::{BbcMicro, BbcMicroBuilder};
pub use snapshot::MachineSnapshot;
