//! Whole-machine state at an instruction boundary.

use std::fs;
use std::path::Path;

use mos_6502::CpuSnapshot;
use mos_via_6522::ViaSnapshot;
use motorola_6845::CrtcSnapshot;
use serde::{Deserialize, Serialize};

use crate::MachineError;
use crate::devices::{SystemViaSnapshot, VideoUlaSnapshot};

/// Everything needed to resume a machine: CPU registers, RAM and the
/// state of every chip. ROM images are not included; a snapshot is
/// restored onto a machine built with the same ROMs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineSnapshot {
    /// Machine cycles (2 MHz) since power on.
    pub cycles: u64,
    pub cpu: CpuSnapshot,
    pub ram: Vec<u8>,
    pub crtc: CrtcSnapshot,
    pub video_ula: VideoUlaSnapshot,
    pub system_via: SystemViaSnapshot,
    pub user_via: ViaSnapshot,
    pub rom_bank: u8,
}

impl MachineSnapshot {
    pub fn to_json(&self) -> Result<String, MachineError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, MachineError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), MachineError> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?).map_err(|source| MachineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("snapshot saved to {}", path.display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, MachineError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| MachineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}
