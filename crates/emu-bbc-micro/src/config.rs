//! Machine configuration: ROM images, clock speed and CPU policy.
//!
//! Every field has a default, so a JSON file only needs the fields it
//! changes:
//!
//! ```json
//! {
//!   "os_rom": "roms/os12.rom",
//!   "sideways_roms": [{ "slot": 15, "path": "roms/basic2.rom" }],
//!   "speed": "mhz2",
//!   "max_cycles": 20000000
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use emu_core::ClockSpeed;
use mos_6502::StackPolicy;
use serde::{Deserialize, Serialize};

use crate::MachineError;

/// Paged ROM banks, numbered 0-15. Higher slots have priority in the MOS
/// ROM scan; BASIC normally sits in 15.
pub const SIDEWAYS_SLOTS: u8 = 16;

/// Model B RAM.
pub const DEFAULT_RAM_SIZE: usize = 0x8000;

/// A sideways ROM image and the bank it is plugged into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidewaysRom {
    pub slot: u8,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BbcConfig {
    /// 16 KiB MOS image mapped at &C000.
    pub os_rom: Option<PathBuf>,
    pub sideways_roms: Vec<SidewaysRom>,
    pub speed: ClockSpeed,
    /// Stop after this many 2 MHz cycles.
    pub max_cycles: Option<u64>,
    pub stack_policy: StackPolicy,
    /// Bytes of RAM from &0000, at most 32 KiB.
    pub ram_size: usize,
}

impl Default for BbcConfig {
    fn default() -> Self {
        Self {
            os_rom: None,
            sideways_roms: Vec::new(),
            speed: ClockSpeed::Mhz2,
            max_cycles: None,
            stack_policy: StackPolicy::Wrap,
            ram_size: DEFAULT_RAM_SIZE,
        }
    }
}

impl BbcConfig {
    pub fn from_json_str(json: &str) -> Result<Self, MachineError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, MachineError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| MachineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Check slot numbers and the RAM size.
    pub fn validate(&self) -> Result<(), MachineError> {
        if self.ram_size == 0 || self.ram_size > DEFAULT_RAM_SIZE {
            return Err(MachineError::Config(format!(
                "RAM size {} is outside 1..={DEFAULT_RAM_SIZE}",
                self.ram_size
            )));
        }
        if let Some(rom) = self.sideways_roms.iter().find(|rom| rom.slot >= SIDEWAYS_SLOTS) {
            return Err(MachineError::Config(format!(
                "sideways slot {} for {} (slots are 0-15)",
                rom.slot,
                rom.path.display()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = BbcConfig::from_json_str(r#"{ "os_rom": "os12.rom" }"#).unwrap();
        assert_eq!(config.os_rom, Some(PathBuf::from("os12.rom")));
        assert_eq!(config.speed, ClockSpeed::Mhz2);
        assert_eq!(config.stack_policy, StackPolicy::Wrap);
        assert_eq!(config.ram_size, DEFAULT_RAM_SIZE);
        assert!(config.sideways_roms.is_empty());
    }

    #[test]
    fn full_config() {
        let json = r#"{
            "os_rom": "os12.rom",
            "sideways_roms": [{ "slot": 15, "path": "basic2.rom" }],
            "speed": "max",
            "max_cycles": 1000,
            "stack_policy": "strict",
            "ram_size": 16384
        }"#;
        let config = BbcConfig::from_json_str(json).unwrap();
        assert_eq!(config.sideways_roms[0].slot, 15);
        assert_eq!(config.speed, ClockSpeed::Max);
        assert_eq!(config.max_cycles, Some(1000));
        assert_eq!(config.stack_policy, StackPolicy::Strict);
        assert_eq!(config.ram_size, 0x4000);
    }

    #[test]
    fn custom_speed_round_trips() {
        let config = BbcConfig {
            speed: ClockSpeed::Custom(3_000_000),
            ..BbcConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(BbcConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn bad_slot_is_rejected() {
        let json = r#"{ "sideways_roms": [{ "slot": 16, "path": "x.rom" }] }"#;
        assert!(matches!(
            BbcConfig::from_json_str(json),
            Err(MachineError::Config(_))
        ));
    }

    #[test]
    fn bad_ram_size_is_rejected() {
        assert!(matches!(
            BbcConfig::from_json_str(r#"{ "ram_size": 65536 }"#),
            Err(MachineError::Config(_))
        ));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            BbcConfig::from_json_str("{ os_rom"),
            Err(MachineError::Json(_))
        ));
    }
}
