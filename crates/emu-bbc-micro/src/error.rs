use std::io;
use std::path::PathBuf;

use emu_core::MemoryError;
use mos_6502::CpuError;
use thiserror::Error;

/// Everything that can stop the machine from being built or from running.
#[derive(Debug, Error)]
pub enum MachineError {
    #[error(transparent)]
    Cpu(#[from] CpuError),

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error("cannot read {}: {source}", path.display())]
    Rom { path: PathBuf, source: io::Error },

    /// The OS ROM must fill its 16 KiB window; sideways ROMs must fit in it.
    #[error("{what} ROM image is {len} bytes, window is 16384")]
    RomSize { what: String, len: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("cannot access {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// State can only be restored between instructions.
    #[error("CPU is mid-instruction at PC ${pc:04X}")]
    NotQuiescent { pc: u16 },
}
