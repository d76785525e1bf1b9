/// Architectural CPU state at an instruction boundary.
///
/// Micro-op state is deliberately absent: snapshots are only taken when the
/// queue is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CpuSnapshot {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub s: u8,
    pub pc: u16,
    pub p: u8,
    pub in_isr: bool,
    pub nmi_pending: bool,
    /// NMI input level, so a line held high across a restore is not seen
    /// as a new edge.
    #[cfg_attr(feature = "serde", serde(default))]
    pub nmi_line: bool,
    pub halted: bool,
    pub cycles: u64,
}
