//! Motorola 6845 CRT Controller.
//!
//! The CRTC is programmed through two addresses: an address register that
//! selects one of eighteen internal registers, and a data register that
//! reads or writes the selected one. Raster generation is not modelled;
//! the controller produces the 50 Hz vertical sync pulse and the cursor
//! blink phase that the rest of the machine depends on.
//!
//! # Registers
//!
//! | Reg | Function                       | Access |
//! |-----|--------------------------------|--------|
//! | R0  | Horizontal total               | W      |
//! | R1  | Horizontal displayed           | W      |
//! | R2  | Horizontal sync position       | W      |
//! | R3  | Sync widths                    | W      |
//! | R4  | Vertical total                 | W      |
//! | R5  | Vertical total adjust          | W      |
//! | R6  | Vertical displayed             | W      |
//! | R7  | Vertical sync position         | W      |
//! | R8  | Interlace and skew             | W      |
//! | R9  | Scan lines per character - 1   | W      |
//! | R10 | Cursor start and blink mode    | W      |
//! | R11 | Cursor end                     | W      |
//! | R12 | Screen start high              | W      |
//! | R13 | Screen start low               | W      |
//! | R14 | Cursor address high            | R/W    |
//! | R15 | Cursor address low             | R/W    |
//! | R16 | Light pen high                 | R      |
//! | R17 | Light pen low                  | R      |

use emu_core::{InterruptSource, MemoryMappedDevice, Observable, Value};

/// Number of internal registers.
pub const REGISTER_COUNT: usize = 18;

/// 2 MHz cycles per frame at 50 Hz.
pub const VSYNC_PERIOD: u64 = 40_000;
/// 2 MHz cycles the vsync line stays high.
pub const VSYNC_PULSE: u64 = 500;

const FAST_BLINK_FRAMES: u64 = 8;
const SLOW_BLINK_FRAMES: u64 = 16;

/// A change on the vertical sync output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VsyncEdge {
    Rising,
    Falling,
}

impl VsyncEdge {
    /// Line level after the edge.
    #[must_use]
    pub const fn level(self) -> bool {
        matches!(self, Self::Rising)
    }
}

/// Complete CRTC state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CrtcSnapshot {
    pub address: u8,
    pub registers: [u8; REGISTER_COUNT],
    pub cycles: u64,
    pub frames: u64,
    pub vsync: bool,
    pub blink_phase: bool,
}

/// Motorola 6845 CRT Controller.
#[derive(Debug, Clone, Default)]
pub struct Crtc6845 {
    /// Selected register (the address register, five bits wide).
    address: u8,
    registers: [u8; REGISTER_COUNT],
    cycles: u64,
    frames: u64,
    vsync: bool,
    blink_phase: bool,
}

impl Crtc6845 {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance one 2 MHz cycle. Returns the vsync edge, if any.
    pub fn tick(&mut self) -> Option<VsyncEdge> {
        let phase = self.cycles % VSYNC_PERIOD;
        self.cycles += 1;

        if phase == 0 && !self.vsync {
            self.vsync = true;
            self.frames += 1;
            let blink_frames = if self.is_cursor_fast_blink() {
                FAST_BLINK_FRAMES
            } else {
                SLOW_BLINK_FRAMES
            };
            if self.frames % blink_frames == 0 {
                self.blink_phase = !self.blink_phase;
            }
            log::debug!("CRTC vsync rising (frame {})", self.frames);
            Some(VsyncEdge::Rising)
        } else if phase == VSYNC_PULSE && self.vsync {
            self.vsync = false;
            log::debug!("CRTC vsync falling");
            Some(VsyncEdge::Falling)
        } else {
            None
        }
    }

    /// Register value, ignoring access restrictions. `None` past R17.
    #[must_use]
    pub fn register(&self, index: usize) -> Option<u8> {
        self.registers.get(index).copied()
    }

    #[must_use]
    pub fn selected_register(&self) -> u8 {
        self.address
    }

    #[must_use]
    pub fn vsync(&self) -> bool {
        self.vsync
    }

    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    // ------------------------------------------------------------------
    // Decoded registers
    // ------------------------------------------------------------------

    #[must_use]
    pub fn horizontal_total_chars(&self) -> u16 {
        u16::from(self.registers[0]) + 1
    }

    #[must_use]
    pub fn horizontal_displayed_chars(&self) -> u8 {
        self.registers[1]
    }

    #[must_use]
    pub fn horizontal_sync_position(&self) -> u8 {
        self.registers[2]
    }

    #[must_use]
    pub fn vertical_total_chars(&self) -> u8 {
        (self.registers[4] & 0x7F) + 1
    }

    #[must_use]
    pub fn vertical_adjust(&self) -> u8 {
        self.registers[5] & 0x1F
    }

    #[must_use]
    pub fn vertical_displayed_chars(&self) -> u8 {
        self.registers[6] & 0x7F
    }

    #[must_use]
    pub fn vertical_sync_position(&self) -> u8 {
        self.registers[7] & 0x7F
    }

    #[must_use]
    pub fn scanlines_per_character(&self) -> u8 {
        (self.registers[9] & 0x1F) + 1
    }

    /// R12:R13.
    #[must_use]
    pub fn screen_start_address(&self) -> u16 {
        u16::from_be_bytes([self.registers[12] & 0x3F, self.registers[13]])
    }

    /// R14:R15.
    #[must_use]
    pub fn cursor_address(&self) -> u16 {
        u16::from_be_bytes([self.registers[14] & 0x3F, self.registers[15]])
    }

    /// R8 bits 6-7.
    #[must_use]
    pub fn cursor_blanking_delay(&self) -> u8 {
        (self.registers[8] >> 6) & 0x03
    }

    #[must_use]
    pub fn cursor_start_line(&self) -> u8 {
        self.registers[10] & 0x1F
    }

    #[must_use]
    pub fn cursor_end_line(&self) -> u8 {
        self.registers[11] & 0x1F
    }

    /// R10 bit 6.
    #[must_use]
    pub fn is_cursor_blink_enabled(&self) -> bool {
        self.registers[10] & 0x40 != 0
    }

    /// R10 bit 5 clear selects the fast (8-frame) blink.
    #[must_use]
    pub fn is_cursor_fast_blink(&self) -> bool {
        self.registers[10] & 0x20 == 0
    }

    #[must_use]
    pub fn is_cursor_enabled(&self) -> bool {
        let start = self.cursor_start_line();
        start > 0 && start < self.cursor_end_line()
    }

    /// Whether the cursor is currently visible in its blink cycle.
    #[must_use]
    pub fn is_cursor_on(&self) -> bool {
        !self.is_cursor_blink_enabled() || self.blink_phase
    }

    #[must_use]
    pub fn snapshot(&self) -> CrtcSnapshot {
        CrtcSnapshot {
            address: self.address,
            registers: self.registers,
            cycles: self.cycles,
            frames: self.frames,
            vsync: self.vsync,
            blink_phase: self.blink_phase,
        }
    }

    pub fn restore(&mut self, snapshot: &CrtcSnapshot) {
        self.address = snapshot.address & 0x1F;
        self.registers = snapshot.registers;
        self.cycles = snapshot.cycles;
        self.frames = snapshot.frames;
        self.vsync = snapshot.vsync;
        self.blink_phase = snapshot.blink_phase;
    }

    const fn is_read_only(index: usize) -> bool {
        matches!(index, 16 | 17)
    }

    const fn is_write_only(index: usize) -> bool {
        index <= 13
    }
}

impl MemoryMappedDevice for Crtc6845 {
    fn read_register(&mut self, index: u8) -> u8 {
        if index & 1 == 0 {
            return self.address;
        }
        let selected = usize::from(self.address);
        if Self::is_write_only(selected) {
            return 0;
        }
        self.registers.get(selected).copied().unwrap_or(0)
    }

    fn write_register(&mut self, index: u8, value: u8) {
        if index & 1 == 0 {
            self.address = value & 0x1F;
            return;
        }
        let selected = usize::from(self.address);
        if Self::is_read_only(selected) {
            return;
        }
        if let Some(register) = self.registers.get_mut(selected) {
            *register = value;
        }
    }
}

/// The CRTC never interrupts the CPU; vsync reaches the system VIA.
impl InterruptSource for Crtc6845 {}

const PATHS: &[&str] = &[
    "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11", "r12", "r13", "r14",
    "r15", "r16", "r17", "address", "vsync", "frames", "cursor_on", "cursor_enabled",
    "screen_start", "cursor_address",
];

impl Observable for Crtc6845 {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(index) = path.strip_prefix('r').and_then(|n| n.parse::<usize>().ok()) {
            return self.register(index).map(Value::from);
        }
        match path {
            "address" => Some(self.address.into()),
            "vsync" => Some(self.vsync.into()),
            "frames" => Some(self.frames.into()),
            "cursor_on" => Some(self.is_cursor_on().into()),
            "cursor_enabled" => Some(self.is_cursor_enabled().into()),
            "screen_start" => Some(self.screen_start_address().into()),
            "cursor_address" => Some(self.cursor_address().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        PATHS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(crtc: &mut Crtc6845, register: u8, value: u8) {
        crtc.write_register(0, register);
        crtc.write_register(1, value);
    }

    fn read(crtc: &mut Crtc6845, register: u8) -> u8 {
        crtc.write_register(0, register);
        crtc.read_register(1)
    }

    #[test]
    fn address_register_reads_back() {
        let mut crtc = Crtc6845::new();
        crtc.write_register(0, 0xEE);
        assert_eq!(crtc.read_register(0), 0x0E, "five-bit address");
        assert_eq!(crtc.read_register(6), 0x0E, "index & 1 decoding");
    }

    #[test]
    fn write_only_registers_read_zero() {
        let mut crtc = Crtc6845::new();
        for r in 0..=13 {
            write(&mut crtc, r, 0x55);
            assert_eq!(read(&mut crtc, r), 0, "R{r}");
            assert_eq!(crtc.register(usize::from(r)), Some(0x55));
        }
    }

    #[test]
    fn cursor_registers_read_back() {
        let mut crtc = Crtc6845::new();
        write(&mut crtc, 14, 0x12);
        write(&mut crtc, 15, 0x34);
        assert_eq!(read(&mut crtc, 14), 0x12);
        assert_eq!(read(&mut crtc, 15), 0x34);
        assert_eq!(crtc.cursor_address(), 0x1234);
    }

    #[test]
    fn light_pen_registers_ignore_writes() {
        let mut crtc = Crtc6845::new();
        write(&mut crtc, 16, 0xAA);
        write(&mut crtc, 17, 0xBB);
        assert_eq!(read(&mut crtc, 16), 0);
        assert_eq!(read(&mut crtc, 17), 0);
    }

    #[test]
    fn out_of_range_address() {
        let mut crtc = Crtc6845::new();
        write(&mut crtc, 20, 0x99);
        assert_eq!(read(&mut crtc, 20), 0);
        assert_eq!(crtc.register(20), None);
    }

    #[test]
    fn reads_have_no_side_effects() {
        let mut crtc = Crtc6845::new();
        write(&mut crtc, 14, 0x07);
        let before = crtc.snapshot();
        for _ in 0..3 {
            assert_eq!(crtc.read_register(1), 0x07);
            assert_eq!(crtc.read_register(0), 14);
        }
        assert_eq!(crtc.snapshot(), before);
    }

    #[test]
    fn vsync_timing() {
        let mut crtc = Crtc6845::new();
        assert_eq!(crtc.tick(), Some(VsyncEdge::Rising));
        for _ in 1..VSYNC_PULSE {
            assert_eq!(crtc.tick(), None);
        }
        assert_eq!(crtc.tick(), Some(VsyncEdge::Falling));
        for _ in VSYNC_PULSE + 1..VSYNC_PERIOD {
            assert_eq!(crtc.tick(), None);
        }
        assert_eq!(crtc.tick(), Some(VsyncEdge::Rising));
        assert_eq!(crtc.frames(), 2);
    }

    #[test]
    fn cursor_blink_rates() {
        let mut crtc = Crtc6845::new();
        write(&mut crtc, 10, 0x40); // blink, fast
        let mut toggles = 0;
        let mut last = crtc.is_cursor_on();
        for _ in 0..VSYNC_PERIOD * 16 {
            crtc.tick();
            if crtc.is_cursor_on() != last {
                toggles += 1;
                last = crtc.is_cursor_on();
            }
        }
        assert_eq!(toggles, 2, "fast blink toggles every 8 frames");

        write(&mut crtc, 10, 0x60); // blink, slow
        toggles = 0;
        for _ in 0..VSYNC_PERIOD * 32 {
            crtc.tick();
            if crtc.is_cursor_on() != last {
                toggles += 1;
                last = crtc.is_cursor_on();
            }
        }
        assert_eq!(toggles, 2, "slow blink toggles every 16 frames");
    }

    #[test]
    fn steady_cursor_is_always_on() {
        let mut crtc = Crtc6845::new();
        write(&mut crtc, 10, 0x05);
        write(&mut crtc, 11, 0x07);
        assert!(crtc.is_cursor_enabled());
        assert!(crtc.is_cursor_on());
        write(&mut crtc, 10, 0x00);
        assert!(!crtc.is_cursor_enabled(), "start line 0 disables");
    }

    #[test]
    fn never_interrupts() {
        let mut crtc = Crtc6845::new();
        for _ in 0..VSYNC_PERIOD {
            crtc.tick();
            assert!(!crtc.is_irq() && !crtc.is_nmi());
        }
    }

    #[test]
    fn observable_registers() {
        let mut crtc = Crtc6845::new();
        write(&mut crtc, 12, 0x06);
        write(&mut crtc, 13, 0x00);
        assert_eq!(crtc.query("r12"), Some(Value::U8(0x06)));
        assert_eq!(crtc.query("screen_start"), Some(Value::U16(0x0600)));
        assert_eq!(crtc.query("r18"), None);
        for path in crtc.query_paths() {
            assert!(crtc.query(path).is_some(), "{path}");
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn snapshot_json_round_trip() {
        let mut crtc = Crtc6845::new();
        write(&mut crtc, 1, 80);
        crtc.tick();
        let json = serde_json::to_string(&crtc.snapshot()).unwrap();
        let back: CrtcSnapshot = serde_json::from_str(&json).unwrap();
        let mut copy = Crtc6845::new();
        copy.restore(&back);
        assert_eq!(copy.snapshot(), crtc.snapshot());
    }
}
