use emu_core::{InterruptSource, MemoryMappedDevice, Observable, Value};

use crate::register::{Register, irq};
use crate::timer::{Timer1, Timer2};
use crate::ViaSnapshot;

// ACR bits.
const ACR_PA_LATCH: u8 = 0x01;
const ACR_PB_LATCH: u8 = 0x02;
const ACR_T2_PULSES: u8 = 0x20;
const ACR_T1_FREE_RUN: u8 = 0x40;
const ACR_T1_PB7: u8 = 0x80;

// PCR bits.
const PCR_CA1_POSITIVE: u8 = 0x01;
const PCR_CB1_POSITIVE: u8 = 0x10;

/// CA2/CB2 configuration, from a three-bit PCR field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control2 {
    /// Input; `independent` keeps port accesses from clearing the flag.
    Input { positive: bool, independent: bool },
    /// Handshake or pulse output. Not driven.
    Handshake,
    /// Manual output at a fixed level.
    Manual(bool),
}

impl Control2 {
    const fn decode(bits: u8) -> Self {
        match bits & 0x07 {
            0 => Self::Input { positive: false, independent: false },
            1 => Self::Input { positive: false, independent: true },
            2 => Self::Input { positive: true, independent: false },
            3 => Self::Input { positive: true, independent: true },
            4 | 5 => Self::Handshake,
            6 => Self::Manual(false),
            _ => Self::Manual(true),
        }
    }

    const fn cleared_by_port_access(self) -> bool {
        !matches!(self, Self::Input { independent: true, .. })
    }
}

const fn edge(previous: bool, now: bool, positive: bool) -> bool {
    if positive { !previous && now } else { previous && !now }
}

/// MOS 6522 Versatile Interface Adapter.
///
/// Register access goes through [`MemoryMappedDevice`]; the control lines
/// and port pins are driven by whoever owns the VIA. The shift register
/// holds its value but does not shift.
#[derive(Debug, Clone)]
pub struct Via6522 {
    ora: u8,
    orb: u8,
    ddra: u8,
    ddrb: u8,
    /// Levels driven onto the port pins from outside.
    input_a: u8,
    input_b: u8,
    /// Input values captured on the CA1/CB1 active edge when latching.
    latch_a: u8,
    latch_b: u8,

    t1: Timer1,
    t2: Timer2,
    sr: u8,

    acr: u8,
    pcr: u8,
    ifr: u8,
    ier: u8,

    ca1: bool,
    ca2: bool,
    cb1: bool,
    cb2: bool,
}

impl Default for Via6522 {
    fn default() -> Self {
        Self::new()
    }
}

impl Via6522 {
    /// A VIA in its reset state, with the port pins pulled high.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ora: 0,
            orb: 0,
            ddra: 0,
            ddrb: 0,
            input_a: 0xFF,
            input_b: 0xFF,
            latch_a: 0xFF,
            latch_b: 0xFF,
            t1: Timer1::new(),
            t2: Timer2::new(),
            sr: 0,
            acr: 0,
            pcr: 0,
            ifr: 0,
            ier: 0,
            ca1: false,
            ca2: false,
            cb1: false,
            cb2: false,
        }
    }

    /// The /RES line: clears the port, control and interrupt registers.
    /// Timers and the shift register keep their contents.
    pub fn reset(&mut self) {
        self.ora = 0;
        self.orb = 0;
        self.ddra = 0;
        self.ddrb = 0;
        self.acr = 0;
        self.pcr = 0;
        self.ifr = 0;
        self.ier = 0;
        self.t1.armed = false;
        self.t2.armed = false;
    }

    /// One phase-2 cycle.
    pub fn tick(&mut self) {
        if self.t1.tick(self.acr & ACR_T1_FREE_RUN != 0) {
            self.ifr |= irq::T1;
        }
        if self.acr & ACR_T2_PULSES == 0 && self.t2.count() {
            self.ifr |= irq::T2;
        }
    }

    /// A falling edge on PB6, counted by Timer 2 in pulse mode.
    pub fn pulse_pb6(&mut self) {
        if self.acr & ACR_T2_PULSES != 0 && self.t2.count() {
            self.ifr |= irq::T2;
        }
    }

    pub fn read(&mut self, register: Register) -> u8 {
        match register {
            Register::Orb => {
                self.port_b_accessed();
                self.read_port_b()
            }
            Register::Ora => {
                self.port_a_accessed();
                self.read_port_a()
            }
            Register::Ddrb => self.ddrb,
            Register::Ddra => self.ddra,
            Register::T1cl => {
                self.ifr &= !irq::T1;
                self.t1.counter as u8
            }
            Register::T1ch => (self.t1.counter >> 8) as u8,
            Register::T1ll => self.t1.latch as u8,
            Register::T1lh => (self.t1.latch >> 8) as u8,
            Register::T2cl => {
                self.ifr &= !irq::T2;
                self.t2.counter as u8
            }
            Register::T2ch => (self.t2.counter >> 8) as u8,
            Register::Sr => {
                self.ifr &= !irq::SR;
                self.sr
            }
            Register::Acr => self.acr,
            Register::Pcr => self.pcr,
            Register::Ifr => self.ifr_value(),
            Register::Ier => self.ier | irq::ANY,
            Register::OraNoHandshake => self.read_port_a(),
        }
    }

    pub fn write(&mut self, register: Register, value: u8) {
        match register {
            Register::Orb => {
                self.port_b_accessed();
                self.orb = value;
            }
            Register::Ora => {
                self.port_a_accessed();
                self.ora = value;
            }
            Register::Ddrb => self.ddrb = value,
            Register::Ddra => self.ddra = value,
            Register::T1cl | Register::T1ll => {
                self.t1.latch = (self.t1.latch & 0xFF00) | u16::from(value);
            }
            Register::T1ch => {
                self.t1.latch = (self.t1.latch & 0x00FF) | (u16::from(value) << 8);
                self.ifr &= !irq::T1;
                self.t1.start();
                log::trace!("VIA T1 start ${:04X}", self.t1.counter);
            }
            Register::T1lh => {
                self.t1.latch = (self.t1.latch & 0x00FF) | (u16::from(value) << 8);
                self.ifr &= !irq::T1;
            }
            Register::T2cl => self.t2.latch_lo = value,
            Register::T2ch => {
                self.ifr &= !irq::T2;
                self.t2.start(value);
                log::trace!("VIA T2 start ${:04X}", self.t2.counter);
            }
            Register::Sr => {
                self.ifr &= !irq::SR;
                self.sr = value;
            }
            Register::Acr => self.acr = value,
            Register::Pcr => self.pcr = value,
            Register::Ifr => self.ifr &= !(value & 0x7F),
            Register::Ier => {
                if value & irq::ANY != 0 {
                    self.ier |= value & 0x7F;
                } else {
                    self.ier &= !(value & 0x7F);
                }
            }
            Register::OraNoHandshake => self.ora = value,
        }
    }

    // ------------------------------------------------------------------
    // Control lines and pins
    // ------------------------------------------------------------------

    pub fn set_ca1(&mut self, level: bool) {
        if edge(self.ca1, level, self.pcr & PCR_CA1_POSITIVE != 0) {
            self.ifr |= irq::CA1;
            if self.acr & ACR_PA_LATCH != 0 {
                self.latch_a = self.input_a;
            }
        }
        self.ca1 = level;
    }

    pub fn set_cb1(&mut self, level: bool) {
        if edge(self.cb1, level, self.pcr & PCR_CB1_POSITIVE != 0) {
            self.ifr |= irq::CB1;
            if self.acr & ACR_PB_LATCH != 0 {
                self.latch_b = self.input_b;
            }
        }
        self.cb1 = level;
    }

    /// Drive CA2. Only has an effect when CA2 is configured as an input.
    pub fn set_ca2(&mut self, level: bool) {
        let previous = self.ca2;
        if matches!(self.ca2_control(), Control2::Input { positive, .. } if edge(previous, level, positive)) {
            self.ifr |= irq::CA2;
        }
        self.ca2 = level;
    }

    /// Drive CB2. Only has an effect when CB2 is configured as an input.
    pub fn set_cb2(&mut self, level: bool) {
        let previous = self.cb2;
        if matches!(self.cb2_control(), Control2::Input { positive, .. } if edge(previous, level, positive)) {
            self.ifr |= irq::CB2;
        }
        self.cb2 = level;
    }

    /// Raise the CA2 flag directly, for collaborators that model the
    /// condition rather than the line.
    pub fn set_ca2_flag(&mut self) {
        self.ifr |= irq::CA2;
    }

    pub fn set_cb2_flag(&mut self) {
        self.ifr |= irq::CB2;
    }

    pub fn set_port_a_input(&mut self, value: u8) {
        self.input_a = value;
    }

    pub fn set_port_b_input(&mut self, value: u8) {
        self.input_b = value;
    }

    /// Port A as driven by the VIA: output bits from ORA, input bits high.
    #[must_use]
    pub fn port_a_output(&self) -> u8 {
        (self.ora & self.ddra) | !self.ddra
    }

    /// Port B as driven by the VIA, with PB7 taken from Timer 1 when the
    /// ACR routes it there.
    #[must_use]
    pub fn port_b_output(&self) -> u8 {
        let out = (self.orb & self.ddrb) | !self.ddrb;
        self.with_pb7(out)
    }

    /// CA2 level when in manual output mode.
    #[must_use]
    pub fn ca2_output(&self) -> Option<bool> {
        match self.ca2_control() {
            Control2::Manual(level) => Some(level),
            _ => None,
        }
    }

    #[must_use]
    pub fn cb2_output(&self) -> Option<bool> {
        match self.cb2_control() {
            Control2::Manual(level) => Some(level),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// IFR as the CPU reads it, bit 7 included.
    #[must_use]
    pub fn ifr(&self) -> u8 {
        self.ifr_value()
    }

    #[must_use]
    pub fn ier(&self) -> u8 {
        self.ier
    }

    #[must_use]
    pub fn acr(&self) -> u8 {
        self.acr
    }

    #[must_use]
    pub fn pcr(&self) -> u8 {
        self.pcr
    }

    #[must_use]
    pub fn timer1_counter(&self) -> u16 {
        self.t1.counter
    }

    #[must_use]
    pub fn timer1_latch(&self) -> u16 {
        self.t1.latch
    }

    #[must_use]
    pub fn timer2_counter(&self) -> u16 {
        self.t2.counter
    }

    #[must_use]
    pub fn snapshot(&self) -> ViaSnapshot {
        ViaSnapshot {
            ora: self.ora,
            orb: self.orb,
            ddra: self.ddra,
            ddrb: self.ddrb,
            input_a: self.input_a,
            input_b: self.input_b,
            latch_a: self.latch_a,
            latch_b: self.latch_b,
            t1_counter: self.t1.counter,
            t1_latch: self.t1.latch,
            t1_armed: self.t1.armed,
            pb7: self.t1.pb7,
            t2_counter: self.t2.counter,
            t2_latch_lo: self.t2.latch_lo,
            t2_armed: self.t2.armed,
            sr: self.sr,
            acr: self.acr,
            pcr: self.pcr,
            ifr: self.ifr,
            ier: self.ier,
            ca1: self.ca1,
            ca2: self.ca2,
            cb1: self.cb1,
            cb2: self.cb2,
        }
    }

    pub fn restore(&mut self, snapshot: &ViaSnapshot) {
        *self = Self {
            ora: snapshot.ora,
            orb: snapshot.orb,
            ddra: snapshot.ddra,
            ddrb: snapshot.ddrb,
            input_a: snapshot.input_a,
            input_b: snapshot.input_b,
            latch_a: snapshot.latch_a,
            latch_b: snapshot.latch_b,
            t1: Timer1 {
                counter: snapshot.t1_counter,
                latch: snapshot.t1_latch,
                armed: snapshot.t1_armed,
                pb7: snapshot.pb7,
            },
            t2: Timer2 {
                counter: snapshot.t2_counter,
                latch_lo: snapshot.t2_latch_lo,
                armed: snapshot.t2_armed,
            },
            sr: snapshot.sr,
            acr: snapshot.acr,
            pcr: snapshot.pcr,
            ifr: snapshot.ifr & 0x7F,
            ier: snapshot.ier & 0x7F,
            ca1: snapshot.ca1,
            ca2: snapshot.ca2,
            cb1: snapshot.cb1,
            cb2: snapshot.cb2,
        };
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn ifr_value(&self) -> u8 {
        let any = if self.ifr & self.ier & 0x7F != 0 { irq::ANY } else { 0 };
        (self.ifr & 0x7F) | any
    }

    fn ca2_control(&self) -> Control2 {
        Control2::decode(self.pcr >> 1)
    }

    fn cb2_control(&self) -> Control2 {
        Control2::decode(self.pcr >> 5)
    }

    fn port_a_accessed(&mut self) {
        self.ifr &= !irq::CA1;
        if self.ca2_control().cleared_by_port_access() {
            self.ifr &= !irq::CA2;
        }
    }

    fn port_b_accessed(&mut self) {
        self.ifr &= !irq::CB1;
        if self.cb2_control().cleared_by_port_access() {
            self.ifr &= !irq::CB2;
        }
    }

    fn read_port_a(&self) -> u8 {
        let pins = if self.acr & ACR_PA_LATCH != 0 { self.latch_a } else { self.input_a };
        (self.ora & self.ddra) | (pins & !self.ddra)
    }

    fn read_port_b(&self) -> u8 {
        let pins = if self.acr & ACR_PB_LATCH != 0 { self.latch_b } else { self.input_b };
        self.with_pb7((self.orb & self.ddrb) | (pins & !self.ddrb))
    }

    fn with_pb7(&self, value: u8) -> u8 {
        if self.acr & ACR_T1_PB7 == 0 {
            return value;
        }
        (value & 0x7F) | if self.t1.pb7 { 0x80 } else { 0 }
    }
}

impl MemoryMappedDevice for Via6522 {
    fn read_register(&mut self, index: u8) -> u8 {
        self.read(Register::from_index(index))
    }

    fn write_register(&mut self, index: u8, value: u8) {
        self.write(Register::from_index(index), value);
    }
}

impl InterruptSource for Via6522 {
    fn is_irq(&self) -> bool {
        self.ifr & self.ier & 0x7F != 0
    }
}

impl Observable for Via6522 {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "ifr" => Some(self.ifr_value().into()),
            "ier" => Some((self.ier | irq::ANY).into()),
            "acr" => Some(self.acr.into()),
            "pcr" => Some(self.pcr.into()),
            "t1" => Some(self.t1.counter.into()),
            "t1_latch" => Some(self.t1.latch.into()),
            "t2" => Some(self.t2.counter.into()),
            "sr" => Some(self.sr.into()),
            "port_a" => Some(self.port_a_output().into()),
            "port_b" => Some(self.port_b_output().into()),
            "ddra" => Some(self.ddra.into()),
            "ddrb" => Some(self.ddrb.into()),
            "irq" => Some(self.is_irq().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "ifr", "ier", "acr", "pcr", "t1", "t1_latch", "t2", "sr", "port_a", "port_b", "ddra",
            "ddrb", "irq",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn via() -> Via6522 {
        Via6522::new()
    }

    #[test]
    fn timer1_one_shot_raises_flag_once() {
        let mut via = via();
        via.write(Register::T1cl, 3);
        via.write(Register::T1ch, 0);
        assert_eq!(via.timer1_counter(), 3);

        for _ in 0..3 {
            via.tick();
        }
        assert_eq!(via.ifr() & irq::T1, 0);
        via.tick();
        assert_ne!(via.ifr() & irq::T1, 0, "underflow after latch + 1 cycles");

        via.read(Register::T1cl);
        assert_eq!(via.ifr() & irq::T1, 0, "reading T1C-L clears the flag");
        for _ in 0..0x1_0001 {
            via.tick();
        }
        assert_eq!(via.ifr() & irq::T1, 0, "one-shot does not refire");
    }

    #[test]
    fn timer1_free_run_refires() {
        let mut via = via();
        via.write(Register::Acr, ACR_T1_FREE_RUN);
        via.write(Register::T1cl, 2);
        via.write(Register::T1ch, 0);
        for _ in 0..3 {
            via.tick();
        }
        assert_ne!(via.ifr() & irq::T1, 0);
        assert_eq!(via.timer1_counter(), 2, "reloaded from the latch");

        via.write(Register::Ifr, irq::T1);
        for _ in 0..3 {
            via.tick();
        }
        assert_ne!(via.ifr() & irq::T1, 0);
    }

    #[test]
    fn pb7_square_wave() {
        let mut via = via();
        via.write(Register::Acr, ACR_T1_FREE_RUN | ACR_T1_PB7);
        via.write(Register::T1cl, 1);
        via.write(Register::T1ch, 0);
        assert_eq!(via.port_b_output() & 0x80, 0);
        via.tick();
        via.tick();
        assert_eq!(via.port_b_output() & 0x80, 0x80);
        via.tick();
        via.tick();
        assert_eq!(via.port_b_output() & 0x80, 0);
    }

    #[test]
    fn timer1_latch_write_does_not_start() {
        let mut via = via();
        via.write(Register::T1ll, 0x10);
        via.write(Register::T1lh, 0x00);
        assert_eq!(via.timer1_latch(), 0x0010);
        assert_eq!(via.timer1_counter(), 0xFFFF);
    }

    #[test]
    fn timer2_timed_and_pulse_modes() {
        let mut via = via();
        via.write(Register::T2cl, 2);
        via.write(Register::T2ch, 0);
        for _ in 0..3 {
            via.tick();
        }
        assert_ne!(via.ifr() & irq::T2, 0);
        via.read(Register::T2cl);
        assert_eq!(via.ifr() & irq::T2, 0);

        via.write(Register::Acr, ACR_T2_PULSES);
        via.write(Register::T2cl, 1);
        via.write(Register::T2ch, 0);
        for _ in 0..10 {
            via.tick();
        }
        assert_eq!(via.timer2_counter(), 1, "cycles are not counted in pulse mode");
        via.pulse_pb6();
        via.pulse_pb6();
        assert_ne!(via.ifr() & irq::T2, 0);
    }

    #[test]
    fn irq_needs_flag_and_enable() {
        let mut via = via();
        via.write(Register::Pcr, PCR_CA1_POSITIVE);
        via.set_ca1(true);
        assert_ne!(via.ifr() & irq::CA1, 0);
        assert!(!via.is_irq());
        assert_eq!(via.ifr() & irq::ANY, 0);

        via.write(Register::Ier, irq::ANY | irq::CA1);
        assert!(via.is_irq());
        assert_eq!(via.read(Register::Ifr), irq::ANY | irq::CA1);
        assert!(!via.is_nmi());

        via.write(Register::Ier, irq::CA1);
        assert!(!via.is_irq());
        assert_eq!(via.read(Register::Ier), irq::ANY);
    }

    #[test]
    fn ca1_edge_polarity() {
        let mut via = via();
        via.set_ca1(true);
        assert_eq!(via.ifr() & irq::CA1, 0, "negative edge selected by default");
        via.set_ca1(false);
        assert_ne!(via.ifr() & irq::CA1, 0);
    }

    #[test]
    fn port_a_handshake_clears_ca_flags() {
        let mut via = via();
        via.set_ca2_flag();
        via.set_ca1(true);
        via.set_ca1(false);
        via.read(Register::OraNoHandshake);
        assert_eq!(via.ifr() & (irq::CA1 | irq::CA2), irq::CA1 | irq::CA2);
        via.read(Register::Ora);
        assert_eq!(via.ifr() & (irq::CA1 | irq::CA2), 0);
    }

    #[test]
    fn independent_ca2_survives_port_access() {
        let mut via = via();
        via.write(Register::Pcr, 0b0000_0010); // CA2 independent, negative edge
        via.set_ca2(true);
        via.set_ca2(false);
        assert_ne!(via.ifr() & irq::CA2, 0);
        via.read(Register::Ora);
        assert_ne!(via.ifr() & irq::CA2, 0);
    }

    #[test]
    fn ca2_manual_output() {
        let mut via = via();
        assert_eq!(via.ca2_output(), None);
        via.write(Register::Pcr, 0b0000_1110);
        assert_eq!(via.ca2_output(), Some(true));
        via.write(Register::Pcr, 0b0000_1100);
        assert_eq!(via.ca2_output(), Some(false));
    }

    #[test]
    fn port_reads_mix_outputs_and_pins() {
        let mut via = via();
        via.write(Register::Ddra, 0x0F);
        via.write(Register::Ora, 0xAB);
        via.set_port_a_input(0xC0);
        assert_eq!(via.read(Register::OraNoHandshake), 0xCB);
        assert_eq!(via.port_a_output(), 0xFB);
    }

    #[test]
    fn port_b_latches_on_cb1() {
        let mut via = via();
        via.write(Register::Acr, ACR_PB_LATCH);
        via.set_port_b_input(0x42);
        via.set_cb1(true);
        via.set_cb1(false);
        via.set_port_b_input(0x99);
        assert_eq!(via.read(Register::Orb), 0x42);
    }

    #[test]
    fn window_index_mirrors_every_sixteen() {
        let mut via = via();
        via.write_register(0x12, 0x55);
        assert_eq!(via.read_register(0x02), 0x55, "DDRB via mirror");
    }

    #[test]
    fn snapshot_restore_round_trip() {
        let mut via = via();
        via.write(Register::Acr, ACR_T1_FREE_RUN);
        via.write(Register::Ier, irq::ANY | irq::T1);
        via.write(Register::T1cl, 9);
        via.write(Register::T1ch, 0);
        via.tick();
        let snap = via.snapshot();

        let mut copy = Via6522::new();
        copy.restore(&snap);
        assert_eq!(copy.snapshot(), snap);
        for _ in 0..20 {
            via.tick();
            copy.tick();
        }
        assert_eq!(copy.snapshot(), via.snapshot());
    }

    #[test]
    fn observable_paths_resolve() {
        let via = via();
        for path in via.query_paths() {
            assert!(via.query(path).is_some(), "{path}");
        }
        assert_eq!(via.query("ier"), Some(Value::U8(0x80)));
    }

    #[test]
    fn reset_clears_control_registers() {
        let mut via = via();
        via.write(Register::Ier, 0xFF);
        via.write(Register::Ddrb, 0xFF);
        via.reset();
        assert_eq!(via.ier(), 0);
        assert_eq!(via.read(Register::Ddrb), 0);
    }
}
