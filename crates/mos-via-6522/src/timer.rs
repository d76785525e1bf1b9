//! The two 16-bit down-counters.
//!
//! Both counters decrement every phase-2 cycle whether or not they are
//! armed. Arming (a write to the high counter byte) only decides whether
//! the next underflow raises an interrupt flag.

/// Timer 1: 16-bit latch, one-shot or free-running, optional PB7 square wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Timer1 {
    pub counter: u16,
    pub latch: u16,
    pub armed: bool,
    pub pb7: bool,
}

impl Timer1 {
    pub const fn new() -> Self {
        Self {
            counter: 0xFFFF,
            latch: 0xFFFF,
            armed: false,
            pb7: false,
        }
    }

    /// Load the counter from the latch and arm it.
    pub fn start(&mut self) {
        self.counter = self.latch;
        self.armed = true;
        self.pb7 = false;
    }

    /// One cycle. Returns true when the interrupt flag should be raised.
    pub fn tick(&mut self, free_run: bool) -> bool {
        let (next, underflow) = self.counter.overflowing_sub(1);
        if !underflow {
            self.counter = next;
            return false;
        }

        if free_run {
            self.counter = self.latch;
            self.pb7 = !self.pb7;
            true
        } else {
            self.counter = next;
            let fire = self.armed;
            if fire {
                self.pb7 = !self.pb7;
            }
            self.armed = false;
            fire
        }
    }
}

/// Timer 2: 8-bit low latch, one-shot only; counts cycles or PB6 pulses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Timer2 {
    pub counter: u16,
    pub latch_lo: u8,
    pub armed: bool,
}

impl Timer2 {
    pub const fn new() -> Self {
        Self {
            counter: 0xFFFF,
            latch_lo: 0xFF,
            armed: false,
        }
    }

    pub fn start(&mut self, high: u8) {
        self.counter = u16::from_le_bytes([self.latch_lo, high]);
        self.armed = true;
    }

    /// One count, either a cycle or a PB6 pulse. Returns true when the
    /// interrupt flag should be raised.
    pub fn count(&mut self) -> bool {
        let (next, underflow) = self.counter.overflowing_sub(1);
        self.counter = next;
        if underflow && self.armed {
            self.armed = false;
            return true;
        }
        false
    }
}
