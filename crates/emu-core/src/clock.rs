//! Clock speeds and the strategies that pace a [`Runner`](crate::Runner).

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use thiserror::Error;

/// Target CPU clock rate.
///
/// The presets are what a user would pick from a menu. `Max` runs as fast as
/// the host allows; its nominal rate only sizes the throughput report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ClockSpeed {
    Mhz025,
    Mhz050,
    Mhz1,
    #[default]
    Mhz2,
    Mhz4,
    Max,
    /// Arbitrary throttled rate in Hz.
    Custom(u64),
}

impl ClockSpeed {
    const MAX_NOMINAL_HZ: u64 = 1_000_000_000;

    #[must_use]
    pub const fn rate_hz(self) -> u64 {
        match self {
            Self::Mhz025 => 250_000,
            Self::Mhz050 => 500_000,
            Self::Mhz1 => 1_000_000,
            Self::Mhz2 => 2_000_000,
            Self::Mhz4 => 4_000_000,
            Self::Max => Self::MAX_NOMINAL_HZ,
            Self::Custom(hz) => if hz == 0 { 1 } else { hz },
        }
    }

    #[must_use]
    pub const fn is_throttled(self) -> bool {
        !matches!(self, Self::Max)
    }

    /// Nanoseconds per tick at the nominal rate.
    #[must_use]
    pub const fn delay_ns(self) -> u64 {
        let delay = 1_000_000_000 / self.rate_hz();
        if delay == 0 { 1 } else { delay }
    }

    #[must_use]
    pub fn display_name(self) -> String {
        match self {
            Self::Mhz025 => "0.25 MHz".to_string(),
            Self::Mhz050 => "0.50 MHz".to_string(),
            Self::Mhz1 => "1.00 MHz".to_string(),
            Self::Mhz2 => "2.00 MHz".to_string(),
            Self::Mhz4 => "4.00 MHz".to_string(),
            Self::Max => "Maximum".to_string(),
            Self::Custom(hz) => format!("{hz} Hz"),
        }
    }

    /// The menu presets, slowest first.
    #[must_use]
    pub const fn standard_values() -> [Self; 6] {
        [
            Self::Mhz025,
            Self::Mhz050,
            Self::Mhz1,
            Self::Mhz2,
            Self::Mhz4,
            Self::Max,
        ]
    }
}

impl fmt::Display for ClockSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown clock speed {0:?} (expected 0.25, 0.5, 1, 2, 4, max or a rate in Hz)")]
pub struct ParseClockSpeedError(String);

impl FromStr for ClockSpeed {
    type Err = ParseClockSpeedError;

    /// Accepts a preset in MHz (`0.25`, `0.5`, `1`, `2`, `4`), `max`, or a
    /// plain integer rate followed by `hz`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let speed = match lower.trim_end_matches("mhz").trim() {
            "0.25" => Self::Mhz025,
            "0.5" | "0.50" => Self::Mhz050,
            "1" => Self::Mhz1,
            "2" => Self::Mhz2,
            "4" => Self::Mhz4,
            "max" => Self::Max,
            other => other
                .strip_suffix("hz")
                .and_then(|hz| hz.trim().parse().ok())
                .filter(|&hz: &u64| hz > 0)
                .map(Self::Custom)
                .ok_or_else(|| ParseClockSpeedError(s.to_string()))?,
        };
        Ok(speed)
    }
}

/// How a runner measures time and waits for the next tick deadline.
///
/// Times are nanoseconds from an origin the strategy picks.
pub trait ClockStrategy {
    fn now_ns(&mut self) -> u64;

    /// Return no earlier than `deadline_ns`.
    fn wait_until(&mut self, deadline_ns: u64);
}

/// Spins on the host's monotonic clock. Sub-microsecond precision at the
/// cost of a busy core.
#[derive(Debug, Clone)]
pub struct BusyWait {
    origin: Instant,
    throttled: bool,
}

impl BusyWait {
    #[must_use]
    pub fn new(speed: ClockSpeed) -> Self {
        Self {
            origin: Instant::now(),
            throttled: speed.is_throttled(),
        }
    }
}

impl ClockStrategy for BusyWait {
    fn now_ns(&mut self) -> u64 {
        u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    fn wait_until(&mut self, deadline_ns: u64) {
        if !self.throttled {
            return;
        }
        while self.now_ns() < deadline_ns {
            std::hint::spin_loop();
        }
    }
}

/// Never waits. Time is virtual: it jumps to each deadline, so a run looks
/// exactly on speed and needs no wall clock.
#[derive(Debug, Clone, Default)]
pub struct Unthrottled {
    now_ns: u64,
}

impl Unthrottled {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClockStrategy for Unthrottled {
    fn now_ns(&mut self) -> u64 {
        self.now_ns
    }

    fn wait_until(&mut self, deadline_ns: u64) {
        self.now_ns = self.now_ns.max(deadline_ns);
    }
}
