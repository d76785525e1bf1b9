//! Fixed-rate tick loop with adaptive delay compensation.
//!
//! The runner aims each tick at a deadline `delay` nanoseconds after the
//! previous one. Every 256 ticks it compares achieved throughput with the
//! target and scales the delay, never above the nominal value; a slow host
//! shortens the delay to catch up. Every [`RESET_CYCLES`] cycles the window
//! starts afresh and a throughput report is logged.

use crate::{BusyWait, ClockSpeed, ClockStrategy, Tickable, Ticks, Unthrottled};

/// Cycles per measurement window.
pub const RESET_CYCLES: u64 = 2_000_000;

const ADJUST_MASK: u64 = 0xFF;
const MIN_DELAY_NS: u64 = 10;

/// Why [`Runner::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The stop condition became true.
    Stopped,
    /// The configured maximum cycle count was reached.
    CycleLimit,
}

/// Throughput over the last completed measurement window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RunStats {
    /// Achieved rate in millions of cycles per second.
    pub mhz: f64,
    /// Cycles run since the runner was created.
    pub total_cycles: u64,
    /// Wall time of the window in seconds.
    pub window_secs: f64,
}

/// Drives a [`Tickable`] at a target [`ClockSpeed`].
#[derive(Debug)]
pub struct Runner<S = BusyWait> {
    strategy: S,
    speed: ClockSpeed,
    max_cycles: Option<u64>,
    cycle_count: u64,
    cycles_since_reset: u64,
    initial_delay_ns: u64,
    delay_ns: u64,
    stats: Option<RunStats>,
}

impl Runner<BusyWait> {
    /// A runner that spins on the host clock.
    #[must_use]
    pub fn busy_wait(speed: ClockSpeed) -> Self {
        Self::new(BusyWait::new(speed), speed)
    }
}

impl Runner<Unthrottled> {
    /// A runner that never waits, for tests and batch runs.
    #[must_use]
    pub fn unthrottled(speed: ClockSpeed) -> Self {
        Self::new(Unthrottled::new(), speed)
    }
}

impl<S: ClockStrategy> Runner<S> {
    pub fn new(strategy: S, speed: ClockSpeed) -> Self {
        let delay_ns = speed.delay_ns();
        Self {
            strategy,
            speed,
            max_cycles: None,
            cycle_count: 0,
            cycles_since_reset: 0,
            initial_delay_ns: delay_ns,
            delay_ns,
            stats: None,
        }
    }

    /// Stop after `max` cycles in total, across all calls to `run`.
    #[must_use]
    pub fn with_max_cycles(mut self, max: u64) -> Self {
        self.max_cycles = Some(max);
        self
    }

    pub fn set_speed(&mut self, speed: ClockSpeed) {
        self.speed = speed;
        self.initial_delay_ns = speed.delay_ns();
        self.delay_ns = self.initial_delay_ns;
    }

    #[must_use]
    pub fn speed(&self) -> ClockSpeed {
        self.speed
    }

    #[must_use]
    pub fn cycles(&self) -> Ticks {
        Ticks::new(self.cycle_count)
    }

    /// Current per-tick delay after compensation.
    #[must_use]
    pub fn delay_ns(&self) -> u64 {
        self.delay_ns
    }

    #[must_use]
    pub fn last_stats(&self) -> Option<RunStats> {
        self.stats
    }

    fn limit_reached(&self) -> bool {
        self.max_cycles.is_some_and(|max| self.cycle_count >= max)
    }

    /// Tick `target` until `stop` returns true or the cycle limit is hit.
    ///
    /// `stop` is polled once per cycle, before the tick. The first tick error
    /// ends the run.
    pub fn run<T, F>(&mut self, target: &mut T, mut stop: F) -> Result<RunOutcome, T::Error>
    where
        T: Tickable + ?Sized,
        F: FnMut(&T) -> bool,
    {
        if self.limit_reached() {
            return Ok(RunOutcome::CycleLimit);
        }

        let mut window_start = self.strategy.now_ns();
        let mut next_tick = window_start + self.delay_ns;

        while !stop(target) {
            self.strategy.wait_until(next_tick);
            next_tick += self.delay_ns;

            target.tick()?;
            self.cycle_count += 1;
            self.cycles_since_reset += 1;

            if self.limit_reached() {
                return Ok(RunOutcome::CycleLimit);
            }

            if self.cycles_since_reset & ADJUST_MASK == 0 {
                let elapsed = self.strategy.now_ns().saturating_sub(window_start);
                self.adjust_delay(elapsed);
            }

            if self.cycles_since_reset >= RESET_CYCLES {
                let now = self.strategy.now_ns();
                self.report(now.saturating_sub(window_start));
                window_start = now;
                self.cycles_since_reset = 0;
                self.delay_ns = self.initial_delay_ns;
                next_tick = window_start + self.delay_ns;
            }
        }

        Ok(RunOutcome::Stopped)
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn adjust_delay(&mut self, elapsed_ns: u64) {
        if elapsed_ns == 0 {
            return;
        }
        let secs = elapsed_ns as f64 / 1e9;
        let cps = self.cycles_since_reset as f64 / secs;
        let ratio = cps / self.speed.rate_hz() as f64;
        let scaled = (self.delay_ns as f64 * ratio).round() as u64;
        self.delay_ns = scaled.max(MIN_DELAY_NS).min(self.initial_delay_ns);
    }

    #[allow(clippy::cast_precision_loss)]
    fn report(&mut self, elapsed_ns: u64) {
        let window_secs = elapsed_ns as f64 / 1e9;
        let mhz = if window_secs > 0.0 {
            self.cycles_since_reset as f64 / window_secs / 1e6
        } else {
            0.0
        };
        let stats = RunStats {
            mhz,
            total_cycles: self.cycle_count,
            window_secs,
        };
        log::info!(
            "{mhz:.2} MHz (target {}), {} cycles total, window {window_secs:.2}s",
            self.speed,
            stats.total_cycles
        );
        self.stats = Some(stats);
    }
}
