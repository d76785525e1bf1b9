//! Trait for components that can be advanced by clock ticks.

use crate::Ticks;

/// A component advanced one clock cycle at a time.
///
/// A tick may fail: a bus access to an unmapped address or a broken CPU
/// invariant aborts the run instead of producing undefined guest state.
pub trait Tickable {
    type Error;

    /// Advance by one cycle.
    fn tick(&mut self) -> Result<(), Self::Error>;

    /// Advance by `count` cycles, stopping at the first error.
    fn tick_n(&mut self, count: Ticks) -> Result<(), Self::Error> {
        for _ in 0..count.get() {
            self.tick()?;
        }
        Ok(())
    }
}
