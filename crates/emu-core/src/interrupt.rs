//! Interrupt lines and their aggregation.
//!
//! Both the IRQ and NMI inputs of a 6502 are wired-OR: any source pulling
//! the line asserts it. [`InterruptAggregator`] keeps the last reported lines
//! of each source and ORs them when the CPU asks.

/// Something that can assert IRQ or NMI.
pub trait InterruptSource {
    fn is_irq(&self) -> bool {
        false
    }

    fn is_nmi(&self) -> bool {
        false
    }
}

/// The two lines as reported by a single source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InterruptLines {
    pub irq: bool,
    pub nmi: bool,
}

impl InterruptLines {
    pub const NONE: Self = Self {
        irq: false,
        nmi: false,
    };

    #[must_use]
    pub fn irq(irq: bool) -> Self {
        Self { irq, nmi: false }
    }

    /// Sample any source.
    pub fn of<S: InterruptSource + ?Sized>(source: &S) -> Self {
        Self {
            irq: source.is_irq(),
            nmi: source.is_nmi(),
        }
    }
}

impl InterruptSource for InterruptLines {
    fn is_irq(&self) -> bool {
        self.irq
    }

    fn is_nmi(&self) -> bool {
        self.nmi
    }
}

/// Handle returned by [`InterruptAggregator::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(usize);

#[derive(Debug, Clone)]
struct Slot {
    name: &'static str,
    lines: InterruptLines,
}

/// OR of every registered source.
///
/// Sources are registered once at wiring time and report their lines after
/// each tick through [`Self::update`]. The aggregate short-circuits at the
/// first asserting source.
#[derive(Debug, Clone, Default)]
pub struct InterruptAggregator {
    slots: Vec<Slot>,
}

impl InterruptAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &'static str) -> SourceId {
        self.slots.push(Slot {
            name,
            lines: InterruptLines::NONE,
        });
        SourceId(self.slots.len() - 1)
    }

    /// Record the current lines of `source`.
    pub fn update(&mut self, source: SourceId, lines: InterruptLines) {
        let Some(slot) = self.slots.get_mut(source.0) else {
            log::warn!("interrupt update from unknown source {}", source.0);
            return;
        };
        if slot.lines.irq != lines.irq {
            log::trace!("{} IRQ {}", slot.name, if lines.irq { "asserted" } else { "released" });
        }
        if slot.lines.nmi != lines.nmi {
            log::trace!("{} NMI {}", slot.name, if lines.nmi { "asserted" } else { "released" });
        }
        slot.lines = lines;
    }

    #[must_use]
    pub fn lines(&self, source: SourceId) -> InterruptLines {
        self.slots
            .get(source.0)
            .map_or(InterruptLines::NONE, |slot| slot.lines)
    }

    /// Names of the sources currently asserting IRQ.
    pub fn irq_sources(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.slots.iter().filter(|s| s.lines.irq).map(|s| s.name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl InterruptSource for InterruptAggregator {
    fn is_irq(&self) -> bool {
        self.slots.iter().any(|s| s.lines.irq)
    }

    fn is_nmi(&self) -> bool {
        self.slots.iter().any(|s| s.lines.nmi)
    }
}

/// A source that never interrupts. Handy for running a bare CPU.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInterrupts;

impl InterruptSource for NoInterrupts {}
