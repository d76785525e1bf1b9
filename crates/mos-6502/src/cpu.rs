//! The 6502 execution engine.
//!
//! Each tick performs exactly one bus access. An empty queue means the CPU
//! is between instructions: the tick samples the interrupt lines and either
//! starts an interrupt entry or fetches and decodes the next opcode, which
//! queues the remaining cycles of that instruction.

mod decode;
mod execute;

use std::fmt;

use emu_core::{Cpu, InterruptSource, Memory, Observable, Ticks, Value};

use crate::flags::{C, D, I, N, U, V, Z};
use crate::microcode::{MicroOp, MicroOpQueue};
use crate::{CpuError, CpuSnapshot, Instruction, InstructionKey, InstructionSet, Registers, Status};

/// NMI vector.
pub const NMI_VECTOR: u16 = 0xFFFA;
/// Reset vector.
pub const RESET_VECTOR: u16 = 0xFFFC;
/// IRQ and BRK vector.
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// What happens when S runs off either end of page one.
///
/// The hardware always wraps. `Strict` treats a wrap as a sign that the
/// emulation has gone wrong and stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum StackPolicy {
    /// Wrap like the hardware; log at debug level.
    Wrap,
    /// A push with S = $00 or a pull with S = $FF is an error.
    #[default]
    Strict,
}

/// Callback run once at the next quiescent point.
pub type QuiescentCallback = Box<dyn FnOnce(&Mos6502) + Send>;

/// The MOS 6502.
pub struct Mos6502 {
    /// Architectural registers. Writable so tests and debuggers can poke
    /// state between instructions.
    pub regs: Registers,

    instructions: &'static InstructionSet,
    queue: MicroOpQueue,

    /// Instruction being executed and the address of its opcode.
    current: InstructionKey,
    opcode_pc: u16,

    /// Effective address, and the same address before an index carry was
    /// applied to its high byte.
    addr: u16,
    uncorrected: u16,
    /// Zero-page pointer for the indirect modes.
    pointer: u8,
    /// Operand latched between cycles.
    data: u8,

    /// Interrupt entry queued and not yet finished.
    servicing: bool,
    /// Inside a hardware interrupt handler until the matching RTI.
    in_isr: bool,
    /// Last sampled NMI line, for edge detection.
    nmi_line: bool,
    nmi_pending: bool,

    halted: bool,
    cycles: u64,
    max_cycles: Option<u64>,
    stack_policy: StackPolicy,
    on_quiescent: Option<QuiescentCallback>,
}

impl Default for Mos6502 {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Mos6502 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mos6502")
            .field("regs", &self.regs)
            .field("current", &self.current)
            .field("queued", &self.queue.len())
            .field("in_isr", &self.in_isr)
            .field("halted", &self.halted)
            .field("cycles", &self.cycles)
            .finish_non_exhaustive()
    }
}

impl Mos6502 {
    /// A CPU with power-on registers and PC = 0. Call [`Cpu::reset`] to load
    /// PC from the reset vector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            instructions: InstructionSet::nmos(),
            queue: MicroOpQueue::new(),
            current: InstructionKey::new(Instruction::Nop, crate::AddressingMode::Implied),
            opcode_pc: 0,
            addr: 0,
            uncorrected: 0,
            pointer: 0,
            data: 0,
            servicing: false,
            in_isr: false,
            nmi_line: false,
            nmi_pending: false,
            halted: false,
            cycles: 0,
            max_cycles: None,
            stack_policy: StackPolicy::default(),
            on_quiescent: None,
        }
    }

    #[must_use]
    pub fn with_stack_policy(mut self, policy: StackPolicy) -> Self {
        self.stack_policy = policy;
        self
    }

    /// Halt once the cycle count reaches `max`.
    #[must_use]
    pub fn with_max_cycles(mut self, max: u64) -> Self {
        self.max_cycles = Some(max);
        self
    }

    #[must_use]
    pub fn stack_policy(&self) -> StackPolicy {
        self.stack_policy
    }

    /// Run `callback` once, at the start of the next tick that finds the CPU
    /// quiescent, before interrupts are sampled. Replaces any earlier
    /// callback that has not fired yet.
    pub fn set_quiescent_callback(&mut self, callback: QuiescentCallback) {
        self.on_quiescent = Some(callback);
    }

    #[must_use]
    pub fn in_isr(&self) -> bool {
        self.in_isr
    }

    /// The instruction most recently decoded.
    #[must_use]
    pub fn current_instruction(&self) -> InstructionKey {
        self.current
    }

    /// Remaining cycles of the current instruction.
    #[must_use]
    pub fn queued_cycles(&self) -> usize {
        self.queue.len()
    }

    /// Capture the architectural state. Only meaningful when quiescent.
    #[must_use]
    pub fn snapshot(&self) -> CpuSnapshot {
        CpuSnapshot {
            a: self.regs.a,
            x: self.regs.x,
            y: self.regs.y,
            s: self.regs.s,
            pc: self.regs.pc,
            p: self.regs.p.0,
            in_isr: self.in_isr,
            nmi_pending: self.nmi_pending,
            nmi_line: self.nmi_line,
            halted: self.halted,
            cycles: self.cycles,
        }
    }

    /// Load a snapshot. Any partly executed instruction is discarded.
    pub fn restore(&mut self, snapshot: &CpuSnapshot) {
        self.queue.clear();
        self.servicing = false;
        self.regs = Registers {
            a: snapshot.a,
            x: snapshot.x,
            y: snapshot.y,
            s: snapshot.s,
            pc: snapshot.pc,
            p: Status(snapshot.p | U),
        };
        self.in_isr = snapshot.in_isr;
        self.nmi_pending = snapshot.nmi_pending;
        self.nmi_line = snapshot.nmi_line;
        self.halted = snapshot.halted;
        self.cycles = snapshot.cycles;
    }

    fn step<M, S>(&mut self, memory: &mut M, interrupts: &S) -> Result<(), CpuError>
    where
        M: Memory + ?Sized,
        S: InterruptSource + ?Sized,
    {
        if self.halted {
            return Ok(());
        }

        let nmi = interrupts.is_nmi();
        if nmi && !self.nmi_line {
            self.nmi_pending = true;
        }
        self.nmi_line = nmi;

        if let Some(op) = self.queue.pop() {
            self.execute(op, memory)?;
        } else {
            if let Some(callback) = self.on_quiescent.take() {
                callback(self);
            }
            if self.nmi_pending {
                self.nmi_pending = false;
                self.begin_interrupt(memory, NMI_VECTOR)?;
            } else if interrupts.is_irq() && !self.regs.p.is_set(I) {
                self.begin_interrupt(memory, IRQ_VECTOR)?;
            } else {
                self.fetch(memory)?;
            }
        }

        self.cycles += 1;
        if self.max_cycles.is_some_and(|max| self.cycles >= max) {
            log::debug!("cycle limit {} reached at PC ${:04X}", self.cycles, self.regs.pc);
            self.halted = true;
        }
        Ok(())
    }

    fn fetch<M: Memory + ?Sized>(&mut self, memory: &mut M) -> Result<(), CpuError> {
        let pc = self.regs.pc;
        let opcode = memory.read_byte(pc)?;
        self.regs.pc = pc.wrapping_add(1);
        let key = self.instructions.decode(opcode)?;
        self.current = key;
        self.opcode_pc = pc;
        self.queue_instruction(key)
    }

    /// The opcode-fetch slot reads PC and discards it; six more cycles push
    /// the return state and load the vector.
    fn begin_interrupt<M: Memory + ?Sized>(&mut self, memory: &mut M, vector: u16) -> Result<(), CpuError> {
        memory.read_byte(self.regs.pc)?;
        log::debug!(
            "{} at PC ${:04X}",
            if vector == NMI_VECTOR { "NMI" } else { "IRQ" },
            self.regs.pc
        );
        self.servicing = true;
        self.queue.extend([
            MicroOp::DummyReadPc,
            MicroOp::PushPch,
            MicroOp::PushPcl,
            MicroOp::PushStatus { brk: false },
            MicroOp::VectorLo(vector),
            MicroOp::VectorHi {
                vector,
                hardware: true,
            },
        ])
    }

    fn push<M: Memory + ?Sized>(&mut self, memory: &mut M, value: u8) -> Result<(), CpuError> {
        if self.regs.s == 0x00 {
            match self.stack_policy {
                StackPolicy::Strict => return Err(CpuError::StackOverflow { pc: self.opcode_pc }),
                StackPolicy::Wrap => log::debug!("stack wrapped on push at PC ${:04X}", self.opcode_pc),
            }
        }
        memory.write_byte(self.regs.stack_addr(), value)?;
        self.regs.s = self.regs.s.wrapping_sub(1);
        Ok(())
    }

    fn pull<M: Memory + ?Sized>(&mut self, memory: &mut M) -> Result<u8, CpuError> {
        if self.regs.s == 0xFF {
            match self.stack_policy {
                StackPolicy::Strict => return Err(CpuError::StackUnderflow { pc: self.opcode_pc }),
                StackPolicy::Wrap => log::debug!("stack wrapped on pull at PC ${:04X}", self.opcode_pc),
            }
        }
        self.regs.s = self.regs.s.wrapping_add(1);
        Ok(memory.read_byte(self.regs.stack_addr())?)
    }

    fn unimplemented(&self) -> CpuError {
        CpuError::Unimplemented {
            instruction: self.current.instruction,
            mode: self.current.mode,
        }
    }
}

// ============================================================================
// Trait implementations
// ============================================================================

impl Cpu for Mos6502 {
    type Error = CpuError;
    type Registers = Registers;

    fn tick<M, S>(&mut self, memory: &mut M, interrupts: &S) -> Result<(), CpuError>
    where
        M: Memory + ?Sized,
        S: InterruptSource + ?Sized,
    {
        self.step(memory, interrupts)
    }

    fn reset<M: Memory + ?Sized>(&mut self, memory: &mut M) -> Result<(), CpuError> {
        self.queue.clear();
        self.addr = 0;
        self.uncorrected = 0;
        self.pointer = 0;
        self.data = 0;
        self.servicing = false;
        self.in_isr = false;
        self.nmi_pending = false;
        self.halted = false;
        self.regs.s = 0xFD;
        self.regs.p = Status(self.regs.p.0 | I | U);
        self.regs.pc = memory.read_word(RESET_VECTOR)?;
        log::debug!("reset: PC = ${:04X}", self.regs.pc);
        Ok(())
    }

    fn pc(&self) -> u16 {
        self.regs.pc
    }

    fn registers(&self) -> Registers {
        self.regs
    }

    fn is_halted(&self) -> bool {
        self.halted
    }

    fn is_quiescent(&self) -> bool {
        self.queue.is_empty() && !self.servicing
    }

    fn cycles(&self) -> Ticks {
        Ticks::new(self.cycles)
    }
}

impl Observable for Mos6502 {
    fn query(&self, path: &str) -> Option<Value> {
        let p = self.regs.p;
        match path {
            "pc" => Some(self.regs.pc.into()),
            "a" => Some(self.regs.a.into()),
            "x" => Some(self.regs.x.into()),
            "y" => Some(self.regs.y.into()),
            "s" | "sp" => Some(self.regs.s.into()),
            "p" => Some(p.0.into()),
            "flags" => Some(Value::String(p.to_string())),
            "flags.c" => Some(p.is_set(C).into()),
            "flags.z" => Some(p.is_set(Z).into()),
            "flags.i" => Some(p.is_set(I).into()),
            "flags.d" => Some(p.is_set(D).into()),
            "flags.v" => Some(p.is_set(V).into()),
            "flags.n" => Some(p.is_set(N).into()),
            "cycle" => Some(self.cycles.into()),
            "halted" => Some(self.halted.into()),
            "in_isr" => Some(self.in_isr.into()),
            "instruction" => Some(Value::String(format!("{} {}", self.current.instruction, self.current.mode))),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "pc", "a", "x", "y", "s", "p", "flags", "flags.c", "flags.z", "flags.i", "flags.d",
            "flags.v", "flags.n", "cycle", "halted", "in_isr", "instruction",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu_core::{NoInterrupts, Ram};

    fn machine(program: &[u8]) -> (Mos6502, Ram) {
        let mut ram = Ram::new(0x0000, 0x10000);
        ram.load(0x0200, program).unwrap();
        ram.load(RESET_VECTOR, &[0x00, 0x02]).unwrap();
        let mut cpu = Mos6502::new();
        cpu.reset(&mut ram).unwrap();
        (cpu, ram)
    }

    #[test]
    fn reset_loads_vector() {
        let (cpu, _) = machine(&[]);
        assert_eq!(cpu.regs.pc, 0x0200);
        assert_eq!(cpu.regs.s, 0xFD);
        assert!(cpu.regs.p.is_set(I));
        assert!(cpu.is_quiescent());
    }

    #[test]
    fn lda_immediate_takes_two_cycles() {
        let (mut cpu, mut ram) = machine(&[0xA9, 0x42]);
        cpu.tick(&mut ram, &NoInterrupts).unwrap();
        assert!(!cpu.is_quiescent());
        cpu.tick(&mut ram, &NoInterrupts).unwrap();
        assert!(cpu.is_quiescent());
        assert_eq!(cpu.regs.a, 0x42);
        assert_eq!(cpu.cycles(), Ticks::new(2));
    }

    #[test]
    fn observable_paths() {
        let (mut cpu, _) = machine(&[]);
        cpu.regs.a = 0x10;
        assert_eq!(cpu.query("a"), Some(Value::U8(0x10)));
        assert_eq!(cpu.query("pc"), Some(Value::U16(0x0200)));
        assert_eq!(cpu.query("flags.i"), Some(Value::Bool(true)));
        assert_eq!(cpu.query("bogus"), None);
        for path in cpu.query_paths() {
            assert!(cpu.query(path).is_some(), "{path} should resolve");
        }
    }

    #[test]
    fn snapshot_restore_discards_queue() {
        let (mut cpu, mut ram) = machine(&[0xA9, 0x42]);
        cpu.regs.x = 7;
        let snap = cpu.snapshot();

        cpu.tick(&mut ram, &NoInterrupts).unwrap();
        assert!(!cpu.is_quiescent());
        cpu.restore(&snap);
        assert!(cpu.is_quiescent());
        assert_eq!(cpu.regs.pc, 0x0200);
        assert_eq!(cpu.regs.x, 7);
        assert_eq!(cpu.cycles(), Ticks::ZERO);
    }
}
