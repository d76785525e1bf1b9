//! Micro-op execution: one bus access per call.

use emu_core::Memory;

use super::Mos6502;
use crate::alu;
use crate::flags::{C, D, I, N, V, Z};
use crate::microcode::{Index, MicroOp};
use crate::{CpuError, Instruction, InstructionType, Status};

impl Mos6502 {
    pub(super) fn execute<M: Memory + ?Sized>(&mut self, op: MicroOp, memory: &mut M) -> Result<(), CpuError> {
        match op {
            MicroOp::ExecuteImplied => {
                memory.read_byte(self.regs.pc)?;
                self.execute_implied()?;
            }
            MicroOp::ReadImmediate => {
                let value = self.read_pc_increment(memory)?;
                self.apply_read(value)?;
            }

            MicroOp::FetchAddressLo => {
                self.addr = u16::from(self.read_pc_increment(memory)?);
            }
            MicroOp::FetchAddressHi(index) => {
                let hi = self.read_pc_increment(memory)?;
                self.load_high(hi, index)?;
            }
            MicroOp::IndexZeroPage(index) => {
                memory.read_byte(self.addr)?;
                self.addr = (self.addr + u16::from(self.index_value(index))) & 0x00FF;
            }
            MicroOp::FetchPointer => {
                self.pointer = self.read_pc_increment(memory)?;
            }
            MicroOp::IndexPointer => {
                memory.read_byte(u16::from(self.pointer))?;
                self.pointer = self.pointer.wrapping_add(self.regs.x);
            }
            MicroOp::ReadPointerLo => {
                self.addr = u16::from(memory.read_byte(u16::from(self.pointer))?);
            }
            MicroOp::ReadPointerHi(index) => {
                let hi = memory.read_byte(u16::from(self.pointer.wrapping_add(1)))?;
                self.load_high(hi, index)?;
            }
            MicroOp::FixupAddress => {
                memory.read_byte(self.uncorrected)?;
            }

            MicroOp::ReadOperand => {
                let value = memory.read_byte(self.addr)?;
                self.apply_read(value)?;
            }
            MicroOp::WriteRegister => {
                let value = match self.current.instruction {
                    Instruction::Sta => self.regs.a,
                    Instruction::Stx => self.regs.x,
                    Instruction::Sty => self.regs.y,
                    _ => return Err(self.unimplemented()),
                };
                memory.write_byte(self.addr, value)?;
            }
            MicroOp::ReadModify => {
                self.data = memory.read_byte(self.addr)?;
            }
            MicroOp::WriteUnmodified => {
                memory.write_byte(self.addr, self.data)?;
            }
            MicroOp::WriteModified => {
                self.data = self.modify(self.data)?;
                memory.write_byte(self.addr, self.data)?;
            }

            MicroOp::JumpAbsolute => {
                let hi = memory.read_byte(self.regs.pc)?;
                self.regs.pc = u16::from_le_bytes([self.addr as u8, hi]);
            }
            MicroOp::ReadIndirectLo => {
                self.data = memory.read_byte(self.addr)?;
            }
            MicroOp::JumpIndirect => {
                // The high byte never carries into the next page.
                let hi_addr = (self.addr & 0xFF00) | (self.addr.wrapping_add(1) & 0x00FF);
                let hi = memory.read_byte(hi_addr)?;
                self.regs.pc = u16::from_le_bytes([self.data, hi]);
            }

            MicroOp::FetchBranchOffset => {
                self.data = self.read_pc_increment(memory)?;
                if self.branch_taken()? {
                    self.queue.push(MicroOp::BranchTaken)?;
                }
            }
            MicroOp::BranchTaken => {
                memory.read_byte(self.regs.pc)?;
                let pc = self.regs.pc;
                let target = pc.wrapping_add(self.data as i8 as u16);
                if target & 0xFF00 == pc & 0xFF00 {
                    self.regs.pc = target;
                } else {
                    self.regs.pc = (pc & 0xFF00) | (target & 0x00FF);
                    self.addr = target;
                    self.queue.push(MicroOp::BranchFixup)?;
                }
            }
            MicroOp::BranchFixup => {
                memory.read_byte(self.regs.pc)?;
                self.regs.pc = self.addr;
            }

            MicroOp::DummyReadPc => {
                memory.read_byte(self.regs.pc)?;
            }
            MicroOp::ReadPcIncrement => {
                self.read_pc_increment(memory)?;
            }
            MicroOp::DummyStackRead => {
                memory.read_byte(self.regs.stack_addr())?;
            }

            MicroOp::PushPch => self.push(memory, self.regs.pch())?,
            MicroOp::PushPcl => self.push(memory, self.regs.pcl())?,
            MicroOp::PushStatus { brk } => self.push(memory, self.regs.p.pushed(brk))?,
            MicroOp::PushA => self.push(memory, self.regs.a)?,
            MicroOp::PullStatus => {
                self.regs.p = Status::pulled(self.pull(memory)?);
            }
            MicroOp::PullA => {
                self.regs.a = self.pull(memory)?;
                self.regs.p.update_nz(self.regs.a);
            }
            MicroOp::PullPcl => {
                let lo = self.pull(memory)?;
                self.regs.pc = (self.regs.pc & 0xFF00) | u16::from(lo);
            }
            MicroOp::PullPch => {
                let hi = self.pull(memory)?;
                self.regs.pc = (u16::from(hi) << 8) | (self.regs.pc & 0x00FF);
                if self.current.instruction == Instruction::Rti && self.in_isr {
                    log::trace!("RTI to ${:04X}", self.regs.pc);
                    self.in_isr = false;
                }
            }

            MicroOp::VectorLo(vector) => {
                self.data = memory.read_byte(vector)?;
                self.regs.p.set_if(I, true);
            }
            MicroOp::VectorHi { vector, hardware } => {
                let hi = memory.read_byte(vector.wrapping_add(1))?;
                self.regs.pc = u16::from_le_bytes([self.data, hi]);
                if hardware {
                    self.in_isr = true;
                    self.servicing = false;
                }
            }
        }
        Ok(())
    }

    fn read_pc_increment<M: Memory + ?Sized>(&mut self, memory: &mut M) -> Result<u8, CpuError> {
        let value = memory.read_byte(self.regs.pc)?;
        self.regs.pc = self.regs.pc.wrapping_add(1);
        Ok(value)
    }

    fn index_value(&self, index: Index) -> u8 {
        match index {
            Index::X => self.regs.x,
            Index::Y => self.regs.y,
        }
    }

    /// Combine the high byte with the latched low byte and apply the index.
    /// Indexed reads then queue their own operand read, preceded by a fix-up
    /// cycle only when the index carried into the high byte.
    fn load_high(&mut self, hi: u8, index: Option<Index>) -> Result<(), CpuError> {
        let base = u16::from_le_bytes([self.addr as u8, hi]);
        let Some(index) = index else {
            self.addr = base;
            self.uncorrected = base;
            return Ok(());
        };

        self.addr = base.wrapping_add(u16::from(self.index_value(index)));
        self.uncorrected = (base & 0xFF00) | (self.addr & 0x00FF);

        if self.current.instruction.instruction_type() == InstructionType::Read {
            if self.uncorrected != self.addr {
                self.queue.push(MicroOp::FixupAddress)?;
            }
            self.queue.push(MicroOp::ReadOperand)?;
        }
        Ok(())
    }

    fn apply_read(&mut self, value: u8) -> Result<(), CpuError> {
        let p = &mut self.regs.p;
        match self.current.instruction {
            Instruction::Adc => self.regs.a = alu::adc(p, self.regs.a, value),
            Instruction::Sbc => self.regs.a = alu::sbc(p, self.regs.a, value),
            Instruction::And => {
                self.regs.a &= value;
                p.update_nz(self.regs.a);
            }
            Instruction::Ora => {
                self.regs.a |= value;
                p.update_nz(self.regs.a);
            }
            Instruction::Eor => {
                self.regs.a ^= value;
                p.update_nz(self.regs.a);
            }
            Instruction::Bit => alu::bit(p, self.regs.a, value),
            Instruction::Cmp => alu::compare(p, self.regs.a, value),
            Instruction::Cpx => alu::compare(p, self.regs.x, value),
            Instruction::Cpy => alu::compare(p, self.regs.y, value),
            Instruction::Lda => {
                self.regs.a = value;
                p.update_nz(value);
            }
            Instruction::Ldx => {
                self.regs.x = value;
                p.update_nz(value);
            }
            Instruction::Ldy => {
                self.regs.y = value;
                p.update_nz(value);
            }
            _ => return Err(self.unimplemented()),
        }
        Ok(())
    }

    fn modify(&mut self, value: u8) -> Result<u8, CpuError> {
        let p = &mut self.regs.p;
        Ok(match self.current.instruction {
            Instruction::Asl => alu::asl(p, value),
            Instruction::Lsr => alu::lsr(p, value),
            Instruction::Rol => alu::rol(p, value),
            Instruction::Ror => alu::ror(p, value),
            Instruction::Inc => alu::step(p, value, true),
            Instruction::Dec => alu::step(p, value, false),
            _ => return Err(self.unimplemented()),
        })
    }

    fn execute_implied(&mut self) -> Result<(), CpuError> {
        let regs = &mut self.regs;
        match self.current.instruction {
            Instruction::Clc => regs.p.set_if(C, false),
            Instruction::Cld => regs.p.set_if(D, false),
            Instruction::Cli => regs.p.set_if(I, false),
            Instruction::Clv => regs.p.set_if(V, false),
            Instruction::Sec => regs.p.set_if(C, true),
            Instruction::Sed => regs.p.set_if(D, true),
            Instruction::Sei => regs.p.set_if(I, true),

            Instruction::Inx => regs.x = alu::step(&mut regs.p, regs.x, true),
            Instruction::Iny => regs.y = alu::step(&mut regs.p, regs.y, true),
            Instruction::Dex => regs.x = alu::step(&mut regs.p, regs.x, false),
            Instruction::Dey => regs.y = alu::step(&mut regs.p, regs.y, false),

            Instruction::Tax => {
                regs.x = regs.a;
                regs.p.update_nz(regs.x);
            }
            Instruction::Tay => {
                regs.y = regs.a;
                regs.p.update_nz(regs.y);
            }
            Instruction::Txa => {
                regs.a = regs.x;
                regs.p.update_nz(regs.a);
            }
            Instruction::Tya => {
                regs.a = regs.y;
                regs.p.update_nz(regs.a);
            }
            Instruction::Tsx => {
                regs.x = regs.s;
                regs.p.update_nz(regs.x);
            }
            Instruction::Txs => regs.s = regs.x,

            Instruction::Nop => {}
            Instruction::Hlt => {
                log::debug!("HLT at ${:04X}", self.opcode_pc);
                self.halted = true;
            }

            Instruction::Asl | Instruction::Lsr | Instruction::Rol | Instruction::Ror => {
                self.regs.a = self.modify(self.regs.a)?;
            }
            _ => return Err(self.unimplemented()),
        }
        Ok(())
    }

    fn branch_taken(&self) -> Result<bool, CpuError> {
        let p = self.regs.p;
        Ok(match self.current.instruction {
            Instruction::Bcc => !p.is_set(C),
            Instruction::Bcs => p.is_set(C),
            Instruction::Bne => !p.is_set(Z),
            Instruction::Beq => p.is_set(Z),
            Instruction::Bpl => !p.is_set(N),
            Instruction::Bmi => p.is_set(N),
            Instruction::Bvc => !p.is_set(V),
            Instruction::Bvs => p.is_set(V),
            _ => return Err(self.unimplemented()),
        })
    }
}
