//! Arithmetic and logic on values and the status register.
//!
//! Free functions so the micro-op engine and the exhaustive tests share one
//! definition of every flag rule.

use crate::Status;
use crate::flags::{C, D, N, V, Z};

pub(crate) fn adc(p: &mut Status, a: u8, operand: u8) -> u8 {
    if p.is_set(D) {
        adc_decimal(p, a, operand)
    } else {
        add_binary(p, a, operand)
    }
}

/// `SBC` is `ADC` of the one's complement in binary mode.
pub(crate) fn sbc(p: &mut Status, a: u8, operand: u8) -> u8 {
    if p.is_set(D) {
        sbc_decimal(p, a, operand)
    } else {
        add_binary(p, a, !operand)
    }
}

fn add_binary(p: &mut Status, a: u8, operand: u8) -> u8 {
    let sum = u16::from(a) + u16::from(operand) + u16::from(p.carry());
    let result = sum as u8;
    p.set_if(C, sum > 0xFF);
    p.set_if(V, (a ^ result) & (operand ^ result) & 0x80 != 0);
    p.update_nz(result);
    result
}

/// NMOS decimal add: Z from the binary sum, N and V from the intermediate
/// high nibble.
fn adc_decimal(p: &mut Status, a: u8, operand: u8) -> u8 {
    let carry = p.carry();
    let binary = a.wrapping_add(operand).wrapping_add(carry);

    let mut lo = (a & 0x0F) + (operand & 0x0F) + carry;
    if lo > 9 {
        lo += 6;
    }
    let mut hi = (a >> 4) + (operand >> 4) + u8::from(lo > 0x0F);

    p.set_if(Z, binary == 0);
    p.set_if(N, hi & 0x08 != 0);
    let intermediate = (hi << 4) | (lo & 0x0F);
    p.set_if(V, (a ^ intermediate) & !(a ^ operand) & 0x80 != 0);

    if hi > 9 {
        hi += 6;
    }
    p.set_if(C, hi > 0x0F);
    (hi << 4) | (lo & 0x0F)
}

/// NMOS decimal subtract: every flag follows the binary result.
fn sbc_decimal(p: &mut Status, a: u8, operand: u8) -> u8 {
    let borrow = i16::from(1 - p.carry());
    let binary = i16::from(a) - i16::from(operand) - borrow;

    p.set_if(C, binary >= 0);
    p.update_nz(binary as u8);
    p.set_if(V, (i16::from(a) ^ binary) & (i16::from(a) ^ i16::from(operand)) & 0x80 != 0);

    let mut lo = i16::from(a & 0x0F) - i16::from(operand & 0x0F) - borrow;
    let mut hi = i16::from(a >> 4) - i16::from(operand >> 4);
    if lo < 0 {
        lo -= 6;
        hi -= 1;
    }
    if hi < 0 {
        hi -= 6;
    }
    ((hi << 4) as u8) | ((lo & 0x0F) as u8)
}

/// CMP, CPX and CPY.
pub(crate) fn compare(p: &mut Status, register: u8, operand: u8) {
    p.set_if(C, register >= operand);
    p.update_nz(register.wrapping_sub(operand));
}

pub(crate) fn bit(p: &mut Status, a: u8, operand: u8) {
    p.set_if(Z, a & operand == 0);
    p.set_if(N, operand & 0x80 != 0);
    p.set_if(V, operand & 0x40 != 0);
}

pub(crate) fn asl(p: &mut Status, value: u8) -> u8 {
    shift(p, value & 0x80 != 0, value << 1)
}

pub(crate) fn lsr(p: &mut Status, value: u8) -> u8 {
    shift(p, value & 0x01 != 0, value >> 1)
}

pub(crate) fn rol(p: &mut Status, value: u8) -> u8 {
    let carry_in = p.carry();
    shift(p, value & 0x80 != 0, (value << 1) | carry_in)
}

pub(crate) fn ror(p: &mut Status, value: u8) -> u8 {
    let carry_in = p.carry() << 7;
    shift(p, value & 0x01 != 0, (value >> 1) | carry_in)
}

fn shift(p: &mut Status, carry_out: bool, result: u8) -> u8 {
    p.set_if(C, carry_out);
    p.update_nz(result);
    result
}

/// INC, DEC and the register increments.
pub(crate) fn step(p: &mut Status, value: u8, up: bool) -> u8 {
    let result = if up {
        value.wrapping_add(1)
    } else {
        value.wrapping_sub(1)
    };
    p.update_nz(result);
    result
}
