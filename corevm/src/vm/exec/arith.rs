//! Integer/float arithmetic, comparisons, and scalar conversions
//!

use crate::error::FatalError;
use crate::program::Instr;
use crate::vm::stack::OperandStack;

pub fn exec(op: &Instr, stack: &mut OperandStack) -> Result<bool, FatalError> {
    match op {
        Instr::AddInt => binop_int(stack, |a, b| Ok(a.wrapping_add(b)))?,
        Instr::SubInt => binop_int(stack, |a, b| Ok(a.wrapping_sub(b)))?,
        Instr::MulInt => binop_int(stack, |a, b| Ok(a.wrapping_mul(b)))?,
        Instr::DivInt => binop_int(stack, |a, b| {
            if b == 0 {
                Err(FatalError::DivisionByZero)
            } else {
                Ok(a.wrapping_div(b))
            }
        })?,
        Instr::ModInt => binop_int(stack, |a, b| {
            if b == 0 {
                Err(FatalError::DivisionByZero)
            } else {
                Ok(a.wrapping_rem(b))
            }
        })?,
        Instr::BitAndInt => binop_int(stack, |a, b| Ok(a & b))?,
        Instr::BitOrInt => binop_int(stack, |a, b| Ok(a | b))?,
        Instr::BitXorInt => binop_int(stack, |a, b| Ok(a ^ b))?,
        Instr::ShlInt => binop_int(stack, |a, b| Ok(a.wrapping_shl(b as u32)))?,
        Instr::ShrInt => binop_int(stack, |a, b| Ok(a.wrapping_shr(b as u32)))?,
        Instr::AndInt => binop_int(stack, |a, b| Ok(((a != 0) && (b != 0)) as i64))?,
        Instr::OrInt => binop_int(stack, |a, b| Ok(((a != 0) || (b != 0)) as i64))?,
        Instr::EqlInt => binop_int(stack, |a, b| Ok((a == b) as i64))?,
        Instr::NeqlInt => binop_int(stack, |a, b| Ok((a != b) as i64))?,
        Instr::LesInt => binop_int(stack, |a, b| Ok((a < b) as i64))?,
        Instr::GtrInt => binop_int(stack, |a, b| Ok((a > b) as i64))?,
        Instr::LesEqlInt => binop_int(stack, |a, b| Ok((a <= b) as i64))?,
        Instr::GtrEqlInt => binop_int(stack, |a, b| Ok((a >= b) as i64))?,

        Instr::AddFloat => binop_float(stack, |a, b| a + b)?,
        Instr::SubFloat => binop_float(stack, |a, b| a - b)?,
        Instr::MulFloat => binop_float(stack, |a, b| a * b)?,
        Instr::DivFloat => binop_float(stack, |a, b| a / b)?,
        Instr::EqlFloat => cmp_float(stack, |a, b| a == b)?,
        Instr::NeqlFloat => cmp_float(stack, |a, b| a != b)?,
        Instr::LesFloat => cmp_float(stack, |a, b| a < b)?,
        Instr::GtrFloat => cmp_float(stack, |a, b| a > b)?,
        Instr::LesEqlFloat => cmp_float(stack, |a, b| a <= b)?,
        Instr::GtrEqlFloat => cmp_float(stack, |a, b| a >= b)?,

        Instr::I2f => {
            let v = stack.pop_int()?;
            stack.push_float(v as f64);
        }
        Instr::F2i => {
            let v = stack.pop_float()?;
            stack.push_int(v as i64);
        }
        _ => return Ok(false),
    }
    Ok(true)
}

fn binop_int(stack: &mut OperandStack, f: impl FnOnce(i64, i64) -> Result<i64, FatalError>) -> Result<(), FatalError> {
    let b = stack.pop_int()?;
    let a = stack.pop_int()?;
    stack.push_int(f(a, b)?);
    Ok(())
}

fn binop_float(stack: &mut OperandStack, f: impl FnOnce(f64, f64) -> f64) -> Result<(), FatalError> {
    let b = stack.pop_float()?;
    let a = stack.pop_float()?;
    stack.push_float(f(a, b));
    Ok(())
}

fn cmp_float(stack: &mut OperandStack, f: impl FnOnce(f64, f64) -> bool) -> Result<(), FatalError> {
    let b = stack.pop_float()?;
    let a = stack.pop_float()?;
    stack.push_bool(f(a, b));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_int_pops_two_pushes_sum() {
        let mut s = OperandStack::new();
        s.push_int(2);
        s.push_int(3);
        assert!(exec(&Instr::AddInt, &mut s).unwrap());
        assert_eq!(s.pop_int().unwrap(), 5);
    }

    #[test]
    fn div_int_by_zero_is_fatal() {
        let mut s = OperandStack::new();
        s.push_int(1);
        s.push_int(0);
        assert!(matches!(exec(&Instr::DivInt, &mut s), Err(FatalError::DivisionByZero)));
    }
}
