//! Standard stream traps

use std::io::Write;

use crate::error::FatalError;
use crate::memory::Memory;
use crate::vm::stack::OperandStack;

use super::Selector;

pub fn std_out_scalar(sel: Selector, stack: &mut OperandStack) -> Result<(), FatalError> {
    match sel {
        Selector::StdOutBool => print!("{}", stack.pop_bool()?),
        Selector::StdOutByte => print!("{}", stack.pop_int()? as u8),
        Selector::StdOutChar => {
            let v = stack.pop_int()?;
            print!("{}", char::from_u32(v as u32).unwrap_or('\u{FFFD}'));
        }
        Selector::StdOutInt => print!("{}", stack.pop_int()?),
        Selector::StdOutFloat => print!("{}", stack.pop_float()?),
        _ => unreachable!("std_out_scalar called with non-scalar selector"),
    }
    Ok(())
}

pub fn std_err_scalar(sel: Selector, stack: &mut OperandStack) -> Result<(), FatalError> {
    match sel {
        Selector::StdErrBool => eprint!("{}", stack.pop_bool()?),
        Selector::StdErrInt => eprint!("{}", stack.pop_int()?),
        _ => unreachable!("std_err_scalar called with non-scalar selector"),
    }
    Ok(())
}

pub fn std_out_char_ary(stack: &mut OperandStack, memory: &Memory) -> Result<(), FatalError> {
    let r = stack.pop_ref()?.ok_or(FatalError::NilDereference)?;
    let heap = memory.heap.lock().unwrap();
    let text = crate::vm::exec::strings::read_string(&heap, r)?;
    print!("{text}");
    Ok(())
}

pub fn std_in_string(stack: &mut OperandStack, memory: &Memory) -> Result<(), FatalError> {
    let mut line = String::new();
    let r = match std::io::stdin().read_line(&mut line) {
        Ok(_) => {
            let trimmed = line.trim_end_matches(['\n', '\r']);
            let mut heap = memory.heap.lock().unwrap();
            Some(crate::vm::exec::strings::alloc_string(&mut heap, trimmed))
        }
        Err(_) => None,
    };
    stack.push_ref(r);
    Ok(())
}

pub fn std_flush() {
    let _ = std::io::stdout().flush();
}
