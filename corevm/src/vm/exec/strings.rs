//! Scalar/string conversions. Strings are represented on the heap as
//! `Char`-element arrays of UTF-8 bytes.

use crate::error::FatalError;
use crate::memory::heap::{ArrayElemKind, ArrayObject, ArrayPayload, Heap, HeapData};
use crate::program::Instr;
use crate::vm::stack::OperandStack;

pub fn exec(op: &Instr, stack: &mut OperandStack, heap: &mut Heap) -> Result<bool, FatalError> {
    match op {
        Instr::S2i => {
            let text = pop_string(stack, heap)?;
            let v: i64 = text.trim().parse().unwrap_or(0);
            stack.push_int(v);
        }
        Instr::S2f => {
            let text = pop_string(stack, heap)?;
            let v: f64 = text.trim().parse().unwrap_or(0.0);
            stack.push_float(v);
        }
        Instr::I2s => {
            let v = stack.pop_int()?;
            let r = alloc_string(heap, &v.to_string());
            stack.push_ref(Some(r));
        }
        Instr::F2s => {
            let v = stack.pop_float()?;
            let r = alloc_string(heap, &v.to_string());
            stack.push_ref(Some(r));
        }
        _ => return Ok(false),
    }
    Ok(true)
}

fn pop_string(stack: &mut OperandStack, heap: &Heap) -> Result<String, FatalError> {
    let r = stack.pop_ref()?.ok_or(FatalError::NilDereference)?;
    read_string(heap, r)
}

pub fn read_string(heap: &Heap, r: crate::memory::heap::HeapRef) -> Result<String, FatalError> {
    match heap.get(r) {
        Some(HeapData::Array(ArrayObject {
            elem_kind: ArrayElemKind::Char,
            payload: ArrayPayload::Bytes(bytes),
            ..
        })) => Ok(String::from_utf8_lossy(bytes).into_owned()),
        _ => Err(FatalError::Internal("expected char array for string conversion".into())),
    }
}

pub fn alloc_string(heap: &mut Heap, text: &str) -> crate::memory::heap::HeapRef {
    let bytes = text.as_bytes();
    let r = heap.allocate_array(bytes.len() as i64, vec![bytes.len() as i64], ArrayElemKind::Char);
    if let Some(HeapData::Array(array)) = heap.get_mut(r) {
        array.payload = ArrayPayload::Bytes(bytes.to_vec());
    }
    r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_to_string_and_back() {
        let mut heap = Heap::new(usize::MAX);
        let mut stack = OperandStack::new();
        stack.push_int(42);
        exec(&Instr::I2s, &mut stack, &mut heap).unwrap();
        exec(&Instr::S2i, &mut stack, &mut heap).unwrap();
        assert_eq!(stack.pop_int().unwrap(), 42);
    }
}
