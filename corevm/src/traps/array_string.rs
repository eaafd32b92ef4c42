//! Array/string support traps

use crate::error::FatalError;
use crate::memory::heap::{ArrayElemKind, ArrayObject, ArrayPayload, HeapData};
use crate::memory::Memory;
use crate::program::Program;
use crate::vm::stack::{OperandStack, Word};

use super::Selector;

pub fn load_multi_ary_size(stack: &mut OperandStack, memory: &Memory) -> Result<(), FatalError> {
    let dim = stack.pop_int()?;
    let r = stack.pop_ref()?.ok_or(FatalError::NilDereference)?;
    let heap = memory.heap.lock().unwrap();
    let size = match heap.get(r) {
        Some(HeapData::Array(array)) => array.dim_sizes.get(dim as usize).copied().unwrap_or(0),
        _ => 0,
    };
    stack.push_int(size);
    Ok(())
}

/// Copy a constant-pool row (by index) into an already-allocated array
///
pub fn cpy_const_pool_ary(sel: Selector, stack: &mut OperandStack, memory: &Memory, program: &Program) -> Result<(), FatalError> {
    let dest = stack.pop_ref()?.ok_or(FatalError::NilDereference)?;
    let pool_index = stack.pop_int()? as usize;
    let mut heap = memory.heap.lock().unwrap();
    match sel {
        Selector::CpyCharStrAry => {
            let Some(text) = program.char_pool.get(pool_index).cloned() else {
                stack.push_bool(false);
                return Ok(());
            };
            if let Some(HeapData::Array(array)) = heap.get_mut(dest) {
                array.payload = ArrayPayload::Bytes(text.into_bytes());
                stack.push_bool(true);
            } else {
                stack.push_bool(false);
            }
        }
        Selector::CpyIntStrAry => {
            let Some(value) = program.int_pool.get(pool_index).copied() else {
                stack.push_bool(false);
                return Ok(());
            };
            if let Some(HeapData::Array(ArrayObject { payload: ArrayPayload::Words(words), .. })) = heap.get_mut(dest) {
                if let Some(slot) = words.first_mut() {
                    *slot = Word::Int(value);
                }
                stack.push_bool(true);
            } else {
                stack.push_bool(false);
            }
        }
        Selector::CpyFloatStrAry => {
            let Some(value) = program.float_pool.get(pool_index).copied() else {
                stack.push_bool(false);
                return Ok(());
            };
            if let Some(HeapData::Array(ArrayObject { payload: ArrayPayload::Floats(floats), .. })) = heap.get_mut(dest) {
                if let Some(slot) = floats.first_mut() {
                    *slot = value;
                }
                stack.push_bool(true);
            } else {
                stack.push_bool(false);
            }
        }
        _ => unreachable!("cpy_const_pool_ary called with wrong selector"),
    }
    Ok(())
}

pub fn zero_ary(sel: Selector, stack: &mut OperandStack, memory: &Memory) -> Result<(), FatalError> {
    let r = stack.pop_ref()?.ok_or(FatalError::NilDereference)?;
    let mut heap = memory.heap.lock().unwrap();
    if let Some(HeapData::Array(array)) = heap.get_mut(r) {
        match (sel, &mut array.payload) {
            (Selector::ZeroByteAry, ArrayPayload::Bytes(b)) => b.iter_mut().for_each(|x| *x = 0),
            (Selector::ZeroIntAry, ArrayPayload::Words(w)) => w.iter_mut().for_each(|x| *x = Word::Int(0)),
            (Selector::ZeroFloatAry, ArrayPayload::Floats(f)) => f.iter_mut().for_each(|x| *x = 0.0),
            _ => {}
        }
    }
    Ok(())
}

pub fn bytes_to_unicode(stack: &mut OperandStack, memory: &Memory) -> Result<(), FatalError> {
    let r = stack.pop_ref()?.ok_or(FatalError::NilDereference)?;
    let mut heap = memory.heap.lock().unwrap();
    let bytes = match heap.get(r) {
        Some(HeapData::Array(ArrayObject { elem_kind: ArrayElemKind::Byte, payload: ArrayPayload::Bytes(b), .. })) => b.clone(),
        _ => return Err(FatalError::Internal("expected byte array".into())),
    };
    let text = String::from_utf8_lossy(&bytes).into_owned();
    let out = crate::vm::exec::strings::alloc_string(&mut heap, &text);
    drop(heap);
    stack.push_ref(Some(out));
    Ok(())
}

pub fn unicode_to_bytes(stack: &mut OperandStack, memory: &Memory) -> Result<(), FatalError> {
    let r = stack.pop_ref()?.ok_or(FatalError::NilDereference)?;
    let heap = memory.heap.lock().unwrap();
    let text = crate::vm::exec::strings::read_string(&heap, r)?;
    drop(heap);
    let bytes = text.into_bytes();
    let mut heap = memory.heap.lock().unwrap();
    let out = heap.allocate_array(bytes.len() as i64, vec![bytes.len() as i64], ArrayElemKind::Byte);
    if let Some(HeapData::Array(array)) = heap.get_mut(out) {
        array.payload = ArrayPayload::Bytes(bytes);
    }
    drop(heap);
    stack.push_ref(Some(out));
    Ok(())
}
