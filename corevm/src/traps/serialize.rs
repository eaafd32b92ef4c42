//! Serialization traps
//!
//! Each `SERL_*` trap pops the value to encode and pushes a fresh byte
//! array holding the wire form from [`crate::serialize`]; each `DESERL_*`
//! trap pops a byte array and reconstructs the value, pushing new heap
//! allocations onto the live operand stack as it walks the graph so they
//! are GC roots for the rest of the decode. Malformed input is a
//! recoverable trap failure (push zero/nil); an unresolvable class name is
//! fatal.

use crate::error::FatalError;
use crate::memory::heap::{ArrayElemKind, ArrayObject, ArrayPayload, HeapData, HeapRef};
use crate::memory::Memory;
use crate::program::Program;
use crate::serialize::{decode_value, encode_value, DecodeError, SerialKind, SerialValue};
use crate::vm::stack::OperandStack;

fn alloc_bytes(memory: &Memory, bytes: &[u8]) -> HeapRef {
    let mut heap = memory.heap.lock().unwrap();
    let r = heap.allocate_array(bytes.len() as i64, vec![bytes.len() as i64], ArrayElemKind::Byte);
    if let Some(HeapData::Array(array)) = heap.get_mut(r) {
        array.payload = ArrayPayload::Bytes(bytes.to_vec());
    }
    r
}

fn read_bytes(memory: &Memory, r: HeapRef) -> Option<Vec<u8>> {
    let heap = memory.heap.lock().unwrap();
    match heap.get(r) {
        Some(HeapData::Array(ArrayObject {
            elem_kind: ArrayElemKind::Byte,
            payload: ArrayPayload::Bytes(bytes),
            ..
        })) => Some(bytes.clone()),
        _ => None,
    }
}

fn encode_and_push(stack: &mut OperandStack, memory: &Memory, program: &Program, value: SerialValue) {
    let bytes = {
        let heap = memory.heap.lock().unwrap();
        encode_value(program, &heap, value)
    };
    stack.push_ref(Some(alloc_bytes(memory, &bytes)));
}

pub fn serl_char(stack: &mut OperandStack, memory: &Memory, program: &Program) -> Result<(), FatalError> {
    let v = stack.pop_int()?;
    encode_and_push(stack, memory, program, SerialValue::Char(v));
    Ok(())
}

pub fn serl_int(stack: &mut OperandStack, memory: &Memory, program: &Program) -> Result<(), FatalError> {
    let v = stack.pop_int()?;
    encode_and_push(stack, memory, program, SerialValue::Int(v));
    Ok(())
}

pub fn serl_float(stack: &mut OperandStack, memory: &Memory, program: &Program) -> Result<(), FatalError> {
    let v = stack.pop_float()?;
    encode_and_push(stack, memory, program, SerialValue::Float(v));
    Ok(())
}

macro_rules! serl_ref_trap {
    ($name:ident, $variant:ident) => {
        pub fn $name(stack: &mut OperandStack, memory: &Memory, program: &Program) -> Result<(), FatalError> {
            let r = stack.pop_ref()?;
            encode_and_push(stack, memory, program, SerialValue::$variant(r));
            Ok(())
        }
    };
}

serl_ref_trap!(serl_obj_inst, ObjInst);
serl_ref_trap!(serl_byte_ary, ByteAry);
serl_ref_trap!(serl_char_ary, CharAry);
serl_ref_trap!(serl_int_ary, IntAry);
serl_ref_trap!(serl_float_ary, FloatAry);
serl_ref_trap!(serl_obj_ary, ObjAry);

/// Pop the serialized-bytes array and run the decoder, or push a
/// recoverable zero/nil result if it's missing or malformed.
fn decode_or_recover(
    stack: &mut OperandStack,
    memory: &Memory,
    program: &Program,
    kind: SerialKind,
) -> Result<Option<SerialValue>, FatalError> {
    let Some(src) = stack.pop_ref()? else {
        return Ok(None);
    };
    let Some(bytes) = read_bytes(memory, src) else {
        return Ok(None);
    };
    let mut heap = memory.heap.lock().unwrap();
    match decode_value(program, &mut heap, stack, kind, &bytes) {
        Ok(v) => Ok(Some(v)),
        Err(DecodeError::Malformed) => Ok(None),
        Err(DecodeError::Fatal(e)) => Err(e),
    }
}

pub fn deserl_char(stack: &mut OperandStack, memory: &Memory, program: &Program) -> Result<(), FatalError> {
    match decode_or_recover(stack, memory, program, SerialKind::Char)? {
        Some(SerialValue::Char(v)) => stack.push_int(v),
        _ => stack.push_int(0),
    }
    Ok(())
}

pub fn deserl_int(stack: &mut OperandStack, memory: &Memory, program: &Program) -> Result<(), FatalError> {
    match decode_or_recover(stack, memory, program, SerialKind::Int)? {
        Some(SerialValue::Int(v)) => stack.push_int(v),
        _ => stack.push_int(0),
    }
    Ok(())
}

pub fn deserl_float(stack: &mut OperandStack, memory: &Memory, program: &Program) -> Result<(), FatalError> {
    match decode_or_recover(stack, memory, program, SerialKind::Float)? {
        Some(SerialValue::Float(v)) => stack.push_float(v),
        _ => stack.push_float(0.0),
    }
    Ok(())
}

macro_rules! deserl_ref_trap {
    ($name:ident, $kind:ident, $variant:ident) => {
        pub fn $name(stack: &mut OperandStack, memory: &Memory, program: &Program) -> Result<(), FatalError> {
            match decode_or_recover(stack, memory, program, SerialKind::$kind)? {
                Some(SerialValue::$variant(r)) => stack.push_ref(r),
                _ => stack.push_ref(None),
            }
            Ok(())
        }
    };
}

deserl_ref_trap!(deserl_obj_inst, ObjInst, ObjInst);
deserl_ref_trap!(deserl_byte_ary, ByteAry, ByteAry);
deserl_ref_trap!(deserl_char_ary, CharAry, CharAry);
deserl_ref_trap!(deserl_int_ary, IntAry, IntAry);
deserl_ref_trap!(deserl_float_ary, FloatAry, FloatAry);
deserl_ref_trap!(deserl_obj_ary, ObjAry, ObjAry);
