//! Compression/checksum traps, backed by the
//! same `flate2`/`crc32fast` pair the image codec uses (`image::codec`).

use crate::error::FatalError;
use crate::memory::heap::{ArrayElemKind, ArrayObject, ArrayPayload, HeapData};
use crate::memory::Memory;
use crate::vm::stack::OperandStack;

fn read_bytes(memory: &Memory, r: crate::memory::heap::HeapRef) -> Result<Vec<u8>, FatalError> {
    let heap = memory.heap.lock().unwrap();
    match heap.get(r) {
        Some(HeapData::Array(ArrayObject {
            elem_kind: ArrayElemKind::Byte,
            payload: ArrayPayload::Bytes(bytes),
            ..
        })) => Ok(bytes.clone()),
        _ => Err(FatalError::Internal("expected byte array".into())),
    }
}

fn alloc_bytes(memory: &Memory, bytes: &[u8]) -> crate::memory::heap::HeapRef {
    let mut heap = memory.heap.lock().unwrap();
    let r = heap.allocate_array(bytes.len() as i64, vec![bytes.len() as i64], ArrayElemKind::Byte);
    if let Some(HeapData::Array(array)) = heap.get_mut(r) {
        array.payload = ArrayPayload::Bytes(bytes.to_vec());
    }
    r
}

pub fn compress_bytes(stack: &mut OperandStack, memory: &Memory) -> Result<(), FatalError> {
    let r = stack.pop_ref()?.ok_or(FatalError::NilDereference)?;
    match read_bytes(memory, r).and_then(|b| crate::image::codec::compress(&b)) {
        Ok(compressed) => stack.push_ref(Some(alloc_bytes(memory, &compressed))),
        Err(_) => stack.push_ref(None),
    }
    Ok(())
}

pub fn uncompress_bytes(stack: &mut OperandStack, memory: &Memory) -> Result<(), FatalError> {
    let r = stack.pop_ref()?.ok_or(FatalError::NilDereference)?;
    match read_bytes(memory, r).and_then(|b| crate::image::codec::decompress(&b)) {
        Ok(raw) => stack.push_ref(Some(alloc_bytes(memory, &raw))),
        Err(_) => stack.push_ref(None),
    }
    Ok(())
}

pub fn crc32_bytes(stack: &mut OperandStack, memory: &Memory) -> Result<(), FatalError> {
    let r = stack.pop_ref()?.ok_or(FatalError::NilDereference)?;
    match read_bytes(memory, r) {
        Ok(bytes) => stack.push_int(crc32fast::hash(&bytes) as i64),
        Err(_) => stack.push_int(0),
    }
    Ok(())
}
