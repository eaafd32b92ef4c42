//! Array creation and indexed access
//!
//! Multi-dimensional arrays store every dimension's size in `dim_sizes`
//! (not just the outermost, as the source's three-word prologue does) so
//! `LOAD_ARY_ELM`/`STOR_ARY_ELM` can compute a flat row-major offset for any
//! dimension count rather than special-casing 1-D/2-D and falling back to
//! pointer arithmetic beyond that (an original_source-derived refinement:
//! the source's `StackInstr` comments note arrays beyond two dimensions are
//! walked as nested single-dimension arrays; flattening avoids that nesting
//! trick entirely).

use crate::error::FatalError;
use crate::memory::heap::{ArrayElemKind as HeapElemKind, ArrayPayload, Heap, HeapData};
use crate::program::{ArrayElemKind as InstrElemKind, Instr};
use crate::vm::stack::{OperandStack, Word};

fn to_heap_kind(k: InstrElemKind) -> HeapElemKind {
    match k {
        InstrElemKind::Byte => HeapElemKind::Byte,
        InstrElemKind::Char => HeapElemKind::Char,
        InstrElemKind::Int => HeapElemKind::Int,
        InstrElemKind::Float => HeapElemKind::Float,
    }
}

fn pop_dims(stack: &mut OperandStack, dims: u32) -> Result<Vec<i64>, FatalError> {
    let mut sizes = Vec::with_capacity(dims as usize);
    for _ in 0..dims {
        sizes.push(stack.pop_int()?);
    }
    sizes.reverse();
    Ok(sizes)
}

fn flat_index(dim_sizes: &[i64], indices: &[i64], total_count: i64) -> Result<usize, FatalError> {
    let mut offset: i64 = 0;
    for (size, idx) in dim_sizes.iter().zip(indices.iter()) {
        if *idx < 0 || *idx >= *size {
            return Err(FatalError::ArrayBoundsViolation { index: *idx, size: *size });
        }
        offset = offset * size + idx;
    }
    if offset < 0 || offset >= total_count {
        return Err(FatalError::ArrayBoundsViolation { index: offset, size: total_count });
    }
    Ok(offset as usize)
}

pub fn exec(op: &Instr, stack: &mut OperandStack, heap: &mut Heap) -> Result<bool, FatalError> {
    match op {
        Instr::NewByteAry { dims } | Instr::NewCharAry { dims } | Instr::NewIntAry { dims } | Instr::NewFloatAry { dims } => {
            let kind = match op {
                Instr::NewByteAry { .. } => HeapElemKind::Byte,
                Instr::NewCharAry { .. } => HeapElemKind::Char,
                Instr::NewIntAry { .. } => HeapElemKind::Int,
                Instr::NewFloatAry { .. } => HeapElemKind::Float,
                _ => unreachable!(),
            };
            let dim_sizes = pop_dims(stack, *dims)?;
            let total: i64 = dim_sizes.iter().product();
            let r = heap.allocate_array(total, dim_sizes, kind);
            stack.push_ref(Some(r));
        }
        Instr::LoadAryElm { elem, dims, .. } => {
            let indices = pop_dims(stack, *dims)?;
            let r = stack.pop_ref()?.ok_or(FatalError::NilDereference)?;
            let want_kind = to_heap_kind(*elem);
            match heap.get(r) {
                Some(HeapData::Array(array)) if array.elem_kind == want_kind => {
                    let idx = flat_index(&array.dim_sizes, &indices, array.total_count)?;
                    match &array.payload {
                        ArrayPayload::Bytes(b) => stack.push_int(b[idx] as i64),
                        ArrayPayload::Words(w) => stack.push_word(w[idx]),
                        ArrayPayload::Floats(f) => stack.push_float(f[idx]),
                    }
                }
                Some(_) => return Err(FatalError::Internal("array element kind mismatch".into())),
                None => return Err(FatalError::NilDereference),
            }
        }
        Instr::StorAryElm { elem, dims, .. } => {
            let value = stack.pop_word()?;
            let indices = pop_dims(stack, *dims)?;
            let r = stack.pop_ref()?.ok_or(FatalError::NilDereference)?;
            let want_kind = to_heap_kind(*elem);
            match heap.get_mut(r) {
                Some(HeapData::Array(array)) if array.elem_kind == want_kind => {
                    let idx = flat_index(&array.dim_sizes, &indices, array.total_count)?;
                    match &mut array.payload {
                        ArrayPayload::Bytes(b) => {
                            b[idx] = match value {
                                Word::Int(v) => v as u8,
                                _ => return Err(FatalError::Internal("expected byte-like value".into())),
                            }
                        }
                        ArrayPayload::Words(w) => w[idx] = value,
                        ArrayPayload::Floats(f) => {
                            f[idx] = match value {
                                Word::Float(v) => v,
                                Word::Int(v) => v as f64,
                                _ => return Err(FatalError::Internal("expected float value".into())),
                            }
                        }
                    }
                }
                Some(_) => return Err(FatalError::Internal("array element kind mismatch".into())),
                None => return Err(FatalError::NilDereference),
            }
        }
        _ => return Ok(false),
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_int_array_then_store_then_load() {
        let mut heap = Heap::new(usize::MAX);
        let mut stack = OperandStack::new();
        stack.push_int(4);
        exec(&Instr::NewIntAry { dims: 1 }, &mut stack, &mut heap).unwrap();
        let r = stack.pop_ref().unwrap();

        stack.push_ref(r);
        stack.push_int(2);
        stack.push_int(42);
        exec(
            &Instr::StorAryElm { elem: InstrElemKind::Int, dims: 1, ctx: crate::program::MemoryContext::Local },
            &mut stack,
            &mut heap,
        )
        .unwrap();

        stack.push_ref(r);
        stack.push_int(2);
        exec(
            &Instr::LoadAryElm { elem: InstrElemKind::Int, dims: 1, ctx: crate::program::MemoryContext::Local },
            &mut stack,
            &mut heap,
        )
        .unwrap();
        assert_eq!(stack.pop_int().unwrap(), 42);
    }

    #[test]
    fn out_of_bounds_index_is_fatal() {
        let mut heap = Heap::new(usize::MAX);
        let mut stack = OperandStack::new();
        stack.push_int(2);
        exec(&Instr::NewIntAry { dims: 1 }, &mut stack, &mut heap).unwrap();
        let r = stack.pop_ref().unwrap();

        stack.push_ref(r);
        stack.push_int(9);
        let err = exec(
            &Instr::LoadAryElm { elem: InstrElemKind::Int, dims: 1, ctx: crate::program::MemoryContext::Local },
            &mut stack,
            &mut heap,
        )
        .unwrap_err();
        assert!(matches!(err, FatalError::ArrayBoundsViolation { index: 9, size: 2 }));
    }
}
