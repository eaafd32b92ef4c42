//! Variable access and stack-shuffling instructions
//!
//! Locals, instance fields, and class-static slots are all `Word`, so
//! `LOAD_*`/`STOR_*`/`COPY_*` move a tagged value without caring whether it
//! happens to hold an int, a reference, or (packed into one `i64`) a
//! function pair — the source's three parallel opcode families per memory
//! context collapse to one body parameterized on `MemoryContext`.
//!
//! Function pairs are stored as a single `Word::Int` with the class id in
//! the high 32 bits and the method id in the low 32 bits, rather than as
//! two consecutive words: the
//! tagged `Word` already gives each slot "one word", so packing keeps that
//! property instead of reintroducing the source's two-word special case.

use crate::error::FatalError;
use crate::memory::class_memory::ClassMemory;
use crate::memory::heap::{Heap, HeapData};
use crate::program::{Instr, MemoryContext};
use crate::vm::frame::Frame;
use crate::vm::stack::{OperandStack, Word};

pub fn pack_func(class_id: i32, method_id: i32) -> i64 {
    ((class_id as i64) << 32) | (method_id as u32 as i64)
}

pub fn unpack_func(packed: i64) -> (i32, i32) {
    ((packed >> 32) as i32, packed as i32)
}

fn load_slot(ctx: MemoryContext, slot: i32, frame: &Frame, heap: &Heap, class_memory: &ClassMemory) -> Result<Word, FatalError> {
    match ctx {
        MemoryContext::Local => frame
            .locals
            .get(slot as usize)
            .copied()
            .ok_or_else(|| FatalError::Internal("local slot out of range".into())),
        MemoryContext::Instance => {
            let r = match frame.locals.first() {
                Some(Word::Ref(Some(r))) => *r,
                _ => return Err(FatalError::NilDereference),
            };
            match heap.get(r) {
                Some(HeapData::Object(inst)) => inst
                    .fields
                    .get(slot as usize)
                    .copied()
                    .ok_or_else(|| FatalError::Internal("instance slot out of range".into())),
                _ => Err(FatalError::Internal("receiver is not an object".into())),
            }
        }
        MemoryContext::Class => Ok(class_memory.load(frame.class_id, slot)),
    }
}

fn store_slot(
    ctx: MemoryContext,
    slot: i32,
    value: Word,
    frame: &mut Frame,
    heap: &mut Heap,
    class_memory: &ClassMemory,
) -> Result<(), FatalError> {
    match ctx {
        MemoryContext::Local => {
            if let Some(cell) = frame.locals.get_mut(slot as usize) {
                *cell = value;
                Ok(())
            } else {
                Err(FatalError::Internal("local slot out of range".into()))
            }
        }
        MemoryContext::Instance => {
            let r = match frame.locals.first() {
                Some(Word::Ref(Some(r))) => *r,
                _ => return Err(FatalError::NilDereference),
            };
            match heap.get_mut(r) {
                Some(HeapData::Object(inst)) => {
                    if let Some(cell) = inst.fields.get_mut(slot as usize) {
                        *cell = value;
                        Ok(())
                    } else {
                        Err(FatalError::Internal("instance slot out of range".into()))
                    }
                }
                _ => Err(FatalError::Internal("receiver is not an object".into())),
            }
        }
        MemoryContext::Class => {
            class_memory.store(frame.class_id, slot, value);
            Ok(())
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub fn exec(
    op: &Instr,
    stack: &mut OperandStack,
    frame: &mut Frame,
    heap: &mut Heap,
    class_memory: &ClassMemory,
) -> Result<bool, FatalError> {
    match op {
        Instr::LoadIntLit(v) => stack.push_int(*v),
        Instr::LoadCharLit(c) => stack.push_int(*c as i64),
        Instr::LoadFloatLit(v) => stack.push_float(*v),

        Instr::LoadVar { slot, ctx } | Instr::LoadFloatVar { slot, ctx } | Instr::LoadFuncVar { slot, ctx } => {
            stack.push_word(load_slot(*ctx, *slot, frame, heap, class_memory)?)
        }
        Instr::StorVar { slot, ctx } | Instr::StorFloatVar { slot, ctx } | Instr::StorFuncVar { slot, ctx } => {
            let value = stack.pop_word()?;
            store_slot(*ctx, *slot, value, frame, heap, class_memory)?
        }
        Instr::CopyVar { slot, ctx } | Instr::CopyFloatVar { slot, ctx } | Instr::CopyFuncVar { slot, ctx } => {
            let value = stack.pop_word()?;
            stack.push_word(value);
            store_slot(*ctx, *slot, value, frame, heap, class_memory)?
        }

        Instr::SwapInt => stack.swap_int()?,
        Instr::PopInt => {
            stack.pop_word()?;
        }
        Instr::PopFloat => {
            stack.pop_float()?;
        }
        _ => return Ok(false),
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn func_pair_round_trips_through_one_word() {
        let packed = pack_func(7, 3);
        assert_eq!(unpack_func(packed), (7, 3));
    }

    #[test]
    fn stor_then_load_local_round_trips() {
        let mut stack = OperandStack::new();
        let mut frame = Frame::new(0, 0, 2, Word::nil(), false);
        let heap = ClassMemory::new();
        let mut h = Heap::new(usize::MAX);
        stack.push_int(9);
        exec(
            &Instr::StorVar { slot: 1, ctx: MemoryContext::Local },
            &mut stack,
            &mut frame,
            &mut h,
            &heap,
        )
        .unwrap();
        exec(
            &Instr::LoadVar { slot: 1, ctx: MemoryContext::Local },
            &mut stack,
            &mut frame,
            &mut h,
            &heap,
        )
        .unwrap();
        assert_eq!(stack.pop_int().unwrap(), 9);
    }
}
