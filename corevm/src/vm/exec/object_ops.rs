//! Object allocation, casts, and runtime type checks

use crate::error::FatalError;
use crate::memory::heap::{Heap, HeapData};
use crate::program::{Instr, Program};
use crate::vm::stack::{OperandStack, Word};

pub fn exec(op: &Instr, stack: &mut OperandStack, heap: &mut Heap, program: &Program) -> Result<bool, FatalError> {
    match op {
        Instr::NewObjInst { class_id } => {
            let class = program
                .get_class(*class_id)
                .ok_or_else(|| FatalError::Internal(format!("unknown class id {class_id}")))?;
            let r = heap.allocate_object(*class_id, class.instance_space);
            stack.push_ref(Some(r));
        }
        Instr::NewFuncInst => {
            // A function instance is a bare function-pair value; the
            // class/method pair is already packed into the popped word by
            // the preceding LOAD_FUNC_VAR, so this is a pass-through marker
            // kept only so the instruction stream round-trips losslessly.
        }
        Instr::ObjInstCast { target_class_id } => {
            let r = stack.pop_ref()?;
            match r {
                None => stack.push_ref(None),
                Some(r) => {
                    let class_id = match heap.get(r) {
                        Some(HeapData::Object(inst)) => inst.class_id,
                        _ => return Err(FatalError::Internal("cast target is not an object".into())),
                    };
                    let class = program
                        .get_class(class_id)
                        .ok_or_else(|| FatalError::Internal(format!("unknown class id {class_id}")))?;
                    if class.is_a(*target_class_id, &program.classes) {
                        stack.push_ref(Some(r));
                    } else {
                        return Err(FatalError::InvalidCast { from: class_id, to: *target_class_id });
                    }
                }
            }
        }
        Instr::ObjTypeOf { target_class_id } => {
            let r = stack.pop_ref()?;
            let result = match r {
                None => false,
                Some(r) => match heap.get(r) {
                    Some(HeapData::Object(inst)) => program
                        .get_class(inst.class_id)
                        .map(|c| c.is_a(*target_class_id, &program.classes))
                        .unwrap_or(false),
                    _ => false,
                },
            };
            stack.push_word(Word::Int(result as i64));
        }
        _ => return Ok(false),
    }
    Ok(true)
}
