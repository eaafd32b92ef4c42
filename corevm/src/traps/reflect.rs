//! Reflection traps
//!
//! `LOAD_CLS_BY_INST`'s full `System.Introspection.Class` graph
//! materialization needs a bootstrapped introspection class hierarchy from
//! the loader; until that's wired up it reports a nil graph rather than
//! fabricating one, following the same recoverable-failure contract as
//! every other trap.

use crate::error::FatalError;
use crate::memory::heap::HeapData;
use crate::memory::Memory;
use crate::program::Program;
use crate::vm::stack::OperandStack;

pub fn load_cls_inst_id(stack: &mut OperandStack, memory: &Memory) -> Result<(), FatalError> {
    let r = stack.pop_ref()?;
    let id = match r {
        Some(r) => {
            let heap = memory.heap.lock().unwrap();
            match heap.get(r) {
                Some(HeapData::Object(inst)) => inst.class_id,
                _ => -1,
            }
        }
        None => -1,
    };
    stack.push_int(id as i64);
    Ok(())
}

pub fn load_new_obj_inst(stack: &mut OperandStack, memory: &Memory, program: &Program) -> Result<(), FatalError> {
    let name_ref = stack.pop_ref()?.ok_or(FatalError::NilDereference)?;
    let name = {
        let heap = memory.heap.lock().unwrap();
        crate::vm::exec::strings::read_string(&heap, name_ref)?
    };
    match program.get_class_by_name(&name) {
        Some(class) => {
            let mut heap = memory.heap.lock().unwrap();
            let r = heap.allocate_object(class.id, class.instance_space);
            stack.push_ref(Some(r));
        }
        None => stack.push_ref(None),
    }
    Ok(())
}
