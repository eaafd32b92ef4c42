//! Time and environment traps

use crate::config::Properties;
use crate::error::FatalError;
use crate::memory::Memory;
use crate::vm::stack::OperandStack;

pub fn sys_time(stack: &mut OperandStack) -> Result<(), FatalError> {
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0);
    stack.push_int(millis);
    Ok(())
}

pub fn gmt_time(stack: &mut OperandStack) -> Result<(), FatalError> {
    // No external calendar crate in the carried dependency stack; expose
    // raw UTC epoch seconds and let library code format it.
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    stack.push_int(secs);
    Ok(())
}

pub fn get_platform(stack: &mut OperandStack, memory: &Memory) -> Result<(), FatalError> {
    let mut heap = memory.heap.lock().unwrap();
    let r = crate::vm::exec::strings::alloc_string(&mut heap, std::env::consts::OS);
    stack.push_ref(Some(r));
    Ok(())
}

pub fn get_version(stack: &mut OperandStack, memory: &Memory) -> Result<(), FatalError> {
    let mut heap = memory.heap.lock().unwrap();
    let r = crate::vm::exec::strings::alloc_string(&mut heap, env!("CARGO_PKG_VERSION"));
    stack.push_ref(Some(r));
    Ok(())
}

pub fn get_sys_prop(stack: &mut OperandStack, memory: &Memory, properties: &Properties) -> Result<(), FatalError> {
    let key_ref = stack.pop_ref()?.ok_or(FatalError::NilDereference)?;
    let key = {
        let heap = memory.heap.lock().unwrap();
        crate::vm::exec::strings::read_string(&heap, key_ref)?
    };
    let value = properties.get(&key).unwrap_or_default();
    let mut heap = memory.heap.lock().unwrap();
    let r = crate::vm::exec::strings::alloc_string(&mut heap, &value);
    stack.push_ref(Some(r));
    Ok(())
}

pub fn set_sys_prop(stack: &mut OperandStack, memory: &Memory, properties: &Properties) -> Result<(), FatalError> {
    let value_ref = stack.pop_ref()?.ok_or(FatalError::NilDereference)?;
    let key_ref = stack.pop_ref()?.ok_or(FatalError::NilDereference)?;
    let heap = memory.heap.lock().unwrap();
    let key = crate::vm::exec::strings::read_string(&heap, key_ref)?;
    let value = crate::vm::exec::strings::read_string(&heap, value_ref)?;
    drop(heap);
    properties.set(&key, value);
    Ok(())
}
