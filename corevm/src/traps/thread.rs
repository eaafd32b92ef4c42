//! Thread-control traps
//!
//! `ASYNC_MTHD_CALL` itself is an interpreter instruction, not a trap (it
//! spawns directly off the operand stack — see
//! [`crate::vm::Interpreter::dispatch_async_call`]); these two traps are
//! the only other bytecode-visible points of contact with
//! [`crate::thread::ThreadRegistry`].

use crate::error::FatalError;
use crate::thread::{sleep_millis, ThreadRegistry};
use crate::vm::stack::OperandStack;

pub fn thread_join(stack: &mut OperandStack, threads: &ThreadRegistry) -> Result<(), FatalError> {
    let id = stack.pop_int()?;
    threads.join(id);
    Ok(())
}

pub fn thread_sleep(stack: &mut OperandStack) -> Result<(), FatalError> {
    let millis = stack.pop_int()?;
    sleep_millis(millis.max(0) as u64);
    Ok(())
}
