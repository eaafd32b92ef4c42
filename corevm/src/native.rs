//! Hook for an architecture-specific JIT back-end
//!
//! The source compiles one JIT implementation per target triple and
//! dispatches to it through a function pointer installed on first call.
//! This crate instead names the seam as a trait: any back-end that can
//! implement [`NativeBackend`] plugs into [`crate::vm::Interpreter`]
//! without the interpreter knowing which architecture it targets. No
//! implementation ships here — compiling machine code is out of scope —
//! but the interpreter always checks [`Method::native_entry`] before
//! falling back to bytecode dispatch, so a future crate can supply one.

use crate::error::FatalError;
use crate::memory::Memory;
use crate::program::{MethodId, NativeEntry, Program};
use crate::vm::stack::Word;

pub trait NativeBackend: Send + Sync {
    /// Compile `method` and return the entry point handle to install on
    /// its `Method::native_entry`, or `None` if this back-end declines
    /// (e.g. the method uses a construct it doesn't support).
    fn compile(&self, class_id: crate::program::ClassId, method_id: MethodId, program: &Program) -> Option<NativeEntry>;

    /// Run a previously compiled entry point with the given arguments
    /// (receiver first, if any) and return its result.
    fn invoke(&self, entry: NativeEntry, args: &[Word], memory: &Memory) -> Result<Word, FatalError>;
}

/// The backend installed when none is configured: every `compile` call
/// declines, so the interpreter always falls back to bytecode dispatch.
#[derive(Debug, Default)]
pub struct NoJit;

impl NativeBackend for NoJit {
    fn compile(&self, _class_id: crate::program::ClassId, _method_id: MethodId, _program: &Program) -> Option<NativeEntry> {
        None
    }

    fn invoke(&self, _entry: NativeEntry, _args: &[Word], _memory: &Memory) -> Result<Word, FatalError> {
        Err(FatalError::Internal("no native backend installed".into()))
    }
}
