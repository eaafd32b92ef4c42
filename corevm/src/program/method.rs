//! Method representation

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::class::{ClassId, ParamKind};
use super::instr::{Instruction, LabelId, ReturnKind};

pub type MethodId = i32;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MethodFlags {
    pub is_virtual: bool,
    pub is_native: bool,
    /// "is_function" in the source: a static method, no implicit receiver.
    pub is_function: bool,
    pub is_lambda: bool,
    pub has_and_or: bool,
}

/// Opaque handle to a JIT-installed native entry point. The interpreter
/// never inspects its contents; it only checks presence before deciding
/// whether to call [`crate::native::NativeBackend::invoke`] instead of
/// dispatching bytecode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeEntry(pub usize);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Method {
    pub class_id: ClassId,
    pub id: MethodId,
    /// Canonical encoded name: `<ClassName>:<MethodName>:<ParamType1>,...`
    pub encoded_name: String,
    pub return_kind: ReturnKind,
    pub param_count: i32,
    pub local_space: i32,
    pub param_declarations: Vec<ParamKind>,
    pub instructions: Vec<Instruction>,
    /// Built at load time from a single scan of `instructions`
    #[serde(skip)]
    pub jump_table: HashMap<LabelId, usize>,
    pub flags: MethodFlags,
    /// Not serialized: installed post-load by an external JIT back-end.
    #[serde(skip)]
    pub native_entry: Option<NativeEntry>,
}

impl Method {
    /// The dispatch-key suffix used by virtual method resolution: the
    /// encoded name with the class segment stripped off.
    pub fn dispatch_key(&self) -> &str {
        super::name_grammar::dispatch_key(&self.encoded_name)
    }

    /// Build the jump table: one pass over `instructions` recording each
    /// `LABEL`'s array index.
    pub fn build_jump_table(&mut self) {
        self.jump_table.clear();
        for (idx, instr) in self.instructions.iter().enumerate() {
            if let super::instr::Instr::Lbl(id) = instr.op {
                self.jump_table.insert(id, idx);
            }
        }
    }
}
