//! Shared fixture builders for integration tests: hand-assembled
//! `Program`s and `Runtime`s built directly from the in-memory model,
//! bypassing the on-disk image format except where a test is
//! specifically exercising that format.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use corevm::config::Properties;
use corevm::memory::Memory;
use corevm::native::NoJit;
use corevm::program::{
    Class, ClassFlags, ClassId, DispatchCache, Instr, Instruction, Method, MethodFlags, MethodId, ParamKind, Program, ReturnKind,
};
use corevm::vm::{Interpreter, Runtime};

/// Build one method body from bare `Instr`s (no source line info needed
/// by a hand-written fixture).
pub fn method(id: MethodId, class_id: ClassId, return_kind: ReturnKind, param_count: i32, local_space: i32, ops: Vec<Instr>, flags: MethodFlags) -> Method {
    let mut m = Method {
        class_id,
        id,
        encoded_name: format!("Fixture{class_id}:m{id}:"),
        return_kind,
        param_count,
        local_space,
        param_declarations: Vec::new(),
        instructions: ops.into_iter().map(Instruction::new).collect(),
        jump_table: Default::default(),
        flags,
        native_entry: None,
    };
    m.build_jump_table();
    m
}

/// As [`method`] but with an explicit dispatch-relevant encoded name and
/// parameter declarations, for virtual-dispatch fixtures that need
/// `Method::dispatch_key()` to line up across classes (e.g. `Shape:area:`
/// overridden by `Square:area:`).
#[allow(clippy::too_many_arguments)]
pub fn named_method(
    id: MethodId,
    class_id: ClassId,
    encoded_name: &str,
    return_kind: ReturnKind,
    param_count: i32,
    local_space: i32,
    param_declarations: Vec<ParamKind>,
    ops: Vec<Instr>,
    flags: MethodFlags,
) -> Method {
    let mut m = Method {
        class_id,
        id,
        encoded_name: encoded_name.to_string(),
        return_kind,
        param_count,
        local_space,
        param_declarations,
        instructions: ops.into_iter().map(Instruction::new).collect(),
        jump_table: Default::default(),
        flags,
        native_entry: None,
    };
    m.build_jump_table();
    m
}

pub fn class(id: ClassId, name: &str, parent_id: Option<ClassId>, class_space: i32, instance_space: i32, methods: Vec<Method>) -> Class {
    class_with_interfaces(id, name, parent_id, Vec::new(), class_space, instance_space, methods)
}

#[allow(clippy::too_many_arguments)]
pub fn class_with_interfaces(
    id: ClassId,
    name: &str,
    parent_id: Option<ClassId>,
    interface_ids: Vec<ClassId>,
    class_space: i32,
    instance_space: i32,
    methods: Vec<Method>,
) -> Class {
    let mut map = BTreeMap::new();
    for m in methods {
        map.insert(m.id, m);
    }
    Class {
        id,
        name: name.to_string(),
        file_name: Some(format!("{name}.obs")),
        parent_id,
        interface_ids,
        class_space,
        instance_space,
        class_declarations: Vec::new(),
        instance_declarations: Vec::new(),
        closure_declarations: Default::default(),
        methods: map,
        flags: ClassFlags { is_public: true, ..Default::default() },
    }
}

/// Assemble a linked-looking `Program` straight from classes, skipping
/// the loader entirely (the loader's own round-trip is covered by its
/// own test against [`corevm::loader::builder::ExeImageBuilder`]).
pub fn program(classes: Vec<Class>, start_class_id: ClassId, start_method_id: MethodId) -> Arc<Program> {
    program_with_pools(classes, start_class_id, start_method_id, Vec::new(), Vec::new(), Vec::new())
}

/// As [`program`], with the three constant pools populated (for fixtures
/// that drive `CPY_*_STR_ARY` traps off pool contents).
pub fn program_with_pools(
    classes: Vec<Class>,
    start_class_id: ClassId,
    start_method_id: MethodId,
    float_pool: Vec<f64>,
    int_pool: Vec<i64>,
    char_pool: Vec<String>,
) -> Arc<Program> {
    let mut class_map = BTreeMap::new();
    let mut class_names = std::collections::HashMap::new();
    for c in classes {
        class_names.insert(c.name.clone(), c.id);
        class_map.insert(c.id, c);
    }
    Arc::new(Program {
        classes: class_map,
        class_names,
        enums: std::collections::HashMap::new(),
        float_pool,
        int_pool,
        char_pool,
        string_class_id: None,
        start_class_id: Some(start_class_id),
        start_method_id: Some(start_method_id),
        dispatch_cache: DispatchCache::new(),
    })
}

/// A `Runtime` wired from scratch: fresh `Memory`, default `Properties`,
/// and the `NoJit` backend every non-JIT test runs against.
pub fn runtime_for(program: Arc<Program>) -> Arc<Runtime> {
    Runtime::new(program, Memory::new(), Arc::new(Properties::new()), Arc::new(NoJit))
}

/// As [`runtime_for`], with an explicit shared `Memory` — for fixtures
/// that need a tiny collection threshold or to inspect the heap/class
/// memory after the run.
pub fn runtime_with_memory(program: Arc<Program>, memory: Arc<Memory>) -> Arc<Runtime> {
    Runtime::new(program, memory, Arc::new(Properties::new()), Arc::new(NoJit))
}

pub fn interpreter_for(program: Arc<Program>) -> (Arc<Runtime>, Interpreter) {
    let runtime = runtime_for(program);
    let interp = Interpreter::new(runtime.clone());
    (runtime, interp)
}
