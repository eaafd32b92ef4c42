//! Law 1: an image serialized by the loader's own builder
//! round-trips byte for byte into a `Program` that runs exactly as
//! written — covering the codec, not just the in-memory model.

mod common;

use std::sync::Arc;

use corevm::config::Properties;
use corevm::loader::builder::ExeImageBuilder;
use corevm::loader::load_executable_bytes;
use corevm::program::{Class, ClassFlags, Instr, Instruction, Method, MethodFlags, ParamKind, ReturnKind};
use corevm::vm::Word;

fn adder_class() -> Class {
    let mut methods = std::collections::BTreeMap::new();
    let mut m = Method {
        class_id: 0,
        id: 0,
        encoded_name: "Main:main:o.System.String[]*".to_string(),
        return_kind: ReturnKind::IntLike,
        param_count: 1,
        local_space: 1,
        param_declarations: vec![ParamKind::ObjAryParm(-1)],
        instructions: vec![
            Instruction::new(Instr::LoadIntLit(19)),
            Instruction::new(Instr::LoadIntLit(23)),
            Instruction::new(Instr::AddInt),
            Instruction::new(Instr::Rtrn),
        ],
        jump_table: Default::default(),
        flags: MethodFlags { is_function: true, ..Default::default() },
        native_entry: None,
    };
    m.build_jump_table();
    methods.insert(0, m);
    Class {
        id: 0,
        name: "Main".to_string(),
        file_name: Some("main.obs".to_string()),
        parent_id: None,
        interface_ids: Vec::new(),
        class_space: 0,
        instance_space: 0,
        class_declarations: Vec::new(),
        instance_declarations: Vec::new(),
        closure_declarations: Default::default(),
        methods,
        flags: ClassFlags { is_public: true, ..Default::default() },
    }
}

#[test]
fn image_built_then_loaded_executes_as_written() {
    let mut b = ExeImageBuilder::new();
    b.string_class_id = -1;
    b.start_class_id = 0;
    b.start_method_id = 0;
    b.classes.push(adder_class());
    let bytes = b.build();

    let properties = Properties::new();
    let program = Arc::new(load_executable_bytes(&bytes, &properties).expect("built image must load"));

    let runtime = common::runtime_for(program);
    let mut interp = corevm::vm::Interpreter::new(runtime);
    let result = interp.execute(0, 0, vec![]).expect("must not unwind");
    assert_eq!(result, Word::Int(42));
}
