//! End-to-end scenario: an object that references itself survives a real
//! `SERL_OBJ_INST`/`DESERL_OBJ_INST` trap round trip with the cycle intact.
//!
//! [`corevm::serialize::tests`] already covers the encoder/decoder pair
//! directly; this drives the same property one layer up, through actual
//! bytecode and a full `Interpreter::execute` call, the way a running
//! program would reach it.

mod common;

use corevm::memory::HeapData;
use corevm::program::{Instr, MemoryContext, MethodFlags, ParamKind, ReturnKind};
use corevm::traps::Selector;
use corevm::vm::Word;

const NODE: i32 = 0;
const MAIN: i32 = 1;

fn node_class() -> corevm::program::Class {
    let mut c = common::class(NODE, "Node", None, 0, 1, Vec::new());
    c.instance_declarations = vec![ParamKind::ObjParm(NODE)];
    c
}

fn main_class() -> corevm::program::Class {
    let main = common::named_method(
        0,
        MAIN,
        "Main:main:",
        ReturnKind::IntLike,
        0,
        2,
        Vec::new(),
        vec![
            // local0 = new Node(); local0.next = local0 (a self-cycle)
            Instr::NewObjInst { class_id: NODE },
            Instr::CopyVar { slot: 0, ctx: MemoryContext::Local },
            Instr::PopInt,
            Instr::LoadVar { slot: 0, ctx: MemoryContext::Local },
            Instr::StorVar { slot: 0, ctx: MemoryContext::Instance },
            // local1 = SERL_OBJ_INST(local0)
            Instr::LoadVar { slot: 0, ctx: MemoryContext::Local },
            Instr::Trap { selector: Selector::SerlObjInst as i32, arg_count: 1 },
            Instr::CopyVar { slot: 1, ctx: MemoryContext::Local },
            Instr::PopInt,
            // class slot 0 = DESERL_OBJ_INST(local1), kept alive past return
            // since class-memory outlives this frame but locals don't.
            Instr::LoadVar { slot: 1, ctx: MemoryContext::Local },
            Instr::Trap { selector: Selector::DeserlObjInst as i32, arg_count: 1 },
            Instr::CopyVar { slot: 0, ctx: MemoryContext::Class },
            Instr::PopInt,
            Instr::LoadIntLit(0),
            Instr::Rtrn,
        ],
        MethodFlags { is_function: true, ..Default::default() },
    );
    common::class(MAIN, "Main", None, 1, 0, vec![main])
}

#[test]
fn decoded_self_reference_points_back_at_itself() {
    let program = common::program(vec![node_class(), main_class()], MAIN, 0);
    let runtime = common::runtime_for(program);
    let mut interp = corevm::vm::Interpreter::new(runtime.clone());

    interp.execute(MAIN, 0, vec![]).expect("must not unwind");

    let decoded = runtime.memory.class_memory.load(MAIN, 0);
    let Word::Ref(Some(node_ref)) = decoded else {
        panic!("expected a decoded object reference, got {decoded:?}");
    };

    let heap = runtime.memory.heap.lock().unwrap();
    let Some(HeapData::Object(inst)) = heap.get(node_ref) else {
        panic!("decoded reference does not point at a live object");
    };
    assert_eq!(inst.fields[0], Word::Ref(Some(node_ref)), "cycle must survive the round trip");
}
