//! Law 4: collection never frees a reachable object, and
//! does free genuine garbage. Driven through the `Memory` facade and a
//! real `Interpreter::execute` run with a one-byte collection threshold
//! (so every allocation trips an automatic mid-run collection), rather
//! than by constructing a `Collector` by hand as
//! [`corevm::memory::gc`]'s own unit tests do.

mod common;

use corevm::memory::{HeapData, Memory};
use corevm::program::{Instr, MemoryContext, MethodFlags, ReturnKind};
use corevm::vm::Word;

const ANCHOR: i32 = 0;
const GARBAGE: i32 = 1;
const MAIN: i32 = 2;

fn classes() -> Vec<corevm::program::Class> {
    vec![
        common::class(ANCHOR, "Anchor", None, 0, 1, Vec::new()),
        common::class(GARBAGE, "Garbage", None, 0, 1, Vec::new()),
    ]
}

fn main_method() -> corevm::program::Method {
    let mut ops = vec![
        Instr::NewObjInst { class_id: ANCHOR },
        Instr::StorVar { slot: 0, ctx: MemoryContext::Class },
    ];
    for _ in 0..4 {
        ops.push(Instr::NewObjInst { class_id: GARBAGE });
        ops.push(Instr::PopInt);
    }
    ops.push(Instr::LoadIntLit(0));
    ops.push(Instr::Rtrn);
    common::named_method(0, MAIN, "Main:main:", ReturnKind::IntLike, 0, 1, Vec::new(), ops, MethodFlags {
        is_function: true,
        ..Default::default()
    })
}

#[test]
fn reachable_anchor_survives_while_abandoned_garbage_is_swept() {
    let mut classes = classes();
    classes.push(common::class(MAIN, "Main", None, 1, 0, vec![main_method()]));
    let program = common::program(classes, MAIN, 0);

    let memory = Memory::with_threshold(1);
    let runtime = common::runtime_with_memory(program, memory);
    {
        let mut interp = corevm::vm::Interpreter::new(runtime.clone());
        interp.execute(MAIN, 0, vec![]).expect("must not unwind");
    } // the interpreter's monitor unregisters here

    let final_report = runtime.memory.collect_now();
    assert!(final_report.cells_swept >= 1, "the last discarded Garbage instance must be reclaimed");

    let anchor = runtime.memory.class_memory.load(MAIN, 0);
    let Word::Ref(Some(anchor_ref)) = anchor else {
        panic!("expected the anchor object to still be referenced from class memory");
    };
    let heap = runtime.memory.heap.lock().unwrap();
    assert!(matches!(heap.get(anchor_ref), Some(HeapData::Object(_))), "a live root must survive every intervening collection");
}
