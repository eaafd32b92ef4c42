//! End-to-end scenario: load a constant-pool string into a fresh char
//! array and print it, then return.

mod common;

use corevm::program::{Instr, MethodFlags, ReturnKind};
use corevm::traps::Selector;
use corevm::vm::Word;

#[test]
fn prints_pooled_string_and_returns_zero() {
    let main = common::named_method(
        0,
        0,
        "Main:main:",
        ReturnKind::IntLike,
        0,
        2,
        Vec::new(),
        vec![
            Instr::LoadIntLit(0), // pool_index into char_pool[0]
            Instr::LoadIntLit(5), // "hello".len()
            Instr::NewCharAry { dims: 1 },
            Instr::CopyVar { slot: 1, ctx: corevm::program::MemoryContext::Local },
            Instr::Trap { selector: Selector::CpyCharStrAry as i32, arg_count: 2 },
            Instr::PopInt,
            Instr::LoadVar { slot: 1, ctx: corevm::program::MemoryContext::Local },
            Instr::Trap { selector: Selector::StdOutCharAry as i32, arg_count: 1 },
            Instr::LoadIntLit(0),
            Instr::Rtrn,
        ],
        MethodFlags { is_function: true, ..Default::default() },
    );
    let main_class = common::class(0, "Main", None, 0, 0, vec![main]);
    let program = common::program_with_pools(vec![main_class], 0, 0, Vec::new(), Vec::new(), vec!["hello".to_string()]);

    let runtime = common::runtime_for(program);
    let mut interp = corevm::vm::Interpreter::new(runtime);
    let result = interp.execute(0, 0, vec![]).expect("start method must not unwind");
    assert_eq!(result, Word::Int(0));
}
