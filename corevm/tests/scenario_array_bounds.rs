//! End-to-end scenario: an out-of-range array access unwinds with a
//! diagnostic error, not a panic.

mod common;

use corevm::error::FatalError;
use corevm::program::{ArrayElemKind, Instr, MemoryContext, MethodFlags, ReturnKind};

#[test]
fn out_of_bounds_store_unwinds_with_bounds_error() {
    let main = common::named_method(
        0,
        0,
        "Main:main:",
        ReturnKind::IntLike,
        0,
        1,
        Vec::new(),
        vec![
            Instr::LoadIntLit(3),
            Instr::NewIntAry { dims: 1 },
            Instr::StorVar { slot: 0, ctx: MemoryContext::Local },
            Instr::LoadVar { slot: 0, ctx: MemoryContext::Local },
            Instr::LoadIntLit(9), // out of range for a length-3 array
            Instr::LoadIntLit(99),
            Instr::StorAryElm { elem: ArrayElemKind::Int, dims: 1, ctx: MemoryContext::Local },
            Instr::LoadIntLit(0),
            Instr::Rtrn,
        ],
        MethodFlags { is_function: true, ..Default::default() },
    );
    let main_class = common::class(0, "Main", None, 0, 0, vec![main]);
    let program = common::program(vec![main_class], 0, 0);
    let runtime = common::runtime_for(program);
    let mut interp = corevm::vm::Interpreter::new(runtime);

    let unwind = interp.execute(0, 0, vec![]).expect_err("out-of-bounds store must unwind, not succeed");
    assert!(matches!(unwind.error, FatalError::ArrayBoundsViolation { index: 9, size: 3 }));
    assert_eq!(unwind.trace.0.len(), 1);
    assert_eq!(unwind.trace.0[0].method_name, "Main:main:");
}
