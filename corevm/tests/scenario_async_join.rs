//! End-to-end scenario: spawn several workers with `ASYNC_MTHD_CALL`,
//! each incrementing a class-memory counter 1000 times inside a critical
//! section keyed on a shared heap object, then `THREAD_JOIN` every one of
//! them before reading the final total. The inner iteration count is what
//! actually stresses `CriticalSections` under contention — a single
//! increment per worker would never surface a lost update.

mod common;

use corevm::program::{Instr, JumpPredicate, MemoryContext, MethodFlags, ReturnKind};
use corevm::traps::Selector;
use corevm::vm::exec::memory_ops::pack_func;
use corevm::vm::Word;

const LOCK: i32 = 0;
const MAIN: i32 = 1;
const MAIN_ENTRY: i32 = 0;
const BUMP: i32 = 1;
const WORKER_COUNT: i64 = 4;
const ITERATIONS: i64 = 1000;

const LOOP_TOP: i32 = 1;
const LOOP_END: i32 = 2;

fn lock_class() -> corevm::program::Class {
    common::class(LOCK, "Lock", None, 0, 0, Vec::new())
}

/// `class slot 0` is the shared counter, `class slot 1` holds the lock
/// object, `local slot 0` is this worker's own loop counter. Runs on a
/// worker thread via `ASYNC_MTHD_CALL`; its sole argument word is unused.
/// Loops `ITERATIONS` times, each iteration entering the critical section,
/// reading-incrementing-writing the shared counter, then leaving it — the
/// same `JMP`/`LBL` primitives other scenarios use for control flow.
fn bump_method() -> corevm::program::Method {
    common::named_method(
        BUMP,
        MAIN,
        "Main:bump:",
        ReturnKind::Nil,
        0,
        1,
        Vec::new(),
        vec![
            Instr::LoadIntLit(0),
            Instr::StorVar { slot: 0, ctx: MemoryContext::Local },
            Instr::Lbl(LOOP_TOP),
            Instr::LoadVar { slot: 0, ctx: MemoryContext::Local },
            Instr::LoadIntLit(ITERATIONS),
            Instr::LesInt,
            Instr::Jmp { label: LOOP_END, predicate: JumpPredicate::IfZero },
            Instr::LoadVar { slot: 1, ctx: MemoryContext::Class },
            Instr::CriticalStart,
            Instr::LoadVar { slot: 0, ctx: MemoryContext::Class },
            Instr::LoadIntLit(1),
            Instr::AddInt,
            Instr::StorVar { slot: 0, ctx: MemoryContext::Class },
            Instr::LoadVar { slot: 1, ctx: MemoryContext::Class },
            Instr::CriticalEnd,
            Instr::LoadVar { slot: 0, ctx: MemoryContext::Local },
            Instr::LoadIntLit(1),
            Instr::AddInt,
            Instr::StorVar { slot: 0, ctx: MemoryContext::Local },
            Instr::Jmp { label: LOOP_TOP, predicate: JumpPredicate::Always },
            Instr::Lbl(LOOP_END),
            Instr::Rtrn,
        ],
        MethodFlags { is_function: true, ..Default::default() },
    )
}

fn main_method() -> corevm::program::Method {
    let packed = pack_func(MAIN, BUMP);
    let mut ops = vec![
        Instr::LoadIntLit(WORKER_COUNT),
        Instr::NewIntAry { dims: 1 },
        Instr::CopyVar { slot: 1, ctx: MemoryContext::Local },
        Instr::PopInt,
        Instr::NewObjInst { class_id: LOCK },
        Instr::StorVar { slot: 1, ctx: MemoryContext::Class },
        Instr::LoadIntLit(0),
        Instr::StorVar { slot: 0, ctx: MemoryContext::Class },
    ];
    for i in 0..WORKER_COUNT {
        ops.extend([
            Instr::LoadVar { slot: 1, ctx: MemoryContext::Local },
            Instr::LoadIntLit(i),
            Instr::LoadIntLit(0),
            Instr::LoadIntLit(packed),
            Instr::AsyncMthdCall,
            Instr::StorAryElm { elem: corevm::program::ArrayElemKind::Int, dims: 1, ctx: MemoryContext::Local },
        ]);
    }
    for i in 0..WORKER_COUNT {
        ops.extend([
            Instr::LoadVar { slot: 1, ctx: MemoryContext::Local },
            Instr::LoadIntLit(i),
            Instr::LoadAryElm { elem: corevm::program::ArrayElemKind::Int, dims: 1, ctx: MemoryContext::Local },
            Instr::Trap { selector: Selector::ThreadJoin as i32, arg_count: 1 },
        ]);
    }
    ops.push(Instr::LoadVar { slot: 0, ctx: MemoryContext::Class });
    ops.push(Instr::Rtrn);

    common::named_method(MAIN_ENTRY, MAIN, "Main:main:", ReturnKind::IntLike, 0, 2, Vec::new(), ops, MethodFlags {
        is_function: true,
        ..Default::default()
    })
}

fn main_class() -> corevm::program::Class {
    common::class(MAIN, "Main", None, 2, 0, vec![main_method(), bump_method()])
}

#[test]
fn every_spawned_worker_survives_a_thousand_contended_increments() {
    let program = common::program(vec![lock_class(), main_class()], MAIN, MAIN_ENTRY);
    let runtime = common::runtime_for(program);
    let mut interp = corevm::vm::Interpreter::new(runtime);

    let result = interp.execute(MAIN, MAIN_ENTRY, vec![]).expect("must not unwind");
    assert_eq!(result, Word::Int(WORKER_COUNT * ITERATIONS));
}
