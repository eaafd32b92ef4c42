//! End-to-end scenario: a `Shape` base class with two overriding
//! subclasses, called through one static call site whose target is
//! resolved dynamically from the receiver's concrete class.

mod common;

use corevm::program::{Instr, MemoryContext, MethodFlags, ParamKind, ReturnKind};
use corevm::vm::Word;

const SHAPE: i32 = 0;
const SQUARE: i32 = 1;
const CIRCLE: i32 = 2;
const MAIN: i32 = 3;
const AREA: i32 = 0;

fn shape_class() -> corevm::program::Class {
    let area = common::named_method(
        AREA,
        SHAPE,
        "Shape:area:",
        ReturnKind::Float,
        0,
        1,
        Vec::new(),
        vec![Instr::LoadFloatLit(0.0), Instr::Rtrn],
        MethodFlags { is_virtual: true, ..Default::default() },
    );
    common::class(SHAPE, "Shape", None, 0, 0, vec![area])
}

fn square_class() -> corevm::program::Class {
    // area() { return side * side; } — field 0 is `side`.
    let area = common::named_method(
        AREA,
        SQUARE,
        "Square:area:",
        ReturnKind::Float,
        0,
        1,
        Vec::new(),
        vec![
            Instr::LoadVar { slot: 0, ctx: MemoryContext::Instance },
            Instr::LoadVar { slot: 0, ctx: MemoryContext::Instance },
            Instr::MulFloat,
            Instr::Rtrn,
        ],
        MethodFlags { is_virtual: true, ..Default::default() },
    );
    let mut c = common::class(SQUARE, "Square", Some(SHAPE), 0, 1, vec![area]);
    c.instance_declarations = vec![ParamKind::Float];
    c
}

fn circle_class() -> corevm::program::Class {
    // area() { return radius * radius * 3.0; } — a non-pi constant so the
    // expected sum below isn't sensitive to pi's float representation.
    let area = common::named_method(
        AREA,
        CIRCLE,
        "Circle:area:",
        ReturnKind::Float,
        0,
        1,
        Vec::new(),
        vec![
            Instr::LoadVar { slot: 0, ctx: MemoryContext::Instance },
            Instr::LoadVar { slot: 0, ctx: MemoryContext::Instance },
            Instr::MulFloat,
            Instr::LoadFloatLit(3.0),
            Instr::MulFloat,
            Instr::Rtrn,
        ],
        MethodFlags { is_virtual: true, ..Default::default() },
    );
    let mut c = common::class(CIRCLE, "Circle", Some(SHAPE), 0, 1, vec![area]);
    c.instance_declarations = vec![ParamKind::Float];
    c
}

fn main_class() -> corevm::program::Class {
    let main = common::named_method(
        0,
        MAIN,
        "Main:main:",
        ReturnKind::Float,
        0,
        3,
        Vec::new(),
        vec![
            // local1 = new Square(); local1.side = 3.0
            Instr::NewObjInst { class_id: SQUARE },
            Instr::CopyVar { slot: 1, ctx: MemoryContext::Local },
            Instr::StorVar { slot: 0, ctx: MemoryContext::Local },
            Instr::LoadFloatLit(3.0),
            Instr::StorVar { slot: 0, ctx: MemoryContext::Instance },
            // local2 = new Circle(); local2.radius = 2.0
            Instr::NewObjInst { class_id: CIRCLE },
            Instr::CopyVar { slot: 2, ctx: MemoryContext::Local },
            Instr::StorVar { slot: 0, ctx: MemoryContext::Local },
            Instr::LoadFloatLit(2.0),
            Instr::StorVar { slot: 0, ctx: MemoryContext::Instance },
            // square.area() + circle.area(), dispatched virtually through
            // Shape's call site
            Instr::LoadVar { slot: 1, ctx: MemoryContext::Local },
            Instr::MthdCall { class_id: SHAPE, mthd_id: AREA, is_native: false },
            Instr::LoadVar { slot: 2, ctx: MemoryContext::Local },
            Instr::MthdCall { class_id: SHAPE, mthd_id: AREA, is_native: false },
            Instr::AddFloat,
            Instr::Rtrn,
        ],
        MethodFlags { is_function: true, ..Default::default() },
    );
    common::class(MAIN, "Main", None, 0, 0, vec![main])
}

#[test]
fn dispatches_to_each_concrete_override() {
    let program = common::program(vec![shape_class(), square_class(), circle_class(), main_class()], MAIN, 0);
    let runtime = common::runtime_for(program);
    let mut interp = corevm::vm::Interpreter::new(runtime);

    let result = interp.execute(MAIN, 0, vec![]).expect("must not unwind");
    assert_eq!(result, Word::Float(21.0));
}

#[test]
fn calling_through_the_cache_agrees_with_the_first_uncached_call() {
    // Runs the same call site twice back to back (once to populate
    // `Program::dispatch_cache`, once to hit it) and checks both runs
    // agree — the dispatch-agreement property as
    // observed end to end rather than against the cache directly.
    let program = common::program(vec![shape_class(), square_class(), circle_class(), main_class()], MAIN, 0);
    let runtime = common::runtime_for(program);

    let mut first = corevm::vm::Interpreter::new(runtime.clone());
    let a = first.execute(MAIN, 0, vec![]).unwrap();
    let mut second = corevm::vm::Interpreter::new(runtime);
    let b = second.execute(MAIN, 0, vec![]).unwrap();
    assert_eq!(a, b);
}
