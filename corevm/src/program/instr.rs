//! In-memory instruction representation
//!
//! The source format packs every opcode into one fixed struct with seven
//! untyped operand slots. This crate instead uses a Rust enum with one
//! variant per opcode family, each carrying only the operands that opcode
//! actually needs — the same "values the type system can check instead of
//! a fixed struct" treatment applied to the program model below.

use serde::{Deserialize, Serialize};

/// Which memory region a variable access targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryContext {
    Local,
    Instance,
    Class,
}

/// Element kind for typed-array instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrayElemKind {
    Byte,
    Char,
    Int,
    Float,
}

/// A `JUMP`'s predicate: unconditional, or conditioned on the popped
/// top-of-stack integer being zero / non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JumpPredicate {
    Always,
    IfZero,
    IfNonZero,
}

pub type LabelId = i32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instr {
    // ---- literals ----
    LoadIntLit(i64),
    LoadCharLit(char),
    LoadFloatLit(f64),

    // ---- variable access ----
    LoadVar { slot: i32, ctx: MemoryContext },
    StorVar { slot: i32, ctx: MemoryContext },
    CopyVar { slot: i32, ctx: MemoryContext },
    LoadFloatVar { slot: i32, ctx: MemoryContext },
    StorFloatVar { slot: i32, ctx: MemoryContext },
    CopyFloatVar { slot: i32, ctx: MemoryContext },
    LoadFuncVar { slot: i32, ctx: MemoryContext },
    StorFuncVar { slot: i32, ctx: MemoryContext },
    CopyFuncVar { slot: i32, ctx: MemoryContext },

    // ---- integer arithmetic / logic ----
    AddInt,
    SubInt,
    MulInt,
    DivInt,
    ModInt,
    BitAndInt,
    BitOrInt,
    BitXorInt,
    ShlInt,
    ShrInt,
    AndInt,
    OrInt,
    EqlInt,
    NeqlInt,
    LesInt,
    GtrInt,
    LesEqlInt,
    GtrEqlInt,

    // ---- float arithmetic / logic ----
    AddFloat,
    SubFloat,
    MulFloat,
    DivFloat,
    EqlFloat,
    NeqlFloat,
    LesFloat,
    GtrFloat,
    LesEqlFloat,
    GtrEqlFloat,

    // ---- conversion ----
    I2f,
    F2i,
    S2i,
    S2f,
    I2s,
    F2s,

    // ---- stack ops ----
    SwapInt,
    PopInt,
    PopFloat,

    // ---- array creation ----
    NewByteAry { dims: u32 },
    NewCharAry { dims: u32 },
    NewIntAry { dims: u32 },
    NewFloatAry { dims: u32 },

    // ---- array access ----
    LoadAryElm { elem: ArrayElemKind, dims: u32, ctx: MemoryContext },
    StorAryElm { elem: ArrayElemKind, dims: u32, ctx: MemoryContext },

    // ---- object allocation ----
    NewObjInst { class_id: i32 },
    NewFuncInst,

    // ---- casts and introspection ----
    ObjInstCast { target_class_id: i32 },
    ObjTypeOf { target_class_id: i32 },

    // ---- calls ----
    MthdCall { class_id: i32, mthd_id: i32, is_native: bool },
    DynMthdCall { param_count: i32, return_kind: ReturnKind },
    AsyncMthdCall,
    Rtrn,

    // ---- control flow ----
    Lbl(LabelId),
    Jmp { label: LabelId, predicate: JumpPredicate },

    // ---- critical sections ----
    CriticalStart,
    CriticalEnd,

    // ---- traps ----
    Trap { selector: i32, arg_count: u8 },
    TrapRtrn { selector: i32, arg_count: u8 },

    // ---- pre-link forms, rewritten in place by the loader ----
    LibNewObjInst { class_name: String },
    LibObjInstCast { class_name: String },
    LibObjTypeOf { class_name: String },
    LibMthdCall { encoded_name: String, is_native: bool },
    LibFuncDef { encoded_name: String },
}

/// A method's declared return kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnKind {
    IntLike,
    Float,
    FunctionPair,
    Nil,
}

/// One instruction plus its optional debug-build source line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub op: Instr,
    pub line: Option<i32>,
}

impl Instruction {
    pub fn new(op: Instr) -> Self {
        Self { op, line: None }
    }

    pub fn with_line(op: Instr, line: i32) -> Self {
        Self { op, line: Some(line) }
    }

    /// `true` for the `LABEL` marker: consumes no time, only registers its
    /// id in the containing method's jump table at load time.
    pub fn is_label(&self) -> bool {
        matches!(self.op, Instr::Lbl(_))
    }
}
