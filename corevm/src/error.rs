//! Fatal and recoverable error kinds for the runtime.
//!
//! Per the "replacing exception-driven exit(1)" design note: the interpreter
//! never calls `std::process::exit` itself. Every fatal condition is
//! returned as a [`FatalError`] from the relevant `Result`-returning
//! function, and a single top-level runner (`bin/corevm.rs`) is responsible
//! for formatting it to stderr and choosing the process exit code. This
//! lets embedding scenarios observe the error instead of being terminated.

use thiserror::Error;

/// Every runtime error kind that aborts execution outright.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("image is invalid: {0}")]
    ImageInvalid(String),

    #[error("image version mismatch: expected {expected}, found {found}")]
    ImageVersionMismatch { expected: i32, found: i32 },

    #[error("unresolved symbol '{symbol}' (searched {searched})")]
    UnresolvedSymbol { symbol: String, searched: String },

    #[error("stack overflow")]
    StackOverflow,

    #[error("call depth exceeded (limit {limit})")]
    CallDepthExceeded { limit: usize },

    #[error("nil dereference")]
    NilDereference,

    #[error(">>> Index out of bounds: {index},{size} <<<")]
    ArrayBoundsViolation { index: i64, size: i64 },

    #[error("invalid cast from class {from} to class {to}")]
    InvalidCast { from: i32, to: i32 },

    #[error("division by zero")]
    DivisionByZero,

    #[error("out of memory")]
    OutOfMemory,

    #[error("unknown instruction (tag {0})")]
    UnknownInstruction(u8),

    /// Deserialization named a class with no match in the running program
    ///
    #[error("deserialize: unknown class '{0}'")]
    DeserializationUnknownClass(String),

    #[error("{0}")]
    Internal(String),
}

/// Outcome of a trap invocation. Trap-level I/O, serialization, and
/// decompression failures are *recovered*: the trap pushes a zero/nil
/// result and bytecode execution continues, rather than aborting the
/// program. Traps that encounter a condition classified as fatal (e.g. a
/// nil receiver where none is permitted) return a [`FatalError`] instead.
pub enum TrapOutcome<T> {
    /// The trap succeeded with this value.
    Ok(T),
    /// The trap failed in a way bytecode can observe by branching on the
    /// pushed zero/nil/empty-string result.
    Failed,
}

/// A single stack frame's contribution to a fatal-error diagnostic trace.
#[derive(Debug, Clone)]
pub struct FrameTraceEntry {
    pub file_name: Option<String>,
    pub method_name: String,
    pub line: Option<i32>,
}

/// A full call-stack trace captured at the point a [`FatalError`] was
/// raised, printed by the top-level runner per frame: file name, method
/// name, and source line when debug info is present, otherwise the method
/// name alone.
#[derive(Debug, Clone, Default)]
pub struct FrameTrace(pub Vec<FrameTraceEntry>);

impl std::fmt::Display for FrameTrace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for entry in self.0.iter().rev() {
            match (&entry.file_name, entry.line) {
                (Some(file), Some(line)) => {
                    writeln!(f, "  at {} ({}:{})", entry.method_name, file, line)?
                }
                _ => writeln!(f, "  at {}", entry.method_name)?,
            }
        }
        Ok(())
    }
}

/// A fatal error paired with the call-stack trace captured when it fired.
#[derive(Debug)]
pub struct Unwind {
    pub error: FatalError,
    pub trace: FrameTrace,
}

impl std::fmt::Display for Unwind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.error)?;
        write!(f, "{}", self.trace)
    }
}
