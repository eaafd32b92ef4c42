//! Bytecode image format: compressed binary I/O and layout constants.

pub mod codec;
pub mod format;

pub use codec::{Reader, Writer};
pub use format::{CALL_STACK_SIZE, EXE_EXTENSION, LIB_EXTENSION, MAGIC_EXE, MAGIC_LIB, VER_NUM};
