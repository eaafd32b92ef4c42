//! Core execution runtime: bytecode image loader/linker, stack-based
//! interpreter, mark-and-sweep memory manager, and object-graph serializer
//! for a statically typed, class-based object language

pub mod config;
pub mod error;
pub mod image;
pub mod loader;
pub mod memory;
pub mod native;
pub mod program;
pub mod serialize;
pub mod thread;
pub mod traps;
pub mod vm;
