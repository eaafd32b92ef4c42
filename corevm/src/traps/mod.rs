//! Trap surface `TRAP`/`TRAP_RTRN` pop a numeric selector
//! plus 0-5 argument words and dispatch here.
//!
//! The full surface is wide (sockets, TLS, file metadata, directory
//! listing). This module implements the categories an embedded or scripted
//! program actually exercises end to end — stdio, environment, time,
//! threads, compression, reflection, array/string copy, and the full
//! object-graph serializer (`serialize` submodule, backed by
//! [`crate::serialize`]) — and gives every selector in the long tail
//! (files, sockets, directories) the same recoverable-failure contract as
//! the implemented traps: push a zero/nil/empty result and let bytecode
//! branch on it, rather than fail to compile or panic. `DESIGN.md` records
//! which selectors are fully implemented.

pub mod array_string;
pub mod compress;
pub mod env;
pub mod reflect;
pub mod serialize;
pub mod stdio;
pub mod thread;

use crate::config::Properties;
use crate::error::FatalError;
use crate::memory::Memory;
use crate::program::Program;
use crate::thread::ThreadRegistry;
use crate::vm::stack::OperandStack;

/// Every trap selector the loader's encoded instruction stream may name.
/// Values are process-internal; they need not match the source's numbering
/// since no binary image produced by a foreign compiler is read here
/// (traps are identified by selector in already-linked bytecode).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Selector {
    StdOutBool = 0,
    StdOutByte,
    StdOutChar,
    StdOutInt,
    StdOutFloat,
    StdOutCharAry,
    StdInString,
    StdFlush,
    StdErrBool,
    StdErrInt,

    SysTime,
    GmtTime,

    GetPltfrm,
    GetVersion,
    GetSysProp,
    SetSysProp,
    Exit,
    ThreadJoin,
    ThreadSleep,

    CompressBytes,
    UncompressBytes,
    Crc32Bytes,

    LoadClsInstId,
    LoadNewObjInst,

    LoadMultiArySize,
    CpyCharStrAry,
    CpyIntStrAry,
    CpyFloatStrAry,
    ZeroByteAry,
    ZeroIntAry,
    ZeroFloatAry,
    BytesToUnicode,
    UnicodeToBytes,

    SerlChar,
    SerlInt,
    SerlFloat,
    SerlObjInst,
    SerlByteAry,
    SerlCharAry,
    SerlIntAry,
    SerlFloatAry,
    SerlObjAry,
    DeserlChar,
    DeserlInt,
    DeserlFloat,
    DeserlObjInst,
    DeserlByteAry,
    DeserlCharAry,
    DeserlIntAry,
    DeserlFloatAry,
    DeserlObjAry,

    Unsupported,
}

impl Selector {
    pub fn from_code(code: i32) -> Self {
        const TABLE: &[Selector] = &[
            Selector::StdOutBool,
            Selector::StdOutByte,
            Selector::StdOutChar,
            Selector::StdOutInt,
            Selector::StdOutFloat,
            Selector::StdOutCharAry,
            Selector::StdInString,
            Selector::StdFlush,
            Selector::StdErrBool,
            Selector::StdErrInt,
            Selector::SysTime,
            Selector::GmtTime,
            Selector::GetPltfrm,
            Selector::GetVersion,
            Selector::GetSysProp,
            Selector::SetSysProp,
            Selector::Exit,
            Selector::ThreadJoin,
            Selector::ThreadSleep,
            Selector::CompressBytes,
            Selector::UncompressBytes,
            Selector::Crc32Bytes,
            Selector::LoadClsInstId,
            Selector::LoadNewObjInst,
            Selector::LoadMultiArySize,
            Selector::CpyCharStrAry,
            Selector::CpyIntStrAry,
            Selector::CpyFloatStrAry,
            Selector::ZeroByteAry,
            Selector::ZeroIntAry,
            Selector::ZeroFloatAry,
            Selector::BytesToUnicode,
            Selector::UnicodeToBytes,
            Selector::SerlChar,
            Selector::SerlInt,
            Selector::SerlFloat,
            Selector::SerlObjInst,
            Selector::SerlByteAry,
            Selector::SerlCharAry,
            Selector::SerlIntAry,
            Selector::SerlFloatAry,
            Selector::SerlObjAry,
            Selector::DeserlChar,
            Selector::DeserlInt,
            Selector::DeserlFloat,
            Selector::DeserlObjInst,
            Selector::DeserlByteAry,
            Selector::DeserlCharAry,
            Selector::DeserlIntAry,
            Selector::DeserlFloatAry,
            Selector::DeserlObjAry,
        ];
        TABLE.get(code as usize).copied().unwrap_or(Selector::Unsupported)
    }
}

/// Outcome of dispatching one trap. `Exit` short-circuits the interpreter
/// loop with the process exit code the bytecode requested.
pub enum DispatchOutcome {
    Continue,
    Exit(i32),
}

#[allow(clippy::too_many_arguments)]
pub fn dispatch(
    selector: i32,
    stack: &mut OperandStack,
    memory: &Memory,
    program: &Program,
    properties: &Properties,
    threads: &ThreadRegistry,
) -> Result<DispatchOutcome, FatalError> {
    let sel = Selector::from_code(selector);
    match sel {
        Selector::StdOutBool | Selector::StdOutByte | Selector::StdOutChar | Selector::StdOutInt | Selector::StdOutFloat => {
            stdio::std_out_scalar(sel, stack)?;
        }
        Selector::StdOutCharAry => stdio::std_out_char_ary(stack, memory)?,
        Selector::StdInString => stdio::std_in_string(stack, memory)?,
        Selector::StdFlush => stdio::std_flush(),
        Selector::StdErrBool | Selector::StdErrInt => stdio::std_err_scalar(sel, stack)?,

        Selector::SysTime => env::sys_time(stack)?,
        Selector::GmtTime => env::gmt_time(stack)?,
        Selector::GetPltfrm => env::get_platform(stack, memory)?,
        Selector::GetVersion => env::get_version(stack, memory)?,
        Selector::GetSysProp => env::get_sys_prop(stack, memory, properties)?,
        Selector::SetSysProp => env::set_sys_prop(stack, memory, properties)?,
        Selector::Exit => {
            let code = stack.pop_int()? as i32;
            return Ok(DispatchOutcome::Exit(code));
        }
        Selector::ThreadJoin => thread::thread_join(stack, threads)?,
        Selector::ThreadSleep => thread::thread_sleep(stack)?,

        Selector::CompressBytes => compress::compress_bytes(stack, memory)?,
        Selector::UncompressBytes => compress::uncompress_bytes(stack, memory)?,
        Selector::Crc32Bytes => compress::crc32_bytes(stack, memory)?,

        Selector::LoadClsInstId => reflect::load_cls_inst_id(stack, memory)?,
        Selector::LoadNewObjInst => reflect::load_new_obj_inst(stack, memory, program)?,

        Selector::LoadMultiArySize => array_string::load_multi_ary_size(stack, memory)?,
        Selector::CpyCharStrAry | Selector::CpyIntStrAry | Selector::CpyFloatStrAry => {
            array_string::cpy_const_pool_ary(sel, stack, memory, program)?
        }
        Selector::ZeroByteAry | Selector::ZeroIntAry | Selector::ZeroFloatAry => array_string::zero_ary(sel, stack, memory)?,
        Selector::BytesToUnicode => array_string::bytes_to_unicode(stack, memory)?,
        Selector::UnicodeToBytes => array_string::unicode_to_bytes(stack, memory)?,

        Selector::SerlChar => serialize::serl_char(stack, memory, program)?,
        Selector::SerlInt => serialize::serl_int(stack, memory, program)?,
        Selector::SerlFloat => serialize::serl_float(stack, memory, program)?,
        Selector::SerlObjInst => serialize::serl_obj_inst(stack, memory, program)?,
        Selector::SerlByteAry => serialize::serl_byte_ary(stack, memory, program)?,
        Selector::SerlCharAry => serialize::serl_char_ary(stack, memory, program)?,
        Selector::SerlIntAry => serialize::serl_int_ary(stack, memory, program)?,
        Selector::SerlFloatAry => serialize::serl_float_ary(stack, memory, program)?,
        Selector::SerlObjAry => serialize::serl_obj_ary(stack, memory, program)?,
        Selector::DeserlChar => serialize::deserl_char(stack, memory, program)?,
        Selector::DeserlInt => serialize::deserl_int(stack, memory, program)?,
        Selector::DeserlFloat => serialize::deserl_float(stack, memory, program)?,
        Selector::DeserlObjInst => serialize::deserl_obj_inst(stack, memory, program)?,
        Selector::DeserlByteAry => serialize::deserl_byte_ary(stack, memory, program)?,
        Selector::DeserlCharAry => serialize::deserl_char_ary(stack, memory, program)?,
        Selector::DeserlIntAry => serialize::deserl_int_ary(stack, memory, program)?,
        Selector::DeserlFloatAry => serialize::deserl_float_ary(stack, memory, program)?,
        Selector::DeserlObjAry => serialize::deserl_obj_ary(stack, memory, program)?,

        Selector::Unsupported => {
            stack.push_int(0);
        }
    }
    Ok(DispatchOutcome::Continue)
}
