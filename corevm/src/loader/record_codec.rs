//! Binary encoding for [`Class`], [`Method`], [`EnumDecl`], and
//! [`ParamKind`] records

use std::collections::BTreeMap;

use crate::error::FatalError;
use crate::image::codec::{Reader, Writer};
use crate::program::{
    Class, ClassFlags, EnumDecl, EnumItem, Instruction, Method, MethodFlags, ParamKind, ReturnKind,
};

use super::instr_codec::{read_instruction, write_instruction};

fn param_kind_tag(p: &ParamKind) -> u8 {
    match p {
        ParamKind::Bool => 0,
        ParamKind::Byte => 1,
        ParamKind::Char => 2,
        ParamKind::Int => 3,
        ParamKind::Float => 4,
        ParamKind::ObjParm(_) => 5,
        ParamKind::ByteAryParm => 6,
        ParamKind::CharAryParm => 7,
        ParamKind::IntAryParm => 8,
        ParamKind::FloatAryParm => 9,
        ParamKind::ObjAryParm(_) => 10,
        ParamKind::FuncParm => 11,
    }
}

fn write_param_kind(w: &mut Writer, p: &ParamKind) {
    w.write_byte(param_kind_tag(p));
    match p {
        ParamKind::ObjParm(id) | ParamKind::ObjAryParm(id) => w.write_i32(*id),
        _ => {}
    }
}

fn read_param_kind(r: &mut Reader) -> Result<ParamKind, FatalError> {
    Ok(match r.read_byte()? {
        0 => ParamKind::Bool,
        1 => ParamKind::Byte,
        2 => ParamKind::Char,
        3 => ParamKind::Int,
        4 => ParamKind::Float,
        5 => ParamKind::ObjParm(r.read_i32()?),
        6 => ParamKind::ByteAryParm,
        7 => ParamKind::CharAryParm,
        8 => ParamKind::IntAryParm,
        9 => ParamKind::FloatAryParm,
        10 => ParamKind::ObjAryParm(r.read_i32()?),
        11 => ParamKind::FuncParm,
        other => return Err(FatalError::ImageInvalid(format!("bad param kind tag {other}"))),
    })
}

fn write_param_list(w: &mut Writer, list: &[ParamKind]) {
    w.write_i32(list.len() as i32);
    for p in list {
        write_param_kind(w, p);
    }
}

fn read_param_list(r: &mut Reader) -> Result<Vec<ParamKind>, FatalError> {
    let n = r.read_i32()?;
    (0..n).map(|_| read_param_kind(r)).collect()
}

fn return_kind_tag(k: ReturnKind) -> u8 {
    match k {
        ReturnKind::IntLike => 0,
        ReturnKind::Float => 1,
        ReturnKind::FunctionPair => 2,
        ReturnKind::Nil => 3,
    }
}

fn read_return_kind(r: &mut Reader) -> Result<ReturnKind, FatalError> {
    Ok(match r.read_byte()? {
        0 => ReturnKind::IntLike,
        1 => ReturnKind::Float,
        2 => ReturnKind::FunctionPair,
        3 => ReturnKind::Nil,
        other => return Err(FatalError::ImageInvalid(format!("bad return kind tag {other}"))),
    })
}

pub fn write_method(w: &mut Writer, m: &Method) {
    w.write_i32(m.id);
    w.write_string(&m.encoded_name);
    w.write_byte(return_kind_tag(m.return_kind));
    w.write_i32(m.param_count);
    w.write_i32(m.local_space);
    write_param_list(w, &m.param_declarations);
    w.write_bool(m.flags.is_virtual);
    w.write_bool(m.flags.is_native);
    w.write_bool(m.flags.is_function);
    w.write_bool(m.flags.is_lambda);
    w.write_bool(m.flags.has_and_or);
    w.write_i32(m.instructions.len() as i32);
    for instr in &m.instructions {
        write_instruction(w, instr);
    }
}

pub fn read_method(r: &mut Reader, class_id: i32) -> Result<Method, FatalError> {
    let id = r.read_i32()?;
    let encoded_name = r.read_string()?;
    let return_kind = read_return_kind(r)?;
    let param_count = r.read_i32()?;
    let local_space = r.read_i32()?;
    let param_declarations = read_param_list(r)?;
    let flags = MethodFlags {
        is_virtual: r.read_bool()?,
        is_native: r.read_bool()?,
        is_function: r.read_bool()?,
        is_lambda: r.read_bool()?,
        has_and_or: r.read_bool()?,
    };
    let n_instr = r.read_i32()?;
    let mut instructions = Vec::with_capacity(n_instr.max(0) as usize);
    for _ in 0..n_instr {
        instructions.push(read_instruction(r)?);
    }
    let mut method = Method {
        class_id,
        id,
        encoded_name,
        return_kind,
        param_count,
        local_space,
        param_declarations,
        instructions,
        jump_table: Default::default(),
        flags,
        native_entry: None,
    };
    method.build_jump_table();
    Ok(method)
}

pub fn write_class(w: &mut Writer, c: &Class) {
    w.write_i32(c.id);
    w.write_string(&c.name);
    w.write_bool(c.file_name.is_some());
    if let Some(file) = &c.file_name {
        w.write_string(file);
    }
    w.write_bool(c.parent_id.is_some());
    if let Some(pid) = c.parent_id {
        w.write_i32(pid);
    }
    w.write_i32(c.interface_ids.len() as i32);
    for id in &c.interface_ids {
        w.write_i32(*id);
    }
    w.write_i32(c.class_space);
    w.write_i32(c.instance_space);
    write_param_list(w, &c.class_declarations);
    write_param_list(w, &c.instance_declarations);
    w.write_i32(c.closure_declarations.len() as i32);
    for (mid, decls) in &c.closure_declarations {
        w.write_i32(*mid);
        write_param_list(w, decls);
    }
    w.write_bool(c.flags.is_virtual);
    w.write_bool(c.flags.is_interface);
    w.write_bool(c.flags.is_debug);
    w.write_bool(c.flags.is_public);
    w.write_bool(c.flags.is_library);
    w.write_i32(c.methods.len() as i32);
    for m in c.methods.values() {
        write_method(w, m);
    }
}

pub fn read_class(r: &mut Reader) -> Result<Class, FatalError> {
    let id = r.read_i32()?;
    let name = r.read_string()?;
    let file_name = if r.read_bool()? { Some(r.read_string()?) } else { None };
    let parent_id = if r.read_bool()? { Some(r.read_i32()?) } else { None };
    let n_iface = r.read_i32()?;
    let mut interface_ids = Vec::with_capacity(n_iface.max(0) as usize);
    for _ in 0..n_iface {
        interface_ids.push(r.read_i32()?);
    }
    let class_space = r.read_i32()?;
    let instance_space = r.read_i32()?;
    let class_declarations = read_param_list(r)?;
    let instance_declarations = read_param_list(r)?;
    let n_closures = r.read_i32()?;
    let mut closure_declarations = BTreeMap::new();
    for _ in 0..n_closures {
        let mid = r.read_i32()?;
        let decls = read_param_list(r)?;
        closure_declarations.insert(mid, decls);
    }
    let flags = ClassFlags {
        is_virtual: r.read_bool()?,
        is_interface: r.read_bool()?,
        is_debug: r.read_bool()?,
        is_public: r.read_bool()?,
        is_library: r.read_bool()?,
    };
    let n_methods = r.read_i32()?;
    let mut methods = BTreeMap::new();
    for _ in 0..n_methods {
        let m = read_method(r, id)?;
        methods.insert(m.id, m);
    }
    Ok(Class {
        id,
        name,
        file_name,
        parent_id,
        interface_ids,
        class_space,
        instance_space,
        class_declarations,
        instance_declarations,
        closure_declarations,
        methods,
        flags,
    })
}

pub fn write_enum(w: &mut Writer, e: &EnumDecl) {
    w.write_string(&e.name);
    w.write_i32(e.offset);
    w.write_i32(e.items.len() as i32);
    for item in &e.items {
        w.write_string(&item.name);
        w.write_i64(item.value);
    }
}

pub fn read_enum(r: &mut Reader) -> Result<EnumDecl, FatalError> {
    let name = r.read_string()?;
    let offset = r.read_i32()?;
    let n = r.read_i32()?;
    let mut items = Vec::with_capacity(n.max(0) as usize);
    for _ in 0..n {
        let item_name = r.read_string()?;
        let value = r.read_i64()?;
        items.push(EnumItem { name: item_name, value });
    }
    Ok(EnumDecl { name, offset, items })
}
