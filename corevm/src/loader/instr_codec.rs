//! Binary encoding for one [`Instruction`]. One leading tag byte selects
//! the variant; operand words follow in declaration order.

use crate::image::codec::{Reader, Writer};
use crate::error::FatalError;
use crate::program::{ArrayElemKind, Instr, Instruction, JumpPredicate, MemoryContext, ReturnKind};

fn ctx_tag(ctx: MemoryContext) -> u8 {
    match ctx {
        MemoryContext::Local => 0,
        MemoryContext::Instance => 1,
        MemoryContext::Class => 2,
    }
}

fn ctx_from_tag(tag: u8) -> Result<MemoryContext, FatalError> {
    Ok(match tag {
        0 => MemoryContext::Local,
        1 => MemoryContext::Instance,
        2 => MemoryContext::Class,
        other => return Err(FatalError::ImageInvalid(format!("bad memory context tag {other}"))),
    })
}

fn elem_tag(e: ArrayElemKind) -> u8 {
    match e {
        ArrayElemKind::Byte => 0,
        ArrayElemKind::Char => 1,
        ArrayElemKind::Int => 2,
        ArrayElemKind::Float => 3,
    }
}

fn elem_from_tag(tag: u8) -> Result<ArrayElemKind, FatalError> {
    Ok(match tag {
        0 => ArrayElemKind::Byte,
        1 => ArrayElemKind::Char,
        2 => ArrayElemKind::Int,
        3 => ArrayElemKind::Float,
        other => return Err(FatalError::ImageInvalid(format!("bad array element tag {other}"))),
    })
}

fn return_kind_tag(r: ReturnKind) -> u8 {
    match r {
        ReturnKind::IntLike => 0,
        ReturnKind::Float => 1,
        ReturnKind::FunctionPair => 2,
        ReturnKind::Nil => 3,
    }
}

fn return_kind_from_tag(tag: u8) -> Result<ReturnKind, FatalError> {
    Ok(match tag {
        0 => ReturnKind::IntLike,
        1 => ReturnKind::Float,
        2 => ReturnKind::FunctionPair,
        3 => ReturnKind::Nil,
        other => return Err(FatalError::ImageInvalid(format!("bad return kind tag {other}"))),
    })
}

pub fn write_instruction(w: &mut Writer, instr: &Instruction) {
    w.write_bool(instr.line.is_some());
    if let Some(line) = instr.line {
        w.write_i32(line);
    }
    write_op(w, &instr.op);
}

pub fn read_instruction(r: &mut Reader) -> Result<Instruction, FatalError> {
    let has_line = r.read_bool()?;
    let line = if has_line { Some(r.read_i32()?) } else { None };
    let op = read_op(r)?;
    Ok(Instruction { op, line })
}

fn write_op(w: &mut Writer, op: &Instr) {
    match op {
        Instr::LoadIntLit(v) => {
            w.write_byte(0);
            w.write_i64(*v);
        }
        Instr::LoadCharLit(c) => {
            w.write_byte(1);
            w.write_u32(*c as u32);
        }
        Instr::LoadFloatLit(v) => {
            w.write_byte(2);
            w.write_f64(*v);
        }
        Instr::LoadVar { slot, ctx } => write_slot_ctx(w, 3, *slot, *ctx),
        Instr::StorVar { slot, ctx } => write_slot_ctx(w, 4, *slot, *ctx),
        Instr::CopyVar { slot, ctx } => write_slot_ctx(w, 5, *slot, *ctx),
        Instr::LoadFloatVar { slot, ctx } => write_slot_ctx(w, 6, *slot, *ctx),
        Instr::StorFloatVar { slot, ctx } => write_slot_ctx(w, 7, *slot, *ctx),
        Instr::CopyFloatVar { slot, ctx } => write_slot_ctx(w, 8, *slot, *ctx),
        Instr::LoadFuncVar { slot, ctx } => write_slot_ctx(w, 9, *slot, *ctx),
        Instr::StorFuncVar { slot, ctx } => write_slot_ctx(w, 10, *slot, *ctx),
        Instr::CopyFuncVar { slot, ctx } => write_slot_ctx(w, 11, *slot, *ctx),

        Instr::AddInt => w.write_byte(12),
        Instr::SubInt => w.write_byte(13),
        Instr::MulInt => w.write_byte(14),
        Instr::DivInt => w.write_byte(15),
        Instr::ModInt => w.write_byte(16),
        Instr::BitAndInt => w.write_byte(17),
        Instr::BitOrInt => w.write_byte(18),
        Instr::BitXorInt => w.write_byte(19),
        Instr::ShlInt => w.write_byte(20),
        Instr::ShrInt => w.write_byte(21),
        Instr::AndInt => w.write_byte(22),
        Instr::OrInt => w.write_byte(23),
        Instr::EqlInt => w.write_byte(24),
        Instr::NeqlInt => w.write_byte(25),
        Instr::LesInt => w.write_byte(26),
        Instr::GtrInt => w.write_byte(27),
        Instr::LesEqlInt => w.write_byte(28),
        Instr::GtrEqlInt => w.write_byte(29),

        Instr::AddFloat => w.write_byte(30),
        Instr::SubFloat => w.write_byte(31),
        Instr::MulFloat => w.write_byte(32),
        Instr::DivFloat => w.write_byte(33),
        Instr::EqlFloat => w.write_byte(34),
        Instr::NeqlFloat => w.write_byte(35),
        Instr::LesFloat => w.write_byte(36),
        Instr::GtrFloat => w.write_byte(37),
        Instr::LesEqlFloat => w.write_byte(38),
        Instr::GtrEqlFloat => w.write_byte(39),

        Instr::I2f => w.write_byte(40),
        Instr::F2i => w.write_byte(41),
        Instr::S2i => w.write_byte(42),
        Instr::S2f => w.write_byte(43),
        Instr::I2s => w.write_byte(44),
        Instr::F2s => w.write_byte(45),

        Instr::SwapInt => w.write_byte(46),
        Instr::PopInt => w.write_byte(47),
        Instr::PopFloat => w.write_byte(48),

        Instr::NewByteAry { dims } => write_dims(w, 49, *dims),
        Instr::NewCharAry { dims } => write_dims(w, 50, *dims),
        Instr::NewIntAry { dims } => write_dims(w, 51, *dims),
        Instr::NewFloatAry { dims } => write_dims(w, 52, *dims),

        Instr::LoadAryElm { elem, dims, ctx } => {
            w.write_byte(53);
            w.write_byte(elem_tag(*elem));
            w.write_u32(*dims);
            w.write_byte(ctx_tag(*ctx));
        }
        Instr::StorAryElm { elem, dims, ctx } => {
            w.write_byte(54);
            w.write_byte(elem_tag(*elem));
            w.write_u32(*dims);
            w.write_byte(ctx_tag(*ctx));
        }

        Instr::NewObjInst { class_id } => {
            w.write_byte(55);
            w.write_i32(*class_id);
        }
        Instr::NewFuncInst => w.write_byte(56),

        Instr::ObjInstCast { target_class_id } => {
            w.write_byte(57);
            w.write_i32(*target_class_id);
        }
        Instr::ObjTypeOf { target_class_id } => {
            w.write_byte(58);
            w.write_i32(*target_class_id);
        }

        Instr::MthdCall { class_id, mthd_id, is_native } => {
            w.write_byte(59);
            w.write_i32(*class_id);
            w.write_i32(*mthd_id);
            w.write_bool(*is_native);
        }
        Instr::DynMthdCall { param_count, return_kind } => {
            w.write_byte(60);
            w.write_i32(*param_count);
            w.write_byte(return_kind_tag(*return_kind));
        }
        Instr::AsyncMthdCall => w.write_byte(61),
        Instr::Rtrn => w.write_byte(62),

        Instr::Lbl(id) => {
            w.write_byte(63);
            w.write_i32(*id);
        }
        Instr::Jmp { label, predicate } => {
            w.write_byte(64);
            w.write_i32(*label);
            w.write_byte(match predicate {
                JumpPredicate::Always => 0,
                JumpPredicate::IfZero => 1,
                JumpPredicate::IfNonZero => 2,
            });
        }

        Instr::CriticalStart => w.write_byte(65),
        Instr::CriticalEnd => w.write_byte(66),

        Instr::Trap { selector, arg_count } => {
            w.write_byte(67);
            w.write_i32(*selector);
            w.write_byte(*arg_count);
        }
        Instr::TrapRtrn { selector, arg_count } => {
            w.write_byte(68);
            w.write_i32(*selector);
            w.write_byte(*arg_count);
        }

        Instr::LibNewObjInst { class_name } => {
            w.write_byte(69);
            w.write_string(class_name);
        }
        Instr::LibObjInstCast { class_name } => {
            w.write_byte(70);
            w.write_string(class_name);
        }
        Instr::LibObjTypeOf { class_name } => {
            w.write_byte(71);
            w.write_string(class_name);
        }
        Instr::LibMthdCall { encoded_name, is_native } => {
            w.write_byte(72);
            w.write_string(encoded_name);
            w.write_bool(*is_native);
        }
        Instr::LibFuncDef { encoded_name } => {
            w.write_byte(73);
            w.write_string(encoded_name);
        }
    }
}

fn write_slot_ctx(w: &mut Writer, tag: u8, slot: i32, ctx: MemoryContext) {
    w.write_byte(tag);
    w.write_i32(slot);
    w.write_byte(ctx_tag(ctx));
}

fn write_dims(w: &mut Writer, tag: u8, dims: u32) {
    w.write_byte(tag);
    w.write_u32(dims);
}

fn read_slot_ctx(r: &mut Reader) -> Result<(i32, MemoryContext), FatalError> {
    let slot = r.read_i32()?;
    let ctx = ctx_from_tag(r.read_byte()?)?;
    Ok((slot, ctx))
}

fn read_op(r: &mut Reader) -> Result<Instr, FatalError> {
    let tag = r.read_byte()?;
    Ok(match tag {
        0 => Instr::LoadIntLit(r.read_i64()?),
        1 => Instr::LoadCharLit(char::from_u32(r.read_u32()?).unwrap_or('\u{FFFD}')),
        2 => Instr::LoadFloatLit(r.read_f64()?),
        3 => { let (slot, ctx) = read_slot_ctx(r)?; Instr::LoadVar { slot, ctx } }
        4 => { let (slot, ctx) = read_slot_ctx(r)?; Instr::StorVar { slot, ctx } }
        5 => { let (slot, ctx) = read_slot_ctx(r)?; Instr::CopyVar { slot, ctx } }
        6 => { let (slot, ctx) = read_slot_ctx(r)?; Instr::LoadFloatVar { slot, ctx } }
        7 => { let (slot, ctx) = read_slot_ctx(r)?; Instr::StorFloatVar { slot, ctx } }
        8 => { let (slot, ctx) = read_slot_ctx(r)?; Instr::CopyFloatVar { slot, ctx } }
        9 => { let (slot, ctx) = read_slot_ctx(r)?; Instr::LoadFuncVar { slot, ctx } }
        10 => { let (slot, ctx) = read_slot_ctx(r)?; Instr::StorFuncVar { slot, ctx } }
        11 => { let (slot, ctx) = read_slot_ctx(r)?; Instr::CopyFuncVar { slot, ctx } }

        12 => Instr::AddInt,
        13 => Instr::SubInt,
        14 => Instr::MulInt,
        15 => Instr::DivInt,
        16 => Instr::ModInt,
        17 => Instr::BitAndInt,
        18 => Instr::BitOrInt,
        19 => Instr::BitXorInt,
        20 => Instr::ShlInt,
        21 => Instr::ShrInt,
        22 => Instr::AndInt,
        23 => Instr::OrInt,
        24 => Instr::EqlInt,
        25 => Instr::NeqlInt,
        26 => Instr::LesInt,
        27 => Instr::GtrInt,
        28 => Instr::LesEqlInt,
        29 => Instr::GtrEqlInt,

        30 => Instr::AddFloat,
        31 => Instr::SubFloat,
        32 => Instr::MulFloat,
        33 => Instr::DivFloat,
        34 => Instr::EqlFloat,
        35 => Instr::NeqlFloat,
        36 => Instr::LesFloat,
        37 => Instr::GtrFloat,
        38 => Instr::LesEqlFloat,
        39 => Instr::GtrEqlFloat,

        40 => Instr::I2f,
        41 => Instr::F2i,
        42 => Instr::S2i,
        43 => Instr::S2f,
        44 => Instr::I2s,
        45 => Instr::F2s,

        46 => Instr::SwapInt,
        47 => Instr::PopInt,
        48 => Instr::PopFloat,

        49 => Instr::NewByteAry { dims: r.read_u32()? },
        50 => Instr::NewCharAry { dims: r.read_u32()? },
        51 => Instr::NewIntAry { dims: r.read_u32()? },
        52 => Instr::NewFloatAry { dims: r.read_u32()? },

        53 => {
            let elem = elem_from_tag(r.read_byte()?)?;
            let dims = r.read_u32()?;
            let ctx = ctx_from_tag(r.read_byte()?)?;
            Instr::LoadAryElm { elem, dims, ctx }
        }
        54 => {
            let elem = elem_from_tag(r.read_byte()?)?;
            let dims = r.read_u32()?;
            let ctx = ctx_from_tag(r.read_byte()?)?;
            Instr::StorAryElm { elem, dims, ctx }
        }

        55 => Instr::NewObjInst { class_id: r.read_i32()? },
        56 => Instr::NewFuncInst,

        57 => Instr::ObjInstCast { target_class_id: r.read_i32()? },
        58 => Instr::ObjTypeOf { target_class_id: r.read_i32()? },

        59 => {
            let class_id = r.read_i32()?;
            let mthd_id = r.read_i32()?;
            let is_native = r.read_bool()?;
            Instr::MthdCall { class_id, mthd_id, is_native }
        }
        60 => {
            let param_count = r.read_i32()?;
            let return_kind = return_kind_from_tag(r.read_byte()?)?;
            Instr::DynMthdCall { param_count, return_kind }
        }
        61 => Instr::AsyncMthdCall,
        62 => Instr::Rtrn,

        63 => Instr::Lbl(r.read_i32()?),
        64 => {
            let label = r.read_i32()?;
            let predicate = match r.read_byte()? {
                0 => JumpPredicate::Always,
                1 => JumpPredicate::IfZero,
                2 => JumpPredicate::IfNonZero,
                other => return Err(FatalError::ImageInvalid(format!("bad jump predicate tag {other}"))),
            };
            Instr::Jmp { label, predicate }
        }

        65 => Instr::CriticalStart,
        66 => Instr::CriticalEnd,

        67 => {
            let selector = r.read_i32()?;
            let arg_count = r.read_byte()?;
            Instr::Trap { selector, arg_count }
        }
        68 => {
            let selector = r.read_i32()?;
            let arg_count = r.read_byte()?;
            Instr::TrapRtrn { selector, arg_count }
        }

        69 => Instr::LibNewObjInst { class_name: r.read_string()? },
        70 => Instr::LibObjInstCast { class_name: r.read_string()? },
        71 => Instr::LibObjTypeOf { class_name: r.read_string()? },
        72 => {
            let encoded_name = r.read_string()?;
            let is_native = r.read_bool()?;
            Instr::LibMthdCall { encoded_name, is_native }
        }
        73 => Instr::LibFuncDef { encoded_name: r.read_string()? },

        other => return Err(FatalError::ImageInvalid(format!("unknown instruction tag {other}"))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_mixed_instruction_sequence() {
        let instrs = vec![
            Instruction::with_line(Instr::LoadIntLit(7), 10),
            Instruction::new(Instr::StorVar { slot: 1, ctx: MemoryContext::Local }),
            Instruction::new(Instr::Jmp { label: 2, predicate: JumpPredicate::IfZero }),
            Instruction::new(Instr::Lbl(2)),
            Instruction::new(Instr::MthdCall { class_id: 3, mthd_id: 4, is_native: false }),
            Instruction::new(Instr::LibMthdCall { encoded_name: "Foo:Bar:i".into(), is_native: false }),
            Instruction::new(Instr::Rtrn),
        ];
        let mut w = Writer::new();
        for i in &instrs {
            write_instruction(&mut w, i);
        }
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        for expected in &instrs {
            let got = read_instruction(&mut r).unwrap();
            assert_eq!(&got, expected);
        }
    }
}
