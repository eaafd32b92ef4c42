//! Decoder half of the object-graph serializer
//!
//! Mirrors the encoder's grammar, maintaining an `id -> heap address` map
//! so a positive sharing id resolves to an already-materialized node
//! (closing cycles) while a negative one allocates a fresh cell. New
//! objects/arrays are pushed onto the live operand stack the instant
//! they're allocated so they are GC roots for the remainder of the decode.

use std::collections::HashMap;

use crate::error::FatalError;
use crate::image::codec::Reader;
use crate::memory::heap::{ArrayElemKind, ArrayPayload, Heap, HeapData, HeapRef};
use crate::program::{ParamKind, Program};
use crate::vm::stack::{OperandStack, Word};

use super::{tag, SerialKind, SerialValue};

/// Decode failures split the same way trap failures do: most conditions
/// are *recoverable* ("push zero/nil and continue"), but an unresolvable
/// class name is fatal.
#[derive(Debug)]
pub enum DecodeError {
    Malformed,
    Fatal(FatalError),
}

impl From<FatalError> for DecodeError {
    fn from(e: FatalError) -> Self {
        DecodeError::Fatal(e)
    }
}

type DResult<T> = Result<T, DecodeError>;

fn malformed<T>(_e: FatalError) -> DResult<T> {
    Err(DecodeError::Malformed)
}

struct Decoder<'a, 'b> {
    program: &'a Program,
    heap: &'a mut Heap,
    stack: &'a mut OperandStack,
    ids: HashMap<i64, HeapRef>,
    r: Reader<'b>,
}

impl<'a, 'b> Decoder<'a, 'b> {
    fn read_tag(&mut self) -> DResult<u8> {
        self.r.read_byte().or_else(malformed)
    }

    fn expect_tag(&mut self, expected: u8) -> DResult<()> {
        if self.read_tag()? == expected {
            Ok(())
        } else {
            Err(DecodeError::Malformed)
        }
    }

    fn decode_object(&mut self) -> DResult<Option<HeapRef>> {
        self.expect_tag(tag::OBJ)?;
        let present = self.r.read_bool().or_else(malformed)?;
        if !present {
            return Ok(None);
        }
        let name = self.r.read_string().or_else(malformed)?;
        let id = self.r.read_i64().or_else(malformed)?;
        if id > 0 {
            return self.ids.get(&id).copied().map(Some).ok_or(DecodeError::Malformed);
        }
        let id = -id;
        let class = self
            .program
            .get_class_by_name(&name)
            .ok_or_else(|| DecodeError::Fatal(FatalError::DeserializationUnknownClass(name.clone())))?;
        let class_id = class.id;
        let instance_space = class.instance_space;
        let decls = class.instance_declarations.clone();

        let r = self.heap.allocate_object(class_id, instance_space);
        self.ids.insert(id, r);
        self.stack.push_ref(Some(r));

        let mut fields = Vec::with_capacity(decls.len());
        for kind in decls {
            fields.push(self.decode_field(kind)?);
        }
        if let Some(HeapData::Object(inst)) = self.heap.get_mut(r) {
            inst.fields = fields;
        }
        Ok(Some(r))
    }

    fn decode_field(&mut self, kind: ParamKind) -> DResult<Word> {
        match kind {
            ParamKind::Bool => {
                self.expect_tag(tag::BOOL)?;
                Ok(Word::Int(self.r.read_i64().or_else(malformed)?))
            }
            ParamKind::Byte => {
                self.expect_tag(tag::BYTE)?;
                Ok(Word::Int(self.r.read_i64().or_else(malformed)?))
            }
            ParamKind::Char => {
                self.expect_tag(tag::CHAR)?;
                Ok(Word::Int(self.r.read_i64().or_else(malformed)?))
            }
            ParamKind::Int => {
                self.expect_tag(tag::INT)?;
                Ok(Word::Int(self.r.read_i64().or_else(malformed)?))
            }
            ParamKind::Float => {
                self.expect_tag(tag::FLOAT)?;
                Ok(Word::Float(self.r.read_f64().or_else(malformed)?))
            }
            ParamKind::FuncParm => {
                self.expect_tag(tag::FUNC)?;
                Ok(Word::Int(self.r.read_i64().or_else(malformed)?))
            }
            ParamKind::ObjParm(_) => Ok(Word::Ref(self.decode_object()?)),
            ParamKind::ByteAryParm => Ok(Word::Ref(self.decode_array(tag::BYTE_ARY)?)),
            ParamKind::CharAryParm => Ok(Word::Ref(self.decode_array(tag::CHAR_ARY)?)),
            ParamKind::IntAryParm => Ok(Word::Ref(self.decode_array(tag::INT_ARY)?)),
            ParamKind::FloatAryParm => Ok(Word::Ref(self.decode_array(tag::FLOAT_ARY)?)),
            ParamKind::ObjAryParm(_) => Ok(Word::Ref(self.decode_array(tag::OBJ_ARY)?)),
        }
    }

    fn decode_array(&mut self, expected_tag: u8) -> DResult<Option<HeapRef>> {
        self.expect_tag(expected_tag)?;
        let present = self.r.read_bool().or_else(malformed)?;
        if !present {
            return Ok(None);
        }
        let id = self.r.read_i64().or_else(malformed)?;
        if id > 0 {
            return self.ids.get(&id).copied().map(Some).ok_or(DecodeError::Malformed);
        }
        let id = -id;
        let total = self.r.read_i64().or_else(malformed)?;
        let dim_count = self.r.read_i32().or_else(malformed)?.max(0);
        let mut dim_sizes = Vec::with_capacity(dim_count as usize);
        for _ in 0..dim_count {
            dim_sizes.push(self.r.read_i64().or_else(malformed)?);
        }
        let elem_kind = match expected_tag {
            tag::BYTE_ARY => ArrayElemKind::Byte,
            tag::CHAR_ARY => ArrayElemKind::Char,
            tag::INT_ARY => ArrayElemKind::Int,
            tag::FLOAT_ARY => ArrayElemKind::Float,
            tag::OBJ_ARY => ArrayElemKind::Object,
            _ => return Err(DecodeError::Malformed),
        };

        let r = self.heap.allocate_array(total, dim_sizes, elem_kind);
        self.ids.insert(id, r);
        self.stack.push_ref(Some(r));

        let len = self.r.read_i32().or_else(malformed)?.max(0) as usize;
        let payload = match elem_kind {
            ArrayElemKind::Byte | ArrayElemKind::Char => {
                let mut bytes = Vec::with_capacity(len);
                for _ in 0..len {
                    bytes.push(self.r.read_byte().or_else(malformed)?);
                }
                ArrayPayload::Bytes(bytes)
            }
            ArrayElemKind::Float => {
                let mut floats = Vec::with_capacity(len);
                for _ in 0..len {
                    floats.push(self.r.read_f64().or_else(malformed)?);
                }
                ArrayPayload::Floats(floats)
            }
            ArrayElemKind::Object => {
                let mut words = Vec::with_capacity(len);
                for _ in 0..len {
                    words.push(Word::Ref(self.decode_object()?));
                }
                ArrayPayload::Words(words)
            }
            ArrayElemKind::Int | ArrayElemKind::Function => {
                let mut words = Vec::with_capacity(len);
                for _ in 0..len {
                    words.push(Word::Int(self.r.read_i64().or_else(malformed)?));
                }
                ArrayPayload::Words(words)
            }
        };
        if let Some(HeapData::Array(array)) = self.heap.get_mut(r) {
            array.payload = payload;
        }
        Ok(Some(r))
    }
}

/// Decode one `DESERL_*` trap's byte-array operand into the value `kind`
/// names.
pub fn decode_value(
    program: &Program,
    heap: &mut Heap,
    stack: &mut OperandStack,
    kind: SerialKind,
    bytes: &[u8],
) -> DResult<SerialValue> {
    let mut dec = Decoder {
        program,
        heap,
        stack,
        ids: HashMap::new(),
        r: Reader::new(bytes),
    };
    Ok(match kind {
        SerialKind::Char => {
            dec.expect_tag(tag::CHAR)?;
            SerialValue::Char(dec.r.read_i64().or_else(malformed)?)
        }
        SerialKind::Int => {
            dec.expect_tag(tag::INT)?;
            SerialValue::Int(dec.r.read_i64().or_else(malformed)?)
        }
        SerialKind::Float => {
            dec.expect_tag(tag::FLOAT)?;
            SerialValue::Float(dec.r.read_f64().or_else(malformed)?)
        }
        SerialKind::ObjInst => SerialValue::ObjInst(dec.decode_object()?),
        SerialKind::ByteAry => SerialValue::ByteAry(dec.decode_array(tag::BYTE_ARY)?),
        SerialKind::CharAry => SerialValue::CharAry(dec.decode_array(tag::CHAR_ARY)?),
        SerialKind::IntAry => SerialValue::IntAry(dec.decode_array(tag::INT_ARY)?),
        SerialKind::FloatAry => SerialValue::FloatAry(dec.decode_array(tag::FLOAT_ARY)?),
        SerialKind::ObjAry => SerialValue::ObjAry(dec.decode_array(tag::OBJ_ARY)?),
    })
}
