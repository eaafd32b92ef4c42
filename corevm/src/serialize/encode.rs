//! Encoder half of the object-graph serializer

use std::collections::HashMap;

use crate::image::codec::Writer;
use crate::memory::heap::{ArrayElemKind, ArrayPayload, Heap, HeapData, HeapRef};
use crate::program::{ParamKind, Program};
use crate::vm::stack::Word;

use super::{tag, SerialValue};

fn as_int(word: Word) -> i64 {
    match word {
        Word::Int(v) => v,
        Word::Float(v) => v as i64,
        Word::Ref(_) => 0,
    }
}

fn as_float(word: Word) -> f64 {
    match word {
        Word::Float(v) => v,
        Word::Int(v) => v as f64,
        Word::Ref(_) => 0.0,
    }
}

fn as_ref(word: Word) -> Option<HeapRef> {
    match word {
        Word::Ref(r) => r,
        _ => None,
    }
}

struct Encoder<'a> {
    program: &'a Program,
    heap: &'a Heap,
    /// Identity map from heap address to the sharing id assigned at first
    /// encounter, held for the duration of one `encode_value` call.
    ids: HashMap<HeapRef, i64>,
    next_id: i64,
    w: Writer,
}

impl<'a> Encoder<'a> {
    fn new(program: &'a Program, heap: &'a Heap) -> Self {
        Self {
            program,
            heap,
            ids: HashMap::new(),
            next_id: 1,
            w: Writer::new(),
        }
    }

    fn fresh_id(&mut self, r: HeapRef) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        self.ids.insert(r, id);
        id
    }

    /// `OBJ` tag, nil flag, length-prefixed class name, sharing id, and —
    /// only on first encounter — every declared instance field in order.
    fn encode_object(&mut self, r: Option<HeapRef>) {
        self.w.write_byte(tag::OBJ);
        let Some(r) = r else {
            self.w.write_bool(false);
            return;
        };
        self.w.write_bool(true);
        let Some(HeapData::Object(inst)) = self.heap.get(r) else {
            // Not a live object cell; nothing sound to encode.
            self.w.write_string("");
            self.w.write_i64(0);
            return;
        };
        let class = self
            .program
            .get_class(inst.class_id)
            .expect("heap objects are always tagged with a resolvable class id");
        self.w.write_string(&class.name);
        if let Some(&id) = self.ids.get(&r) {
            self.w.write_i64(id);
            return;
        }
        let id = self.fresh_id(r);
        self.w.write_i64(-id);
        let fields = inst.fields.clone();
        let decls = class.instance_declarations.clone();
        for (idx, kind) in decls.into_iter().enumerate() {
            let word = fields.get(idx).copied().unwrap_or_else(Word::nil);
            self.encode_field(kind, word);
        }
    }

    fn encode_field(&mut self, kind: ParamKind, word: Word) {
        match kind {
            ParamKind::Bool => {
                self.w.write_byte(tag::BOOL);
                self.w.write_i64(as_int(word));
            }
            ParamKind::Byte => {
                self.w.write_byte(tag::BYTE);
                self.w.write_i64(as_int(word));
            }
            ParamKind::Char => {
                self.w.write_byte(tag::CHAR);
                self.w.write_i64(as_int(word));
            }
            ParamKind::Int => {
                self.w.write_byte(tag::INT);
                self.w.write_i64(as_int(word));
            }
            ParamKind::Float => {
                self.w.write_byte(tag::FLOAT);
                self.w.write_f64(as_float(word));
            }
            ParamKind::FuncParm => {
                self.w.write_byte(tag::FUNC);
                self.w.write_i64(as_int(word));
            }
            ParamKind::ObjParm(_) => self.encode_object(as_ref(word)),
            ParamKind::ByteAryParm => self.encode_array(as_ref(word), tag::BYTE_ARY),
            ParamKind::CharAryParm => self.encode_array(as_ref(word), tag::CHAR_ARY),
            ParamKind::IntAryParm => self.encode_array(as_ref(word), tag::INT_ARY),
            ParamKind::FloatAryParm => self.encode_array(as_ref(word), tag::FLOAT_ARY),
            ParamKind::ObjAryParm(_) => self.encode_array(as_ref(word), tag::OBJ_ARY),
        }
    }

    /// `tag + sharing id + the three prologue words + payload`. Object
    /// arrays recurse per element.
    fn encode_array(&mut self, r: Option<HeapRef>, expected_tag: u8) {
        self.w.write_byte(expected_tag);
        let Some(r) = r else {
            self.w.write_bool(false);
            return;
        };
        self.w.write_bool(true);
        if let Some(&id) = self.ids.get(&r) {
            self.w.write_i64(id);
            return;
        }
        let Some(HeapData::Array(array)) = self.heap.get(r) else {
            self.w.write_i64(0);
            return;
        };
        let id = self.fresh_id(r);
        self.w.write_i64(-id);
        self.w.write_i64(array.total_count);
        self.w.write_i32(array.dim_sizes.len() as i32);
        for d in &array.dim_sizes {
            self.w.write_i64(*d);
        }
        match &array.payload {
            ArrayPayload::Bytes(bytes) => {
                self.w.write_i32(bytes.len() as i32);
                for b in bytes {
                    self.w.write_byte(*b);
                }
            }
            ArrayPayload::Floats(floats) => {
                self.w.write_i32(floats.len() as i32);
                for v in floats {
                    self.w.write_f64(*v);
                }
            }
            ArrayPayload::Words(words) => {
                self.w.write_i32(words.len() as i32);
                let words = words.clone();
                match array.elem_kind {
                    ArrayElemKind::Object => {
                        for w in words {
                            self.encode_object(as_ref(w));
                        }
                    }
                    _ => {
                        for w in words {
                            self.w.write_i64(as_int(w));
                        }
                    }
                }
            }
        }
    }
}

/// Encode one `SERL_*` trap's operand into a fresh byte stream.
pub fn encode_value(program: &Program, heap: &Heap, value: SerialValue) -> Vec<u8> {
    let mut enc = Encoder::new(program, heap);
    match value {
        SerialValue::Char(v) => {
            enc.w.write_byte(tag::CHAR);
            enc.w.write_i64(v);
        }
        SerialValue::Int(v) => {
            enc.w.write_byte(tag::INT);
            enc.w.write_i64(v);
        }
        SerialValue::Float(v) => {
            enc.w.write_byte(tag::FLOAT);
            enc.w.write_f64(v);
        }
        SerialValue::ObjInst(r) => enc.encode_object(r),
        SerialValue::ByteAry(r) => enc.encode_array(r, tag::BYTE_ARY),
        SerialValue::CharAry(r) => enc.encode_array(r, tag::CHAR_ARY),
        SerialValue::IntAry(r) => enc.encode_array(r, tag::INT_ARY),
        SerialValue::FloatAry(r) => enc.encode_array(r, tag::FLOAT_ARY),
        SerialValue::ObjAry(r) => enc.encode_array(r, tag::OBJ_ARY),
    }
    enc.w.into_bytes()
}
