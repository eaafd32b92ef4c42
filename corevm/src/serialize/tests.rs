use std::collections::BTreeMap;

use crate::memory::heap::{ArrayElemKind, Heap, HeapData};
use crate::program::{Class, ClassFlags, ClassId, ParamKind, Program};
use crate::vm::stack::{OperandStack, Word};

use super::{decode_value, encode_value, SerialKind, SerialValue};

fn node_class(id: ClassId, self_ref: ClassId) -> Class {
    Class {
        id,
        name: format!("Node{id}"),
        file_name: None,
        parent_id: None,
        interface_ids: Vec::new(),
        class_space: 0,
        instance_space: 1,
        class_declarations: Vec::new(),
        instance_declarations: vec![ParamKind::ObjParm(self_ref)],
        closure_declarations: BTreeMap::new(),
        methods: BTreeMap::new(),
        flags: ClassFlags::default(),
    }
}

fn test_program() -> Program {
    let mut classes = BTreeMap::new();
    let mut class_names = std::collections::HashMap::new();
    let class = node_class(0, 0);
    class_names.insert(class.name.clone(), 0);
    classes.insert(0, class);
    Program {
        classes,
        class_names,
        enums: std::collections::HashMap::new(),
        float_pool: Vec::new(),
        int_pool: Vec::new(),
        char_pool: Vec::new(),
        string_class_id: None,
        start_class_id: None,
        start_method_id: None,
        dispatch_cache: Default::default(),
    }
}

#[test]
fn scalar_int_round_trips() {
    let program = test_program();
    let heap = Heap::new(usize::MAX);
    let bytes = encode_value(&program, &heap, SerialValue::Int(42));
    let mut heap = heap;
    let mut stack = OperandStack::new();
    match decode_value(&program, &mut heap, &mut stack, SerialKind::Int, &bytes).unwrap() {
        SerialValue::Int(v) => assert_eq!(v, 42),
        _ => panic!("wrong variant"),
    }
}

#[test]
fn float_round_trips() {
    let program = test_program();
    let heap = Heap::new(usize::MAX);
    let bytes = encode_value(&program, &heap, SerialValue::Float(1.5));
    let mut heap = heap;
    let mut stack = OperandStack::new();
    match decode_value(&program, &mut heap, &mut stack, SerialKind::Float, &bytes).unwrap() {
        SerialValue::Float(v) => assert_eq!(v, 1.5),
        _ => panic!("wrong variant"),
    }
}

#[test]
fn byte_array_round_trips() {
    let program = test_program();
    let mut heap = Heap::new(usize::MAX);
    let r = heap.allocate_array(3, vec![3], ArrayElemKind::Byte);
    if let Some(HeapData::Array(arr)) = heap.get_mut(r) {
        arr.payload = crate::memory::heap::ArrayPayload::Bytes(vec![1, 2, 3]);
    }
    let bytes = encode_value(&program, &heap, SerialValue::ByteAry(Some(r)));

    let mut stack = OperandStack::new();
    let decoded = decode_value(&program, &mut heap, &mut stack, SerialKind::ByteAry, &bytes).unwrap();
    let SerialValue::ByteAry(Some(new_ref)) = decoded else {
        panic!("expected a live array reference")
    };
    match heap.get(new_ref) {
        Some(HeapData::Array(arr)) => {
            assert_eq!(arr.total_count, 3);
            match &arr.payload {
                crate::memory::heap::ArrayPayload::Bytes(b) => assert_eq!(b, &vec![1, 2, 3]),
                _ => panic!("expected byte payload"),
            }
        }
        _ => panic!("expected an array cell"),
    }
}

/// Scenario S5: two objects referencing each other. Serializing
/// one and deserializing it must reconstruct the cycle through identity,
/// not an infinite unrolled copy.
#[test]
fn cyclic_object_graph_preserves_sharing() {
    let program = test_program();
    let mut heap = Heap::new(usize::MAX);
    let a = heap.allocate_object(0, 1);
    let b = heap.allocate_object(0, 1);
    if let Some(HeapData::Object(inst)) = heap.get_mut(a) {
        inst.fields[0] = Word::Ref(Some(b));
    }
    if let Some(HeapData::Object(inst)) = heap.get_mut(b) {
        inst.fields[0] = Word::Ref(Some(a));
    }

    let bytes = encode_value(&program, &heap, SerialValue::ObjInst(Some(a)));

    let mut stack = OperandStack::new();
    let decoded = decode_value(&program, &mut heap, &mut stack, SerialKind::ObjInst, &bytes).unwrap();
    let SerialValue::ObjInst(Some(a_prime)) = decoded else {
        panic!("expected a live object reference")
    };

    let Some(HeapData::Object(a_inst)) = heap.get(a_prime) else {
        panic!("a' missing")
    };
    let Word::Ref(Some(b_prime)) = a_inst.fields[0] else {
        panic!("a'.next missing")
    };
    let Some(HeapData::Object(b_inst)) = heap.get(b_prime) else {
        panic!("b' missing")
    };
    let Word::Ref(Some(back_to_a)) = b_inst.fields[0] else {
        panic!("b'.next missing")
    };
    assert_eq!(back_to_a, a_prime, "a'.next.next must be identical to a'");
}

#[test]
fn nil_object_round_trips_as_none() {
    let program = test_program();
    let heap = Heap::new(usize::MAX);
    let bytes = encode_value(&program, &heap, SerialValue::ObjInst(None));
    let mut heap = heap;
    let mut stack = OperandStack::new();
    match decode_value(&program, &mut heap, &mut stack, SerialKind::ObjInst, &bytes).unwrap() {
        SerialValue::ObjInst(None) => {}
        _ => panic!("expected nil"),
    }
}

#[test]
fn unknown_class_on_decode_is_fatal() {
    let program = test_program();
    let other = test_program();
    let mut heap = Heap::new(usize::MAX);
    let a = heap.allocate_object(0, 1);
    // Encode against a program where class 0 is named "Ghost" so the
    // decoding program (which only knows "Node0") can't resolve it.
    let mut ghost_program = other;
    ghost_program.classes.get_mut(&0).unwrap().name = "Ghost".into();
    ghost_program.class_names.clear();
    ghost_program.class_names.insert("Ghost".into(), 0);

    let bytes = encode_value(&ghost_program, &heap, SerialValue::ObjInst(Some(a)));
    let mut stack = OperandStack::new();
    let err = decode_value(&program, &mut heap, &mut stack, SerialKind::ObjInst, &bytes).unwrap_err();
    assert!(matches!(err, super::DecodeError::Fatal(_)));
}
