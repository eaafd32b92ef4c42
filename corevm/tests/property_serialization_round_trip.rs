//! Law 5: every scalar and array kind the `SERL_*`/`DESERL_*`
//! traps expose survives an encode/decode round trip, driven directly
//! through [`corevm::traps::dispatch`] rather than through bytecode (the
//! cycle-preserving object case is covered end to end by
//! `scenario_serialize_cycle` instead).

mod common;

use corevm::config::Properties;
use corevm::memory::heap::{ArrayElemKind, ArrayPayload, HeapData};
use corevm::memory::Memory;
use corevm::thread::ThreadRegistry;
use corevm::traps::{self, Selector};
use corevm::vm::stack::{OperandStack, Word};

fn round_trip(serl: Selector, deserl: Selector, push_value: impl FnOnce(&mut OperandStack)) -> OperandStack {
    let program = common::program(Vec::new(), 0, 0);
    let memory = Memory::new();
    let properties = Properties::new();
    let threads = ThreadRegistry::new();
    let mut stack = OperandStack::new();

    push_value(&mut stack);
    traps::dispatch(serl as i32, &mut stack, &memory, &program, &properties, &threads).unwrap();
    traps::dispatch(deserl as i32, &mut stack, &memory, &program, &properties, &threads).unwrap();
    stack
}

#[test]
fn int_round_trips() {
    let mut stack = round_trip(Selector::SerlInt, Selector::DeserlInt, |s| s.push_int(-7));
    assert_eq!(stack.pop_int().unwrap(), -7);
}

#[test]
fn float_round_trips() {
    let mut stack = round_trip(Selector::SerlFloat, Selector::DeserlFloat, |s| s.push_float(2.5));
    assert_eq!(stack.pop_float().unwrap(), 2.5);
}

#[test]
fn char_round_trips() {
    let mut stack = round_trip(Selector::SerlChar, Selector::DeserlChar, |s| s.push_int('Q' as i64));
    assert_eq!(stack.pop_int().unwrap(), 'Q' as i64);
}

#[test]
fn int_array_round_trips() {
    let memory = Memory::new();
    let program = common::program(Vec::new(), 0, 0);
    let properties = Properties::new();
    let threads = ThreadRegistry::new();
    let mut stack = OperandStack::new();

    let r = {
        let mut heap = memory.heap.lock().unwrap();
        let r = heap.allocate_array(3, vec![3], ArrayElemKind::Int);
        if let Some(HeapData::Array(array)) = heap.get_mut(r) {
            array.payload = ArrayPayload::Words(vec![Word::Int(1), Word::Int(2), Word::Int(3)]);
        }
        r
    };
    stack.push_ref(Some(r));
    traps::dispatch(Selector::SerlIntAry as i32, &mut stack, &memory, &program, &properties, &threads).unwrap();
    traps::dispatch(Selector::DeserlIntAry as i32, &mut stack, &memory, &program, &properties, &threads).unwrap();

    let decoded = stack.pop_ref().unwrap().expect("decoded array must not be nil");
    let heap = memory.heap.lock().unwrap();
    let Some(HeapData::Array(array)) = heap.get(decoded) else {
        panic!("decoded reference is not an array");
    };
    assert_eq!(array.payload, ArrayPayload::Words(vec![Word::Int(1), Word::Int(2), Word::Int(3)]));
}
