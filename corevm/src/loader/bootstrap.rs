//! Bootstrap argument-array construction
//!
//! The source synthesizes a small bytecode preamble that allocates an
//! object array sized to argc, fills each slot with a string wrapping a
//! freshly allocated char array, and falls through to `MTHD_CALL` on the
//! start method. Since this crate already represents strings as bare
//! `Char`-array heap cells, the same heap
//! shape is reached by building the array directly and handing it to
//! [`crate::vm::Interpreter::execute`] as the start method's sole argument,
//! without emitting instructions nobody else ever steps through.

use crate::memory::heap::{ArrayElemKind, ArrayPayload, Heap, HeapData, HeapRef};
use crate::vm::exec::strings::alloc_string;
use crate::vm::stack::Word;

/// Build the `argv`-equivalent object array the start method receives.
pub fn build_args_array(heap: &mut Heap, args: &[String]) -> HeapRef {
    let refs: Vec<HeapRef> = args.iter().map(|a| alloc_string(heap, a)).collect();
    let array_ref = heap.allocate_array(refs.len() as i64, vec![refs.len() as i64], ArrayElemKind::Object);
    if let Some(HeapData::Array(array)) = heap.get_mut(array_ref) {
        if let ArrayPayload::Words(words) = &mut array.payload {
            for (slot, r) in words.iter_mut().zip(refs) {
                *slot = Word::Ref(Some(r));
            }
        }
    }
    array_ref
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::exec::strings::read_string;

    #[test]
    fn builds_an_array_of_wrapped_strings() {
        let mut heap = Heap::new(usize::MAX);
        let args = vec!["one".to_string(), "two".to_string()];
        let array_ref = build_args_array(&mut heap, &args);
        let HeapData::Array(array) = heap.get(array_ref).unwrap() else { panic!("expected array") };
        assert_eq!(array.total_count, 2);
        let ArrayPayload::Words(words) = &array.payload else { panic!("expected word payload") };
        let Word::Ref(Some(first)) = words[0] else { panic!("expected ref") };
        assert_eq!(read_string(&heap, first).unwrap(), "one");
    }
}
