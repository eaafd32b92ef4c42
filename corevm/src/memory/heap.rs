//! Heap allocator
//!
//! Heap cells are addressed by a dense `HeapRef` handle rather than a raw
//! pointer. This keeps the collector and the interpreter's operand/local
//! words entirely in safe Rust:
//! object allocation returns a zeroed block sized to the class's
//! `instance_space`, tagged with its owning class id; array allocation
//! returns a block with the three-word prologue (`total`, `dims`,
//! `outer_dim_size`) followed by payload, tagged with its element kind.

use serde::{Deserialize, Serialize};

use crate::program::ClassId;
use crate::vm::stack::Word;

/// Opaque handle to a heap-allocated object or array. `Copy` so it behaves
/// like a one-word reference on the operand stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HeapRef(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrayElemKind {
    Byte,
    Char,
    Int,
    Float,
    Object,
    Function,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ArrayPayload {
    /// Byte and char-byte arrays: one byte per element.
    Bytes(Vec<u8>),
    /// Int, object, and function-array elements: one word per element.
    /// Function-array elements occupy two consecutive words: class id,
    /// then method id.
    Words(Vec<Word>),
    /// Float arrays: one float per element.
    Floats(Vec<f64>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrayObject {
    pub elem_kind: ArrayElemKind,
    /// Three-word prologue: total element count, dimension count, and the
    /// outermost dimension's size (retained for multi-dim slicing); any
    /// further dimension sizes follow as a small inline extension.
    pub total_count: i64,
    pub dim_sizes: Vec<i64>,
    pub payload: ArrayPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub class_id: ClassId,
    pub fields: Vec<Word>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HeapData {
    Object(Instance),
    Array(ArrayObject),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Cell {
    pub data: HeapData,
    pub marked: bool,
}

/// The heap: a dense arena of cells with a free list of reclaimed slots.
#[derive(Debug, Default)]
pub struct Heap {
    pub(crate) cells: Vec<Option<Cell>>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) bytes_live: usize,
    pub(crate) collection_threshold_bytes: usize,
}

impl Heap {
    pub fn new(collection_threshold_bytes: usize) -> Self {
        Self {
            cells: Vec::new(),
            free_list: Vec::new(),
            bytes_live: 0,
            collection_threshold_bytes,
        }
    }

    fn insert(&mut self, data: HeapData, size_words: usize) -> HeapRef {
        let cell = Cell { data, marked: false };
        self.bytes_live += size_words * std::mem::size_of::<i64>();
        if let Some(slot) = self.free_list.pop() {
            self.cells[slot as usize] = Some(cell);
            HeapRef(slot)
        } else {
            let idx = self.cells.len() as u32;
            self.cells.push(Some(cell));
            HeapRef(idx)
        }
    }

    pub fn allocate_object(&mut self, class_id: ClassId, instance_space: i32) -> HeapRef {
        let size = instance_space.max(0) as usize;
        self.insert(
            HeapData::Object(Instance {
                class_id,
                fields: vec![Word::Int(0); size],
            }),
            size,
        )
    }

    pub fn allocate_array(&mut self, elem_count: i64, dim_sizes: Vec<i64>, elem_kind: ArrayElemKind) -> HeapRef {
        let count = elem_count.max(0) as usize;
        let payload = match elem_kind {
            ArrayElemKind::Byte | ArrayElemKind::Char => ArrayPayload::Bytes(vec![0u8; count]),
            ArrayElemKind::Float => ArrayPayload::Floats(vec![0.0; count]),
            ArrayElemKind::Int | ArrayElemKind::Object | ArrayElemKind::Function => {
                ArrayPayload::Words(vec![Word::Int(0); count])
            }
        };
        self.insert(
            HeapData::Array(ArrayObject {
                elem_kind,
                total_count: elem_count,
                dim_sizes,
                payload,
            }),
            count + 3,
        )
    }

    pub fn get(&self, r: HeapRef) -> Option<&HeapData> {
        self.cells.get(r.0 as usize)?.as_ref().map(|c| &c.data)
    }

    pub fn get_mut(&mut self, r: HeapRef) -> Option<&mut HeapData> {
        self.cells.get_mut(r.0 as usize)?.as_mut().map(|c| &mut c.data)
    }

    pub fn is_live(&self, r: HeapRef) -> bool {
        matches!(self.cells.get(r.0 as usize), Some(Some(_)))
    }

    pub fn bytes_live(&self) -> usize {
        self.bytes_live
    }

    pub fn over_threshold(&self) -> bool {
        self.bytes_live > self.collection_threshold_bytes
    }
}
