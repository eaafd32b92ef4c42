//! Per-class static storage
//!
//! One statically-allocated block of `class_space` words per class,
//! addressed by `CLASS`-context variable instructions. Lifetime equals the
//! program's: never freed by the collector, only released at teardown.
//! Scanned exactly (not conservatively) as a collection root, using each
//! class's declaration list to find reference-typed slots.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::memory::heap::HeapRef;
use crate::program::ClassId;
use crate::vm::stack::Word;

#[derive(Default)]
pub struct ClassMemory {
    blocks: Mutex<HashMap<ClassId, Vec<Word>>>,
}

impl std::fmt::Debug for ClassMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassMemory").finish_non_exhaustive()
    }
}

impl ClassMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, class_id: ClassId, class_space: i32) {
        let mut blocks = self.blocks.lock().unwrap();
        blocks
            .entry(class_id)
            .or_insert_with(|| vec![Word::nil(); class_space.max(0) as usize]);
    }

    pub fn load(&self, class_id: ClassId, slot: i32) -> Word {
        let blocks = self.blocks.lock().unwrap();
        blocks
            .get(&class_id)
            .and_then(|b| b.get(slot as usize))
            .copied()
            .unwrap_or_else(Word::nil)
    }

    pub fn store(&self, class_id: ClassId, slot: i32, value: Word) {
        let mut blocks = self.blocks.lock().unwrap();
        if let Some(block) = blocks.get_mut(&class_id) {
            if let Some(cell) = block.get_mut(slot as usize) {
                *cell = value;
            }
        }
    }

    /// Every `Word::Ref` across every class's static memory: root source 1.
    pub fn trace_refs(&self) -> Vec<HeapRef> {
        let blocks = self.blocks.lock().unwrap();
        blocks
            .values()
            .flat_map(|b| b.iter())
            .filter_map(|w| match w {
                Word::Ref(Some(r)) => Some(*r),
                _ => None,
            })
            .collect()
    }
}
