//! Stop-the-world mark-and-sweep
//!
//! 1. Acquire the collection lock (only one collection runs at a time).
//! 2. Pause every registered mutator thread at its next safe point.
//! 3. Mark: seed a worklist from every thread's root snapshot plus the
//!    class-memory roots, then transitively follow object fields and array
//!    object-slots, flipping each visited cell's `marked` bit.
//! 4. Sweep: any cell not marked is freed and its slot returned to the
//!    heap's free list; every surviving cell's mark bit is cleared for the
//!    next cycle.
//! 5. Resume every paused thread.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::memory::class_memory::ClassMemory;
use crate::memory::heap::{ArrayElemKind, ArrayPayload, Heap, HeapData, HeapRef};
use crate::memory::roots::MonitorRegistry;
use crate::vm::stack::Word;

/// Counters surfaced after a collection for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionReport {
    pub cells_before: usize,
    pub cells_swept: usize,
    pub bytes_reclaimed: usize,
}

/// Owns the single process-wide collection lock.
#[derive(Default)]
pub struct Collector {
    collection_lock: Mutex<()>,
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector").finish_non_exhaustive()
    }
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one full stop-the-world collection cycle.
    pub fn collect(&self, heap: &mut Heap, class_memory: &ClassMemory, registry: &MonitorRegistry) -> CollectionReport {
        let _guard = self.collection_lock.lock().unwrap();

        let snapshots = registry.pause_world();

        let mut worklist: VecDeque<HeapRef> = VecDeque::new();
        for snap in &snapshots {
            worklist.extend(snap.refs.iter().copied());
        }
        worklist.extend(class_memory.trace_refs());

        let bytes_before = heap.bytes_live();
        let cells_before = heap.cells.len();

        while let Some(r) = worklist.pop_front() {
            let Some(cell) = heap.cells.get_mut(r.0 as usize).and_then(|c| c.as_mut()) else {
                continue;
            };
            if cell.marked {
                continue;
            }
            cell.marked = true;
            match &cell.data {
                HeapData::Object(instance) => {
                    for field in &instance.fields {
                        if let Word::Ref(Some(child)) = field {
                            worklist.push_back(*child);
                        }
                    }
                }
                HeapData::Array(array) => {
                    if matches!(array.elem_kind, ArrayElemKind::Object | ArrayElemKind::Function) {
                        if let ArrayPayload::Words(words) = &array.payload {
                            for w in words {
                                if let Word::Ref(Some(child)) = w {
                                    worklist.push_back(*child);
                                }
                            }
                        }
                    }
                }
            }
        }

        let mut cells_swept = 0usize;
        for (idx, slot) in heap.cells.iter_mut().enumerate() {
            let should_free = match slot {
                Some(cell) if !cell.marked => true,
                _ => false,
            };
            if should_free {
                *slot = None;
                heap.free_list.push(idx as u32);
                cells_swept += 1;
            } else if let Some(cell) = slot {
                cell.marked = false;
            }
        }

        heap.bytes_live = heap
            .cells
            .iter()
            .flatten()
            .map(cell_size_words)
            .sum::<usize>()
            * std::mem::size_of::<i64>();
        let bytes_reclaimed = bytes_before.saturating_sub(heap.bytes_live);

        registry.resume_world();

        CollectionReport {
            cells_before,
            cells_swept,
            bytes_reclaimed,
        }
    }
}

fn cell_size_words(cell: &crate::memory::heap::Cell) -> usize {
    match &cell.data {
        HeapData::Object(instance) => instance.fields.len(),
        HeapData::Array(array) => {
            3 + match &array.payload {
                ArrayPayload::Bytes(b) => b.len(),
                ArrayPayload::Words(w) => w.len(),
                ArrayPayload::Floats(f) => f.len(),
            }
        }
    }
}
