//! Memory manager: allocator, collector, root enumeration,
//! and per-class static storage wired together behind one facade the
//! interpreter and trap handlers call through.

pub mod class_memory;
pub mod gc;
pub mod heap;
pub mod roots;

pub use class_memory::ClassMemory;
pub use gc::{Collector, CollectionReport};
pub use heap::{ArrayElemKind, ArrayObject, ArrayPayload, Heap, HeapData, HeapRef, Instance};
pub use roots::{Monitor, MonitorRegistry, RootSnapshot};

use std::sync::{Arc, Mutex};

/// Default allocation threshold that triggers an automatic collection
/// before the next object allocation,
/// expressed in bytes of live data.
pub const DEFAULT_COLLECTION_THRESHOLD_BYTES: usize = 32 * 1024 * 1024;

/// The process-wide memory subsystem, shared by every interpreter thread
/// via `Arc`.
pub struct Memory {
    pub heap: Mutex<Heap>,
    pub class_memory: ClassMemory,
    pub monitors: MonitorRegistry,
    collector: Collector,
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory").finish_non_exhaustive()
    }
}

impl Memory {
    pub fn new() -> Arc<Self> {
        Self::with_threshold(DEFAULT_COLLECTION_THRESHOLD_BYTES)
    }

    pub fn with_threshold(collection_threshold_bytes: usize) -> Arc<Self> {
        Arc::new(Self {
            heap: Mutex::new(Heap::new(collection_threshold_bytes)),
            class_memory: ClassMemory::new(),
            monitors: MonitorRegistry::new(),
            collector: Collector::new(),
        })
    }

    /// Run a collection cycle right now, regardless of the allocation
    /// threshold. Used both by the automatic trigger in the allocation
    /// instructions and by the `System.Runtime.ForceGc` trap.
    pub fn collect_now(&self) -> CollectionReport {
        let mut heap = self.heap.lock().unwrap();
        self.collector.collect(&mut heap, &self.class_memory, &self.monitors)
    }

    /// Whether live bytes currently exceed the configured threshold — the
    /// interpreter checks this after every allocating instruction and
    /// collects eagerly if so.
    pub fn should_collect(&self) -> bool {
        self.heap.lock().unwrap().over_threshold()
    }
}
