//! Per-object critical-section monitors
//!
//! `CRITICAL_START`/`CRITICAL_END` bracket a region holding the monitor for
//! the object on top of the stack. Reentrant: the same thread re-entering
//! its own held monitor must not deadlock.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::memory::heap::HeapRef;

struct ReentrantMonitor {
    owner: Option<std::thread::ThreadId>,
    depth: usize,
}

/// A table of per-object monitors: a mutex-protected bucket map with one
/// entry per live object rather than one process-wide lock.
#[derive(Default)]
pub struct CriticalSections {
    buckets: Mutex<HashMap<HeapRef, Mutex<ReentrantMonitor>>>,
}

impl std::fmt::Debug for CriticalSections {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CriticalSections").finish_non_exhaustive()
    }
}

impl CriticalSections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the monitor for `object`, blocking if another thread holds it.
    /// Re-entering from the thread that already holds it just bumps the
    /// depth counter.
    pub fn enter(&self, object: HeapRef) {
        let bucket_exists = {
            let mut buckets = self.buckets.lock().unwrap();
            buckets.entry(object).or_insert_with(|| Mutex::new(ReentrantMonitor { owner: None, depth: 0 }));
            true
        };
        debug_assert!(bucket_exists);
        let this_thread = std::thread::current().id();
        loop {
            let buckets = self.buckets.lock().unwrap();
            let bucket = buckets.get(&object).expect("bucket just inserted");
            let mut guard: MutexGuard<ReentrantMonitor> = bucket.lock().unwrap();
            match guard.owner {
                None => {
                    guard.owner = Some(this_thread);
                    guard.depth = 1;
                    return;
                }
                Some(owner) if owner == this_thread => {
                    guard.depth += 1;
                    return;
                }
                Some(_) => {
                    drop(guard);
                    drop(buckets);
                    std::thread::yield_now();
                }
            }
        }
    }

    /// Leave a monitor entered on this thread. A no-op if the depth reaches
    /// zero, releasing it for the next waiter.
    pub fn exit(&self, object: HeapRef) {
        let buckets = self.buckets.lock().unwrap();
        let Some(bucket) = buckets.get(&object) else { return };
        let mut guard = bucket.lock().unwrap();
        if guard.depth > 0 {
            guard.depth -= 1;
            if guard.depth == 0 {
                guard.owner = None;
            }
        }
    }
}
