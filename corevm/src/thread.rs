//! Worker-thread registry
//!
//! `ASYNC_MTHD_CALL` spawns a new OS thread running its own interpreter
//! instance against the shared [`Program`](crate::program::Program) and
//! [`Memory`](crate::memory::Memory); the spawning thread gets back an
//! opaque handle id to later pass to `THREAD_JOIN`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::thread::JoinHandle;

#[derive(Default)]
pub struct ThreadRegistry {
    next_id: AtomicI64,
    handles: Mutex<HashMap<i64, JoinHandle<()>>>,
}

impl std::fmt::Debug for ThreadRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadRegistry").finish_non_exhaustive()
    }
}

impl ThreadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `body` as a new OS thread and register its handle, returning
    /// the opaque id bytecode will later pass to `THREAD_JOIN`.
    pub fn spawn(&self, body: impl FnOnce() + Send + 'static) -> i64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let handle = std::thread::Builder::new()
            .name(format!("corevm-worker-{id}"))
            .spawn(body)
            .expect("failed to spawn worker thread");
        self.handles.lock().unwrap().insert(id, handle);
        id
    }

    /// Block the calling thread until the given worker finishes. A second
    /// join on an already-reaped id is a silent no-op, matching other
    /// opaque-handle traps' recoverable contract.
    pub fn join(&self, id: i64) {
        let handle = self.handles.lock().unwrap().remove(&id);
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    pub fn live_count(&self) -> usize {
        self.handles.lock().unwrap().len()
    }
}

/// `THREAD_SLEEP` blocks the calling thread for the given number of
/// milliseconds.
pub fn sleep_millis(millis: u64) {
    std::thread::sleep(std::time::Duration::from_millis(millis));
}
