//! Root enumeration across mutator threads
//!
//! Each interpreter thread publishes a fresh `RootSnapshot` at every
//! instruction boundary and registers a `Monitor` handle with the process-
//! wide `MonitorRegistry` when it starts. The collector never reaches into
//! a live `CallStack`/`OperandStack` directly — doing so while the mutator
//! is mid-instruction would race. Instead it asks every monitor to pause,
//! waits until each has actually parked, then reads the last snapshot each
//! one published. This is the "signal and wait for a safe point" step of
//! collection; the per-instruction boundary is the only place a thread is
//! guaranteed not to be holding an uncounted reference it hasn't published
//! yet.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use crate::memory::heap::HeapRef;
use crate::vm::frame::CallStack;
use crate::vm::stack::OperandStack;

/// The references reachable from one thread's operand stack and call-stack
/// locals as of its last published boundary.
#[derive(Debug, Clone, Default)]
pub struct RootSnapshot {
    pub refs: Vec<HeapRef>,
}

impl RootSnapshot {
    pub fn capture(operand_stack: &OperandStack, call_stack: &CallStack) -> Self {
        let mut refs: Vec<HeapRef> = operand_stack.trace_refs().collect();
        for frame in call_stack.frames() {
            refs.extend(frame.trace_refs());
        }
        Self { refs }
    }
}

/// One mutator thread's safe-point handle. Shared between the thread that
/// owns it (which publishes snapshots and checks `pause_requested`) and the
/// collector (which sets `pause_requested` and reads `snapshot`).
pub struct Monitor {
    snapshot: Mutex<RootSnapshot>,
    pause_requested: AtomicBool,
    parked: AtomicBool,
    resume: Condvar,
    resume_lock: Mutex<()>,
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("pause_requested", &self.pause_requested.load(Ordering::SeqCst))
            .field("parked", &self.parked.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl Monitor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            snapshot: Mutex::new(RootSnapshot::default()),
            pause_requested: AtomicBool::new(false),
            parked: AtomicBool::new(false),
            resume: Condvar::new(),
            resume_lock: Mutex::new(()),
        })
    }

    /// Called by the owning interpreter thread between every instruction.
    /// Publishes the current root set, then blocks here (at this exact
    /// boundary, never mid-instruction) if the collector has asked for a
    /// safe point.
    pub fn checkpoint(&self, operand_stack: &OperandStack, call_stack: &CallStack) {
        *self.snapshot.lock().unwrap() = RootSnapshot::capture(operand_stack, call_stack);
        if self.pause_requested.load(Ordering::Acquire) {
            self.park();
        }
    }

    fn park(&self) {
        let guard = self.resume_lock.lock().unwrap();
        self.parked.store(true, Ordering::Release);
        let _guard = self
            .resume
            .wait_while(guard, |_| self.pause_requested.load(Ordering::Acquire))
            .unwrap();
        self.parked.store(false, Ordering::Release);
    }

    /// Called by the collector. Returns the snapshot published at the most
    /// recent checkpoint, which is valid for the duration of the pause
    /// because the owning thread is now parked inside `checkpoint`.
    fn request_pause(&self) {
        self.pause_requested.store(true, Ordering::Release);
    }

    fn is_parked(&self) -> bool {
        self.parked.load(Ordering::Acquire)
    }

    fn snapshot(&self) -> RootSnapshot {
        self.snapshot.lock().unwrap().clone()
    }

    fn resume_all(&self) {
        self.pause_requested.store(false, Ordering::Release);
        let _guard = self.resume_lock.lock().unwrap();
        self.resume.notify_all();
    }
}

/// Process-wide registry of live mutator threads, keyed by an opaque
/// monotonically increasing id.
#[derive(Default)]
pub struct MonitorRegistry {
    inner: Mutex<Vec<(u64, Arc<Monitor>)>>,
    next_id: Mutex<u64>,
}

impl std::fmt::Debug for MonitorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorRegistry").finish_non_exhaustive()
    }
}

impl MonitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self) -> (u64, Arc<Monitor>) {
        let monitor = Monitor::new();
        let mut next_id = self.next_id.lock().unwrap();
        let id = *next_id;
        *next_id += 1;
        drop(next_id);
        self.inner.lock().unwrap().push((id, monitor.clone()));
        (id, monitor)
    }

    pub fn unregister(&self, id: u64) {
        self.inner.lock().unwrap().retain(|(mid, _)| *mid != id);
    }

    pub fn thread_count(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    /// Request every registered thread to pause, spin-wait until each has
    /// actually parked (bounded busy-wait; a thread stuck in a long native
    /// trap call parks as soon as it returns to the interpreter loop), then
    /// hand back every thread's snapshot for the mark phase.
    pub fn pause_world(&self) -> Vec<RootSnapshot> {
        let monitors: Vec<Arc<Monitor>> = self.inner.lock().unwrap().iter().map(|(_, m)| m.clone()).collect();
        for m in &monitors {
            m.request_pause();
        }
        for m in &monitors {
            while !m.is_parked() {
                std::thread::yield_now();
            }
        }
        monitors.iter().map(|m| m.snapshot()).collect()
    }

    pub fn resume_world(&self) {
        let monitors: Vec<Arc<Monitor>> = self.inner.lock().unwrap().iter().map(|(_, m)| m.clone()).collect();
        for m in &monitors {
            m.resume_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_publishes_operand_refs() {
        let monitor = Monitor::new();
        let mut stack = OperandStack::new();
        stack.push_ref(Some(HeapRef(7)));
        let call_stack = CallStack::new(10);
        monitor.checkpoint(&stack, &call_stack);
        assert_eq!(monitor.snapshot().refs, vec![HeapRef(7)]);
    }

    #[test]
    fn registry_tracks_thread_count() {
        let registry = MonitorRegistry::new();
        let (id, _monitor) = registry.register();
        assert_eq!(registry.thread_count(), 1);
        registry.unregister(id);
        assert_eq!(registry.thread_count(), 0);
    }
}
