//! Call-stack frames

use std::sync::Mutex;

use crate::program::{ClassId, MethodId};
use crate::vm::stack::Word;

/// One method invocation's state: which method, its local memory (slot 0
/// is always the receiver, `Word::nil()` for static methods), the
/// instruction pointer, and whether this frame was entered from a
/// JIT-compiled caller.
#[derive(Debug, Clone)]
pub struct Frame {
    pub class_id: ClassId,
    pub method_id: MethodId,
    pub locals: Vec<Word>,
    pub ip: usize,
    pub jit_called: bool,
}

impl Frame {
    pub fn new(class_id: ClassId, method_id: MethodId, local_space: usize, receiver: Word, jit_called: bool) -> Self {
        let mut locals = vec![Word::nil(); local_space.max(1)];
        locals[0] = receiver;
        Self {
            class_id,
            method_id,
            locals,
            ip: 0,
            jit_called,
        }
    }

    /// Reset a recycled frame in place, avoiding a fresh `Vec` allocation
    /// when the free list already has one the right size.
    fn reset(&mut self, class_id: ClassId, method_id: MethodId, local_space: usize, receiver: Word, jit_called: bool) {
        self.class_id = class_id;
        self.method_id = method_id;
        self.ip = 0;
        self.jit_called = jit_called;
        self.locals.clear();
        self.locals.resize(local_space.max(1), Word::nil());
        self.locals[0] = receiver;
    }

    /// Every `Word::Ref` in this frame's local memory, scanned exactly
    /// because locals are already tagged.
    pub fn trace_refs(&self) -> impl Iterator<Item = crate::memory::heap::HeapRef> + '_ {
        self.locals.iter().filter_map(|w| match w {
            Word::Ref(Some(r)) => Some(*r),
            _ => None,
        })
    }
}

/// A process-wide, mutex-protected free list of recycled frames.
#[derive(Default)]
pub struct FrameFreeList {
    inner: Mutex<Vec<Frame>>,
}

impl std::fmt::Debug for FrameFreeList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameFreeList").finish_non_exhaustive()
    }
}

impl FrameFreeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, class_id: ClassId, method_id: MethodId, local_space: usize, receiver: Word, jit_called: bool) -> Frame {
        let mut pool = self.inner.lock().unwrap();
        if let Some(mut frame) = pool.pop() {
            frame.reset(class_id, method_id, local_space, receiver, jit_called);
            frame
        } else {
            Frame::new(class_id, method_id, local_space, receiver, jit_called)
        }
    }

    pub fn release(&self, frame: Frame) {
        self.inner.lock().unwrap().push(frame);
    }

    /// Number of frames currently idle in the pool — used by the frame
    /// recycling property test together with the call stack's live-frame
    /// count.
    pub fn pooled_count(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}

/// A pre-sized vector of frames with its own position counter and a fixed
/// maximum depth; overflow is fatal.
#[derive(Debug, Default)]
pub struct CallStack {
    frames: Vec<Frame>,
    max_depth: usize,
}

impl CallStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            frames: Vec::new(),
            max_depth,
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn push(&mut self, frame: Frame) -> Result<(), crate::error::FatalError> {
        if self.frames.len() >= self.max_depth {
            return Err(crate::error::FatalError::CallDepthExceeded { limit: self.max_depth });
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn current(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn current_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}
