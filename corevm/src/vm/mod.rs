//! The interpreter: stack-based dispatch loop over a linked [`Program`].
//!
//! One [`Interpreter`] per OS thread, all sharing one [`Runtime`]. Between
//! any two instructions the interpreter publishes its root snapshot to its
//! [`Monitor`](crate::memory::Monitor) and checks whether the collector has
//! asked for a safe point — this is the one place in the loop a collection
//! can interleave.

pub mod critical;
pub mod exec;
pub mod frame;
pub mod stack;

pub use critical::CriticalSections;
pub use frame::{CallStack, Frame, FrameFreeList};
pub use stack::{OperandStack, Word};

use std::sync::Arc;

use crate::config::Properties;
use crate::error::{FatalError, FrameTrace, FrameTraceEntry, Unwind};
use crate::memory::Memory;
use crate::native::NativeBackend;
use crate::program::{ClassId, Instr, JumpPredicate, MemoryContext, MethodId, Program, ReturnKind};
use crate::thread::ThreadRegistry;
use crate::traps::{self, DispatchOutcome};

/// Shared, process-wide state every interpreter thread reads from or
/// coordinates through. Constructed once by `bin/corevm.rs` after loading
/// and linking an image.
pub struct Runtime {
    pub program: Arc<Program>,
    pub memory: Arc<Memory>,
    pub properties: Arc<Properties>,
    pub frame_pool: Arc<FrameFreeList>,
    pub threads: Arc<ThreadRegistry>,
    pub critical: Arc<CriticalSections>,
    pub native: Arc<dyn NativeBackend>,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime").finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(program: Arc<Program>, memory: Arc<Memory>, properties: Arc<Properties>, native: Arc<dyn NativeBackend>) -> Arc<Self> {
        // Every class gets its static-storage block reserved up front, before
        // any CLASS-context LOAD_VAR/STOR_VAR can reach it
        for class in program.classes.values() {
            memory.class_memory.register(class.id, class.class_space);
        }
        Arc::new(Self {
            program,
            memory,
            properties,
            frame_pool: Arc::new(FrameFreeList::new()),
            threads: Arc::new(ThreadRegistry::new()),
            critical: Arc::new(CriticalSections::new()),
            native,
        })
    }
}

/// Result of running one method to completion: its return value, or a
/// fatal error paired with the call-stack trace at the point it fired.
pub type RunResult = Result<Word, Unwind>;

pub struct Interpreter {
    runtime: Arc<Runtime>,
    operand_stack: OperandStack,
    call_stack: CallStack,
    monitor_id: u64,
    monitor: Arc<crate::memory::Monitor>,
}

impl Interpreter {
    pub fn new(runtime: Arc<Runtime>) -> Self {
        let (monitor_id, monitor) = runtime.memory.monitors.register();
        Self {
            runtime,
            operand_stack: OperandStack::new(),
            call_stack: CallStack::new(crate::image::CALL_STACK_SIZE),
            monitor_id,
            monitor,
        }
    }

    /// Run `class_id::method_id` with `args` already ordered
    /// receiver-first (for instance methods) and return its result or a
    /// fatal unwind. Used both for the program's start method and for
    /// `ASYNC_MTHD_CALL`'s spawned worker body.
    pub fn execute(&mut self, class_id: ClassId, method_id: MethodId, args: Vec<Word>) -> RunResult {
        let result = self.call(class_id, method_id, args, false);
        result.map_err(|error| {
            let trace = self.capture_trace();
            Unwind { error, trace }
        })
    }

    fn capture_trace(&self) -> FrameTrace {
        let mut entries = Vec::new();
        for frame in self.call_stack.frames() {
            let (file_name, method_name) = self
                .runtime
                .program
                .get_class(frame.class_id)
                .zip(self.runtime.program.get_method(frame.class_id, frame.method_id))
                .map(|(c, m)| (c.file_name.clone(), m.encoded_name.clone()))
                .unwrap_or((None, format!("<unknown:{}:{}>", frame.class_id, frame.method_id)));
            entries.push(FrameTraceEntry {
                file_name,
                method_name,
                line: None,
            });
        }
        FrameTrace(entries)
    }

    fn call(&mut self, class_id: ClassId, method_id: MethodId, mut args: Vec<Word>, jit_called: bool) -> Result<Word, FatalError> {
        let method = self
            .runtime
            .program
            .get_method(class_id, method_id)
            .ok_or_else(|| FatalError::Internal(format!("unknown method {class_id}:{method_id}")))?;

        if let Some(entry) = method.native_entry {
            return self.runtime.native.invoke(entry, &args, &self.runtime.memory);
        }

        let local_space = method.local_space.max(1) as usize;
        let receiver = if method.flags.is_function { Word::nil() } else { args.first().copied().unwrap_or_else(Word::nil) };
        if !method.flags.is_function && !args.is_empty() {
            args.remove(0);
        }

        let mut frame = self.runtime.frame_pool.acquire(class_id, method_id, local_space, receiver, jit_called);
        for (i, arg) in args.into_iter().enumerate() {
            let slot = if method.flags.is_function { i } else { i + 1 };
            if let Some(cell) = frame.locals.get_mut(slot) {
                *cell = arg;
            }
        }
        self.call_stack.push(frame)?;

        let outcome = self.run_current_frame();

        if let Some(frame) = self.call_stack.pop() {
            self.runtime.frame_pool.release(frame);
        }
        outcome
    }

    /// Drive the instruction loop for whatever frame is on top of the call
    /// stack until it returns, propagating any fatal error.
    fn run_current_frame(&mut self) -> Result<Word, FatalError> {
        loop {
            self.monitor.checkpoint(&self.operand_stack, &self.call_stack);

            if self.runtime.memory.should_collect() {
                self.runtime.memory.collect_now();
            }

            let (class_id, method_id, ip) = {
                let frame = self.call_stack.current().expect("run_current_frame called with empty call stack");
                (frame.class_id, frame.method_id, frame.ip)
            };
            let method = self
                .runtime
                .program
                .get_method(class_id, method_id)
                .ok_or_else(|| FatalError::Internal(format!("unknown method {class_id}:{method_id}")))?;
            let Some(instruction) = method.instructions.get(ip) else {
                return Ok(Word::nil());
            };
            let op = instruction.op.clone();

            if let Some(result) = self.step(&op)? {
                return Ok(result);
            }
        }
    }

    /// Execute one instruction. Returns `Some(value)` only for `RTRN`,
    /// signalling the caller to unwind this frame with that return value.
    fn step(&mut self, op: &Instr) -> Result<Option<Word>, FatalError> {
        let mut heap = self.runtime.memory.heap.lock().unwrap();

        if exec::arith::exec(op, &mut self.operand_stack)? {
            drop(heap);
            self.advance_ip();
            return Ok(None);
        }
        if exec::strings::exec(op, &mut self.operand_stack, &mut heap)? {
            drop(heap);
            self.advance_ip();
            return Ok(None);
        }
        if exec::array_ops::exec(op, &mut self.operand_stack, &mut heap)? {
            drop(heap);
            self.advance_ip();
            return Ok(None);
        }
        if exec::object_ops::exec(op, &mut self.operand_stack, &mut heap, &self.runtime.program)? {
            drop(heap);
            self.advance_ip();
            return Ok(None);
        }
        {
            let frame = self.call_stack.current_mut().expect("frame present");
            if exec::memory_ops::exec(op, &mut self.operand_stack, frame, &mut heap, &self.runtime.memory.class_memory)? {
                drop(heap);
                self.advance_ip();
                return Ok(None);
            }
        }
        drop(heap);

        match op {
            Instr::Lbl(_) => {
                self.advance_ip();
            }
            Instr::Jmp { label, predicate } => {
                let take = match predicate {
                    JumpPredicate::Always => true,
                    JumpPredicate::IfZero => self.operand_stack.pop_int()? == 0,
                    JumpPredicate::IfNonZero => self.operand_stack.pop_int()? != 0,
                };
                if take {
                    self.jump_to_label(*label)?;
                } else {
                    self.advance_ip();
                }
            }
            Instr::CriticalStart => {
                let r = self.operand_stack.pop_ref()?.ok_or(FatalError::NilDereference)?;
                self.runtime.critical.enter(r);
                self.advance_ip();
            }
            Instr::CriticalEnd => {
                let r = self.operand_stack.pop_ref()?.ok_or(FatalError::NilDereference)?;
                self.runtime.critical.exit(r);
                self.advance_ip();
            }
            Instr::MthdCall { class_id, mthd_id, .. } => {
                self.dispatch_call(*class_id, *mthd_id)?;
                self.advance_ip();
            }
            Instr::DynMthdCall { param_count, .. } => {
                self.dispatch_dynamic_call(*param_count)?;
                self.advance_ip();
            }
            Instr::AsyncMthdCall => {
                self.dispatch_async_call()?;
                self.advance_ip();
            }
            Instr::Rtrn => {
                let return_kind = {
                    let frame = self.call_stack.current().expect("frame present");
                    self.runtime
                        .program
                        .get_method(frame.class_id, frame.method_id)
                        .map(|m| m.return_kind)
                        .unwrap_or(ReturnKind::Nil)
                };
                let value = match return_kind {
                    ReturnKind::Nil => Word::nil(),
                    ReturnKind::Float => self.operand_stack.pop_word().unwrap_or_else(|_| Word::Float(0.0)),
                    ReturnKind::IntLike | ReturnKind::FunctionPair => self.operand_stack.pop_word().unwrap_or_else(|_| Word::nil()),
                };
                return Ok(Some(value));
            }
            Instr::Trap { selector, .. } | Instr::TrapRtrn { selector, .. } => {
                let outcome = traps::dispatch(
                    *selector,
                    &mut self.operand_stack,
                    &self.runtime.memory,
                    &self.runtime.program,
                    &self.runtime.properties,
                    &self.runtime.threads,
                )?;
                if let DispatchOutcome::Exit(code) = outcome {
                    std::process::exit(code);
                }
                self.advance_ip();
            }
            Instr::LibNewObjInst { .. }
            | Instr::LibObjInstCast { .. }
            | Instr::LibObjTypeOf { .. }
            | Instr::LibMthdCall { .. }
            | Instr::LibFuncDef { .. } => {
                return Err(FatalError::Internal(
                    "unresolved LIB_* instruction reached the interpreter: loader failed to rewrite it".into(),
                ));
            }
            _ => return Err(FatalError::Internal(format!("unhandled instruction {op:?}"))),
        }
        Ok(None)
    }

    fn advance_ip(&mut self) {
        if let Some(frame) = self.call_stack.current_mut() {
            frame.ip += 1;
        }
    }

    fn jump_to_label(&mut self, label: crate::program::LabelId) -> Result<(), FatalError> {
        let frame = self.call_stack.current_mut().expect("frame present");
        let method = self
            .runtime
            .program
            .classes
            .get(&frame.class_id)
            .and_then(|c| c.methods.get(&frame.method_id))
            .ok_or_else(|| FatalError::Internal("jump target method missing".into()))?;
        let target = *method
            .jump_table
            .get(&label)
            .ok_or_else(|| FatalError::Internal(format!("unknown label {label}")))?;
        frame.ip = target;
        Ok(())
    }

    fn pop_args(&mut self, count: usize) -> Result<Vec<Word>, FatalError> {
        let mut args = Vec::with_capacity(count);
        for _ in 0..count {
            args.push(self.operand_stack.pop_word()?);
        }
        args.reverse();
        Ok(args)
    }

    fn dispatch_call(&mut self, class_id: ClassId, mthd_id: MethodId) -> Result<(), FatalError> {
        // Copy out every fact needed about the static callee before taking
        // any `&mut self` borrow (the `Method` reference itself can't
        // outlive that, since it's borrowed through `self.runtime`).
        let (arity, is_virtual, is_nil_return, dispatch_key) = {
            let method = self
                .runtime
                .program
                .get_method(class_id, mthd_id)
                .ok_or_else(|| FatalError::Internal(format!("unknown method {class_id}:{mthd_id}")))?;
            (
                method.param_count as usize + usize::from(!method.flags.is_function),
                method.flags.is_virtual,
                matches!(method.return_kind, ReturnKind::Nil),
                method.dispatch_key().to_string(),
            )
        };

        let args = self.pop_args(arity)?;

        let (target_class, target_method, returns_value) = if is_virtual {
            let receiver_ref = args.first().and_then(|w| match w {
                Word::Ref(r) => *r,
                _ => None,
            });
            match receiver_ref {
                Some(r) => {
                    let concrete = {
                        let heap = self.runtime.memory.heap.lock().unwrap();
                        match heap.get(r) {
                            Some(crate::memory::HeapData::Object(inst)) => inst.class_id,
                            _ => class_id,
                        }
                    };
                    let (tc, tm) = self
                        .runtime
                        .program
                        .resolve_virtual(concrete, &dispatch_key)
                        .unwrap_or((class_id, mthd_id));
                    (tc, tm, !is_nil_return)
                }
                None => (class_id, mthd_id, !is_nil_return),
            }
        } else {
            (class_id, mthd_id, !is_nil_return)
        };

        let value = self.call(target_class, target_method, args, false)?;
        if returns_value {
            self.operand_stack.push_word(value);
        }
        Ok(())
    }

    fn dispatch_dynamic_call(&mut self, param_count: i32) -> Result<(), FatalError> {
        let packed = self.operand_stack.pop_int()?;
        let (class_id, method_id) = exec::memory_ops::unpack_func(packed);
        let args = self.pop_args(param_count as usize)?;
        let return_kind = self
            .runtime
            .program
            .get_method(class_id, method_id)
            .map(|m| m.return_kind)
            .unwrap_or(ReturnKind::Nil);
        let value = self.call(class_id, method_id, args, false)?;
        if !matches!(return_kind, ReturnKind::Nil) {
            self.operand_stack.push_word(value);
        }
        Ok(())
    }

    /// Spawns a worker thread running the target method on the popped
    /// receiver and argument word: the function-pair is popped first,
    /// then the single argument word it is invoked with.
    fn dispatch_async_call(&mut self) -> Result<(), FatalError> {
        let packed = self.operand_stack.pop_int()?;
        let arg = self.operand_stack.pop_word()?;
        let (class_id, method_id) = exec::memory_ops::unpack_func(packed);
        let runtime = self.runtime.clone();
        let thread_id = runtime.threads.spawn(move || {
            let mut worker = Interpreter::new(runtime.clone());
            let _ = worker.execute(class_id, method_id, vec![arg]);
            runtime.memory.monitors.unregister(worker.monitor_id);
        });
        self.operand_stack.push_int(thread_id);
        Ok(())
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        self.runtime.memory.monitors.unregister(self.monitor_id);
    }
}
