// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Stack virtual machine for Tova bytecode.
//!
//! A [`Vm`] is an explicit context value owning the value stack, call
//! frames, global environment, open-upvalue list, heap, and output sink;
//! nothing is process-wide, so independent interpreters can coexist.
//!
//! The dispatch loop decodes one opcode at a time and threads errors as
//! `Result`s. A runtime error carries the full call-stack trace
//! (innermost first) and aborts the current [`Vm::interpret`] call,
//! leaving the machine reset and reusable (the REPL relies on that).

#[cfg(test)]
mod vm_test;

use std::io::Write;

use crate::bytecode::Op;
use crate::compiler::{self, CompileError, disassemble};
use crate::heap::Heap;
use crate::table::{Table, hash_str};
use crate::value::{
    HeapObj, NativeFn, ObjClosure, ObjFunction, ObjNative, ObjRef, ObjUpvalue, UpvalueState, Value,
    write_value,
};

/// Maximum number of nested call frames.
pub const FRAMES_MAX: usize = 64;

/// Value stack capacity.
pub const STACK_MAX: usize = FRAMES_MAX * 256;

/// What went wrong during execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// Unary numeric operation on a non-number.
    OperandMustBeNumber,
    /// Binary numeric operation on non-numbers.
    OperandsMustBeNumbers,
    /// `+` on anything but two numbers or two strings.
    OperandsMustBeNumbersOrStrings,
    /// Read or write of a global that was never defined.
    UndefinedVariable(String),
    /// Call of a value that is not a closure or native function.
    NotCallable,
    /// Call with the wrong number of arguments.
    ArityMismatch {
        /// Number of parameters the callee expects.
        expected: u8,
        /// Number of arguments actually passed.
        got: u8,
    },
    /// Too many nested calls or values.
    StackOverflow,
    /// Pop from an empty stack (corrupt bytecode).
    StackExhausted,
    /// Byte that is not a known opcode.
    InvalidOpcode(u8),
    /// Instruction pointer left the chunk.
    IpOutOfBounds,
    /// Constant pool index out of bounds.
    BadConstant(u8),
    /// Handle to a missing or wrongly typed heap object.
    BadObject,
    /// Writing program output failed.
    Io(String),
}

impl core::fmt::Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::OperandMustBeNumber => write!(f, "Operand must be a number."),
            Self::OperandsMustBeNumbers => write!(f, "Operands must be numbers."),
            Self::OperandsMustBeNumbersOrStrings => {
                write!(f, "Operands must be two numbers or two strings.")
            }
            Self::UndefinedVariable(name) => write!(f, "Undefined variable '{name}'."),
            Self::NotCallable => write!(f, "Can only call functions and classes."),
            Self::ArityMismatch { expected, got } => {
                write!(f, "Expected {expected} arguments but got {got}.")
            }
            Self::StackOverflow => write!(f, "Stack overflow."),
            Self::StackExhausted => write!(f, "Stack exhausted."),
            Self::InvalidOpcode(byte) => write!(f, "Unknown opcode {byte}."),
            Self::IpOutOfBounds => write!(f, "Instruction pointer out of bounds."),
            Self::BadConstant(index) => write!(f, "Constant index {index} out of bounds."),
            Self::BadObject => write!(f, "Invalid object reference."),
            Self::Io(message) => write!(f, "I/O error: {message}."),
        }
    }
}

/// One line of a runtime stack trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceLine {
    /// Source line of the instruction that was executing.
    pub line: u32,
    /// Function name; `None` for the top-level script.
    pub function: Option<String>,
}

/// A runtime error with its call-stack trace, innermost frame first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError {
    /// What went wrong.
    pub kind: RuntimeErrorKind,
    /// One entry per active frame, innermost first.
    pub trace: Vec<TraceLine>,
}

impl core::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.kind)?;
        for frame in &self.trace {
            match &frame.function {
                Some(name) => write!(f, "\n[line {}] in {name}()", frame.line)?,
                None => write!(f, "\n[line {}] in script", frame.line)?,
            }
        }
        Ok(())
    }
}

/// Outcome of a failed [`Vm::interpret`] call.
#[derive(Debug)]
pub enum InterpretError {
    /// Compilation reported diagnostics; nothing ran.
    Compile(CompileError),
    /// Execution aborted with a runtime error.
    Runtime(RuntimeError),
}

impl core::fmt::Display for InterpretError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Compile(e) => write!(f, "{e}"),
            Self::Runtime(e) => write!(f, "{e}"),
        }
    }
}

/// A record of one active call.
#[derive(Debug, Clone, Copy)]
struct CallFrame {
    /// The closure being executed.
    closure: ObjRef,
    /// Offset into the function's chunk.
    ip: usize,
    /// First stack slot of this frame; slot 0 holds the closure itself.
    slot_base: usize,
}

/// Whether the dispatch loop keeps going.
enum Flow {
    Continue,
    Halt,
}

/// The virtual machine.
pub struct Vm<W: Write> {
    stack: Vec<Value>,
    frames: Vec<CallFrame>,
    globals: Table,
    /// Upvalues still pointing into the stack, highest slot first.
    open_upvalues: Vec<ObjRef>,
    heap: Heap,
    output: W,
}

impl<W: Write> Vm<W> {
    /// Create a VM writing program output to `output`.
    pub fn new(output: W) -> Self {
        let mut vm = Self {
            stack: Vec::new(),
            frames: Vec::new(),
            globals: Table::new(),
            open_upvalues: Vec::new(),
            heap: Heap::new(),
            output,
        };
        vm.define_native("clock", 0, native_clock);
        vm
    }

    /// The VM's heap, for inspection.
    #[must_use]
    pub const fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Compile and execute a source string.
    ///
    /// # Errors
    ///
    /// Compile errors carry all diagnostics; runtime errors carry the
    /// stack trace. Either way the VM is reset and can be reused.
    pub fn interpret(&mut self, source: &str) -> Result<(), InterpretError> {
        let function = compiler::compile(source, &mut self.heap).map_err(InterpretError::Compile)?;

        // Root the script function on the stack while wrapping it, so a
        // collection between the two allocations cannot reclaim it
        let started = self
            .push(Value::Obj(function))
            .and_then(|()| {
                let closure = self.heap.alloc(HeapObj::Closure(ObjClosure {
                    function,
                    upvalues: Vec::new(),
                }));
                let _ = self.stack.pop();
                self.push(Value::Obj(closure))?;
                self.call_value(Value::Obj(closure), 0)
            });

        let result = match started {
            Ok(()) => self.run(),
            Err(kind) => Err(self.runtime_error(kind)),
        };

        if result.is_err() {
            self.reset();
        }
        result.map_err(InterpretError::Runtime)
    }

    /// Drop all execution state, keeping globals and the heap.
    fn reset(&mut self) {
        self.stack.clear();
        self.frames.clear();
        self.open_upvalues.clear();
    }

    // --- Dispatch ---

    fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            // Instruction boundaries are the only safe points: every
            // live object is reachable from the roots here
            if self.heap.should_collect() {
                self.collect_garbage();
            }

            if tracing::enabled!(tracing::Level::TRACE) {
                self.trace_instruction();
            }

            match self.step() {
                Ok(Flow::Continue) => {}
                Ok(Flow::Halt) => return Ok(()),
                Err(kind) => return Err(self.runtime_error(kind)),
            }
        }
    }

    fn step(&mut self) -> Result<Flow, RuntimeErrorKind> {
        let byte = self.read_byte()?;
        let op = Op::try_from(byte).map_err(|_| RuntimeErrorKind::InvalidOpcode(byte))?;

        match op {
            Op::Constant => {
                let index = self.read_byte()?;
                let value = self.chunk_constant(index)?;
                self.push(value)?;
            }
            Op::Nil => self.push(Value::Nil)?,
            Op::True => self.push(Value::Bool(true))?,
            Op::False => self.push(Value::Bool(false))?,
            Op::Pop => {
                self.pop()?;
            }
            Op::GetLocal => {
                let slot = self.read_byte()? as usize;
                let base = self.slot_base()?;
                let value = *self
                    .stack
                    .get(base + slot)
                    .ok_or(RuntimeErrorKind::StackExhausted)?;
                self.push(value)?;
            }
            Op::SetLocal => {
                let slot = self.read_byte()? as usize;
                let base = self.slot_base()?;
                let value = self.peek(0)?;
                *self
                    .stack
                    .get_mut(base + slot)
                    .ok_or(RuntimeErrorKind::StackExhausted)? = value;
            }
            Op::GetGlobal => {
                let index = self.read_byte()?;
                let (name, hash) = self.constant_string(index)?;
                match self.globals.get(name, hash) {
                    Some(value) => self.push(value)?,
                    None => return Err(self.undefined_variable(name)),
                }
            }
            Op::DefineGlobal => {
                let index = self.read_byte()?;
                let (name, hash) = self.constant_string(index)?;
                let value = self.peek(0)?;
                self.globals.set(name, hash, value);
                self.pop()?;
            }
            Op::SetGlobal => {
                let index = self.read_byte()?;
                let (name, hash) = self.constant_string(index)?;
                let value = self.peek(0)?;
                if self.globals.set(name, hash, value) {
                    // The insert revealed a missing definition; undo it
                    self.globals.delete(name, hash);
                    return Err(self.undefined_variable(name));
                }
            }
            Op::GetUpvalue => {
                let index = self.read_byte()? as usize;
                let upvalue = self.frame_upvalue(index)?;
                let value = match self
                    .heap
                    .upvalue(upvalue)
                    .ok_or(RuntimeErrorKind::BadObject)?
                    .state
                {
                    UpvalueState::Open(slot) => *self
                        .stack
                        .get(slot)
                        .ok_or(RuntimeErrorKind::StackExhausted)?,
                    UpvalueState::Closed(value) => value,
                };
                self.push(value)?;
            }
            Op::SetUpvalue => {
                let index = self.read_byte()? as usize;
                let upvalue = self.frame_upvalue(index)?;
                let value = self.peek(0)?;
                let state = self
                    .heap
                    .upvalue(upvalue)
                    .ok_or(RuntimeErrorKind::BadObject)?
                    .state;
                match state {
                    UpvalueState::Open(slot) => {
                        *self
                            .stack
                            .get_mut(slot)
                            .ok_or(RuntimeErrorKind::StackExhausted)? = value;
                    }
                    UpvalueState::Closed(_) => {
                        if let Some(u) = self.heap.upvalue_mut(upvalue) {
                            u.state = UpvalueState::Closed(value);
                        }
                    }
                }
            }
            Op::Equal => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(Value::Bool(a == b))?;
            }
            Op::Greater => self.binary_number_op(|a, b| Value::Bool(a > b))?,
            Op::Less => self.binary_number_op(|a, b| Value::Bool(a < b))?,
            Op::Add => self.add()?,
            Op::Subtract => self.binary_number_op(|a, b| Value::Number(a - b))?,
            Op::Multiply => self.binary_number_op(|a, b| Value::Number(a * b))?,
            Op::Divide => self.binary_number_op(|a, b| Value::Number(a / b))?,
            Op::Not => {
                let value = self.pop()?;
                self.push(Value::Bool(value.is_falsey()))?;
            }
            Op::Negate => {
                let Some(n) = self.peek(0)?.as_number() else {
                    return Err(RuntimeErrorKind::OperandMustBeNumber);
                };
                self.pop()?;
                self.push(Value::Number(-n))?;
            }
            Op::Print => {
                let value = self.pop()?;
                write_value(&mut self.output, &self.heap, value)
                    .and_then(|()| writeln!(self.output))
                    .map_err(|e| RuntimeErrorKind::Io(e.to_string()))?;
            }
            Op::Jump => {
                let offset = self.read_short()? as usize;
                self.jump_forward(offset)?;
            }
            Op::JumpIfFalse => {
                let offset = self.read_short()? as usize;
                if self.peek(0)?.is_falsey() {
                    self.jump_forward(offset)?;
                }
            }
            Op::Loop => {
                let offset = self.read_short()? as usize;
                self.jump_backward(offset)?;
            }
            Op::Call => {
                let arg_count = self.read_byte()?;
                let callee = self.peek(arg_count as usize)?;
                self.call_value(callee, arg_count)?;
            }
            Op::Closure => {
                let index = self.read_byte()?;
                self.make_closure(index)?;
            }
            Op::CloseUpvalue => {
                let top = self
                    .stack
                    .len()
                    .checked_sub(1)
                    .ok_or(RuntimeErrorKind::StackExhausted)?;
                self.close_upvalues(top)?;
                self.pop()?;
            }
            Op::Return => return self.return_from_call(),
        }

        Ok(Flow::Continue)
    }

    // --- Instruction helpers ---

    fn add(&mut self) -> Result<(), RuntimeErrorKind> {
        let rhs = self.peek(0)?;
        let lhs = self.peek(1)?;

        if let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) {
            self.pop()?;
            self.pop()?;
            self.push(Value::Number(a + b))?;
            return Ok(());
        }

        let strings = lhs
            .as_obj()
            .zip(rhs.as_obj())
            .and_then(|(a, b)| self.heap.string(a).zip(self.heap.string(b)));
        if let Some((a, b)) = strings {
            let mut concatenated = String::with_capacity(a.chars.len() + b.chars.len());
            concatenated.push_str(&a.chars);
            concatenated.push_str(&b.chars);
            let interned = self.heap.intern(&concatenated);
            self.pop()?;
            self.pop()?;
            self.push(Value::Obj(interned))?;
            return Ok(());
        }

        Err(RuntimeErrorKind::OperandsMustBeNumbersOrStrings)
    }

    fn binary_number_op(
        &mut self,
        apply: impl FnOnce(f64, f64) -> Value,
    ) -> Result<(), RuntimeErrorKind> {
        let (Some(b), Some(a)) = (self.peek(0)?.as_number(), self.peek(1)?.as_number()) else {
            return Err(RuntimeErrorKind::OperandsMustBeNumbers);
        };
        self.pop()?;
        self.pop()?;
        self.push(apply(a, b))
    }

    /// Instantiate the closure at constant `index`, resolving its
    /// `(is_local, index)` capture pairs from the instruction stream.
    fn make_closure(&mut self, index: u8) -> Result<(), RuntimeErrorKind> {
        let Some(function) = self.chunk_constant(index)?.as_obj() else {
            return Err(RuntimeErrorKind::BadObject);
        };
        let upvalue_count = self
            .heap
            .function(function)
            .ok_or(RuntimeErrorKind::BadObject)?
            .upvalue_count;

        let mut upvalues = Vec::with_capacity(usize::from(upvalue_count));
        for _ in 0..upvalue_count {
            let is_local = self.read_byte()? == 1;
            let capture_index = self.read_byte()? as usize;
            if is_local {
                let base = self.slot_base()?;
                upvalues.push(self.capture_upvalue(base + capture_index)?);
            } else {
                upvalues.push(self.frame_upvalue(capture_index)?);
            }
        }

        let closure = self.heap.alloc(HeapObj::Closure(ObjClosure {
            function,
            upvalues,
        }));
        self.push(Value::Obj(closure))
    }

    fn return_from_call(&mut self) -> Result<Flow, RuntimeErrorKind> {
        let result = self.pop()?;
        let frame = self
            .frames
            .pop()
            .ok_or(RuntimeErrorKind::StackExhausted)?;

        // Locals of the dying frame that were captured live on
        self.close_upvalues(frame.slot_base)?;

        self.stack.truncate(frame.slot_base);
        if self.frames.is_empty() {
            return Ok(Flow::Halt);
        }
        self.push(result)?;
        Ok(Flow::Continue)
    }

    // --- Calls ---

    fn call_value(&mut self, callee: Value, arg_count: u8) -> Result<(), RuntimeErrorKind> {
        let Some(r) = callee.as_obj() else {
            return Err(RuntimeErrorKind::NotCallable);
        };
        // Copy the dispatch facts out so the heap borrow ends here
        let native = match self.heap.get(r) {
            Some(HeapObj::Closure(_)) => None,
            Some(HeapObj::Native(native)) => Some((native.arity, native.function)),
            _ => return Err(RuntimeErrorKind::NotCallable),
        };

        let Some((arity, function)) = native else {
            return self.call_closure(r, arg_count);
        };

        if arg_count != arity {
            return Err(RuntimeErrorKind::ArityMismatch {
                expected: arity,
                got: arg_count,
            });
        }
        let first_arg = self.stack.len() - arg_count as usize;
        let result = function(&self.stack[first_arg..]);
        // Replace the callee and arguments with the result
        self.stack.truncate(first_arg - 1);
        self.push(result)
    }

    fn call_closure(&mut self, closure: ObjRef, arg_count: u8) -> Result<(), RuntimeErrorKind> {
        let function = self
            .heap
            .closure(closure)
            .ok_or(RuntimeErrorKind::BadObject)?
            .function;
        let arity = self
            .heap
            .function(function)
            .ok_or(RuntimeErrorKind::BadObject)?
            .arity;

        if arg_count != arity {
            return Err(RuntimeErrorKind::ArityMismatch {
                expected: arity,
                got: arg_count,
            });
        }
        if self.frames.len() == FRAMES_MAX {
            return Err(RuntimeErrorKind::StackOverflow);
        }

        self.frames.push(CallFrame {
            closure,
            ip: 0,
            slot_base: self.stack.len() - arg_count as usize - 1,
        });
        Ok(())
    }

    // --- Upvalues ---

    /// Find or create the open upvalue for an absolute stack slot. The
    /// open list stays sorted by descending slot.
    fn capture_upvalue(&mut self, slot: usize) -> Result<ObjRef, RuntimeErrorKind> {
        let mut insert_at = self.open_upvalues.len();
        for (i, &upvalue) in self.open_upvalues.iter().enumerate() {
            let state = self
                .heap
                .upvalue(upvalue)
                .ok_or(RuntimeErrorKind::BadObject)?
                .state;
            match state {
                UpvalueState::Open(s) if s == slot => return Ok(upvalue),
                UpvalueState::Open(s) if s < slot => {
                    insert_at = i;
                    break;
                }
                _ => {}
            }
        }

        let created = self.heap.alloc(HeapObj::Upvalue(ObjUpvalue {
            state: UpvalueState::Open(slot),
        }));
        self.open_upvalues.insert(insert_at, created);
        Ok(created)
    }

    /// Close every open upvalue at or above `threshold`: move the stack
    /// value into the upvalue and unlink it from the open list.
    fn close_upvalues(&mut self, threshold: usize) -> Result<(), RuntimeErrorKind> {
        while let Some(&head) = self.open_upvalues.first() {
            let state = self
                .heap
                .upvalue(head)
                .ok_or(RuntimeErrorKind::BadObject)?
                .state;
            let UpvalueState::Open(slot) = state else {
                self.open_upvalues.remove(0);
                continue;
            };
            if slot < threshold {
                break;
            }

            let value = *self
                .stack
                .get(slot)
                .ok_or(RuntimeErrorKind::StackExhausted)?;
            if let Some(upvalue) = self.heap.upvalue_mut(head) {
                upvalue.state = UpvalueState::Closed(value);
            }
            self.open_upvalues.remove(0);
        }
        Ok(())
    }

    /// Upvalue handle `index` of the currently executing closure.
    fn frame_upvalue(&self, index: usize) -> Result<ObjRef, RuntimeErrorKind> {
        let frame = self
            .frames
            .last()
            .ok_or(RuntimeErrorKind::IpOutOfBounds)?;
        let closure = self
            .heap
            .closure(frame.closure)
            .ok_or(RuntimeErrorKind::BadObject)?;
        closure
            .upvalues
            .get(index)
            .copied()
            .ok_or(RuntimeErrorKind::BadObject)
    }

    // --- Globals and natives ---

    /// Install a host function under a global name.
    fn define_native(&mut self, name: &str, arity: u8, function: NativeFn) {
        let name_ref = self.heap.intern(name);
        let native = self.heap.alloc(HeapObj::Native(ObjNative { function, arity }));
        self.globals.set(name_ref, hash_str(name), Value::Obj(native));
    }

    fn undefined_variable(&self, name: ObjRef) -> RuntimeErrorKind {
        let rendered = self
            .heap
            .string(name)
            .map_or_else(String::new, |s| s.chars.to_string());
        RuntimeErrorKind::UndefinedVariable(rendered)
    }

    // --- Bytecode access ---

    fn read_byte(&mut self) -> Result<u8, RuntimeErrorKind> {
        let frame = self
            .frames
            .last()
            .ok_or(RuntimeErrorKind::IpOutOfBounds)?;
        let function = self.frame_function(frame)?;
        let byte = *function
            .chunk
            .code
            .get(frame.ip)
            .ok_or(RuntimeErrorKind::IpOutOfBounds)?;
        if let Some(frame) = self.frames.last_mut() {
            frame.ip += 1;
        }
        Ok(byte)
    }

    fn read_short(&mut self) -> Result<u16, RuntimeErrorKind> {
        let hi = self.read_byte()?;
        let lo = self.read_byte()?;
        Ok((u16::from(hi) << 8) | u16::from(lo))
    }

    fn chunk_constant(&self, index: u8) -> Result<Value, RuntimeErrorKind> {
        let frame = self
            .frames
            .last()
            .ok_or(RuntimeErrorKind::IpOutOfBounds)?;
        let function = self.frame_function(frame)?;
        function
            .chunk
            .constants
            .get(index as usize)
            .copied()
            .ok_or(RuntimeErrorKind::BadConstant(index))
    }

    /// A name constant: the interned string and its hash.
    fn constant_string(&self, index: u8) -> Result<(ObjRef, u32), RuntimeErrorKind> {
        let Some(name) = self.chunk_constant(index)?.as_obj() else {
            return Err(RuntimeErrorKind::BadObject);
        };
        let hash = self
            .heap
            .string_hash(name)
            .ok_or(RuntimeErrorKind::BadObject)?;
        Ok((name, hash))
    }

    fn frame_function(&self, frame: &CallFrame) -> Result<&ObjFunction, RuntimeErrorKind> {
        let closure = self
            .heap
            .closure(frame.closure)
            .ok_or(RuntimeErrorKind::BadObject)?;
        self.heap
            .function(closure.function)
            .ok_or(RuntimeErrorKind::BadObject)
    }

    fn slot_base(&self) -> Result<usize, RuntimeErrorKind> {
        self.frames
            .last()
            .map(|f| f.slot_base)
            .ok_or(RuntimeErrorKind::IpOutOfBounds)
    }

    fn jump_forward(&mut self, offset: usize) -> Result<(), RuntimeErrorKind> {
        let frame = self
            .frames
            .last_mut()
            .ok_or(RuntimeErrorKind::IpOutOfBounds)?;
        frame.ip += offset;
        Ok(())
    }

    fn jump_backward(&mut self, offset: usize) -> Result<(), RuntimeErrorKind> {
        let frame = self
            .frames
            .last_mut()
            .ok_or(RuntimeErrorKind::IpOutOfBounds)?;
        frame.ip = frame
            .ip
            .checked_sub(offset)
            .ok_or(RuntimeErrorKind::IpOutOfBounds)?;
        Ok(())
    }

    // --- Stack ---

    fn push(&mut self, value: Value) -> Result<(), RuntimeErrorKind> {
        if self.stack.len() == STACK_MAX {
            return Err(RuntimeErrorKind::StackOverflow);
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, RuntimeErrorKind> {
        self.stack.pop().ok_or(RuntimeErrorKind::StackExhausted)
    }

    fn peek(&self, distance: usize) -> Result<Value, RuntimeErrorKind> {
        let index = self
            .stack
            .len()
            .checked_sub(distance + 1)
            .ok_or(RuntimeErrorKind::StackExhausted)?;
        self.stack
            .get(index)
            .copied()
            .ok_or(RuntimeErrorKind::StackExhausted)
    }

    // --- Errors, tracing, collection ---

    /// Attach the call-stack trace, innermost frame first.
    fn runtime_error(&self, kind: RuntimeErrorKind) -> RuntimeError {
        let mut trace = Vec::with_capacity(self.frames.len());
        for frame in self.frames.iter().rev() {
            let Ok(function) = self.frame_function(frame) else {
                continue;
            };
            // ip already advanced past the failing instruction
            let instruction = frame.ip.saturating_sub(1);
            let line = function.chunk.lines.get(instruction).copied().unwrap_or(0);
            let name = function
                .name
                .and_then(|n| self.heap.string(n))
                .map(|s| s.chars.to_string());
            trace.push(TraceLine {
                line,
                function: name,
            });
        }
        RuntimeError { kind, trace }
    }

    fn trace_instruction(&self) {
        let Some(frame) = self.frames.last() else {
            return;
        };
        let Ok(function) = self.frame_function(frame) else {
            return;
        };
        if frame.ip < function.chunk.code.len() {
            let (text, _) = disassemble::disassemble_instruction(&self.heap, &function.chunk, frame.ip);
            tracing::trace!(stack_depth = self.stack.len(), "{text}");
        }
    }

    /// Gather the root set and run a collection.
    ///
    /// Roots are the value stack, the active frames' closures, every
    /// global table entry, and the open upvalues.
    fn collect_garbage(&mut self) {
        let mut roots = self.stack.clone();
        roots.extend(self.frames.iter().map(|f| Value::Obj(f.closure)));
        roots.extend(self.open_upvalues.iter().map(|&u| Value::Obj(u)));
        for (key, value) in self.globals.iter() {
            roots.push(Value::Obj(key));
            roots.push(value);
        }
        self.heap.collect(&roots);
    }
}

/// Seconds since the Unix epoch, as a Tova number.
fn native_clock(_args: &[Value]) -> Value {
    let seconds = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64());
    Value::Number(seconds)
}
