// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Single-pass compiler from Tova source to bytecode.
//!
//! Parsing and code emission are combined: the compiler pulls tokens
//! from the scanner and writes bytecode into the chunk of the innermost
//! function being compiled, resolving variables as it goes. Expressions
//! use Pratt precedence climbing (see `expr.rs`); statements and scope
//! handling live here.
//!
//! Errors do not abort compilation. Each diagnostic raises `had_error`
//! and puts the compiler into panic mode, which suppresses further
//! diagnostics until the parse synchronizes at the next statement
//! boundary. [`compile`] returns a function only for a clean parse.


pub mod disassemble;
mod expr;

use core::fmt;

use crate::bytecode::{Chunk, Op};
use crate::heap::Heap;
use crate::scanner::{Scanner, Token, TokenKind};
use crate::value::{HeapObj, ObjFunction, ObjRef, Value};

/// Maximum local slots per function, including the reserved slot 0.
const MAX_LOCALS: usize = 256;

/// Maximum upvalues per function.
const MAX_UPVALUES: usize = 256;

/// Maximum distance of a forward or backward jump.
const MAX_JUMP: usize = u16::MAX as usize;

/// Maximum parameters of a function and arguments of a call.
const MAX_ARITY: u8 = 255;

/// Where a diagnostic points within its line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticLocation {
    /// At a concrete token.
    At(String),
    /// At the end of input.
    AtEnd,
    /// A scanner error; the message already names the problem.
    Lexical,
}

/// One compile diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based source line.
    pub line: u32,
    /// Position of the offending token.
    pub location: DiagnosticLocation,
    /// What went wrong.
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            DiagnosticLocation::At(lexeme) => {
                write!(f, "[line {}] Error at '{}': {}", self.line, lexeme, self.message)
            }
            DiagnosticLocation::AtEnd => {
                write!(f, "[line {}] Error at end: {}", self.line, self.message)
            }
            DiagnosticLocation::Lexical => {
                write!(f, "[line {}] Error: {}", self.line, self.message)
            }
        }
    }
}

/// Compilation failed; carries every diagnostic that was reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    /// All diagnostics, in source order.
    pub diagnostics: Vec<Diagnostic>,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for diagnostic in &self.diagnostics {
            if !first {
                writeln!(f)?;
            }
            write!(f, "{diagnostic}")?;
            first = false;
        }
        Ok(())
    }
}

/// What kind of function body a frame compiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
    /// The implicit top-level function.
    Script,
    /// A `fun` declaration.
    Function,
}

/// A local variable slot during compilation.
#[derive(Debug)]
struct Local<'src> {
    name: &'src str,
    /// Scope depth, or `-1` while the initializer is still running.
    depth: i32,
    /// Whether some nested function captured this local.
    is_captured: bool,
}

/// A captured variable recorded while compiling a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct UpvalueSlot {
    /// Local slot (if `is_local`) or upvalue index in the enclosing frame.
    index: u8,
    /// Captured directly from the enclosing frame's locals.
    is_local: bool,
}

/// Per-function compiler state. One frame per function being compiled;
/// frames nest along `fun` declarations.
struct FunctionState<'src> {
    kind: FunctionKind,
    /// Interned function name; `None` for the script.
    name: Option<ObjRef>,
    arity: u8,
    chunk: Chunk,
    locals: Vec<Local<'src>>,
    upvalues: Vec<UpvalueSlot>,
    scope_depth: i32,
}

impl<'src> FunctionState<'src> {
    fn new(kind: FunctionKind, name: Option<ObjRef>) -> Self {
        // Slot 0 holds the callee and is never resolvable by name
        let reserved = Local {
            name: "",
            depth: 0,
            is_captured: false,
        };
        Self {
            kind,
            name,
            arity: 0,
            chunk: Chunk::new(),
            locals: vec![reserved],
            upvalues: Vec::new(),
            scope_depth: 0,
        }
    }
}

/// The compiler: token cursor, diagnostics, and the frame stack.
pub struct Compiler<'src, 'h> {
    scanner: Scanner<'src>,
    heap: &'h mut Heap,
    current: Token<'src>,
    previous: Token<'src>,
    had_error: bool,
    panic_mode: bool,
    diagnostics: Vec<Diagnostic>,
    /// Innermost function being compiled.
    state: FunctionState<'src>,
    /// Enclosing frames, outermost first.
    outer: Vec<FunctionState<'src>>,
}

/// Compile a source string into the top-level script function.
///
/// # Errors
///
/// Returns every diagnostic reported during the (error-recovering)
/// parse; no function is produced if any occurred.
pub fn compile(source: &str, heap: &mut Heap) -> Result<ObjRef, CompileError> {
    let mut compiler = Compiler::new(source, heap);
    compiler.advance();
    while !compiler.match_token(TokenKind::Eof) {
        compiler.declaration();
    }
    let script = compiler.end_frame();

    // Release the compiler's heap borrow before using the heap again
    let Compiler {
        had_error,
        diagnostics,
        ..
    } = compiler;

    if had_error {
        Err(CompileError { diagnostics })
    } else {
        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!(
                "compiled script:\n{}",
                disassemble::disassemble_function(heap, script)
            );
        }
        Ok(script)
    }
}

impl<'src, 'h> Compiler<'src, 'h> {
    fn new(source: &'src str, heap: &'h mut Heap) -> Self {
        Self {
            scanner: Scanner::new(source),
            heap,
            current: Token::synthetic(),
            previous: Token::synthetic(),
            had_error: false,
            panic_mode: false,
            diagnostics: Vec::new(),
            state: FunctionState::new(FunctionKind::Script, None),
            outer: Vec::new(),
        }
    }

    // --- Token cursor ---

    fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.scanner.scan_token();
            if self.current.kind != TokenKind::Error {
                break;
            }
            let message = self.current.lexeme.to_owned();
            self.error_at_current(&message);
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.current.kind == kind {
            self.advance();
        } else {
            self.error_at_current(message);
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    // --- Diagnostics ---

    fn error(&mut self, message: &str) {
        self.error_at(self.previous, message);
    }

    fn error_at_current(&mut self, message: &str) {
        self.error_at(self.current, message);
    }

    fn error_at(&mut self, token: Token<'src>, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        self.had_error = true;

        let location = match token.kind {
            TokenKind::Eof => DiagnosticLocation::AtEnd,
            TokenKind::Error => DiagnosticLocation::Lexical,
            _ => DiagnosticLocation::At(token.lexeme.to_owned()),
        };
        self.diagnostics.push(Diagnostic {
            line: token.line,
            location,
            message: message.to_owned(),
        });
    }

    /// Leave panic mode by skipping to the next statement boundary.
    fn synchronize(&mut self) {
        self.panic_mode = false;
        while self.current.kind != TokenKind::Eof {
            if self.previous.kind == TokenKind::Semicolon {
                return;
            }
            match self.current.kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => self.advance(),
            }
        }
    }

    // --- Code emission ---

    fn emit_byte(&mut self, byte: u8) {
        let line = self.previous.line;
        self.state.chunk.write(byte, line);
    }

    fn emit_op(&mut self, op: Op) {
        self.emit_byte(op.into());
    }

    fn emit_with_operand(&mut self, op: Op, operand: u8) {
        self.emit_op(op);
        self.emit_byte(operand);
    }

    /// The implicit function epilogue: return nil.
    fn emit_return(&mut self) {
        self.emit_op(Op::Nil);
        self.emit_op(Op::Return);
    }

    fn make_constant(&mut self, value: Value) -> u8 {
        match self.state.chunk.add_constant(value) {
            Some(index) => index,
            None => {
                self.error("Too many constants in one chunk.");
                0
            }
        }
    }

    fn emit_constant(&mut self, value: Value) {
        let index = self.make_constant(value);
        self.emit_with_operand(Op::Constant, index);
    }

    /// Emit a jump with a placeholder offset; returns the offset's
    /// position for [`Self::patch_jump`].
    fn emit_jump(&mut self, op: Op) -> usize {
        self.emit_op(op);
        self.emit_byte(0xff);
        self.emit_byte(0xff);
        self.state.chunk.len() - 2
    }

    /// Patch a forward jump to land just past the current instruction.
    fn patch_jump(&mut self, offset: usize) {
        // Distance from just-after-the-operand to the current end
        let jump = self.state.chunk.len() - offset - 2;
        if jump > MAX_JUMP {
            self.error("Too much code to jump over.");
        }
        self.state.chunk.code[offset] = (jump >> 8) as u8;
        self.state.chunk.code[offset + 1] = (jump & 0xff) as u8;
    }

    /// Emit a backward jump to `loop_start`.
    fn emit_loop(&mut self, loop_start: usize) {
        self.emit_op(Op::Loop);
        let offset = self.state.chunk.len() - loop_start + 2;
        if offset > MAX_JUMP {
            self.error("Loop body too large.");
        }
        self.emit_byte((offset >> 8) as u8);
        self.emit_byte((offset & 0xff) as u8);
    }

    // --- Frames ---

    fn push_frame(&mut self, kind: FunctionKind, name: Option<ObjRef>) {
        let state = FunctionState::new(kind, name);
        self.outer.push(core::mem::replace(&mut self.state, state));
    }

    /// Finish the innermost function: emit the epilogue, pop the frame,
    /// and move the finished function onto the heap.
    fn end_frame(&mut self) -> ObjRef {
        self.emit_return();

        let parent = self
            .outer
            .pop()
            .unwrap_or_else(|| FunctionState::new(FunctionKind::Script, None));
        let finished = core::mem::replace(&mut self.state, parent);

        self.heap.alloc(HeapObj::Function(ObjFunction {
            arity: finished.arity,
            upvalue_count: finished.upvalues.len() as u16,
            chunk: finished.chunk,
            name: finished.name,
        }))
    }

    /// Compiler frame at `level` hops out from the innermost (level 0).
    fn frame(&self, level: usize) -> Option<&FunctionState<'src>> {
        if level == 0 {
            Some(&self.state)
        } else {
            let n = self.outer.len();
            self.outer.get(n.checked_sub(level)?)
        }
    }

    fn frame_mut(&mut self, level: usize) -> Option<&mut FunctionState<'src>> {
        if level == 0 {
            Some(&mut self.state)
        } else {
            let n = self.outer.len();
            self.outer.get_mut(n.checked_sub(level)?)
        }
    }

    // --- Scopes and variables ---

    fn begin_scope(&mut self) {
        self.state.scope_depth += 1;
    }

    /// Pop the scope's locals, closing the captured ones.
    fn end_scope(&mut self) {
        self.state.scope_depth -= 1;
        while self
            .state
            .locals
            .last()
            .is_some_and(|local| local.depth > self.state.scope_depth)
        {
            let captured = self.state.locals.pop().is_some_and(|local| local.is_captured);
            if captured {
                self.emit_op(Op::CloseUpvalue);
            } else {
                self.emit_op(Op::Pop);
            }
        }
    }

    /// Intern an identifier and store it in the constant pool.
    fn identifier_constant(&mut self, name: &str) -> u8 {
        let interned = self.heap.intern(name);
        self.make_constant(Value::Obj(interned))
    }

    /// Consume a variable name; declare it as a local or return its
    /// name-constant index for a global.
    fn parse_variable(&mut self, message: &str) -> u8 {
        self.consume(TokenKind::Identifier, message);
        self.declare_variable();
        if self.state.scope_depth > 0 {
            return 0;
        }
        self.identifier_constant(self.previous.lexeme)
    }

    /// Record a new local in the current scope (no-op for globals).
    fn declare_variable(&mut self) {
        if self.state.scope_depth == 0 {
            return;
        }
        let name = self.previous.lexeme;

        let mut duplicate = false;
        for local in self.state.locals.iter().rev() {
            if local.depth != -1 && local.depth < self.state.scope_depth {
                break;
            }
            if local.name == name {
                duplicate = true;
                break;
            }
        }
        if duplicate {
            self.error("Already a variable with this name in this scope.");
        }

        self.add_local(name);
    }

    fn add_local(&mut self, name: &'src str) {
        if self.state.locals.len() == MAX_LOCALS {
            self.error("Too many local variables in function.");
            return;
        }
        self.state.locals.push(Local {
            name,
            depth: -1,
            is_captured: false,
        });
    }

    /// Make the just-declared local visible (initializer complete).
    fn mark_initialized(&mut self) {
        if self.state.scope_depth == 0 {
            return;
        }
        let depth = self.state.scope_depth;
        if let Some(local) = self.state.locals.last_mut() {
            local.depth = depth;
        }
    }

    fn define_variable(&mut self, global: u8) {
        if self.state.scope_depth > 0 {
            self.mark_initialized();
            return;
        }
        self.emit_with_operand(Op::DefineGlobal, global);
    }

    /// Find `name` among the locals of the frame at `level`, innermost
    /// declaration first.
    fn resolve_local(&mut self, level: usize, name: &str) -> Option<u8> {
        let mut uninitialized = false;
        let mut found = None;
        if let Some(frame) = self.frame(level) {
            for (slot, local) in frame.locals.iter().enumerate().rev() {
                if local.name == name {
                    uninitialized = local.depth == -1;
                    found = Some(slot as u8);
                    break;
                }
            }
        }
        if uninitialized {
            self.error("Can't read local variable in its own initializer.");
        }
        found
    }

    /// Find `name` as an upvalue of the frame at `level`, capturing it
    /// from the enclosing frame chain.
    fn resolve_upvalue(&mut self, level: usize, name: &str) -> Option<u8> {
        // The outermost frame has nothing to capture from
        if level >= self.outer.len() {
            return None;
        }

        if let Some(local) = self.resolve_local(level + 1, name) {
            if let Some(frame) = self.frame_mut(level + 1) {
                if let Some(slot) = frame.locals.get_mut(local as usize) {
                    slot.is_captured = true;
                }
            }
            return Some(self.add_upvalue(level, local, true));
        }

        if let Some(upvalue) = self.resolve_upvalue(level + 1, name) {
            return Some(self.add_upvalue(level, upvalue, false));
        }

        None
    }

    /// Record an upvalue on the frame at `level`, deduplicating by
    /// `(index, is_local)`.
    fn add_upvalue(&mut self, level: usize, index: u8, is_local: bool) -> u8 {
        let slot = UpvalueSlot { index, is_local };

        let mut full = false;
        let mut result = 0;
        if let Some(frame) = self.frame_mut(level) {
            if let Some(existing) = frame.upvalues.iter().position(|u| *u == slot) {
                return existing as u8;
            }
            if frame.upvalues.len() == MAX_UPVALUES {
                full = true;
            } else {
                frame.upvalues.push(slot);
                result = (frame.upvalues.len() - 1) as u8;
            }
        }
        if full {
            self.error("Too many closure variables in function.");
            return 0;
        }
        result
    }

    // --- Declarations and statements ---

    fn declaration(&mut self) {
        if self.match_token(TokenKind::Fun) {
            self.fun_declaration();
        } else if self.match_token(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.statement();
        }

        if self.panic_mode {
            self.synchronize();
        }
    }

    fn var_declaration(&mut self) {
        let global = self.parse_variable("Expect variable name.");

        if self.match_token(TokenKind::Equal) {
            self.expression();
        } else {
            self.emit_op(Op::Nil);
        }
        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.");

        self.define_variable(global);
    }

    fn fun_declaration(&mut self) {
        let global = self.parse_variable("Expect function name.");
        // The function may refer to itself; it is initialized up front
        self.mark_initialized();
        self.function();
        self.define_variable(global);
    }

    /// Compile a function body and emit the closure that wraps it.
    fn function(&mut self) {
        let name = self.heap.intern(self.previous.lexeme);
        self.push_frame(FunctionKind::Function, Some(name));
        self.begin_scope();

        self.consume(TokenKind::LeftParen, "Expect '(' after function name.");
        if !self.check(TokenKind::RightParen) {
            loop {
                if self.state.arity == MAX_ARITY {
                    self.error_at_current("Can't have more than 255 parameters.");
                } else {
                    self.state.arity += 1;
                }
                let constant = self.parse_variable("Expect parameter name.");
                self.define_variable(constant);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.");
        self.consume(TokenKind::LeftBrace, "Expect '{' before function body.");
        self.block();

        // No end_scope: the frame is discarded whole
        let upvalues = self.state.upvalues.clone();
        let function = self.end_frame();

        let constant = self.make_constant(Value::Obj(function));
        self.emit_with_operand(Op::Closure, constant);
        for upvalue in upvalues {
            self.emit_byte(u8::from(upvalue.is_local));
            self.emit_byte(upvalue.index);
        }
    }

    fn statement(&mut self) {
        if self.match_token(TokenKind::Print) {
            self.print_statement();
        } else if self.match_token(TokenKind::If) {
            self.if_statement();
        } else if self.match_token(TokenKind::While) {
            self.while_statement();
        } else if self.match_token(TokenKind::For) {
            self.for_statement();
        } else if self.match_token(TokenKind::Return) {
            self.return_statement();
        } else if self.match_token(TokenKind::LeftBrace) {
            self.begin_scope();
            self.block();
            self.end_scope();
        } else {
            self.expression_statement();
        }
    }

    fn block(&mut self) {
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            self.declaration();
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.");
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after value.");
        self.emit_op(Op::Print);
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.");
        self.emit_op(Op::Pop);
    }

    fn if_statement(&mut self) {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let then_jump = self.emit_jump(Op::JumpIfFalse);
        self.emit_op(Op::Pop);
        self.statement();
        let else_jump = self.emit_jump(Op::Jump);

        self.patch_jump(then_jump);
        self.emit_op(Op::Pop);
        if self.match_token(TokenKind::Else) {
            self.statement();
        }
        self.patch_jump(else_jump);
    }

    fn while_statement(&mut self) {
        let loop_start = self.state.chunk.len();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let exit_jump = self.emit_jump(Op::JumpIfFalse);
        self.emit_op(Op::Pop);
        self.statement();
        self.emit_loop(loop_start);

        self.patch_jump(exit_jump);
        self.emit_op(Op::Pop);
    }

    /// `for (init; condition; increment) body` - the increment runs
    /// after the body via a jump back and forth.
    fn for_statement(&mut self) {
        self.begin_scope();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.");

        if self.match_token(TokenKind::Semicolon) {
            // No initializer
        } else if self.match_token(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.expression_statement();
        }

        let mut loop_start = self.state.chunk.len();

        let mut exit_jump = None;
        if !self.match_token(TokenKind::Semicolon) {
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.");
            exit_jump = Some(self.emit_jump(Op::JumpIfFalse));
            self.emit_op(Op::Pop);
        }

        if !self.match_token(TokenKind::RightParen) {
            let body_jump = self.emit_jump(Op::Jump);
            let increment_start = self.state.chunk.len();
            self.expression();
            self.emit_op(Op::Pop);
            self.consume(TokenKind::RightParen, "Expect ')' after for clauses.");

            self.emit_loop(loop_start);
            loop_start = increment_start;
            self.patch_jump(body_jump);
        }

        self.statement();
        self.emit_loop(loop_start);

        if let Some(exit_jump) = exit_jump {
            self.patch_jump(exit_jump);
            self.emit_op(Op::Pop);
        }

        self.end_scope();
    }

    fn return_statement(&mut self) {
        if self.state.kind == FunctionKind::Script {
            self.error("Can't return from top-level code.");
        }

        if self.match_token(TokenKind::Semicolon) {
            self.emit_return();
        } else {
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after return value.");
            self.emit_op(Op::Return);
        }
    }
}
