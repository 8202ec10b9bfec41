// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Debug helper: render chunks as readable instruction listings.
//!
//! Used by execution tracing and by tests; never on the hot path.

use core::fmt::Write;

use crate::bytecode::{Chunk, Op};
use crate::heap::Heap;
use crate::value::{ObjRef, Value, value_to_string};

/// Disassemble a heap function, headed by its name.
#[must_use]
pub fn disassemble_function(heap: &Heap, function: ObjRef) -> String {
    let Some(f) = heap.function(function) else {
        return String::from("<not a function>\n");
    };
    let name = f
        .name
        .and_then(|n| heap.string(n))
        .map_or_else(|| String::from("<script>"), |s| s.chars.to_string());
    disassemble_chunk(heap, &f.chunk, &name)
}

/// Disassemble a whole chunk under a header line.
#[must_use]
pub fn disassemble_chunk(heap: &Heap, chunk: &Chunk, name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {name} ==");

    let mut offset = 0;
    while offset < chunk.code.len() {
        let (line, next) = disassemble_instruction(heap, chunk, offset);
        let _ = writeln!(out, "{line}");
        offset = next;
    }
    out
}

/// Disassemble the instruction at `offset`.
///
/// Returns the rendered text and the offset of the next instruction.
#[must_use]
pub fn disassemble_instruction(heap: &Heap, chunk: &Chunk, offset: usize) -> (String, usize) {
    let mut out = String::new();
    let _ = write!(out, "{offset:04} ");
    if offset > 0 && chunk.lines[offset] == chunk.lines[offset - 1] {
        let _ = write!(out, "   | ");
    } else {
        let _ = write!(out, "{:4} ", chunk.lines[offset]);
    }

    let byte = chunk.code[offset];
    let Ok(op) = Op::try_from(byte) else {
        let _ = write!(out, "Unknown opcode {byte}");
        return (out, offset + 1);
    };

    let next = match op {
        Op::Constant | Op::GetGlobal | Op::DefineGlobal | Op::SetGlobal => {
            constant_instruction(&mut out, heap, chunk, op, offset)
        }
        Op::GetLocal | Op::SetLocal | Op::GetUpvalue | Op::SetUpvalue | Op::Call => {
            byte_instruction(&mut out, op, chunk, offset)
        }
        Op::Jump | Op::JumpIfFalse => jump_instruction(&mut out, op, 1, chunk, offset),
        Op::Loop => jump_instruction(&mut out, op, -1, chunk, offset),
        Op::Closure => closure_instruction(&mut out, heap, chunk, offset),
        Op::Nil
        | Op::True
        | Op::False
        | Op::Pop
        | Op::Equal
        | Op::Greater
        | Op::Less
        | Op::Add
        | Op::Subtract
        | Op::Multiply
        | Op::Divide
        | Op::Not
        | Op::Negate
        | Op::Print
        | Op::CloseUpvalue
        | Op::Return => {
            let _ = write!(out, "{}", op.name());
            offset + 1
        }
    };

    (out, next)
}

fn constant_instruction(
    out: &mut String,
    heap: &Heap,
    chunk: &Chunk,
    op: Op,
    offset: usize,
) -> usize {
    let index = chunk.code[offset + 1];
    let rendered = chunk
        .constants
        .get(index as usize)
        .map_or_else(|| String::from("?"), |&v| value_to_string(heap, v));
    let _ = write!(out, "{:<16} {index:4} '{rendered}'", op.name());
    offset + 2
}

fn byte_instruction(out: &mut String, op: Op, chunk: &Chunk, offset: usize) -> usize {
    let slot = chunk.code[offset + 1];
    let _ = write!(out, "{:<16} {slot:4}", op.name());
    offset + 2
}

fn jump_instruction(out: &mut String, op: Op, sign: i64, chunk: &Chunk, offset: usize) -> usize {
    let jump = (u16::from(chunk.code[offset + 1]) << 8) | u16::from(chunk.code[offset + 2]);
    let target = offset as i64 + 3 + sign * i64::from(jump);
    let _ = write!(out, "{:<16} {offset:4} -> {target}", op.name());
    offset + 3
}

fn closure_instruction(out: &mut String, heap: &Heap, chunk: &Chunk, offset: usize) -> usize {
    let index = chunk.code[offset + 1];
    let constant = chunk.constants.get(index as usize).copied();
    let rendered = constant.map_or_else(|| String::from("?"), |v| value_to_string(heap, v));
    let _ = write!(out, "{:<16} {index:4} {rendered}", Op::Closure.name());

    // One (is_local, index) pair per captured upvalue follows inline
    let upvalue_count = constant
        .and_then(|v| match v {
            Value::Obj(r) => heap.function(r).map(|f| usize::from(f.upvalue_count)),
            _ => None,
        })
        .unwrap_or(0);

    let mut cursor = offset + 2;
    for _ in 0..upvalue_count {
        let is_local = chunk.code[cursor];
        let capture_index = chunk.code[cursor + 1];
        let kind = if is_local == 1 { "local" } else { "upvalue" };
        let _ = write!(out, "\n{cursor:04}    |                     {kind} {capture_index}");
        cursor += 2;
    }
    cursor
}
