// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Printer for Tova values.
//!
//! Renders values the way the `print` statement shows them: strings
//! without quotes, integral numbers without a decimal point, functions
//! by name.

use std::io::{self, Write};

use crate::heap::Heap;
use crate::value::{HeapObj, ObjRef, Value};

/// Write a value to the given sink.
pub fn write_value<W: Write>(out: &mut W, heap: &Heap, value: Value) -> io::Result<()> {
    match value {
        Value::Nil => write!(out, "nil"),
        Value::Bool(true) => write!(out, "true"),
        Value::Bool(false) => write!(out, "false"),
        Value::Number(n) => write_number(out, n),
        Value::Obj(r) => write_object(out, heap, r),
    }
}

/// Render a value to a string (used by the disassembler and tests).
#[must_use]
pub fn value_to_string(heap: &Heap, value: Value) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail
    let _ = write_value(&mut buf, heap, value);
    String::from_utf8_lossy(&buf).into_owned()
}

fn write_number<W: Write>(out: &mut W, n: f64) -> io::Result<()> {
    // Integral doubles print without a decimal point: `7`, not `7.0`
    if n.fract() == 0.0 && n.abs() < 1e15 {
        write!(out, "{}", n as i64)
    } else {
        write!(out, "{n}")
    }
}

fn write_object<W: Write>(out: &mut W, heap: &Heap, r: ObjRef) -> io::Result<()> {
    match heap.get(r) {
        Some(HeapObj::String(s)) => write!(out, "{}", s.chars),
        Some(HeapObj::Function(f)) => write_function_name(out, heap, f.name),
        Some(HeapObj::Closure(c)) => {
            let name = heap.function(c.function).and_then(|f| f.name);
            write_function_name(out, heap, name)
        }
        Some(HeapObj::Upvalue(_)) => write!(out, "upvalue"),
        Some(HeapObj::Native(_)) => write!(out, "<native fn>"),
        None => write!(out, "<dangling>"),
    }
}

fn write_function_name<W: Write>(out: &mut W, heap: &Heap, name: Option<ObjRef>) -> io::Result<()> {
    match name.and_then(|n| heap.string(n)) {
        Some(s) => write!(out, "<fn {}>", s.chars),
        None => write!(out, "<script>"),
    }
}
