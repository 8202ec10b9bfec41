// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the value printer.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::bytecode::Chunk;
use crate::heap::Heap;

fn printed(heap: &Heap, value: Value) -> String {
    value_to_string(heap, value)
}

#[test]
fn print_nil_and_bools() {
    let heap = Heap::new();
    assert_eq!(printed(&heap, Value::Nil), "nil");
    assert_eq!(printed(&heap, Value::Bool(true)), "true");
    assert_eq!(printed(&heap, Value::Bool(false)), "false");
}

#[test]
fn integral_numbers_print_without_decimal_point() {
    let heap = Heap::new();
    assert_eq!(printed(&heap, Value::Number(7.0)), "7");
    assert_eq!(printed(&heap, Value::Number(-3.0)), "-3");
    assert_eq!(printed(&heap, Value::Number(0.0)), "0");
}

#[test]
fn fractional_numbers_keep_their_digits() {
    let heap = Heap::new();
    assert_eq!(printed(&heap, Value::Number(2.5)), "2.5");
    assert_eq!(printed(&heap, Value::Number(-0.125)), "-0.125");
}

#[test]
fn strings_print_without_quotes() {
    let mut heap = Heap::new();
    let s = heap.intern("hi!");
    assert_eq!(printed(&heap, Value::Obj(s)), "hi!");
}

#[test]
fn functions_print_by_name() {
    let mut heap = Heap::new();
    let name = heap.intern("make");
    let function = heap.alloc(HeapObj::Function(ObjFunction {
        arity: 0,
        upvalue_count: 0,
        chunk: Chunk::new(),
        name: Some(name),
    }));
    assert_eq!(printed(&heap, Value::Obj(function)), "<fn make>");
}

#[test]
fn script_function_prints_as_script() {
    let mut heap = Heap::new();
    let function = heap.alloc(HeapObj::Function(ObjFunction {
        arity: 0,
        upvalue_count: 0,
        chunk: Chunk::new(),
        name: None,
    }));
    assert_eq!(printed(&heap, Value::Obj(function)), "<script>");
}

#[test]
fn closures_print_as_their_function() {
    let mut heap = Heap::new();
    let name = heap.intern("inc");
    let function = heap.alloc(HeapObj::Function(ObjFunction {
        arity: 0,
        upvalue_count: 0,
        chunk: Chunk::new(),
        name: Some(name),
    }));
    let closure = heap.alloc(HeapObj::Closure(ObjClosure {
        function,
        upvalues: Vec::new(),
    }));
    assert_eq!(printed(&heap, Value::Obj(closure)), "<fn inc>");
}

#[test]
fn natives_print_generically() {
    let mut heap = Heap::new();
    let native = heap.alloc(HeapObj::Native(ObjNative {
        function: |_| Value::Nil,
        arity: 0,
    }));
    assert_eq!(printed(&heap, Value::Obj(native)), "<native fn>");
}
