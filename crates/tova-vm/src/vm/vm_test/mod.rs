// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the virtual machine.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod arithmetic_test;
mod global_test;

use super::*;
use crate::compiler::CompileError;

/// Run a source string, capturing program output.
pub fn run_source(source: &str) -> (String, Result<(), InterpretError>) {
    let mut out = Vec::new();
    let result = {
        let mut vm = Vm::new(&mut out);
        vm.interpret(source)
    };
    (String::from_utf8_lossy(&out).into_owned(), result)
}

/// Run a source string that must succeed; returns its output.
pub fn output_of(source: &str) -> String {
    let (output, result) = run_source(source);
    if let Err(e) = result {
        panic!("unexpected error: {e}\noutput so far: {output}");
    }
    output
}

/// Run a source string that must fail at runtime; returns the error.
pub fn runtime_error_of(source: &str) -> RuntimeError {
    let (_, result) = run_source(source);
    match result {
        Err(InterpretError::Runtime(e)) => e,
        Err(InterpretError::Compile(e)) => panic!("expected runtime error, got compile error: {e}"),
        Ok(()) => panic!("expected runtime error, program succeeded"),
    }
}

/// Run a source string that must fail to compile; returns the error.
pub fn compile_error_of(source: &str) -> CompileError {
    let (_, result) = run_source(source);
    match result {
        Err(InterpretError::Compile(e)) => e,
        Err(InterpretError::Runtime(e)) => panic!("expected compile error, got runtime error: {e}"),
        Ok(()) => panic!("expected compile error, program succeeded"),
    }
}
