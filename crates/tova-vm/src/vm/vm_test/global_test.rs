// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for global variables.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::{output_of, runtime_error_of};
use crate::vm::{RuntimeErrorKind, Vm};

#[test]
fn define_and_read() {
    assert_eq!(output_of("var a = 1; print a;"), "1\n");
}

#[test]
fn define_without_initializer_is_nil() {
    assert_eq!(output_of("var a; print a;"), "nil\n");
}

#[test]
fn assignment_updates_value() {
    assert_eq!(output_of("var a = 1; a = 2; print a;"), "2\n");
}

#[test]
fn assignment_is_an_expression() {
    assert_eq!(output_of("var a = 1; print a = 5;"), "5\n");
}

#[test]
fn redefinition_is_allowed_for_globals() {
    assert_eq!(output_of("var a = 1; var a = 2; print a;"), "2\n");
}

#[test]
fn definition_uses_previous_binding() {
    assert_eq!(output_of("var a = 1; var a = a + 1; print a;"), "2\n");
}

#[test]
fn get_undefined_global_fails() {
    let error = runtime_error_of("print undefined;");
    assert_eq!(
        error.kind,
        RuntimeErrorKind::UndefinedVariable(String::from("undefined"))
    );
    assert_eq!(
        error.kind.to_string(),
        "Undefined variable 'undefined'."
    );
}

#[test]
fn set_undefined_global_fails() {
    let error = runtime_error_of("missing = 1;");
    assert_eq!(
        error.kind,
        RuntimeErrorKind::UndefinedVariable(String::from("missing"))
    );
}

#[test]
fn failed_set_leaves_no_binding_behind() {
    // The insert-then-delete in SET_GLOBAL must not define the name,
    // even for a VM that keeps running (as the REPL does)
    let mut out = Vec::new();
    let mut vm = Vm::new(&mut out);
    assert!(vm.interpret("fiddle = 1;").is_err());
    assert!(vm.interpret("print fiddle;").is_err());
}

#[test]
fn globals_survive_across_interpret_calls() {
    let mut out = Vec::new();
    let mut vm = Vm::new(&mut out);
    vm.interpret("var kept = 41;").unwrap();
    vm.interpret("print kept + 1;").unwrap();
    drop(vm);
    assert_eq!(String::from_utf8_lossy(&out), "42\n");
}
