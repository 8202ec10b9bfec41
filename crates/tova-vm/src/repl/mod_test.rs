// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the REPL evaluation step.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;

#[test]
fn evaluate_reports_success() {
    let mut out = Vec::new();
    let mut vm = Vm::new(&mut out);
    assert!(evaluate(&mut vm, "print 1;"));
    drop(vm);
    assert_eq!(String::from_utf8_lossy(&out), "1\n");
}

#[test]
fn evaluate_survives_compile_error() {
    let mut out = Vec::new();
    let mut vm = Vm::new(&mut out);
    assert!(!evaluate(&mut vm, "print"));
    assert!(evaluate(&mut vm, "print 2;"));
    drop(vm);
    assert_eq!(String::from_utf8_lossy(&out), "2\n");
}

#[test]
fn evaluate_survives_runtime_error() {
    let mut out = Vec::new();
    let mut vm = Vm::new(&mut out);
    assert!(!evaluate(&mut vm, "print missing;"));
    assert!(evaluate(&mut vm, "print 3;"));
    drop(vm);
    assert_eq!(String::from_utf8_lossy(&out), "3\n");
}

#[test]
fn session_state_accumulates() {
    let mut out = Vec::new();
    let mut vm = Vm::new(&mut out);
    assert!(evaluate(&mut vm, "var total = 0;"));
    assert!(evaluate(&mut vm, "total = total + 40;"));
    assert!(evaluate(&mut vm, "print total + 2;"));
    drop(vm);
    assert_eq!(String::from_utf8_lossy(&out), "42\n");
}
