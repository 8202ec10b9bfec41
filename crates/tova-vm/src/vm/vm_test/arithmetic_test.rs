// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for arithmetic, comparison, and logic instructions.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::{output_of, runtime_error_of};
use crate::vm::RuntimeErrorKind;

// --- Arithmetic ---

#[test]
fn precedence_multiplication_before_addition() {
    assert_eq!(output_of("print 1 + 2 * 3;"), "7\n");
}

#[test]
fn grouping_overrides_precedence() {
    assert_eq!(output_of("print (1 + 2) * 3;"), "9\n");
}

#[test]
fn subtraction_is_left_associative() {
    assert_eq!(output_of("print 10 - 4 - 3;"), "3\n");
}

#[test]
fn division_produces_fractions() {
    assert_eq!(output_of("print 7 / 2;"), "3.5\n");
}

#[test]
fn unary_negation() {
    assert_eq!(output_of("print -3;"), "-3\n");
    assert_eq!(output_of("print --3;"), "3\n");
}

#[test]
fn division_by_zero_is_ieee_infinity() {
    assert_eq!(output_of("print 1 / 0;"), "inf\n");
}

// --- Comparison and equality ---

#[test]
fn comparisons() {
    assert_eq!(output_of("print 1 < 2;"), "true\n");
    assert_eq!(output_of("print 2 <= 2;"), "true\n");
    assert_eq!(output_of("print 1 > 2;"), "false\n");
    assert_eq!(output_of("print 3 >= 4;"), "false\n");
}

#[test]
fn equality_on_numbers() {
    assert_eq!(output_of("print 1 == 1;"), "true\n");
    assert_eq!(output_of("print 1 != 2;"), "true\n");
}

#[test]
fn equality_across_kinds_is_false() {
    assert_eq!(output_of("print 0 == false;"), "false\n");
    assert_eq!(output_of("print nil == false;"), "false\n");
    assert_eq!(output_of("print \"1\" == 1;"), "false\n");
}

#[test]
fn nil_equals_nil() {
    assert_eq!(output_of("print nil == nil;"), "true\n");
}

// --- Logic ---

#[test]
fn not_follows_falsiness() {
    assert_eq!(output_of("print !nil;"), "true\n");
    assert_eq!(output_of("print !false;"), "true\n");
    assert_eq!(output_of("print !0;"), "false\n");
    assert_eq!(output_of("print !\"\";"), "false\n");
}

// --- Type errors ---

#[test]
fn negate_requires_number() {
    let error = runtime_error_of("print -\"x\";");
    assert_eq!(error.kind, RuntimeErrorKind::OperandMustBeNumber);
    assert_eq!(error.kind.to_string(), "Operand must be a number.");
}

#[test]
fn subtract_requires_numbers() {
    let error = runtime_error_of("print \"a\" - 1;");
    assert_eq!(error.kind, RuntimeErrorKind::OperandsMustBeNumbers);
    assert_eq!(error.kind.to_string(), "Operands must be numbers.");
}

#[test]
fn compare_requires_numbers() {
    let error = runtime_error_of("print \"a\" < \"b\";");
    assert_eq!(error.kind, RuntimeErrorKind::OperandsMustBeNumbers);
}
