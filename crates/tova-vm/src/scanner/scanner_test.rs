// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the scanner.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;

/// Scan all tokens up to and including `Eof`.
fn scan_all(src: &str) -> Vec<Token<'_>> {
    let mut scanner = Scanner::new(src);
    let mut tokens = Vec::new();
    loop {
        let token = scanner.scan_token();
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            break;
        }
    }
    tokens
}

fn kinds(src: &str) -> Vec<TokenKind> {
    scan_all(src).iter().map(|t| t.kind).collect()
}

// --- Punctuation and operators ---

#[test]
fn scan_single_char_tokens() {
    assert_eq!(
        kinds("(){},.-+;/*"),
        vec![
            TokenKind::LeftParen,
            TokenKind::RightParen,
            TokenKind::LeftBrace,
            TokenKind::RightBrace,
            TokenKind::Comma,
            TokenKind::Dot,
            TokenKind::Minus,
            TokenKind::Plus,
            TokenKind::Semicolon,
            TokenKind::Slash,
            TokenKind::Star,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn scan_one_or_two_char_tokens() {
    assert_eq!(
        kinds("! != = == > >= < <="),
        vec![
            TokenKind::Bang,
            TokenKind::BangEqual,
            TokenKind::Equal,
            TokenKind::EqualEqual,
            TokenKind::Greater,
            TokenKind::GreaterEqual,
            TokenKind::Less,
            TokenKind::LessEqual,
            TokenKind::Eof,
        ]
    );
}

// --- Literals ---

#[test]
fn scan_number() {
    let tokens = scan_all("123 3.25");
    assert_eq!(tokens[0].kind, TokenKind::Number);
    assert_eq!(tokens[0].lexeme, "123");
    assert_eq!(tokens[1].kind, TokenKind::Number);
    assert_eq!(tokens[1].lexeme, "3.25");
}

#[test]
fn scan_number_trailing_dot_not_consumed() {
    // `1.` is a number followed by a dot
    assert_eq!(
        kinds("1."),
        vec![TokenKind::Number, TokenKind::Dot, TokenKind::Eof]
    );
}

#[test]
fn scan_string() {
    let tokens = scan_all("\"hello\"");
    assert_eq!(tokens[0].kind, TokenKind::String);
    assert_eq!(tokens[0].lexeme, "\"hello\"");
}

#[test]
fn scan_string_spans_lines() {
    let tokens = scan_all("\"a\nb\" x");
    assert_eq!(tokens[0].kind, TokenKind::String);
    // The identifier after the string is on line 2
    assert_eq!(tokens[1].line, 2);
}

#[test]
fn scan_unterminated_string() {
    let tokens = scan_all("\"oops");
    assert_eq!(tokens[0].kind, TokenKind::Error);
    assert_eq!(tokens[0].lexeme, "Unterminated string.");
}

// --- Identifiers and keywords ---

#[test]
fn scan_identifier() {
    let tokens = scan_all("foo _bar baz42");
    assert!(tokens[..3].iter().all(|t| t.kind == TokenKind::Identifier));
    assert_eq!(tokens[2].lexeme, "baz42");
}

#[test]
fn scan_keywords() {
    assert_eq!(
        kinds("and class else false for fun if nil or print return super this true var while"),
        vec![
            TokenKind::And,
            TokenKind::Class,
            TokenKind::Else,
            TokenKind::False,
            TokenKind::For,
            TokenKind::Fun,
            TokenKind::If,
            TokenKind::Nil,
            TokenKind::Or,
            TokenKind::Print,
            TokenKind::Return,
            TokenKind::Super,
            TokenKind::This,
            TokenKind::True,
            TokenKind::Var,
            TokenKind::While,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn scan_keyword_prefix_is_identifier() {
    assert_eq!(kinds("variable"), vec![TokenKind::Identifier, TokenKind::Eof]);
    assert_eq!(kinds("fund"), vec![TokenKind::Identifier, TokenKind::Eof]);
}

// --- Whitespace, comments, lines ---

#[test]
fn scan_skips_comments() {
    assert_eq!(
        kinds("1 // comment\n2"),
        vec![TokenKind::Number, TokenKind::Number, TokenKind::Eof]
    );
}

#[test]
fn scan_tracks_lines() {
    let tokens = scan_all("1\n2\n\n3");
    assert_eq!(tokens[0].line, 1);
    assert_eq!(tokens[1].line, 2);
    assert_eq!(tokens[2].line, 4);
}

#[test]
fn scan_unexpected_character() {
    let tokens = scan_all("@");
    assert_eq!(tokens[0].kind, TokenKind::Error);
    assert_eq!(tokens[0].lexeme, "Unexpected character.");
}

#[test]
fn scan_empty_source() {
    let tokens = scan_all("");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, TokenKind::Eof);
}

#[test]
fn scan_eof_is_sticky() {
    let mut scanner = Scanner::new("x");
    let _ = scanner.scan_token();
    assert_eq!(scanner.scan_token().kind, TokenKind::Eof);
    assert_eq!(scanner.scan_token().kind, TokenKind::Eof);
}
