// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! REPL (Read-Eval-Print Loop) for Tova.
//!
//! Reads lines, feeds each one through [`Vm::interpret`], and prints
//! diagnostics without ending the session. Globals persist across
//! lines because the VM is reused.

#[cfg(test)]
mod mod_test;

use std::io::{self, Write};

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::vm::Vm;

/// Run the interactive loop until end-of-file or interrupt.
///
/// # Errors
///
/// Returns an error if the line editor fails (terminal problems);
/// interpreter diagnostics are printed, not returned.
pub fn run() -> rustyline::Result<()> {
    let mut editor = DefaultEditor::new()?;
    let mut vm = Vm::new(io::stdout());

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(&line);
                evaluate(&mut vm, &line);
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => return Ok(()),
            Err(e) => return Err(e),
        }
    }
}

/// Interpret one line, printing any diagnostics to stderr.
///
/// Returns whether the line ran cleanly; the VM stays usable either way.
pub fn evaluate<W: Write>(vm: &mut Vm<W>, line: &str) -> bool {
    match vm.interpret(line) {
        Ok(()) => true,
        Err(e) => {
            eprintln!("{e}");
            false
        }
    }
}
