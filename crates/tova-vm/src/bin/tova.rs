// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tova command-line driver.
//!
//! With no arguments, starts a REPL; with a script path, runs the file.
//! Exit codes follow the sysexits convention: 65 for compile errors,
//! 70 for runtime errors, 74 for unreadable input files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tova_vm::repl;
use tova_vm::{InterpretError, Vm};

/// Exit code for source that failed to compile.
const EXIT_COMPILE_ERROR: u8 = 65;

/// Exit code for a program that failed at runtime.
const EXIT_RUNTIME_ERROR: u8 = 70;

/// Exit code for an unreadable script file.
const EXIT_IO_ERROR: u8 = 74;

/// The Tova language interpreter.
#[derive(Debug, Parser)]
#[command(name = "tova", version = tova_vm::VERSION, about)]
struct Args {
    /// Script to run; starts an interactive session when omitted.
    script: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    match args.script {
        Some(path) => run_file(&path),
        None => match repl::run() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{e}");
                ExitCode::FAILURE
            }
        },
    }
}

fn run_file(path: &Path) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Could not read \"{}\": {e}.", path.display());
            return ExitCode::from(EXIT_IO_ERROR);
        }
    };

    let mut vm = Vm::new(io::stdout());
    match vm.interpret(&source) {
        Ok(()) => ExitCode::SUCCESS,
        Err(InterpretError::Compile(e)) => {
            eprintln!("{e}");
            ExitCode::from(EXIT_COMPILE_ERROR)
        }
        Err(InterpretError::Runtime(e)) => {
            eprintln!("{e}");
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    }
}
