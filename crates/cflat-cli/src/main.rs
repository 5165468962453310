// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Tobias Sarnowski <tobias@sarnowski.cloud>

//! Sample host binary for the cflat engine: runs a script file, evaluates a
//! one-off expression, or opens an interactive REPL when given neither.

use clap::Parser;
use cflat::{Environment, EnvironmentConfig};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "cflat", about = "Run or explore cflat scripts")]
struct Cli {
    /// Script file to load and run. Omit to open an interactive REPL.
    script: Option<PathBuf>,

    /// Evaluate a single expression instead of loading `script` as a program.
    #[arg(short = 'e', long)]
    expr: Option<String>,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let env = Environment::new("cflat", EnvironmentConfig::default());

    if let Some(expr) = &cli.expr {
        return match env.evaluate_expression(expr) {
            Ok(value) => {
                println!("{}", env.format_value(&value));
                ExitCode::SUCCESS
            }
            Err(diagnostic) => {
                eprintln!("{diagnostic}");
                ExitCode::FAILURE
            }
        };
    }

    match cli.script {
        Some(path) => run_script(&env, &path),
        None => run_repl(&env),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).with_target(false).init();
}

fn run_script(env: &Environment, path: &PathBuf) -> ExitCode {
    match env.load_from_file(path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(diagnostic) => {
            eprintln!("{diagnostic}");
            ExitCode::FAILURE
        }
    }
}

fn run_repl(env: &Environment) -> ExitCode {
    println!("cflat {} -- type a statement or expression, Ctrl-D to exit", cflat::VERSION);
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(err) => {
            eprintln!("could not start line editor: {err}");
            return ExitCode::FAILURE;
        }
    };

    loop {
        match editor.readline("cflat> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(trimmed);
                evaluate_repl_line(env, trimmed);
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("read error: {err}");
                break;
            }
        }
    }
    ExitCode::SUCCESS
}

/// Tries the line as a bare expression first (the common REPL case); falls
/// back to loading it as a full statement/declaration so `int x = 1;` and
/// function definitions work too.
fn evaluate_repl_line(env: &Environment, line: &str) {
    match env.evaluate_expression(line) {
        Ok(value) => println!("{}", env.format_value(&value)),
        Err(_) => {
            env.reset();
            if let Err(diagnostic) = env.load(line) {
                eprintln!("{diagnostic}");
            }
        }
    }
}
