// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! # Cflat
//!
//! Embeddable tree-walking interpreter for a subset of C++: tokenize,
//! macro-expand, parse into an AST, then evaluate it directly against a
//! host-registered type system. No bytecode, no JIT.
//!
//! ## Architecture
//!
//! - [`ident`] interns every name the tokenizer or registration API sees.
//! - [`types`] holds the type arena, member/method/base layout and the
//!   scalar [`types::NumericKind`] families.
//! - [`symbols`] holds the per-namespace and per-type overload sets,
//!   instance lists and the namespace tree itself.
//! - [`value`] is the runtime representation: a byte buffer classified by
//!   where it lives, plus the bump-allocated stack that backs locals.
//! - [`overload`] ranks candidate overloads against a call site's argument
//!   usages.
//! - [`reader`] tokenizes, macro-expands and parses source into an AST.
//! - [`eval`] walks that AST, threading one [`eval::EnvironmentState`]
//!   through every statement and expression.
//! - [`host`] converts native Rust functions and methods into the
//!   [`value::Trampoline`] calling convention the evaluator invokes.
//! - [`environment`] is the public façade a host actually embeds.

pub mod diagnostics;
pub mod environment;
pub mod eval;
pub mod host;
pub mod ident;
pub mod overload;
pub mod reader;
pub mod symbols;
pub mod types;
pub mod value;

pub use diagnostics::{CompileErrorKind, Diagnostic, PreprocessorErrorKind, RuntimeErrorKind, Stage};
pub use environment::{Environment, EnvironmentConfig};
pub use ident::Identifier;
pub use value::Value;

/// Crate version for runtime queries.
///
/// Uses the git-derived version from `CFLAT_VERSION` environment variable
/// when available, falling back to the crate's own `Cargo.toml` version.
pub const VERSION: &str = match option_env!("CFLAT_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};
