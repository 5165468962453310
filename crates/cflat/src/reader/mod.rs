//! Source-to-AST pipeline: preprocess, tokenize, parse.

pub mod ast;
pub mod parser;
pub mod preprocessor;
pub mod tokenizer;

pub use ast::{Stmt, StmtKind};
pub use parser::{ParseError, Parser, TypeResolver};
pub use preprocessor::{PreprocessError, Preprocessor};
pub use tokenizer::{Token, TokenizeError, Tokenizer};

use crate::diagnostics::{CompileErrorKind, Diagnostic, PreprocessorErrorKind, Stage};
use crate::ident::IdentifierTable;

/// Runs the full pipeline against `source`, reporting the first failure as
/// a fully rendered [`Diagnostic`] in the same `[<Stage> Error] ...` shape
/// every other stage uses.
pub fn compile(
    program_name: &str,
    source: &str,
    table: &IdentifierTable,
    resolver: &dyn TypeResolver,
) -> Result<Vec<Stmt>, Diagnostic> {
    let mut preprocessor = Preprocessor::new();
    let preprocessed = preprocessor.process(source).map_err(|err| {
        Diagnostic::new(Stage::Preprocessor, program_name, err.line, err.kind.message())
    })?;

    let tokens = Tokenizer::new(&preprocessed)
        .tokenize()
        .map_err(|err| Diagnostic::new(Stage::Compile, program_name, err.line, err.message))?;

    let mut parser = Parser::new(tokens, table, resolver);
    parser.parse_program().map_err(|err| Diagnostic::new(Stage::Compile, program_name, err.line, err.message))
}

/// Renders a [`PreprocessorErrorKind`] without going through [`compile`],
/// used by call sites that already hold a kind and just need the message.
#[must_use]
pub fn preprocessor_message(kind: &PreprocessorErrorKind) -> String {
    kind.message()
}

#[must_use]
pub fn compile_error_message(kind: &CompileErrorKind) -> String {
    kind.message()
}
