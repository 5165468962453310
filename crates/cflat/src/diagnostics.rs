//! Diagnostics: one sticky error message per evaluation, rendered through a
//! fixed message-template table the way `Cflat.cpp`'s
//! `kPreprocessorErrorStrings` / `kCompileErrorStrings` / `kRuntimeErrorStrings`
//! tables do. The Rust rendition propagates the first error with `?` instead
//! of polling a flag after every statement, but the externally observable
//! format and "first error wins" behavior match.

use std::fmt;

/// Which stage produced a diagnostic. Used only to render the `[Stage Error]`
/// prefix; it carries no other behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Preprocessor,
    Compile,
    Runtime,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Preprocessor => "Preprocessor",
            Stage::Compile => "Compile",
            Stage::Runtime => "Runtime",
        };
        write!(f, "{name}")
    }
}

/// A single reported error: `[<Stage> Error] '<program>' -- Line <n>: <message>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub stage: Stage,
    pub program: String,
    pub line: u32,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn new(stage: Stage, program: impl Into<String>, line: u32, message: impl Into<String>) -> Self {
        Self { stage, program: program.into(), line, message: message.into() }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} Error] '{}' -- Line {}: {}", self.stage, self.program, self.line, self.message)
    }
}

impl std::error::Error for Diagnostic {}

/// Preprocessor-stage error kinds, one `message_template` per variant,
/// mirroring `kPreprocessorErrorStrings`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreprocessorErrorKind {
    UnbalancedDirective,
    UnexpectedMacroArgumentCount { name: String, expected: usize, got: usize },
    UndefinedMacro { name: String },
    InvalidDirective { text: String },
}

impl PreprocessorErrorKind {
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::UnbalancedDirective => "unbalanced preprocessor directive".to_owned(),
            Self::UnexpectedMacroArgumentCount { name, expected, got } => {
                format!("macro '{name}' expects {expected} argument(s), got {got}")
            }
            Self::UndefinedMacro { name } => format!("macro '{name}' requires arguments but none were given"),
            Self::InvalidDirective { text } => format!("invalid preprocessor directive '{text}'"),
        }
    }
}

/// Compile (tokenize + parse) stage error kinds, mirroring `kCompileErrorStrings`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileErrorKind {
    UnexpectedSymbol { symbol: String },
    Expected { what: String },
    UndefinedType { name: String },
    UndefinedVariable { name: String },
    UndefinedFunction { name: String },
    VariableRedefinition { name: String },
    NoDefaultConstructor { type_name: String },
    InvalidMemberAccess { member: String, type_name: String },
    InvalidNumericValue { text: String },
    InvalidUnaryOperator { operator: String },
    InvalidCast { from: String, to: String },
    MissingMember { member: String },
    NoSuitableOverload { name: String },
    StatementExpected,
}

impl CompileErrorKind {
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::UnexpectedSymbol { symbol } => format!("unexpected symbol '{symbol}'"),
            Self::Expected { what } => format!("expected {what}"),
            Self::UndefinedType { name } => format!("undefined type '{name}'"),
            Self::UndefinedVariable { name } => format!("undefined variable '{name}'"),
            Self::UndefinedFunction { name } => format!("undefined function '{name}'"),
            Self::VariableRedefinition { name } => format!("variable redefinition '{name}'"),
            Self::NoDefaultConstructor { type_name } => format!("no default constructor for '{type_name}'"),
            Self::InvalidMemberAccess { member, type_name } => {
                format!("'{type_name}' has no member named '{member}'")
            }
            Self::InvalidNumericValue { text } => format!("invalid numeric value '{text}'"),
            Self::InvalidUnaryOperator { operator } => format!("invalid unary operator '{operator}'"),
            Self::InvalidCast { from, to } => format!("invalid cast from '{from}' to '{to}'"),
            Self::MissingMember { member } => format!("missing member '{member}'"),
            Self::NoSuitableOverload { name } => format!("no suitable overload found for '{name}'"),
            Self::StatementExpected => "statement expected".to_owned(),
        }
    }
}

/// Runtime-stage error kinds, mirroring `kRuntimeErrorStrings`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    NullPointerAccess { member: String },
    InvalidArrayIndex { index: i64 },
    DivisionByZero,
    MissingOverload { name: String },
    ZeroInitializedObject,
    UnbalancedStack,
    CallStackOverflow,
    Custom(String),
}

impl RuntimeErrorKind {
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::NullPointerAccess { member } => format!("null pointer access ('{member}')"),
            Self::InvalidArrayIndex { index } => format!("invalid array index ({index})"),
            Self::DivisionByZero => "division by zero".to_owned(),
            Self::MissingOverload { name } => format!("missing overload for '{name}'"),
            Self::ZeroInitializedObject => "zero-initialized object".to_owned(),
            Self::UnbalancedStack => "unbalanced stack".to_owned(),
            Self::CallStackOverflow => "call stack overflow".to_owned(),
            Self::Custom(message) => message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_the_fixed_template() {
        let diag = Diagnostic::new(Stage::Runtime, "script.cpp", 12, RuntimeErrorKind::DivisionByZero.message());
        assert_eq!(diag.to_string(), "[Runtime Error] 'script.cpp' -- Line 12: division by zero");
    }
}
