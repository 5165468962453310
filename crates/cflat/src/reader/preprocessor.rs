//! Preprocessor: strips comments, consumes directives, and expands
//! `#define` macros (object-like and function-like, including `#` stringize
//! and `##` token-paste) before the tokenizer ever runs.
//!
//! The teacher has no macro layer of its own; this module is grounded on
//! `original_source/Cflat.cpp`'s `preprocess()` for the directive/macro
//! semantics (conditional compilation directives are consumed and
//! discarded rather than evaluated — spec.md scopes out full conditional
//! compilation), written in the teacher lexer's scanning style
//! (`Peekable<Chars>`, explicit byte-offset and line tracking).

use crate::diagnostics::PreprocessorErrorKind;
use std::collections::HashMap;
use std::iter::Peekable;
use std::str::CharIndices;

#[derive(Debug, Clone, PartialEq, Eq)]
enum MacroChunk {
    Literal(String),
    Param(usize),
    StringizeParam(usize),
}

#[derive(Debug, Clone)]
struct Macro {
    params: Vec<String>,
    variadic: bool,
    is_function_like: bool,
    body: Vec<MacroChunk>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessError {
    pub line: u32,
    pub kind: PreprocessorErrorKind,
}

#[derive(Default)]
pub struct Preprocessor {
    macros: HashMap<String, Macro>,
}

impl Preprocessor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the full pass: comment stripping, directive consumption, and
    /// macro expansion, returning source text ready for the tokenizer.
    pub fn process(&mut self, source: &str) -> Result<String, PreprocessError> {
        let stripped = strip_comments(source);
        let mut output = String::with_capacity(stripped.len());
        let mut line = 1u32;
        let mut chars = stripped.char_indices().peekable();

        while let Some(&(start, c)) = chars.peek() {
            if c == '\n' {
                line += 1;
                output.push('\n');
                chars.next();
                continue;
            }
            if c == '#' && at_line_start(&stripped, start) {
                let directive_line = read_line(&mut chars, &stripped, start);
                self.handle_directive(directive_line, line)?;
                continue;
            }
            if c == '"' || c == '\'' {
                // Copy a string/character literal through verbatim so a
                // macro name that happens to appear inside one, e.g. the
                // "SIZE" in `const char* s = "SIZE";`, is never mistaken
                // for an identifier to expand.
                let quote = c;
                output.push(c);
                chars.next();
                let mut escaped = false;
                while let Some(&(_, ch)) = chars.peek() {
                    output.push(ch);
                    chars.next();
                    if ch == '\n' {
                        line += 1;
                    }
                    if escaped {
                        escaped = false;
                    } else if ch == '\\' {
                        escaped = true;
                    } else if ch == quote {
                        break;
                    }
                }
                continue;
            }
            if is_identifier_start(c) {
                let word_start = start;
                let mut word_end = start;
                while let Some(&(idx, ch)) = chars.peek() {
                    if is_identifier_continue(ch) {
                        word_end = idx + ch.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let word = &stripped[word_start..word_end];
                if let Some(expansion) = self.try_expand(word, &stripped, &mut chars, line)? {
                    output.push_str(&expansion);
                } else {
                    output.push_str(word);
                }
                continue;
            }
            output.push(c);
            chars.next();
        }
        Ok(output)
    }

    fn handle_directive(&mut self, text: &str, line: u32) -> Result<(), PreprocessError> {
        let trimmed = text.trim_start_matches('#').trim();
        if let Some(rest) = trimmed.strip_prefix("define") {
            self.handle_define(rest.trim(), line)?;
        }
        // #include, #if/#ifdef/#ifndef/#endif, #pragma are consumed and
        // otherwise ignored: no file system, no conditional compilation,
        // per spec.md's Non-goals on full preprocessor conformance.
        Ok(())
    }

    fn handle_define(&mut self, rest: &str, line: u32) -> Result<(), PreprocessError> {
        let name_end = rest.find(|c: char| !is_identifier_continue(c)).unwrap_or(rest.len());
        if name_end == 0 {
            return Err(PreprocessError { line, kind: PreprocessorErrorKind::InvalidDirective { text: rest.to_owned() } });
        }
        let name = rest[..name_end].to_owned();
        let after_name = &rest[name_end..];

        if let Some(paren_body) = after_name.strip_prefix('(') {
            let close = paren_body.find(')').ok_or(PreprocessError {
                line,
                kind: PreprocessorErrorKind::UnbalancedDirective,
            })?;
            let params_text = &paren_body[..close];
            let variadic = params_text.trim_end().ends_with("...");
            let params: Vec<String> = params_text
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty() && *s != "...")
                .map(str::to_owned)
                .collect();
            let body_text = paren_body[close + 1..].trim();
            let body = parse_macro_body(body_text, &params);
            self.macros.insert(name, Macro { params, variadic, is_function_like: true, body });
        } else {
            let body_text = after_name.trim();
            let body = vec![MacroChunk::Literal(body_text.to_owned())];
            self.macros.insert(name, Macro { params: Vec::new(), variadic: false, is_function_like: false, body });
        }
        Ok(())
    }

    fn try_expand(
        &self,
        name: &str,
        source: &str,
        chars: &mut Peekable<CharIndices<'_>>,
        line: u32,
    ) -> Result<Option<String>, PreprocessError> {
        let Some(macro_def) = self.macros.get(name) else { return Ok(None) };

        if !macro_def.is_function_like {
            return Ok(Some(render(&macro_def.body, &[])));
        }

        // Function-like macros only expand when immediately followed by `(`.
        let Some(&(paren_idx, '(')) = chars.peek() else { return Ok(None) };
        let mut depth = 0i32;
        let args_start = paren_idx + 1;
        let mut args_end = args_start;
        for (idx, c) in source[args_start..].char_indices() {
            match c {
                '(' => depth += 1,
                ')' if depth == 0 => {
                    args_end = args_start + idx;
                    break;
                }
                ')' => depth -= 1,
                _ => {}
            }
        }
        let args_text = &source[args_start..args_end];
        let args: Vec<String> = split_top_level_commas(args_text).into_iter().map(|s| s.trim().to_owned()).collect();

        let expected = macro_def.params.len();
        if !macro_def.variadic && args.len() != expected {
            return Err(PreprocessError {
                line,
                kind: PreprocessorErrorKind::UnexpectedMacroArgumentCount { name: name.to_owned(), expected, got: args.len() },
            });
        }

        // Consume the argument list (including the closing paren) from the
        // outer character stream.
        let consumed_end = args_end + 1;
        while chars.peek().is_some_and(|&(idx, _)| idx < consumed_end) {
            chars.next();
        }

        Ok(Some(render(&macro_def.body, &args)))
    }
}

fn render(body: &[MacroChunk], args: &[String]) -> String {
    let mut out = String::new();
    for chunk in body {
        match chunk {
            MacroChunk::Literal(text) => out.push_str(text),
            MacroChunk::Param(index) => out.push_str(args.get(*index).map_or("", String::as_str)),
            MacroChunk::StringizeParam(index) => {
                out.push('"');
                out.push_str(args.get(*index).map_or("", String::as_str));
                out.push('"');
            }
        }
    }
    out
}

fn parse_macro_body(body: &str, params: &[String]) -> Vec<MacroChunk> {
    let mut chunks = Vec::new();
    let mut literal = String::new();
    let mut chars = body.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c == '#' {
            chars.next();
            if chars.peek().is_some_and(|&(_, ch)| ch == '#') {
                // token paste: drop the marker, let adjacent literals/params
                // concatenate naturally in `render`.
                chars.next();
                continue;
            }
            let param_start = chars.peek().map_or(body.len(), |&(idx, _)| idx);
            let mut param_end = param_start;
            while let Some(&(idx, ch)) = chars.peek() {
                if is_identifier_continue(ch) {
                    param_end = idx + ch.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let name = &body[param_start..param_end];
            if let Some(index) = params.iter().position(|p| p == name) {
                if !literal.is_empty() {
                    chunks.push(MacroChunk::Literal(std::mem::take(&mut literal)));
                }
                chunks.push(MacroChunk::StringizeParam(index));
            }
            continue;
        }
        if is_identifier_start(c) {
            let mut word_end = start;
            while let Some(&(idx, ch)) = chars.peek() {
                if is_identifier_continue(ch) {
                    word_end = idx + ch.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let word = &body[start..word_end];
            if let Some(index) = params.iter().position(|p| p == word) {
                if !literal.is_empty() {
                    chunks.push(MacroChunk::Literal(std::mem::take(&mut literal)));
                }
                chunks.push(MacroChunk::Param(index));
            } else {
                literal.push_str(word);
            }
            continue;
        }
        literal.push(c);
        chars.next();
    }
    if !literal.is_empty() {
        chunks.push(MacroChunk::Literal(literal));
    }
    chunks
}

fn split_top_level_commas(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in text.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts
}

fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.char_indices().peekable();
    while let Some(&(_, c)) = chars.peek() {
        if c == '/' {
            chars.next();
            match chars.peek() {
                Some(&(_, '/')) => {
                    while let Some(&(_, ch)) = chars.peek() {
                        if ch == '\n' {
                            break;
                        }
                        chars.next();
                    }
                }
                Some(&(_, '*')) => {
                    chars.next();
                    let mut prev = '\0';
                    while let Some((_, ch)) = chars.next() {
                        if ch == '\n' {
                            out.push('\n');
                        }
                        if prev == '*' && ch == '/' {
                            break;
                        }
                        prev = ch;
                    }
                }
                _ => out.push('/'),
            }
            continue;
        }
        out.push(c);
        chars.next();
    }
    out
}

fn at_line_start(source: &str, idx: usize) -> bool {
    source[..idx].rfind('\n').map_or(source[..idx].trim().is_empty(), |nl| source[nl + 1..idx].trim().is_empty())
}

fn read_line<'a>(chars: &mut Peekable<CharIndices<'a>>, source: &'a str, start: usize) -> &'a str {
    let mut end = start;
    while let Some(&(idx, c)) = chars.peek() {
        if c == '\n' {
            break;
        }
        end = idx + c.len_utf8();
        chars.next();
    }
    &source[start..end]
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_line_and_block_comments() {
        assert_eq!(strip_comments("int x; // comment\nint y; /* block */ int z;"), "int x; \nint y;  int z;");
    }

    #[test]
    fn expands_object_like_macro() {
        let mut pp = Preprocessor::new();
        let out = pp.process("#define SIZE 10\nint a[SIZE];").unwrap();
        assert_eq!(out.trim(), "int a[10];");
    }

    #[test]
    fn expands_function_like_macro_with_args() {
        let mut pp = Preprocessor::new();
        let out = pp.process("#define MAX(a, b) ((a) > (b) ? (a) : (b))\nint m = MAX(1, 2);").unwrap();
        assert_eq!(out.trim(), "int m = ((1) > (2) ? (1) : (2));");
    }

    #[test]
    fn stringize_wraps_argument_text() {
        let mut pp = Preprocessor::new();
        let out = pp.process("#define STR(x) #x\nauto s = STR(hello);").unwrap();
        assert_eq!(out.trim(), "auto s = \"hello\";");
    }

    #[test]
    fn macro_name_inside_string_literal_is_not_expanded() {
        let mut pp = Preprocessor::new();
        let out = pp.process("#define SIZE 10\nconst char* s = \"SIZE\";\nint a[SIZE];").unwrap();
        assert!(out.contains("\"SIZE\""));
        assert!(out.contains("a[10]"));
    }

    #[test]
    fn mismatched_argument_count_is_rejected() {
        let mut pp = Preprocessor::new();
        let err = pp.process("#define MAX(a, b) (a)\nint m = MAX(1);").unwrap_err();
        assert!(matches!(err.kind, PreprocessorErrorKind::UnexpectedMacroArgumentCount { .. }));
    }
}
