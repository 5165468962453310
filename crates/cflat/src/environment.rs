// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The public façade a host actually embeds.
//!
//! Grounded on the teacher's `repl::Repl` (`repl/mod.rs`), which owns one
//! `Vm` and exposes `load`/`step`/`print_value` as its public surface; here
//! `Environment` owns one [`EnvironmentState`] the same way and exposes
//! `load`/`call`/variable access instead of a bytecode stepper.

use crate::diagnostics::{CompileErrorKind, Diagnostic, Stage};
use crate::eval::{self, CallFrame, EnvironmentState, EvalContext, ExecutionHook};
use crate::ident::IdentifierTable;
use crate::overload;
use crate::reader::parser::TypeResolver;
use crate::reader::tokenizer::{Token, TokenKind};
use crate::reader;
use crate::symbols::{Function, Instance, InstanceKind, NamespaceArena, NamespaceId, TypeAlias};
use crate::types::{BuiltinTypes, NumericKind, Type, TypeArena, TypeCategory, TypeId, TypeUsage};
use crate::value::{EnvironmentStack, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// Tunables that bound host-controllable resource usage. Does not add
/// language features; only guards against runaway scripts.
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    /// Initial byte capacity of the local-variable bump allocator.
    pub stack_capacity: usize,
    /// Recursion guard: a script call nesting deeper than this reports
    /// [`crate::diagnostics::RuntimeErrorKind::CallStackOverflow`] instead of
    /// overflowing the host's native stack.
    pub max_call_depth: usize,
    /// Whether the execution hook (see [`Environment::set_execution_hook`])
    /// also fires for statements executed inside a host-registered
    /// function's body, not just script-authored ones.
    pub hook_inside_library_calls: bool,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self { stack_capacity: 64 * 1024, max_call_depth: 256, hook_inside_library_calls: false }
    }
}

struct TypeNameResolver<'a> {
    identifiers: &'a IdentifierTable,
    namespaces: &'a NamespaceArena,
}

impl TypeResolver for TypeNameResolver<'_> {
    fn resolve_type(&self, name: &str) -> Option<TypeId> {
        let identifier = self.identifiers.intern(name);
        let global = self.namespaces.get(self.namespaces.global());
        global.types.get(&identifier).or_else(|| global.types.get_alias(&identifier).map(|alias| alias.usage.type_id))
    }
}

/// Single-pass scan over the raw token stream for global-scope
/// `struct`/`class`/`enum`/`typedef`/`using`-alias headers, run between
/// tokenizing and parsing so a declaration used earlier in a script than it
/// is later fully declared still resolves -- the parser only ever consults
/// already-registered types, and `Environment::load` parses the whole
/// program before executing any of it.
///
/// Only the global namespace is scanned; a declaration nested inside a
/// script-authored `namespace { ... }` block is invisible to this pass and
/// must appear before its first use within that block, same as function
/// declarations already require.
fn prescan_declarations(tokens: &[Token<'_>], state: &mut EnvironmentState) {
    let global = state.namespaces.global();
    let mut i = 0;
    while i < tokens.len() {
        let text = tokens[i].text;
        if text == "struct" || text == "class" {
            if let Some(name_tok) = tokens.get(i + 1) {
                if name_tok.kind == TokenKind::Identifier {
                    register_prescanned_stub(state, global, name_tok.text, TypeCategory::StructOrClass);
                }
            }
        } else if text == "enum" {
            let mut j = i + 1;
            let is_class = tokens.get(j).is_some_and(|t| t.text == "class");
            if is_class {
                j += 1;
            }
            if let Some(name_tok) = tokens.get(j) {
                if name_tok.kind == TokenKind::Identifier {
                    let category = if is_class { TypeCategory::EnumClass } else { TypeCategory::Enum };
                    register_prescanned_stub(state, global, name_tok.text, category);
                }
            }
        } else if text == "typedef" {
            let mut end = i + 1;
            while end < tokens.len() && tokens[end].text != ";" {
                end += 1;
            }
            if end > i + 1 && end < tokens.len() {
                let base_name = tokens[i + 1].text;
                let alias_name = tokens[end - 1].text;
                register_prescanned_alias(state, global, base_name, alias_name);
            }
            i = end;
        } else if text == "using" && tokens.get(i + 1).is_some_and(|t| t.text != "namespace") {
            if let (Some(name_tok), Some(eq_tok), Some(base_tok)) = (tokens.get(i + 1), tokens.get(i + 2), tokens.get(i + 3)) {
                if eq_tok.text == "=" {
                    register_prescanned_alias(state, global, base_tok.text, name_tok.text);
                }
            }
        }
        i += 1;
    }
}

/// Registers a placeholder `Type` for a forward-referenced struct/class/enum
/// header, unless one is already registered (a second pass over the same
/// tokens, or a host-registered type of the same name). `execute_struct_decl`
/// and `execute_enum_decl` look this stub up and finish it in place rather
/// than inserting a second `Type`.
fn register_prescanned_stub(state: &mut EnvironmentState, global: NamespaceId, name: &str, category: TypeCategory) {
    let identifier = state.identifiers.intern(name);
    if state.namespaces.get(global).types.get(&identifier).is_some() {
        return;
    }
    let id = state.types.insert(|id| {
        let mut ty = Type::new(id, identifier.clone(), category, 1, 1);
        if category != TypeCategory::StructOrClass {
            ty = ty.with_numeric_kind(NumericKind::SignedInteger);
        }
        ty
    });
    state.namespaces.get_mut(global).types.register(&identifier, id);
}

/// Registers a `typedef`/`using`-alias header found by the prescan.
/// `base_name` must already resolve (a built-in, or a struct/enum stub the
/// same pass registered earlier in the scan); an alias to a type declared
/// later in the same script is not supported, matching the forward-reference
/// limit script-defined functions already have.
fn register_prescanned_alias(state: &mut EnvironmentState, global: NamespaceId, base_name: &str, alias_name: &str) {
    let base_identifier = state.identifiers.intern(base_name);
    let Some(base_id) = state.namespaces.get(global).types.get(&base_identifier) else { return };
    let alias_identifier = state.identifiers.intern(alias_name);
    state.namespaces.get_mut(global).types.register_alias(TypeAlias { identifier: alias_identifier, usage: TypeUsage::of(base_id) });
}

/// Runs the preprocess/tokenize/prescan/parse pipeline, the same stages
/// `reader::compile` runs, but with the prescan step spliced in between
/// tokenizing and parsing (which needs `&mut EnvironmentState`, so this
/// cannot just delegate to `reader::compile`).
fn compile_with_prescan(state: &mut EnvironmentState, program_name: &str, source: &str) -> Result<Vec<reader::Stmt>, Diagnostic> {
    let mut preprocessor = reader::Preprocessor::new();
    let preprocessed =
        preprocessor.process(source).map_err(|err| Diagnostic::new(Stage::Preprocessor, program_name, err.line, err.kind.message()))?;

    let tokens =
        reader::Tokenizer::new(&preprocessed).tokenize().map_err(|err| Diagnostic::new(Stage::Compile, program_name, err.line, err.message))?;

    prescan_declarations(&tokens, state);

    let resolver = TypeNameResolver { identifiers: &state.identifiers, namespaces: &state.namespaces };
    let mut parser = reader::Parser::new(tokens, &state.identifiers, &resolver);
    parser.parse_program().map_err(|err| Diagnostic::new(Stage::Compile, program_name, err.line, err.message))
}

/// An embeddable Cflat engine instance.
///
/// Cheaply cloneable (`Rc<RefCell<_>>` handle) and intentionally `!Sync`:
/// the host must serialize calls into a given environment rather than share
/// one across threads, the same single-threaded contract the teacher's
/// `Repl` carries by holding its `Vm` behind a plain owned field.
#[derive(Clone)]
pub struct Environment {
    state: Rc<RefCell<EnvironmentState>>,
}

impl Environment {
    #[must_use]
    pub fn new(program_name: impl Into<String>, config: EnvironmentConfig) -> Self {
        let identifiers = IdentifierTable::new();
        let mut types = TypeArena::new();
        let builtins = BuiltinTypes::bootstrap(&mut types, &identifiers);
        let namespaces = NamespaceArena::new(&identifiers);
        let state = EnvironmentState {
            identifiers,
            types,
            builtins,
            namespaces,
            stack: EnvironmentStack::with_capacity(config.stack_capacity),
            call_stack: Vec::new(),
            error: None,
            execution_hook: None,
            program_name: program_name.into(),
            max_call_depth: config.max_call_depth,
            hook_inside_library_calls: config.hook_inside_library_calls,
            loaded_programs: Vec::new(),
        };
        Self { state: Rc::new(RefCell::new(state)) }
    }

    /// Registers a host type into the global namespace. Members, methods and
    /// bases are attached to the returned handle by mutating the type arena
    /// directly (`environment.types_mut().get_mut(id)`), matching the
    /// teacher's "register then mutate in place" registration style.
    pub fn register_type(&self, name: &str, size: u32, alignment: u32) -> TypeId {
        let mut state = self.state.borrow_mut();
        let identifier = state.identifiers.intern(name);
        let global = state.namespaces.global();
        let id = state.types.insert(|id| crate::types::Type::new(id, identifier.clone(), crate::types::TypeCategory::StructOrClass, size, alignment));
        state.namespaces.get_mut(global).types.register(&identifier, id);
        tracing::debug!(name, ?id, "registered host type");
        id
    }

    /// Registers a free function's trampoline into the global namespace.
    pub fn register_function(&self, name: &str, parameters: Vec<TypeUsage>, return_usage: TypeUsage, trampoline: crate::value::Trampoline) {
        let mut state = self.state.borrow_mut();
        let identifier = state.identifiers.intern(name);
        let global = state.namespaces.global();
        state.namespaces.get_mut(global).functions.register(crate::symbols::Function {
            identifier,
            return_usage,
            parameters,
            variadic: false,
            trampoline: Some(trampoline),
        });
    }

    /// Adds a data member at a fixed byte offset to an already-registered
    /// host type.
    pub fn add_member(&self, owner: TypeId, name: &str, usage: TypeUsage, offset: u32) {
        let mut state = self.state.borrow_mut();
        let identifier = state.identifiers.intern(name);
        state.types.get_mut(owner).members.push(crate::types::Member { identifier, usage, offset });
    }

    /// Declares `derived` as inheriting from `base` at `offset` bytes into
    /// `derived`'s layout.
    pub fn add_base(&self, derived: TypeId, base: TypeId, offset: u32) {
        let mut state = self.state.borrow_mut();
        state.types.get_mut(derived).bases.push(crate::types::BaseType { type_id: base, offset });
    }

    /// Registers a method onto an already-registered host type.
    pub fn register_method(&self, owner: TypeId, name: &str, parameters: Vec<TypeUsage>, return_usage: TypeUsage, trampoline: crate::value::Trampoline) {
        let mut state = self.state.borrow_mut();
        let identifier = state.identifiers.intern(name);
        state.types.get_mut(owner).methods.push(crate::types::Method {
            identifier,
            return_usage,
            parameters,
            flags: crate::types::MethodFlags::empty(),
            trampoline: Some(trampoline),
        });
    }

    /// Registers a global instance (e.g. a host object the script can name
    /// directly) into the global namespace.
    pub fn register_instance(&self, name: &str, value: Value) {
        let mut state = self.state.borrow_mut();
        let identifier = state.identifiers.intern(name);
        let global = state.namespaces.global();
        state.namespaces.get_mut(global).instances.push(Instance { identifier, value, scope_level: 0, kind: InstanceKind::Static });
    }

    /// Compiles and executes `source`, reporting the first diagnostic (if
    /// any) through [`Environment::error_message`] as well as returning it.
    pub fn load(&self, source: &str) -> Result<(), Diagnostic> {
        self.load_impl(source, true)
    }

    /// `record` controls whether `source` is appended to `loaded_programs`
    /// on success; [`Self::reset_statics`] passes `false` while replaying
    /// already-recorded sources so the list does not grow on every reset.
    fn load_impl(&self, source: &str, record: bool) -> Result<(), Diagnostic> {
        tracing::debug!(program = %self.program_name(), "loading script");
        let program = {
            let mut state = self.state.borrow_mut();
            let program_name = state.program_name.clone();
            compile_with_prescan(&mut state, &program_name, source)
        };
        let program = match program {
            Ok(program) => program,
            Err(diagnostic) => {
                self.state.borrow_mut().report(diagnostic.clone());
                return Err(diagnostic);
            }
        };

        let mut state = self.state.borrow_mut();
        let mut ctx = EvalContext::new(&mut state);
        let result = eval::execute_program(&mut ctx, &program);
        if result.is_ok() {
            // Top-level `VarDecl`s land in the context's local instance
            // list, which would otherwise vanish with `ctx` when `load`
            // returns. Promote them into the global namespace so
            // `get_variable`/`set_variable` and subsequent `load` calls can
            // see them, the way the original's top-level statements mutate
            // the environment's persistent global scope.
            let mut released = ctx.locals.release(0);
            released.reverse();
            let global = ctx.current_namespace();
            for instance in released {
                ctx.state.namespaces.get_mut(global).instances.push(instance);
            }
            if record {
                ctx.state.loaded_programs.push(source.to_owned());
            }
        }
        match &result {
            Ok(()) => tracing::debug!(program = %state.program_name, "script loaded"),
            Err(diagnostic) => state.report(diagnostic.clone()),
        }
        result
    }

    /// Loads and executes the file at `path`, using its file name as the
    /// diagnostics program name.
    pub fn load_from_file(&self, path: &std::path::Path) -> Result<(), Diagnostic> {
        let program_name = path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_else(|| path.to_string_lossy().into_owned());
        self.state.borrow_mut().program_name = program_name;
        let source = std::fs::read_to_string(path).map_err(|err| {
            Diagnostic::new(Stage::Preprocessor, self.program_name(), 0, format!("could not read '{}': {err}", path.display()))
        })?;
        self.load(&source)
    }

    /// Evaluates a single expression in global scope, e.g. for a REPL's
    /// immediate-mode input.
    pub fn evaluate_expression(&self, source: &str) -> Result<Value, Diagnostic> {
        let wrapped = format!("{source};");
        let program = {
            let state = self.state.borrow();
            let resolver = TypeNameResolver { identifiers: &state.identifiers, namespaces: &state.namespaces };
            reader::compile(&state.program_name, &wrapped, &state.identifiers, &resolver)?
        };
        let Some(crate::reader::ast::Stmt { kind: crate::reader::ast::StmtKind::ExprStmt(expr), .. }) = program.into_iter().next() else {
            return Err(Diagnostic::new(Stage::Compile, self.program_name(), 1, CompileErrorKind::Expected { what: "an expression".to_owned() }.message()));
        };
        let mut state = self.state.borrow_mut();
        let mut ctx = EvalContext::new(&mut state);
        eval::evaluate_expression(&mut ctx, &expr)
    }

    /// Calls a global function by name with already-constructed argument
    /// [`Value`]s, resolving overloads the same way a script-authored call
    /// expression would.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, Diagnostic> {
        tracing::debug!(name, "calling function");
        let mut state = self.state.borrow_mut();
        let identifier = state.identifiers.intern(name);
        let global = state.namespaces.global();
        let arg_usages: Vec<TypeUsage> = args.iter().map(|v| v.usage).collect();
        let overloads = state.namespaces.get(global).functions.overloads(&identifier);
        let resolved = overload::resolve(overloads, &arg_usages, &state.types).map(|f| (f.trampoline.clone(), f.return_usage));
        let Some((trampoline, return_usage)) = resolved else {
            let diagnostic = Diagnostic::new(Stage::Compile, state.program_name.clone(), 0, CompileErrorKind::UndefinedFunction { name: name.to_owned() }.message());
            state.report(diagnostic.clone());
            return Err(diagnostic);
        };
        let Some(trampoline) = trampoline else {
            let diagnostic = Diagnostic::new(Stage::Compile, state.program_name.clone(), 0, CompileErrorKind::NoSuitableOverload { name: name.to_owned() }.message());
            state.report(diagnostic.clone());
            return Err(diagnostic);
        };

        let mut out = Value::from_heap_bytes(return_usage, vec![0; return_usage.size(&state.types) as usize]);
        let mut ctx = EvalContext::new(&mut state);
        match trampoline(args, &mut out, &mut ctx) {
            Ok(()) => Ok(out),
            Err(kind) => {
                let diagnostic = Diagnostic::new(Stage::Runtime, ctx.state.program_name.clone(), 0, kind.message());
                ctx.state.report(diagnostic.clone());
                Err(diagnostic)
            }
        }
    }

    /// Reads a global variable's current value.
    #[must_use]
    pub fn get_variable(&self, name: &str) -> Option<Value> {
        let state = self.state.borrow();
        let identifier = state.identifiers.intern(name);
        let global = state.namespaces.global();
        let instance = state.namespaces.get(global).instances.find(&identifier)?;
        let bytes = instance.value.as_bytes()?.to_vec();
        Some(Value::from_heap_bytes(instance.value.usage, bytes))
    }

    /// Overwrites a global variable's bytes from `value`.
    pub fn set_variable(&self, name: &str, value: &Value) -> Result<(), Diagnostic> {
        let mut state = self.state.borrow_mut();
        let identifier = state.identifiers.intern(name);
        let global = state.namespaces.global();
        let program_name = state.program_name.clone();
        let Some(instance) = state.namespaces.get_mut(global).instances.find_mut(&identifier) else {
            return Err(Diagnostic::new(Stage::Compile, program_name, 0, CompileErrorKind::UndefinedVariable { name: name.to_owned() }.message()));
        };
        instance.value.assign_from(value).map_err(|kind| Diagnostic::new(Stage::Runtime, program_name, 0, kind.message()))
    }

    /// The first sticky diagnostic reported since the last [`Self::reset`],
    /// rendered as a display string (`[<Stage> Error] '<program>' -- Line
    /// <n>: <message>`).
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.state.borrow().error.as_ref().map(ToString::to_string)
    }

    /// Clears the sticky error slot, call stack and every non-static
    /// top-level instance, so a host REPL can recover from a bad line
    /// without re-registering its host bindings.
    pub fn reset(&self) {
        let mut state = self.state.borrow_mut();
        state.error = None;
        state.call_stack.clear();
    }

    /// Installs a callback fired once per executed statement with the
    /// current call stack, or clears it when `hook` is `None`.
    pub fn set_execution_hook(&self, hook: Option<ExecutionHook>) {
        self.state.borrow_mut().execution_hook = hook;
    }

    /// Looks up a global type by name.
    #[must_use]
    pub fn get_type(&self, name: &str) -> Option<TypeId> {
        let state = self.state.borrow();
        let identifier = state.identifiers.intern(name);
        let global = state.namespaces.global();
        state.namespaces.get(global).types.get(&identifier)
    }

    /// Every global overload registered under `name`, host-registered and
    /// script-defined alike.
    #[must_use]
    pub fn get_functions(&self, name: &str) -> Vec<Function> {
        let state = self.state.borrow();
        let identifier = state.identifiers.intern(name);
        let global = state.namespaces.global();
        state.namespaces.get(global).functions.overloads(&identifier).to_vec()
    }

    /// The first global overload registered under `name`, if any.
    #[must_use]
    pub fn get_function(&self, name: &str) -> Option<Function> {
        self.get_functions(name).into_iter().next()
    }

    /// Resolves a `::`-qualified namespace path from the global namespace,
    /// without creating missing segments.
    #[must_use]
    pub fn get_namespace(&self, qualified_name: &str) -> Option<NamespaceId> {
        let state = self.state.borrow();
        let global = state.namespaces.global();
        state.namespaces.find_namespace(global, qualified_name, &state.identifiers)
    }

    /// Calls a `void`-returning global function, discarding its result.
    pub fn void_function_call(&self, name: &str) -> Result<(), Diagnostic> {
        self.call(name, &[]).map(|_| ())
    }

    /// Reports a runtime error the same sticky, first-error-wins way a
    /// failing trampoline's [`crate::diagnostics::RuntimeErrorKind`] would,
    /// for a host binding that wants to raise a script-visible error from
    /// outside any trampoline call.
    pub fn throw_custom_runtime_error(&self, message: &str) {
        let mut state = self.state.borrow_mut();
        let program_name = state.program_name.clone();
        let diagnostic = Diagnostic::new(Stage::Runtime, program_name, 0, message.to_owned());
        state.report(diagnostic);
    }

    /// Registers a host `(param, arg)` type pair that should rank as a
    /// perfect overload match despite being distinct types, e.g. a "string
    /// view" parameter accepting a "string" argument with no narrowing.
    pub fn register_perfect_match_pair(&self, param: TypeId, arg: TypeId) {
        self.state.borrow_mut().types.register_perfect_match_pair(param, arg);
    }

    /// Registers an already-built template instantiation (e.g. `Vector<int>`)
    /// under its mangled name, so scripts can name it directly
    /// (`Vector<int> v;`). The template itself is never declared by a
    /// script; the host registers one instantiation per argument list it
    /// wants to support, the same way [`Self::register_type`] registers an
    /// ordinary host type.
    pub fn register_template_type(&self, base_name: &str, args: &[TypeUsage], size: u32, alignment: u32) -> TypeId {
        let mut state = self.state.borrow_mut();
        let mangled = crate::types::mangle_template_name(base_name, args, &state.types);
        let identifier = state.identifiers.intern(&mangled);
        let global = state.namespaces.global();
        let id = state.types.insert(|id| {
            let mut ty = Type::new(id, identifier.clone(), TypeCategory::StructOrClass, size, alignment);
            ty.template_args = args.to_vec();
            ty
        });
        state.namespaces.get_mut(global).types.register(&identifier, id);
        tracing::debug!(name = %mangled, ?id, "registered template instantiation");
        id
    }

    /// Clears every script-seeded global (anything not registered as
    /// `Static` through [`Self::register_instance`]) and replays every
    /// previously loaded source string to rebuild them, the way a host REPL
    /// "reset" command rebuilds a fresh top-level scope without having to
    /// re-register its own host bindings.
    pub fn reset_statics(&self) -> Result<(), Diagnostic> {
        {
            let mut state = self.state.borrow_mut();
            state.error = None;
            state.call_stack.clear();
            let global = state.namespaces.global();
            state.namespaces.get_mut(global).instances.retain(|instance| instance.kind == InstanceKind::Static);
        }
        let sources = self.state.borrow().loaded_programs.clone();
        for source in sources {
            self.load_impl(&source, false)?;
        }
        Ok(())
    }

    /// Renders a [`Value`] of a built-in scalar type as a human-readable
    /// string, the way a REPL echoes an expression's result. Non-scalar
    /// values render as `<N bytes>`.
    #[must_use]
    pub fn format_value(&self, value: &Value) -> String {
        let state = self.state.borrow();
        if value.usage.is_pointer() {
            return match value.as_i64() {
                Some(0) | None => "nullptr".to_owned(),
                Some(address) => format!("0x{address:x}"),
            };
        }
        match state.types.get(value.usage.type_id).numeric_kind {
            Some(crate::types::NumericKind::Bool) => value.as_bool().map_or_else(|| "?".to_owned(), |b| b.to_string()),
            Some(crate::types::NumericKind::FloatingPoint) => value.as_f64().map_or_else(|| "?".to_owned(), |f| f.to_string()),
            Some(_) => value.as_i64().map_or_else(|| "?".to_owned(), |i| i.to_string()),
            None => format!("<{} bytes>", value.as_bytes().map_or(0, <[u8]>::len)),
        }
    }

    #[must_use]
    pub fn program_name(&self) -> String {
        self.state.borrow().program_name.clone()
    }

    #[must_use]
    pub fn builtins(&self) -> BuiltinTypes {
        self.state.borrow().builtins
    }
}

/// Snapshot of a running call stack, handed to an [`ExecutionHook`]. Owned
/// rather than borrowed so a host can stash it past the hook's call.
#[must_use]
pub fn snapshot_call_stack(frames: &[CallFrame]) -> Vec<CallFrame> {
    frames.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_a_trivial_script_and_calls_its_function() {
        let env = Environment::new("test.cpp", EnvironmentConfig::default());
        env.load("int add(int a, int b) { return a + b; }").expect("load");
        let int = TypeUsage::of(env.builtins().int);
        let mut a = Value::from_heap_bytes(int, vec![0; 4]);
        a.set_from_i64(2);
        let mut b = Value::from_heap_bytes(int, vec![0; 4]);
        b.set_from_i64(3);
        let result = env.call("add", &[a, b]).expect("call");
        assert_eq!(result.as_i64(), Some(5));
    }

    #[test]
    fn undefined_function_reports_a_compile_diagnostic() {
        let env = Environment::new("test.cpp", EnvironmentConfig::default());
        let err = env.call("missing", &[]).unwrap_err();
        assert!(err.to_string().contains("undefined function"));
        assert_eq!(env.error_message().as_deref(), Some(err.to_string().as_str()));
    }
}
