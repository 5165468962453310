//! Tree-walking evaluator: executes the AST produced by [`crate::reader`]
//! against a [`crate::eval::context::EnvironmentState`].
//!
//! Grounded on the teacher's `Vm::run` (`vm/mod.rs`): a per-node dispatch
//! function, a small enum for "what just happened" (the teacher's
//! `RuntimeError`; here [`JumpSignal`] plays the equivalent role for
//! control flow) and `execute_call`'s dispatch-by-callee-shape pattern —
//! re-purposed from dispatching on a runtime `Value` tag to dispatching on
//! an AST node, and carrying an explicit `this`-pointer argument for method
//! calls instead of a closure environment.

pub mod context;

pub use context::{CallFrame, EnvironmentState, EvalContext, ExecutionHook, JumpSignal};

use crate::diagnostics::{CompileErrorKind, Diagnostic, RuntimeErrorKind, Stage};
use crate::ident::Identifier;
use crate::overload;
use crate::reader::ast::{AssignOp, BinaryOp, CastKind, EnumDecl, Expr, ExprKind, FunctionDecl, Literal, Stmt, StmtKind, StructDecl, UnaryOp};
use crate::symbols::{Function, Instance, InstanceKind, TypeAlias};
use crate::types::{BaseType, Enumerator, Member, Method, MethodFlags, NumericKind, Type, TypeCategory, TypeId, TypeUsage};
use crate::value::Value;
use std::rc::Rc;

fn runtime_error(ctx: &EvalContext, line: u32, kind: RuntimeErrorKind) -> Diagnostic {
    Diagnostic::new(Stage::Runtime, ctx.state.program_name.clone(), line, kind.message())
}

fn compile_error(ctx: &EvalContext, line: u32, kind: CompileErrorKind) -> Diagnostic {
    Diagnostic::new(Stage::Compile, ctx.state.program_name.clone(), line, kind.message())
}

// ---- numeric helpers ----

fn numeric_kind(ctx: &EvalContext, usage: &TypeUsage) -> Option<NumericKind> {
    ctx.state.types.get(usage.type_id).numeric_kind
}

fn to_f64(ctx: &EvalContext, value: &Value) -> f64 {
    match numeric_kind(ctx, &value.usage) {
        Some(NumericKind::FloatingPoint) => value.as_f64().unwrap_or(0.0),
        Some(NumericKind::Bool) => f64::from(u8::from(value.as_bool().unwrap_or(false))),
        _ => value.as_i64().unwrap_or(0) as f64,
    }
}

fn to_i64(ctx: &EvalContext, value: &Value) -> i64 {
    match numeric_kind(ctx, &value.usage) {
        Some(NumericKind::FloatingPoint) => value.as_f64().unwrap_or(0.0) as i64,
        Some(NumericKind::Bool) => i64::from(value.as_bool().unwrap_or(false)),
        _ => value.as_i64().unwrap_or(0),
    }
}

fn is_float(ctx: &EvalContext, value: &Value) -> bool {
    numeric_kind(ctx, &value.usage).is_some_and(NumericKind::is_float)
}

fn make_int(ctx: &EvalContext, usage: TypeUsage, value: i64) -> Value {
    let size = usage.size(&ctx.state.types) as usize;
    let mut v = Value::from_heap_bytes(usage, vec![0u8; size.max(1)]);
    v.set_from_i64(value);
    v
}

fn make_float(ctx: &EvalContext, usage: TypeUsage, value: f64) -> Value {
    let size = usage.size(&ctx.state.types) as usize;
    let mut v = Value::from_heap_bytes(usage, vec![0u8; size.max(4)]);
    v.set_from_f64(value);
    v
}

fn make_bool(ctx: &EvalContext, value: bool) -> Value {
    make_int(ctx, TypeUsage::of(ctx.state.builtins.bool_), i64::from(value))
}

fn truthy(ctx: &EvalContext, value: &Value) -> bool {
    if is_float(ctx, value) { to_f64(ctx, value) != 0.0 } else { to_i64(ctx, value) != 0 }
}

// ---- variable resolution ----

fn find_instance<'a, 'b>(ctx: &'b EvalContext<'a>, name: &Identifier) -> Option<&'b Instance> {
    if let Some(found) = ctx.locals.find(name) {
        return Some(found);
    }
    for &ns in ctx.namespace_stack.iter().rev() {
        if let Some(found) = ctx.state.namespaces.get(ns).instances.find(name) {
            return Some(found);
        }
        for &used in &ctx.state.namespaces.get(ns).using_directives {
            if let Some(found) = ctx.state.namespaces.get(used).instances.find(name) {
                return Some(found);
            }
        }
    }
    None
}

fn find_instance_mut<'a, 'b>(ctx: &'b mut EvalContext<'a>, name: &Identifier) -> Option<&'b mut Instance> {
    if ctx.locals.find(name).is_some() {
        return ctx.locals.find_mut(name);
    }
    let namespaces: Vec<_> = ctx.namespace_stack.clone();
    for ns in namespaces.into_iter().rev() {
        if ctx.state.namespaces.get(ns).instances.find(name).is_some() {
            return ctx.state.namespaces.get_mut(ns).instances.find_mut(name);
        }
    }
    None
}

fn find_function<'a>(ctx: &'a EvalContext<'_>, name: &Identifier) -> &'a [Function] {
    for &ns in ctx.namespace_stack.iter().rev() {
        let overloads = ctx.state.namespaces.get(ns).functions.overloads(name);
        if !overloads.is_empty() {
            return overloads;
        }
        for &used in &ctx.state.namespaces.get(ns).using_directives {
            let overloads = ctx.state.namespaces.get(used).functions.overloads(name);
            if !overloads.is_empty() {
                return overloads;
            }
        }
    }
    &[]
}

// ---- public entry points ----

pub fn execute_program(ctx: &mut EvalContext<'_>, program: &[Stmt]) -> Result<(), Diagnostic> {
    // Pre-register every top-level function first so forward references
    // ("a calls b" declared before "b") resolve regardless of textual
    // order, matching how the registration API pre-populates overload
    // sets before any script runs.
    for stmt in program {
        if let StmtKind::FunctionDecl(decl) = &stmt.kind {
            register_script_function(ctx, decl);
        }
    }
    for stmt in program {
        if matches!(stmt.kind, StmtKind::FunctionDecl(_)) {
            continue;
        }
        execute_statement(ctx, stmt)?;
    }
    Ok(())
}

fn register_script_function(ctx: &mut EvalContext<'_>, decl: &FunctionDecl) {
    let decl_rc = Rc::new(decl.clone());
    let parameters: Vec<TypeUsage> = decl.params.iter().map(|p| p.usage).collect();
    let trampoline_decl = decl_rc.clone();
    let trampoline: crate::value::Trampoline = Rc::new(move |args, out, ctx| call_script_function(&trampoline_decl, args, out, ctx));
    let function =
        Function { identifier: decl.name.clone(), return_usage: decl.return_usage, parameters, variadic: false, trampoline: Some(trampoline) };
    let ns = ctx.current_namespace();
    ctx.state.namespaces.get_mut(ns).functions.register(function);
}

fn call_script_function(decl: &FunctionDecl, args: &[Value], out: &mut Value, ctx: &mut EvalContext<'_>) -> Result<(), RuntimeErrorKind> {
    if ctx.state.call_stack.len() >= ctx.state.max_call_depth {
        return Err(RuntimeErrorKind::CallStackOverflow);
    }
    ctx.state.call_stack.push(CallFrame { function_name: decl.name.clone(), line: 0 });
    ctx.scope_level += 1;
    let scope_level = ctx.scope_level;

    for (param, arg) in decl.params.iter().zip(args.iter()) {
        let mut storage = make_storage_for(ctx, param.usage);
        let _ = storage.assign_from(arg);
        ctx.locals.push(Instance { identifier: param.name.clone(), value: storage, scope_level, kind: InstanceKind::Parameter });
    }

    let previous_return = ctx.return_slot.take();
    let result = execute_block_statements(ctx, &decl.body);
    let returned = ctx.return_slot.take();
    ctx.return_slot = previous_return;

    for released in ctx.locals.release(scope_level) {
        drop(released);
    }
    ctx.scope_level -= 1;
    ctx.state.call_stack.pop();

    result.map_err(|diag| RuntimeErrorKind::Custom(diag.message))?;
    if let Some(value) = returned {
        let _ = out.assign_from(&value);
    }
    Ok(())
}

/// Writes a `{ a, b, c }` initializer list into an already-allocated array
/// [`Value`], element by element. `usage` is the array's own usage (the
/// element usage is the same type with `array_size` reset to one).
fn initialize_array_literal(ctx: &mut EvalContext<'_>, storage: &mut Value, usage: TypeUsage, elements: &[Expr], line: u32) -> Result<(), Diagnostic> {
    let element_usage = TypeUsage { array_size: 1, ..usage };
    let element_size = element_usage.size(&ctx.state.types) as usize;
    let ptr = storage.as_raw_mut_ptr().ok_or_else(|| runtime_error(ctx, line, RuntimeErrorKind::ZeroInitializedObject))?;
    for (index, element) in elements.iter().enumerate() {
        let value = evaluate_expression(ctx, element)?;
        // SAFETY: `storage` was allocated with room for `usage.array_size`
        // elements of `element_size` bytes each; the parser sizes the array
        // from this same literal's length when no explicit size is given.
        let element_ptr = unsafe { ptr.add(index * element_size) };
        let mut slot = Value::external(element_usage, element_ptr, element_size);
        slot.assign_from(&value).map_err(|e| runtime_error(ctx, line, e))?;
    }
    Ok(())
}

fn make_storage_for(ctx: &EvalContext<'_>, usage: TypeUsage) -> Value {
    let size = usage.size(&ctx.state.types) as usize;
    Value::from_heap_bytes(usage, vec![0u8; size.max(1)])
}

// ---- statement execution ----

fn execute_block_statements(ctx: &mut EvalContext<'_>, body: &[Stmt]) -> Result<JumpSignal, Diagnostic> {
    for stmt in body {
        match execute_statement(ctx, stmt)? {
            JumpSignal::None => {}
            other => return Ok(other),
        }
    }
    Ok(JumpSignal::None)
}

fn execute_statement(ctx: &mut EvalContext<'_>, stmt: &Stmt) -> Result<JumpSignal, Diagnostic> {
    if let Some(frame) = ctx.state.call_stack.last_mut() {
        frame.line = stmt.line;
    }
    let span = tracing::trace_span!("statement", line = stmt.line);
    let _entered = span.enter();
    ctx.fire_execution_hook();

    match &stmt.kind {
        StmtKind::Block(statements) => {
            ctx.scope_level += 1;
            let level = ctx.scope_level;
            let result = execute_block_statements(ctx, statements);
            ctx.locals.release(level);
            ctx.scope_level -= 1;
            result
        }
        StmtKind::ExprStmt(expr) => {
            evaluate_expression(ctx, expr)?;
            Ok(JumpSignal::None)
        }
        StmtKind::VarDecl { usage, name, initializer } => {
            let mut storage = make_storage_for(ctx, *usage);
            match initializer.as_ref().map(|init| &init.kind) {
                Some(ExprKind::ArrayLiteral(elements)) if usage.is_array() => {
                    initialize_array_literal(ctx, &mut storage, *usage, elements, stmt.line)?;
                }
                Some(ExprKind::ArrayLiteral(elements)) => initialize_aggregate(ctx, &mut storage, *usage, elements, stmt.line)?,
                Some(ExprKind::ObjectConstruction(args)) => {
                    let mut arg_values = Vec::with_capacity(args.len());
                    for arg in args {
                        arg_values.push(evaluate_expression(ctx, arg)?);
                    }
                    construct_object(ctx, &mut storage, *usage, arg_values, stmt.line)?;
                }
                Some(_) => {
                    let init = initializer.as_ref().unwrap();
                    let value = evaluate_expression(ctx, init)?;
                    storage.assign_from(&value).map_err(|e| runtime_error(ctx, stmt.line, e))?;
                }
                None => {}
            }
            ctx.locals.push(Instance { identifier: name.clone(), value: storage, scope_level: ctx.scope_level, kind: InstanceKind::Local });
            Ok(JumpSignal::None)
        }
        StmtKind::If { cond, then_branch, else_branch } => {
            let value = evaluate_expression(ctx, cond)?;
            if truthy(ctx, &value) {
                execute_statement(ctx, then_branch)
            } else if let Some(else_branch) = else_branch {
                execute_statement(ctx, else_branch)
            } else {
                Ok(JumpSignal::None)
            }
        }
        StmtKind::While { cond, body } => {
            loop {
                let value = evaluate_expression(ctx, cond)?;
                if !truthy(ctx, &value) {
                    break;
                }
                match execute_statement(ctx, body)? {
                    JumpSignal::Break => break,
                    JumpSignal::Return => return Ok(JumpSignal::Return),
                    JumpSignal::Continue | JumpSignal::None => {}
                }
            }
            Ok(JumpSignal::None)
        }
        StmtKind::DoWhile { body, cond } => {
            loop {
                match execute_statement(ctx, body)? {
                    JumpSignal::Break => break,
                    JumpSignal::Return => return Ok(JumpSignal::Return),
                    JumpSignal::Continue | JumpSignal::None => {}
                }
                let value = evaluate_expression(ctx, cond)?;
                if !truthy(ctx, &value) {
                    break;
                }
            }
            Ok(JumpSignal::None)
        }
        StmtKind::ForClassic { init, cond, step, body } => {
            ctx.scope_level += 1;
            let level = ctx.scope_level;
            if let Some(init) = init {
                execute_statement(ctx, init)?;
            }
            let outcome = (|| -> Result<JumpSignal, Diagnostic> {
                loop {
                    if let Some(cond) = cond {
                        let value = evaluate_expression(ctx, cond)?;
                        if !truthy(ctx, &value) {
                            break;
                        }
                    }
                    match execute_statement(ctx, body)? {
                        JumpSignal::Break => break,
                        JumpSignal::Return => return Ok(JumpSignal::Return),
                        JumpSignal::Continue | JumpSignal::None => {}
                    }
                    if let Some(step) = step {
                        evaluate_expression(ctx, step)?;
                    }
                }
                Ok(JumpSignal::None)
            })();
            ctx.locals.release(level);
            ctx.scope_level -= 1;
            outcome
        }
        StmtKind::ForRange { element_usage, element_name, iterable, body } => {
            let array_value = evaluate_expression(ctx, iterable)?;
            let element_size = element_usage.size(&ctx.state.types) as usize;
            let count = array_value.usage.array_size as usize;
            let bytes = array_value.as_bytes().map(<[u8]>::to_vec).unwrap_or_default();

            ctx.scope_level += 1;
            let level = ctx.scope_level;
            let outcome = (|| -> Result<JumpSignal, Diagnostic> {
                for index in 0..count {
                    let start = index * element_size;
                    let end = (start + element_size).min(bytes.len());
                    let element = Value::from_heap_bytes(*element_usage, bytes.get(start..end).unwrap_or(&[]).to_vec());
                    ctx.locals.push(Instance {
                        identifier: element_name.clone(),
                        value: element,
                        scope_level: level,
                        kind: InstanceKind::Local,
                    });
                    let signal = execute_statement(ctx, body)?;
                    ctx.locals.release(level);
                    match signal {
                        JumpSignal::Break => break,
                        JumpSignal::Return => return Ok(JumpSignal::Return),
                        JumpSignal::Continue | JumpSignal::None => {}
                    }
                }
                Ok(JumpSignal::None)
            })();
            ctx.scope_level -= 1;
            outcome
        }
        StmtKind::Switch { expr, cases } => {
            let value = evaluate_expression(ctx, expr)?;
            let selector = to_i64(ctx, &value);
            let matched_index = cases
                .iter()
                .position(|case| case.label == Some(selector))
                .or_else(|| cases.iter().position(|case| case.label.is_none()));
            let Some(mut index) = matched_index else { return Ok(JumpSignal::None) };
            // Fall-through: execution continues into subsequent cases until
            // a `break` (or the switch ends), matching C++ switch semantics.
            while index < cases.len() {
                match execute_block_statements(ctx, &cases[index].body)? {
                    JumpSignal::Break => return Ok(JumpSignal::None),
                    JumpSignal::Return => return Ok(JumpSignal::Return),
                    JumpSignal::Continue => return Ok(JumpSignal::Continue),
                    JumpSignal::None => {}
                }
                index += 1;
            }
            Ok(JumpSignal::None)
        }
        StmtKind::Break => Ok(JumpSignal::Break),
        StmtKind::Continue => Ok(JumpSignal::Continue),
        StmtKind::Return(expr) => {
            if let Some(expr) = expr {
                let value = evaluate_expression(ctx, expr)?;
                ctx.return_slot = Some(value);
            }
            Ok(JumpSignal::Return)
        }
        StmtKind::FunctionDecl(decl) => {
            register_script_function(ctx, decl);
            Ok(JumpSignal::None)
        }
        StmtKind::UsingNamespace(path) => {
            let global = ctx.state.namespaces.global();
            if let Some(target) = ctx.state.namespaces.find_namespace(global, path, &ctx.state.identifiers) {
                let current = ctx.current_namespace();
                ctx.state.namespaces.get_mut(current).using_directives.push(target);
            }
            Ok(JumpSignal::None)
        }
        StmtKind::NamespaceDecl { name, body } => {
            let current = ctx.current_namespace();
            let id = ctx.state.identifiers.intern(name);
            let child = ctx.state.namespaces.get_or_create_child(current, id);
            ctx.namespace_stack.push(child);
            for inner in body {
                if let StmtKind::FunctionDecl(decl) = &inner.kind {
                    register_script_function(ctx, decl);
                }
            }
            let outcome = execute_block_statements(ctx, body);
            ctx.namespace_stack.pop();
            outcome.map(|_| JumpSignal::None)
        }
        StmtKind::StructDecl(decl) => {
            execute_struct_decl(ctx, decl, stmt.line)?;
            Ok(JumpSignal::None)
        }
        StmtKind::EnumDecl(decl) => {
            execute_enum_decl(ctx, decl);
            Ok(JumpSignal::None)
        }
        StmtKind::TypeAliasDecl { name, usage } => {
            let ns = ctx.current_namespace();
            ctx.state.namespaces.get_mut(ns).types.register_alias(TypeAlias { identifier: name.clone(), usage: *usage });
            Ok(JumpSignal::None)
        }
    }
}

/// Finalizes the `TypeId` for a `struct`/`class` declaration -- reusing the
/// stub a forward-reference prescan already registered, or inserting a
/// fresh one when the declaration lives somewhere the prescan does not
/// cover (a namespaced declaration). Member offsets are a packed running
/// sum seeded with the base class's size; script-declared structs are not
/// alignment-padded, unlike host-registered ones.
fn execute_struct_decl(ctx: &mut EvalContext<'_>, decl: &StructDecl, line: u32) -> Result<(), Diagnostic> {
    let ns = ctx.current_namespace();
    let type_id = match ctx.state.namespaces.get(ns).types.get(&decl.name) {
        Some(id) => id,
        None => {
            let id = ctx.state.types.insert(|id| Type::new(id, decl.name.clone(), TypeCategory::StructOrClass, 1, 1));
            ctx.state.namespaces.get_mut(ns).types.register(&decl.name, id);
            id
        }
    };

    let base_type_id = match &decl.base {
        Some(base_name) => Some(
            ctx.state
                .namespaces
                .get(ns)
                .types
                .get(base_name)
                .ok_or_else(|| compile_error(ctx, line, CompileErrorKind::UndefinedType { name: base_name.as_str().to_owned() }))?,
        ),
        None => None,
    };
    let base_size = base_type_id.map_or(0, |id| ctx.state.types.get(id).size);

    let mut offset = base_size;
    let mut members = Vec::with_capacity(decl.fields.len());
    for field in &decl.fields {
        members.push(Member { identifier: field.name.clone(), usage: field.usage, offset });
        offset += field.usage.size(&ctx.state.types);
    }
    let size = offset.max(1);

    {
        let ty = ctx.state.types.get_mut(type_id);
        ty.size = size;
        ty.alignment = size.clamp(1, 8);
        ty.members = members;
        ty.bases = base_type_id.into_iter().map(|id| BaseType { type_id: id, offset: 0 }).collect();
    }

    for method in &decl.methods {
        register_script_method(ctx, type_id, method);
    }
    Ok(())
}

/// Registers every enumerator as a plain top-level instance in the current
/// namespace. Qualified `EnumClassName::Value` access is not supported --
/// the parser has no general scope-resolution expression grammar -- so an
/// `enum class`'s enumerators are reachable the same unqualified way a
/// plain `enum`'s are.
fn execute_enum_decl(ctx: &mut EvalContext<'_>, decl: &EnumDecl) {
    let ns = ctx.current_namespace();
    let category = if decl.is_class { TypeCategory::EnumClass } else { TypeCategory::Enum };
    let type_id = match ctx.state.namespaces.get(ns).types.get(&decl.name) {
        Some(id) => id,
        None => {
            let id = ctx.state.types.insert(|id| Type::new(id, decl.name.clone(), category, 4, 4).with_numeric_kind(NumericKind::SignedInteger));
            ctx.state.namespaces.get_mut(ns).types.register(&decl.name, id);
            id
        }
    };

    let mut next_value = 0i64;
    let mut enumerators = Vec::with_capacity(decl.enumerators.len());
    for (identifier, explicit) in &decl.enumerators {
        let value = explicit.unwrap_or(next_value);
        enumerators.push(Enumerator { identifier: identifier.clone(), value });
        next_value = value + 1;
    }

    {
        let ty = ctx.state.types.get_mut(type_id);
        ty.category = category;
        ty.numeric_kind = Some(NumericKind::SignedInteger);
        ty.size = 4;
        ty.alignment = 4;
        ty.enumerators = enumerators.clone();
    }

    let usage = TypeUsage::of(type_id);
    for enumerator in &enumerators {
        let value = make_int(ctx, usage, enumerator.value);
        ctx.state.namespaces.get_mut(ns).instances.push(Instance {
            identifier: enumerator.identifier.clone(),
            value,
            scope_level: 0,
            kind: InstanceKind::Static,
        });
    }
}

fn register_script_method(ctx: &mut EvalContext<'_>, type_id: TypeId, decl: &FunctionDecl) {
    let decl_rc = Rc::new(decl.clone());
    let parameters: Vec<TypeUsage> = decl.params.iter().map(|p| p.usage).collect();
    let trampoline_decl = decl_rc.clone();
    let trampoline: crate::value::Trampoline = Rc::new(move |args, out, ctx| call_script_method(&trampoline_decl, args, out, ctx));
    let method =
        Method { identifier: decl.name.clone(), return_usage: decl.return_usage, parameters, flags: MethodFlags::empty(), trampoline: Some(trampoline) };
    ctx.state.types.get_mut(type_id).methods.push(method);
}

/// Same calling convention as [`call_script_function`], with `args[0]`
/// bound to a local named `this` ahead of the declared parameters -- the
/// same "`this` travels as an explicit first argument" convention
/// `evaluate_method_call` already uses to invoke host-registered methods.
fn call_script_method(decl: &FunctionDecl, args: &[Value], out: &mut Value, ctx: &mut EvalContext<'_>) -> Result<(), RuntimeErrorKind> {
    if ctx.state.call_stack.len() >= ctx.state.max_call_depth {
        return Err(RuntimeErrorKind::CallStackOverflow);
    }
    ctx.state.call_stack.push(CallFrame { function_name: decl.name.clone(), line: 0 });
    ctx.scope_level += 1;
    let scope_level = ctx.scope_level;

    let this_identifier = ctx.state.identifiers.intern("this");
    let mut this_storage = make_storage_for(ctx, args[0].usage);
    let _ = this_storage.assign_from(&args[0]);
    ctx.locals.push(Instance { identifier: this_identifier, value: this_storage, scope_level, kind: InstanceKind::Parameter });

    for (param, arg) in decl.params.iter().zip(args[1..].iter()) {
        let mut storage = make_storage_for(ctx, param.usage);
        let _ = storage.assign_from(arg);
        ctx.locals.push(Instance { identifier: param.name.clone(), value: storage, scope_level, kind: InstanceKind::Parameter });
    }

    let previous_return = ctx.return_slot.take();
    let result = execute_block_statements(ctx, &decl.body);
    let returned = ctx.return_slot.take();
    ctx.return_slot = previous_return;

    for released in ctx.locals.release(scope_level) {
        drop(released);
    }
    ctx.scope_level -= 1;
    ctx.state.call_stack.pop();

    result.map_err(|diag| RuntimeErrorKind::Custom(diag.message))?;
    if let Some(value) = returned {
        let _ = out.assign_from(&value);
    }
    Ok(())
}

/// Writes a brace-init list into a struct-typed declaration's storage,
/// positionally by field -- `Point p = { 1, 2 };` assigns `p.x = 1; p.y =
/// 2;` in declaration order.
fn initialize_aggregate(ctx: &mut EvalContext<'_>, storage: &mut Value, usage: TypeUsage, elements: &[Expr], line: u32) -> Result<(), Diagnostic> {
    let ptr = storage.as_raw_mut_ptr().ok_or_else(|| runtime_error(ctx, line, RuntimeErrorKind::ZeroInitializedObject))?;
    let members: Vec<(u32, TypeUsage)> = ctx.state.types.get(usage.type_id).members.iter().map(|m| (m.offset, m.usage)).collect();
    for (element, (offset, member_usage)) in elements.iter().zip(members.iter()) {
        let value = evaluate_expression(ctx, element)?;
        let size = member_usage.size(&ctx.state.types) as usize;
        // SAFETY: `offset`/`size` come from this exact type's own member
        // layout, which covers `usage.type_id`'s full allocated size.
        let member_ptr = unsafe { ptr.add(*offset as usize) };
        let mut slot = Value::external(*member_usage, member_ptr, size);
        slot.assign_from(&value).map_err(|e| runtime_error(ctx, line, e))?;
    }
    Ok(())
}

/// Resolves and invokes the best-matching constructor overload for `Foo f(1,
/// 2, 3);`, the same ranking `evaluate_method_call` uses for an ordinary
/// method call.
fn construct_object(ctx: &mut EvalContext<'_>, storage: &mut Value, usage: TypeUsage, arg_values: Vec<Value>, line: u32) -> Result<(), Diagnostic> {
    let type_id = usage.type_id;
    let type_identifier = ctx.state.types.get(type_id).identifier.clone();
    let arg_usages: Vec<TypeUsage> = arg_values.iter().map(|v| v.usage).collect();

    let candidates: Vec<Method> = ctx
        .state
        .types
        .get(type_id)
        .methods
        .iter()
        .filter(|m| m.identifier == type_identifier && m.parameters.len() == arg_usages.len())
        .cloned()
        .collect();
    let chosen = candidates
        .iter()
        .min_by_key(|m| {
            m.parameters
                .iter()
                .zip(arg_usages.iter())
                .map(|(p, a)| overload::compatibility(p, a, &ctx.state.types))
                .max()
                .unwrap_or(overload::Compatibility::PerfectMatch)
        })
        .ok_or_else(|| compile_error(ctx, line, CompileErrorKind::NoDefaultConstructor { type_name: type_identifier.as_str().to_owned() }))?;

    let trampoline = chosen
        .trampoline
        .clone()
        .ok_or_else(|| compile_error(ctx, line, CompileErrorKind::NoDefaultConstructor { type_name: type_identifier.as_str().to_owned() }))?;

    let len = storage.as_bytes().map(<[u8]>::len).unwrap_or(0);
    let ptr = storage.as_raw_mut_ptr().ok_or_else(|| runtime_error(ctx, line, RuntimeErrorKind::ZeroInitializedObject))?;
    let this_value = Value::external(TypeUsage::of(type_id).as_pointer(), ptr, len);

    let mut call_args = Vec::with_capacity(arg_values.len() + 1);
    call_args.push(this_value);
    call_args.extend(arg_values);

    let void_usage = TypeUsage::of(ctx.state.builtins.void);
    let mut out = make_storage_for(ctx, void_usage);
    trampoline(&call_args, &mut out, ctx).map_err(|e| runtime_error(ctx, line, e))?;
    Ok(())
}

// ---- expression evaluation ----

pub fn evaluate_expression(ctx: &mut EvalContext<'_>, expr: &Expr) -> Result<Value, Diagnostic> {
    match &expr.kind {
        ExprKind::Literal(literal) => Ok(evaluate_literal(ctx, literal)),
        ExprKind::NullPointer => {
            let usage = TypeUsage::of(ctx.state.builtins.void).as_pointer();
            Ok(Value::from_heap_bytes(usage, vec![0u8; std::mem::size_of::<usize>()]))
        }
        ExprKind::Variable(name) => match find_instance(ctx, name) {
            Some(instance) => copy_value(ctx, &instance.value),
            None => Err(compile_error(ctx, expr.line, CompileErrorKind::UndefinedVariable { name: name.as_str().to_owned() })),
        },
        ExprKind::MemberAccess { owner, member } => evaluate_member_access(ctx, owner, member, expr.line, false),
        ExprKind::ArrowAccess { owner, member } => evaluate_member_access(ctx, owner, member, expr.line, true),
        ExprKind::Index { .. } => {
            let aliased = evaluate_lvalue(ctx, expr, expr.line)?;
            copy_value(ctx, &aliased)
        }
        ExprKind::Unary { op, operand } => evaluate_unary(ctx, *op, operand, expr.line),
        ExprKind::Binary { op, lhs, rhs } => evaluate_binary(ctx, *op, lhs, rhs, expr.line),
        ExprKind::Conditional { cond, then_expr, else_expr } => {
            let value = evaluate_expression(ctx, cond)?;
            if truthy(ctx, &value) { evaluate_expression(ctx, then_expr) } else { evaluate_expression(ctx, else_expr) }
        }
        ExprKind::Assignment { op, target, value } => evaluate_assignment(ctx, *op, target, value, expr.line),
        ExprKind::Call { callee, args } => evaluate_call(ctx, callee, args, expr.line),
        ExprKind::MethodCall { owner, method, args } => evaluate_method_call(ctx, owner, method, args, expr.line),
        ExprKind::SizeOfExpr(inner) => {
            let value = evaluate_expression(ctx, inner)?;
            Ok(make_int(ctx, TypeUsage::of(ctx.state.builtins.unsigned_int), i64::from(value.usage.size(&ctx.state.types))))
        }
        ExprKind::SizeOfType(usage) => {
            Ok(make_int(ctx, TypeUsage::of(ctx.state.builtins.unsigned_int), i64::from(usage.size(&ctx.state.types))))
        }
        ExprKind::Cast { kind, target, expr: inner } => {
            let value = evaluate_expression(ctx, inner)?;
            Ok(cast_value(ctx, &value, *target, *kind))
        }
        ExprKind::Paren(inner) => evaluate_expression(ctx, inner),
        ExprKind::ArrayLiteral(_) => {
            Err(compile_error(ctx, expr.line, CompileErrorKind::Expected { what: "an array declaration's initializer, not a bare expression".to_owned() }))
        }
        ExprKind::ObjectConstruction(_) => {
            Err(compile_error(ctx, expr.line, CompileErrorKind::Expected { what: "a variable declaration's initializer, not a bare expression".to_owned() }))
        }
    }
}

fn copy_value(ctx: &EvalContext<'_>, source: &Value) -> Result<Value, Diagnostic> {
    let bytes = source.as_bytes().unwrap_or(&[]).to_vec();
    let _ = ctx;
    Ok(Value::from_heap_bytes(source.usage, bytes))
}

fn evaluate_literal(ctx: &EvalContext<'_>, literal: &Literal) -> Value {
    match literal {
        Literal::Integer(v) => make_int(ctx, TypeUsage::of(ctx.state.builtins.int), *v),
        Literal::UnsignedInteger(v) => make_int(ctx, TypeUsage::of(ctx.state.builtins.unsigned_int), *v as i64),
        Literal::Float(v) => make_float(ctx, TypeUsage::of(ctx.state.builtins.double), *v),
        Literal::Bool(v) => make_bool(ctx, *v),
        Literal::Char(c) => make_int(ctx, TypeUsage::of(ctx.state.builtins.char_), i64::from(*c as u32)),
        Literal::String(text) => {
            let bytes: Vec<u8> = text.bytes().chain(std::iter::once(0)).collect();
            let usage = TypeUsage::of(ctx.state.builtins.char_).as_pointer();
            Value::from_heap_bytes(usage, bytes)
        }
    }
}

fn evaluate_unary(ctx: &mut EvalContext<'_>, op: UnaryOp, operand: &Expr, line: u32) -> Result<Value, Diagnostic> {
    match op {
        UnaryOp::Neg => {
            let value = evaluate_expression(ctx, operand)?;
            Ok(if is_float(ctx, &value) {
                make_float(ctx, value.usage, -to_f64(ctx, &value))
            } else {
                make_int(ctx, value.usage, -to_i64(ctx, &value))
            })
        }
        UnaryOp::Not => {
            let value = evaluate_expression(ctx, operand)?;
            Ok(make_bool(ctx, !truthy(ctx, &value)))
        }
        UnaryOp::BitNot => {
            let value = evaluate_expression(ctx, operand)?;
            Ok(make_int(ctx, value.usage, !to_i64(ctx, &value)))
        }
        UnaryOp::PreIncrement | UnaryOp::PreDecrement | UnaryOp::PostIncrement | UnaryOp::PostDecrement => {
            let delta = if matches!(op, UnaryOp::PreIncrement | UnaryOp::PostIncrement) { 1 } else { -1 };
            let before = evaluate_expression(ctx, operand)?;
            let updated = if is_float(ctx, &before) {
                make_float(ctx, before.usage, to_f64(ctx, &before) + delta as f64)
            } else {
                make_int(ctx, before.usage, to_i64(ctx, &before) + delta)
            };
            assign_to_lvalue(ctx, operand, &updated, line)?;
            Ok(if matches!(op, UnaryOp::PreIncrement | UnaryOp::PreDecrement) { updated } else { before })
        }
        UnaryOp::AddressOf => {
            let mut value = evaluate_expression(ctx, operand)?;
            let len = value.as_bytes().map(<[u8]>::len).unwrap_or(0);
            let ptr = value.as_raw_mut_ptr().ok_or_else(|| runtime_error(ctx, line, RuntimeErrorKind::ZeroInitializedObject))?;
            Ok(Value::external(value.usage.as_pointer(), ptr, len))
        }
        UnaryOp::Deref => {
            let value = evaluate_expression(ctx, operand)?;
            if value.is_null_pointer() {
                return Err(runtime_error(ctx, line, RuntimeErrorKind::NullPointerAccess { member: String::new() }));
            }
            let pointee = TypeUsage { pointer_level: value.usage.pointer_level.saturating_sub(1), ..value.usage };
            let size = pointee.size(&ctx.state.types) as usize;
            let ptr_width = std::mem::size_of::<usize>();
            let address = value.as_bytes().and_then(|b| b.get(..ptr_width)).and_then(|slice| {
                let mut buf = [0u8; std::mem::size_of::<usize>()];
                buf.copy_from_slice(slice);
                Some(usize::from_le_bytes(buf))
            });
            let Some(address) = address.filter(|a| *a != 0) else {
                return Err(runtime_error(ctx, line, RuntimeErrorKind::NullPointerAccess { member: String::new() }));
            };
            // SAFETY: the pointer was produced by `AddressOf`/host
            // registration against live storage; callers are trusted the
            // same way registering a host type trusts its layout.
            Ok(Value::external(pointee, address as *mut u8, size))
        }
    }
}

fn evaluate_binary(ctx: &mut EvalContext<'_>, op: BinaryOp, lhs: &Expr, rhs: &Expr, line: u32) -> Result<Value, Diagnostic> {
    // Short-circuit: `&&`/`||` must not evaluate their right operand when
    // the left one already decides the result.
    if op == BinaryOp::And {
        let left = evaluate_expression(ctx, lhs)?;
        if !truthy(ctx, &left) {
            return Ok(make_bool(ctx, false));
        }
        let right = evaluate_expression(ctx, rhs)?;
        return Ok(make_bool(ctx, truthy(ctx, &right)));
    }
    if op == BinaryOp::Or {
        let left = evaluate_expression(ctx, lhs)?;
        if truthy(ctx, &left) {
            return Ok(make_bool(ctx, true));
        }
        let right = evaluate_expression(ctx, rhs)?;
        return Ok(make_bool(ctx, truthy(ctx, &right)));
    }

    let left = evaluate_expression(ctx, lhs)?;
    let right = evaluate_expression(ctx, rhs)?;
    let use_float = is_float(ctx, &left) || is_float(ctx, &right);

    match op {
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = if use_float {
                to_f64(ctx, &left).partial_cmp(&to_f64(ctx, &right))
            } else {
                to_i64(ctx, &left).partial_cmp(&to_i64(ctx, &right))
            };
            let result = match (op, ordering) {
                (BinaryOp::Eq, Some(std::cmp::Ordering::Equal)) => true,
                (BinaryOp::Ne, ord) => ord != Some(std::cmp::Ordering::Equal),
                (BinaryOp::Lt, Some(std::cmp::Ordering::Less)) => true,
                (BinaryOp::Le, Some(o)) => o != std::cmp::Ordering::Greater,
                (BinaryOp::Gt, Some(std::cmp::Ordering::Greater)) => true,
                (BinaryOp::Ge, Some(o)) => o != std::cmp::Ordering::Less,
                _ => false,
            };
            Ok(make_bool(ctx, result))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            let result_usage = if use_float { TypeUsage::of(ctx.state.builtins.double) } else { TypeUsage::of(ctx.state.builtins.int) };
            if use_float {
                let (a, b) = (to_f64(ctx, &left), to_f64(ctx, &right));
                let value = match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    BinaryOp::Mod => a % b,
                    _ => unreachable!(),
                };
                Ok(make_float(ctx, result_usage, value))
            } else {
                let (a, b) = (to_i64(ctx, &left), to_i64(ctx, &right));
                if matches!(op, BinaryOp::Div | BinaryOp::Mod) && b == 0 {
                    return Err(runtime_error(ctx, line, RuntimeErrorKind::DivisionByZero));
                }
                let value = match op {
                    BinaryOp::Add => a.wrapping_add(b),
                    BinaryOp::Sub => a.wrapping_sub(b),
                    BinaryOp::Mul => a.wrapping_mul(b),
                    BinaryOp::Div => a / b,
                    BinaryOp::Mod => a % b,
                    _ => unreachable!(),
                };
                Ok(make_int(ctx, result_usage, value))
            }
        }
        BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Shl | BinaryOp::Shr => {
            let (a, b) = (to_i64(ctx, &left), to_i64(ctx, &right));
            let value = match op {
                BinaryOp::BitAnd => a & b,
                BinaryOp::BitOr => a | b,
                BinaryOp::BitXor => a ^ b,
                BinaryOp::Shl => a.wrapping_shl(b as u32),
                BinaryOp::Shr => a.wrapping_shr(b as u32),
                _ => unreachable!(),
            };
            Ok(make_int(ctx, TypeUsage::of(ctx.state.builtins.int), value))
        }
        BinaryOp::And | BinaryOp::Or => unreachable!("handled above with short-circuit"),
    }
}

/// Computes the byte offset to add when reinterpreting a pointer to `from`
/// as a pointer to `to`, walking the single-inheritance chain in whichever
/// direction relates them (positive for an upcast, negative for a
/// downcast). `None` when the two types are unrelated.
fn base_offset_between(ctx: &EvalContext<'_>, from: TypeId, to: TypeId) -> Option<i64> {
    if let Some(offset) = ctx.state.types.get(from).offset_of_base(to, &ctx.state.types) {
        return Some(i64::from(offset));
    }
    ctx.state.types.get(to).offset_of_base(from, &ctx.state.types).map(|offset| -i64::from(offset))
}

/// `Static`/`CStyle` shift a pointer's address by the base's byte offset
/// (the `static_cast<Base*>(&derived)` idiom); `Reinterpret` always copies
/// raw bytes with no offset adjustment; `Dynamic` validates the runtime
/// type relation in either direction and yields a null pointer when the
/// types are unrelated -- an RTTI approximation, since there is no vtable
/// to consult the object's actual dynamic type. Void-pointer involvement on
/// either side bypasses all kind-specific rules and just copies bytes.
fn cast_value(ctx: &EvalContext<'_>, value: &Value, target: TypeUsage, kind: CastKind) -> Value {
    if target.is_pointer() {
        let involves_void = ctx.state.types.get(value.usage.type_id).category == TypeCategory::Void
            || ctx.state.types.get(target.type_id).category == TypeCategory::Void;
        let relates_distinct_types = !involves_void && value.usage.is_pointer() && !value.is_null_pointer() && value.usage.type_id != target.type_id;

        if relates_distinct_types {
            match kind {
                CastKind::Static | CastKind::CStyle | CastKind::Const => {
                    if let Some(offset) = ctx.state.types.get(value.usage.type_id).offset_of_base(target.type_id, &ctx.state.types) {
                        let address = value.as_i64().unwrap_or(0);
                        return make_int(ctx, target, address + i64::from(offset));
                    }
                }
                CastKind::Dynamic => {
                    return match base_offset_between(ctx, value.usage.type_id, target.type_id) {
                        Some(offset) => make_int(ctx, target, value.as_i64().unwrap_or(0).wrapping_add(offset)),
                        None => make_int(ctx, target, 0),
                    };
                }
                CastKind::Reinterpret => {}
            }
        }
        let bytes = value.as_bytes().unwrap_or(&[0u8; 8]).to_vec();
        return Value::from_heap_bytes(target, bytes);
    }
    match numeric_kind(ctx, &target) {
        Some(NumericKind::FloatingPoint) => make_float(ctx, target, to_f64(ctx, value)),
        Some(_) => make_int(ctx, target, to_i64(ctx, value)),
        None => {
            let bytes = value.as_bytes().unwrap_or(&[]).to_vec();
            Value::from_heap_bytes(target, bytes)
        }
    }
}

fn evaluate_assignment(ctx: &mut EvalContext<'_>, op: AssignOp, target: &Expr, value_expr: &Expr, line: u32) -> Result<Value, Diagnostic> {
    let rhs = evaluate_expression(ctx, value_expr)?;
    let new_value = if op == AssignOp::Assign {
        rhs
    } else {
        let current = evaluate_expression(ctx, target)?;
        let bin_op = match op {
            AssignOp::AddAssign => BinaryOp::Add,
            AssignOp::SubAssign => BinaryOp::Sub,
            AssignOp::MulAssign => BinaryOp::Mul,
            AssignOp::DivAssign => BinaryOp::Div,
            AssignOp::ModAssign => BinaryOp::Mod,
            AssignOp::AndAssign => BinaryOp::BitAnd,
            AssignOp::OrAssign => BinaryOp::BitOr,
            AssignOp::XorAssign => BinaryOp::BitXor,
            AssignOp::ShlAssign => BinaryOp::Shl,
            AssignOp::ShrAssign => BinaryOp::Shr,
            AssignOp::Assign => unreachable!(),
        };
        let use_float = is_float(ctx, &current) || is_float(ctx, &rhs);
        if use_float {
            let a = to_f64(ctx, &current);
            let b = to_f64(ctx, &rhs);
            let v = match bin_op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                BinaryOp::Mod => a % b,
                _ => a,
            };
            make_float(ctx, current.usage, v)
        } else {
            let a = to_i64(ctx, &current);
            let b = to_i64(ctx, &rhs);
            if matches!(bin_op, BinaryOp::Div | BinaryOp::Mod) && b == 0 {
                return Err(runtime_error(ctx, line, RuntimeErrorKind::DivisionByZero));
            }
            let v = match bin_op {
                BinaryOp::Add => a.wrapping_add(b),
                BinaryOp::Sub => a.wrapping_sub(b),
                BinaryOp::Mul => a.wrapping_mul(b),
                BinaryOp::Div => a / b,
                BinaryOp::Mod => a % b,
                BinaryOp::BitAnd => a & b,
                BinaryOp::BitOr => a | b,
                BinaryOp::BitXor => a ^ b,
                BinaryOp::Shl => a.wrapping_shl(b as u32),
                BinaryOp::Shr => a.wrapping_shr(b as u32),
                _ => a,
            };
            make_int(ctx, current.usage, v)
        }
    };
    assign_to_lvalue(ctx, target, &new_value, line)?;
    copy_value(ctx, &new_value)
}

fn assign_to_lvalue(ctx: &mut EvalContext<'_>, target: &Expr, value: &Value, line: u32) -> Result<(), Diagnostic> {
    let mut lvalue = evaluate_lvalue(ctx, target, line)?;
    lvalue.assign_from(value).map_err(|e| runtime_error(ctx, line, e))
}

/// Resolves `expr` to a [`Value`] whose storage aliases the live bytes it
/// names, so the caller can read it or write through it. Variables resolve
/// by borrowing their instance slot directly; member/array/pointer access
/// reuse the `External`-aliasing construction already used for reads.
fn evaluate_lvalue(ctx: &mut EvalContext<'_>, expr: &Expr, line: u32) -> Result<Value, Diagnostic> {
    match &expr.kind {
        ExprKind::Variable(name) => match find_instance_mut(ctx, name) {
            Some(instance) => {
                let usage = instance.value.usage;
                let len = instance.value.as_bytes().map(<[u8]>::len).unwrap_or(0);
                match instance.value.as_raw_mut_ptr() {
                    Some(ptr) => Ok(Value::external(usage, ptr, len)),
                    None => Err(runtime_error(ctx, line, RuntimeErrorKind::ZeroInitializedObject)),
                }
            }
            None => Err(compile_error(ctx, line, CompileErrorKind::UndefinedVariable { name: name.as_str().to_owned() })),
        },
        ExprKind::Index { base, index } => {
            let mut base_value = evaluate_lvalue(ctx, base, line)?;
            let index_value = evaluate_expression(ctx, index)?;
            let idx = to_i64(ctx, &index_value);
            let element_size = (base_value.usage.size(&ctx.state.types) / base_value.usage.array_size.max(1)) as usize;
            let bytes_len = base_value.as_bytes().map(<[u8]>::len).unwrap_or(0);
            if idx < 0 || (idx as usize + 1) * element_size > bytes_len {
                return Err(runtime_error(ctx, line, RuntimeErrorKind::InvalidArrayIndex { index: idx }));
            }
            let element_usage = TypeUsage { array_size: 1, ..base_value.usage };
            let ptr = base_value.as_raw_mut_ptr().ok_or_else(|| runtime_error(ctx, line, RuntimeErrorKind::ZeroInitializedObject))?;
            // SAFETY: `idx * element_size` was bounds-checked against
            // `bytes_len` above, so the offset stays within `base_value`'s
            // storage.
            let element_ptr = unsafe { ptr.add(idx as usize * element_size) };
            Ok(Value::external(element_usage, element_ptr, element_size))
        }
        ExprKind::MemberAccess { owner, member } => evaluate_member_access(ctx, owner, member, line, false),
        ExprKind::ArrowAccess { owner, member } => evaluate_member_access(ctx, owner, member, line, true),
        ExprKind::Unary { op: UnaryOp::Deref, operand } => evaluate_unary(ctx, UnaryOp::Deref, operand, line),
        ExprKind::Paren(inner) => evaluate_lvalue(ctx, inner, line),
        _ => Err(compile_error(ctx, line, CompileErrorKind::Expected { what: "an assignable expression".to_owned() })),
    }
}

fn evaluate_member_access(ctx: &mut EvalContext<'_>, owner: &Expr, member: &Identifier, line: u32, through_pointer: bool) -> Result<Value, Diagnostic> {
    let mut owner_value = evaluate_expression(ctx, owner)?;
    if through_pointer && owner_value.is_null_pointer() {
        return Err(runtime_error(ctx, line, RuntimeErrorKind::NullPointerAccess { member: member.as_str().to_owned() }));
    }
    let owning_type = owner_value.usage.type_id;
    let (member_offset, member_usage) = {
        let found = ctx.state.types.get(owning_type).find_member(member, &ctx.state.types);
        match found {
            Some((m, offset)) => (offset, m.usage),
            None => {
                return Err(compile_error(
                    ctx,
                    line,
                    CompileErrorKind::InvalidMemberAccess {
                        member: member.as_str().to_owned(),
                        type_name: ctx.state.types.get(owning_type).identifier.as_str().to_owned(),
                    },
                ));
            }
        }
    };
    let len = member_usage.size(&ctx.state.types) as usize;
    let ptr = if through_pointer {
        // `owner_value` is the pointer itself; its bytes encode the address
        // it points at, which is the base we adjust by `member_offset` --
        // not the address of the pointer variable's own storage.
        let address = owner_value.as_i64().unwrap_or(0);
        address as usize as *mut u8
    } else {
        owner_value
            .as_raw_mut_ptr()
            .ok_or_else(|| runtime_error(ctx, line, RuntimeErrorKind::NullPointerAccess { member: member.as_str().to_owned() }))?
    };
    // SAFETY: `ptr` is a valid pointer into the owning object's storage --
    // either `owner_value`'s own bytes for a direct member access, or the
    // address a validated non-null pointer refers to for `->`; `member_offset`
    // was resolved from that exact type's layout.
    let member_ptr = unsafe { ptr.add(member_offset as usize) };
    Ok(Value::external(member_usage, member_ptr, len))
}

fn evaluate_call(ctx: &mut EvalContext<'_>, callee: &Identifier, args: &[Expr], line: u32) -> Result<Value, Diagnostic> {
    let mut arg_values = Vec::with_capacity(args.len());
    for arg in args {
        arg_values.push(evaluate_expression(ctx, arg)?);
    }
    let arg_usages: Vec<TypeUsage> = arg_values.iter().map(|v| v.usage).collect();

    let resolved = {
        let overloads = find_function(ctx, callee);
        overload::resolve(overloads, &arg_usages, &ctx.state.types).map(|f| (f.trampoline.clone(), f.return_usage))
    };
    let Some((trampoline, return_usage)) = resolved else {
        return Err(compile_error(ctx, line, CompileErrorKind::UndefinedFunction { name: callee.as_str().to_owned() }));
    };
    let trampoline = trampoline
        .ok_or_else(|| compile_error(ctx, line, CompileErrorKind::NoSuitableOverload { name: callee.as_str().to_owned() }))?;

    let mut out = make_storage_for(ctx, return_usage);
    trampoline(&arg_values, &mut out, ctx).map_err(|e| runtime_error(ctx, line, e))?;
    Ok(out)
}

fn evaluate_method_call(ctx: &mut EvalContext<'_>, owner: &Expr, method: &Identifier, args: &[Expr], line: u32) -> Result<Value, Diagnostic> {
    let mut owner_value = evaluate_expression(ctx, owner)?;
    if owner_value.is_null_pointer() {
        return Err(runtime_error(ctx, line, RuntimeErrorKind::NullPointerAccess { member: method.as_str().to_owned() }));
    }
    let owning_type = owner_value.usage.type_id;

    let mut arg_values = Vec::with_capacity(args.len());
    for arg in args {
        arg_values.push(evaluate_expression(ctx, arg)?);
    }

    let candidates: Vec<(crate::types::Method, u32)> =
        ctx.state.types.get(owning_type).find_methods(method, &ctx.state.types).into_iter().map(|(m, off)| (m.clone(), off)).collect();
    if candidates.is_empty() {
        return Err(compile_error(
            ctx,
            line,
            CompileErrorKind::InvalidMemberAccess {
                member: method.as_str().to_owned(),
                type_name: ctx.state.types.get(owning_type).identifier.as_str().to_owned(),
            },
        ));
    }
    let arg_usages: Vec<TypeUsage> = arg_values.iter().map(|v| v.usage).collect();
    let resolved = candidates
        .iter()
        .filter(|(m, _)| m.parameters.len() == arg_usages.len())
        .min_by_key(|(m, _)| {
            m.parameters
                .iter()
                .zip(arg_usages.iter())
                .map(|(p, a)| overload::compatibility(p, a, &ctx.state.types))
                .max()
                .unwrap_or(overload::Compatibility::PerfectMatch)
        })
        .ok_or_else(|| compile_error(ctx, line, CompileErrorKind::NoSuitableOverload { name: method.as_str().to_owned() }))?;

    let (chosen_method, base_offset) = resolved;
    let trampoline = chosen_method
        .trampoline
        .clone()
        .ok_or_else(|| compile_error(ctx, line, CompileErrorKind::NoSuitableOverload { name: method.as_str().to_owned() }))?;

    let this_ptr = if owner_value.usage.is_pointer() {
        // `owner_value` is the pointer itself (an `obj->method()` call);
        // its bytes encode the address of the object, not the address of
        // the pointer variable's own storage.
        owner_value.as_i64().unwrap_or(0) as usize as *mut u8
    } else {
        owner_value
            .as_raw_mut_ptr()
            .ok_or_else(|| runtime_error(ctx, line, RuntimeErrorKind::NullPointerAccess { member: method.as_str().to_owned() }))?
    };
    // SAFETY: `base_offset` was resolved against `owning_type`'s own layout
    // by `find_methods`, which only returns offsets reachable by walking
    // that type's registered base list.
    let adjusted = unsafe { this_ptr.add(*base_offset as usize) };
    let owning_size = ctx.state.types.get(owning_type).size as usize;
    let this_value = Value::external(TypeUsage::of(owning_type).as_pointer(), adjusted, owning_size.saturating_sub(*base_offset as usize));

    let mut call_args = Vec::with_capacity(arg_values.len() + 1);
    call_args.push(this_value);
    call_args.extend(arg_values);

    let mut out = make_storage_for(ctx, chosen_method.return_usage);
    trampoline(&call_args, &mut out, ctx).map_err(|e| runtime_error(ctx, line, e))?;
    Ok(out)
}
