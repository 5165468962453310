// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Tobias Sarnowski <tobias@sarnowski.cloud>

//! Conveniences for turning native Rust functions and methods into
//! [`Trampoline`]s, so a host does not have to hand-write byte-level
//! argument marshalling for every registered callable.
//!
//! Grounded on the teacher's `repl/mod.rs` registration surface (name plus
//! closure in, `Function`/`Method` out) generalized from "the teacher's
//! fixed opcode handlers" to "any native function whose arguments implement
//! [`FromValue`] and whose return type implements [`IntoValue`]".

use crate::diagnostics::RuntimeErrorKind;
use crate::eval::EvalContext;
use crate::types::{BuiltinTypes, TypeUsage};
use crate::value::{Trampoline, Value};
use std::rc::Rc;

/// Converts a [`Value`]'s bytes into a native Rust argument.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, RuntimeErrorKind>;
    fn type_usage(builtins: &BuiltinTypes) -> TypeUsage;
}

/// Converts a native Rust return value into a [`Value`] written through
/// `out`.
pub trait IntoValue {
    fn into_value(self, out: &mut Value) -> Result<(), RuntimeErrorKind>;
    fn type_usage(builtins: &BuiltinTypes) -> TypeUsage;
}

macro_rules! impl_scalar_value {
    ($ty:ty, $builtin:ident, $from:ident, $set:ident) => {
        impl FromValue for $ty {
            fn from_value(value: &Value) -> Result<Self, RuntimeErrorKind> {
                value.$from().map(|v| v as $ty).ok_or(RuntimeErrorKind::ZeroInitializedObject)
            }

            fn type_usage(builtins: &BuiltinTypes) -> TypeUsage {
                TypeUsage::of(builtins.$builtin)
            }
        }

        impl IntoValue for $ty {
            fn into_value(self, out: &mut Value) -> Result<(), RuntimeErrorKind> {
                out.$set(self as _);
                Ok(())
            }

            fn type_usage(builtins: &BuiltinTypes) -> TypeUsage {
                TypeUsage::of(builtins.$builtin)
            }
        }
    };
}

impl_scalar_value!(i64, long, as_i64, set_from_i64);
impl_scalar_value!(i32, int, as_i64, set_from_i64);
impl_scalar_value!(i16, short, as_i64, set_from_i64);
impl_scalar_value!(f64, double, as_f64, set_from_f64);
impl_scalar_value!(f32, float, as_f64, set_from_f64);

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, RuntimeErrorKind> {
        value.as_bool().ok_or(RuntimeErrorKind::ZeroInitializedObject)
    }

    fn type_usage(builtins: &BuiltinTypes) -> TypeUsage {
        TypeUsage::of(builtins.bool_)
    }
}

impl IntoValue for bool {
    fn into_value(self, out: &mut Value) -> Result<(), RuntimeErrorKind> {
        out.set_from_i64(i64::from(self));
        Ok(())
    }

    fn type_usage(builtins: &BuiltinTypes) -> TypeUsage {
        TypeUsage::of(builtins.bool_)
    }
}

impl IntoValue for () {
    fn into_value(self, _out: &mut Value) -> Result<(), RuntimeErrorKind> {
        Ok(())
    }

    fn type_usage(builtins: &BuiltinTypes) -> TypeUsage {
        TypeUsage::of(builtins.void)
    }
}

/// Wraps a zero-argument native function into a [`Trampoline`].
pub fn native_fn0<R>(f: impl Fn() -> R + 'static) -> Trampoline
where
    R: IntoValue,
{
    Rc::new(move |_args: &[Value], out: &mut Value, _ctx: &mut EvalContext<'_>| f().into_value(out))
}

/// Wraps a one-argument native function into a [`Trampoline`]. `args[0]` is
/// consumed positionally; method trampolines should add their own `this`
/// extraction before delegating here if they need it.
pub fn native_fn1<A, R>(f: impl Fn(A) -> R + 'static) -> Trampoline
where
    A: FromValue,
    R: IntoValue,
{
    Rc::new(move |args: &[Value], out: &mut Value, _ctx: &mut EvalContext<'_>| {
        let a = A::from_value(args.first().ok_or(RuntimeErrorKind::UnbalancedStack)?)?;
        f(a).into_value(out)
    })
}

/// Wraps a two-argument native function into a [`Trampoline`].
pub fn native_fn2<A, B, R>(f: impl Fn(A, B) -> R + 'static) -> Trampoline
where
    A: FromValue,
    B: FromValue,
    R: IntoValue,
{
    Rc::new(move |args: &[Value], out: &mut Value, _ctx: &mut EvalContext<'_>| {
        let a = A::from_value(args.first().ok_or(RuntimeErrorKind::UnbalancedStack)?)?;
        let b = B::from_value(args.get(1).ok_or(RuntimeErrorKind::UnbalancedStack)?)?;
        f(a, b).into_value(out)
    })
}

/// Wraps a three-argument native function into a [`Trampoline`].
pub fn native_fn3<A, B, C, R>(f: impl Fn(A, B, C) -> R + 'static) -> Trampoline
where
    A: FromValue,
    B: FromValue,
    C: FromValue,
    R: IntoValue,
{
    Rc::new(move |args: &[Value], out: &mut Value, _ctx: &mut EvalContext<'_>| {
        let a = A::from_value(args.first().ok_or(RuntimeErrorKind::UnbalancedStack)?)?;
        let b = B::from_value(args.get(1).ok_or(RuntimeErrorKind::UnbalancedStack)?)?;
        let c = C::from_value(args.get(2).ok_or(RuntimeErrorKind::UnbalancedStack)?)?;
        f(a, b, c).into_value(out)
    })
}

/// Wraps a native method (receiver plus up to one argument) into a
/// [`Trampoline`] following the `this`-as-`args[0]` calling convention every
/// method call uses.
pub fn native_method1<This, A, R>(f: impl Fn(&mut This, A) -> R + 'static) -> Trampoline
where
    This: 'static,
    A: FromValue,
    R: IntoValue,
{
    Rc::new(move |args: &[Value], out: &mut Value, _ctx: &mut EvalContext<'_>| {
        let this_value = args.first().ok_or(RuntimeErrorKind::UnbalancedStack)?;
        let this_ptr = this_value.as_bytes().ok_or(RuntimeErrorKind::ZeroInitializedObject)?.as_ptr().cast_mut().cast::<This>();
        // SAFETY: `this_value` is the adjusted receiver pointer the method
        // dispatch built from a live host object of type `This`; callers
        // only register this trampoline against a method declared on that
        // exact registered type.
        let this = unsafe { &mut *this_ptr };
        let a = A::from_value(args.get(1).ok_or(RuntimeErrorKind::UnbalancedStack)?)?;
        f(this, a).into_value(out)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::context::EnvironmentState;
    use crate::ident::IdentifierTable;
    use crate::symbols::NamespaceArena;
    use crate::types::TypeArena;
    use crate::value::EnvironmentStack;

    fn state() -> EnvironmentState {
        let identifiers = IdentifierTable::new();
        let mut types = TypeArena::new();
        let builtins = BuiltinTypes::bootstrap(&mut types, &identifiers);
        let namespaces = NamespaceArena::new(&identifiers);
        EnvironmentState {
            identifiers,
            types,
            builtins,
            namespaces,
            stack: EnvironmentStack::with_capacity(4096),
            call_stack: Vec::new(),
            error: None,
            execution_hook: None,
            program_name: "test".to_owned(),
            max_call_depth: 64,
            hook_inside_library_calls: false,
            loaded_programs: Vec::new(),
        }
    }

    #[test]
    fn native_fn2_adds_two_integers() {
        let mut environment_state = state();
        let mut ctx = EvalContext::new(&mut environment_state);
        let trampoline = native_fn2(|a: i32, b: i32| a + b);
        let usage = TypeUsage::of(ctx.state.builtins.int);
        let mut a = Value::from_heap_bytes(usage, vec![0; 4]);
        a.set_from_i64(2);
        let mut b = Value::from_heap_bytes(usage, vec![0; 4]);
        b.set_from_i64(3);
        let mut out = Value::from_heap_bytes(usage, vec![0; 4]);
        trampoline(&[a, b], &mut out, &mut ctx).unwrap();
        assert_eq!(out.as_i64(), Some(5));
    }
}
