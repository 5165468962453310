//! The overload & conversion engine: ranks how well an argument usage fits
//! a parameter usage, then picks the best-ranked overload.
//!
//! Grounded on the teacher's `execute_call` (`vm/mod.rs`), which dispatches
//! on the callee's runtime shape and reports `ArityMismatch`/
//! `CallableTypeError` when a call does not fit; here the same "does this
//! argument list fit this candidate" question is answered ahead of the
//! call, ranked instead of boolean, so the best of several overloads wins.

use crate::symbols::Function;
use crate::types::{TypeArena, TypeCategory, TypeUsage};

/// How well an argument usage satisfies a parameter usage, best first.
/// Matches spec.md §4.F's ranked compatibility ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Compatibility {
    PerfectMatch,
    ImplicitCastableInteger,
    ImplicitCastableIntegerFloat,
    ImplicitCastableFloat,
    ImplicitCastableInheritance,
    ImplicitConstructable,
    Incompatible,
}

impl Compatibility {
    #[must_use]
    pub fn is_compatible(self) -> bool {
        self != Compatibility::Incompatible
    }
}

/// Ranks `arg` against `param`. References/pointers require an exact base
/// type plus compatible pointer level (inheritance conversions aside);
/// value parameters tolerate numeric promotion.
#[must_use]
pub fn compatibility(param: &TypeUsage, arg: &TypeUsage, arena: &TypeArena) -> Compatibility {
    if param == arg {
        return Compatibility::PerfectMatch;
    }

    if arena.is_custom_perfect_match(param.type_id, arg.type_id) {
        return Compatibility::PerfectMatch;
    }

    // Array-to-pointer decay: `void f(int*)` called with an `int[4]` argument
    // is a perfect match, not an inheritance conversion.
    if param.is_pointer() && param.pointer_level == 1 && !arg.is_pointer() && arg.is_array() && param.type_id == arg.type_id {
        return Compatibility::PerfectMatch;
    }

    if param.pointer_level != arg.pointer_level {
        return Compatibility::Incompatible;
    }

    if param.is_pointer() {
        if param.type_id == arg.type_id {
            return Compatibility::PerfectMatch;
        }
        let param_is_void = arena.get(param.type_id).category == TypeCategory::Void;
        let arg_is_void = arena.get(arg.type_id).category == TypeCategory::Void;
        if param_is_void || arg_is_void {
            return Compatibility::ImplicitCastableInheritance;
        }
        return if arena.get(arg.type_id).derives_from(param.type_id, arena) {
            Compatibility::ImplicitCastableInheritance
        } else {
            Compatibility::Incompatible
        };
    }

    if param.type_id == arg.type_id {
        // A const argument cannot bind to a non-const reference parameter.
        if param.is_reference() && !param.is_const() && arg.is_const() {
            return Compatibility::Incompatible;
        }
        return Compatibility::PerfectMatch;
    }

    let param_type = arena.get(param.type_id);
    let arg_type = arena.get(arg.type_id);

    if param_type.is_builtin() && arg_type.is_builtin() {
        return numeric_compatibility_by_kind(param_type.numeric_kind, arg_type.numeric_kind);
    }

    if arg_type.derives_from(param.type_id, arena) {
        return Compatibility::ImplicitCastableInheritance;
    }

    // Single-argument converting constructor: the first one registered
    // that accepts `arg` wins (see DESIGN.md's Open Question decision).
    for method in &param_type.methods {
        let is_matching_ctor = method.identifier == param_type.identifier && method.parameters.len() == 1;
        if is_matching_ctor && compatibility(&method.parameters[0], arg, arena).is_compatible() {
            return Compatibility::ImplicitConstructable;
        }
    }
    Compatibility::Incompatible
}

fn numeric_compatibility_by_kind(
    param: Option<crate::types::NumericKind>,
    arg: Option<crate::types::NumericKind>,
) -> Compatibility {
    match (param, arg) {
        (Some(p), Some(a)) if p.is_float() && a.is_float() => Compatibility::ImplicitCastableFloat,
        (Some(p), Some(a)) if p.is_float() != a.is_float() => Compatibility::ImplicitCastableIntegerFloat,
        (Some(_), Some(_)) => Compatibility::ImplicitCastableInteger,
        _ => Compatibility::Incompatible,
    }
}

/// Picks the best-matching overload for a call site, implementing the
/// three-pass lookup: perfect-or-implicit matches win outright; if none is
/// compatible, a variadic overload (if any) is used as a fallback.
#[must_use]
pub fn resolve<'a>(overloads: &'a [Function], args: &[TypeUsage], arena: &TypeArena) -> Option<&'a Function> {
    let mut best: Option<(&Function, Compatibility)> = None;
    for candidate in overloads {
        if !candidate.variadic && candidate.parameters.len() != args.len() {
            continue;
        }
        if candidate.variadic && candidate.parameters.len() > args.len() {
            continue;
        }
        let rank = rank_call(candidate, args, arena);
        if let Some(rank) = rank {
            if best.as_ref().is_none_or(|(_, current)| rank < *current) {
                best = Some((candidate, rank));
            }
        }
    }
    best.map(|(function, _)| function)
}

fn rank_call(candidate: &Function, args: &[TypeUsage], arena: &TypeArena) -> Option<Compatibility> {
    let mut worst = Compatibility::PerfectMatch;
    for (param, arg) in candidate.parameters.iter().zip(args.iter()) {
        let rank = compatibility(param, arg, arena);
        if !rank.is_compatible() {
            return None;
        }
        worst = worst.max(rank);
    }
    Some(worst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::Function;
    use crate::ident::IdentifierTable;
    use crate::types::{TypeArena, TypeCategory};
    use proptest::prelude::*;

    fn int_usage(arena: &mut TypeArena, table: &IdentifierTable) -> TypeUsage {
        let id = arena.insert(|id| crate::types::Type::new(id, table.intern("int"), TypeCategory::BuiltIn, 4, 4));
        TypeUsage::of(id)
    }

    #[test]
    fn exact_arity_and_type_is_perfect_match() {
        let table = IdentifierTable::new();
        let mut arena = TypeArena::new();
        let int_ty = int_usage(&mut arena, &table);
        let overload = Function {
            identifier: table.intern("f"),
            return_usage: int_ty,
            parameters: vec![int_ty],
            variadic: false,
            trampoline: None,
        };
        let resolved = resolve(std::slice::from_ref(&overload), &[int_ty], &arena);
        assert!(resolved.is_some());
    }

    #[test]
    fn mismatched_arity_is_rejected() {
        let table = IdentifierTable::new();
        let mut arena = TypeArena::new();
        let int_ty = int_usage(&mut arena, &table);
        let overload = Function {
            identifier: table.intern("f"),
            return_usage: int_ty,
            parameters: vec![int_ty, int_ty],
            variadic: false,
            trampoline: None,
        };
        let resolved = resolve(std::slice::from_ref(&overload), &[int_ty], &arena);
        assert!(resolved.is_none());
    }

    proptest! {
        #[test]
        fn a_usage_is_always_a_perfect_match_for_itself(arity in 0usize..4) {
            let table = IdentifierTable::new();
            let mut arena = TypeArena::new();
            let int_ty = int_usage(&mut arena, &table);
            prop_assert_eq!(compatibility(&int_ty, &int_ty, &arena), Compatibility::PerfectMatch);
            let args = vec![int_ty; arity];
            let overload = Function {
                identifier: table.intern("f"),
                return_usage: int_ty,
                parameters: vec![int_ty; arity],
                variadic: false,
                trampoline: None,
            };
            prop_assert!(resolve(std::slice::from_ref(&overload), &args, &arena).is_some());
        }

        #[test]
        fn arity_other_than_the_declared_count_never_resolves(extra in 1usize..4) {
            let table = IdentifierTable::new();
            let mut arena = TypeArena::new();
            let int_ty = int_usage(&mut arena, &table);
            let overload = Function {
                identifier: table.intern("f"),
                return_usage: int_ty,
                parameters: vec![int_ty],
                variadic: false,
                trampoline: None,
            };
            let args = vec![int_ty; 1 + extra];
            prop_assert!(resolve(std::slice::from_ref(&overload), &args, &arena).is_none());
        }
    }
}
