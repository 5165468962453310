//! The type model: [`Type`], its arena, members, methods and base classes.
//!
//! Types are allocated into a single [`TypeArena`] owned by the
//! `Environment` and referenced everywhere else by the stable [`TypeId`]
//! handle, the idiomatic-Rust stand-in for the original's raw `Type*`
//! (spec.md §9 design note: "assign stable integer handles instead of
//! pointers so the arena can grow without invalidating existing references").

mod usage;

pub use usage::{TypeUsage, UsageFlags};

use crate::ident::Identifier;
use crate::symbols::{FunctionsHolder, InstancesHolder, TypesHolder};
use crate::value::Trampoline;

/// Stable handle into a [`TypeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub(crate) u32);

/// What kind of entity a [`Type`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Void,
    BuiltIn,
    Enum,
    EnumClass,
    StructOrClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseType {
    pub type_id: TypeId,
    pub offset: u32,
}

#[derive(Debug, Clone)]
pub struct Member {
    pub identifier: Identifier,
    pub usage: TypeUsage,
    pub offset: u32,
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MethodFlags: u8 {
        const STATIC   = 0b0001;
        const VIRTUAL  = 0b0010;
        const CONST    = 0b0100;
        const VARIADIC = 0b1000;
    }
}

/// A callable member. `trampoline` is `None` for methods declared by script
/// code until the evaluator installs a closure body; host-registered
/// methods carry their trampoline from the moment of registration.
#[derive(Clone)]
pub struct Method {
    pub identifier: Identifier,
    pub return_usage: TypeUsage,
    pub parameters: Vec<TypeUsage>,
    pub flags: MethodFlags,
    pub trampoline: Option<Trampoline>,
}

impl Method {
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodFlags::STATIC)
    }

    #[must_use]
    pub fn is_variadic(&self) -> bool {
        self.flags.contains(MethodFlags::VARIADIC)
    }
}

/// A named enumerator value (`enum` and `enum class` alike).
#[derive(Debug, Clone)]
pub struct Enumerator {
    pub identifier: Identifier,
    pub value: i64,
}

/// Distinguishes the built-in numeric families for overload ranking and
/// evaluator arithmetic. `None` for every non-built-in type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    Bool,
    SignedInteger,
    UnsignedInteger,
    FloatingPoint,
}

impl NumericKind {
    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, NumericKind::FloatingPoint)
    }
}

pub struct Type {
    pub id: TypeId,
    pub identifier: Identifier,
    pub category: TypeCategory,
    pub size: u32,
    pub alignment: u32,
    pub numeric_kind: Option<NumericKind>,
    pub bases: Vec<BaseType>,
    pub members: Vec<Member>,
    pub methods: Vec<Method>,
    pub enumerators: Vec<Enumerator>,
    pub default_constructor: Option<usize>,
    pub copy_constructor: Option<usize>,
    pub destructor: Option<usize>,
    pub static_types: TypesHolder,
    pub static_functions: FunctionsHolder,
    pub static_instances: InstancesHolder,
    /// Non-empty only for a template instantiation, e.g. `Vector<int>`
    /// carries `[int]` here. Scripts can only name an already-registered
    /// instantiation (see `Environment::register_template_type`); they never
    /// declare the template itself.
    pub template_args: Vec<TypeUsage>,
}

impl Type {
    #[must_use]
    pub fn new(id: TypeId, identifier: Identifier, category: TypeCategory, size: u32, alignment: u32) -> Self {
        Self {
            id,
            identifier,
            category,
            size,
            alignment,
            numeric_kind: None,
            bases: Vec::new(),
            members: Vec::new(),
            methods: Vec::new(),
            enumerators: Vec::new(),
            default_constructor: None,
            copy_constructor: None,
            destructor: None,
            static_types: TypesHolder::default(),
            static_functions: FunctionsHolder::default(),
            static_instances: InstancesHolder::default(),
            template_args: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_numeric_kind(mut self, kind: NumericKind) -> Self {
        self.numeric_kind = Some(kind);
        self
    }

    #[must_use]
    pub fn is_builtin(&self) -> bool {
        matches!(self.category, TypeCategory::BuiltIn)
    }

    #[must_use]
    pub fn is_template_instance(&self) -> bool {
        !self.template_args.is_empty()
    }

    /// Resolves the cumulative byte offset of `base` relative to `self`,
    /// walking through intermediate bases when `base` is not a direct
    /// parent. Returns `None` when `base` is not an ancestor of `self`.
    #[must_use]
    pub fn offset_of_base(&self, base: TypeId, arena: &TypeArena) -> Option<u32> {
        if base == self.id {
            return Some(0);
        }
        for direct in &self.bases {
            if direct.type_id == base {
                return Some(direct.offset);
            }
            let parent = arena.get(direct.type_id);
            if let Some(nested) = parent.offset_of_base(base, arena) {
                return Some(direct.offset + nested);
            }
        }
        None
    }

    #[must_use]
    pub fn derives_from(&self, base: TypeId, arena: &TypeArena) -> bool {
        self.offset_of_base(base, arena).is_some()
    }

    /// Finds a member by name, searching bases depth-first after the type's
    /// own members (shadowing: a type's own member hides a base's member of
    /// the same name). Returns the member alongside its cumulative offset
    /// from `self`.
    #[must_use]
    pub fn find_member<'a>(&'a self, name: &Identifier, arena: &'a TypeArena) -> Option<(&'a Member, u32)> {
        if let Some(member) = self.members.iter().find(|member| &member.identifier == name) {
            return Some((member, 0));
        }
        for base in &self.bases {
            let parent = arena.get(base.type_id);
            if let Some((member, offset)) = parent.find_member(name, arena) {
                return Some((member, base.offset + offset));
            }
        }
        None
    }

    /// Finds a usable method overload by name among `self`'s own methods
    /// first, then its bases (own methods take priority, matching C++ name
    /// hiding). Each candidate keeps the base offset it was found through so
    /// callers can adjust `this` before invoking the trampoline.
    #[must_use]
    pub fn find_methods<'a>(&'a self, name: &Identifier, arena: &'a TypeArena) -> Vec<(&'a Method, u32)> {
        let own: Vec<_> = self.methods.iter().filter(|m| &m.identifier == name).map(|m| (m, 0)).collect();
        if !own.is_empty() {
            return own;
        }
        for base in &self.bases {
            let parent = arena.get(base.type_id);
            let found = parent.find_methods(name, arena);
            if !found.is_empty() {
                return found.into_iter().map(|(m, off)| (m, off + base.offset)).collect();
            }
        }
        Vec::new()
    }
}

/// Owns every registered [`Type`], indexed by stable [`TypeId`].
#[derive(Default)]
pub struct TypeArena {
    types: Vec<Type>,
    /// Host-registered `(param, arg)` pairs that rank as a perfect overload
    /// match despite being distinct types, e.g. a host "string view" type
    /// accepting a host "string" type without any narrowing conversion.
    perfect_match_pairs: std::collections::HashSet<(TypeId, TypeId)>,
}

impl TypeArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, build: impl FnOnce(TypeId) -> Type) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(build(id));
        id
    }

    #[must_use]
    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: TypeId) -> &mut Type {
        &mut self.types[id.0 as usize]
    }

    pub fn register_perfect_match_pair(&mut self, param: TypeId, arg: TypeId) {
        self.perfect_match_pairs.insert((param, arg));
    }

    #[must_use]
    pub fn is_custom_perfect_match(&self, param: TypeId, arg: TypeId) -> bool {
        self.perfect_match_pairs.contains(&(param, arg))
    }
}

/// Builds the mangled name a template instantiation is registered and
/// resolved under, e.g. `Vector<int*>`. A script can only spell this same
/// name back (`Vector<int*> v;`); it is never able to declare the template
/// that produced it.
#[must_use]
pub fn mangle_template_name(base_name: &str, args: &[TypeUsage], arena: &TypeArena) -> String {
    let parts: Vec<String> = args
        .iter()
        .map(|usage| {
            let base = arena.get(usage.type_id).identifier.as_str().to_owned();
            format!("{base}{}", "*".repeat(usage.pointer_level as usize))
        })
        .collect();
    format!("{base_name}<{}>", parts.join(","))
}

/// Handles for the built-in scalar types every `Environment` registers at
/// construction time, resolved once so the evaluator and overload engine
/// never need to re-intern `"int"`/`"double"`/... by name on a hot path.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinTypes {
    pub void: TypeId,
    pub bool_: TypeId,
    pub char_: TypeId,
    pub short: TypeId,
    pub int: TypeId,
    pub long: TypeId,
    pub unsigned_int: TypeId,
    pub float: TypeId,
    pub double: TypeId,
}

impl BuiltinTypes {
    /// Registers every built-in scalar and returns the resolved handles.
    pub fn bootstrap(arena: &mut TypeArena, table: &crate::ident::IdentifierTable) -> Self {
        let void = arena.insert(|id| Type::new(id, table.intern("void"), TypeCategory::Void, 0, 1));
        let mut scalar = |name: &str, size: u32, kind: NumericKind| {
            arena.insert(|id| Type::new(id, table.intern(name), TypeCategory::BuiltIn, size, size).with_numeric_kind(kind))
        };
        Self {
            void,
            bool_: scalar("bool", 1, NumericKind::Bool),
            char_: scalar("char", 1, NumericKind::SignedInteger),
            short: scalar("short", 2, NumericKind::SignedInteger),
            int: scalar("int", 4, NumericKind::SignedInteger),
            long: scalar("long", 8, NumericKind::SignedInteger),
            unsigned_int: scalar("unsigned", 4, NumericKind::UnsignedInteger),
            float: scalar("float", 4, NumericKind::FloatingPoint),
            double: scalar("double", 8, NumericKind::FloatingPoint),
        }
    }
}
