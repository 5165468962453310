//! Symbol containers: the hash-keyed collections every namespace and every
//! struct/class carries for its own types, overload sets and instances.
//!
//! Grounded on the teacher's `register_namespace`/`find_namespace`
//! (`process/namespace.rs`): "look up by key, update in place if present,
//! append otherwise" is the same update-or-append discipline used here for
//! [`TypesHolder`], generalized from the teacher's fixed-size linear table
//! to a growable `HashMap` since the host is not memory-constrained.

pub mod namespace;

pub use namespace::{Namespace, NamespaceArena, NamespaceId};

use crate::ident::Identifier;
use crate::types::{TypeId, TypeUsage};
use crate::value::{Trampoline, Value};
use std::collections::HashMap;

/// A type alias: `using Name = Usage;` or a template-generated alias.
#[derive(Debug, Clone)]
pub struct TypeAlias {
    pub identifier: Identifier,
    pub usage: TypeUsage,
}

#[derive(Default)]
pub struct TypesHolder {
    types: HashMap<u32, TypeId>,
    aliases: HashMap<u32, TypeAlias>,
}

impl TypesHolder {
    pub fn register(&mut self, identifier: &Identifier, type_id: TypeId) {
        self.types.insert(identifier.hash(), type_id);
    }

    #[must_use]
    pub fn get(&self, identifier: &Identifier) -> Option<TypeId> {
        self.types.get(&identifier.hash()).copied()
    }

    pub fn register_alias(&mut self, alias: TypeAlias) {
        self.aliases.insert(alias.identifier.hash(), alias);
    }

    #[must_use]
    pub fn get_alias(&self, identifier: &Identifier) -> Option<&TypeAlias> {
        self.aliases.get(&identifier.hash())
    }
}

/// A single overload: parameter usages plus the trampoline that implements
/// it. Script-defined functions fill `trampoline` once their body has been
/// compiled into an evaluator closure.
#[derive(Clone)]
pub struct Function {
    pub identifier: Identifier,
    pub return_usage: TypeUsage,
    pub parameters: Vec<TypeUsage>,
    pub variadic: bool,
    pub trampoline: Option<Trampoline>,
}

#[derive(Default)]
pub struct FunctionsHolder {
    overloads: HashMap<u32, Vec<Function>>,
}

impl FunctionsHolder {
    pub fn register(&mut self, function: Function) {
        self.overloads.entry(function.identifier.hash()).or_default().push(function);
    }

    #[must_use]
    pub fn overloads(&self, identifier: &Identifier) -> &[Function] {
        self.overloads.get(&identifier.hash()).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn contains(&self, identifier: &Identifier) -> bool {
        self.overloads.contains_key(&identifier.hash())
    }
}

/// Flags describing how an [`Instance`] was introduced, controlling release
/// order and whether the evaluator runs its destructor on scope exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceKind {
    Local,
    Parameter,
    Reference,
    Static,
}

pub struct Instance {
    pub identifier: Identifier,
    pub value: Value,
    pub scope_level: u32,
    pub kind: InstanceKind,
}

/// Ordered list of live instances. Lookups scan from the end so a more
/// recently declared instance shadows an earlier one with the same name —
/// the same rule that lets a block's local variable hide an outer one.
#[derive(Default)]
pub struct InstancesHolder {
    instances: Vec<Instance>,
}

impl InstancesHolder {
    pub fn push(&mut self, instance: Instance) {
        self.instances.push(instance);
    }

    #[must_use]
    pub fn find(&self, identifier: &Identifier) -> Option<&Instance> {
        self.instances.iter().rev().find(|instance| &instance.identifier == identifier)
    }

    pub fn find_mut(&mut self, identifier: &Identifier) -> Option<&mut Instance> {
        self.instances.iter_mut().rev().find(|instance| &instance.identifier == identifier)
    }

    /// Removes every instance at or above `scope_level`, returning them in
    /// reverse-declaration order so callers can run destructors LIFO before
    /// releasing the backing stack storage.
    pub fn release(&mut self, scope_level: u32) -> Vec<Instance> {
        let split_at = self.instances.iter().position(|instance| instance.scope_level >= scope_level);
        match split_at {
            Some(index) => {
                let mut released = self.instances.split_off(index);
                released.reverse();
                released
            }
            None => Vec::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Drops every instance for which `keep` returns `false`. Used by
    /// `reset_statics` to clear script-seeded globals while leaving
    /// host-registered (`Static`) instances in place.
    pub fn retain(&mut self, keep: impl FnMut(&Instance) -> bool) {
        self.instances.retain(keep);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::IdentifierTable;
    use crate::types::{TypeCategory, TypeUsage};

    #[test]
    fn later_instance_shadows_earlier_one() {
        let table = IdentifierTable::new();
        let name = table.intern("x");
        let usage = TypeUsage::of(TypeId(0));
        let mut holder = InstancesHolder::default();
        holder.push(Instance {
            identifier: name.clone(),
            value: Value::uninitialised(usage),
            scope_level: 0,
            kind: InstanceKind::Local,
        });
        holder.push(Instance {
            identifier: name.clone(),
            value: Value::uninitialised(usage),
            scope_level: 1,
            kind: InstanceKind::Local,
        });
        assert_eq!(holder.find(&name).unwrap().scope_level, 1);
    }

    #[test]
    fn release_pops_in_lifo_order() {
        let table = IdentifierTable::new();
        let usage = TypeUsage::of(TypeId(0));
        let mut holder = InstancesHolder::default();
        for (level, name) in [(0, "a"), (1, "b"), (1, "c")] {
            holder.push(Instance {
                identifier: table.intern(name),
                value: Value::uninitialised(usage),
                scope_level: level,
                kind: InstanceKind::Local,
            });
        }
        let released = holder.release(1);
        let names: Vec<_> = released.iter().map(|i| i.identifier.as_str().to_owned()).collect();
        assert_eq!(names, vec!["c", "b"]);
        assert_eq!(holder.len(), 1);
        let _ = TypeCategory::Void;
    }
}
