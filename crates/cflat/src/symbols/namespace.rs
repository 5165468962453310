//! The namespace tree: `::`-qualified lookup with parent fallback and
//! using-directives. Generalizes the teacher's `get_or_create_namespace`
//! (`process/namespace.rs`) from a flat, fixed-capacity table to a
//! `Vec`-backed arena with explicit parent links, since a namespace tree
//! has unbounded depth in a hosted engine.

use super::{FunctionsHolder, InstancesHolder, TypesHolder};
use crate::ident::{Identifier, IdentifierTable, split_first_separator};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NamespaceId(pub(crate) u32);

pub struct Namespace {
    pub id: NamespaceId,
    pub identifier: Identifier,
    pub parent: Option<NamespaceId>,
    pub children: HashMap<u32, NamespaceId>,
    pub using_directives: Vec<NamespaceId>,
    pub types: TypesHolder,
    pub functions: FunctionsHolder,
    pub instances: InstancesHolder,
}

pub struct NamespaceArena {
    namespaces: Vec<Namespace>,
    global: NamespaceId,
}

impl NamespaceArena {
    #[must_use]
    pub fn new(table: &IdentifierTable) -> Self {
        let global_name = table.intern("");
        let global = Namespace {
            id: NamespaceId(0),
            identifier: global_name,
            parent: None,
            children: HashMap::new(),
            using_directives: Vec::new(),
            types: TypesHolder::default(),
            functions: FunctionsHolder::default(),
            instances: InstancesHolder::default(),
        };
        Self { namespaces: vec![global], global: NamespaceId(0) }
    }

    #[must_use]
    pub fn global(&self) -> NamespaceId {
        self.global
    }

    #[must_use]
    pub fn get(&self, id: NamespaceId) -> &Namespace {
        &self.namespaces[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: NamespaceId) -> &mut Namespace {
        &mut self.namespaces[id.0 as usize]
    }

    /// Finds the direct child of `parent` named `segment`, without creating
    /// it.
    #[must_use]
    pub fn find_child(&self, parent: NamespaceId, segment: &Identifier) -> Option<NamespaceId> {
        self.get(parent).children.get(&segment.hash()).copied()
    }

    /// Finds or creates the direct child of `parent` named `segment`.
    pub fn get_or_create_child(&mut self, parent: NamespaceId, segment: Identifier) -> NamespaceId {
        if let Some(existing) = self.find_child(parent, &segment) {
            return existing;
        }
        let id = NamespaceId(self.namespaces.len() as u32);
        self.namespaces.push(Namespace {
            id,
            identifier: segment.clone(),
            parent: Some(parent),
            children: HashMap::new(),
            using_directives: Vec::new(),
            types: TypesHolder::default(),
            functions: FunctionsHolder::default(),
            instances: InstancesHolder::default(),
        });
        self.get_mut(parent).children.insert(segment.hash(), id);
        id
    }

    /// Resolves (and creates any missing segment of) a `::`-qualified path
    /// starting from `start`, e.g. `"Foo::Bar"` creates/returns `Bar` nested
    /// under `Foo` nested under `start`.
    pub fn request_namespace(&mut self, start: NamespaceId, qualified: &str, table: &IdentifierTable) -> NamespaceId {
        let mut current = start;
        let mut rest = qualified;
        loop {
            match split_first_separator(rest) {
                Some((segment, remainder)) => {
                    current = self.get_or_create_child(current, table.intern(segment));
                    rest = remainder;
                }
                None => {
                    if rest.is_empty() {
                        return current;
                    }
                    return self.get_or_create_child(current, table.intern(rest));
                }
            }
        }
    }

    /// Resolves a `::`-qualified path without creating missing segments.
    #[must_use]
    pub fn find_namespace(&self, start: NamespaceId, qualified: &str, table: &IdentifierTable) -> Option<NamespaceId> {
        let mut current = start;
        let mut rest = qualified;
        loop {
            if rest.is_empty() {
                return Some(current);
            }
            let (segment, remainder) = split_first_separator(rest).unwrap_or((rest, ""));
            current = self.find_child(current, &table.intern(segment))?;
            rest = remainder;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_creates_missing_segments_and_is_idempotent() {
        let table = IdentifierTable::new();
        let mut arena = NamespaceArena::new(&table);
        let a = arena.request_namespace(arena.global(), "Foo::Bar", &table);
        let b = arena.request_namespace(arena.global(), "Foo::Bar", &table);
        assert_eq!(a, b);
        assert!(arena.find_namespace(arena.global(), "Foo::Bar", &table).is_some());
        assert!(arena.find_namespace(arena.global(), "Foo::Baz", &table).is_none());
    }
}
