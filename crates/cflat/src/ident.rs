//! Identifier interning.
//!
//! Every name seen by the tokenizer, the registration API, or the parser
//! passes through an [`IdentifierTable`] once. Interned identifiers are
//! cheap to copy and compare: equality and hashing are defined purely in
//! terms of the 32-bit hash, never the backing string.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// An interned name. `Copy`, `Eq`, `Hash` — all defined on the hash alone.
#[derive(Clone)]
pub struct Identifier {
    hash: u32,
    text: Rc<str>,
}

impl Identifier {
    #[must_use]
    pub fn hash(&self) -> u32 {
        self.hash
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Identifier {}

impl std::hash::Hash for Identifier {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// FNV-1a, 32-bit. Matches the hash family named in the data model: a
/// fast, order-sensitive hash with no cryptographic requirement.
#[must_use]
pub fn fnv1a32(text: &str) -> u32 {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;

    let mut hash = OFFSET_BASIS;
    for byte in text.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// Process-wide-in-effect registry owned by an `Environment`. Append-only:
/// once a name is interned it lives for the lifetime of the table.
#[derive(Default)]
pub struct IdentifierTable {
    arena: RefCell<HashMap<u32, Rc<str>>>,
}

impl IdentifierTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `name`, returning a stable handle. Hash collisions between
    /// distinct strings are not resolved: the first string seen for a
    /// given hash wins and later distinct spellings alias it, matching the
    /// collision policy described for the identifier registry.
    pub fn intern(&self, name: &str) -> Identifier {
        let hash = fnv1a32(name);
        let mut arena = self.arena.borrow_mut();
        let text = arena
            .entry(hash)
            .or_insert_with(|| {
                tracing::trace!(name, hash, "interning new identifier");
                Rc::from(name)
            })
            .clone();
        Identifier { hash, text }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.arena.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Splits a `::`-qualified name at its last separator: `"Foo::Bar::baz"` ->
/// `("Foo::Bar", "baz")`. Returns `None` for unqualified names.
#[must_use]
pub fn split_last_separator(qualified: &str) -> Option<(&str, &str)> {
    qualified.rfind("::").map(|idx| (&qualified[..idx], &qualified[idx + 2..]))
}

/// Splits a `::`-qualified name at its first separator: `"Foo::Bar::baz"` ->
/// `("Foo", "Bar::baz")`. Returns `None` for unqualified names.
#[must_use]
pub fn split_first_separator(qualified: &str) -> Option<(&str, &str)> {
    qualified.find("::").map(|idx| (&qualified[..idx], &qualified[idx + 2..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable_and_aliases_on_equal_text() {
        let table = IdentifierTable::new();
        let a = table.intern("foo");
        let b = table.intern("foo");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "foo");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn distinct_names_hash_differently_in_practice() {
        let table = IdentifierTable::new();
        let a = table.intern("alpha");
        let b = table.intern("beta");
        assert_ne!(a, b);
    }

    #[test]
    fn splits_qualified_names() {
        assert_eq!(split_last_separator("Foo::Bar::baz"), Some(("Foo::Bar", "baz")));
        assert_eq!(split_first_separator("Foo::Bar::baz"), Some(("Foo", "Bar::baz")));
        assert_eq!(split_last_separator("baz"), None);
    }
}
