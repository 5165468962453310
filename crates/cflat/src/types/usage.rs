//! `TypeUsage`: a type reference as it appears at a use site — base type
//! plus pointer level, array extent, const-ness and reference-ness.

use super::{TypeArena, TypeId};

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UsageFlags: u8 {
        const CONST          = 0b0001;
        const CONST_POINTER  = 0b0010;
        const REFERENCE      = 0b0100;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TypeUsage {
    pub type_id: TypeId,
    pub pointer_level: u8,
    pub array_size: u32,
    pub flags: UsageFlags,
}

impl TypeUsage {
    #[must_use]
    pub fn of(type_id: TypeId) -> Self {
        Self { type_id, pointer_level: 0, array_size: 1, flags: UsageFlags::empty() }
    }

    #[must_use]
    pub const fn is_pointer(&self) -> bool {
        self.pointer_level > 0
    }

    #[must_use]
    pub const fn is_reference(&self) -> bool {
        self.flags.contains(UsageFlags::REFERENCE)
    }

    #[must_use]
    pub const fn is_array(&self) -> bool {
        self.array_size > 1
    }

    #[must_use]
    pub const fn is_const(&self) -> bool {
        self.flags.contains(UsageFlags::CONST)
    }

    #[must_use]
    pub fn as_pointer(mut self) -> Self {
        self.pointer_level += 1;
        self
    }

    #[must_use]
    pub fn as_reference(mut self) -> Self {
        self.flags.insert(UsageFlags::REFERENCE);
        self
    }

    #[must_use]
    pub fn as_array(mut self, size: u32) -> Self {
        self.array_size = size.max(1);
        self
    }

    #[must_use]
    pub fn as_const(mut self) -> Self {
        self.flags.insert(UsageFlags::CONST);
        self
    }

    /// Size in bytes of a single storage slot holding this usage: pointer
    /// width for any pointer level, otherwise the base type's size, times
    /// the array extent.
    #[must_use]
    pub fn size(&self, arena: &TypeArena) -> u32 {
        let element = if self.is_pointer() { std::mem::size_of::<usize>() as u32 } else { arena.get(self.type_id).size };
        element * self.array_size
    }
}

impl PartialEq for TypeUsage {
    /// Two usages are equal iff base type, pointer level, array size and
    /// reference flag all match. `const`-ness is intentionally excluded:
    /// it does not change storage layout or the set of values that fit.
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
            && self.pointer_level == other.pointer_level
            && self.array_size == other.array_size
            && self.is_reference() == other.is_reference()
    }
}

impl Eq for TypeUsage {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TypeCategory, TypeId};

    fn dummy_id() -> TypeId {
        TypeId(0)
    }

    #[test]
    fn const_does_not_affect_equality() {
        let a = TypeUsage::of(dummy_id());
        let b = TypeUsage::of(dummy_id()).as_const();
        assert_eq!(a, b);
    }

    #[test]
    fn pointer_level_affects_equality() {
        let a = TypeUsage::of(dummy_id());
        let b = TypeUsage::of(dummy_id()).as_pointer();
        assert_ne!(a, b);
    }

    #[test]
    fn category_is_unused_by_equality_but_stored() {
        let _ = TypeCategory::Void;
    }
}
