//! Value representation and the bump-allocated stack that backs local
//! storage. Grounded on the teacher's `Heap` bump allocator
//! (`heap/mod.rs`, growing-downward, `base`/`ptr`/`limit`) and its tagged
//! `Value` enum (`value/mod.rs`), re-purposed from a VM word to a byte-buffer
//! classified by where it lives: uninitialised, stack, heap, or external to
//! the engine entirely.

mod stack;

pub use stack::{EnvironmentStack, StackSlot};

use crate::diagnostics::RuntimeErrorKind;
use crate::eval::EvalContext;
use crate::types::TypeUsage;
use std::rc::Rc;

/// Host- or script-callable entry point. Every function, method and
/// constructor — whether implemented in Rust or in script — is reached
/// through this single calling convention: take the already-evaluated
/// argument values, write the result into `out_return`, report failure by
/// `Err`.
pub type Trampoline = Rc<dyn Fn(&[Value], &mut Value, &mut EvalContext) -> Result<(), RuntimeErrorKind>>;

/// Where a [`Value`]'s bytes physically live.
#[derive(Debug)]
pub enum Storage {
    /// Declared but never assigned; reading is a compile-time error, never
    /// a runtime one (the compiler rejects reads of uninitialised storage
    /// before the evaluator ever sees them).
    Uninitialised,
    /// Bytes live inside an [`EnvironmentStack`] slot, released in LIFO
    /// order when the owning scope exits.
    Stack(StackSlot),
    /// Bytes are owned directly by this `Value` (heap-allocated objects,
    /// temporaries materialized by the evaluator).
    Heap(Box<[u8]>),
    /// Bytes live in host memory this engine does not own; `ptr` aliases
    /// it. Used for references/pointers into host-registered objects.
    External { ptr: *mut u8, len: usize },
}

#[derive(Debug)]
pub struct Value {
    pub usage: TypeUsage,
    pub storage: Storage,
}

impl Value {
    #[must_use]
    pub fn uninitialised(usage: TypeUsage) -> Self {
        Self { usage, storage: Storage::Uninitialised }
    }

    #[must_use]
    pub fn from_heap_bytes(usage: TypeUsage, bytes: Vec<u8>) -> Self {
        Self { usage, storage: Storage::Heap(bytes.into_boxed_slice()) }
    }

    /// Aliases `len` bytes of host memory starting at `ptr`. Safety: the
    /// caller promises `ptr` stays valid and uniquely borrowed by script
    /// code for as long as this `Value` (or any copy derived from it via
    /// reference/pointer semantics) is reachable — the same lifetime
    /// contract the host already accepts by registering the type.
    #[must_use]
    pub fn external(usage: TypeUsage, ptr: *mut u8, len: usize) -> Self {
        Self { usage, storage: Storage::External { ptr, len } }
    }

    #[must_use]
    pub fn is_null_pointer(&self) -> bool {
        self.usage.is_pointer() && self.as_bytes().map(|b| b.iter().all(|byte| *byte == 0)).unwrap_or(true)
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.storage {
            Storage::Uninitialised => None,
            Storage::Stack(slot) => Some(slot.bytes()),
            Storage::Heap(bytes) => Some(bytes),
            Storage::External { ptr, len } => {
                // SAFETY: caller established validity when constructing External.
                Some(unsafe { std::slice::from_raw_parts(*ptr, *len) })
            }
        }
    }

    pub fn as_bytes_mut(&mut self) -> Option<&mut [u8]> {
        match &mut self.storage {
            Storage::Uninitialised => None,
            Storage::Stack(slot) => Some(slot.bytes_mut()),
            Storage::Heap(bytes) => Some(bytes),
            Storage::External { ptr, len } => {
                // SAFETY: caller established validity when constructing External.
                Some(unsafe { std::slice::from_raw_parts_mut(*ptr, *len) })
            }
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        let bytes = self.as_bytes()?;
        match bytes.len() {
            1 => Some(i64::from(bytes[0] as i8)),
            2 => Some(i64::from(i16::from_le_bytes(bytes.try_into().ok()?))),
            4 => Some(i64::from(i32::from_le_bytes(bytes.try_into().ok()?))),
            8 => Some(i64::from_le_bytes(bytes.try_into().ok()?)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        let bytes = self.as_bytes()?;
        match bytes.len() {
            4 => Some(f64::from(f32::from_le_bytes(bytes.try_into().ok()?))),
            8 => Some(f64::from_le_bytes(bytes.try_into().ok()?)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        self.as_bytes().map(|bytes| bytes.iter().any(|byte| *byte != 0))
    }

    pub fn set_from_i64(&mut self, value: i64) {
        let size = self.as_bytes().map_or(8, <[u8]>::len);
        let encoded = value.to_le_bytes();
        if let Some(bytes) = self.as_bytes_mut() {
            bytes.copy_from_slice(&encoded[..size.min(8)]);
        }
    }

    pub fn set_from_f64(&mut self, value: f64) {
        let size = self.as_bytes().map_or(8, <[u8]>::len);
        if let Some(bytes) = self.as_bytes_mut() {
            if size == 4 {
                bytes.copy_from_slice(&(value as f32).to_le_bytes());
            } else {
                bytes.copy_from_slice(&value.to_le_bytes());
            }
        }
    }

    /// Raw pointer to this value's first byte, regardless of storage kind.
    /// Used to build a `this` pointer for method dispatch and to adjust it
    /// across base-class offsets.
    pub fn as_raw_mut_ptr(&mut self) -> Option<*mut u8> {
        match &mut self.storage {
            Storage::Uninitialised => None,
            Storage::Stack(slot) => Some(slot.bytes_mut().as_mut_ptr()),
            Storage::Heap(bytes) => Some(bytes.as_mut_ptr()),
            Storage::External { ptr, .. } => Some(*ptr),
        }
    }

    pub fn assign_from(&mut self, other: &Value) -> Result<(), RuntimeErrorKind> {
        let source = other.as_bytes().ok_or(RuntimeErrorKind::ZeroInitializedObject)?;
        let destination = self.as_bytes_mut().ok_or(RuntimeErrorKind::ZeroInitializedObject)?;
        if source.len() != destination.len() {
            destination.iter_mut().zip(source.iter().chain(std::iter::repeat(&0u8))).for_each(|(d, s)| *d = *s);
        } else {
            destination.copy_from_slice(source);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TypeArena, TypeCategory};
    use proptest::prelude::*;

    fn int_usage(size: u8) -> (TypeArena, TypeUsage) {
        let mut arena = TypeArena::new();
        let table = crate::ident::IdentifierTable::new();
        let id = arena.insert(|id| crate::types::Type::new(id, table.intern("int"), TypeCategory::BuiltIn, u32::from(size), u32::from(size)));
        (arena, TypeUsage::of(id))
    }

    proptest! {
        #[test]
        fn i64_round_trips_through_a_value_at_every_native_width(value: i32) {
            for size in [1u8, 2, 4, 8] {
                let (_, usage) = int_usage(size);
                let mut v = Value::from_heap_bytes(usage, vec![0u8; size as usize]);
                let truncated = match size {
                    1 => i64::from(value as i8),
                    2 => i64::from(value as i16),
                    4 => i64::from(value),
                    _ => i64::from(value),
                };
                v.set_from_i64(truncated);
                prop_assert_eq!(v.as_i64(), Some(truncated));
            }
        }

        #[test]
        fn f64_round_trips_through_an_eight_byte_value(value: f64) {
            prop_assume!(value.is_finite());
            let (_, usage) = int_usage(8);
            let mut v = Value::from_heap_bytes(usage, vec![0u8; 8]);
            v.set_from_f64(value);
            prop_assert_eq!(v.as_f64(), Some(value));
        }

        #[test]
        fn assign_from_copies_exactly_the_destination_byte_count(a: i32, b: i32) {
            let (_, usage) = int_usage(4);
            let mut dest = Value::from_heap_bytes(usage, vec![0u8; 4]);
            let mut src = Value::from_heap_bytes(usage, vec![0u8; 4]);
            dest.set_from_i64(i64::from(a));
            src.set_from_i64(i64::from(b));
            dest.assign_from(&src).unwrap();
            prop_assert_eq!(dest.as_i64(), Some(i64::from(b)));
        }
    }

    #[test]
    fn is_null_pointer_is_true_for_all_zero_bytes() {
        let (_, base) = int_usage(8);
        let pointer_usage = base.as_pointer();
        let v = Value::from_heap_bytes(pointer_usage, vec![0u8; 8]);
        assert!(v.is_null_pointer());
    }
}
