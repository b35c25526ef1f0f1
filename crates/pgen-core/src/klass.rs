//! Klass registry: runtime type descriptors for user-defined struct klasses.
//!
//! `spec.md` §3 describes a generic klass registry dispatching retain,
//! release, `eq` and `hash` through per-klass function slots, because the
//! source language (C) has no built-in sum type. In Rust the built-in
//! shapes (array, map, dict, cons, token, box) are just [`crate::Value`]
//! variants with inherent `eq`/`hash` impls — see Design Notes §9,
//! "Tagged pointers → typed sum". What's left for a runtime registry is
//! exactly the part no enum variant can express ahead of time: klass ids
//! for the open-ended set of `struct Name(field, ...)` declarations a
//! grammar spec can introduce.

use crate::error::CoreError;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

pub type KlassId = u32;

/// Reserved klass ids, matching the fixed list in `spec.md` §3. Struct
/// klasses a grammar declares are allocated starting at [`FIRST_USER_KLASS`].
pub mod reserved {
    use super::KlassId;

    pub const NIL: KlassId = 1;
    pub const BOOL: KlassId = 2;
    pub const INT: KlassId = 3;
    pub const DOUBLE: KlassId = 4;
    pub const STRING: KlassId = 5;
    pub const METHOD: KlassId = 6;
    pub const LAMBDA: KlassId = 7;
    pub const KLASS: KlassId = 8;
    pub const ARRAY_NODE: KlassId = 9;
    pub const ARRAY: KlassId = 10;
    pub const MAP_NODE: KlassId = 11;
    pub const MAP_COLA: KlassId = 12;
    pub const MAP: KlassId = 13;
    pub const DICT_MAP: KlassId = 14;
    pub const DICT_BUCKET: KlassId = 15;
    pub const DICT: KlassId = 16;
    pub const CONS: KlassId = 17;
    pub const TOKEN: KlassId = 18;
    pub const BOX: KlassId = 19;
}

pub const FIRST_USER_KLASS: KlassId = 64;

/// A struct klass declared by `struct Name(field1, field2, ...)`.
#[derive(Debug, Clone)]
pub struct KlassDef {
    pub id: KlassId,
    pub name: Rc<str>,
    pub parent: Option<KlassId>,
    /// Ordered field names, for positional get/set.
    pub fields: Vec<Rc<str>>,
}

impl KlassDef {
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| &**f == name)
    }
}

#[derive(Debug, Default)]
struct Inner {
    next_id: KlassId,
    by_id: HashMap<KlassId, KlassDef>,
    by_name: HashMap<String, KlassId>,
}

/// Registry of user-defined struct klasses for one compiled grammar.
/// Append-only after grammar compilation (mirrors the interner's
/// single-writer-then-shared lifecycle, §5).
#[derive(Debug, Clone)]
pub struct KlassRegistry {
    inner: Rc<RefCell<Inner>>,
}

impl Default for KlassRegistry {
    fn default() -> Self {
        KlassRegistry {
            inner: Rc::new(RefCell::new(Inner {
                next_id: FIRST_USER_KLASS,
                by_id: HashMap::new(),
                by_name: HashMap::new(),
            })),
        }
    }
}

impl KlassRegistry {
    pub fn new() -> Self {
        KlassRegistry::default()
    }

    /// Define a new struct klass. Errors if the name is already taken by
    /// a differently-shaped struct (re-declaring with the exact same
    /// field list is idempotent, matching `klass_ensure` semantics in
    /// `spec.md` §4.1).
    pub fn define_struct(
        &self,
        name: &str,
        fields: Vec<Rc<str>>,
    ) -> Result<KlassId, CoreError> {
        let mut inner = self.inner.borrow_mut();
        if let Some(&id) = inner.by_name.get(name) {
            let existing = inner.by_id.get(&id).expect("by_name/by_id out of sync");
            if existing.fields == fields {
                return Ok(id);
            }
            return Err(CoreError::DuplicateKlass(name.to_string()));
        }
        let id = inner.next_id;
        inner.next_id += 1;
        inner.by_id.insert(
            id,
            KlassDef {
                id,
                name: Rc::from(name),
                parent: None,
                fields,
            },
        );
        inner.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn find(&self, name: &str) -> Option<KlassId> {
        self.inner.borrow().by_name.get(name).copied()
    }

    pub fn get(&self, id: KlassId) -> Option<KlassDef> {
        self.inner.borrow().by_id.get(&id).cloned()
    }
}

/// A user struct instance: a klass tag plus its ordered fields.
///
/// Fields live behind a `RefCell` because the callback VM constructs a
/// struct incrementally (`NODE_BEG` → repeated `NODE_SET`/`NODE_SETV` →
/// `NODE_END`) before the instance is handed off as an immutable `Value`.
/// Once construction completes nothing mutates it again; we don't bother
/// with a separate "frozen" wrapper type for that discipline, it is
/// enforced by the callback VM, not by the type system.
pub struct StructInstance {
    pub klass: KlassId,
    pub fields: RefCell<Vec<crate::value::Value>>,
}

impl StructInstance {
    pub fn new(klass: KlassId, arity: usize) -> Self {
        StructInstance {
            klass,
            fields: RefCell::new(vec![crate::value::Value::Undef; arity]),
        }
    }

    pub fn get(&self, index: usize) -> Option<crate::value::Value> {
        self.fields.borrow().get(index).cloned()
    }

    pub fn set(&self, index: usize, v: crate::value::Value) {
        self.fields.borrow_mut()[index] = v;
    }

    pub fn len(&self) -> usize {
        self.fields.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for StructInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructInstance")
            .field("klass", &self.klass)
            .field("fields", &self.fields.borrow())
            .finish()
    }
}

impl PartialEq for StructInstance {
    fn eq(&self, other: &Self) -> bool {
        self.klass == other.klass && *self.fields.borrow() == *other.fields.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_struct_allocates_above_reserved_range() {
        let reg = KlassRegistry::new();
        let id = reg.define_struct("Pair", vec![Rc::from("first"), Rc::from("second")]).unwrap();
        assert!(id >= FIRST_USER_KLASS);
    }

    #[test]
    fn redeclaring_same_shape_is_idempotent() {
        let reg = KlassRegistry::new();
        let a = reg
            .define_struct("Pair", vec![Rc::from("first"), Rc::from("second")])
            .unwrap();
        let b = reg
            .define_struct("Pair", vec![Rc::from("first"), Rc::from("second")])
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn redeclaring_different_shape_errors() {
        let reg = KlassRegistry::new();
        reg.define_struct("Pair", vec![Rc::from("first"), Rc::from("second")])
            .unwrap();
        let err = reg.define_struct("Pair", vec![Rc::from("only")]);
        assert!(err.is_err());
    }

    #[test]
    fn struct_instance_get_set() {
        let inst = StructInstance::new(FIRST_USER_KLASS, 2);
        inst.set(0, crate::value::Value::Int(1));
        inst.set(1, crate::value::Value::Int(2));
        assert_eq!(inst.get(0), Some(crate::value::Value::Int(1)));
        assert_eq!(inst.get(1), Some(crate::value::Value::Int(2)));
    }
}
