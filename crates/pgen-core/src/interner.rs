//! Append-only string-literal table.
//!
//! `spec.md` §3 describes the interned-string table as process-wide; §5
//! restates it as append-only with a single-writer discipline during
//! grammar-class definition, read-only (and freely shared) afterwards.
//! We scope it per [`StrInterner`] instance instead of as a real global —
//! `pgen-grammar` owns one per compiled grammar and hands out `Rc` clones
//! to every `ParserInstance`, which is the "explicit registry instead of
//! a global singleton" rewrite called for in Design Notes §9.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Default)]
struct Inner {
    strings: Vec<Rc<str>>,
    by_value: HashMap<Rc<str>, u32>,
}

/// Append-only string interner. Cheaply clonable (`Rc`-shared inner table);
/// clones observe each other's insertions.
#[derive(Debug, Clone, Default)]
pub struct StrInterner {
    inner: Rc<RefCell<Inner>>,
}

impl StrInterner {
    pub fn new() -> Self {
        StrInterner::default()
    }

    /// Intern `s`, returning its stable 32-bit id. Re-interning the same
    /// bytes returns the same id.
    pub fn intern(&self, s: &str) -> u32 {
        let mut inner = self.inner.borrow_mut();
        if let Some(&id) = inner.by_value.get(s) {
            return id;
        }
        let id = inner.strings.len() as u32;
        let rc: Rc<str> = Rc::from(s);
        inner.strings.push(rc.clone());
        inner.by_value.insert(rc, id);
        id
    }

    /// Look up the text for a previously interned id. Panics if `id` was
    /// never interned through this table — a broken invariant in any
    /// compiled bytecode program, not a recoverable user error.
    pub fn get(&self, id: u32) -> Rc<str> {
        let inner = self.inner.borrow();
        inner
            .strings
            .get(id as usize)
            .unwrap_or_else(|| panic!("interner: id {id} was never interned"))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reinterning_returns_same_id() {
        let interner = StrInterner::new();
        let a = interner.intern("hello");
        let b = interner.intern("hello");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_strings_get_distinct_ids() {
        let interner = StrInterner::new();
        let a = interner.intern("a");
        let b = interner.intern("b");
        assert_ne!(a, b);
    }

    #[test]
    fn round_trips_text() {
        let interner = StrInterner::new();
        let id = interner.intern("Identifier");
        assert_eq!(&*interner.get(id), "Identifier");
    }

    #[test]
    fn clones_share_state() {
        let interner = StrInterner::new();
        let clone = interner.clone();
        let id = interner.intern("shared");
        assert_eq!(&*clone.get(id), "shared");
    }
}
