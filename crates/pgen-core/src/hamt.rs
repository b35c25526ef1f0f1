//! Persistent HAMT map (`spec.md` §4.2.2): branch factor 64 (6-bit hash
//! fragments), collision arrays ("cola") at the maximum trie level.
//!
//! Keys are `Value`s hashed with [`crate::hasher::hash_bytes`] over a
//! stable byte encoding of `value_hash()` — the source hashes the tagged
//! word directly and dispatches to a klass `hash` slot for heap values;
//! here `Value::value_hash` already is that dispatch (see `value.rs`).

use crate::hasher::hash_bytes;
use crate::value::Value;
use std::rc::Rc;

const FRAG_BITS: u32 = 6;
const FRAG_MASK: u64 = (1 << FRAG_BITS) - 1;
/// `(64 / 6) * 6 - 6`, per `spec.md` §3 "Persistent map".
const MAX_LEVEL: u32 = (64 / FRAG_BITS) * FRAG_BITS - FRAG_BITS;

fn frag(hash: u64, level: u32) -> u64 {
    (hash >> level) & FRAG_MASK
}

#[derive(Clone)]
enum Slot {
    Kv(Value, Value),
    Node(Rc<MapNode>),
    Cola(Rc<Vec<(Value, Value)>>),
}

#[derive(Clone)]
struct MapNode {
    /// Bit `i` set means `slots[popcount(bitmap & ((1<<i)-1))]` is
    /// occupied by fragment `i`.
    bitmap: u64,
    slots: Vec<Slot>,
}

impl MapNode {
    fn empty() -> Self {
        MapNode {
            bitmap: 0,
            slots: Vec::new(),
        }
    }

    fn slot_index(&self, f: u64) -> usize {
        (self.bitmap & ((1u64 << f) - 1)).count_ones() as usize
    }

    fn get_slot(&self, f: u64) -> Option<&Slot> {
        if self.bitmap & (1 << f) == 0 {
            None
        } else {
            Some(&self.slots[self.slot_index(f)])
        }
    }

    fn with_slot(&self, f: u64, slot: Slot) -> MapNode {
        let idx = self.slot_index(f);
        let mut slots = self.slots.clone();
        if self.bitmap & (1 << f) == 0 {
            slots.insert(idx, slot);
        } else {
            slots[idx] = slot;
        }
        MapNode {
            bitmap: self.bitmap | (1 << f),
            slots,
        }
    }

    fn without_slot(&self, f: u64) -> MapNode {
        if self.bitmap & (1 << f) == 0 {
            return self.clone();
        }
        let idx = self.slot_index(f);
        let mut slots = self.slots.clone();
        slots.remove(idx);
        MapNode {
            bitmap: self.bitmap & !(1 << f),
            slots,
        }
    }
}

fn find_rec(node: &MapNode, hash: u64, level: u32, key: &Value) -> Option<Value> {
    let f = frag(hash, level);
    match node.get_slot(f)? {
        Slot::Kv(k, v) => {
            if k.value_eq(key) {
                Some(v.clone())
            } else {
                None
            }
        }
        Slot::Node(child) => find_rec(child, hash, level + FRAG_BITS, key),
        Slot::Cola(entries) => entries
            .iter()
            .find(|(k, _)| k.value_eq(key))
            .map(|(_, v)| v.clone()),
    }
}

/// Returns `(new_node, grew)` — `grew` is `true` if this insert added a
/// new key rather than replacing an existing value.
fn insert_rec(node: &MapNode, hash: u64, level: u32, key: Value, val: Value) -> (MapNode, bool) {
    let f = frag(hash, level);
    match node.get_slot(f) {
        None => (node.with_slot(f, Slot::Kv(key, val)), true),
        Some(Slot::Kv(ek, ev)) => {
            if ek.value_eq(&key) {
                (node.with_slot(f, Slot::Kv(key, val)), false)
            } else if level >= MAX_LEVEL {
                let cola = Rc::new(vec![(ek.clone(), ev.clone()), (key, val)]);
                (node.with_slot(f, Slot::Cola(cola)), true)
            } else {
                // Build a fresh child holding both keys, recursing until
                // their fragments diverge.
                let mut child = MapNode::empty();
                let (c1, _) = insert_rec(&child, hash_of(ek), level + FRAG_BITS, ek.clone(), ev.clone());
                child = c1;
                let (c2, grew) = insert_rec(&child, hash, level + FRAG_BITS, key, val);
                (node.with_slot(f, Slot::Node(Rc::new(c2))), grew)
            }
        }
        Some(Slot::Node(child)) => {
            let (new_child, grew) = insert_rec(child, hash, level + FRAG_BITS, key, val);
            (node.with_slot(f, Slot::Node(Rc::new(new_child))), grew)
        }
        Some(Slot::Cola(entries)) => {
            let mut entries = (**entries).clone();
            let grew = if let Some(pos) = entries.iter().position(|(k, _)| k.value_eq(&key)) {
                entries[pos] = (key, val);
                false
            } else {
                entries.push((key, val));
                true
            };
            (node.with_slot(f, Slot::Cola(Rc::new(entries))), grew)
        }
    }
}

fn hash_of(key: &Value) -> u64 {
    hash_bytes(&key.value_hash().to_le_bytes())
}

/// Returns `(new_node, removed)`.
fn remove_rec(node: &MapNode, hash: u64, level: u32, key: &Value) -> (MapNode, bool) {
    let f = frag(hash, level);
    match node.get_slot(f) {
        None => (node.clone(), false),
        Some(Slot::Kv(ek, _)) => {
            if ek.value_eq(key) {
                (node.without_slot(f), true)
            } else {
                (node.clone(), false)
            }
        }
        Some(Slot::Node(child)) => {
            let (new_child, removed) = remove_rec(child, hash, level + FRAG_BITS, key);
            if !removed {
                return (node.clone(), false);
            }
            if new_child.bitmap == 0 {
                (node.without_slot(f), true)
            } else {
                (node.with_slot(f, Slot::Node(Rc::new(new_child))), true)
            }
        }
        Some(Slot::Cola(entries)) => {
            if let Some(pos) = entries.iter().position(|(k, _)| k.value_eq(key)) {
                let mut entries = (**entries).clone();
                entries.remove(pos);
                if entries.len() == 1 {
                    let (k, v) = entries.into_iter().next().unwrap();
                    (node.with_slot(f, Slot::Kv(k, v)), true)
                } else {
                    (node.with_slot(f, Slot::Cola(Rc::new(entries))), true)
                }
            } else {
                (node.clone(), false)
            }
        }
    }
}

/// Control returned from an [`PersistentMap::each`] callback.
pub enum EachControl {
    Next,
    Break,
}

fn each_rec(node: &MapNode, f: &mut dyn FnMut(&Value, &Value) -> EachControl) -> bool {
    for slot in &node.slots {
        let keep_going = match slot {
            Slot::Kv(k, v) => matches!(f(k, v), EachControl::Next),
            Slot::Node(child) => each_rec(child, f),
            Slot::Cola(entries) => {
                let mut cont = true;
                for (k, v) in entries.iter() {
                    if matches!(f(k, v), EachControl::Break) {
                        cont = false;
                        break;
                    }
                }
                cont
            }
        };
        if !keep_going {
            return false;
        }
    }
    true
}

/// A persistent HAMT map. Clone is O(1).
#[derive(Clone)]
pub struct PersistentMap {
    size: usize,
    root: Rc<MapNode>,
}

impl PersistentMap {
    pub fn empty() -> Self {
        PersistentMap {
            size: 0,
            root: Rc::new(MapNode::empty()),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn find(&self, key: &Value) -> Option<Value> {
        find_rec(&self.root, hash_of(key), 0, key)
    }

    pub fn insert(&self, key: Value, val: Value) -> PersistentMap {
        let hash = hash_of(&key);
        let (new_root, grew) = insert_rec(&self.root, hash, 0, key, val);
        PersistentMap {
            size: if grew { self.size + 1 } else { self.size },
            root: Rc::new(new_root),
        }
    }

    pub fn remove(&self, key: &Value) -> PersistentMap {
        let (new_root, removed) = remove_rec(&self.root, hash_of(key), 0, key);
        PersistentMap {
            size: if removed { self.size - 1 } else { self.size },
            root: Rc::new(new_root),
        }
    }

    /// Depth-first preorder traversal. Stops early if `f` returns `Break`.
    pub fn each(&self, mut f: impl FnMut(&Value, &Value) -> EachControl) {
        each_rec(&self.root, &mut f);
    }

    pub fn to_vec(&self) -> Vec<(Value, Value)> {
        let mut out = Vec::with_capacity(self.size);
        self.each(|k, v| {
            out.push((k.clone(), v.clone()));
            EachControl::Next
        });
        out
    }

    pub fn value_eq(&self, other: &PersistentMap) -> bool {
        if self.size != other.size {
            return false;
        }
        let mut ok = true;
        self.each(|k, v| {
            match other.find(k) {
                Some(ov) if ov.value_eq(v) => {}
                _ => ok = false,
            }
            EachControl::Next
        });
        ok
    }

    pub fn value_hash(&self) -> u64 {
        let mut h = hash_bytes(&self.size.to_le_bytes());
        self.each(|k, v| {
            h ^= k
                .value_hash()
                .wrapping_mul(v.value_hash().wrapping_add(1));
            EachControl::Next
        });
        h
    }
}

impl Default for PersistentMap {
    fn default() -> Self {
        PersistentMap::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_after_insert() {
        let m = PersistentMap::empty().insert(Value::Int(1), Value::Int(100));
        assert_eq!(m.find(&Value::Int(1)), Some(Value::Int(100)));
    }

    #[test]
    fn other_keys_unaffected() {
        let m = PersistentMap::empty()
            .insert(Value::Int(1), Value::Int(100))
            .insert(Value::Int(2), Value::Int(200));
        assert_eq!(m.find(&Value::Int(1)), Some(Value::Int(100)));
        assert_eq!(m.find(&Value::Int(2)), Some(Value::Int(200)));
        assert_eq!(m.find(&Value::Int(3)), None);
    }

    #[test]
    fn size_only_grows_on_new_key() {
        let m = PersistentMap::empty().insert(Value::Int(1), Value::Int(1));
        assert_eq!(m.size(), 1);
        let m2 = m.insert(Value::Int(1), Value::Int(2));
        assert_eq!(m2.size(), 1);
        let m3 = m2.insert(Value::Int(2), Value::Int(2));
        assert_eq!(m3.size(), 2);
    }

    #[test]
    fn remove_existing_shrinks() {
        let m = PersistentMap::empty()
            .insert(Value::Int(1), Value::Int(1))
            .insert(Value::Int(2), Value::Int(2));
        let m2 = m.remove(&Value::Int(1));
        assert_eq!(m2.size(), 1);
        assert_eq!(m2.find(&Value::Int(1)), None);
    }

    #[test]
    fn remove_missing_key_is_noop() {
        let m = PersistentMap::empty().insert(Value::Int(1), Value::Int(1));
        let m2 = m.remove(&Value::Int(99));
        assert_eq!(m2.size(), m.size());
    }

    #[test]
    fn iteration_visits_every_entry_once() {
        let mut m = PersistentMap::empty();
        for i in 0..200i64 {
            m = m.insert(Value::Int(i), Value::Int(i * 2));
        }
        let mut seen = std::collections::HashSet::new();
        m.each(|k, v| {
            if let Value::Int(k) = k {
                assert_eq!(*v, Value::Int(k * 2));
                seen.insert(*k);
            }
            EachControl::Next
        });
        assert_eq!(seen.len(), 200);
    }

    #[test]
    fn survives_many_colliding_inserts() {
        // Force deep trie growth / collisions with many keys.
        let mut m = PersistentMap::empty();
        for i in 0..5000i64 {
            m = m.insert(Value::Int(i), Value::Int(i));
        }
        assert_eq!(m.size(), 5000);
        for i in (0..5000).step_by(97) {
            assert_eq!(m.find(&Value::Int(i)), Some(Value::Int(i)));
        }
    }
}
