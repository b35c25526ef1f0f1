//! Compiled context metadata: entry offset into the shared op stream plus
//! the `begin`/`end` hooks, which run outside the main op stream (see
//! `crate::opcode` module doc).

use std::collections::HashMap;
use std::rc::Rc;

use pgen_callback::Op as CallbackOp;

use crate::opcode::ContextId;

#[derive(Debug, Clone)]
pub struct ContextDef {
    pub id: ContextId,
    pub name: Rc<str>,
    pub entry: u32,
    pub vars_size: u32,
    pub begin: Option<Rc<[CallbackOp]>>,
    pub end: Option<Rc<[CallbackOp]>>,
}

#[derive(Debug, Default)]
pub struct ContextTable {
    defs: Vec<ContextDef>,
    by_name: HashMap<Rc<str>, ContextId>,
}

impl ContextTable {
    pub fn new() -> Self {
        ContextTable::default()
    }

    pub fn push(&mut self, def: ContextDef) {
        self.by_name.insert(def.name.clone(), def.id);
        self.defs.push(def);
    }

    pub fn get(&self, id: ContextId) -> &ContextDef {
        &self.defs[id.0 as usize]
    }

    pub fn find(&self, name: &str) -> Option<ContextId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}
