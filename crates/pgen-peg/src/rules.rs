//! Rule entry-point table, mirroring `pgen-lex::context::ContextTable`.

use std::collections::HashMap;
use std::rc::Rc;

use crate::opcode::RuleId;

#[derive(Debug, Clone)]
pub struct RuleEntry {
    pub id: RuleId,
    pub name: Rc<str>,
    pub entry: u32,
}

#[derive(Debug, Default)]
pub struct RuleTable {
    entries: Vec<RuleEntry>,
    by_name: HashMap<Rc<str>, RuleId>,
}

impl RuleTable {
    pub fn new() -> Self {
        RuleTable::default()
    }

    pub fn push(&mut self, entry: RuleEntry) {
        self.by_name.insert(entry.name.clone(), entry.id);
        self.entries.push(entry);
    }

    pub fn get(&self, id: RuleId) -> &RuleEntry {
        &self.entries[id.0 as usize]
    }

    pub fn find(&self, name: &str) -> Option<RuleId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
