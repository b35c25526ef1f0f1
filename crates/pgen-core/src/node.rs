//! Arena-allocated AST node shapes (`spec.md` §3 "AST nodes (C3)").
//!
//! Four physical shapes, all allocated out of one [`AstArena`] and
//! identified by a `(context, type)` pair via [`ClassId`]:
//!
//! - [`SyntaxNode`]: fixed-arity `(class, attrs[n])` record.
//! - [`TokenNode`]: `(class, loc, value)`.
//! - [`ConsNode`]: `(head, tail)`, for sequence-valued attrs.
//! - [`WrapperNode`]: `(class, val)`, promoting any `Value` into the node
//!   domain without boxing.
//!
//! Unlike the source, nodes here are built with all attrs known at
//! construction (immutable once allocated) rather than incrementally
//! mutated in place — the grammar-spec parser (`pgen-grammar`) builds
//! each node bottom-up in one pass, so there's no need for the
//! `NODE_BEG`/`NODE_SET`/`NODE_END` incremental-fill discipline that the
//! *callback* bytecode (`pgen-callback`) uses for values it is assembling
//! against a live token stream.

use crate::value::Value;
use bumpalo::Bump;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Identifies a `(context, type)` node class, e.g. `(Lex, LexRule)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub u32);

#[derive(Debug, Clone)]
pub struct NodeClass {
    pub context_name: Rc<str>,
    pub type_name: Rc<str>,
    pub attr_count: usize,
}

/// Registry mapping `(context, type)` names to a stable [`ClassId`].
#[derive(Debug, Default)]
pub struct NodeClassTable {
    classes: RefCell<Vec<NodeClass>>,
    by_name: RefCell<HashMap<(String, String), ClassId>>,
}

impl NodeClassTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure(&self, context_name: &str, type_name: &str, attr_count: usize) -> ClassId {
        let key = (context_name.to_string(), type_name.to_string());
        if let Some(&id) = self.by_name.borrow().get(&key) {
            return id;
        }
        let mut classes = self.classes.borrow_mut();
        let id = ClassId(classes.len() as u32);
        classes.push(NodeClass {
            context_name: Rc::from(context_name),
            type_name: Rc::from(type_name),
            attr_count,
        });
        self.by_name.borrow_mut().insert(key, id);
        id
    }

    pub fn get(&self, id: ClassId) -> NodeClass {
        self.classes.borrow()[id.0 as usize].clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceLoc {
    pub byte_pos: usize,
    pub byte_size: usize,
    pub line: u32,
    pub col: u32,
}

pub type NodeRef<'a> = &'a AstNode<'a>;

#[derive(Debug)]
pub struct SyntaxNode<'a> {
    pub class: ClassId,
    pub attrs: Vec<NodeRef<'a>>,
}

#[derive(Debug)]
pub struct TokenNode {
    pub loc: SourceLoc,
    pub value: Value,
}

#[derive(Debug)]
pub struct ConsNode<'a> {
    pub head: NodeRef<'a>,
    pub tail: NodeRef<'a>,
}

#[derive(Debug)]
pub struct WrapperNode {
    pub val: Value,
}

#[derive(Debug)]
pub enum AstNode<'a> {
    Syntax(SyntaxNode<'a>),
    Token(TokenNode),
    Cons(ConsNode<'a>),
    Wrapper(WrapperNode),
}

impl<'a> AstNode<'a> {
    pub fn as_syntax(&self) -> Option<&SyntaxNode<'a>> {
        match self {
            AstNode::Syntax(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_token(&self) -> Option<&TokenNode> {
        match self {
            AstNode::Token(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_cons(&self) -> Option<&ConsNode<'a>> {
        match self {
            AstNode::Cons(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, AstNode::Wrapper(WrapperNode { val: Value::Nil }))
    }

    /// Walk a cons-spine node into a `Vec` of its elements. Non-cons,
    /// non-nil nodes are returned as a single-element vec.
    pub fn cons_to_vec(&'a self) -> Vec<NodeRef<'a>> {
        let mut out = Vec::new();
        let mut cur = self;
        loop {
            match cur {
                AstNode::Wrapper(WrapperNode { val: Value::Nil }) => break,
                AstNode::Cons(ConsNode { head, tail }) => {
                    out.push(*head);
                    cur = tail;
                }
                other => {
                    out.push(other);
                    break;
                }
            }
        }
        out
    }
}

/// Bump arena for AST nodes. One per parse/compile.
pub struct AstArena {
    bump: Bump,
}

impl AstArena {
    pub fn new() -> Self {
        AstArena { bump: Bump::new() }
    }

    pub fn syntax<'a>(&'a self, class: ClassId, attrs: Vec<NodeRef<'a>>) -> NodeRef<'a> {
        self.bump.alloc(AstNode::Syntax(SyntaxNode { class, attrs }))
    }

    pub fn token<'a>(&'a self, loc: SourceLoc, value: Value) -> NodeRef<'a> {
        self.bump.alloc(AstNode::Token(TokenNode { loc, value }))
    }

    pub fn cons<'a>(&'a self, head: NodeRef<'a>, tail: NodeRef<'a>) -> NodeRef<'a> {
        self.bump.alloc(AstNode::Cons(ConsNode { head, tail }))
    }

    pub fn wrapper<'a>(&'a self, val: Value) -> NodeRef<'a> {
        self.bump.alloc(AstNode::Wrapper(WrapperNode { val }))
    }

    pub fn nil<'a>(&'a self) -> NodeRef<'a> {
        self.wrapper(Value::Nil)
    }

    /// Build a cons-spine from a `Vec`, nil-terminated.
    pub fn list<'a>(&'a self, items: Vec<NodeRef<'a>>) -> NodeRef<'a> {
        let mut tail = self.nil();
        for item in items.into_iter().rev() {
            tail = self.cons(item, tail);
        }
        tail
    }
}

impl Default for AstArena {
    fn default() -> Self {
        AstArena::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_table_assigns_stable_ids() {
        let table = NodeClassTable::new();
        let a = table.ensure("Lex", "LexRule", 2);
        let b = table.ensure("Lex", "LexRule", 2);
        assert_eq!(a, b);
        let c = table.ensure("Peg", "PegRule", 3);
        assert_ne!(a, c);
    }

    #[test]
    fn syntax_node_holds_fixed_attrs() {
        let arena = AstArena::new();
        let table = NodeClassTable::new();
        let class = table.ensure("Main", "VarDecl", 1);
        let name = arena.wrapper(Value::StrLit(0));
        let node = arena.syntax(class, vec![name]);
        let syn = node.as_syntax().unwrap();
        assert_eq!(syn.attrs.len(), 1);
    }

    #[test]
    fn cons_to_vec_walks_spine() {
        let arena = AstArena::new();
        let items = vec![
            arena.wrapper(Value::Int(1)),
            arena.wrapper(Value::Int(2)),
            arena.wrapper(Value::Int(3)),
        ];
        let list = arena.list(items);
        assert_eq!(list.cons_to_vec().len(), 3);
    }

    #[test]
    fn nil_list_is_empty() {
        let arena = AstArena::new();
        let list = arena.list(vec![]);
        assert!(list.is_nil());
        assert_eq!(list.cons_to_vec().len(), 0);
    }
}
