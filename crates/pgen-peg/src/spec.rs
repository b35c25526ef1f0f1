//! Pre-bytecode IR for PEG rule bodies (`spec.md` §4.6 "Rule model").
//!
//! `pgen-grammar` builds this from the surface `peg Program { ... }`
//! blocks (the `PegRule`/`SeqRule`/`Branch`/`Term`/`TermStar`/`TermPlus`/
//! `TermMaybe`/`Lookahead`/`NegLookahead`/`RefRule` AST node classes);
//! [`crate::compiler::compile`] lowers it to [`crate::opcode::Op`].

use std::rc::Rc;

use pgen_callback::Op as CallbackOp;

use crate::opcode::RuleId;

/// One atom within a sequence: either a token-type reference or a call
/// to another rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Token(u32),
    Rule(RuleId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quant {
    One,
    Maybe,
    Star,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookahead {
    None,
    Ahead,
    Neg,
}

/// A single term within a sequence. `One`-quantified, non-lookahead
/// terms push their matched value as one of the sequence's callback
/// arguments; `Maybe`/`Star`/`Plus` push a 0-or-1 / 0-or-more / 1-or-more
/// list; lookahead terms are zero-width and never occupy an argument
/// slot.
#[derive(Debug, Clone, PartialEq)]
pub struct QTerm {
    pub atom: Atom,
    pub quant: Quant,
    pub lookahead: Lookahead,
}

impl QTerm {
    pub fn plain(atom: Atom) -> Self {
        QTerm { atom, quant: Quant::One, lookahead: Lookahead::None }
    }

    /// Whether this term contributes a value to the enclosing sequence's
    /// callback arity.
    pub fn contributes_value(&self) -> bool {
        self.lookahead == Lookahead::None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallbackSpec {
    pub ops: Rc<[CallbackOp]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldKind {
    /// `/*` — zero or more right-hand applications.
    Star,
    /// `/+` — one or more.
    Plus,
    /// `/?` — at most one.
    Maybe,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Branch {
    /// A plain term sequence with an optional reduction callback. With
    /// no callback, the sequence's value is its last term's value (or
    /// `Value::Nil` for an empty sequence).
    Seq { terms: Vec<QTerm>, callback: Option<CallbackSpec> },
    /// `A / B / C` — ordered choice, tried left to right.
    Choice(Vec<Branch>),
    /// `A /* B { cb }` / `A /+ B { cb }` / `A /? B { cb }` — parse
    /// `seed`, then apply `rhs` the number of times `kind` allows,
    /// folding `cb(acc, rhs-terms...)` into the running accumulator at
    /// each application.
    Fold { seed: Box<Branch>, kind: FoldKind, rhs: Vec<QTerm>, callback: CallbackSpec },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleSpec {
    pub name: Rc<str>,
    pub body: Branch,
}
