//! Lowers the surface callback-expression language (`$1 + $3`,
//! `token(:name, $0)`, `if … else …`, struct/list construction,
//! `push(*Ctx)`/`pop`) into `pgen_callback::Op` sequences.
//!
//! Two callers with different local-variable conventions share this
//! module: `lower_lex`'s rule callbacks, whose locals are the
//! materialized capture strings `pgen_lex::vm` writes before running
//! the body (`CaptureMode::Lex`), and `lower_peg`'s sequence/fold
//! callbacks, whose locals are the contributing terms' values in
//! left-to-right order (`CaptureMode::Peg`) — PEG bodies never emit
//! `Load`/`Store`/`LoadGlob`/`StoreGlob` of *new* bindings, only reads of
//! the term locals already placed there, matching `pgen_peg::opcode`'s
//! documented reduced subset.

use pgen_callback::{Labels, Op};
use pgen_core::builtins::builtin_id;

use crate::ast::{BinOp, CbExpr, CbStmt, ListEntry};
use crate::error::GrammarError;
use crate::symtab::SymbolTable;

/// How `$n` resolves to a `Load` index, and whether plain (non-`$`)
/// local assignment is legal at all.
pub enum CaptureMode<'a> {
    /// `$n`'s Load index is the rank of `n` among the capture indices
    /// actually referenced in this body (`pgen_lex::vm::materialize_captures`'s
    /// packing).
    Lex { referenced: &'a [u32] },
    /// `$n`'s Load index is `n` directly — term values are laid out
    /// left to right with no packing.
    Peg,
}

pub struct Lowerer<'a> {
    pub symbols: &'a SymbolTable,
    pub mode: CaptureMode<'a>,
}

impl<'a> Lowerer<'a> {
    fn capture_index(&self, n: u32) -> Result<u32, GrammarError> {
        match &self.mode {
            // Term values are laid out 0-based in `locals`
            // (`pgen_peg::vm`'s call-frame push order), but surface `$n`
            // is 1-based (`$1` is the first term) — `$0` has no term to
            // refer to in a PEG body.
            CaptureMode::Peg => n
                .checked_sub(1)
                .ok_or(GrammarError::CaptureOutOfRange { n, max: 0 }),
            CaptureMode::Lex { referenced } => referenced
                .iter()
                .position(|&i| i == n)
                .map(|p| p as u32)
                .ok_or_else(|| GrammarError::CaptureOutOfRange { n, max: referenced.len() as u32 }),
        }
    }

    /// Lowers a whole callback body to a complete op sequence ending in
    /// `Op::End`.
    pub fn lower_body(&self, stmts: &[CbStmt]) -> Result<Vec<Op>, GrammarError> {
        // `push(*Name)`/`pop` as the entire body are recognized structurally
        // one level up (`lower_lex`), never reaching here; a body that
        // merely *contains* one of these forms elsewhere is a plain call.
        let mut labels = Labels::new();
        let mut ops = Vec::new();
        self.lower_stmts(stmts, &mut ops, &mut labels)?;
        if ops.is_empty() {
            ops.push(Op::Push(pgen_core::Value::Nil));
        }
        ops.push(Op::End);
        labels.translate(&mut ops);
        Ok(ops)
    }

    fn lower_stmts(&self, stmts: &[CbStmt], ops: &mut Vec<Op>, labels: &mut Labels) -> Result<(), GrammarError> {
        for (i, stmt) in stmts.iter().enumerate() {
            let is_last = i + 1 == stmts.len();
            match stmt {
                CbStmt::Expr(e) => {
                    self.lower_expr(e, ops, labels)?;
                    if !is_last {
                        ops.push(Op::Pop);
                    }
                }
                CbStmt::Assign { name, .. } => {
                    // No per-rule local bindings beyond captures/term values
                    // (`Lowerer`'s module doc): only `$name = …` globals are
                    // assignable.
                    return Err(GrammarError::UnknownName { kind: "local var", name: name.to_string() });
                }
                CbStmt::GlobalAssign { name, value } => {
                    self.lower_expr(value, ops, labels)?;
                    let slot = self.symbols.resolve_global(name)?;
                    ops.push(Op::StoreGlob(slot));
                    if is_last {
                        ops.push(Op::Push(pgen_core::Value::Nil));
                    }
                }
                CbStmt::If { cond, then_branch, else_branch } => {
                    self.lower_expr(cond, ops, labels)?;
                    let else_label = labels.new_label();
                    let end_label = labels.new_label();
                    ops.push(Op::Junless(pgen_callback::Target::Label(else_label)));
                    self.lower_stmts(then_branch, ops, labels)?;
                    if then_branch.is_empty() {
                        ops.push(Op::Push(pgen_core::Value::Nil));
                    }
                    ops.push(Op::Jmp(pgen_callback::Target::Label(end_label)));
                    labels.define(else_label, ops.len() as u32);
                    self.lower_stmts(else_branch, ops, labels)?;
                    if else_branch.is_empty() {
                        ops.push(Op::Push(pgen_core::Value::Nil));
                    }
                    labels.define(end_label, ops.len() as u32);
                    if !is_last {
                        ops.push(Op::Pop);
                    }
                }
            }
        }
        Ok(())
    }

    fn lower_expr(&self, expr: &CbExpr, ops: &mut Vec<Op>, labels: &mut Labels) -> Result<(), GrammarError> {
        match expr {
            CbExpr::Int(i) => ops.push(Op::Push(pgen_core::Value::Int(*i))),
            CbExpr::Double(d) => ops.push(Op::Push(pgen_core::Value::Double(*d))),
            CbExpr::Str(s) => ops.push(Op::Push(pgen_core::Value::Str(s.clone()))),
            CbExpr::Capture(n) => ops.push(Op::Load(self.capture_index(*n)?)),
            CbExpr::Symbol(name) => {
                let id = self
                    .symbols
                    .token_types
                    .find(name)
                    .ok_or_else(|| GrammarError::UnknownName { kind: "token type", name: name.to_string() })?;
                ops.push(Op::Push(pgen_core::Value::Int(id as i64)));
            }
            CbExpr::VarRef(name) => {
                return Err(GrammarError::UnknownName { kind: "local var", name: name.to_string() });
            }
            CbExpr::GlobalVarRef(name) => {
                let slot = self.symbols.resolve_global(name)?;
                ops.push(Op::LoadGlob(slot));
            }
            CbExpr::Call { name, args } => {
                for a in args {
                    self.lower_expr(a, ops, labels)?;
                }
                let fname = builtin_id(name)
                    .ok_or_else(|| GrammarError::UnknownCallable(name.to_string()))?;
                ops.push(Op::Call { argc: args.len() as u32, fname });
            }
            CbExpr::CreateNode { name, args } => {
                let klass = self
                    .symbols
                    .klasses
                    .find(name)
                    .ok_or_else(|| GrammarError::UnknownName { kind: "struct", name: name.to_string() })?;
                ops.push(Op::NodeBeg(klass));
                for a in args {
                    self.lower_expr(a, ops, labels)?;
                    ops.push(Op::NodeSet);
                }
                ops.push(Op::NodeEnd);
            }
            CbExpr::CreateList(entries) => self.lower_list(entries, ops, labels)?,
            CbExpr::Push(_) | CbExpr::Pop => {
                return Err(self_contained_push_pop_error());
            }
            CbExpr::Binary { op, lhs, rhs } => {
                self.lower_expr(lhs, ops, labels)?;
                self.lower_expr(rhs, ops, labels)?;
                let fname = binop_builtin(*op);
                ops.push(Op::Call { argc: 2, fname });
            }
        }
        Ok(())
    }

    /// Builds the list value left to right: `push(item)`, then the rest
    /// of the list, then `List`/`ListV` — matching `Op::List`'s
    /// head-then-tail pop order (see module-level reasoning in
    /// `DESIGN.md`'s `pgen-grammar` entry).
    fn lower_list(&self, entries: &[ListEntry], ops: &mut Vec<Op>, labels: &mut Labels) -> Result<(), GrammarError> {
        match entries.split_first() {
            None => ops.push(Op::Push(pgen_core::Value::Nil)),
            Some((ListEntry::Item(e), rest)) => {
                self.lower_expr(e, ops, labels)?;
                self.lower_list(rest, ops, labels)?;
                ops.push(Op::List);
            }
            Some((ListEntry::Splat(e), rest)) => {
                self.lower_expr(e, ops, labels)?;
                self.lower_list(rest, ops, labels)?;
                ops.push(Op::ListV);
            }
        }
        Ok(())
    }
}

fn self_contained_push_pop_error() -> GrammarError {
    GrammarError::Syntax {
        line: 0,
        col: 0,
        message: "`push`/`pop` are only valid as an entire lex-rule callback body".to_string(),
    }
}

fn binop_builtin(op: BinOp) -> u32 {
    use pgen_core::builtins::*;
    match op {
        BinOp::Add => BUILTIN_OP_ADD,
        BinOp::Sub => BUILTIN_OP_SUB,
        BinOp::Mul => BUILTIN_OP_MUL,
        BinOp::Div => BUILTIN_OP_DIV,
        BinOp::Eq => BUILTIN_OP_EQ,
        BinOp::Ne => BUILTIN_OP_NE,
        BinOp::Lt => BUILTIN_OP_LT,
        BinOp::Le => BUILTIN_OP_LE,
        BinOp::Gt => BUILTIN_OP_GT,
        BinOp::Ge => BUILTIN_OP_GE,
        BinOp::And => BUILTIN_OP_AND,
        BinOp::Or => BUILTIN_OP_OR,
    }
}
