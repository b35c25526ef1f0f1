//! Lowers [`crate::spec`] rule bodies to PEG bytecode (`spec.md` §4.6
//! "Encoding patterns").
//!
//! Term-level quantifiers (`e?`, `e*`, `e+`) and lookahead (`&e`, `!e`)
//! follow the spec's literal templates with one adaptation: `LIST_MAYBE`
//! is implemented here as a native reversal of an accumulator built via
//! a small compiler-synthesized fold (`Load`/`List`) rather than the
//! source's in-place stack-height comparison trick, and `LOOP_UPDATE`'s
//! backtrack record carries a live `(pos, height)` pair updated on every
//! successful iteration (not just `pos`) so a later failure restores to
//! the most recent iteration, not the loop's start — see `DESIGN.md` for
//! the full rationale. Branch-level `/*`/`/+`/`/?` folds call the
//! grammar author's own reduction callback each iteration instead (no
//! `LIST_MAYBE` involved), matching "apply callback with `[acc, B…]`"
//! directly.

use std::rc::Rc;

use pgen_core::Value;
use pgen_callback::Op as CallbackOp;

use crate::error::PegError;
use crate::labels::Labels;
use crate::opcode::{Op, RuleId, Target};
use crate::rules::{RuleEntry, RuleTable};
use crate::spec::{Atom, Branch, FoldKind, Lookahead, Quant, QTerm, RuleSpec};

/// A token type id guaranteed not to occur in a real grammar's token
/// table; used to synthesize an always-failing `Term` for lookahead.
const NEVER_MATCH: u32 = u32::MAX;

pub fn compile(rules: &[RuleSpec], root: &str) -> Result<(Vec<Op>, RuleTable), PegError> {
    let root_id = rules
        .iter()
        .position(|r| &*r.name == root)
        .map(|i| RuleId(i as u32))
        .ok_or_else(|| PegError::UnknownRule(Rc::from(root)))?;

    let mut ops = vec![Op::Meta { rule_count: rules.len() as u32 }];
    ops.push(Op::RuleCall { rule: root_id });
    ops.push(Op::Match);

    let mut labels = Labels::new();
    let mut table = RuleTable::new();
    for (i, rule) in rules.iter().enumerate() {
        let id = RuleId(i as u32);
        let entry = ops.len() as u32;
        compile_branch(&rule.body, &mut ops, &mut labels)?;
        ops.push(Op::RuleRet);
        table.push(RuleEntry { id, name: rule.name.clone(), entry });
    }
    labels.translate(&mut ops);
    Ok((ops, table))
}

fn compile_atom(atom: &Atom, ops: &mut Vec<Op>) {
    match atom {
        Atom::Token(t) => ops.push(Op::Term { token_type: *t }),
        Atom::Rule(r) => ops.push(Op::RuleCall { rule: *r }),
    }
}

fn star_fold_ops() -> Rc<[CallbackOp]> {
    Rc::from(vec![CallbackOp::Load(1), CallbackOp::Load(0), CallbackOp::List, CallbackOp::End])
}

fn compile_qterm(q: &QTerm, ops: &mut Vec<Op>, labels: &mut Labels) {
    match q.lookahead {
        Lookahead::Ahead => {
            let l0 = labels.new_label();
            let l1 = labels.new_label();
            ops.push(Op::PushBr { off: Target::Label(l0) });
            compile_atom(&q.atom, ops);
            ops.push(Op::Unparse);
            ops.push(Op::Jmp(Target::Label(l1)));
            labels.define(l0, ops.len() as u32);
            ops.push(Op::Term { token_type: NEVER_MATCH });
            labels.define(l1, ops.len() as u32);
        }
        Lookahead::Neg => {
            let l0 = labels.new_label();
            ops.push(Op::PushBr { off: Target::Label(l0) });
            compile_atom(&q.atom, ops);
            ops.push(Op::Unparse);
            ops.push(Op::Term { token_type: NEVER_MATCH });
            labels.define(l0, ops.len() as u32);
        }
        Lookahead::None => match q.quant {
            Quant::One => compile_atom(&q.atom, ops),
            Quant::Maybe => {
                let l0 = labels.new_label();
                ops.push(Op::PushBr { off: Target::Label(l0) });
                compile_atom(&q.atom, ops);
                ops.push(Op::PopBr);
                labels.define(l0, ops.len() as u32);
                ops.push(Op::ListMaybe);
            }
            Quant::Star => {
                ops.push(Op::Push(Value::Nil));
                let l0 = labels.new_label();
                let l1 = labels.new_label();
                ops.push(Op::PushBr { off: Target::Label(l0) });
                labels.define(l1, ops.len() as u32);
                compile_atom(&q.atom, ops);
                let next = labels.new_label();
                ops.push(Op::Callback { arity: 2, ops: star_fold_ops(), next: Target::Label(next) });
                labels.define(next, ops.len() as u32);
                ops.push(Op::LoopUpdate { off: Target::Label(l1) });
                labels.define(l0, ops.len() as u32);
                ops.push(Op::ListMaybe);
            }
            Quant::Plus => {
                ops.push(Op::Push(Value::Nil));
                compile_atom(&q.atom, ops);
                let next0 = labels.new_label();
                ops.push(Op::Callback { arity: 2, ops: star_fold_ops(), next: Target::Label(next0) });
                labels.define(next0, ops.len() as u32);
                let l0 = labels.new_label();
                let l1 = labels.new_label();
                ops.push(Op::PushBr { off: Target::Label(l0) });
                labels.define(l1, ops.len() as u32);
                compile_atom(&q.atom, ops);
                let next1 = labels.new_label();
                ops.push(Op::Callback { arity: 2, ops: star_fold_ops(), next: Target::Label(next1) });
                labels.define(next1, ops.len() as u32);
                ops.push(Op::LoopUpdate { off: Target::Label(l1) });
                labels.define(l0, ops.len() as u32);
                ops.push(Op::ListMaybe);
            }
        },
    }
}

fn compile_branch(branch: &Branch, ops: &mut Vec<Op>, labels: &mut Labels) -> Result<(), PegError> {
    match branch {
        Branch::Seq { terms, callback } => {
            for t in terms {
                compile_qterm(t, ops, labels);
            }
            let arity = terms.iter().filter(|t| t.contributes_value()).count() as u16;
            match callback {
                Some(cb) => {
                    let next = labels.new_label();
                    ops.push(Op::Callback { arity, ops: cb.ops.clone(), next: Target::Label(next) });
                    labels.define(next, ops.len() as u32);
                }
                None => {
                    if arity == 0 {
                        ops.push(Op::Push(Value::Nil));
                    } else if arity > 1 {
                        return Err(PegError::SequenceNeedsCallback { arity });
                    }
                }
            }
            Ok(())
        }
        Branch::Choice(branches) => compile_choice(branches, ops, labels),
        Branch::Fold { seed, kind, rhs, callback } => {
            compile_branch(seed, ops, labels)?;
            let rhs_arity = rhs.iter().filter(|t| t.contributes_value()).count() as u16;
            let fold_arity = rhs_arity + 1;
            match kind {
                FoldKind::Maybe => {
                    let l0 = labels.new_label();
                    ops.push(Op::PushBr { off: Target::Label(l0) });
                    for t in rhs {
                        compile_qterm(t, ops, labels);
                    }
                    let next = labels.new_label();
                    ops.push(Op::Callback { arity: fold_arity, ops: callback.ops.clone(), next: Target::Label(next) });
                    labels.define(next, ops.len() as u32);
                    ops.push(Op::PopBr);
                    labels.define(l0, ops.len() as u32);
                }
                FoldKind::Plus | FoldKind::Star => {
                    if *kind == FoldKind::Plus {
                        for t in rhs {
                            compile_qterm(t, ops, labels);
                        }
                        let next = labels.new_label();
                        ops.push(Op::Callback { arity: fold_arity, ops: callback.ops.clone(), next: Target::Label(next) });
                        labels.define(next, ops.len() as u32);
                    }
                    let l0 = labels.new_label();
                    let l1 = labels.new_label();
                    ops.push(Op::PushBr { off: Target::Label(l0) });
                    labels.define(l1, ops.len() as u32);
                    for t in rhs {
                        compile_qterm(t, ops, labels);
                    }
                    let next = labels.new_label();
                    ops.push(Op::Callback { arity: fold_arity, ops: callback.ops.clone(), next: Target::Label(next) });
                    labels.define(next, ops.len() as u32);
                    ops.push(Op::LoopUpdate { off: Target::Label(l1) });
                    labels.define(l0, ops.len() as u32);
                }
            }
            Ok(())
        }
    }
}

fn compile_choice(branches: &[Branch], ops: &mut Vec<Op>, labels: &mut Labels) -> Result<(), PegError> {
    match branches {
        [] => Err(PegError::EmptyChoice),
        [only] => compile_branch(only, ops, labels),
        [first, rest @ ..] => {
            let l0 = labels.new_label();
            let l1 = labels.new_label();
            ops.push(Op::PushBr { off: Target::Label(l0) });
            compile_branch(first, ops, labels)?;
            ops.push(Op::PopBr);
            ops.push(Op::Jmp(Target::Label(l1)));
            labels.define(l0, ops.len() as u32);
            compile_choice(rest, ops, labels)?;
            labels.define(l1, ops.len() as u32);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::CallbackSpec;

    #[test]
    fn single_token_rule_compiles() {
        let rule = RuleSpec {
            name: Rc::from("Digit"),
            body: Branch::Seq { terms: vec![QTerm::plain(Atom::Token(1))], callback: None },
        };
        let (ops, table) = compile(&[rule], "Digit").unwrap();
        assert_eq!(table.len(), 1);
        assert!(matches!(ops[1], Op::RuleCall { rule: RuleId(0) }));
        assert!(matches!(ops[2], Op::Match));
    }

    #[test]
    fn sequence_without_callback_and_arity_over_one_is_an_error() {
        let rule = RuleSpec {
            name: Rc::from("Pair"),
            body: Branch::Seq {
                terms: vec![QTerm::plain(Atom::Token(1)), QTerm::plain(Atom::Token(2))],
                callback: None,
            },
        };
        let err = compile(&[rule], "Pair").unwrap_err();
        assert!(matches!(err, PegError::SequenceNeedsCallback { arity: 2 }));
    }

    #[test]
    fn choice_compiles_both_alternatives() {
        let a = Branch::Seq { terms: vec![QTerm::plain(Atom::Token(1))], callback: None };
        let b = Branch::Seq { terms: vec![QTerm::plain(Atom::Token(2))], callback: None };
        let rule = RuleSpec { name: Rc::from("AOrB"), body: Branch::Choice(vec![a, b]) };
        let (ops, _) = compile(&[rule], "AOrB").unwrap();
        let terms: Vec<_> = ops.iter().filter(|op| matches!(op, Op::Term { .. })).collect();
        assert_eq!(terms.len(), 2);
    }

    #[test]
    fn unknown_root_is_an_error() {
        let rule = RuleSpec {
            name: Rc::from("Digit"),
            body: Branch::Seq { terms: vec![QTerm::plain(Atom::Token(1))], callback: None },
        };
        assert!(matches!(compile(&[rule], "Missing"), Err(PegError::UnknownRule(_))));
    }

    #[test]
    fn fold_uses_real_callback_each_iteration() {
        let seed = Branch::Seq { terms: vec![QTerm::plain(Atom::Token(1))], callback: None };
        let rule = RuleSpec {
            name: Rc::from("Sum"),
            body: Branch::Fold {
                seed: Box::new(seed),
                kind: FoldKind::Star,
                rhs: vec![QTerm::plain(Atom::Token(2)), QTerm::plain(Atom::Token(1))],
                callback: CallbackSpec { ops: Rc::from(vec![CallbackOp::Load(0), CallbackOp::End]) },
            },
        };
        let (ops, _) = compile(&[rule], "Sum").unwrap();
        assert!(ops.iter().any(|op| matches!(op, Op::LoopUpdate { .. })));
        assert!(!ops.iter().any(|op| matches!(op, Op::ListMaybe)));
    }
}
