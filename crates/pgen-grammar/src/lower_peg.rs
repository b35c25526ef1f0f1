//! Lowers surface `peg` blocks to `pgen_peg::spec::RuleSpec`.
//!
//! Rule references resolve to `RuleId`s by position within the same
//! block's rule list — `pgen_peg::compiler::compile` takes the whole
//! `rules` slice and a root name, and a body's `Atom::Rule(RuleId)`
//! indexes straight into that slice, so this module must assign ids in
//! the same order the rules end up in.

use std::rc::Rc;

use pgen_peg::opcode::RuleId;
use pgen_peg::spec::{Atom, Branch, CallbackSpec, FoldKind, Lookahead, QTerm, Quant, RuleSpec};

use crate::ast::{
    PegAltSyntax, PegAtomSyntax, PegBlock, PegBranchSyntax, PegFoldKindSyntax, PegLookaheadSyntax,
    PegQuantSyntax, PegSeqSyntax, PegTermSyntax,
};
use crate::error::GrammarError;
use crate::lower_cb::{CaptureMode, Lowerer};
use crate::symtab::SymbolTable;

pub fn lower_peg_blocks(
    blocks: &[PegBlock],
    symbols: &SymbolTable,
) -> Result<Vec<(Rc<str>, Vec<RuleSpec>)>, GrammarError> {
    blocks.iter().map(|b| lower_peg_block(b, symbols)).collect()
}

fn lower_peg_block(block: &PegBlock, symbols: &SymbolTable) -> Result<(Rc<str>, Vec<RuleSpec>), GrammarError> {
    let names: HashMap = block
        .rules
        .iter()
        .enumerate()
        .map(|(i, r)| (r.name.clone(), RuleId(i as u32)))
        .collect();

    let mut specs = Vec::with_capacity(block.rules.len());
    for rule in &block.rules {
        let body = lower_alt(&rule.body, symbols, &names)?;
        specs.push(RuleSpec { name: rule.name.clone(), body });
    }
    Ok((block.name.clone(), specs))
}

type HashMap = std::collections::HashMap<Rc<str>, RuleId>;

fn lower_alt(alt: &PegAltSyntax, symbols: &SymbolTable, names: &HashMap) -> Result<Branch, GrammarError> {
    if alt.branches.len() == 1 {
        return lower_branch(&alt.branches[0], symbols, names);
    }
    let branches = alt
        .branches
        .iter()
        .map(|b| lower_branch(b, symbols, names))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Branch::Choice(branches))
}

fn lower_branch(branch: &PegBranchSyntax, symbols: &SymbolTable, names: &HashMap) -> Result<Branch, GrammarError> {
    match branch {
        PegBranchSyntax::Seq(seq) => lower_seq(seq, symbols, names),
        PegBranchSyntax::Fold { seed, kind, rhs, callback } => {
            let seed = Box::new(lower_branch(seed, symbols, names)?);
            let rhs = rhs.iter().map(|t| lower_term(t, symbols, names)).collect::<Result<Vec<_>, _>>()?;
            let arity = rhs.iter().filter(|t| t.contributes_value()).count() + 1;
            let callback = lower_callback(callback, arity, symbols)?;
            Ok(Branch::Fold {
                seed,
                kind: match kind {
                    PegFoldKindSyntax::Star => FoldKind::Star,
                    PegFoldKindSyntax::Plus => FoldKind::Plus,
                    PegFoldKindSyntax::Maybe => FoldKind::Maybe,
                },
                rhs,
                callback,
            })
        }
    }
}

fn lower_seq(seq: &PegSeqSyntax, symbols: &SymbolTable, names: &HashMap) -> Result<Branch, GrammarError> {
    let terms = seq.terms.iter().map(|t| lower_term(t, symbols, names)).collect::<Result<Vec<_>, _>>()?;
    let callback = match &seq.callback {
        None => None,
        Some(stmts) => {
            let arity = terms.iter().filter(|t| t.contributes_value()).count();
            Some(lower_callback(stmts, arity, symbols)?)
        }
    };
    Ok(Branch::Seq { terms, callback })
}

fn lower_callback(
    stmts: &[crate::ast::CbStmt],
    _arity: usize,
    symbols: &SymbolTable,
) -> Result<CallbackSpec, GrammarError> {
    // `_arity` isn't needed to lower the body — `CaptureMode::Peg` maps
    // `$n` straight to `Load(n)` — but callers compute it anyway since
    // `pgen_peg::compiler` derives the VM's actual call arity from the
    // term list independently; keeping it here documents that the two
    // counts are expected to agree.
    let lowerer = Lowerer { symbols, mode: CaptureMode::Peg };
    let ops = lowerer.lower_body(stmts)?;
    Ok(CallbackSpec { ops: Rc::from(ops) })
}

fn lower_term(term: &PegTermSyntax, symbols: &SymbolTable, names: &HashMap) -> Result<QTerm, GrammarError> {
    let atom = match &term.atom {
        PegAtomSyntax::Token(name) => {
            let id = symbols
                .token_types
                .find(name)
                .ok_or_else(|| GrammarError::UnknownName { kind: "token type", name: name.to_string() })?;
            Atom::Token(id)
        }
        PegAtomSyntax::Literal(text) => {
            let id = symbols
                .token_types
                .find(text)
                .ok_or_else(|| GrammarError::UnknownName { kind: "token type", name: text.to_string() })?;
            Atom::Token(id)
        }
        PegAtomSyntax::Rule(name) => {
            let id = names
                .get(name)
                .copied()
                .ok_or_else(|| GrammarError::UnknownName { kind: "peg rule", name: name.to_string() })?;
            Atom::Rule(id)
        }
    };
    Ok(QTerm {
        atom,
        quant: match term.quant {
            PegQuantSyntax::One => Quant::One,
            PegQuantSyntax::Maybe => Quant::Maybe,
            PegQuantSyntax::Star => Quant::Star,
            PegQuantSyntax::Plus => Quant::Plus,
        },
        lookahead: match term.lookahead {
            PegLookaheadSyntax::None => Lookahead::None,
            PegLookaheadSyntax::Ahead => Lookahead::Ahead,
            PegLookaheadSyntax::Neg => Lookahead::Neg,
        },
    })
}
