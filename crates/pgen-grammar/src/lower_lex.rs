//! Lowers surface `lex` blocks to `pgen_lex::spec::ContextSpec`.
//!
//! Matcher disambiguation: a `/inner/` literal whose `inner` text is
//! exactly one identifier that also names a declared pattern resolves to
//! that pattern's already-compiled program (`Name = /regex/;` followed by
//! `/Name/` elsewhere reuses the compiled form rather than recompiling
//! `inner` as its own, unrelated one-character-class regex); anything
//! else between the slashes compiles as its own inline regex. This is
//! the one ambiguity the surface grammar has no separate syntax for, so
//! it's resolved the same way a name lookup beats a literal parse
//! anywhere else in the file.

use std::rc::Rc;

use pgen_lex::spec::{ContextSpec, Matcher, RuleAction, RuleSpec};

use crate::ast::{CbExpr, CbStmt, LexBlock, LexRuleSyntax, MatcherSyntax};
use crate::error::GrammarError;
use crate::lower_cb::{CaptureMode, Lowerer};
use crate::symtab::SymbolTable;

pub fn lower_lex_blocks(blocks: &[LexBlock], symbols: &SymbolTable) -> Result<Vec<ContextSpec>, GrammarError> {
    blocks.iter().map(|b| lower_block(b, symbols)).collect()
}

fn lower_block(block: &LexBlock, symbols: &SymbolTable) -> Result<ContextSpec, GrammarError> {
    let mut spec = ContextSpec::new(block.name.clone());
    if let Some(begin) = &block.begin {
        spec.begin = Some(lower_hook(begin, symbols)?);
    }
    if let Some(end) = &block.end {
        spec.end = Some(lower_hook(end, symbols)?);
    }
    for rule in &block.rules {
        spec.rules.push(lower_rule(rule, symbols)?);
    }
    Ok(spec)
}

fn lower_hook(stmts: &[CbStmt], symbols: &SymbolTable) -> Result<Rc<[pgen_callback::Op]>, GrammarError> {
    let lowerer = Lowerer { symbols, mode: CaptureMode::Lex { referenced: &[] } };
    Ok(Rc::from(lowerer.lower_body(stmts)?))
}

fn lower_rule(rule: &LexRuleSyntax, symbols: &SymbolTable) -> Result<RuleSpec, GrammarError> {
    let matcher = lower_matcher(&rule.matcher, symbols)?;

    // A bare context reference is a whole-rule splice target
    // (`pgen_lex::inline`); it carries no callback of its own.
    if let Matcher::ContextRef(_) = &matcher {
        if rule.callback.is_some() {
            return Err(GrammarError::Syntax {
                line: 0,
                col: 0,
                message: "a bare context-reference rule cannot carry a callback".to_string(),
            });
        }
        return Ok(RuleSpec { matcher, action: RuleAction::Discard });
    }

    let action = match &rule.callback {
        None => RuleAction::Discard,
        Some(stmts) => lower_rule_action(stmts, symbols)?,
    };
    Ok(RuleSpec { matcher, action })
}

/// Structurally recognizes a body that is exactly `push(*Name)` or
/// `pop`; everything else compiles through the generic callback path.
fn lower_rule_action(stmts: &[CbStmt], symbols: &SymbolTable) -> Result<RuleAction, GrammarError> {
    if let [CbStmt::Expr(CbExpr::Push(name))] = stmts {
        return Ok(RuleAction::Push(name.clone()));
    }
    if let [CbStmt::Expr(CbExpr::Pop)] = stmts {
        return Ok(RuleAction::Pop);
    }

    let referenced = referenced_captures(stmts);
    let mut capture_mask: u16 = 0;
    for &n in &referenced {
        capture_mask |= 1 << n;
    }
    let lowerer = Lowerer { symbols, mode: CaptureMode::Lex { referenced: &referenced } };
    let ops = lowerer.lower_body(stmts)?;
    Ok(RuleAction::Callback { capture_mask, ops: Rc::from(ops) })
}

/// Every distinct `$n` referenced in a callback body, sorted ascending —
/// `pgen_lex::vm::materialize_captures` packs exactly these indices into
/// `locals[0..k]` in this order, so `$n`'s `Load` index is its rank here.
fn referenced_captures(stmts: &[CbStmt]) -> Vec<u32> {
    let mut found = std::collections::BTreeSet::new();
    walk_stmts(stmts, &mut found);
    found.into_iter().collect()
}

fn walk_stmts(stmts: &[CbStmt], found: &mut std::collections::BTreeSet<u32>) {
    for s in stmts {
        match s {
            CbStmt::Expr(e) => walk_expr(e, found),
            CbStmt::Assign { value, .. } | CbStmt::GlobalAssign { value, .. } => walk_expr(value, found),
            CbStmt::If { cond, then_branch, else_branch } => {
                walk_expr(cond, found);
                walk_stmts(then_branch, found);
                walk_stmts(else_branch, found);
            }
        }
    }
}

fn walk_expr(expr: &CbExpr, found: &mut std::collections::BTreeSet<u32>) {
    match expr {
        CbExpr::Capture(n) => {
            found.insert(*n);
        }
        CbExpr::Call { args, .. } | CbExpr::CreateNode { args, .. } => {
            for a in args {
                walk_expr(a, found);
            }
        }
        CbExpr::CreateList(entries) => {
            for e in entries {
                match e {
                    crate::ast::ListEntry::Item(e) | crate::ast::ListEntry::Splat(e) => walk_expr(e, found),
                }
            }
        }
        CbExpr::Binary { lhs, rhs, .. } => {
            walk_expr(lhs, found);
            walk_expr(rhs, found);
        }
        _ => {}
    }
}

fn lower_matcher(syntax: &MatcherSyntax, symbols: &SymbolTable) -> Result<Matcher, GrammarError> {
    match syntax {
        MatcherSyntax::StringLit(s) => Ok(Matcher::Literal(s.clone())),
        MatcherSyntax::ContextRef(name) => Ok(Matcher::ContextRef(name.clone())),
        MatcherSyntax::Slashed { inner, case_insensitive } => {
            if !case_insensitive && is_plain_ident(inner) {
                if let Some(program) = symbols.patterns.get(inner) {
                    return Ok(Matcher::Regex(program.clone()));
                }
            }
            let ast = pgen_regexp::parser::parse_with(
                inner,
                &pgen_regexp::parser::ParseOptions { case_insensitive: *case_insensitive },
            )?;
            let program = pgen_regexp::compiler::compile(&ast)?;
            Ok(Matcher::Regex(Rc::new(program)))
        }
    }
}

fn is_plain_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}
