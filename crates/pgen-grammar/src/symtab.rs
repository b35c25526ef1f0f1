//! Name resolution shared across the lowering passes: patterns, the
//! token-type table (shared between `peg`'s `.name`/`'literal'` atoms
//! and `token(...)` callback calls so both agree on the same ids),
//! struct klasses, globals, and per-block rule-name tables.

use std::collections::HashMap;
use std::rc::Rc;

use pgen_core::KlassRegistry;
use pgen_regexp::Program as RegexProgram;

use crate::ast::GrammarFile;
use crate::error::GrammarError;

pub struct SymbolTable {
    pub patterns: HashMap<Rc<str>, Rc<RegexProgram>>,
    pub globals: HashMap<Rc<str>, u32>,
    pub klasses: KlassRegistry,
    pub token_types: TokenTable,
}

/// Assigns a stable `u32` id to every token-type name mentioned anywhere
/// in the file — a `peg` block's `.name`/`'literal'` atoms, and a `lex`
/// callback's `token(:name, ...)` calls. Built in one pass over the
/// parsed file before either body is lowered, so both sides agree.
#[derive(Default)]
pub struct TokenTable {
    by_name: HashMap<Rc<str>, u32>,
    names: Vec<Rc<str>>,
}

impl TokenTable {
    pub fn intern(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = self.names.len() as u32;
        let name: Rc<str> = Rc::from(name);
        self.by_name.insert(name.clone(), id);
        self.names.push(name);
        id
    }

    pub fn find(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, id: u32) -> &str {
        &self.names[id as usize]
    }
}

impl SymbolTable {
    pub fn build(file: &GrammarFile) -> Result<SymbolTable, GrammarError> {
        let mut patterns = HashMap::new();
        for def in &file.patterns {
            if patterns.contains_key(&def.name) {
                return Err(GrammarError::DuplicateName { kind: "pattern", name: def.name.to_string() });
            }
            let ast = pgen_regexp::parser::parse_with(
                &def.pattern,
                &pgen_regexp::parser::ParseOptions { case_insensitive: def.case_insensitive },
            )?;
            let program = pgen_regexp::compiler::compile(&ast)?;
            patterns.insert(def.name.clone(), Rc::new(program));
        }

        let mut globals = HashMap::new();
        for name in &file.vars {
            if globals.contains_key(name) {
                return Err(GrammarError::DuplicateName { kind: "var", name: name.to_string() });
            }
            let id = globals.len() as u32;
            globals.insert(name.clone(), id);
        }

        let klasses = KlassRegistry::new();
        let mut seen_structs = HashMap::new();
        for def in &file.structs {
            if seen_structs.insert(def.name.clone(), ()).is_some() {
                return Err(GrammarError::DuplicateName { kind: "struct", name: def.name.to_string() });
            }
            klasses.define_struct(&def.name, def.fields.clone())?;
        }

        let mut token_types = TokenTable::default();
        collect_token_types(file, &mut token_types);

        Ok(SymbolTable { patterns, globals, klasses, token_types })
    }

    pub fn resolve_global(&self, name: &str) -> Result<u32, GrammarError> {
        self.globals
            .get(name)
            .copied()
            .ok_or_else(|| GrammarError::UnknownName { kind: "var", name: name.to_string() })
    }
}

fn collect_token_types(file: &GrammarFile, table: &mut TokenTable) {
    use crate::ast::{CbExpr, CbStmt, PegAtomSyntax};

    fn walk_expr(expr: &CbExpr, table: &mut TokenTable) {
        match expr {
            CbExpr::Call { name, args } if &**name == "token" => {
                if let Some(CbExpr::Symbol(ty)) = args.first() {
                    table.intern(ty);
                }
                for a in args {
                    walk_expr(a, table);
                }
            }
            CbExpr::Call { args, .. } | CbExpr::CreateNode { args, .. } => {
                for a in args {
                    walk_expr(a, table);
                }
            }
            CbExpr::CreateList(entries) => {
                for e in entries {
                    match e {
                        crate::ast::ListEntry::Item(e) | crate::ast::ListEntry::Splat(e) => walk_expr(e, table),
                    }
                }
            }
            CbExpr::Binary { lhs, rhs, .. } => {
                walk_expr(lhs, table);
                walk_expr(rhs, table);
            }
            _ => {}
        }
    }

    fn walk_stmts(stmts: &[CbStmt], table: &mut TokenTable) {
        for s in stmts {
            match s {
                CbStmt::Expr(e) => walk_expr(e, table),
                CbStmt::Assign { value, .. } | CbStmt::GlobalAssign { value, .. } => walk_expr(value, table),
                CbStmt::If { cond, then_branch, else_branch } => {
                    walk_expr(cond, table);
                    walk_stmts(then_branch, table);
                    walk_stmts(else_branch, table);
                }
            }
        }
    }

    for lex in &file.lexes {
        if let Some(b) = &lex.begin {
            walk_stmts(b, table);
        }
        if let Some(e) = &lex.end {
            walk_stmts(e, table);
        }
        for rule in &lex.rules {
            if let Some(cb) = &rule.callback {
                walk_stmts(cb, table);
            }
        }
    }

    for peg in &file.pegs {
        for rule in &peg.rules {
            walk_peg_alt(&rule.body, table);
        }
    }

    fn walk_peg_alt(alt: &crate::ast::PegAltSyntax, table: &mut TokenTable) {
        for b in &alt.branches {
            walk_peg_branch(b, table);
        }
    }

    fn walk_peg_branch(branch: &crate::ast::PegBranchSyntax, table: &mut TokenTable) {
        match branch {
            crate::ast::PegBranchSyntax::Seq(seq) => {
                for t in &seq.terms {
                    walk_peg_term(t, table);
                }
                if let Some(cb) = &seq.callback {
                    walk_stmts(cb, table);
                }
            }
            crate::ast::PegBranchSyntax::Fold { seed, rhs, callback, .. } => {
                walk_peg_branch(seed, table);
                for t in rhs {
                    walk_peg_term(t, table);
                }
                walk_stmts(callback, table);
            }
        }
    }

    fn walk_peg_term(term: &crate::ast::PegTermSyntax, table: &mut TokenTable) {
        match &term.atom {
            PegAtomSyntax::Token(name) => {
                table.intern(name);
            }
            PegAtomSyntax::Literal(text) => {
                table.intern(text);
            }
            PegAtomSyntax::Rule(_) => {}
        }
    }
}
