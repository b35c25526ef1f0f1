//! Top-level grammar-spec compile pipeline: parse → build symbol table →
//! lower each `lex`/`peg` block → run each through its own crate's
//! compiler. Produces a [`CompiledGrammar`] bundle `pgen-runtime` can
//! load directly into a parser instance.

use std::rc::Rc;

use pgen_core::KlassRegistry;
use pgen_lex::context::ContextTable;
use pgen_lex::opcode::Op as LexOp;
use pgen_peg::opcode::Op as PegOp;
use pgen_peg::rules::RuleTable;

use crate::error::GrammarError;
use crate::lower_lex::lower_lex_blocks;
use crate::lower_peg::lower_peg_blocks;
use crate::parser::parse;
use crate::symtab::SymbolTable;

pub struct CompiledLex {
    pub ops: Vec<LexOp>,
    pub contexts: ContextTable,
}

pub struct CompiledPeg {
    pub name: Rc<str>,
    pub ops: Vec<PegOp>,
    pub rules: RuleTable,
}

pub struct CompiledGrammar {
    pub lex: Option<CompiledLex>,
    pub pegs: Vec<CompiledPeg>,
    pub klasses: KlassRegistry,
    pub global_count: u32,
}

pub fn compile(source: &str) -> Result<CompiledGrammar, GrammarError> {
    let file = parse(source)?;
    let symbols = SymbolTable::build(&file)?;

    let lex_specs = lower_lex_blocks(&file.lexes, &symbols)?;
    let lex = if lex_specs.is_empty() {
        None
    } else {
        let inlined = pgen_lex::inline::inline_partial_references(lex_specs)?;
        let (ops, contexts) = pgen_lex::compiler::compile(&inlined)?;
        Some(CompiledLex { ops, contexts })
    };

    let peg_blocks = lower_peg_blocks(&file.pegs, &symbols)?;
    let mut pegs = Vec::with_capacity(peg_blocks.len());
    for (name, specs) in &peg_blocks {
        let root = specs
            .first()
            .ok_or_else(|| GrammarError::Syntax { line: 0, col: 0, message: format!("peg block `{name}` has no rules") })?
            .name
            .clone();
        let (ops, rules) = pgen_peg::compiler::compile(specs, &root)?;
        pegs.push(CompiledPeg { name: name.clone(), ops, rules });
    }

    Ok(CompiledGrammar {
        lex,
        pegs,
        klasses: symbols.klasses,
        global_count: symbols.globals.len() as u32,
    })
}
