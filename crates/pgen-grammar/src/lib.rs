//! pgen-grammar: compiles the surface grammar-spec syntax (`spec.md`
//! §6 — pattern definitions, `var` declarations, `struct` definitions,
//! `lex`/`peg` blocks) into the pre-bytecode IRs `pgen-lex` and
//! `pgen-peg` already know how to compile and run.
//!
//! - `ast`: the surface syntax tree.
//! - `parser`: grammar-spec text → `ast::GrammarFile`.
//! - `symtab`: pattern/global/struct/token-type name resolution shared
//!   across both lowering passes.
//! - `lower_cb`: the callback-expression sub-language → `pgen_callback::Op`.
//! - `lower_lex`: `lex` blocks → `pgen_lex::spec::ContextSpec`.
//! - `lower_peg`: `peg` blocks → `pgen_peg::spec::RuleSpec`.
//! - `compile`: ties parsing, lowering, and the downstream bytecode
//!   compilers together into one `CompiledGrammar`.

pub mod ast;
pub mod compile;
pub mod error;
pub mod lower_cb;
pub mod lower_lex;
pub mod lower_peg;
pub mod parser;
pub mod symtab;

pub use compile::{compile as compile_grammar, CompiledGrammar, CompiledLex, CompiledPeg};
pub use error::GrammarError;
