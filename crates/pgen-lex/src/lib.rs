//! pgen-lex: the lex bytecode compiler and VM (`spec.md` §4.5,
//! component C6). Compiles an ordered list of lexer contexts — each a
//! `Begin` hook, a list of `(matcher, action)` rules, and an `End` hook —
//! into a shared op stream plus per-context entry offsets, then runs
//! that bytecode as a round-based, context-stacked token producer.
//!
//! `pgen-grammar` builds the [`spec::ContextSpec`] list from surface
//! syntax; this crate owns inlining ([`inline`]), lowering to bytecode
//! ([`compiler`]), and execution ([`vm`]).

pub mod compiler;
pub mod context;
pub mod error;
pub mod host;
pub mod inline;
pub mod labels;
pub mod opcode;
pub mod spec;
pub mod vm;

pub use compiler::compile;
pub use context::{ContextDef, ContextTable};
pub use error::LexError;
pub use host::{SourcePos, TokenSink, BUILTIN_TOKEN, BUILTIN_YIELD};
pub use inline::inline_partial_references;
pub use labels::Labels;
pub use opcode::{ContextId, LabelId, Op, Target};
pub use spec::{ContextSpec, Matcher, RuleAction, RuleSpec};
pub use vm::{LexResult, LexVm};
