//! pgen-peg: the PEG bytecode compiler and VM (`spec.md` §4.6,
//! component C7). Compiles an ordered list of PEG rules — each a branch
//! tree of sequences, ordered choice, and left-fold repetition — into a
//! shared op stream plus per-rule entry offsets, then runs that
//! bytecode as a memoized recursive-descent parser over a token stream.
//!
//! `pgen-grammar` builds the [`spec::RuleSpec`] list from surface
//! syntax; this crate owns lowering to bytecode ([`compiler`]) and
//! execution ([`vm`]).

pub mod compiler;
pub mod error;
pub mod labels;
pub mod opcode;
pub mod rules;
pub mod spec;
pub mod vm;

pub use compiler::compile;
pub use error::{ExpectedItem, PegError};
pub use labels::Labels;
pub use opcode::{LabelId, Op, RuleId, Target};
pub use rules::{RuleEntry, RuleTable};
pub use spec::{Atom, Branch, CallbackSpec, FoldKind, Lookahead, QTerm, Quant, RuleSpec};
pub use vm::PegVm;
