//! pgen-callback: the callback bytecode shared by lex rule actions and
//! PEG rule reductions (`spec.md` §4.4, component C5).
//!
//! This crate owns only the bytecode format and its VM — compiling a
//! callback body's surface syntax (`token(:ident, $0)`, `$1 + $3`, `if …`)
//! into [`Op`] sequences happens in `pgen-grammar`, which is the one
//! place that already has the symbol table (declared vars, struct
//! klasses, rule names) a callback body can reference.

pub mod error;
pub mod host;
pub mod labels;
pub mod opcode;
pub mod vm;

pub use error::CallbackError;
pub use host::{CallbackHost, NoBuiltins};
pub use opcode::{LabelId, Op, Target};
pub use vm::Vm;
