//! Lex-layer errors (`spec.md` §7: *grammar cycle*, *lex no-match at
//! position*).

use std::fmt;
use std::rc::Rc;

use pgen_callback::CallbackError;

#[derive(Debug, Clone, PartialEq)]
pub enum LexError {
    UnknownContext(Rc<str>),
    /// A partial-context reference graph has a cycle; reported with the
    /// full cycle per `spec.md` §4.5.3.
    PartialContextCycle(Vec<Rc<str>>),
    NoMatch { context: Rc<str>, pos: usize },
    Callback(CallbackError),
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::UnknownContext(name) => write!(f, "unknown lex context {name:?}"),
            LexError::PartialContextCycle(cycle) => {
                write!(f, "cycle among partial contexts: {}", cycle.join(" -> "))
            }
            LexError::NoMatch { context, pos } => {
                write!(f, "no rule matched in context {context:?} at byte {pos}")
            }
            LexError::Callback(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for LexError {}

impl From<CallbackError> for LexError {
    fn from(e: CallbackError) -> Self {
        LexError::Callback(e)
    }
}
