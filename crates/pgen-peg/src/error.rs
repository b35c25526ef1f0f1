//! PEG VM errors (`spec.md` §4.6, §7).

use pgen_callback::CallbackError;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub enum PegError {
    UnknownRule(Rc<str>),
    /// No alternative matched anywhere in the grammar; carries the
    /// deepest token position reached and what was expected there.
    NoMatch { pos: usize, expected: Vec<ExpectedItem> },
    /// `MATCH` ran with tokens still left in the stream.
    UnexpectedToken { pos: usize },
    /// A callback-less sequence matched more than one contributing term
    /// (`pgen-grammar` is expected to always attach a reduction once a
    /// sequence has more than one meaningful term).
    SequenceNeedsCallback { arity: u16 },
    /// `A / B / ...` compiled with no alternatives at all.
    EmptyChoice,
    Callback(CallbackError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpectedItem {
    Token(u32),
    Explicit(u32),
    /// A memoized failure of a previously-attempted rule was replayed.
    Rule(u32),
}

impl std::fmt::Display for PegError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PegError::UnknownRule(name) => write!(f, "reference to undefined peg rule {name:?}"),
            PegError::NoMatch { pos, expected } => {
                write!(f, "no match at token position {pos}, expected one of {expected:?}")
            }
            PegError::UnexpectedToken { pos } => {
                write!(f, "unexpected token at position {pos}, expected end of input")
            }
            PegError::SequenceNeedsCallback { arity } => {
                write!(f, "sequence with {arity} terms has no reduction callback")
            }
            PegError::EmptyChoice => write!(f, "ordered choice with no alternatives"),
            PegError::Callback(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PegError {}

impl From<CallbackError> for PegError {
    fn from(e: CallbackError) -> Self {
        PegError::Callback(e)
    }
}
