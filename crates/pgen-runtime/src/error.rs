//! Unified parse-time error taxonomy (`spec.md` §6 "Errors", §7
//! "Taxonomy"): every `parse` call returns one of these, folding the
//! lower VMs' own error types into the `kind` set the interface
//! promises (`unexpected-byte`, `unexpected-token`, `no-match`,
//! `fatal-callback-error`, `cycle-in-partial-contexts`).

use pgen_callback::CallbackError;
use pgen_grammar::GrammarError;
use pgen_lex::LexError;
use pgen_peg::PegError;

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Compiling the grammar spec itself failed; no instance was built.
    Compile(GrammarError),
    /// The lexer ran out of rules to try at `pos` in some context.
    NoMatch { context: String, pos: usize },
    /// A partial-context reference graph had a cycle — this should have
    /// been caught at compile time; surfacing it here too means a future
    /// compile-pipeline bug fails loudly on the affected grammar instead
    /// of panicking inside the VM.
    CycleInPartialContexts(Vec<String>),
    /// The PEG grammar never matched; carries the deepest token position
    /// reached and what was expected there.
    NoPegMatch { pos: usize, expected_count: usize },
    /// `PEG` matched a prefix but tokens remained.
    UnexpectedToken { pos: usize },
    /// A callback raised a domain error (bad arg type/arity, unknown
    /// built-in, struct under/overfill).
    FatalCallbackError(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Compile(e) => write!(f, "grammar compile error: {e}"),
            ParseError::NoMatch { context, pos } => {
                write!(f, "no rule matched in context `{context}` at byte {pos}")
            }
            ParseError::CycleInPartialContexts(cycle) => {
                write!(f, "cycle among partial contexts: {}", cycle.join(" -> "))
            }
            ParseError::NoPegMatch { pos, expected_count } => {
                write!(f, "no peg rule matched at token {pos} ({expected_count} alternative(s) expected)")
            }
            ParseError::UnexpectedToken { pos } => write!(f, "unexpected token at {pos}, expected end of input"),
            ParseError::FatalCallbackError(msg) => write!(f, "fatal callback error: {msg}"),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<GrammarError> for ParseError {
    fn from(e: GrammarError) -> Self {
        ParseError::Compile(e)
    }
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        match e {
            LexError::UnknownContext(name) => ParseError::NoMatch { context: name.to_string(), pos: 0 },
            LexError::PartialContextCycle(cycle) => {
                ParseError::CycleInPartialContexts(cycle.iter().map(|s| s.to_string()).collect())
            }
            LexError::NoMatch { context, pos } => ParseError::NoMatch { context: context.to_string(), pos },
            LexError::Callback(e) => ParseError::FatalCallbackError(e.to_string()),
        }
    }
}

impl From<PegError> for ParseError {
    fn from(e: PegError) -> Self {
        match e {
            PegError::NoMatch { pos, expected } => ParseError::NoPegMatch { pos, expected_count: expected.len() },
            PegError::UnexpectedToken { pos } => ParseError::UnexpectedToken { pos },
            PegError::UnknownRule(_) | PegError::SequenceNeedsCallback { .. } | PegError::EmptyChoice => {
                ParseError::FatalCallbackError(e.to_string())
            }
            PegError::Callback(e) => ParseError::FatalCallbackError(e.to_string()),
        }
    }
}

impl From<CallbackError> for ParseError {
    fn from(e: CallbackError) -> Self {
        ParseError::FatalCallbackError(e.to_string())
    }
}
