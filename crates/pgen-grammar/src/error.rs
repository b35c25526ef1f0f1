//! Grammar-spec compiler errors (`spec.md` §7's `cycle-in-partial-contexts`
//! plus the name-conflict/unknown-reference checks the compile pipeline
//! needs before any bytecode compiler runs).

use pgen_callback::CallbackError;
use pgen_core::CoreError;
use pgen_lex::LexError;
use pgen_peg::PegError;
use pgen_regexp::RegexpError;

#[derive(Debug, Clone, PartialEq)]
pub enum GrammarError {
    /// Tokenizer/parser failure over the grammar-spec surface syntax.
    Syntax { line: u32, col: u32, message: String },
    /// Same name declared twice where only one declaration is allowed
    /// (a pattern, a struct, a lex context, or a peg rule).
    DuplicateName { kind: &'static str, name: String },
    /// A `VarRef`/`GlobalVarRef`/pattern-name/struct-name/rule-name/
    /// context-name with no matching declaration.
    UnknownName { kind: &'static str, name: String },
    /// `$n` beyond the enclosing rule's contributing-term count.
    CaptureOutOfRange { n: u32, max: u32 },
    /// A callback called a name that is neither a built-in action nor a
    /// declared struct.
    UnknownCallable(String),
    Regexp(RegexpError),
    Lex(LexError),
    Peg(PegError),
    Callback(CallbackError),
    Core(CoreError),
}

impl std::fmt::Display for GrammarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrammarError::Syntax { line, col, message } => {
                write!(f, "{line}:{col}: {message}")
            }
            GrammarError::DuplicateName { kind, name } => {
                write!(f, "{kind} `{name}` declared more than once")
            }
            GrammarError::UnknownName { kind, name } => {
                write!(f, "reference to undeclared {kind} `{name}`")
            }
            GrammarError::CaptureOutOfRange { n, max } => {
                write!(f, "capture reference $:{n} exceeds the rule's {max} term(s)")
            }
            GrammarError::UnknownCallable(name) => {
                write!(f, "`{name}` is neither a built-in action nor a declared struct")
            }
            GrammarError::Regexp(e) => write!(f, "{e}"),
            GrammarError::Lex(e) => write!(f, "{e}"),
            GrammarError::Peg(e) => write!(f, "{e}"),
            GrammarError::Callback(e) => write!(f, "{e}"),
            GrammarError::Core(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for GrammarError {}

impl From<RegexpError> for GrammarError {
    fn from(e: RegexpError) -> Self {
        GrammarError::Regexp(e)
    }
}
impl From<LexError> for GrammarError {
    fn from(e: LexError) -> Self {
        GrammarError::Lex(e)
    }
}
impl From<PegError> for GrammarError {
    fn from(e: PegError) -> Self {
        GrammarError::Peg(e)
    }
}
impl From<CallbackError> for GrammarError {
    fn from(e: CallbackError) -> Self {
        GrammarError::Callback(e)
    }
}
impl From<CoreError> for GrammarError {
    fn from(e: CoreError) -> Self {
        GrammarError::Core(e)
    }
}
