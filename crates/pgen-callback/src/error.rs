//! Callback-VM errors (`spec.md` §4.4, §7 "callback-type error").

use pgen_core::KlassId;

#[derive(Debug, Clone, PartialEq)]
pub enum CallbackError {
    StackUnderflow,
    NoActiveContainer,
    /// `NODE_SET`/`NODE_SETV` tried to fill more fields than the klass has.
    NodeOverfill { klass: KlassId },
    /// `NODE_END` ran with fewer fields filled than the klass declares.
    NodeUnderfill { klass: KlassId, filled: usize, limit: usize },
    /// `NODE_SETV` popped something that wasn't a cons-list or nil.
    SplatNotList,
    /// `LIST`/`LISTV` popped something that wasn't a cons-list where one
    /// was required.
    NotAConsList,
    UnknownKlass(KlassId),
    /// `CALL` referenced a built-in not registered with the host.
    UnknownBuiltin(u32),
    /// A built-in raised a domain error (wrong arity, bad argument type).
    Host(String),
}

impl std::fmt::Display for CallbackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallbackError::StackUnderflow => write!(f, "callback value stack underflow"),
            CallbackError::NoActiveContainer => write!(f, "NODE_SET/NODE_END with no active NODE_BEG"),
            CallbackError::NodeOverfill { klass } => write!(f, "overfilled struct of klass {klass}"),
            CallbackError::NodeUnderfill { klass, filled, limit } => write!(
                f,
                "struct of klass {klass} underfilled: {filled}/{limit} fields set"
            ),
            CallbackError::SplatNotList => write!(f, "NODE_SETV requires a cons-list or nil on top of stack"),
            CallbackError::NotAConsList => write!(f, "LIST/LISTV requires a cons-list operand"),
            CallbackError::UnknownKlass(id) => write!(f, "unknown klass {id}"),
            CallbackError::UnknownBuiltin(id) => write!(f, "unknown built-in method id {id}"),
            CallbackError::Host(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for CallbackError {}
