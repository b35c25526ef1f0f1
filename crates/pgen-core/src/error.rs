//! Core-layer error type.
//!
//! Follows the teacher's hand-rolled error pattern (see
//! `seq-compiler::codegen::error::CodeGenError`): a plain enum with manual
//! `Display`/`Error` impls rather than pulling in `thiserror`, since the
//! teacher's whole dependency stack never reaches for it either.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A struct instance was built with the wrong number of fields.
    ArityMismatch {
        klass: String,
        expected: usize,
        got: usize,
    },
    /// A klass id has no registered definition.
    UnknownKlass(u32),
    /// A klass name collides with an existing, differently-shaped klass.
    DuplicateKlass(String),
    /// An index was out of bounds for a persistent collection operation.
    IndexOutOfBounds { index: i64, size: usize },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::ArityMismatch {
                klass,
                expected,
                got,
            } => write!(
                f,
                "struct `{klass}` expects {expected} field(s), got {got}"
            ),
            CoreError::UnknownKlass(id) => write!(f, "unknown klass id {id}"),
            CoreError::DuplicateKlass(name) => write!(f, "klass `{name}` already defined"),
            CoreError::IndexOutOfBounds { index, size } => {
                write!(f, "index {index} out of bounds for size {size}")
            }
        }
    }
}

impl std::error::Error for CoreError {}
