//! The callback VM dispatches `CALL` to a host-provided table rather than
//! knowing about built-ins itself — `pgen-runtime` implements
//! [`CallbackHost`] with the action catalogue from `spec.md` §6
//! (`token/1`, `yield/1`, `parse_int/1`, …). Keeping the dispatch behind
//! a trait here is what lets `pgen-lex` and `pgen-peg` share one VM
//! without depending on the concrete runtime.

use pgen_core::Value;

use crate::error::CallbackError;

pub trait CallbackHost {
    /// Invoke built-in `fname` with `args` (already popped off the value
    /// stack, in left-to-right call order) and return its result.
    fn call(&mut self, fname: u32, args: Vec<Value>) -> Result<Value, CallbackError>;
}

/// A host that rejects every call; useful for tests exercising pure
/// stack/container manipulation without built-ins.
pub struct NoBuiltins;

impl CallbackHost for NoBuiltins {
    fn call(&mut self, fname: u32, _args: Vec<Value>) -> Result<Value, CallbackError> {
        Err(CallbackError::UnknownBuiltin(fname))
    }
}
