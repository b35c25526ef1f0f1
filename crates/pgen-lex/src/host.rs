//! `token`/`yield` interception (`spec.md` §4.5 "Token emission").
//!
//! Both actions need state the generic [`CallbackHost`] doesn't carry:
//! `token` stamps the current source position, `yield` writes into the
//! *current context's* `result` slot. [`TokenSink`] wraps an inner host
//! and intercepts these two reserved built-in ids itself, delegating
//! everything else — `parse_int`, `concat_char`, and the rest of the
//! catalogue `pgen-runtime` implements — to the inner host unchanged.

use pgen_core::{Token, Value};

use pgen_callback::{CallbackError, CallbackHost};

/// Reserved built-in ids the grammar compiler must emit for `token(...)`.
pub const BUILTIN_TOKEN: u32 = 0;
/// Reserved built-in id for `yield(...)`.
pub const BUILTIN_YIELD: u32 = 1;

#[derive(Debug, Clone, Copy, Default)]
pub struct SourcePos {
    pub byte_pos: usize,
    pub byte_size: usize,
    pub line: u32,
    pub col: u32,
}

pub struct TokenSink<'h> {
    pub inner: &'h mut dyn CallbackHost,
    pub tokens: &'h mut Vec<Token>,
    pub pos: SourcePos,
    pub result: &'h mut Value,
}

impl<'h> CallbackHost for TokenSink<'h> {
    fn call(&mut self, fname: u32, mut args: Vec<Value>) -> Result<Value, CallbackError> {
        match fname {
            BUILTIN_TOKEN => {
                if args.is_empty() || args.len() > 2 {
                    return Err(CallbackError::Host("token/1,2 requires 1 or 2 args".into()));
                }
                let value = if args.len() == 2 { args.remove(1) } else { Value::Nil };
                let ty = match &args[0] {
                    Value::Int(i) => *i as u32,
                    Value::StrLit(id) => *id,
                    _ => return Err(CallbackError::Host("token/1,2 requires a type".into())),
                };
                self.tokens.push(Token {
                    ty,
                    byte_pos: self.pos.byte_pos,
                    byte_size: self.pos.byte_size,
                    line: self.pos.line,
                    col: self.pos.col,
                    value,
                });
                Ok(Value::Nil)
            }
            BUILTIN_YIELD => {
                let v = args.into_iter().next().unwrap_or(Value::Nil);
                *self.result = v;
                Ok(Value::Nil)
            }
            other => self.inner.call(other, args),
        }
    }
}
