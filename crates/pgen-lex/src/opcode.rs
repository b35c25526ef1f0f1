//! Lex bytecode (`spec.md` §4.5). `MATCH_RE`/`MATCH_STR`/`CALLBACK`/
//! `CTX_CALL`/`CTX_END` plus a bare `Jmp` for chaining rule-match
//! attempts within a round — the `PUSH`/`POP`/`LOAD`/`STORE` shared with
//! the callback bytecode only ever appear *inside* an embedded
//! [`pgen_callback::Op`] sequence here (a rule's `Callback` payload, or a
//! context's `begin`/`end` hook), never loose in the lex stream itself.
//!
//! `push(ctx)`/`pop` written as a rule's entire callback body are not
//! lowered to a generic `Callback` payload — the grammar compiler
//! recognizes them as structural and emits [`Op::CtxCall`]/
//! [`Op::CtxEnd`] directly, since pushing/popping the context stack is a
//! lex-VM-level operation no generic [`pgen_callback::CallbackHost`]
//! has the state to perform.

use std::rc::Rc;

use pgen_callback::Op as CallbackOp;
use pgen_regexp::Program as RegexProgram;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContextId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Label(LabelId),
    Offset(u32),
}

impl Target {
    pub fn offset(&self) -> u32 {
        match self {
            Target::Offset(o) => *o,
            Target::Label(l) => panic!("label {l:?} never translated"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Meta { context_count: u32 },
    MatchRe {
        program: Rc<RegexProgram>,
        on_match: Target,
        on_fail: Target,
    },
    MatchStr {
        text: Rc<str>,
        on_match: Target,
        on_fail: Target,
    },
    /// Materializes `popcount(capture_mask)` string values from the most
    /// recent successful match's capture array (capture-index order),
    /// runs `ops`, then jumps to `next`. The embedded program's return
    /// value is discarded (`spec.md` §4.5 step 3) — side effects land in
    /// locals, globals, the token stream, or the context's `result`.
    Callback {
        capture_mask: u16,
        ops: Rc<[CallbackOp]>,
        next: Target,
    },
    CtxCall { context: ContextId, vars_size: u32 },
    /// `forced_pop` distinguishes an explicit `pop` action (pop this
    /// instant, regardless of whether this round matched anything) from
    /// the implicit end-of-round pop (only when `round_matched` is
    /// false).
    CtxEnd { forced_pop: bool },
    Jmp(Target),
}
