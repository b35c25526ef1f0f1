//! Pre-bytecode lex IR (`spec.md` §4.5 "Grammar-level model"). `pgen-grammar`
//! builds this from the surface grammar syntax; [`crate::inline`] and
//! [`crate::compiler`] turn it into runnable bytecode.

use std::rc::Rc;

use pgen_callback::Op as CallbackOp;
use pgen_regexp::Program as RegexProgram;

#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    Literal(Rc<str>),
    Regex(Rc<RegexProgram>),
    /// A bare reference to another context used as an entire rule —
    /// `spec.md`'s "reference to another context (which causes a push)".
    /// When the target is only ever used this way it gets inlined
    /// (see [`crate::inline`]); it can *also* be a genuine push target
    /// via [`RuleAction::Push`] — nothing about a bare reference forces
    /// its target out of the compiled context set.
    ContextRef(Rc<str>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleAction {
    /// No callback: a successful match just advances the cursor.
    Discard,
    Callback { capture_mask: u16, ops: Rc<[CallbackOp]> },
    /// A callback body that is exactly `push(name)` — compiled directly
    /// to `Op::CtxCall`, not wrapped in a generic `Callback` payload.
    Push(Rc<str>),
    /// A callback body that is exactly `pop` — compiled directly to
    /// `Op::CtxEnd { forced_pop: true }`.
    Pop,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleSpec {
    pub matcher: Matcher,
    pub action: RuleAction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextSpec {
    pub name: Rc<str>,
    /// Name begins with `*` — a naming convention flagging "meant to be
    /// used as a reusable rule fragment". Informational only: see
    /// `crate::inline`'s module doc for why this crate does not treat it
    /// as forcing the context out of the compiled set.
    pub is_partial: bool,
    pub begin: Option<Rc<[CallbackOp]>>,
    pub rules: Vec<RuleSpec>,
    pub end: Option<Rc<[CallbackOp]>>,
}

impl ContextSpec {
    pub fn new(name: impl Into<Rc<str>>) -> Self {
        let name = name.into();
        let is_partial = name.starts_with('*');
        ContextSpec {
            name,
            is_partial,
            begin: None,
            rules: Vec::new(),
            end: None,
        }
    }
}
