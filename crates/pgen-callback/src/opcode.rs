//! Callback bytecode (`spec.md` §4.4). Shared between lexer rule
//! callbacks (`pgen-lex`) and PEG rule callbacks (`pgen-peg`, which uses
//! the reduced subset called out in §4.6 — no `LOAD`/`STORE` of locals,
//! by design).

use pgen_core::{KlassId, Value};

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
    Meta { max_container_depth: u32 },
    Load(u32),
    Store(u32),
    LoadGlob(u32),
    StoreGlob(u32),
    Push(Value),
    Pop,
    NodeBeg(KlassId),
    NodeSet,
    NodeSetV,
    NodeEnd,
    List,
    ListV,
    Jif(Target),
    Junless(Target),
    Jmp(Target),
    /// Invoke a built-in action (`spec.md` §6 catalogue) by id, popping
    /// `argc` arguments off the value stack.
    Call { argc: u32, fname: u32 },
    End,
}
