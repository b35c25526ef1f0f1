//! Parser-instance API (`spec.md` §6 "Parser instance API"): `new` /
//! `reset` / `parse`, Rust's `Drop` standing in for the source's
//! explicit `free`.
//!
//! A compiled grammar can declare at most one root `lex` block and one
//! root `peg` block for `parse` to drive end to end — whichever each
//! list's first declaration is (`pgen-grammar` preserves source order).
//! Multiple `lex`/`peg` blocks beyond the first are still compiled and
//! reachable (a root context can `push`/reference them), just not
//! chosen as the entry point; this mirrors how `spec.md`'s own worked
//! example names exactly one of each (`Main`, `Program`).

use pgen_core::{KlassRegistry, Token, Value};

use pgen_callback::Vm as CallbackVm;
use pgen_lex::{ContextId, LexVm};
use pgen_peg::PegVm;

use crate::config::{CompileConfig, RuntimeConfig};
use crate::error::ParseError;
use crate::host::RuntimeHost;

/// A compiled grammar plus the mutable state one `parse` call threads
/// through both VMs (globals only — the lex/peg VMs each own their own
/// cursor/stack/call-frame state internally and don't persist it across
/// calls, so `reset` has nothing else to do).
pub struct ParserInstance {
    grammar: pgen_grammar::CompiledGrammar,
    globals: Vec<Value>,
    config: RuntimeConfig,
}

/// What a successful `parse` produced: the PEG-rule reduction value, and
/// (for inspection/debugging) the token stream the lex phase produced
/// along the way.
#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub value: Value,
    pub tokens: Vec<Token>,
}

impl ParserInstance {
    /// Compiles `source` (grammar-spec surface syntax) into a fresh
    /// instance, `config` defaulted per-call via [`RuntimeConfig`].
    ///
    /// `compile`'s `max_container_depth` is accepted but not yet wired
    /// through to the bytecode compiler — `pgen_grammar::compile_grammar`
    /// takes no config today, so this knob is a placeholder for a future
    /// compiler revision rather than an active limit (see `DESIGN.md`'s
    /// `pgen-runtime` entry, alongside the similar `step_budget` gap).
    pub fn new(source: &str, _compile: CompileConfig) -> Result<ParserInstance, ParseError> {
        let grammar = pgen_grammar::compile_grammar(source)?;
        let globals = vec![Value::Nil; grammar.global_count as usize];
        Ok(ParserInstance { grammar, globals, config: RuntimeConfig::default() })
    }

    /// Clears global-variable state between `parse` calls on the same
    /// compiled grammar (the source's `reset`; bytecode and klass
    /// metadata are immutable after compilation and don't need resetting).
    pub fn reset(&mut self) {
        for g in &mut self.globals {
            *g = Value::Nil;
        }
    }

    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> RuntimeConfig {
        self.config
    }

    pub fn klasses(&self) -> &KlassRegistry {
        &self.grammar.klasses
    }

    /// Runs `bytes` through the compiled lex phase (if any), then feeds
    /// the resulting tokens through the compiled peg phase (if any).
    /// A grammar with only a `lex` block returns its `end` hook's yield
    /// value with an empty token vec consumed; a grammar with only a
    /// `peg` block treats `bytes` as nothing (no lexer to tokenize it) —
    /// almost every real grammar declares both.
    pub fn parse(&mut self, bytes: &[u8]) -> Result<ParseOutput, ParseError> {
        tracing::debug!(len = bytes.len(), "parse starting");
        let mut host = RuntimeHost::new();

        let (tokens, lex_yield) = match &self.grammar.lex {
            Some(lex) => {
                let root = ContextId(0);
                let vm = LexVm::new(&lex.ops, &lex.contexts, &self.grammar.klasses);
                let result = vm.run(root, bytes, &mut self.globals, &mut host)?;
                (result.tokens, result.result)
            }
            None => (Vec::new(), Value::Nil),
        };

        let value = match self.grammar.pegs.first() {
            Some(peg) => {
                let vm = PegVm::new(&peg.ops, &peg.rules, &self.grammar.klasses);
                vm.run(&tokens, &mut self.globals, &mut host)?
            }
            None => lex_yield,
        };

        tracing::debug!(tokens = tokens.len(), "parse finished");
        Ok(ParseOutput { value, tokens })
    }

    /// Runs a callback body directly against the compiled grammar's
    /// klass registry and globals — used by tests and by hosts that want
    /// to invoke a lone `struct`/`var` definition without a full
    /// lex/peg pipeline.
    pub fn eval_ops(&mut self, ops: &[pgen_callback::Op], locals: &mut Vec<Value>) -> Result<Value, ParseError> {
        let mut host = RuntimeHost::new();
        let mut vm = CallbackVm::new(ops, &self.grammar.klasses);
        Ok(vm.exec(locals, &mut self.globals, &mut host)?)
    }
}
