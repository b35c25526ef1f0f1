//! Lex driver (`spec.md` §4.5 "Execution loop").
//!
//! A context stack plus one shared op slice. Each iteration of the outer
//! loop runs one context's current round to a boundary (`CtxCall` or
//! `CtxEnd`); round boundaries are where the loop may push, pop, loop
//! back within the same context, or terminate.

use std::rc::Rc;

use pgen_core::{KlassRegistry, Token, Value};

use pgen_callback::{CallbackHost, Vm as CallbackVm};
use pgen_regexp::{MatchResult, Regexp};

use crate::context::ContextTable;
use crate::error::LexError;
use crate::host::{SourcePos, TokenSink};
use crate::opcode::{ContextId, Op};

/// The most recent successful match in the current round, kept around so
/// a following `CALLBACK` op can materialize captures (`spec.md` §4.5
/// step 3). `MATCH_STR` has no sub-groups — only group 0 (the whole
/// literal span) is ever available for it.
struct LastMatch {
    start: usize,
    end: usize,
    groups: Option<MatchResult>,
}

/// Materializes the captures named by `capture_mask`'s set bits, in
/// increasing capture-index order, as runtime strings over `input`.
/// These land in `locals[0..k]`, since `pgen_callback::Vm::exec` takes
/// its locals vector by mutable reference — the only externally
/// writable input channel a callback program has, and the natural place
/// for `$0`, `$1`, … to resolve via ordinary `Load`.
fn materialize_captures(capture_mask: u16, last: &Option<LastMatch>, input: &[u8]) -> Vec<Value> {
    let mut out = Vec::new();
    let Some(last) = last else { return out };
    for i in 0..16u16 {
        if capture_mask & (1 << i) == 0 {
            continue;
        }
        let span = if i == 0 {
            // $0 is the whole match, not capture group 0.
            Some((last.start, last.end))
        } else {
            last.groups.as_ref().and_then(|g| g.group(i - 1))
        };
        let value = match span {
            Some((from, to)) => Value::Str(Rc::from(String::from_utf8_lossy(&input[from..to]).into_owned())),
            None => Value::Nil,
        };
        out.push(value);
    }
    out
}

struct Frame {
    ctx: ContextId,
    pc: u32,
    locals: Vec<Value>,
    round_matched: bool,
    result: Value,
}

pub struct LexResult {
    pub tokens: Vec<Token>,
    pub result: Value,
}

pub struct LexVm<'a> {
    ops: &'a [Op],
    contexts: &'a ContextTable,
    registry: &'a KlassRegistry,
}

impl<'a> LexVm<'a> {
    pub fn new(ops: &'a [Op], contexts: &'a ContextTable, registry: &'a KlassRegistry) -> Self {
        LexVm { ops, contexts, registry }
    }

    pub fn run(
        &self,
        root: ContextId,
        input: &[u8],
        globals: &mut Vec<Value>,
        host: &mut dyn CallbackHost,
    ) -> Result<LexResult, LexError> {
        let mut tokens = Vec::new();
        let mut cursor = 0usize;
        let mut line = 1u32;
        let mut col = 1u32;
        let mut stack: Vec<Frame> = Vec::new();
        let mut last_match: Option<LastMatch> = None;

        self.push_context(&mut stack, root, globals, host)?;

        loop {
            let ctx_id = stack.last().unwrap().ctx;
            let entry = self.contexts.get(ctx_id).entry;
            let mut pc = stack.last().unwrap().pc;

            let boundary = loop {
                match &self.ops[pc as usize] {
                    Op::Meta { .. } => pc += 1,
                    Op::MatchRe { program, on_match, on_fail } => {
                        match Regexp::from_program((**program).clone()).exec(input, cursor) {
                            Some(m) => {
                                let consumed = &input[m.start..m.end];
                                advance_pos(consumed, &mut line, &mut col);
                                let (start, end) = (m.start, m.end);
                                cursor = end;
                                last_match = Some(LastMatch { start, end, groups: Some(m) });
                                stack.last_mut().unwrap().round_matched = true;
                                pc = on_match.offset();
                            }
                            None => pc = on_fail.offset(),
                        }
                    }
                    Op::MatchStr { text, on_match, on_fail } => {
                        let bytes = text.as_bytes();
                        if input[cursor..].starts_with(bytes) {
                            advance_pos(bytes, &mut line, &mut col);
                            let start = cursor;
                            cursor += bytes.len();
                            last_match = Some(LastMatch { start, end: cursor, groups: None });
                            stack.last_mut().unwrap().round_matched = true;
                            pc = on_match.offset();
                        } else {
                            pc = on_fail.offset();
                        }
                    }
                    Op::Callback { capture_mask, ops: body, next } => {
                        let materialized = materialize_captures(*capture_mask, &last_match, input);
                        let frame = stack.last_mut().unwrap();
                        if materialized.len() > frame.locals.len() {
                            frame.locals.resize(materialized.len(), Value::Nil);
                        }
                        for (i, v) in materialized.into_iter().enumerate() {
                            frame.locals[i] = v;
                        }
                        let (byte_pos, byte_size) = match &last_match {
                            Some(lm) => (lm.start, lm.end - lm.start),
                            None => (cursor, 0),
                        };
                        let mut sink = TokenSink {
                            inner: &mut *host,
                            tokens: &mut tokens,
                            pos: SourcePos { byte_pos, byte_size, line, col },
                            result: &mut frame.result,
                        };
                        let mut vm = CallbackVm::new(body, self.registry);
                        vm.exec(&mut frame.locals, globals, &mut sink)
                            .map_err(LexError::from)?;
                        pc = next.offset();
                    }
                    Op::CtxCall { context, vars_size } => {
                        // Resume just past the call once the pushed
                        // context pops, not on the call instruction again.
                        stack.last_mut().unwrap().pc = pc + 1;
                        break Boundary::Push(*context, *vars_size);
                    }
                    Op::CtxEnd { forced_pop } => {
                        stack.last_mut().unwrap().pc = pc;
                        break Boundary::End(*forced_pop);
                    }
                    Op::Jmp(t) => pc = t.offset(),
                }
            };

            match boundary {
                Boundary::Push(target, _vars_size) => {
                    self.push_context(&mut stack, target, globals, host)?;
                }
                Boundary::End(forced) => {
                    if forced {
                        let popped = self.pop_context(&mut stack, globals, host)?;
                        if stack.is_empty() {
                            return Ok(LexResult { tokens, result: popped });
                        }
                    } else if stack.last().unwrap().round_matched {
                        let frame = stack.last_mut().unwrap();
                        frame.round_matched = false;
                        frame.pc = entry;
                    } else if stack.len() == 1 {
                        // Terminating with nothing left on the stack is
                        // only a clean finish if the whole input was
                        // consumed; stalling mid-input is the "no match"
                        // failure from `spec.md` §7.
                        if cursor < input.len() {
                            let ctx_name = self.contexts.get(ctx_id).name.clone();
                            return Err(LexError::NoMatch {
                                context: ctx_name,
                                pos: cursor,
                            });
                        }
                        let popped = self.pop_context(&mut stack, globals, host)?;
                        return Ok(LexResult { tokens, result: popped });
                    } else {
                        // Recovery (`spec.md` §7): an end-of-round without
                        // a match in a non-root context pops silently and
                        // resumes the parent right after its `CtxCall`.
                        self.pop_context(&mut stack, globals, host)?;
                    }
                }
            }
        }
    }

    fn push_context(
        &self,
        stack: &mut Vec<Frame>,
        id: ContextId,
        globals: &mut Vec<Value>,
        host: &mut dyn CallbackHost,
    ) -> Result<(), LexError> {
        let def = self.contexts.get(id);
        let mut locals = vec![Value::Nil; def.vars_size as usize];
        let mut result = Value::Nil;
        if let Some(begin) = &def.begin {
            let mut tokens_sink_tokens = Vec::new();
            let mut sink = TokenSink {
                inner: host,
                tokens: &mut tokens_sink_tokens,
                pos: SourcePos::default(),
                result: &mut result,
            };
            let mut vm = CallbackVm::new(begin, self.registry);
            vm.exec(&mut locals, globals, &mut sink)?;
        }
        stack.push(Frame {
            ctx: id,
            pc: def.entry,
            locals,
            round_matched: false,
            result,
        });
        Ok(())
    }

    fn pop_context(
        &self,
        stack: &mut Vec<Frame>,
        globals: &mut Vec<Value>,
        host: &mut dyn CallbackHost,
    ) -> Result<Value, LexError> {
        let mut frame = stack.pop().expect("pop_context called on empty stack");
        let def = self.contexts.get(frame.ctx);
        if let Some(end) = &def.end {
            let mut tokens_sink_tokens = Vec::new();
            let mut sink = TokenSink {
                inner: host,
                tokens: &mut tokens_sink_tokens,
                pos: SourcePos::default(),
                result: &mut frame.result,
            };
            let mut vm = CallbackVm::new(end, self.registry);
            vm.exec(&mut frame.locals, globals, &mut sink)?;
        }
        Ok(frame.result)
    }
}

enum Boundary {
    Push(ContextId, u32),
    End(bool),
}

fn advance_pos(consumed: &[u8], line: &mut u32, col: &mut u32) {
    for &b in consumed {
        if b == b'\n' {
            *line += 1;
            *col = 1;
        } else {
            *col += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::spec::{ContextSpec, Matcher, RuleAction, RuleSpec};
    use pgen_callback::{CallbackError, NoBuiltins, Op as CallbackOp};
    use pgen_core::KlassRegistry;

    struct CountingHost {
        calls: Vec<(u32, Vec<Value>)>,
    }

    impl CallbackHost for CountingHost {
        fn call(&mut self, fname: u32, args: Vec<Value>) -> Result<Value, CallbackError> {
            self.calls.push((fname, args));
            Ok(Value::Nil)
        }
    }

    #[test]
    fn discard_rule_advances_cursor_then_terminates_on_exhaustion() {
        let mut ctx = ContextSpec::new("Main");
        ctx.rules.push(RuleSpec {
            matcher: Matcher::Literal("ab".into()),
            action: RuleAction::Discard,
        });
        let (ops, table) = compile(&[ctx]).unwrap();
        let registry = KlassRegistry::new();
        let vm = LexVm::new(&ops, &table, &registry);
        let mut globals = Vec::new();
        let mut host = NoBuiltins;
        // Round 1 matches "ab" and loops back; round 2 fails against the
        // now-empty remainder, and since Main is the only frame on the
        // stack that is a clean termination, not an error.
        let result = vm
            .run(ContextId(0), b"ab", &mut globals, &mut host)
            .unwrap();
        assert!(result.tokens.is_empty());
        assert_eq!(result.result, Value::Nil);
    }

    #[test]
    fn push_and_pop_round_trip() {
        let mut comment = ContextSpec::new("Comment");
        comment.rules.push(RuleSpec {
            matcher: Matcher::Literal("*/".into()),
            action: RuleAction::Pop,
        });
        let any_char = pgen_regexp::parser::parse(".").unwrap();
        let any_char = pgen_regexp::compiler::compile(&any_char).unwrap();
        comment.rules.push(RuleSpec {
            matcher: Matcher::Regex(Rc::new(any_char)),
            action: RuleAction::Discard,
        });
        let mut main = ContextSpec::new("Main");
        main.rules.push(RuleSpec {
            matcher: Matcher::Literal("/*".into()),
            action: RuleAction::Push("Comment".into()),
        });
        main.end = Some(Rc::from(vec![CallbackOp::Push(Value::Nil), CallbackOp::End]));
        let (ops, table) = compile(&[main, comment]).unwrap();
        let registry = KlassRegistry::new();
        let vm = LexVm::new(&ops, &table, &registry);
        let mut globals = Vec::new();
        let mut host = CountingHost { calls: Vec::new() };
        let result = vm
            .run(ContextId(0), b"/*hi*/", &mut globals, &mut host)
            .unwrap();
        assert!(result.tokens.is_empty());
    }
}
