//! Lex bytecode compiler (`spec.md` §4.5 "Lex opcodes"/"Execution loop").
//! Takes the post-[`crate::inline`] context list and lays every context's
//! rules out as a fail-chain: each rule's `MATCH_RE`/`MATCH_STR` falls
//! through to the next rule on failure, and to its action on success; the
//! last rule's failure path (and a context with no rules at all) lands on
//! `CTX_END`.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::context::{ContextDef, ContextTable};
use crate::error::LexError;
use crate::labels::Labels;
use crate::opcode::{ContextId, Op, Target};
use crate::spec::{ContextSpec, Matcher, RuleAction};

pub fn compile(specs: &[ContextSpec]) -> Result<(Vec<Op>, ContextTable), LexError> {
    let name_to_id: HashMap<Rc<str>, ContextId> = specs
        .iter()
        .enumerate()
        .map(|(i, c)| (c.name.clone(), ContextId(i as u32)))
        .collect();

    let mut ops = vec![Op::Meta {
        context_count: specs.len() as u32,
    }];
    let mut labels = Labels::new();
    let mut table = ContextTable::new();

    for (i, spec) in specs.iter().enumerate() {
        let id = ContextId(i as u32);
        let ctx_end_label = labels.new_label();
        let entry = if spec.rules.is_empty() {
            ops.len() as u32 // placeholder, rebound below once we know ctx_end's real offset
        } else {
            0
        };
        let mut entry_offset = entry;

        let n = spec.rules.len();
        for (ri, rule) in spec.rules.iter().enumerate() {
            let match_label = labels.new_label();
            let fail_label = if ri + 1 < n {
                labels.new_label()
            } else {
                ctx_end_label
            };

            if ri == 0 {
                entry_offset = ops.len() as u32;
            }

            match &rule.matcher {
                Matcher::Literal(text) => ops.push(Op::MatchStr {
                    text: text.clone(),
                    on_match: Target::Label(match_label),
                    on_fail: Target::Label(fail_label),
                }),
                Matcher::Regex(prog) => ops.push(Op::MatchRe {
                    program: prog.clone(),
                    on_match: Target::Label(match_label),
                    on_fail: Target::Label(fail_label),
                }),
                Matcher::ContextRef(name) => {
                    return Err(LexError::UnknownContext(name.clone()));
                }
            }

            labels.define(match_label, ops.len() as u32);
            match &rule.action {
                RuleAction::Discard => ops.push(Op::Jmp(Target::Label(ctx_end_label))),
                RuleAction::Callback { capture_mask, ops: body } => ops.push(Op::Callback {
                    capture_mask: *capture_mask,
                    ops: body.clone(),
                    next: Target::Label(ctx_end_label),
                }),
                RuleAction::Push(name) => {
                    let target = *name_to_id
                        .get(name)
                        .ok_or_else(|| LexError::UnknownContext(name.clone()))?;
                    ops.push(Op::CtxCall {
                        context: target,
                        vars_size: 0,
                    });
                    ops.push(Op::Jmp(Target::Label(ctx_end_label)));
                }
                RuleAction::Pop => ops.push(Op::CtxEnd { forced_pop: true }),
            }

            if ri + 1 < n {
                labels.define(fail_label, ops.len() as u32);
            }
        }

        labels.define(ctx_end_label, ops.len() as u32);
        ops.push(Op::CtxEnd { forced_pop: false });

        table.push(ContextDef {
            id,
            name: spec.name.clone(),
            entry: entry_offset,
            vars_size: 0,
            begin: spec.begin.clone(),
            end: spec.end.clone(),
        });
    }

    labels.translate(&mut ops);
    debug!(contexts = specs.len(), ops = ops.len(), "compiled lex bytecode");
    Ok((ops, table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::RuleSpec;

    fn lit_rule(s: &str, action: RuleAction) -> RuleSpec {
        RuleSpec {
            matcher: Matcher::Literal(s.into()),
            action,
        }
    }

    #[test]
    fn single_rule_context_compiles() {
        let mut ctx = ContextSpec::new("Main");
        ctx.rules.push(lit_rule("x", RuleAction::Discard));
        let (ops, table) = compile(&[ctx]).unwrap();
        assert!(matches!(ops[0], Op::Meta { .. }));
        let def = table.get(ContextId(0));
        assert!(matches!(ops[def.entry as usize], Op::MatchStr { .. }));
    }

    #[test]
    fn push_action_resolves_target_context() {
        let mut comment = ContextSpec::new("Comment");
        comment.rules.push(lit_rule("*/", RuleAction::Pop));
        let mut main = ContextSpec::new("Main");
        main.rules
            .push(lit_rule("/*", RuleAction::Push("Comment".into())));
        let (ops, table) = compile(&[main, comment]).unwrap();
        let main_def = table.get(ContextId(0));
        let entry = main_def.entry as usize;
        match &ops[entry] {
            Op::MatchStr { on_match, .. } => {
                let m = on_match.offset() as usize;
                assert!(matches!(ops[m], Op::CtxCall { context: ContextId(1), .. }));
            }
            other => panic!("expected MatchStr, got {other:?}"),
        }
    }

    #[test]
    fn unknown_push_target_is_an_error() {
        let mut main = ContextSpec::new("Main");
        main.rules
            .push(lit_rule("/*", RuleAction::Push("Nope".into())));
        let err = compile(&[main]).unwrap_err();
        assert!(matches!(err, LexError::UnknownContext(_)));
    }
}
