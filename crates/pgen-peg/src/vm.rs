//! PEG driver (`spec.md` §4.6 "VM invariants").
//!
//! A call-stack of rule activations, each owning its own backtrack
//! stack (balanced within that rule, per the invariant), plus one value
//! stack shared across the whole run. Token-level failure and explicit
//! `FAIL` both route through [`PegVm::fail`], which restores the most
//! recent backtrack record in the current call frame, or — if none
//! remains — abandons the frame (memoizing it as a failure) and retries
//! in the caller, cascading until either a record is found or the call
//! stack is empty (a genuine no-match).

use std::collections::HashMap;

use pgen_core::{ConsList, KlassRegistry, Token, Value};

use pgen_callback::{CallbackHost, Vm as CallbackVm};

use crate::error::{ExpectedItem, PegError};
use crate::opcode::{Op, RuleId};
use crate::rules::RuleTable;

struct BacktrackRecord {
    off: u32,
    pos: usize,
    height: usize,
}

struct Frame {
    rule: RuleId,
    return_pc: u32,
    entry_pos: usize,
    br_stack: Vec<BacktrackRecord>,
}

#[derive(Clone)]
enum MemoEntry {
    Success { value: Value, exit_pos: usize },
    Fail,
}

#[derive(Default)]
struct Deepest {
    pos: usize,
    expected: Vec<ExpectedItem>,
}

impl Deepest {
    fn record(&mut self, pos: usize, item: ExpectedItem) {
        if pos > self.pos {
            self.pos = pos;
            self.expected.clear();
        }
        if pos >= self.pos {
            self.expected.push(item);
        }
    }
}

pub struct PegVm<'a> {
    ops: &'a [Op],
    rules: &'a RuleTable,
    registry: &'a KlassRegistry,
}

impl<'a> PegVm<'a> {
    pub fn new(ops: &'a [Op], rules: &'a RuleTable, registry: &'a KlassRegistry) -> Self {
        PegVm { ops, rules, registry }
    }

    pub fn run(
        &self,
        tokens: &[Token],
        globals: &mut Vec<Value>,
        host: &mut dyn CallbackHost,
    ) -> Result<Value, PegError> {
        let mut pc: u32 = 1; // ops[0] is Meta
        let mut cursor = 0usize;
        let mut value_stack: Vec<Value> = Vec::new();
        let mut call_stack: Vec<Frame> = Vec::new();
        let mut memo: HashMap<(u32, usize), MemoEntry> = HashMap::new();
        let mut deepest = Deepest::default();

        loop {
            match &self.ops[pc as usize] {
                Op::Meta { .. } => pc += 1,
                Op::Push(v) => {
                    value_stack.push(v.clone());
                    pc += 1;
                }
                Op::Term { token_type } => {
                    if cursor < tokens.len() && tokens[cursor].ty == *token_type {
                        value_stack.push(tokens[cursor].value.clone());
                        cursor += 1;
                        pc += 1;
                    } else {
                        self.fail(
                            &mut call_stack,
                            &mut pc,
                            &mut cursor,
                            &mut value_stack,
                            &mut memo,
                            &mut deepest,
                            ExpectedItem::Token(*token_type),
                        )?;
                    }
                }
                Op::RuleCall { rule } => {
                    let entry_pos = cursor;
                    match memo.get(&(rule.0, entry_pos)) {
                        Some(MemoEntry::Success { value, exit_pos }) => {
                            value_stack.push(value.clone());
                            cursor = *exit_pos;
                            pc += 1;
                        }
                        Some(MemoEntry::Fail) => {
                            self.fail(
                                &mut call_stack,
                                &mut pc,
                                &mut cursor,
                                &mut value_stack,
                                &mut memo,
                                &mut deepest,
                                ExpectedItem::Rule(rule.0),
                            )?;
                        }
                        None => {
                            call_stack.push(Frame {
                                rule: *rule,
                                return_pc: pc + 1,
                                entry_pos,
                                br_stack: Vec::new(),
                            });
                            pc = self.rules.get(*rule).entry;
                        }
                    }
                }
                Op::RuleRet => {
                    let result = value_stack.pop().expect("RULE_RET with empty value stack");
                    let frame = call_stack.pop().expect("RULE_RET with empty call stack");
                    memo.insert(
                        (frame.rule.0, frame.entry_pos),
                        MemoEntry::Success { value: result.clone(), exit_pos: cursor },
                    );
                    value_stack.push(result);
                    pc = frame.return_pc;
                }
                Op::PushBr { off } => {
                    let frame = call_stack.last_mut().expect("PUSH_BR outside a rule");
                    frame.br_stack.push(BacktrackRecord { off: off.offset(), pos: cursor, height: value_stack.len() });
                    pc += 1;
                }
                Op::PopBr => {
                    let frame = call_stack.last_mut().expect("POP_BR outside a rule");
                    frame.br_stack.pop().expect("POP_BR with empty backtrack stack");
                    pc += 1;
                }
                Op::Unparse => {
                    let frame = call_stack.last_mut().expect("UNPARSE outside a rule");
                    let rec = frame.br_stack.pop().expect("UNPARSE with empty backtrack stack");
                    cursor = rec.pos;
                    value_stack.truncate(rec.height);
                    pc += 1;
                }
                Op::LoopUpdate { off } => {
                    let frame = call_stack.last_mut().expect("LOOP_UPDATE outside a rule");
                    let rec = frame.br_stack.last_mut().expect("LOOP_UPDATE with empty backtrack stack");
                    if cursor == rec.pos {
                        frame.br_stack.pop();
                        pc += 1;
                    } else {
                        rec.pos = cursor;
                        rec.height = value_stack.len();
                        pc = off.offset();
                    }
                }
                Op::Jmp(t) => pc = t.offset(),
                Op::ListMaybe => {
                    let top = value_stack.pop().expect("LIST_MAYBE with empty value stack");
                    let mut items = cons_to_vec(&top);
                    items.reverse();
                    value_stack.push(vec_to_cons(items));
                    pc += 1;
                }
                Op::Callback { arity, ops: body, next } => {
                    let n = *arity as usize;
                    let start = value_stack.len() - n;
                    let mut locals: Vec<Value> = value_stack.split_off(start);
                    let mut vm = CallbackVm::new(body, self.registry);
                    let result = vm.exec(&mut locals, globals, host)?;
                    value_stack.push(result);
                    pc = next.offset();
                }
                Op::Match => {
                    if cursor != tokens.len() {
                        return Err(PegError::UnexpectedToken { pos: cursor });
                    }
                    return Ok(value_stack.pop().unwrap_or(Value::Nil));
                }
                Op::Fail { info } => {
                    self.fail(
                        &mut call_stack,
                        &mut pc,
                        &mut cursor,
                        &mut value_stack,
                        &mut memo,
                        &mut deepest,
                        ExpectedItem::Explicit(*info),
                    )?;
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn fail(
        &self,
        call_stack: &mut Vec<Frame>,
        pc: &mut u32,
        cursor: &mut usize,
        value_stack: &mut Vec<Value>,
        memo: &mut HashMap<(u32, usize), MemoEntry>,
        deepest: &mut Deepest,
        reason: ExpectedItem,
    ) -> Result<(), PegError> {
        deepest.record(*cursor, reason);
        loop {
            let frame = match call_stack.last_mut() {
                Some(f) => f,
                None => {
                    return Err(PegError::NoMatch { pos: deepest.pos, expected: deepest.expected.clone() });
                }
            };
            if let Some(rec) = frame.br_stack.pop() {
                *cursor = rec.pos;
                value_stack.truncate(rec.height);
                *pc = rec.off;
                return Ok(());
            }
            let abandoned = call_stack.pop().unwrap();
            memo.insert((abandoned.rule.0, abandoned.entry_pos), MemoEntry::Fail);
        }
    }
}

fn cons_to_vec(v: &Value) -> Vec<Value> {
    match v {
        Value::Cons(c) => c.to_vec(),
        Value::Nil => Vec::new(),
        other => vec![other.clone()],
    }
}

fn vec_to_cons(items: Vec<Value>) -> Value {
    let list = ConsList::from_vec(items);
    if list.is_nil() { Value::Nil } else { Value::Cons(list) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use crate::compiler::compile;
    use crate::spec::{Atom, Branch, CallbackSpec, FoldKind, QTerm, RuleSpec};
    use pgen_callback::{CallbackError, NoBuiltins, Op as CallbackOp};
    use pgen_core::KlassRegistry;

    fn token(ty: u32, value: Value) -> Token {
        Token { ty, byte_pos: 0, byte_size: 0, line: 1, col: 1, value }
    }

    #[test]
    fn single_token_rule_matches_and_terminates() {
        let rule = RuleSpec {
            name: Rc::from("Digit"),
            body: Branch::Seq { terms: vec![QTerm::plain(Atom::Token(1))], callback: None },
        };
        let (ops, table) = compile(&[rule], "Digit").unwrap();
        let registry = KlassRegistry::new();
        let vm = PegVm::new(&ops, &table, &registry);
        let mut globals = Vec::new();
        let mut host = NoBuiltins;
        let tokens = vec![token(1, Value::Int(9))];
        let result = vm.run(&tokens, &mut globals, &mut host).unwrap();
        assert_eq!(result, Value::Int(9));
    }

    #[test]
    fn extra_trailing_token_is_unexpected() {
        let rule = RuleSpec {
            name: Rc::from("Digit"),
            body: Branch::Seq { terms: vec![QTerm::plain(Atom::Token(1))], callback: None },
        };
        let (ops, table) = compile(&[rule], "Digit").unwrap();
        let registry = KlassRegistry::new();
        let vm = PegVm::new(&ops, &table, &registry);
        let mut globals = Vec::new();
        let mut host = NoBuiltins;
        let tokens = vec![token(1, Value::Int(9)), token(1, Value::Int(1))];
        let err = vm.run(&tokens, &mut globals, &mut host).unwrap_err();
        assert!(matches!(err, PegError::UnexpectedToken { pos: 1 }));
    }

    #[test]
    fn choice_falls_back_to_second_alternative() {
        let a = Branch::Seq { terms: vec![QTerm::plain(Atom::Token(9))], callback: None };
        let b = Branch::Seq { terms: vec![QTerm::plain(Atom::Token(2))], callback: None };
        let rule = RuleSpec { name: Rc::from("AOrB"), body: Branch::Choice(vec![a, b]) };
        let (ops, table) = compile(&[rule], "AOrB").unwrap();
        let registry = KlassRegistry::new();
        let vm = PegVm::new(&ops, &table, &registry);
        let mut globals = Vec::new();
        let mut host = NoBuiltins;
        let tokens = vec![token(2, Value::Str(Rc::from("hi")))];
        let result = vm.run(&tokens, &mut globals, &mut host).unwrap();
        assert_eq!(result, Value::Str(Rc::from("hi")));
    }

    #[test]
    fn no_alternative_matches_reports_deepest_expected() {
        let a = Branch::Seq { terms: vec![QTerm::plain(Atom::Token(9))], callback: None };
        let b = Branch::Seq { terms: vec![QTerm::plain(Atom::Token(8))], callback: None };
        let rule = RuleSpec { name: Rc::from("AOrB"), body: Branch::Choice(vec![a, b]) };
        let (ops, table) = compile(&[rule], "AOrB").unwrap();
        let registry = KlassRegistry::new();
        let vm = PegVm::new(&ops, &table, &registry);
        let mut globals = Vec::new();
        let mut host = NoBuiltins;
        let tokens = vec![token(2, Value::Int(1))];
        let err = vm.run(&tokens, &mut globals, &mut host).unwrap_err();
        match err {
            PegError::NoMatch { pos, expected } => {
                assert_eq!(pos, 0);
                assert!(expected.contains(&ExpectedItem::Token(9)));
                assert!(expected.contains(&ExpectedItem::Token(8)));
            }
            other => panic!("expected NoMatch, got {other:?}"),
        }
    }

    struct AddHost;
    impl CallbackHost for AddHost {
        fn call(&mut self, fname: u32, args: Vec<Value>) -> Result<Value, CallbackError> {
            match (fname, args.as_slice()) {
                (0, [Value::Int(a), Value::Int(b)]) => Ok(Value::Int(a + b)),
                _ => Err(CallbackError::UnknownBuiltin(fname)),
            }
        }
    }

    #[test]
    fn left_fold_sums_repeated_terms() {
        // Sum = Digit /* (Plus Digit) { $1 + $3 }, with '+' (token 9)
        // discarded by the fold's own reduced callback arity (it still
        // occupies a term slot as token 9, contributing its own value,
        // but the callback only reads locals 0 and 2).
        let seed = Branch::Seq { terms: vec![QTerm::plain(Atom::Token(1))], callback: None };
        let add_cb = CallbackSpec {
            ops: Rc::from(vec![
                CallbackOp::Load(0),
                CallbackOp::Load(2),
                CallbackOp::Call { argc: 2, fname: 0 },
                CallbackOp::End,
            ]),
        };
        let rule = RuleSpec {
            name: Rc::from("Sum"),
            body: Branch::Fold {
                seed: Box::new(seed),
                kind: FoldKind::Star,
                rhs: vec![QTerm::plain(Atom::Token(9)), QTerm::plain(Atom::Token(1))],
                callback: add_cb,
            },
        };
        let (ops, table) = compile(&[rule], "Sum").unwrap();
        let registry = KlassRegistry::new();
        let vm = PegVm::new(&ops, &table, &registry);
        let mut globals = Vec::new();
        let mut host = AddHost;
        let tokens = vec![
            token(1, Value::Int(1)),
            token(9, Value::Nil),
            token(1, Value::Int(2)),
            token(9, Value::Nil),
            token(1, Value::Int(3)),
        ];
        let result = vm.run(&tokens, &mut globals, &mut host).unwrap();
        assert_eq!(result, Value::Int(6));
    }
}
