//! Callback bytecode VM (`spec.md` §4.4 "VM").
//!
//! Two stacks: a shared value stack, and a container-info stack tracking
//! in-progress `NODE_BEG`/`NODE_END` struct construction. The source keeps
//! locals on the same value stack above a per-context base pointer; here
//! each call gets its own `locals` vector instead — same binding
//! semantics (LOAD/STORE by index within the current frame), simpler
//! ownership, since nothing in this VM ever takes a pointer into the
//! middle of the value stack the way the source's base-pointer arithmetic
//! does.

use pgen_core::{ConsList, KlassRegistry, StructInstance, Value};
use std::rc::Rc;

use crate::error::CallbackError;
use crate::host::CallbackHost;
use crate::opcode::Op;

struct ContainerFrame {
    klass: pgen_core::KlassId,
    instance: Rc<StructInstance>,
    limit: usize,
    filled: usize,
}

pub struct Vm<'a> {
    ops: &'a [Op],
    registry: &'a KlassRegistry,
    stack: Vec<Value>,
    containers: Vec<ContainerFrame>,
}

impl<'a> Vm<'a> {
    pub fn new(ops: &'a [Op], registry: &'a KlassRegistry) -> Self {
        Vm {
            ops,
            registry,
            stack: Vec::new(),
            containers: Vec::new(),
        }
    }

    fn pop(&mut self) -> Result<Value, CallbackError> {
        self.stack.pop().ok_or(CallbackError::StackUnderflow)
    }

    /// Runs from instruction 0 to `End`, returning the value left on top
    /// of the stack (or `Value::Nil` if the program never pushed one).
    pub fn exec(
        &mut self,
        locals: &mut Vec<Value>,
        globals: &mut Vec<Value>,
        host: &mut dyn CallbackHost,
    ) -> Result<Value, CallbackError> {
        let mut pc: usize = 0;
        loop {
            match &self.ops[pc] {
                Op::Meta { .. } => pc += 1,
                Op::Load(id) => {
                    let v = locals.get(*id as usize).cloned().unwrap_or(Value::Nil);
                    self.stack.push(v);
                    pc += 1;
                }
                Op::Store(id) => {
                    let v = self.pop()?;
                    let id = *id as usize;
                    if id >= locals.len() {
                        locals.resize(id + 1, Value::Nil);
                    }
                    locals[id] = v;
                    pc += 1;
                }
                Op::LoadGlob(id) => {
                    let v = globals.get(*id as usize).cloned().unwrap_or(Value::Nil);
                    self.stack.push(v);
                    pc += 1;
                }
                Op::StoreGlob(id) => {
                    let v = self.pop()?;
                    let id = *id as usize;
                    if id >= globals.len() {
                        globals.resize(id + 1, Value::Nil);
                    }
                    globals[id] = v;
                    pc += 1;
                }
                Op::Push(v) => {
                    self.stack.push(v.clone());
                    pc += 1;
                }
                Op::Pop => {
                    self.pop()?;
                    pc += 1;
                }
                Op::NodeBeg(klass) => {
                    let def = self
                        .registry
                        .get(*klass)
                        .ok_or(CallbackError::UnknownKlass(*klass))?;
                    let limit = def.field_count();
                    let instance = Rc::new(StructInstance::new(*klass, limit));
                    self.stack.push(Value::Struct(instance.clone()));
                    self.containers.push(ContainerFrame {
                        klass: *klass,
                        instance,
                        limit,
                        filled: 0,
                    });
                    pc += 1;
                }
                Op::NodeSet => {
                    let v = self.pop()?;
                    let frame = self
                        .containers
                        .last_mut()
                        .ok_or(CallbackError::NoActiveContainer)?;
                    if frame.filled >= frame.limit {
                        return Err(CallbackError::NodeOverfill { klass: frame.klass });
                    }
                    frame.instance.set(frame.filled, v);
                    frame.filled += 1;
                    pc += 1;
                }
                Op::NodeSetV => {
                    let v = self.pop()?;
                    let items = cons_or_nil(&v)?;
                    let frame = self
                        .containers
                        .last_mut()
                        .ok_or(CallbackError::NoActiveContainer)?;
                    for item in items {
                        if frame.filled >= frame.limit {
                            return Err(CallbackError::NodeOverfill { klass: frame.klass });
                        }
                        frame.instance.set(frame.filled, item);
                        frame.filled += 1;
                    }
                    pc += 1;
                }
                Op::NodeEnd => {
                    let frame = self
                        .containers
                        .pop()
                        .ok_or(CallbackError::NoActiveContainer)?;
                    if frame.filled != frame.limit {
                        return Err(CallbackError::NodeUnderfill {
                            klass: frame.klass,
                            filled: frame.filled,
                            limit: frame.limit,
                        });
                    }
                    pc += 1;
                }
                Op::List => {
                    let tail = self.pop()?;
                    let head = self.pop()?;
                    let tail = cons_list(&tail)?;
                    self.stack.push(Value::Cons(ConsList::cons(head, tail)));
                    pc += 1;
                }
                Op::ListV => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    let a = cons_list(&a)?;
                    let b = cons_list(&b)?;
                    self.stack.push(Value::Cons(a.concat(&b)));
                    pc += 1;
                }
                Op::Jif(t) => {
                    let v = self.pop()?;
                    pc = if v.is_truthy() { t.offset() as usize } else { pc + 1 };
                }
                Op::Junless(t) => {
                    let v = self.pop()?;
                    pc = if !v.is_truthy() { t.offset() as usize } else { pc + 1 };
                }
                Op::Jmp(t) => pc = t.offset() as usize,
                Op::Call { argc, fname } => {
                    let mut args = Vec::with_capacity(*argc as usize);
                    for _ in 0..*argc {
                        args.push(self.pop()?);
                    }
                    args.reverse();
                    let result = host.call(*fname, args)?;
                    self.stack.push(result);
                    pc += 1;
                }
                Op::End => return Ok(self.stack.last().cloned().unwrap_or(Value::Nil)),
            }
        }
    }
}

fn cons_or_nil(v: &Value) -> Result<ConsList, CallbackError> {
    match v {
        Value::Cons(c) => Ok(c.clone()),
        Value::Nil => Ok(ConsList::nil()),
        _ => Err(CallbackError::SplatNotList),
    }
}

fn cons_list(v: &Value) -> Result<ConsList, CallbackError> {
    match v {
        Value::Cons(c) => Ok(c.clone()),
        Value::Nil => Ok(ConsList::nil()),
        _ => Err(CallbackError::NotAConsList),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NoBuiltins;
    use crate::opcode::Target;
    use pgen_core::{KlassRegistry, Value};

    fn run(ops: Vec<Op>, registry: &KlassRegistry) -> Result<Value, CallbackError> {
        let mut vm = Vm::new(&ops, registry);
        let mut locals = Vec::new();
        let mut globals = Vec::new();
        vm.exec(&mut locals, &mut globals, &mut NoBuiltins)
    }

    #[test]
    fn push_and_end_returns_top() {
        let registry = KlassRegistry::new();
        let ops = vec![Op::Push(Value::Int(42)), Op::End];
        assert_eq!(run(ops, &registry), Ok(Value::Int(42)));
    }

    #[test]
    fn local_round_trips_through_store_load() {
        let registry = KlassRegistry::new();
        let ops = vec![
            Op::Push(Value::Int(7)),
            Op::Store(0),
            Op::Load(0),
            Op::End,
        ];
        assert_eq!(run(ops, &registry), Ok(Value::Int(7)));
    }

    #[test]
    fn node_construction_fills_struct_fields() {
        let registry = KlassRegistry::new();
        let klass = registry
            .define_struct("Pair", vec!["first".into(), "second".into()])
            .unwrap();
        let ops = vec![
            Op::NodeBeg(klass),
            Op::Push(Value::Int(1)),
            Op::NodeSet,
            Op::Push(Value::Int(2)),
            Op::NodeSet,
            Op::NodeEnd,
            Op::End,
        ];
        let result = run(ops, &registry).unwrap();
        match result {
            Value::Struct(s) => {
                assert_eq!(s.get(0), Some(Value::Int(1)));
                assert_eq!(s.get(1), Some(Value::Int(2)));
            }
            _ => panic!("expected struct"),
        }
    }

    #[test]
    fn node_underfill_is_an_error() {
        let registry = KlassRegistry::new();
        let klass = registry
            .define_struct("Pair", vec!["first".into(), "second".into()])
            .unwrap();
        let ops = vec![
            Op::NodeBeg(klass),
            Op::Push(Value::Int(1)),
            Op::NodeSet,
            Op::NodeEnd,
            Op::End,
        ];
        let err = run(ops, &registry).unwrap_err();
        assert!(matches!(err, CallbackError::NodeUnderfill { .. }));
    }

    #[test]
    fn list_conses_onto_existing_tail() {
        let registry = KlassRegistry::new();
        let ops = vec![
            Op::Push(Value::Int(1)),
            Op::Push(Value::Nil),
            Op::List,
            Op::End,
        ];
        match run(ops, &registry).unwrap() {
            Value::Cons(c) => assert_eq!(c.to_vec(), vec![Value::Int(1)]),
            _ => panic!("expected cons"),
        }
    }

    #[test]
    fn jif_skips_when_falsy() {
        let registry = KlassRegistry::new();
        let ops = vec![
            Op::Push(Value::False),
            Op::Jif(Target::Offset(4)),
            Op::Push(Value::Int(1)),
            Op::Jmp(Target::Offset(5)),
            Op::Push(Value::Int(2)),
            Op::End,
        ];
        assert_eq!(run(ops, &registry), Ok(Value::Int(1)));
    }
}
