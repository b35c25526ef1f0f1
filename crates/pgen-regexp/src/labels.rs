//! Label allocation and fixup, grounded on `original_source/sb/labels.h`:
//! `LABEL_NEW_NUM` reserves a numeric slot, `LABEL_DEF` fills it in once
//! the label's offset is known, and a final translate pass patches every
//! reference. The source patches raw operand words in place; since our
//! [`crate::opcode::Op`] carries a typed [`crate::opcode::Target`]
//! instead, translation rewrites `Target::Label` to `Target::Offset`
//! in-place over the emitted instruction vector.

use crate::opcode::{LabelId, Op, Target};

#[derive(Debug, Default)]
pub struct Labels {
    offsets: Vec<Option<u32>>,
}

impl Labels {
    pub fn new() -> Self {
        Labels::default()
    }

    pub fn new_label(&mut self) -> LabelId {
        let id = self.offsets.len() as u32;
        self.offsets.push(None);
        LabelId(id)
    }

    pub fn define(&mut self, label: LabelId, offset: u32) {
        self.offsets[label.0 as usize] = Some(offset);
    }

    fn resolve(&self, label: LabelId) -> u32 {
        self.offsets[label.0 as usize].expect("label referenced but never defined")
    }

    fn translate_target(&self, target: Target) -> Target {
        match target {
            Target::Offset(o) => Target::Offset(o),
            Target::Label(l) => Target::Offset(self.resolve(l)),
        }
    }

    /// Walk every emitted instruction and resolve label targets to offsets.
    pub fn translate(&self, ops: &mut [Op]) {
        for op in ops.iter_mut() {
            match op {
                Op::Jmp(t) => *t = self.translate_target(*t),
                Op::Fork { x, y } => {
                    *x = self.translate_target(*x);
                    *y = self.translate_target(*y);
                }
                Op::Atomic(t) => *t = self.translate_target(*t),
                Op::Ahead { body, .. } => *body = self.translate_target(*body),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_resolves_to_defined_offset() {
        let mut labels = Labels::new();
        let l = labels.new_label();
        labels.define(l, 7);
        let mut ops = vec![Op::Jmp(Target::Label(l))];
        labels.translate(&mut ops);
        assert_eq!(ops[0], Op::Jmp(Target::Offset(7)));
    }

    #[test]
    #[should_panic(expected = "never defined")]
    fn undefined_label_panics_on_translate() {
        let mut labels = Labels::new();
        let l = labels.new_label();
        let mut ops = vec![Op::Jmp(Target::Label(l))];
        labels.translate(&mut ops);
    }
}
