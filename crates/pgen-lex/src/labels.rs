//! Label allocation/fixup for lex bytecode, mirroring
//! `pgen-regexp::labels`/`pgen-callback::labels` (all three independently
//! grounded on `original_source/sb/labels.h`).

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

    pub fn translate(&self, ops: &mut [Op]) {
        for op in ops.iter_mut() {
            match op {
                Op::MatchRe { on_match, on_fail, .. } | Op::MatchStr { on_match, on_fail, .. } => {
                    *on_match = self.translate_target(*on_match);
                    *on_fail = self.translate_target(*on_fail);
                }
                Op::Callback { next, .. } => *next = self.translate_target(*next),
                Op::Jmp(t) => *t = self.translate_target(*t),
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
