//! Label allocation/fixup for callback bytecode, mirroring
//! `pgen-regexp::labels` (itself grounded on `original_source/sb/labels.h`).

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
                Op::Jif(t) | Op::Junless(t) | Op::Jmp(t) => *t = self.translate_target(*t),
                _ => {}
            }
        }
    }
}
