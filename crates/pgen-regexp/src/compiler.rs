//! Compiles a [`RegexAst`] into a [`Program`] (`spec.md` §4.3
//! "Compilation"). A single recursive pass emits instructions and label
//! references; [`Labels::translate`] resolves every reference once the
//! whole tree has been walked.

use crate::ast::RegexAst;
use crate::error::RegexpError;
use crate::labels::Labels;
use crate::opcode::{Op, Program, Target};

/// `{m,n}` bounds beyond this are rejected (`spec.md` §4.3: "`m > 2^30`
/// are compile errors").
const MAX_BOUND: i64 = 1 << 30;

pub fn compile(ast: &RegexAst) -> Result<Program, RegexpError> {
    let mut ops = vec![Op::Meta { capture_count: 0 }];
    let mut labels = Labels::new();
    let mut next_capture: u16 = 2;
    compile_node(ast, &mut ops, &mut labels, &mut next_capture)?;
    ops.push(Op::Match);
    ops.push(Op::End);
    labels.translate(&mut ops);
    if let Op::Meta { capture_count } = &mut ops[0] {
        *capture_count = next_capture;
    }
    tracing::debug!(op_count = ops.len(), capture_count = next_capture, "compiled regexp program");
    Ok(Program {
        capture_count: next_capture,
        ops,
    })
}

fn here(ops: &[Op]) -> u32 {
    ops.len() as u32
}

fn compile_node(
    ast: &RegexAst,
    ops: &mut Vec<Op>,
    labels: &mut Labels,
    next_capture: &mut u16,
) -> Result<(), RegexpError> {
    match ast {
        RegexAst::Char(c) => ops.push(Op::Char(*c)),
        RegexAst::Set { ranges, negated } => ops.push(Op::Set {
            ranges: ranges.iter().map(|r| (r.from, r.to)).collect(),
            negated: *negated,
        }),
        RegexAst::Class(c) => ops.push(Op::Class(*c)),
        RegexAst::Anchor(a) => ops.push(Op::Anchor(*a)),
        RegexAst::Concat(items) => {
            for item in items {
                compile_node(item, ops, labels, next_capture)?;
            }
        }
        RegexAst::Alt(items) => {
            let end = labels.new_label();
            compile_alt(items, end, ops, labels, next_capture)?;
            labels.define(end, here(ops));
        }
        RegexAst::Group { index, body } => {
            *next_capture = (*next_capture).max(index + 2);
            ops.push(Op::Save(*index));
            compile_node(body, ops, labels, next_capture)?;
            ops.push(Op::Save(index + 1));
        }
        RegexAst::NonCapGroup(body) => compile_node(body, ops, labels, next_capture)?,
        RegexAst::Lookahead { negative, body } => {
            let l_body = labels.new_label();
            ops.push(Op::Ahead {
                negative: *negative,
                body: Target::Label(l_body),
            });
            labels.define(l_body, here(ops));
            compile_node(body, ops, labels, next_capture)?;
            ops.push(Op::SubMatch);
        }
        RegexAst::Repeat {
            body,
            min,
            max,
            greedy,
            possessive,
        } => compile_repeat(body, *min, *max, *greedy, *possessive, ops, labels, next_capture)?,
    }
    Ok(())
}

fn compile_alt(
    items: &[RegexAst],
    end: crate::opcode::LabelId,
    ops: &mut Vec<Op>,
    labels: &mut Labels,
    next_capture: &mut u16,
) -> Result<(), RegexpError> {
    if items.len() == 1 {
        compile_node(&items[0], ops, labels, next_capture)?;
        ops.push(Op::Jmp(Target::Label(end)));
        return Ok(());
    }
    let l_body = labels.new_label();
    let l_rest = labels.new_label();
    ops.push(Op::Fork {
        x: Target::Label(l_body),
        y: Target::Label(l_rest),
    });
    labels.define(l_body, here(ops));
    compile_node(&items[0], ops, labels, next_capture)?;
    ops.push(Op::Jmp(Target::Label(end)));
    labels.define(l_rest, here(ops));
    compile_alt(&items[1..], end, ops, labels, next_capture)
}

/// Emits one match of `body`, atomically (no backtracking into it) when
/// `possessive` is set — following the source's `e++` encoding
/// (`ATOMIC L; L: e`), generalized to wrap a single repetition unit
/// rather than only the plus form.
fn compile_unit(
    body: &RegexAst,
    possessive: bool,
    ops: &mut Vec<Op>,
    labels: &mut Labels,
    next_capture: &mut u16,
) -> Result<(), RegexpError> {
    if !possessive {
        return compile_node(body, ops, labels, next_capture);
    }
    let l_body = labels.new_label();
    ops.push(Op::Atomic(Target::Label(l_body)));
    labels.define(l_body, here(ops));
    compile_node(body, ops, labels, next_capture)?;
    ops.push(Op::SubMatch);
    Ok(())
}

fn compile_opt(
    body: &RegexAst,
    greedy: bool,
    possessive: bool,
    ops: &mut Vec<Op>,
    labels: &mut Labels,
    next_capture: &mut u16,
) -> Result<(), RegexpError> {
    let l_body = labels.new_label();
    let l_end = labels.new_label();
    if greedy {
        ops.push(Op::Fork {
            x: Target::Label(l_body),
            y: Target::Label(l_end),
        });
    } else {
        ops.push(Op::Fork {
            x: Target::Label(l_end),
            y: Target::Label(l_body),
        });
    }
    labels.define(l_body, here(ops));
    compile_unit(body, possessive, ops, labels, next_capture)?;
    labels.define(l_end, here(ops));
    Ok(())
}

fn compile_star(
    body: &RegexAst,
    greedy: bool,
    possessive: bool,
    ops: &mut Vec<Op>,
    labels: &mut Labels,
    next_capture: &mut u16,
) -> Result<(), RegexpError> {
    let l_top = labels.new_label();
    let l_body = labels.new_label();
    let l_end = labels.new_label();
    labels.define(l_top, here(ops));
    if greedy {
        ops.push(Op::Fork {
            x: Target::Label(l_body),
            y: Target::Label(l_end),
        });
    } else {
        ops.push(Op::Fork {
            x: Target::Label(l_end),
            y: Target::Label(l_body),
        });
    }
    labels.define(l_body, here(ops));
    compile_unit(body, possessive, ops, labels, next_capture)?;
    ops.push(Op::Jmp(Target::Label(l_top)));
    labels.define(l_end, here(ops));
    Ok(())
}

fn compile_plus(
    body: &RegexAst,
    greedy: bool,
    possessive: bool,
    ops: &mut Vec<Op>,
    labels: &mut Labels,
    next_capture: &mut u16,
) -> Result<(), RegexpError> {
    let l_top = labels.new_label();
    let l_end = labels.new_label();
    labels.define(l_top, here(ops));
    compile_unit(body, possessive, ops, labels, next_capture)?;
    if greedy {
        ops.push(Op::Fork {
            x: Target::Label(l_top),
            y: Target::Label(l_end),
        });
    } else {
        ops.push(Op::Fork {
            x: Target::Label(l_end),
            y: Target::Label(l_top),
        });
    }
    labels.define(l_end, here(ops));
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn compile_repeat(
    body: &RegexAst,
    min: u32,
    max: Option<u32>,
    greedy: bool,
    possessive: bool,
    ops: &mut Vec<Op>,
    labels: &mut Labels,
    next_capture: &mut u16,
) -> Result<(), RegexpError> {
    if let Some(max) = max {
        if (max as i64) > MAX_BOUND || (min as i64) > MAX_BOUND {
            return Err(RegexpError::QuantifierOutOfRange {
                at: 0,
                min: min as i64,
                max: Some(max as i64),
            });
        }
        if min > max {
            return Err(RegexpError::QuantifierOutOfRange {
                at: 0,
                min: min as i64,
                max: Some(max as i64),
            });
        }
    }
    match (min, max) {
        (0, Some(1)) => compile_opt(body, greedy, possessive, ops, labels, next_capture),
        (0, None) => compile_star(body, greedy, possessive, ops, labels, next_capture),
        (1, None) => compile_plus(body, greedy, possessive, ops, labels, next_capture),
        (m, None) => {
            for _ in 0..m {
                compile_unit(body, possessive, ops, labels, next_capture)?;
            }
            compile_star(body, greedy, possessive, ops, labels, next_capture)
        }
        (m, Some(n)) => {
            for _ in 0..m {
                compile_unit(body, possessive, ops, labels, next_capture)?;
            }
            for _ in 0..(n - m) {
                compile_opt(body, greedy, possessive, ops, labels, next_capture)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::CodeRange;
    use crate::vm::Regexp;

    fn literal(s: &str) -> RegexAst {
        RegexAst::Concat(s.chars().map(RegexAst::Char).collect())
    }

    #[test]
    fn compiles_simple_concat() {
        let prog = compile(&literal("ab")).unwrap();
        let re = Regexp::from_program(prog);
        let m = re.exec(b"ab", 0).unwrap();
        assert_eq!((m.start, m.end), (0, 2));
    }

    #[test]
    fn alternation_tries_first_branch_first() {
        let ast = RegexAst::Alt(vec![literal("a"), literal("ab")]);
        let prog = compile(&ast).unwrap();
        let re = Regexp::from_program(prog);
        let m = re.exec(b"ab", 0).unwrap();
        assert_eq!(m.end, 1);
    }

    #[test]
    fn star_matches_zero_or_more() {
        let ast = RegexAst::star(RegexAst::Char('a'), true, false);
        let prog = compile(&ast).unwrap();
        let re = Regexp::from_program(prog);
        assert_eq!(re.exec(b"aaab", 0).unwrap().end, 3);
        assert_eq!(re.exec(b"b", 0).unwrap().end, 0);
    }

    #[test]
    fn group_records_capture_span() {
        let ast = RegexAst::Concat(vec![
            RegexAst::Group {
                index: 2,
                body: Box::new(literal("a")),
            },
            RegexAst::Char('b'),
        ]);
        let prog = compile(&ast).unwrap();
        let re = Regexp::from_program(prog);
        let m = re.exec(b"ab", 0).unwrap();
        assert_eq!(m.group(0), Some((0, 1)));
    }

    #[test]
    fn bounded_quantifier_rejects_min_greater_than_max() {
        let ast = RegexAst::Repeat {
            body: Box::new(RegexAst::Char('a')),
            min: 3,
            max: Some(1),
            greedy: true,
            possessive: false,
        };
        let err = compile(&ast).unwrap_err();
        assert!(matches!(err, RegexpError::QuantifierOutOfRange { .. }));
    }

    #[test]
    fn set_matches_ranges() {
        let ast = RegexAst::Set {
            ranges: vec![CodeRange { from: 'a' as u32, to: 'z' as u32 }],
            negated: false,
        };
        let prog = compile(&ast).unwrap();
        let re = Regexp::from_program(prog);
        assert!(re.exec(b"m", 0).is_some());
        assert!(re.exec(b"M", 0).is_none());
    }
}
