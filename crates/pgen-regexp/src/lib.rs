//! pgen-regexp: regexp AST, bytecode compiler, and nonrecursive
//! backtracking VM (`spec.md` §4.3, component C4).
//!
//! - `ast`: parsed regexp tree.
//! - `parser`: turns a `/…/` literal's inner text into an `ast::RegexAst`.
//! - `opcode`: bytecode instruction set.
//! - `labels`: label allocation/fixup, grounded on
//!   `original_source/sb/labels.h`.
//! - `compiler`: AST → bytecode.
//! - `vm`: bytecode interpreter.

pub mod ast;
pub mod compiler;
pub mod error;
pub mod labels;
pub mod opcode;
pub mod parser;
pub mod vm;

pub use ast::RegexAst;
pub use error::RegexpError;
pub use opcode::Program;
pub use vm::{MatchResult, Regexp};

#[cfg(test)]
mod scenario_tests {
    use super::*;

    /// R1: literal concatenation matches exactly its text.
    #[test]
    fn r1_literal_concat_match() {
        let ast = parser::parse("func").unwrap();
        let re = Regexp::compile(&ast).unwrap();
        let m = re.exec(b"func", 0).unwrap();
        assert_eq!((m.start, m.end), (0, 4));
    }

    /// R2: alternation picks the first branch that matches at this
    /// position, per ordered-choice-like left bias in the fork encoding.
    #[test]
    fn r2_alternation_prefers_left_branch() {
        let ast = parser::parse("cat|category").unwrap();
        let re = Regexp::compile(&ast).unwrap();
        let m = re.exec(b"category", 0).unwrap();
        assert_eq!(m.end, 3);
    }

    /// R3: greedy star backtracks to let the remainder of the pattern
    /// succeed.
    #[test]
    fn r3_greedy_star_backtracks_for_suffix() {
        let ast = parser::parse(r"a*ab").unwrap();
        let re = Regexp::compile(&ast).unwrap();
        let m = re.exec(b"aaab", 0).unwrap();
        assert_eq!(m.end, 4);
    }

    /// R4: bracket char-group flattening and negation.
    #[test]
    fn r4_negated_class_excludes_flattened_ranges() {
        let ast = parser::parse("[^a-z]").unwrap();
        let re = Regexp::compile(&ast).unwrap();
        assert!(re.exec(b"5", 0).is_some());
        assert!(re.exec(b"q", 0).is_none());
    }

    /// R5: capturing groups report their span alongside the overall match.
    #[test]
    fn r5_capture_group_span() {
        let ast = parser::parse(r"(\w+)=(\d+)").unwrap();
        let re = Regexp::compile(&ast).unwrap();
        let m = re.exec(b"count=42", 0).unwrap();
        assert_eq!(m.group(0), Some((0, 5)));
        assert_eq!(m.group(1), Some((6, 8)));
    }
}
