//! End-to-end parses through a compiled grammar: lex-only tokenizing
//! and a full lex+peg pipeline reducing to a value.

use pgen_core::Value;
use pgen_runtime::{CompileConfig, ParserInstance};

#[test]
fn lex_only_tokenizes_digit_runs() {
    let src = r#"
        lex Main {
            /[0-9]+/ { token(:int, $0) }
            /[ ]+/
        }
    "#;
    let mut instance = ParserInstance::new(src, CompileConfig::default()).unwrap();
    let out = instance.parse(b"1 22 333").unwrap();

    assert_eq!(out.tokens.len(), 3);
    assert_eq!(out.tokens[0].byte_size, 1);
    assert_eq!(out.tokens[1].byte_size, 2);
    assert_eq!(out.tokens[2].byte_size, 3);
    assert_eq!(out.value, Value::Nil);
}

#[test]
fn lex_and_peg_reduce_addition() {
    let src = r#"
        Digits = /[0-9]+/;

        lex Main {
            /[ ]+/
            /Digits/ { token(:int, $0) }
            "+"      { token(:plus) }
        }

        peg Sum {
            expr = .int .plus .int { parse_int($1) + parse_int($3) }
        }
    "#;
    let mut instance = ParserInstance::new(src, CompileConfig::default()).unwrap();
    let out = instance.parse(b"12 + 34").unwrap();

    assert_eq!(out.tokens.len(), 3);
    assert_eq!(out.value, Value::Int(46));
}

#[test]
fn reset_clears_globals_between_parses() {
    let src = r#"
        var total;

        lex Main {
            /[0-9]+/ { $total = parse_int($0); token(:int, $0) }
        }

        peg Sum {
            expr = .int { $total }
        }
    "#;
    let mut instance = ParserInstance::new(src, CompileConfig::default()).unwrap();

    let first = instance.parse(b"7").unwrap();
    assert_eq!(first.value, Value::Int(7));

    instance.reset();
    let second = instance.parse(b"9").unwrap();
    assert_eq!(second.value, Value::Int(9));
}

#[test]
fn lex_only_grammar_returns_end_hooks_yield() {
    let src = r#"
        lex Main {
            /[0-9]+/ { token(:int, $0) }
            end { yield(42) }
        }
    "#;
    let mut instance = ParserInstance::new(src, CompileConfig::default()).unwrap();
    let out = instance.parse(b"1").unwrap();

    assert_eq!(out.tokens.len(), 1);
    assert_eq!(out.value, Value::Int(42));
}

#[test]
fn unknown_peg_rule_reference_is_a_compile_error() {
    let src = r#"
        peg Sum {
            expr = undefined_rule
        }
    "#;
    let err = ParserInstance::new(src, CompileConfig::default()).unwrap_err();
    assert!(matches!(err, pgen_runtime::ParseError::Compile(_)));
}
