//! The built-in callback-action catalogue (`spec.md` §6 "Built-in
//! actions"), as a stable name-to-id table. `pgen-grammar` resolves a
//! callback body's `name(...)` calls against this table when compiling
//! `Op::Call { fname, .. }`; `pgen-runtime`'s `CallbackHost` impl
//! dispatches on the same ids. Living here, rather than in either of
//! those crates, is what lets them agree without depending on each
//! other.
//!
//! `token`/`yield` keep the ids `pgen_lex::host` already reserves for
//! them (0 and 1) so a lex rule's callback compiles the same whether or
//! not `TokenSink` is the host actually running it.

pub const BUILTIN_TOKEN: u32 = 0;
pub const BUILTIN_YIELD: u32 = 1;
pub const BUILTIN_RETURN: u32 = 2;
pub const BUILTIN_PARSE: u32 = 3;
pub const BUILTIN_PARSE_INT: u32 = 4;
pub const BUILTIN_CHAR_HEX: u32 = 5;
pub const BUILTIN_CHAR_NO_ESCAPE: u32 = 6;
pub const BUILTIN_CHAR_ESCAPE_SP: u32 = 7;
pub const BUILTIN_CONCAT_CHAR: u32 = 8;
pub const BUILTIN_CONS: u32 = 9;
pub const BUILTIN_TAIL: u32 = 10;
pub const BUILTIN_STYLE: u32 = 11;
pub const BUILTIN_COMPILE_SPELLBREAK: u32 = 12;

// Callback bytecode has no arithmetic/comparison opcodes of its own
// (`pgen_callback::opcode::Op`); `+`, `==`, `and`, … surface-syntax
// operators compile to `Op::Call` against these reserved ids instead,
// right after the named catalogue.
pub const BUILTIN_OP_ADD: u32 = 13;
pub const BUILTIN_OP_SUB: u32 = 14;
pub const BUILTIN_OP_MUL: u32 = 15;
pub const BUILTIN_OP_DIV: u32 = 16;
pub const BUILTIN_OP_EQ: u32 = 17;
pub const BUILTIN_OP_NE: u32 = 18;
pub const BUILTIN_OP_LT: u32 = 19;
pub const BUILTIN_OP_LE: u32 = 20;
pub const BUILTIN_OP_GT: u32 = 21;
pub const BUILTIN_OP_GE: u32 = 22;
pub const BUILTIN_OP_AND: u32 = 23;
pub const BUILTIN_OP_OR: u32 = 24;

const CATALOGUE: &[(&str, u32)] = &[
    ("token", BUILTIN_TOKEN),
    ("yield", BUILTIN_YIELD),
    ("return", BUILTIN_RETURN),
    ("parse", BUILTIN_PARSE),
    ("parse_int", BUILTIN_PARSE_INT),
    ("char_hex", BUILTIN_CHAR_HEX),
    ("char_no_escape", BUILTIN_CHAR_NO_ESCAPE),
    ("char_escape_sp", BUILTIN_CHAR_ESCAPE_SP),
    ("concat_char", BUILTIN_CONCAT_CHAR),
    ("cons", BUILTIN_CONS),
    ("tail", BUILTIN_TAIL),
    ("style", BUILTIN_STYLE),
    ("compile_spellbreak", BUILTIN_COMPILE_SPELLBREAK),
    ("+", BUILTIN_OP_ADD),
    ("-", BUILTIN_OP_SUB),
    ("*", BUILTIN_OP_MUL),
    ("/", BUILTIN_OP_DIV),
    ("==", BUILTIN_OP_EQ),
    ("!=", BUILTIN_OP_NE),
    ("<", BUILTIN_OP_LT),
    ("<=", BUILTIN_OP_LE),
    (">", BUILTIN_OP_GT),
    (">=", BUILTIN_OP_GE),
    ("and", BUILTIN_OP_AND),
    ("or", BUILTIN_OP_OR),
];

pub fn builtin_id(name: &str) -> Option<u32> {
    CATALOGUE.iter().find(|(n, _)| *n == name).map(|(_, id)| *id)
}

pub fn builtin_name(id: u32) -> Option<&'static str> {
    CATALOGUE.iter().find(|(_, i)| *i == id).map(|(n, _)| *n)
}
