//! Surface syntax AST for the grammar-spec source text (`spec.md` §6).
//! [`crate::parser`] builds this; [`crate::lower_cb`], [`crate::lower_lex`],
//! and [`crate::lower_peg`] turn it into the pre-bytecode IRs the C4–C7
//! crates already compile (`pgen_regexp::RegexAst`,
//! `pgen_lex::spec::ContextSpec`, `pgen_peg::spec::{Branch, RuleSpec}`,
//! `pgen_callback::Op`).

use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct GrammarFile {
    pub patterns: Vec<PatternDef>,
    pub vars: Vec<Rc<str>>,
    pub structs: Vec<StructDef>,
    pub lexes: Vec<LexBlock>,
    pub pegs: Vec<PegBlock>,
}

#[derive(Debug, Clone)]
pub struct PatternDef {
    pub name: Rc<str>,
    /// The text between the delimiting `/…/`, not yet parsed as a regex.
    pub pattern: Rc<str>,
    pub case_insensitive: bool,
}

#[derive(Debug, Clone)]
pub struct StructDef {
    pub name: Rc<str>,
    pub fields: Vec<Rc<str>>,
}

#[derive(Debug, Clone)]
pub struct LexBlock {
    pub name: Rc<str>,
    pub begin: Option<Vec<CbStmt>>,
    pub rules: Vec<LexRuleSyntax>,
    pub end: Option<Vec<CbStmt>>,
}

#[derive(Debug, Clone)]
pub enum MatcherSyntax {
    StringLit(Rc<str>),
    /// `/inner/flags` — resolved at lowering time to either a named
    /// pattern reference or an inline regex literal (see `lower::lex`'s
    /// module doc for why that resolution happens there, not here).
    Slashed { inner: Rc<str>, case_insensitive: bool },
    /// A bare identifier used as a whole rule: push/inline the named
    /// context (`spec.md` §4.5's "reference to another context").
    ContextRef(Rc<str>),
}

#[derive(Debug, Clone)]
pub struct LexRuleSyntax {
    pub matcher: MatcherSyntax,
    pub callback: Option<Vec<CbStmt>>,
}

#[derive(Debug, Clone)]
pub struct PegBlock {
    pub name: Rc<str>,
    pub rules: Vec<PegRuleSyntax>,
}

#[derive(Debug, Clone)]
pub struct PegRuleSyntax {
    pub name: Rc<str>,
    pub body: PegAltSyntax,
}

/// `A / B / C` — ordered choice among one or more `PegSeqSyntax`/fold
/// branches.
#[derive(Debug, Clone)]
pub struct PegAltSyntax {
    pub branches: Vec<PegBranchSyntax>,
}

#[derive(Debug, Clone)]
pub enum PegBranchSyntax {
    Seq(PegSeqSyntax),
    /// `seed /* rhs { cb }` / `/+` / `/?`.
    Fold {
        seed: Box<PegBranchSyntax>,
        kind: PegFoldKindSyntax,
        rhs: Vec<PegTermSyntax>,
        callback: Vec<CbStmt>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PegFoldKindSyntax {
    Star,
    Plus,
    Maybe,
}

#[derive(Debug, Clone)]
pub struct PegSeqSyntax {
    pub terms: Vec<PegTermSyntax>,
    pub callback: Option<Vec<CbStmt>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PegQuantSyntax {
    One,
    Maybe,
    Star,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PegLookaheadSyntax {
    None,
    Ahead,
    Neg,
}

#[derive(Debug, Clone)]
pub enum PegAtomSyntax {
    /// `.name` — an explicit token-type reference.
    Token(Rc<str>),
    /// `'text'` — a literal token, named after its own text.
    Literal(Rc<str>),
    /// A bare lowercase identifier — another rule in the same `peg` block.
    Rule(Rc<str>),
}

#[derive(Debug, Clone)]
pub struct PegTermSyntax {
    pub atom: PegAtomSyntax,
    pub quant: PegQuantSyntax,
    pub lookahead: PegLookaheadSyntax,
}

/// One statement in a callback body. A body's value is its last
/// statement's expression value (`spec.md` §4.4: `END` returns top of
/// stack).
#[derive(Debug, Clone)]
pub enum CbStmt {
    Expr(CbExpr),
    Assign { name: Rc<str>, value: CbExpr },
    GlobalAssign { name: Rc<str>, value: CbExpr },
    If { cond: CbExpr, then_branch: Vec<CbStmt>, else_branch: Vec<CbStmt> },
}

#[derive(Debug, Clone)]
pub enum CbExpr {
    Int(i64),
    Double(f64),
    Str(Rc<str>),
    /// `$n` — capture/term-value reference, 0-indexed (`$0` = whole
    /// match / first term).
    Capture(u32),
    /// `:name` — a token-type symbol, as in `token(:ident, $0)`. Resolves
    /// against the shared token-type table, the same ids `peg`'s
    /// `.name`/`'literal'` atoms use.
    Symbol(Rc<str>),
    VarRef(Rc<str>),
    GlobalVarRef(Rc<str>),
    /// `name(args...)` where `name` is lowercase — a built-in action call.
    Call { name: Rc<str>, args: Vec<CbExpr> },
    /// `Name(args...)` where `Name` is uppercase — struct construction.
    CreateNode { name: Rc<str>, args: Vec<CbExpr> },
    /// `[a, b, *rest]` — cons-list literal; a `Splat` entry concatenates
    /// an existing list instead of consing one element.
    CreateList(Vec<ListEntry>),
    /// `push(*Name)` as an entire callback body — recognized
    /// structurally by `lower::lex`, not lowered as a generic call.
    Push(Rc<str>),
    /// `pop` as an entire callback body.
    Pop,
    Binary { op: BinOp, lhs: Box<CbExpr>, rhs: Box<CbExpr> },
}

#[derive(Debug, Clone)]
pub enum ListEntry {
    Item(CbExpr),
    Splat(CbExpr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}
