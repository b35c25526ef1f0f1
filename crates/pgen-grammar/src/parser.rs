//! Parses grammar-spec source text (`spec.md` §6) into a [`crate::ast`]
//! tree. Hand-written recursive descent driven character-by-character
//! over the whole file, same style as `pgen_regexp::parser` — no
//! separate tokenize pass, `self.pos` scans `Vec<char>` directly.

use std::rc::Rc;

use crate::ast::*;
use crate::error::GrammarError;

pub fn parse(source: &str) -> Result<GrammarFile, GrammarError> {
    let mut p = Parser { chars: source.chars().collect(), pos: 0, line: 1, col: 1 };
    p.parse_file()
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    col: u32,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
        c
    }

    fn err(&self, message: impl Into<String>) -> GrammarError {
        GrammarError::Syntax { line: self.line, col: self.col, message: message.into() }
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_trivia();
        if self.peek() == Some(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), GrammarError> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.err(format!("expected `{c}`, found {:?}", self.peek())))
        }
    }

    fn eat_kw(&mut self, kw: &str) -> bool {
        self.skip_trivia();
        let save = self.pos;
        let (save_line, save_col) = (self.line, self.col);
        for expect in kw.chars() {
            if self.bump() != Some(expect) {
                self.pos = save;
                self.line = save_line;
                self.col = save_col;
                return false;
            }
        }
        if self.peek().map(is_ident_continue).unwrap_or(false) {
            self.pos = save;
            self.line = save_line;
            self.col = save_col;
            return false;
        }
        true
    }

    fn parse_ident(&mut self) -> Result<Rc<str>, GrammarError> {
        self.skip_trivia();
        let start = self.pos;
        match self.peek() {
            Some(c) if is_ident_start(c) => {
                self.bump();
            }
            _ => return Err(self.err("expected identifier")),
        }
        while self.peek().map(is_ident_continue).unwrap_or(false) {
            self.bump();
        }
        Ok(Rc::from(self.chars[start..self.pos].iter().collect::<String>()))
    }

    fn at_ident_char(&mut self) -> bool {
        self.skip_trivia();
        self.peek().map(is_ident_start).unwrap_or(false)
    }

    // ---- top level ----

    fn parse_file(&mut self) -> Result<GrammarFile, GrammarError> {
        let mut file = GrammarFile {
            patterns: Vec::new(),
            vars: Vec::new(),
            structs: Vec::new(),
            lexes: Vec::new(),
            pegs: Vec::new(),
        };
        loop {
            self.skip_trivia();
            if self.peek().is_none() {
                break;
            }
            if self.eat_kw("var") {
                loop {
                    file.vars.push(self.parse_ident()?);
                    if !self.eat(',') {
                        break;
                    }
                }
                self.expect(';')?;
            } else if self.eat_kw("struct") {
                file.structs.push(self.parse_struct_def()?);
            } else if self.eat_kw("lex") {
                file.lexes.push(self.parse_lex_block()?);
            } else if self.eat_kw("peg") {
                file.pegs.push(self.parse_peg_block()?);
            } else if self.at_ident_char() {
                file.patterns.push(self.parse_pattern_def()?);
            } else {
                return Err(self.err(format!("unexpected {:?} at top level", self.peek())));
            }
        }
        Ok(file)
    }

    fn parse_struct_def(&mut self) -> Result<StructDef, GrammarError> {
        let name = self.parse_ident()?;
        self.expect('(')?;
        let mut fields = Vec::new();
        if !self.eat(')') {
            loop {
                fields.push(self.parse_ident()?);
                if !self.eat(',') {
                    break;
                }
            }
            self.expect(')')?;
        }
        self.eat(';');
        Ok(StructDef { name, fields })
    }

    fn parse_pattern_def(&mut self) -> Result<PatternDef, GrammarError> {
        let name = self.parse_ident()?;
        self.expect('=')?;
        let (pattern, case_insensitive) = self.parse_slashed()?;
        self.eat(';');
        Ok(PatternDef { name, pattern, case_insensitive })
    }

    /// Reads a `/…/flags` literal starting at the current `/`, respecting
    /// `\/` as an escaped, non-terminating slash.
    fn parse_slashed(&mut self) -> Result<(Rc<str>, bool), GrammarError> {
        self.expect('/')?;
        let mut text = String::new();
        loop {
            match self.bump() {
                None => return Err(self.err("unterminated /.../ literal")),
                Some('/') => break,
                Some('\\') => {
                    text.push('\\');
                    if let Some(c) = self.bump() {
                        text.push(c);
                    }
                }
                Some(c) => text.push(c),
            }
        }
        let mut case_insensitive = false;
        while let Some(c) = self.peek() {
            if c == 'i' {
                case_insensitive = true;
                self.bump();
            } else if is_ident_continue(c) {
                return Err(self.err(format!("unknown pattern flag `{c}`")));
            } else {
                break;
            }
        }
        Ok((Rc::from(text), case_insensitive))
    }

    fn parse_string_lit(&mut self) -> Result<Rc<str>, GrammarError> {
        self.expect('"')?;
        let mut text = String::new();
        loop {
            match self.bump() {
                None => return Err(self.err("unterminated string literal")),
                Some('"') => break,
                Some('\\') => match self.bump() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('r') => text.push('\r'),
                    Some(c) => text.push(c),
                    None => return Err(self.err("unterminated escape")),
                },
                Some(c) => text.push(c),
            }
        }
        Ok(Rc::from(text))
    }

    // ---- lex blocks ----

    fn parse_lex_block(&mut self) -> Result<LexBlock, GrammarError> {
        let starred = self.eat('*');
        let ident = self.parse_ident()?;
        let name: Rc<str> = if starred { Rc::from(format!("*{ident}")) } else { ident };
        self.expect('{')?;
        let mut begin = None;
        let mut end = None;
        let mut rules = Vec::new();
        while !self.eat('}') {
            if self.eat_kw("begin") {
                begin = Some(self.parse_callback_body()?);
            } else if self.eat_kw("end") {
                end = Some(self.parse_callback_body()?);
            } else {
                rules.push(self.parse_lex_rule()?);
            }
        }
        Ok(LexBlock { name, begin, rules, end })
    }

    fn parse_lex_rule(&mut self) -> Result<LexRuleSyntax, GrammarError> {
        self.skip_trivia();
        let matcher = match self.peek() {
            Some('"') => MatcherSyntax::StringLit(self.parse_string_lit()?),
            Some('/') => {
                let (inner, case_insensitive) = self.parse_slashed()?;
                MatcherSyntax::Slashed { inner, case_insensitive }
            }
            Some(c) if is_ident_start(c) => MatcherSyntax::ContextRef(self.parse_ident()?),
            other => return Err(self.err(format!("expected a lex matcher, found {other:?}"))),
        };
        let callback = if self.eat('{') { Some(self.parse_callback_stmts()?) } else { None };
        self.eat(';');
        Ok(LexRuleSyntax { matcher, callback })
    }

    // ---- peg blocks ----

    fn parse_peg_block(&mut self) -> Result<PegBlock, GrammarError> {
        let name = self.parse_ident()?;
        self.expect('{')?;
        let mut rules = Vec::new();
        while !self.eat('}') {
            let rname = self.parse_ident()?;
            self.expect('=')?;
            let body = self.parse_peg_alt()?;
            self.eat(';');
            rules.push(PegRuleSyntax { name: rname, body });
        }
        Ok(PegBlock { name, rules })
    }

    fn parse_peg_alt(&mut self) -> Result<PegAltSyntax, GrammarError> {
        let mut branches = vec![self.parse_peg_branch()?];
        loop {
            self.skip_trivia();
            if self.peek() == Some('/') && !matches!(self.peek_at(1), Some('*') | Some('+') | Some('?')) {
                self.bump();
                branches.push(self.parse_peg_branch()?);
            } else {
                break;
            }
        }
        Ok(PegAltSyntax { branches })
    }

    fn parse_peg_branch(&mut self) -> Result<PegBranchSyntax, GrammarError> {
        let mut branch = PegBranchSyntax::Seq(self.parse_peg_seq()?);
        loop {
            self.skip_trivia();
            let kind = if self.peek() == Some('/') && self.peek_at(1) == Some('*') {
                self.bump();
                self.bump();
                PegFoldKindSyntax::Star
            } else if self.peek() == Some('/') && self.peek_at(1) == Some('+') {
                self.bump();
                self.bump();
                PegFoldKindSyntax::Plus
            } else if self.peek() == Some('/') && self.peek_at(1) == Some('?') {
                self.bump();
                self.bump();
                PegFoldKindSyntax::Maybe
            } else {
                break;
            };
            let rhs = self.parse_peg_terms()?;
            self.expect('{')?;
            let callback = self.parse_callback_stmts()?;
            branch = PegBranchSyntax::Fold { seed: Box::new(branch), kind, rhs, callback };
        }
        Ok(branch)
    }

    fn parse_peg_seq(&mut self) -> Result<PegSeqSyntax, GrammarError> {
        let terms = self.parse_peg_terms()?;
        let callback = if self.eat('{') { Some(self.parse_callback_stmts()?) } else { None };
        Ok(PegSeqSyntax { terms, callback })
    }

    fn parse_peg_terms(&mut self) -> Result<Vec<PegTermSyntax>, GrammarError> {
        let mut terms = Vec::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                Some('&') | Some('!') | Some('.') | Some('\'') => terms.push(self.parse_peg_term()?),
                Some(c) if is_ident_start(c) => terms.push(self.parse_peg_term()?),
                _ => break,
            }
        }
        if terms.is_empty() {
            return Err(self.err("expected at least one term"));
        }
        Ok(terms)
    }

    fn parse_peg_term(&mut self) -> Result<PegTermSyntax, GrammarError> {
        self.skip_trivia();
        let lookahead = if self.eat('&') {
            PegLookaheadSyntax::Ahead
        } else if self.eat('!') {
            PegLookaheadSyntax::Neg
        } else {
            PegLookaheadSyntax::None
        };
        self.skip_trivia();
        let atom = if self.eat('.') {
            PegAtomSyntax::Token(self.parse_ident()?)
        } else if self.peek() == Some('\'') {
            self.bump();
            let start = self.pos;
            while self.peek().map(|c| c != '\'').unwrap_or(false) {
                self.bump();
            }
            let text: Rc<str> = Rc::from(self.chars[start..self.pos].iter().collect::<String>());
            self.expect('\'')?;
            PegAtomSyntax::Literal(text)
        } else {
            PegAtomSyntax::Rule(self.parse_ident()?)
        };
        let quant = if self.eat('*') {
            PegQuantSyntax::Star
        } else if self.eat('+') {
            PegQuantSyntax::Plus
        } else if self.eat('?') {
            PegQuantSyntax::Maybe
        } else {
            PegQuantSyntax::One
        };
        Ok(PegTermSyntax { atom, quant, lookahead })
    }

    // ---- callback bodies ----

    fn parse_callback_body(&mut self) -> Result<Vec<CbStmt>, GrammarError> {
        self.expect('{')?;
        self.parse_callback_stmts()
    }

    fn parse_callback_stmts(&mut self) -> Result<Vec<CbStmt>, GrammarError> {
        let mut stmts = Vec::new();
        while !self.eat('}') {
            stmts.push(self.parse_callback_stmt()?);
            self.eat(';');
        }
        Ok(stmts)
    }

    fn parse_callback_stmt(&mut self) -> Result<CbStmt, GrammarError> {
        if self.eat_kw("if") {
            self.expect('(')?;
            let cond = self.parse_cb_expr()?;
            self.expect(')')?;
            self.expect('{')?;
            let then_branch = self.parse_callback_stmts()?;
            let else_branch = if self.eat_kw("else") {
                self.expect('{')?;
                self.parse_callback_stmts()?
            } else {
                Vec::new()
            };
            return Ok(CbStmt::If { cond, then_branch, else_branch });
        }
        // `name = expr` / `$name = expr` assignment, vs. a plain expression.
        self.skip_trivia();
        let save = self.pos;
        let (save_line, save_col) = (self.line, self.col);
        let global = self.eat('$');
        if self.at_ident_char() {
            if let Ok(name) = self.parse_ident() {
                self.skip_trivia();
                if self.peek() == Some('=') && self.peek_at(1) != Some('=') {
                    self.bump();
                    let value = self.parse_cb_expr()?;
                    return Ok(if global {
                        CbStmt::GlobalAssign { name, value }
                    } else {
                        CbStmt::Assign { name, value }
                    });
                }
            }
        }
        self.pos = save;
        self.line = save_line;
        self.col = save_col;
        Ok(CbStmt::Expr(self.parse_cb_expr()?))
    }

    fn parse_cb_expr(&mut self) -> Result<CbExpr, GrammarError> {
        self.parse_cb_or()
    }

    fn parse_cb_or(&mut self) -> Result<CbExpr, GrammarError> {
        let mut lhs = self.parse_cb_and()?;
        while self.eat_kw("or") {
            let rhs = self.parse_cb_and()?;
            lhs = CbExpr::Binary { op: BinOp::Or, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_cb_and(&mut self) -> Result<CbExpr, GrammarError> {
        let mut lhs = self.parse_cb_cmp()?;
        while self.eat_kw("and") {
            let rhs = self.parse_cb_cmp()?;
            lhs = CbExpr::Binary { op: BinOp::And, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_cb_cmp(&mut self) -> Result<CbExpr, GrammarError> {
        let lhs = self.parse_cb_add()?;
        self.skip_trivia();
        let op = if self.peek() == Some('=') && self.peek_at(1) == Some('=') {
            self.bump();
            self.bump();
            Some(BinOp::Eq)
        } else if self.peek() == Some('!') && self.peek_at(1) == Some('=') {
            self.bump();
            self.bump();
            Some(BinOp::Ne)
        } else if self.peek() == Some('<') && self.peek_at(1) == Some('=') {
            self.bump();
            self.bump();
            Some(BinOp::Le)
        } else if self.peek() == Some('>') && self.peek_at(1) == Some('=') {
            self.bump();
            self.bump();
            Some(BinOp::Ge)
        } else if self.peek() == Some('<') {
            self.bump();
            Some(BinOp::Lt)
        } else if self.peek() == Some('>') {
            self.bump();
            Some(BinOp::Gt)
        } else {
            None
        };
        match op {
            Some(op) => {
                let rhs = self.parse_cb_add()?;
                Ok(CbExpr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) })
            }
            None => Ok(lhs),
        }
    }

    fn parse_cb_add(&mut self) -> Result<CbExpr, GrammarError> {
        let mut lhs = self.parse_cb_mul()?;
        loop {
            self.skip_trivia();
            let op = match self.peek() {
                Some('+') => BinOp::Add,
                Some('-') => BinOp::Sub,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_cb_mul()?;
            lhs = CbExpr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_cb_mul(&mut self) -> Result<CbExpr, GrammarError> {
        let mut lhs = self.parse_cb_atom()?;
        loop {
            self.skip_trivia();
            let op = match self.peek() {
                Some('*') => BinOp::Mul,
                Some('/') => BinOp::Div,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_cb_atom()?;
            lhs = CbExpr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_cb_atom(&mut self) -> Result<CbExpr, GrammarError> {
        self.skip_trivia();
        match self.peek() {
            Some('$') => {
                self.bump();
                if self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                    let start = self.pos;
                    while self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                        self.bump();
                    }
                    let n: u32 = self.chars[start..self.pos].iter().collect::<String>().parse().unwrap();
                    Ok(CbExpr::Capture(n))
                } else {
                    let name = self.parse_ident()?;
                    Ok(CbExpr::GlobalVarRef(name))
                }
            }
            Some('"') => Ok(CbExpr::Str(self.parse_string_lit()?)),
            Some(':') => {
                self.bump();
                Ok(CbExpr::Symbol(self.parse_ident()?))
            }
            Some('[') => {
                self.bump();
                let mut entries = Vec::new();
                if !self.eat(']') {
                    loop {
                        self.skip_trivia();
                        if self.eat('*') {
                            entries.push(ListEntry::Splat(self.parse_cb_expr()?));
                        } else {
                            entries.push(ListEntry::Item(self.parse_cb_expr()?));
                        }
                        if !self.eat(',') {
                            break;
                        }
                    }
                    self.expect(']')?;
                }
                Ok(CbExpr::CreateList(entries))
            }
            Some(c) if c.is_ascii_digit() => self.parse_cb_number(),
            Some('(') => {
                self.bump();
                let inner = self.parse_cb_expr()?;
                self.expect(')')?;
                Ok(inner)
            }
            Some(c) if is_ident_start(c) => {
                let name = self.parse_ident()?;
                if &*name == "push" {
                    self.expect('(')?;
                    self.expect('*')?;
                    let target = self.parse_ident()?;
                    self.expect(')')?;
                    return Ok(CbExpr::Push(target));
                }
                if &*name == "pop" && self.peek() != Some('(') {
                    return Ok(CbExpr::Pop);
                }
                self.skip_trivia();
                if self.eat('(') {
                    let mut args = Vec::new();
                    if !self.eat(')') {
                        loop {
                            args.push(self.parse_cb_expr()?);
                            if !self.eat(',') {
                                break;
                            }
                        }
                        self.expect(')')?;
                    }
                    if name.chars().next().map(|c| c.is_uppercase()).unwrap_or(false) {
                        Ok(CbExpr::CreateNode { name, args })
                    } else {
                        Ok(CbExpr::Call { name, args })
                    }
                } else {
                    Ok(CbExpr::VarRef(name))
                }
            }
            other => Err(self.err(format!("unexpected {other:?} in callback expression"))),
        }
    }

    fn parse_cb_number(&mut self) -> Result<CbExpr, GrammarError> {
        let start = self.pos;
        while self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            self.bump();
        }
        let mut is_float = false;
        if self.peek() == Some('.') && self.peek_at(1).map(|c| c.is_ascii_digit()).unwrap_or(false) {
            is_float = true;
            self.bump();
            while self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                self.bump();
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if is_float {
            Ok(CbExpr::Double(text.parse().map_err(|_| self.err("bad float literal"))?))
        } else {
            Ok(CbExpr::Int(text.parse().map_err(|_| self.err("bad integer literal"))?))
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pattern_and_struct() {
        let file = parse(r#"WhiteSpace = /[ \t]+/; struct Binary(lhs, op, rhs)"#).unwrap();
        assert_eq!(file.patterns.len(), 1);
        assert_eq!(&*file.patterns[0].name, "WhiteSpace");
        assert_eq!(file.structs.len(), 1);
        assert_eq!(file.structs[0].fields.len(), 3);
    }

    #[test]
    fn parses_lex_block_with_context_ref_and_push() {
        let src = r#"
            lex Main {
                WhiteSpace
                "/*" { push(*Comment) }
            }
            lex *Comment {
                "*/" { pop }
            }
        "#;
        let file = parse(src).unwrap();
        assert_eq!(file.lexes.len(), 2);
        assert!(matches!(file.lexes[0].rules[0].matcher, MatcherSyntax::ContextRef(_)));
        let cb = file.lexes[0].rules[1].callback.as_ref().unwrap();
        assert!(matches!(cb[0], CbStmt::Expr(CbExpr::Push(_))));
        assert_eq!(&*file.lexes[1].name, "*Comment");
    }

    #[test]
    fn parses_peg_block_with_fold_and_choice() {
        let src = r#"
            peg Expr {
                sum = term /* '+' term { $1 + $3 }
                term = .Number { $1 } / .Ident { $1 }
            }
        "#;
        let file = parse(src).unwrap();
        assert_eq!(file.pegs.len(), 1);
        assert_eq!(file.pegs[0].rules.len(), 2);
    }
}
