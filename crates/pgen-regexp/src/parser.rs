//! Parses a regexp literal's inner text (the part between `/…/`) into a
//! [`RegexAst`] (`spec.md` §4.3). Hand-written recursive descent, driven
//! character-by-character over the pattern text — grammar-spec-level
//! tokenizing of the surrounding `/…/` delimiters and flags is
//! `pgen-grammar`'s job; this module only understands the pattern body.

use crate::ast::{Anchor, CodeRange, PredefinedClass, RegexAst};
use crate::error::RegexpError;

pub struct ParseOptions {
    /// Case-insensitive literal-character matching (the `i` flag).
    pub case_insensitive: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions { case_insensitive: false }
    }
}

pub fn parse(pattern: &str) -> Result<RegexAst, RegexpError> {
    parse_with(pattern, &ParseOptions::default())
}

pub fn parse_with(pattern: &str, opts: &ParseOptions) -> Result<RegexAst, RegexpError> {
    let mut p = Parser {
        chars: pattern.chars().collect(),
        pos: 0,
        byte_pos_of: byte_offsets(pattern),
        next_capture: 2,
        opts,
    };
    let ast = p.parse_alt()?;
    if p.pos != p.chars.len() {
        return Err(RegexpError::UnbalancedGroup { at: p.byte_at(p.pos) });
    }
    Ok(ast)
}

fn byte_offsets(s: &str) -> Vec<usize> {
    let mut offsets: Vec<usize> = s.char_indices().map(|(i, _)| i).collect();
    offsets.push(s.len());
    offsets
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    byte_pos_of: Vec<usize>,
    next_capture: u16,
    opts: &'a ParseOptions,
}

impl<'a> Parser<'a> {
    fn byte_at(&self, pos: usize) -> usize {
        self.byte_pos_of.get(pos).copied().unwrap_or(*self.byte_pos_of.last().unwrap())
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_alt(&mut self) -> Result<RegexAst, RegexpError> {
        let mut branches = vec![self.parse_concat()?];
        while self.eat('|') {
            branches.push(self.parse_concat()?);
        }
        Ok(if branches.len() == 1 {
            branches.pop().unwrap()
        } else {
            RegexAst::Alt(branches)
        })
    }

    fn parse_concat(&mut self) -> Result<RegexAst, RegexpError> {
        let mut items = Vec::new();
        while let Some(c) = self.peek() {
            if c == '|' || c == ')' {
                break;
            }
            items.push(self.parse_quantified()?);
        }
        Ok(RegexAst::Concat(items))
    }

    fn parse_quantified(&mut self) -> Result<RegexAst, RegexpError> {
        let atom = self.parse_atom()?;
        self.parse_quantifier(atom)
    }

    fn parse_quantifier(&mut self, atom: RegexAst) -> Result<RegexAst, RegexpError> {
        let at = self.byte_at(self.pos);
        let (min, max) = match self.peek() {
            Some('?') => {
                self.bump();
                (0, Some(1))
            }
            Some('*') => {
                self.bump();
                (0, None)
            }
            Some('+') => {
                self.bump();
                (1, None)
            }
            Some('{') => {
                let save = self.pos;
                match self.try_parse_bounds(at)? {
                    Some(bounds) => bounds,
                    None => {
                        self.pos = save;
                        return Ok(atom);
                    }
                }
            }
            _ => return Ok(atom),
        };
        let (greedy, possessive) = match self.peek() {
            Some('?') => {
                self.bump();
                (false, false)
            }
            Some('+') => {
                self.bump();
                (true, true)
            }
            _ => (true, false),
        };
        Ok(RegexAst::Repeat {
            body: Box::new(atom),
            min,
            max,
            greedy,
            possessive,
        })
    }

    /// Tries to parse `{m}`, `{m,}`, or `{m,n}` at the current `{`.
    /// Returns `None` (and leaves `self.pos` wherever, caller rewinds) if
    /// this isn't actually a bounded-repeat form.
    fn try_parse_bounds(&mut self, at: usize) -> Result<Option<(u32, Option<u32>)>, RegexpError> {
        self.bump(); // '{'
        let min = self.parse_number();
        let min = match min {
            Some(n) => n,
            None => return Ok(None),
        };
        let max = if self.eat(',') {
            self.parse_number()
        } else {
            Some(min)
        };
        if !self.eat('}') {
            return Ok(None);
        }
        if let Some(max) = max {
            if min > max {
                return Err(RegexpError::QuantifierOutOfRange {
                    at,
                    min: min as i64,
                    max: Some(max as i64),
                });
            }
        }
        Ok(Some((min, max)))
    }

    fn parse_number(&mut self) -> Option<u32> {
        let start = self.pos;
        while self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            self.pos += 1;
        }
        if self.pos == start {
            return None;
        }
        let s: String = self.chars[start..self.pos].iter().collect();
        s.parse().ok()
    }

    fn parse_atom(&mut self) -> Result<RegexAst, RegexpError> {
        let at = self.byte_at(self.pos);
        match self.bump() {
            None => Err(RegexpError::UnbalancedGroup { at }),
            Some('.') => Ok(RegexAst::Class(PredefinedClass::Any)),
            Some('^') => Ok(RegexAst::Anchor(Anchor::StartOfLine)),
            Some('$') => Ok(RegexAst::Anchor(Anchor::EndOfLine)),
            Some('(') => self.parse_group(),
            Some('[') => self.parse_class(at),
            Some('\\') => self.parse_escape(at),
            Some(c) => Ok(self.literal_char(c)),
        }
    }

    fn literal_char(&self, c: char) -> RegexAst {
        if self.opts.case_insensitive && c.is_alphabetic() {
            let mut ranges: Vec<CodeRange> = Vec::new();
            for v in c.to_lowercase().chain(c.to_uppercase()) {
                ranges.push(CodeRange { from: v as u32, to: v as u32 });
            }
            RegexAst::Set { ranges, negated: false }
        } else {
            RegexAst::Char(c)
        }
    }

    fn parse_group(&mut self) -> Result<RegexAst, RegexpError> {
        let at = self.byte_at(self.pos);
        if self.eat('?') {
            if self.eat(':') {
                let body = self.parse_alt()?;
                if !self.eat(')') {
                    return Err(RegexpError::UnbalancedGroup { at });
                }
                return Ok(RegexAst::NonCapGroup(Box::new(body)));
            }
            let negative = if self.eat('=') {
                false
            } else if self.eat('!') {
                true
            } else {
                return Err(RegexpError::BadEscape { at, ch: self.peek().unwrap_or('?') });
            };
            let body = self.parse_alt()?;
            if !self.eat(')') {
                return Err(RegexpError::UnbalancedGroup { at });
            }
            return Ok(RegexAst::Lookahead { negative, body: Box::new(body) });
        }
        let index = self.next_capture;
        self.next_capture += 2;
        let body = self.parse_alt()?;
        if !self.eat(')') {
            return Err(RegexpError::UnbalancedGroup { at });
        }
        Ok(RegexAst::Group { index, body: Box::new(body) })
    }

    fn parse_escape(&mut self, at: usize) -> Result<RegexAst, RegexpError> {
        match self.bump() {
            Some('d') => Ok(RegexAst::Class(PredefinedClass::Digit)),
            Some('D') => Ok(RegexAst::Class(PredefinedClass::NotDigit)),
            Some('w') => Ok(RegexAst::Class(PredefinedClass::Word)),
            Some('W') => Ok(RegexAst::Class(PredefinedClass::NotWord)),
            Some('h') => Ok(RegexAst::Class(PredefinedClass::HexDigit)),
            Some('H') => Ok(RegexAst::Class(PredefinedClass::NotHexDigit)),
            Some('s') => Ok(RegexAst::Class(PredefinedClass::Space)),
            Some('S') => Ok(RegexAst::Class(PredefinedClass::NotSpace)),
            Some('b') => Ok(RegexAst::Anchor(Anchor::WordBoundary)),
            Some('B') => Ok(RegexAst::Anchor(Anchor::NotWordBoundary)),
            Some('A') => Ok(RegexAst::Anchor(Anchor::StartOfString)),
            Some('z') => Ok(RegexAst::Anchor(Anchor::EndOfString)),
            Some('n') => Ok(RegexAst::Char('\n')),
            Some('t') => Ok(RegexAst::Char('\t')),
            Some('r') => Ok(RegexAst::Char('\r')),
            Some(c) if is_meta(c) => Ok(RegexAst::Char(c)),
            Some(c) => Err(RegexpError::BadEscape { at, ch: c }),
            None => Err(RegexpError::BadEscape { at, ch: '\\' }),
        }
    }

    fn parse_class(&mut self, at: usize) -> Result<RegexAst, RegexpError> {
        let negated = self.eat('^');
        let mut ranges = Vec::new();
        // A `]` immediately after `[` or `[^` is a literal, not a close.
        let mut first = true;
        loop {
            match self.peek() {
                None => return Err(RegexpError::UnterminatedClass { at }),
                Some(']') if !first => {
                    self.bump();
                    break;
                }
                _ => {
                    first = false;
                    let lo = self.parse_class_atom(at)?;
                    let hi = if self.peek() == Some('-') && self.chars.get(self.pos + 1) != Some(&']') {
                        self.bump();
                        self.parse_class_atom(at)?
                    } else {
                        lo
                    };
                    ranges.push(CodeRange { from: lo as u32, to: hi as u32 });
                }
            }
        }
        Ok(flatten_set(ranges, negated))
    }

    fn parse_class_atom(&mut self, at: usize) -> Result<char, RegexpError> {
        match self.bump() {
            Some('\\') => match self.bump() {
                Some('n') => Ok('\n'),
                Some('t') => Ok('\t'),
                Some('r') => Ok('\r'),
                Some(c) => Ok(c),
                None => Err(RegexpError::BadEscape { at, ch: '\\' }),
            },
            Some(c) => Ok(c),
            None => Err(RegexpError::UnterminatedClass { at }),
        }
    }
}

fn is_meta(c: char) -> bool {
    matches!(
        c,
        '.' | '^' | '$' | '|' | '(' | ')' | '[' | ']' | '{' | '}' | '*' | '+' | '?' | '\\' | '/'
    )
}

/// Sort, merge overlapping/adjacent ranges (`spec.md` §4.3: "recursively
/// flatten into a list of inclusive code-point ranges, sort by lower
/// bound, merge overlaps").
fn flatten_set(mut ranges: Vec<CodeRange>, negated: bool) -> RegexAst {
    ranges.sort_by_key(|r| r.from);
    let mut merged: Vec<CodeRange> = Vec::new();
    for r in ranges {
        if let Some(last) = merged.last_mut() {
            if r.from <= last.to.saturating_add(1) {
                last.to = last.to.max(r.to);
                continue;
            }
        }
        merged.push(r);
    }
    RegexAst::Set { ranges: merged, negated }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_literal_concat() {
        let ast = parse("abc").unwrap();
        assert_eq!(
            ast,
            RegexAst::Concat(vec![RegexAst::Char('a'), RegexAst::Char('b'), RegexAst::Char('c')])
        );
    }

    #[test]
    fn parses_alternation() {
        let ast = parse("a|b").unwrap();
        assert!(matches!(ast, RegexAst::Alt(_)));
    }

    #[test]
    fn parses_bracket_class_with_merge() {
        let ast = parse("[a-cA-Zc-e]").unwrap();
        match ast {
            RegexAst::Concat(items) => match &items[0] {
                RegexAst::Set { ranges, negated } => {
                    assert!(!negated);
                    // a-c and c-e merge into one a-e range, plus A-Z.
                    assert_eq!(ranges.len(), 2);
                }
                _ => panic!("expected Set"),
            },
            _ => panic!("expected wrapping Concat"),
        }
    }

    #[test]
    fn parses_bounded_quantifier() {
        let ast = parse("a{2,4}").unwrap();
        match ast {
            RegexAst::Concat(items) => match &items[0] {
                RegexAst::Repeat { min, max, .. } => {
                    assert_eq!(*min, 2);
                    assert_eq!(*max, Some(4));
                }
                _ => panic!("expected Repeat"),
            },
            _ => panic!(),
        }
    }

    #[test]
    fn rejects_unbalanced_group() {
        let err = parse("(abc").unwrap_err();
        assert!(matches!(err, RegexpError::UnbalancedGroup { .. }));
    }

    #[test]
    fn rejects_min_greater_than_max() {
        let err = parse("a{5,2}").unwrap_err();
        assert!(matches!(err, RegexpError::QuantifierOutOfRange { .. }));
    }
}
