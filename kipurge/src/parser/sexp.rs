//! Minimal S-expression reader for KiCad files.
//!
//! KiCad stores libraries, library tables, schematics and boards as nested
//! lists of the shape `(tag value value (child ...) ...)`. This module turns
//! that text into an [`SExp`] tree and offers the handful of queries the
//! readers in this crate need.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Unexpected end of input")]
    UnexpectedEof,
    #[error("Unexpected token on line {line}: {message}")]
    UnexpectedToken { line: usize, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SExp {
    Atom(String),
    List(Vec<SExp>),
}

impl SExp {
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            SExp::Atom(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SExp]> {
        match self {
            SExp::List(items) => Some(items),
            _ => None,
        }
    }

    /// Leading atom of a list node, e.g. `symbol` for `(symbol "R" ...)`.
    pub fn tag(&self) -> Option<&str> {
        self.as_list()
            .and_then(|items| items.first())
            .and_then(SExp::as_atom)
    }

    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag() == Some(tag)
    }

    /// Children following the tag, in document order.
    pub fn values(&self) -> &[SExp] {
        match self {
            SExp::List(items) if !items.is_empty() => &items[1..],
            _ => &[],
        }
    }

    /// First value if it is an atom: the name in `(symbol "Name" ...)`.
    pub fn first_atom(&self) -> Option<&str> {
        self.values().first().and_then(SExp::as_atom)
    }

    /// Direct child lists carrying `tag`.
    pub fn children<'a, 't>(&'a self, tag: &'t str) -> impl Iterator<Item = &'a SExp> + 't
    where
        'a: 't,
    {
        self.values().iter().filter(move |child| child.is_tag(tag))
    }

    /// All descendant lists carrying `tag`, depth-first in document order.
    /// The node itself is not included.
    pub fn find_all(&self, tag: &str) -> Vec<&SExp> {
        let mut found = Vec::new();
        for child in self.values() {
            child.collect_tagged(tag, &mut found);
        }
        found
    }

    fn collect_tagged<'a>(&'a self, tag: &str, found: &mut Vec<&'a SExp>) {
        if self.is_tag(tag) {
            found.push(self);
        }
        for child in self.values() {
            child.collect_tagged(tag, found);
        }
    }

    /// Look up a `(key value)` child. For two-element lists the value itself
    /// is returned, for longer lists the whole child list.
    pub fn get(&self, key: &str) -> Option<&SExp> {
        let child = self.children(key).next()?;
        match child.values() {
            [single] => Some(single),
            [] => None,
            _ => Some(child),
        }
    }

    /// String value of a `(key "value")` child.
    pub fn string_value(&self, key: &str) -> Option<&str> {
        self.children(key).next().and_then(SExp::first_atom)
    }

    /// Value of a `(property "key" "value" ...)` child.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.children("property").find_map(|prop| match prop.values() {
            [SExp::Atom(k), SExp::Atom(v), ..] if k == key => Some(v.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for SExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SExp::Atom(s) => {
                if s.is_empty() || s.contains(|c: char| c.is_whitespace() || c == '(' || c == ')' || c == '"') {
                    write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
                } else {
                    write!(f, "{}", s)
                }
            }
            SExp::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Parse a complete document. Only the first top-level expression is read;
/// KiCad files contain exactly one.
pub fn parse_sexp(input: &str) -> Result<SExp, ParseError> {
    SExpParser::new(input).parse()
}

pub struct SExpParser {
    input: Vec<char>,
    pos: usize,
    line: usize,
}

impl SExpParser {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    pub fn parse(&mut self) -> Result<SExp, ParseError> {
        self.skip_whitespace();
        if self.is_eof() {
            return Err(ParseError::UnexpectedEof);
        }
        self.parse_sexp()
    }

    fn parse_sexp(&mut self) -> Result<SExp, ParseError> {
        self.skip_whitespace();

        match self.peek() {
            None => Err(ParseError::UnexpectedEof),
            Some('(') => self.parse_list(),
            Some(')') => Err(self.unexpected("unbalanced ')'")),
            Some('"') => self.parse_string(),
            Some(_) => self.parse_symbol(),
        }
    }

    fn parse_list(&mut self) -> Result<SExp, ParseError> {
        self.expect_char('(')?;
        let mut items = Vec::new();

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(ParseError::UnexpectedEof),
                Some(')') => {
                    self.advance();
                    break;
                }
                Some(_) => items.push(self.parse_sexp()?),
            }
        }

        Ok(SExp::List(items))
    }

    fn parse_string(&mut self) -> Result<SExp, ParseError> {
        self.expect_char('"')?;
        let mut s = String::new();

        loop {
            let ch = self.peek().ok_or(ParseError::UnexpectedEof)?;
            self.advance();
            match ch {
                '"' => break,
                '\\' => {
                    let escaped = self.peek().ok_or(ParseError::UnexpectedEof)?;
                    self.advance();
                    s.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        other => other,
                    });
                }
                _ => s.push(ch),
            }
        }

        Ok(SExp::Atom(s))
    }

    fn parse_symbol(&mut self) -> Result<SExp, ParseError> {
        let mut s = String::new();

        while let Some(ch) = self.peek() {
            if ch.is_whitespace() || ch == '(' || ch == ')' || ch == '"' {
                break;
            }
            s.push(ch);
            self.advance();
        }

        if s.is_empty() {
            Err(self.unexpected("empty symbol"))
        } else {
            Ok(SExp::Atom(s))
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(ch) if ch.is_whitespace()) {
            self.advance();
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.peek() {
            if ch == '\n' {
                self.line += 1;
            }
            self.pos += 1;
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn unexpected(&self, message: &str) -> ParseError {
        ParseError::UnexpectedToken {
            line: self.line,
            message: message.to_string(),
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        match self.peek() {
            None => Err(ParseError::UnexpectedEof),
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(self.unexpected(&format!("expected '{}', found '{}'", expected, ch))),
        }
    }
}
