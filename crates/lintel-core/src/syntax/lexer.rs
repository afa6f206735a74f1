//! Lossless lexer
//!
//! Every token records the exact whitespace that precedes it, and the final
//! `Eof` token carries any trailing whitespace, so concatenating
//! `whitespace_before + value` over the token list reproduces the input
//! byte-for-byte. Comments are ordinary tokens in the same list.
//!
//! Lexing never fails: problems are collected as [`LexError`]s and the
//! offending text becomes a best-effort token.

use std::ops::Range;

use super::keywords::word_kind;
use super::kind::TokenKind;

/// Byte span in the source
pub type Span = Range<usize>;

/// A lexer error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

impl LexError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

/// A token as produced by the lexer, before it is linked into a tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawToken {
    pub kind: TokenKind,
    pub value: String,
    pub whitespace_before: String,
    pub start: usize,
}

impl RawToken {
    pub fn end(&self) -> usize {
        self.start + self.value.len()
    }
}

/// Result returned by the lexer
pub type LexResult = (Vec<RawToken>, Vec<LexError>);

/// Multi-character punctuators, longest first
const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "<<", ">>", "**",
];

const SINGLE_PUNCTUATORS: &str = "{}()[];,<>+-*/%&|^!~?:=.@";

/// Lex `input` into tokens with attached leading whitespace
pub fn lex(input: &str) -> LexResult {
    let mut lexer = Lexer::new(input);
    lexer.run();
    (lexer.tokens, lexer.errors)
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    tokens: Vec<RawToken>,
    errors: Vec<LexError>,
    /// One entry per open `(`: whether it starts an `if`/`while`/`for`/`with` head
    paren_heads: Vec<bool>,
    /// The most recent `)` closed such a head, so a statement follows it
    closed_head: bool,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            tokens: Vec::new(),
            errors: Vec::new(),
            paren_heads: Vec::new(),
            closed_head: false,
        }
    }

    fn run(&mut self) {
        let len = self.input.len();
        while self.pos < len {
            let Some(current) = self.peek_char(self.pos) else {
                break;
            };

            if current.is_whitespace() || current == '\u{feff}' {
                self.pos += current.len_utf8();
                continue;
            }

            let start = self.pos;
            match current {
                '#' if self.at_line_start(start) => {
                    let end = self.line_end(start);
                    self.push(TokenKind::CommentDirective, start, end);
                }
                '/' => self.lex_slash(start),
                '"' | '\'' => self.lex_string(start, current),
                '`' => self.lex_template(start),
                c if c.is_ascii_digit() => self.lex_number(start),
                '.' if self.peek_char(start + 1).is_some_and(|c| c.is_ascii_digit()) => {
                    self.lex_number(start)
                }
                c if is_identifier_start(c) => self.lex_word(start),
                _ => self.lex_punctuator(start, current),
            }
        }
        let trailing = self.whitespace_since_last();
        self.tokens.push(RawToken {
            kind: TokenKind::Eof,
            value: String::new(),
            whitespace_before: trailing,
            start: len,
        });
    }

    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        let whitespace_before = self.whitespace_since_last_until(start);
        self.tokens.push(RawToken {
            kind,
            value: self.input[start..end].to_string(),
            whitespace_before,
            start,
        });
        self.pos = end;
    }

    fn whitespace_since_last(&self) -> String {
        self.whitespace_since_last_until(self.input.len())
    }

    fn whitespace_since_last_until(&self, until: usize) -> String {
        let from = self.tokens.last().map(|t| t.end()).unwrap_or(0);
        self.input[from..until].to_string()
    }

    fn peek_char(&self, pos: usize) -> Option<char> {
        self.input.get(pos..)?.chars().next()
    }

    fn at_line_start(&self, pos: usize) -> bool {
        pos == 0 || matches!(self.input.as_bytes()[pos - 1], b'\n' | b'\r')
    }

    fn line_end(&self, start: usize) -> usize {
        self.input[start..]
            .find(['\n', '\r'])
            .map(|rel| start + rel)
            .unwrap_or(self.input.len())
    }

    /// Previous token that is not a comment
    fn last_significant(&self) -> Option<&RawToken> {
        self.tokens.iter().rev().find(|t| !t.kind.is_comment())
    }

    fn regex_allowed(&self) -> bool {
        match self.last_significant() {
            None => true,
            Some(t) => match t.kind {
                TokenKind::Punctuator => match t.value.as_str() {
                    ")" => self.closed_head,
                    "]" | "}" => false,
                    _ => true,
                },
                TokenKind::Keyword => !matches!(t.value.as_str(), "this" | "super"),
                _ => false,
            },
        }
    }

    fn track_paren(&mut self, current: char) {
        match current {
            '(' => {
                let head = self.last_significant().is_some_and(|t| {
                    t.kind == TokenKind::Keyword
                        && matches!(t.value.as_str(), "if" | "while" | "for" | "with")
                });
                self.paren_heads.push(head);
            }
            ')' => self.closed_head = self.paren_heads.pop().unwrap_or(false),
            _ => {}
        }
    }

    fn lex_slash(&mut self, start: usize) {
        match self.peek_char(start + 1) {
            Some('/') => {
                let end = self.line_end(start);
                self.push(TokenKind::CommentLine, start, end);
            }
            Some('*') => match self.input[start + 2..].find("*/") {
                Some(rel) => {
                    let end = start + 2 + rel + 2;
                    self.push(TokenKind::CommentBlock, start, end);
                }
                None => {
                    let end = self.input.len();
                    self.errors
                        .push(LexError::new("Unterminated block comment", start..end));
                    self.push(TokenKind::CommentBlock, start, end);
                }
            },
            _ if self.regex_allowed() => self.lex_regex(start),
            _ => self.lex_punctuator(start, '/'),
        }
    }

    fn lex_regex(&mut self, start: usize) {
        let bytes = self.input.as_bytes();
        let mut i = start + 1;
        let mut in_class = false;
        let mut terminated = false;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += 2,
                b'\n' | b'\r' => break,
                b'[' => {
                    in_class = true;
                    i += 1;
                }
                b']' => {
                    in_class = false;
                    i += 1;
                }
                b'/' if !in_class => {
                    i += 1;
                    terminated = true;
                    break;
                }
                _ => i += 1,
            }
        }
        if !terminated {
            // Fall back to a plain slash punctuator
            self.errors
                .push(LexError::new("Unterminated regular expression", start..i.min(bytes.len())));
            self.push(TokenKind::Punctuator, start, start + 1);
            return;
        }
        while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
            i += 1;
        }
        self.push(TokenKind::RegularExpression, start, i);
    }

    fn lex_string(&mut self, start: usize, quote: char) {
        let mut chars = self.input[start + 1..].char_indices();
        let mut end = None;
        while let Some((offset, c)) = chars.next() {
            match c {
                '\\' => {
                    chars.next();
                }
                '\n' | '\r' => break,
                c if c == quote => {
                    end = Some(start + 1 + offset + 1);
                    break;
                }
                _ => {}
            }
        }
        let end = match end {
            Some(end) => end,
            None => {
                let end = self.line_end(start);
                self.errors
                    .push(LexError::new("Unterminated string literal", start..end));
                end
            }
        };
        self.push(TokenKind::String, start, end);
    }

    fn lex_template(&mut self, start: usize) {
        let mut chars = self.input[start + 1..].char_indices().peekable();
        let mut depth = 0usize;
        let mut end = None;
        while let Some((offset, c)) = chars.next() {
            match c {
                '\\' => {
                    chars.next();
                }
                '$' if depth == 0 && chars.peek().is_some_and(|(_, n)| *n == '{') => {
                    chars.next();
                    depth += 1;
                }
                '{' if depth > 0 => depth += 1,
                '}' if depth > 0 => depth -= 1,
                '`' if depth == 0 => {
                    end = Some(start + 1 + offset + 1);
                    break;
                }
                _ => {}
            }
        }
        let end = match end {
            Some(end) => end,
            None => {
                let end = self.input.len();
                self.errors
                    .push(LexError::new("Unterminated template literal", start..end));
                end
            }
        };
        self.push(TokenKind::Template, start, end);
    }

    fn lex_number(&mut self, start: usize) {
        let bytes = self.input.as_bytes();
        let mut i = start;
        let radix_prefix = bytes[i] == b'0'
            && bytes
                .get(i + 1)
                .is_some_and(|b| matches!(b, b'x' | b'X' | b'o' | b'O' | b'b' | b'B'));
        if radix_prefix {
            i += 2;
            while i < bytes.len() && (bytes[i].is_ascii_hexdigit() || bytes[i] == b'_') {
                i += 1;
            }
        } else {
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'_') {
                i += 1;
            }
            if i < bytes.len() && bytes[i] == b'.' {
                i += 1;
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'_') {
                    i += 1;
                }
            }
            if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
                let mut j = i + 1;
                if j < bytes.len() && matches!(bytes[j], b'+' | b'-') {
                    j += 1;
                }
                if j < bytes.len() && bytes[j].is_ascii_digit() {
                    i = j;
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
        }
        if i < bytes.len() && bytes[i] == b'n' {
            i += 1;
        }
        if let Some(c) = self.peek_char(i)
            && is_identifier_start(c)
        {
            let (_, word_end) = self.scan_word(i);
            self.errors.push(LexError::new(
                "Identifier directly after number",
                start..word_end,
            ));
        }
        self.push(TokenKind::Numeric, start, i);
    }

    fn lex_word(&mut self, start: usize) {
        let (kind, end) = self.scan_word(start);
        self.push(kind, start, end);
    }

    fn scan_word(&self, start: usize) -> (TokenKind, usize) {
        let mut end = start;
        for (offset, c) in self.input[start..].char_indices() {
            if (offset == 0 && is_identifier_start(c)) || (offset > 0 && is_identifier_part(c)) {
                end = start + offset + c.len_utf8();
            } else {
                break;
            }
        }
        (word_kind(&self.input[start..end]), end)
    }

    fn lex_punctuator(&mut self, start: usize, current: char) {
        let rest = &self.input[start..];
        if let Some(p) = PUNCTUATORS.iter().find(|p| rest.starts_with(**p)) {
            self.push(TokenKind::Punctuator, start, start + p.len());
            return;
        }
        let end = start + current.len_utf8();
        if SINGLE_PUNCTUATORS.contains(current) {
            self.track_paren(current);
            self.push(TokenKind::Punctuator, start, end);
        } else {
            self.errors.push(LexError::new(
                format!("Unexpected character '{current}'"),
                start..end,
            ));
            self.push(TokenKind::Unknown, start, end);
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    c == '$' || c == '_' || c.is_alphabetic()
}

fn is_identifier_part(c: char) -> bool {
    is_identifier_start(c) || c.is_alphanumeric() || c == '\u{200c}' || c == '\u{200d}'
}
