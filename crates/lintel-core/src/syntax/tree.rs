//! Token arena and node tree
//!
//! Tokens live in an arena addressed by [`TokenId`] and are chained into a
//! doubly-linked sequence. Nodes store their first and last token ids, never
//! ranges: ranges are derived from the current text on demand. Ids stay valid
//! across mutations; a removed token keeps its id but is detached from the
//! sequence.
//!
//! Derived data (layout, range index, pragma index, rendered source) is cached
//! against a version counter that every mutation bumps.

use std::cell::OnceCell;
use std::ops::Range;

use serde::Serialize;

use super::keywords::reclassify_keywords;
use super::kind::{NodeKind, TokenKind};
use super::layout::{Layout, TokenLayout};
use super::lexer::{RawToken, lex};
use super::parser::parse_tokens;
use crate::config::ParseOptions;
use crate::index::RangeIndex;
use crate::pragma::PragmaIndex;
use crate::source::{Position, SourceBuffer, dominant_line_break};

/// Stable token handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TokenId(u32);

impl TokenId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Stable node handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A lexical token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) value: String,
    pub(crate) whitespace_before: String,
    pub(crate) prev: Option<TokenId>,
    pub(crate) next: Option<TokenId>,
    pub(crate) attached: bool,
}

impl Token {
    pub(crate) fn new(kind: TokenKind, value: String, whitespace_before: String) -> Self {
        Self {
            kind,
            value,
            whitespace_before,
            prev: None,
            next: None,
            attached: true,
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Exact text between the previous token and this one
    pub fn whitespace_before(&self) -> &str {
        &self.whitespace_before
    }

    pub fn is_comment(&self) -> bool {
        self.kind.is_comment()
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    /// False once the token has been removed from the sequence
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Check kind and, optionally, value
    pub fn matches(&self, kind: TokenKind, value: Option<&str>) -> bool {
        self.kind == kind && value.is_none_or(|v| self.value == v)
    }
}

/// A syntactic node spanning a contiguous run of tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) first: TokenId,
    pub(crate) last: TokenId,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn first_token(&self) -> TokenId {
        self.first
    }

    pub fn last_token(&self) -> TokenId {
        self.last
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// A recoverable syntax error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseError {
    pub description: String,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

/// Token sequence plus syntax tree for one document
#[derive(Debug)]
pub struct TokenTree {
    pub(crate) tokens: Vec<Token>,
    pub(crate) nodes: Vec<Node>,
    pub(crate) head: TokenId,
    pub(crate) eof: TokenId,
    pub(crate) root: NodeId,
    pub(crate) parse_errors: Vec<ParseError>,
    pub(crate) line_break: &'static str,
    pub(crate) options: ParseOptions,
    pub(crate) version: u64,
    layout: OnceCell<Layout>,
    index: OnceCell<RangeIndex>,
    pragmas: OnceCell<PragmaIndex>,
    source: OnceCell<SourceBuffer>,
}

impl TokenTree {
    /// Parse `source`. Syntax errors never abort: they are stored on the tree
    /// and whatever structure could be recovered is kept.
    pub fn parse(source: &str, options: &ParseOptions) -> Self {
        let _span = tracing::debug_span!("parse", bytes = source.len()).entered();
        let (raw, lex_errors) = lex(source);
        let mut tree = Self::from_raw_tokens(raw, dominant_line_break(source), options.clone());

        let outcome = parse_tokens(&tree, options.tolerant);
        tree.nodes = outcome.nodes;
        tree.root = outcome.root;

        let mut errors: Vec<ParseError> = lex_errors
            .into_iter()
            .map(|err| tree.parse_error_at(err.message, err.span.start))
            .collect();
        errors.extend(outcome.errors);
        errors.sort_by_key(|e| e.offset);
        tree.parse_errors = errors;

        let retagged = reclassify_keywords(&mut tree);
        tracing::debug!(
            tokens = tree.tokens.len(),
            nodes = tree.nodes.len(),
            errors = tree.parse_errors.len(),
            retagged,
            "parsed document"
        );
        tree
    }

    /// Link lexer output into a sequence. The tree starts root-only.
    pub(crate) fn from_raw_tokens(
        raw: Vec<RawToken>,
        line_break: &'static str,
        options: ParseOptions,
    ) -> Self {
        let count = raw.len();
        let mut tokens: Vec<Token> = raw
            .into_iter()
            .map(|t| Token::new(t.kind, t.value, t.whitespace_before))
            .collect();
        for (i, token) in tokens.iter_mut().enumerate() {
            token.prev = i.checked_sub(1).map(TokenId::new);
            token.next = (i + 1 < count).then(|| TokenId::new(i + 1));
        }
        let head = TokenId::new(0);
        let eof = TokenId::new(count.saturating_sub(1));
        let root = Node {
            kind: NodeKind::Program,
            first: head,
            last: eof,
            parent: None,
            children: Vec::new(),
        };
        Self {
            tokens,
            nodes: vec![root],
            head,
            eof,
            root: NodeId::new(0),
            parse_errors: Vec::new(),
            line_break,
            options,
            version: 0,
            layout: OnceCell::new(),
            index: OnceCell::new(),
            pragmas: OnceCell::new(),
            source: OnceCell::new(),
        }
    }

    pub(crate) fn parse_error_at(&self, description: impl Into<String>, offset: usize) -> ParseError {
        let position = self.position_of_offset(offset);
        ParseError {
            description: description.into(),
            line: position.line,
            column: position.column,
            offset,
        }
    }

    fn position_of_offset(&self, offset: usize) -> Position {
        match self.layout().token_at_offset(offset).and_then(|t| self.layout().get(t)) {
            Some(layout) => layout.start_pos,
            None => self
                .source()
                .position_at(offset.min(self.source().len()))
                .unwrap_or_default(),
        }
    }

    // ----- bookkeeping -----

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Drop every derived cache. Called by all mutations.
    pub(crate) fn invalidate(&mut self) {
        self.version += 1;
        self.layout.take();
        self.index.take();
        self.pragmas.take();
        self.source.take();
    }

    pub(crate) fn arena_len(&self) -> usize {
        self.tokens.len()
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn parse_errors(&self) -> &[ParseError] {
        &self.parse_errors
    }

    pub fn is_valid(&self) -> bool {
        self.parse_errors.is_empty()
    }

    /// Line break synthesized by whitespace edits
    pub fn line_break(&self) -> &'static str {
        self.line_break
    }

    pub(crate) fn layout(&self) -> &Layout {
        self.layout.get_or_init(|| Layout::build(self))
    }

    /// Range, line and type lookups over the current tree
    pub fn index(&self) -> &RangeIndex {
        self.index.get_or_init(|| RangeIndex::build(self))
    }

    /// Pragma activation table over the current tree
    pub fn pragmas(&self) -> &PragmaIndex {
        self.pragmas.get_or_init(|| PragmaIndex::build(self))
    }

    /// Current text with its line structure
    pub fn source(&self) -> &SourceBuffer {
        self.source.get_or_init(|| SourceBuffer::new(self.render()))
    }

    pub fn lines(&self) -> Vec<&str> {
        self.source().lines()
    }

    pub fn lines_with_comments_removed(&self) -> Vec<String> {
        let comments: Vec<Range<usize>> = self
            .tokens()
            .filter(|t| self.token(*t).is_comment())
            .filter_map(|t| self.range(t))
            .collect();
        self.source().lines_with_comments_removed(&comments)
    }

    // ----- tokens -----

    pub fn token(&self, id: TokenId) -> &Token {
        &self.tokens[id.index()]
    }

    /// First token of the sequence (possibly a comment, or `Eof` for empty input)
    pub fn first_token(&self) -> TokenId {
        self.head
    }

    /// The `Eof` token, always last
    pub fn last_token(&self) -> TokenId {
        self.eof
    }

    /// All attached tokens in sequence order, comments and `Eof` included
    pub fn tokens(&self) -> TokenIter<'_> {
        TokenIter {
            tree: self,
            next: Some(self.head),
        }
    }

    pub fn next_token(&self, id: TokenId, include_comments: bool) -> Option<TokenId> {
        let mut current = self.token(id).next;
        while let Some(t) = current {
            if include_comments || !self.token(t).is_comment() {
                return Some(t);
            }
            current = self.token(t).next;
        }
        None
    }

    pub fn previous_token(&self, id: TokenId, include_comments: bool) -> Option<TokenId> {
        let mut current = self.token(id).prev;
        while let Some(t) = current {
            if include_comments || !self.token(t).is_comment() {
                return Some(t);
            }
            current = self.token(t).prev;
        }
        None
    }

    /// Scan forward for a token of `kind` (and `value`). Comments are only
    /// considered when searching for a comment kind.
    pub fn find_next_token(
        &self,
        id: TokenId,
        kind: TokenKind,
        value: Option<&str>,
    ) -> Option<TokenId> {
        let include_comments = kind.is_comment();
        let mut current = self.next_token(id, include_comments);
        while let Some(t) = current {
            if self.token(t).matches(kind, value) {
                return Some(t);
            }
            current = self.next_token(t, include_comments);
        }
        None
    }

    pub fn find_prev_token(
        &self,
        id: TokenId,
        kind: TokenKind,
        value: Option<&str>,
    ) -> Option<TokenId> {
        let include_comments = kind.is_comment();
        let mut current = self.previous_token(id, include_comments);
        while let Some(t) = current {
            if self.token(t).matches(kind, value) {
                return Some(t);
            }
            current = self.previous_token(t, include_comments);
        }
        None
    }

    pub fn find_next_operator_token(&self, id: TokenId, value: &str) -> Option<TokenId> {
        self.find_next_token(id, TokenKind::Punctuator, Some(value))
    }

    pub fn find_prev_operator_token(&self, id: TokenId, value: &str) -> Option<TokenId> {
        self.find_prev_token(id, TokenKind::Punctuator, Some(value))
    }

    /// Byte range of an attached token in the current text
    pub fn range(&self, id: TokenId) -> Option<Range<usize>> {
        self.layout().get(id).map(|l| l.start..l.end)
    }

    /// Start position of an attached token
    pub fn loc(&self, id: TokenId) -> Option<Position> {
        self.layout().get(id).map(|l| l.start_pos)
    }

    /// Position right after the token's text
    pub fn end_loc(&self, id: TokenId) -> Option<Position> {
        self.layout().get(id).map(|l| l.end_pos)
    }

    pub(crate) fn token_layout(&self, id: TokenId) -> Option<&TokenLayout> {
        self.layout().get(id)
    }

    /// Order two attached tokens by sequence position
    pub fn precedes(&self, a: TokenId, b: TokenId) -> Option<bool> {
        let a = self.layout().get(a)?.ordinal;
        let b = self.layout().get(b)?.ordinal;
        Some(a < b)
    }

    /// Whether any comment sits strictly between `a` and `b`
    pub fn has_comment_between(&self, a: TokenId, b: TokenId) -> bool {
        let mut current = self.token(a).next;
        while let Some(t) = current {
            if t == b {
                return false;
            }
            if self.token(t).is_comment() {
                return true;
            }
            current = self.token(t).next;
        }
        false
    }

    pub(crate) fn retag(&mut self, id: TokenId, kind: TokenKind) {
        if self.tokens[id.index()].kind != kind {
            self.tokens[id.index()].kind = kind;
            self.invalidate();
        }
    }

    // ----- nodes -----

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// All nodes in pre-order, root first
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        out
    }

    /// Range of a node, re-derived from its boundary tokens
    pub fn node_range(&self, id: NodeId) -> Option<Range<usize>> {
        let node = self.node(id);
        let start = self.range(node.first)?.start;
        let end = self.range(node.last)?.end;
        Some(start..end)
    }

    pub fn node_loc(&self, id: NodeId) -> Option<Position> {
        self.loc(self.node(id).first)
    }

    /// Innermost node owning each token, indexed by [`TokenId::index`].
    /// Comments between nodes belong to the enclosing node.
    pub fn token_owners(&self) -> Vec<Option<NodeId>> {
        let mut owners = vec![None; self.tokens.len()];
        for node_id in self.nodes() {
            let node = self.node(node_id);
            let mut current = Some(node.first);
            while let Some(t) = current {
                owners[t.index()] = Some(node_id);
                if t == node.last {
                    break;
                }
                current = self.token(t).next;
            }
        }
        owners
    }

    /// Iterator over ancestors, starting with the node itself
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |n| self.parent(*n))
    }
}

/// Iterator over attached tokens
pub struct TokenIter<'a> {
    tree: &'a TokenTree,
    next: Option<TokenId>,
}

impl Iterator for TokenIter<'_> {
    type Item = TokenId;

    fn next(&mut self) -> Option<TokenId> {
        let current = self.next?;
        self.next = self.tree.token(current).next;
        Some(current)
    }
}
