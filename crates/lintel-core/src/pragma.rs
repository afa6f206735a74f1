//! Rule activation from directive comments
//!
//! Two directive forms are recognised inside line and block comments:
//!
//! ```text
//! // pragma: disable               every rule off from here on
//! // pragma: enable ruleA, ruleB   only the listed rules back on
//! var x = 1; // pragma: ignore      every rule off on this line only
//! ```
//!
//! Block directives replace the running rule table for every following token,
//! the directive comment included. An `ignore` directive overlays its own
//! line without touching the running table, and it can only switch rules
//! off: a rule disabled by a block stays disabled.
//!
//! The index is built in one pass over the token sequence and also records
//! the current line and column of every token.

use std::collections::HashMap;

use regex::Regex;

use crate::source::{Cursor, Position, contains_line_break};
use crate::syntax::{NodeId, TokenId, TokenKind, TokenTree};
use crate::{LintelError, Result};

const WILDCARD: &str = "*";

/// A parsed directive comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `enable` / `disable`, with an empty list meaning every rule
    Block { enabled: bool, rules: Vec<String> },
    /// `ignore`, with an empty list meaning every rule
    Ignore { rules: Vec<String> },
}

/// Recognises directive comments for one marker word
#[derive(Debug, Clone)]
pub struct DirectiveMatcher {
    block: Regex,
    ignore: Regex,
}

impl DirectiveMatcher {
    pub fn new(marker: &str) -> Result<Self> {
        if marker.is_empty() || marker.chars().any(|c| c.is_whitespace() || c == ':') {
            return Err(LintelError::invalid_pragma_config(format!(
                "pragma marker `{marker}` must be a single word without ':'"
            )));
        }
        let marker = regex::escape(marker);
        let compile = |pattern: String| {
            Regex::new(&pattern).map_err(|e| LintelError::invalid_pragma_config(e.to_string()))
        };
        Ok(Self {
            block: compile(format!(r"(?s)^\s*{marker}\s*:\s*(en|dis)able\b(.*)$"))?,
            ignore: compile(format!(r"(?s)^\s*{marker}\s*:\s*ignore\b(.*)$"))?,
        })
    }

    /// Interpret a comment token value
    pub fn parse(&self, kind: TokenKind, value: &str) -> Option<Directive> {
        let body = comment_body(kind, value)?;
        if let Some(caps) = self.block.captures(body) {
            return Some(Directive::Block {
                enabled: &caps[1] == "en",
                rules: parse_rule_list(&caps[2]),
            });
        }
        self.ignore.captures(body).map(|caps| Directive::Ignore {
            rules: parse_rule_list(&caps[1]),
        })
    }
}

/// Text between the comment delimiters
fn comment_body(kind: TokenKind, value: &str) -> Option<&str> {
    match kind {
        TokenKind::CommentLine => value.strip_prefix("//"),
        TokenKind::CommentBlock => {
            let inner = value.strip_prefix("/*")?;
            Some(inner.strip_suffix("*/").unwrap_or(inner))
        }
        _ => None,
    }
}

/// Comma separated rule names; blanks are dropped
pub fn parse_rule_list(rest: &str) -> Vec<String> {
    rest.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Rules switched off by overlapping `ignore` windows
#[derive(Debug, Clone, PartialEq, Eq)]
enum IgnoreSet {
    All,
    Rules(Vec<String>),
}

impl IgnoreSet {
    fn from_rules(rules: &[String]) -> Self {
        if rules.is_empty() {
            IgnoreSet::All
        } else {
            IgnoreSet::Rules(rules.to_vec())
        }
    }

    fn merge(&mut self, other: &IgnoreSet) {
        match (&mut *self, other) {
            (IgnoreSet::All, _) => {}
            (_, IgnoreSet::All) => *self = IgnoreSet::All,
            (IgnoreSet::Rules(mine), IgnoreSet::Rules(theirs)) => {
                for rule in theirs {
                    if !mine.contains(rule) {
                        mine.push(rule.clone());
                    }
                }
            }
        }
    }

    fn ignores(&self, rule: &str) -> bool {
        match self {
            IgnoreSet::All => true,
            IgnoreSet::Rules(rules) => rules.iter().any(|r| r == rule),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct TokenState {
    /// Index into `PragmaIndex::blocks`
    block: usize,
    ignored: Option<IgnoreSet>,
    position: Position,
}

#[derive(Debug, Clone)]
pub struct PragmaIndex {
    version: u64,
    has_pragmas: bool,
    /// Snapshots of the running rule table, one per block directive
    blocks: Vec<HashMap<String, bool>>,
    states: Vec<Option<TokenState>>,
}

impl PragmaIndex {
    /// Build the index, treating an unusable marker as "no directives"
    pub fn build(tree: &TokenTree) -> Self {
        match Self::try_build(tree) {
            Ok(index) => index,
            Err(err) => {
                tracing::warn!("pragma index disabled: {err}");
                Self::walk(tree, None)
            }
        }
    }

    pub fn try_build(tree: &TokenTree) -> Result<Self> {
        let matcher = DirectiveMatcher::new(&tree.options().pragma_marker)?;
        Ok(Self::walk(tree, Some(&matcher)))
    }

    fn walk(tree: &TokenTree, matcher: Option<&DirectiveMatcher>) -> Self {
        let _span = tracing::trace_span!("build_pragma_index", version = tree.version()).entered();

        let order: Vec<TokenId> = tree.tokens().collect();
        let mut blocks = vec![HashMap::from([(WILDCARD.to_string(), true)])];
        let mut states: Vec<Option<TokenState>> = vec![None; tree.arena_len()];
        let mut ignores: Vec<(usize, IgnoreSet)> = Vec::new();
        let mut cursor = Cursor::new();
        let mut has_pragmas = false;

        for (ordinal, id) in order.iter().enumerate() {
            let token = tree.token(*id);
            cursor.advance(token.whitespace_before());
            let position = cursor.position();
            cursor.advance(token.value());

            let directive = match matcher {
                Some(m) if token.is_comment() => m.parse(token.kind(), token.value()),
                _ => None,
            };
            match directive {
                Some(Directive::Block { enabled, rules }) => {
                    has_pragmas = true;
                    let mut table = blocks[blocks.len() - 1].clone();
                    if rules.is_empty() {
                        // a bare directive resets every rule-specific entry
                        table = HashMap::from([(WILDCARD.to_string(), enabled)]);
                    } else {
                        for rule in rules {
                            table.insert(rule, enabled);
                        }
                    }
                    blocks.push(table);
                }
                Some(Directive::Ignore { rules }) => {
                    has_pragmas = true;
                    ignores.push((ordinal, IgnoreSet::from_rules(&rules)));
                }
                None => {}
            }

            states[id.index()] = Some(TokenState {
                block: blocks.len() - 1,
                ignored: None,
                position,
            });
        }

        for (ordinal, set) in &ignores {
            for id in &order[Self::ignore_window(tree, &order, *ordinal)] {
                if let Some(state) = states[id.index()].as_mut() {
                    match state.ignored.as_mut() {
                        Some(existing) => existing.merge(set),
                        None => state.ignored = Some(set.clone()),
                    }
                }
            }
        }

        tracing::trace!(
            blocks = blocks.len() - 1,
            ignores = ignores.len(),
            "pragma walk finished"
        );
        Self {
            version: tree.version(),
            has_pragmas,
            blocks,
            states,
        }
    }

    /// Tokens sharing a line with the ignore comment at `ordinal`: back to the
    /// first token on the line, forward up to the next line break, bounded by
    /// the ends of the sequence
    fn ignore_window(tree: &TokenTree, order: &[TokenId], ordinal: usize) -> std::ops::Range<usize> {
        let starts_line = |i: usize| contains_line_break(tree.token(order[i]).whitespace_before());
        let mut start = ordinal;
        while start > 0 && !starts_line(start) {
            start -= 1;
        }
        let mut end = ordinal + 1;
        while end < order.len() && !starts_line(end) {
            end += 1;
        }
        start..end
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether any directive was found
    pub fn has_pragmas(&self) -> bool {
        self.has_pragmas
    }

    /// Line and column of a token as of this tree version
    pub fn position(&self, token: TokenId) -> Option<Position> {
        self.state(token).map(|s| s.position)
    }

    fn state(&self, token: TokenId) -> Option<&TokenState> {
        self.states.get(token.index()).and_then(Option::as_ref)
    }

    pub fn is_rule_enabled_at(&self, rule: &str, token: TokenId) -> bool {
        if !self.has_pragmas {
            return true;
        }
        let Some(state) = self.state(token) else {
            return true;
        };
        let table = &self.blocks[state.block];
        let enabled = table
            .get(rule)
            .or_else(|| table.get(WILDCARD))
            .copied()
            .unwrap_or(true);
        enabled && !state.ignored.as_ref().is_some_and(|set| set.ignores(rule))
    }

    /// Activation of `rule` at the first token of `node`
    pub fn is_rule_enabled(&self, tree: &TokenTree, rule: &str, node: NodeId) -> bool {
        self.is_rule_enabled_at(rule, tree.node(node).first_token())
    }
}
