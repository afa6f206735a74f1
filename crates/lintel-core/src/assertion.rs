//! Spacing, line and adjacency assertions between tokens
//!
//! Every assertion validates its options first and fails with a
//! [`LintelError`] when they make no sense; those are bugs in the calling
//! rule. A style problem in the document is returned as `Ok(Some(Violation))`,
//! usually with a [`Fix`] that corrects it.

use std::fmt;

use crate::diagnostics::Violation;
use crate::mutation::{Fix, LineEdit, Mutation};
use crate::syntax::{TokenId, TokenKind, TokenTree};
use crate::{LintelError, Result};

/// Bounds on a count of spaces or lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Count {
    pub exactly: Option<usize>,
    pub at_least: Option<usize>,
    pub at_most: Option<usize>,
}

impl Count {
    pub fn exactly(n: usize) -> Self {
        Self {
            exactly: Some(n),
            ..Default::default()
        }
    }

    pub fn at_least(n: usize) -> Self {
        Self {
            at_least: Some(n),
            ..Default::default()
        }
    }

    pub fn at_most(n: usize) -> Self {
        Self {
            at_most: Some(n),
            ..Default::default()
        }
    }

    pub fn between(at_least: usize, at_most: usize) -> Self {
        Self {
            exactly: None,
            at_least: Some(at_least),
            at_most: Some(at_most),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match (self.exactly, self.at_least, self.at_most) {
            (None, None, None) => Err(LintelError::invalid_assertion(
                "one of exactly, atLeast or atMost is required",
            )),
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => Err(LintelError::invalid_assertion(
                "exactly cannot be combined with atLeast or atMost",
            )),
            (None, Some(min), Some(max)) if min > max => Err(LintelError::invalid_assertion(
                format!("atLeast ({min}) is greater than atMost ({max})"),
            )),
            _ => Ok(()),
        }
    }

    pub fn accepts(&self, actual: usize) -> bool {
        self.exactly.is_none_or(|n| actual == n)
            && self.at_least.is_none_or(|n| actual >= n)
            && self.at_most.is_none_or(|n| actual <= n)
    }

    /// Closest accepted count to `actual`
    pub fn target(&self, actual: usize) -> usize {
        if let Some(n) = self.exactly {
            return n;
        }
        let mut target = actual;
        if let Some(min) = self.at_least {
            target = target.max(min);
        }
        if let Some(max) = self.at_most {
            target = target.min(max);
        }
        target
    }

    fn describe(&self, unit: &str) -> String {
        let units = |n: usize| {
            if n == 1 {
                format!("{n} {unit}")
            } else {
                format!("{n} {unit}s")
            }
        };
        match (self.exactly, self.at_least, self.at_most) {
            (Some(n), _, _) => format!("exactly {}", units(n)),
            (None, Some(min), Some(max)) => format!("between {min} and {}", units(max)),
            (None, Some(min), None) => format!("at least {}", units(min)),
            (None, None, Some(max)) => format!("at most {}", units(max)),
            (None, None, None) => String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpacingOptions {
    pub count: Count,
    /// Check pairs on different lines too, requiring them to be joined
    pub disallow_new_line: bool,
    pub message: Option<String>,
}

impl SpacingOptions {
    pub fn new(count: Count) -> Self {
        Self {
            count,
            ..Default::default()
        }
    }

    pub fn disallow_new_line(mut self) -> Self {
        self.disallow_new_line = true;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineOptions {
    pub count: Count,
    /// When joining lines, pull the second token up instead of inserting a space
    pub stick_to_previous_token: bool,
    pub message: Option<String>,
}

impl LineOptions {
    pub fn new(count: Count) -> Self {
        Self {
            count,
            ..Default::default()
        }
    }

    pub fn stick_to_previous_token(mut self) -> Self {
        self.stick_to_previous_token = true;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Expected shape of an adjacent token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPattern {
    pub kind: TokenKind,
    pub value: Option<String>,
}

impl TokenPattern {
    pub fn new(kind: TokenKind, value: Option<&str>) -> Self {
        Self {
            kind,
            value: value.map(str::to_string),
        }
    }

    pub fn punctuator(value: &str) -> Self {
        Self::new(TokenKind::Punctuator, Some(value))
    }

    pub fn keyword(value: &str) -> Self {
        Self::new(TokenKind::Keyword, Some(value))
    }

    pub fn matches(&self, tree: &TokenTree, token: TokenId) -> bool {
        tree.token(token).matches(self.kind, self.value.as_deref())
    }
}

impl fmt::Display for TokenPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{value}"),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Assertions bound to one tree
#[derive(Clone, Copy)]
pub struct AssertionEngine<'t> {
    tree: &'t TokenTree,
}

impl<'t> AssertionEngine<'t> {
    pub fn new(tree: &'t TokenTree) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &'t TokenTree {
        self.tree
    }

    fn value(&self, token: TokenId) -> &'t str {
        self.tree.token(token).value()
    }

    fn check_attached(&self, token: TokenId) -> Result<()> {
        let t = self.tree.token(token);
        if t.is_attached() {
            Ok(())
        } else {
            Err(LintelError::DetachedToken {
                value: t.value().to_string(),
            })
        }
    }

    fn check_pair(&self, token: TokenId, next: TokenId) -> Result<()> {
        if token == next {
            return Err(LintelError::SameToken {
                value: self.value(token).to_string(),
            });
        }
        self.check_attached(token)?;
        self.check_attached(next)?;
        if self.tree.precedes(token, next) != Some(true) {
            return Err(LintelError::invalid_assertion(format!(
                "`{}` must come before `{}`",
                self.value(token),
                self.value(next)
            )));
        }
        Ok(())
    }

    /// Violation placed right after `token`
    fn violation_after(&self, token: TokenId, message: String) -> Violation {
        let mut violation = Violation::at(self.tree, token, message);
        if let (Some(range), Some(end)) = (self.tree.range(token), self.tree.end_loc(token)) {
            violation.offset = range.end;
            violation.line = end.line;
            violation.column = end.column;
        }
        violation
    }

    /// Text between the end of `token` and the start of `next`
    fn gap(&self, token: TokenId, next: TokenId) -> &'t str {
        match (self.tree.range(token), self.tree.range(next)) {
            (Some(a), Some(b)) if a.end <= b.start => &self.tree.source().text()[a.end..b.start],
            _ => "",
        }
    }

    fn lines_apart(&self, token: TokenId, next: TokenId) -> usize {
        match (self.tree.end_loc(token), self.tree.loc(next)) {
            (Some(end), Some(start)) => start.line.saturating_sub(end.line),
            _ => 0,
        }
    }

    /// Character count between two tokens. Only same-line pairs are checked
    /// unless `disallow_new_line` is set; a pair split across lines is then
    /// joined with the width the bounds ask for.
    pub fn spaces_between(
        &self,
        token: TokenId,
        next: TokenId,
        options: &SpacingOptions,
    ) -> Result<Option<Violation>> {
        options.count.validate()?;
        self.check_pair(token, next)?;

        let on_different_lines = self.lines_apart(token, next) > 0;
        if on_different_lines && !options.disallow_new_line {
            return Ok(None);
        }
        // line breaks and indentation are not spaces
        let actual = if on_different_lines {
            0
        } else {
            self.gap(token, next).chars().count()
        };
        if !on_different_lines && options.count.accepts(actual) {
            return Ok(None);
        }

        let target = options.count.target(actual);
        let message = options.message.clone().unwrap_or_else(|| {
            if on_different_lines {
                format!(
                    "Illegal line break between `{}` and `{}`",
                    self.value(token),
                    self.value(next)
                )
            } else if options.count.exactly == Some(0) {
                format!(
                    "Unexpected whitespace between `{}` and `{}`",
                    self.value(token),
                    self.value(next)
                )
            } else {
                format!(
                    "Expected {} between `{}` and `{}` but found {actual}",
                    options.count.describe("space"),
                    self.value(token),
                    self.value(next)
                )
            }
        });

        let fix = (!self.tree.has_comment_between(token, next)).then(|| {
            Fix::single(Mutation::ReplaceWhitespace {
                token: next,
                text: " ".repeat(target),
            })
        });
        Ok(Some(self.violation_after(token, message).with_fix(fix)))
    }

    /// Number of line breaks between two tokens
    pub fn lines_between(
        &self,
        token: TokenId,
        next: TokenId,
        options: &LineOptions,
    ) -> Result<Option<Violation>> {
        options.count.validate()?;
        self.check_pair(token, next)?;
        let actual = self.lines_apart(token, next);
        let target = options.count.target(actual);
        if options.stick_to_previous_token && target != 0 {
            return Err(LintelError::invalid_assertion(
                "stickToPreviousToken only applies when the lines are joined",
            ));
        }
        if options.count.accepts(actual) {
            return Ok(None);
        }

        let message = options.message.clone().unwrap_or_else(|| {
            if target == 0 {
                format!(
                    "`{}` and `{}` should be on the same line",
                    self.value(token),
                    self.value(next)
                )
            } else {
                format!(
                    "Expected {} between `{}` and `{}` but found {actual}",
                    options.count.describe("line break"),
                    self.value(token),
                    self.value(next)
                )
            }
        });

        let fix = if self.tree.has_comment_between(token, next) {
            None
        } else if options.stick_to_previous_token {
            Some(self.stick_fix(next))
        } else {
            Some(Fix::single(Mutation::RewriteLines {
                token: next,
                edit: LineEdit::LineBreaks { count: target },
            }))
        };
        Ok(Some(self.violation_after(token, message).with_fix(fix)))
    }

    /// Pull `next` onto the previous line; its old whitespace moves to the
    /// token after it
    fn stick_fix(&self, next: TokenId) -> Fix {
        let old = self.tree.token(next).whitespace_before().to_string();
        let mut mutations = vec![Mutation::ReplaceWhitespace {
            token: next,
            text: String::new(),
        }];
        if let Some(following) = self.tree.next_token(next, true) {
            mutations.push(Mutation::ReplaceWhitespace {
                token: following,
                text: old,
            });
        }
        Fix::new(mutations)
    }

    /// Compare a measured indentation against the expected one. The fix sets
    /// the last line of the whitespace before `token` to `expected` copies of
    /// `indent_char`, and shifts a comment's inner lines by the same amount.
    pub fn indentation(
        &self,
        token: TokenId,
        line: usize,
        actual: usize,
        expected: usize,
        indent_char: char,
    ) -> Result<Option<Violation>> {
        self.check_attached(token)?;
        if actual == expected {
            return Ok(None);
        }

        let indent: String = std::iter::repeat_n(indent_char, expected).collect();
        let mut mutations = vec![Mutation::RewriteLines {
            token,
            edit: LineEdit::Indent { indent },
        }];
        if self.tree.token(token).is_comment() {
            mutations.push(Mutation::ReindentComment {
                token,
                diff: expected as isize - actual as isize,
                indent_char,
            });
        }

        let unit = if indent_char == '\t' { "tab" } else { "space" };
        let plural = |n: usize| if n == 1 { "" } else { "s" };
        let mut violation = Violation::at(
            self.tree,
            token,
            format!(
                "Expected indentation of {expected} {unit}{} but found {actual}",
                plural(expected)
            ),
        );
        violation.line = line;
        Ok(Some(violation.with_fix(Some(Fix::new(mutations)))))
    }

    pub fn whitespace_between(&self, token: TokenId, next: TokenId) -> Result<Option<Violation>> {
        self.spaces_between(token, next, &SpacingOptions::new(Count::at_least(1)))
    }

    pub fn no_whitespace_between(&self, token: TokenId, next: TokenId) -> Result<Option<Violation>> {
        self.spaces_between(token, next, &SpacingOptions::new(Count::exactly(0)))
    }

    pub fn same_line(&self, token: TokenId, next: TokenId) -> Result<Option<Violation>> {
        self.lines_between(token, next, &LineOptions::new(Count::exactly(0)))
    }

    pub fn different_line(&self, token: TokenId, next: TokenId) -> Result<Option<Violation>> {
        self.lines_between(token, next, &LineOptions::new(Count::at_least(1)))
    }

    /// The token right before `token`, comments included, must match
    pub fn token_before(
        &self,
        token: TokenId,
        expected: &TokenPattern,
        message: Option<&str>,
    ) -> Result<Option<Violation>> {
        self.check_attached(token)?;
        let previous = self.tree.previous_token(token, true);
        if previous.is_some_and(|p| expected.matches(self.tree, p)) {
            return Ok(None);
        }
        let found = match previous {
            Some(p) => format!("`{}`", self.value(p)),
            None => "document start".to_string(),
        };
        let message = message.map(str::to_string).unwrap_or_else(|| {
            format!(
                "`{expected}` was expected before `{}` but {found} found",
                self.value(token)
            )
        });
        Ok(Some(Violation::at(self.tree, token, message)))
    }

    /// The token right before `token`, comments included, must not match
    pub fn no_token_before(
        &self,
        token: TokenId,
        unexpected: &TokenPattern,
        message: Option<&str>,
    ) -> Result<Option<Violation>> {
        self.check_attached(token)?;
        let Some(previous) = self.tree.previous_token(token, true) else {
            return Ok(None);
        };
        if !unexpected.matches(self.tree, previous) {
            return Ok(None);
        }
        let message = message.map(str::to_string).unwrap_or_else(|| {
            format!(
                "Illegal `{}` was found before `{}`",
                self.value(previous),
                self.value(token)
            )
        });
        Ok(Some(Violation::at(self.tree, previous, message)))
    }
}
