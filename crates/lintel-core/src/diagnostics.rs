//! Violation records and their collection
//!
//! Assertions return a [`Violation`]; rules hand it to an [`ErrorCollector`],
//! which stamps it with the rule name, drops it when a directive switched the
//! rule off at that position, and enforces the per-document error limit.

use std::fmt;

use serde::Serialize;

use crate::mutation::Fix;
use crate::syntax::{NodeId, TokenId, TokenTree};

/// What a violation points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum Element {
    Token(TokenId),
    Node(NodeId),
}

impl Element {
    /// Token whose pragma state and position decide for the element
    pub fn first_token(self, tree: &TokenTree) -> TokenId {
        match self {
            Element::Token(token) => token,
            Element::Node(node) => tree.node(node).first_token(),
        }
    }
}

impl From<TokenId> for Element {
    fn from(token: TokenId) -> Self {
        Element::Token(token)
    }
}

impl From<NodeId> for Element {
    fn from(node: NodeId) -> Self {
        Element::Node(node)
    }
}

/// A failed assertion, positioned in the text it was checked against
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub message: String,
    pub element: Element,
    pub offset: usize,
    /// 1-based
    pub line: usize,
    /// 0-based, in characters
    pub column: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<Fix>,
}

impl Violation {
    /// Violation located at the start of `element`
    pub fn at(tree: &TokenTree, element: impl Into<Element>, message: impl Into<String>) -> Self {
        let element = element.into();
        let token = element.first_token(tree);
        let offset = tree.range(token).map(|r| r.start).unwrap_or(0);
        let position = tree.loc(token).unwrap_or_default();
        Self {
            message: message.into(),
            element,
            offset,
            line: position.line,
            column: position.column,
            fix: None,
        }
    }

    pub fn with_fix(mut self, fix: Option<Fix>) -> Self {
        self.fix = fix.filter(|f| !f.is_empty());
        self
    }
}

/// A violation attributed to a rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LintError {
    pub rule: String,
    pub message: String,
    pub element: Element,
    pub offset: usize,
    pub line: usize,
    pub column: usize,
    /// Set once the attached fix has been applied
    pub fixed: bool,
    #[serde(skip)]
    pub fix: Option<Fix>,
}

impl LintError {
    pub fn from_violation(rule: impl Into<String>, violation: Violation) -> Self {
        Self {
            rule: rule.into(),
            message: violation.message,
            element: violation.element,
            offset: violation.offset,
            line: violation.line,
            column: violation.column,
            fixed: false,
            fix: violation.fix,
        }
    }

    pub fn is_fixable(&self) -> bool {
        self.fix.is_some()
    }
}

impl fmt::Display for LintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} {} ({})",
            self.line,
            self.column + 1,
            self.message,
            self.rule
        )?;
        if self.fixed {
            write!(f, " [fixed]")?;
        }
        Ok(())
    }
}

/// Accumulates errors for one document
#[derive(Debug, Default)]
pub struct ErrorCollector {
    errors: Vec<LintError>,
    rule: String,
    max_errors: Option<usize>,
    suppressed: usize,
}

impl ErrorCollector {
    pub fn new(max_errors: Option<usize>) -> Self {
        Self {
            max_errors,
            ..Default::default()
        }
    }

    /// Attribute subsequent errors to `rule`
    pub fn set_rule(&mut self, rule: impl Into<String>) {
        self.rule = rule.into();
    }

    pub fn rule(&self) -> &str {
        &self.rule
    }

    pub fn is_full(&self) -> bool {
        self.max_errors.is_some_and(|max| self.errors.len() >= max)
    }

    /// Record a violation unless the current rule is switched off at its
    /// element or the limit was reached. Returns whether it was recorded.
    pub fn add(&mut self, tree: &TokenTree, violation: Violation) -> bool {
        let token = violation.element.first_token(tree);
        if !tree.pragmas().is_rule_enabled_at(&self.rule, token) {
            tracing::trace!(rule = %self.rule, line = violation.line, "violation suppressed by pragma");
            self.suppressed += 1;
            return false;
        }
        if self.is_full() {
            return false;
        }
        self.errors
            .push(LintError::from_violation(self.rule.clone(), violation));
        true
    }

    /// Record an optional assertion outcome
    pub fn extend(&mut self, tree: &TokenTree, violation: Option<Violation>) -> bool {
        violation.is_some_and(|v| self.add(tree, v))
    }

    /// Record a plain message at an element
    pub fn report(&mut self, tree: &TokenTree, element: impl Into<Element>, message: impl Into<String>) -> bool {
        self.add(tree, Violation::at(tree, element, message))
    }

    /// Violations dropped because of directive comments
    pub fn suppressed(&self) -> usize {
        self.suppressed
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[LintError] {
        &self.errors
    }

    pub fn errors_mut(&mut self) -> &mut [LintError] {
        &mut self.errors
    }

    /// Errors ordered by position, then rule name
    pub fn into_sorted(mut self) -> Vec<LintError> {
        self.errors
            .sort_by(|a, b| a.offset.cmp(&b.offset).then_with(|| a.rule.cmp(&b.rule)));
        self.errors
    }
}
