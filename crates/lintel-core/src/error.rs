//! Error types for contract violations raised by the core
//!
//! Document content never produces a [`LintelError`]: malformed input degrades
//! to parse errors stored on the tree, and style problems are reported as
//! [`Violation`](crate::diagnostics::Violation)s. These errors signal a bug in
//! the calling code (a rule, a configuration, a fix).

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for lintel operations
#[derive(Debug, Error)]
pub enum LintelError {
    /// Assertion called with a nonsensical option combination
    #[error("Invalid assertion: {message}")]
    InvalidAssertion { message: String },

    /// Both ends of an adjacency assertion are the same token
    #[error("Assertion endpoints must be different tokens, got `{value}` twice")]
    SameToken { value: String },

    /// A token that was removed from the sequence was used as an anchor
    #[error("Token `{value}` is no longer part of the token sequence")]
    DetachedToken { value: String },

    /// Pragma marker or directive configuration is malformed
    #[error("Invalid pragma configuration: {message}")]
    InvalidPragmaConfig { message: String },

    /// Checker configuration loading or validation errors
    #[error("Configuration error: {message}")]
    InvalidConfig { message: String },

    /// Rule execution errors
    #[error("Rule error in '{rule}': {message}")]
    Rule { rule: String, message: String },

    /// File system I/O errors
    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Error kind enumeration for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Assertion,
    Pragma,
    Config,
    Rule,
    Io,
    Internal,
}

impl LintelError {
    /// Get the error kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            LintelError::InvalidAssertion { .. }
            | LintelError::SameToken { .. }
            | LintelError::DetachedToken { .. } => ErrorKind::Assertion,
            LintelError::InvalidPragmaConfig { .. } => ErrorKind::Pragma,
            LintelError::InvalidConfig { .. } => ErrorKind::Config,
            LintelError::Rule { .. } => ErrorKind::Rule,
            LintelError::Io { .. } => ErrorKind::Io,
            LintelError::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Check if this error only affects the current document, so a batch
    /// run can continue with the next one
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Assertion | ErrorKind::Rule | ErrorKind::Io
        )
    }

    /// Create an invalid assertion error
    pub fn invalid_assertion(message: impl Into<String>) -> Self {
        Self::InvalidAssertion {
            message: message.into(),
        }
    }

    /// Create a pragma configuration error
    pub fn invalid_pragma_config(message: impl Into<String>) -> Self {
        Self::InvalidPragmaConfig {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a rule error
    pub fn rule_error(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rule {
            rule: rule.into(),
            message: message.into(),
        }
    }

    /// Create an IO error with path context
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an internal error
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
