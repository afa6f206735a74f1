//! Configuration types for the checker
//!
//! Only the in-memory shape and validation live here; locating config files on
//! disk is left to the embedding tool.
//!
//! ```jsonc
//! {
//!   "parse": { "tolerant": true, "pragmaMarker": "pragma" },
//!   "fix": true,
//!   "maxFixPasses": 5,
//!   "maxErrors": 50,
//!   "disabledRules": ["requireSpaceAfterKeywords"]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::{LintelError, Result};

/// Default comment marker recognised by the pragma index
pub const DEFAULT_PRAGMA_MARKER: &str = "pragma";

/// Default number of check/fix passes run by [`Checker::fix_string`](crate::Checker::fix_string)
pub const DEFAULT_MAX_FIX_PASSES: usize = 5;

/// Options handed to the parser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParseOptions {
    /// Recover from syntax errors instead of stopping at the first one
    pub tolerant: bool,

    /// Word that introduces a directive comment (`// pragma: disable`)
    pub pragma_marker: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            tolerant: true,
            pragma_marker: DEFAULT_PRAGMA_MARKER.to_string(),
        }
    }
}

impl ParseOptions {
    /// Options that stop at the first syntax error
    pub fn strict() -> Self {
        Self {
            tolerant: false,
            ..Default::default()
        }
    }

    /// Use a different directive marker
    pub fn with_pragma_marker(mut self, marker: impl Into<String>) -> Self {
        self.pragma_marker = marker.into();
        self
    }

    /// Reject markers the directive grammar cannot express
    pub fn validate(&self) -> Result<()> {
        let marker = &self.pragma_marker;
        if marker.is_empty() {
            return Err(LintelError::invalid_pragma_config(
                "pragma marker must not be empty",
            ));
        }
        if marker.chars().any(|c| c.is_whitespace() || c == ':') {
            return Err(LintelError::invalid_pragma_config(format!(
                "pragma marker `{marker}` must not contain whitespace or ':'"
            )));
        }
        Ok(())
    }
}

/// Checker configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckerConfig {
    /// Parser options
    pub parse: ParseOptions,

    /// Apply fixes attached to violations
    pub fix: bool,

    /// Upper bound of check/fix passes per document
    pub max_fix_passes: usize,

    /// Stop recording errors for a document after this many
    pub max_errors: Option<usize>,

    /// Rules that are never run
    pub disabled_rules: Vec<String>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            parse: ParseOptions::default(),
            fix: false,
            max_fix_passes: DEFAULT_MAX_FIX_PASSES,
            max_errors: None,
            disabled_rules: Vec::new(),
        }
    }
}

impl CheckerConfig {
    /// Parse and validate a JSON configuration document
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: CheckerConfig = serde_json::from_str(content)
            .map_err(|e| LintelError::config_error(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate option combinations
    pub fn validate(&self) -> Result<()> {
        self.parse.validate()?;
        if self.max_fix_passes == 0 {
            return Err(LintelError::config_error(
                "maxFixPasses must be at least 1",
            ));
        }
        if self.max_errors == Some(0) {
            return Err(LintelError::config_error(
                "maxErrors must be at least 1 when set",
            ));
        }
        Ok(())
    }

    /// Check whether a rule was switched off in configuration
    pub fn is_rule_disabled(&self, rule: &str) -> bool {
        self.disabled_rules.iter().any(|r| r == rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CheckerConfig::default();
        assert!(config.parse.tolerant);
        assert_eq!(config.parse.pragma_marker, "pragma");
        assert_eq!(config.max_fix_passes, DEFAULT_MAX_FIX_PASSES);
        assert!(!config.fix);
    }

    #[test]
    fn test_from_json_with_partial_fields() {
        let config = CheckerConfig::from_json_str(
            r#"{ "fix": true, "parse": { "pragmaMarker": "lint" }, "disabledRules": ["a"] }"#,
        )
        .unwrap();
        assert!(config.fix);
        assert!(config.parse.tolerant);
        assert_eq!(config.parse.pragma_marker, "lint");
        assert!(config.is_rule_disabled("a"));
        assert!(!config.is_rule_disabled("b"));
    }

    #[test]
    fn test_rejects_bad_marker() {
        let err = CheckerConfig::from_json_str(r#"{ "parse": { "pragmaMarker": "a b" } }"#)
            .unwrap_err();
        assert!(matches!(err, LintelError::InvalidPragmaConfig { .. }));

        let err = ParseOptions::default().with_pragma_marker("").validate();
        assert!(err.is_err());
    }

    #[test]
    fn test_rejects_zero_passes() {
        let err = CheckerConfig::from_json_str(r#"{ "maxFixPasses": 0 }"#).unwrap_err();
        assert!(matches!(err, LintelError::InvalidConfig { .. }));
    }

    #[test]
    fn test_malformed_json() {
        assert!(CheckerConfig::from_json_str("{ fix: ").is_err());
    }
}
