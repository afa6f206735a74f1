//! Lintel Core
//!
//! Token and syntax tree model for a style checker: a lossless token sequence
//! with a node tree on top, range/line/type indexes, in-place token edits,
//! directive-comment (pragma) resolution, and a small assertion language for
//! spacing and line rules that produces auto-fixes.
//!
//! ```
//! use lintel_core::{AssertionEngine, Count, ParseOptions, SpacingOptions, TokenTree};
//!
//! let mut tree = TokenTree::parse("x=y;", &ParseOptions::default());
//! let x = tree.first_token();
//! let eq = tree.find_next_operator_token(x, "=").unwrap();
//! let options = SpacingOptions::new(Count::exactly(1));
//! let violation = AssertionEngine::new(&tree)
//!     .spaces_between(x, eq, &options)
//!     .unwrap()
//!     .unwrap();
//! tree.apply_fix(&violation.fix.unwrap()).unwrap();
//! assert_eq!(tree.render(), "x =y;");
//! ```

pub mod assertion;
pub mod checker;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod index;
pub mod mutation;
pub mod pragma;
pub mod result;
pub mod source;
pub mod syntax;

// Re-export commonly used types
pub use assertion::{AssertionEngine, Count, LineOptions, SpacingOptions, TokenPattern};
pub use checker::{Checker, FileReport, Rule, RuleContext};
pub use config::{CheckerConfig, ParseOptions};
pub use diagnostics::{Element, ErrorCollector, LintError, Violation};
pub use error::{ErrorKind, LintelError};
pub use index::RangeIndex;
pub use mutation::{Fix, LineEdit, Mutation, WhitespaceEdit};
pub use pragma::{Directive, DirectiveMatcher, PragmaIndex};
pub use result::{FixOutcome, Result};
pub use source::{Position, SourceBuffer};
pub use syntax::{Node, NodeId, NodeKind, ParseError, Token, TokenId, TokenKind, TokenTree};

/// Initialize the tracing subscriber for logging.
///
/// Does nothing when a global subscriber is already installed.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lintel=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init()
        .ok();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice() {
        init_tracing();
        init_tracing();
        assert_eq!(NAME, "lintel-core");
    }
}
