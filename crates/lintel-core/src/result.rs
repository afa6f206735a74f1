//! Result type alias for lintel operations

use crate::error::LintelError;

/// Standard Result type for lintel operations
pub type Result<T> = std::result::Result<T, LintelError>;

/// Outcome of applying one rule's fix while a document is being repaired
pub trait FixOutcome {
    /// Whether the fix landed. A failed fix is logged against `rule` and the
    /// error stays unfixed, so the remaining fixes of the pass still run.
    fn fix_applied(self, rule: &str) -> bool;
}

impl<T> FixOutcome for Result<T> {
    fn fix_applied(self, rule: &str) -> bool {
        match self {
            Ok(_) => true,
            Err(err) if err.is_recoverable() => {
                tracing::warn!(rule, error = %err, "fix not applied");
                false
            }
            Err(err) => {
                tracing::error!(rule, error = %err, "fix failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParseOptions;
    use crate::mutation::{Fix, Mutation};
    use crate::syntax::TokenTree;

    #[test]
    fn test_fix_on_detached_token_is_not_applied() {
        let mut tree = TokenTree::parse("a; b;", &ParseOptions::default());
        let b = tree
            .tokens()
            .find(|t| tree.token(*t).value() == "b")
            .unwrap();
        let remove = Fix::single(Mutation::RemoveToken { token: b });
        assert!(tree.apply_fix(&remove).fix_applied("removeB"));
        assert!(!tree.apply_fix(&remove).fix_applied("removeB"));
        assert_eq!(tree.render(), "a;;");
    }

    #[test]
    fn test_fatal_errors_are_not_applied() {
        let failed: Result<()> = Err(LintelError::internal_error("broken tree"));
        assert!(!failed.fix_applied("rule"));
        assert!(Ok::<(), LintelError>(()).fix_applied("rule"));
    }
}
