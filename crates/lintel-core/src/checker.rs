//! Rule execution over documents
//!
//! A [`Checker`] owns a rule set and a [`CheckerConfig`]. Each document gets
//! its own [`TokenTree`]; nothing is shared between documents, so batches run
//! in parallel and a failure in one document never affects another.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;

use crate::assertion::AssertionEngine;
use crate::config::CheckerConfig;
use crate::diagnostics::{ErrorCollector, LintError, Violation};
use crate::syntax::{NodeId, NodeKind, ParseError, TokenId, TokenIter, TokenKind, TokenTree};
use crate::result::FixOutcome;
use crate::{LintelError, Result};

/// A style check run against every document
pub trait Rule: Send + Sync {
    /// Name used in reports, configuration and directive comments
    fn name(&self) -> &str;

    /// Inspect the tree and record violations. An `Err` means the rule itself
    /// is broken, not the document.
    fn check(&self, ctx: &RuleContext<'_>, errors: &mut ErrorCollector) -> Result<()>;
}

/// Read-only view of one document handed to rules
#[derive(Clone, Copy)]
pub struct RuleContext<'t> {
    tree: &'t TokenTree,
}

impl<'t> RuleContext<'t> {
    pub fn new(tree: &'t TokenTree) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &'t TokenTree {
        self.tree
    }

    /// Nodes with a production name, in pre-order; unknown names yield nothing
    pub fn nodes_by_type(&self, name: &str) -> &'t [NodeId] {
        self.tree.index().nodes_of_type_name(name)
    }

    pub fn nodes_of_kind(&self, kinds: &[NodeKind]) -> Vec<NodeId> {
        self.tree.index().nodes_of_types(kinds)
    }

    /// Tokens of any of `kinds` in sequence order
    pub fn iterate_tokens_by_type(&self, kinds: &[TokenKind]) -> std::vec::IntoIter<TokenId> {
        self.tree.index().tokens_of_types(kinds).into_iter()
    }

    pub fn find_next_token(&self, token: TokenId, kind: TokenKind, value: Option<&str>) -> Option<TokenId> {
        self.tree.find_next_token(token, kind, value)
    }

    pub fn find_prev_token(&self, token: TokenId, kind: TokenKind, value: Option<&str>) -> Option<TokenId> {
        self.tree.find_prev_token(token, kind, value)
    }

    pub fn tokens(&self) -> TokenIter<'t> {
        self.tree.tokens()
    }

    pub fn lines(&self) -> Vec<&'t str> {
        self.tree.lines()
    }

    pub fn lines_with_comments_removed(&self) -> Vec<String> {
        self.tree.lines_with_comments_removed()
    }

    pub fn assert(&self) -> AssertionEngine<'t> {
        AssertionEngine::new(self.tree)
    }

    pub fn is_rule_enabled(&self, rule: &str, node: NodeId) -> bool {
        self.tree.pragmas().is_rule_enabled(self.tree, rule, node)
    }

    /// Record the outcome of an assertion
    pub fn report(&self, errors: &mut ErrorCollector, outcome: Result<Option<Violation>>) -> Result<()> {
        errors.extend(self.tree, outcome?);
        Ok(())
    }
}

/// Outcome of checking one document
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub errors: Vec<LintError>,
    pub parse_errors: Vec<ParseError>,
    /// Document text after fixes (the input when nothing was fixed)
    #[serde(skip)]
    pub output: String,
    /// Fix passes that changed the document
    pub fix_passes: usize,
}

impl FileReport {
    pub fn is_clean(&self) -> bool {
        self.parse_errors.is_empty() && self.errors.iter().all(|e| e.fixed)
    }

    pub fn fixed_count(&self) -> usize {
        self.errors.iter().filter(|e| e.fixed).count()
    }
}

pub struct Checker {
    config: CheckerConfig,
    rules: Vec<Box<dyn Rule>>,
}

impl Checker {
    pub fn new(config: CheckerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            rules: Vec::new(),
        })
    }

    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.register(Box::new(rule));
        self
    }

    pub fn register(&mut self, rule: Box<dyn Rule>) {
        tracing::debug!(rule = rule.name(), "registered rule");
        self.rules.push(rule);
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    fn parse(&self, source: &str) -> TokenTree {
        TokenTree::parse(source, &self.config.parse)
    }

    /// Run every enabled rule against a tree
    pub fn check_tree(&self, tree: &TokenTree) -> Result<Vec<LintError>> {
        let ctx = RuleContext::new(tree);
        let mut errors = ErrorCollector::new(self.config.max_errors);
        for rule in &self.rules {
            if self.config.is_rule_disabled(rule.name()) {
                continue;
            }
            if errors.is_full() {
                tracing::debug!("error limit reached, skipping remaining rules");
                break;
            }
            errors.set_rule(rule.name());
            rule.check(&ctx, &mut errors).map_err(|err| match err {
                LintelError::Rule { .. } => err,
                other => LintelError::rule_error(rule.name(), other.to_string()),
            })?;
        }
        Ok(errors.into_sorted())
    }

    /// Check a document, applying fixes when the configuration asks for it
    pub fn check_string(&self, source: &str) -> Result<FileReport> {
        if self.config.fix {
            return self.fix_string(source);
        }
        let _span = tracing::debug_span!("check_string", bytes = source.len()).entered();
        let tree = self.parse(source);
        let errors = self.check_tree(&tree)?;
        Ok(FileReport {
            path: None,
            errors,
            parse_errors: tree.parse_errors().to_vec(),
            output: source.to_string(),
            fix_passes: 0,
        })
    }

    /// Check and fix a document. Fixes are applied in passes, re-parsing the
    /// rendered text between passes, until nothing fixable is left or the
    /// pass limit is reached.
    pub fn fix_string(&self, source: &str) -> Result<FileReport> {
        let _span = tracing::debug_span!("fix_string", bytes = source.len()).entered();
        let mut text = source.to_string();
        let mut fixed: Vec<LintError> = Vec::new();
        let mut passes = 0;

        loop {
            let mut tree = self.parse(&text);
            let errors = self.check_tree(&tree)?;
            let fixable = errors.iter().any(LintError::is_fixable);
            if !fixable || passes == self.config.max_fix_passes {
                let mut all = errors;
                all.extend(fixed);
                return Ok(FileReport {
                    path: None,
                    errors: all,
                    parse_errors: tree.parse_errors().to_vec(),
                    output: text,
                    fix_passes: passes,
                });
            }

            let mut applied = 0;
            for mut error in errors {
                let Some(fix) = error.fix.take() else {
                    continue;
                };
                if tree.apply_fix(&fix).fix_applied(&error.rule) {
                    error.fixed = true;
                    applied += 1;
                    fixed.push(error);
                }
            }

            let rendered = tree.render();
            tracing::debug!(pass = passes + 1, applied, "fix pass finished");
            if rendered == text {
                // fixes were no-ops; another pass would report the same errors
                let tree = self.parse(&text);
                let mut all = self.check_tree(&tree)?;
                all.retain(|e| !e.is_fixable());
                all.extend(fixed);
                return Ok(FileReport {
                    path: None,
                    errors: all,
                    parse_errors: tree.parse_errors().to_vec(),
                    output: text,
                    fix_passes: passes,
                });
            }
            text = rendered;
            passes += 1;
        }
    }

    pub fn check_file(&self, path: &Path) -> Result<FileReport> {
        let source =
            std::fs::read_to_string(path).map_err(|e| LintelError::io_error(path, e))?;
        let mut report = self.check_string(&source)?;
        report.path = Some(path.to_path_buf());
        Ok(report)
    }

    /// Check many documents in parallel. Results keep the input order and
    /// each one succeeds or fails on its own.
    pub fn check_batch<S>(&self, sources: &[S]) -> Vec<Result<FileReport>>
    where
        S: AsRef<str> + Sync,
    {
        let _span = tracing::info_span!("check_batch", documents = sources.len()).entered();
        sources
            .par_iter()
            .map(|source| self.check_string(source.as_ref()))
            .collect()
    }

    /// Check many files in parallel, isolating failures per file
    pub fn check_files(&self, paths: &[PathBuf]) -> Vec<Result<FileReport>> {
        let results: Vec<Result<FileReport>> = paths
            .par_iter()
            .map(|path| self.check_file(path))
            .collect();
        let failed = results.iter().filter(|r| r.is_err()).count();
        tracing::info!("Checked {} files ({} failed)", paths.len(), failed);
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertion::{Count, SpacingOptions};
    use crate::config::ParseOptions;

    /// One space around `=`
    struct SpaceAroundAssignment;

    impl Rule for SpaceAroundAssignment {
        fn name(&self) -> &str {
            "spaceAroundAssignment"
        }

        fn check(&self, ctx: &RuleContext<'_>, errors: &mut ErrorCollector) -> Result<()> {
            let exactly_one = SpacingOptions::new(Count::exactly(1));
            for token in ctx.iterate_tokens_by_type(&[TokenKind::Punctuator]) {
                if ctx.tree().token(token).value() != "=" {
                    continue;
                }
                let (Some(prev), Some(next)) = (
                    ctx.tree().previous_token(token, true),
                    ctx.tree().next_token(token, true),
                ) else {
                    continue;
                };
                ctx.report(errors, ctx.assert().spaces_between(prev, token, &exactly_one))?;
                ctx.report(errors, ctx.assert().spaces_between(token, next, &exactly_one))?;
            }
            Ok(())
        }
    }

    struct Broken;

    impl Rule for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn check(&self, ctx: &RuleContext<'_>, errors: &mut ErrorCollector) -> Result<()> {
            let first = ctx.tree().first_token();
            ctx.report(errors, ctx.assert().whitespace_between(first, first))
        }
    }

    fn checker(config: CheckerConfig) -> Checker {
        Checker::new(config).unwrap().with_rule(SpaceAroundAssignment)
    }

    #[test]
    fn test_check_string_reports_without_fixing() {
        let report = checker(CheckerConfig::default()).check_string("a=b;\nc = d;").unwrap();
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors.iter().all(|e| !e.fixed && e.line == 1));
        assert_eq!(report.output, "a=b;\nc = d;");
    }

    #[test]
    fn test_fix_string_applies_and_marks_fixed() {
        let report = checker(CheckerConfig::default()).fix_string("a=b;\nc  =  d;").unwrap();
        assert_eq!(report.output, "a = b;\nc = d;");
        assert_eq!(report.fixed_count(), 4);
        assert!(report.is_clean());
        assert_eq!(report.fix_passes, 1);
    }

    #[test]
    fn test_fix_respects_pragmas() {
        let source = "a=b; // pragma: ignore spaceAroundAssignment\nc=d;";
        let report = checker(CheckerConfig::default()).fix_string(source).unwrap();
        assert_eq!(
            report.output,
            "a=b; // pragma: ignore spaceAroundAssignment\nc = d;"
        );
    }

    #[test]
    fn test_disabled_rules_and_limits() {
        let config = CheckerConfig {
            disabled_rules: vec!["spaceAroundAssignment".into()],
            ..Default::default()
        };
        assert!(checker(config).check_string("a=b;").unwrap().errors.is_empty());

        let config = CheckerConfig {
            max_errors: Some(1),
            ..Default::default()
        };
        assert_eq!(checker(config).check_string("a=b;").unwrap().errors.len(), 1);
    }

    #[test]
    fn test_broken_rule_is_isolated_per_document() {
        let checker = Checker::new(CheckerConfig::default()).unwrap().with_rule(Broken);
        let results = checker.check_batch(&["a;", "b;"]);
        assert_eq!(results.len(), 2);
        for result in results {
            let err = result.unwrap_err();
            assert!(matches!(err, LintelError::Rule { ref rule, .. } if rule == "broken"));
            assert!(err.is_recoverable());
        }
    }

    #[test]
    fn test_batch_keeps_order_and_survives_bad_input() {
        let config = CheckerConfig {
            parse: ParseOptions::strict(),
            ..Default::default()
        };
        let results = checker(config).check_batch(&["a=b;", "this is not valid syntax )((", "c = d;"]);
        let reports: Vec<FileReport> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(reports[0].errors.len(), 2);
        assert_eq!(reports[1].parse_errors.len(), 1);
        assert!(reports[2].is_clean());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = CheckerConfig {
            max_fix_passes: 0,
            ..Default::default()
        };
        assert!(Checker::new(config).is_err());
    }
}
