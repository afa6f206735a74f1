//! Checker facade over files and batches

use std::fs;

use anyhow::Result;
use lintel_core::{
    Checker, CheckerConfig, Count, ErrorCollector, LineOptions, LintelError, NodeKind, Rule,
    RuleContext,
};
use tempfile::TempDir;

/// Every statement in a block starts on its own line
struct OneStatementPerLine;

impl Rule for OneStatementPerLine {
    fn name(&self) -> &str {
        "oneStatementPerLine"
    }

    fn check(&self, ctx: &RuleContext<'_>, errors: &mut ErrorCollector) -> lintel_core::Result<()> {
        let options = LineOptions::new(Count::at_least(1));
        for block in ctx.nodes_of_kind(&[NodeKind::Program, NodeKind::BlockStatement]) {
            let statements = ctx.tree().node(block).children();
            for pair in statements.windows(2) {
                let last = ctx.tree().node(pair[0]).last_token();
                let first = ctx.tree().node(pair[1]).first_token();
                ctx.report(errors, ctx.assert().lines_between(last, first, &options))?;
            }
        }
        Ok(())
    }
}

fn checker(fix: bool) -> Checker {
    let config = CheckerConfig {
        fix,
        ..Default::default()
    };
    Checker::new(config)
        .expect("valid config")
        .with_rule(OneStatementPerLine)
}

#[test]
fn test_check_file() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("input.js");
    fs::write(&path, "a(); b();\nc();\n")?;

    let report = checker(false).check_file(&path)?;
    assert_eq!(report.path.as_deref(), Some(path.as_path()));
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].rule, "oneStatementPerLine");
    assert_eq!((report.errors[0].line, report.errors[0].column), (1, 4));
    Ok(())
}

#[test]
fn test_fix_file_contents() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("input.js");
    fs::write(&path, "if (x) { a(); b(); }\n")?;

    let report = checker(true).check_file(&path)?;
    assert_eq!(report.output, "if (x) { a();\nb(); }\n");
    assert_eq!(report.fixed_count(), 1);
    assert_eq!(report.fix_passes, 1);
    Ok(())
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().expect("temp dir");
    let missing = dir.path().join("missing.js");
    let results = checker(false).check_files(&[missing.clone(), missing]);
    assert_eq!(results.len(), 2);
    for result in results {
        let err = result.unwrap_err();
        assert!(matches!(err, LintelError::Io { .. }));
        assert!(err.is_recoverable());
    }
}

#[test]
fn test_batch_is_per_document() {
    let sources = ["a(); b();", "this is not valid syntax )((", "a();\nb();"];
    let results = checker(false).check_batch(&sources);
    assert_eq!(results.len(), 3);
    let reports: Vec<_> = results.into_iter().map(|r| r.expect("report")).collect();
    assert_eq!(reports[0].errors.len(), 1);
    assert!(!reports[1].parse_errors.is_empty());
    assert!(reports[2].is_clean());
}

#[test]
fn test_batch_survives_deeply_nested_document() {
    let sources = ["(".repeat(50_000), "a();\nb();".to_string()];
    let results = checker(true).check_batch(&sources);
    assert_eq!(results.len(), 2);
    let reports: Vec<_> = results.into_iter().map(|r| r.expect("report")).collect();
    assert!(
        reports[0]
            .parse_errors
            .iter()
            .any(|e| e.description == "Nesting too deep")
    );
    assert_eq!(reports[0].output, sources[0]);
    assert!(reports[1].is_clean());
    assert_eq!(reports[1].output, "a();\nb();");
}

#[test]
fn test_config_from_json() -> Result<()> {
    let config = CheckerConfig::from_json_str(
        r#"{ "fix": true, "maxFixPasses": 2, "disabledRules": ["oneStatementPerLine"] }"#,
    )?;
    let checker = Checker::new(config)?.with_rule(OneStatementPerLine);
    let report = checker.check_string("a(); b();")?;
    assert!(report.errors.is_empty());
    assert_eq!(report.output, "a(); b();");
    Ok(())
}

#[test]
fn test_report_serializes_for_reporters() -> Result<()> {
    let report = checker(false).check_string("a(); b();")?;
    let json = serde_json::to_value(&report)?;
    assert_eq!(json["errors"][0]["rule"], "oneStatementPerLine");
    assert_eq!(json["errors"][0]["fixed"], false);
    assert_eq!(json["errors"][0]["element"]["kind"], "token");
    Ok(())
}
