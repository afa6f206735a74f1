//! Directive comment scoping

use lintel_core::{ParseOptions, TokenTree};

fn parse(source: &str) -> TokenTree {
    TokenTree::parse(source, &ParseOptions::default())
}

fn enabled(tree: &TokenTree, rule: &str, line: usize) -> bool {
    let node = tree
        .index()
        .node_on_line(tree, line)
        .unwrap_or_else(|| panic!("no node on line {line}"));
    tree.pragmas().is_rule_enabled(tree, rule, node)
}

#[test]
fn test_block_disable_and_enable() {
    let tree = parse("// pragma: disable\nvar x=1;\n// pragma: enable\nx++;");
    assert!(!enabled(&tree, "R", 2));
    assert!(enabled(&tree, "R", 4));
}

#[test]
fn test_line_ignore_only_affects_its_line() {
    let tree = parse("var a=1;\nvar b=1; // pragma: ignore R\nvar c=1;");
    assert!(enabled(&tree, "R", 1));
    assert!(!enabled(&tree, "R", 2));
    assert!(enabled(&tree, "R", 3));
}

#[test]
fn test_ignore_of_other_rule_does_not_reenable() {
    let tree = parse("// pragma: disable R\nvar a=1;\nvar b=1; // pragma: ignore S\nvar c=1;");
    for line in 2..=4 {
        assert!(!enabled(&tree, "R", line), "R enabled on line {line}");
    }
    assert!(!enabled(&tree, "S", 3));
    assert!(enabled(&tree, "S", 4));
}

#[test]
fn test_rule_lists_are_trimmed() {
    let tree = parse("/* pragma: disable , ruleA, */\na;\n/* pragma:enable ruleA */\nb;");
    assert!(!enabled(&tree, "ruleA", 2));
    assert!(enabled(&tree, "ruleB", 2));
    assert!(enabled(&tree, "ruleA", 4));
}

#[test]
fn test_ignore_as_last_token_of_file() {
    let tree = parse("a;\nb; // pragma: ignore");
    assert!(enabled(&tree, "R", 1));
    assert!(!enabled(&tree, "R", 2));
}

#[test]
fn test_inert_marker_comments() {
    let tree = parse("// pragma: maybe later\na;\n// pragma disable\nb;");
    assert!(!tree.pragmas().has_pragmas());
    assert!(enabled(&tree, "R", 2));
    assert!(enabled(&tree, "R", 4));
}

#[test]
fn test_index_rebuilt_after_mutation() {
    let mut tree = parse("a;\n// pragma: disable\nb;");
    assert!(!enabled(&tree, "R", 3));
    let comment = tree.index().first_token_on_line(&tree, 2, true).unwrap();
    tree.remove_token(comment).unwrap();
    assert_eq!(tree.render(), "a;\nb;");
    assert!(!tree.pragmas().has_pragmas());
    assert!(enabled(&tree, "R", 2));
}
