//! Assertion fixes applied through the mutation engine

use lintel_core::{
    AssertionEngine, Count, LineEdit, LintelError, Mutation, ParseOptions, SpacingOptions,
    TokenId, TokenTree, WhitespaceEdit,
};

fn parse(source: &str) -> TokenTree {
    TokenTree::parse(source, &ParseOptions::default())
}

fn find(tree: &TokenTree, value: &str) -> TokenId {
    tree.tokens()
        .find(|t| tree.token(*t).value() == value)
        .unwrap_or_else(|| panic!("no token {value}"))
}

#[test]
fn test_spacing_fix_then_recheck() {
    let mut tree = parse("x=y;");
    let (x, eq) = (find(&tree, "x"), find(&tree, "="));
    let options = SpacingOptions::new(Count::exactly(1));

    let violation = AssertionEngine::new(&tree)
        .spaces_between(x, eq, &options)
        .unwrap()
        .expect("missing space is reported");
    let fix = violation.fix.expect("fix attached");
    assert_eq!(
        fix.mutations,
        vec![Mutation::ReplaceWhitespace {
            token: eq,
            text: " ".into()
        }]
    );
    tree.apply_fix(&fix).unwrap();
    assert_eq!(tree.render(), "x =y;");
    assert!(
        AssertionEngine::new(&tree)
            .spaces_between(x, eq, &options)
            .unwrap()
            .is_none()
    );
    assert_eq!(tree.index().by_range_start(2), Some(eq));
}

#[test]
fn test_line_break_in_spaced_pair_joins_with_one_space() {
    let mut tree = parse("a\n    = b;");
    let (a, eq) = (find(&tree, "a"), find(&tree, "="));
    let options = SpacingOptions::new(Count::at_least(1)).disallow_new_line();

    let violation = AssertionEngine::new(&tree)
        .spaces_between(a, eq, &options)
        .unwrap()
        .expect("line break is reported");
    assert_eq!(violation.message, "Illegal line break between `a` and `=`");
    tree.apply_fix(&violation.fix.expect("fix attached")).unwrap();
    assert_eq!(tree.render(), "a = b;");
    assert!(
        AssertionEngine::new(&tree)
            .spaces_between(a, eq, &options)
            .unwrap()
            .is_none()
    );
}

#[test]
fn test_line_break_in_bounded_pair_uses_lower_bound() {
    let mut tree = parse("a\n\t\t= b;");
    let (a, eq) = (find(&tree, "a"), find(&tree, "="));
    let options = SpacingOptions::new(Count::between(2, 3)).disallow_new_line();

    let violation = AssertionEngine::new(&tree)
        .spaces_between(a, eq, &options)
        .unwrap()
        .expect("line break is reported");
    tree.apply_fix(&violation.fix.expect("fix attached")).unwrap();
    assert_eq!(tree.render(), "a  = b;");
}

#[test]
fn test_indentation_fix_is_idempotent() {
    let source = "  a;\nb;";
    let mut tree = parse(source);
    let a = find(&tree, "a");
    assert!(
        AssertionEngine::new(&tree)
            .indentation(a, 1, 2, 2, ' ')
            .unwrap()
            .is_none()
    );

    // a rule that measured the wrong width still gets a fix aimed at `expected`
    let violation = AssertionEngine::new(&tree)
        .indentation(a, 1, 3, 2, ' ')
        .unwrap()
        .expect("width mismatch is reported");
    let fix = violation.fix.expect("fix attached");
    assert_eq!(
        fix.mutations,
        vec![Mutation::RewriteLines {
            token: a,
            edit: LineEdit::Indent {
                indent: "  ".into()
            },
        }]
    );
    tree.apply_fix(&fix).unwrap();
    assert_eq!(tree.render(), source);
    tree.apply_fix(&fix).unwrap();
    assert_eq!(tree.render(), source);
    assert_eq!(
        tree.set_whitespace_before(a, "  ").unwrap(),
        WhitespaceEdit::Unchanged
    );
}

#[test]
fn test_indentation_fix_keeps_blank_lines() {
    let source = "{\n\n    a;\n}";
    let mut tree = parse(source);
    let a = find(&tree, "a");
    let fix = AssertionEngine::new(&tree)
        .indentation(a, 3, 2, 4, ' ')
        .unwrap()
        .and_then(|v| v.fix)
        .expect("fix attached");
    tree.apply_fix(&fix).unwrap();
    tree.apply_fix(&fix).unwrap();
    assert_eq!(tree.render(), source);
}

#[test]
fn test_indentation_fix_on_first_line() {
    let mut tree = parse("    a;");
    let a = find(&tree, "a");
    let violation = AssertionEngine::new(&tree)
        .indentation(a, 1, 4, 2, ' ')
        .unwrap()
        .unwrap();
    tree.apply_fix(&violation.fix.unwrap()).unwrap();
    assert_eq!(tree.render(), "  a;");
}

#[test]
fn test_tab_indentation_with_crlf() {
    let mut tree = parse("{\r\n\r\n  a;\r\n}");
    let a = find(&tree, "a");
    let violation = AssertionEngine::new(&tree)
        .indentation(a, 3, 2, 1, '\t')
        .unwrap()
        .unwrap();
    assert_eq!(violation.message, "Expected indentation of 1 tab but found 2");
    tree.apply_fix(&violation.fix.unwrap()).unwrap();
    assert_eq!(tree.render(), "{\r\n\r\n\ta;\r\n}");
}

#[test]
fn test_fixes_on_detached_tokens_fail() {
    let mut tree = parse("a = b;");
    let (a, eq) = (find(&tree, "a"), find(&tree, "="));
    tree.remove_token(a).unwrap();
    assert!(matches!(
        AssertionEngine::new(&tree).whitespace_between(a, eq),
        Err(LintelError::DetachedToken { .. })
    ));
    assert!(tree.set_whitespace_before(a, " ").is_err());
}
