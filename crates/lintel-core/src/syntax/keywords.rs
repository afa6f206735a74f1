//! Reserved words and keyword reclassification
//!
//! The lexer tags every reserved word as [`TokenKind::Keyword`]. Several
//! positions accept any word as a name (object keys, member properties, method
//! names). Once the tree exists those tokens are re-tagged as identifiers.

use super::kind::{NodeKind, TokenKind};
use super::tree::{NodeId, TokenTree};

pub const KEYWORDS: &[&str] = &[
    "break",
    "case",
    "catch",
    "class",
    "const",
    "continue",
    "debugger",
    "default",
    "delete",
    "do",
    "else",
    "enum",
    "export",
    "extends",
    "finally",
    "for",
    "function",
    "if",
    "import",
    "in",
    "instanceof",
    "new",
    "return",
    "super",
    "switch",
    "this",
    "throw",
    "try",
    "typeof",
    "var",
    "void",
    "while",
    "with",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

/// Word-to-kind mapping used by the lexer
pub fn word_kind(word: &str) -> TokenKind {
    match word {
        "true" | "false" => TokenKind::Boolean,
        "null" => TokenKind::Null,
        w if is_keyword(w) => TokenKind::Keyword,
        _ => TokenKind::Identifier,
    }
}

/// Re-tag keyword tokens that are used as names. Returns the number of tokens
/// changed.
pub(crate) fn reclassify_keywords(tree: &mut TokenTree) -> usize {
    let owners = tree.token_owners();
    let mut changed = Vec::new();
    for token in tree.tokens() {
        if tree.token(token).kind() != TokenKind::Keyword {
            continue;
        }
        let Some(owner) = owners.get(token.index()).copied().flatten() else {
            continue;
        };
        if is_name_position(tree, owner) {
            changed.push(token);
        }
    }
    for token in &changed {
        tree.retag(*token, TokenKind::Identifier);
    }
    changed.len()
}

/// An `Identifier` node whose parent treats it as a plain name
fn is_name_position(tree: &TokenTree, node: NodeId) -> bool {
    if tree.node(node).kind() != NodeKind::Identifier {
        return false;
    }
    let Some(parent) = tree.parent(node) else {
        return false;
    };
    let parent_node = tree.node(parent);
    match parent_node.kind() {
        NodeKind::Property | NodeKind::MethodDefinition => {
            parent_node.children().first() == Some(&node)
        }
        NodeKind::MemberExpression => parent_node.children().get(1) == Some(&node),
        _ => false,
    }
}
