//! In-place token edits
//!
//! Whitespace is stored on the token that follows it, so every edit reduces to
//! rewriting a `whitespace_before` string or relinking the token sequence.
//! Each edit bumps the tree version, which drops the layout, range index,
//! pragma index and rendered text. Node ranges are derived from their boundary
//! tokens and follow automatically.
//!
//! Fixes are data: a [`Fix`] is a list of [`Mutation`] commands that can be
//! inspected before [`TokenTree::apply_fix`] runs them.

use serde::Serialize;

use crate::source::{split_lines, split_lines_inclusive};
use crate::syntax::{Token, TokenId, TokenKind, TokenTree};
use crate::{LintelError, Result};

/// A single edit of the token sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Mutation {
    /// Replace the text between `token` and its predecessor
    ReplaceWhitespace { token: TokenId, text: String },
    /// Unlink `token` from the sequence
    RemoveToken { token: TokenId },
    /// Insert a new token after `after`
    SpliceToken {
        after: TokenId,
        kind: TokenKind,
        value: String,
        whitespace: String,
    },
    /// Rewrite the whitespace before `token` line by line
    RewriteLines { token: TokenId, edit: LineEdit },
    /// Shift the interior lines of a block comment by `diff` indent characters
    ReindentComment {
        token: TokenId,
        diff: isize,
        indent_char: char,
    },
}

/// Line-level edit of the whitespace before a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LineEdit {
    /// Replace the indentation of the last line
    Indent { indent: String },
    /// Keep the trailing text of the first line and the indentation of the
    /// last, with `count` line breaks between them. Zero joins the lines with
    /// a single space.
    LineBreaks { count: usize },
}

impl LineEdit {
    /// Apply the edit to whitespace already split into line fragments
    pub fn rewrite(&self, mut lines: Vec<String>) -> Vec<String> {
        match self {
            LineEdit::Indent { indent } => {
                lines.pop();
                lines.push(indent.clone());
                lines
            }
            LineEdit::LineBreaks { count: 0 } => vec![" ".to_string()],
            LineEdit::LineBreaks { count } => {
                let (first, last) = if lines.len() < 2 {
                    (String::new(), String::new())
                } else {
                    let last = lines.pop().unwrap_or_default();
                    (lines.swap_remove(0), last)
                };
                let mut out = Vec::with_capacity(count + 1);
                out.push(first);
                out.extend(std::iter::repeat_n(String::new(), count - 1));
                out.push(last);
                out
            }
        }
    }
}

/// Deferred correction attached to a violation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Fix {
    pub mutations: Vec<Mutation>,
}

impl Fix {
    pub fn new(mutations: Vec<Mutation>) -> Self {
        Self { mutations }
    }

    pub fn single(mutation: Mutation) -> Self {
        Self {
            mutations: vec![mutation],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }
}

/// How [`TokenTree::set_whitespace_before`] changed the gap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhitespaceEdit {
    /// Existing whitespace replaced by other text
    Replaced,
    /// Whitespace introduced where there was none
    Inserted,
    /// Existing whitespace removed
    Removed,
    /// Text was already identical
    Unchanged,
}

impl TokenTree {
    /// Current source text: whitespace plus value of every token in order
    pub fn render(&self) -> String {
        let mut out = String::new();
        for id in self.tokens() {
            let token = self.token(id);
            out.push_str(&token.whitespace_before);
            out.push_str(&token.value);
        }
        out
    }

    fn ensure_attached(&self, id: TokenId) -> Result<&Token> {
        let token = self
            .tokens
            .get(id.index())
            .ok_or_else(|| LintelError::internal_error(format!("no token with id {}", id.index())))?;
        if !token.attached {
            return Err(LintelError::DetachedToken {
                value: token.value.clone(),
            });
        }
        Ok(token)
    }

    /// Rewrite the exact text preceding `token`
    pub fn set_whitespace_before(
        &mut self,
        token: TokenId,
        text: impl Into<String>,
    ) -> Result<WhitespaceEdit> {
        let text = text.into();
        let current = &self.ensure_attached(token)?.whitespace_before;
        let edit = match (current.is_empty(), text.is_empty()) {
            _ if *current == text => return Ok(WhitespaceEdit::Unchanged),
            (false, false) => WhitespaceEdit::Replaced,
            (true, _) => WhitespaceEdit::Inserted,
            (false, true) => WhitespaceEdit::Removed,
        };
        tracing::trace!(token = token.index(), ?edit, new = ?text, "set whitespace");
        self.tokens[token.index()].whitespace_before = text;
        self.invalidate();
        Ok(edit)
    }

    /// Unlink `token`. Node boundaries that point at it are left alone;
    /// keeping the tree grammatical is up to the caller.
    pub fn remove_token(&mut self, token: TokenId) -> Result<()> {
        let current = self.ensure_attached(token)?;
        if current.is_eof() {
            return Err(LintelError::internal_error("the Eof token cannot be removed"));
        }
        let (prev, next) = (current.prev, current.next);
        match prev {
            Some(p) => self.tokens[p.index()].next = next,
            None => {
                if let Some(n) = next {
                    self.head = n;
                }
            }
        }
        if let Some(n) = next {
            self.tokens[n.index()].prev = prev;
        }
        let removed = &mut self.tokens[token.index()];
        removed.prev = None;
        removed.next = None;
        removed.attached = false;
        tracing::trace!(token = token.index(), value = %removed.value, "removed token");
        self.invalidate();
        Ok(())
    }

    /// Insert a new token right after `anchor`
    pub fn insert_token_after(
        &mut self,
        anchor: TokenId,
        kind: TokenKind,
        value: impl Into<String>,
        whitespace_before: impl Into<String>,
    ) -> Result<TokenId> {
        let anchor_token = self.ensure_attached(anchor)?;
        if anchor_token.is_eof() {
            return Err(LintelError::internal_error(
                "cannot insert a token after Eof",
            ));
        }
        let next = anchor_token.next;
        let id = TokenId::new(self.tokens.len());
        let mut token = Token::new(kind, value.into(), whitespace_before.into());
        token.prev = Some(anchor);
        token.next = next;
        self.tokens.push(token);
        self.tokens[anchor.index()].next = Some(id);
        if let Some(n) = next {
            self.tokens[n.index()].prev = Some(id);
        }
        tracing::trace!(anchor = anchor.index(), token = id.index(), %kind, "inserted token");
        self.invalidate();
        Ok(id)
    }

    /// Insert a new token right before `anchor`
    pub fn insert_token_before(
        &mut self,
        anchor: TokenId,
        kind: TokenKind,
        value: impl Into<String>,
        whitespace_before: impl Into<String>,
    ) -> Result<TokenId> {
        let prev = self.ensure_attached(anchor)?.prev;
        if let Some(p) = prev {
            return self.insert_token_after(p, kind, value, whitespace_before);
        }
        let id = TokenId::new(self.tokens.len());
        let mut token = Token::new(kind, value.into(), whitespace_before.into());
        token.next = Some(anchor);
        self.tokens.push(token);
        self.tokens[anchor.index()].prev = Some(id);
        self.head = id;
        tracing::trace!(anchor = anchor.index(), token = id.index(), %kind, "inserted token at head");
        self.invalidate();
        Ok(id)
    }

    /// Split the whitespace before `token` into line fragments, let
    /// `transform` rewrite them, and join them back with the document's
    /// line break
    pub fn rewrite_whitespace_lines<F>(&mut self, token: TokenId, transform: F) -> Result<WhitespaceEdit>
    where
        F: FnOnce(Vec<String>) -> Vec<String>,
    {
        let current = &self.ensure_attached(token)?.whitespace_before;
        let lines: Vec<String> = split_lines(current).into_iter().map(str::to_string).collect();
        let text = transform(lines).join(self.line_break);
        self.set_whitespace_before(token, text)
    }

    /// Shift every line of a comment except the first by `diff` copies of
    /// `indent_char`. Negative shifts only strip leading indent characters.
    pub fn reindent_comment(&mut self, token: TokenId, diff: isize, indent_char: char) -> Result<()> {
        let comment = self.ensure_attached(token)?;
        if !comment.is_comment() {
            return Err(LintelError::internal_error(format!(
                "cannot reindent non-comment token `{}`",
                comment.value
            )));
        }
        if diff == 0 {
            return Ok(());
        }
        let lines = split_lines_inclusive(&comment.value);
        if lines.len() < 2 {
            return Ok(());
        }

        let width = diff.unsigned_abs();
        let pad: String = std::iter::repeat_n(indent_char, width).collect();
        let mut value = String::with_capacity(comment.value.len() + lines.len() * width);
        for (i, (line, line_break)) in lines.iter().enumerate() {
            if i == 0 {
                value.push_str(line);
            } else if diff > 0 {
                value.push_str(&pad);
                value.push_str(line);
            } else {
                let strip = line.chars().take(width).take_while(|c| *c == indent_char).count();
                value.push_str(&line[strip * indent_char.len_utf8()..]);
            }
            value.push_str(line_break);
        }

        if value != comment.value {
            tracing::trace!(token = token.index(), diff, "reindented comment");
            self.tokens[token.index()].value = value;
            self.invalidate();
        }
        Ok(())
    }

    /// Execute one mutation command
    pub fn apply(&mut self, mutation: &Mutation) -> Result<()> {
        match mutation {
            Mutation::ReplaceWhitespace { token, text } => {
                self.set_whitespace_before(*token, text.clone())?;
            }
            Mutation::RemoveToken { token } => self.remove_token(*token)?,
            Mutation::SpliceToken {
                after,
                kind,
                value,
                whitespace,
            } => {
                self.insert_token_after(*after, *kind, value.clone(), whitespace.clone())?;
            }
            Mutation::RewriteLines { token, edit } => {
                self.rewrite_whitespace_lines(*token, |lines| edit.rewrite(lines))?;
            }
            Mutation::ReindentComment {
                token,
                diff,
                indent_char,
            } => self.reindent_comment(*token, *diff, *indent_char)?,
        }
        Ok(())
    }

    /// Execute every mutation of a fix in order
    pub fn apply_fix(&mut self, fix: &Fix) -> Result<()> {
        let _span = tracing::debug_span!("apply_fix", mutations = fix.mutations.len()).entered();
        for mutation in &fix.mutations {
            self.apply(mutation)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParseOptions;

    fn parse(source: &str) -> TokenTree {
        TokenTree::parse(source, &ParseOptions::default())
    }

    fn find(tree: &TokenTree, value: &str) -> TokenId {
        tree.tokens()
            .find(|t| tree.token(*t).value() == value)
            .unwrap()
    }

    #[test]
    fn test_render_round_trips() {
        for source in ["", "a", "a;\n", "a;\r\nb;\rc;\n", "  /* x */\n\tfoo( 1 ,2 ) // y\n\n"] {
            assert_eq!(parse(source).render(), source);
        }
    }

    #[test]
    fn test_set_whitespace_cases() {
        let mut tree = parse("a =b;");
        let eq = find(&tree, "=");
        let b = find(&tree, "b");
        assert_eq!(tree.set_whitespace_before(b, " ").unwrap(), WhitespaceEdit::Inserted);
        assert_eq!(tree.set_whitespace_before(eq, "  ").unwrap(), WhitespaceEdit::Replaced);
        assert_eq!(tree.render(), "a  = b;");
        assert_eq!(tree.set_whitespace_before(eq, "").unwrap(), WhitespaceEdit::Removed);
        assert_eq!(tree.set_whitespace_before(eq, "").unwrap(), WhitespaceEdit::Unchanged);
        assert_eq!(tree.render(), "a= b;");
        assert_eq!(tree.range(b), Some(3..4));
    }

    #[test]
    fn test_node_ranges_follow_mutations() {
        let mut tree = parse("foo(a);");
        let a = find(&tree, "a");
        let statement = tree.node(tree.root()).children()[0];
        assert_eq!(tree.node_range(statement), Some(0..7));
        tree.set_whitespace_before(a, "   ").unwrap();
        assert_eq!(tree.node_range(statement), Some(0..10));
    }

    #[test]
    fn test_remove_token() {
        let mut tree = parse("a; b;");
        let first_semi = find(&tree, ";");
        tree.remove_token(first_semi).unwrap();
        assert_eq!(tree.render(), "a b;");
        assert!(!tree.token(first_semi).is_attached());
        assert!(matches!(
            tree.remove_token(first_semi),
            Err(LintelError::DetachedToken { .. })
        ));
        assert!(tree.remove_token(tree.last_token()).is_err());

        let a = tree.first_token();
        tree.remove_token(a).unwrap();
        assert_eq!(tree.render(), " b;");
        assert_eq!(tree.token(tree.first_token()).value(), "b");
    }

    #[test]
    fn test_insert_tokens() {
        let mut tree = parse("a b");
        let a = find(&tree, "a");
        tree.insert_token_after(a, TokenKind::Punctuator, ";", "").unwrap();
        tree.insert_token_before(a, TokenKind::CommentBlock, "/* x */", "").unwrap();
        assert_eq!(tree.render(), "/* x */a; b");
        assert_eq!(tree.token(tree.first_token()).value(), "/* x */");
        assert!(tree.insert_token_after(tree.last_token(), TokenKind::Punctuator, ";", "").is_err());
    }

    #[test]
    fn test_rewrite_whitespace_lines_uses_document_line_break() {
        let mut tree = parse("a;\r\n\r\n\r\n  b;");
        let b = find(&tree, "b");
        tree.rewrite_whitespace_lines(b, |lines| {
            assert_eq!(lines, vec!["", "", "", "  "]);
            vec![String::new(), "    ".to_string()]
        })
        .unwrap();
        assert_eq!(tree.render(), "a;\r\n    b;");
    }

    #[test]
    fn test_line_edits_keep_outer_fragments() {
        let mut tree = parse("a;  \n\n\n    b;");
        let b = find(&tree, "b");
        let rewrite = |tree: &mut TokenTree, edit: LineEdit| {
            tree.apply(&Mutation::RewriteLines { token: b, edit }).unwrap();
            tree.render()
        };
        assert_eq!(rewrite(&mut tree, LineEdit::LineBreaks { count: 2 }), "a;  \n\n    b;");
        assert_eq!(
            rewrite(&mut tree, LineEdit::Indent { indent: "\t".into() }),
            "a;  \n\n\tb;"
        );
        assert_eq!(rewrite(&mut tree, LineEdit::LineBreaks { count: 0 }), "a; b;");
        assert_eq!(rewrite(&mut tree, LineEdit::LineBreaks { count: 1 }), "a;\nb;");
    }

    #[test]
    fn test_reindent_comment_leaves_first_line() {
        let mut tree = parse("  /*\n   * a\n   */\nx;");
        let comment = tree.first_token();
        tree.reindent_comment(comment, 2, ' ').unwrap();
        assert_eq!(tree.token(comment).value(), "/*\n     * a\n     */");
        tree.reindent_comment(comment, -4, ' ').unwrap();
        assert_eq!(tree.token(comment).value(), "/*\n * a\n */");
        tree.reindent_comment(comment, -4, ' ').unwrap();
        assert_eq!(tree.token(comment).value(), "/*\n* a\n*/");
    }

    #[test]
    fn test_apply_fix_commands() {
        let mut tree = parse("a=b");
        let a = find(&tree, "a");
        let eq = find(&tree, "=");
        let fix = Fix::new(vec![
            Mutation::ReplaceWhitespace {
                token: eq,
                text: " ".into(),
            },
            Mutation::SpliceToken {
                after: find(&tree, "b"),
                kind: TokenKind::Punctuator,
                value: ";".into(),
                whitespace: String::new(),
            },
            Mutation::RemoveToken { token: a },
        ]);
        tree.apply_fix(&fix).unwrap();
        assert_eq!(tree.render(), " =b;");
    }
}
