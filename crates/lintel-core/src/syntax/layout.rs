//! Byte ranges and line/column positions derived from the token sequence
//!
//! Ranges are never stored on tokens. They are recomputed from the current
//! whitespace and values whenever the tree version changes.

use super::tree::{TokenId, TokenTree};
use crate::source::{Cursor, Position};

/// Computed placement of one token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLayout {
    pub start: usize,
    pub end: usize,
    pub start_pos: Position,
    pub end_pos: Position,
    /// Index of the token in sequence order
    pub ordinal: usize,
}

#[derive(Debug, Clone)]
pub struct Layout {
    version: u64,
    entries: Vec<Option<TokenLayout>>,
    order: Vec<TokenId>,
    len: usize,
}

impl Layout {
    pub fn build(tree: &TokenTree) -> Self {
        let mut entries = vec![None; tree.arena_len()];
        let mut order = Vec::with_capacity(tree.arena_len());
        let mut cursor = Cursor::new();
        let mut offset = 0usize;

        for id in tree.tokens() {
            let token = tree.token(id);
            offset += token.whitespace_before.len();
            cursor.advance(&token.whitespace_before);
            let start = offset;
            let start_pos = cursor.position();
            offset += token.value.len();
            cursor.advance(&token.value);
            entries[id.index()] = Some(TokenLayout {
                start,
                end: offset,
                start_pos,
                end_pos: cursor.position(),
                ordinal: order.len(),
            });
            order.push(id);
        }

        tracing::trace!(tokens = order.len(), bytes = offset, "layout rebuilt");
        Self {
            version: tree.version(),
            entries,
            order,
            len: offset,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Layout of an attached token
    pub fn get(&self, token: TokenId) -> Option<&TokenLayout> {
        self.entries.get(token.index()).and_then(Option::as_ref)
    }

    /// Tokens in sequence order
    pub fn order(&self) -> &[TokenId] {
        &self.order
    }

    /// Length of the rendered text
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Token whose text covers `offset`
    pub fn token_at_offset(&self, offset: usize) -> Option<TokenId> {
        let idx = self.order.partition_point(|t| {
            self.get(*t).is_some_and(|layout| layout.start <= offset)
        });
        let candidate = *self.order.get(idx.checked_sub(1)?)?;
        let layout = self.get(candidate)?;
        (offset < layout.end).then_some(candidate)
    }
}
