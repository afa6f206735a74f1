//! Lexing, parsing and the token tree
//!
//! ```text
//! source text -> lexer -> linked token arena -> parser -> node arena
//!                                                  \-> keyword reclassification
//! ```

pub mod keywords;
pub mod kind;
pub mod layout;
pub mod lexer;
mod parser;
pub mod tree;

pub use kind::{NodeKind, TokenKind};
pub use lexer::{LexError, RawToken, lex};
pub use tree::{Node, NodeId, ParseError, Token, TokenId, TokenIter, TokenTree};
