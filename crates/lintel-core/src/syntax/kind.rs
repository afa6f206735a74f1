//! Token and node kinds

use std::fmt;

use serde::Serialize;

/// Lexical token kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TokenKind {
    Identifier,
    Keyword,
    Punctuator,
    Numeric,
    String,
    Template,
    RegularExpression,
    Boolean,
    Null,
    CommentLine,
    CommentBlock,
    /// Hashbang or preprocessor line (`#!/usr/bin/env node`, `#include`)
    CommentDirective,
    Eof,
    /// Input the lexer could not classify
    Unknown,
}

impl TokenKind {
    pub fn is_comment(self) -> bool {
        matches!(
            self,
            TokenKind::CommentLine | TokenKind::CommentBlock | TokenKind::CommentDirective
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Identifier => "Identifier",
            TokenKind::Keyword => "Keyword",
            TokenKind::Punctuator => "Punctuator",
            TokenKind::Numeric => "Numeric",
            TokenKind::String => "String",
            TokenKind::Template => "Template",
            TokenKind::RegularExpression => "RegularExpression",
            TokenKind::Boolean => "Boolean",
            TokenKind::Null => "Null",
            TokenKind::CommentLine => "Line",
            TokenKind::CommentBlock => "Block",
            TokenKind::CommentDirective => "Directive",
            TokenKind::Eof => "EOF",
            TokenKind::Unknown => "Unknown",
        }
    }

    /// Resolve a tag name; unrecognised names map to [`TokenKind::Unknown`]
    pub fn from_name(name: &str) -> Self {
        match name {
            "Identifier" => TokenKind::Identifier,
            "Keyword" => TokenKind::Keyword,
            "Punctuator" => TokenKind::Punctuator,
            "Numeric" => TokenKind::Numeric,
            "String" => TokenKind::String,
            "Template" => TokenKind::Template,
            "RegularExpression" => TokenKind::RegularExpression,
            "Boolean" => TokenKind::Boolean,
            "Null" => TokenKind::Null,
            "Line" | "CommentLine" => TokenKind::CommentLine,
            "Block" | "CommentBlock" => TokenKind::CommentBlock,
            "Directive" | "CommentDirective" => TokenKind::CommentDirective,
            "EOF" | "Eof" => TokenKind::Eof,
            _ => TokenKind::Unknown,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! node_kinds {
    ($($variant:ident),* $(,)?) => {
        /// Syntactic node kind
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        pub enum NodeKind {
            $($variant,)*
            /// Catch-all for productions this grammar does not name
            Unknown,
        }

        impl NodeKind {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(NodeKind::$variant => stringify!($variant),)*
                    NodeKind::Unknown => "Unknown",
                }
            }

            /// Resolve a production name; unrecognised names map to [`NodeKind::Unknown`]
            pub fn from_name(name: &str) -> Self {
                match name {
                    $(stringify!($variant) => NodeKind::$variant,)*
                    _ => NodeKind::Unknown,
                }
            }
        }
    };
}

node_kinds! {
    Program,
    EmptyStatement,
    BlockStatement,
    ExpressionStatement,
    IfStatement,
    LabeledStatement,
    BreakStatement,
    ContinueStatement,
    WithStatement,
    SwitchStatement,
    SwitchCase,
    ReturnStatement,
    ThrowStatement,
    TryStatement,
    CatchClause,
    WhileStatement,
    DoWhileStatement,
    ForStatement,
    ForInStatement,
    ForOfStatement,
    DebuggerStatement,
    FunctionDeclaration,
    VariableDeclaration,
    VariableDeclarator,
    ClassDeclaration,
    ClassExpression,
    ClassBody,
    MethodDefinition,
    ThisExpression,
    ArrayExpression,
    ObjectExpression,
    Property,
    FunctionExpression,
    ArrowFunctionExpression,
    SequenceExpression,
    UnaryExpression,
    BinaryExpression,
    AssignmentExpression,
    UpdateExpression,
    LogicalExpression,
    ConditionalExpression,
    CallExpression,
    NewExpression,
    MemberExpression,
    Identifier,
    Literal,
    TemplateLiteral,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
