//! Recursive-descent parser over the linked token sequence
//!
//! Only significant tokens (no comments, no `Eof`) are visible to the
//! grammar. Nodes record their boundary tokens; the tokens between child
//! nodes (keywords, punctuators, parentheses) belong to the parent.
//!
//! In tolerant mode a statement that fails to parse is dropped, an error is
//! recorded, and parsing resumes at the next recovery point: after a `;`,
//! before a `}`, or at a token that starts a new line.

use super::kind::{NodeKind, TokenKind};
use super::tree::{Node, NodeId, ParseError, TokenId, TokenTree};
use crate::source::contains_line_break;

/// Nodes, root and errors produced for a token sequence
pub(crate) struct ParseOutcome {
    pub nodes: Vec<Node>,
    pub root: NodeId,
    pub errors: Vec<ParseError>,
}

type PResult<T> = Result<T, ParseError>;

const ASSIGNMENT_OPERATORS: &[&str] = &[
    "=", "+=", "-=", "*=", "/=", "%=", "**=", "<<=", ">>=", ">>>=", "&=", "|=", "^=", "&&=",
    "||=", "??=",
];

/// Deepest statement or expression nesting accepted before parsing gives up
pub(crate) const MAX_NESTING_DEPTH: usize = 200;

pub(crate) fn parse_tokens(tree: &TokenTree, tolerant: bool) -> ParseOutcome {
    let toks: Vec<TokenId> = tree
        .tokens()
        .filter(|t| {
            let token = tree.token(*t);
            !token.is_comment() && !token.is_eof()
        })
        .collect();
    let mut parser = Parser {
        tree,
        toks,
        pos: 0,
        nodes: Vec::new(),
        errors: Vec::new(),
        tolerant,
        no_in: false,
        depth: 0,
    };

    match parser.parse_statement_list(None) {
        Ok(body) => {
            let root = parser.push_node(NodeKind::Program, tree.first_token(), tree.last_token(), body);
            ParseOutcome {
                nodes: parser.nodes,
                root,
                errors: parser.errors,
            }
        }
        Err(error) => {
            tracing::debug!(description = %error.description, "strict parse failed, keeping root only");
            let root = Node {
                kind: NodeKind::Program,
                first: tree.first_token(),
                last: tree.last_token(),
                parent: None,
                children: Vec::new(),
            };
            ParseOutcome {
                nodes: vec![root],
                root: NodeId::new(0),
                errors: vec![error],
            }
        }
    }
}

struct Parser<'t> {
    tree: &'t TokenTree,
    toks: Vec<TokenId>,
    pos: usize,
    nodes: Vec<Node>,
    errors: Vec<ParseError>,
    tolerant: bool,
    /// Inside a `for (...)` head, where `in` is not a binary operator
    no_in: bool,
    /// Nesting level of guarded statement and expression productions
    depth: usize,
}

impl<'t> Parser<'t> {
    /// Run a nested production, failing once nesting passes [`MAX_NESTING_DEPTH`]
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.tree.parse_error_at("Nesting too deep", self.offset_of(self.pos)));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    // ----- token helpers -----

    fn at_end(&self) -> bool {
        self.pos >= self.toks.len()
    }

    fn peek_at(&self, pos: usize) -> Option<(TokenKind, &'t str)> {
        let id = *self.toks.get(pos)?;
        let token = self.tree.token(id);
        Some((token.kind(), token.value()))
    }

    fn peek(&self) -> Option<(TokenKind, &'t str)> {
        self.peek_at(self.pos)
    }

    fn is_punct(&self, value: &str) -> bool {
        self.peek() == Some((TokenKind::Punctuator, value))
    }

    fn is_punct_at(&self, pos: usize, value: &str) -> bool {
        self.peek_at(pos) == Some((TokenKind::Punctuator, value))
    }

    fn is_keyword(&self, value: &str) -> bool {
        self.peek() == Some((TokenKind::Keyword, value))
    }

    fn is_word_at(&self, pos: usize) -> bool {
        matches!(
            self.peek_at(pos),
            Some((
                TokenKind::Identifier | TokenKind::Keyword | TokenKind::Boolean | TokenKind::Null,
                _
            ))
        )
    }

    fn eat_punct(&mut self, value: &str) -> bool {
        if self.is_punct(value) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, value: &str) -> PResult<()> {
        if self.eat_punct(value) {
            Ok(())
        } else {
            Err(self.unexpected_expecting(value))
        }
    }

    fn expect_keyword(&mut self, value: &str) -> PResult<()> {
        if self.is_keyword(value) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected_expecting(value))
        }
    }

    /// A line break (in whitespace or a multi-line comment) separates the
    /// token at `pos` from the previous significant token
    fn newline_before(&self, pos: usize) -> bool {
        let (Some(&current), Some(prev_pos)) = (self.toks.get(pos), pos.checked_sub(1)) else {
            return false;
        };
        let previous = self.toks[prev_pos];
        let mut t = current;
        loop {
            let token = self.tree.token(t);
            if contains_line_break(token.whitespace_before()) {
                return true;
            }
            match token.prev {
                Some(p) if p != previous => {
                    if contains_line_break(self.tree.token(p).value()) {
                        return true;
                    }
                    t = p;
                }
                _ => return false,
            }
        }
    }

    fn offset_of(&self, pos: usize) -> usize {
        let token = self.toks.get(pos).copied().unwrap_or(self.tree.last_token());
        self.tree.range(token).map(|r| r.start).unwrap_or(0)
    }

    fn unexpected(&self) -> ParseError {
        let description = match self.peek() {
            Some((_, value)) => format!("Unexpected token {value}"),
            None => "Unexpected end of input".to_string(),
        };
        self.tree.parse_error_at(description, self.offset_of(self.pos))
    }

    fn unexpected_expecting(&self, expected: &str) -> ParseError {
        let description = match self.peek() {
            Some((_, value)) => format!("Unexpected token {value}, expected {expected}"),
            None => format!("Unexpected end of input, expected {expected}"),
        };
        self.tree.parse_error_at(description, self.offset_of(self.pos))
    }

    // ----- node helpers -----

    fn push_node(
        &mut self,
        kind: NodeKind,
        first: TokenId,
        last: TokenId,
        children: Vec<NodeId>,
    ) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        for child in &children {
            self.nodes[child.index()].parent = Some(id);
        }
        self.nodes.push(Node {
            kind,
            first,
            last,
            parent: None,
            children,
        });
        id
    }

    /// Close a node that started at token position `start` and ends at the
    /// last consumed token
    fn finish(&mut self, kind: NodeKind, start: usize, children: Vec<NodeId>) -> NodeId {
        let first = self.toks[start];
        let last = self.toks[self.pos.saturating_sub(1).max(start)];
        self.push_node(kind, first, last, children)
    }

    /// Single-token node for the current token
    fn leaf(&mut self, kind: NodeKind) -> NodeId {
        let start = self.pos;
        self.pos += 1;
        self.finish(kind, start, Vec::new())
    }

    // ----- statements -----

    fn parse_statement_list(&mut self, terminator: Option<&str>) -> PResult<Vec<NodeId>> {
        let mut body = Vec::new();
        loop {
            if self.at_end() || terminator.is_some_and(|t| self.is_punct(t)) {
                break;
            }
            if terminator.is_none() && self.is_punct("}") && !self.tolerant {
                return Err(self.unexpected());
            }
            let (start, mark) = (self.pos, self.nodes.len());
            match self.parse_statement() {
                Ok(statement) => body.push(statement),
                Err(error) if self.tolerant => {
                    tracing::trace!(description = %error.description, line = error.line, "recovering from syntax error");
                    self.errors.push(error);
                    self.nodes.truncate(mark);
                    self.recover(start);
                }
                Err(error) => return Err(error),
            }
        }
        Ok(body)
    }

    fn recover(&mut self, start: usize) {
        if self.pos <= start {
            self.pos = start + 1;
        }
        while !self.at_end() {
            if self.is_punct_at(self.pos - 1, ";") || self.is_punct("}") || self.newline_before(self.pos) {
                break;
            }
            self.pos += 1;
        }
    }

    /// Statement lists inside `case` clauses stop at the next clause
    fn parse_case_body(&mut self) -> PResult<Vec<NodeId>> {
        let mut body = Vec::new();
        while !self.at_end()
            && !self.is_punct("}")
            && !self.is_keyword("case")
            && !self.is_keyword("default")
        {
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    fn consume_semicolon(&mut self) -> PResult<()> {
        if self.eat_punct(";") || self.at_end() || self.is_punct("}") || self.newline_before(self.pos) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn parse_statement(&mut self) -> PResult<NodeId> {
        self.nested(Self::statement)
    }

    fn statement(&mut self) -> PResult<NodeId> {
        let start = self.pos;
        let Some((kind, value)) = self.peek() else {
            return Err(self.unexpected());
        };
        match (kind, value) {
            (TokenKind::Punctuator, "{") => self.parse_block(),
            (TokenKind::Punctuator, ";") => Ok(self.leaf(NodeKind::EmptyStatement)),
            (TokenKind::Keyword, "var" | "const") => {
                let decl = self.parse_variable_declaration()?;
                self.consume_semicolon()?;
                Ok(self.extend_to_current(decl))
            }
            (TokenKind::Identifier, "let") if self.starts_let_declaration() => {
                let decl = self.parse_variable_declaration()?;
                self.consume_semicolon()?;
                Ok(self.extend_to_current(decl))
            }
            (TokenKind::Keyword, "function") => self.parse_function(NodeKind::FunctionDeclaration),
            (TokenKind::Keyword, "class") => self.parse_class(NodeKind::ClassDeclaration),
            (TokenKind::Keyword, "if") => self.parse_if(),
            (TokenKind::Keyword, "for") => self.parse_for(),
            (TokenKind::Keyword, "while") => {
                self.pos += 1;
                let test = self.parse_paren_expression()?;
                let body = self.parse_statement()?;
                Ok(self.finish(NodeKind::WhileStatement, start, vec![test, body]))
            }
            (TokenKind::Keyword, "do") => {
                self.pos += 1;
                let body = self.parse_statement()?;
                self.expect_keyword("while")?;
                let test = self.parse_paren_expression()?;
                self.eat_punct(";");
                Ok(self.finish(NodeKind::DoWhileStatement, start, vec![body, test]))
            }
            (TokenKind::Keyword, "with") => {
                self.pos += 1;
                let object = self.parse_paren_expression()?;
                let body = self.parse_statement()?;
                Ok(self.finish(NodeKind::WithStatement, start, vec![object, body]))
            }
            (TokenKind::Keyword, "return") => {
                self.pos += 1;
                let mut children = Vec::new();
                if !self.at_statement_end() {
                    children.push(self.parse_expression()?);
                }
                self.consume_semicolon()?;
                Ok(self.finish(NodeKind::ReturnStatement, start, children))
            }
            (TokenKind::Keyword, "throw") => {
                self.pos += 1;
                if self.newline_before(self.pos) {
                    return Err(self.tree.parse_error_at(
                        "Illegal newline after throw",
                        self.offset_of(self.pos),
                    ));
                }
                let argument = self.parse_expression()?;
                self.consume_semicolon()?;
                Ok(self.finish(NodeKind::ThrowStatement, start, vec![argument]))
            }
            (TokenKind::Keyword, "break" | "continue") => {
                let kind = if value == "break" {
                    NodeKind::BreakStatement
                } else {
                    NodeKind::ContinueStatement
                };
                self.pos += 1;
                let mut children = Vec::new();
                if matches!(self.peek(), Some((TokenKind::Identifier, _)))
                    && !self.newline_before(self.pos)
                {
                    children.push(self.leaf(NodeKind::Identifier));
                }
                self.consume_semicolon()?;
                Ok(self.finish(kind, start, children))
            }
            (TokenKind::Keyword, "debugger") => {
                self.pos += 1;
                self.consume_semicolon()?;
                Ok(self.finish(NodeKind::DebuggerStatement, start, Vec::new()))
            }
            (TokenKind::Keyword, "try") => self.parse_try(),
            (TokenKind::Keyword, "switch") => self.parse_switch(),
            (TokenKind::Identifier, _) if self.is_punct_at(self.pos + 1, ":") => {
                let label = self.leaf(NodeKind::Identifier);
                self.pos += 1;
                let body = self.parse_statement()?;
                Ok(self.finish(NodeKind::LabeledStatement, start, vec![label, body]))
            }
            _ => {
                let expression = self.parse_expression()?;
                self.consume_semicolon()?;
                Ok(self.finish(NodeKind::ExpressionStatement, start, vec![expression]))
            }
        }
    }

    fn at_statement_end(&self) -> bool {
        self.at_end() || self.is_punct(";") || self.is_punct("}") || self.newline_before(self.pos)
    }

    /// Widen a node to end at the last consumed token (the statement's `;`)
    fn extend_to_current(&mut self, node: NodeId) -> NodeId {
        if let Some(last) = self.pos.checked_sub(1).map(|p| self.toks[p]) {
            self.nodes[node.index()].last = last;
        }
        node
    }

    fn starts_let_declaration(&self) -> bool {
        matches!(self.peek_at(self.pos + 1), Some((TokenKind::Identifier, _)))
            || self.is_punct_at(self.pos + 1, "[")
            || self.is_punct_at(self.pos + 1, "{")
    }

    fn parse_block(&mut self) -> PResult<NodeId> {
        let start = self.pos;
        self.expect_punct("{")?;
        let body = self.parse_statement_list(Some("}"))?;
        self.expect_punct("}")?;
        Ok(self.finish(NodeKind::BlockStatement, start, body))
    }

    fn parse_paren_expression(&mut self) -> PResult<NodeId> {
        self.expect_punct("(")?;
        let expression = self.parse_expression()?;
        self.expect_punct(")")?;
        Ok(expression)
    }

    fn parse_variable_declaration(&mut self) -> PResult<NodeId> {
        let start = self.pos;
        self.pos += 1;
        let mut declarators = Vec::new();
        loop {
            let decl_start = self.pos;
            let target = self.parse_binding_target()?;
            let mut children = vec![target];
            if self.eat_punct("=") {
                children.push(self.parse_assignment()?);
            }
            declarators.push(self.finish(NodeKind::VariableDeclarator, decl_start, children));
            if !self.eat_punct(",") {
                break;
            }
        }
        Ok(self.finish(NodeKind::VariableDeclaration, start, declarators))
    }

    fn parse_binding_target(&mut self) -> PResult<NodeId> {
        match self.peek() {
            Some((TokenKind::Identifier, _)) => Ok(self.leaf(NodeKind::Identifier)),
            Some((TokenKind::Punctuator, "[")) => self.parse_array(),
            Some((TokenKind::Punctuator, "{")) => self.parse_object(),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_if(&mut self) -> PResult<NodeId> {
        let start = self.pos;
        self.pos += 1;
        let test = self.parse_paren_expression()?;
        let consequent = self.parse_statement()?;
        let mut children = vec![test, consequent];
        if self.is_keyword("else") {
            self.pos += 1;
            children.push(self.parse_statement()?);
        }
        Ok(self.finish(NodeKind::IfStatement, start, children))
    }

    fn parse_for(&mut self) -> PResult<NodeId> {
        let start = self.pos;
        self.pos += 1;
        self.expect_punct("(")?;

        let mut init = None;
        if !self.is_punct(";") {
            self.no_in = true;
            let parsed = if self.is_keyword("var")
                || self.is_keyword("const")
                || (self.peek() == Some((TokenKind::Identifier, "let"))
                    && self.starts_let_declaration())
            {
                self.parse_variable_declaration()
            } else {
                self.parse_expression()
            };
            self.no_in = false;
            init = Some(parsed?);
        }

        let iteration = if self.is_keyword("in") {
            Some(NodeKind::ForInStatement)
        } else if self.peek() == Some((TokenKind::Identifier, "of")) {
            Some(NodeKind::ForOfStatement)
        } else {
            None
        };

        if let (Some(kind), Some(left)) = (iteration, init) {
            self.pos += 1;
            let right = self.parse_expression()?;
            self.expect_punct(")")?;
            let body = self.parse_statement()?;
            return Ok(self.finish(kind, start, vec![left, right, body]));
        }

        let mut children: Vec<NodeId> = init.into_iter().collect();
        self.expect_punct(";")?;
        if !self.is_punct(";") {
            children.push(self.parse_expression()?);
        }
        self.expect_punct(";")?;
        if !self.is_punct(")") {
            children.push(self.parse_expression()?);
        }
        self.expect_punct(")")?;
        children.push(self.parse_statement()?);
        Ok(self.finish(NodeKind::ForStatement, start, children))
    }

    fn parse_try(&mut self) -> PResult<NodeId> {
        let start = self.pos;
        self.pos += 1;
        let mut children = vec![self.parse_block()?];
        if self.is_keyword("catch") {
            let catch_start = self.pos;
            self.pos += 1;
            let mut catch_children = Vec::new();
            if self.eat_punct("(") {
                catch_children.push(self.parse_binding_target()?);
                self.expect_punct(")")?;
            }
            catch_children.push(self.parse_block()?);
            children.push(self.finish(NodeKind::CatchClause, catch_start, catch_children));
        }
        if self.is_keyword("finally") {
            self.pos += 1;
            children.push(self.parse_block()?);
        }
        if children.len() == 1 {
            return Err(self.unexpected_expecting("catch or finally"));
        }
        Ok(self.finish(NodeKind::TryStatement, start, children))
    }

    fn parse_switch(&mut self) -> PResult<NodeId> {
        let start = self.pos;
        self.pos += 1;
        let discriminant = self.parse_paren_expression()?;
        self.expect_punct("{")?;
        let mut children = vec![discriminant];
        while !self.is_punct("}") {
            let case_start = self.pos;
            let mut case_children = Vec::new();
            if self.is_keyword("case") {
                self.pos += 1;
                case_children.push(self.parse_expression()?);
            } else {
                self.expect_keyword("default")?;
            }
            self.expect_punct(":")?;
            case_children.extend(self.parse_case_body()?);
            children.push(self.finish(NodeKind::SwitchCase, case_start, case_children));
        }
        self.expect_punct("}")?;
        Ok(self.finish(NodeKind::SwitchStatement, start, children))
    }

    // ----- functions and classes -----

    fn parse_function(&mut self, kind: NodeKind) -> PResult<NodeId> {
        let start = self.pos;
        self.expect_keyword("function")?;
        self.eat_punct("*");
        let mut children = Vec::new();
        if matches!(self.peek(), Some((TokenKind::Identifier, _))) {
            children.push(self.leaf(NodeKind::Identifier));
        } else if kind == NodeKind::FunctionDeclaration {
            return Err(self.unexpected_expecting("function name"));
        }
        children.extend(self.parse_params()?);
        children.push(self.parse_block()?);
        Ok(self.finish(kind, start, children))
    }

    fn parse_params(&mut self) -> PResult<Vec<NodeId>> {
        self.expect_punct("(")?;
        let mut params = Vec::new();
        while !self.is_punct(")") {
            self.eat_punct("...");
            params.push(self.parse_assignment()?);
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")")?;
        Ok(params)
    }

    /// `( params ) { body }` of a method, as a function expression
    fn parse_method_function(&mut self) -> PResult<NodeId> {
        let start = self.pos;
        let mut children = self.parse_params()?;
        children.push(self.parse_block()?);
        Ok(self.finish(NodeKind::FunctionExpression, start, children))
    }

    fn parse_class(&mut self, kind: NodeKind) -> PResult<NodeId> {
        let start = self.pos;
        self.expect_keyword("class")?;
        let mut children = Vec::new();
        if matches!(self.peek(), Some((TokenKind::Identifier, _))) {
            children.push(self.leaf(NodeKind::Identifier));
        } else if kind == NodeKind::ClassDeclaration {
            return Err(self.unexpected_expecting("class name"));
        }
        if self.is_keyword("extends") {
            self.pos += 1;
            children.push(self.nested(Self::parse_lhs)?);
        }

        let body_start = self.pos;
        self.expect_punct("{")?;
        let mut members = Vec::new();
        while !self.is_punct("}") {
            if self.eat_punct(";") {
                continue;
            }
            let member_start = self.pos;
            // static / get / set modifiers, unless they are the method name
            while matches!(self.peek(), Some((TokenKind::Identifier, "static" | "get" | "set")))
                && !self.is_punct_at(self.pos + 1, "(")
            {
                self.pos += 1;
            }
            self.eat_punct("*");
            let key = self.parse_property_key()?;
            let value = self.parse_method_function()?;
            members.push(self.finish(NodeKind::MethodDefinition, member_start, vec![key, value]));
        }
        self.expect_punct("}")?;
        children.push(self.finish(NodeKind::ClassBody, body_start, members));
        Ok(self.finish(kind, start, children))
    }

    fn parse_property_key(&mut self) -> PResult<NodeId> {
        if self.is_word_at(self.pos) {
            return Ok(self.leaf(NodeKind::Identifier));
        }
        match self.peek() {
            Some((TokenKind::String | TokenKind::Numeric, _)) => Ok(self.leaf(NodeKind::Literal)),
            Some((TokenKind::Punctuator, "[")) => {
                self.pos += 1;
                let key = self.parse_assignment()?;
                self.expect_punct("]")?;
                Ok(key)
            }
            _ => Err(self.unexpected_expecting("property name")),
        }
    }

    // ----- expressions -----

    fn parse_expression(&mut self) -> PResult<NodeId> {
        let start = self.pos;
        let first = self.parse_assignment()?;
        if !self.is_punct(",") {
            return Ok(first);
        }
        let mut expressions = vec![first];
        while self.eat_punct(",") {
            expressions.push(self.parse_assignment()?);
        }
        Ok(self.finish(NodeKind::SequenceExpression, start, expressions))
    }

    fn parse_assignment(&mut self) -> PResult<NodeId> {
        self.nested(Self::assignment)
    }

    fn assignment(&mut self) -> PResult<NodeId> {
        let start = self.pos;
        if self.is_punct("(") && self.is_punct_at(self.pos + 1, ")") && self.is_punct_at(self.pos + 2, "=>") {
            self.pos += 3;
            let body = self.parse_arrow_body()?;
            return Ok(self.finish(NodeKind::ArrowFunctionExpression, start, vec![body]));
        }

        let left = self.parse_conditional()?;

        if self.is_punct("=>") && !self.newline_before(self.pos) {
            self.pos += 1;
            let body = self.parse_arrow_body()?;
            return Ok(self.finish(NodeKind::ArrowFunctionExpression, start, vec![left, body]));
        }

        match self.peek() {
            Some((TokenKind::Punctuator, op)) if ASSIGNMENT_OPERATORS.contains(&op) => {
                self.pos += 1;
                let right = self.parse_assignment()?;
                Ok(self.finish(NodeKind::AssignmentExpression, start, vec![left, right]))
            }
            _ => Ok(left),
        }
    }

    fn parse_arrow_body(&mut self) -> PResult<NodeId> {
        if self.is_punct("{") {
            self.parse_block()
        } else {
            self.parse_assignment()
        }
    }

    fn parse_conditional(&mut self) -> PResult<NodeId> {
        let start = self.pos;
        let test = self.parse_binary(0)?;
        if !self.eat_punct("?") {
            return Ok(test);
        }
        let no_in = std::mem::replace(&mut self.no_in, false);
        let consequent = self.parse_assignment();
        self.no_in = no_in;
        let consequent = consequent?;
        self.expect_punct(":")?;
        let alternate = self.parse_assignment()?;
        Ok(self.finish(
            NodeKind::ConditionalExpression,
            start,
            vec![test, consequent, alternate],
        ))
    }

    /// Precedence and node kind of the binary operator at the cursor
    fn binary_operator(&self) -> Option<(u8, NodeKind)> {
        let (kind, value) = self.peek()?;
        let precedence = match (kind, value) {
            (TokenKind::Punctuator, "??") => 1,
            (TokenKind::Punctuator, "||") => 2,
            (TokenKind::Punctuator, "&&") => 3,
            (TokenKind::Punctuator, "|") => 4,
            (TokenKind::Punctuator, "^") => 5,
            (TokenKind::Punctuator, "&") => 6,
            (TokenKind::Punctuator, "==" | "!=" | "===" | "!==") => 7,
            (TokenKind::Punctuator, "<" | ">" | "<=" | ">=") => 8,
            (TokenKind::Keyword, "instanceof") => 8,
            (TokenKind::Keyword, "in") if !self.no_in => 8,
            (TokenKind::Punctuator, "<<" | ">>" | ">>>") => 9,
            (TokenKind::Punctuator, "+" | "-") => 10,
            (TokenKind::Punctuator, "*" | "/" | "%") => 11,
            (TokenKind::Punctuator, "**") => 12,
            _ => return None,
        };
        let node_kind = if precedence <= 3 {
            NodeKind::LogicalExpression
        } else {
            NodeKind::BinaryExpression
        };
        Some((precedence, node_kind))
    }

    fn parse_binary(&mut self, min_precedence: u8) -> PResult<NodeId> {
        let start = self.pos;
        let mut left = self.parse_unary()?;
        while let Some((precedence, kind)) = self.binary_operator() {
            if precedence < min_precedence {
                break;
            }
            let right_associative = self.is_punct("**");
            self.pos += 1;
            let next_min = if right_associative {
                precedence
            } else {
                precedence + 1
            };
            let right = self.nested(|p| p.parse_binary(next_min))?;
            left = self.finish(kind, start, vec![left, right]);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> PResult<NodeId> {
        let start = self.pos;
        match self.peek() {
            Some((TokenKind::Punctuator, "!" | "~" | "+" | "-"))
            | Some((TokenKind::Keyword, "typeof" | "void" | "delete")) => {
                self.pos += 1;
                let argument = self.nested(Self::parse_unary)?;
                Ok(self.finish(NodeKind::UnaryExpression, start, vec![argument]))
            }
            Some((TokenKind::Punctuator, "++" | "--")) => {
                self.pos += 1;
                let argument = self.nested(Self::parse_unary)?;
                Ok(self.finish(NodeKind::UpdateExpression, start, vec![argument]))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> PResult<NodeId> {
        let start = self.pos;
        let argument = self.parse_lhs()?;
        if (self.is_punct("++") || self.is_punct("--")) && !self.newline_before(self.pos) {
            self.pos += 1;
            return Ok(self.finish(NodeKind::UpdateExpression, start, vec![argument]));
        }
        Ok(argument)
    }

    /// Member access, calls and `new`
    fn parse_lhs(&mut self) -> PResult<NodeId> {
        let start = self.pos;
        let mut expression = if self.is_keyword("new") {
            self.pos += 1;
            let callee = self.parse_member_only()?;
            let mut children = vec![callee];
            if self.is_punct("(") {
                children.extend(self.parse_arguments()?);
            }
            self.finish(NodeKind::NewExpression, start, children)
        } else {
            self.parse_primary()?
        };

        loop {
            if self.is_punct(".") || self.is_punct("?.") {
                self.pos += 1;
                if self.is_punct("(") {
                    let mut children = vec![expression];
                    children.extend(self.parse_arguments()?);
                    expression = self.finish(NodeKind::CallExpression, start, children);
                    continue;
                }
                let property = self.parse_member_property()?;
                expression = self.finish(NodeKind::MemberExpression, start, vec![expression, property]);
            } else if self.is_punct("[") {
                self.pos += 1;
                let property = self.parse_expression()?;
                self.expect_punct("]")?;
                expression = self.finish(NodeKind::MemberExpression, start, vec![expression, property]);
            } else if self.is_punct("(") {
                let mut children = vec![expression];
                children.extend(self.parse_arguments()?);
                expression = self.finish(NodeKind::CallExpression, start, children);
            } else {
                break;
            }
        }
        Ok(expression)
    }

    /// Callee of `new`: member accesses but no call
    fn parse_member_only(&mut self) -> PResult<NodeId> {
        let start = self.pos;
        let mut expression = if self.is_keyword("new") {
            self.nested(Self::parse_lhs)?
        } else {
            self.parse_primary()?
        };
        loop {
            if self.eat_punct(".") {
                let property = self.parse_member_property()?;
                expression = self.finish(NodeKind::MemberExpression, start, vec![expression, property]);
            } else if self.eat_punct("[") {
                let property = self.parse_expression()?;
                self.expect_punct("]")?;
                expression = self.finish(NodeKind::MemberExpression, start, vec![expression, property]);
            } else {
                break;
            }
        }
        Ok(expression)
    }

    fn parse_member_property(&mut self) -> PResult<NodeId> {
        if self.is_word_at(self.pos) {
            Ok(self.leaf(NodeKind::Identifier))
        } else {
            Err(self.unexpected_expecting("property name"))
        }
    }

    fn parse_arguments(&mut self) -> PResult<Vec<NodeId>> {
        self.expect_punct("(")?;
        let mut arguments = Vec::new();
        while !self.is_punct(")") {
            self.eat_punct("...");
            arguments.push(self.parse_assignment()?);
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")")?;
        Ok(arguments)
    }

    fn parse_primary(&mut self) -> PResult<NodeId> {
        let Some((kind, value)) = self.peek() else {
            return Err(self.unexpected());
        };
        match (kind, value) {
            (TokenKind::Identifier, _) => Ok(self.leaf(NodeKind::Identifier)),
            (TokenKind::Keyword, "this") => Ok(self.leaf(NodeKind::ThisExpression)),
            (TokenKind::Keyword, "super") => Ok(self.leaf(NodeKind::Identifier)),
            (TokenKind::Keyword, "function") => self.parse_function(NodeKind::FunctionExpression),
            (TokenKind::Keyword, "class") => self.parse_class(NodeKind::ClassExpression),
            (
                TokenKind::Numeric
                | TokenKind::String
                | TokenKind::Boolean
                | TokenKind::Null
                | TokenKind::RegularExpression,
                _,
            ) => Ok(self.leaf(NodeKind::Literal)),
            (TokenKind::Template, _) => Ok(self.leaf(NodeKind::TemplateLiteral)),
            (TokenKind::Punctuator, "(") => {
                self.pos += 1;
                let no_in = std::mem::replace(&mut self.no_in, false);
                let expression = self.parse_expression();
                self.no_in = no_in;
                let expression = expression?;
                self.expect_punct(")")?;
                Ok(expression)
            }
            (TokenKind::Punctuator, "[") => self.parse_array(),
            (TokenKind::Punctuator, "{") => self.parse_object(),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_array(&mut self) -> PResult<NodeId> {
        let start = self.pos;
        self.expect_punct("[")?;
        let mut elements = Vec::new();
        while !self.is_punct("]") {
            if self.eat_punct(",") {
                continue;
            }
            self.eat_punct("...");
            elements.push(self.parse_assignment()?);
            if !self.is_punct("]") {
                self.expect_punct(",")?;
            }
        }
        self.expect_punct("]")?;
        Ok(self.finish(NodeKind::ArrayExpression, start, elements))
    }

    fn parse_object(&mut self) -> PResult<NodeId> {
        let start = self.pos;
        self.expect_punct("{")?;
        let mut properties = Vec::new();
        while !self.is_punct("}") {
            properties.push(self.parse_property()?);
            if !self.is_punct("}") {
                self.expect_punct(",")?;
            }
        }
        self.expect_punct("}")?;
        Ok(self.finish(NodeKind::ObjectExpression, start, properties))
    }

    fn parse_property(&mut self) -> PResult<NodeId> {
        let start = self.pos;
        if self.eat_punct("...") {
            let argument = self.parse_assignment()?;
            return Ok(self.finish(NodeKind::Property, start, vec![argument]));
        }
        // get / set accessors
        if matches!(self.peek(), Some((TokenKind::Identifier, "get" | "set")))
            && (self.is_word_at(self.pos + 1)
                || matches!(
                    self.peek_at(self.pos + 1),
                    Some((TokenKind::String | TokenKind::Numeric, _))
                ))
        {
            self.pos += 1;
            let key = self.parse_property_key()?;
            let value = self.parse_method_function()?;
            return Ok(self.finish(NodeKind::Property, start, vec![key, value]));
        }
        self.eat_punct("*");
        let key = self.parse_property_key()?;
        if self.eat_punct(":") {
            let value = self.parse_assignment()?;
            return Ok(self.finish(NodeKind::Property, start, vec![key, value]));
        }
        if self.is_punct("(") {
            let value = self.parse_method_function()?;
            return Ok(self.finish(NodeKind::Property, start, vec![key, value]));
        }
        if self.eat_punct("=") {
            // shorthand with default, only valid in patterns
            let value = self.parse_assignment()?;
            return Ok(self.finish(NodeKind::Property, start, vec![key, value]));
        }
        Ok(self.finish(NodeKind::Property, start, vec![key]))
    }
}

#[cfg(test)]
mod tests {
    use super::MAX_NESTING_DEPTH;
    use crate::config::ParseOptions;
    use crate::syntax::{NodeKind, TokenTree};

    fn kinds(source: &str) -> Vec<NodeKind> {
        let tree = TokenTree::parse(source, &ParseOptions::default());
        assert!(tree.is_valid(), "unexpected errors: {:?}", tree.parse_errors());
        tree.nodes().into_iter().map(|n| tree.node(n).kind()).collect()
    }

    #[test]
    fn test_variable_declaration() {
        assert_eq!(
            kinds("var x = 1, y;"),
            vec![
                NodeKind::Program,
                NodeKind::VariableDeclaration,
                NodeKind::VariableDeclarator,
                NodeKind::Identifier,
                NodeKind::Literal,
                NodeKind::VariableDeclarator,
                NodeKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_function_declaration() {
        assert_eq!(
            kinds("function foo(a,b) {}"),
            vec![
                NodeKind::Program,
                NodeKind::FunctionDeclaration,
                NodeKind::Identifier,
                NodeKind::Identifier,
                NodeKind::Identifier,
                NodeKind::BlockStatement,
            ]
        );
    }

    #[test]
    fn test_precedence() {
        let tree = TokenTree::parse("a = b || c + d * e;", &ParseOptions::default());
        let kinds: Vec<_> = tree.nodes().into_iter().map(|n| tree.node(n).kind()).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Program,
                NodeKind::ExpressionStatement,
                NodeKind::AssignmentExpression,
                NodeKind::Identifier,
                NodeKind::LogicalExpression,
                NodeKind::Identifier,
                NodeKind::BinaryExpression,
                NodeKind::Identifier,
                NodeKind::BinaryExpression,
                NodeKind::Identifier,
                NodeKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_statements_parse_without_errors() {
        let source = r#"
label: for (var i = 0; i < 10; i++) { if (i) continue label; else break; }
for (var k in obj) {}
for (const v of list) {}
while (x) x--;
do { y++ } while (y < 3)
switch (z) { case 1: a(); break; default: b() }
try { f() } catch (e) { g(e) } finally { h() }
throw new Error("x");
var o = { a: 1, 'b': 2, get c() { return 3 }, d() {}, ...rest };
class A extends B { constructor() { super(); } static make() {} get size() { return 0 } }
var arrow = (a, b) => a + b, none = () => {};
x = typeof y === 'undefined' ? [1, , 2] : `t${y}`;
debugger;
"#;
        let tree = TokenTree::parse(source, &ParseOptions::default());
        assert!(tree.is_valid(), "unexpected errors: {:?}", tree.parse_errors());
    }

    #[test]
    fn test_asi_on_newline() {
        let tree = TokenTree::parse("a = 1\nb = 2\n", &ParseOptions::default());
        assert!(tree.is_valid());
        assert_eq!(tree.node(tree.root()).children().len(), 2);
    }

    #[test]
    fn test_tolerant_recovery_keeps_following_statements() {
        let tree = TokenTree::parse("var a = ;\nvar b = 2;", &ParseOptions::default());
        assert_eq!(tree.parse_errors().len(), 1);
        let root = tree.node(tree.root());
        assert_eq!(root.children().len(), 1);
        assert_eq!(tree.node(root.children()[0]).kind(), NodeKind::VariableDeclaration);
    }

    #[test]
    fn test_strict_mode_keeps_root_only() {
        let tree = TokenTree::parse("var a = ;\nvar b = 2;", &ParseOptions::strict());
        assert_eq!(tree.parse_errors().len(), 1);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.parse_errors()[0].line, 1);
        assert_eq!(tree.parse_errors()[0].column, 8);
    }

    fn has_nesting_error(tree: &TokenTree) -> bool {
        tree.parse_errors()
            .iter()
            .any(|e| e.description == "Nesting too deep")
    }

    #[test]
    fn test_deep_parentheses_fail_with_nesting_error() {
        let tree = TokenTree::parse(&"(".repeat(50_000), &ParseOptions::default());
        assert!(!tree.is_valid());
        assert!(has_nesting_error(&tree));
        assert_eq!(tree.node(tree.root()).kind(), NodeKind::Program);

        let tree = TokenTree::parse(&"(".repeat(50_000), &ParseOptions::strict());
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.parse_errors()[0].description, "Nesting too deep");
    }

    #[test]
    fn test_deep_nesting_of_each_recursive_form() {
        let depth = 3_000;
        let sources = [
            format!("x = {}1{};", "(".repeat(depth), ")".repeat(depth)),
            format!("{}{}", "{".repeat(depth), "}".repeat(depth)),
            format!("x = {}a;", "!".repeat(depth)),
            format!("x = {}a;", "a ** ".repeat(depth)),
            format!("x = {}A;", "new ".repeat(depth)),
            format!("x = {}0{};", "[".repeat(depth), "]".repeat(depth)),
            format!("x = {}1;", "a = ".repeat(depth)),
        ];
        for source in &sources {
            let tree = TokenTree::parse(source, &ParseOptions::default());
            assert!(has_nesting_error(&tree), "no nesting error for {}", &source[..20]);
        }
    }

    #[test]
    fn test_nesting_below_limit_parses() {
        let depth = MAX_NESTING_DEPTH / 4;
        let source = format!("x = {}1{};\ny = 2;", "(".repeat(depth), ")".repeat(depth));
        let tree = TokenTree::parse(&source, &ParseOptions::default());
        assert!(tree.is_valid(), "unexpected errors: {:?}", tree.parse_errors());
        assert_eq!(tree.node(tree.root()).children().len(), 2);
    }

    #[test]
    fn test_nesting_error_recovers_at_next_line() {
        let source = format!("x = {};\ny = 2;", "(".repeat(1_000));
        let tree = TokenTree::parse(&source, &ParseOptions::default());
        assert!(has_nesting_error(&tree));
        let root = tree.node(tree.root());
        assert_eq!(root.children().len(), 1);
        assert_eq!(tree.node(root.children()[0]).kind(), NodeKind::ExpressionStatement);
    }

    #[test]
    fn test_statement_ranges_include_semicolon() {
        let tree = TokenTree::parse("var a = 1;", &ParseOptions::default());
        let decl = tree.node(tree.root()).children()[0];
        assert_eq!(tree.node_range(decl), Some(0..10));
    }
}
