//! Range, line and type lookups over a [`TokenTree`]
//!
//! The index is a snapshot of one tree version. [`TokenTree::index`] caches it
//! and every mutation drops the cache, so a query never observes a mutated tree
//! through an outdated index.

use std::collections::{BTreeMap, HashMap};

use crate::syntax::{NodeId, NodeKind, TokenId, TokenKind, TokenTree};

#[derive(Debug, Clone)]
pub struct RangeIndex {
    version: u64,
    by_start: HashMap<usize, TokenId>,
    by_end: HashMap<usize, TokenId>,
    /// Start line -> tokens in sequence order, `Eof` excluded
    lines: BTreeMap<usize, Vec<TokenId>>,
    node_types: HashMap<NodeKind, Vec<NodeId>>,
    token_types: HashMap<TokenKind, Vec<TokenId>>,
    /// First token -> nodes beginning there, outermost first
    starting_at: HashMap<TokenId, Vec<NodeId>>,
    owners: Vec<Option<NodeId>>,
    /// Pre-order position of each node, indexed by `NodeId::index`
    preorder: Vec<usize>,
    /// Sequence position of each token, indexed by `TokenId::index`
    ordinals: Vec<usize>,
}

impl RangeIndex {
    pub fn build(tree: &TokenTree) -> Self {
        let _span = tracing::trace_span!("build_range_index", version = tree.version()).entered();

        let mut by_start = HashMap::new();
        let mut by_end = HashMap::new();
        let mut lines: BTreeMap<usize, Vec<TokenId>> = BTreeMap::new();
        let mut token_types: HashMap<TokenKind, Vec<TokenId>> = HashMap::new();
        let mut ordinals = vec![usize::MAX; tree.arena_len()];

        for token_id in tree.tokens() {
            let token = tree.token(token_id);
            token_types.entry(token.kind()).or_default().push(token_id);
            let Some(layout) = tree.token_layout(token_id) else {
                continue;
            };
            ordinals[token_id.index()] = layout.ordinal;
            if token.is_eof() {
                continue;
            }
            by_start.insert(layout.start, token_id);
            by_end.insert(layout.end, token_id);
            lines.entry(layout.start_pos.line).or_default().push(token_id);
        }

        let order = tree.nodes();
        let mut node_types: HashMap<NodeKind, Vec<NodeId>> = HashMap::new();
        let mut starting_at: HashMap<TokenId, Vec<NodeId>> = HashMap::new();
        let mut preorder = vec![usize::MAX; tree.node_count()];
        for (position, node_id) in order.iter().enumerate() {
            let node = tree.node(*node_id);
            preorder[node_id.index()] = position;
            node_types.entry(node.kind()).or_default().push(*node_id);
            starting_at.entry(node.first_token()).or_default().push(*node_id);
        }

        Self {
            version: tree.version(),
            by_start,
            by_end,
            lines,
            node_types,
            token_types,
            starting_at,
            owners: tree.token_owners(),
            preorder,
            ordinals,
        }
    }

    /// Tree version this index was built against
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Token whose range starts exactly at `offset`
    pub fn by_range_start(&self, offset: usize) -> Option<TokenId> {
        self.by_start.get(&offset).copied()
    }

    /// Token whose range ends exactly at `offset`
    pub fn by_range_end(&self, offset: usize) -> Option<TokenId> {
        self.by_end.get(&offset).copied()
    }

    /// Tokens starting on a 1-based line
    pub fn tokens_on_line(&self, line: usize) -> &[TokenId] {
        self.lines.get(&line).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first_token_on_line(
        &self,
        tree: &TokenTree,
        line: usize,
        include_comments: bool,
    ) -> Option<TokenId> {
        self.tokens_on_line(line)
            .iter()
            .copied()
            .find(|t| include_comments || !tree.token(*t).is_comment())
    }

    pub fn last_token_on_line(
        &self,
        tree: &TokenTree,
        line: usize,
        include_comments: bool,
    ) -> Option<TokenId> {
        self.tokens_on_line(line)
            .iter()
            .rev()
            .copied()
            .find(|t| include_comments || !tree.token(*t).is_comment())
    }

    /// Nodes of one kind in pre-order
    pub fn nodes_of_type(&self, kind: NodeKind) -> &[NodeId] {
        self.node_types.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nodes of any of `kinds`, merged in pre-order
    pub fn nodes_of_types(&self, kinds: &[NodeKind]) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = kinds
            .iter()
            .enumerate()
            .filter(|(i, kind)| !kinds[..*i].contains(*kind))
            .flat_map(|(_, kind)| self.nodes_of_type(*kind).iter().copied())
            .collect();
        nodes.sort_by_key(|n| self.preorder[n.index()]);
        nodes
    }

    /// Nodes by production name. Unknown names yield nothing.
    pub fn nodes_of_type_name(&self, name: &str) -> &[NodeId] {
        match NodeKind::from_name(name) {
            NodeKind::Unknown => &[],
            kind => self.nodes_of_type(kind),
        }
    }

    /// Tokens of one kind in sequence order
    pub fn tokens_of_type(&self, kind: TokenKind) -> &[TokenId] {
        self.token_types.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Tokens of any of `kinds`, merged in sequence order
    pub fn tokens_of_types(&self, kinds: &[TokenKind]) -> Vec<TokenId> {
        let mut tokens: Vec<TokenId> = kinds
            .iter()
            .enumerate()
            .filter(|(i, kind)| !kinds[..*i].contains(*kind))
            .flat_map(|(_, kind)| self.tokens_of_type(*kind).iter().copied())
            .collect();
        tokens.sort_by_key(|t| self.ordinals.get(t.index()).copied().unwrap_or(usize::MAX));
        tokens
    }

    /// Every node whose first token is `token`, outermost first
    pub fn nodes_starting_at(&self, token: TokenId) -> &[NodeId] {
        self.starting_at.get(&token).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Innermost node owning `token`
    pub fn owner_of(&self, token: TokenId) -> Option<NodeId> {
        self.owners.get(token.index()).copied().flatten()
    }

    /// Token whose text covers `offset`
    pub fn token_at(&self, tree: &TokenTree, offset: usize) -> Option<TokenId> {
        tree.layout().token_at_offset(offset)
    }

    /// Innermost node whose range contains `offset`; `None` outside the text
    pub fn node_at(&self, tree: &TokenTree, offset: usize) -> Option<NodeId> {
        let contains = |node: NodeId| {
            tree.node_range(node)
                .is_some_and(|range| range.start <= offset && offset < range.end)
        };
        let mut current = tree.root();
        if !contains(current) {
            return None;
        }
        while let Some(child) = tree
            .node(current)
            .children()
            .iter()
            .copied()
            .find(|c| contains(*c))
        {
            current = child;
        }
        Some(current)
    }

    /// Outermost non-root node starting on a 1-based line, skipping comments
    pub fn node_on_line(&self, tree: &TokenTree, line: usize) -> Option<NodeId> {
        let first = self.first_token_on_line(tree, line, false)?;
        self.nodes_starting_at(first)
            .iter()
            .copied()
            .find(|n| *n != tree.root())
            .or_else(|| self.owner_of(first))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParseOptions;

    fn parse(source: &str) -> TokenTree {
        TokenTree::parse(source, &ParseOptions::default())
    }

    #[test]
    fn test_node_at_offset_returns_innermost_container() {
        let tree = parse("function foo(a,b) {}");
        let index = tree.index();
        let node = index.node_at(&tree, 16).unwrap();
        assert_eq!(tree.node(node).kind(), NodeKind::FunctionDeclaration);
        let node = index.node_at(&tree, 18).unwrap();
        assert_eq!(tree.node(node).kind(), NodeKind::BlockStatement);
        assert_eq!(index.node_at(&tree, 20), None);
        assert_eq!(index.node_at(&tree, 500), None);
    }

    #[test]
    fn test_range_start_and_end_lookups_are_exact() {
        let tree = parse("a = bb;");
        let index = tree.index();
        let bb = index.by_range_start(4).unwrap();
        assert_eq!(tree.token(bb).value(), "bb");
        assert_eq!(index.by_range_end(6), Some(bb));
        assert_eq!(index.by_range_start(5), None);
        assert_eq!(index.by_range_end(5), None);
    }

    #[test]
    fn test_line_lookups() {
        let tree = parse("a;\n/* c */ b; // d\n\nc;");
        let index = tree.index();
        let value = |t: Option<TokenId>| t.map(|t| tree.token(t).value().to_string());
        assert_eq!(value(index.first_token_on_line(&tree, 2, true)), Some("/* c */".into()));
        assert_eq!(value(index.first_token_on_line(&tree, 2, false)), Some("b".into()));
        assert_eq!(value(index.last_token_on_line(&tree, 2, true)), Some("// d".into()));
        assert_eq!(value(index.last_token_on_line(&tree, 2, false)), Some(";".into()));
        assert_eq!(index.first_token_on_line(&tree, 3, true), None);
        assert_eq!(index.first_token_on_line(&tree, 99, true), None);
    }

    #[test]
    fn test_type_lookups() {
        let tree = parse("var a = 1; function f() { var b; }");
        let index = tree.index();
        assert_eq!(index.nodes_of_type(NodeKind::VariableDeclaration).len(), 2);
        assert_eq!(index.nodes_of_type_name("Program").len(), 1);
        assert!(index.nodes_of_type_name("NoSuchNode").is_empty());

        let merged = index.nodes_of_types(&[NodeKind::VariableDeclaration, NodeKind::FunctionDeclaration]);
        let kinds: Vec<_> = merged.iter().map(|n| tree.node(*n).kind()).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::VariableDeclaration,
                NodeKind::FunctionDeclaration,
                NodeKind::VariableDeclaration
            ]
        );

        let words = index.tokens_of_types(&[TokenKind::Identifier, TokenKind::Keyword]);
        let values: Vec<_> = words.iter().map(|t| tree.token(*t).value()).collect();
        assert_eq!(values, vec!["var", "a", "function", "f", "var", "b"]);
    }

    #[test]
    fn test_nodes_starting_at_are_outermost_first() {
        let tree = parse("a.b();");
        let index = tree.index();
        let kinds: Vec<_> = index
            .nodes_starting_at(tree.first_token())
            .iter()
            .map(|n| tree.node(*n).kind())
            .collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Program,
                NodeKind::ExpressionStatement,
                NodeKind::CallExpression,
                NodeKind::MemberExpression,
                NodeKind::Identifier
            ]
        );
        assert!(index.nodes_starting_at(tree.last_token()).is_empty());
    }

    #[test]
    fn test_index_tracks_tree_version() {
        let mut tree = parse("a=b;");
        let before = tree.index().version();
        let eq = tree.find_next_operator_token(tree.first_token(), "=").unwrap();
        tree.set_whitespace_before(eq, " ").unwrap();
        assert!(tree.index().version() > before);
        assert_eq!(tree.index().by_range_start(2), Some(eq));
    }
}
