// src/api/object_graph.rs
//! Tree reconstruction from the flat node list a crawl produces.
//!
//! The assembly reads as two named steps:
//!   1. Register nodes as they arrive, grouped under their parent id
//!   2. Assemble the tree by walking parent→child edges from the root
//!
//! Both steps are pure: no I/O happens here.

use crate::model::Node;
use crate::types::NotionId;
use indexmap::IndexMap;

/// Nodes grouped by the canonical id of their parent.
///
/// Parent ids pass through [`NotionId::parse`] on the way in, so a dashed
/// and an undashed pointer to the same parent land in the same group.
#[derive(Debug, Default)]
pub struct NodeGraph {
    children: IndexMap<NotionId, Vec<Node>>,
    registered: usize,
}

impl NodeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups a flat list, keeping arrival order within each parent.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        nodes.into_iter().fold(Self::new(), Self::with_node)
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.register(node);
        self
    }

    pub fn register(&mut self, node: Node) {
        self.registered += 1;
        self.children
            .entry(node.parent.id.clone())
            .or_default()
            .push(node);
    }

    pub fn len(&self) -> usize {
        self.registered
    }

    pub fn is_empty(&self) -> bool {
        self.registered == 0
    }

    /// Returns the children of `root`, each carrying its own subtree.
    ///
    /// Every group is consumed at most once, so malformed parent cycles
    /// cannot recurse forever. Nodes unreachable from `root` are dropped.
    pub fn assemble(mut self, root: &NotionId) -> Vec<Node> {
        let tree = self.take_children(root);
        let orphaned: usize = self.children.values().map(Vec::len).sum();
        if orphaned > 0 {
            log::debug!(
                "{} fetched nodes were not reachable from {} and were dropped",
                orphaned,
                root
            );
        }
        tree
    }

    fn take_children(&mut self, parent: &NotionId) -> Vec<Node> {
        let Some(mut nodes) = self.children.swap_remove(parent) else {
            return Vec::new();
        };
        for node in &mut nodes {
            let mut children = self.take_children(&node.id);
            node.children.append(&mut children);
        }
        nodes
    }
}

/// Builds the tree under `root` from a flat node list.
pub fn build_tree(root: &NotionId, nodes: Vec<Node>) -> Vec<Node> {
    NodeGraph::from_nodes(nodes).assemble(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeParent, ParentKind};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn id(hex: char) -> NotionId {
        NotionId::parse(&hex.to_string().repeat(32)).unwrap()
    }

    fn node(own: char, parent: &str) -> Node {
        Node {
            id: id(own),
            node_type: "paragraph".to_string(),
            parent: NodeParent {
                kind: ParentKind::Node,
                id: NotionId::parse(parent).unwrap(),
            },
            has_children: false,
            created_time: None,
            last_edited_time: None,
            payload: json!({}),
            properties: None,
            children: Vec::new(),
            comments: Vec::new(),
        }
    }

    fn shape(nodes: &[Node]) -> Vec<(String, usize)> {
        nodes
            .iter()
            .flat_map(|n| n.preorder())
            .map(|n| (n.id.as_str()[..1].to_string(), n.children.len()))
            .collect()
    }

    #[test]
    fn groups_children_under_their_parent_in_fetch_order() {
        let root = "00000000000000000000000000000000";
        let nodes = vec![
            node('a', root),
            node('b', root),
            node('c', &"a".repeat(32)),
            node('d', &"a".repeat(32)),
            node('e', &"c".repeat(32)),
        ];
        let tree = build_tree(&NotionId::parse(root).unwrap(), nodes);
        assert_eq!(
            shape(&tree),
            vec![
                ("a".to_string(), 2),
                ("c".to_string(), 1),
                ("e".to_string(), 0),
                ("d".to_string(), 0),
                ("b".to_string(), 0),
            ]
        );
    }

    #[test]
    fn dashed_parent_pointers_match_plain_ids() {
        let root = "00000000-0000-0000-0000-000000000000";
        let nodes = vec![
            node('a', root),
            node('b', "aaaaaaaa-aaaa-aaaa-aaaa-aaaaaaaaaaaa"),
        ];
        let tree = build_tree(&NotionId::parse("00000000000000000000000000000000").unwrap(), nodes);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].children[0].id, id('b'));
    }

    #[test]
    fn unreachable_nodes_and_cycles_are_dropped() {
        let root = "00000000000000000000000000000000";
        let nodes = vec![
            node('a', root),
            node('b', &"c".repeat(32)),
            node('c', &"b".repeat(32)),
        ];
        let graph = NodeGraph::from_nodes(nodes);
        assert_eq!(graph.len(), 3);
        let tree = graph.assemble(&NotionId::parse(root).unwrap());
        assert_eq!(shape(&tree), vec![("a".to_string(), 0)]);
    }
}
