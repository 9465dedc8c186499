use std::collections::{BTreeMap, HashSet};
use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::errors::{TreeError, TreeResult};

/// Handle for a node in the tree arena.
pub type NodeId = Index;

/// Data payload for tree nodes.
///
/// Every non-root node has exactly one parent edge, so the attributes of that
/// edge (branch length, trunk counter) live on the child node.
#[derive(Debug, Clone, Default)]
pub struct NodeData {
    /// Numeric identifier assigned in level order at load time
    pub id: usize,
    /// Taxon label for leaves, optional name for internal nodes
    pub label: Option<String>,
    /// Length of the parent edge; 0.0 for the root and for edges without one
    pub branch_length: f64,
    /// Traversal counter of the parent edge, written by the trunk scorer
    pub trunk: u64,
    /// Discrete annotations (trait values, comment metadata)
    pub annotations: BTreeMap<String, String>,
}

/// Tree node in the arena-based topology.
#[derive(Debug)]
pub struct Node {
    /// Edge and annotation data for this node
    pub data: NodeData,
    /// Index of the parent node, None for the root
    pub parent: Option<NodeId>,
    /// Indices of child nodes, in input order (empty for leaves)
    pub children: Vec<NodeId>,
}

/// Arena-based rooted multifurcating phylogenetic tree.
///
/// Nodes live in a generational arena and reference each other by [NodeId].
/// The topology is read-only after construction; the only mutable analysis
/// state is the per-edge `trunk` counter.
#[derive(Debug, Default)]
pub struct PhyloTree {
    /// Arena storage for all tree nodes
    arena: Arena<Node>,
    /// Index of the root node, None for empty trees
    root: Option<NodeId>,
    /// Tree name, set when parsed from a Nexus TREES block
    name: Option<String>,
}

impl PhyloTree {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
            name: None,
        }
    }

    #[instrument(level = "trace", skip(self, data))]
    pub fn insert_node(&mut self, data: NodeData, parent: Option<NodeId>) -> NodeId {
        let node = Node {
            data,
            parent,
            children: Vec::new(),
        };
        let node_idx = self.arena.insert(node);

        if let Some(parent_idx) = parent {
            if let Some(parent) = self.arena.get_mut(parent_idx) {
                parent.children.push(node_idx);
            }
        } else if self.root.is_none() {
            self.root = Some(node_idx);
        }

        node_idx
    }

    pub fn node(&self, idx: NodeId) -> Option<&Node> {
        self.arena.get(idx)
    }

    pub fn node_mut(&mut self, idx: NodeId) -> Option<&mut Node> {
        self.arena.get_mut(idx)
    }

    /// The unique root node, None only for an empty tree.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// The node's parent, None for the root.
    pub fn parent(&self, idx: NodeId) -> Option<NodeId> {
        self.arena.get(idx).and_then(|node| node.parent)
    }

    /// Outgoing edges of a node, identified by their child nodes.
    pub fn children(&self, idx: NodeId) -> &[NodeId] {
        self.arena
            .get(idx)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_leaf(&self, idx: NodeId) -> bool {
        self.arena
            .get(idx)
            .map(|node| node.children.is_empty())
            .unwrap_or(false)
    }

    /// Length of the node's parent edge, 0.0 for the root.
    pub fn branch_length(&self, idx: NodeId) -> f64 {
        self.arena
            .get(idx)
            .map(|node| node.data.branch_length)
            .unwrap_or(0.0)
    }

    /// Trunk traversal count of the node's parent edge.
    pub fn trunk(&self, idx: NodeId) -> u64 {
        self.arena.get(idx).map(|node| node.data.trunk).unwrap_or(0)
    }

    pub fn annotation(&self, idx: NodeId, key: &str) -> Option<&str> {
        self.arena
            .get(idx)
            .and_then(|node| node.data.annotations.get(key))
            .map(String::as_str)
    }

    pub fn set_annotation(&mut self, idx: NodeId, key: &str, value: impl Into<String>) {
        if let Some(node) = self.arena.get_mut(idx) {
            node.data.annotations.insert(key.to_string(), value.into());
        }
    }

    /// Whether any node carries an annotation under `key`.
    pub fn has_feature(&self, key: &str) -> bool {
        self.arena
            .iter()
            .any(|(_, node)| node.data.annotations.contains_key(key))
    }

    /// Name used for a node in output and error messages: the label if
    /// present, otherwise the numeric id.
    pub fn display_name(&self, idx: NodeId) -> String {
        match self.arena.get(idx) {
            Some(node) => match &node.data.label {
                Some(label) => label.clone(),
                None => node.data.id.to_string(),
            },
            None => "?".to_string(),
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.arena.len()
    }

    pub fn num_leaves(&self) -> usize {
        self.arena
            .iter()
            .filter(|(_, node)| node.children.is_empty())
            .count()
    }

    /// Number of edges; every node except the root has exactly one parent edge.
    pub fn num_edges(&self) -> usize {
        self.arena.len().saturating_sub(1)
    }

    /// Sum of all branch lengths in the tree.
    pub fn total_branch_length(&self) -> f64 {
        self.arena
            .iter()
            .filter(|(idx, _)| Some(*idx) != self.root)
            .map(|(_, node)| node.data.branch_length)
            .sum()
    }

    /// All nodes with their ids, in arena order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.arena.iter()
    }

    /// Lazy iterator over all leaves, in left-to-right input order.
    pub fn leaves(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.iter()
            .filter(|(_, node)| node.children.is_empty())
            .map(|(idx, _)| idx)
    }

    /// Edges on the path from the root down to `leaf`, identified by their
    /// child nodes and returned root-first. Empty when `leaf` is the root.
    pub fn path_to_root(&self, leaf: NodeId) -> Vec<NodeId> {
        let mut edges = Vec::new();
        let mut current = leaf;
        while let Some(parent) = self.parent(current) {
            edges.push(current);
            current = parent;
        }
        edges.reverse();
        edges
    }

    /// Zeroes every trunk counter so a scoring pass starts from a clean slate.
    pub fn reset_trunk(&mut self) {
        for (_, node) in self.arena.iter_mut() {
            node.data.trunk = 0;
        }
    }

    pub fn iter(&self) -> PreOrderIter<'_> {
        PreOrderIter::new(self)
    }

    pub fn iter_postorder(&self) -> PostOrderIter<'_> {
        PostOrderIter::new(self)
    }

    /// Validates the rooted-tree invariants once, at load time.
    ///
    /// Checks that exactly one node has no parent, that no node is reached
    /// twice when descending from the root, and that every node is reachable
    /// from the root.
    #[instrument(level = "debug", skip(self))]
    pub fn validate(&self) -> TreeResult<()> {
        let root = self.root.ok_or(TreeError::MissingRoot)?;

        for (idx, node) in self.arena.iter() {
            if node.parent.is_none() && idx != root {
                return Err(TreeError::MultipleRoots(
                    self.display_name(root),
                    self.display_name(idx),
                ));
            }
        }

        let mut visited = HashSet::with_capacity(self.arena.len());
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            if !visited.insert(idx) {
                return Err(TreeError::CycleDetected(self.display_name(idx)));
            }
            stack.extend_from_slice(self.children(idx));
        }

        if visited.len() != self.arena.len() {
            for (idx, _) in self.arena.iter() {
                if !visited.contains(&idx) {
                    return Err(TreeError::Unreachable(self.display_name(idx)));
                }
            }
        }

        Ok(())
    }
}

/// Iterative pre-order traversal (parents before children).
pub struct PreOrderIter<'a> {
    tree: &'a PhyloTree,
    stack: Vec<NodeId>,
}

impl<'a> PreOrderIter<'a> {
    fn new(tree: &'a PhyloTree) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = tree.root() {
            stack.push(root);
        }
        Self { tree, stack }
    }
}

impl<'a> Iterator for PreOrderIter<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let current_idx = self.stack.pop()?;
        let node = self.tree.node(current_idx)?;
        // Push children in reverse order for left-to-right traversal
        for &child in node.children.iter().rev() {
            self.stack.push(child);
        }
        Some((current_idx, node))
    }
}

/// Iterative post-order traversal (children before parents).
pub struct PostOrderIter<'a> {
    tree: &'a PhyloTree,
    stack: Vec<(NodeId, bool)>,
}

impl<'a> PostOrderIter<'a> {
    fn new(tree: &'a PhyloTree) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = tree.root() {
            stack.push((root, false));
        }
        Self { tree, stack }
    }
}

impl<'a> Iterator for PostOrderIter<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current_idx, children_visited)) = self.stack.pop() {
            if let Some(node) = self.tree.node(current_idx) {
                if children_visited || node.children.is_empty() {
                    return Some((current_idx, node));
                }
                self.stack.push((current_idx, true));
                for &child in node.children.iter().rev() {
                    self.stack.push((child, false));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_data(label: &str) -> NodeData {
        NodeData {
            label: Some(label.to_string()),
            ..NodeData::default()
        }
    }

    #[test]
    fn given_two_parentless_nodes_when_validating_then_reports_multiple_roots() {
        let mut tree = PhyloTree::new();
        let root = tree.insert_node(NodeData::default(), None);
        tree.insert_node(leaf_data("a"), Some(root));
        tree.insert_node(leaf_data("stray"), None);

        let err = tree.validate().unwrap_err();
        assert!(matches!(err, TreeError::MultipleRoots(_, _)));
    }

    #[test]
    fn given_node_linked_under_two_parents_when_validating_then_reports_cycle() {
        let mut tree = PhyloTree::new();
        let root = tree.insert_node(NodeData::default(), None);
        let left = tree.insert_node(NodeData::default(), Some(root));
        let right = tree.insert_node(NodeData::default(), Some(root));
        let shared = tree.insert_node(leaf_data("shared"), Some(left));
        tree.arena.get_mut(right).unwrap().children.push(shared);

        let err = tree.validate().unwrap_err();
        assert!(matches!(err, TreeError::CycleDetected(_)));
    }

    #[test]
    fn given_orphaned_subgraph_when_validating_then_reports_unreachable() {
        let mut tree = PhyloTree::new();
        let root = tree.insert_node(NodeData::default(), None);
        tree.insert_node(leaf_data("a"), Some(root));
        let orphan = tree.insert_node(leaf_data("orphan"), Some(root));
        // Detach the orphan from the root's child list and close a loop on itself
        tree.arena.get_mut(root).unwrap().children.retain(|&c| c != orphan);
        tree.arena.get_mut(orphan).unwrap().parent = Some(orphan);

        let err = tree.validate().unwrap_err();
        assert!(matches!(err, TreeError::Unreachable(_)));
    }

    #[test]
    fn given_leaf_when_walking_path_to_root_then_edges_are_root_first() {
        let mut tree = PhyloTree::new();
        let root = tree.insert_node(NodeData::default(), None);
        let inner = tree.insert_node(NodeData::default(), Some(root));
        let leaf = tree.insert_node(leaf_data("a"), Some(inner));

        assert_eq!(tree.path_to_root(leaf), vec![inner, leaf]);
        assert!(tree.path_to_root(root).is_empty());
    }
}
