use std::collections::{HashSet, VecDeque};
use tracing::instrument;

use crate::errors::{TreeError, TreeResult};
use crate::model::{NodeData, NodeId, PhyloTree};

/// Incremental construction facade for [PhyloTree].
///
/// Parsers create bare nodes top-down and fill in labels, branch lengths and
/// annotations as the input reveals them. `build` runs the one-time
/// structural validation and assigns level-order ids, mirroring the UID
/// labelling pass the annotated output is keyed on.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    tree: PhyloTree,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            tree: PhyloTree::new(),
        }
    }

    /// Adds an unlabelled node under `parent` (a root when `parent` is None).
    pub fn add_node(&mut self, parent: Option<NodeId>) -> NodeId {
        self.tree.insert_node(NodeData::default(), parent)
    }

    pub fn set_label(&mut self, node: NodeId, label: impl Into<String>) {
        if let Some(n) = self.tree.node_mut(node) {
            n.data.label = Some(label.into());
        }
    }

    pub fn set_branch_length(&mut self, node: NodeId, length: f64) -> TreeResult<()> {
        if length < 0.0 {
            return Err(TreeError::NegativeBranchLength {
                node: self.tree.display_name(node),
                length,
            });
        }
        if let Some(n) = self.tree.node_mut(node) {
            n.data.branch_length = length;
        }
        Ok(())
    }

    pub fn set_annotation(&mut self, node: NodeId, key: &str, value: impl Into<String>) {
        self.tree.set_annotation(node, key, value);
    }

    /// Validates the topology and returns the finished tree.
    #[instrument(level = "debug", skip(self))]
    pub fn build(mut self) -> TreeResult<PhyloTree> {
        if self.tree.num_nodes() == 0 {
            return Err(TreeError::EmptyInput);
        }
        // Ids first, so validation errors name nodes by their final id
        self.assign_ids();
        self.tree.validate()?;
        Ok(self.tree)
    }

    /// Assigns numeric ids in level order, root first. The visited set keeps
    /// the walk finite on input that validation rejects afterwards.
    fn assign_ids(&mut self) {
        let Some(root) = self.tree.root() else {
            return;
        };
        let mut queue = VecDeque::from([root]);
        let mut seen = HashSet::new();
        let mut next_id = 0;
        while let Some(idx) = queue.pop_front() {
            if !seen.insert(idx) {
                continue;
            }
            if let Some(node) = self.tree.node_mut(idx) {
                node.data.id = next_id;
                next_id += 1;
            }
            queue.extend(self.tree.children(idx).iter().copied());
        }
    }
}
