use std::cmp::Reverse;
use std::collections::HashMap;

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::model::{NodeId, PhyloTree};

/// Scores every edge with the number of leaf-to-root walks that traverse it.
///
/// For each leaf the scorer follows parent pointers up to the root and
/// increments the trunk counter of every edge on the way. Afterwards each
/// edge's count equals the number of leaves in the subtree under its child
/// node, independent of the order leaves were processed in. Counters are
/// zeroed first, so repeated scoring runs produce identical results.
#[derive(Debug, Default)]
pub struct TrunkScorer {
    parallel: bool,
}

impl TrunkScorer {
    pub fn new() -> Self {
        Self { parallel: false }
    }

    /// Shards the leaf walks across threads; per-worker counts are merged by
    /// addition before a single write pass, never updated in place.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Runs the scoring pass and returns the number of leaves walked.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn score(&self, tree: &mut PhyloTree) -> usize {
        tree.reset_trunk();
        let leaves: Vec<NodeId> = tree.leaves().collect();
        if self.parallel {
            Self::score_parallel(tree, &leaves);
        } else {
            Self::score_serial(tree, &leaves);
        }
        debug!(leaves = leaves.len(), edges = tree.num_edges(), "trunk counters written");
        leaves.len()
    }

    fn score_serial(tree: &mut PhyloTree, leaves: &[NodeId]) {
        for &leaf in leaves {
            let mut current = leaf;
            while let Some(parent) = tree.parent(current) {
                if let Some(node) = tree.node_mut(current) {
                    node.data.trunk += 1;
                }
                current = parent;
            }
        }
    }

    fn score_parallel(tree: &mut PhyloTree, leaves: &[NodeId]) {
        let shared: &PhyloTree = tree;
        let totals: HashMap<NodeId, u64> = leaves
            .par_iter()
            .fold(HashMap::new, |mut counts, &leaf| {
                let mut current = leaf;
                while let Some(parent) = shared.parent(current) {
                    *counts.entry(current).or_insert(0) += 1;
                    current = parent;
                }
                counts
            })
            .reduce(HashMap::new, |mut merged, partial| {
                for (node, count) in partial {
                    *merged.entry(node).or_insert(0) += count;
                }
                merged
            });

        for (idx, count) in totals {
            if let Some(node) = tree.node_mut(idx) {
                node.data.trunk += count;
            }
        }
    }
}

/// The dominant root-to-leaf path of a scored tree.
///
/// Stored as the root-first node sequence; the edges are the non-root
/// entries, each edge identified by its child node. A single-node tree has a
/// path of one node and no edges.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrunkPath {
    nodes: Vec<NodeId>,
}

impl TrunkPath {
    /// All nodes on the path, root first.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// The path's edges, identified by their child nodes, root first.
    pub fn edges(&self) -> &[NodeId] {
        if self.nodes.len() > 1 {
            &self.nodes[1..]
        } else {
            &[]
        }
    }

    /// Number of edges on the path.
    pub fn len(&self) -> usize {
        self.edges().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn root(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    /// The terminal node; always a leaf for paths produced by [extract_trunk].
    pub fn leaf(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }

    /// Sum of the branch lengths along the path.
    pub fn total_length(&self, tree: &PhyloTree) -> f64 {
        self.edges().iter().map(|&node| tree.branch_length(node)).sum()
    }
}

/// Extracts the trunk by greedy descent over the scored edges.
///
/// Starting at the root, descend into the child edge with the greatest trunk
/// score until a leaf is reached. Since the score equals the descendant-leaf
/// count, this always follows the subtree holding the most leaves. Equal
/// scores break towards the lowest node id, a fixed rule rather than
/// whatever order children happen to be stored in.
#[instrument(level = "debug", skip(tree))]
pub fn extract_trunk(tree: &PhyloTree) -> TrunkPath {
    let Some(root) = tree.root() else {
        return TrunkPath::default();
    };
    let mut nodes = vec![root];
    let mut current = root;
    while let Some(next) = dominant_child(tree, current) {
        nodes.push(next);
        current = next;
    }
    TrunkPath { nodes }
}

fn dominant_child(tree: &PhyloTree, idx: NodeId) -> Option<NodeId> {
    tree.children(idx).iter().copied().max_by_key(|&child| {
        tree.node(child)
            .map(|node| (node.data.trunk, Reverse(node.data.id)))
            .unwrap_or((0, Reverse(usize::MAX)))
    })
}
