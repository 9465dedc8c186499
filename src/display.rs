use termtree::Tree;

use crate::model::{NodeId, PhyloTree};

/// Conversion into a renderable terminal tree.
pub trait ToTermTree {
    fn to_term_tree(&self) -> Tree<String>;
}

impl ToTermTree for PhyloTree {
    fn to_term_tree(&self) -> Tree<String> {
        let Some(root) = self.root() else {
            return Tree::new("(empty tree)".to_string());
        };

        fn build(tree: &PhyloTree, idx: NodeId, out: &mut Tree<String>) {
            for &child in tree.children(idx) {
                let mut subtree = Tree::new(node_line(tree, child));
                build(tree, child, &mut subtree);
                out.push(subtree);
            }
        }

        let mut tree = Tree::new(node_line(self, root));
        build(self, root, &mut tree);
        tree
    }
}

/// One line per node: name, trunk score of the parent edge, branch length.
fn node_line(tree: &PhyloTree, idx: NodeId) -> String {
    let name = tree.display_name(idx);
    if tree.parent(idx).is_none() {
        name
    } else {
        format!(
            "{} [trunk={}] :{}",
            name,
            tree.trunk(idx),
            tree.branch_length(idx)
        )
    }
}
