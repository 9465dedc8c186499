//! Tests for trunk scoring and extraction

use rstest::rstest;

use phylotrunk::model::{NodeId, PhyloTree};
use phylotrunk::newick::parse_newick;
use phylotrunk::score_and_extract;
use phylotrunk::trunk::{extract_trunk, TrunkScorer};
use phylotrunk::util::testing;

const RAGGED: &str = "(((a:1,b:1):1,(c:1,(d:1,e:1):1):1):1,(f:1,g:1):2);";

/// Leaf count below a node, computed independently of the scorer.
fn leaves_below(tree: &PhyloTree, idx: NodeId) -> u64 {
    let children = tree.children(idx);
    if children.is_empty() {
        return 1;
    }
    children.iter().map(|&child| leaves_below(tree, child)).sum()
}

#[rstest]
#[case(false)]
#[case(true)]
fn given_any_tree_when_scoring_then_each_edge_counts_its_subtree_leaves(#[case] parallel: bool) {
    testing::init_test_setup();
    let mut tree = parse_newick(RAGGED).unwrap();
    let walked = TrunkScorer::new().with_parallel(parallel).score(&mut tree);
    assert_eq!(walked, 7);

    let root = tree.root().unwrap();
    for (idx, _) in tree.nodes() {
        if idx == root {
            continue;
        }
        assert_eq!(tree.trunk(idx), leaves_below(&tree, idx));
    }
}

#[test]
fn given_scored_tree_when_summing_root_edges_then_total_equals_leaf_count() {
    let mut tree = parse_newick(RAGGED).unwrap();
    TrunkScorer::new().score(&mut tree);

    let root = tree.root().unwrap();
    let root_sum: u64 = tree.children(root).iter().map(|&c| tree.trunk(c)).sum();
    assert_eq!(root_sum, tree.num_leaves() as u64);
}

#[test]
fn given_repeated_scoring_runs_then_counts_are_identical() {
    let mut tree = parse_newick(RAGGED).unwrap();

    TrunkScorer::new().score(&mut tree);
    let first: Vec<u64> = tree.nodes().map(|(_, n)| n.data.trunk).collect();

    TrunkScorer::new().score(&mut tree);
    let second: Vec<u64> = tree.nodes().map(|(_, n)| n.data.trunk).collect();
    assert_eq!(first, second);

    TrunkScorer::new().with_parallel(true).score(&mut tree);
    let sharded: Vec<u64> = tree.nodes().map(|(_, n)| n.data.trunk).collect();
    assert_eq!(first, sharded);
}

#[test]
fn given_scored_tree_when_extracting_then_path_descends_from_root_to_a_leaf() {
    let mut tree = parse_newick(RAGGED).unwrap();
    let trunk = score_and_extract(&mut tree);

    let first_edge = trunk.edges()[0];
    assert_eq!(tree.parent(first_edge), tree.root());
    assert!(tree.is_leaf(trunk.leaf().unwrap()));

    // trunk scores never increase while descending
    let scores: Vec<u64> = trunk.edges().iter().map(|&e| tree.trunk(e)).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn given_unbalanced_root_when_extracting_then_heavier_subtree_wins() {
    // root with children A (3 leaves) and B (1 leaf)
    let mut tree = parse_newick("((a:1,(b:1,c:1):1):1,d:1);").unwrap();
    let trunk = score_and_extract(&mut tree);

    let root = tree.root().unwrap();
    let children = tree.children(root).to_vec();
    assert_eq!(tree.trunk(children[0]), 3);
    assert_eq!(tree.trunk(children[1]), 1);

    // descend into A, then into A's heavier child (b,c)
    assert_eq!(trunk.edges()[0], children[0]);
    let second_edge = trunk.edges()[1];
    assert_eq!(tree.trunk(second_edge), 2);
    let leaf_name = tree.display_name(trunk.leaf().unwrap());
    assert!(leaf_name == "b" || leaf_name == "c");
}

#[test]
fn given_single_leaf_tree_when_extracting_then_path_has_no_edges() {
    let mut tree = parse_newick("only;").unwrap();
    let trunk = score_and_extract(&mut tree);

    assert!(trunk.is_empty());
    assert_eq!(trunk.len(), 0);
    assert_eq!(trunk.root(), tree.root());
    assert_eq!(trunk.leaf(), tree.root());
}

#[test]
fn given_equal_scores_when_extracting_then_lowest_id_child_wins() {
    // both subtrees hold two leaves; the tie breaks towards the lower id,
    // which level-order assignment gives to the first-parsed child
    let mut tree = parse_newick("((a:1,b:1):1,(c:1,d:1):1);").unwrap();
    let trunk = score_and_extract(&mut tree);

    assert_eq!(tree.display_name(trunk.leaf().unwrap()), "a");
    let first = trunk.edges()[0];
    let second = trunk.edges()[1];
    assert!(tree.node(first).unwrap().data.id < tree.node(second).unwrap().data.id);
}

#[test]
fn given_trunk_path_when_summing_lengths_then_matches_edge_lengths() {
    let mut tree = parse_newick("((a:1.5,b:1.5):0.5,c:4.0);").unwrap();
    let trunk = score_and_extract(&mut tree);

    // trunk follows the two-leaf subtree: 0.5 + 1.5
    assert!((trunk.total_length(&tree) - 2.0).abs() < 1e-9);
}

#[test]
fn given_unscored_tree_when_extracting_then_tie_break_still_deterministic() {
    let tree = parse_newick("((a:1,b:1):1,(c:1,d:1):1);").unwrap();
    let first = extract_trunk(&tree);
    let second = extract_trunk(&tree);
    assert_eq!(first, second);
}
