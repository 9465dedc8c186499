use std::fs;
use std::path::Path;
use tracing::{debug, instrument};

use crate::errors::TreeResult;
use crate::model::{NodeId, PhyloTree};
use crate::TreeFormat;

/// Serializes the tree to Newick with every edge annotated.
///
/// Each non-root node carries its parent edge's data as a BEAST-style
/// comment, e.g. `a[&location=Europe,trunk=3]:1.5`, so the trunk scores
/// survive re-serialization. Iterative, one frame per open clade.
pub fn to_newick(tree: &PhyloTree) -> String {
    let mut out = String::with_capacity(tree.num_nodes() * 24);
    let Some(root) = tree.root() else {
        out.push(';');
        return out;
    };

    let mut stack: Vec<(NodeId, usize)> = vec![(root, 0)];
    while let Some(&(node, visited)) = stack.last() {
        let children = tree.children(node);
        if children.is_empty() {
            push_node(&mut out, tree, node);
            stack.pop();
        } else if visited < children.len() {
            out.push(if visited == 0 { '(' } else { ',' });
            if let Some(frame) = stack.last_mut() {
                frame.1 += 1;
            }
            stack.push((children[visited], 0));
        } else {
            out.push(')');
            push_node(&mut out, tree, node);
            stack.pop();
        }
    }
    out.push(';');
    out
}

/// Serializes the tree as a Nexus file with TAXA and TREES blocks.
pub fn to_nexus(tree: &PhyloTree) -> String {
    let taxa: Vec<String> = tree
        .leaves()
        .filter_map(|leaf| tree.node(leaf).and_then(|node| node.data.label.clone()))
        .map(|label| escape_label(&label))
        .collect();

    let mut out = String::new();
    out.push_str("#NEXUS\n\n");
    out.push_str("BEGIN TAXA;\n");
    out.push_str(&format!("\tDIMENSIONS NTAX={};\n", taxa.len()));
    out.push_str("\tTAXLABELS\n");
    for taxon in &taxa {
        out.push_str(&format!("\t\t{taxon}\n"));
    }
    out.push_str("\t;\nEND;\n\n");
    out.push_str("BEGIN TREES;\n");
    out.push_str(&format!(
        "\tTREE {} = [&R] {}\n",
        tree.name().unwrap_or("tree1"),
        to_newick(tree)
    ));
    out.push_str("END;\n");
    out
}

/// Writes the annotated tree to `path` in the requested format.
#[instrument(level = "debug", skip(tree))]
pub fn write_tree_file(path: &Path, tree: &PhyloTree, format: TreeFormat) -> TreeResult<()> {
    let content = match format {
        TreeFormat::Newick => {
            let mut newick = to_newick(tree);
            newick.push('\n');
            newick
        }
        TreeFormat::Nexus => to_nexus(tree),
    };
    fs::write(path, content)?;
    debug!(path = %path.display(), "tree written");
    Ok(())
}

/// Appends a node's label, edge annotations and branch length.
fn push_node(out: &mut String, tree: &PhyloTree, idx: NodeId) {
    let Some(node) = tree.node(idx) else {
        return;
    };
    if let Some(label) = &node.data.label {
        out.push_str(&escape_label(label));
    }

    let is_root = tree.parent(idx).is_none();
    let mut fields: Vec<String> = node
        .data
        .annotations
        .iter()
        .filter(|(key, _)| key.as_str() != "trunk")
        .map(|(key, value)| format!("{key}={}", quote_value(value)))
        .collect();
    if !is_root {
        fields.push(format!("trunk={}", node.data.trunk));
    }
    if !fields.is_empty() {
        out.push_str(&format!("[&{}]", fields.join(",")));
    }

    if !is_root {
        out.push(':');
        out.push_str(&node.data.branch_length.to_string());
    }
}

/// Single-quotes a label when it contains Newick delimiters.
fn escape_label(label: &str) -> String {
    let needs_quoting = label
        .chars()
        .any(|c| c.is_whitespace() || "()[]{}:;,'".contains(c));
    if needs_quoting {
        format!("'{}'", label.replace('\'', "''"))
    } else {
        label.to_string()
    }
}

/// Double-quotes an annotation value when it contains delimiters.
fn quote_value(value: &str) -> String {
    let needs_quoting = value
        .chars()
        .any(|c| c.is_whitespace() || ",=[]{}();:".contains(c));
    if needs_quoting {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}
