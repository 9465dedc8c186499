use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, instrument};

use crate::errors::{TreeError, TreeResult};
use crate::model::{NodeId, PhyloTree};

/// Reads a trait metadata file mapping node labels to discrete values.
///
/// One `label<TAB>value` pair per line; lines starting with `#` and blank
/// lines are skipped. Any whitespace separates the two fields when no tab is
/// present. Later entries override earlier ones for the same label.
#[instrument(level = "debug")]
pub fn load_trait_map(path: &Path) -> TreeResult<BTreeMap<String, String>> {
    let content = fs::read_to_string(path)?;
    parse_trait_map(&content)
}

pub fn parse_trait_map(content: &str) -> TreeResult<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (label, value) = line
            .split_once('\t')
            .or_else(|| line.split_once(char::is_whitespace))
            .ok_or_else(|| TreeError::InvalidMetadata {
                line: index + 1,
                reason: format!("expected 'label<TAB>value', got '{raw}'"),
            })?;
        let (label, value) = (label.trim(), value.trim());
        if value.is_empty() {
            return Err(TreeError::InvalidMetadata {
                line: index + 1,
                reason: format!("empty trait value for '{label}'"),
            });
        }
        map.insert(label.to_string(), value.to_string());
    }
    Ok(map)
}

/// Stores the mapped values on matching nodes under `feature`.
///
/// Returns how many nodes received a value; labels without a matching node
/// are ignored, nodes without an entry keep whatever the tree file supplied.
#[instrument(level = "debug", skip(tree, values))]
pub fn apply_trait_map(
    tree: &mut PhyloTree,
    feature: &str,
    values: &BTreeMap<String, String>,
) -> usize {
    let matched: Vec<(NodeId, String)> = tree
        .nodes()
        .filter_map(|(idx, node)| {
            node.data
                .label
                .as_ref()
                .and_then(|label| values.get(label))
                .map(|value| (idx, value.clone()))
        })
        .collect();
    let applied = matched.len();
    for (idx, value) in matched {
        tree.set_annotation(idx, feature, value);
    }
    debug!(feature, applied, "applied trait metadata");
    applied
}
