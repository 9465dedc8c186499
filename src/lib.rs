use std::fmt;
use std::fs;
use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub mod builder;
pub mod cli;
pub mod config;
pub mod display;
pub mod errors;
pub mod evolution;
pub mod exitcode;
pub mod metadata;
pub mod model;
pub mod newick;
pub mod nexus;
pub mod report;
pub mod trunk;
pub mod util;
pub mod writer;

use crate::errors::TreeResult;
use crate::model::PhyloTree;
use crate::trunk::{extract_trunk, TrunkPath, TrunkScorer};

/// Supported tree file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeFormat {
    Newick,
    Nexus,
}

impl fmt::Display for TreeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeFormat::Newick => write!(f, "newick"),
            TreeFormat::Nexus => write!(f, "nexus"),
        }
    }
}

/// Reads and validates a tree file in the given format.
pub fn load_tree(path: &Path, format: TreeFormat) -> TreeResult<PhyloTree> {
    let content = fs::read_to_string(path)?;
    load_tree_from_str(&content, format)
}

/// Parses and validates a tree from an in-memory string.
pub fn load_tree_from_str(input: &str, format: TreeFormat) -> TreeResult<PhyloTree> {
    match format {
        TreeFormat::Newick => newick::parse_newick(input),
        TreeFormat::Nexus => nexus::parse_nexus(input),
    }
}

/// Scores every edge, then extracts the dominant root-to-leaf path.
pub fn score_and_extract(tree: &mut PhyloTree) -> TrunkPath {
    TrunkScorer::new().score(tree);
    extract_trunk(tree)
}
