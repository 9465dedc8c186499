use itertools::Itertools;
use tracing::{debug, instrument};

use crate::errors::{TraitError, TraitResult};
use crate::model::{NodeId, PhyloTree};
use crate::trunk::TrunkPath;

/// One maximal stretch of the trunk over which a trait value persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct TraitRun {
    pub value: String,
    /// Cumulative branch length spanned by the run, in the tree's units
    pub duration: f64,
}

/// Switch and permanence statistics of a discrete trait along the trunk.
#[derive(Debug, Clone, PartialEq)]
pub struct TraitEvolution {
    pub feature: String,
    pub switches: usize,
    pub runs: Vec<TraitRun>,
}

impl TraitEvolution {
    /// Sum of all run durations; equals the trunk's total branch length.
    pub fn total_duration(&self) -> f64 {
        self.runs.iter().map(|run| run.duration).sum()
    }

    /// Compact one-line rendering of the run sequence.
    pub fn summary(&self) -> String {
        self.runs
            .iter()
            .map(|run| format!("{} ({:.4})", run.value, run.duration))
            .join(" -> ")
    }
}

/// Walks the trunk once, root to leaf, counting trait switches and
/// accumulating permanence runs.
///
/// The trait sequence is read at the child node of each trunk edge; the root
/// itself needs no value. Each edge's length is attributed to the run its
/// child node belongs to, so run durations always add up to the trunk's
/// total branch length. An unknown feature fails before any traversal; a
/// visited node without a value fails at that node, leaving previously
/// computed trunk scores intact.
pub struct TraitEvolutionAnalyzer<'t> {
    tree: &'t PhyloTree,
}

impl<'t> TraitEvolutionAnalyzer<'t> {
    pub fn new(tree: &'t PhyloTree) -> Self {
        Self { tree }
    }

    #[instrument(level = "debug", skip(self, path))]
    pub fn analyze(&self, path: &TrunkPath, feature: &str) -> TraitResult<TraitEvolution> {
        if !self.tree.has_feature(feature) {
            return Err(TraitError::UnknownFeature {
                feature: feature.to_string(),
            });
        }

        let mut runs: Vec<TraitRun> = Vec::new();
        let mut switches = 0;

        if path.edges().is_empty() {
            // Single-node tree: the root doubles as the leaf and supplies the
            // one zero-duration run.
            if let Some(node) = path.root().or_else(|| self.tree.root()) {
                runs.push(TraitRun {
                    value: self.trait_value(node, feature)?,
                    duration: 0.0,
                });
            }
            return Ok(TraitEvolution {
                feature: feature.to_string(),
                switches,
                runs,
            });
        }

        for &node in path.edges() {
            let value = self.trait_value(node, feature)?;
            let length = self.tree.branch_length(node);
            match runs.last_mut() {
                Some(run) if run.value == value => run.duration += length,
                Some(_) => {
                    switches += 1;
                    runs.push(TraitRun {
                        value,
                        duration: length,
                    });
                }
                None => runs.push(TraitRun {
                    value,
                    duration: length,
                }),
            }
        }

        debug!(feature, switches, runs = runs.len(), "trait evolution computed");
        Ok(TraitEvolution {
            feature: feature.to_string(),
            switches,
            runs,
        })
    }

    fn trait_value(&self, node: NodeId, feature: &str) -> TraitResult<String> {
        self.tree
            .annotation(node, feature)
            .map(str::to_string)
            .ok_or_else(|| TraitError::MissingTrait {
                node: self.tree.display_name(node),
                feature: feature.to_string(),
            })
    }
}
