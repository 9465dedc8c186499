use thiserror::Error;

/// Structural and input errors.
///
/// Tree shape invariants (single root, acyclicity, connectivity) are checked
/// once at load time; traversals never re-discover them.
#[derive(Error, Debug)]
pub enum TreeError {
    #[error("tree has no root node")]
    MissingRoot,

    #[error("multiple root nodes found: {0} and {1}")]
    MultipleRoots(String, String),

    #[error("cycle detected at node {0}")]
    CycleDetected(String),

    #[error("node {0} is not reachable from the root")]
    Unreachable(String),

    #[error("negative branch length {length} on node {node}")]
    NegativeBranchLength { node: String, length: f64 },

    #[error("syntax error at byte {position}: {reason}")]
    Syntax { position: usize, reason: String },

    #[error("invalid trait metadata at line {line}: {reason}")]
    InvalidMetadata { line: usize, reason: String },

    #[error("no tree found in input")]
    EmptyInput,

    #[error("failed to read or write tree file: {0}")]
    Io(#[from] std::io::Error),
}

pub type TreeResult<T> = Result<T, TreeError>;

/// Trait analysis errors.
///
/// Raised lazily, exactly where a value is needed, so trunk scores computed
/// beforehand stay valid.
#[derive(Error, Debug)]
pub enum TraitError {
    #[error("node {node} has no value for feature '{feature}'")]
    MissingTrait { node: String, feature: String },

    #[error("feature '{feature}' is absent from the tree metadata")]
    UnknownFeature { feature: String },
}

pub type TraitResult<T> = Result<T, TraitError>;
