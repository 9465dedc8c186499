//! CLI-level errors (wraps library errors)

use thiserror::Error;

use crate::errors::{TraitError, TreeError};
use crate::exitcode;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Tree(#[from] TreeError),

    #[error("{0}")]
    Trait(#[from] TraitError),

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("{0}")]
    Usage(String),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => exitcode::USAGE,
            CliError::Tree(e) => match e {
                TreeError::Io(_) => exitcode::IOERR,
                _ => exitcode::DATAERR,
            },
            CliError::Trait(_) => exitcode::DATAERR,
            CliError::Config(_) => exitcode::CONFIG,
        }
    }
}
