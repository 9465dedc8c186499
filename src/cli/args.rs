//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};
use clap_complete::Shell;

use crate::TreeFormat;

/// Reconstruct the phylogenetic trunk and trace discrete-trait evolution along it
#[derive(Parser, Debug)]
#[command(name = "phylotrunk")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Generate shell completions
    #[arg(long = "generate", value_enum)]
    pub generator: Option<Shell>,

    /// Enable debug logging; repeat for more verbosity
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score every edge with its trunk traversal count and save the annotated tree
    Score {
        /// Input tree file
        #[arg(short = 'i', long = "in", value_hint = ValueHint::FilePath)]
        input_file: PathBuf,

        /// Input tree file format
        #[arg(long = "input-format", value_enum)]
        input_format: Option<TreeFormat>,

        /// Output tree file (default: <input dir>/<label>_out.tree)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Label for the data contained in the tree
        #[arg(short, long, default_value = "")]
        label: String,

        /// Shard the leaf walks across threads
        #[arg(long)]
        parallel: bool,
    },

    /// Count switches and permanence of a discrete trait along the trunk
    Evolution {
        /// Input tree file
        #[arg(short = 'i', long = "in", value_hint = ValueHint::FilePath)]
        input_file: PathBuf,

        /// Input tree file format
        #[arg(long = "input-format", value_enum)]
        input_format: Option<TreeFormat>,

        /// Discrete trait to monitor for trunk switches
        #[arg(long)]
        feature: Option<String>,

        /// Tab-separated file mapping node labels to trait values
        #[arg(long, value_hint = ValueHint::FilePath)]
        traits: Option<PathBuf>,

        /// Output prefix for the CSV reports (default: <input dir>/<label>_<feature>)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Label for the data contained in the tree
        #[arg(short, long, default_value = "")]
        label: String,
    },

    /// Show the scored topology as a tree
    Tree {
        /// Input tree file
        #[arg(short = 'i', long = "in", value_hint = ValueHint::FilePath)]
        input_file: PathBuf,

        /// Input tree file format
        #[arg(long = "input-format", value_enum)]
        input_format: Option<TreeFormat>,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init,

    /// Show config path
    Path,
}
