//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/phylotrunk/phylotrunk.toml`
//! 3. Environment variables: `PHYLOTRUNK_*` prefix

use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::TreeFormat;

/// Runtime settings filled in where the command line stays silent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Tree file format assumed when `--input-format` is not given
    pub input_format: TreeFormat,
    /// Discrete trait analyzed when `--feature` is not given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input_format: TreeFormat::Newick,
            feature: None,
        }
    }
}

impl Settings {
    /// Loads the layered configuration; missing files are not an error.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = Self::global_config_path() {
            builder = builder.add_source(File::from(path).required(false));
        }
        builder = builder.add_source(Environment::with_prefix("PHYLOTRUNK"));
        builder.build()?.try_deserialize()
    }

    /// Path of the global config file, platform dependent.
    pub fn global_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "phylotrunk")
            .map(|dirs| dirs.config_dir().join("phylotrunk.toml"))
    }

    /// TOML template written by `config init`.
    pub fn template() -> String {
        let defaults = Self::default();
        format!(
            "# phylotrunk configuration\n\
             # Tree file format assumed when --input-format is not given\n\
             input_format = \"{}\"\n\
             # Discrete trait analyzed when --feature is not given\n\
             # feature = \"location\"\n",
            defaults.input_format
        )
    }
}
