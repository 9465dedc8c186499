use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::Settings;
use crate::display::ToTermTree;
use crate::evolution::TraitEvolutionAnalyzer;
use crate::trunk::{extract_trunk, TrunkScorer};
use crate::{load_tree, metadata, report, writer, TreeFormat};

pub fn execute_command(cli: &Cli, settings: &Settings) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Score {
            input_file,
            input_format,
            out,
            label,
            parallel,
        }) => _score(input_file, *input_format, out.as_deref(), label, *parallel, settings),
        Some(Commands::Evolution {
            input_file,
            input_format,
            feature,
            traits,
            out,
            label,
        }) => _evolution(
            input_file,
            *input_format,
            feature.as_deref(),
            traits.as_deref(),
            out.as_deref(),
            label,
            settings,
        ),
        Some(Commands::Tree {
            input_file,
            input_format,
        }) => _tree(input_file, *input_format, settings),
        Some(Commands::Config { command }) => _config(command, settings),
        None => Ok(()),
    }
}

#[instrument(skip(settings))]
fn _score(
    input_file: &Path,
    input_format: Option<TreeFormat>,
    out: Option<&Path>,
    label: &str,
    parallel: bool,
    settings: &Settings,
) -> CliResult<()> {
    let format = input_format.unwrap_or(settings.input_format);
    debug!(input = %input_file.display(), %format, "loading tree");

    let mut tree = load_tree(input_file, format)?;
    let walked = TrunkScorer::new().with_parallel(parallel).score(&mut tree);
    info!(leaves = walked, edges = tree.num_edges(), "trunk traversal counts computed");

    let out_path = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input_dir(input_file).join(format!("{label}_out.tree")));
    writer::write_tree_file(&out_path, &tree, TreeFormat::Nexus)?;
    output::success(&format!("featured tree saved in: {}", out_path.display()));
    Ok(())
}

#[instrument(skip(settings))]
fn _evolution(
    input_file: &Path,
    input_format: Option<TreeFormat>,
    feature: Option<&str>,
    traits: Option<&Path>,
    out: Option<&Path>,
    label: &str,
    settings: &Settings,
) -> CliResult<()> {
    let format = input_format.unwrap_or(settings.input_format);
    let feature = feature
        .map(str::to_string)
        .or_else(|| settings.feature.clone())
        .ok_or_else(|| {
            CliError::Usage("no feature given: pass --feature or set it in the config".to_string())
        })?;
    debug!(input = %input_file.display(), %format, feature = %feature, "loading tree");

    let mut tree = load_tree(input_file, format)?;
    if let Some(traits_path) = traits {
        let values = metadata::load_trait_map(traits_path)?;
        metadata::apply_trait_map(&mut tree, &feature, &values);
    }

    TrunkScorer::new().score(&mut tree);
    let trunk = extract_trunk(&tree);
    debug!(edges = trunk.len(), "trunk extracted");

    let evolution = TraitEvolutionAnalyzer::new(&tree).analyze(&trunk, &feature)?;
    info!(
        feature = %feature,
        switches = evolution.switches,
        runs = evolution.runs.len(),
        "trait evolution computed"
    );

    let prefix = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input_dir(input_file).join(format!("{label}_{feature}")));
    let switches_csv = PathBuf::from(format!("{}_switches.csv", prefix.display()));
    let summary_csv = PathBuf::from(format!("{}_summary.csv", prefix.display()));
    report::write_switches_csv(&switches_csv, &tree, &trunk, &feature)?;
    report::write_summary_csv(&summary_csv, &evolution)?;

    output::success(&format!(
        "the discrete trait [{feature}] shows {} switches on the trunk",
        evolution.switches
    ));
    output::detail(&evolution.summary());
    output::success(&format!(
        "reports saved in: {} and {}",
        switches_csv.display(),
        summary_csv.display()
    ));
    Ok(())
}

#[instrument(skip(settings))]
fn _tree(input_file: &Path, input_format: Option<TreeFormat>, settings: &Settings) -> CliResult<()> {
    let format = input_format.unwrap_or(settings.input_format);
    let mut tree = load_tree(input_file, format)?;
    TrunkScorer::new().score(&mut tree);
    println!("{}", tree.to_term_tree());
    Ok(())
}

fn _config(command: &ConfigCommands, settings: &Settings) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let rendered = toml::to_string(settings)
                .map_err(|e| CliError::Usage(format!("cannot render config: {e}")))?;
            output::header("merged configuration");
            output::info(&rendered);
        }
        ConfigCommands::Init => {
            let Some(path) = Settings::global_config_path() else {
                return Err(CliError::Usage("no config directory available".to_string()));
            };
            if path.exists() {
                output::warning(&format!("config already exists: {}", path.display()));
                return Ok(());
            }
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(crate::errors::TreeError::Io)?;
            }
            fs::write(&path, Settings::template()).map_err(crate::errors::TreeError::Io)?;
            output::success(&format!("config template created: {}", path.display()));
        }
        ConfigCommands::Path => match Settings::global_config_path() {
            Some(path) => output::info(&path.display()),
            None => output::warning("no config directory available"),
        },
    }
    Ok(())
}

fn input_dir(input_file: &Path) -> PathBuf {
    input_file
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
