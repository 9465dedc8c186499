//! Integration tests for Settings loading
//!
//! Precedence: compiled defaults, then the global config file, then
//! `PHYLOTRUNK_*` environment variables. These tests run without a global
//! config file, so they exercise defaults and env overrides.

use phylotrunk::config::Settings;
use phylotrunk::TreeFormat;

#[test]
fn given_no_sources_when_loading_then_compiled_defaults_apply() {
    let settings = Settings::default();
    assert_eq!(settings.input_format, TreeFormat::Newick);
    assert!(settings.feature.is_none());
}

#[test]
fn given_template_when_parsing_then_round_trips_to_defaults() {
    let parsed: Settings = toml::from_str(&Settings::template()).expect("parse template");
    assert_eq!(parsed, Settings::default());
}

#[test]
fn given_env_overrides_when_loading_then_they_win() {
    std::env::set_var("PHYLOTRUNK_INPUT_FORMAT", "nexus");
    std::env::set_var("PHYLOTRUNK_FEATURE", "location");

    let settings = Settings::load().expect("load settings");
    assert_eq!(settings.input_format, TreeFormat::Nexus);
    assert_eq!(settings.feature.as_deref(), Some("location"));

    std::env::remove_var("PHYLOTRUNK_INPUT_FORMAT");
    std::env::remove_var("PHYLOTRUNK_FEATURE");
}

#[test]
fn given_config_path_when_queried_then_ends_with_app_file() {
    if let Some(path) = Settings::global_config_path() {
        assert!(path.ends_with("phylotrunk.toml") || path.to_string_lossy().contains("phylotrunk"));
    }
}
