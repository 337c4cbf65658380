//! Configuration resolution and graceful degradation tests
//!
//! Tests that manipulate GAMECAT_* environment variables are marked #[serial]
//! so they never run concurrently.

use gamecat_common::config::{
    ConfigResolver, ConfigSource, TomlConfig, YearImputation, CONFIG_ENV_VAR, EPIC_PATH_ENV_VAR,
    OUTPUT_DIR_ENV_VAR, STEAM_PATH_ENV_VAR,
};
use gamecat_common::Error;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn clear_env() {
    env::remove_var(CONFIG_ENV_VAR);
    env::remove_var(STEAM_PATH_ENV_VAR);
    env::remove_var(EPIC_PATH_ENV_VAR);
    env::remove_var(OUTPUT_DIR_ENV_VAR);
}

#[test]
#[serial]
fn test_cli_path_takes_precedence_over_env() {
    clear_env();
    env::set_var(CONFIG_ENV_VAR, "/tmp/gamecat-from-env.toml");

    let resolver = ConfigResolver::new(Some(PathBuf::from("/tmp/gamecat-from-cli.toml")));
    assert_eq!(
        resolver.locate(),
        Some(PathBuf::from("/tmp/gamecat-from-cli.toml"))
    );

    clear_env();
}

#[test]
#[serial]
fn test_env_var_used_without_cli_path() {
    clear_env();
    env::set_var(CONFIG_ENV_VAR, "/tmp/gamecat-from-env.toml");

    let resolver = ConfigResolver::new(None);
    assert_eq!(
        resolver.locate(),
        Some(PathBuf::from("/tmp/gamecat-from-env.toml"))
    );

    clear_env();
}

#[test]
#[serial]
fn test_missing_config_file_falls_back_to_defaults() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("does-not-exist.toml");

    let config = ConfigResolver::new(Some(missing)).load().unwrap();
    assert_eq!(config.model.clusters, 40);
    assert_eq!(config.pipeline.steam_min_reviews, 500);
}

#[test]
#[serial]
fn test_resolve_reports_missing_file_for_deferred_warning() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("does-not-exist.toml");

    let (config, source) = ConfigResolver::new(Some(missing.clone())).resolve().unwrap();
    assert_eq!(source, ConfigSource::MissingFile(missing));
    assert_eq!(config.model.clusters, 40);

    let present = temp_dir.path().join("config.toml");
    fs::write(&present, "[model]\nclusters = 12\n").unwrap();
    let (config, source) = ConfigResolver::new(Some(present.clone())).resolve().unwrap();
    assert_eq!(source, ConfigSource::File(present));
    assert_eq!(config.model.clusters, 12);
}

#[test]
#[serial]
fn test_config_file_values_and_env_overrides() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
        [inputs]
        steam_path = "/data/steam.csv"
        epic_path = "/data/epic.csv"

        [pipeline]
        steam_min_reviews = 100
        year_imputation = "median"

        [model]
        clusters = 8
        "#,
    )
    .unwrap();

    env::set_var(EPIC_PATH_ENV_VAR, "/override/epic.csv");
    let config = ConfigResolver::new(Some(path)).load().unwrap();

    assert_eq!(config.inputs.steam_path, PathBuf::from("/data/steam.csv"));
    assert_eq!(config.inputs.epic_path, PathBuf::from("/override/epic.csv"));
    assert_eq!(config.pipeline.steam_min_reviews, 100);
    assert_eq!(config.pipeline.year_imputation, YearImputation::Median);
    assert_eq!(config.model.clusters, 8);
    assert_eq!(config.model.neighbors, 7);

    clear_env();
}

#[test]
#[serial]
fn test_malformed_config_file_is_fatal() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(&path, "[model\nclusters = ").unwrap();

    let result = ConfigResolver::new(Some(path)).load();
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_invalid_values_rejected_on_load() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(&path, "[model]\nneighbors = 0\n").unwrap();

    let result = ConfigResolver::new(Some(path)).load();
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_default_config_round_trips_through_toml() {
    let config = TomlConfig::default();
    let text = toml::to_string(&config).unwrap();
    let parsed: TomlConfig = toml::from_str(&text).unwrap();
    assert_eq!(parsed.model.clusters, config.model.clusters);
    assert_eq!(parsed.outputs.dir, config.outputs.dir);
}
