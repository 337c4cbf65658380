//! Configuration loading and resolution
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `GAMECAT_CONFIG` environment variable
//! 3. Platform config directory (`<config_dir>/gamecat/config.toml`)
//! 4. Compiled defaults (fallback)
//!
//! A missing config file is never fatal: the pipeline warns and continues with
//! compiled defaults. A file that exists but fails to parse is fatal.
//! Individual input/output paths can additionally be overridden through
//! `GAMECAT_STEAM_PATH`, `GAMECAT_EPIC_PATH` and `GAMECAT_OUTPUT_DIR`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const CONFIG_ENV_VAR: &str = "GAMECAT_CONFIG";
pub const STEAM_PATH_ENV_VAR: &str = "GAMECAT_STEAM_PATH";
pub const EPIC_PATH_ENV_VAR: &str = "GAMECAT_EPIC_PATH";
pub const OUTPUT_DIR_ENV_VAR: &str = "GAMECAT_OUTPUT_DIR";

/// Top-level configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub inputs: InputsConfig,

    #[serde(default)]
    pub outputs: OutputsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub pipeline: PipelineParams,

    #[serde(default)]
    pub model: ModelParams,

    /// Optional replacement data tables (embedded tables are used otherwise)
    #[serde(default)]
    pub tables: TablesConfig,
}

/// Source table locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputsConfig {
    /// Review-rich source table (default: ./data/steam_games.csv)
    #[serde(default = "default_steam_path")]
    pub steam_path: PathBuf,

    /// Low-signal source table (default: ./data/epic_games.csv)
    #[serde(default = "default_epic_path")]
    pub epic_path: PathBuf,
}

/// Snapshot output location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputsConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// How a missing release year is filled after fusion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearImputation {
    /// Use `default_release_year`
    Fixed,
    /// Use the median of resolved years, falling back to `default_release_year`
    Median,
}

/// Preprocessing, fusion and curation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineParams {
    /// Popularity floor for the review-rich source (default: 500 reviews)
    #[serde(default = "default_steam_min_reviews")]
    pub steam_min_reviews: u64,

    /// Year used when no source supplies a parsable release date (default: 2020)
    #[serde(default = "default_release_year")]
    pub default_release_year: i32,

    /// Missing-year strategy (default: fixed)
    #[serde(default = "default_year_imputation")]
    pub year_imputation: YearImputation,

    /// Drop records present only in the low-signal source (default: true)
    #[serde(default = "default_low_signal_cleanup")]
    pub low_signal_cleanup: bool,

    /// Popularity quantile above which a title counts as a hit (default: 0.5)
    #[serde(default = "default_hit_quantile")]
    pub hit_quantile: f64,
}

/// Clustering and retrieval parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParams {
    /// Number of clusters (default: 40)
    #[serde(default = "default_clusters")]
    pub clusters: usize,

    /// Seed for centroid seeding and validation sampling (default: 42)
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Independent k-means restarts; lowest inertia wins (default: 10)
    #[serde(default = "default_n_init")]
    pub n_init: usize,

    /// Iteration cap per restart (default: 300)
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Convergence tolerance on centroid movement (default: 1e-4)
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Cohesion score sample size (default: 2000)
    #[serde(default = "default_silhouette_sample")]
    pub silhouette_sample: usize,

    /// Neighbors returned per query, including the query itself (default: 7)
    #[serde(default = "default_neighbors")]
    pub neighbors: usize,
}

/// Optional data table overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TablesConfig {
    #[serde(default)]
    pub taxonomy: Option<PathBuf>,

    #[serde(default)]
    pub curation: Option<PathBuf>,
}

// Default value functions
fn default_steam_path() -> PathBuf {
    PathBuf::from("./data/steam_games.csv")
}

fn default_epic_path() -> PathBuf {
    PathBuf::from("./data/epic_games.csv")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./out")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_steam_min_reviews() -> u64 {
    500
}

fn default_release_year() -> i32 {
    2020
}

fn default_year_imputation() -> YearImputation {
    YearImputation::Fixed
}

fn default_low_signal_cleanup() -> bool {
    true
}

fn default_hit_quantile() -> f64 {
    0.5
}

fn default_clusters() -> usize {
    40
}

fn default_seed() -> u64 {
    42
}

fn default_n_init() -> usize {
    10
}

fn default_max_iterations() -> usize {
    300
}

fn default_tolerance() -> f64 {
    1e-4
}

fn default_silhouette_sample() -> usize {
    2000
}

fn default_neighbors() -> usize {
    7
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            steam_path: default_steam_path(),
            epic_path: default_epic_path(),
        }
    }
}

impl Default for OutputsConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            steam_min_reviews: default_steam_min_reviews(),
            default_release_year: default_release_year(),
            year_imputation: default_year_imputation(),
            low_signal_cleanup: default_low_signal_cleanup(),
            hit_quantile: default_hit_quantile(),
        }
    }
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            clusters: default_clusters(),
            seed: default_seed(),
            n_init: default_n_init(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            silhouette_sample: default_silhouette_sample(),
            neighbors: default_neighbors(),
        }
    }
}

impl PipelineParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.hit_quantile > 0.0 && self.hit_quantile < 1.0) {
            return Err(Error::Config(format!(
                "pipeline.hit_quantile must be in (0, 1), got {}",
                self.hit_quantile
            )));
        }
        Ok(())
    }
}

impl ModelParams {
    pub fn validate(&self) -> Result<()> {
        if self.clusters == 0 {
            return Err(Error::Config("model.clusters must be > 0".to_string()));
        }
        if self.neighbors == 0 {
            return Err(Error::Config("model.neighbors must be > 0".to_string()));
        }
        if self.n_init == 0 || self.max_iterations == 0 {
            return Err(Error::Config(
                "model.n_init and model.max_iterations must be > 0".to_string(),
            ));
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(Error::Config(
                "model.tolerance must be a finite positive number".to_string(),
            ));
        }
        Ok(())
    }
}

impl TomlConfig {
    /// Parse a config file; parse failures are fatal
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TomlConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Apply `GAMECAT_*_PATH` / `GAMECAT_OUTPUT_DIR` environment overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var(STEAM_PATH_ENV_VAR) {
            self.inputs.steam_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var(EPIC_PATH_ENV_VAR) {
            self.inputs.epic_path = PathBuf::from(path);
        }
        if let Ok(dir) = std::env::var(OUTPUT_DIR_ENV_VAR) {
            self.outputs.dir = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate()?;
        self.model.validate()
    }
}

/// Resolves which config file (if any) to load
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Locate the config file following the priority order in the module docs
    ///
    /// Returns `None` when no tier yields a path.
    pub fn locate(&self) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: Platform config directory
        dirs::config_dir()
            .map(|d| d.join("gamecat").join("config.toml"))
            .filter(|p| p.exists())
    }

    /// Resolve and load configuration, falling back to compiled defaults
    ///
    /// Logs where the configuration came from. Callers that install their
    /// tracing subscriber from the loaded config use [`Self::resolve`] and log
    /// the returned [`ConfigSource`] once the subscriber is up.
    pub fn load(&self) -> Result<TomlConfig> {
        let (config, source) = self.resolve()?;
        source.log();
        Ok(config)
    }

    /// Resolve and load configuration without logging
    pub fn resolve(&self) -> Result<(TomlConfig, ConfigSource)> {
        let (mut config, source) = match self.locate() {
            Some(path) if path.exists() => {
                let config = TomlConfig::from_file(&path)?;
                (config, ConfigSource::File(path))
            }
            Some(path) => (TomlConfig::default(), ConfigSource::MissingFile(path)),
            None => (TomlConfig::default(), ConfigSource::Defaults),
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok((config, source))
    }
}

/// Where a resolved configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// A path was given but does not exist; compiled defaults were used
    MissingFile(PathBuf),
    Defaults,
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded configuration from {}", path.display()),
            ConfigSource::MissingFile(path) => warn!(
                "Config file {} not found, using compiled defaults",
                path.display()
            ),
            ConfigSource::Defaults => info!("No config file found, using compiled defaults"),
        }
    }
}
