//! gamecat - catalog fusion and recommendation CLI
//!
//! - `build`: run the full pipeline over both catalog exports and write the
//!   snapshot artifacts
//! - `recommend`: nearest titles to one title, from a built snapshot
//! - `show`: resolved fields and active feature columns of one title

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gamecat_common::config::{ConfigResolver, LoggingConfig, TomlConfig};
use gamecat_fusion::features::TaxonomyTable;
use gamecat_fusion::serving::Recommender;
use gamecat_fusion::snapshot::SnapshotDir;
use gamecat_fusion::{write_snapshots, Pipeline, Recommendation};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for gamecat
#[derive(Parser, Debug)]
#[command(name = "gamecat")]
#[command(about = "Fuse storefront catalogs and recommend similar titles")]
#[command(version)]
struct Args {
    /// Config file (overrides GAMECAT_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the pipeline and write snapshots
    Build {
        /// Primary (review-rich) catalog CSV
        #[arg(long)]
        steam: Option<PathBuf>,

        /// Secondary (low-signal) catalog CSV
        #[arg(long)]
        epic: Option<PathBuf>,

        /// Snapshot output directory
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Recommend titles similar to NAME
    Recommend {
        name: String,

        /// Snapshot directory to read
        #[arg(long)]
        out: Option<PathBuf>,

        /// Neighbors to query, including the title itself
        #[arg(short)]
        k: Option<usize>,
    },

    /// Show the resolved record of NAME
    Show {
        name: String,

        /// Snapshot directory to read
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Tracing is configured from the loaded file, so the resolver's own
    // messages are held back until the subscriber is installed.
    let (mut config, source) = ConfigResolver::new(args.config.clone())
        .resolve()
        .context("Failed to load configuration")?;
    init_tracing(&config.logging)?;
    source.log();

    match args.command {
        Command::Build { steam, epic, out } => {
            if let Some(path) = steam {
                config.inputs.steam_path = path;
            }
            if let Some(path) = epic {
                config.inputs.epic_path = path;
            }
            if let Some(dir) = out {
                config.outputs.dir = dir;
            }
            build(config)
        }
        Command::Recommend { name, out, k } => {
            let recommender = open_recommender(&config, out.as_deref())?;
            let k = k.unwrap_or_else(|| recommender.default_k());
            print_recommendation(recommender.recommend(&name, k)?);
            Ok(())
        }
        Command::Show { name, out } => {
            let recommender = open_recommender(&config, out.as_deref())?;
            match recommender.feature_report(&name) {
                Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
                None => println!("No title named '{}'", name),
            }
            Ok(())
        }
    }
}

/// RUST_LOG wins; otherwise the configured level. Optionally tee to a file.
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "gamecat={0},gamecat_fusion={0},gamecat_common={0}",
            logging.level
        ))
    });

    let file_layer = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

fn build(config: TomlConfig) -> Result<()> {
    info!("Starting gamecat build v{}", env!("CARGO_PKG_VERSION"));
    info!("Primary catalog: {}", config.inputs.steam_path.display());
    info!("Secondary catalog: {}", config.inputs.epic_path.display());

    let out_dir = config.outputs.dir.clone();
    let pipeline = Pipeline::from_config(config).context("Failed to initialize pipeline")?;
    let output = pipeline.run_files().context("Pipeline run failed")?;
    write_snapshots(&output, &out_dir)
        .with_context(|| format!("Failed to write snapshots to {}", out_dir.display()))?;

    println!(
        "Built {} records x {} features into {}",
        output.records.len(),
        output.layout.dimension(),
        out_dir.display()
    );
    Ok(())
}

fn open_recommender(config: &TomlConfig, out: Option<&Path>) -> Result<Recommender> {
    let dir = out.unwrap_or(config.outputs.dir.as_path());
    let taxonomy = TaxonomyTable::load(config.tables.taxonomy.as_deref())
        .context("Failed to load taxonomy table")?;
    Recommender::open(&SnapshotDir::new(dir), &taxonomy)
        .with_context(|| format!("Failed to open snapshots in {}", dir.display()))
}

fn print_recommendation(recommendation: Recommendation) {
    match recommendation {
        Recommendation::NotFound { query } => println!("No title named '{}'", query),
        Recommendation::Found { selected, results } => {
            println!("{} ({})", selected.name, selected.description);
            for (rank, view) in results.iter().enumerate() {
                println!(
                    "{:>2}. {} [{}] {} | {} | {} | {} reviews | {} | distance {:.4}",
                    rank + 1,
                    view.name,
                    view.genres.join(", "),
                    view.price,
                    view.platforms.join("/"),
                    view.stores.join("/"),
                    view.reviews,
                    view.release_year,
                    view.distance
                );
            }
        }
    }
}
