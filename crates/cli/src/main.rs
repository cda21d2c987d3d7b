//! Splitlab CLI - Main Entry Point
//!
//! Inspects and exercises a local experiment store: resolve variants,
//! record events, and aggregate statistics.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

use commands::{catalog, inspect, track};
use splitlab_common::{ExperimentCatalog, ExperimentEngine, SiteTracker, SqliteStore};

/// Splitlab CLI - sticky A/B bucketing over a local store
#[derive(Parser)]
#[command(name = "splitlab")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Store database path
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Experiment catalog file (TOML)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect the experiment catalog
    #[command(subcommand)]
    Catalog(catalog::CatalogCommands),

    /// Resolve the variant for an experiment, bucketing on first use
    Resolve {
        /// Experiment id
        experiment_id: String,
    },

    /// Record events
    #[command(subcommand)]
    Track(track::TrackCommands),

    /// Show per-variant statistics for an experiment
    Stats {
        /// Experiment id
        experiment_id: String,
    },

    /// Show aggregated affiliate click statistics
    AffiliateStats,

    /// Show recent events
    Events {
        /// Which log to read
        #[arg(long, value_enum, default_value = "general")]
        log: inspect::LogKind,

        /// Maximum number of events to show, newest first
        #[arg(long, default_value = "50")]
        limit: usize,
    },

    /// Show the visitor id and current assignments
    Visitor,

    /// Clear the visitor's persisted state
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    let db_path = cli
        .store
        .unwrap_or_else(splitlab_common::default_db_path);
    let catalog_path = cli
        .catalog
        .unwrap_or_else(splitlab_common::default_catalog_path);

    let store = SqliteStore::open(&db_path)?;
    let experiments = ExperimentCatalog::load(&catalog_path)?;
    let engine = ExperimentEngine::new(experiments, store.clone());
    let tracker = SiteTracker::new(store);

    match cli.command {
        Commands::Catalog(cmd) => catalog::execute(cmd, engine.catalog(), cli.format)?,
        Commands::Resolve { experiment_id } => track::resolve(&engine, &experiment_id)?,
        Commands::Track(cmd) => track::execute(cmd, &engine, &tracker)?,
        Commands::Stats { experiment_id } => inspect::stats(&engine, &experiment_id, cli.format)?,
        Commands::AffiliateStats => inspect::affiliate_stats(&tracker, cli.format)?,
        Commands::Events { log, limit } => {
            inspect::events(&engine, &tracker, log, limit, cli.format)?
        }
        Commands::Visitor => inspect::visitor(&engine, cli.format)?,
        Commands::Reset { yes } => inspect::reset(&engine, yes)?,
        Commands::Version => {
            println!("Splitlab CLI v{}", splitlab_common::VERSION);
            println!("Sticky A/B bucketing and best-effort event tracking");
        }
    }

    Ok(())
}
