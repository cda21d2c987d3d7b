//! Resolution and tracking commands

use clap::{Args, Subcommand};
use colored::Colorize;
use splitlab_common::{
    AffiliateClick, ClickSource, ExperimentEngine, SiteTracker, StoreBackend,
};

#[derive(Subcommand)]
pub enum TrackCommands {
    /// Record a click against the current assignment
    Click {
        /// Experiment id
        experiment_id: String,

        /// Identifier of the clicked element
        #[arg(long)]
        element_id: Option<String>,
    },

    /// Record a conversion against the current assignment
    Conversion {
        /// Experiment id
        experiment_id: String,

        /// Free-form JSON metadata
        #[arg(long)]
        metadata: Option<String>,
    },

    /// Record a page view
    PageView {
        /// Page path, e.g. /pricing
        page: String,

        /// Free-form JSON metadata
        #[arg(long)]
        metadata: Option<String>,
    },

    /// Record a completed signup
    Signup {
        /// Plan the user signed up for
        plan: String,

        /// Acquisition source
        #[arg(long)]
        source: Option<String>,
    },

    /// Record an affiliate product click
    AffiliateClick(AffiliateClickArgs),
}

#[derive(Args)]
pub struct AffiliateClickArgs {
    /// Product ASIN
    #[arg(long)]
    pub asin: String,

    /// Product name
    #[arg(long)]
    pub product_name: String,

    /// Product category
    #[arg(long)]
    pub category: Option<String>,

    /// Product price
    #[arg(long)]
    pub price: Option<f64>,

    /// Trend rank
    #[arg(long)]
    pub rank: Option<u32>,

    /// Click source surface
    #[arg(long, value_enum, default_value = "dashboard")]
    pub source: SourceArg,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SourceArg {
    Dashboard,
    Report,
    Sample,
    Api,
}

impl From<SourceArg> for ClickSource {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Dashboard => ClickSource::Dashboard,
            SourceArg::Report => ClickSource::Report,
            SourceArg::Sample => ClickSource::Sample,
            SourceArg::Api => ClickSource::Api,
        }
    }
}

fn parse_metadata(raw: Option<String>) -> anyhow::Result<Option<serde_json::Value>> {
    match raw {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub fn resolve<S: StoreBackend>(
    engine: &ExperimentEngine<S>,
    experiment_id: &str,
) -> anyhow::Result<()> {
    let variant = engine.resolve_variant(experiment_id);
    println!("{}", variant);
    Ok(())
}

pub fn execute<S: StoreBackend>(
    cmd: TrackCommands,
    engine: &ExperimentEngine<S>,
    tracker: &SiteTracker<S>,
) -> anyhow::Result<()> {
    match cmd {
        TrackCommands::Click {
            experiment_id,
            element_id,
        } => {
            engine.record_click(&experiment_id, element_id.as_deref());
            println!(
                "{} click recorded for {}",
                "✓".green(),
                experiment_id
            );
        }
        TrackCommands::Conversion {
            experiment_id,
            metadata,
        } => {
            engine.record_conversion(&experiment_id, parse_metadata(metadata)?);
            println!(
                "{} conversion recorded for {}",
                "✓".green(),
                experiment_id
            );
        }
        TrackCommands::PageView { page, metadata } => {
            tracker.track_page_view(&page, parse_metadata(metadata)?);
            println!("{} page view recorded for {}", "✓".green(), page);
        }
        TrackCommands::Signup { plan, source } => {
            tracker.track_signup(&plan, source.as_deref());
            println!("{} signup recorded for plan {}", "✓".green(), plan);
        }
        TrackCommands::AffiliateClick(args) => {
            tracker.track_affiliate_click(&AffiliateClick {
                asin: args.asin.clone(),
                product_name: args.product_name,
                category: args.category,
                price: args.price,
                rank: args.rank,
                source: args.source.into(),
            });
            println!("{} affiliate click recorded for {}", "✓".green(), args.asin);
        }
    }
    Ok(())
}
