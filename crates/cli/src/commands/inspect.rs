//! Store inspection commands: stats, events, visitor state

use crate::commands::format_timestamp;
use crate::output::{print_list, OutputFormat, TableDisplay};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use splitlab_common::{ExperimentEngine, SiteTracker, StoreBackend};

/// Which bounded log to read
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum LogKind {
    /// Experiment view/click/conversion events
    #[default]
    General,
    /// Site tracking events (page views, signups, affiliate clicks)
    Tracking,
}

#[derive(Serialize)]
struct StatsRow {
    variant: String,
    views: u64,
    clicks: u64,
    conversions: u64,
    conversion_rate: f64,
}

impl TableDisplay for StatsRow {
    fn headers() -> Vec<&'static str> {
        vec!["VARIANT", "VIEWS", "CLICKS", "CONVERSIONS", "CONV RATE"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.variant.clone(),
            self.views.to_string(),
            self.clicks.to_string(),
            self.conversions.to_string(),
            format!("{:.1}%", self.conversion_rate * 100.0),
        ]
    }
}

#[derive(Serialize)]
struct EventRow {
    timestamp: String,
    experiment_id: String,
    variant: String,
    event_type: String,
    metadata: String,
}

impl TableDisplay for EventRow {
    fn headers() -> Vec<&'static str> {
        vec!["TIME", "EXPERIMENT", "VARIANT", "TYPE", "METADATA"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.timestamp.clone(),
            self.experiment_id.clone(),
            self.variant.clone(),
            self.event_type.clone(),
            self.metadata.clone(),
        ]
    }
}

#[derive(Serialize)]
struct TrackingEventRow {
    timestamp: String,
    event_type: String,
    data: String,
}

impl TableDisplay for TrackingEventRow {
    fn headers() -> Vec<&'static str> {
        vec!["TIME", "TYPE", "DATA"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.timestamp.clone(),
            self.event_type.clone(),
            self.data.clone(),
        ]
    }
}

#[derive(Serialize)]
struct AssignmentRow {
    experiment_id: String,
    variant: String,
}

impl TableDisplay for AssignmentRow {
    fn headers() -> Vec<&'static str> {
        vec!["EXPERIMENT", "VARIANT"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.experiment_id.clone(), self.variant.clone()]
    }
}

pub fn stats<S: StoreBackend>(
    engine: &ExperimentEngine<S>,
    experiment_id: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let rows: Vec<StatsRow> = engine
        .stats(experiment_id)
        .into_iter()
        .map(|(variant, s)| StatsRow {
            variant,
            views: s.views,
            clicks: s.clicks,
            conversions: s.conversions,
            conversion_rate: s.conversion_rate,
        })
        .collect();
    print_list(&rows, format);
    Ok(())
}

pub fn affiliate_stats<S: StoreBackend>(
    tracker: &SiteTracker<S>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let stats = tracker.affiliate_stats();
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(&stats)?);
        }
        _ => {
            println!("Total clicks: {}", stats.total_clicks);
            for (source, count) in &stats.clicks_by_source {
                println!("  source {}: {}", source, count);
            }
            for (category, count) in &stats.clicks_by_category {
                println!("  category {}: {}", category, count);
            }
            for product in &stats.top_products {
                println!(
                    "  {} ({}): {} clicks",
                    product.product_name, product.asin, product.clicks
                );
            }
        }
    }
    Ok(())
}

pub fn events<S: StoreBackend>(
    engine: &ExperimentEngine<S>,
    tracker: &SiteTracker<S>,
    log: LogKind,
    limit: usize,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match log {
        LogKind::General => {
            let events = engine.events();
            let rows: Vec<EventRow> = events
                .iter()
                .rev()
                .take(limit)
                .map(|e| EventRow {
                    timestamp: format_timestamp(e.timestamp_ms),
                    experiment_id: e.experiment_id.clone(),
                    variant: e.variant.clone(),
                    event_type: e.event_type.to_string(),
                    metadata: e
                        .metadata
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_default(),
                })
                .collect();
            print_list(&rows, format);
        }
        LogKind::Tracking => {
            let events = tracker.events();
            let rows: Vec<TrackingEventRow> = events
                .iter()
                .rev()
                .take(limit)
                .map(|e| TrackingEventRow {
                    timestamp: format_timestamp(e.timestamp_ms),
                    event_type: e.event_type.to_string(),
                    data: e.data.to_string(),
                })
                .collect();
            print_list(&rows, format);
        }
    }
    Ok(())
}

pub fn visitor<S: StoreBackend>(
    engine: &ExperimentEngine<S>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    println!("Visitor: {}", engine.visitor_id());
    let mut rows: Vec<AssignmentRow> = engine
        .assignments()
        .into_iter()
        .map(|(experiment_id, variant)| AssignmentRow {
            experiment_id,
            variant,
        })
        .collect();
    rows.sort_by(|a, b| a.experiment_id.cmp(&b.experiment_id));
    print_list(&rows, format);
    Ok(())
}

pub fn reset<S: StoreBackend>(engine: &ExperimentEngine<S>, yes: bool) -> anyhow::Result<()> {
    if !yes {
        println!("This clears the visitor id, assignments, and event log.");
        println!("Re-run with --yes to confirm.");
        return Ok(());
    }
    engine.reset()?;
    println!("{} visitor state cleared", "✓".green());
    Ok(())
}
