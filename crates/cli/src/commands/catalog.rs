//! Catalog inspection commands

use crate::output::{print_item, print_list, OutputFormat, TableDisplay};
use clap::Subcommand;
use serde::Serialize;
use splitlab_common::{Experiment, ExperimentCatalog};

#[derive(Subcommand)]
pub enum CatalogCommands {
    /// List all experiments in the catalog
    List,

    /// Show a single experiment
    Show {
        /// Experiment id
        id: String,
    },
}

#[derive(Serialize)]
struct ExperimentRow {
    id: String,
    name: String,
    variants: Vec<String>,
    weights: Option<Vec<f64>>,
    is_active: bool,
}

impl From<&Experiment> for ExperimentRow {
    fn from(exp: &Experiment) -> Self {
        Self {
            id: exp.id.clone(),
            name: exp.name.clone(),
            variants: exp.variants.clone(),
            weights: exp.weights.clone(),
            is_active: exp.is_active,
        }
    }
}

impl TableDisplay for ExperimentRow {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "NAME", "VARIANTS", "WEIGHTS", "ACTIVE"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.variants.join(", "),
            self.weights
                .as_ref()
                .map(|w| {
                    w.iter()
                        .map(|v| v.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_else(|| "equal".to_string()),
            self.is_active.to_string(),
        ]
    }
}

pub fn execute(
    cmd: CatalogCommands,
    catalog: &ExperimentCatalog,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match cmd {
        CatalogCommands::List => {
            let mut rows: Vec<ExperimentRow> = catalog.iter().map(ExperimentRow::from).collect();
            rows.sort_by(|a, b| a.id.cmp(&b.id));
            print_list(&rows, format);
        }
        CatalogCommands::Show { id } => {
            let exp = catalog.require(&id)?;
            print_item(&ExperimentRow::from(exp), format);
        }
    }
    Ok(())
}
