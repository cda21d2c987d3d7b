//! Experiment catalog
//!
//! Static, read-only registry mapping experiment id to its definition.
//! Loaded once at startup and immutable afterwards; unknown ids are a
//! defined "not found" condition, not a failure.

use crate::types::Experiment;
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Read-only experiment registry
#[derive(Debug, Clone)]
pub struct ExperimentCatalog {
    experiments: HashMap<String, Experiment>,
}

/// On-disk catalog file shape
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    experiments: Vec<Experiment>,
}

impl ExperimentCatalog {
    /// Build a catalog from a list of definitions, validating each one
    pub fn new(experiments: Vec<Experiment>) -> Result<Self> {
        let mut map = HashMap::with_capacity(experiments.len());
        for exp in experiments {
            validate(&exp)?;
            if map.insert(exp.id.clone(), exp).is_some() {
                return Err(Error::InvalidConfig(
                    "duplicate experiment id in catalog".to_string(),
                ));
            }
        }
        Ok(Self { experiments: map })
    }

    /// The default catalog shipped with the product
    pub fn builtin() -> Self {
        let experiments = vec![
            Experiment {
                id: "cta-button".to_string(),
                name: "CTA button test".to_string(),
                variants: vec![
                    "control".to_string(),
                    "variant-a".to_string(),
                    "variant-b".to_string(),
                ],
                weights: None,
                is_active: true,
            },
            Experiment {
                id: "pricing-display".to_string(),
                name: "Pricing display test".to_string(),
                variants: vec!["monthly".to_string(), "annual-discount".to_string()],
                weights: None,
                is_active: true,
            },
            Experiment {
                id: "hero-headline".to_string(),
                name: "Hero headline test".to_string(),
                variants: vec![
                    "default".to_string(),
                    "benefit-focused".to_string(),
                    "urgency".to_string(),
                ],
                weights: None,
                is_active: true,
            },
            Experiment {
                id: "register-form".to_string(),
                name: "Register form test".to_string(),
                variants: vec!["simple".to_string(), "with-benefits".to_string()],
                weights: None,
                is_active: true,
            },
        ];
        // Builtin definitions are known-valid
        Self::new(experiments).unwrap_or_else(|_| Self {
            experiments: HashMap::new(),
        })
    }

    /// Load a catalog from a TOML file, falling back to the builtin
    /// catalog when the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::builtin());
        }
        let content = std::fs::read_to_string(path)?;
        let file: CatalogFile = toml::from_str(&content)?;
        let catalog = Self::new(file.experiments)?;
        info!(
            "Loaded {} experiments from {:?}",
            catalog.experiments.len(),
            path
        );
        Ok(catalog)
    }

    /// Look up an experiment by id
    pub fn get(&self, id: &str) -> Option<&Experiment> {
        self.experiments.get(id)
    }

    /// Look up an experiment by id, failing when it is not in the catalog.
    ///
    /// Resolution paths treat unknown ids as control; this is for callers
    /// that need the miss surfaced, like catalog inspection.
    pub fn require(&self, id: &str) -> Result<&Experiment> {
        self.experiments.get(id).ok_or_else(|| Error::NotFound {
            kind: "experiment".to_string(),
            id: id.to_string(),
        })
    }

    /// Iterate over all experiments
    pub fn iter(&self) -> impl Iterator<Item = &Experiment> {
        self.experiments.values()
    }

    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }
}

fn validate(exp: &Experiment) -> Result<()> {
    if exp.id.is_empty() {
        return Err(Error::InvalidConfig("experiment id is empty".to_string()));
    }
    if exp.variants.is_empty() {
        return Err(Error::InvalidConfig(format!(
            "experiment {} has no variants",
            exp.id
        )));
    }
    let mut seen = std::collections::HashSet::new();
    for v in &exp.variants {
        if !seen.insert(v.as_str()) {
            return Err(Error::InvalidConfig(format!(
                "experiment {} has duplicate variant {}",
                exp.id, v
            )));
        }
    }
    if let Some(weights) = &exp.weights {
        if weights.len() != exp.variants.len() {
            return Err(Error::InvalidConfig(format!(
                "experiment {} has {} weights for {} variants",
                exp.id,
                weights.len(),
                exp.variants.len()
            )));
        }
        if weights.iter().any(|w| *w < 0.0 || !w.is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "experiment {} has a negative or non-finite weight",
                exp.id
            )));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "experiment {} weights do not sum to a positive number",
                exp.id
            )));
        }
    }
    Ok(())
}
