//! Splitlab Common Library
//!
//! Sticky A/B experiment bucketing and best-effort event tracking over a
//! pluggable key-value store.

pub mod catalog;
pub mod db;
pub mod engine;
pub mod error;
pub mod events;
pub mod stats;
pub mod store;
pub mod tracker;
pub mod types;

// Re-export commonly used types
pub use catalog::ExperimentCatalog;
pub use db::SqliteStore;
pub use engine::{draw_variant, ExperimentEngine};
pub use error::{Error, Result};
pub use stats::{affiliate_stats, experiment_stats, AffiliateStats};
pub use store::{MemoryStore, StoreBackend};
pub use tracker::{tracked_affiliate_link, SiteTracker};
pub use types::*;

/// Splitlab version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default store directory
pub fn default_store_path() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".splitlab")
}

/// Default database path
pub fn default_db_path() -> std::path::PathBuf {
    default_store_path().join("state.db")
}

/// Default experiment catalog path
pub fn default_catalog_path() -> std::path::PathBuf {
    default_store_path().join("experiments.toml")
}

/// Home directory helper
mod dirs {
    pub fn home_dir() -> Option<std::path::PathBuf> {
        std::env::var_os("HOME").map(std::path::PathBuf::from)
    }
}
