//! Core types for Splitlab

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Variant returned for unknown or inactive experiments.
pub const CONTROL_VARIANT: &str = "control";

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A single experiment definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experiment {
    /// Stable identifier, unique across the catalog
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Ordered variant names, non-empty, no duplicates
    pub variants: Vec<String>,
    /// Relative weights, parallel to `variants`; equal split when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<f64>>,
    /// Inactive experiments always resolve to the control variant
    #[serde(default)]
    pub is_active: bool,
}

/// Experiment event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    View,
    Click,
    Conversion,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::View => write!(f, "view"),
            EventType::Click => write!(f, "click"),
            EventType::Conversion => write!(f, "conversion"),
        }
    }
}

/// A recorded experiment event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub experiment_id: String,
    pub variant: String,
    pub event_type: EventType,
    /// Milliseconds since epoch
    pub timestamp_ms: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Event {
    pub fn new(experiment_id: &str, variant: &str, event_type: EventType) -> Self {
        Self {
            experiment_id: experiment_id.to_string(),
            variant: variant.to_string(),
            event_type,
            timestamp_ms: now_ms(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Site tracking event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingEventType {
    AffiliateClick,
    PageView,
    Signup,
    Upgrade,
    FeatureUse,
}

impl std::fmt::Display for TrackingEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackingEventType::AffiliateClick => write!(f, "affiliate_click"),
            TrackingEventType::PageView => write!(f, "page_view"),
            TrackingEventType::Signup => write!(f, "signup"),
            TrackingEventType::Upgrade => write!(f, "upgrade"),
            TrackingEventType::FeatureUse => write!(f, "feature_use"),
        }
    }
}

/// A recorded site tracking event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub event_type: TrackingEventType,
    /// Milliseconds since epoch
    pub timestamp_ms: i64,
    /// Free-form payload; shape depends on `event_type`
    pub data: Value,
}

/// Where an affiliate click originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickSource {
    Dashboard,
    Report,
    Sample,
    Api,
}

impl std::fmt::Display for ClickSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClickSource::Dashboard => write!(f, "dashboard"),
            ClickSource::Report => write!(f, "report"),
            ClickSource::Sample => write!(f, "sample"),
            ClickSource::Api => write!(f, "api"),
        }
    }
}

/// An affiliate product click
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffiliateClick {
    pub asin: String,
    pub product_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    pub source: ClickSource,
}

/// Per-variant counters produced by aggregation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantStats {
    pub views: u64,
    pub clicks: u64,
    pub conversions: u64,
    /// conversions / views, 0 when there are no views
    pub conversion_rate: f64,
}
