//! Statistics aggregation
//!
//! Pure folds over event logs; nothing here mutates state.

use crate::types::{Event, EventType, TrackingEvent, TrackingEventType, VariantStats};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate per-variant counters for one experiment.
///
/// `conversion_rate` is conversions over views, defined as 0 when a
/// variant has no views.
pub fn experiment_stats(events: &[Event], experiment_id: &str) -> BTreeMap<String, VariantStats> {
    let mut stats: BTreeMap<String, VariantStats> = BTreeMap::new();

    for event in events.iter().filter(|e| e.experiment_id == experiment_id) {
        let entry = stats.entry(event.variant.clone()).or_default();
        match event.event_type {
            EventType::View => entry.views += 1,
            EventType::Click => entry.clicks += 1,
            EventType::Conversion => entry.conversions += 1,
        }
    }

    for entry in stats.values_mut() {
        entry.conversion_rate = if entry.views > 0 {
            entry.conversions as f64 / entry.views as f64
        } else {
            0.0
        };
    }

    stats
}

/// Click totals for a single affiliate product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductClicks {
    pub asin: String,
    pub product_name: String,
    pub clicks: u64,
}

/// Aggregated affiliate click counters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AffiliateStats {
    pub total_clicks: u64,
    pub clicks_by_source: BTreeMap<String, u64>,
    pub clicks_by_category: BTreeMap<String, u64>,
    /// Up to ten products, most clicked first
    pub top_products: Vec<ProductClicks>,
}

/// Fold affiliate clicks out of the tracking log
pub fn affiliate_stats(events: &[TrackingEvent]) -> AffiliateStats {
    let mut stats = AffiliateStats::default();
    let mut products: BTreeMap<String, ProductClicks> = BTreeMap::new();

    for event in events
        .iter()
        .filter(|e| e.event_type == TrackingEventType::AffiliateClick)
    {
        stats.total_clicks += 1;

        if let Some(source) = event.data.get("source").and_then(|v| v.as_str()) {
            *stats.clicks_by_source.entry(source.to_string()).or_default() += 1;
        }
        if let Some(category) = event.data.get("category").and_then(|v| v.as_str()) {
            *stats
                .clicks_by_category
                .entry(category.to_string())
                .or_default() += 1;
        }

        let asin = event.data.get("asin").and_then(|v| v.as_str());
        let name = event.data.get("product_name").and_then(|v| v.as_str());
        if let (Some(asin), Some(name)) = (asin, name) {
            products
                .entry(asin.to_string())
                .or_insert_with(|| ProductClicks {
                    asin: asin.to_string(),
                    product_name: name.to_string(),
                    clicks: 0,
                })
                .clicks += 1;
        }
    }

    let mut top: Vec<ProductClicks> = products.into_values().collect();
    top.sort_by(|a, b| b.clicks.cmp(&a.clicks));
    top.truncate(10);
    stats.top_products = top;

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::now_ms;

    fn event(experiment_id: &str, variant: &str, event_type: EventType) -> Event {
        Event::new(experiment_id, variant, event_type)
    }

    #[test]
    fn test_conversion_rate_derivation() {
        let mut events = Vec::new();
        for _ in 0..10 {
            events.push(event("exp", "a", EventType::View));
        }
        for _ in 0..2 {
            events.push(event("exp", "a", EventType::Conversion));
        }
        // A variant with conversions but no views must not divide by zero
        events.push(event("exp", "b", EventType::Conversion));

        let stats = experiment_stats(&events, "exp");

        let a = &stats["a"];
        assert_eq!(a.views, 10);
        assert_eq!(a.conversions, 2);
        assert!((a.conversion_rate - 0.2).abs() < f64::EPSILON);

        let b = &stats["b"];
        assert_eq!(b.views, 0);
        assert_eq!(b.conversion_rate, 0.0);
    }

    #[test]
    fn test_stats_scoped_to_experiment() {
        let events = vec![
            event("exp", "a", EventType::View),
            event("other", "a", EventType::View),
            event("exp", "a", EventType::Click),
        ];

        let stats = experiment_stats(&events, "exp");
        assert_eq!(stats["a"].views, 1);
        assert_eq!(stats["a"].clicks, 1);
    }

    #[test]
    fn test_no_events_yields_empty_stats() {
        let stats = experiment_stats(&[], "exp");
        assert!(stats.is_empty());
    }

    fn affiliate_click(asin: &str, name: &str, source: &str, category: Option<&str>) -> TrackingEvent {
        let mut data = serde_json::json!({
            "asin": asin,
            "product_name": name,
            "source": source,
        });
        if let Some(category) = category {
            data["category"] = serde_json::json!(category);
        }
        TrackingEvent {
            event_type: TrackingEventType::AffiliateClick,
            timestamp_ms: now_ms(),
            data,
        }
    }

    #[test]
    fn test_affiliate_stats_fold() {
        let events = vec![
            affiliate_click("B001", "Widget", "dashboard", Some("tools")),
            affiliate_click("B001", "Widget", "report", Some("tools")),
            affiliate_click("B002", "Gadget", "dashboard", None),
            TrackingEvent {
                event_type: TrackingEventType::PageView,
                timestamp_ms: now_ms(),
                data: serde_json::json!({ "page": "/pricing" }),
            },
        ];

        let stats = affiliate_stats(&events);
        assert_eq!(stats.total_clicks, 3);
        assert_eq!(stats.clicks_by_source["dashboard"], 2);
        assert_eq!(stats.clicks_by_source["report"], 1);
        assert_eq!(stats.clicks_by_category["tools"], 2);
        assert_eq!(stats.top_products[0].asin, "B001");
        assert_eq!(stats.top_products[0].clicks, 2);
        assert_eq!(stats.top_products.len(), 2);
    }
}
