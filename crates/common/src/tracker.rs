//! Site event tracking
//!
//! Affiliate click and funnel tracking over the same storage layer as the
//! experiment engine, written to a separate, smaller bounded log. All
//! writes are best-effort.

use crate::events::{append_bounded, read_log, TRACKING_LOG_CAPACITY};
use crate::stats::{affiliate_stats, AffiliateStats};
use crate::store::{StoreBackend, SESSION_ID_KEY, TRACKING_EVENTS_KEY};
use crate::types::{now_ms, AffiliateClick, ClickSource, TrackingEvent, TrackingEventType};
use crate::Result;
use serde_json::Value;
use tracing::debug;
use url::Url;

/// Best-effort site event tracker
pub struct SiteTracker<S: StoreBackend> {
    store: S,
}

impl<S: StoreBackend> SiteTracker<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Opaque persisted session identifier, created on first use
    pub fn session_id(&self) -> String {
        if let Ok(Some(id)) = self.store.get(SESSION_ID_KEY) {
            return id;
        }
        let id = uuid::Uuid::new_v4().to_string();
        if let Err(e) = self.store.put(SESSION_ID_KEY, &id) {
            debug!("Could not persist session id: {}", e);
        }
        id
    }

    /// The tracking event log, oldest first
    pub fn events(&self) -> Vec<TrackingEvent> {
        read_log(&self.store, TRACKING_EVENTS_KEY)
    }

    /// Aggregate affiliate click counters from the log
    pub fn affiliate_stats(&self) -> AffiliateStats {
        affiliate_stats(&self.events())
    }

    /// Record an affiliate product click
    pub fn track_affiliate_click(&self, click: &AffiliateClick) {
        let mut data = match serde_json::to_value(click) {
            Ok(data) => data,
            Err(e) => {
                debug!("Could not serialize affiliate click: {}", e);
                return;
            }
        };
        data["session_id"] = Value::String(self.session_id());
        self.append(TrackingEventType::AffiliateClick, data);
    }

    /// Record a page view
    pub fn track_page_view(&self, page: &str, metadata: Option<Value>) {
        let mut data = serde_json::json!({
            "page": page,
            "session_id": self.session_id(),
        });
        merge_metadata(&mut data, metadata);
        self.append(TrackingEventType::PageView, data);
    }

    /// Record a completed signup
    pub fn track_signup(&self, plan: &str, source: Option<&str>) {
        let data = serde_json::json!({
            "plan": plan,
            "source": source.unwrap_or("direct"),
            "session_id": self.session_id(),
        });
        self.append(TrackingEventType::Signup, data);
    }

    /// Record a plan upgrade
    pub fn track_upgrade(&self, from_plan: &str, to_plan: &str, price: f64) {
        let data = serde_json::json!({
            "from_plan": from_plan,
            "to_plan": to_plan,
            "price": price,
            "session_id": self.session_id(),
        });
        self.append(TrackingEventType::Upgrade, data);
    }

    /// Record use of a product feature
    pub fn track_feature_use(&self, feature: &str, metadata: Option<Value>) {
        let mut data = serde_json::json!({
            "feature": feature,
            "session_id": self.session_id(),
        });
        merge_metadata(&mut data, metadata);
        self.append(TrackingEventType::FeatureUse, data);
    }

    fn append(&self, event_type: TrackingEventType, data: Value) {
        let event = TrackingEvent {
            event_type,
            timestamp_ms: now_ms(),
            data,
        };
        append_bounded(&self.store, TRACKING_EVENTS_KEY, TRACKING_LOG_CAPACITY, event);
    }
}

/// Add referral tracking parameters to an affiliate URL.
///
/// Existing `ref`/`src` parameters are overwritten, so re-tracking an
/// already tracked link does not stack duplicates.
pub fn tracked_affiliate_link(original: &str, source: ClickSource) -> Result<String> {
    let mut url = Url::parse(original)?;
    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "ref" && key != "src")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (key, value) in &retained {
            pairs.append_pair(key, value);
        }
        pairs
            .append_pair("ref", "splitlab")
            .append_pair("src", &source.to_string());
    }
    Ok(url.into())
}

fn merge_metadata(data: &mut Value, metadata: Option<Value>) {
    if let (Value::Object(target), Some(Value::Object(extra))) = (data, metadata) {
        for (key, value) in extra {
            target.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn tracker() -> SiteTracker<MemoryStore> {
        SiteTracker::new(MemoryStore::new())
    }

    #[test]
    fn test_session_id_is_stable() {
        let tracker = tracker();
        assert_eq!(tracker.session_id(), tracker.session_id());
    }

    #[test]
    fn test_affiliate_click_carries_session() {
        let tracker = tracker();
        tracker.track_affiliate_click(&AffiliateClick {
            asin: "B001".to_string(),
            product_name: "Widget".to_string(),
            category: Some("tools".to_string()),
            price: Some(19.99),
            rank: Some(3),
            source: ClickSource::Dashboard,
        });

        let events = tracker.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, TrackingEventType::AffiliateClick);
        assert_eq!(
            events[0].data["session_id"].as_str(),
            Some(tracker.session_id().as_str())
        );
        assert_eq!(events[0].data["asin"].as_str(), Some("B001"));
    }

    #[test]
    fn test_page_view_merges_metadata() {
        let tracker = tracker();
        tracker.track_page_view("/pricing", Some(serde_json::json!({ "referrer": "/blog" })));

        let events = tracker.events();
        assert_eq!(events[0].data["page"].as_str(), Some("/pricing"));
        assert_eq!(events[0].data["referrer"].as_str(), Some("/blog"));
    }

    #[test]
    fn test_signup_defaults_source() {
        let tracker = tracker();
        tracker.track_signup("pro", None);
        tracker.track_upgrade("free", "pro", 29.0);

        let events = tracker.events();
        assert_eq!(events[0].data["source"].as_str(), Some("direct"));
        assert_eq!(events[1].data["price"].as_f64(), Some(29.0));
    }

    #[test]
    fn test_tracked_link_appends_params() {
        let link =
            tracked_affiliate_link("https://example.com/item?id=5", ClickSource::Report).unwrap();
        assert!(link.contains("id=5"));
        assert!(link.contains("ref=splitlab"));
        assert!(link.contains("src=report"));
    }

    #[test]
    fn test_tracked_link_overwrites_existing_params() {
        let once =
            tracked_affiliate_link("https://example.com/item?id=5", ClickSource::Dashboard)
                .unwrap();
        let twice = tracked_affiliate_link(&once, ClickSource::Report).unwrap();

        assert_eq!(twice.matches("ref=splitlab").count(), 1);
        assert!(twice.contains("src=report"));
        assert!(!twice.contains("src=dashboard"));
        assert!(twice.contains("id=5"));
    }

    #[test]
    fn test_tracked_link_rejects_garbage() {
        assert!(tracked_affiliate_link("not a url", ClickSource::Api).is_err());
    }
}
