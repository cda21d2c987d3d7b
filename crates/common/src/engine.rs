//! Experiment assignment and event recording
//!
//! Bucketing is sticky: the first resolution of an experiment draws a
//! variant with weighted random selection, persists it, and emits a view
//! event; every later resolution returns the persisted variant unchanged.
//! Storage failures never surface to the caller. A resolution against an
//! unavailable store still returns a drawn variant, it just will not
//! stick.

use crate::catalog::ExperimentCatalog;
use crate::events::{append_bounded, read_log, GENERAL_LOG_CAPACITY};
use crate::store::{
    read_json_or_default, write_json_best_effort, StoreBackend, ASSIGNMENTS_KEY, EVENTS_KEY,
    VISITOR_ID_KEY,
};
use crate::types::{Event, EventType, Experiment, CONTROL_VARIANT};
use crate::types::VariantStats;
use rand::Rng;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Sticky experiment bucketing over a pluggable store
pub struct ExperimentEngine<S: StoreBackend> {
    catalog: ExperimentCatalog,
    store: S,
}

impl<S: StoreBackend> ExperimentEngine<S> {
    pub fn new(catalog: ExperimentCatalog, store: S) -> Self {
        Self { catalog, store }
    }

    pub fn catalog(&self) -> &ExperimentCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Opaque persisted visitor identifier, created on first use
    pub fn visitor_id(&self) -> String {
        if let Ok(Some(id)) = self.store.get(VISITOR_ID_KEY) {
            return id;
        }
        let id = uuid::Uuid::new_v4().to_string();
        if let Err(e) = self.store.put(VISITOR_ID_KEY, &id) {
            debug!("Could not persist visitor id: {}", e);
        }
        id
    }

    /// Resolve the variant for an experiment, bucketing the visitor on
    /// first encounter.
    ///
    /// Unknown and inactive experiments resolve to the control variant
    /// without persisting anything or emitting an event.
    pub fn resolve_variant(&self, experiment_id: &str) -> String {
        let experiment = match self.catalog.get(experiment_id) {
            Some(exp) if exp.is_active => exp,
            _ => return CONTROL_VARIANT.to_string(),
        };

        let assignments = self.assignments();
        if let Some(variant) = assignments.get(experiment_id) {
            return variant.clone();
        }

        let drawn = draw_variant(experiment, &mut rand::thread_rng()).to_string();

        // Re-read before writing so a concurrently persisted assignment
        // wins over our draw (last-write-wins would desync events).
        let mut assignments = self.assignments();
        if let Some(existing) = assignments.get(experiment_id) {
            return existing.clone();
        }
        assignments.insert(experiment_id.to_string(), drawn.clone());
        write_json_best_effort(&self.store, ASSIGNMENTS_KEY, &assignments);

        self.record_event(experiment_id, &drawn, EventType::View, None);
        debug!("Assigned {} to variant {}", experiment_id, drawn);
        drawn
    }

    /// The persisted assignment map (experiment id -> variant)
    pub fn assignments(&self) -> HashMap<String, String> {
        read_json_or_default(&self.store, ASSIGNMENTS_KEY)
    }

    /// The general experiment event log, oldest first
    pub fn events(&self) -> Vec<Event> {
        read_log(&self.store, EVENTS_KEY)
    }

    /// Append an event to the general log. Best-effort: a full or
    /// unavailable store drops the event.
    pub fn record_event(
        &self,
        experiment_id: &str,
        variant: &str,
        event_type: EventType,
        metadata: Option<Value>,
    ) {
        let mut event = Event::new(experiment_id, variant, event_type);
        if let Some(metadata) = metadata {
            event = event.with_metadata(metadata);
        }
        append_bounded(&self.store, EVENTS_KEY, GENERAL_LOG_CAPACITY, event);
    }

    /// Record a click against the visitor's current variant, bucketing
    /// first if this experiment has not been encountered yet
    pub fn record_click(&self, experiment_id: &str, element_id: Option<&str>) {
        let variant = self.resolve_variant(experiment_id);
        let metadata = element_id.map(|id| serde_json::json!({ "element_id": id }));
        self.record_event(experiment_id, &variant, EventType::Click, metadata);
    }

    /// Record a conversion against the visitor's current variant
    pub fn record_conversion(&self, experiment_id: &str, metadata: Option<Value>) {
        let variant = self.resolve_variant(experiment_id);
        self.record_event(experiment_id, &variant, EventType::Conversion, metadata);
    }

    /// Aggregate per-variant counters for one experiment
    pub fn stats(&self, experiment_id: &str) -> BTreeMap<String, VariantStats> {
        crate::stats::experiment_stats(&self.events(), experiment_id)
    }

    /// Clear the visitor's persisted state: identifier, assignments, and
    /// the general event log
    pub fn reset(&self) -> crate::Result<()> {
        self.store.delete(VISITOR_ID_KEY)?;
        self.store.delete(ASSIGNMENTS_KEY)?;
        self.store.delete(EVENTS_KEY)?;
        Ok(())
    }
}

/// Draw a variant by weighted random selection.
///
/// Missing or length-mismatched weights fall back to a uniform draw.
/// Zero-weight variants are skipped outright, so they behave as defined
/// but disabled. Exhausting the scan (a floating-point edge) falls back
/// to the first variant. An experiment without variants yields the
/// control variant; the catalog rejects such definitions, but the struct
/// fields are public.
pub fn draw_variant<'a, R: Rng>(experiment: &'a Experiment, rng: &mut R) -> &'a str {
    let variants = &experiment.variants;
    if variants.is_empty() {
        return CONTROL_VARIANT;
    }

    let weights = match &experiment.weights {
        Some(weights) if weights.len() == variants.len() => weights,
        _ => {
            let index = rng.gen_range(0..variants.len());
            return &variants[index];
        }
    };

    let total_weight: f64 = weights.iter().sum();
    let mut remaining = rng.gen::<f64>() * total_weight;

    for (variant, weight) in variants.iter().zip(weights) {
        if *weight <= 0.0 {
            continue;
        }
        remaining -= weight;
        if remaining <= 0.0 {
            return variant;
        }
    }

    &variants[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FailingStore, MemoryStore};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn test_catalog() -> ExperimentCatalog {
        ExperimentCatalog::new(vec![
            Experiment {
                id: "cta".to_string(),
                name: "CTA test".to_string(),
                variants: vec!["control".to_string(), "bold".to_string()],
                weights: None,
                is_active: true,
            },
            Experiment {
                id: "dormant".to_string(),
                name: "Retired test".to_string(),
                variants: vec!["a".to_string(), "b".to_string()],
                weights: None,
                is_active: false,
            },
        ])
        .unwrap()
    }

    fn engine() -> ExperimentEngine<MemoryStore> {
        ExperimentEngine::new(test_catalog(), MemoryStore::new())
    }

    #[test]
    fn test_sticky_assignment_emits_single_view() {
        let engine = engine();

        let first = engine.resolve_variant("cta");
        let second = engine.resolve_variant("cta");
        assert_eq!(first, second);

        let events = engine.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::View);
        assert_eq!(events[0].experiment_id, "cta");
        assert_eq!(events[0].variant, first);
    }

    #[test]
    fn test_unknown_experiment_resolves_to_control() {
        let engine = engine();
        assert_eq!(engine.resolve_variant("missing"), CONTROL_VARIANT);
        assert!(engine.assignments().is_empty());
        assert!(engine.events().is_empty());
    }

    #[test]
    fn test_inactive_experiment_resolves_to_control() {
        let engine = engine();
        assert_eq!(engine.resolve_variant("dormant"), CONTROL_VARIANT);
        assert!(engine.assignments().is_empty());
        assert!(engine.events().is_empty());
    }

    #[test]
    fn test_click_before_resolve_buckets_implicitly() {
        let engine = engine();
        engine.record_click("cta", Some("signup-button"));

        let assignments = engine.assignments();
        let variant = assignments.get("cta").expect("assignment created");

        let events = engine.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, EventType::View);
        assert_eq!(events[1].event_type, EventType::Click);
        assert!(events.iter().all(|e| &e.variant == variant));
        assert_eq!(
            events[1].metadata,
            Some(serde_json::json!({ "element_id": "signup-button" }))
        );
    }

    #[test]
    fn test_conversion_reports_assigned_variant() {
        let engine = engine();
        let variant = engine.resolve_variant("cta");
        engine.record_conversion("cta", Some(serde_json::json!({ "plan": "pro" })));

        let events = engine.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].event_type, EventType::Conversion);
        assert_eq!(events[1].variant, variant);
    }

    #[test]
    fn test_visitor_id_is_stable() {
        let engine = engine();
        let first = engine.visitor_id();
        let second = engine.visitor_id();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn test_failing_store_never_surfaces() {
        let engine = ExperimentEngine::new(test_catalog(), FailingStore);

        // Resolution still hands back a usable variant
        let variant = engine.resolve_variant("cta");
        assert!(["control", "bold"].contains(&variant.as_str()));

        // Tracking calls are silently dropped
        engine.record_click("cta", None);
        engine.record_conversion("cta", None);
        assert!(engine.events().is_empty());

        // The visitor id is generated fresh each time but never panics
        assert!(!engine.visitor_id().is_empty());
    }

    #[test]
    fn test_weighted_distribution() {
        let experiment = Experiment {
            id: "w".to_string(),
            name: "w".to_string(),
            variants: vec!["a".to_string(), "b".to_string()],
            weights: Some(vec![3.0, 1.0]),
            is_active: true,
        };
        let mut rng = StdRng::seed_from_u64(42);

        let draws = 10_000;
        let mut a = 0u32;
        for _ in 0..draws {
            if draw_variant(&experiment, &mut rng) == "a" {
                a += 1;
            }
        }

        // Expect roughly 3:1, i.e. ~7500 of 10000, within 10%
        assert!((6750..=8250).contains(&a), "a drawn {} times", a);
    }

    #[test]
    fn test_zero_weight_variant_never_drawn() {
        let experiment = Experiment {
            id: "z".to_string(),
            name: "z".to_string(),
            variants: vec!["a".to_string(), "b".to_string()],
            weights: Some(vec![1.0, 0.0]),
            is_active: true,
        };
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..10_000 {
            assert_eq!(draw_variant(&experiment, &mut rng), "a");
        }
    }

    #[test]
    fn test_mismatched_weights_fall_back_to_uniform() {
        let experiment = Experiment {
            id: "m".to_string(),
            name: "m".to_string(),
            variants: vec!["a".to_string(), "b".to_string()],
            weights: Some(vec![1.0]),
            is_active: true,
        };
        let mut rng = StdRng::seed_from_u64(3);

        let mut b = 0u32;
        for _ in 0..10_000 {
            if draw_variant(&experiment, &mut rng) == "b" {
                b += 1;
            }
        }
        // A uniform draw must reach the variant the lone weight ignores
        assert!((4000..=6000).contains(&b), "b drawn {} times", b);
    }

    #[test]
    fn test_empty_variant_list_yields_control() {
        let experiment = Experiment {
            id: "e".to_string(),
            name: "e".to_string(),
            variants: Vec::new(),
            weights: None,
            is_active: true,
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(draw_variant(&experiment, &mut rng), CONTROL_VARIANT);
    }

    #[test]
    fn test_reset_clears_state() {
        let engine = engine();
        engine.resolve_variant("cta");
        engine.visitor_id();
        engine.reset().unwrap();

        assert!(engine.assignments().is_empty());
        assert!(engine.events().is_empty());
    }
}
