//! Key-value storage layer
//!
//! Persisted state is a handful of JSON values under well-known keys.
//! Backends return explicit `Result`s so callers can see the best-effort
//! contract in the signature; the tracking paths log and discard write
//! failures rather than propagating them.

use crate::Result;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tracing::debug;

/// Key under which the visitor identifier is persisted
pub const VISITOR_ID_KEY: &str = "visitor_id";
/// Key under which the session identifier is persisted
pub const SESSION_ID_KEY: &str = "session_id";
/// Key holding the experiment id -> variant assignment map
pub const ASSIGNMENTS_KEY: &str = "ab_assignments";
/// Key holding the general experiment event log
pub const EVENTS_KEY: &str = "ab_events";
/// Key holding the site tracking event log
pub const TRACKING_EVENTS_KEY: &str = "tracking_events";

/// Pluggable key-value storage backend
pub trait StoreBackend: Send + Sync {
    /// Fetch the value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key` and its value
    fn delete(&self, key: &str) -> Result<()>;
}

/// Read and parse a persisted JSON value, degrading to the default on any
/// failure. A missing key, an unreadable backend, and corrupted JSON are
/// all treated as "absent".
pub fn read_json_or_default<T, S>(store: &S, key: &str) -> T
where
    T: DeserializeOwned + Default,
    S: StoreBackend + ?Sized,
{
    match store.get(key) {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                debug!("Discarding corrupted value under {}: {}", key, e);
                T::default()
            }
        },
        Ok(None) => T::default(),
        Err(e) => {
            debug!("Store read failed for {}: {}", key, e);
            T::default()
        }
    }
}

/// Serialize and write a JSON value, logging and swallowing failures.
/// Returns whether the write took effect.
pub fn write_json_best_effort<T, S>(store: &S, key: &str, value: &T) -> bool
where
    T: serde::Serialize,
    S: StoreBackend + ?Sized,
{
    let raw = match serde_json::to_string(value) {
        Ok(raw) => raw,
        Err(e) => {
            debug!("Failed to serialize value for {}: {}", key, e);
            return false;
        }
    };
    match store.put(key, &raw) {
        Ok(()) => true,
        Err(e) => {
            debug!("Dropping write to {}: {}", key, e);
            false
        }
    }
}

/// In-memory backend for tests and ephemeral use
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreBackend for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Backend that fails every operation, for exercising degraded paths
#[cfg(test)]
pub(crate) struct FailingStore;

#[cfg(test)]
impl StoreBackend for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(crate::Error::Storage("backend unavailable".to_string()))
    }

    fn put(&self, _key: &str, _value: &str) -> Result<()> {
        Err(crate::Error::Storage("backend unavailable".to_string()))
    }

    fn delete(&self, _key: &str) -> Result<()> {
        Err(crate::Error::Storage("backend unavailable".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.put("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("v".to_string()));
        store.delete("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_corrupted_json_degrades_to_default() {
        let store = MemoryStore::new();
        store.put(ASSIGNMENTS_KEY, "{not json").unwrap();
        let map: HashMap<String, String> = read_json_or_default(&store, ASSIGNMENTS_KEY);
        assert!(map.is_empty());
    }

    #[test]
    fn test_failing_store_degrades_to_default() {
        let map: HashMap<String, String> = read_json_or_default(&FailingStore, ASSIGNMENTS_KEY);
        assert!(map.is_empty());
        assert!(!write_json_best_effort(&FailingStore, ASSIGNMENTS_KEY, &map));
    }
}
