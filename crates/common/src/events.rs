//! Bounded append-only event logs
//!
//! Each log is a JSON array under a single store key, capped at a fixed
//! capacity. Appends evict the oldest entries first; retained entries keep
//! their insertion order. Entries are never mutated or deleted
//! individually.

use crate::store::{read_json_or_default, write_json_best_effort, StoreBackend};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Capacity of the general experiment event log
pub const GENERAL_LOG_CAPACITY: usize = 1000;
/// Capacity of the site tracking event log
pub const TRACKING_LOG_CAPACITY: usize = 500;

/// Read a log, returning an empty list when absent or unreadable
pub fn read_log<T, S>(store: &S, key: &str) -> Vec<T>
where
    T: DeserializeOwned,
    S: StoreBackend + ?Sized,
{
    read_json_or_default(store, key)
}

/// Append an entry to a bounded log.
///
/// Single synchronous read-modify-write; the write is best-effort and a
/// storage failure drops the entry. Returns whether the entry was
/// persisted.
pub fn append_bounded<T, S>(store: &S, key: &str, capacity: usize, entry: T) -> bool
where
    T: Serialize + DeserializeOwned,
    S: StoreBackend + ?Sized,
{
    let mut log: Vec<T> = read_log(store, key);
    log.push(entry);
    if log.len() > capacity {
        let excess = log.len() - capacity;
        log.drain(..excess);
    }
    write_json_best_effort(store, key, &log)
}
