//! CLI command implementations

pub mod catalog;
pub mod inspect;
pub mod track;

/// Render a millisecond epoch timestamp for table output
pub fn format_timestamp(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ms.to_string())
}
