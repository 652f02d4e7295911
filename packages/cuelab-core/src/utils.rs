//! General utilities shared across the application.

use std::time::{SystemTime, UNIX_EPOCH};

// ─────────────────────────────────────────────────────────────────────────────
// Time Utilities
// ─────────────────────────────────────────────────────────────────────────────

/// Returns the current Unix timestamp in milliseconds.
///
/// Returns 0 if the system clock is before the Unix epoch (shouldn't happen in practice).
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Returns the current local wall-clock time formatted for the duration log.
///
/// Format: `HH:MM:SS.mmm`. Duration-log lines are read by experimenters, so
/// local time is used rather than UTC.
#[must_use]
pub fn now_stamp() -> String {
    chrono::Local::now().format("%H:%M:%S%.3f").to_string()
}
