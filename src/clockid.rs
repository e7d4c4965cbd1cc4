//! Clock & Identity Helpers (C1) — timestamp parsing and the composite key
//! that uniquely identifies a Sample within a session (spec.md §4.1).

use chrono::{DateTime, Utc};

use crate::core::errors::{CoreError, Result};

/// Parse an RFC3339/ISO-8601 timestamp into epoch milliseconds.
///
/// # Errors
/// Returns [`CoreError::BadTimestamp`] if `raw` does not parse to a finite
/// instant. Callers implementing the Normalization Error policy (spec §7)
/// should fall back to [`now_epoch_ms`] rather than propagate this error.
pub fn parse_epoch_ms(raw: &str) -> Result<i64> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.timestamp_millis())
        .map_err(|_| CoreError::BadTimestamp {
            raw: raw.to_string(),
        })
}

/// Parse a timestamp, falling back to the current wall-clock time on any
/// normalization failure (spec §7: "replace with safe default... never
/// surfaced").
#[must_use]
pub fn parse_epoch_ms_or_now(raw: &str) -> i64 {
    parse_epoch_ms(raw).unwrap_or_else(|_| now_epoch_ms())
}

/// Current wall-clock time as epoch milliseconds.
#[must_use]
pub fn now_epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Composite key `(epoch_ms, message_id ?? "")` that identifies a Sample
/// within a session (spec §4.1). Ordering is by `epoch_ms` ascending, ties
/// broken by `message_id` lexicographically — the derived `Ord` on a
/// two-field tuple struct gives exactly that for free.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompositeKey {
    epoch_ms: i64,
    message_id: String,
}

impl CompositeKey {
    /// Build a composite key from its two components. `message_id` of
    /// `None` is normalized to the empty string, matching spec §4.1's
    /// `message_id ?? ""`.
    #[must_use]
    pub fn new(epoch_ms: i64, message_id: Option<&str>) -> Self {
        Self {
            epoch_ms,
            message_id: message_id.unwrap_or("").to_string(),
        }
    }

    /// The epoch-millisecond component.
    #[must_use]
    pub const fn epoch_ms(&self) -> i64 {
        self.epoch_ms
    }

    /// The message-id component (empty string if absent).
    #[must_use]
    pub fn message_id(&self) -> &str {
        &self.message_id
    }
}
