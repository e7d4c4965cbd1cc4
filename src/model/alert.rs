//! `Alert` — a cooldown-governed notification (spec §3, §5).

use serde::{Deserialize, Serialize};

/// Alert severity, distinct from [`super::Severity`] (which classifies
/// outliers on a Sample) — an Alert is a notification-surface concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Warn,
    Err,
}

/// A single alert raised by the Quality Analyzer or the Realtime
/// Controller, subject to the cooldown policy in spec §5.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub text: String,
    /// The cooldown bucket this alert belongs to (`data_stall`,
    /// `sensor_anomaly`, `connection_lost`, `no_session`, or a dynamic key
    /// such as `outlier_metadata_missing`).
    pub cooldown_key: &'static str,
}

impl Alert {
    /// Build a warning-level alert.
    #[must_use]
    pub fn warn(text: impl Into<String>, cooldown_key: &'static str) -> Self {
        Self {
            kind: AlertKind::Warn,
            text: text.into(),
            cooldown_key,
        }
    }

    /// Build an error-level alert.
    #[must_use]
    pub fn err(text: impl Into<String>, cooldown_key: &'static str) -> Self {
        Self {
            kind: AlertKind::Err,
            text: text.into(),
            cooldown_key,
        }
    }
}
