//! EVT-prefixed error types with structured error codes.

#![allow(missing_docs)]

use thiserror::Error;

/// Shared `Result` alias for the crate.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Top-level error type for the EV telemetry pipeline.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("[EVT-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[EVT-1002] missing configuration file: {path}")]
    MissingConfig { path: String },

    #[error("[EVT-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[EVT-2001] unparseable timestamp: {raw}")]
    BadTimestamp { raw: String },

    #[error("[EVT-2002] broker transport failure: {details}")]
    Transport { details: String },

    #[error("[EVT-2003] durable store fetch failure for session {session_id}: {details}")]
    StoreFetch {
        session_id: String,
        details: String,
    },

    #[error("[EVT-2004] broker history fetch failure: {details}")]
    HistoryFetch { details: String },

    #[error("[EVT-3001] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[EVT-3002] worker channel closed: {component}")]
    ChannelClosed { component: &'static str },

    #[error("[EVT-3003] worker unresponsive for {millis_silent}ms")]
    WorkerStalled { millis_silent: u64 },

    #[error("[EVT-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl CoreError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "EVT-1001",
            Self::MissingConfig { .. } => "EVT-1002",
            Self::ConfigParse { .. } => "EVT-1003",
            Self::BadTimestamp { .. } => "EVT-2001",
            Self::Transport { .. } => "EVT-2002",
            Self::StoreFetch { .. } => "EVT-2003",
            Self::HistoryFetch { .. } => "EVT-2004",
            Self::Serialization { .. } => "EVT-3001",
            Self::ChannelClosed { .. } => "EVT-3002",
            Self::WorkerStalled { .. } => "EVT-3003",
            Self::Runtime { .. } => "EVT-3900",
        }
    }

    /// Whether retrying might resolve the failure. Used by the Triangulator's
    /// graceful-degradation paths (spec §4.8 failure semantics) to decide
    /// whether a source outage should still count toward `onDataReady.stats`.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::StoreFetch { .. }
                | Self::HistoryFetch { .. }
                | Self::ChannelClosed { .. }
                | Self::WorkerStalled { .. }
                | Self::Runtime { .. }
        )
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for CoreError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
