//! `ConnectionState` — the Realtime Controller's state machine states
//! (spec §3, §4.9).

use serde::{Deserialize, Serialize};

/// One of the five states the Realtime Controller (C9) can occupy. Exactly
/// one is active at a time (spec §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Loading,
    WaitingForSession,
    Connected,
    Failed,
}

impl ConnectionState {
    /// Human-readable name, used in `onStateChange` events and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Loading => "loading",
            Self::WaitingForSession => "waiting_for_session",
            Self::Connected => "connected",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
