//! External interfaces (spec §6): the broker channel and durable store the
//! Triangulator and Realtime Controller depend on, abstracted as traits so
//! the demo fixtures and real transports can share the pipeline unchanged.
//! Grounded on the trait-based platform abstraction in `platform/pal.rs`.

use crate::core::errors::Result;
use crate::model::Sample;

/// A bounded time window used for both broker-history and durable-store
/// queries (spec §4.8 steps 2-3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryQuery {
    pub since_epoch_ms: i64,
    pub until_epoch_ms: i64,
}

/// Live broker connection: session discovery, bounded history replay, and a
/// live subscription. A session id of `None` from `active_session_id` means
/// no session is currently live (spec §4.9's `waiting_for_session` state).
pub trait BrokerChannel: Send + Sync {
    /// The currently active session id, if any.
    fn active_session_id(&self) -> Result<Option<String>>;

    /// Epoch-ms timestamp of the most recent message on `session_id`, used
    /// for the active-session freshness check (spec §6
    /// `active_session_freshness_ms`).
    fn last_message_epoch_ms(&self, session_id: &str) -> Result<Option<i64>>;

    /// Fetch buffered history for `session_id` within `query`'s window
    /// (spec §4.8 step 3).
    fn fetch_history(&self, session_id: &str, query: HistoryQuery) -> Result<Vec<Sample>>;

    /// Begin a live subscription to `session_id`. Returns a receiving end
    /// the Realtime Controller polls for new samples.
    fn subscribe(&self, session_id: &str) -> Result<crossbeam_channel::Receiver<Sample>>;
}

/// Durable store of previously ingested samples, independent of the
/// broker's retention window (spec §4.8 step 2).
pub trait DurableStore: Send + Sync {
    /// Fetch samples for `session_id` recorded at or after `since_epoch_ms`.
    fn fetch_since(&self, session_id: &str, since_epoch_ms: i64) -> Result<Vec<Sample>>;
}
