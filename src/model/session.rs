//! `Session` — an opaque identifier plus its causally ordered Samples
//! (spec §3).

use super::DerivedSample;

/// A session: an id and the causally ordered sequence of its derived
/// samples currently held in memory. Invariant: every Sample in `samples`
/// carries `id` as its `session_id` (spec §3) — a change of `session_id`
/// observed on an incoming live message is a *session rollover* (§4.9),
/// handled by the Realtime Controller, not by this type.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub id: String,
    pub samples: Vec<DerivedSample>,
}

impl Session {
    /// Start a new, empty session with the given id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            samples: Vec::new(),
        }
    }

    /// Whether every sample in this session actually carries `self.id` as
    /// its `session_id` — the invariant spec §3 requires of the in-memory
    /// buffer.
    #[must_use]
    pub fn is_homogeneous(&self) -> bool {
        self.samples.iter().all(|s| s.sample.session_id == self.id)
    }
}
