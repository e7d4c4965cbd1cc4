//! `DerivedSample` — a Sample plus derived physical quantities (spec §3).

use serde::{Deserialize, Serialize};

use super::Sample;
use crate::clockid::CompositeKey;

/// A Sample plus orientation and bias-compensated g-force quantities
/// produced by the Derivation Engine (C3). Invariant: the raw fields equal
/// the originating Sample's; derivations are a pure function of the
/// Sample and the engine's prior state (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedSample {
    #[serde(flatten)]
    pub sample: Sample,
    pub roll_deg: f64,
    pub pitch_deg: f64,
    pub g_long: f64,
    pub g_lat: f64,
    pub g_total: f64,
    pub total_acceleration: f64,
}

impl DerivedSample {
    /// The composite key of the underlying Sample.
    #[must_use]
    pub fn key(&self) -> CompositeKey {
        self.sample.key()
    }

    /// The underlying Sample's epoch-millisecond timestamp, used for
    /// Ring Buffer ordering invariants (spec §8, properties 1-3).
    #[must_use]
    pub const fn epoch_ms(&self) -> i64 {
        self.sample.epoch_ms
    }
}
