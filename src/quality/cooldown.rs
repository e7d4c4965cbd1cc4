//! Cooldown gate protecting the notification surface from flooding
//! (spec §5).

use std::time::{Duration, Instant};

/// One monotonic cooldown bucket. The Realtime Controller holds one
/// `CooldownGate` per alert kind (`data_stall`, `sensor_anomaly`,
/// `connection_lost`, `no_session`) and consults it before surfacing an
/// alert of that kind. Grounded on the teacher's per-notification cooldown
/// tracking in `daemon/notifications.rs` and the repeat-deletion cooldown
/// atomics in `daemon/loop_main.rs`.
///
/// `CooldownGate` is not internally synchronized: it is owned by the
/// single-threaded Realtime Controller (spec §5: "Each alert path reads
/// and updates its cooldown atomically within the single-threaded UI
/// context"), so `&mut self` is sufficient — no `Mutex` is needed.
#[derive(Debug, Clone)]
pub struct CooldownGate {
    period: Duration,
    last_fired: Option<Instant>,
}

impl CooldownGate {
    /// Create a gate with the given cooldown period.
    #[must_use]
    pub const fn new(period: Duration) -> Self {
        Self {
            period,
            last_fired: None,
        }
    }

    /// Whether an alert may fire right now, and if so, record that it did.
    /// Returns `true` at most once per `period`.
    pub fn try_fire(&mut self, now: Instant) -> bool {
        match self.last_fired {
            Some(last) if now.duration_since(last) < self.period => false,
            _ => {
                self.last_fired = Some(now);
                true
            }
        }
    }

    /// Whether the gate is currently open, without consuming it.
    #[must_use]
    pub fn is_open(&self, now: Instant) -> bool {
        match self.last_fired {
            Some(last) => now.duration_since(last) >= self.period,
            None => true,
        }
    }
}
