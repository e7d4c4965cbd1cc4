//! Synthetic broker/store fixtures. Used by the `evtelctl demo` subcommand
//! and available to integration tests so pipeline behavior can be
//! exercised without a real broker or durable store.

use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Receiver;
use rand::Rng;

use crate::clockid::now_epoch_ms;
use crate::core::errors::Result;
use crate::model::sample::{Outliers, RawSample, Severity};
use crate::model::Sample;
use crate::transport::{BrokerChannel, DurableStore, HistoryQuery};

/// Interval between synthetic live samples (5Hz — a plausible wire rate
/// per spec §3's "tens of Hz" framing).
const LIVE_SAMPLE_INTERVAL: Duration = Duration::from_millis(200);
/// Roughly one synthetic current-sensor outlier per this many samples.
const OUTLIER_EVERY_N: i64 = 13;

/// A synthetic broker standing in for a real pub/sub transport: always
/// reports one active session, replays a short synthetic history window,
/// and streams a sine-driven telemetry series on `subscribe`.
pub struct SyntheticBroker {
    session_id: String,
}

impl SyntheticBroker {
    #[must_use]
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
        }
    }
}

impl BrokerChannel for SyntheticBroker {
    fn active_session_id(&self) -> Result<Option<String>> {
        Ok(Some(self.session_id.clone()))
    }

    fn last_message_epoch_ms(&self, _session_id: &str) -> Result<Option<i64>> {
        Ok(Some(now_epoch_ms()))
    }

    fn fetch_history(&self, session_id: &str, query: HistoryQuery) -> Result<Vec<Sample>> {
        Ok(generate_series(session_id, query.since_epoch_ms, query.until_epoch_ms, 50))
    }

    fn subscribe(&self, session_id: &str) -> Result<Receiver<Sample>> {
        let (tx, rx) = crossbeam_channel::bounded(64);
        let session_id = session_id.to_string();
        thread::spawn(move || {
            let mut seq: i64 = 0;
            loop {
                let sample = synthetic_sample(&session_id, seq, now_epoch_ms());
                if tx.send(sample).is_err() {
                    return;
                }
                seq += 1;
                thread::sleep(LIVE_SAMPLE_INTERVAL);
            }
        });
        Ok(rx)
    }
}

/// A synthetic durable store returning a short seed history so the
/// Triangulator's merge path has something to triangulate against.
pub struct SyntheticStore;

impl DurableStore for SyntheticStore {
    fn fetch_since(&self, session_id: &str, since_epoch_ms: i64) -> Result<Vec<Sample>> {
        Ok(generate_series(session_id, since_epoch_ms, since_epoch_ms + 5_000, 10))
    }
}

fn generate_series(session_id: &str, since_ms: i64, until_ms: i64, count: usize) -> Vec<Sample> {
    if count == 0 || until_ms <= since_ms {
        return Vec::new();
    }
    let step = (until_ms - since_ms) / count as i64;
    (0..count)
        .map(|i| synthetic_sample(session_id, i as i64, since_ms + step * i as i64))
        .collect()
}

/// Generate one physically-plausible synthetic Sample: a sinusoidal speed
/// profile, a slowly draining battery, and an occasional flagged current
/// outlier so the Quality Analyzer's outlier-aggregation path has
/// something to aggregate.
#[must_use]
pub fn synthetic_sample(session_id: &str, seq: i64, epoch_ms: i64) -> Sample {
    let t = seq as f64 * 0.2;
    let speed_ms = (8.0 + 6.0 * (t * 0.3).sin()).max(0.0);
    let voltage_v = (57.0 - seq as f64 * 0.0008).max(50.5);
    let mut current_a = 8.0 + 3.0 * (t * 0.5).cos();

    let mut outliers = None;
    if seq > 0 && seq % OUTLIER_EVERY_N == 0 {
        let jitter = rand::rng().random_range(6.0..10.0);
        current_a += jitter;
        let mut reasons = BTreeMap::new();
        reasons.insert("current_a".to_string(), "spike exceeds rolling bound".to_string());
        outliers = Some(Outliers {
            flagged_fields: vec!["current_a".to_string()],
            severity: Severity::Warning,
            reasons,
        });
    }

    let power_w = voltage_v * current_a;
    let raw = RawSample {
        timestamp: None,
        message_id: Some(format!("{session_id}-{seq}")),
        session_id: Some(session_id.to_string()),
        voltage_v: Some(voltage_v),
        current_a: Some(current_a),
        power_w: Some(power_w),
        energy_j: Some(seq as f64 * 400.0),
        speed_ms: Some(speed_ms),
        distance_m: Some(seq as f64 * 1.5),
        throttle_pct: Some(((speed_ms / 14.0) * 100.0).clamp(0.0, 100.0)),
        brake_pct: Some(0.0),
        accel_x: Some(0.05 * (t * 0.7).sin()),
        accel_y: Some(0.02 * (t * 0.9).cos()),
        accel_z: Some(1.0),
        gyro_x: Some(0.0),
        gyro_y: Some(0.0),
        gyro_z: Some(0.01 * t.sin()),
        latitude: Some(37.4 + seq as f64 * 0.000_01),
        longitude: Some(-122.1 - seq as f64 * 0.000_01),
        altitude: Some(30.0),
        outliers,
        ..Default::default()
    };
    Sample::normalize(raw, Some(epoch_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_sample_has_plausible_ranges() {
        let sample = synthetic_sample("s1", 0, 1_000);
        assert!(sample.voltage_v > 50.0 && sample.voltage_v < 60.0);
        assert!(sample.speed_ms >= 0.0);
    }

    #[test]
    fn outliers_flagged_periodically() {
        let flagged = (0..OUTLIER_EVERY_N * 3)
            .filter(|&seq| synthetic_sample("s1", seq, 1_000).outliers.is_some())
            .count();
        assert_eq!(flagged, 2);
    }

    #[test]
    fn history_window_respects_bounds() {
        let series = generate_series("s1", 1_000, 1_000, 10);
        assert!(series.is_empty());
        let series = generate_series("s1", 0, 10_000, 5);
        assert_eq!(series.len(), 5);
    }
}
