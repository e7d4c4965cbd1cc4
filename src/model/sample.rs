//! `Sample` — one telemetry reading (spec.md §3).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clockid::{parse_epoch_ms_or_now, CompositeKey};

/// Outlier severity, as flagged by the upstream publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Outlier metadata attached to a Sample by the upstream publisher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outliers {
    pub flagged_fields: Vec<String>,
    pub severity: Severity,
    #[serde(default)]
    pub reasons: BTreeMap<String, String>,
}

/// One telemetry reading. Field defaults follow spec §3: "Missing numeric
/// fields default to 0 after normalization."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: String,
    pub epoch_ms: i64,
    pub message_id: Option<String>,
    pub session_id: String,

    pub voltage_v: f64,
    pub current_a: f64,
    pub power_w: f64,
    pub energy_j: f64,

    pub speed_ms: f64,
    pub distance_m: f64,
    pub throttle_pct: f64,
    pub brake_pct: f64,

    pub accel_x: f64,
    pub accel_y: f64,
    pub accel_z: f64,
    pub gyro_x: f64,
    pub gyro_y: f64,
    pub gyro_z: f64,

    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,

    pub outliers: Option<Outliers>,

    /// Names of numeric fields that were absent on the wire and defaulted
    /// to 0 during normalization. Used by the Quality Analyzer's
    /// field-completeness tracking (spec §4.5) — distinct from a field
    /// that was legitimately transmitted as 0.
    #[serde(default)]
    pub missing_fields: Vec<String>,

    /// Unknown wire keys, preserved verbatim (including any altitude alias
    /// key that was consumed to populate `altitude`).
    #[serde(default)]
    pub extras: BTreeMap<String, Value>,
}

/// Raw wire-format payload as received from the broker or the durable
/// store, before normalization. Mirrors spec.md §6: "JSON object; required
/// is at minimum a timestamp resolvable to epoch; all other fields
/// optional with 0 defaults."
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSample {
    pub timestamp: Option<String>,
    pub message_id: Option<String>,
    pub session_id: Option<String>,

    pub voltage_v: Option<f64>,
    pub current_a: Option<f64>,
    pub power_w: Option<f64>,
    pub energy_j: Option<f64>,

    pub speed_ms: Option<f64>,
    pub distance_m: Option<f64>,
    pub throttle_pct: Option<f64>,
    pub brake_pct: Option<f64>,

    pub accel_x: Option<f64>,
    pub accel_y: Option<f64>,
    pub accel_z: Option<f64>,
    pub gyro_x: Option<f64>,
    pub gyro_y: Option<f64>,
    pub gyro_z: Option<f64>,

    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub altitude_m: Option<f64>,
    pub elevation: Option<f64>,
    pub gps_altitude: Option<f64>,
    pub alt: Option<f64>,

    pub outliers: Option<Outliers>,

    #[serde(flatten)]
    pub extras: BTreeMap<String, Value>,
}

const KNOWN_FIELDS: &[&str] = &[
    "timestamp",
    "message_id",
    "session_id",
    "voltage_v",
    "current_a",
    "power_w",
    "energy_j",
    "speed_ms",
    "distance_m",
    "throttle_pct",
    "brake_pct",
    "accel_x",
    "accel_y",
    "accel_z",
    "gyro_x",
    "gyro_y",
    "gyro_z",
    "latitude",
    "longitude",
    "altitude",
    "altitude_m",
    "elevation",
    "gps_altitude",
    "alt",
    "outliers",
];

fn finite_or_zero(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

impl Sample {
    /// Normalize a raw wire payload into a `Sample`: resolves the altitude
    /// alias chain (`altitude`, `altitude_m`, `elevation`, `gps_altitude`,
    /// `alt`, first-match-wins in that order), replaces missing/non-finite
    /// numerics with 0, and falls back to "now" for an unparseable or
    /// absent timestamp (spec §3, §7).
    #[must_use]
    pub fn normalize(raw: RawSample, fallback_wall_clock_ms: Option<i64>) -> Self {
        let timestamp = raw.timestamp.clone().unwrap_or_default();
        let epoch_ms = match &raw.timestamp {
            Some(ts) => parse_epoch_ms_or_now(ts),
            None => fallback_wall_clock_ms.unwrap_or_else(crate::clockid::now_epoch_ms),
        };

        let altitude = raw
            .altitude
            .or(raw.altitude_m)
            .or(raw.elevation)
            .or(raw.gps_altitude)
            .or(raw.alt);

        let mut extras = raw.extras;
        extras.retain(|k, _| !KNOWN_FIELDS.contains(&k.as_str()));

        let mut missing_fields = Vec::new();
        macro_rules! track {
            ($field:expr, $name:literal) => {{
                let present = matches!($field, Some(v) if v.is_finite());
                if !present {
                    missing_fields.push($name.to_string());
                }
                finite_or_zero($field)
            }};
        }

        Self {
            timestamp,
            epoch_ms,
            message_id: raw.message_id,
            session_id: raw.session_id.unwrap_or_default(),
            voltage_v: track!(raw.voltage_v, "voltage_v"),
            current_a: track!(raw.current_a, "current_a"),
            power_w: track!(raw.power_w, "power_w"),
            energy_j: track!(raw.energy_j, "energy_j"),
            speed_ms: track!(raw.speed_ms, "speed_ms"),
            distance_m: track!(raw.distance_m, "distance_m"),
            throttle_pct: track!(raw.throttle_pct, "throttle_pct"),
            brake_pct: track!(raw.brake_pct, "brake_pct"),
            accel_x: track!(raw.accel_x, "accel_x"),
            accel_y: track!(raw.accel_y, "accel_y"),
            accel_z: track!(raw.accel_z, "accel_z"),
            gyro_x: track!(raw.gyro_x, "gyro_x"),
            gyro_y: track!(raw.gyro_y, "gyro_y"),
            gyro_z: track!(raw.gyro_z, "gyro_z"),
            latitude: track!(raw.latitude, "latitude"),
            longitude: track!(raw.longitude, "longitude"),
            altitude: track!(altitude, "altitude"),
            missing_fields,
            outliers: raw.outliers,
            extras,
        }
    }

    /// Parse and normalize a JSON wire payload directly.
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if `payload` is not valid JSON at all
    /// (malformed JSON is not a normalization concern — it is a transport
    /// framing error).
    pub fn from_json(payload: &str, fallback_wall_clock_ms: Option<i64>) -> serde_json::Result<Self> {
        let raw: RawSample = serde_json::from_str(payload)?;
        Ok(Self::normalize(raw, fallback_wall_clock_ms))
    }

    /// The composite key identifying this Sample within its session.
    #[must_use]
    pub fn key(&self) -> CompositeKey {
        CompositeKey::new(self.epoch_ms, self.message_id.as_deref())
    }
}
