//! Configuration system: TOML file + smart defaults.
//!
//! Mirrors every key in spec.md §6's "Configuration (recognized keys)" table.

#![allow(missing_docs)]

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::errors::{CoreError, Result};

/// Full pipeline configuration model. Every field has a default matching
/// spec.md §6 so a missing `config.toml` still yields a usable pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Ring buffer capacity (C2). Default 50_000.
    pub max_points: usize,
    /// Chart downsample threshold — consumed by the Render Scheduler's
    /// chart tier, not by this crate's core math.
    pub downsample_threshold: usize,
    /// Liveness window for an active-session history check (§4.8 step 2).
    ///
    /// Two versions of the original source used 30s for this window and a
    /// *separate* 60s/120s constant for `history_lookback_ms` (open question
    /// in spec.md §9) — they are independent knobs and must not be conflated.
    pub active_session_freshness_ms: i64,
    /// How far back the broker history query reaches from "now" when the
    /// attach-anchor form is unavailable (§4.8 step 3). The original source
    /// disagreed between 60s and 120s; we default to 60s. A larger window
    /// covers longer bridge delays between transport-connect and
    /// subscription-callback-install, at the cost of a heavier broker query.
    pub history_lookback_ms: i64,
    /// Minimum stall threshold floor in seconds (§4.5 stall detection).
    pub stall_min_seconds: f64,
    /// Multiplier applied to the average inter-sample interval for stall
    /// detection (§4.5: `age > max(stall_min_seconds, stall_rate_multiplier * avg_dt)`).
    pub stall_rate_multiplier: f64,
    /// Cooldown for `data_stall` alerts, milliseconds (§5).
    pub data_stall_cooldown_ms: i64,
    /// Cooldown for `sensor_anomaly` alerts, milliseconds (§5).
    pub sensor_anomaly_cooldown_ms: i64,
    /// Cooldown for `no_session` alerts, milliseconds (§5).
    pub no_session_cooldown_ms: i64,
    /// Worker Bridge head-drop queue capacity (§4.7).
    pub worker_queue_max: usize,
    /// Worker health-check interval, milliseconds (§4.7).
    pub worker_health_interval_ms: i64,
    /// Battery curve: 0% at or below this voltage (§4.4).
    pub battery_empty_v: f64,
    /// Battery curve: 100% at or above this voltage (§4.4).
    pub battery_full_v: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_points: 50_000,
            downsample_threshold: 2_000,
            active_session_freshness_ms: 30_000,
            history_lookback_ms: 60_000,
            stall_min_seconds: 5.0,
            stall_rate_multiplier: 5.0,
            data_stall_cooldown_ms: 60_000,
            sensor_anomaly_cooldown_ms: 90_000,
            no_session_cooldown_ms: 10_000,
            worker_queue_max: 1_000,
            worker_health_interval_ms: 10_000,
            battery_empty_v: 50.4,
            battery_full_v: 58.5,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file, falling back to defaults for any
    /// key the file omits (`serde(default)` on every field).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|_| CoreError::MissingConfig {
            path: path.display().to_string(),
        })?;
        let config: Self = toml::from_str(&raw)?;
        Ok(config)
    }

    /// Validate cross-field invariants that `serde(default)` cannot express
    /// on its own (e.g. the battery curve must be non-degenerate).
    pub fn validate(&self) -> Result<()> {
        if self.max_points == 0 {
            return Err(CoreError::InvalidConfig {
                details: "max_points must be > 0".to_string(),
            });
        }
        if self.battery_full_v <= self.battery_empty_v {
            return Err(CoreError::InvalidConfig {
                details: format!(
                    "battery_full_v ({}) must exceed battery_empty_v ({})",
                    self.battery_full_v, self.battery_empty_v
                ),
            });
        }
        if self.worker_queue_max == 0 {
            return Err(CoreError::InvalidConfig {
                details: "worker_queue_max must be > 0".to_string(),
            });
        }
        Ok(())
    }
}
