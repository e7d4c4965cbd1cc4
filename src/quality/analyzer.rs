//! Quality Analyzer (C5) — sample-rate estimation, dropout detection,
//! field-completeness, outlier aggregation, quality scoring, and stall
//! detection (spec §4.5).

use std::collections::BTreeMap;

use crate::core::config::PipelineConfig;
use crate::model::{Alert, DerivedSample, Severity};

/// Numeric fields tracked for field-completeness reporting — the same set
/// [`crate::model::sample::Sample::normalize`] records in `missing_fields`.
const TRACKED_FIELDS: &[&str] = &[
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
];

/// How many of the trailing samples the sensor-anomaly alert inspects
/// (spec §4.5: "over the trailing 20 samples").
const SENSOR_ANOMALY_WINDOW: usize = 20;
/// How many inter-sample intervals the stall detector's `avg_dt` averages
/// over (spec §4.5: "over the last <= 50 intervals").
const STALL_AVG_WINDOW: usize = 50;
/// Cooldown for the "outlier metadata missing" alert (spec §7: "surfaced
/// once per 120s"). Not a configured key in spec §6's table — a fixed
/// constant, like the teacher's `SWAP_THRASH_WARNING_COOLDOWN`.
pub const OUTLIER_METADATA_COOLDOWN_SECS: u64 = 120;

/// row count, column count, median inter-sample interval, estimated rate,
/// dropout count, max gap, time span, per-field missing rate, per-field
/// outlier counts, severity histogram, reason histogram, and a numeric
/// quality score in `[0, 100]` (spec §3, §4.5).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QualityReport {
    pub row_count: usize,
    pub column_count: usize,
    pub median_dt_secs: f64,
    pub estimated_hz: f64,
    pub dropout_count: u64,
    pub max_gap_secs: f64,
    pub time_span_secs: f64,
    pub missing_rate: BTreeMap<String, f64>,
    pub outlier_counts: BTreeMap<String, u64>,
    pub info_count: u64,
    pub warning_count: u64,
    pub critical_count: u64,
    pub reason_histogram: BTreeMap<String, u64>,
    pub quality_score: f64,
}

/// Stateless analyzer turning a buffer snapshot into a [`QualityReport`]
/// plus any alert candidates (spec §4.5). Alert candidates are returned
/// unconditionally when their trigger condition holds; cooldown gating
/// (spec §5) is the caller's responsibility — see
/// [`crate::controller::RealtimeController`].
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityAnalyzer;

impl QualityAnalyzer {
    /// Analyze a chronologically ordered buffer snapshot.
    ///
    /// `live` gates the stall-detection and sensor-anomaly alert paths
    /// (spec §4.5: "only in live mode" / "live only"). `now_epoch_ms` is
    /// only consulted when `live` is true.
    #[must_use]
    pub fn analyze(
        samples: &[DerivedSample],
        live: bool,
        now_epoch_ms: i64,
        config: &PipelineConfig,
    ) -> (QualityReport, Vec<Alert>) {
        let mut report = QualityReport {
            row_count: samples.len(),
            column_count: TRACKED_FIELDS.len(),
            ..QualityReport::default()
        };
        let mut alerts = Vec::new();

        if samples.is_empty() {
            report.quality_score = 100.0;
            return (report, alerts);
        }

        let intervals_secs: Vec<f64> = samples
            .windows(2)
            .map(|w| (w[1].epoch_ms() - w[0].epoch_ms()).max(0) as f64 / 1000.0)
            .collect();

        let median_dt = median(&intervals_secs);
        report.median_dt_secs = median_dt;
        report.estimated_hz = if median_dt > 0.0 { 1.0 / median_dt } else { 0.0 };

        if median_dt > 0.0 {
            let gap_sum: f64 = intervals_secs
                .iter()
                .copied()
                .filter(|dt| *dt > 3.0 * median_dt)
                .sum();
            report.dropout_count = (gap_sum / median_dt).floor().max(0.0) as u64;
        }
        report.max_gap_secs = intervals_secs.iter().copied().fold(0.0, f64::max);

        let first = samples.first().unwrap();
        let last = samples.last().unwrap();
        report.time_span_secs = (last.epoch_ms() - first.epoch_ms()).max(0) as f64 / 1000.0;

        for field in TRACKED_FIELDS {
            let missing = samples
                .iter()
                .filter(|s| s.sample.missing_fields.iter().any(|m| m == field))
                .count();
            report
                .missing_rate
                .insert((*field).to_string(), missing as f64 / report.row_count as f64);
        }

        let mut outliers_present_anywhere = false;
        for s in samples {
            if let Some(outliers) = &s.sample.outliers {
                outliers_present_anywhere = true;
                match outliers.severity {
                    Severity::Info => report.info_count += 1,
                    Severity::Warning => report.warning_count += 1,
                    Severity::Critical => report.critical_count += 1,
                }
                for field in &outliers.flagged_fields {
                    *report.outlier_counts.entry(field.clone()).or_insert(0) += 1;
                }
                for reason in outliers.reasons.values() {
                    *report.reason_histogram.entry(reason.clone()).or_insert(0) += 1;
                }
            }
        }

        let mean_missing_rate = if report.missing_rate.is_empty() {
            0.0
        } else {
            report.missing_rate.values().sum::<f64>() / report.missing_rate.len() as f64
        };
        let raw_score = 100.0
            - 40.0 * mean_missing_rate
            - (0.2 * report.dropout_count as f64).min(20.0)
            - (2.0 * report.critical_count as f64).min(15.0)
            - (0.5 * report.warning_count as f64).min(10.0)
            - (0.1 * report.info_count as f64).min(5.0);
        report.quality_score = (raw_score.clamp(0.0, 100.0) * 10.0).round() / 10.0;

        if live {
            if !outliers_present_anywhere {
                alerts.push(Alert::err(
                    "sensor failure detection unavailable",
                    "outlier_metadata_missing",
                ));
            }

            let avg_dt = mean_of_tail(&intervals_secs, STALL_AVG_WINDOW);
            let age_secs = (now_epoch_ms - last.epoch_ms()).max(0) as f64 / 1000.0;
            let threshold = config.stall_min_seconds.max(config.stall_rate_multiplier * avg_dt);
            if age_secs > threshold {
                alerts.push(Alert::err(
                    format!("data stall detected: {age_secs:.1}s since last sample"),
                    "data_stall",
                ));
            }

            let tail = &samples[samples.len().saturating_sub(SENSOR_ANOMALY_WINDOW)..];
            let (tail_crit, tail_warn, flagged) = tail_severity_counts(tail);
            if tail_crit >= 3 {
                let listed: Vec<&str> = flagged.iter().take(3).map(String::as_str).collect();
                alerts.push(Alert::err(
                    format!("sensor anomaly: critical outliers on {}", listed.join(", ")),
                    "sensor_anomaly",
                ));
            } else if tail_warn >= 5 || (tail_crit >= 1 && tail_warn >= 2) {
                alerts.push(Alert::warn("sensor anomaly: elevated outlier rate", "sensor_anomaly"));
            }
        }

        (report, alerts)
    }
}

fn tail_severity_counts(tail: &[DerivedSample]) -> (u64, u64, Vec<String>) {
    let mut crit = 0u64;
    let mut warn = 0u64;
    let mut flagged = Vec::new();
    for s in tail {
        if let Some(outliers) = &s.sample.outliers {
            match outliers.severity {
                Severity::Critical => crit += 1,
                Severity::Warning => warn += 1,
                Severity::Info => {}
            }
            for field in &outliers.flagged_fields {
                if !flagged.contains(field) {
                    flagged.push(field.clone());
                }
            }
        }
    }
    (crit, warn, flagged)
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn mean_of_tail(values: &[f64], window: usize) -> f64 {
    let tail = &values[values.len().saturating_sub(window)..];
    if tail.is_empty() {
        0.0
    } else {
        tail.iter().sum::<f64>() / tail.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sample::RawSample;
    use crate::model::{Outliers, Sample};

    fn sample_at(epoch_ms: i64) -> DerivedSample {
        let mut raw = RawSample {
            timestamp: Some("2024-01-01T00:00:00Z".to_string()),
            voltage_v: Some(55.0),
            ..Default::default()
        };
        raw.timestamp = None; // force fallback path for deterministic epoch_ms
        let sample = Sample::normalize(raw, Some(epoch_ms));
        DerivedSample {
            sample,
            roll_deg: 0.0,
            pitch_deg: 0.0,
            g_long: 0.0,
            g_lat: 0.0,
            g_total: 0.0,
            total_acceleration: 0.0,
        }
    }

    fn with_outliers(mut d: DerivedSample, severity: Severity, fields: &[&str]) -> DerivedSample {
        d.sample.outliers = Some(Outliers {
            flagged_fields: fields.iter().map(|s| (*s).to_string()).collect(),
            severity,
            reasons: BTreeMap::new(),
        });
        d
    }

    #[test]
    fn empty_buffer_yields_perfect_score() {
        let config = PipelineConfig::default();
        let (report, alerts) = QualityAnalyzer::analyze(&[], false, 0, &config);
        assert_eq!(report.quality_score, 100.0);
        assert!(alerts.is_empty());
    }

    #[test]
    fn regular_rate_yields_zero_dropouts() {
        let config = PipelineConfig::default();
        let samples: Vec<_> = (0..10).map(|i| sample_at(i * 100)).collect();
        let (report, _) = QualityAnalyzer::analyze(&samples, false, 0, &config);
        assert_eq!(report.dropout_count, 0);
        assert!((report.estimated_hz - 10.0).abs() < 1e-9);
    }

    #[test]
    fn large_gap_counts_as_dropout() {
        let config = PipelineConfig::default();
        let mut samples: Vec<_> = (0..5).map(|i| sample_at(i * 100)).collect();
        samples.push(sample_at(400 + 5000));
        let (report, _) = QualityAnalyzer::analyze(&samples, false, 0, &config);
        assert!(report.dropout_count > 0);
        assert!(report.max_gap_secs > 1.0);
    }

    #[test]
    fn stall_alert_fires_only_in_live_mode() {
        let config = PipelineConfig::default();
        let samples: Vec<_> = (0..10).map(|i| sample_at(i * 100)).collect();
        let now = samples.last().unwrap().epoch_ms() + 60_000;
        let (_, alerts_offline) = QualityAnalyzer::analyze(&samples, false, now, &config);
        assert!(alerts_offline.iter().all(|a| a.cooldown_key != "data_stall"));
        let (_, alerts_live) = QualityAnalyzer::analyze(&samples, true, now, &config);
        assert!(alerts_live.iter().any(|a| a.cooldown_key == "data_stall"));
    }

    #[test]
    fn missing_outlier_metadata_raises_alert_live_only() {
        let config = PipelineConfig::default();
        let samples: Vec<_> = (0..5).map(|i| sample_at(i * 100)).collect();
        let (_, alerts) = QualityAnalyzer::analyze(&samples, true, samples.last().unwrap().epoch_ms(), &config);
        assert!(alerts.iter().any(|a| a.cooldown_key == "outlier_metadata_missing"));
    }

    #[test]
    fn critical_cascade_triggers_sensor_anomaly_err() {
        let config = PipelineConfig::default();
        let mut samples: Vec<_> = (0..16).map(|i| sample_at(i * 100)).collect();
        for i in 0..4 {
            samples.push(with_outliers(
                sample_at((16 + i) * 100),
                Severity::Critical,
                &["voltage_v"],
            ));
        }
        let now = samples.last().unwrap().epoch_ms();
        let (report, alerts) = QualityAnalyzer::analyze(&samples, true, now, &config);
        assert!(report.critical_count >= 4);
        assert!(alerts
            .iter()
            .any(|a| a.cooldown_key == "sensor_anomaly" && a.text.contains("voltage_v")));
    }

    #[test]
    fn quality_score_penalized_by_criticals() {
        let config = PipelineConfig::default();
        let mut clean: Vec<_> = (0..20).map(|i| sample_at(i * 100)).collect();
        let (clean_report, _) = QualityAnalyzer::analyze(&clean, false, 0, &config);

        for i in 0..4 {
            clean.push(with_outliers(
                sample_at((20 + i) * 100),
                Severity::Critical,
                &["voltage_v"],
            ));
        }
        let (penalized_report, _) = QualityAnalyzer::analyze(&clean, false, 0, &config);
        assert!(penalized_report.quality_score <= clean_report.quality_score - 7.0);
    }
}
