//! KPI computation over a buffer snapshot (spec §4.4).

use crate::model::DerivedSample;

/// The two configured voltage thresholds the battery percentage curve is
/// piecewise-linear between (spec §4.4, §6 config keys `batteryEmptyV`/
/// `batteryFullV`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryCurve {
    pub empty_v: f64,
    pub full_v: f64,
}

impl Default for BatteryCurve {
    fn default() -> Self {
        Self {
            empty_v: 50.4,
            full_v: 58.5,
        }
    }
}

impl BatteryCurve {
    /// Battery percentage for `voltage_v`, clamped to `[0, 100]`.
    #[must_use]
    pub fn percentage(&self, voltage_v: f64) -> f64 {
        if self.full_v <= self.empty_v {
            return 0.0;
        }
        let frac = (voltage_v - self.empty_v) / (self.full_v - self.empty_v);
        (frac * 100.0).clamp(0.0, 100.0)
    }
}

/// A value-type computed from a buffer prefix (spec §3, §4.4). Derived
/// solely from the snapshot and a `BatteryCurve` — no hidden global state,
/// so `KPI(B) = KPI(B)` (Testable Property 7) holds trivially.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct KpiSnapshot {
    pub current_speed_ms: f64,
    pub avg_speed_ms: f64,
    pub max_speed_ms: f64,
    pub current_speed_kmh: f64,
    pub avg_speed_kmh: f64,
    pub max_speed_kmh: f64,
    pub distance_km: f64,
    pub energy_kwh: f64,
    pub current_power_w: f64,
    pub avg_power_w: f64,
    pub max_power_w: f64,
    pub current_current_a: f64,
    pub avg_current_a: f64,
    pub battery_voltage_v: f64,
    pub battery_pct: f64,
    pub efficiency_km_per_kwh: f64,
}

const MS_TO_KMH: f64 = 3.6;

/// Stateless calculator turning a Ring Buffer snapshot into a [`KpiSnapshot`]
/// (spec §4.4). Pure function of `(samples, battery curve)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct KpiCalculator;

impl KpiCalculator {
    /// Compute a KPI snapshot from a chronologically ordered buffer
    /// snapshot. Returns the zero-valued default for an empty buffer.
    #[must_use]
    pub fn compute(samples: &[DerivedSample], battery: &BatteryCurve) -> KpiSnapshot {
        let Some(last) = samples.last() else {
            return KpiSnapshot::default();
        };

        let current_speed_ms = last.sample.speed_ms.max(0.0);
        let current_power_w = last.sample.power_w;
        let current_current_a = last.sample.current_a;
        let battery_voltage_v = last.sample.voltage_v.max(0.0);

        let distance_km = last.sample.distance_m.max(0.0) / 1000.0;
        let energy_kwh = last.sample.energy_j.max(0.0) / 3_600_000.0;

        let max_speed_ms = samples
            .iter()
            .map(|s| s.sample.speed_ms)
            .fold(f64::MIN, f64::max)
            .max(0.0);
        let max_power_w = samples
            .iter()
            .map(|s| s.sample.power_w)
            .fold(f64::MIN, f64::max);

        // "averages ignore exactly-zero values (sentinel for idle)" — spec §4.4.
        let avg_speed_ms = nonzero_mean(samples.iter().map(|s| s.sample.speed_ms));
        let avg_power_w = nonzero_mean(samples.iter().map(|s| s.sample.power_w));
        let avg_current_a = nonzero_mean(samples.iter().map(|s| s.sample.current_a));

        let battery_pct = battery.percentage(battery_voltage_v);
        let efficiency_km_per_kwh = if energy_kwh > 0.0 {
            distance_km / energy_kwh
        } else {
            0.0
        };

        KpiSnapshot {
            current_speed_ms,
            avg_speed_ms,
            max_speed_ms,
            current_speed_kmh: current_speed_ms * MS_TO_KMH,
            avg_speed_kmh: avg_speed_ms * MS_TO_KMH,
            max_speed_kmh: max_speed_ms * MS_TO_KMH,
            distance_km,
            energy_kwh,
            current_power_w,
            avg_power_w,
            max_power_w,
            current_current_a,
            avg_current_a,
            battery_voltage_v,
            battery_pct,
            efficiency_km_per_kwh,
        }
    }
}

fn nonzero_mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.filter(|v| *v != 0.0).fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
