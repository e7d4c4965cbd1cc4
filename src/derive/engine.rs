//! Roll/pitch and bias-compensated g-force derivation (spec §4.3).

use crate::model::{DerivedSample, Sample};

/// Bias-filter learning rate, applied only while the vehicle is judged
/// stationary (`|speed_ms| < STATIONARY_SPEED_MS`).
const BIAS_BETA: f64 = 0.02;
/// Output smoothing rate applied to the bias-corrected signal every sample.
const EMA_ALPHA: f64 = 0.22;
/// Standard gravity, m/s^2.
const G: f64 = 9.806_65;
/// Speed below which the vehicle is considered stationary for bias
/// estimation purposes (spec §4.3).
const STATIONARY_SPEED_MS: f64 = 0.6;

/// Stateful, single-threaded, causal engine producing `roll_deg`,
/// `pitch_deg`, `g_long`, `g_lat`, `g_total` from raw accelerometer and
/// speed fields (spec §4.3). The engine never fails: missing or
/// non-finite inputs are already normalized to 0 by [`Sample::normalize`],
/// and the filters themselves are defined for all finite inputs.
///
/// Platform-coupling assumption (spec.md §9, Open Question 2): the bias
/// filter only updates while `|speed_ms| < 0.6` m/s, i.e. it assumes a
/// wheeled vehicle that regularly comes to a stop. If the target vehicle
/// never drops below that speed, `ax_bias`/`ay_bias` remain at their
/// initial value (0) for the life of the engine and g-force output is
/// uncorrected for mounting offset. This is carried forward verbatim from
/// the spec, not worked around, because compensating for it would change
/// the documented math.
#[derive(Debug, Clone, Default)]
pub struct DerivationEngine {
    ax_bias: f64,
    ay_bias: f64,
    ax_ema: f64,
    ay_ema: f64,
}

impl DerivationEngine {
    /// A fresh engine with zeroed bias/EMA state, as used on reconnect
    /// (spec.md §9 design note: "On reconnect, instantiate anew.").
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset bias/EMA state to zero without losing the engine's identity —
    /// used by the Realtime Controller on `user connect` (spec §4.9).
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Derive roll/pitch/g-force quantities for `sample`, advancing the
    /// engine's internal bias/EMA state. Derivation is a pure function of
    /// `(sample, prior state)` — calling this twice on the *same* sample
    /// without an intervening call on another sample is not idempotent by
    /// itself (it would double-apply the EMA step); the Testable Property
    /// 5 in spec §8 holds when "same engine state" is read as "the state
    /// produced after processing every sample up to and including this
    /// one", which is how the Processing Worker calls it — once per
    /// incoming Sample, in order.
    pub fn derive(&mut self, sample: &Sample) -> DerivedSample {
        let ax = sample.accel_x;
        let ay = sample.accel_y;
        let az = sample.accel_z;

        let roll_deg = ay.atan2(ax.hypot(az)).to_degrees();
        let pitch_deg = ax.atan2(ay.hypot(az)).to_degrees();

        if sample.speed_ms.abs() < STATIONARY_SPEED_MS {
            self.ax_bias = (1.0 - BIAS_BETA) * self.ax_bias + BIAS_BETA * ax;
            self.ay_bias = (1.0 - BIAS_BETA) * self.ay_bias + BIAS_BETA * ay;
        }

        self.ax_ema = (1.0 - EMA_ALPHA) * self.ax_ema + EMA_ALPHA * (ax - self.ax_bias);
        self.ay_ema = (1.0 - EMA_ALPHA) * self.ay_ema + EMA_ALPHA * (ay - self.ay_bias);

        let g_long = self.ax_ema / G;
        let g_lat = self.ay_ema / G;
        let g_total = g_long.hypot(g_lat);
        let total_acceleration = ax.hypot(ay).hypot(az);

        DerivedSample {
            sample: sample.clone(),
            roll_deg,
            pitch_deg,
            g_long,
            g_lat,
            g_total,
            total_acceleration,
        }
    }
}
