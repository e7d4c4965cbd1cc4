//! Render Scheduler (C10) — tiered throttled dispatch so the UI layer
//! never redraws faster than it can usefully paint (spec §4.10): gauges at
//! ~10Hz with a delta-threshold smart update, charts at ~4Hz limited to
//! visible panels, and KPIs/table/quality coalesced once per host frame.

use std::collections::BTreeSet;

use crate::kpi::KpiSnapshot;
use crate::model::Alert;
use crate::quality::QualityReport;

/// Gauge tier cadence (spec §4.10: "~10Hz").
pub const GAUGE_INTERVAL_MS: i64 = 100;
/// Chart tier cadence (spec §4.10: "~4Hz").
pub const CHART_INTERVAL_MS: i64 = 250;
/// Minimum relative change required to re-emit a gauge even once its
/// interval has elapsed (spec §4.10's "smart update").
const GAUGE_DELTA_THRESHOLD: f64 = 0.005;

/// The coalesced, on-frame payload: KPIs, the latest quality report, and
/// any alerts queued since the previous drain. Repeated calls to
/// [`RenderScheduler::queue_frame`] between drains overwrite the KPI/quality
/// snapshot (only the latest matters) but accumulate alerts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameBuffer {
    pub kpis: Option<KpiSnapshot>,
    pub quality: Option<QualityReport>,
    pub alerts: Vec<Alert>,
}

/// Tiered throttle state. Holds no rendering logic itself — it decides
/// *when* the host may redraw each tier, not *how*.
#[derive(Debug, Default)]
pub struct RenderScheduler {
    next_gauge_at_ms: i64,
    next_chart_at_ms: i64,
    last_gauge_kpis: Option<KpiSnapshot>,
    visible_panels: BTreeSet<String>,
    dirty_panels: BTreeSet<String>,
    frame: FrameBuffer,
}

impl RenderScheduler {
    /// Build a scheduler with both tiers immediately eligible to fire.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare which chart panels are currently visible; dirty marks on
    /// panels outside this set are retained but never drained (spec §4.10:
    /// "visible-panel-only").
    pub fn set_visible_panels(&mut self, panels: impl IntoIterator<Item = String>) {
        self.visible_panels = panels.into_iter().collect();
    }

    /// Mark a chart panel as having new data to paint.
    pub fn mark_chart_dirty(&mut self, panel: impl Into<String>) {
        self.dirty_panels.insert(panel.into());
    }

    /// Returns the gauge-relevant KPI snapshot if the gauge tier is due to
    /// redraw: its interval has elapsed *and* at least one tracked value
    /// moved by more than [`GAUGE_DELTA_THRESHOLD`] since the last emission.
    pub fn maybe_emit_gauges(&mut self, now_ms: i64, kpis: KpiSnapshot) -> Option<KpiSnapshot> {
        if now_ms < self.next_gauge_at_ms {
            return None;
        }
        self.next_gauge_at_ms = now_ms + GAUGE_INTERVAL_MS;

        let changed = match &self.last_gauge_kpis {
            Some(prev) => gauge_delta_exceeds_threshold(prev, &kpis),
            None => true,
        };
        if !changed {
            return None;
        }
        self.last_gauge_kpis = Some(kpis);
        Some(kpis)
    }

    /// Drain the visible, dirty chart panels due to redraw, clearing their
    /// dirty marks. Returns an empty vector if the chart tier's interval
    /// has not elapsed, or no visible panel is dirty.
    pub fn drain_dirty_charts(&mut self, now_ms: i64) -> Vec<String> {
        if now_ms < self.next_chart_at_ms {
            return Vec::new();
        }
        self.next_chart_at_ms = now_ms + CHART_INTERVAL_MS;

        let due: Vec<String> = self
            .dirty_panels
            .intersection(&self.visible_panels)
            .cloned()
            .collect();
        for panel in &due {
            self.dirty_panels.remove(panel);
        }
        due
    }

    /// Queue the latest KPI/quality snapshot and any new alerts into the
    /// current frame buffer, coalescing repeated calls before the next
    /// drain (spec §4.10: "KPIs/table/quality coalesced on-frame").
    pub fn queue_frame(&mut self, kpis: Option<KpiSnapshot>, quality: Option<QualityReport>, alerts: Vec<Alert>) {
        if kpis.is_some() {
            self.frame.kpis = kpis;
        }
        if quality.is_some() {
            self.frame.quality = quality;
        }
        self.frame.alerts.extend(alerts);
    }

    /// Take the accumulated frame buffer, resetting it to empty.
    pub fn drain_frame(&mut self) -> FrameBuffer {
        std::mem::take(&mut self.frame)
    }
}

fn gauge_delta_exceeds_threshold(prev: &KpiSnapshot, next: &KpiSnapshot) -> bool {
    [
        relative_delta(prev.current_speed_ms, next.current_speed_ms),
        relative_delta(prev.current_power_w, next.current_power_w),
        relative_delta(prev.current_current_a, next.current_current_a),
        relative_delta(prev.battery_pct, next.battery_pct),
    ]
    .into_iter()
    .any(|delta| delta > GAUGE_DELTA_THRESHOLD)
}

fn relative_delta(prev: f64, next: f64) -> f64 {
    let denom = prev.abs().max(next.abs()).max(1e-9);
    (next - prev).abs() / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kpis(speed: f64) -> KpiSnapshot {
        KpiSnapshot {
            current_speed_ms: speed,
            ..KpiSnapshot::default()
        }
    }

    #[test]
    fn first_gauge_call_always_emits() {
        let mut scheduler = RenderScheduler::new();
        assert!(scheduler.maybe_emit_gauges(0, kpis(10.0)).is_some());
    }

    #[test]
    fn gauge_throttled_within_interval() {
        let mut scheduler = RenderScheduler::new();
        scheduler.maybe_emit_gauges(0, kpis(10.0));
        assert!(scheduler.maybe_emit_gauges(50, kpis(50.0)).is_none());
    }

    #[test]
    fn gauge_skips_small_delta_after_interval() {
        let mut scheduler = RenderScheduler::new();
        scheduler.maybe_emit_gauges(0, kpis(10.0));
        assert!(scheduler.maybe_emit_gauges(200, kpis(10.001)).is_none());
    }

    #[test]
    fn gauge_emits_on_large_delta_after_interval() {
        let mut scheduler = RenderScheduler::new();
        scheduler.maybe_emit_gauges(0, kpis(10.0));
        assert!(scheduler.maybe_emit_gauges(200, kpis(20.0)).is_some());
    }

    #[test]
    fn chart_drain_respects_visibility_and_dirtiness() {
        let mut scheduler = RenderScheduler::new();
        scheduler.set_visible_panels(["speed_chart".to_string()]);
        scheduler.mark_chart_dirty("speed_chart");
        scheduler.mark_chart_dirty("hidden_chart");
        let due = scheduler.drain_dirty_charts(0);
        assert_eq!(due, vec!["speed_chart".to_string()]);
        assert!(scheduler.drain_dirty_charts(0).is_empty());
    }

    #[test]
    fn frame_coalesces_kpis_and_accumulates_alerts() {
        let mut scheduler = RenderScheduler::new();
        scheduler.queue_frame(Some(kpis(1.0)), None, vec![Alert::warn("a", "no_session")]);
        scheduler.queue_frame(Some(kpis(2.0)), None, vec![Alert::warn("b", "no_session")]);
        let frame = scheduler.drain_frame();
        assert_eq!(frame.kpis.unwrap().current_speed_ms, 2.0);
        assert_eq!(frame.alerts.len(), 2);
        assert_eq!(scheduler.drain_frame(), FrameBuffer::default());
    }
}
