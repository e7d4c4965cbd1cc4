//! Quality Analyzer (C5) — rate estimation, dropout/stall detection,
//! outlier aggregation, and quality scoring (spec §4.5), plus the cooldown
//! gate that governs how often its findings may surface as alerts (spec §5).

mod analyzer;
mod cooldown;

pub use analyzer::{QualityAnalyzer, QualityReport, OUTLIER_METADATA_COOLDOWN_SECS};
pub use cooldown::CooldownGate;
