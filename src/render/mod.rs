//! Render Scheduler (C10) — throttled, tiered dispatch from pipeline state
//! to the UI layer (spec §4.10).

mod scheduler;

pub use scheduler::{FrameBuffer, RenderScheduler, CHART_INTERVAL_MS, GAUGE_INTERVAL_MS};
