//! Triangulator (C8) — one-shot session-bootstrap merge of durable-store,
//! broker-history, and live-buffer sources (spec §4.8).

mod merge;
mod triangulator;

pub use merge::{merge, DURABLE_PRIORITY, HISTORY_PRIORITY, LIVE_PRIORITY};
pub use triangulator::{Triangulator, TriangulationStats};
