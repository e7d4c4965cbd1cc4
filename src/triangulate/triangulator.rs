//! Triangulator (C8) — one-shot session bootstrap: identify the active
//! session, fetch durable-store and broker-history in parallel, merge them
//! with the live buffer, and report source-level stats (spec §4.8).

use crate::core::config::PipelineConfig;
use crate::core::errors::CoreError;
use crate::model::Sample;
use crate::transport::{BrokerChannel, DurableStore, HistoryQuery};

use super::merge::{merge, DURABLE_PRIORITY, HISTORY_PRIORITY, LIVE_PRIORITY};

/// Per-source counts and any errors encountered while assembling a
/// triangulation result, surfaced as `onDataReady.stats` (spec §4.8 step 6).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangulationStats {
    pub durable_count: usize,
    pub history_count: usize,
    pub live_count: usize,
    pub merged_count: usize,
    pub durable_error: Option<String>,
    pub history_error: Option<String>,
}

impl TriangulationStats {
    /// Whether every configured source was reachable. A source outage does
    /// not fail the bootstrap outright (spec §4.8's graceful-degradation
    /// policy) — the caller decides whether a degraded result is usable.
    #[must_use]
    pub const fn degraded(&self) -> bool {
        self.durable_error.is_some() || self.history_error.is_some()
    }
}

/// Stateless bootstrap algorithm. Holds no state between calls — each
/// bootstrap is independent (spec §3: "one-shot").
#[derive(Debug, Clone, Copy, Default)]
pub struct Triangulator;

impl Triangulator {
    /// Run the bootstrap for `session_id`: fetch durable-store and
    /// broker-history concurrently, then merge both with `live_snapshot`
    /// (the Ring Buffer's contents at the moment of the bootstrap).
    pub fn bootstrap(
        broker: &dyn BrokerChannel,
        store: &dyn DurableStore,
        session_id: &str,
        live_snapshot: Vec<Sample>,
        config: &PipelineConfig,
        now_epoch_ms: i64,
    ) -> (Vec<Sample>, TriangulationStats) {
        let since_epoch_ms = now_epoch_ms - config.history_lookback_ms;

        let mut durable_result = Err(CoreError::Runtime {
            details: "durable fetch did not run".to_string(),
        });
        let mut history_result = Err(CoreError::Runtime {
            details: "history fetch did not run".to_string(),
        });

        std::thread::scope(|scope| {
            let durable_handle = scope.spawn(|| store.fetch_since(session_id, since_epoch_ms));
            let history_handle = scope.spawn(|| {
                broker.fetch_history(
                    session_id,
                    HistoryQuery {
                        since_epoch_ms,
                        until_epoch_ms: now_epoch_ms,
                    },
                )
            });
            durable_result = durable_handle.join().unwrap_or_else(|_| {
                Err(CoreError::Runtime {
                    details: "durable store fetch thread panicked".to_string(),
                })
            });
            history_result = history_handle.join().unwrap_or_else(|_| {
                Err(CoreError::Runtime {
                    details: "broker history fetch thread panicked".to_string(),
                })
            });
        });

        let mut stats = TriangulationStats::default();
        let durable = match durable_result {
            Ok(samples) => {
                stats.durable_count = samples.len();
                samples
            }
            Err(err) => {
                stats.durable_error = Some(err.to_string());
                Vec::new()
            }
        };
        let history = match history_result {
            Ok(samples) => {
                stats.history_count = samples.len();
                samples
            }
            Err(err) => {
                stats.history_error = Some(err.to_string());
                Vec::new()
            }
        };
        stats.live_count = live_snapshot.len();

        let merged = merge(&[
            (DURABLE_PRIORITY, durable),
            (HISTORY_PRIORITY, history),
            (LIVE_PRIORITY, live_snapshot),
        ]);
        stats.merged_count = merged.len();
        (merged, stats)
    }
}
