//! Realtime Controller (C9) — the 5-state connection state machine that
//! owns the Worker Bridge and drives session bootstrap via the
//! Triangulator, guarding stale bootstraps with a cancellation token
//! (spec §4.9).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crossbeam_channel::Receiver;

use crate::core::config::PipelineConfig;
use crate::model::{Alert, ConnectionState, DerivedSample, Sample};
use crate::quality::{CooldownGate, QualityAnalyzer, QualityReport};
use crate::transport::{BrokerChannel, DurableStore};
use crate::triangulate::{Triangulator, TriangulationStats};
use crate::worker::WorkerBridge;

type BootstrapOutcome = (u64, Vec<Sample>, TriangulationStats);

/// One `CooldownGate` per alert bucket named in spec §5.
struct Cooldowns {
    data_stall: CooldownGate,
    sensor_anomaly: CooldownGate,
    connection_lost: CooldownGate,
    no_session: CooldownGate,
}

impl Cooldowns {
    fn new(config: &PipelineConfig) -> Self {
        Self {
            data_stall: CooldownGate::new(std::time::Duration::from_millis(
                config.data_stall_cooldown_ms.max(0) as u64,
            )),
            sensor_anomaly: CooldownGate::new(std::time::Duration::from_millis(
                config.sensor_anomaly_cooldown_ms.max(0) as u64,
            )),
            connection_lost: CooldownGate::new(std::time::Duration::from_secs(30)),
            no_session: CooldownGate::new(std::time::Duration::from_millis(
                config.no_session_cooldown_ms.max(0) as u64,
            )),
        }
    }

    fn gate_for(&mut self, cooldown_key: &str) -> Option<&mut CooldownGate> {
        match cooldown_key {
            "data_stall" => Some(&mut self.data_stall),
            "sensor_anomaly" => Some(&mut self.sensor_anomaly),
            "connection_lost" => Some(&mut self.connection_lost),
            "no_session" => Some(&mut self.no_session),
            // Dynamic keys (e.g. "outlier_metadata_missing") are not
            // cooldown-gated per spec §5's four named buckets; they pass
            // through ungated.
            _ => None,
        }
    }
}

/// Drives one connection's lifecycle: `disconnected -> loading ->
/// (waiting_for_session | connected | failed)`, per spec §4.9's state
/// diagram. Bootstraps run on a background thread; a monotonically
/// increasing generation counter discards any bootstrap whose result
/// arrives after a newer `connect()` call superseded it.
pub struct RealtimeController {
    broker: Arc<dyn BrokerChannel>,
    store: Arc<dyn DurableStore>,
    config: PipelineConfig,
    bridge: WorkerBridge,
    state: ConnectionState,
    session_id: Option<String>,
    generation: Arc<AtomicU64>,
    pending: Option<Receiver<BootstrapOutcome>>,
    cooldowns: Cooldowns,
}

impl RealtimeController {
    /// Build a controller wired to the given transports and configuration.
    #[must_use]
    pub fn new(broker: Arc<dyn BrokerChannel>, store: Arc<dyn DurableStore>, config: PipelineConfig) -> Self {
        let bridge = WorkerBridge::new(config.max_points, config.worker_queue_max, config.worker_health_interval_ms);
        let cooldowns = Cooldowns::new(&config);
        Self {
            broker,
            store,
            config,
            bridge,
            state: ConnectionState::Disconnected,
            session_id: None,
            generation: Arc::new(AtomicU64::new(0)),
            pending: None,
            cooldowns,
        }
    }

    /// The current state machine state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// The currently triangulated session id, if connected.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Attempt to connect: identify the active session, verify freshness,
    /// and — if live — kick off a background bootstrap (spec §4.9 steps
    /// 1-2). Every call bumps the generation counter, invalidating any
    /// bootstrap still in flight from a previous call.
    pub fn connect(&mut self, now_epoch_ms: i64) {
        self.state = ConnectionState::Loading;
        self.pending = None;
        self.session_id = None;
        self.bridge.reset(now_epoch_ms);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let session_id = match self.broker.active_session_id() {
            Ok(Some(id)) => id,
            Ok(None) => {
                self.state = ConnectionState::WaitingForSession;
                return;
            }
            Err(_) => {
                self.state = ConnectionState::Failed;
                return;
            }
        };

        let fresh = self
            .broker
            .last_message_epoch_ms(&session_id)
            .ok()
            .flatten()
            .is_some_and(|last| now_epoch_ms - last <= self.config.active_session_freshness_ms);
        if !fresh {
            self.state = ConnectionState::WaitingForSession;
            return;
        }

        self.session_id = Some(session_id.clone());
        let live_snapshot: Vec<Sample> = self
            .bridge
            .snapshot(now_epoch_ms)
            .into_iter()
            .map(|d| d.sample)
            .collect();
        let broker = Arc::clone(&self.broker);
        let store = Arc::clone(&self.store);
        let config = self.config.clone();
        let (tx, rx) = crossbeam_channel::bounded(1);
        thread::spawn(move || {
            let (merged, stats) = Triangulator::bootstrap(
                broker.as_ref(),
                store.as_ref(),
                &session_id,
                live_snapshot,
                &config,
                now_epoch_ms,
            );
            let _ = tx.send((generation, merged, stats));
        });
        self.pending = Some(rx);
    }

    /// Poll for a completed bootstrap and advance derived samples for any
    /// merged result. Call regularly from the host event loop. Returns any
    /// alerts raised while transitioning (cooldown-gated per spec §5).
    pub fn poll(&mut self, now_epoch_ms: i64) -> Vec<Alert> {
        let mut alerts = Vec::new();

        if let Some(rx) = &self.pending {
            if let Ok((generation, merged, stats)) = rx.try_recv() {
                self.pending = None;
                if generation == self.generation.load(Ordering::SeqCst) {
                    for sample in merged {
                        self.bridge.ingest(sample, now_epoch_ms);
                    }
                    let fully_dark = stats.durable_error.is_some()
                        && stats.history_error.is_some()
                        && stats.live_count == 0
                        && stats.merged_count == 0;
                    self.state = if fully_dark {
                        ConnectionState::Failed
                    } else {
                        ConnectionState::Connected
                    };
                }
                // else: a newer connect() call superseded this bootstrap —
                // its result is discarded (spec §4.9 cancellation guard).
            }
        }

        if self.state == ConnectionState::WaitingForSession {
            if let Some(gate) = self.cooldowns.gate_for("no_session") {
                if gate.try_fire(Instant::now()) {
                    alerts.push(Alert::warn("waiting for an active session", "no_session"));
                }
            }
        }

        alerts
    }

    /// Feed one live Sample into the buffer once connected. Detects an
    /// in-stream session rollover — the broker handing back a new
    /// `session_id` mid-stream (spec §4.9) — and updates `session_id`
    /// accordingly without clearing the buffer; a rollover is a change of
    /// identity, not a reconnect.
    pub fn ingest_live(&mut self, sample: Sample, now_epoch_ms: i64) -> DerivedSample {
        if !sample.session_id.is_empty() && self.session_id.as_deref() != Some(sample.session_id.as_str()) {
            self.session_id = Some(sample.session_id.clone());
        }
        self.bridge.ingest(sample, now_epoch_ms).0
    }

    /// Run the Quality Analyzer over the current buffer and return only the
    /// alerts whose cooldown gate is currently open, consuming it on fire.
    pub fn run_quality_pass(&mut self, now_epoch_ms: i64) -> (QualityReport, Vec<Alert>) {
        let samples = self.bridge.snapshot(now_epoch_ms);
        let live = self.state == ConnectionState::Connected;
        let (report, candidates) = QualityAnalyzer::analyze(&samples, live, now_epoch_ms, &self.config);
        let now = Instant::now();
        let fired = candidates
            .into_iter()
            .filter(|alert| {
                self.cooldowns
                    .gate_for(alert.cooldown_key)
                    .is_none_or(|gate| gate.try_fire(now))
            })
            .collect();
        (report, fired)
    }

    /// Mark the connection lost, transitioning to `Disconnected` and
    /// raising a cooldown-gated alert.
    pub fn disconnect(&mut self) -> Option<Alert> {
        self.state = ConnectionState::Disconnected;
        self.session_id = None;
        self.pending = None;
        self.cooldowns
            .gate_for("connection_lost")
            .filter(|gate| gate.try_fire(Instant::now()))
            .map(|_| Alert::err("connection lost", "connection_lost"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::Result;
    use crate::model::sample::RawSample;
    use crate::model::Sample;
    use crate::transport::HistoryQuery;
    use std::thread::sleep;
    use std::time::Duration;

    struct FakeBroker {
        session: Option<String>,
        last_ms: i64,
    }

    impl BrokerChannel for FakeBroker {
        fn active_session_id(&self) -> Result<Option<String>> {
            Ok(self.session.clone())
        }
        fn last_message_epoch_ms(&self, _session_id: &str) -> Result<Option<i64>> {
            Ok(Some(self.last_ms))
        }
        fn fetch_history(&self, _session_id: &str, _query: HistoryQuery) -> Result<Vec<Sample>> {
            Ok(Vec::new())
        }
        fn subscribe(&self, _session_id: &str) -> Result<Receiver<Sample>> {
            let (_tx, rx) = crossbeam_channel::bounded(1);
            Ok(rx)
        }
    }

    struct FakeStore;
    impl DurableStore for FakeStore {
        fn fetch_since(&self, _session_id: &str, _since_epoch_ms: i64) -> Result<Vec<Sample>> {
            Ok(vec![Sample::normalize(
                RawSample {
                    timestamp: Some("2024-01-01T00:00:00Z".to_string()),
                    ..Default::default()
                },
                None,
            )])
        }
    }

    #[test]
    fn no_active_session_waits() {
        let broker = Arc::new(FakeBroker { session: None, last_ms: 0 });
        let store = Arc::new(FakeStore);
        let mut controller = RealtimeController::new(broker, store, PipelineConfig::default());
        controller.connect(1_000);
        assert_eq!(controller.state(), ConnectionState::WaitingForSession);
    }

    #[test]
    fn stale_session_waits_instead_of_connecting() {
        let broker = Arc::new(FakeBroker {
            session: Some("s1".to_string()),
            last_ms: 0,
        });
        let store = Arc::new(FakeStore);
        let mut controller = RealtimeController::new(broker, store, PipelineConfig::default());
        controller.connect(1_000_000);
        assert_eq!(controller.state(), ConnectionState::WaitingForSession);
    }

    #[test]
    fn fresh_session_bootstraps_to_connected() {
        let broker = Arc::new(FakeBroker {
            session: Some("s1".to_string()),
            last_ms: 900,
        });
        let store = Arc::new(FakeStore);
        let mut controller = RealtimeController::new(broker, store, PipelineConfig::default());
        controller.connect(1_000);
        assert_eq!(controller.state(), ConnectionState::Loading);
        let mut tries = 0;
        while controller.state() == ConnectionState::Loading && tries < 100 {
            sleep(Duration::from_millis(10));
            controller.poll(1_000);
            tries += 1;
        }
        assert_eq!(controller.state(), ConnectionState::Connected);
    }

    #[test]
    fn reconnect_clears_stale_buffer_and_session() {
        let broker = Arc::new(FakeBroker {
            session: Some("abc".to_string()),
            last_ms: 900,
        });
        let store = Arc::new(FakeStore);
        let mut controller = RealtimeController::new(broker, store, PipelineConfig::default());
        controller.connect(1_000);
        let mut tries = 0;
        while controller.state() == ConnectionState::Loading && tries < 100 {
            sleep(Duration::from_millis(10));
            controller.poll(1_000);
            tries += 1;
        }
        assert_eq!(controller.state(), ConnectionState::Connected);
        assert_eq!(controller.session_id(), Some("abc"));

        // A second connect() to a broker with no active session must still
        // clear the previous session's buffer and identity, not just leave
        // them stale while waiting.
        let broker2 = Arc::new(FakeBroker { session: None, last_ms: 0 });
        controller.broker = broker2;
        controller.connect(2_000);
        assert_eq!(controller.state(), ConnectionState::WaitingForSession);
        assert_eq!(controller.session_id(), None);
        let (report, _) = controller.run_quality_pass(2_000);
        assert_eq!(report.row_count, 0);
    }

    #[test]
    fn ingest_live_updates_session_id_on_rollover() {
        let broker = Arc::new(FakeBroker {
            session: Some("abc".to_string()),
            last_ms: 900,
        });
        let store = Arc::new(FakeStore);
        let mut controller = RealtimeController::new(broker, store, PipelineConfig::default());
        controller.connect(1_000);
        let mut tries = 0;
        while controller.state() == ConnectionState::Loading && tries < 100 {
            sleep(Duration::from_millis(10));
            controller.poll(1_000);
            tries += 1;
        }
        assert_eq!(controller.session_id(), Some("abc"));

        let raw = RawSample {
            timestamp: Some("2024-01-01T00:00:01Z".to_string()),
            session_id: Some("def".to_string()),
            ..Default::default()
        };
        controller.ingest_live(Sample::normalize(raw, None), 1_001);
        assert_eq!(controller.session_id(), Some("def"));
    }

    #[test]
    fn disconnect_raises_connection_lost_once() {
        let broker = Arc::new(FakeBroker { session: None, last_ms: 0 });
        let store = Arc::new(FakeStore);
        let mut controller = RealtimeController::new(broker, store, PipelineConfig::default());
        assert!(controller.disconnect().is_some());
        assert!(controller.disconnect().is_none());
    }
}
