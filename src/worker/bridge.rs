//! Worker Bridge (C7) — dedicated-thread dispatch for the Processing
//! Worker, with a head-drop bounded queue, a health heartbeat, and inline
//! fallback when the worker thread is stalled or gone (spec §4.7).
//!
//! Grounded on the teacher's `ThreadHealth`/respawn bookkeeping and
//! `enqueue_scan_request`'s drop-stale-on-full pattern in
//! `daemon/loop_main.rs`.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};

use super::messages::{WorkerRequest, WorkerResponse};
use super::processing::ProcessingWorker;
use crate::buffer::RingBuffer;
use crate::clockid::now_epoch_ms;
use crate::model::{DerivedSample, Sample};

/// A stalled worker is declared dead after this many missed heartbeat
/// intervals (spec §4.7: distinguishes "briefly busy" from "stuck").
const STALL_MULTIPLIER: i64 = 3;

/// Outcome of dispatching one Sample through the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Handled by the dedicated worker thread.
    Threaded,
    /// Handled inline because the worker thread was stalled, dead, or its
    /// queue was persistently full.
    InlineFallback,
}

/// Bridges the calling thread (Realtime Controller) to a dedicated
/// Processing Worker thread. Falls back to running the same processing
/// logic inline when the thread is unhealthy, so ingestion never blocks
/// indefinitely on a dead worker (spec §4.7).
pub struct WorkerBridge {
    request_tx: Sender<WorkerRequest>,
    request_rx_peek: Receiver<WorkerRequest>,
    response_rx: Receiver<WorkerResponse>,
    health: Arc<AtomicI64>,
    join: Option<JoinHandle<()>>,
    inline_fallback: ProcessingWorker,
    /// Best-effort mirror of the threaded worker's buffer, kept up to date
    /// on every successful threaded round trip. Seeds `inline_fallback` the
    /// moment the bridge switches over, so a stalled thread does not lose
    /// buffer continuity (spec §4.7: the fallback path must pick up where
    /// the threaded path left off, not restart empty).
    known_good: RingBuffer<DerivedSample>,
    capacity: usize,
    health_interval_ms: i64,
    using_fallback: bool,
}

impl WorkerBridge {
    /// Build a bridge and spawn its dedicated worker thread.
    ///
    /// `capacity` is the Ring Buffer size (spec §6 `max_points`);
    /// `queue_max` bounds the request/response channels (spec §6
    /// `worker_queue_max`); `health_interval_ms` is the configured
    /// heartbeat cadence used to judge staleness (spec §6
    /// `worker_health_interval_ms`).
    #[must_use]
    pub fn new(capacity: usize, queue_max: usize, health_interval_ms: i64) -> Self {
        let (request_tx, request_rx) = bounded(queue_max);
        let (response_tx, response_rx) = bounded(queue_max);
        let health = Arc::new(AtomicI64::new(now_epoch_ms()));
        let join = Some(Self::spawn(capacity, request_rx.clone(), response_tx, Arc::clone(&health)));
        Self {
            request_tx,
            request_rx_peek: request_rx,
            response_rx,
            health,
            join,
            inline_fallback: ProcessingWorker::new(capacity),
            known_good: RingBuffer::new(capacity),
            capacity,
            health_interval_ms,
            using_fallback: false,
        }
    }

    fn spawn(
        capacity: usize,
        requests: Receiver<WorkerRequest>,
        responses: Sender<WorkerResponse>,
        health: Arc<AtomicI64>,
    ) -> JoinHandle<()> {
        thread::Builder::new()
            .name("processing-worker".to_string())
            .spawn(move || {
                ProcessingWorker::new(capacity).run(&requests, &responses, &health);
            })
            .expect("spawn processing worker thread")
    }

    /// Whether the worker thread is alive and has reported a heartbeat
    /// within `STALL_MULTIPLIER` intervals of `now_epoch_ms`.
    #[must_use]
    pub fn is_healthy(&self, now_epoch_ms: i64) -> bool {
        let thread_alive = self.join.as_ref().is_some_and(|j| !j.is_finished());
        let recent = now_epoch_ms - self.health.load(Ordering::Relaxed) <= self.health_interval_ms * STALL_MULTIPLIER;
        thread_alive && recent
    }

    /// Respawn the worker thread and resume threaded dispatch. Called by
    /// the Realtime Controller after detecting `!is_healthy` and deciding
    /// to recover rather than stay on inline fallback (spec §4.7).
    pub fn respawn(&mut self) {
        // The old thread's loop exits once its request channel disconnects,
        // which happens below when `self.request_tx` is overwritten.
        self.join.take();
        let (request_tx, request_rx) = bounded(self.request_tx.capacity().unwrap_or(1));
        let (response_tx, response_rx) = bounded(self.response_rx.capacity().unwrap_or(1));
        self.health.store(now_epoch_ms(), Ordering::Relaxed);
        self.join = Some(Self::spawn(self.capacity, request_rx.clone(), response_tx, Arc::clone(&self.health)));
        self.request_tx = request_tx;
        self.request_rx_peek = request_rx;
        self.response_rx = response_rx;

        // Reseed the new thread from whichever buffer was most recently
        // authoritative, so a respawn does not lose buffer history.
        let carry_forward = if self.using_fallback {
            self.inline_fallback.handle(WorkerRequest::Snapshot)
        } else {
            WorkerResponse::Snapshot(self.known_good.snapshot())
        };
        if let WorkerResponse::Snapshot(items) = carry_forward {
            let _ = self.request_tx.send(WorkerRequest::Restore(items.clone()));
            let _ = self.response_rx.recv();
            self.known_good = RingBuffer::new(self.capacity);
            for item in &items {
                self.known_good.push(item.clone());
            }
        }
        self.using_fallback = false;
    }

    /// Clear all buffered state: the threaded worker's buffer and
    /// Derivation Engine bias, plus the bridge's own known-good and
    /// fallback mirrors. Used by the Realtime Controller at the start of
    /// every `connect()` so a reconnect never leaves stale samples or
    /// stale bias state visible for even a single frame (spec §4.9).
    pub fn reset(&mut self, now: i64) {
        self.known_good = RingBuffer::new(self.capacity);
        self.inline_fallback = ProcessingWorker::new(self.capacity);
        self.using_fallback = false;
        if self.is_healthy(now) && self.try_enqueue(WorkerRequest::Reset) {
            let _ = self.response_rx.recv();
        }
    }

    /// Whether the last dispatch went through the inline fallback path.
    #[must_use]
    pub const fn is_using_fallback(&self) -> bool {
        self.using_fallback
    }

    /// Seed the inline fallback worker from the last known-good threaded
    /// snapshot the first time a dispatch switches over, so the fallback
    /// path continues the same buffer rather than starting empty.
    fn enter_fallback(&mut self) {
        if !self.using_fallback {
            self.inline_fallback.restore(self.known_good.snapshot());
        }
        self.using_fallback = true;
    }

    fn fallback_ingest(&mut self, sample: Sample) -> DerivedSample {
        self.enter_fallback();
        let WorkerResponse::Derived(derived) = self.inline_fallback.handle(WorkerRequest::Ingest(sample)) else {
            unreachable!("Ingest always yields Derived")
        };
        derived
    }

    /// Ingest one Sample, returning its derived form and which path handled
    /// it.
    pub fn ingest(&mut self, sample: Sample, now: i64) -> (DerivedSample, DispatchMode) {
        if !self.is_healthy(now) {
            return (self.fallback_ingest(sample), DispatchMode::InlineFallback);
        }

        if self.try_enqueue(WorkerRequest::Ingest(sample.clone())) {
            if let Ok(WorkerResponse::Derived(derived)) = self.response_rx.recv() {
                self.using_fallback = false;
                self.known_good.push(derived.clone());
                return (derived, DispatchMode::Threaded);
            }
        }
        (self.fallback_ingest(sample), DispatchMode::InlineFallback)
    }

    /// Request a buffer snapshot from whichever path currently holds state.
    pub fn snapshot(&mut self, now: i64) -> Vec<DerivedSample> {
        if self.using_fallback || !self.is_healthy(now) {
            self.enter_fallback();
            let WorkerResponse::Snapshot(snap) = self.inline_fallback.handle(WorkerRequest::Snapshot) else {
                unreachable!("Snapshot always yields Snapshot")
            };
            return snap;
        }
        if self.try_enqueue(WorkerRequest::Snapshot) {
            if let Ok(WorkerResponse::Snapshot(snap)) = self.response_rx.recv() {
                self.known_good = RingBuffer::new(self.capacity);
                for item in &snap {
                    self.known_good.push(item.clone());
                }
                return snap;
            }
        }
        self.enter_fallback();
        let WorkerResponse::Snapshot(snap) = self.inline_fallback.handle(WorkerRequest::Snapshot) else {
            unreachable!("Snapshot always yields Snapshot")
        };
        snap
    }

    /// Head-drop enqueue: if the queue is full, drop the oldest pending
    /// request to make room for this one (spec §4.7 — bounded queue favors
    /// freshness over completeness under sustained overload).
    fn try_enqueue(&self, request: WorkerRequest) -> bool {
        match self.request_tx.try_send(request) {
            Ok(()) => true,
            Err(TrySendError::Full(request)) => match self.request_rx_peek.try_recv() {
                Ok(_dropped) => matches!(self.request_tx.try_send(request), Ok(())),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => false,
            },
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

impl Drop for WorkerBridge {
    fn drop(&mut self) {
        let _ = self.request_tx.send(WorkerRequest::Shutdown);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}
