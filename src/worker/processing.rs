//! Processing Worker (C6) — owns the Ring Buffer and Derivation Engine,
//! runs either on a dedicated thread (via [`super::bridge::WorkerBridge`])
//! or inline as a fallback (spec §4.6, §4.7).

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use super::messages::{WorkerRequest, WorkerResponse};
use crate::buffer::RingBuffer;
use crate::clockid::now_epoch_ms;
use crate::derive::DerivationEngine;

/// How often the worker loop touches the health timestamp even with no
/// traffic, so a genuinely stalled thread is distinguishable from an idle
/// one (spec §4.7: "the bridge must be able to tell 'no data' from 'worker
/// stopped responding'").
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(250);

/// Single-threaded processing core: derive each ingested Sample and fold it
/// into a bounded, chronologically ordered buffer.
pub struct ProcessingWorker {
    buffer: RingBuffer<crate::model::DerivedSample>,
    engine: DerivationEngine,
}

impl ProcessingWorker {
    /// Build a worker with the given Ring Buffer capacity (spec §6
    /// `max_points`).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: RingBuffer::new(capacity),
            engine: DerivationEngine::new(),
        }
    }

    /// Replace the buffer's contents with `items` (assumed chronologically
    /// ordered), leaving the Derivation Engine's bias/EMA state untouched.
    /// Used by [`super::bridge::WorkerBridge`] to seed the inline fallback
    /// worker from the last known-good threaded snapshot, so switching to
    /// fallback does not drop buffer history.
    pub fn restore(&mut self, items: Vec<crate::model::DerivedSample>) {
        self.buffer = RingBuffer::new(self.buffer.capacity());
        for item in items {
            self.buffer.push(item);
        }
    }

    /// Handle one request synchronously, returning its response.
    pub fn handle(&mut self, request: WorkerRequest) -> WorkerResponse {
        match request {
            WorkerRequest::Ingest(sample) => {
                let derived = self.engine.derive(&sample);
                self.buffer.insert_sorted(derived.clone(), crate::model::DerivedSample::key);
                WorkerResponse::Derived(derived)
            }
            WorkerRequest::Snapshot => WorkerResponse::Snapshot(self.buffer.snapshot()),
            WorkerRequest::Reset => {
                self.buffer.clear();
                self.engine.reset();
                WorkerResponse::Resumed
            }
            WorkerRequest::Restore(items) => {
                self.restore(items);
                WorkerResponse::Resumed
            }
            WorkerRequest::Shutdown => WorkerResponse::Resumed,
        }
    }

    /// Run the worker loop against a channel pair, updating `health` with
    /// the current wall clock on every iteration (message handled or idle
    /// timeout alike). Returns when the request channel disconnects or a
    /// [`WorkerRequest::Shutdown`] is received.
    pub fn run(mut self, requests: &Receiver<WorkerRequest>, responses: &Sender<WorkerResponse>, health: &Arc<AtomicI64>) {
        loop {
            match requests.recv_timeout(HEARTBEAT_INTERVAL) {
                Ok(WorkerRequest::Shutdown) => {
                    health.store(now_epoch_ms(), Ordering::Relaxed);
                    return;
                }
                Ok(request) => {
                    let response = self.handle(request);
                    health.store(now_epoch_ms(), Ordering::Relaxed);
                    if responses.send(response).is_err() {
                        return;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    health.store(now_epoch_ms(), Ordering::Relaxed);
                }
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sample::RawSample;
    use crate::model::Sample;

    fn sample() -> Sample {
        Sample::normalize(
            RawSample {
                timestamp: Some("2024-01-01T00:00:00Z".to_string()),
                voltage_v: Some(55.0),
                ..Default::default()
            },
            None,
        )
    }

    #[test]
    fn ingest_derives_and_buffers() {
        let mut worker = ProcessingWorker::new(10);
        let response = worker.handle(WorkerRequest::Ingest(sample()));
        assert!(matches!(response, WorkerResponse::Derived(_)));
        let WorkerResponse::Snapshot(snap) = worker.handle(WorkerRequest::Snapshot) else {
            panic!("expected snapshot");
        };
        assert_eq!(snap.len(), 1);
    }

    #[test]
    fn reset_clears_buffer_and_engine() {
        let mut worker = ProcessingWorker::new(10);
        worker.handle(WorkerRequest::Ingest(sample()));
        worker.handle(WorkerRequest::Reset);
        let WorkerResponse::Snapshot(snap) = worker.handle(WorkerRequest::Snapshot) else {
            panic!("expected snapshot");
        };
        assert!(snap.is_empty());
    }
}
