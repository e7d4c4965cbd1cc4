//! Messages exchanged between the calling thread and the Processing Worker
//! (spec §4.6).

use crate::model::{DerivedSample, Sample};

/// A request dispatched to the Processing Worker thread.
#[derive(Debug, Clone)]
pub enum WorkerRequest {
    /// Derive and buffer one Sample.
    Ingest(Sample),
    /// Return a chronological snapshot of the buffer.
    Snapshot,
    /// Clear the buffer and reset the Derivation Engine's bias/EMA state.
    Reset,
    /// Replace the buffer's contents with the given chronologically
    /// ordered items, without touching the Derivation Engine's state. Used
    /// to reseed a freshly respawned worker thread from the bridge's last
    /// known-good snapshot (spec §4.7).
    Restore(Vec<DerivedSample>),
    /// Stop the worker loop.
    Shutdown,
}

/// A response produced by the Processing Worker.
#[derive(Debug, Clone)]
pub enum WorkerResponse {
    /// The DerivedSample produced for an [`WorkerRequest::Ingest`].
    Derived(DerivedSample),
    /// The buffer snapshot requested by [`WorkerRequest::Snapshot`].
    Snapshot(Vec<DerivedSample>),
    /// Acknowledges [`WorkerRequest::Reset`].
    Resumed,
}
