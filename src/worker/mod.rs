//! Processing Worker (C6) and Worker Bridge (C7): off-main-thread sample
//! processing with a head-drop queue, health heartbeat, and inline fallback
//! (spec §4.6, §4.7).

mod bridge;
mod messages;
mod processing;

pub use bridge::{DispatchMode, WorkerBridge};
pub use messages::{WorkerRequest, WorkerResponse};
pub use processing::ProcessingWorker;
