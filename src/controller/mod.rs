//! Realtime Controller (C9) — the connection state machine that owns the
//! Worker Bridge and drives the Triangulator (spec §4.9).

mod realtime_controller;

pub use realtime_controller::RealtimeController;
