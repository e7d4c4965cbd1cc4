//! Structured logging setup via `tracing`. Replaces the teacher's
//! SQLite/JSONL dual logger — persistent storage is out of scope for this
//! browser-resident pipeline (spec §1 Non-goals); `tracing-subscriber`'s
//! `EnvFilter` gives the same "quiet unless asked" operator ergonomics.

use tracing_subscriber::EnvFilter;

/// Install a global `tracing` subscriber. Honors `RUST_LOG`, defaulting to
/// `info` for this crate and `warn` for dependencies. Safe to call more
/// than once in tests; subsequent calls are no-ops.
pub fn init_logging(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ev_telemetry_core={default_directive},warn")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
