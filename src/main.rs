#![forbid(unsafe_code)]

//! `evtelctl` — EV telemetry pipeline CLI entry point.

use clap::Parser;
use ev_telemetry_core::cli::{run, Cli};

fn main() {
    let args = Cli::parse();
    if let Err(e) = run(&args) {
        eprintln!("evtelctl: {e}");
        std::process::exit(1);
    }
}
