//! `evtelctl` — a small operator CLI around the pipeline: run the demo
//! fixtures end to end, or inspect/validate configuration. Grounded on the
//! teacher's `clap::Parser`-derived `Cli`/`Subcommand` structure in
//! `cli_app.rs`, trimmed to this crate's much smaller surface.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::json;

use crate::clockid::now_epoch_ms;
use crate::controller::RealtimeController;
use crate::core::config::PipelineConfig;
use crate::core::errors::Result;
use crate::demo::{SyntheticBroker, SyntheticStore};
use crate::model::ConnectionState;

/// `evtelctl` — inspect configuration or run the pipeline against
/// synthetic telemetry.
#[derive(Debug, Parser)]
#[command(name = "evtelctl", author, version, about = "EV telemetry pipeline CLI", long_about = None)]
pub struct Cli {
    /// Override config file path; falls back to built-in defaults if unset
    /// or unreadable.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the pipeline against the synthetic broker/store fixtures for a
    /// fixed number of seconds, printing periodic frame summaries.
    Demo(DemoArgs),
    /// Print the effective configuration as JSON.
    ConfigShow,
    /// Validate a configuration file without running anything.
    ConfigValidate,
}

#[derive(Debug, clap::Args)]
struct DemoArgs {
    /// How many seconds to run the synthetic demo for.
    #[arg(long, default_value_t = 10)]
    seconds: u64,
    /// Synthetic session id to triangulate.
    #[arg(long, default_value = "demo-session")]
    session: String,
}

/// Parse arguments and dispatch. Returns an error suitable for printing to
/// stderr and exiting non-zero.
pub fn run(cli: &Cli) -> Result<()> {
    crate::logging::init_logging(cli.verbose);
    let config = load_config(cli.config.as_deref())?;

    match &cli.command {
        Command::Demo(args) => run_demo(&config, args),
        Command::ConfigShow => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Command::ConfigValidate => {
            config.validate()?;
            println!("config ok");
            Ok(())
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::load(path),
        None => Ok(PipelineConfig::default()),
    }
}

fn run_demo(config: &PipelineConfig, args: &DemoArgs) -> Result<()> {
    let broker = Arc::new(SyntheticBroker::new(args.session.clone()));
    let store = Arc::new(SyntheticStore);
    let mut controller = RealtimeController::new(broker, store, config.clone());

    let start_ms = now_epoch_ms();
    controller.connect(start_ms);

    let deadline = start_ms + i64::try_from(args.seconds).unwrap_or(i64::MAX) * 1_000;
    loop {
        let now = now_epoch_ms();
        if now >= deadline {
            break;
        }
        for alert in controller.poll(now) {
            println!("{}", json!({"alert": alert.text, "kind": format!("{:?}", alert.kind)}));
        }
        if controller.state() == ConnectionState::Connected {
            let (report, alerts) = controller.run_quality_pass(now);
            println!(
                "{}",
                json!({
                    "state": controller.state().as_str(),
                    "quality_score": report.quality_score,
                    "estimated_hz": report.estimated_hz,
                })
            );
            for alert in alerts {
                println!("{}", json!({"alert": alert.text, "kind": format!("{:?}", alert.kind)}));
            }
        } else {
            println!("{}", json!({"state": controller.state().as_str()}));
        }
        sleep(Duration::from_millis(500));
    }
    Ok(())
}
