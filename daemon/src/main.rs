//! Vigil daemon binary
//!
//! Runs the health engine on its configured interval until interrupted, or
//! evaluates once and prints the report with `--once`.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use vigil_core::health::ProcessStats;
use vigil_core::ShutdownOutcome;

#[derive(Parser)]
#[command(name = "vigild")]
#[command(about = "Aggregates dependency health checks into periodic reports")]
#[command(version)]
struct Cli {
    /// Settings file (TOML); defaults are used without one
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Seconds an in-flight evaluation may take to finish on shutdown
    #[arg(long, default_value_t = 5)]
    shutdown_grace_secs: u64,

    /// Evaluate once, print the report as JSON and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> daemon::Result<()> {
    let cli = Cli::parse();
    vigil_core::utils::init_tracing(&cli.log_level)?;

    let settings = match daemon::load_settings(cli.config.clone()) {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load settings: {}", e);
            return Err(e);
        }
    };

    if cli.once {
        let report = daemon::evaluate_once(&settings, Arc::new(ProcessStats::new())).await?;
        println!("{}", daemon::report_body(&report)?);
        if !report.overall_status.is_operational() {
            std::process::exit(1);
        }
        return Ok(());
    }

    info!("Starting Vigil daemon");
    let handle = match daemon::bootstrap_with(settings, Arc::new(ProcessStats::new())).await {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to start health engine: {}", e);
            return Err(e);
        }
    };

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down...");

    let publisher = handle.publisher();
    let grace = Duration::from_secs(cli.shutdown_grace_secs);
    if handle.shutdown(grace).await == ShutdownOutcome::Abandoned {
        warn!("Shutdown abandoned an in-flight evaluation after {:?}", grace);
    }

    match publisher.latest() {
        Some(report) => info!(
            "Last report #{}: {} at {}",
            report.sequence, report.overall_status, report.timestamp
        ),
        None => info!("No report was published"),
    }

    info!("Daemon stopped");
    Ok(())
}
