//! Daemon bootstrap: load settings, wire probes and start the scheduler
//!
//! Configuration errors surface here, before the scheduler is spawned, so
//! the daemon never serves reports from a half-configured engine.

use schema::{EvaluationReport, MonitorSettings};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use vigil_core::health::{ProcessStats, RuntimeStats};
use vigil_core::{
    build_scheduler, load_settings_from_toml_path, CoreError, ReportPublisher, Scheduler,
    SchedulerHandle, ShutdownOutcome,
};

use crate::{DaemonError, Result};

/// Handle to the running engine
#[derive(Debug)]
pub struct BootstrapHandle {
    /// Settings the engine was started with
    pub settings: MonitorSettings,
    scheduler: SchedulerHandle,
}

impl BootstrapHandle {
    /// Read handle over published reports
    pub fn publisher(&self) -> ReportPublisher {
        self.scheduler.publisher()
    }

    /// Stop the scheduler, giving an in-flight cycle `grace` to finish
    pub async fn shutdown(self, grace: Duration) -> ShutdownOutcome {
        let outcome = self.scheduler.shutdown(grace).await;
        info!("Bootstrap shutdown complete ({:?})", outcome);
        outcome
    }
}

/// Load settings from `config_path`, or use the defaults without one
pub fn load_settings(config_path: Option<PathBuf>) -> Result<MonitorSettings> {
    match config_path {
        Some(path) => {
            info!("Loading settings from {}", path.display());
            Ok(load_settings_from_toml_path(&path)?)
        }
        None => {
            debug!("No config file given, using default settings");
            Ok(MonitorSettings::default())
        }
    }
}

/// Build the scheduler, reporting wiring failures as startup errors
fn wire(settings: &MonitorSettings, stats: Arc<dyn RuntimeStats>) -> Result<Scheduler> {
    build_scheduler(settings, stats).map_err(startup_error)
}

fn startup_error(err: CoreError) -> DaemonError {
    if err.is_fatal_at_startup() {
        DaemonError::StartupError(format!("{} [{}]", err, err.code()))
    } else {
        err.into()
    }
}

/// Bootstrap the engine against the current process
pub async fn bootstrap(config_path: Option<PathBuf>) -> Result<BootstrapHandle> {
    let settings = load_settings(config_path)?;
    bootstrap_with(settings, Arc::new(ProcessStats::new())).await
}

/// Bootstrap the engine with explicit settings and memory statistics
pub async fn bootstrap_with(
    settings: MonitorSettings,
    stats: Arc<dyn RuntimeStats>,
) -> Result<BootstrapHandle> {
    let scheduler = wire(&settings, stats)?.spawn();
    info!(
        "Health engine started for '{}' (interval {:?}, history {})",
        settings.endpoint_name,
        settings.evaluation_interval(),
        settings.history_capacity
    );
    Ok(BootstrapHandle {
        settings,
        scheduler,
    })
}

/// Run a single evaluation cycle without starting the background loop
pub async fn evaluate_once(
    settings: &MonitorSettings,
    stats: Arc<dyn RuntimeStats>,
) -> Result<Arc<EvaluationReport>> {
    let scheduler = wire(settings, stats)?;
    Ok(scheduler.run_cycle().await)
}
