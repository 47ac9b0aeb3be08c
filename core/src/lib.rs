//! Core functionality for the Vigil health engine
//!
//! This crate contains the probes, the registry they are wired into, the
//! evaluation runner and scheduler, and the read side (latest report and
//! history) used by the daemon.

pub mod config;
pub mod error;
pub mod health;
pub mod history;
pub mod publisher;
pub mod registry;
pub mod runner;
pub mod scheduler;


// Re-export schema types for convenience
pub use schema::*;

pub use config::{build_registry, build_scheduler, load_settings_from_toml_path, load_settings_from_toml_str};
pub use error::{CoreError, Result};
pub use history::{HistoryRing, HistoryStore};
pub use publisher::{HealthState, ReportPublisher};
pub use registry::{ProbeRegistration, ProbeRegistry};
pub use runner::EvaluationRunner;
pub use scheduler::{Scheduler, SchedulerHandle, ShutdownOutcome};

/// Core utilities and helper functions
pub mod utils {
    use tracing::info;

    /// Initialize tracing for the application
    pub fn init_tracing(level: &str) -> crate::Result<()> {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        fmt()
            .with_env_filter(filter)
            .try_init()
            .map_err(|e| crate::CoreError::InitializationError(e.to_string()))?;

        info!("Tracing initialized with level: {}", level);
        Ok(())
    }
}
