//! Simple daemon error types

use vigil_core::CoreError;

#[derive(Debug)]
pub enum DaemonError {
    ConfigError(String),
    StartupError(String),
    Core(CoreError),
    IoError(std::io::Error),
    SerializationError(serde_json::Error),
}

impl std::fmt::Display for DaemonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DaemonError::ConfigError(msg) => write!(f, "Config error: {}", msg),
            DaemonError::StartupError(msg) => write!(f, "Startup error: {}", msg),
            DaemonError::Core(err) => write!(f, "{} [{}]", err, err.code()),
            DaemonError::IoError(err) => write!(f, "I/O error: {}", err),
            DaemonError::SerializationError(err) => write!(f, "Serialization error: {}", err),
        }
    }
}

impl std::error::Error for DaemonError {}

impl From<CoreError> for DaemonError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConfigurationError(msg) => DaemonError::ConfigError(msg),
            other => DaemonError::Core(other),
        }
    }
}

impl From<std::io::Error> for DaemonError {
    fn from(err: std::io::Error) -> Self {
        DaemonError::IoError(err)
    }
}

impl From<serde_json::Error> for DaemonError {
    fn from(err: serde_json::Error) -> Self {
        DaemonError::SerializationError(err)
    }
}

pub type Result<T> = std::result::Result<T, DaemonError>;
