//! Core error types and utilities

use thiserror::Error;

/// Core-specific error types
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Duplicate probe name: '{0}'")]
    DuplicateProbe(String),

    #[error("Read limit exceeded: {limit} history request(s) already in flight")]
    ReadLimitExceeded { limit: usize },

    #[error("Initialization error: {0}")]
    InitializationError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Generic error: {0}")]
    Other(String),
}

impl CoreError {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::ConfigurationError(_) => "CORE001",
            CoreError::ValidationError(_) => "CORE002",
            CoreError::DuplicateProbe(_) => "CORE003",
            CoreError::ReadLimitExceeded { .. } => "CORE004",
            CoreError::InitializationError(_) => "CORE005",
            CoreError::IoError(_) => "CORE006",
            CoreError::SerializationError(_) => "CORE007",
            CoreError::Other(_) => "CORE999",
        }
    }

    /// Whether the error must stop the process before the scheduler starts
    pub fn is_fatal_at_startup(&self) -> bool {
        matches!(
            self,
            CoreError::ConfigurationError(_)
                | CoreError::ValidationError(_)
                | CoreError::DuplicateProbe(_)
                | CoreError::InitializationError(_)
        )
    }
}

/// Core-specific result type
pub type Result<T> = std::result::Result<T, CoreError>;

impl From<&str> for CoreError {
    fn from(s: &str) -> Self {
        CoreError::Other(s.to_string())
    }
}

impl From<String> for CoreError {
    fn from(s: String) -> Self {
        CoreError::Other(s)
    }
}

impl From<toml::de::Error> for CoreError {
    fn from(e: toml::de::Error) -> Self {
        CoreError::ConfigurationError(format!("TOML parse error: {}", e))
    }
}
