//! Error types for health check operations

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during health check operations
///
/// Every variant is recovered by the evaluation runner into an `Unhealthy`
/// probe result whose `error` field is this error's display text.
#[derive(Error, Debug)]
pub enum HealthError {
    /// The health check did not finish within its deadline
    #[error("timeout")]
    Timeout(Duration),

    /// TCP connection failed
    #[error("tcp connection failed: {0}")]
    Tcp(#[from] std::io::Error),

    /// HTTP transport failed
    #[error("http request failed: {0}")]
    Http(#[from] hyper::Error),

    /// Target URL could not be parsed
    #[error("invalid uri: {0}")]
    InvalidUri(#[from] hyper::http::uri::InvalidUri),

    /// Request could not be built
    #[error("invalid request: {0}")]
    Request(#[from] hyper::http::Error),

    /// HTTP response status was not a success
    #[error("unexpected status {0}")]
    UnexpectedStatus(u16),

    /// Response body did not carry the expected payload
    #[error("unexpected payload: {0}")]
    Payload(String),

    /// The probe itself faulted (panicked or hit an internal error)
    #[error("probe fault: {0}")]
    Fault(String),
}

impl HealthError {
    /// Whether this error is a deadline expiry
    pub fn is_timeout(&self) -> bool {
        matches!(self, HealthError::Timeout(_))
    }
}
