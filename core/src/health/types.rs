//! Core types and traits for health checking

use async_trait::async_trait;
use schema::{DataValue, HealthStatus};
use std::collections::BTreeMap;

use super::HealthError;

/// Expectation for HTTP response validation
#[derive(Debug, Clone, PartialEq)]
pub enum Expect {
    /// Accept any 2xx status code (200-299)
    Any2xx,
    /// Require a 2xx status and a JSON body whose named field is boolean `true`
    JsonFlag(String),
}

impl Expect {
    /// Check if a status code matches this expectation
    pub fn matches_status(&self, status: u16) -> bool {
        (200..=299).contains(&status)
    }

    /// Whether the response body has to be read
    pub fn needs_body(&self) -> bool {
        matches!(self, Expect::JsonFlag(_))
    }

    /// Validate a response body against this expectation
    pub fn check_body(&self, body: &[u8]) -> Result<(), HealthError> {
        match self {
            Expect::Any2xx => Ok(()),
            Expect::JsonFlag(field) => {
                let value: serde_json::Value = serde_json::from_slice(body)
                    .map_err(|e| HealthError::Payload(format!("body is not JSON: {}", e)))?;
                match value.get(field.as_str()).and_then(serde_json::Value::as_bool) {
                    Some(true) => Ok(()),
                    Some(false) => Err(HealthError::Payload(format!("field '{}' is false", field))),
                    None => Err(HealthError::Payload(format!(
                        "field '{}' is missing or not a boolean",
                        field
                    ))),
                }
            }
        }
    }
}

/// Designed outcome of a probe
///
/// A probe that runs to completion returns one of these, whatever the health
/// of the resource. Faults (transport errors, timeouts, panics) are reported
/// as [`HealthError`] instead and turned into results by the runner.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    /// Status of the probed resource
    pub status: HealthStatus,
    /// Human readable description
    pub description: String,
    /// Structured details
    pub data: BTreeMap<String, DataValue>,
}

impl ProbeOutcome {
    /// Create an outcome with the given status
    pub fn new(status: HealthStatus, description: impl Into<String>) -> Self {
        Self {
            status,
            description: description.into(),
            data: BTreeMap::new(),
        }
    }

    /// Healthy outcome
    pub fn healthy(description: impl Into<String>) -> Self {
        Self::new(HealthStatus::Healthy, description)
    }

    /// Degraded outcome
    pub fn degraded(description: impl Into<String>) -> Self {
        Self::new(HealthStatus::Degraded, description)
    }

    /// Unhealthy outcome
    pub fn unhealthy(description: impl Into<String>) -> Self {
        Self::new(HealthStatus::Unhealthy, description)
    }

    /// Attach a data entry
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<DataValue>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// Trait for health check implementations
///
/// This trait is implemented by specific probe types (memory, HTTP, TCP, ...)
/// and by external collaborators to provide a uniform interface for health
/// checking.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Execute the health check
    ///
    /// Returns the probe's outcome, or an error describing why no outcome
    /// could be produced. The implementation should respect its own
    /// timeout; the runner enforces the registration deadline regardless.
    async fn check(&self) -> Result<ProbeOutcome, HealthError>;
}
