//! Report types produced by the health engine
//!
//! Every evaluation cycle produces one [`EvaluationReport`] holding a
//! [`ProbeResult`] per registered probe. Reports are immutable once built and
//! are shared between the latest-report slot and the history store.
//!
//! ## Severity
//!
//! Statuses are totally ordered by severity:
//! `Healthy < Degraded < Unhealthy`. The aggregate status of a report is the
//! most severe per-probe status after it has been mapped through the probe's
//! [`FailurePolicy`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

/// Health status of a single probe or of a whole evaluation
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "camelCase")]
pub enum HealthStatus {
    /// Resource is fully healthy
    Healthy,
    /// Resource works but something is off
    Degraded,
    /// Resource is unavailable or failing
    Unhealthy,
}

impl HealthStatus {
    /// Check if the status is fully healthy
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    /// Check if the status still allows serving traffic (healthy or degraded)
    pub fn is_operational(&self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded)
    }

    /// Return the more severe of two statuses
    #[must_use]
    pub fn worst(self, other: HealthStatus) -> HealthStatus {
        self.max(other)
    }
}

impl Default for HealthStatus {
    fn default() -> Self {
        HealthStatus::Healthy
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HealthStatus::Healthy => "Healthy",
            HealthStatus::Degraded => "Degraded",
            HealthStatus::Unhealthy => "Unhealthy",
        };
        f.write_str(s)
    }
}

/// Status a failing probe contributes to the aggregate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum FailurePolicy {
    /// A failure makes the whole report unhealthy
    Unhealthy,
    /// A failure only degrades the whole report
    Degraded,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::Unhealthy
    }
}

impl FailurePolicy {
    /// Status reported when the probe fails
    pub fn failure_status(&self) -> HealthStatus {
        match self {
            FailurePolicy::Unhealthy => HealthStatus::Unhealthy,
            FailurePolicy::Degraded => HealthStatus::Degraded,
        }
    }

    /// Map a probe's own status to its contribution to the aggregate
    ///
    /// `Healthy` and `Degraded` pass through; `Unhealthy` becomes the
    /// policy's failure status.
    pub fn apply(&self, status: HealthStatus) -> HealthStatus {
        match status {
            HealthStatus::Unhealthy => self.failure_status(),
            other => other,
        }
    }
}

/// Scalar value attached to a probe result
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(untagged)]
pub enum DataValue {
    /// Boolean flag
    Bool(bool),
    /// Unsigned integer (byte counts, counters); non-negative JSON integers decode here
    Unsigned(u64),
    /// Signed integer
    Integer(i64),
    /// Floating point measurement
    Float(f64),
    /// Free text
    Text(String),
}

impl DataValue {
    /// Borrow the value as text, if it is text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Read the value as an unsigned integer, if it is a non-negative integer
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            DataValue::Unsigned(v) => Some(*v),
            DataValue::Integer(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl From<bool> for DataValue {
    fn from(v: bool) -> Self {
        DataValue::Bool(v)
    }
}

impl From<i64> for DataValue {
    fn from(v: i64) -> Self {
        DataValue::Integer(v)
    }
}

impl From<u64> for DataValue {
    fn from(v: u64) -> Self {
        DataValue::Unsigned(v)
    }
}

impl From<f64> for DataValue {
    fn from(v: f64) -> Self {
        DataValue::Float(v)
    }
}

impl From<String> for DataValue {
    fn from(v: String) -> Self {
        DataValue::Text(v)
    }
}

impl From<&str> for DataValue {
    fn from(v: &str) -> Self {
        DataValue::Text(v.to_string())
    }
}

/// Result of executing one probe during one evaluation cycle
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    /// Name the probe was registered under
    pub probe_name: String,
    /// Tags the probe was registered with
    #[serde(default)]
    pub tags: Vec<String>,
    /// Status reported by the probe
    pub status: HealthStatus,
    /// Human readable description
    pub description: String,
    /// Structured details (byte counts, per-dependency outcomes, ...)
    #[serde(default)]
    pub data: BTreeMap<String, DataValue>,
    /// How long the probe took
    #[serde(rename = "durationMs", with = "crate::duration_ms")]
    #[schemars(with = "u64")]
    pub duration: Duration,
    /// Fault or timeout text; present iff the probe errored, panicked or timed out
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeResult {
    /// Whether this result carries a fault or timeout
    pub fn is_fault(&self) -> bool {
        self.error.is_some()
    }

    /// Look up a data entry by key
    pub fn data_value(&self, key: &str) -> Option<&DataValue> {
        self.data.get(key)
    }
}

/// One aggregation cycle
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    /// Monotonic cycle number assigned by the runner
    pub sequence: u64,
    /// When the cycle completed, RFC3339
    pub timestamp: String,
    /// Aggregate status across all results
    pub overall_status: HealthStatus,
    /// Per-probe results in registration order
    pub results: Vec<ProbeResult>,
    /// Wall-clock duration of the cycle
    #[serde(rename = "totalDurationMs", with = "crate::duration_ms")]
    #[schemars(with = "u64")]
    pub total_duration: Duration,
}

impl EvaluationReport {
    /// Find the result for a probe by name
    pub fn result(&self, probe_name: &str) -> Option<&ProbeResult> {
        self.results.iter().find(|r| r.probe_name == probe_name)
    }

    /// All results whose status is not healthy
    pub fn failed_results(&self) -> Vec<&ProbeResult> {
        self.results
            .iter()
            .filter(|r| !r.status.is_healthy())
            .collect()
    }

    /// Names of the probes in report order
    pub fn probe_names(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.probe_name.as_str()).collect()
    }

    /// Create a current timestamp string in RFC3339 format (millisecond precision)
    #[must_use]
    pub fn current_timestamp() -> String {
        humantime::format_rfc3339_millis(SystemTime::now()).to_string()
    }
}

/// A report as retained by the history store for one endpoint
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Logical endpoint the report belongs to
    pub endpoint_name: String,
    /// The retained report
    pub report: EvaluationReport,
}
