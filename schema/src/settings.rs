//! Configuration file types for the health engine
//!
//! These types describe the TOML settings file consumed at startup. Every
//! field has a serde default so a minimal file only needs the parts it
//! overrides. Validation lives in `vigil_core::config`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::report::FailurePolicy;

/// One GiB, the default memory threshold
pub const DEFAULT_MEMORY_THRESHOLD_BYTES: u64 = 1024 * 1024 * 1024;

/// Top-level settings for the health engine
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSettings {
    /// Logical endpoint name the reports are recorded under
    #[serde(default = "default_endpoint_name")]
    pub endpoint_name: String,

    /// Seconds between evaluation cycles
    #[serde(default = "default_evaluation_interval_secs")]
    pub evaluation_interval_secs: u64,

    /// Reports retained per endpoint
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Concurrently outstanding history reads
    #[serde(default = "default_max_active_requests")]
    pub max_active_requests: usize,

    /// Cap on probes executing at once; unbounded when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,

    /// Process memory probe
    #[serde(default)]
    pub memory: MemorySettings,

    /// Downstream API probed for a JSON status flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_api: Option<DependencyApiSettings>,

    /// Database / message queue / cache reachability probes
    #[serde(default)]
    pub infrastructure: Vec<InfrastructureSettings>,

    /// Grouped probe over the health paths of `services`
    #[serde(default)]
    pub url_group: UrlGroupSettings,

    /// Dependent services keyed by name
    #[serde(default)]
    pub services: BTreeMap<String, ServiceEndpoint>,
}

impl MonitorSettings {
    /// Interval between evaluation cycles
    pub fn evaluation_interval(&self) -> Duration {
        Duration::from_secs(self.evaluation_interval_secs)
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            endpoint_name: default_endpoint_name(),
            evaluation_interval_secs: default_evaluation_interval_secs(),
            history_capacity: default_history_capacity(),
            max_active_requests: default_max_active_requests(),
            max_concurrency: None,
            memory: MemorySettings::default(),
            dependency_api: None,
            infrastructure: Vec::new(),
            url_group: UrlGroupSettings::default(),
            services: BTreeMap::new(),
        }
    }
}

fn default_endpoint_name() -> String {
    "Health API".to_string()
}

const fn default_evaluation_interval_secs() -> u64 {
    10
}

const fn default_history_capacity() -> usize {
    60
}

const fn default_max_active_requests() -> usize {
    1
}

const fn default_probe_timeout_secs() -> u64 {
    10
}

/// Settings for the process memory probe
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MemorySettings {
    /// Whether the probe is registered
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Probe name
    #[serde(default = "default_memory_name")]
    pub name: String,

    /// Allocated bytes at or above which the probe fails
    ///
    /// `None` keeps the probe registered but reports it unhealthy, so a
    /// missing threshold is visible in every report.
    #[serde(default = "default_threshold_bytes")]
    pub threshold_bytes: Option<u64>,

    /// Probe timeout in seconds
    #[serde(default = "default_probe_timeout_secs")]
    pub timeout_secs: u64,

    /// Tags attached to the probe
    #[serde(default = "default_memory_tags")]
    pub tags: Vec<String>,

    /// Status this probe contributes to the aggregate when it fails
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl MemorySettings {
    /// Probe timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            name: default_memory_name(),
            threshold_bytes: default_threshold_bytes(),
            timeout_secs: default_probe_timeout_secs(),
            tags: default_memory_tags(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

const fn default_true() -> bool {
    true
}

fn default_memory_name() -> String {
    "API Memory Check".to_string()
}

fn default_threshold_bytes() -> Option<u64> {
    Some(DEFAULT_MEMORY_THRESHOLD_BYTES)
}

fn default_memory_tags() -> Vec<String> {
    vec!["Service".to_string()]
}

/// Downstream API whose response carries a boolean status field
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DependencyApiSettings {
    /// Probe name
    pub name: String,

    /// Key into `services`; the probe requests that service's base URL
    pub service: String,

    /// JSON field that must be `true`
    #[serde(default = "default_status_field")]
    pub status_field: String,

    /// Probe timeout in seconds
    #[serde(default = "default_probe_timeout_secs")]
    pub timeout_secs: u64,

    /// Tags attached to the probe
    #[serde(default)]
    pub tags: Vec<String>,

    /// Status this probe contributes to the aggregate when it fails
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl DependencyApiSettings {
    /// Probe timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_status_field() -> String {
    "status".to_string()
}

/// Kind of infrastructure dependency
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum InfrastructureKind {
    /// Database server
    Database,
    /// Message broker
    MessageQueue,
    /// Cache server
    Cache,
}

impl InfrastructureKind {
    /// Tag used when the settings do not provide any
    pub fn default_tag(&self) -> &'static str {
        match self {
            InfrastructureKind::Database => "Database",
            InfrastructureKind::MessageQueue => "Message-Queue",
            InfrastructureKind::Cache => "Caching",
        }
    }
}

/// Reachability probe for a database, queue or cache
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureSettings {
    /// Probe name
    pub name: String,

    /// Dependency kind
    pub kind: InfrastructureKind,

    /// `host:port` to connect to; blank leaves the probe unregistered
    #[serde(default)]
    pub address: String,

    /// Probe timeout in seconds
    #[serde(default = "default_probe_timeout_secs")]
    pub timeout_secs: u64,

    /// Tags attached to the probe
    #[serde(default)]
    pub tags: Vec<String>,

    /// Status this probe contributes to the aggregate when it fails
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl InfrastructureSettings {
    /// Probe timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Settings for the grouped dependency probe
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UrlGroupSettings {
    /// Probe name
    #[serde(default = "default_url_group_name")]
    pub name: String,

    /// Timeout for the whole group in seconds
    #[serde(default = "default_url_group_timeout_secs")]
    pub timeout_secs: u64,

    /// Timeout for each endpoint request in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Status this probe contributes to the aggregate when it fails
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl UrlGroupSettings {
    /// Group timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Per-request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for UrlGroupSettings {
    fn default() -> Self {
        Self {
            name: default_url_group_name(),
            timeout_secs: default_url_group_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

fn default_url_group_name() -> String {
    "Dependent Http Clients".to_string()
}

const fn default_url_group_timeout_secs() -> u64 {
    60
}

const fn default_request_timeout_secs() -> u64 {
    30
}

/// A dependent service: base URL plus optional health path
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEndpoint {
    /// Base URL, e.g. `https://api.example.com`
    #[serde(default)]
    pub base: String,

    /// Health path appended to `base`; services without one are not probed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<String>,
}

impl ServiceEndpoint {
    /// Full health URL, or `None` when no health path is configured
    pub fn health_url(&self) -> Option<String> {
        match self.health.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(format!("{}{}", self.base, path)),
            _ => None,
        }
    }
}
