//! Grouped probing of dependent HTTP services

use async_trait::async_trait;
use schema::{DataValue, HealthStatus};
use std::time::Duration;
use tracing::{debug, warn};

use super::{Expect, HealthError, HttpProbe, Probe, ProbeOutcome};

/// Data value recorded for an endpoint that answered successfully
pub const ENDPOINT_HEALTHY: &str = "healthy";

/// One named dependency inside a [`UrlGroupProbe`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlEndpoint {
    /// Dependency name, used as the data key
    pub name: String,
    /// Full health URL
    pub url: String,
}

impl UrlEndpoint {
    /// Create an endpoint
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Probe issuing one GET per dependency, concurrently
///
/// The group is unhealthy if any endpoint fails. Each endpoint gets a data
/// entry keyed by its name: `"healthy"` or the failure text (`"timeout"`,
/// `"unexpected status 500"`, ...). Dependencies rejected while building the
/// group are listed as `"not registered: <reason>"` without affecting the
/// status.
#[derive(Debug, Clone)]
pub struct UrlGroupProbe {
    endpoints: Vec<UrlEndpoint>,
    rejected: Vec<(String, String)>,
    request_timeout: Duration,
}

impl UrlGroupProbe {
    /// Create a group over the given endpoints
    pub fn new(endpoints: Vec<UrlEndpoint>, request_timeout: Duration) -> Self {
        Self {
            endpoints,
            rejected: Vec::new(),
            request_timeout,
        }
    }

    /// Record a dependency that was dropped at configuration time
    #[must_use]
    pub fn with_rejected(mut self, name: impl Into<String>, reason: impl Into<String>) -> Self {
        self.rejected.push((name.into(), reason.into()));
        self
    }

    /// Endpoints probed by this group
    pub fn endpoints(&self) -> &[UrlEndpoint] {
        &self.endpoints
    }

    /// Names of the probed dependencies
    pub fn dependency_names(&self) -> Vec<String> {
        self.endpoints.iter().map(|e| e.name.clone()).collect()
    }

    async fn probe_all(&self) -> Vec<(String, Result<u16, HealthError>)> {
        let handles: Vec<_> = self
            .endpoints
            .iter()
            .map(|endpoint| {
                let probe = HttpProbe::new(
                    endpoint.name.clone(),
                    endpoint.url.clone(),
                    Expect::Any2xx,
                    self.request_timeout,
                );
                (endpoint.name.clone(), tokio::spawn(async move { probe.request().await }))
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            let outcome = match handle.await {
                Ok(result) => result,
                Err(join_error) => Err(HealthError::Fault(join_error.to_string())),
            };
            outcomes.push((name, outcome));
        }
        outcomes
    }
}

#[async_trait]
impl Probe for UrlGroupProbe {
    async fn check(&self) -> Result<ProbeOutcome, HealthError> {
        let outcomes = self.probe_all().await;

        let mut failed = Vec::new();
        let mut outcome = ProbeOutcome::healthy("");
        for (name, result) in outcomes {
            let value = match result {
                Ok(_) => DataValue::from(ENDPOINT_HEALTHY),
                Err(e) => {
                    debug!("Dependency '{}' failed: {}", name, e);
                    failed.push(name.clone());
                    DataValue::from(e.to_string())
                }
            };
            outcome = outcome.with_data(name, value);
        }
        for (name, reason) in &self.rejected {
            outcome = outcome.with_data(name.clone(), format!("not registered: {}", reason));
        }

        let total = self.endpoints.len();
        if failed.is_empty() {
            outcome.description = format!("All {} dependencies are healthy.", total);
        } else {
            warn!("Unhealthy dependencies: {}", failed.join(", "));
            outcome.status = HealthStatus::Unhealthy;
            outcome.description = format!("Unhealthy dependencies: {}", failed.join(", "));
        }
        Ok(outcome)
    }
}
