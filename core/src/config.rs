//! Configuration loading, validation and probe wiring
//!
//! This module parses a TOML settings file into [`MonitorSettings`], relies
//! on the serde defaults of the schema types, performs strict validation with
//! field-path error messages, and turns validated settings into a
//! [`ProbeRegistry`] and a ready-to-spawn [`Scheduler`].

use crate::health::{
    Expect, HttpProbe, MemoryProbe, RuntimeStats, TcpProbe, UrlEndpoint, UrlGroupProbe,
};
use crate::history::HistoryStore;
use crate::publisher::HealthState;
use crate::registry::{ProbeRegistration, ProbeRegistry};
use crate::runner::EvaluationRunner;
use crate::scheduler::Scheduler;
use crate::{CoreError, Result};
use schema::*;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Load settings from a TOML file path
pub fn load_settings_from_toml_path(path: impl AsRef<Path>) -> Result<MonitorSettings> {
    let data = fs::read_to_string(&path).map_err(|e| {
        CoreError::ConfigurationError(format!("Failed to read config {:?}: {}", path.as_ref(), e))
    })?;
    load_settings_from_toml_str(&data)
}

/// Load settings from a TOML string
pub fn load_settings_from_toml_str(input: &str) -> Result<MonitorSettings> {
    let settings: MonitorSettings = toml::from_str(input)?;
    validate(&settings)?;
    Ok(settings)
}

fn require_non_empty(value: &str, path: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CoreError::ValidationError(format!(
            "{}: cannot be empty",
            path
        )));
    }
    Ok(())
}

/// Upper bound for every configured interval and timeout, in seconds
pub const MAX_DURATION_SECS: u64 = 86_400;

fn require_at_most(value: u64, max: u64, path: &str) -> Result<()> {
    if value > max {
        return Err(CoreError::ValidationError(format!(
            "{}: must be <= {}",
            path, max
        )));
    }
    Ok(())
}

fn require_duration_secs(value: u64, path: &str) -> Result<()> {
    require_positive(value, path)?;
    require_at_most(value, MAX_DURATION_SECS, path)
}

fn require_positive(value: u64, path: &str) -> Result<()> {
    if value == 0 {
        return Err(CoreError::ValidationError(format!("{}: must be > 0", path)));
    }
    Ok(())
}

/// Check that `url` is an absolute http(s) URL
pub fn check_http_url(url: &str) -> std::result::Result<(), String> {
    let uri: hyper::Uri = url
        .parse()
        .map_err(|e| format!("invalid url '{}': {}", url, e))?;
    match uri.scheme_str() {
        Some("http") | Some("https") => {}
        Some(other) => return Err(format!("invalid url '{}': unsupported scheme '{}'", url, other)),
        None => return Err(format!("invalid url '{}': missing scheme", url)),
    }
    if uri.host().map_or(true, str::is_empty) {
        return Err(format!("invalid url '{}': missing host", url));
    }
    Ok(())
}

/// Validate settings and return `Result<()>` with field-path errors
pub fn validate(settings: &MonitorSettings) -> Result<()> {
    require_non_empty(&settings.endpoint_name, "endpointName")?;
    require_duration_secs(settings.evaluation_interval_secs, "evaluationIntervalSecs")?;
    require_positive(settings.history_capacity as u64, "historyCapacity")?;
    require_positive(settings.max_active_requests as u64, "maxActiveRequests")?;
    if let Some(n) = settings.max_concurrency {
        require_positive(n as u64, "maxConcurrency")?;
    }

    // memory
    let memory = &settings.memory;
    if memory.enabled {
        require_non_empty(&memory.name, "memory.name")?;
        require_duration_secs(memory.timeout_secs, "memory.timeoutSecs")?;
        if let Some(threshold) = memory.threshold_bytes {
            require_positive(threshold, "memory.thresholdBytes")?;
        }
    }

    // dependency API
    if let Some(api) = &settings.dependency_api {
        require_non_empty(&api.name, "dependencyApi.name")?;
        require_non_empty(&api.status_field, "dependencyApi.statusField")?;
        require_duration_secs(api.timeout_secs, "dependencyApi.timeoutSecs")?;
        let service = settings.services.get(&api.service).ok_or_else(|| {
            CoreError::ConfigurationError(format!(
                "dependencyApi.service: unknown service '{}'",
                api.service
            ))
        })?;
        check_http_url(&service.base).map_err(|reason| {
            CoreError::ConfigurationError(format!(
                "services.{}.base: {}",
                api.service, reason
            ))
        })?;
    }

    // infrastructure
    for (i, infra) in settings.infrastructure.iter().enumerate() {
        require_non_empty(&infra.name, &format!("infrastructure[{}].name", i))?;
        require_duration_secs(infra.timeout_secs, &format!("infrastructure[{}].timeoutSecs", i))?;
        if !infra.address.trim().is_empty()
            && TcpProbe::from_address(&infra.address, infra.timeout()).is_none()
        {
            return Err(CoreError::ConfigurationError(format!(
                "infrastructure[{}].address: expected host:port, got '{}'",
                i, infra.address
            )));
        }
    }

    // URL group
    let group = &settings.url_group;
    require_non_empty(&group.name, "urlGroup.name")?;
    require_duration_secs(group.timeout_secs, "urlGroup.timeoutSecs")?;
    require_duration_secs(group.request_timeout_secs, "urlGroup.requestTimeoutSecs")?;
    if group.request_timeout_secs >= group.timeout_secs {
        return Err(CoreError::ValidationError(format!(
            "urlGroup.requestTimeoutSecs: must be < timeoutSecs ({})",
            group.timeout_secs
        )));
    }

    for name in settings.services.keys() {
        require_non_empty(name, "services: service name")?;
    }

    debug!("Configuration validated successfully");
    Ok(())
}

/// Build the dependency group from the `services` map
///
/// Services without a health path are not probed. Services whose health URL
/// does not parse are left out of the group and listed in its data.
fn build_url_group(settings: &MonitorSettings) -> Option<UrlGroupProbe> {
    let mut endpoints = Vec::new();
    let mut rejected = Vec::new();
    for (name, service) in &settings.services {
        let Some(url) = service.health_url() else {
            debug!("Service '{}' has no health path, not probing it", name);
            continue;
        };
        match check_http_url(&url) {
            Ok(()) => endpoints.push(UrlEndpoint::new(name.clone(), url)),
            Err(reason) => {
                warn!("Skipping dependency '{}': {}", name, reason);
                rejected.push((name.clone(), reason));
            }
        }
    }

    if endpoints.is_empty() && rejected.is_empty() {
        return None;
    }
    let group = UrlGroupProbe::new(endpoints, settings.url_group.request_timeout());
    Some(
        rejected
            .into_iter()
            .fold(group, |group, (name, reason)| group.with_rejected(name, reason)),
    )
}

/// Register every configured probe
///
/// Registration order is the dependency API, the memory probe, the
/// infrastructure probes, then the dependency group.
pub fn build_registry(
    settings: &MonitorSettings,
    stats: Arc<dyn RuntimeStats>,
) -> Result<ProbeRegistry> {
    validate(settings)?;
    let mut registry = ProbeRegistry::new();

    if let Some(api) = &settings.dependency_api {
        // validate() guarantees the service exists
        let base = settings
            .services
            .get(&api.service)
            .map(|s| s.base.clone())
            .unwrap_or_default();
        let probe = HttpProbe::new(
            api.name.clone(),
            base,
            Expect::JsonFlag(api.status_field.clone()),
            api.timeout(),
        );
        registry.register(
            ProbeRegistration::new(api.name.clone(), probe)
                .with_tags(api.tags.clone())
                .with_failure_policy(api.failure_policy)
                .with_timeout(api.timeout()),
        )?;
    }

    let memory = &settings.memory;
    if memory.enabled {
        if memory.threshold_bytes.is_none() {
            warn!("Memory threshold is not configured; '{}' will report unhealthy", memory.name);
        }
        registry.register(
            ProbeRegistration::new(memory.name.clone(), MemoryProbe::new(memory.threshold_bytes, stats))
                .with_tags(memory.tags.clone())
                .with_failure_policy(memory.failure_policy)
                .with_timeout(memory.timeout()),
        )?;
    }

    for infra in &settings.infrastructure {
        let Some(probe) = TcpProbe::from_address(&infra.address, infra.timeout()) else {
            info!("No address configured for '{}', not registering it", infra.name);
            continue;
        };
        let tags = if infra.tags.is_empty() {
            vec![infra.kind.default_tag().to_string(), infra.name.clone()]
        } else {
            infra.tags.clone()
        };
        registry.register(
            ProbeRegistration::new(infra.name.clone(), probe)
                .with_tags(tags)
                .with_failure_policy(infra.failure_policy)
                .with_timeout(infra.timeout()),
        )?;
    }

    if let Some(group) = build_url_group(settings) {
        let group_settings = &settings.url_group;
        let tags = group.dependency_names();
        registry.register(
            ProbeRegistration::new(group_settings.name.clone(), group)
                .with_tags(tags)
                .with_failure_policy(group_settings.failure_policy)
                .with_timeout(group_settings.timeout()),
        )?;
    }

    info!(
        "Registered {} probes: {}",
        registry.len(),
        registry.names().join(", ")
    );
    Ok(registry)
}

/// Build a scheduler with its history store and shared state
pub fn build_scheduler(
    settings: &MonitorSettings,
    stats: Arc<dyn RuntimeStats>,
) -> Result<Scheduler> {
    let registry = build_registry(settings, stats)?;
    let history = HistoryStore::new(settings.history_capacity, settings.max_active_requests)?;
    let state = Arc::new(HealthState::new(settings.endpoint_name.clone(), history));
    Ok(Scheduler::new(
        registry,
        EvaluationRunner::new(settings.max_concurrency),
        state,
        settings.evaluation_interval(),
    ))
}
