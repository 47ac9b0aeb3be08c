//! Probe registry
//!
//! Probes are registered once at startup, each under a unique non-empty
//! name with its tags, failure policy and timeout. The registry is consumed
//! by [`Scheduler::new`](crate::scheduler::Scheduler::new), so registration
//! and evaluation can never overlap.

use schema::FailurePolicy;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::health::Probe;
use crate::{CoreError, Result};

/// Timeout applied when a registration does not set one
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// A probe together with its registration metadata
#[derive(Clone)]
pub struct ProbeRegistration {
    name: String,
    tags: Vec<String>,
    failure_policy: FailurePolicy,
    timeout: Duration,
    probe: Arc<dyn Probe>,
}

impl std::fmt::Debug for ProbeRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeRegistration")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .field("failure_policy", &self.failure_policy)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ProbeRegistration {
    /// Create a registration with default policy (`Unhealthy`) and timeout
    pub fn new(name: impl Into<String>, probe: impl Probe + 'static) -> Self {
        Self::from_arc(name, Arc::new(probe))
    }

    /// Create a registration around an already shared probe
    pub fn from_arc(name: impl Into<String>, probe: Arc<dyn Probe>) -> Self {
        Self {
            name: name.into(),
            tags: Vec::new(),
            failure_policy: FailurePolicy::default(),
            timeout: DEFAULT_PROBE_TIMEOUT,
            probe,
        }
    }

    /// Set the tags
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the failure policy
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Registered name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered tags
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Failure policy
    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Per-probe timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The probe itself
    pub fn probe(&self) -> &Arc<dyn Probe> {
        &self.probe
    }
}

/// Ordered set of uniquely named probe registrations
#[derive(Debug, Default)]
pub struct ProbeRegistry {
    probes: Vec<Arc<ProbeRegistration>>,
    names: HashSet<String>,
}

impl ProbeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a probe
    ///
    /// # Errors
    /// Returns `ValidationError` for an empty name or zero timeout, and
    /// `DuplicateProbe` when the name is already registered.
    pub fn register(&mut self, registration: ProbeRegistration) -> Result<()> {
        if registration.name.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "probe name cannot be empty".to_string(),
            ));
        }
        if registration.timeout.is_zero() {
            return Err(CoreError::ValidationError(format!(
                "probe '{}': timeout must be > 0",
                registration.name
            )));
        }
        if !self.names.insert(registration.name.clone()) {
            return Err(CoreError::DuplicateProbe(registration.name));
        }

        debug!(
            "Registered probe '{}' (policy: {:?}, timeout: {:?}, tags: {:?})",
            registration.name, registration.failure_policy, registration.timeout, registration.tags
        );
        self.probes.push(Arc::new(registration));
        Ok(())
    }

    /// Registered probes in registration order
    pub fn list_probes(&self) -> &[Arc<ProbeRegistration>] {
        &self.probes
    }

    /// Registered names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.probes.iter().map(|p| p.name.as_str()).collect()
    }

    /// Whether a probe with this name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Number of registered probes
    pub fn len(&self) -> usize {
        self.probes.len()
    }

    /// Whether no probe is registered
    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// Freeze the registry into a shared, read-only probe list
    pub fn into_probes(self) -> Arc<[Arc<ProbeRegistration>]> {
        self.probes.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{HealthError, ProbeOutcome};
    use async_trait::async_trait;

    struct AlwaysHealthy;

    #[async_trait]
    impl Probe for AlwaysHealthy {
        async fn check(&self) -> std::result::Result<ProbeOutcome, HealthError> {
            Ok(ProbeOutcome::healthy("ok"))
        }
    }

    #[test]
    fn test_register_preserves_order() {
        let mut registry = ProbeRegistry::new();
        for name in ["memory", "mongo", "redis", "rabbit"] {
            registry
                .register(ProbeRegistration::new(name, AlwaysHealthy))
                .unwrap();
        }

        assert_eq!(registry.names(), vec!["memory", "mongo", "redis", "rabbit"]);
        assert_eq!(registry.len(), 4);
        assert!(registry.contains("redis"));
        assert!(!registry.contains("postgres"));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = ProbeRegistry::new();
        registry
            .register(ProbeRegistration::new("redis", AlwaysHealthy))
            .unwrap();

        match registry.register(ProbeRegistration::new("redis", AlwaysHealthy)) {
            Err(CoreError::DuplicateProbe(name)) => assert_eq!(name, "redis"),
            other => panic!("Expected DuplicateProbe, got {other:?}"),
        }
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_empty_name_and_zero_timeout_rejected() {
        let mut registry = ProbeRegistry::new();
        assert!(matches!(
            registry.register(ProbeRegistration::new("  ", AlwaysHealthy)),
            Err(CoreError::ValidationError(_))
        ));
        assert!(matches!(
            registry.register(
                ProbeRegistration::new("redis", AlwaysHealthy).with_timeout(Duration::ZERO)
            ),
            Err(CoreError::ValidationError(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registration_builder() {
        let reg = ProbeRegistration::new("MongoDB", AlwaysHealthy)
            .with_tags(["Database", "MongoDB"])
            .with_failure_policy(FailurePolicy::Degraded)
            .with_timeout(Duration::from_secs(10));

        assert_eq!(reg.name(), "MongoDB");
        assert_eq!(reg.tags(), ["Database".to_string(), "MongoDB".to_string()]);
        assert_eq!(reg.failure_policy(), FailurePolicy::Degraded);
        assert_eq!(reg.timeout(), Duration::from_secs(10));

        let defaults = ProbeRegistration::new("x", AlwaysHealthy);
        assert_eq!(defaults.failure_policy(), FailurePolicy::Unhealthy);
        assert_eq!(defaults.timeout(), DEFAULT_PROBE_TIMEOUT);
    }

    #[test]
    fn test_into_probes() {
        let mut registry = ProbeRegistry::new();
        registry
            .register(ProbeRegistration::new("a", AlwaysHealthy))
            .unwrap();
        registry
            .register(ProbeRegistration::new("b", AlwaysHealthy))
            .unwrap();

        let probes = registry.into_probes();
        let names: Vec<_> = probes.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
