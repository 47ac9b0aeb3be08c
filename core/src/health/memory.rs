//! Process memory pressure probing
//!
//! The memory probe never performs I/O beyond reading process statistics, so
//! it never returns an error: a missing threshold, unavailable statistics and
//! an exceeded threshold are all reported as unhealthy outcomes.

use async_trait::async_trait;
use std::sync::Arc;
use sysinfo::{Pid, System};
use tracing::debug;

use super::{HealthError, Probe, ProbeOutcome};

/// Point-in-time memory figures for the current process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuntimeSnapshot {
    /// Bytes currently allocated to the process (resident set)
    pub allocated_bytes: u64,
    /// Virtual address space reserved by the process
    pub virtual_bytes: u64,
}

/// Source of process memory statistics
///
/// Implemented by [`ProcessStats`] for the running process; tests substitute
/// fixed figures.
pub trait RuntimeStats: Send + Sync {
    /// Read the current figures, or `None` when the platform does not expose them
    fn snapshot(&self) -> Option<RuntimeSnapshot>;
}

/// Reads memory statistics of the current process through `sysinfo`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessStats;

impl ProcessStats {
    /// Create a new stats reader
    pub fn new() -> Self {
        Self
    }
}

impl RuntimeStats for ProcessStats {
    fn snapshot(&self) -> Option<RuntimeSnapshot> {
        let pid = Pid::from_u32(std::process::id());
        let mut sys = System::new();
        if !sys.refresh_process(pid) {
            return None;
        }
        sys.process(pid).map(|process| RuntimeSnapshot {
            allocated_bytes: process.memory(),
            virtual_bytes: process.virtual_memory(),
        })
    }
}

/// Health probe comparing process memory against a byte threshold
///
/// Healthy iff allocated bytes are strictly below the threshold. The
/// snapshot is attached as `allocatedBytes` / `virtualBytes` data together
/// with `thresholdBytes`.
#[derive(Clone)]
pub struct MemoryProbe {
    /// Threshold in bytes; `None` when the configuration could not be resolved
    threshold: Option<u64>,
    /// Statistics source
    stats: Arc<dyn RuntimeStats>,
}

impl std::fmt::Debug for MemoryProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryProbe")
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

impl MemoryProbe {
    /// Create a memory probe reading from the given statistics source
    pub fn new(threshold: Option<u64>, stats: Arc<dyn RuntimeStats>) -> Self {
        Self { threshold, stats }
    }

    /// Create a memory probe over the current process
    pub fn for_process(threshold: Option<u64>) -> Self {
        Self::new(threshold, Arc::new(ProcessStats::new()))
    }

    /// Configured threshold in bytes
    pub fn threshold(&self) -> Option<u64> {
        self.threshold
    }

    /// Evaluate a snapshot against the threshold
    fn evaluate(&self, snapshot: Option<RuntimeSnapshot>) -> ProbeOutcome {
        let Some(snapshot) = snapshot else {
            return ProbeOutcome::unhealthy("Process memory statistics are unavailable.");
        };

        let with_snapshot = |outcome: ProbeOutcome| {
            outcome
                .with_data("allocatedBytes", snapshot.allocated_bytes)
                .with_data("virtualBytes", snapshot.virtual_bytes)
        };

        let Some(threshold) = self.threshold else {
            return with_snapshot(ProbeOutcome::unhealthy(
                "Memory threshold could not be resolved.",
            ));
        };

        let description = format!(
            "Reports unhealthy status if allocated bytes >= {} bytes.",
            threshold
        );
        let outcome = if snapshot.allocated_bytes < threshold {
            ProbeOutcome::healthy(description)
        } else {
            ProbeOutcome::unhealthy(description)
        };
        with_snapshot(outcome).with_data("thresholdBytes", threshold)
    }
}

#[async_trait]
impl Probe for MemoryProbe {
    async fn check(&self) -> Result<ProbeOutcome, HealthError> {
        let stats = self.stats.clone();
        let snapshot = tokio::task::spawn_blocking(move || stats.snapshot())
            .await
            .unwrap_or_else(|e| {
                debug!("Memory statistics reader failed: {}", e);
                None
            });
        debug!("Memory probe snapshot: {:?}", snapshot);
        Ok(self.evaluate(snapshot))
    }
}
