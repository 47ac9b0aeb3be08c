//! Evaluation runner
//!
//! Executes every registered probe once, concurrently, and folds the results
//! into one [`EvaluationReport`].
//!
//! ## Isolation
//!
//! Each probe runs in its own task and is time-boxed by its own deadline.
//! Errors, panics and deadline expiry are all converted into an `Unhealthy`
//! [`ProbeResult`] for that probe only; the report is always produced.

use futures::FutureExt;
use schema::{EvaluationReport, FailurePolicy, HealthStatus, ProbeResult};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::health::{HealthError, ProbeOutcome};
use crate::registry::ProbeRegistration;

/// Runs evaluation cycles over a set of registered probes
#[derive(Debug, Default)]
pub struct EvaluationRunner {
    /// Maximum number of probes in flight at once; `None` is unbounded
    max_concurrency: Option<usize>,
    /// Last sequence number handed out
    sequence: AtomicU64,
}

impl EvaluationRunner {
    /// Create a runner with an optional concurrency cap
    ///
    /// A cap of zero is treated as one.
    pub fn new(max_concurrency: Option<usize>) -> Self {
        Self {
            max_concurrency: max_concurrency.map(|n| n.max(1)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Create a runner without a concurrency cap
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Configured concurrency cap
    pub fn max_concurrency(&self) -> Option<usize> {
        self.max_concurrency
    }

    /// Run every probe once and aggregate the results
    ///
    /// Results are returned in the order of `probes`, whatever order the
    /// probes complete in.
    pub async fn run_once(&self, probes: &[Arc<ProbeRegistration>]) -> EvaluationReport {
        let started = Instant::now();
        let limiter = self.max_concurrency.map(|n| Arc::new(Semaphore::new(n)));

        let mut tasks = JoinSet::new();
        for (index, registration) in probes.iter().enumerate() {
            let registration = registration.clone();
            let limiter = limiter.clone();
            tasks.spawn(async move {
                let _permit = match limiter {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                let deadline = deadline_after(registration.timeout());
                (index, execute(&registration, deadline).await)
            });
        }

        let mut slots: Vec<Option<ProbeResult>> = vec![None; probes.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => warn!("Probe task ended abnormally: {}", e),
            }
        }

        let results: Vec<ProbeResult> = slots
            .into_iter()
            .zip(probes)
            .map(|(slot, registration)| {
                slot.unwrap_or_else(|| {
                    fault_result(
                        registration,
                        Duration::ZERO,
                        &HealthError::Fault("probe task was aborted".to_string()),
                    )
                })
            })
            .collect();

        let overall_status = aggregate(
            results
                .iter()
                .zip(probes)
                .map(|(result, registration)| (result.status, registration.failure_policy())),
        );

        let report = EvaluationReport {
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst) + 1,
            timestamp: EvaluationReport::current_timestamp(),
            overall_status,
            results,
            total_duration: started.elapsed(),
        };

        for failed in report.failed_results() {
            warn!(
                "Probe '{}' reported {}: {}",
                failed.probe_name,
                failed.status,
                failed.error.as_deref().unwrap_or(&failed.description)
            );
        }
        debug!(
            "Evaluation #{} completed: {} ({} probes, {:?})",
            report.sequence,
            report.overall_status,
            report.results.len(),
            report.total_duration
        );
        report
    }
}

/// Fold per-probe statuses into the aggregate status
///
/// Each status is first mapped through its probe's failure policy; the most
/// severe mapped status wins. No input is `Healthy`.
pub fn aggregate<I>(statuses: I) -> HealthStatus
where
    I: IntoIterator<Item = (HealthStatus, FailurePolicy)>,
{
    statuses
        .into_iter()
        .fold(HealthStatus::Healthy, |acc, (status, policy)| {
            acc.worst(policy.apply(status))
        })
}

/// Far-future fallback when a timeout does not fit into an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Deadline `timeout` from now, saturating instead of overflowing
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Execute one registered probe, returning no later than `deadline`
pub async fn execute(registration: &ProbeRegistration, deadline: Instant) -> ProbeResult {
    let started = Instant::now();
    let check = AssertUnwindSafe(registration.probe().check()).catch_unwind();
    let outcome = timeout_at(deadline, check).await;
    let duration = started.elapsed();

    match outcome {
        Ok(Ok(Ok(outcome))) => outcome_result(registration, duration, outcome),
        Ok(Ok(Err(health_error))) => fault_result(registration, duration, &health_error),
        Ok(Err(panic)) => fault_result(
            registration,
            duration,
            &HealthError::Fault(panic_message(panic.as_ref())),
        ),
        Err(_elapsed) => fault_result(
            registration,
            duration,
            &HealthError::Timeout(registration.timeout()),
        ),
    }
}

fn outcome_result(
    registration: &ProbeRegistration,
    duration: Duration,
    outcome: ProbeOutcome,
) -> ProbeResult {
    ProbeResult {
        probe_name: registration.name().to_string(),
        tags: registration.tags().to_vec(),
        status: outcome.status,
        description: outcome.description,
        data: outcome.data,
        duration,
        error: None,
    }
}

fn fault_result(
    registration: &ProbeRegistration,
    duration: Duration,
    error: &HealthError,
) -> ProbeResult {
    let description = match error {
        HealthError::Timeout(limit) => format!("Probe timed out after {:?}.", limit),
        other => format!("Probe failed: {}", other),
    };
    ProbeResult {
        probe_name: registration.name().to_string(),
        tags: registration.tags().to_vec(),
        status: HealthStatus::Unhealthy,
        description,
        data: Default::default(),
        duration,
        error: Some(error.to_string()),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "probe panicked".to_string()
    }
}
