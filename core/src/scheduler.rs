//! Periodic evaluation loop
//!
//! A single background task drives the [`EvaluationRunner`] on a fixed
//! interval and publishes each report into the shared [`HealthState`].
//! Cycles run inline in the loop, so two cycles never overlap; ticks missed
//! while a long cycle was running are skipped rather than replayed.

use schema::EvaluationReport;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::publisher::{HealthState, ReportPublisher};
use crate::registry::{ProbeRegistration, ProbeRegistry};
use crate::runner::EvaluationRunner;

/// How a scheduler shutdown ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// The loop exited on its own within the grace period
    Completed,
    /// The in-flight cycle outlived the grace period and was aborted
    Abandoned,
}

/// Owns the frozen probe set and evaluates it on an interval
pub struct Scheduler {
    probes: Arc<[Arc<ProbeRegistration>]>,
    runner: EvaluationRunner,
    state: Arc<HealthState>,
    interval: Duration,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("probes", &self.probes.len())
            .field("runner", &self.runner)
            .field("endpoint", &self.state.endpoint())
            .field("interval", &self.interval)
            .finish()
    }
}

impl Scheduler {
    /// Create a scheduler, freezing the registry
    pub fn new(
        registry: ProbeRegistry,
        runner: EvaluationRunner,
        state: Arc<HealthState>,
        interval: Duration,
    ) -> Self {
        Self {
            probes: registry.into_probes(),
            runner,
            state,
            interval,
        }
    }

    /// Read handle over the published state
    pub fn publisher(&self) -> ReportPublisher {
        ReportPublisher::new(self.state.clone())
    }

    /// Evaluation interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one evaluation and publish it
    pub async fn run_cycle(&self) -> Arc<EvaluationReport> {
        let report = self.runner.run_once(&self.probes).await;
        self.state.publish(report)
    }

    /// Start the background loop
    ///
    /// The first cycle runs immediately. Dropping the returned handle stops
    /// the loop after the in-flight cycle.
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let publisher = self.publisher();
        let task = tokio::spawn(self.run(shutdown_rx));
        SchedulerHandle {
            shutdown_tx,
            publisher,
            task,
        }
    }

    async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            "Starting health scheduler for '{}' ({} probes, every {:?})",
            self.state.endpoint(),
            self.probes.len(),
            self.interval
        );
        let mut tick = interval(self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    info!("Shutdown requested, stopping health scheduler");
                    break;
                }

                _ = tick.tick() => {
                    let started = Instant::now();
                    let report = self.run_cycle().await;
                    let elapsed = started.elapsed();
                    if elapsed > self.interval {
                        warn!(
                            "Evaluation #{} took {:?}, longer than the {:?} interval; missed ticks are skipped",
                            report.sequence, elapsed, self.interval
                        );
                    } else {
                        debug!("Evaluation #{} published in {:?}", report.sequence, elapsed);
                    }
                }
            }
        }
    }
}

/// Handle to a running [`Scheduler`]
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    publisher: ReportPublisher,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Read handle over the published state
    pub fn publisher(&self) -> ReportPublisher {
        self.publisher.clone()
    }

    /// Whether the loop has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the loop, letting an in-flight cycle finish within `grace`
    pub async fn shutdown(mut self, grace: Duration) -> ShutdownOutcome {
        // A send error only means the loop is already gone
        let _ = self.shutdown_tx.send(true);

        match timeout(grace, &mut self.task).await {
            Ok(Ok(())) => {
                info!("Health scheduler stopped");
                ShutdownOutcome::Completed
            }
            Ok(Err(e)) => {
                warn!("Health scheduler task ended abnormally: {}", e);
                ShutdownOutcome::Completed
            }
            Err(_elapsed) => {
                warn!(
                    "In-flight evaluation did not finish within {:?}, abandoning it",
                    grace
                );
                self.task.abort();
                ShutdownOutcome::Abandoned
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{HealthError, Probe, ProbeOutcome};
    use crate::history::HistoryStore;
    use async_trait::async_trait;
    use schema::HealthStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProbe {
        delay: Duration,
        calls: Arc<AtomicUsize>,
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl CountingProbe {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                calls: Arc::new(AtomicUsize::new(0)),
                in_flight: Arc::new(AtomicUsize::new(0)),
                peak: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl Probe for CountingProbe {
        async fn check(&self) -> Result<ProbeOutcome, HealthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(ProbeOutcome::healthy("counted"))
        }
    }

    fn scheduler(probe: CountingProbe, interval: Duration) -> Scheduler {
        let mut registry = ProbeRegistry::new();
        registry
            .register(ProbeRegistration::new("counter", probe).with_timeout(Duration::from_secs(30)))
            .unwrap();
        let state = Arc::new(HealthState::new(
            "Health API",
            HistoryStore::new(100, 1).unwrap(),
        ));
        Scheduler::new(registry, EvaluationRunner::unbounded(), state, interval)
    }

    #[tokio::test]
    async fn test_run_cycle_publishes() {
        let scheduler = scheduler(CountingProbe::new(Duration::ZERO), Duration::from_secs(60));
        let publisher = scheduler.publisher();
        assert!(publisher.latest().is_none());

        let report = scheduler.run_cycle().await;
        assert_eq!(report.overall_status, HealthStatus::Healthy);
        assert_eq!(publisher.latest().unwrap().sequence, report.sequence);
        assert_eq!(publisher.history("Health API").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_periodic_cycles_and_clean_shutdown() {
        let handle = scheduler(CountingProbe::new(Duration::ZERO), Duration::from_millis(40)).spawn();
        tokio::time::sleep(Duration::from_millis(190)).await;

        let publisher = handle.publisher();
        assert_eq!(handle.shutdown(Duration::from_secs(1)).await, ShutdownOutcome::Completed);

        let history = publisher.history("Health API").await.unwrap();
        assert!(history.len() >= 3, "only {} cycles ran", history.len());
        let sequences: Vec<u64> = history.iter().map(|r| r.sequence).collect();
        let expected: Vec<u64> = (1..=history.len() as u64).collect();
        assert_eq!(sequences, expected);
    }

    #[tokio::test]
    async fn test_slow_cycles_never_overlap_and_skip_ticks() {
        let probe = CountingProbe::new(Duration::from_millis(120));
        let (calls, peak) = (probe.calls.clone(), probe.peak.clone());
        let handle = scheduler(probe, Duration::from_millis(30)).spawn();

        tokio::time::sleep(Duration::from_millis(400)).await;
        handle.shutdown(Duration::from_secs(1)).await;

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        // 400ms of 120ms cycles leaves room for at most four starts
        let calls = calls.load(Ordering::SeqCst);
        assert!((2..=4).contains(&calls), "unexpected cycle count {}", calls);
    }

    #[tokio::test]
    async fn test_shutdown_abandons_cycle_past_grace() {
        let handle = scheduler(CountingProbe::new(Duration::from_secs(10)), Duration::from_millis(10)).spawn();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let start = std::time::Instant::now();
        let outcome = handle.shutdown(Duration::from_millis(100)).await;
        assert_eq!(outcome, ShutdownOutcome::Abandoned);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_shutdown_while_idle_is_prompt() {
        let handle = scheduler(CountingProbe::new(Duration::ZERO), Duration::from_secs(3600)).spawn();
        let publisher = handle.publisher();

        // Wait for the immediate first cycle
        for _ in 0..50 {
            if publisher.latest().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(publisher.latest().is_some());

        let start = std::time::Instant::now();
        assert_eq!(handle.shutdown(Duration::from_secs(5)).await, ShutdownOutcome::Completed);
        assert!(start.elapsed() < Duration::from_millis(500));
    }
}
