//! Report history: bounded per-endpoint rings with eviction counters
//!
//! - Each endpoint keeps at most `capacity` reports; appending to a full ring
//!   evicts the oldest report and increments `total_evicted`.
//! - Rings live behind an [`ArcSwap`] and are replaced copy-on-write, so a
//!   reader's snapshot is never observed half-evicted and no lock is held
//!   while the scheduler publishes.
//! - Reads are admitted through a semaphore of `max_active_requests` permits.

use arc_swap::ArcSwap;
use schema::EvaluationReport;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::{CoreError, Result};

/// Bounded FIFO of reports for one endpoint
#[derive(Debug, Clone)]
pub struct HistoryRing {
    capacity: usize,
    total_evicted: u64,
    reports: VecDeque<Arc<EvaluationReport>>,
}

impl HistoryRing {
    /// Create an empty ring; a zero capacity is treated as one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            total_evicted: 0,
            reports: VecDeque::with_capacity(capacity),
        }
    }

    /// Push a report, evicting the oldest one when full
    pub fn push(&mut self, report: Arc<EvaluationReport>) {
        if self.reports.len() == self.capacity {
            self.reports.pop_front();
            self.total_evicted = self.total_evicted.saturating_add(1);
        }
        self.reports.push_back(report);
    }

    /// Number of retained reports
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    /// Whether the ring is empty
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Maximum number of retained reports
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Reports dropped because of capacity
    pub fn total_evicted(&self) -> u64 {
        self.total_evicted
    }

    /// Retained reports, oldest first
    pub fn snapshot(&self) -> Vec<Arc<EvaluationReport>> {
        self.reports.iter().cloned().collect()
    }
}

type Rings = HashMap<String, Arc<HistoryRing>>;

/// Per-endpoint report history with bounded concurrent readers
#[derive(Debug)]
pub struct HistoryStore {
    capacity: usize,
    max_active_requests: usize,
    rings: ArcSwap<Rings>,
    read_permits: Semaphore,
}

impl HistoryStore {
    /// Create an empty store
    ///
    /// # Errors
    /// Returns `ValidationError` when either limit is zero.
    pub fn new(capacity: usize, max_active_requests: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(CoreError::ValidationError(
                "history capacity must be > 0".to_string(),
            ));
        }
        if max_active_requests == 0 {
            return Err(CoreError::ValidationError(
                "max active history requests must be > 0".to_string(),
            ));
        }
        Ok(Self {
            capacity,
            max_active_requests,
            rings: ArcSwap::from_pointee(Rings::new()),
            read_permits: Semaphore::new(max_active_requests),
        })
    }

    /// Per-endpoint capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Maximum number of concurrent readers
    pub fn max_active_requests(&self) -> usize {
        self.max_active_requests
    }

    /// Append a report to an endpoint's history
    pub fn append(&self, endpoint: &str, report: Arc<EvaluationReport>) {
        let capacity = self.capacity;
        self.rings.rcu(|current| {
            let mut next = Rings::clone(current);
            let ring = next
                .entry(endpoint.to_string())
                .or_insert_with(|| Arc::new(HistoryRing::new(capacity)));
            Arc::make_mut(ring).push(report.clone());
            next
        });
        debug!(
            "Appended report #{} to history of '{}'",
            report.sequence, endpoint
        );
    }

    /// Reports for an endpoint, oldest first, waiting for a read permit
    ///
    /// An unknown endpoint has an empty history.
    pub async fn list_history(&self, endpoint: &str) -> Result<Vec<Arc<EvaluationReport>>> {
        let _permit = self
            .read_permits
            .acquire()
            .await
            .map_err(|e| CoreError::Other(format!("history read permits closed: {}", e)))?;
        Ok(self.snapshot(endpoint))
    }

    /// Like [`list_history`](Self::list_history) but fails instead of waiting
    ///
    /// # Errors
    /// Returns `ReadLimitExceeded` when every read permit is taken.
    pub fn try_list_history(&self, endpoint: &str) -> Result<Vec<Arc<EvaluationReport>>> {
        let _permit = self
            .read_permits
            .try_acquire()
            .map_err(|_| CoreError::ReadLimitExceeded {
                limit: self.max_active_requests,
            })?;
        Ok(self.snapshot(endpoint))
    }

    /// Endpoints with at least one report, sorted
    pub fn endpoints(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rings.load().keys().cloned().collect();
        names.sort();
        names
    }

    /// Reports evicted from an endpoint's history so far
    pub fn total_evicted(&self, endpoint: &str) -> u64 {
        self.rings
            .load()
            .get(endpoint)
            .map_or(0, |ring| ring.total_evicted())
    }

    fn snapshot(&self, endpoint: &str) -> Vec<Arc<EvaluationReport>> {
        self.rings
            .load()
            .get(endpoint)
            .map(|ring| ring.snapshot())
            .unwrap_or_default()
    }
}
