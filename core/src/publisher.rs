//! Read side of the engine
//!
//! The scheduler is the only writer of [`HealthState`]; any number of
//! [`ReportPublisher`] clones read from it concurrently without blocking it.

use arc_swap::ArcSwapOption;
use schema::{EvaluationReport, HealthStatus, HistoryEntry};
use std::sync::Arc;

use crate::history::HistoryStore;
use crate::Result;

/// HTTP status for an operational aggregate
pub const STATUS_OK: u16 = 200;
/// HTTP status for an unhealthy aggregate or a missing report
pub const STATUS_UNAVAILABLE: u16 = 503;

/// Latest report plus history for one logical endpoint
#[derive(Debug)]
pub struct HealthState {
    endpoint: String,
    latest: ArcSwapOption<EvaluationReport>,
    history: HistoryStore,
}

impl HealthState {
    /// Create an empty state for `endpoint`
    pub fn new(endpoint: impl Into<String>, history: HistoryStore) -> Self {
        Self {
            endpoint: endpoint.into(),
            latest: ArcSwapOption::empty(),
            history,
        }
    }

    /// Endpoint the reports are published under
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Underlying history store
    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Make `report` the latest one and append it to the history
    pub fn publish(&self, report: EvaluationReport) -> Arc<EvaluationReport> {
        let report = Arc::new(report);
        self.latest.store(Some(report.clone()));
        self.history.append(&self.endpoint, report.clone());
        report
    }
}

/// Cloneable read handle over a [`HealthState`]
#[derive(Debug, Clone)]
pub struct ReportPublisher {
    state: Arc<HealthState>,
}

impl ReportPublisher {
    /// Create a read handle over `state`
    pub fn new(state: Arc<HealthState>) -> Self {
        Self { state }
    }

    /// Endpoint the reports are published under
    pub fn endpoint(&self) -> &str {
        self.state.endpoint()
    }

    /// Most recent complete report; `None` until the first cycle finishes
    pub fn latest(&self) -> Option<Arc<EvaluationReport>> {
        self.state.latest.load_full()
    }

    /// History of an endpoint, oldest first; waits for a read permit
    pub async fn history(&self, endpoint: &str) -> Result<Vec<Arc<EvaluationReport>>> {
        self.state.history.list_history(endpoint).await
    }

    /// History of an endpoint, rejecting when the read limit is reached
    pub fn try_history(&self, endpoint: &str) -> Result<Vec<Arc<EvaluationReport>>> {
        self.state.history.try_list_history(endpoint)
    }

    /// History of an endpoint as serializable entries
    pub async fn entries(&self, endpoint: &str) -> Result<Vec<HistoryEntry>> {
        let reports = self.history(endpoint).await?;
        Ok(reports
            .iter()
            .map(|report| HistoryEntry {
                endpoint_name: endpoint.to_string(),
                report: EvaluationReport::clone(report),
            })
            .collect())
    }

    /// HTTP status code for an aggregate status
    pub fn http_status(status: HealthStatus) -> u16 {
        if status.is_operational() {
            STATUS_OK
        } else {
            STATUS_UNAVAILABLE
        }
    }

    /// HTTP status code for the latest report
    pub fn latest_http_status(&self) -> u16 {
        self.latest()
            .map_or(STATUS_UNAVAILABLE, |r| Self::http_status(r.overall_status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn mk_report(sequence: u64, overall_status: HealthStatus) -> EvaluationReport {
        EvaluationReport {
            sequence,
            timestamp: EvaluationReport::current_timestamp(),
            overall_status,
            results: Vec::new(),
            total_duration: Duration::from_millis(1),
        }
    }

    fn publisher() -> (Arc<HealthState>, ReportPublisher) {
        let state = Arc::new(HealthState::new(
            "Health API",
            HistoryStore::new(3, 2).unwrap(),
        ));
        (state.clone(), ReportPublisher::new(state))
    }

    #[test]
    fn test_latest_is_none_before_first_publish() {
        let (_state, publisher) = publisher();
        assert!(publisher.latest().is_none());
        assert_eq!(publisher.latest_http_status(), STATUS_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_publish_updates_latest_and_history() {
        let (state, publisher) = publisher();
        state.publish(mk_report(1, HealthStatus::Healthy));
        state.publish(mk_report(2, HealthStatus::Degraded));

        let latest = publisher.latest().unwrap();
        assert_eq!(latest.sequence, 2);
        assert_eq!(publisher.latest_http_status(), STATUS_OK);

        let entries = publisher.entries("Health API").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].endpoint_name, "Health API");
        assert_eq!(entries[0].report.sequence, 1);
        assert_eq!(entries[1].report.overall_status, HealthStatus::Degraded);

        state.publish(mk_report(3, HealthStatus::Unhealthy));
        assert_eq!(publisher.latest_http_status(), STATUS_UNAVAILABLE);
        assert_eq!(publisher.try_history("Health API").unwrap().len(), 3);
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(ReportPublisher::http_status(HealthStatus::Healthy), 200);
        assert_eq!(ReportPublisher::http_status(HealthStatus::Degraded), 200);
        assert_eq!(ReportPublisher::http_status(HealthStatus::Unhealthy), 503);
    }

    #[test]
    fn test_latest_snapshot_survives_newer_publish() {
        let (state, publisher) = publisher();
        state.publish(mk_report(1, HealthStatus::Healthy));
        let held = publisher.latest().unwrap();
        state.publish(mk_report(2, HealthStatus::Unhealthy));

        assert_eq!(held.sequence, 1);
        assert_eq!(held.overall_status, HealthStatus::Healthy);
        assert_eq!(publisher.latest().unwrap().sequence, 2);
    }
}
