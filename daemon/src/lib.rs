//! Daemon library for the Vigil health engine

pub mod bootstrap;
pub mod simple_error;

#[cfg(test)]
mod simple_error_tests;

pub use bootstrap::{bootstrap, bootstrap_with, evaluate_once, load_settings, BootstrapHandle};
pub use simple_error::{DaemonError, Result};

use schema::EvaluationReport;
use serde_json::json;
use vigil_core::ReportPublisher;

/// JSON body a health endpoint would serve for `report`
///
/// Carries the HTTP status next to the report so callers relaying it do not
/// have to re-derive it.
pub fn report_body(report: &EvaluationReport) -> Result<String> {
    let body = json!({
        "httpStatus": ReportPublisher::http_status(report.overall_status),
        "report": report,
    });
    Ok(serde_json::to_string_pretty(&body)?)
}

/// JSON body for the latest published report, if any
pub fn latest_body(publisher: &ReportPublisher) -> Result<Option<String>> {
    publisher
        .latest()
        .map(|report| report_body(&report))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema::HealthStatus;
    use std::time::Duration;

    fn report(status: HealthStatus) -> EvaluationReport {
        EvaluationReport {
            sequence: 7,
            timestamp: "2026-10-19T08:00:00.000Z".to_string(),
            overall_status: status,
            results: Vec::new(),
            total_duration: Duration::from_millis(12),
        }
    }

    #[test]
    fn test_report_body() {
        let body = report_body(&report(HealthStatus::Unhealthy)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["httpStatus"], 503);
        assert_eq!(value["report"]["overallStatus"], "unhealthy");
        assert_eq!(value["report"]["sequence"], 7);
        assert_eq!(value["report"]["totalDurationMs"], 12);

        let body = report_body(&report(HealthStatus::Degraded)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["httpStatus"], 200);
    }
}
