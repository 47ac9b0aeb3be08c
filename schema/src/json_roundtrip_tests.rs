//! JSON round-trip tests for schema types
//!
//! These tests pin the wire shape consumed by HTTP adapters and dashboards
//! and check that reports survive serialization unchanged.

use crate::report::*;
use crate::settings::*;
use std::collections::BTreeMap;
use std::time::Duration;

#[cfg(test)]
mod tests {
    use super::*;

    fn test_json_roundtrip<T>(original: &T)
    where
        T: serde::Serialize + serde::de::DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let json = serde_json::to_string(original).expect("Failed to serialize to JSON");
        let deserialized: T = serde_json::from_str(&json).expect("Failed to deserialize from JSON");
        assert_eq!(*original, deserialized, "Round-trip failed for JSON: {}", json);
    }

    fn sample_report() -> EvaluationReport {
        let mut memory_data = BTreeMap::new();
        memory_data.insert("allocatedBytes".to_string(), DataValue::Unsigned(524_288_000));
        memory_data.insert(
            "thresholdBytes".to_string(),
            DataValue::Unsigned(DEFAULT_MEMORY_THRESHOLD_BYTES),
        );

        let mut group_data = BTreeMap::new();
        group_data.insert("CatApi".to_string(), DataValue::Text("healthy".to_string()));
        group_data.insert("FakerApi".to_string(), DataValue::Text("timeout".to_string()));

        EvaluationReport {
            sequence: 7,
            timestamp: "2026-10-19T08:00:00.000Z".to_string(),
            overall_status: HealthStatus::Unhealthy,
            results: vec![
                ProbeResult {
                    probe_name: "API Memory Check".to_string(),
                    tags: vec!["Service".to_string()],
                    status: HealthStatus::Healthy,
                    description: "Reports unhealthy status if allocated bytes >= 1073741824 bytes."
                        .to_string(),
                    data: memory_data,
                    duration: Duration::from_millis(2),
                    error: None,
                },
                ProbeResult {
                    probe_name: "Dependent Http Clients".to_string(),
                    tags: vec!["CatApi".to_string(), "FakerApi".to_string()],
                    status: HealthStatus::Unhealthy,
                    description: "Unhealthy dependencies: FakerApi".to_string(),
                    data: group_data,
                    duration: Duration::from_millis(250),
                    error: None,
                },
            ],
            total_duration: Duration::from_millis(251),
        }
    }

    #[test]
    fn test_evaluation_report_json_roundtrip() {
        test_json_roundtrip(&sample_report());
    }

    #[test]
    fn test_history_entry_json_roundtrip() {
        let entry = HistoryEntry {
            endpoint_name: "Health API".to_string(),
            report: sample_report(),
        };
        test_json_roundtrip(&entry);
    }

    #[test]
    fn test_report_wire_shape() {
        let json = serde_json::to_value(sample_report()).unwrap();
        assert_eq!(json["overallStatus"], "unhealthy");
        assert_eq!(json["totalDurationMs"], 251);
        assert_eq!(json["results"][0]["probeName"], "API Memory Check");
        assert_eq!(json["results"][0]["durationMs"], 2);
        assert_eq!(json["results"][0]["data"]["allocatedBytes"], 524_288_000_u64);
        assert!(json["results"][0].get("error").is_none());
        assert_eq!(json["results"][1]["data"]["FakerApi"], "timeout");
    }

    #[test]
    fn test_probe_result_with_error_roundtrip() {
        let result = ProbeResult {
            probe_name: "Redis".to_string(),
            tags: vec!["Caching".to_string(), "Redis".to_string()],
            status: HealthStatus::Unhealthy,
            description: "timed out after 10s".to_string(),
            data: BTreeMap::new(),
            duration: Duration::from_secs(10),
            error: Some("timeout".to_string()),
        };
        test_json_roundtrip(&result);
    }

    #[test]
    fn test_enum_serialization() {
        assert_eq!(serde_json::to_string(&HealthStatus::Degraded).unwrap(), "\"degraded\"");
        assert_eq!(serde_json::to_string(&FailurePolicy::Unhealthy).unwrap(), "\"unhealthy\"");
        assert_eq!(
            serde_json::to_string(&InfrastructureKind::MessageQueue).unwrap(),
            "\"messageQueue\""
        );
        test_json_roundtrip(&HealthStatus::Unhealthy);
        test_json_roundtrip(&FailurePolicy::Degraded);
    }

    #[test]
    fn test_monitor_settings_json_roundtrip() {
        let mut services = BTreeMap::new();
        services.insert(
            "CatApi".to_string(),
            ServiceEndpoint {
                base: "http://cats.local".to_string(),
                health: Some("/health".to_string()),
            },
        );
        services.insert(
            "FootballStandingsApi".to_string(),
            ServiceEndpoint {
                base: "http://football.local/standings".to_string(),
                health: None,
            },
        );

        let settings = MonitorSettings {
            max_concurrency: Some(4),
            dependency_api: Some(DependencyApiSettings {
                name: "Football Standings API Health Check".to_string(),
                service: "FootballStandingsApi".to_string(),
                status_field: "status".to_string(),
                timeout_secs: 10,
                tags: vec![],
                failure_policy: FailurePolicy::Unhealthy,
            }),
            infrastructure: vec![InfrastructureSettings {
                name: "MongoDB".to_string(),
                kind: InfrastructureKind::Database,
                address: "127.0.0.1:27017".to_string(),
                timeout_secs: 10,
                tags: vec!["Database".to_string(), "MongoDB".to_string()],
                failure_policy: FailurePolicy::Degraded,
            }],
            services,
            ..MonitorSettings::default()
        };

        test_json_roundtrip(&settings);
    }

    #[test]
    fn test_minimal_settings_use_defaults() {
        let settings: MonitorSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, MonitorSettings::default());
    }
}
