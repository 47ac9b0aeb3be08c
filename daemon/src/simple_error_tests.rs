#[cfg(test)]
mod tests {
    use crate::{DaemonError, Result};
    use std::error::Error;
    use std::io;
    use vigil_core::CoreError;

    #[test]
    fn test_daemon_error_display() {
        let err = DaemonError::ConfigError("evaluationIntervalSecs: must be > 0".to_string());
        assert_eq!(err.to_string(), "Config error: evaluationIntervalSecs: must be > 0");

        let err = DaemonError::StartupError("scheduler did not start".to_string());
        assert_eq!(err.to_string(), "Startup error: scheduler did not start");

        let err = DaemonError::Core(CoreError::DuplicateProbe("Redis".to_string()));
        assert_eq!(err.to_string(), "Duplicate probe name: 'Redis' [CORE003]");

        let io_err = io::Error::new(io::ErrorKind::NotFound, "vigil.toml missing");
        let err = DaemonError::IoError(io_err);
        assert!(err.to_string().contains("vigil.toml missing"));

        let serde_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err = DaemonError::SerializationError(serde_err);
        assert!(err.to_string().contains("Serialization error"));
    }

    #[test]
    fn test_daemon_error_from_core() {
        let daemon_err: DaemonError =
            CoreError::ConfigurationError("unknown service 'X'".to_string()).into();
        match daemon_err {
            DaemonError::ConfigError(msg) => assert_eq!(msg, "unknown service 'X'"),
            other => panic!("Expected DaemonError::ConfigError, got {other:?}"),
        }

        let daemon_err: DaemonError = CoreError::ValidationError("bad".to_string()).into();
        assert!(matches!(
            daemon_err,
            DaemonError::Core(CoreError::ValidationError(_))
        ));
    }

    #[test]
    fn test_daemon_error_from_core_keeps_runtime_errors() {
        let daemon_err: DaemonError = CoreError::ReadLimitExceeded { limit: 2 }.into();
        match daemon_err {
            DaemonError::Core(err) => assert!(!err.is_fatal_at_startup()),
            other => panic!("Expected DaemonError::Core, got {other:?}"),
        }
    }

    #[test]
    fn test_daemon_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let daemon_err: DaemonError = io_err.into();
        assert!(matches!(daemon_err, DaemonError::IoError(_)));
    }

    #[test]
    fn test_daemon_error_from_serde_json() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let daemon_err: DaemonError = serde_err.into();
        assert!(matches!(daemon_err, DaemonError::SerializationError(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<u32> {
            Ok(42)
        }

        fn returns_err() -> Result<u32> {
            Err(DaemonError::StartupError("test failure".to_string()))
        }

        assert_eq!(returns_ok().unwrap(), 42);
        assert!(returns_err().is_err());
    }

    #[test]
    fn test_error_trait_implementation() {
        let err = DaemonError::ConfigError("test".to_string());
        let _: &dyn Error = &err;
        assert!(err.source().is_none());
    }
}
