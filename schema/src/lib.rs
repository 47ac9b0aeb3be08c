//! Schema definitions for Vigil
//!
//! This crate contains the data structures shared by the health engine and
//! its consumers: evaluation reports, per-probe results and the settings
//! file. All types implement JSON Schema generation for external consumption
//! (dashboards, HTTP adapters).

pub mod report;
pub mod settings;

#[cfg(test)]
mod json_roundtrip_tests;

pub use report::*;
pub use settings::*;

/// Serde adapter storing a `Duration` as whole milliseconds
pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Serialize a duration as milliseconds
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    /// Deserialize a duration from milliseconds
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
