//! Health checking and probing functionality
//!
//! This module provides the probe primitives the evaluation runner executes:
//! process memory pressure, HTTP dependency checks and TCP reachability of
//! infrastructure (databases, message queues, caches).
//!
//! ## Types
//!
//! - [`Probe`]: The trait every health check implements
//! - [`ProbeOutcome`]: Status, description and data produced by a check
//! - [`MemoryProbe`]: Process memory against a byte threshold
//! - [`HttpProbe`]: One GET against a dependency, optionally checking a JSON flag
//! - [`UrlGroupProbe`]: Concurrent GETs against a set of named dependencies
//! - [`TcpProbe`]: TCP connection-based reachability
//! - [`HealthError`]: Error types for health check failures

pub mod error;
pub mod http;
pub mod memory;
pub mod tcp;
pub mod types;
pub mod url_group;

pub use error::HealthError;
pub use http::HttpProbe;
pub use memory::{MemoryProbe, ProcessStats, RuntimeSnapshot, RuntimeStats};
pub use tcp::TcpProbe;
pub use types::{Expect, Probe, ProbeOutcome};
pub use url_group::{UrlEndpoint, UrlGroupProbe};
