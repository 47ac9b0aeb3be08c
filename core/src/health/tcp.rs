//! TCP reachability probing for infrastructure dependencies
//!
//! Databases, message queues and caches are probed by connecting to their
//! listening socket. Protocol-level pings belong to the respective wire
//! clients and are not performed here.

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use super::{HealthError, Probe, ProbeOutcome};

/// Reachability probe for a database, broker or cache socket
///
/// Healthy when a connection to `host:port` is accepted before the timeout.
/// The stream is dropped right away; nothing is written to it.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    host: String,
    port: u16,
    /// Bound on connection establishment
    timeout: Duration,
}

impl TcpProbe {
    /// Probe `host:port`, giving up after `timeout`
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    /// Parse a `host:port` or `[ipv6]:port` address
    ///
    /// Returns `None` for a missing host, a missing port or port 0.
    pub fn from_address(address: &str, timeout: Duration) -> Option<Self> {
        let (host, port) = address.trim().rsplit_once(':')?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return None;
        }
        let port = port.parse::<u16>().ok().filter(|p| *p != 0)?;
        Some(Self::new(host, port, timeout))
    }

    /// Connect address, with IPv6 hosts bracketed
    #[must_use]
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

#[async_trait]
impl Probe for TcpProbe {
    async fn check(&self) -> Result<ProbeOutcome, HealthError> {
        let address = self.address();
        debug!("Connecting to {}", address);

        match timeout(self.timeout, TcpStream::connect(&address)).await {
            Ok(Ok(_stream)) => {
                debug!("{} is reachable", address);
                Ok(
                    ProbeOutcome::healthy(format!("{} accepted a connection.", address))
                        .with_data("address", address),
                )
            }
            Ok(Err(io_error)) => {
                debug!("{} refused or failed: {}", address, io_error);
                Err(HealthError::Tcp(io_error))
            }
            Err(_elapsed) => {
                debug!("No answer from {} within {:?}", address, self.timeout);
                Err(HealthError::Timeout(self.timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema::{DataValue, HealthStatus};
    use tokio::net::TcpListener;

    async fn listening_socket() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    #[tokio::test]
    async fn test_listening_port_is_healthy() {
        let (listener, port) = listening_socket().await;
        tokio::spawn(async move { while listener.accept().await.is_ok() {} });

        let address = format!("127.0.0.1:{}", port);
        let outcome = TcpProbe::from_address(&address, Duration::from_secs(1))
            .unwrap()
            .check()
            .await
            .unwrap();
        assert_eq!(outcome.status, HealthStatus::Healthy);
        assert_eq!(outcome.description, format!("{} accepted a connection.", address));
        assert_eq!(outcome.data["address"], DataValue::Text(address));
    }

    #[tokio::test]
    async fn test_closed_port_is_an_error() {
        // Bind then drop to get a port nobody listens on
        let (listener, port) = listening_socket().await;
        drop(listener);

        match TcpProbe::new("127.0.0.1", port, Duration::from_secs(1)).check().await {
            Err(HealthError::Tcp(_)) => {}
            other => panic!("Expected a connection error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unroutable_host_times_out() {
        let probe = TcpProbe::new("10.255.255.1", 27017, Duration::from_millis(100));
        match probe.check().await {
            Err(HealthError::Timeout(limit)) => assert_eq!(limit, Duration::from_millis(100)),
            // Some sandboxes reject unroutable addresses outright
            Err(HealthError::Tcp(_)) => {}
            other => panic!("Expected a timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_address_formatting() {
        assert_eq!(
            TcpProbe::new("redis.local", 6379, Duration::from_secs(5)).address(),
            "redis.local:6379"
        );
        assert_eq!(
            TcpProbe::new("::1", 5672, Duration::from_secs(5)).address(),
            "[::1]:5672"
        );
    }

    #[test]
    fn test_from_address() {
        let timeout = Duration::from_secs(1);
        assert_eq!(
            TcpProbe::from_address("db.local:27017", timeout).unwrap().address(),
            "db.local:27017"
        );
        assert_eq!(
            TcpProbe::from_address(" [::1]:5672 ", timeout).unwrap().address(),
            "[::1]:5672"
        );

        for bad in ["db.local", ":6379", "db.local:0", "db.local:port", ""] {
            assert!(TcpProbe::from_address(bad, timeout).is_none(), "accepted '{}'", bad);
        }
    }
}
