//! HTTP request health probing

use async_trait::async_trait;
use hyper::{Body, Client, Method, Request, Uri};
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::debug;

use super::{Expect, HealthError, Probe, ProbeOutcome};

/// HTTP health probe that makes one GET request and validates the response
///
/// Used directly as the dependency API probe (with [`Expect::JsonFlag`]) and
/// once per endpoint inside [`UrlGroupProbe`](super::UrlGroupProbe) (with
/// [`Expect::Any2xx`]). There is exactly one round-trip per check and no
/// retry; the next evaluation cycle is the retry.
///
/// # Example
///
/// ```rust,no_run
/// use vigil_core::health::{HttpProbe, Expect, Probe};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let probe = HttpProbe::new(
///     "Football Standings API",
///     "http://127.0.0.1:8080/standings",
///     Expect::JsonFlag("status".to_string()),
///     Duration::from_secs(10),
/// );
///
/// let outcome = probe.check().await?;
/// println!("{}: {}", outcome.status, outcome.description);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpProbe {
    /// Display name used in descriptions
    name: String,
    /// URL to request
    url: String,
    /// Expected response criteria
    expect: Expect,
    /// Request timeout, covering connect, headers and body
    timeout: Duration,
}

impl HttpProbe {
    /// Create a new HTTP probe
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the dependency, used in descriptions
    /// * `url` - The URL to make a GET request to
    /// * `expect` - The expectation for validating the response
    /// * `timeout` - Maximum time to wait for the whole exchange
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        expect: Expect,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            expect,
            timeout,
        }
    }

    /// Get the target URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the expected response criteria
    pub fn expect(&self) -> &Expect {
        &self.expect
    }

    /// Perform the request and validate it
    ///
    /// Any deviation from the expectation is an error here; [`Probe::check`]
    /// turns status and payload mismatches back into unhealthy outcomes.
    pub async fn request(&self) -> Result<u16, HealthError> {
        debug!("HTTP probe requesting {}", self.url);
        let deadline = Instant::now() + self.timeout;

        let client = Client::new();
        let uri: Uri = self.url.parse()?;
        let req = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())?;

        let response = match timeout_at(deadline, client.request(req)).await {
            Ok(Ok(response)) => response,
            Ok(Err(hyper_error)) => {
                debug!("HTTP probe to {} failed: {}", self.url, hyper_error);
                return Err(HealthError::Http(hyper_error));
            }
            Err(_elapsed) => {
                debug!("HTTP probe to {} timed out after {:?}", self.url, self.timeout);
                return Err(HealthError::Timeout(self.timeout));
            }
        };

        let status = response.status().as_u16();
        debug!("HTTP probe to {} returned status {}", self.url, status);

        if !self.expect.matches_status(status) {
            return Err(HealthError::UnexpectedStatus(status));
        }

        if self.expect.needs_body() {
            let body_bytes = match timeout_at(deadline, hyper::body::to_bytes(response.into_body()))
                .await
            {
                Ok(Ok(bytes)) => bytes,
                Ok(Err(hyper_error)) => {
                    debug!("HTTP probe body read failed: {}", hyper_error);
                    return Err(HealthError::Http(hyper_error));
                }
                Err(_elapsed) => {
                    debug!("HTTP probe body read timed out after {:?}", self.timeout);
                    return Err(HealthError::Timeout(self.timeout));
                }
            };
            self.expect.check_body(&body_bytes)?;
        }

        debug!("HTTP probe to {} succeeded", self.url);
        Ok(status)
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn check(&self) -> Result<ProbeOutcome, HealthError> {
        match self.request().await {
            Ok(status) => Ok(ProbeOutcome::healthy(format!("{} is healthy.", self.name))
                .with_data("url", self.url.as_str())
                .with_data("statusCode", u64::from(status))),
            Err(HealthError::UnexpectedStatus(status)) => {
                Ok(ProbeOutcome::unhealthy(format!("{} is unhealthy.", self.name))
                    .with_data("url", self.url.as_str())
                    .with_data("statusCode", u64::from(status)))
            }
            Err(HealthError::Payload(reason)) => {
                Ok(ProbeOutcome::unhealthy(format!("{} is unhealthy.", self.name))
                    .with_data("url", self.url.as_str())
                    .with_data("reason", reason))
            }
            Err(other) => Err(other),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_server {
    //! In-process HTTP fixture shared by the probe tests

    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Response, Server};
    use std::convert::Infallible;
    use std::time::Duration;
    use tokio::task;

    /// Start a server answering a fixed set of paths; returns its port
    pub(crate) async fn start_test_server() -> u16 {
        let make_svc = make_service_fn(|_conn| async {
            Ok::<_, Infallible>(service_fn(|req| async move {
                let response = match req.uri().path() {
                    "/health" => Response::new(Body::from("healthy")),
                    "/status/ok" => Response::new(Body::from(r#"{"status": true}"#)),
                    "/status/down" => Response::new(Body::from(r#"{"status": false}"#)),
                    "/status/missing" => Response::new(Body::from(r#"{"state": "up"}"#)),
                    "/status/html" => Response::new(Body::from("<html>ok</html>")),
                    "/slow" => {
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        Response::new(Body::from("late"))
                    }
                    "/bad" => Response::builder()
                        .status(500)
                        .body(Body::from("error"))
                        .unwrap(),
                    _ => Response::builder()
                        .status(404)
                        .body(Body::from("not found"))
                        .unwrap(),
                };
                Ok::<_, Infallible>(response)
            }))
        });

        let addr = ([127, 0, 0, 1], 0).into();
        let server = Server::bind(&addr).serve(make_svc);
        let port = server.local_addr().port();

        task::spawn(async move {
            if let Err(e) = server.await {
                eprintln!("Server error: {}", e);
            }
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        port
    }
}
