//! HTTP liveness probing
//!
//! Each probe is a short-lived, independent GET against the status endpoint
//! on the bound port. A probe that times out is abandoned and counted as a
//! failure without signaling the in-flight application request.

use crate::error::SuperviseError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Fixed status path served by the application
pub const STATUS_PATH: &str = "/api/v1/status";

/// Environment variable naming the bound port
pub const PORT_VAR: &str = "PORT";

/// Port used when the variable is absent or empty
pub const DEFAULT_PORT: u16 = 3000;

/// Resolve the port from an environment value: absent or empty means the
/// default, anything else must parse as an integer port.
pub fn resolve_port(value: Option<&str>) -> Result<u16, SuperviseError> {
    match value {
        None => Ok(DEFAULT_PORT),
        Some(raw) if raw.trim().is_empty() => Ok(DEFAULT_PORT),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| SuperviseError::InvalidPort {
                var: PORT_VAR.to_string(),
                value: raw.to_string(),
            }),
    }
}

/// Resolve the port from the process environment
pub fn resolve_port_from_env() -> Result<u16, SuperviseError> {
    resolve_port(std::env::var(PORT_VAR).ok().as_deref())
}

/// Probe target for a given port
pub fn probe_url(port: u16) -> String {
    format!("http://localhost:{}{}", port, STATUS_PATH)
}

/// One independent liveness poll; true means the endpoint answered 2xx
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self) -> bool;
}

/// Prober issuing real HTTP requests with a per-probe timeout
pub struct HttpProber {
    client: reqwest::Client,
    url: String,
}

impl HttpProber {
    pub fn new(port: u16, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: probe_url(port),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(response) => {
                let healthy = response.status().is_success();
                debug!(url = %self.url, status = %response.status(), healthy, "Probe completed");
                healthy
            }
            Err(e) => {
                debug!(url = %self.url, error = %e, "Probe failed");
                false
            }
        }
    }
}
