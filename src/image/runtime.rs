//! Runtime contract recorded in the image
//!
//! The final image carries a config document describing everything the
//! orchestration layer needs: the unprivileged identity, the port contract,
//! the single process-start command, and the health probe parameters.

use super::identity::RuntimeIdentity;
use crate::config::BuildConfig;
use crate::supervise::{ProbeParams, DEFAULT_PORT, PORT_VAR, STATUS_PATH};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How the bound port is chosen and exposed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortContract {
    /// Environment variable the process reads
    pub var: String,
    /// Port used when the variable is absent or empty
    pub default: u16,
    /// Port exposed to the orchestration layer
    pub expose: u16,
}

/// Health probe contract, orchestrator-consumed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthcheckContract {
    pub path: String,
    pub interval_secs: u64,
    pub timeout_secs: u64,
    pub start_period_secs: u64,
    pub retries: u32,
}

impl From<&ProbeParams> for HealthcheckContract {
    fn from(params: &ProbeParams) -> Self {
        Self {
            path: STATUS_PATH.to_string(),
            interval_secs: params.interval.as_secs(),
            timeout_secs: params.timeout.as_secs(),
            start_period_secs: params.grace_period.as_secs(),
            retries: params.failure_threshold,
        }
    }
}

/// The complete runtime half of the image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeContract {
    pub user: RuntimeIdentity,
    pub port: PortContract,
    /// Exactly one long-lived process-start command
    pub command: String,
    /// Environment defaults baked into the image
    pub env: BTreeMap<String, String>,
    pub healthcheck: HealthcheckContract,
}

impl RuntimeContract {
    pub fn new(config: &BuildConfig, identity: RuntimeIdentity, params: &ProbeParams) -> Self {
        let mut env = BTreeMap::new();
        env.insert(PORT_VAR.to_string(), DEFAULT_PORT.to_string());
        Self {
            user: identity,
            port: PortContract {
                var: PORT_VAR.to_string(),
                default: DEFAULT_PORT,
                expose: config.expose_port,
            },
            command: config.start_command.clone(),
            env,
            healthcheck: HealthcheckContract::from(params),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.command.trim().is_empty() {
            bail!("runtime command cannot be empty");
        }
        if self.healthcheck.timeout_secs >= self.healthcheck.interval_secs {
            bail!("probe timeout must be shorter than the probe interval");
        }
        Ok(())
    }
}
