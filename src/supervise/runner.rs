//! Process supervision
//!
//! Owns process identity, port wiring, and the probe loop. The supervisor
//! starts exactly one long-lived process and reports health; it never
//! restarts the process itself, that belongs to the surrounding
//! orchestrator.

use super::monitor::{HealthMonitor, HealthState, ProbeParams};
use super::probe::{HttpProber, Prober, PORT_VAR};
use crate::error::SuperviseError;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Supervises one child process and probes its status endpoint
#[derive(Debug)]
pub struct Supervisor {
    command: Vec<String>,
    port: u16,
    params: ProbeParams,
    drop_to: Option<(u32, u32)>,
}

impl Supervisor {
    pub fn new(
        command: Vec<String>,
        port: u16,
        params: ProbeParams,
        drop_to: Option<(u32, u32)>,
    ) -> Result<Self, SuperviseError> {
        params.validate()?;
        if command.is_empty() {
            return Err(SuperviseError::InvalidProbeParams(
                "no process-start command given".to_string(),
            ));
        }
        Ok(Self {
            command,
            port,
            params,
            drop_to,
        })
    }

    /// Drop privileges, spawn the process, and probe until it exits.
    ///
    /// Never returns while the service runs: the only way out is a spawn
    /// failure, a privilege-drop failure, or the child exiting, all of
    /// which exit the container non-zero.
    pub async fn run(&self) -> Result<(), SuperviseError> {
        if let Some((uid, gid)) = self.drop_to {
            drop_privileges(uid, gid)?;
            info!(uid, gid, "Dropped privileges");
        }

        let program = &self.command[0];
        let mut child = tokio::process::Command::new(program)
            .args(&self.command[1..])
            .env(PORT_VAR, self.port.to_string())
            .kill_on_drop(false)
            .spawn()
            .map_err(|source| SuperviseError::Spawn {
                command: self.command.join(" "),
                source,
            })?;

        info!(command = %self.command.join(" "), port = self.port, "Process started");

        let prober =
            HttpProber::new(self.port, self.params.timeout).map_err(|e| {
                SuperviseError::InvalidProbeParams(format!("probe client: {}", e))
            })?;
        let mut monitor = HealthMonitor::new(self.params, Instant::now());
        let mut ticks = tokio::time::interval(self.params.interval);

        loop {
            tokio::select! {
                status = child.wait() => {
                    let code = status
                        .map(|s| s.code().unwrap_or(-1))
                        .unwrap_or(-1);
                    error!(status = code, "Supervised process exited");
                    return Err(SuperviseError::ProcessExited { status: code });
                }
                _ = ticks.tick() => {
                    let healthy = prober.probe().await;
                    self.report(&mut monitor, healthy);
                }
            }
        }
    }

    fn report(&self, monitor: &mut HealthMonitor, healthy: bool) {
        match monitor.observe(healthy, Instant::now()) {
            Some(transition) if transition.to == HealthState::Unhealthy => {
                error!(
                    failures = monitor.consecutive_failures(),
                    threshold = self.params.failure_threshold,
                    "Container unhealthy"
                );
            }
            Some(transition) => {
                info!(from = ?transition.from, to = ?transition.to, "Health changed");
            }
            None if !healthy => {
                if monitor.state() == HealthState::Starting {
                    debug!("Probe failed inside grace period, not counted");
                } else {
                    warn!(
                        failures = monitor.consecutive_failures(),
                        threshold = self.params.failure_threshold,
                        "Probe failed"
                    );
                }
            }
            None => {}
        }
    }
}

/// Transition the current process to the unprivileged identity.
///
/// Group first, then user: once the uid drops, setgid is no longer
/// permitted. Supplementary groups are cleared before either.
#[cfg(unix)]
fn drop_privileges(uid: u32, gid: u32) -> Result<(), SuperviseError> {
    let err = |source: std::io::Error| SuperviseError::PrivilegeDrop { uid, gid, source };

    // SAFETY: plain syscalls on the current process, no memory handed over.
    unsafe {
        if libc::geteuid() == 0 && libc::setgroups(0, std::ptr::null()) != 0 {
            return Err(err(std::io::Error::last_os_error()));
        }
        if libc::setgid(gid as libc::gid_t) != 0 {
            return Err(err(std::io::Error::last_os_error()));
        }
        if libc::setuid(uid as libc::uid_t) != 0 {
            return Err(err(std::io::Error::last_os_error()));
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn drop_privileges(uid: u32, gid: u32) -> Result<(), SuperviseError> {
    Err(SuperviseError::PrivilegeDrop {
        uid,
        gid,
        source: std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "privilege drop requires a unix host",
        ),
    })
}
