//! Liveness state machine
//!
//! Tracks probe outcomes against the startup grace period and the
//! consecutive-failure threshold. The monitor holds no I/O: callers feed it
//! probe outcomes with timestamps, which keeps the state machine fully
//! deterministic under test.

use crate::error::SuperviseError;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Default probe cadence, orchestrator-facing contract values
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// Probe cadence and thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeParams {
    pub interval: Duration,
    pub timeout: Duration,
    pub grace_period: Duration,
    pub failure_threshold: u32,
}

impl Default for ProbeParams {
    fn default() -> Self {
        Self {
            interval: DEFAULT_PROBE_INTERVAL,
            timeout: DEFAULT_PROBE_TIMEOUT,
            grace_period: DEFAULT_GRACE_PERIOD,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
        }
    }
}

impl ProbeParams {
    /// The probe timeout must be strictly shorter than the interval so a
    /// hung probe is abandoned before the next one fires.
    pub fn validate(&self) -> Result<(), SuperviseError> {
        if self.timeout >= self.interval {
            return Err(SuperviseError::InvalidProbeParams(format!(
                "timeout {:?} must be shorter than interval {:?}",
                self.timeout, self.interval
            )));
        }
        if self.failure_threshold == 0 {
            return Err(SuperviseError::InvalidProbeParams(
                "failure threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Container health as reported to the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// Inside the startup grace period, failures ignored
    Starting,
    Healthy,
    Unhealthy,
}

/// A state change worth reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthTransition {
    pub from: HealthState,
    pub to: HealthState,
}

/// Consumes probe outcomes, produces health transitions
#[derive(Debug)]
pub struct HealthMonitor {
    params: ProbeParams,
    state: HealthState,
    consecutive_failures: u32,
    started_at: Instant,
}

impl HealthMonitor {
    pub fn new(params: ProbeParams, started_at: Instant) -> Self {
        Self {
            params,
            state: HealthState::Starting,
            consecutive_failures: 0,
            started_at,
        }
    }

    pub fn state(&self) -> HealthState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Record one probe outcome.
    ///
    /// A success resets the failure counter and moves to Healthy from any
    /// state. A failure within the grace period is ignored entirely. A
    /// counted failure past the threshold moves to Unhealthy; the monitor
    /// keeps observing afterwards, since probing never stops.
    pub fn observe(&mut self, success: bool, now: Instant) -> Option<HealthTransition> {
        if success {
            self.consecutive_failures = 0;
            return self.transition_to(HealthState::Healthy);
        }

        if now.duration_since(self.started_at) < self.params.grace_period {
            return None;
        }

        self.consecutive_failures += 1;
        if self.consecutive_failures >= self.params.failure_threshold {
            return self.transition_to(HealthState::Unhealthy);
        }
        None
    }

    fn transition_to(&mut self, to: HealthState) -> Option<HealthTransition> {
        if self.state == to {
            return None;
        }
        let from = self.state;
        self.state = to;
        Some(HealthTransition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> (HealthMonitor, Instant) {
        let start = Instant::now();
        (HealthMonitor::new(ProbeParams::default(), start), start)
    }

    #[test]
    fn test_default_params_match_contract() {
        let params = ProbeParams::default();
        assert_eq!(params.interval, Duration::from_secs(30));
        assert_eq!(params.timeout, Duration::from_secs(5));
        assert_eq!(params.grace_period, Duration::from_secs(5));
        assert_eq!(params.failure_threshold, 3);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_timeout_must_be_shorter_than_interval() {
        let params = ProbeParams {
            timeout: Duration::from_secs(30),
            ..ProbeParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let params = ProbeParams {
            failure_threshold: 0,
            ..ProbeParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_failures_in_grace_period_do_not_count() {
        let (mut monitor, start) = monitor();

        assert_eq!(monitor.observe(false, start + Duration::from_secs(1)), None);
        assert_eq!(monitor.observe(false, start + Duration::from_secs(4)), None);
        assert_eq!(monitor.consecutive_failures(), 0);
        assert_eq!(monitor.state(), HealthState::Starting);
    }

    #[test]
    fn test_three_consecutive_failures_after_grace_mark_unhealthy() {
        let (mut monitor, start) = monitor();
        let after_grace = start + Duration::from_secs(6);

        assert_eq!(monitor.observe(false, after_grace), None);
        assert_eq!(monitor.observe(false, after_grace + Duration::from_secs(30)), None);
        let transition = monitor
            .observe(false, after_grace + Duration::from_secs(60))
            .unwrap();
        assert_eq!(transition.to, HealthState::Unhealthy);
        assert_eq!(monitor.state(), HealthState::Unhealthy);
    }

    #[test]
    fn test_success_resets_counter() {
        let (mut monitor, start) = monitor();
        let after_grace = start + Duration::from_secs(10);

        monitor.observe(false, after_grace);
        monitor.observe(false, after_grace + Duration::from_secs(30));
        assert_eq!(monitor.consecutive_failures(), 2);

        let transition = monitor
            .observe(true, after_grace + Duration::from_secs(60))
            .unwrap();
        assert_eq!(transition.to, HealthState::Healthy);
        assert_eq!(monitor.consecutive_failures(), 0);

        // Two more failures stay below the threshold again
        monitor.observe(false, after_grace + Duration::from_secs(90));
        assert_eq!(
            monitor.observe(false, after_grace + Duration::from_secs(120)),
            None
        );
        assert_eq!(monitor.state(), HealthState::Healthy);
    }

    #[test]
    fn test_grace_failure_then_success_is_healthy() {
        let (mut monitor, start) = monitor();

        assert_eq!(monitor.observe(false, start + Duration::from_secs(2)), None);
        let transition = monitor
            .observe(true, start + Duration::from_secs(32))
            .unwrap();
        assert_eq!(transition.from, HealthState::Starting);
        assert_eq!(transition.to, HealthState::Healthy);
    }

    #[test]
    fn test_unhealthy_is_reported_once_until_recovery() {
        let (mut monitor, start) = monitor();
        let t = start + Duration::from_secs(10);

        monitor.observe(false, t);
        monitor.observe(false, t + Duration::from_secs(1));
        assert!(monitor.observe(false, t + Duration::from_secs(2)).is_some());
        // Further failures keep the state without re-reporting
        assert_eq!(monitor.observe(false, t + Duration::from_secs(3)), None);
        assert_eq!(monitor.state(), HealthState::Unhealthy);

        // Probing never stops; a later success still recovers
        let transition = monitor.observe(true, t + Duration::from_secs(4)).unwrap();
        assert_eq!(transition.from, HealthState::Unhealthy);
        assert_eq!(transition.to, HealthState::Healthy);
    }
}
