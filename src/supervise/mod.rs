//! Runtime supervision: privilege drop, port wiring, liveness probing
//!
//! Build-time stages end at the assembled image; this module is the runtime
//! half of the contract. Probing runs concurrently with, but independently
//! of, the supervised process: a probe is a short-lived poll on a fixed
//! cadence with its own timeout, and probe failures are reported, never
//! acted on.

mod monitor;
mod probe;
mod runner;

pub use monitor::{
    HealthMonitor, HealthState, HealthTransition, ProbeParams, DEFAULT_FAILURE_THRESHOLD,
    DEFAULT_GRACE_PERIOD, DEFAULT_PROBE_INTERVAL, DEFAULT_PROBE_TIMEOUT,
};
pub use probe::{
    probe_url, resolve_port, resolve_port_from_env, HttpProber, Prober, DEFAULT_PORT, PORT_VAR,
    STATUS_PATH,
};
pub use runner::Supervisor;
