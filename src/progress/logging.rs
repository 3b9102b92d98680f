//! Progress handler that forwards events to tracing

use super::handler::{ProgressEvent, ProgressHandler};
use tracing::{error, info};

/// Handler that logs every event at an appropriate level
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started { repo_path } => {
                info!(repo = %repo_path, "Build started");
            }
            ProgressEvent::StageStarted { stage } => {
                info!(stage = %stage, "Stage started");
            }
            ProgressEvent::StageComplete { stage, duration } => {
                info!(stage = %stage, duration_ms = duration.as_millis() as u64, "Stage complete");
            }
            ProgressEvent::LayerWritten {
                digest,
                size,
                reused,
            } => {
                info!(digest = %digest, size, reused, "Layer written");
            }
            ProgressEvent::Completed {
                image_path,
                total_time,
            } => {
                info!(
                    image = %image_path,
                    duration_ms = total_time.as_millis() as u64,
                    "Build complete"
                );
            }
            ProgressEvent::Failed { error: message } => {
                error!(error = %message, "Build failed");
            }
        }
    }
}
