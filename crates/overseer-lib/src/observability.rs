//! Structured logging for recorder events
//!
//! Every event carries the node and job it belongs to so that the logs of
//! many recorders can be merged and filtered.

use crate::store::{TickOutcome, WriteMode};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Structured logger for recorder events
#[derive(Clone)]
pub struct StructuredLogger {
    node_name: String,
    job: String,
}

impl StructuredLogger {
    pub fn new(node_name: impl Into<String>, job: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
            job: job.into(),
        }
    }

    /// Log recorder startup
    pub fn log_startup(
        &self,
        version: &str,
        stats_dir: &Path,
        interval: Duration,
        mode: WriteMode,
    ) {
        info!(
            event = "recorder_started",
            node = %self.node_name,
            job = %self.job,
            version = %version,
            stats_dir = %stats_dir.display(),
            interval_secs = interval.as_secs_f64(),
            write_mode = ?mode,
            "Recording stats"
        );
    }

    /// Log a persisted tick
    pub fn log_tick(&self, tick: u64, datetime: &str, outcome: &TickOutcome, elapsed: Duration) {
        info!(
            event = "tick_recorded",
            node = %self.node_name,
            job = %self.job,
            tick = tick,
            datetime = %datetime,
            system_rows = outcome.system.total_rows(),
            created = !outcome.system.existed,
            gpu_rows = outcome.gpu.map(|g| g.total_rows()),
            elapsed_ms = elapsed.as_millis() as u64,
            "Recorded stats"
        );

        if outcome.gpu.is_none() {
            debug!(
                event = "gpu_unavailable",
                node = %self.node_name,
                tick = tick,
                "No GPU data this tick"
            );
        }
    }

    /// Log a tick that could not be sampled or persisted
    pub fn log_tick_failed(&self, tick: u64, error: &anyhow::Error) {
        warn!(
            event = "tick_failed",
            node = %self.node_name,
            job = %self.job,
            tick = tick,
            error = %format!("{error:#}"),
            "Failed to record stats, retrying next tick"
        );
    }

    /// Log recorder shutdown
    pub fn log_shutdown(&self, reason: &str, ticks: u64, failures: u64) {
        info!(
            event = "recorder_shutdown",
            node = %self.node_name,
            job = %self.job,
            reason = %reason,
            ticks = ticks,
            failures = failures,
            "Recorder shutting down"
        );
    }
}
