//! Sampling loop
//!
//! Runs sample-then-append on a fixed interval until the process is
//! terminated, an optional tick limit is reached, or the shutdown future
//! resolves between ticks. The sleep starts after a tick completes, so
//! slow ticks push later ticks back.

use super::Sampler;
use crate::observability::StructuredLogger;
use crate::store::{TableStore, TickOutcome};
use anyhow::{Context, Result};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

/// Configuration for the sampling loop
#[derive(Debug, Clone)]
pub struct RecordConfig {
    /// Sleep between ticks (default: 15 seconds)
    pub interval: Duration,
    /// Stop after this many ticks; run forever when `None`
    pub max_ticks: Option<u64>,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            max_ticks: None,
        }
    }
}

/// What the loop is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Sampling,
}

/// Totals reported when the loop stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordSummary {
    pub ticks: u64,
    pub failures: u64,
}

/// Loop that samples the host and appends to one stats directory
pub struct RecordLoop {
    sampler: Box<dyn Sampler>,
    store: TableStore,
    stats_dir: PathBuf,
    config: RecordConfig,
    logger: StructuredLogger,
    state: LoopState,
    summary: RecordSummary,
}

impl RecordLoop {
    pub fn new(
        sampler: Box<dyn Sampler>,
        store: TableStore,
        stats_dir: impl Into<PathBuf>,
        config: RecordConfig,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            sampler,
            store,
            stats_dir: stats_dir.into(),
            config,
            logger,
            state: LoopState::Idle,
            summary: RecordSummary::default(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn summary(&self) -> RecordSummary {
        self.summary
    }

    /// Run until `shutdown` resolves or the tick limit is reached.
    ///
    /// A failed tick is logged and the loop carries on with the next one.
    pub async fn run<F>(mut self, shutdown: F) -> RecordSummary
    where
        F: Future<Output = ()>,
    {
        info!(
            interval_secs = self.config.interval.as_secs_f64(),
            stats_dir = %self.stats_dir.display(),
            "Starting sampling loop"
        );
        tokio::pin!(shutdown);

        loop {
            self.tick_logged().await;

            if self.limit_reached() {
                self.log_shutdown("tick limit reached");
                break;
            }

            tokio::select! {
                _ = sleep(self.config.interval) => {}
                _ = &mut shutdown => {
                    self.log_shutdown("shutdown requested");
                    break;
                }
            }
        }

        self.summary
    }

    /// Run one tick, logging its outcome instead of returning it
    async fn tick_logged(&mut self) {
        let start = Instant::now();
        let tick_no = self.summary.ticks + 1;

        match self.tick().await {
            Ok((datetime, outcome)) => {
                self.logger.log_tick(tick_no, &datetime, &outcome, start.elapsed());
            }
            Err(e) => {
                self.summary.failures += 1;
                self.logger.log_tick_failed(tick_no, &e);
            }
        }

        // Every 40 ticks is about 10 minutes at the default interval
        if tick_no % 40 == 0 {
            debug!(
                ticks = tick_no,
                failures = self.summary.failures,
                "Sampling loop progress"
            );
        }
    }

    /// Sample once and append the result; `Idle -> Sampling -> Idle`
    pub async fn tick(&mut self) -> Result<(String, TickOutcome)> {
        self.state = LoopState::Sampling;
        self.summary.ticks += 1;
        let result = self.sample_and_append().await;
        self.state = LoopState::Idle;
        result
    }

    async fn sample_and_append(&mut self) -> Result<(String, TickOutcome)> {
        let tick = self.sampler.sample().await.context("Failed to sample host")?;
        let outcome = self
            .store
            .append_tick(&self.stats_dir, &tick)
            .with_context(|| format!("Failed to append to {}", self.stats_dir.display()))?;
        Ok((tick.system.datetime, outcome))
    }

    fn log_shutdown(&self, reason: &str) {
        self.logger
            .log_shutdown(reason, self.summary.ticks, self.summary.failures);
    }

    fn limit_reached(&self) -> bool {
        self.config
            .max_ticks
            .is_some_and(|max| self.summary.ticks >= max)
    }
}

/// Builder for creating the sampling loop
pub struct RecordLoopBuilder {
    sampler: Option<Box<dyn Sampler>>,
    stats_dir: Option<PathBuf>,
    store: TableStore,
    config: RecordConfig,
    logger: Option<StructuredLogger>,
}

impl RecordLoopBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            sampler: None,
            stats_dir: None,
            store: TableStore::default(),
            config: RecordConfig::default(),
            logger: None,
        }
    }

    /// Set the sampler
    pub fn sampler(mut self, sampler: Box<dyn Sampler>) -> Self {
        self.sampler = Some(sampler);
        self
    }

    /// Set the directory the tables are written to
    pub fn stats_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.stats_dir = Some(dir.into());
        self
    }

    /// Set the table store
    pub fn store(mut self, store: TableStore) -> Self {
        self.store = store;
        self
    }

    /// Set the sleep between ticks
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    /// Stop after `max_ticks` ticks
    pub fn max_ticks(mut self, max_ticks: Option<u64>) -> Self {
        self.config.max_ticks = max_ticks;
        self
    }

    /// Set the event logger
    pub fn logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Build the sampling loop
    pub fn build(self) -> Result<RecordLoop> {
        let sampler = self
            .sampler
            .ok_or_else(|| anyhow::anyhow!("Sampler is required"))?;
        let stats_dir = self
            .stats_dir
            .ok_or_else(|| anyhow::anyhow!("Stats directory is required"))?;
        let logger = self
            .logger
            .unwrap_or_else(|| StructuredLogger::new("unknown", "local"));

        Ok(RecordLoop::new(
            sampler,
            self.store,
            stats_dir,
            self.config,
            logger,
        ))
    }
}

impl Default for RecordLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Tick;
    use async_trait::async_trait;

    struct FixedSampler;

    #[async_trait]
    impl Sampler for FixedSampler {
        async fn sample(&mut self) -> Result<Tick> {
            anyhow::bail!("not used")
        }
    }

    #[test]
    fn test_record_config_default() {
        let config = RecordConfig::default();
        assert_eq!(config.interval, Duration::from_secs(15));
        assert!(config.max_ticks.is_none());
    }

    #[test]
    fn test_builder_requires_sampler() {
        let result = RecordLoopBuilder::new().stats_dir("/tmp/overseer").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_requires_stats_dir() {
        let result = RecordLoopBuilder::new()
            .sampler(Box::new(FixedSampler))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_starts_idle() {
        let record_loop = RecordLoopBuilder::new()
            .sampler(Box::new(FixedSampler))
            .stats_dir("/tmp/overseer")
            .interval(Duration::from_secs(5))
            .build()
            .unwrap();

        assert_eq!(record_loop.state(), LoopState::Idle);
        assert_eq!(record_loop.summary(), RecordSummary::default());
        assert_eq!(record_loop.config.interval, Duration::from_secs(5));
    }
}
