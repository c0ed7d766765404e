//! Recorder configuration

use anyhow::{Context, Result};
use clap::ValueEnum;
use overseer_lib::store::WriteMode;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event
    Json,
    /// Multi-line human readable events
    Pretty,
}

/// Recorder configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecorderConfig {
    /// Seconds to sleep between ticks
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    /// GPU query program, looked up on `PATH` when not absolute
    #[serde(default = "default_gpu_query_bin")]
    pub gpu_query_bin: String,

    /// Replace table files through a temp file and rename
    #[serde(default)]
    pub durable_writes: bool,
}

fn default_interval_secs() -> u64 {
    15
}

fn default_log_format() -> LogFormat {
    LogFormat::Json
}

fn default_gpu_query_bin() -> String {
    overseer_lib::collector::DEFAULT_GPU_QUERY_BIN.to_string()
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            log_format: default_log_format(),
            gpu_query_bin: default_gpu_query_bin(),
            durable_writes: false,
        }
    }
}

impl RecorderConfig {
    /// Load configuration from `OVERSEER_*` environment variables
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load from an explicit variable map instead of the process environment
    pub fn load_from(vars: Option<HashMap<String, String>>) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("OVERSEER")
                    .try_parsing(true)
                    .source(vars),
            )
            .build()
            .context("Failed to read OVERSEER_* environment")?;

        config
            .try_deserialize()
            .context("Invalid OVERSEER_* configuration")
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn write_mode(&self) -> WriteMode {
        if self.durable_writes {
            WriteMode::Durable
        } else {
            WriteMode::InPlace
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = RecorderConfig::load_from(vars(&[])).unwrap();
        assert_eq!(config, RecorderConfig::default());
        assert_eq!(config.interval(), Duration::from_secs(15));
        assert_eq!(config.write_mode(), WriteMode::InPlace);
        assert_eq!(config.gpu_query_bin, "nvidia-smi");
    }

    #[test]
    fn test_environment_overrides() {
        let config = RecorderConfig::load_from(vars(&[
            ("OVERSEER_INTERVAL_SECS", "5"),
            ("OVERSEER_LOG_FORMAT", "pretty"),
            ("OVERSEER_GPU_QUERY_BIN", "/opt/bin/nvidia-smi"),
            ("OVERSEER_DURABLE_WRITES", "true"),
        ]))
        .unwrap();

        assert_eq!(config.interval_secs, 5);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.gpu_query_bin, "/opt/bin/nvidia-smi");
        assert_eq!(config.write_mode(), WriteMode::Durable);
    }

    #[test]
    fn test_invalid_value_is_an_error() {
        let result = RecorderConfig::load_from(vars(&[("OVERSEER_INTERVAL_SECS", "soon")]));
        assert!(result.is_err());
    }
}
