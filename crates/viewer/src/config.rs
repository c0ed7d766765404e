//! Configuration management for the viewer

use crate::output::OutputFormat;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Stats root used when neither flag, environment nor config file names one
pub const DEFAULT_STATS_ROOT: &str = "/checkpoint/par/overseer";

/// Viewer configuration file, `~/.config/overseer/config.json`
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Stats root to read
    pub stats_root: Option<PathBuf>,
    /// Default output format
    pub default_format: Option<OutputFormat>,
}

impl Config {
    /// Load configuration from the user's config file, if there is one
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Stats root from the command line or environment, then this file,
    /// then the built-in default
    pub fn stats_root(&self, cli_root: Option<PathBuf>) -> PathBuf {
        cli_root
            .or_else(|| self.stats_root.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATS_ROOT))
    }

    pub fn format(&self, cli_format: Option<OutputFormat>) -> OutputFormat {
        cli_format.or(self.default_format).unwrap_or_default()
    }

    fn config_path() -> Option<PathBuf> {
        let home = dirs_next::home_dir()?;
        Some(home.join(".config").join("overseer").join("config.json"))
    }
}
