//! Metrics sampling for the local host
//!
//! This module provides the sampler that produces one [`Tick`] per interval:
//! a host row from sysinfo and, when a GPU query tool is present, one row
//! per GPU. The sampling loop drives a sampler and persists every tick.

mod gpu;
mod host;
mod r#loop;


pub use gpu::{parse_gpu_csv, GpuQuery, DEFAULT_GPU_QUERY_BIN, GPU_QUERY_FIELDS};
pub use host::{resolve_ip, HostProbe, DEFAULT_DISK_MOUNT};
pub use r#loop::{LoopState, RecordConfig, RecordLoop, RecordLoopBuilder, RecordSummary};

use crate::models::Tick;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local};

/// Wall-clock stamp shared by every row of a tick
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTime {
    /// Local time, `YYYY-MM-DD HH:MM:SS.ffffff`
    pub datetime: String,
    /// Epoch seconds with microsecond resolution
    pub timestamp: f64,
}

impl SampleTime {
    pub fn now() -> Self {
        Self::from_local(Local::now())
    }

    pub fn from_local(at: DateTime<Local>) -> Self {
        Self {
            datetime: at.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
            timestamp: at.timestamp_micros() as f64 / 1_000_000.0,
        }
    }
}

/// Source of ticks for the sampling loop
#[async_trait]
pub trait Sampler: Send {
    /// Sample the host once. GPU absence is `tick.gpu == None`, never an error.
    async fn sample(&mut self) -> Result<Tick>;
}

/// Sampler backed by the real host and the GPU query tool
pub struct SystemSampler {
    host: HostProbe,
    gpu: Option<GpuQuery>,
}

impl SystemSampler {
    pub fn new(host: HostProbe, gpu: Option<GpuQuery>) -> Self {
        Self { host, gpu }
    }
}

#[async_trait]
impl Sampler for SystemSampler {
    async fn sample(&mut self) -> Result<Tick> {
        let at = SampleTime::now();
        let system = self.host.sample(&at);

        let gpu = match &self.gpu {
            Some(query) => query.query(at.timestamp).await,
            None => None,
        };

        Ok(Tick { system, gpu })
    }
}
