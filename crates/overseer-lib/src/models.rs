//! Core data models for the recorder and the viewer

use serde::Serialize;

/// Bytes per gigabyte (binary) used by every `(GB)` column
pub const GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Column names of the host and GPU tables.
///
/// These names are part of the on-disk format and must not change.
pub mod columns {
    pub const CPU_PER_CPU: &str = "cpu_per_cpu (%)";
    pub const CPU_TOTAL: &str = "cpu_total (%)";
    pub const CPU_AVG: &str = "cpu_avg (%)";
    pub const DISK_TOTAL: &str = "disk_total (GB)";
    pub const DISK_PERCENT: &str = "disk_percent (%)";
    pub const MEM_TOTAL: &str = "mem_total (GB)";
    pub const MEM_AVAILABLE: &str = "mem_available (GB)";
    pub const MEM_USED: &str = "mem_used (GB)";
    pub const MEM_PERCENT: &str = "mem_percent (%)";
    pub const SWAP_TOTAL: &str = "swap_total (GB)";
    pub const SWAP_USED: &str = "swap_used (GB)";
    pub const SWAP_FREE: &str = "swap_free (GB)";
    pub const SWAP_PERCENT: &str = "swap_percent (%)";
    pub const LOADAVG_1: &str = "loadavg_1 (%)";
    pub const LOADAVG_5: &str = "loadavg_5 (%)";
    pub const LOADAVG_15: &str = "loadavg_15 (%)";
    pub const HOSTNAME: &str = "hostname";
    pub const IP: &str = "ip";
    pub const DATETIME: &str = "datetime";
    pub const TIMESTAMP: &str = "timestamp";

    pub const GPU_INDEX: &str = "index";
    pub const GPU_NAME: &str = "name";
    pub const GPU_UTIL: &str = "gpu_util (%)";
    pub const GPU_MEM_UTIL: &str = "mem_util (%)";
    pub const GPU_MEM_USED: &str = "mem_used (MiB)";
    pub const GPU_MEM_TOTAL: &str = "mem_total (MiB)";
    pub const GPU_MEM_FREE: &str = "mem_free (MiB)";
}

/// Host metrics gathered in a single tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSample {
    pub cpu_per_cpu: Vec<f64>,
    pub cpu_total: f64,
    pub cpu_avg: f64,
    pub disk_total_gb: f64,
    pub disk_percent: f64,
    pub mem_total_gb: f64,
    pub mem_available_gb: f64,
    pub mem_used_gb: f64,
    pub mem_percent: f64,
    pub swap_total_gb: f64,
    pub swap_used_gb: f64,
    pub swap_free_gb: f64,
    pub swap_percent: f64,
    pub loadavg_1: f64,
    pub loadavg_5: f64,
    pub loadavg_15: f64,
    pub hostname: String,
    pub ip: String,
    /// Local wall-clock time, `YYYY-MM-DD HH:MM:SS.ffffff`
    pub datetime: String,
    /// Seconds since the Unix epoch
    pub timestamp: f64,
}

/// Number of scalar metrics a host sample contributes to charts
pub const CHARTED_METRIC_COUNT: usize = 15;

impl MetricSample {
    /// Scalar metrics keyed by column name, in table order.
    ///
    /// Identity fields, the per-core array and the timestamps are not charted.
    pub fn charted_metrics(&self) -> [(&'static str, f64); CHARTED_METRIC_COUNT] {
        use columns::*;
        [
            (CPU_TOTAL, self.cpu_total),
            (CPU_AVG, self.cpu_avg),
            (DISK_TOTAL, self.disk_total_gb),
            (DISK_PERCENT, self.disk_percent),
            (MEM_TOTAL, self.mem_total_gb),
            (MEM_AVAILABLE, self.mem_available_gb),
            (MEM_USED, self.mem_used_gb),
            (MEM_PERCENT, self.mem_percent),
            (SWAP_TOTAL, self.swap_total_gb),
            (SWAP_USED, self.swap_used_gb),
            (SWAP_FREE, self.swap_free_gb),
            (SWAP_PERCENT, self.swap_percent),
            (LOADAVG_1, self.loadavg_1),
            (LOADAVG_5, self.loadavg_5),
            (LOADAVG_15, self.loadavg_15),
        ]
    }

    /// Names of the charted metrics, in table order
    pub fn charted_metric_names() -> impl Iterator<Item = &'static str> {
        use columns::*;
        [
            CPU_TOTAL,
            CPU_AVG,
            DISK_TOTAL,
            DISK_PERCENT,
            MEM_TOTAL,
            MEM_AVAILABLE,
            MEM_USED,
            MEM_PERCENT,
            SWAP_TOTAL,
            SWAP_USED,
            SWAP_FREE,
            SWAP_PERCENT,
            LOADAVG_1,
            LOADAVG_5,
            LOADAVG_15,
        ]
        .into_iter()
    }
}

/// One physical GPU as reported by the GPU query tool in a single tick.
///
/// Serializes with the table's column names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpuSample {
    pub index: i64,
    pub name: String,
    #[serde(rename = "gpu_util (%)")]
    pub gpu_util_percent: f64,
    #[serde(rename = "mem_util (%)")]
    pub mem_util_percent: f64,
    #[serde(rename = "mem_used (MiB)")]
    pub mem_used_mib: f64,
    #[serde(rename = "mem_total (MiB)")]
    pub mem_total_mib: f64,
    #[serde(rename = "mem_free (MiB)")]
    pub mem_free_mib: f64,
    /// Epoch seconds of the tick that produced this row
    pub timestamp: f64,
}

/// Everything produced by one sampling tick
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub system: MetricSample,
    /// `None` when no GPU tool is available this tick
    pub gpu: Option<Vec<GpuSample>>,
}
