//! Host metrics probe
//!
//! Reads CPU, memory, swap, disk and load average through sysinfo:
//! - CPU usage is the delta since the previous refresh, so the probe
//!   keeps its `System` alive between ticks
//! - Disk usage is reported for a single mount point (`/` by default)

use super::SampleTime;
use crate::models::{MetricSample, GB};
use std::net::ToSocketAddrs;
use std::path::PathBuf;
use sysinfo::{Disks, System};
use tracing::debug;

/// Mount point whose usage is recorded
pub const DEFAULT_DISK_MOUNT: &str = "/";

/// Probe for the host half of a tick
pub struct HostProbe {
    system: System,
    disks: Disks,
    disk_mount: PathBuf,
    hostname: String,
}

impl HostProbe {
    /// Create a probe for this host
    pub fn new(hostname: impl Into<String>) -> Self {
        let mut system = System::new();
        // Prime the CPU counters so the first tick has a baseline
        system.refresh_cpu();

        Self {
            system,
            disks: Disks::new_with_refreshed_list(),
            disk_mount: PathBuf::from(DEFAULT_DISK_MOUNT),
            hostname: hostname.into(),
        }
    }

    /// Record disk usage for another mount point
    pub fn with_disk_mount(mut self, mount: impl Into<PathBuf>) -> Self {
        self.disk_mount = mount.into();
        self
    }

    /// Take one host sample stamped with `at`
    pub fn sample(&mut self, at: &SampleTime) -> MetricSample {
        self.system.refresh_cpu();
        self.system.refresh_memory();
        self.disks.refresh_list();

        let cpu_per_cpu: Vec<f64> = self
            .system
            .cpus()
            .iter()
            .map(|cpu| f64::from(cpu.cpu_usage()))
            .collect();
        let cpu_total = f64::from(self.system.global_cpu_info().cpu_usage());

        let mem_total = self.system.total_memory();
        let mem_available = self.system.available_memory();
        let swap_total = self.system.total_swap();
        let swap_used = self.system.used_swap();
        let (disk_total, disk_available) = self.disk_space();
        let load = System::load_average();

        MetricSample {
            cpu_avg: mean(&cpu_per_cpu),
            cpu_per_cpu,
            cpu_total,
            disk_total_gb: to_gb(disk_total),
            disk_percent: percent(disk_total.saturating_sub(disk_available), disk_total),
            mem_total_gb: to_gb(mem_total),
            mem_available_gb: to_gb(mem_available),
            mem_used_gb: to_gb(self.system.used_memory()),
            mem_percent: percent(mem_total.saturating_sub(mem_available), mem_total),
            swap_total_gb: to_gb(swap_total),
            swap_used_gb: to_gb(swap_used),
            swap_free_gb: to_gb(self.system.free_swap()),
            swap_percent: percent(swap_used, swap_total),
            loadavg_1: load.one,
            loadavg_5: load.five,
            loadavg_15: load.fifteen,
            hostname: self.hostname.clone(),
            ip: resolve_ip(&self.hostname).unwrap_or_default(),
            datetime: at.datetime.clone(),
            timestamp: at.timestamp,
        }
    }

    /// Total and available bytes of the configured mount, zero when not mounted
    fn disk_space(&self) -> (u64, u64) {
        self.disks
            .list()
            .iter()
            .find(|disk| disk.mount_point() == self.disk_mount.as_path())
            .map(|disk| (disk.total_space(), disk.available_space()))
            .unwrap_or_else(|| {
                debug!(mount = %self.disk_mount.display(), "Disk mount not found");
                (0, 0)
            })
    }
}

/// First IPv4 address the hostname resolves to
pub fn resolve_ip(hostname: &str) -> Option<String> {
    match (hostname, 0u16).to_socket_addrs() {
        Ok(mut addrs) => addrs.find(|a| a.is_ipv4()).map(|a| a.ip().to_string()),
        Err(e) => {
            debug!(hostname = %hostname, error = %e, "Could not resolve host address");
            None
        }
    }
}

fn to_gb(bytes: u64) -> f64 {
    bytes as f64 / GB
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
