//! Stats tree aggregation
//!
//! Walks a stats root for the two supported layouts:
//! - `<root>/<host>/{system,gpu}.feather` (local runs, job `local`)
//! - `<root>/<host>/slurm_*/{system,gpu}.feather` (job-scoped runs)
//!
//! and concatenates every table into one labelled table per kind. Nothing is
//! cached: each call re-reads the whole tree.

use crate::models::{GpuSample, MetricSample};
use crate::scope::{JobScope, GPU_FILE, LOCAL_JOB, SCOPE_DIR_PREFIX, SYSTEM_FILE};
use crate::store::{read_table, TableRow};
use glob::{glob, Pattern};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A row tagged with the host and job it was recorded under
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Labeled<T> {
    /// Host directory the row was read from
    #[serde(rename = "host")]
    pub hostname: String,
    /// `local` or the job-scope directory name
    pub job: String,
    #[serde(flatten)]
    pub row: T,
}

/// Everything found under a stats root
#[derive(Debug, Clone, Default)]
pub struct CollectedStats {
    pub system: Vec<Labeled<MetricSample>>,
    pub gpu: Vec<Labeled<GpuSample>>,
    pub hostnames: BTreeSet<String>,
    /// Scheduler job ids of every job-scoped table
    pub slurm_jobs: BTreeSet<String>,
}

/// Row counts and time span of one host/job pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub host: String,
    pub job: String,
    pub system_rows: usize,
    pub gpu_rows: usize,
    pub first_timestamp: Option<f64>,
    pub last_timestamp: Option<f64>,
}

impl CollectedStats {
    pub fn is_empty(&self) -> bool {
        self.system.is_empty() && self.gpu.is_empty()
    }

    /// One summary per host/job pair, sorted by host then job
    pub fn run_summaries(&self) -> Vec<RunSummary> {
        let mut runs: BTreeMap<(String, String), RunSummary> = BTreeMap::new();

        for r in &self.system {
            let run = run_entry(&mut runs, &r.hostname, &r.job);
            run.system_rows += 1;
            let ts = r.row.timestamp;
            run.first_timestamp = Some(run.first_timestamp.map_or(ts, |t| t.min(ts)));
            run.last_timestamp = Some(run.last_timestamp.map_or(ts, |t| t.max(ts)));
        }
        for r in &self.gpu {
            run_entry(&mut runs, &r.hostname, &r.job).gpu_rows += 1;
        }

        runs.into_values().collect()
    }

    fn note_source(&mut self, table: &TableLocation) {
        self.hostnames.insert(table.hostname.clone());
        if table.job == LOCAL_JOB {
            return;
        }
        match JobScope::parse_dir_name(&table.job) {
            Some(scope) => {
                self.slurm_jobs.insert(scope.job_id);
            }
            None => warn!(
                dir = %table.job,
                path = %table.path.display(),
                "Job directory does not match slurm_J<job>_N<node>_L<local>_P<proc>"
            ),
        }
    }
}

fn run_entry<'a>(
    runs: &'a mut BTreeMap<(String, String), RunSummary>,
    host: &str,
    job: &str,
) -> &'a mut RunSummary {
    runs.entry((host.to_string(), job.to_string()))
        .or_insert_with(|| RunSummary {
            host: host.to_string(),
            job: job.to_string(),
            system_rows: 0,
            gpu_rows: 0,
            first_timestamp: None,
            last_timestamp: None,
        })
}

/// A table file and the identity recovered from its path
#[derive(Debug, Clone)]
struct TableLocation {
    path: PathBuf,
    hostname: String,
    job: String,
}

/// Load every host and GPU table under `root`.
///
/// Files that cannot be read are skipped. A missing root yields an empty result.
pub fn collect(root: &Path) -> CollectedStats {
    let mut stats = CollectedStats::default();

    for scoped in [false, true] {
        for table in locate(root, SYSTEM_FILE, scoped) {
            if let Some(rows) = load::<MetricSample>(&table) {
                stats.note_source(&table);
                stats.system.extend(rows);
            }
        }
        for table in locate(root, GPU_FILE, scoped) {
            if let Some(rows) = load::<GpuSample>(&table) {
                stats.note_source(&table);
                stats.gpu.extend(rows);
            }
        }
    }

    debug!(
        root = %root.display(),
        system_rows = stats.system.len(),
        gpu_rows = stats.gpu.len(),
        hosts = stats.hostnames.len(),
        "Collected stats"
    );
    stats
}

fn locate(root: &Path, file_name: &str, scoped: bool) -> Vec<TableLocation> {
    let Some(root_str) = root.to_str() else {
        warn!(root = %root.display(), "Stats root is not valid UTF-8");
        return Vec::new();
    };

    let pattern = if scoped {
        format!(
            "{}/*/{SCOPE_DIR_PREFIX}*/{file_name}",
            Pattern::escape(root_str)
        )
    } else {
        format!("{}/*/{file_name}", Pattern::escape(root_str))
    };

    let paths = match glob(&pattern) {
        Ok(paths) => paths,
        Err(e) => {
            warn!(pattern = %pattern, error = %e, "Invalid stats glob");
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = paths.filter_map(|p| p.ok()).collect();
    files.sort();

    files
        .into_iter()
        .filter_map(|path| {
            let dir = path.parent()?;
            let (host_dir, job) = if scoped {
                (dir.parent()?, dir_name(dir)?)
            } else {
                (dir, LOCAL_JOB.to_string())
            };
            Some(TableLocation {
                hostname: dir_name(host_dir)?,
                job,
                path,
            })
        })
        .collect()
}

fn dir_name(dir: &Path) -> Option<String> {
    dir.file_name().map(|n| n.to_string_lossy().into_owned())
}

fn load<R: TableRow>(table: &TableLocation) -> Option<Vec<Labeled<R>>> {
    match read_table::<R>(&table.path) {
        Ok(rows) => Some(
            rows.into_iter()
                .map(|row| Labeled {
                    hostname: table.hostname.clone(),
                    job: table.job.clone(),
                    row,
                })
                .collect(),
        ),
        Err(e) => {
            debug!(path = %table.path.display(), error = %e, "Skipping unreadable table");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labeled_row_serializes_flat() {
        let row = Labeled {
            hostname: "hostA".to_string(),
            job: LOCAL_JOB.to_string(),
            row: GpuSample {
                index: 1,
                name: "A100".to_string(),
                gpu_util_percent: f64::NAN,
                mem_util_percent: 5.0,
                mem_used_mib: 10.0,
                mem_total_mib: 20.0,
                mem_free_mib: 10.0,
                timestamp: 1.5,
            },
        };

        let json = serde_json::to_value(&row).unwrap();

        assert_eq!(json["host"], "hostA");
        assert_eq!(json["job"], "local");
        assert_eq!(json["index"], 1);
        assert!(json["gpu_util (%)"].is_null());
        assert_eq!(json["mem_used (MiB)"], 10.0);
    }

    #[test]
    fn test_locate_labels_scoped_tables() {
        let root = tempfile::TempDir::new().unwrap();
        let scoped = root.path().join("hostA").join("slurm_J3_N0_L1_P2");
        std::fs::create_dir_all(&scoped).unwrap();
        std::fs::write(scoped.join(SYSTEM_FILE), b"").unwrap();
        std::fs::write(root.path().join("hostA").join(SYSTEM_FILE), b"").unwrap();

        let local = locate(root.path(), SYSTEM_FILE, false);
        let jobs = locate(root.path(), SYSTEM_FILE, true);

        assert_eq!(local.len(), 1);
        assert_eq!(local[0].job, LOCAL_JOB);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].hostname, "hostA");
        assert_eq!(jobs[0].job, "slurm_J3_N0_L1_P2");
    }
}
