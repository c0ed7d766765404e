//! Job scope and stats tree layout
//!
//! Tables live at `<root>/<hostname>/[slurm_J<job>_N<node>_L<local>_P<proc>/]{system,gpu}.feather`.
//! The path is the only link between a table and the host/job that wrote it.

use crate::error::SampleError;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// File name of the host table inside a stats directory
pub const SYSTEM_FILE: &str = "system.feather";
/// File name of the GPU table inside a stats directory
pub const GPU_FILE: &str = "gpu.feather";
/// Job label for rows written outside a scheduler job
pub const LOCAL_JOB: &str = "local";
/// Prefix shared by every job-scope directory
pub const SCOPE_DIR_PREFIX: &str = "slurm_";

pub const ENV_JOB_ID: &str = "SLURM_JOB_ID";
pub const ENV_NODE_ID: &str = "SLURM_NODEID";
pub const ENV_LOCAL_ID: &str = "SLURM_LOCALID";
pub const ENV_PROC_ID: &str = "SLURM_PROCID";

fn scope_dir_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^slurm_J([0-9]+)_N([0-9]+)_L([0-9]+)_P([0-9]+)$")
            .expect("Failed to compile scope directory pattern")
    })
}

/// Scheduler identity of the sampling process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobScope {
    pub job_id: String,
    pub node_id: String,
    pub local_id: String,
    pub proc_id: String,
}

impl JobScope {
    /// Resolve the scope from the process environment.
    ///
    /// Returns `None` when no job id is set, i.e. the run is local.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve the scope from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let job_id = lookup(ENV_JOB_ID).filter(|v| !v.is_empty())?;
        let or_zero = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "0".to_string())
        };

        Some(Self {
            job_id,
            node_id: or_zero(ENV_NODE_ID),
            local_id: or_zero(ENV_LOCAL_ID),
            proc_id: or_zero(ENV_PROC_ID),
        })
    }

    /// Directory name encoding this scope
    pub fn dir_name(&self) -> String {
        format!(
            "slurm_J{}_N{}_L{}_P{}",
            self.job_id, self.node_id, self.local_id, self.proc_id
        )
    }

    /// Parse a job-scope directory name back into a scope
    pub fn parse_dir_name(name: &str) -> Option<Self> {
        let caps = scope_dir_regex().captures(name)?;
        Some(Self {
            job_id: caps[1].to_string(),
            node_id: caps[2].to_string(),
            local_id: caps[3].to_string(),
            proc_id: caps[4].to_string(),
        })
    }
}

impl fmt::Display for JobScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dir_name())
    }
}

/// Identity of a recorder process, resolved once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub hostname: String,
    pub scope: Option<JobScope>,
}

impl RunContext {
    /// Resolve hostname and job scope from the running host
    pub fn detect() -> Result<Self, SampleError> {
        Ok(Self {
            hostname: local_hostname()?,
            scope: JobScope::from_env(),
        })
    }

    /// Job label this run's rows will carry in the viewer
    pub fn job_label(&self) -> String {
        self.scope
            .as_ref()
            .map(JobScope::dir_name)
            .unwrap_or_else(|| LOCAL_JOB.to_string())
    }
}

/// Hostname of the machine, as reported by the OS
pub fn local_hostname() -> Result<String, SampleError> {
    hostname::get()
        .map_err(SampleError::Hostname)?
        .into_string()
        .map_err(|_| SampleError::HostnameEncoding)
}

/// Path arithmetic over a stats root
#[derive(Debug, Clone)]
pub struct StatsLayout {
    root: PathBuf,
}

impl StatsLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory owned by one recorder process
    pub fn run_dir(&self, ctx: &RunContext) -> PathBuf {
        let host_dir = self.root.join(&ctx.hostname);
        match &ctx.scope {
            Some(scope) => host_dir.join(scope.dir_name()),
            None => host_dir,
        }
    }

    pub fn system_file(dir: &Path) -> PathBuf {
        dir.join(SYSTEM_FILE)
    }

    pub fn gpu_file(dir: &Path) -> PathBuf {
        dir.join(GPU_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_scope_absent_without_job_id() {
        let scope = JobScope::from_lookup(lookup(&[(ENV_NODE_ID, "3")]));
        assert!(scope.is_none());
    }

    #[test]
    fn test_scope_dir_name() {
        let scope = JobScope::from_lookup(lookup(&[
            (ENV_JOB_ID, "4242"),
            (ENV_NODE_ID, "1"),
            (ENV_LOCAL_ID, "2"),
            (ENV_PROC_ID, "3"),
        ]))
        .unwrap();

        assert_eq!(scope.dir_name(), "slurm_J4242_N1_L2_P3");
        assert_eq!(JobScope::parse_dir_name("slurm_J4242_N1_L2_P3"), Some(scope));
    }

    #[test]
    fn test_scope_missing_ids_default_to_zero() {
        let scope = JobScope::from_lookup(lookup(&[(ENV_JOB_ID, "7")])).unwrap();
        assert_eq!(scope.dir_name(), "slurm_J7_N0_L0_P0");
    }

    #[test]
    fn test_parse_dir_name_rejects_other_names() {
        assert!(JobScope::parse_dir_name("slurm_foo").is_none());
        assert!(JobScope::parse_dir_name("slurm_J1_N0_L0").is_none());
        assert!(JobScope::parse_dir_name("xslurm_J1_N0_L0_P0").is_none());
    }

    #[test]
    fn test_run_dir_layout() {
        let layout = StatsLayout::new("/stats");
        let local = RunContext {
            hostname: "node01".to_string(),
            scope: None,
        };
        assert_eq!(layout.run_dir(&local), PathBuf::from("/stats/node01"));
        assert_eq!(local.job_label(), "local");

        let scoped = RunContext {
            hostname: "node01".to_string(),
            scope: JobScope::parse_dir_name("slurm_J9_N0_L1_P2"),
        };
        assert_eq!(
            layout.run_dir(&scoped),
            PathBuf::from("/stats/node01/slurm_J9_N0_L1_P2")
        );
        assert_eq!(scoped.job_label(), "slurm_J9_N0_L1_P2");
        assert_eq!(
            StatsLayout::system_file(&layout.run_dir(&scoped)),
            PathBuf::from("/stats/node01/slurm_J9_N0_L1_P2/system.feather")
        );
    }
}
