//! Host and job overview

use anyhow::Result;
use colored::Colorize;
use overseer_lib::aggregate::RunSummary;
use overseer_lib::view::Selection;
use overseer_lib::CollectedStats;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use tabled::Tabled;

use crate::output::{format_timestamp, print_json, print_table, print_warning, OutputFormat};

/// Row for the hosts table
#[derive(Tabled)]
struct RunRow {
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Job")]
    job: String,
    #[tabled(rename = "Host rows")]
    system_rows: usize,
    #[tabled(rename = "GPU rows")]
    gpu_rows: usize,
    #[tabled(rename = "First sample")]
    first: String,
    #[tabled(rename = "Last sample")]
    last: String,
}

impl From<&RunSummary> for RunRow {
    fn from(run: &RunSummary) -> Self {
        let when = |ts: Option<f64>| ts.map(format_timestamp).unwrap_or_else(|| "-".to_string());
        Self {
            host: run.host.clone(),
            job: run.job.clone(),
            system_rows: run.system_rows,
            gpu_rows: run.gpu_rows,
            first: when(run.first_timestamp),
            last: when(run.last_timestamp),
        }
    }
}

#[derive(Serialize)]
struct HostsReport<'a> {
    root: &'a Path,
    hostnames: BTreeSet<String>,
    slurm_jobs: &'a BTreeSet<String>,
    runs: Vec<RunSummary>,
}

/// Show every host/job pair under the stats root
pub fn show_hosts(
    root: &Path,
    stats: &CollectedStats,
    selection: &Selection,
    format: OutputFormat,
) -> Result<()> {
    let runs: Vec<RunSummary> = stats
        .run_summaries()
        .into_iter()
        .filter(|r| selection.includes_host(&r.host) && selection.includes_job(&r.job))
        .collect();

    match format {
        OutputFormat::Json => print_json(&HostsReport {
            root,
            hostnames: runs.iter().map(|r| r.host.clone()).collect(),
            slurm_jobs: &stats.slurm_jobs,
            runs,
        })?,
        OutputFormat::Table => {
            if stats.is_empty() {
                print_warning(&format!("No stats found under {}", root.display()));
                return Ok(());
            }

            println!("{}", "Overseer Stats".bold());
            println!("{}", "=".repeat(50));
            println!("Root:                   {}", root.display().to_string().cyan());
            println!("Hosts:                  {}", stats.hostnames.len());
            if !stats.slurm_jobs.is_empty() {
                let jobs: Vec<&str> = stats.slurm_jobs.iter().map(String::as_str).collect();
                println!("Scheduler jobs:         {}", jobs.join(", "));
            }
            println!();

            let rows: Vec<RunRow> = runs.iter().map(RunRow::from).collect();
            print_table(&rows);
        }
    }

    Ok(())
}
