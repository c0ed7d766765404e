//! Raw GPU table

use anyhow::Result;
use overseer_lib::view::{select_gpu_rows, Selection};
use overseer_lib::CollectedStats;
use tabled::Tabled;

use crate::output::{format_metric, format_timestamp, print_json, print_table, OutputFormat};

/// Row for the GPU table
#[derive(Tabled)]
struct GpuRow {
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Job")]
    job: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Index")]
    index: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "GPU %")]
    gpu_util: String,
    #[tabled(rename = "Mem %")]
    mem_util: String,
    #[tabled(rename = "Used MiB")]
    mem_used: String,
    #[tabled(rename = "Total MiB")]
    mem_total: String,
    #[tabled(rename = "Free MiB")]
    mem_free: String,
}

/// Show GPU rows of the selected hosts and jobs as recorded
pub fn show_gpu(stats: &CollectedStats, selection: &Selection, format: OutputFormat) -> Result<()> {
    let rows = select_gpu_rows(&stats.gpu, selection);

    match format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Table => {
            let rows: Vec<GpuRow> = rows
                .into_iter()
                .map(|r| GpuRow {
                    host: r.hostname.clone(),
                    job: r.job.clone(),
                    time: format_timestamp(r.row.timestamp),
                    index: r.row.index,
                    name: r.row.name.clone(),
                    gpu_util: format_metric(r.row.gpu_util_percent),
                    mem_util: format_metric(r.row.mem_util_percent),
                    mem_used: format_metric(r.row.mem_used_mib),
                    mem_total: format_metric(r.row.mem_total_mib),
                    mem_free: format_metric(r.row.mem_free_mib),
                })
                .collect();
            print_table(&rows);
        }
    }

    Ok(())
}
