//! GPU metrics through the `nvidia-smi` query interface
//!
//! A missing tool, a non-zero exit or unparsable output all mean "no GPU
//! data this tick". None of them is an error for the caller.

use crate::error::GpuParseError;
use crate::models::GpuSample;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, warn};

/// Default GPU query program, looked up on `PATH`
pub const DEFAULT_GPU_QUERY_BIN: &str = "nvidia-smi";

/// Fields requested from the query tool, in column order
pub const GPU_QUERY_FIELDS: &str =
    "index,gpu_name,utilization.gpu,utilization.memory,memory.used,memory.total,memory.free";

const FIELD_COUNT: usize = 7;

/// External GPU query invocation
#[derive(Debug, Clone)]
pub struct GpuQuery {
    program: PathBuf,
}

impl Default for GpuQuery {
    fn default() -> Self {
        Self::new(DEFAULT_GPU_QUERY_BIN)
    }
}

impl GpuQuery {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Arguments passed to the query tool
    pub fn args() -> [String; 2] {
        [
            format!("--query-gpu={GPU_QUERY_FIELDS}"),
            "--format=csv,noheader,nounits".to_string(),
        ]
    }

    /// Run the query tool and parse one row per GPU.
    ///
    /// Blocks until the tool exits; there is no timeout.
    pub async fn query(&self, timestamp: f64) -> Option<Vec<GpuSample>> {
        let output = match Command::new(&self.program).args(Self::args()).output().await {
            Ok(output) => output,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(program = %self.program.display(), "GPU query tool not found");
                return None;
            }
            Err(e) => {
                warn!(program = %self.program.display(), error = %e, "Failed to run GPU query tool");
                return None;
            }
        };

        if !output.status.success() {
            debug!(
                program = %self.program.display(),
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "GPU query tool exited with failure"
            );
            return None;
        }

        match parse_gpu_csv(&String::from_utf8_lossy(&output.stdout), timestamp) {
            Ok(rows) if rows.is_empty() => {
                debug!("GPU query tool reported no devices");
                None
            }
            Ok(rows) => Some(rows),
            Err(e) => {
                warn!(error = %e, "Unparsable GPU query output");
                None
            }
        }
    }
}

/// Parse `csv,noheader,nounits` output into GPU rows.
///
/// Metric values the tool cannot report (`[N/A]`, `[Not Supported]`) become NaN.
pub fn parse_gpu_csv(output: &str, timestamp: f64) -> Result<Vec<GpuSample>, GpuParseError> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| parse_gpu_line(line, timestamp))
        .collect()
}

fn parse_gpu_line(line: &str, timestamp: f64) -> Result<GpuSample, GpuParseError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != FIELD_COUNT {
        return Err(GpuParseError::FieldCount {
            expected: FIELD_COUNT,
            found: fields.len(),
            line: line.to_string(),
        });
    }

    let index = fields[0]
        .parse()
        .map_err(|_| GpuParseError::Index(fields[0].to_string()))?;
    let metric = |s: &str| s.parse::<f64>().unwrap_or(f64::NAN);

    Ok(GpuSample {
        index,
        name: fields[1].to_string(),
        gpu_util_percent: metric(fields[2]),
        mem_util_percent: metric(fields[3]),
        mem_used_mib: metric(fields[4]),
        mem_total_mib: metric(fields[5]),
        mem_free_mib: metric(fields[6]),
        timestamp,
    })
}
