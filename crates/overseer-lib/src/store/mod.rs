//! Per-host table files
//!
//! Every table is a single Arrow IPC file. Appending loads the whole file,
//! concatenates the new rows and rewrites the file, so each tick costs
//! O(rows so far). There is no locking: one recorder owns one directory.

mod codec;


pub use codec::TableRow;

use crate::error::StoreError;
use crate::models::{GpuSample, MetricSample, Tick};
use crate::scope::StatsLayout;
use arrow::error::ArrowError;
use arrow::ipc::reader::FileReader;
use arrow::ipc::writer::FileWriter;
use arrow::record_batch::RecordBatch;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::Path;
use tracing::debug;

/// How a table file is replaced on append
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Truncate and rewrite the file where it is; a crash mid-write can
    /// leave a truncated table behind
    #[default]
    InPlace,
    /// Write a sibling temp file and rename it over the table
    Durable,
}

/// Result of appending rows to one table file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    /// Whether the file existed before this append
    pub existed: bool,
    /// Rows already in the file
    pub previous_rows: usize,
    /// Rows added by this append
    pub appended_rows: usize,
}

impl AppendOutcome {
    pub fn total_rows(&self) -> usize {
        self.previous_rows + self.appended_rows
    }
}

/// Result of persisting one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    pub system: AppendOutcome,
    /// `None` when the tick carried no GPU rows and the GPU table was untouched
    pub gpu: Option<AppendOutcome>,
}

/// Reader/writer for the table files of a stats directory
#[derive(Debug, Clone, Default)]
pub struct TableStore {
    mode: WriteMode,
}

impl TableStore {
    pub fn new(mode: WriteMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    /// Persist one tick into `dir/system.feather` and, when GPU rows were
    /// sampled, `dir/gpu.feather`
    pub fn append_tick(&self, dir: &Path, tick: &Tick) -> Result<TickOutcome, StoreError> {
        let system = self.append(
            &StatsLayout::system_file(dir),
            std::slice::from_ref(&tick.system),
        )?;

        let gpu = match &tick.gpu {
            Some(rows) => Some(self.append::<GpuSample>(&StatsLayout::gpu_file(dir), rows)?),
            None => None,
        };

        Ok(TickOutcome { system, gpu })
    }

    /// Append rows to a table file, creating it when absent
    pub fn append<R: TableRow>(
        &self,
        path: &Path,
        rows: &[R],
    ) -> Result<AppendOutcome, StoreError> {
        let existed = path.exists();
        let mut all_rows = if existed {
            read_table::<R>(path)?
        } else {
            Vec::with_capacity(rows.len())
        };
        let previous_rows = all_rows.len();

        debug!(
            table = R::KIND,
            path = %path.display(),
            existed,
            previous_rows,
            new_rows = rows.len(),
            "Rewriting table"
        );

        all_rows.extend_from_slice(rows);
        self.write_table(path, &all_rows)?;

        Ok(AppendOutcome {
            existed,
            previous_rows,
            appended_rows: rows.len(),
        })
    }

    /// Replace the file at `path` with exactly `rows`
    pub fn write_table<R: TableRow>(&self, path: &Path, rows: &[R]) -> Result<(), StoreError> {
        let batch = R::to_batch(rows).map_err(|e| StoreError::arrow(path, e))?;

        match self.mode {
            WriteMode::InPlace => {
                let file = File::create(path).map_err(|e| StoreError::io(path, e))?;
                encode_batch(file, &batch).map_err(|e| StoreError::arrow(path, e))?;
            }
            WriteMode::Durable => {
                let dir = path.parent().unwrap_or_else(|| Path::new("."));
                // Created like `File::create` so a new table gets the umask default
                let tmp = tempfile::Builder::new()
                    .prefix(".")
                    .make_in(dir, |p| {
                        OpenOptions::new().write(true).create_new(true).open(p)
                    })
                    .map_err(|e| StoreError::io(dir, e))?;
                if let Ok(existing) = fs::metadata(path) {
                    fs::set_permissions(tmp.path(), existing.permissions())
                        .map_err(|e| StoreError::io(tmp.path(), e))?;
                }
                let file = encode_batch(tmp.as_file(), &batch)
                    .map_err(|e| StoreError::arrow(tmp.path(), e))?;
                file.sync_all().map_err(|e| StoreError::io(tmp.path(), e))?;
                tmp.persist(path).map_err(|e| StoreError::io(path, e.error))?;
            }
        }

        Ok(())
    }
}

/// Load every row of a table file
pub fn read_table<R: TableRow>(path: &Path) -> Result<Vec<R>, StoreError> {
    let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
    let reader =
        FileReader::try_new(BufReader::new(file), None).map_err(|e| StoreError::arrow(path, e))?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|e| StoreError::arrow(path, e))?;
        rows.extend(R::from_batch(&batch, path)?);
    }
    Ok(rows)
}

/// Load the host table of a stats directory
pub fn read_system_table(dir: &Path) -> Result<Vec<MetricSample>, StoreError> {
    read_table(&StatsLayout::system_file(dir))
}

/// Load the GPU table of a stats directory
pub fn read_gpu_table(dir: &Path) -> Result<Vec<GpuSample>, StoreError> {
    read_table(&StatsLayout::gpu_file(dir))
}

fn encode_batch<W: Write>(sink: W, batch: &RecordBatch) -> Result<W, ArrowError> {
    let mut writer = FileWriter::try_new(sink, &batch.schema())?;
    writer.write(batch)?;
    writer.finish()?;
    writer.into_inner()
}
