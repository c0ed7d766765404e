//! Arrow encoding of host and GPU rows
//!
//! Each row kind declares a fixed schema; decoding checks every column by
//! name and type so a drifted file is reported instead of misread.

use crate::error::StoreError;
use crate::models::{columns::*, GpuSample, MetricSample};
use arrow::array::{
    Array, ArrayRef, Float64Array, Float64Builder, Int64Array, ListArray, ListBuilder,
    StringArray,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use std::path::Path;
use std::sync::Arc;

/// A fixed-schema row type that can be stored in a table file
pub trait TableRow: Sized + Clone {
    /// Short name used in logs ("system", "gpu")
    const KIND: &'static str;

    /// Schema of the table file
    fn schema() -> SchemaRef;

    /// Encode rows into a single record batch
    fn to_batch(rows: &[Self]) -> Result<RecordBatch, ArrowError>;

    /// Decode every row of a record batch read from `path`
    fn from_batch(batch: &RecordBatch, path: &Path) -> Result<Vec<Self>, StoreError>;
}

fn float_field(name: &str) -> Field {
    Field::new(name, DataType::Float64, false)
}

fn utf8_field(name: &str) -> Field {
    Field::new(name, DataType::Utf8, false)
}

fn typed_column<'a, T: Array + 'static>(
    batch: &'a RecordBatch,
    name: &str,
    expected: &str,
    path: &Path,
) -> Result<&'a T, StoreError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| StoreError::schema(path, name, "is missing"))?
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| StoreError::schema(path, name, format!("is not {expected}")))
}

fn f64_column<'a>(
    batch: &'a RecordBatch,
    name: &str,
    path: &Path,
) -> Result<&'a Float64Array, StoreError> {
    typed_column(batch, name, "Float64", path)
}

fn utf8_column<'a>(
    batch: &'a RecordBatch,
    name: &str,
    path: &Path,
) -> Result<&'a StringArray, StoreError> {
    typed_column(batch, name, "Utf8", path)
}

impl TableRow for MetricSample {
    const KIND: &'static str = "system";

    fn schema() -> SchemaRef {
        let per_cpu_item = Arc::new(Field::new("item", DataType::Float64, true));
        Arc::new(Schema::new(vec![
            Field::new(CPU_PER_CPU, DataType::List(per_cpu_item), false),
            float_field(CPU_TOTAL),
            float_field(CPU_AVG),
            float_field(DISK_TOTAL),
            float_field(DISK_PERCENT),
            float_field(MEM_TOTAL),
            float_field(MEM_AVAILABLE),
            float_field(MEM_USED),
            float_field(MEM_PERCENT),
            float_field(SWAP_TOTAL),
            float_field(SWAP_USED),
            float_field(SWAP_FREE),
            float_field(SWAP_PERCENT),
            float_field(LOADAVG_1),
            float_field(LOADAVG_5),
            float_field(LOADAVG_15),
            utf8_field(HOSTNAME),
            utf8_field(IP),
            utf8_field(DATETIME),
            float_field(TIMESTAMP),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch, ArrowError> {
        let mut per_cpu = ListBuilder::new(Float64Builder::new());
        for row in rows {
            per_cpu.values().append_slice(&row.cpu_per_cpu);
            per_cpu.append(true);
        }

        let floats = |get: fn(&MetricSample) -> f64| -> ArrayRef {
            Arc::new(Float64Array::from_iter_values(rows.iter().map(get)))
        };
        let strings = |get: fn(&MetricSample) -> &str| -> ArrayRef {
            Arc::new(StringArray::from_iter_values(rows.iter().map(get)))
        };

        let columns: Vec<ArrayRef> = vec![
            Arc::new(per_cpu.finish()),
            floats(|r| r.cpu_total),
            floats(|r| r.cpu_avg),
            floats(|r| r.disk_total_gb),
            floats(|r| r.disk_percent),
            floats(|r| r.mem_total_gb),
            floats(|r| r.mem_available_gb),
            floats(|r| r.mem_used_gb),
            floats(|r| r.mem_percent),
            floats(|r| r.swap_total_gb),
            floats(|r| r.swap_used_gb),
            floats(|r| r.swap_free_gb),
            floats(|r| r.swap_percent),
            floats(|r| r.loadavg_1),
            floats(|r| r.loadavg_5),
            floats(|r| r.loadavg_15),
            strings(|r| r.hostname.as_str()),
            strings(|r| r.ip.as_str()),
            strings(|r| r.datetime.as_str()),
            floats(|r| r.timestamp),
        ];

        RecordBatch::try_new(Self::schema(), columns)
    }

    fn from_batch(batch: &RecordBatch, path: &Path) -> Result<Vec<Self>, StoreError> {
        let per_cpu: &ListArray = typed_column(batch, CPU_PER_CPU, "List<Float64>", path)?;
        let cpu_total = f64_column(batch, CPU_TOTAL, path)?;
        let cpu_avg = f64_column(batch, CPU_AVG, path)?;
        let disk_total = f64_column(batch, DISK_TOTAL, path)?;
        let disk_percent = f64_column(batch, DISK_PERCENT, path)?;
        let mem_total = f64_column(batch, MEM_TOTAL, path)?;
        let mem_available = f64_column(batch, MEM_AVAILABLE, path)?;
        let mem_used = f64_column(batch, MEM_USED, path)?;
        let mem_percent = f64_column(batch, MEM_PERCENT, path)?;
        let swap_total = f64_column(batch, SWAP_TOTAL, path)?;
        let swap_used = f64_column(batch, SWAP_USED, path)?;
        let swap_free = f64_column(batch, SWAP_FREE, path)?;
        let swap_percent = f64_column(batch, SWAP_PERCENT, path)?;
        let loadavg_1 = f64_column(batch, LOADAVG_1, path)?;
        let loadavg_5 = f64_column(batch, LOADAVG_5, path)?;
        let loadavg_15 = f64_column(batch, LOADAVG_15, path)?;
        let hostname = utf8_column(batch, HOSTNAME, path)?;
        let ip = utf8_column(batch, IP, path)?;
        let datetime = utf8_column(batch, DATETIME, path)?;
        let timestamp = f64_column(batch, TIMESTAMP, path)?;

        (0..batch.num_rows())
            .map(|i| {
                let cores = per_cpu.value(i);
                let cores = cores.as_any().downcast_ref::<Float64Array>().ok_or_else(|| {
                    StoreError::schema(path, CPU_PER_CPU, "has non-Float64 items")
                })?;

                Ok(MetricSample {
                    cpu_per_cpu: cores.values().to_vec(),
                    cpu_total: cpu_total.value(i),
                    cpu_avg: cpu_avg.value(i),
                    disk_total_gb: disk_total.value(i),
                    disk_percent: disk_percent.value(i),
                    mem_total_gb: mem_total.value(i),
                    mem_available_gb: mem_available.value(i),
                    mem_used_gb: mem_used.value(i),
                    mem_percent: mem_percent.value(i),
                    swap_total_gb: swap_total.value(i),
                    swap_used_gb: swap_used.value(i),
                    swap_free_gb: swap_free.value(i),
                    swap_percent: swap_percent.value(i),
                    loadavg_1: loadavg_1.value(i),
                    loadavg_5: loadavg_5.value(i),
                    loadavg_15: loadavg_15.value(i),
                    hostname: hostname.value(i).to_string(),
                    ip: ip.value(i).to_string(),
                    datetime: datetime.value(i).to_string(),
                    timestamp: timestamp.value(i),
                })
            })
            .collect()
    }
}

impl TableRow for GpuSample {
    const KIND: &'static str = "gpu";

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new(GPU_INDEX, DataType::Int64, false),
            utf8_field(GPU_NAME),
            float_field(GPU_UTIL),
            float_field(GPU_MEM_UTIL),
            float_field(GPU_MEM_USED),
            float_field(GPU_MEM_TOTAL),
            float_field(GPU_MEM_FREE),
            float_field(TIMESTAMP),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch, ArrowError> {
        let floats = |get: fn(&GpuSample) -> f64| -> ArrayRef {
            Arc::new(Float64Array::from_iter_values(rows.iter().map(get)))
        };

        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.index))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| &r.name))),
            floats(|r| r.gpu_util_percent),
            floats(|r| r.mem_util_percent),
            floats(|r| r.mem_used_mib),
            floats(|r| r.mem_total_mib),
            floats(|r| r.mem_free_mib),
            floats(|r| r.timestamp),
        ];

        RecordBatch::try_new(Self::schema(), columns)
    }

    fn from_batch(batch: &RecordBatch, path: &Path) -> Result<Vec<Self>, StoreError> {
        let index: &Int64Array = typed_column(batch, GPU_INDEX, "Int64", path)?;
        let name = utf8_column(batch, GPU_NAME, path)?;
        let gpu_util = f64_column(batch, GPU_UTIL, path)?;
        let mem_util = f64_column(batch, GPU_MEM_UTIL, path)?;
        let mem_used = f64_column(batch, GPU_MEM_USED, path)?;
        let mem_total = f64_column(batch, GPU_MEM_TOTAL, path)?;
        let mem_free = f64_column(batch, GPU_MEM_FREE, path)?;
        let timestamp = f64_column(batch, TIMESTAMP, path)?;

        Ok((0..batch.num_rows())
            .map(|i| GpuSample {
                index: index.value(i),
                name: name.value(i).to_string(),
                gpu_util_percent: gpu_util.value(i),
                mem_util_percent: mem_util.value(i),
                mem_used_mib: mem_used.value(i),
                mem_total_mib: mem_total.value(i),
                mem_free_mib: mem_free.value(i),
                timestamp: timestamp.value(i),
            })
            .collect())
    }
}
