//! Output formatting utilities

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::ValueEnum;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use tabled::{settings::Style, Table, Tabled};

/// Output format for viewer commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Sparkline glyphs from lowest to highest
const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Print rows as a rounded table, or a notice when there are none
pub fn print_table<T: Tabled>(rows: &[T]) {
    if rows.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print any value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Format an optional metric value with two decimals
pub fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    }
}

/// Format a NaN-able metric value with two decimals
pub fn format_metric(value: f64) -> String {
    format_value((!value.is_nan()).then_some(value))
}

/// Format epoch seconds as local time
pub fn format_timestamp(ts: f64) -> String {
    let micros = (ts * 1_000_000.0).round() as i64;
    match DateTime::from_timestamp_micros(micros) {
        Some(dt) => dt
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => ts.to_string(),
    }
}

/// Render values as a sparkline at most `width` glyphs wide.
///
/// `range` is the y-scale shared with sibling lines; NaN buckets render blank.
pub fn sparkline(values: &[f64], range: Option<(f64, f64)>, width: usize) -> String {
    let Some((lo, hi)) = range else {
        return " ".repeat(values.len().min(width));
    };
    if width == 0 {
        return String::new();
    }

    bucket_means(values, width)
        .into_iter()
        .map(|v| {
            if v.is_nan() {
                ' '
            } else if hi <= lo {
                SPARK_LEVELS[SPARK_LEVELS.len() / 2]
            } else {
                let top = (SPARK_LEVELS.len() - 1) as f64;
                let level = ((v - lo) / (hi - lo) * top).round().clamp(0.0, top);
                SPARK_LEVELS[level as usize]
            }
        })
        .collect()
}

/// Average consecutive values down to at most `width` buckets
fn bucket_means(values: &[f64], width: usize) -> Vec<f64> {
    if values.len() <= width {
        return values.to_vec();
    }

    (0..width)
        .map(|b| {
            let start = b * values.len() / width;
            let end = (b + 1) * values.len() / width;
            let finite: Vec<f64> = values[start..end]
                .iter()
                .copied()
                .filter(|v| !v.is_nan())
                .collect();
            if finite.is_empty() {
                f64::NAN
            } else {
                finite.iter().sum::<f64>() / finite.len() as f64
            }
        })
        .collect()
}
