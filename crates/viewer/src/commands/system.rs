//! Host metric panels

use anyhow::Result;
use colored::Colorize;
use overseer_lib::view::{build_panels, Facet, Panel, Selection};
use overseer_lib::CollectedStats;
use tabled::Tabled;

use crate::output::{format_value, print_json, print_table, print_warning, sparkline, OutputFormat};

/// Row for one host line of a facet
#[derive(Tabled)]
struct LineRow {
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Samples")]
    samples: usize,
    #[tabled(rename = "Latest")]
    latest: String,
    #[tabled(rename = "Min")]
    min: String,
    #[tabled(rename = "Max")]
    max: String,
    #[tabled(rename = "Mean")]
    mean: String,
    #[tabled(rename = "Trend")]
    trend: String,
}

fn facet_rows(facet: &Facet, width: usize) -> Vec<LineRow> {
    let range = facet.y_range();
    facet
        .lines
        .iter()
        .map(|line| {
            let values: Vec<f64> = line.points.iter().map(|p| p.value).collect();
            LineRow {
                host: line.host.clone(),
                samples: line.stats.samples,
                latest: format_value(line.stats.latest),
                min: format_value(line.stats.min),
                max: format_value(line.stats.max),
                mean: format_value(line.stats.mean),
                trend: sparkline(&values, range, width),
            }
        })
        .collect()
}

fn print_panel(panel: &Panel, width: usize) {
    let title = format!("{} · {}", panel.family, panel.unit);
    println!("{}", title.bold());
    println!("{}", "=".repeat(50));

    for facet in &panel.facets {
        println!("{}", facet.metric.cyan());
        print_table(&facet_rows(facet, width));
    }
    println!();
}

/// Show one panel per selected family and unit
pub fn show_system(
    stats: &CollectedStats,
    selection: &Selection,
    width: usize,
    format: OutputFormat,
) -> Result<()> {
    let panels = build_panels(&stats.system, selection);

    match format {
        OutputFormat::Json => print_json(&panels)?,
        OutputFormat::Table => {
            if panels.is_empty() {
                print_warning("No host metrics match the selection");
                return Ok(());
            }
            for panel in &panels {
                print_panel(panel, width);
            }
        }
    }

    Ok(())
}
