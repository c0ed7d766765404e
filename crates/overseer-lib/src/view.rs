//! Chart model for the viewer
//!
//! Host metrics are grouped into panels by family (the name up to the first
//! `_`) and unit (inferred from the name). Each panel holds one facet per
//! metric and each facet one line per host.

use crate::aggregate::Labeled;
use crate::error::NodeListError;
use crate::models::{GpuSample, MetricSample};
use crate::nodelist::parse_nodelist;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Metric grouping derived from the name prefix.
///
/// Orders as cpu, mem, swap, disk, then every other name (`NA` included)
/// by byte order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetricFamily {
    Cpu,
    Mem,
    Swap,
    Disk,
    /// Any other prefix, e.g. `loadavg`
    Other(String),
    /// Names without an underscore
    Ungrouped,
}

impl MetricFamily {
    /// Family of a column name
    pub fn of(metric: &str) -> Self {
        match metric.split_once('_') {
            Some((prefix, _)) => Self::from_prefix(prefix),
            None => Self::Ungrouped,
        }
    }

    /// Family named by a filter argument such as `cpu` or `NA`
    pub fn from_prefix(prefix: &str) -> Self {
        match prefix {
            "cpu" => Self::Cpu,
            "mem" => Self::Mem,
            "swap" => Self::Swap,
            "disk" => Self::Disk,
            "" | "NA" => Self::Ungrouped,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Cpu => "cpu",
            Self::Mem => "mem",
            Self::Swap => "swap",
            Self::Disk => "disk",
            Self::Other(name) => name,
            Self::Ungrouped => "NA",
        }
    }
}

impl MetricFamily {
    fn rank(&self) -> u8 {
        match self {
            Self::Cpu => 0,
            Self::Mem => 1,
            Self::Swap => 2,
            Self::Disk => 3,
            Self::Other(_) | Self::Ungrouped => 4,
        }
    }
}

impl Ord for MetricFamily {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.as_str().cmp(other.as_str()))
    }
}

impl PartialOrd for MetricFamily {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for MetricFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MetricFamily {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Unit inferred from a column name
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum MetricUnit {
    #[serde(rename = "Percent (%)")]
    Percent,
    #[serde(rename = "Gigabytes (GB)")]
    Gigabytes,
    #[serde(rename = "NA")]
    Unknown,
}

impl MetricUnit {
    pub fn of(metric: &str) -> Self {
        if metric.contains('%') {
            Self::Percent
        } else if metric.contains("GB") {
            Self::Gigabytes
        } else {
            Self::Unknown
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Percent => "Percent (%)",
            Self::Gigabytes => "Gigabytes (GB)",
            Self::Unknown => "NA",
        }
    }

    /// Only percent and gigabyte metrics get a panel
    pub fn is_charted(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for MetricUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which hosts, jobs and families to show; `None` means everything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    hostnames: Option<BTreeSet<String>>,
    families: Option<BTreeSet<MetricFamily>>,
    jobs: Option<BTreeSet<String>>,
}

impl Selection {
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to the given hostnames. An empty list keeps every host.
    pub fn with_hostnames<I, S>(mut self, hostnames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let hosts: BTreeSet<String> = hostnames.into_iter().map(Into::into).collect();
        if !hosts.is_empty() {
            self.restrict_hosts(hosts);
        }
        self
    }

    /// Intersect the host selection with the hosts a node list expands to
    pub fn with_nodelist(mut self, expr: &str) -> Result<Self, NodeListError> {
        let hosts = parse_nodelist(expr)?.into_iter().collect();
        self.restrict_hosts(hosts);
        Ok(self)
    }

    /// Restrict to the given families. An empty list keeps every family.
    pub fn with_families<I>(mut self, families: I) -> Self
    where
        I: IntoIterator<Item = MetricFamily>,
    {
        let families: BTreeSet<MetricFamily> = families.into_iter().collect();
        if !families.is_empty() {
            self.families = Some(families);
        }
        self
    }

    /// Restrict to the given job labels. An empty list keeps every job.
    pub fn with_jobs<I, S>(mut self, jobs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let jobs: BTreeSet<String> = jobs.into_iter().map(Into::into).collect();
        if !jobs.is_empty() {
            self.jobs = Some(jobs);
        }
        self
    }

    fn restrict_hosts(&mut self, hosts: BTreeSet<String>) {
        self.hostnames = Some(match self.hostnames.take() {
            Some(current) => current.intersection(&hosts).cloned().collect(),
            None => hosts,
        });
    }

    pub fn includes_host(&self, hostname: &str) -> bool {
        self.hostnames.as_ref().map_or(true, |h| h.contains(hostname))
    }

    pub fn includes_job(&self, job: &str) -> bool {
        self.jobs.as_ref().map_or(true, |j| j.contains(job))
    }

    pub fn includes_family(&self, family: &MetricFamily) -> bool {
        self.families.as_ref().map_or(true, |f| f.contains(family))
    }

    pub fn includes<T>(&self, row: &Labeled<T>) -> bool {
        self.includes_host(&row.hostname) && self.includes_job(&row.job)
    }
}

/// One value of a metric at one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub timestamp: f64,
    pub value: f64,
}

/// Summary of a line; NaN values are counted but not summarized
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LineStats {
    pub samples: usize,
    pub latest: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

impl LineStats {
    fn from_points(points: &[Point]) -> Self {
        let values: Vec<f64> = points
            .iter()
            .map(|p| p.value)
            .filter(|v| !v.is_nan())
            .collect();
        let n = values.len();

        Self {
            samples: points.len(),
            latest: values.last().copied(),
            min: values.iter().copied().reduce(f64::min),
            max: values.iter().copied().reduce(f64::max),
            mean: (n > 0).then(|| values.iter().sum::<f64>() / n as f64),
        }
    }
}

/// One host's series within a facet, ordered by timestamp
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostLine {
    pub host: String,
    pub stats: LineStats,
    pub points: Vec<Point>,
}

/// One metric of a panel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Facet {
    pub metric: String,
    pub lines: Vec<HostLine>,
}

impl Facet {
    /// Y range shared by every line of this facet
    pub fn y_range(&self) -> Option<(f64, f64)> {
        let mins = self.lines.iter().filter_map(|l| l.stats.min);
        let maxs = self.lines.iter().filter_map(|l| l.stats.max);
        Some((mins.reduce(f64::min)?, maxs.reduce(f64::max)?))
    }
}

/// Every facet of one family and unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub family: MetricFamily,
    pub unit: MetricUnit,
    pub facets: Vec<Facet>,
}

/// Build the panels for the selected host rows.
///
/// Panels are ordered by family then unit; facets keep table column order;
/// lines are ordered by hostname.
pub fn build_panels(rows: &[Labeled<MetricSample>], selection: &Selection) -> Vec<Panel> {
    let selected: Vec<&Labeled<MetricSample>> =
        rows.iter().filter(|r| selection.includes(r)).collect();
    if selected.is_empty() {
        return Vec::new();
    }

    let mut panels: BTreeMap<(MetricFamily, MetricUnit), Vec<Facet>> = BTreeMap::new();

    for (column, metric) in MetricSample::charted_metric_names().enumerate() {
        let family = MetricFamily::of(metric);
        let unit = MetricUnit::of(metric);
        if !unit.is_charted() || !selection.includes_family(&family) {
            continue;
        }

        let mut by_host: BTreeMap<&str, Vec<Point>> = BTreeMap::new();
        for r in &selected {
            let (_, value) = r.row.charted_metrics()[column];
            by_host.entry(r.hostname.as_str()).or_default().push(Point {
                timestamp: r.row.timestamp,
                value,
            });
        }

        let lines = by_host
            .into_iter()
            .map(|(host, mut points)| {
                points.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
                HostLine {
                    host: host.to_string(),
                    stats: LineStats::from_points(&points),
                    points,
                }
            })
            .collect();

        panels.entry((family, unit)).or_default().push(Facet {
            metric: metric.to_string(),
            lines,
        });
    }

    panels
        .into_iter()
        .map(|((family, unit), facets)| Panel {
            family,
            unit,
            facets,
        })
        .collect()
}

/// GPU rows of the selected hosts and jobs, unprocessed
pub fn select_gpu_rows<'a>(
    rows: &'a [Labeled<GpuSample>],
    selection: &Selection,
) -> Vec<&'a Labeled<GpuSample>> {
    rows.iter().filter(|r| selection.includes(r)).collect()
}
