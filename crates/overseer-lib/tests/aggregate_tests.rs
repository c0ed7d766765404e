//! Integration tests for stats tree aggregation

use overseer_lib::store::{TableStore, WriteMode};
use overseer_lib::{collect, GpuSample, MetricSample, Tick};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn sample(host: &str, n: u32) -> MetricSample {
    let x = f64::from(n);
    MetricSample {
        cpu_per_cpu: vec![x],
        cpu_total: x,
        cpu_avg: x,
        disk_total_gb: 100.0,
        disk_percent: 10.0,
        mem_total_gb: 64.0,
        mem_available_gb: 60.0,
        mem_used_gb: 4.0,
        mem_percent: 6.25,
        swap_total_gb: 0.0,
        swap_used_gb: 0.0,
        swap_free_gb: 0.0,
        swap_percent: 0.0,
        loadavg_1: 0.5,
        loadavg_5: 0.5,
        loadavg_15: 0.5,
        hostname: host.to_string(),
        ip: "10.0.0.1".to_string(),
        datetime: format!("2024-03-01 12:00:{n:02}.000000"),
        timestamp: 1_709_294_400.0 + x,
    }
}

fn gpu(n: u32) -> Vec<GpuSample> {
    vec![GpuSample {
        index: 0,
        name: "NVIDIA A100-SXM4-80GB".to_string(),
        gpu_util_percent: f64::from(n),
        mem_util_percent: 1.0,
        mem_used_mib: 512.0,
        mem_total_mib: 81_920.0,
        mem_free_mib: 81_408.0,
        timestamp: 1_709_294_400.0 + f64::from(n),
    }]
}

fn record(dir: &Path, host: &str, ticks: std::ops::Range<u32>, with_gpu: bool) {
    fs::create_dir_all(dir).unwrap();
    let store = TableStore::new(WriteMode::InPlace);
    for n in ticks {
        let tick = Tick {
            system: sample(host, n),
            gpu: with_gpu.then(|| gpu(n)),
        };
        store.append_tick(dir, &tick).unwrap();
    }
}

#[test]
fn test_collect_merges_local_and_job_scoped_tables() {
    let root = TempDir::new().unwrap();
    record(&root.path().join("hostA"), "hostA", 0..3, false);
    record(
        &root.path().join("hostA").join("slurm_J1_N0_L0_P0"),
        "hostA",
        10..12,
        false,
    );

    let stats = collect(root.path());

    assert_eq!(stats.system.len(), 5);
    let jobs: Vec<&str> = stats.system.iter().map(|r| r.job.as_str()).collect();
    assert_eq!(
        jobs,
        vec![
            "local",
            "local",
            "local",
            "slurm_J1_N0_L0_P0",
            "slurm_J1_N0_L0_P0"
        ]
    );
    assert!(stats.system.iter().all(|r| r.hostname == "hostA"));
    assert_eq!(stats.system[3].row, sample("hostA", 10));
    assert_eq!(stats.hostnames.iter().collect::<Vec<_>>(), vec!["hostA"]);
    assert_eq!(stats.slurm_jobs.iter().collect::<Vec<_>>(), vec!["1"]);
    assert!(stats.gpu.is_empty());
}

#[test]
fn test_collect_orders_unscoped_before_scoped() {
    let root = TempDir::new().unwrap();
    record(
        &root.path().join("hostA").join("slurm_J7_N0_L0_P0"),
        "hostA",
        0..1,
        false,
    );
    record(&root.path().join("hostB"), "hostB", 0..1, false);
    record(&root.path().join("hostA"), "hostA", 0..1, false);

    let stats = collect(root.path());

    let labels: Vec<(&str, &str)> = stats
        .system
        .iter()
        .map(|r| (r.hostname.as_str(), r.job.as_str()))
        .collect();
    assert_eq!(
        labels,
        vec![
            ("hostA", "local"),
            ("hostB", "local"),
            ("hostA", "slurm_J7_N0_L0_P0"),
        ]
    );
}

#[test]
fn test_collect_includes_gpu_tables_and_gpu_only_hosts() {
    let root = TempDir::new().unwrap();
    record(&root.path().join("hostA"), "hostA", 0..2, true);

    // A host whose only readable table is the GPU one
    let gpu_only = root.path().join("hostG");
    fs::create_dir_all(&gpu_only).unwrap();
    TableStore::default()
        .append(&gpu_only.join("gpu.feather"), &gpu(5))
        .unwrap();

    let stats = collect(root.path());

    assert_eq!(stats.system.len(), 2);
    assert_eq!(stats.gpu.len(), 3);
    assert_eq!(stats.gpu[2].hostname, "hostG");
    assert_eq!(stats.gpu[2].row.gpu_util_percent, 5.0);
    assert_eq!(
        stats.hostnames.iter().collect::<Vec<_>>(),
        vec!["hostA", "hostG"]
    );
}

#[test]
fn test_collect_skips_unreadable_tables() {
    let root = TempDir::new().unwrap();
    record(&root.path().join("hostA"), "hostA", 0..2, false);
    let broken = root.path().join("hostB");
    fs::create_dir_all(&broken).unwrap();
    fs::write(broken.join("system.feather"), b"not arrow").unwrap();

    let stats = collect(root.path());

    assert_eq!(stats.system.len(), 2);
    assert!(!stats.hostnames.contains("hostB"));
}

#[test]
fn test_collect_keeps_rows_from_unrecognised_job_dirs() {
    let root = TempDir::new().unwrap();
    record(
        &root.path().join("hostA").join("slurm_manual"),
        "hostA",
        0..1,
        false,
    );

    let stats = collect(root.path());

    assert_eq!(stats.system.len(), 1);
    assert_eq!(stats.system[0].job, "slurm_manual");
    assert!(stats.slurm_jobs.is_empty());
}

#[test]
fn test_collect_missing_root_is_empty() {
    let root = TempDir::new().unwrap();

    let stats = collect(&root.path().join("nowhere"));

    assert!(stats.is_empty());
    assert!(stats.hostnames.is_empty());
}

#[test]
fn test_collect_root_with_glob_characters() {
    let root = TempDir::new().unwrap();
    let stats_root = root.path().join("stats[1]");
    record(&stats_root.join("hostA"), "hostA", 0..1, false);

    let stats = collect(&stats_root);

    assert_eq!(stats.system.len(), 1);
}

#[test]
fn test_run_summaries_per_host_and_job() {
    let root = TempDir::new().unwrap();
    record(&root.path().join("hostA"), "hostA", 0..3, true);
    record(
        &root.path().join("hostA").join("slurm_J1_N0_L0_P0"),
        "hostA",
        10..12,
        false,
    );

    let stats = collect(root.path());
    let runs = stats.run_summaries();

    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].job, "local");
    assert_eq!(runs[0].system_rows, 3);
    assert_eq!(runs[0].gpu_rows, 3);
    assert_eq!(runs[0].first_timestamp, Some(1_709_294_400.0));
    assert_eq!(runs[0].last_timestamp, Some(1_709_294_402.0));
    assert_eq!(runs[1].job, "slurm_J1_N0_L0_P0");
    assert_eq!(runs[1].gpu_rows, 0);
}
