//! Viewer CLI integration tests

use overseer_lib::store::TableStore;
use overseer_lib::{GpuSample, MetricSample, Tick};
use serde_json::Value;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn sample(host: &str, n: u32) -> MetricSample {
    let x = f64::from(n);
    MetricSample {
        cpu_per_cpu: vec![x, x],
        cpu_total: x * 10.0,
        cpu_avg: x * 10.0,
        disk_total_gb: 200.0,
        disk_percent: 40.0,
        mem_total_gb: 256.0,
        mem_available_gb: 200.0,
        mem_used_gb: 56.0,
        mem_percent: 21.875,
        swap_total_gb: 8.0,
        swap_used_gb: 0.0,
        swap_free_gb: 8.0,
        swap_percent: 0.0,
        loadavg_1: x,
        loadavg_5: x,
        loadavg_15: x,
        hostname: host.to_string(),
        ip: "10.0.0.2".to_string(),
        datetime: format!("2024-05-01 08:00:{n:02}.000000"),
        timestamp: 1_714_550_400.0 + x,
    }
}

fn gpu(n: u32) -> Vec<GpuSample> {
    vec![GpuSample {
        index: 0,
        name: "Tesla V100-SXM2-32GB".to_string(),
        gpu_util_percent: f64::from(n),
        mem_util_percent: f64::NAN,
        mem_used_mib: 1024.0,
        mem_total_mib: 32_768.0,
        mem_free_mib: 31_744.0,
        timestamp: 1_714_550_400.0 + f64::from(n),
    }]
}

fn record(dir: &Path, host: &str, ticks: std::ops::Range<u32>, with_gpu: bool) {
    std::fs::create_dir_all(dir).unwrap();
    let store = TableStore::default();
    for n in ticks {
        let tick = Tick {
            system: sample(host, n),
            gpu: with_gpu.then(|| gpu(n)),
        };
        store.append_tick(dir, &tick).unwrap();
    }
}

/// hostA: 3 local rows with GPU, 2 rows under job 1; node0001, node0003: 1 row each
fn stats_tree() -> TempDir {
    let root = TempDir::new().unwrap();
    record(&root.path().join("hostA"), "hostA", 0..3, true);
    record(
        &root.path().join("hostA").join("slurm_J1_N0_L0_P0"),
        "hostA",
        3..5,
        false,
    );
    record(&root.path().join("node0001"), "node0001", 0..1, false);
    record(&root.path().join("node0003"), "node0003", 0..1, false);
    root
}

fn viewer(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_overseer-view"));
    cmd.env_remove("OVERSEER_STATS_ROOT")
        .env_remove("RUST_LOG")
        .env("HOME", home)
        .env("NO_COLOR", "1");
    cmd
}

fn run(root: &Path, args: &[&str]) -> Output {
    let home = TempDir::new().unwrap();
    viewer(home.path())
        .arg("--root")
        .arg(root)
        .args(args)
        .output()
        .expect("Failed to execute viewer")
}

fn run_json(root: &Path, args: &[&str]) -> Value {
    let mut full = vec!["--format", "json"];
    full.extend_from_slice(args);
    let output = run(root, &full);
    assert!(
        output.status.success(),
        "viewer failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("Output should be JSON")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let home = TempDir::new().unwrap();
    let output = viewer(home.path())
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("hosts"), "Should show hosts command");
    assert!(stdout.contains("system"), "Should show system command");
    assert!(stdout.contains("gpu"), "Should show gpu command");
}

#[test]
fn test_hosts_lists_runs() {
    let root = stats_tree();

    let report = run_json(root.path(), &["hosts"]);

    let runs = report["runs"].as_array().unwrap();
    assert_eq!(runs.len(), 4);
    assert_eq!(runs[0]["host"], "hostA");
    assert_eq!(runs[0]["job"], "local");
    assert_eq!(runs[0]["system_rows"], 3);
    assert_eq!(runs[0]["gpu_rows"], 3);
    assert_eq!(runs[1]["job"], "slurm_J1_N0_L0_P0");
    assert_eq!(runs[1]["system_rows"], 2);
    assert_eq!(report["slurm_jobs"], serde_json::json!(["1"]));
}

#[test]
fn test_hosts_table_output() {
    let root = stats_tree();

    let output = run(root.path(), &["hosts"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("hostA"));
    assert!(stdout.contains("slurm_J1_N0_L0_P0"));
    assert!(stdout.contains("node0003"));
}

#[test]
fn test_system_panels_for_selected_group() {
    let root = stats_tree();

    let panels = run_json(root.path(), &["system", "--group", "cpu", "--hostname", "hostA"]);

    let panels = panels.as_array().unwrap();
    assert_eq!(panels.len(), 1);
    assert_eq!(panels[0]["family"], "cpu");
    assert_eq!(panels[0]["unit"], "Percent (%)");
    let facet = &panels[0]["facets"][0];
    assert_eq!(facet["metric"], "cpu_total (%)");
    let lines = facet["lines"].as_array().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["host"], "hostA");
    assert_eq!(lines[0]["stats"]["samples"], 5);
    assert_eq!(lines[0]["stats"]["latest"], 40.0);
}

#[test]
fn test_system_job_filter() {
    let root = stats_tree();

    let panels = run_json(
        root.path(),
        &["system", "--group", "cpu", "--job", "slurm_J1_N0_L0_P0"],
    );

    let lines = panels[0]["facets"][0]["lines"].as_array().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["stats"]["samples"], 2);
}

#[test]
fn test_system_nodelist_filter() {
    let root = stats_tree();

    let panels = run_json(
        root.path(),
        &["system", "--group", "mem", "--nodelist", "node[1-2]"],
    );

    for panel in panels.as_array().unwrap() {
        for facet in panel["facets"].as_array().unwrap() {
            let hosts: Vec<&str> = facet["lines"]
                .as_array()
                .unwrap()
                .iter()
                .map(|l| l["host"].as_str().unwrap())
                .collect();
            assert_eq!(hosts, vec!["node0001"]);
        }
    }
}

#[test]
fn test_system_table_output() {
    let root = stats_tree();

    let output = run(root.path(), &["system", "--group", "disk"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("disk_percent (%)"));
    assert!(stdout.contains("disk_total (GB)"));
    assert!(!stdout.contains("cpu_total (%)"));
}

#[test]
fn test_invalid_nodelist_fails() {
    let root = stats_tree();

    let output = run(root.path(), &["system", "--nodelist", "node[4-2]"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--nodelist"), "Should name the bad flag");
}

#[test]
fn test_gpu_rows_are_raw() {
    let root = stats_tree();

    let rows = run_json(root.path(), &["gpu"]);

    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["host"], "hostA");
    assert_eq!(rows[0]["job"], "local");
    assert_eq!(rows[2]["gpu_util (%)"], 2.0);
    assert!(rows[0]["mem_util (%)"].is_null(), "NaN should serialize as null");
    assert_eq!(rows[0]["mem_total (MiB)"], 32_768.0);
}

#[test]
fn test_missing_root_is_empty() {
    let root = TempDir::new().unwrap();
    let missing = root.path().join("nothing-here");

    let report = run_json(&missing, &["hosts"]);
    assert_eq!(report["runs"], serde_json::json!([]));

    let output = run(&missing, &["system"]);
    assert!(output.status.success());
}

#[test]
fn test_root_from_environment() {
    let root = stats_tree();
    let home = TempDir::new().unwrap();

    let output = viewer(home.path())
        .env("OVERSEER_STATS_ROOT", root.path())
        .args(["--format", "json", "gpu"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let rows: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 3);
}

#[test]
fn test_root_and_format_from_config_file() {
    let root = stats_tree();
    let home = TempDir::new().unwrap();
    let config_dir = home.path().join(".config").join("overseer");
    std::fs::create_dir_all(&config_dir).unwrap();
    let config = serde_json::json!({
        "stats_root": root.path(),
        "default_format": "json",
    });
    std::fs::write(config_dir.join("config.json"), config.to_string()).unwrap();

    let output = viewer(home.path()).arg("hosts").output().unwrap();

    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["runs"].as_array().unwrap().len(), 4);
}
