//! Overseer recorder
//!
//! Runs on every monitored host (usually once per scheduler task), sampling
//! host and GPU metrics and appending them to the stats tree.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use overseer_lib::collector::{GpuQuery, HostProbe, RecordLoopBuilder, SystemSampler};
use overseer_lib::store::TableStore;
use overseer_lib::{RunContext, StatsLayout, StructuredLogger};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

use config::{LogFormat, RecorderConfig};

const RECORDER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Per-host resource recorder
#[derive(Parser)]
#[command(name = "overseer")]
#[command(author, version, about = "Record host and GPU usage into a shared stats tree", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sample this host on a fixed interval and append to the stats tree
    Record(RecordArgs),

    /// Exit successfully without doing anything
    Nop,
}

#[derive(Args)]
pub struct RecordArgs {
    /// Stats root; rows land in <STATS_DIR>/<hostname>[/slurm_J.._N.._L.._P..]
    pub stats_dir: PathBuf,

    /// Seconds between ticks (env: OVERSEER_INTERVAL_SECS, default 15)
    #[arg(long, short)]
    pub interval: Option<u64>,

    /// Stop after this many ticks
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub count: Option<u64>,

    /// Replace table files through a temp file and rename (env: OVERSEER_DURABLE_WRITES)
    #[arg(long)]
    pub durable_writes: bool,

    /// Log output format (env: OVERSEER_LOG_FORMAT, default json)
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    /// GPU query program (env: OVERSEER_GPU_QUERY_BIN, default nvidia-smi)
    #[arg(long)]
    pub gpu_query_bin: Option<String>,

    /// Never query GPUs
    #[arg(long)]
    pub no_gpu: bool,

    /// Mount point whose usage fills the disk columns
    #[arg(long, default_value = overseer_lib::collector::DEFAULT_DISK_MOUNT)]
    pub disk_mount: PathBuf,
}

impl RecordArgs {
    /// Layer command-line flags over the environment configuration
    fn apply(&self, mut config: RecorderConfig) -> RecorderConfig {
        if let Some(interval) = self.interval {
            config.interval_secs = interval;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Some(bin) = &self.gpu_query_bin {
            config.gpu_query_bin = bin.clone();
        }
        config.durable_writes |= self.durable_writes;
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Nop => Ok(()),
        Commands::Record(args) => record(args).await,
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty())
            .init(),
    }
}

async fn record(args: RecordArgs) -> Result<()> {
    let config = args.apply(RecorderConfig::load()?);
    init_tracing(config.log_format);

    if config.interval_secs == 0 {
        anyhow::bail!("Interval must be at least one second");
    }

    let ctx = RunContext::detect().context("Failed to resolve this host")?;
    let run_dir = StatsLayout::new(&args.stats_dir).run_dir(&ctx);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("Failed to create {}", run_dir.display()))?;

    let logger = StructuredLogger::new(&ctx.hostname, ctx.job_label());
    let store = TableStore::new(config.write_mode());
    logger.log_startup(RECORDER_VERSION, &run_dir, config.interval(), store.mode());

    let host = HostProbe::new(&ctx.hostname).with_disk_mount(&args.disk_mount);
    let gpu = (!args.no_gpu).then(|| GpuQuery::new(&config.gpu_query_bin));

    let record_loop = RecordLoopBuilder::new()
        .sampler(Box::new(SystemSampler::new(host, gpu)))
        .stats_dir(&run_dir)
        .store(store)
        .interval(config.interval())
        .max_ticks(args.count)
        .logger(logger)
        .build()?;

    let summary = record_loop.run(shutdown_signal()).await;
    info!(
        ticks = summary.ticks,
        failures = summary.failures,
        "Recorder stopped"
    );

    Ok(())
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> RecordArgs {
        match Cli::try_parse_from(args).unwrap().command {
            Commands::Record(args) => args,
            Commands::Nop => panic!("expected record"),
        }
    }

    #[test]
    fn test_flags_override_environment() {
        let args = parse(&[
            "overseer",
            "record",
            "/tmp/stats",
            "--interval",
            "3",
            "--log-format",
            "pretty",
            "--durable-writes",
        ]);
        let config = args.apply(RecorderConfig {
            gpu_query_bin: "/env/nvidia-smi".to_string(),
            ..RecorderConfig::default()
        });

        assert_eq!(config.interval_secs, 3);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.durable_writes);
        assert_eq!(config.gpu_query_bin, "/env/nvidia-smi");
    }

    #[test]
    fn test_missing_flags_keep_environment() {
        let args = parse(&["overseer", "record", "/tmp/stats"]);
        let env = RecorderConfig {
            interval_secs: 60,
            durable_writes: true,
            ..RecorderConfig::default()
        };

        assert_eq!(args.apply(env.clone()), env);
        assert_eq!(args.disk_mount, PathBuf::from("/"));
        assert!(args.count.is_none());
    }

    #[test]
    fn test_zero_count_rejected() {
        assert!(Cli::try_parse_from(["overseer", "record", "/tmp/stats", "--count", "0"]).is_err());
    }

    #[test]
    fn test_nop_parses() {
        let cli = Cli::try_parse_from(["overseer", "nop"]).unwrap();
        assert!(matches!(cli.command, Commands::Nop));
    }
}
