//! Overseer viewer
//!
//! A terminal dashboard over a stats tree written by the recorders:
//! host/job overview, per-family metric panels and the raw GPU table.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use commands::{gpu, hosts, system};
use overseer_lib::view::{MetricFamily, Selection};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Overseer stats viewer
#[derive(Parser)]
#[command(name = "overseer-view")]
#[command(author, version, about = "Browse host and GPU usage recorded by overseer", long_about = None)]
pub struct Cli {
    /// Stats root (falls back to the config file, then /checkpoint/par/overseer)
    #[arg(long, env = "OVERSEER_STATS_ROOT")]
    pub root: Option<PathBuf>,

    /// Output format (default: table)
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List hosts and jobs with row counts
    Hosts {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Show host metrics grouped by family and unit
    System {
        #[command(flatten)]
        filter: FilterArgs,

        /// Metric family to show (cpu, mem, swap, disk, loadavg, ...); repeatable
        #[arg(long = "group", short = 'g')]
        groups: Vec<String>,

        /// Maximum sparkline width
        #[arg(long, default_value_t = 40)]
        width: usize,
    },

    /// Show the raw GPU table
    Gpu {
        #[command(flatten)]
        filter: FilterArgs,
    },
}

/// Host and job filters shared by every command
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Hostname to include; repeatable (default: all hosts)
    #[arg(long = "hostname", short = 'H')]
    pub hostnames: Vec<String>,

    /// Node-range expression such as node[1-4,7], intersected with --hostname
    #[arg(long)]
    pub nodelist: Option<String>,

    /// Job label to include (local or slurm_J.._N.._L.._P..); repeatable
    #[arg(long = "job", short = 'j')]
    pub jobs: Vec<String>,
}

impl FilterArgs {
    fn selection(&self) -> Result<Selection> {
        let mut selection = Selection::all()
            .with_hostnames(self.hostnames.iter().cloned())
            .with_jobs(self.jobs.iter().cloned());
        if let Some(expr) = &self.nodelist {
            selection = selection
                .with_nodelist(expr)
                .with_context(|| format!("Invalid --nodelist {expr:?}"))?;
        }
        Ok(selection)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = config::Config::load()?;
    let root = config.stats_root(cli.root);
    let format = config.format(cli.format);
    debug!(root = %root.display(), "Reading stats");

    match cli.command {
        Commands::Hosts { filter } => {
            let selection = filter.selection()?;
            let stats = overseer_lib::collect(&root);
            hosts::show_hosts(&root, &stats, &selection, format)?;
        }
        Commands::System {
            filter,
            groups,
            width,
        } => {
            let selection = filter
                .selection()?
                .with_families(groups.iter().map(|g| MetricFamily::from_prefix(g)));
            let stats = overseer_lib::collect(&root);
            system::show_system(&stats, &selection, width, format)?;
        }
        Commands::Gpu { filter } => {
            let selection = filter.selection()?;
            let stats = overseer_lib::collect(&root);
            gpu::show_gpu(&stats, &selection, format)?;
        }
    }

    Ok(())
}
