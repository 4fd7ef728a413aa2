//! Intrabal
//!
//! Rebalances paired data/metadata units across the partitions of one node.
//!
//! # Configuration
//! Partition roots come from, in increasing precedence:
//! - `INTRABAL_PARTITIONS` (comma-separated)
//! - a TOML file (`--config`), read at `--config-key`
//! - repeated `--partition` flags
//!
//! # Exit codes
//! - `0` - nothing to do, dry run, or every move succeeded
//! - `1` - the run was aborted before moving anything
//! - `2` - some moves failed or were skipped

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

use intrabal_rebalancer::{Rebalancer, RebalancerConfig, RunReport, DEFAULT_PARTITIONS_KEY};

#[derive(Parser)]
#[command(name = "intrabal")]
#[command(about = "Balance data units across the storage partitions of one node")]
#[command(version)]
struct Cli {
    /// Partition root, in order (repeat for each partition)
    #[arg(short, long = "partition", value_name = "PATH")]
    partitions: Vec<PathBuf>,

    /// TOML config file
    #[arg(short, long, env = "INTRABAL_CONFIG")]
    config: Option<PathBuf>,

    /// Dotted key of the partition list inside the config file
    #[arg(long, default_value = DEFAULT_PARTITIONS_KEY)]
    config_key: String,

    /// Plan only, don't move anything (`--dry-run=false` to force a real run)
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    dry_run: Option<bool>,

    /// Maximum unit moves for this run
    #[arg(long)]
    max_moves: Option<usize>,

    /// Maximum bytes to move for this run
    #[arg(long)]
    max_bytes: Option<u64>,

    /// Skip fsync of files copied across devices
    #[arg(long, default_value = "false")]
    no_sync: bool,

    /// Fail when a metadata file has no data companion or a duplicate
    #[arg(long, default_value = "false")]
    strict_orphans: bool,

    /// Follow symbolic links while scanning partitions
    #[arg(long, default_value = "false")]
    follow_links: bool,

    /// Print the run report as JSON
    #[arg(long, default_value = "false")]
    json: bool,

    /// Debug logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

impl Cli {
    /// Environment, then config file, then flags
    fn load_config(&self) -> Result<RebalancerConfig> {
        let mut config =
            RebalancerConfig::from_env().context("Invalid environment configuration")?;

        if let Some(path) = &self.config {
            config
                .merge_file(path, &self.config_key)
                .with_context(|| format!("Failed to load config file {}", path.display()))?;
        }

        self.apply_overrides(&mut config);
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut RebalancerConfig) {
        if !self.partitions.is_empty() {
            config.partitions = self.partitions.clone();
        }
        if let Some(dry_run) = self.dry_run {
            config.dry_run = dry_run;
        }
        if self.max_moves.is_some() {
            config.planner.max_moves = self.max_moves;
        }
        if self.max_bytes.is_some() {
            config.planner.max_bytes = self.max_bytes;
        }
        if self.no_sync {
            config.executor.sync_copies = false;
        }
        if self.strict_orphans {
            config.scanner.strict_orphans = true;
        }
        if self.follow_links {
            config.scanner.follow_links = true;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli).await {
        Ok(report) => {
            let code = report.outcome.exit_code();
            if let Err(e) = print_report(&cli, &report) {
                error!(error = %e, "Failed to print report");
                return ExitCode::from(1);
            }
            ExitCode::from(code)
        }
        Err(e) => {
            error!("Rebalance aborted: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: &Cli) -> Result<RunReport> {
    let config = cli.load_config()?;

    info!(
        partitions = config.partitions.len(),
        dry_run = config.dry_run,
        max_moves = ?config.planner.max_moves,
        max_bytes = ?config.planner.max_bytes,
        "Starting intrabal"
    );

    let rebalancer = Rebalancer::new(config)?;
    let cancel = rebalancer.cancel_handle();
    let mut task = tokio::task::spawn_blocking(move || rebalancer.run());

    let joined = tokio::select! {
        joined = &mut task => joined,
        _ = tokio::signal::ctrl_c() => {
            warn!("Shutdown signal received, stopping after the current unit");
            cancel.cancel();
            task.await
        }
    };

    let report = joined.context("Rebalance task panicked")??;
    Ok(report)
}

fn print_report(cli: &Cli, report: &RunReport) -> Result<()> {
    if cli.json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("Threshold: {} bytes", report.threshold);
    for partition in &report.partitions {
        println!(
            "  {} {:<10} {:>16} bytes {:>8} units  {}",
            partition.id,
            format!("{:?}", partition.role).to_lowercase(),
            partition.total_size,
            partition.units,
            partition.root.display()
        );
    }
    for orphan in &report.orphans {
        println!("  orphaned metadata: {}", orphan.display());
    }
    for duplicate in &report.duplicates {
        println!("  duplicate metadata: {}", duplicate.display());
    }

    println!("Plan: {}", report.plan.summary());
    for (src, dst) in report.plan.entries() {
        println!("  {} -> {}", src.display(), dst.display());
    }
    for note in &report.plan.notes {
        println!("  note: {note:?}");
    }

    if let Some(execution) = &report.execution {
        println!("Execution: {}", execution.summary());
        for failed in &execution.failed {
            if let Some(e) = &failed.error {
                println!("  failed: {e}");
            }
        }
    }

    println!("Outcome: {:?}", report.outcome);
    Ok(())
}
