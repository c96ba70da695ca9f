//! ix-admin: check and repair the EVM block index
//!
//! Run `check` any time; run `repair` only with ingestion stopped. On a
//! successful repair the resume point is printed as JSON on stdout so the
//! orchestrator can restart ingestion and chain replay from it.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use index_integrity::{ElasticStore, IntegrityApi, IntegrityError, IntegrityService};

use crate::config::AdminConfig;

/// Exit code for a healthy store (and for a successful repair).
const EXIT_HEALTHY: u8 = 0;
/// Exit code when `check` finds gaps or duplicates.
const EXIT_CORRUPTION: u8 = 1;
/// Exit code when nothing has been indexed yet.
const EXIT_NO_DATA: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "ix-admin")]
#[command(about = "Verify and repair a partitioned EVM block index")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the first and last indexed blocks
    Bounds,
    /// Run a full integrity check
    Check,
    /// Roll the store back to the last clean block
    Repair {
        /// Allow chain prefixes other than mainnet/testnet
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<AdminConfig> {
    let mut config = match path {
        Some(path) => AdminConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => AdminConfig::default(),
    };
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config = load_config(args.config.as_ref())?;
    info!(url = %config.elastic.url, prefix = config.chain_prefix(), "using document store");

    if let Command::Repair { force: false } = args.command {
        let prefix = config.chain_prefix();
        if !(prefix.contains("mainnet") || prefix.contains("testnet")) {
            bail!("refusing to repair chain prefix {prefix:?} (pass --force to override)");
        }
    }

    let store = ElasticStore::new(config.elastic.clone()).context("creating Elasticsearch client")?;
    let mut service = IntegrityService::new(store, config.integrity.clone()).context("invalid integrity configuration")?;

    let code = match args.command {
        Command::Bounds => bounds(&service)?,
        Command::Check => check(&service)?,
        Command::Repair { .. } => repair(&mut service)?,
    };
    Ok(ExitCode::from(code))
}

fn bounds<A: IntegrityApi>(service: &A) -> Result<u8> {
    let first = service.first_indexed_block().context("reading first indexed block")?;
    let last = service.last_indexed_block().context("reading last indexed block")?;
    match (first, last) {
        (Some(first), Some(last)) => {
            println!("first: {}", first.block_nums());
            println!("last:  {}", last.block_nums());
            Ok(EXIT_HEALTHY)
        }
        _ => {
            println!("no data");
            Ok(EXIT_NO_DATA)
        }
    }
}

fn check<A: IntegrityApi>(service: &A) -> Result<u8> {
    match service.full_integrity_check() {
        Ok(report) => {
            println!(
                "healthy: {} .. {} ({} delta partitions, {} histogram queries, {} ms)",
                report.first.block_nums(),
                report.last.block_nums(),
                report.delta_partitions,
                report.histogram_queries,
                report.duration_ms
            );
            Ok(EXIT_HEALTHY)
        }
        Err(IntegrityError::DataEmpty) => {
            warn!("no data to check");
            Ok(EXIT_NO_DATA)
        }
        Err(e) if e.is_corruption() => {
            error!("{e}");
            println!("{e}");
            Ok(EXIT_CORRUPTION)
        }
        Err(e) => Err(e).context("integrity check failed"),
    }
}

fn repair<A: IntegrityApi>(service: &mut A) -> Result<u8> {
    match service.repair() {
        Ok(report) => {
            if report.is_noop() {
                info!(resume = %report.resume, "store healthy, nothing repaired");
            }
            println!("{}", serde_json::to_string_pretty(&report.resume)?);
            Ok(EXIT_HEALTHY)
        }
        Err(IntegrityError::DataEmpty) => {
            info!("no data to repair");
            Ok(EXIT_HEALTHY)
        }
        Err(e) => Err(e).context("repair failed"),
    }
}
