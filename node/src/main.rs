use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use pinchain_config::Config;
use pinchain_core::{BlockCheck, BlockHash, NetworkType};
use pinchain_node::{
    NodeHandle, StartupOptions, init_checkpoints, run_dns_refresh, status_report,
};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (default: ~/.pinchain/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Network to load checkpoints for
    #[arg(long)]
    network: Option<NetworkType>,

    /// JSON checkpoint file to merge on top of the compiled checkpoints
    #[arg(long)]
    checkpoints_file: Option<PathBuf>,

    /// Do not query DNS checkpoint records
    #[arg(long)]
    no_dns: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print checkpoint and hard-fork status
    Status {
        /// Current chain height, for zone and fork reporting
        #[arg(long)]
        height: Option<u64>,
    },
    /// Check a block hash against the checkpoint at `height`
    Verify { height: u64, hash: String },
    /// Whether an alternative block at `fork_height` is allowed at `chain_height`
    AltAllowed { chain_height: u64, fork_height: u64 },
    /// Keep running and refresh DNS checkpoints periodically
    Run,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Args::parse()) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let cfg = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let mut opts = StartupOptions::from_config(&cfg);
    if let Some(network) = args.network {
        opts.network = network;
    }
    if let Some(path) = args.checkpoints_file {
        opts.checkpoints_file = path;
    }
    if args.no_dns {
        opts.run_dns = false;
    }

    info!(
        "Loading {} checkpoints (file {:?}, DNS {})",
        opts.network,
        opts.checkpoints_file,
        if opts.run_dns { "on" } else { "off" }
    );
    let resolver = opts.resolver()?;
    let (handle, _report) = init_checkpoints(&opts, resolver)?;

    match args.command.unwrap_or(Command::Status { height: None }) {
        Command::Status { height } => {
            print!("{}", status_report(&handle, height));
            Ok(ExitCode::SUCCESS)
        }
        Command::Verify { height, hash } => verify(&handle, height, &hash),
        Command::AltAllowed {
            chain_height,
            fork_height,
        } => {
            let allowed = handle
                .checkpoints
                .is_alternative_block_allowed(chain_height, fork_height);
            println!("{}", if allowed { "allowed" } else { "rejected" });
            Ok(if allowed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Run => {
            serve(handle.clone(), &opts)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn verify(handle: &NodeHandle, height: u64, hash: &str) -> Result<ExitCode> {
    let hash: BlockHash = hash.parse()?;
    match handle.checkpoints.check_block(height, &hash) {
        BlockCheck::NotCheckpointed => {
            println!("height {} is not checkpointed", height);
            Ok(ExitCode::SUCCESS)
        }
        BlockCheck::Matches => {
            println!("block {} matches checkpoint at height {}", hash, height);
            Ok(ExitCode::SUCCESS)
        }
        BlockCheck::Mismatches => {
            println!("block {} CONTRADICTS checkpoint at height {}", hash, height);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Runs until Ctrl-C. The resolver is blocking, so the handle is created and
/// finally dropped outside the runtime.
fn serve(handle: NodeHandle, opts: &StartupOptions) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let interval = opts.dns_refresh_interval;

    runtime.block_on(async move {
        let refresher = if handle.dns_enabled && !interval.is_zero() {
            info!("Refreshing DNS checkpoints every {:?}", interval);
            Some(tokio::spawn(run_dns_refresh(handle.clone(), interval)))
        } else {
            None
        };

        info!(
            "Checkpoints ready: max height {}, press Ctrl-C to stop",
            handle.checkpoints.max_height()
        );
        let stopped = tokio::signal::ctrl_c().await;

        if let Some(task) = refresher {
            task.abort();
        }
        stopped.context("failed to listen for shutdown signal")
    })?;

    info!("Shutting down");
    Ok(())
}
