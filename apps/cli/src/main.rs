//! Command-line front end for assetsync
//!
//! ```bash
//! assetsync --fingerprint fingerprint.json --output assets \
//!   --mirror https://game-assets.example.com --mirror https://mirror.example.com \
//!   --strict 2
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use assetsync::{
    ConsoleProgressReporter, Fingerprint, IntoProgressCallback, MirrorSet, Orchestrator,
    StrictLevel, SyncConfig, SyncError,
};
use clap::Parser;
use tracing::{info, warn};

/// Synchronize a local directory with a content-addressed asset store
#[derive(Parser, Debug)]
#[command(name = "assetsync", version)]
#[command(about = "Download and verify game assets listed in a fingerprint")]
struct Args {
    /// Path to the fingerprint.json manifest
    #[arg(long, env = "ASSETSYNC_FINGERPRINT")]
    fingerprint: PathBuf,

    /// Destination directory
    #[arg(long, short, env = "ASSETSYNC_OUTPUT")]
    output: PathBuf,

    /// Mirror base URL; repeat to add fallbacks, tried in order
    #[arg(long = "mirror", required = true, env = "ASSETSYNC_MIRRORS", value_delimiter = ',')]
    mirrors: Vec<String>,

    /// Content identifier; defaults to the fingerprint's `sha`
    #[arg(long)]
    content_id: Option<String>,

    /// Maximum number of concurrent workers
    #[arg(long, default_value_t = 8)]
    workers: usize,

    /// Maximum number of files per worker batch
    #[arg(long, default_value_t = 50)]
    batch_size: usize,

    /// 0 = always fetch, 1 = keep present files, 2 = verify SHA-1 digests
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=2))]
    strict: u8,

    /// Do not fetch fingerprint.json and version.number
    #[arg(long)]
    no_unlisted: bool,

    /// Print a line for every file
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("assetsync=warn")),
        )
        .with_target(false)
        .init();

    match run(Args::parse()).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            if let Some(sync_error) = e.downcast_ref::<SyncError>() {
                sync_error.log("Synchronization could not start");
                if let Some(suggestion) = sync_error.suggestion() {
                    eprintln!("Hint: {}", suggestion);
                }
            }
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every file ended up in a usable state
async fn run(args: Args) -> Result<bool> {
    let fingerprint = Fingerprint::load(&args.fingerprint)
        .await
        .with_context(|| format!("loading {}", args.fingerprint.display()))?;

    let mut tree = fingerprint.to_tree()?;
    if !args.no_unlisted {
        tree.add_unlisted_items();
    }

    let content_id = args
        .content_id
        .unwrap_or_else(|| fingerprint.content_id().to_string());
    let mirrors = MirrorSet::new(args.mirrors, content_id)?;

    let config = SyncConfig::builder()
        .max_concurrent_workers(args.workers)
        .max_batch_size(args.batch_size)
        .strict_level(StrictLevel::try_from(args.strict)?)
        .build()?;

    let orchestrator = Orchestrator::new(config, mirrors)?
        .with_progress(ConsoleProgressReporter::new(args.verbose).into_callback());

    let abort = orchestrator.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping workers");
            abort.abort();
        }
    });

    info!(
        "Fingerprint {} version {}: {} files",
        fingerprint.sha,
        fingerprint.version,
        tree.leaf_count()
    );
    let report = orchestrator.synchronize(&tree, &args.output).await?;

    let counts = report.counts();
    println!(
        "[Main] {} up to date, {} downloaded, {} decompressed, {} failed",
        counts.skipped,
        counts.downloaded,
        counts.decompressed,
        counts.failed()
    );
    for failure in report.failures() {
        println!("  {}: {}", failure.path, failure.outcome);
    }
    if report.crashed_workers > 0 {
        println!("  {} workers terminated abnormally", report.crashed_workers);
    }
    if report.aborted {
        println!("[Main] Aborted before all files were processed");
    }

    Ok(report.is_success())
}
