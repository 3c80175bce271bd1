use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use log::{error, info};
use mint_media_proxy::common::{setup_database_connection, setup_logging, LoggingFormat};
use mint_media_proxy::media::config::DEFAULT_CHAIN;
use mint_media_proxy::media::{DiskFileCache, MediaConfig, MediaService, ReqwestFetcher};
use mint_media_proxy::refresh::{self, BatchRefresher, RefreshReport, DEFAULT_WORKERS};
use mint_media_proxy::resolver::{MetadataResolver, RpcAccountFetcher};
use mint_media_proxy::store::SeaOrmMediaStore;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;

const REMOTE_TIMEOUT: Duration = Duration::from_secs(5);

/// Warms or reloads cached token media for every mint in a hash list
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON array of mint addresses
    #[arg(long, default_value = "./hashlist.json")]
    hashlist: PathBuf,

    /// Max number of mints processed concurrently
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// URL of the RPC server
    #[arg(short, long, env = "RPC_URL", default_value = "http://127.0.0.1:8899")]
    rpc_url: String,

    /// DB URL of the media cache
    #[arg(short, long, env = "DB_URL")]
    db_url: Option<String>,

    /// Directory holding resized image files
    #[arg(long, env = "CACHE_DIR", default_value = "./cache")]
    cache_dir: PathBuf,

    /// Chain name used as the cache subdirectory
    #[arg(long, env = "CHAIN", default_value = DEFAULT_CHAIN)]
    chain: String,

    /// Exit with an error when any mint fails
    #[arg(long, action = clap::ArgAction::SetTrue)]
    fail_on_error: bool,

    /// Logging format
    #[arg(short, long, default_value_t = LoggingFormat::Standard)]
    logging_format: LoggingFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve and cache metadata and images for every mint
    Warm {
        /// Refetch entries that are already cached
        #[arg(long, action = clap::ArgAction::SetTrue)]
        force: bool,
    },
    /// Delete the cached rows for every mint
    Reload {
        /// Resolve every mint again after deleting
        #[arg(long, action = clap::ArgAction::SetTrue)]
        reload: bool,
    },
    /// Request every mint from a deployed proxy
    Remote {
        /// Endpoint template, `{}` is replaced by the mint
        #[arg(long)]
        endpoint: String,
    },
}

fn load_hashlist(path: &Path) -> anyhow::Result<Vec<String>> {
    let contents =
        std::fs::read(path).with_context(|| format!("Unable to read hash list {:?}", path))?;
    let keys: Vec<String> = serde_json::from_slice(&contents)
        .with_context(|| format!("Hash list {:?} is not a JSON array of strings", path))?;
    Ok(keys)
}

async fn media_service(args: &Args) -> anyhow::Result<MediaService> {
    let Some(db_url) = &args.db_url else {
        bail!("--db-url is required for this command");
    };
    let db_conn = setup_database_connection(db_url, args.workers as u32 + 1).await?;
    let rpc_client = Arc::new(RpcClient::new_with_timeout_and_commitment(
        args.rpc_url.clone(),
        Duration::from_secs(10),
        CommitmentConfig::confirmed(),
    ));
    let config = MediaConfig {
        cache_root: args.cache_dir.clone(),
        chain: args.chain.clone(),
        ..MediaConfig::default()
    };
    Ok(MediaService::new(
        Arc::new(MetadataResolver::new(Arc::new(RpcAccountFetcher::new(rpc_client)))),
        Arc::new(SeaOrmMediaStore::new(db_conn)),
        Arc::new(DiskFileCache::new(&config.cache_root, &config.chain)),
        Arc::new(ReqwestFetcher::default()),
        config,
    ))
}

fn log_failures<E: std::fmt::Display>(report: &RefreshReport<E>) {
    for (key, e) in &report.failures {
        error!("{}: {}", key, e);
    }
    info!(
        "Processed {} mints, {} failures",
        report.total,
        report.failure_count()
    );
}

fn check_failures(failures: usize, total: usize, fail_on_error: bool) -> anyhow::Result<()> {
    if failures > 0 && fail_on_error {
        bail!("{} of {} mints failed", failures, total);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    setup_logging(args.logging_format);

    let keys = load_hashlist(&args.hashlist)?;
    let refresher = BatchRefresher::new(args.workers);
    info!(
        "Loaded {} mints, running with {} workers",
        keys.len(),
        refresher.workers()
    );

    let failures = match &args.command {
        Command::Warm { force } => {
            let service = media_service(&args).await?;
            let report = refresh::warm_all(&service, &refresher, &keys, *force).await;
            log_failures(&report);
            report.failure_count()
        }
        Command::Reload { reload } => {
            let service = media_service(&args).await?;
            let summary = refresh::reload_all(&service, &refresher, &keys, *reload).await?;
            info!(
                "Deleted {} rows ({} -> {})",
                summary.deleted, summary.count_before, summary.count_after
            );
            match &summary.refreshed {
                Some(report) => {
                    log_failures(report);
                    report.failure_count()
                }
                None => 0,
            }
        }
        Command::Remote { endpoint } => {
            let http = ReqwestFetcher::default();
            let report =
                refresh::remote_all(&http, &refresher, endpoint, &keys, REMOTE_TIMEOUT).await;
            log_failures(&report);
            report.failure_count()
        }
    };

    check_failures(failures, keys.len(), args.fail_on_error)
}
