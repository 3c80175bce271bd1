use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::info;
use mint_media_proxy::api::{api::load_placeholder, api::ProxyApi, http_server};
use mint_media_proxy::common::{
    setup_database_connection, setup_logging, setup_metrics, setup_sqlite_connection,
    LoggingFormat,
};
use mint_media_proxy::media::config::DEFAULT_REFRESH_SAMPLE_RATE;
use mint_media_proxy::media::{
    DiskFileCache, MediaConfig, MediaService, RefreshPolicy, ReqwestFetcher,
};
use mint_media_proxy::migration::{sea_orm::DatabaseConnection, Migrator, MigratorTrait};
use mint_media_proxy::resolver::rpc::RpcAccountFetcher;
use mint_media_proxy::resolver::MetadataResolver;
use mint_media_proxy::stats::Stats;
use mint_media_proxy::store::SeaOrmMediaStore;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use sqlx::sqlite::SqliteConnectOptions;

const LOCAL_DB_FILE: &str = "media.db";

/// Token media proxy: resolves on-chain metadata and serves cached, resized images
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Port to expose the HTTP API on
    #[arg(short, long, env = "HTTP_PORT", default_value_t = 8080)]
    port: u16,

    /// URL of the RPC server
    #[arg(short, long, env = "RPC_URL", default_value = "http://127.0.0.1:8899")]
    rpc_url: String,

    /// DB URL for the media cache. By default a SQLite file in the cache directory is used.
    #[arg(short, long, env = "DB_URL")]
    db_url: Option<String>,

    /// Max database connections to use in database pool
    #[arg(long, default_value_t = 10)]
    max_db_conn: u32,

    /// Directory holding resized image files
    #[arg(long, env = "CACHE_DIR", default_value = "./cache")]
    cache_dir: PathBuf,

    /// Chain name used as the cache subdirectory
    #[arg(long, env = "CHAIN", default_value = "solana")]
    chain: String,

    /// Height still images are resized to. Animations use half of it.
    #[arg(long, default_value_t = 720)]
    target_height: u32,

    /// Fraction of cached metadata requests that refetch their row
    #[arg(long, default_value_t = DEFAULT_REFRESH_SAMPLE_RATE)]
    refresh_sample_rate: f64,

    /// Refetch cached rows older than this many seconds
    #[arg(long)]
    refresh_max_age_secs: Option<u64>,

    /// JPEG served when an image cannot be produced. A grey square is used by default.
    #[arg(long, env = "PLACEHOLDER_IMAGE")]
    placeholder_image: Option<PathBuf>,

    /// Run database migrations on startup
    #[arg(long, action = clap::ArgAction::SetTrue)]
    run_migrations: bool,

    /// Logging format
    #[arg(short, long, default_value_t = LoggingFormat::Standard)]
    logging_format: LoggingFormat,

    /// Metrics endpoint in the format `host:port`
    /// If provided, metrics will be sent to the specified statsd server.
    #[arg(long, default_value = None)]
    metrics_endpoint: Option<String>,
}

async fn setup_local_sqlite_connection(
    cache_dir: &Path,
    max_connections: u32,
) -> anyhow::Result<DatabaseConnection> {
    std::fs::create_dir_all(cache_dir)
        .with_context(|| format!("Unable to create cache directory {:?}", cache_dir))?;
    let path = cache_dir.join(LOCAL_DB_FILE);
    info!("Using local SQLite database at: {:?}", path);
    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true);
    Ok(setup_sqlite_connection(options, max_connections).await?)
}

async fn connect(args: &Args) -> anyhow::Result<DatabaseConnection> {
    match &args.db_url {
        Some(db_url) => Ok(setup_database_connection(db_url, args.max_db_conn).await?),
        None => setup_local_sqlite_connection(&args.cache_dir, args.max_db_conn).await,
    }
}

fn media_config(args: &Args) -> MediaConfig {
    MediaConfig {
        target_height: args.target_height,
        cache_root: args.cache_dir.clone(),
        chain: args.chain.clone(),
        refresh_policy: RefreshPolicy {
            sample_rate: args.refresh_sample_rate,
            max_age: args.refresh_max_age_secs.map(Duration::from_secs),
        },
        ..MediaConfig::default()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    setup_logging(args.logging_format);
    setup_metrics(args.metrics_endpoint.clone());

    let db_conn = Arc::new(connect(&args).await?);
    if args.run_migrations || args.db_url.is_none() {
        info!("Running migrations...");
        Migrator::up(db_conn.as_ref(), None).await?;
    }

    let rpc_client = Arc::new(RpcClient::new_with_timeout_and_commitment(
        args.rpc_url.clone(),
        Duration::from_secs(10),
        CommitmentConfig::confirmed(),
    ));
    let resolver = MetadataResolver::new(Arc::new(RpcAccountFetcher::new(rpc_client)));

    let config = media_config(&args);
    let files = DiskFileCache::new(&config.cache_root, &config.chain);
    let media = MediaService::new(
        Arc::new(resolver),
        Arc::new(SeaOrmMediaStore::from(db_conn)),
        Arc::new(files),
        Arc::new(ReqwestFetcher::default()),
        config,
    );

    let placeholder = load_placeholder(args.placeholder_image.as_deref())
        .context("Unable to load placeholder image")?;
    let api = ProxyApi::new(Arc::new(media), Arc::new(Stats::default()), placeholder);

    info!("Starting API server with port {}...", args.port);
    http_server::run_server(api, args.port).await
}
