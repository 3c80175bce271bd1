use std::env;
use std::fmt;
use std::net::UdpSocket;

use cadence::{BufferedUdpMetricSink, QueuingMetricSink, StatsdClient};
use cadence_macros::set_global_default;
use clap::ValueEnum;
use log::{info, warn};
use sea_orm::{DatabaseConnection, SqlxPostgresConnector, SqlxSqliteConnector};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub mod token_layout;
pub mod typedefs;

pub async fn setup_pg_connection(
    db_url: &str,
    max_connections: u32,
) -> Result<DatabaseConnection, sqlx::Error> {
    let options: PgConnectOptions = db_url.parse()?;
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;
    Ok(SqlxPostgresConnector::from_sqlx_postgres_pool(pool))
}

pub async fn setup_sqlite_connection(
    options: SqliteConnectOptions,
    max_connections: u32,
) -> Result<DatabaseConnection, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .connect_with(options)
        .await?;
    Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
}

/// Connects to a `postgres://` or `sqlite:` url.
pub async fn setup_database_connection(
    db_url: &str,
    max_connections: u32,
) -> Result<DatabaseConnection, sqlx::Error> {
    if db_url.starts_with("postgres://") || db_url.starts_with("postgresql://") {
        setup_pg_connection(db_url, max_connections).await
    } else if db_url.starts_with("sqlite:") {
        setup_sqlite_connection(db_url.parse()?, max_connections).await
    } else {
        Err(sqlx::Error::Configuration(
            format!("Unsupported database type: {}", db_url).into(),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LoggingFormat {
    Standard,
    Json,
}

impl fmt::Display for LoggingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoggingFormat::Standard => write!(f, "standard"),
            LoggingFormat::Json => write!(f, "json"),
        }
    }
}

pub fn setup_logging(logging_format: LoggingFormat) {
    let env_filter =
        env::var("RUST_LOG").unwrap_or("info,sqlx=error,sea_orm_migration=error".to_string());
    let subscriber = tracing_subscriber::fmt().with_env_filter(env_filter);
    match logging_format {
        LoggingFormat::Standard => subscriber.init(),
        LoggingFormat::Json => subscriber.json().init(),
    }
}

/// Installs a global statsd client when an endpoint is configured. Without one, every
/// `metric!` block is skipped.
pub fn setup_metrics(metrics_endpoint: Option<String>) {
    let Some(endpoint) = metrics_endpoint else {
        return;
    };
    let socket = match UdpSocket::bind("0.0.0.0:0") {
        Ok(socket) => socket,
        Err(e) => {
            warn!("Unable to bind metrics socket: {}", e);
            return;
        }
    };
    if let Err(e) = socket.set_nonblocking(true) {
        warn!("Unable to configure metrics socket: {}", e);
        return;
    }
    let sink = match BufferedUdpMetricSink::from(endpoint.as_str(), socket) {
        Ok(sink) => sink,
        Err(e) => {
            warn!("Invalid metrics endpoint {}: {}", endpoint, e);
            return;
        }
    };
    let queuing_sink = QueuingMetricSink::from(sink);
    let client = StatsdClient::from_sink("mint_media_proxy", queuing_sink);
    set_global_default(client);
    info!("Sending metrics to {}", endpoint);
}

#[macro_export]
macro_rules! metric {
    {$($block:stmt;)*} => {
        if cadence_macros::is_global_default_set() {
            $(
                $block;
            )*
        }
    };
}
