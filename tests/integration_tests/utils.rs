use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mint_media_proxy::common::token_layout::{
    ACCOUNT_TYPE_MINT, METAPLEX_CORE_PROGRAM_ID, SPL_TOKEN_ACCOUNT_BASE_LEN, TOKEN_2022_PROGRAM_ID,
    TOKEN_PROGRAM_ID,
};
use mint_media_proxy::decoder::mint::MintHeader;
use mint_media_proxy::media::{
    DiskFileCache, FetchedBytes, HttpFetcher, MediaConfig, MediaError, MediaService,
};
use mint_media_proxy::migration::{Migrator, MigratorTrait};
use mint_media_proxy::resolver::pda::metadata_candidates;
use mint_media_proxy::resolver::{AccountBytes, AccountFetcher, MetadataResolver, ResolveError};
use mint_media_proxy::store::SeaOrmMediaStore;
use once_cell::sync::Lazy;
use sea_orm::{DatabaseConnection, SqlxSqliteConnector};
use solana_sdk::pubkey::Pubkey;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

pub use rstest::rstest;

static INIT: Lazy<Mutex<Option<()>>> = Lazy::new(|| Mutex::new(None));

fn setup_logging() {
    let env_filter =
        env::var("RUST_LOG").unwrap_or("info,sqlx=error,sea_orm_migration=error".to_string());
    tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(env_filter)
        .init();
}

fn run_one_time_setup() {
    let mut init = INIT.lock().unwrap();
    if init.is_none() {
        setup_logging();
        *init = Some(())
    }
}

pub async fn setup_sqllite_pool() -> SqlitePool {
    let options: SqliteConnectOptions = "sqlite::memory:".parse().unwrap();
    // Every connection to an in-memory database sees its own database.
    SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap()
}

/// In-memory chain keyed by address.
#[derive(Default)]
pub struct MockChain {
    accounts: Mutex<HashMap<Pubkey, AccountBytes>>,
    calls: AtomicUsize,
}

impl MockChain {
    pub fn insert(&self, address: Pubkey, owner: Pubkey, data: Vec<u8>) {
        self.accounts
            .lock()
            .unwrap()
            .insert(address, AccountBytes { data, owner });
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountFetcher for MockChain {
    async fn get_multiple_accounts(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<AccountBytes>>, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let accounts = self.accounts.lock().unwrap();
        Ok(addresses
            .iter()
            .map(|address| accounts.get(address).cloned())
            .collect())
    }
}

/// Serves canned bodies. Unknown urls fail like a 404.
#[derive(Default)]
pub struct MockHttp {
    responses: Mutex<HashMap<String, FetchedBytes>>,
    calls: AtomicUsize,
}

impl MockHttp {
    pub fn insert(&self, url: &str, bytes: Vec<u8>, content_type: Option<&str>) {
        self.responses.lock().unwrap().insert(
            url.to_string(),
            FetchedBytes {
                bytes,
                content_type: content_type.map(|c| c.to_string()),
            },
        );
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpFetcher for MockHttp {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<FetchedBytes, MediaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| MediaError::Fetch(format!("Unexpected status 404 from {}", url)))
    }
}

pub struct TestSetup {
    pub name: String,
    pub db_conn: Arc<DatabaseConnection>,
    pub store: Arc<SeaOrmMediaStore>,
    pub chain: Arc<MockChain>,
    pub http: Arc<MockHttp>,
    pub cache_root: PathBuf,
}

impl TestSetup {
    pub fn resolver(&self) -> MetadataResolver {
        MetadataResolver::new(self.chain.clone())
    }

    pub fn service(&self) -> MediaService {
        self.service_with_config(MediaConfig::default())
    }

    pub fn service_with_config(&self, config: MediaConfig) -> MediaService {
        let config = MediaConfig {
            cache_root: self.cache_root.clone(),
            ..config
        };
        MediaService::new(
            Arc::new(self.resolver()),
            self.store.clone(),
            Arc::new(DiskFileCache::new(&config.cache_root, &config.chain)),
            self.http.clone(),
            config,
        )
    }
}

pub async fn setup(name: String) -> TestSetup {
    run_one_time_setup();
    let db_conn = Arc::new(SqlxSqliteConnector::from_sqlx_sqlite_pool(
        setup_sqllite_pool().await,
    ));
    Migrator::fresh(db_conn.as_ref()).await.unwrap();
    let cache_root = env::temp_dir().join(format!("{}-{}", name, rand::random::<u64>()));
    TestSetup {
        name,
        store: Arc::new(SeaOrmMediaStore::from(db_conn.clone())),
        db_conn,
        chain: Arc::new(MockChain::default()),
        http: Arc::new(MockHttp::default()),
        cache_root,
    }
}

pub fn push_string(out: &mut Vec<u8>, value: &str) {
    out.extend_from_slice(&(value.len() as u32).to_le_bytes());
    out.extend_from_slice(value.as_bytes());
}

pub fn spl_mint(decimals: u8) -> Vec<u8> {
    MintHeader {
        decimals,
        is_initialized: true,
        ..MintHeader::default()
    }
    .encode()
}

/// Token-2022 mint padded to the extension offset, followed by the given TLV records.
pub fn token22_mint(decimals: u8, records: &[(u16, Vec<u8>)]) -> Vec<u8> {
    let mut data = spl_mint(decimals);
    data.resize(SPL_TOKEN_ACCOUNT_BASE_LEN, 0);
    data.push(ACCOUNT_TYPE_MINT);
    for (tag, payload) in records {
        data.extend_from_slice(&tag.to_le_bytes());
        data.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        data.extend_from_slice(payload);
    }
    data
}

pub fn token_metadata_payload(mint: &Pubkey, name: &str, symbol: &str, uri: &str) -> Vec<u8> {
    let mut payload = [7u8; 32].to_vec();
    payload.extend_from_slice(mint.as_ref());
    push_string(&mut payload, name);
    push_string(&mut payload, symbol);
    push_string(&mut payload, uri);
    payload.extend_from_slice(&0u32.to_le_bytes());
    payload
}

/// Legacy metadata account with a single verified creator and no trailer.
pub fn legacy_metadata(mint: &Pubkey, name: &str, symbol: &str, uri: &str) -> Vec<u8> {
    let mut out = vec![4u8];
    out.extend_from_slice(&[9u8; 32]);
    out.extend_from_slice(mint.as_ref());
    push_string(&mut out, name);
    push_string(&mut out, symbol);
    push_string(&mut out, uri);
    out.extend_from_slice(&500u16.to_le_bytes());
    out.push(1);
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&[3u8; 32]);
    out.push(1);
    out.push(100);
    out.push(1);
    out.push(1);
    out
}

pub fn core_asset(name: &str, uri: &str) -> Vec<u8> {
    let mut out = vec![1u8];
    out.extend_from_slice(&[1u8; 32]);
    out.push(1);
    out.extend_from_slice(&[2u8; 32]);
    push_string(&mut out, name);
    push_string(&mut out, uri);
    out.push(0);
    out
}

/// Registers an SPL mint and its legacy metadata at the first PDA candidate.
pub fn insert_legacy_token(chain: &MockChain, mint: &Pubkey, decimals: u8, uri: &str) {
    chain.insert(*mint, TOKEN_PROGRAM_ID, spl_mint(decimals));
    let pda = metadata_candidates(mint)[0];
    chain.insert(
        pda,
        mint_media_proxy::resolver::pda::METADATA_PROGRAMS[0],
        legacy_metadata(mint, "Legacy Token", "LEG", uri),
    );
}

pub fn insert_core_asset(chain: &MockChain, mint: &Pubkey, uri: &str) {
    chain.insert(*mint, METAPLEX_CORE_PROGRAM_ID, core_asset("Core Asset", uri));
}

pub fn insert_token22(chain: &MockChain, mint: &Pubkey, records: &[(u16, Vec<u8>)]) {
    chain.insert(*mint, TOKEN_2022_PROGRAM_ID, token22_mint(6, records));
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 10, 10, 255]));
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut out, image::ImageOutputFormat::Png)
        .unwrap();
    out.into_inner()
}

pub fn metadata_doc(image: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "name": "Offchain Name",
        "symbol": "OFF",
        "image": image,
    }))
    .unwrap()
}

pub fn trim_test_name(name: &str) -> String {
    // Remove the test_ prefix and the case suffix
    name.replace("test_", "")
        .split("::case")
        .next()
        .unwrap()
        .to_string()
}
