use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use rand::Rng;

use crate::common::typedefs::unix_timestamp::UnixTimestamp;

pub const DEFAULT_TARGET_HEIGHT: u32 = 720;
pub const DEFAULT_CACHE_ROOT: &str = "./cache";
pub const DEFAULT_CHAIN: &str = "solana";
pub const METADATA_FETCH_TIMEOUT_MS: u64 = 5000;
pub const MEDIA_FETCH_TIMEOUT_MS: u64 = 10000;
pub const DEFAULT_REFRESH_SAMPLE_RATE: f64 = 0.001;

/// Mints whose off-chain metadata is static or unreachable. Their images are never
/// refetched once cached.
pub const DEFAULT_EXEMPT_MINTS: [&str; 8] = [
    "2kMpEJCZL8vEDZe7YPLMCS9Y3WKSAMedXBn7xHPvsWvi",
    "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU",
    "AFbX8oGjGpmVFywbVouvhQSRmiW2aR1mohfahi4Y2AdB",
    "CKfatsPMUf8SkiURsDXs7eK6GWb4Jsd6UDbs7twMCWxo",
    "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
    "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB",
    "mSoLzYCxHdYgdzU16g5QSh3i5K3z3KZK7ytfqcJm7So",
    "So11111111111111111111111111111111111111112",
];

/// Decides when a cached entry is refetched on read.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshPolicy {
    /// Probability in `[0, 1]` that any read triggers a refetch.
    pub sample_rate: f64,
    /// Entries older than this are refetched on read.
    pub max_age: Option<Duration>,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        RefreshPolicy {
            sample_rate: DEFAULT_REFRESH_SAMPLE_RATE,
            max_age: None,
        }
    }
}

impl RefreshPolicy {
    pub fn never() -> Self {
        RefreshPolicy {
            sample_rate: 0.0,
            max_age: None,
        }
    }

    pub fn is_expired(&self, created_at: i64, now: UnixTimestamp) -> bool {
        match self.max_age {
            Some(max_age) => now.seconds_since(UnixTimestamp::from(created_at)) > max_age.as_secs(),
            None => false,
        }
    }

    pub fn should_refresh(&self, created_at: i64) -> bool {
        if self.is_expired(created_at, UnixTimestamp::now()) {
            return true;
        }
        self.sample_rate > 0.0 && rand::thread_rng().gen_bool(self.sample_rate.min(1.0))
    }
}

#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Target height for still images. Animated GIFs use half of it.
    pub target_height: u32,
    pub cache_root: PathBuf,
    pub chain: String,
    pub metadata_timeout: Duration,
    pub media_timeout: Duration,
    pub exempt_mints: HashSet<String>,
    pub refresh_policy: RefreshPolicy,
}

impl Default for MediaConfig {
    fn default() -> Self {
        MediaConfig {
            target_height: DEFAULT_TARGET_HEIGHT,
            cache_root: PathBuf::from(DEFAULT_CACHE_ROOT),
            chain: DEFAULT_CHAIN.to_string(),
            metadata_timeout: Duration::from_millis(METADATA_FETCH_TIMEOUT_MS),
            media_timeout: Duration::from_millis(MEDIA_FETCH_TIMEOUT_MS),
            exempt_mints: DEFAULT_EXEMPT_MINTS.iter().map(|m| m.to_string()).collect(),
            refresh_policy: RefreshPolicy::default(),
        }
    }
}

impl MediaConfig {
    pub fn is_exempt(&self, mint: &str) -> bool {
        self.exempt_mints.contains(mint)
    }
}
