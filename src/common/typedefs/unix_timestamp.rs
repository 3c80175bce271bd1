use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Seconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct UnixTimestamp(pub u64);

impl UnixTimestamp {
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        UnixTimestamp(secs)
    }

    pub fn seconds_since(&self, earlier: UnixTimestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl From<i64> for UnixTimestamp {
    fn from(value: i64) -> Self {
        UnixTimestamp(value.max(0) as u64)
    }
}

impl From<UnixTimestamp> for i64 {
    fn from(value: UnixTimestamp) -> Self {
        value.0.min(i64::MAX as u64) as i64
    }
}
