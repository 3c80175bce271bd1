use std::sync::atomic::{AtomicU64, Ordering};

use cadence_macros::statsd_count;
use serde::Serialize;

use crate::metric;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub requests_served: u64,
    pub image_files_served: u64,
    pub media_files_served: u64,
}

/// Request counters shared by the HTTP handlers.
#[derive(Debug, Default)]
pub struct Stats {
    requests_served: AtomicU64,
    image_files_served: AtomicU64,
    media_files_served: AtomicU64,
}

impl Stats {
    pub fn increment_requests(&self) {
        self.requests_served.fetch_add(1, Ordering::Relaxed);
        metric! {
            statsd_count!("requests_served", 1);
        }
    }

    pub fn increment_image_files(&self) {
        self.image_files_served.fetch_add(1, Ordering::Relaxed);
        metric! {
            statsd_count!("image_files_served", 1);
        }
    }

    pub fn increment_media_files(&self) {
        self.media_files_served.fetch_add(1, Ordering::Relaxed);
        metric! {
            statsd_count!("media_files_served", 1);
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests_served: self.requests_served.load(Ordering::Relaxed),
            image_files_served: self.image_files_served.load(Ordering::Relaxed),
            media_files_served: self.media_files_served.load(Ordering::Relaxed),
        }
    }

    /// Zeroes every counter and returns the values it held.
    pub fn reset(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests_served: self.requests_served.swap(0, Ordering::Relaxed),
            image_files_served: self.image_files_served.swap(0, Ordering::Relaxed),
            media_files_served: self.media_files_served.swap(0, Ordering::Relaxed),
        }
    }
}
