use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use futures::future::join_all;
use log::{info, warn};
use tokio::sync::Semaphore;

use crate::media::{HttpFetcher, MediaError, MediaService};
use crate::store::StoreError;

pub const DEFAULT_WORKERS: usize = 5;

/// Outcome of a batch: every key is attempted, failures are collected in input order.
#[derive(Debug)]
pub struct RefreshReport<E> {
    pub total: usize,
    pub failures: Vec<(String, E)>,
}

impl<E> RefreshReport<E> {
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn success_count(&self) -> usize {
        self.total - self.failures.len()
    }
}

/// Runs a task per key with at most `workers` tasks in flight.
#[derive(Debug, Clone, Copy)]
pub struct BatchRefresher {
    workers: usize,
}

impl Default for BatchRefresher {
    fn default() -> Self {
        BatchRefresher::new(DEFAULT_WORKERS)
    }
}

impl BatchRefresher {
    pub fn new(workers: usize) -> Self {
        BatchRefresher {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub async fn run<F, Fut, T, E>(&self, keys: &[String], task: F) -> RefreshReport<E>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let semaphore = Semaphore::new(self.workers);
        let futures: Vec<_> = keys
            .iter()
            .map(|key| {
                let task = &task;
                let semaphore = &semaphore;
                async move {
                    // The semaphore is never closed, so acquiring cannot fail.
                    let _permit = semaphore.acquire().await.ok();
                    (key.clone(), task(key.clone()).await)
                }
            })
            .collect();

        let results = join_all(futures).await;

        let failures = results
            .into_iter()
            .filter_map(|(key, result)| result.err().map(|e| (key, e)))
            .collect();
        RefreshReport {
            total: keys.len(),
            failures,
        }
    }
}

/// Resolves and caches metadata and image files for every key.
pub async fn warm_all(
    service: &MediaService,
    refresher: &BatchRefresher,
    keys: &[String],
    force_refresh: bool,
) -> RefreshReport<MediaError> {
    let report = refresher
        .run(keys, |key| async move {
            let result: Result<PathBuf, MediaError> = service.warm(&key, force_refresh).await;
            if let Err(e) = &result {
                warn!("Failed to warm {}: {}", key, e);
            }
            result
        })
        .await;
    info!(
        "Warmed {} of {} mints ({} failures)",
        report.success_count(),
        report.total,
        report.failure_count()
    );
    report
}

/// Requests `endpoint` for every key, with `{}` in the endpoint replaced by the key.
/// Any response other than a non-empty 200 counts as a failure.
pub async fn remote_all(
    http: &dyn HttpFetcher,
    refresher: &BatchRefresher,
    endpoint: &str,
    keys: &[String],
    timeout: Duration,
) -> RefreshReport<MediaError> {
    let report = refresher
        .run(keys, |key| async move {
            let url = endpoint.replace("{}", &key);
            let result = http.get(&url, timeout).await.and_then(|fetched| {
                if fetched.bytes.is_empty() {
                    Err(MediaError::Fetch(format!("Empty response from {}", url)))
                } else {
                    Ok(fetched.bytes.len())
                }
            });
            if let Err(e) = &result {
                warn!("Remote refresh failed for {}: {}", key, e);
            }
            result
        })
        .await;
    info!(
        "Requested {} of {} mints remotely ({} failures)",
        report.success_count(),
        report.total,
        report.failure_count()
    );
    report
}

#[derive(Debug)]
pub struct ReloadSummary {
    pub count_before: u64,
    pub deleted: u64,
    pub count_after: u64,
    pub refreshed: Option<RefreshReport<MediaError>>,
}

/// Deletes the cached rows for `keys` and optionally resolves them again.
pub async fn reload_all(
    service: &MediaService,
    refresher: &BatchRefresher,
    keys: &[String],
    re_resolve: bool,
) -> Result<ReloadSummary, StoreError> {
    let store = service.store();
    let count_before = store.count().await?;
    info!("Initial record count: {}", count_before);
    let deleted = store.delete_many(keys).await?;
    let count_after = store.count().await?;
    info!("Final record count: {} ({} deleted)", count_after, deleted);

    let refreshed = if re_resolve {
        Some(warm_all(service, refresher, keys, true).await)
    } else {
        None
    };

    Ok(ReloadSummary {
        count_before,
        deleted,
        count_after,
        refreshed,
    })
}
