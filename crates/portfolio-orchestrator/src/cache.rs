use chrono::{DateTime, Utc};
use portfolio_core::{PortfolioError, Snapshot};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::fetcher::BatchFetcher;

/// Default snapshot lifetime (30 minutes).
pub const DEFAULT_CACHE_LIFETIME: Duration = Duration::from_secs(30 * 60);

/// Published snapshot with the instant it was stored.
struct CacheEntry {
    snapshot: Arc<Snapshot>,
    cached_at: Instant,
}

/// Result of a `SnapshotCache::get` call.
#[derive(Debug, Clone)]
pub struct CacheRead {
    pub snapshot: Arc<Snapshot>,
    /// `true` when served from the stored snapshot without this call fetching.
    pub cached: bool,
    pub age: Duration,
    pub expires_in: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheStatus {
    pub is_cached: bool,
    pub last_updated: Option<DateTime<Utc>>,
    pub age_seconds: Option<u64>,
    pub lifetime_seconds: u64,
}

struct CacheInner {
    fetcher: Arc<BatchFetcher>,
    lifetime: Duration,
    published: RwLock<Option<CacheEntry>>,
    /// Held for the whole stale-check + refresh + publish sequence. Holds the
    /// failure message of the last refresh attempt, if it failed.
    refresh_gate: Arc<Mutex<Option<String>>>,
    /// Completed refresh attempts; only bumped while the gate is held.
    generation: AtomicU64,
}

impl CacheInner {
    fn fresh(&self) -> Option<CacheRead> {
        let published = self.published.read().unwrap_or_else(|e| e.into_inner());
        let entry = published.as_ref()?;
        let age = entry.cached_at.elapsed();
        if age >= self.lifetime {
            return None;
        }
        Some(CacheRead {
            snapshot: Arc::clone(&entry.snapshot),
            cached: true,
            age,
            expires_in: self.lifetime - age,
        })
    }

    fn publish(&self, snapshot: Arc<Snapshot>) {
        let mut published = self.published.write().unwrap_or_else(|e| e.into_inner());
        *published = Some(CacheEntry {
            snapshot,
            cached_at: Instant::now(),
        });
    }
}

/// Time-bounded, single-flight cache over `BatchFetcher::refresh`.
///
/// Callers that find the snapshot stale queue on the refresh gate; the first
/// one through fetches, the rest re-check and reuse its result, failure
/// included. The refresh runs in its own task so a dropped caller cannot
/// abandon it half-way.
#[derive(Clone)]
pub struct SnapshotCache {
    inner: Arc<CacheInner>,
}

impl SnapshotCache {
    pub fn new(fetcher: Arc<BatchFetcher>, lifetime: Duration) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                fetcher,
                lifetime,
                published: RwLock::new(None),
                refresh_gate: Arc::new(Mutex::new(None)),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.inner.lifetime
    }

    pub async fn get(&self) -> Result<CacheRead, PortfolioError> {
        let seen = self.inner.generation.load(Ordering::Acquire);
        if let Some(read) = self.inner.fresh() {
            tracing::debug!("Serving cached snapshot ({}s old)", read.age.as_secs());
            return Ok(read);
        }

        let gate = Arc::clone(&self.inner.refresh_gate).lock_owned().await;
        if let Some(read) = self.inner.fresh() {
            tracing::debug!("Snapshot refreshed by a concurrent request");
            return Ok(read);
        }
        // A refresh finished while this call was queued and it failed: share
        // its outcome rather than starting another batch.
        if self.inner.generation.load(Ordering::Acquire) != seen {
            if let Some(message) = gate.as_ref() {
                return Err(PortfolioError::BatchFetchFailed(message.clone()));
            }
        }

        let inner = Arc::clone(&self.inner);
        let refresh = tokio::spawn(async move {
            let mut gate = gate;
            let fetcher = Arc::clone(&inner.fetcher);
            let outcome = match tokio::spawn(async move { fetcher.refresh().await }).await {
                Ok(snapshot) => {
                    let snapshot = Arc::new(snapshot);
                    inner.publish(Arc::clone(&snapshot));
                    *gate = None;
                    Ok(snapshot)
                }
                Err(e) => {
                    tracing::error!("Snapshot refresh aborted: {}", e);
                    *gate = Some(e.to_string());
                    Err(PortfolioError::BatchFetchFailed(e.to_string()))
                }
            };
            inner.generation.fetch_add(1, Ordering::AcqRel);
            outcome
        });

        let snapshot = refresh
            .await
            .map_err(|e| PortfolioError::BatchFetchFailed(e.to_string()))??;

        Ok(CacheRead {
            snapshot,
            cached: false,
            age: Duration::ZERO,
            expires_in: self.inner.lifetime,
        })
    }

    /// Read-only view of the cache; never fetches and never waits on a refresh.
    pub fn status(&self) -> CacheStatus {
        let published = self.inner.published.read().unwrap_or_else(|e| e.into_inner());
        match published.as_ref() {
            Some(entry) => CacheStatus {
                is_cached: true,
                last_updated: Some(entry.snapshot.produced_at),
                age_seconds: Some(entry.cached_at.elapsed().as_secs()),
                lifetime_seconds: self.inner.lifetime.as_secs(),
            },
            None => CacheStatus {
                is_cached: false,
                last_updated: None,
                age_seconds: None,
                lifetime_seconds: self.inner.lifetime.as_secs(),
            },
        }
    }
}
