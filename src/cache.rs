//! # Catalog snapshots and prediction memoization
//!
//! Two stores bound the cost of the engine:
//!
//! - [`CatalogStore`] keeps the current [`Catalog`] snapshot for its time-to-live and rebuilds it
//!   on expiry. Each rebuild gets a new version number. A refresh is single-flight: concurrent
//!   callers wait for the one in progress.
//! - [`PredictionCache`] memoizes ranked results per [`CacheKey`], which holds every input of a
//!   request plus the catalog version. Each key has its own slot lock, so distinct keys never
//!   wait on each other and a key has at most one computation in flight.
//!
//! Entries are immutable: an expired entry is replaced wholesale by the next computation.
use std::{
    collections::HashMap,
    future::Future,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::{
    catalog::{Catalog, CatalogBuild},
    config::RequestFingerprint,
    engine_errors::EngineError,
    prediction::Predictions,
};

struct StoredCatalog {
    catalog: Arc<Catalog>,
    loaded_at: Instant,
}

/// Holder of the current catalog snapshot.
pub struct CatalogStore {
    ttl: Duration,
    degraded_ttl: Duration,
    current: tokio::sync::Mutex<Option<StoredCatalog>>,
    latest: RwLock<Option<Arc<Catalog>>>,
    generation: AtomicU64,
    force_refresh: AtomicBool,
}

impl CatalogStore {
    /// Arguments
    /// ---------
    /// * `ttl`: lifetime of a snapshot built from remote sources
    /// * `degraded_ttl`: lifetime of a snapshot built from the fallback dataset
    pub fn new(ttl: Duration, degraded_ttl: Duration) -> Self {
        CatalogStore {
            ttl,
            degraded_ttl,
            current: tokio::sync::Mutex::new(None),
            latest: RwLock::new(None),
            generation: AtomicU64::new(0),
            force_refresh: AtomicBool::new(false),
        }
    }

    /// The current snapshot, rebuilt with `refresh` if missing, expired or invalidated.
    ///
    /// A failed refresh leaves the previous snapshot (if any) in service.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<Arc<Catalog>, EngineError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CatalogBuild, EngineError>>,
    {
        let mut current = self.current.lock().await;
        let forced = self.force_refresh.swap(false, Ordering::SeqCst);

        if let Some(stored) = current.as_ref() {
            let ttl = if stored.catalog.is_degraded() {
                self.degraded_ttl
            } else {
                self.ttl
            };
            if !forced && stored.loaded_at.elapsed() < ttl {
                return Ok(stored.catalog.clone());
            }
        }

        match refresh().await {
            Ok(build) => {
                let version = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                let catalog = Arc::new(Catalog::new(version, build));
                log::info!(
                    "Catalog snapshot {version} published ({} records{})",
                    catalog.len(),
                    if catalog.is_degraded() { ", fallback" } else { "" }
                );
                *current = Some(StoredCatalog {
                    catalog: catalog.clone(),
                    loaded_at: Instant::now(),
                });
                *self.latest.write() = Some(catalog.clone());
                Ok(catalog)
            }
            Err(err) => match current.as_ref() {
                Some(stored) => {
                    log::warn!(
                        "Catalog refresh failed, keeping snapshot {}: {err}",
                        stored.catalog.version()
                    );
                    Ok(stored.catalog.clone())
                }
                None => Err(err),
            },
        }
    }

    /// The last published snapshot, without refreshing.
    pub fn current(&self) -> Option<Arc<Catalog>> {
        self.latest.read().clone()
    }

    /// Make the next access rebuild the snapshot.
    pub fn invalidate(&self) {
        self.force_refresh.store(true, Ordering::SeqCst);
    }
}

/// Identity of a cached prediction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub request: RequestFingerprint,
    pub catalog_version: u64,
}

/// A computed result and its lifetime.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Arc<Predictions>,
    pub computed_at: Instant,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn is_fresh(&self) -> bool {
        self.computed_at.elapsed() < self.ttl
    }
}

/// Whether a lookup was served from memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Miss,
}

type Slot = Arc<tokio::sync::Mutex<Option<CacheEntry>>>;

/// Memoized predictions with per-key single flight.
pub struct PredictionCache {
    ttl: Duration,
    slots: Mutex<HashMap<CacheKey, Slot>>,
}

impl PredictionCache {
    pub fn new(ttl: Duration) -> Self {
        PredictionCache {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, key: &CacheKey) -> Slot {
        self.slots.lock().entry(key.clone()).or_default().clone()
    }

    /// A fresh entry for `key`; a miss when absent, expired, or being computed.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let slot = self.slots.lock().get(key).cloned()?;
        let guard = slot.try_lock().ok()?;
        let entry = guard.as_ref().filter(|entry| entry.is_fresh()).cloned();
        entry
    }

    /// Store a result for `key`, replacing any previous entry.
    pub async fn put(&self, key: &CacheKey, value: Predictions) -> CacheEntry {
        let entry = self.entry(value);
        *self.slot(key).lock().await = Some(entry.clone());
        entry
    }

    fn entry(&self, value: Predictions) -> CacheEntry {
        CacheEntry {
            value: Arc::new(value),
            computed_at: Instant::now(),
            ttl: self.ttl,
        }
    }

    /// The cached result for `key`, or the result of `compute` stored under it.
    ///
    /// Concurrent calls for the same key run `compute` once; the others wait and are served the
    /// stored result. Incomplete (cancelled) results are returned but not stored. `None` when
    /// `cancel` fires while waiting for another computation of the same key.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &CacheKey,
        cancel: &CancellationToken,
        compute: F,
    ) -> Result<Option<(Arc<Predictions>, CacheOutcome)>, EngineError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Predictions, EngineError>>,
    {
        let slot = self.slot(key);
        let mut guard = tokio::select! {
            biased;
            guard = slot.lock() => guard,
            _ = cancel.cancelled() => {
                log::info!(
                    "Cancelled while waiting for a prediction in progress (catalog {})",
                    key.catalog_version
                );
                return Ok(None);
            }
        };

        if let Some(entry) = guard.as_ref().filter(|entry| entry.is_fresh()) {
            log::info!("Prediction cache hit (catalog {})", key.catalog_version);
            return Ok(Some((entry.value.clone(), CacheOutcome::Hit)));
        }

        log::info!("Prediction cache miss (catalog {})", key.catalog_version);
        let value = compute().await?;
        if !value.complete {
            return Ok(Some((Arc::new(value), CacheOutcome::Miss)));
        }
        let entry = self.entry(value);
        let value = entry.value.clone();
        *guard = Some(entry);
        Ok(Some((value, CacheOutcome::Miss)))
    }

    /// Drop the entries computed on other catalog snapshots.
    pub fn retain_catalog(&self, version: u64) {
        self.slots
            .lock()
            .retain(|key, _| key.catalog_version == version);
    }

    /// Drop every entry.
    pub fn invalidate(&self) {
        self.slots.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
