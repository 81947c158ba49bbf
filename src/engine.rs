//! # Prediction engine
//!
//! [`Engine`] is the single entry point of the crate: "give me the next `n` eclipses relevant to
//! this configuration". It composes the catalog refresh, the visibility computation or the region
//! filter, and the caches.
//!
//! ## Pipeline
//!
//! ```text
//! predict_next(request, cancel)
//!   ├─ CatalogStore ── refresh on expiry ─▶ build_catalog (fetch ▸ parse ▸ merge ▸ fallback)
//!   └─ PredictionCache[request fingerprint, catalog version]
//!        ├─ Region mode       ─▶ region::matches over the catalog, first n
//!        └─ Coordinates mode  ─▶ VisibilityCalculator on a bounded pool, accepted in date order
//! ```
//!
//! ## Concurrency
//!
//! Visibility computations are CPU-bound: they run on the blocking thread pool and hold a permit
//! of an engine-wide semaphore sized by [`EngineConfig::concurrency`]. Within a request at most
//! that many computations are in flight; results are consumed in catalog order whatever the
//! completion order, and no more work is started once `n` visible events are accepted.
//!
//! A [`CancellationToken`] stops the request early; the events accepted so far are returned with
//! `complete == false` and are not cached.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tokio_util::sync::CancellationToken;
//! use umbra::{
//!     config::{EngineConfig, PredictionMode, PredictionRequest},
//!     engine::Engine,
//! };
//!
//! # async fn run() -> Result<(), umbra::engine_errors::EngineError> {
//! let engine = Engine::new(EngineConfig::default()).await?;
//! let request = PredictionRequest::new(3, PredictionMode::try_from("coords:45.0,7.0")?)?;
//! let predictions = engine.predict_next(&request, &CancellationToken::new()).await?;
//! for event in predictions.iter() {
//!     println!("{} {}", event.record.date_utc, event.record.kind);
//! }
//! # Ok(())
//! # }
//! ```
use std::{
    pin::pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use futures::StreamExt;
use hifitime::Epoch;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::{
    cache::{CacheKey, CacheOutcome, CatalogStore, PredictionCache},
    catalog::{build_catalog, fetcher::CatalogFetcher, fetcher::HttpFetcher, Catalog},
    config::{EngineConfig, PredictionMode, PredictionRequest},
    engine_errors::EngineError,
    env_state::EngineEnv,
    ephemeris::EphemerisCapability,
    observer::ObserverLocation,
    prediction::{EngineStatus, EphemerisStatus, Prediction, Predictions},
    region,
    time::now_utc,
    visibility::VisibilityCalculator,
};

/// Source of the current instant.
pub type Clock = Arc<dyn Fn() -> Result<Epoch, EngineError> + Send + Sync>;

/// The eclipse prediction engine.
pub struct Engine {
    config: EngineConfig,
    fetcher: Arc<dyn CatalogFetcher>,
    capability: EphemerisCapability,
    catalogs: CatalogStore,
    cache: PredictionCache,
    permits: Arc<Semaphore>,
    clock: Clock,
    passes: AtomicU64,
}

impl Engine {
    /// Build an engine that reads the catalogs over HTTPS.
    ///
    /// The ephemeris capability is settled here, once: a missing or disabled ephemeris does not
    /// fail the construction, it only degrades coordinate mode.
    pub async fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let env = EngineEnv::new(config.fetch_timeout)?;
        let capability = EphemerisCapability::initialize(&config.ephemeris, &env.http_client).await;
        let fetcher = Arc::new(HttpFetcher::new(env, config.retry_backoff));
        Self::with_components(config, fetcher, capability)
    }

    /// Build an engine from explicit collaborators.
    pub fn with_components(
        config: EngineConfig,
        fetcher: Arc<dyn CatalogFetcher>,
        capability: EphemerisCapability,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Engine {
            catalogs: CatalogStore::new(config.cache_ttl, config.degraded_catalog_ttl),
            cache: PredictionCache::new(config.cache_ttl),
            permits: Arc::new(Semaphore::new(config.concurrency)),
            clock: Arc::new(now_utc),
            passes: AtomicU64::new(0),
            config,
            fetcher,
            capability,
        })
    }

    /// Replace the system clock, which decides what "future" means.
    pub fn with_clock(mut self, clock: impl Fn() -> Epoch + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(move || Ok::<_, EngineError>(clock()));
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn capability(&self) -> &EphemerisCapability {
        &self.capability
    }

    /// Current state, without triggering any work.
    pub fn status(&self) -> EngineStatus {
        let catalog = self.catalogs.current();
        EngineStatus {
            catalog_loaded: catalog.is_some(),
            catalog_version: catalog.as_ref().map(|c| c.version()),
            catalog_records: catalog.as_ref().map_or(0, |c| c.len()),
            degraded: catalog.as_ref().is_some_and(|c| c.is_degraded()),
            ephemeris_available: self.capability.is_available(),
            ephemeris_name: self.capability.name(),
            computation_passes: self.passes.load(Ordering::SeqCst),
        }
    }

    /// The current catalog snapshot, refreshed if it expired.
    pub async fn catalog(&self) -> Result<Arc<Catalog>, EngineError> {
        self.catalog_at((self.clock)()?).await
    }

    async fn catalog_at(&self, now: Epoch) -> Result<Arc<Catalog>, EngineError> {
        self.catalogs
            .get_or_refresh(|| build_catalog(self.fetcher.as_ref(), &self.config, now))
            .await
    }

    /// Forget the catalog snapshot and every cached prediction.
    pub fn invalidate(&self) {
        self.catalogs.invalidate();
        self.cache.invalidate();
    }

    /// The next eclipses relevant to `request`, in ascending date order.
    ///
    /// Arguments
    /// ---------
    /// * `request`: number of events, mode and coverage threshold
    /// * `cancel`: stops the request; the events accepted so far are returned
    ///
    /// Return
    /// ------
    /// * At most `request.n` events. Fewer is a valid outcome: the catalog holds no more
    ///   qualifying events. Errors are limited to an invalid request, an unreadable system clock
    ///   and a missing catalog.
    pub async fn predict_next(
        &self,
        request: &PredictionRequest,
        cancel: &CancellationToken,
    ) -> Result<Arc<Predictions>, EngineError> {
        request.validate()?;
        let now = (self.clock)()?;

        let catalog = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::info!("Prediction cancelled before the catalog was available");
                return Ok(self.interrupted(request, None, now));
            }
            catalog = self.catalog_at(now) => catalog?,
        };

        self.cache.retain_catalog(catalog.version());
        let key = CacheKey {
            request: request.fingerprint(),
            catalog_version: catalog.version(),
        };
        let Some((predictions, outcome)) = self
            .cache
            .get_or_compute(&key, cancel, || self.compute(request, &catalog, now, cancel))
            .await?
        else {
            return Ok(self.interrupted(request, Some(&catalog), now));
        };

        if outcome == CacheOutcome::Miss {
            log::info!(
                "{} of {} requested eclipses found (catalog {}{})",
                predictions.len(),
                request.n,
                catalog.version(),
                if predictions.degraded { ", fallback" } else { "" }
            );
        }
        Ok(predictions)
    }

    /// An empty, incomplete result for a request cancelled before any event was computed.
    fn interrupted(
        &self,
        request: &PredictionRequest,
        catalog: Option<&Catalog>,
        now: Epoch,
    ) -> Arc<Predictions> {
        Arc::new(Predictions {
            events: Vec::new(),
            catalog_version: catalog.map(|c| c.version()),
            degraded: catalog.is_some_and(|c| c.is_degraded()),
            complete: false,
            ephemeris: self.ephemeris_status(&request.mode),
            generated_at: now,
        })
    }

    fn ephemeris_status(&self, mode: &PredictionMode) -> EphemerisStatus {
        match (mode, &self.capability) {
            (PredictionMode::Region(_), _) => EphemerisStatus::NotUsed,
            (PredictionMode::Coordinates(_), EphemerisCapability::Available(provider)) => {
                EphemerisStatus::Available {
                    name: provider.name().to_string(),
                    data_version: provider.data_version(),
                }
            }
            (PredictionMode::Coordinates(_), EphemerisCapability::Unavailable(reason)) => {
                EphemerisStatus::Unavailable {
                    reason: reason.clone(),
                }
            }
        }
    }

    /// One uncached pass over the catalog.
    async fn compute(
        &self,
        request: &PredictionRequest,
        catalog: &Catalog,
        now: Epoch,
        cancel: &CancellationToken,
    ) -> Result<Predictions, EngineError> {
        self.passes.fetch_add(1, Ordering::SeqCst);
        let ephemeris = self.ephemeris_status(&request.mode);

        let (events, complete) = match &request.mode {
            PredictionMode::Region(region) => {
                let events = catalog
                    .records()
                    .iter()
                    .filter(|record| region::matches(record.global_region_text.as_deref(), region))
                    .take(request.n)
                    .map(|record| Prediction {
                        record: record.clone(),
                        visibility: None,
                    })
                    .collect();
                (events, true)
            }
            PredictionMode::Coordinates(location) => {
                match VisibilityCalculator::from_capability(&self.capability) {
                    Ok(calculator) => {
                        self.visible_events(catalog, calculator, *location, request, cancel)
                            .await
                    }
                    Err(err) => {
                        log::warn!("{err}; listing the next eclipses without local circumstances");
                        let events = catalog
                            .records()
                            .iter()
                            .take(request.n)
                            .map(|record| Prediction {
                                record: record.clone(),
                                visibility: None,
                            })
                            .collect();
                        (events, true)
                    }
                }
            }
        };

        Ok(Predictions {
            events,
            catalog_version: Some(catalog.version()),
            degraded: catalog.is_degraded(),
            complete,
            ephemeris,
            generated_at: now,
        })
    }

    /// Visible events in catalog order, computed on the bounded pool.
    ///
    /// Return
    /// ------
    /// * The accepted events and whether the scan ran to its end (not cancelled)
    async fn visible_events(
        &self,
        catalog: &Catalog,
        calculator: VisibilityCalculator,
        location: ObserverLocation,
        request: &PredictionRequest,
        cancel: &CancellationToken,
    ) -> (Vec<Prediction>, bool) {
        let calculator = Arc::new(calculator);

        let computations = futures::stream::iter(catalog.records().iter().cloned())
            .map(|record| {
                let calculator = calculator.clone();
                let permits = self.permits.clone();
                async move {
                    let permit = permits
                        .acquire_owned()
                        .await
                        .map_err(|err| EngineError::ComputationAborted(err.to_string()))?;
                    tokio::task::spawn_blocking(move || {
                        let _permit = permit;
                        calculator.compute_visibility(&record, &location)
                    })
                    .await
                    .map_err(|err| EngineError::ComputationAborted(err.to_string()))
                }
            })
            .buffered(self.config.concurrency);
        let mut computations = pin!(computations);

        let mut accepted = Vec::with_capacity(request.n);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    log::info!("Prediction cancelled after {} accepted events", accepted.len());
                    return (accepted, false);
                }
                next = computations.next() => match next {
                    None => break,
                    Some(Ok(visibility)) => {
                        if visibility.is_visible()
                            && visibility.coverage_exact() >= request.min_coverage
                        {
                            accepted.push(Prediction {
                                record: visibility.record.clone(),
                                visibility: Some(visibility),
                            });
                            if accepted.len() >= request.n {
                                break;
                            }
                        }
                    }
                    Some(Err(err)) => log::warn!("Visibility computation skipped: {err}"),
                },
            }
        }
        (accepted, true)
    }
}
