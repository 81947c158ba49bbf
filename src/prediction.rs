//! Results handed back to the host.
use std::sync::Arc;

use chrono::NaiveDate;
use hifitime::Epoch;

use crate::{catalog::EclipseRecord, visibility::VisibilityResult};

/// One upcoming eclipse selected for the request.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub record: Arc<EclipseRecord>,
    /// Local circumstances in coordinate mode; `None` in region mode or without an ephemeris.
    pub visibility: Option<VisibilityResult>,
}

/// State of the ephemeris for the request that produced a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EphemerisStatus {
    /// Coverage was computed with this provider and data version.
    Available { name: String, data_version: String },
    /// Coordinate mode was requested but no provider is installed.
    Unavailable { reason: String },
    /// Region mode: no geometry involved.
    NotUsed,
}

/// Ranked answer to a prediction request.
#[derive(Debug, Clone, PartialEq)]
pub struct Predictions {
    /// At most `n` events, in ascending date order.
    pub events: Vec<Prediction>,
    /// Catalog snapshot the events were taken from; `None` if cancelled before one was available.
    pub catalog_version: Option<u64>,
    /// The catalog came from the embedded fallback dataset.
    pub degraded: bool,
    /// `false` when the request was cancelled and the list may be short.
    pub complete: bool,
    pub ephemeris: EphemerisStatus,
    pub generated_at: Epoch,
}

impl Predictions {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Prediction> {
        self.events.iter()
    }

    pub fn next_event(&self) -> Option<&Prediction> {
        self.events.first()
    }

    /// Days from `today` to the next event, `0` on the day itself.
    pub fn days_until_next(&self, today: NaiveDate) -> Option<i64> {
        self.next_event()
            .map(|event| (event.record.date_utc - today).num_days().max(0))
    }
}

/// Snapshot of the engine state, for a host status page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStatus {
    pub catalog_loaded: bool,
    pub catalog_version: Option<u64>,
    pub catalog_records: usize,
    pub degraded: bool,
    pub ephemeris_available: bool,
    pub ephemeris_name: Option<String>,
    /// Number of prediction passes actually computed (cache misses).
    pub computation_passes: u64,
}
