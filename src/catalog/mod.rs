//! # Eclipse catalog
//!
//! The canonical future catalog is rebuilt on every refresh from the remote documents:
//!
//! ```text
//! SourceDescriptor ──fetch──▶ raw document ──parse──▶ EclipseRecord*
//!        │                                               │
//!        └─ region index ─▶ region pages ────────────────┤
//!                                                        ▼
//!                                   merge by date (precedence + backfill)
//!                                                        │
//!                  all sources failed ─▶ fallback ───────┤
//!                                                        ▼
//!                                          CatalogBuild (future only, date ordered)
//! ```
//!
//! Records are immutable once the build is published as a [`Catalog`] snapshot; every consumer
//! shares them read-only through `Arc`.
use std::{collections::BTreeMap, fmt, sync::Arc};

use chrono::NaiveDate;
use hifitime::Epoch;
use itertools::Itertools;

use crate::{
    config::EngineConfig, constants::ATTRIBUTION, engine_errors::EngineError, time::epoch_to_date,
};

pub mod fallback;
pub mod fetcher;
pub mod parser;
pub mod sources;

use fallback::{fallback_records, FALLBACK_SOURCE_ID};
use fetcher::{fetch_all, CatalogFetcher};
use parser::{parse_document, ParsedDocument};
use sources::{SourceDescriptor, REGION_PAGE_ID_PREFIX};

/// Type of a solar eclipse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EclipseKind {
    Total,
    Annular,
    Partial,
    Hybrid,
}

impl EclipseKind {
    /// Read a type from a catalog label: a full word (`"Total"`) or a NASA type code
    /// (`"T"`, `"A"`, `"Pb"`, `"Hm"`, ...).
    pub fn from_label(label: &str) -> Option<Self> {
        let word = label.split_whitespace().next()?;
        match word.to_ascii_lowercase().as_str() {
            "total" => return Some(EclipseKind::Total),
            "annular" => return Some(EclipseKind::Annular),
            "partial" => return Some(EclipseKind::Partial),
            "hybrid" => return Some(EclipseKind::Hybrid),
            _ => {}
        }
        if word.len() > 3 {
            return None;
        }
        match word.chars().next()? {
            'T' => Some(EclipseKind::Total),
            'A' => Some(EclipseKind::Annular),
            'P' => Some(EclipseKind::Partial),
            'H' => Some(EclipseKind::Hybrid),
            _ => None,
        }
    }
}

impl fmt::Display for EclipseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EclipseKind::Total => "Total",
            EclipseKind::Annular => "Annular",
            EclipseKind::Partial => "Partial",
            EclipseKind::Hybrid => "Hybrid",
        };
        f.write_str(name)
    }
}

/// One solar eclipse, as described by a catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct EclipseRecord {
    /// Calendar date of the event; identifies the record within a catalog.
    pub date_utc: NaiveDate,
    pub kind: EclipseKind,
    /// Global envelope of the event, when the source gives it.
    pub start_utc: Option<Epoch>,
    pub maximum_utc: Option<Epoch>,
    pub end_utc: Option<Epoch>,
    /// Where the eclipse can be seen, as free text.
    pub global_region_text: Option<String>,
    pub source_id: String,
    pub source_url: String,
    pub attribution: String,
    pub saros: Option<u16>,
    /// Global magnitude at greatest eclipse.
    pub magnitude: Option<f64>,
    /// Duration of the central phase at greatest eclipse, in seconds.
    pub central_duration: Option<f64>,
}

impl EclipseRecord {
    /// A record with only its identity and provenance set.
    pub fn new(date_utc: NaiveDate, kind: EclipseKind, source: &SourceDescriptor) -> Self {
        EclipseRecord {
            date_utc,
            kind,
            start_utc: None,
            maximum_utc: None,
            end_utc: None,
            global_region_text: None,
            source_id: source.id.clone(),
            source_url: source.url.clone(),
            attribution: ATTRIBUTION.to_string(),
            saros: None,
            magnitude: None,
            central_duration: None,
        }
    }

    /// A record of the embedded fallback dataset.
    pub fn fallback(date_utc: NaiveDate, kind: EclipseKind, regions: &str) -> Self {
        EclipseRecord {
            date_utc,
            kind,
            start_utc: None,
            maximum_utc: None,
            end_utc: None,
            global_region_text: Some(regions.to_string()),
            source_id: FALLBACK_SOURCE_ID.to_string(),
            source_url: String::new(),
            attribution: ATTRIBUTION.to_string(),
            saros: None,
            magnitude: None,
            central_duration: None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source_id == FALLBACK_SOURCE_ID
    }

    /// Whether the record comes from a regional listing, whose region text is the region name.
    pub fn is_regional_listing(&self) -> bool {
        self.source_id.starts_with(REGION_PAGE_ID_PREFIX)
    }

    /// `start ≤ maximum ≤ end` for every pair of instants present.
    pub fn has_ordered_envelope(&self) -> bool {
        let ordered = |a: Option<Epoch>, b: Option<Epoch>| match (a, b) {
            (Some(a), Some(b)) => a <= b,
            _ => true,
        };
        ordered(self.start_utc, self.maximum_utc)
            && ordered(self.maximum_utc, self.end_utc)
            && ordered(self.start_utc, self.end_utc)
    }

    /// Whether the event is not over yet at `now`.
    ///
    /// With a known end (or maximum) the instant decides; otherwise an event dated today or
    /// later is kept.
    pub fn is_future(&self, now: &Epoch) -> bool {
        match self.end_utc.or(self.maximum_utc) {
            Some(instant) => instant > *now,
            None => epoch_to_date(now).map_or(true, |today| self.date_utc >= today),
        }
    }

    /// Fill the fields missing here with the ones of `other`, a record of the same date.
    ///
    /// The identity, type and provenance of `self` are kept. Envelope instants are only taken
    /// if the combined envelope stays ordered. The region of a regional listing is added to the
    /// region text when it is not already named there.
    pub fn backfill_from(&mut self, other: &EclipseRecord) {
        let envelope = (self.start_utc, self.maximum_utc, self.end_utc);
        self.start_utc = self.start_utc.or(other.start_utc);
        self.maximum_utc = self.maximum_utc.or(other.maximum_utc);
        self.end_utc = self.end_utc.or(other.end_utc);
        if !self.has_ordered_envelope() {
            (self.start_utc, self.maximum_utc, self.end_utc) = envelope;
        }

        match (self.global_region_text.as_mut(), other.global_region_text.as_deref()) {
            (None, Some(other_text)) => self.global_region_text = Some(other_text.to_string()),
            // being listed on a regional page means visible from that region
            (Some(text), Some(region))
                if other.is_regional_listing()
                    && !text.to_lowercase().contains(&region.to_lowercase()) =>
            {
                text.push_str(", ");
                text.push_str(region);
            }
            _ => {}
        }
        self.saros = self.saros.or(other.saros);
        self.magnitude = self.magnitude.or(other.magnitude);
        self.central_duration = self.central_duration.or(other.central_duration);
    }
}

/// Merge the records of several sources into one record per date, in date order.
///
/// Arguments
/// ---------
/// * `batches`: `(precedence, records)` per source
///
/// Return
/// ------
/// * The merged records; on a shared date the record of the higher precedence wins (the first
///   one seen on ties) and its missing fields are backfilled from the other
pub fn merge_sources(batches: Vec<(u8, Vec<EclipseRecord>)>) -> Vec<EclipseRecord> {
    let mut merged: BTreeMap<NaiveDate, (u8, EclipseRecord)> = BTreeMap::new();

    for (precedence, records) in batches {
        for record in records {
            match merged.remove(&record.date_utc) {
                None => {
                    merged.insert(record.date_utc, (precedence, record));
                }
                Some((kept_precedence, mut kept)) => {
                    if precedence > kept_precedence {
                        let mut winner = record;
                        winner.backfill_from(&kept);
                        merged.insert(winner.date_utc, (precedence, winner));
                    } else {
                        kept.backfill_from(&record);
                        merged.insert(kept.date_utc, (kept_precedence, kept));
                    }
                }
            }
        }
    }

    merged.into_values().map(|(_, record)| record).collect()
}

/// Result of one catalog refresh, before it is published.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogBuild {
    /// Future records, one per date, in date order.
    pub records: Vec<EclipseRecord>,
    /// The records come from the fallback dataset.
    pub degraded: bool,
    pub built_at: Epoch,
    /// Sources that could not be fetched or parsed.
    pub failed_sources: Vec<String>,
}

/// Fetch, parse and merge every configured source.
///
/// Per-source failures are logged and skipped. When no source yields a document, the fallback
/// dataset is used instead and the build is marked degraded.
///
/// Arguments
/// ---------
/// * `fetcher`: retrieves the raw documents
/// * `config`: source locations
/// * `now`: instant of the refresh; past events are dropped
///
/// Return
/// ------
/// * The build, or [`EngineError::CatalogUnavailable`] if even the fallback is unusable
pub async fn build_catalog(
    fetcher: &dyn CatalogFetcher,
    config: &EngineConfig,
    now: Epoch,
) -> Result<CatalogBuild, EngineError> {
    let mut sources: Vec<SourceDescriptor> = config
        .decade_urls
        .iter()
        .map(|url| SourceDescriptor::decade_table(url))
        .collect();
    if let Some(index) = &config.region_index_url {
        sources.push(SourceDescriptor::region_index(index));
    }

    let mut batches = Vec::new();
    let mut region_pages = Vec::new();
    let mut failed_sources = Vec::new();

    for (source, document) in fetch_all(fetcher, &sources).await {
        match document.and_then(|raw| parse_document(&raw, source, &now)) {
            Ok(ParsedDocument::Records(records)) => batches.push((source.precedence, records)),
            Ok(ParsedDocument::RegionLinks(pages)) => region_pages.extend(pages),
            Err(err) => {
                log::warn!("Skipping catalog source {source}: {err}");
                failed_sources.push(source.id.clone());
            }
        }
    }

    for (source, document) in fetch_all(fetcher, &region_pages).await {
        match document.and_then(|raw| parse_document(&raw, source, &now)) {
            Ok(ParsedDocument::Records(records)) => batches.push((source.precedence, records)),
            Ok(ParsedDocument::RegionLinks(_)) => {}
            Err(err) => {
                log::warn!("Skipping regional listing {source}: {err}");
                failed_sources.push(source.id.clone());
            }
        }
    }

    if batches.is_empty() {
        log::warn!("No catalog source could be read; using the embedded fallback dataset");
        let fallback = fallback_records();
        if fallback.is_empty() {
            return Err(EngineError::CatalogUnavailable);
        }
        let records = fallback
            .into_iter()
            .filter(|record| record.is_future(&now))
            .collect();
        return Ok(CatalogBuild {
            records,
            degraded: true,
            built_at: now,
            failed_sources,
        });
    }

    let records = merge_sources(batches);
    log::info!(
        "Catalog refreshed: {} future eclipses from {} sources ({} failed)",
        records.len(),
        sources.len() + region_pages.len() - failed_sources.len(),
        failed_sources.len()
    );
    Ok(CatalogBuild {
        records,
        degraded: false,
        built_at: now,
        failed_sources,
    })
}

/// Immutable snapshot of the canonical future catalog.
#[derive(Debug)]
pub struct Catalog {
    version: u64,
    records: Vec<Arc<EclipseRecord>>,
    degraded: bool,
    built_at: Epoch,
}

impl Catalog {
    /// Publish a build under a snapshot version.
    pub fn new(version: u64, build: CatalogBuild) -> Self {
        Catalog {
            version,
            records: build.records.into_iter().map(Arc::new).collect(),
            degraded: build.degraded,
            built_at: build.built_at,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn records(&self) -> &[Arc<EclipseRecord>] {
        &self.records
    }

    /// Whether the snapshot was built from the fallback dataset.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn built_at(&self) -> Epoch {
        self.built_at
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Source identifiers contributing to the snapshot.
    pub fn source_ids(&self) -> Vec<&str> {
        self.records
            .iter()
            .map(|r| r.source_id.as_str())
            .unique()
            .sorted()
            .collect()
    }
}
