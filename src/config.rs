//! # Engine configuration
//!
//! Everything the host hands to the engine: where the catalogs live, how patient the fetcher
//! is, how much computation may run at once, and where the ephemeris keeps its data. Requests
//! ([`PredictionRequest`]) are validated here before they reach the pipeline.
//!
//! Modes can be written compactly, the same way ephemeris sources are named elsewhere:
//!
//! ```rust
//! use umbra::config::PredictionMode;
//!
//! let coords = PredictionMode::try_from("coords:45.0,7.0").unwrap();
//! let region = PredictionMode::try_from("region:Europe").unwrap();
//! assert!(matches!(coords, PredictionMode::Coordinates(_)));
//! assert!(matches!(region, PredictionMode::Region(_)));
//! ```
use std::time::Duration;

use ordered_float::NotNan;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{
        Percent, CACHE_TTL, DEGRADED_CATALOG_TTL, EOP_FILE_NAME, FETCH_RETRY_BACKOFF, FETCH_TIMEOUT, JSEX_INDEX_URL,
        MAX_EVENTS, NASA_DECADE_URLS, VISIBILITY_CONCURRENCY,
    },
    engine_errors::EngineError,
    observer::ObserverLocation,
};

/// Ephemeris toggle and data storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EphemerisSettings {
    /// When false, the engine runs without coverage computation.
    pub enabled: bool,
    /// Directory for downloaded ephemeris data; platform cache directory when `None`.
    pub storage_dir: Option<String>,
    /// Whether to load Earth orientation parameters for UT1.
    pub use_eop: bool,
    /// File name of the Earth orientation parameters.
    pub eop_file: String,
}

impl Default for EphemerisSettings {
    fn default() -> Self {
        EphemerisSettings {
            enabled: true,
            storage_dir: None,
            use_eop: true,
            eop_file: EOP_FILE_NAME.to_string(),
        }
    }
}

/// Static configuration of an engine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Decade tables, highest precedence.
    pub decade_urls: Vec<String>,
    /// Index of the regional listings; `None` disables regional sources.
    pub region_index_url: Option<String>,
    /// Timeout applied to each HTTP request.
    #[serde(with = "duration_secs")]
    pub fetch_timeout: Duration,
    /// Wait before the single retry of a failed fetch.
    #[serde(with = "duration_secs")]
    pub retry_backoff: Duration,
    /// Upper bound on simultaneous visibility computations.
    pub concurrency: usize,
    /// Lifetime of the catalog snapshot and of cached predictions.
    #[serde(with = "duration_secs")]
    pub cache_ttl: Duration,
    /// Lifetime of a catalog built from the fallback dataset.
    #[serde(with = "duration_secs")]
    pub degraded_catalog_ttl: Duration,
    pub ephemeris: EphemerisSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            decade_urls: NASA_DECADE_URLS.iter().map(|u| u.to_string()).collect(),
            region_index_url: Some(JSEX_INDEX_URL.to_string()),
            fetch_timeout: FETCH_TIMEOUT,
            retry_backoff: FETCH_RETRY_BACKOFF,
            concurrency: VISIBILITY_CONCURRENCY,
            cache_ttl: CACHE_TTL,
            degraded_catalog_ttl: DEGRADED_CATALOG_TTL,
            ephemeris: EphemerisSettings::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.concurrency == 0 {
            return Err(EngineError::Configuration(
                "visibility concurrency must be at least 1".into(),
            ));
        }
        if self.fetch_timeout.is_zero() {
            return Err(EngineError::Configuration(
                "fetch timeout must be positive".into(),
            ));
        }
        Ok(())
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

/// How eclipses are selected for the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PredictionMode {
    /// Compute local circumstances for this observer.
    Coordinates(ObserverLocation),
    /// Filter by the textual visibility region.
    Region(String),
}

impl PredictionMode {
    pub fn validate(&self) -> Result<(), EngineError> {
        match self {
            PredictionMode::Coordinates(location) => location.validate(),
            PredictionMode::Region(region) if region.trim().is_empty() => Err(
                EngineError::Configuration("region name must not be empty".into()),
            ),
            PredictionMode::Region(_) => Ok(()),
        }
    }
}

impl TryFrom<&str> for PredictionMode {
    type Error = EngineError;

    /// Parse `"coords:<lat>,<lon>"` or `"region:<name>"`.
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let (kind, rest) = value.split_once(':').ok_or_else(|| {
            EngineError::Configuration(format!(
                "expected 'coords:<lat>,<lon>' or 'region:<name>', got '{value}'"
            ))
        })?;

        let mode = match kind.trim().to_ascii_lowercase().as_str() {
            "coords" | "coordinates" => {
                let (lat, lon) = rest.split_once(',').ok_or_else(|| {
                    EngineError::Configuration(format!("missing longitude in '{value}'"))
                })?;
                let parse = |s: &str| {
                    s.trim().parse::<f64>().map_err(|err| {
                        EngineError::Configuration(format!("invalid coordinate '{s}': {err}"))
                    })
                };
                PredictionMode::Coordinates(ObserverLocation::new(parse(lat)?, parse(lon)?)?)
            }
            "region" => PredictionMode::Region(rest.trim().to_string()),
            other => {
                return Err(EngineError::Configuration(format!(
                    "unknown prediction mode '{other}'"
                )))
            }
        };
        mode.validate()?;
        Ok(mode)
    }
}

/// A validated request for the next eclipses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// Number of events wanted, in `1..=10`.
    pub n: usize,
    pub mode: PredictionMode,
    /// Minimum peak coverage for an event to be reported in coordinate mode.
    #[serde(default)]
    pub min_coverage: Percent,
}

impl PredictionRequest {
    /// Build and validate a request with no coverage threshold.
    pub fn new(n: usize, mode: PredictionMode) -> Result<Self, EngineError> {
        Self::with_min_coverage(n, mode, 0.0)
    }

    /// Build and validate a request that only keeps events above a coverage threshold.
    pub fn with_min_coverage(
        n: usize,
        mode: PredictionMode,
        min_coverage: Percent,
    ) -> Result<Self, EngineError> {
        let request = PredictionRequest {
            n,
            mode,
            min_coverage,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !(1..=MAX_EVENTS).contains(&self.n) {
            return Err(EngineError::Configuration(format!(
                "number of events {} outside 1..={MAX_EVENTS}",
                self.n
            )));
        }
        if !(0.0..=100.0).contains(&self.min_coverage) {
            return Err(EngineError::Configuration(format!(
                "minimum coverage {} outside [0, 100]",
                self.min_coverage
            )));
        }
        self.mode.validate()
    }

    /// Every input that affects the output, in hashable form.
    pub fn fingerprint(&self) -> RequestFingerprint {
        let mode = match &self.mode {
            PredictionMode::Coordinates(location) => {
                let (lat, lon, elevation) = location.key();
                ModeFingerprint::Coordinates {
                    lat,
                    lon,
                    elevation,
                }
            }
            PredictionMode::Region(region) => {
                ModeFingerprint::Region(region.trim().to_lowercase())
            }
        };
        RequestFingerprint {
            n: self.n,
            mode,
            min_coverage: NotNan::new(self.min_coverage).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModeFingerprint {
    Coordinates {
        lat: NotNan<f64>,
        lon: NotNan<f64>,
        elevation: NotNan<f64>,
    },
    Region(String),
}

/// Hashable summary of a [`PredictionRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestFingerprint {
    pub n: usize,
    pub mode: ModeFingerprint,
    pub min_coverage: NotNan<f64>,
}
