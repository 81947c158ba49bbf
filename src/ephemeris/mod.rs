//! # Ephemeris capability
//!
//! The visibility computation consumes positions of the Sun and the Moon through the
//! [`Ephemeris`] trait. The engine never talks to a concrete provider directly: it holds an
//! [`EphemerisCapability`], decided once at initialization, which is either an available
//! provider or the reason why none could be set up.
//!
//! ```text
//! EphemerisSettings ──initialize──▶ EphemerisCapability
//!                                   ├── Available(Arc<dyn Ephemeris>)
//!                                   └── Unavailable(reason)
//! ```
//!
//! The built-in provider is [`AnalyticEphemeris`](crate::ephemeris::analytic::AnalyticEphemeris);
//! its optional Earth orientation data file is handled by
//! [`EphemerisStore`](crate::ephemeris::data_file::EphemerisStore).
use std::{fmt::Debug, sync::Arc};

use hifitime::Epoch;
use nalgebra::Vector3;

use crate::{
    config::EphemerisSettings,
    constants::{Kilometer, Radian, MOON_RADIUS_KM, SUN_RADIUS_KM},
    engine_errors::EngineError,
    observer::ObserverLocation,
};

pub mod analytic;
pub mod data_file;

use analytic::AnalyticEphemeris;
use data_file::EphemerisStore;

/// Bodies an ephemeris provider must be able to place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Body {
    Sun,
    Moon,
    Earth,
}

impl Body {
    /// Physical radius used for the apparent disk, in kilometers.
    pub fn radius(&self) -> Kilometer {
        match self {
            Body::Sun => SUN_RADIUS_KM,
            Body::Moon => MOON_RADIUS_KM,
            Body::Earth => crate::constants::EARTH_RADIUS_KM,
        }
    }
}

/// Contract expected from an astronomical position provider.
///
/// Positions are **geocentric**, expressed in the true equator and equinox of date, in
/// kilometers. [`Body::Earth`] is therefore the origin.
pub trait Ephemeris: Send + Sync + Debug {
    /// Short provider name, reported in the engine status.
    fn name(&self) -> &str;

    /// Version of the data backing the positions.
    ///
    /// Two computations with the same inputs and the same data version must give identical
    /// results.
    fn data_version(&self) -> String;

    /// Whether the provider is ready to answer queries.
    fn is_available(&self) -> bool {
        true
    }

    /// Apparent geocentric position of a body at an instant.
    fn position(&self, body: Body, epoch: &Epoch) -> Vector3<Kilometer>;

    /// Greenwich apparent sidereal time at an instant, in radians.
    fn apparent_sidereal_time(&self, epoch: &Epoch) -> Radian;

    /// Geocentric position of an observer at an instant.
    fn observer_position(&self, observer: &ObserverLocation, epoch: &Epoch) -> Vector3<Kilometer> {
        observer.geocentric_position(self.apparent_sidereal_time(epoch))
    }

    /// Position of a body as seen from an observer (topocentric vector).
    fn topocentric_position(
        &self,
        body: Body,
        observer: &ObserverLocation,
        epoch: &Epoch,
    ) -> Vector3<Kilometer> {
        self.position(body, epoch) - self.observer_position(observer, epoch)
    }

    /// Apparent angular radius of a body seen from an observer, in radians.
    fn apparent_radius(&self, body: Body, observer: &ObserverLocation, epoch: &Epoch) -> Radian {
        let distance = self.topocentric_position(body, observer, epoch).norm();
        (body.radius() / distance).clamp(-1.0, 1.0).asin()
    }
}

/// Ephemeris availability, determined once when the engine starts.
#[derive(Debug, Clone)]
pub enum EphemerisCapability {
    Available(Arc<dyn Ephemeris>),
    Unavailable(String),
}

impl EphemerisCapability {
    /// Set up the built-in analytic ephemeris according to the settings.
    ///
    /// The capability is `Unavailable` when it is disabled in the settings or when the storage
    /// directory cannot be prepared. A missing Earth orientation file is not fatal: the
    /// ephemeris then approximates UT1 by UTC.
    ///
    /// Arguments
    /// -----------------
    /// * `settings`: ephemeris toggle and storage location.
    /// * `client`: HTTP client used for the one-time data file download.
    ///
    /// Return
    /// ----------
    /// * The capability; this never fails.
    pub async fn initialize(settings: &EphemerisSettings, client: &reqwest::Client) -> Self {
        if !settings.enabled {
            log::info!("Ephemeris disabled by configuration; coverage data will not be computed");
            return EphemerisCapability::Unavailable("disabled by configuration".into());
        }

        let store = match EphemerisStore::new(settings.storage_dir.as_deref()) {
            Ok(store) => store,
            Err(err) => {
                log::warn!("Ephemeris storage unusable: {err}");
                return EphemerisCapability::Unavailable(err.to_string());
            }
        };

        let ut1 = if settings.use_eop {
            match store.load_ut1_provider(client, &settings.eop_file).await {
                Ok(provider) => Some(provider),
                Err(err) => {
                    log::warn!("Earth orientation data unavailable, using UTC for UT1: {err}");
                    None
                }
            }
        } else {
            None
        };

        let ephemeris = AnalyticEphemeris::new(ut1);
        log::info!(
            "Ephemeris '{}' ready (data version {})",
            ephemeris.name(),
            ephemeris.data_version()
        );
        EphemerisCapability::from_provider(Arc::new(ephemeris))
    }

    /// Wrap an externally supplied provider, checking its availability once.
    pub fn from_provider(provider: Arc<dyn Ephemeris>) -> Self {
        if provider.is_available() {
            EphemerisCapability::Available(provider)
        } else {
            EphemerisCapability::Unavailable(format!(
                "ephemeris provider '{}' is not initialized",
                provider.name()
            ))
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, EphemerisCapability::Available(_))
    }

    /// The provider, or [`EngineError::CapabilityUnavailable`].
    pub fn provider(&self) -> Result<&Arc<dyn Ephemeris>, EngineError> {
        match self {
            EphemerisCapability::Available(provider) => Ok(provider),
            EphemerisCapability::Unavailable(reason) => {
                Err(EngineError::CapabilityUnavailable(reason.clone()))
            }
        }
    }

    /// Provider name, or `None` when unavailable.
    pub fn name(&self) -> Option<String> {
        match self {
            EphemerisCapability::Available(provider) => Some(provider.name().to_string()),
            EphemerisCapability::Unavailable(_) => None,
        }
    }
}
