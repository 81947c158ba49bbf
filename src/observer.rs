//! # Observer location & site geometry
//!
//! This module holds the [`ObserverLocation`](crate::observer::ObserverLocation) type, the geographic point for which
//! local eclipse circumstances are computed, and the helpers that place it in space:
//!
//! - Validation of geodetic coordinates (latitude in [-90, 90], longitude in [-180, 180]).
//! - Conversion of geodetic latitude/elevation to normalized parallax coordinates
//!   ([`geodetic_to_parallax`](crate::observer::geodetic_to_parallax)), accounting for Earth oblateness.
//! - The observer's **geocentric position** in the true equator and equinox of date, given the local
//!   Greenwich apparent sidereal time ([`ObserverLocation::geocentric_position`]).
//! - The local **zenith direction** in the same frame, used for the Sun altitude.
//!
//! ## Frames & conventions
//!
//! ```text
//! Body-fixed  --(rotation by GAST about z)-->  true equator & equinox of date
//! ```
//!
//! ## Units
//!
//! - Latitude/longitude: **degrees** (north and east positive).
//! - Elevation: **meters** above the ellipsoid.
//! - Positions: **kilometers**.
use nalgebra::Vector3;
use ordered_float::NotNan;
use serde::{Deserialize, Serialize};

use crate::constants::{Degree, Kilometer, Radian, EARTH_MAJOR_AXIS, EARTH_MINOR_AXIS, EARTH_RADIUS_KM};
use crate::engine_errors::EngineError;

/// Geographic location of an observer on the Earth's surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObserverLocation {
    /// Geodetic latitude in **degrees** (north positive).
    pub latitude: Degree,

    /// Geodetic longitude in **degrees** (east positive).
    pub longitude: Degree,

    /// Elevation above the reference ellipsoid, in **meters**.
    #[serde(default)]
    pub elevation: f64,
}

impl ObserverLocation {
    /// Build a validated observer at sea level.
    ///
    /// Arguments
    /// -----------------
    /// * `latitude`: Geodetic latitude in degrees, within [-90, 90].
    /// * `longitude`: Geodetic longitude in degrees, within [-180, 180].
    ///
    /// Return
    /// ----------
    /// * The location, or [`EngineError::Configuration`] if a coordinate is out of range or NaN.
    pub fn new(latitude: Degree, longitude: Degree) -> Result<Self, EngineError> {
        Self::with_elevation(latitude, longitude, 0.0)
    }

    /// Build a validated observer with an elevation in meters.
    pub fn with_elevation(
        latitude: Degree,
        longitude: Degree,
        elevation: f64,
    ) -> Result<Self, EngineError> {
        let location = ObserverLocation {
            latitude,
            longitude,
            elevation,
        };
        location.validate()?;
        Ok(location)
    }

    /// Check the coordinate ranges.
    ///
    /// Deserialized locations bypass the constructors, so the engine calls this again before use.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(EngineError::Configuration(format!(
                "latitude {} outside [-90, 90]",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(EngineError::Configuration(format!(
                "longitude {} outside [-180, 180]",
                self.longitude
            )));
        }
        if !self.elevation.is_finite() || self.elevation < -500.0 || self.elevation > 10_000.0 {
            return Err(EngineError::Configuration(format!(
                "elevation {} m is not a plausible surface elevation",
                self.elevation
            )));
        }
        Ok(())
    }

    /// Hashable form of the coordinates, used in cache keys.
    pub fn key(&self) -> (NotNan<f64>, NotNan<f64>, NotNan<f64>) {
        // validated values are never NaN; zero keeps the key total anyway
        let nn = |x: f64| NotNan::new(x).unwrap_or_default();
        (nn(self.latitude), nn(self.longitude), nn(self.elevation))
    }

    /// Normalized parallax coordinates (ρ·cosφ', ρ·sinφ') of the site.
    pub fn parallax(&self) -> (f64, f64) {
        geodetic_to_parallax(self.latitude, self.elevation)
    }

    /// Geocentric position of the observer in the true equator and equinox of date.
    ///
    /// Arguments
    /// -----------------
    /// * `gast`: Greenwich apparent sidereal time at the instant, in radians.
    ///
    /// Return
    /// ----------
    /// * Position vector in **kilometers**.
    pub fn geocentric_position(&self, gast: Radian) -> Vector3<Kilometer> {
        let (rho_cos_phi, rho_sin_phi) = self.parallax();
        let theta = gast + self.longitude.to_radians();

        Vector3::new(
            EARTH_RADIUS_KM * rho_cos_phi * theta.cos(),
            EARTH_RADIUS_KM * rho_cos_phi * theta.sin(),
            EARTH_RADIUS_KM * rho_sin_phi,
        )
    }

    /// Unit vector of the local vertical (geodetic zenith) in the true equator and equinox of date.
    pub fn zenith(&self, gast: Radian) -> Vector3<f64> {
        let lat = self.latitude.to_radians();
        let theta = gast + self.longitude.to_radians();

        Vector3::new(lat.cos() * theta.cos(), lat.cos() * theta.sin(), lat.sin())
    }
}

/// Convert geodetic latitude (in radians) and height (in meters)
/// into normalized parallax coordinates.
///
/// Arguments
/// ---------
/// * `lat` - Geodetic latitude of the observer in **radians**.
/// * `height` - Observer's altitude above the reference ellipsoid in **meters**.
///
/// Returns
/// -------
/// * `(ρ·cosφ', ρ·sinφ')` in units of the Earth's equatorial radius.
pub fn lat_alt_to_parallax(lat: f64, height: f64) -> (f64, f64) {
    // Ratio of the Earth's minor to major axis
    let axis_ratio = EARTH_MINOR_AXIS / EARTH_MAJOR_AXIS;

    // parametric (reduced) latitude
    let u = (lat.sin() * axis_ratio).atan2(lat.cos());

    let rho_sin_phi = axis_ratio * u.sin() + (height / EARTH_MAJOR_AXIS) * lat.sin();
    let rho_cos_phi = u.cos() + (height / EARTH_MAJOR_AXIS) * lat.cos();

    (rho_cos_phi, rho_sin_phi)
}

/// Convert geodetic latitude (in degrees) and height (in meters)
/// into normalized parallax coordinates.
///
/// Convenience wrapper around [`lat_alt_to_parallax`].
pub fn geodetic_to_parallax(lat: Degree, height: f64) -> (f64, f64) {
    lat_alt_to_parallax(lat.to_radians(), height)
}
