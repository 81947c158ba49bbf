//! # Constants and type definitions for Umbra
//!
//! This module centralizes the **physical constants**, **conversion factors**, and **common type
//! aliases** used throughout the engine, together with the default catalog locations and the
//! tuning values of the prediction pipeline.
//!
//! ## Overview
//!
//! - Astronomical and geophysical constants
//! - Unit conversions (degrees ↔ radians, arcseconds ↔ radians)
//! - Core type aliases used across the crate
//! - Remote catalog locations (NASA/GSFC decade tables and JSEX region index)
//! - Engine defaults (timeouts, concurrency, cache TTL, search windows)

use std::time::Duration;

// -------------------------------------------------------------------------------------------------
// Physical constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Number of seconds in a Julian day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Astronomical Unit in kilometers (IAU 2012)
pub const AU: f64 = 149_597_870.7;

/// MJD epoch of J2000.0 (2000-01-01 12:00:00 TT)
pub const T2000: f64 = 51544.5;

/// Days in a Julian century
pub const JULIAN_CENTURY: f64 = 36525.0;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Arcseconds → radians
pub const RADSEC: f64 = std::f64::consts::PI / 648000.0;

/// Earth equatorial radius in meters (GRS1980/WGS84)
pub const EARTH_MAJOR_AXIS: f64 = 6_378_137.0;

/// Earth polar radius in meters (GRS1980/WGS84)
pub const EARTH_MINOR_AXIS: f64 = 6_356_752.3;

/// Earth equatorial radius in kilometers
pub const EARTH_RADIUS_KM: f64 = EARTH_MAJOR_AXIS / 1000.0;

/// Solar photospheric radius in kilometers (IAU 2015 nominal)
pub const SUN_RADIUS_KM: f64 = 695_700.0;

/// Mean lunar radius in kilometers (k = 0.2725076 Earth radii, the eclipse-prediction value)
pub const MOON_RADIUS_KM: f64 = 1_737.4;

/// Apparent altitude of the Sun's center at rise/set (refraction + semi-diameter), in degrees
pub const SUN_HORIZON_ALTITUDE: f64 = -0.833;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in arcseconds
pub type ArcSec = f64;
/// Angle in radians
pub type Radian = f64;
/// Distance in kilometers
pub type Kilometer = f64;
/// Modified Julian Date (days)
pub type MJD = f64;
/// Coverage of the solar disk, in percent
pub type Percent = f64;

// -------------------------------------------------------------------------------------------------
// Remote catalogs
// -------------------------------------------------------------------------------------------------

/// NASA/GSFC decade tables, one page per decade of solar eclipses.
pub const NASA_DECADE_URLS: [&str; 5] = [
    "https://eclipse.gsfc.nasa.gov/SEdecade/SEdecade2021.html",
    "https://eclipse.gsfc.nasa.gov/SEdecade/SEdecade2031.html",
    "https://eclipse.gsfc.nasa.gov/SEdecade/SEdecade2041.html",
    "https://eclipse.gsfc.nasa.gov/SEdecade/SEdecade2051.html",
    "https://eclipse.gsfc.nasa.gov/SEdecade/SEdecade2061.html",
];

/// Index page of the JSEX regional eclipse listings.
pub const JSEX_INDEX_URL: &str = "https://eclipse.gsfc.nasa.gov/JSEX/JSEX-index.html";

/// Base URL used to resolve relative links found on the JSEX index.
pub const JSEX_BASE_URL: &str = "https://eclipse.gsfc.nasa.gov/JSEX/";

/// Link labels of the JSEX index, keyed by the supported region they describe.
pub const JSEX_REGION_LABELS: [(&str, &str); 6] = [
    ("Europe", "Europe"),
    ("Africa", "Africa"),
    ("Asia", "Asia and Asia Minor"),
    ("North America", "North America"),
    ("South America", "South America"),
    ("Oceania", "Southeast Asia, Australia & Oceana"),
];

/// Attribution string attached to every catalog record.
pub const ATTRIBUTION: &str = "Eclipse predictions by NASA/GSFC";

/// User agent sent with every catalog request.
pub const USER_AGENT: &str = concat!("umbra/", env!("CARGO_PKG_VERSION"), " (eclipse visibility engine)");

/// JPL Earth orientation parameters, used for UT1.
pub const EOP_FILE_NAME: &str = "latest_eop2.long";

/// Remote location of the JPL Earth orientation files.
pub const EOP_BASE_URL: &str = "https://eop2-external.jpl.nasa.gov/eop2/";

// -------------------------------------------------------------------------------------------------
// Engine defaults
// -------------------------------------------------------------------------------------------------

/// Per-request timeout for catalog fetches.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Backoff before the single retry of a failed fetch.
pub const FETCH_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Upper bound on simultaneous visibility computations.
pub const VISIBILITY_CONCURRENCY: usize = 4;

/// Lifetime of cached catalogs and predictions.
pub const CACHE_TTL: Duration = Duration::from_secs(24 * 3600);

/// Lifetime of a catalog built from the fallback dataset, after which remote sources are retried.
pub const DEGRADED_CATALOG_TTL: Duration = Duration::from_secs(3600);

/// Largest number of events a single request may ask for.
pub const MAX_EVENTS: usize = 10;

/// Half-width of the search window around a known greatest-eclipse instant, in seconds.
pub const SEARCH_HALF_WINDOW: f64 = 3.0 * 3600.0;

/// Half-width of the search window around noon UTC when the greatest-eclipse instant is unknown.
pub const DAY_SEARCH_HALF_WINDOW: f64 = 14.0 * 3600.0;

/// Coarse sampling step of the visibility search, in seconds.
pub const COARSE_STEP: f64 = 300.0;

/// Stepping used when walking outward from the maximum to bracket contacts, in seconds.
pub const CONTACT_STEP: f64 = 120.0;

/// Farthest distance from the maximum searched for a contact, in seconds.
pub const CONTACT_LIMIT: f64 = 4.0 * 3600.0;

/// Time resolution of the maximum and contact refinements, in seconds.
pub const TIME_TOLERANCE: f64 = 1.0;
