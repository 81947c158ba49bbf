//! # Local visibility of a solar eclipse
//!
//! Given an [`EclipseRecord`] and an [`ObserverLocation`], the [`VisibilityCalculator`] finds how
//! much of the Sun the Moon hides from that place, when the obscuration peaks and when it begins
//! and ends.
//!
//! ## Geometry
//!
//! At an instant the topocentric Sun and Moon are two disks of apparent radii `R` (Sun) and `r`
//! (Moon) whose centers are `d` apart. The coverage is the area of their intersection as a
//! percentage of the Sun's disk:
//!
//! ```text
//! d ≥ R + r        → 0 %
//! d ≤ |R − r|      → 100 · min(R, r)² / R²
//! otherwise        → 100 · lens(d, R, r) / (π R²)
//! ```
//!
//! Coverage only counts while the Sun's center is above the apparent horizon
//! ([`SUN_HORIZON_ALTITUDE`]), so a positive result is an eclipse that can actually be watched.
//!
//! ## Search
//!
//! 1. Coarse scan every [`COARSE_STEP`] seconds over ±[`SEARCH_HALF_WINDOW`] around the catalog's
//!    greatest eclipse, or ±[`DAY_SEARCH_HALF_WINDOW`] around noon UTC when it is unknown.
//! 2. Golden-section refinement of the peak to [`TIME_TOLERANCE`], on the Sun–Moon separation
//!    (smooth everywhere), then on the coverage itself when the horizon clips the peak.
//! 3. Contacts: walk outward from the peak by [`CONTACT_STEP`] until the coverage vanishes (at
//!    most [`CONTACT_LIMIT`]), then bisect the crossing.
//!
//! Every step is a fixed sequence of evaluations: identical inputs and ephemeris data give
//! bit-identical results.
use std::sync::Arc;

use hifitime::{Duration, Epoch};
use nalgebra::Vector3;

use crate::{
    catalog::EclipseRecord,
    constants::{
        Degree, Percent, Radian, COARSE_STEP, CONTACT_LIMIT, CONTACT_STEP, DAY_SEARCH_HALF_WINDOW,
        SEARCH_HALF_WINDOW, SUN_HORIZON_ALTITUDE, TIME_TOLERANCE,
    },
    engine_errors::EngineError,
    ephemeris::{Body, Ephemeris, EphemerisCapability},
    observer::ObserverLocation,
    time::{date_to_epoch, shift_seconds},
};

/// Fraction of a disk of radius `big_r` hidden by a disk of radius `small_r` at center
/// distance `d`, in `[0, 1]`.
pub fn disk_overlap_fraction(d: Radian, big_r: Radian, small_r: Radian) -> f64 {
    if big_r <= 0.0 || d >= big_r + small_r {
        return 0.0;
    }
    if d <= (big_r - small_r).abs() {
        return (big_r.min(small_r) / big_r).powi(2);
    }

    let (r1, r2) = (big_r, small_r);
    let a1 = ((d * d + r1 * r1 - r2 * r2) / (2.0 * d * r1)).clamp(-1.0, 1.0).acos();
    let a2 = ((d * d + r2 * r2 - r1 * r1) / (2.0 * d * r2)).clamp(-1.0, 1.0).acos();
    let kite = ((-d + r1 + r2) * (d + r1 - r2) * (d - r1 + r2) * (d + r1 + r2)).max(0.0);
    let lens = r1 * r1 * a1 + r2 * r2 * a2 - 0.5 * kite.sqrt();

    (lens / (std::f64::consts::PI * r1 * r1)).clamp(0.0, 1.0)
}

/// Angle between two vectors, accurate for nearly aligned ones.
fn angle_between(a: &Vector3<f64>, b: &Vector3<f64>) -> Radian {
    a.cross(b).norm().atan2(a.dot(b))
}

/// Sun and Moon disks seen by an observer at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiskGeometry {
    /// Angular distance between the centers.
    pub separation: Radian,
    pub sun_radius: Radian,
    pub moon_radius: Radian,
    /// Geometric altitude of the Sun's center.
    pub sun_altitude: Degree,
}

impl DiskGeometry {
    pub fn sun_above_horizon(&self) -> bool {
        self.sun_altitude > SUN_HORIZON_ALTITUDE
    }

    /// Obscured percentage of the solar disk, zero when the Sun is down.
    pub fn coverage(&self) -> Percent {
        if !self.sun_above_horizon() {
            return 0.0;
        }
        100.0 * disk_overlap_fraction(self.separation, self.sun_radius, self.moon_radius)
    }

    /// Fraction of the solar diameter covered by the Moon.
    pub fn magnitude(&self) -> f64 {
        let depth = self.sun_radius + self.moon_radius - self.separation;
        if depth <= 0.0 {
            0.0
        } else {
            depth / (2.0 * self.sun_radius)
        }
    }
}

/// Local circumstances of one eclipse for one observer.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityResult {
    /// The catalog event these circumstances belong to.
    pub record: Arc<EclipseRecord>,
    coverage: Percent,
    /// Magnitude at the local maximum; zero when not visible.
    pub magnitude: f64,
    pub local_start: Option<Epoch>,
    pub local_maximum: Option<Epoch>,
    pub local_end: Option<Epoch>,
    /// Sun altitude at the local maximum, in degrees.
    pub sun_altitude: Option<Degree>,
}

impl VisibilityResult {
    fn not_visible(record: Arc<EclipseRecord>) -> Self {
        VisibilityResult {
            record,
            coverage: 0.0,
            magnitude: 0.0,
            local_start: None,
            local_maximum: None,
            local_end: None,
            sun_altitude: None,
        }
    }

    /// Peak coverage at full precision.
    pub fn coverage_exact(&self) -> Percent {
        self.coverage
    }

    /// Peak coverage rounded to one decimal for display.
    ///
    /// A visible eclipse never displays as `0.0`: coverages below the rounding step show as `0.1`.
    pub fn coverage_percent(&self) -> Percent {
        if self.coverage <= 0.0 {
            return 0.0;
        }
        ((self.coverage * 10.0).round() / 10.0).max(0.1)
    }

    pub fn is_visible(&self) -> bool {
        self.coverage > 0.0
    }

    /// Time between the first and last local contact.
    pub fn duration(&self) -> Option<Duration> {
        Some(self.local_end? - self.local_start?)
    }
}

/// Computes local circumstances from an ephemeris provider. Stateless between calls.
#[derive(Debug, Clone)]
pub struct VisibilityCalculator {
    ephemeris: Arc<dyn Ephemeris>,
}

impl VisibilityCalculator {
    pub fn new(ephemeris: Arc<dyn Ephemeris>) -> Self {
        VisibilityCalculator { ephemeris }
    }

    /// A calculator backed by the capability's provider.
    ///
    /// Return
    /// ------
    /// * [`EngineError::CapabilityUnavailable`] when there is no provider, which is distinct from
    ///   a computed zero coverage
    pub fn from_capability(capability: &EphemerisCapability) -> Result<Self, EngineError> {
        Ok(Self::new(capability.provider()?.clone()))
    }

    /// Version of the ephemeris data the results depend on.
    pub fn data_version(&self) -> String {
        self.ephemeris.data_version()
    }

    /// Disk geometry seen by `observer` at `epoch`.
    pub fn geometry_at(&self, observer: &ObserverLocation, epoch: &Epoch) -> DiskGeometry {
        let gast = self.ephemeris.apparent_sidereal_time(epoch);
        let site = observer.geocentric_position(gast);
        let sun = self.ephemeris.position(Body::Sun, epoch) - site;
        let moon = self.ephemeris.position(Body::Moon, epoch) - site;

        let sun_radius = (Body::Sun.radius() / sun.norm()).clamp(-1.0, 1.0).asin();
        let moon_radius = (Body::Moon.radius() / moon.norm()).clamp(-1.0, 1.0).asin();
        let altitude = (sun.normalize().dot(&observer.zenith(gast)))
            .clamp(-1.0, 1.0)
            .asin();

        DiskGeometry {
            separation: angle_between(&sun, &moon),
            sun_radius,
            moon_radius,
            sun_altitude: altitude.to_degrees(),
        }
    }

    /// Instantaneous coverage in percent.
    pub fn coverage_at(&self, observer: &ObserverLocation, epoch: &Epoch) -> Percent {
        self.geometry_at(observer, epoch).coverage()
    }

    /// Local circumstances of `record` for `observer`.
    ///
    /// Arguments
    /// -----------------
    /// * `record`: the event, whose greatest-eclipse instant (if any) centers the search.
    /// * `observer`: the location.
    ///
    /// Return
    /// ----------
    /// * The result; a zero coverage with no contact means the eclipse is not visible there.
    pub fn compute_visibility(
        &self,
        record: &Arc<EclipseRecord>,
        observer: &ObserverLocation,
    ) -> VisibilityResult {
        let (origin, half_window) = match record.maximum_utc {
            Some(maximum) => (maximum, SEARCH_HALF_WINDOW),
            None => (
                shift_seconds(&date_to_epoch(record.date_utc), 12.0 * 3600.0),
                DAY_SEARCH_HALF_WINDOW,
            ),
        };
        let search = Search {
            calculator: self,
            observer,
            origin,
        };

        let Some((t_max, geometry)) = search.peak(half_window) else {
            log::debug!("{} not visible from {observer:?}", record.date_utc);
            return VisibilityResult::not_visible(record.clone());
        };
        let t_start = search.contact(t_max, -1.0);
        let t_end = search.contact(t_max, 1.0);

        let result = VisibilityResult {
            record: record.clone(),
            coverage: geometry.coverage(),
            magnitude: geometry.magnitude(),
            local_start: Some(search.at(t_start)),
            local_maximum: Some(search.at(t_max)),
            local_end: Some(search.at(t_end)),
            sun_altitude: Some(geometry.sun_altitude),
        };
        log::debug!(
            "{} visible from {observer:?}: {:.1} % at {}",
            record.date_utc,
            result.coverage_percent(),
            search.at(t_max)
        );
        result
    }
}

/// Evaluations around a reference instant; times are seconds from `origin`.
struct Search<'a> {
    calculator: &'a VisibilityCalculator,
    observer: &'a ObserverLocation,
    origin: Epoch,
}

impl Search<'_> {
    fn at(&self, offset: f64) -> Epoch {
        shift_seconds(&self.origin, offset)
    }

    fn geometry(&self, offset: f64) -> DiskGeometry {
        self.calculator.geometry_at(self.observer, &self.at(offset))
    }

    fn coverage(&self, offset: f64) -> Percent {
        self.geometry(offset).coverage()
    }

    /// Instant and geometry of the visible maximum, or `None` if nothing is visible.
    fn peak(&self, half_window: f64) -> Option<(f64, DiskGeometry)> {
        let samples = (2.0 * half_window / COARSE_STEP).round() as usize;

        let mut best = (-half_window, 0.0);
        let mut closest = (-half_window, f64::INFINITY);
        for i in 0..=samples {
            let t = -half_window + i as f64 * COARSE_STEP;
            let geometry = self.geometry(t);
            let coverage = geometry.coverage();
            if coverage > best.1 {
                best = (t, coverage);
            }
            let gap = geometry.separation - geometry.sun_radius - geometry.moon_radius;
            if gap < closest.1 {
                closest = (t, gap);
            }
        }

        // short grazing phases can fall between two samples
        let seed = if best.1 > 0.0 { best.0 } else { closest.0 };
        let (t_sep, _) = golden_section_max(
            |t| -self.geometry(t).separation,
            seed - COARSE_STEP,
            seed + COARSE_STEP,
            TIME_TOLERANCE,
        );
        let mut peak = (t_sep, self.coverage(t_sep));

        // the horizon cuts the eclipse: the visible maximum is at sunrise or sunset
        if best.1 > peak.1 {
            let refined = golden_section_max(
                |t| self.coverage(t),
                best.0 - COARSE_STEP,
                best.0 + COARSE_STEP,
                TIME_TOLERANCE,
            );
            peak = if refined.1 >= best.1 { refined } else { best };
        }

        if peak.1 <= 0.0 {
            return None;
        }
        Some((peak.0, self.geometry(peak.0)))
    }

    /// Last instant with positive coverage, walking from `t_max` in `direction` (±1).
    fn contact(&self, t_max: f64, direction: f64) -> f64 {
        let mut inside = t_max;
        let mut travelled = 0.0;

        while travelled < CONTACT_LIMIT {
            let step = CONTACT_STEP.min(CONTACT_LIMIT - travelled);
            let candidate = inside + direction * step;
            travelled += step;
            if self.coverage(candidate) <= 0.0 {
                return self.bisect_contact(inside, candidate);
            }
            inside = candidate;
        }
        inside
    }

    fn bisect_contact(&self, mut inside: f64, mut outside: f64) -> f64 {
        while (outside - inside).abs() > TIME_TOLERANCE {
            let mid = 0.5 * (inside + outside);
            if self.coverage(mid) > 0.0 {
                inside = mid;
            } else {
                outside = mid;
            }
        }
        inside
    }
}

/// Maximize a unimodal function on `[a, b]` by golden-section search.
///
/// Return
/// ------
/// * `(x, f(x))` at the center of the final bracket, narrower than `tolerance`
pub fn golden_section_max(
    f: impl Fn(f64) -> f64,
    mut a: f64,
    mut b: f64,
    tolerance: f64,
) -> (f64, f64) {
    const INV_PHI: f64 = 0.618_033_988_749_894_8;

    let mut c = b - INV_PHI * (b - a);
    let mut d = a + INV_PHI * (b - a);
    let mut fc = f(c);
    let mut fd = f(d);

    while (b - a).abs() > tolerance {
        if fc >= fd {
            b = d;
            d = c;
            fd = fc;
            c = b - INV_PHI * (b - a);
            fc = f(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + INV_PHI * (b - a);
            fd = f(d);
        }
    }

    let x = 0.5 * (a + b);
    (x, f(x))
}
