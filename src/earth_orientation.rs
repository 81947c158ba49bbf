use crate::constants::{ArcSec, Radian, DPI, JULIAN_CENTURY, RADEG, RADSEC, T2000};

/// Compute the mean obliquity of the ecliptic at a given epoch (IAU 1976 model).
///
/// Arguments
/// ---------
/// * `tjm`: Modified Julian Date (TT scale).
///
/// Returns
/// --------
/// * Mean obliquity of the ecliptic in radians.
///
/// Formula
/// -------
/// ```text
/// ε(t) = ε₀ + ε₁·T + ε₂·T² + ε₃·T³
/// ```
/// with `T = (tjm - T2000) / 36525.0`, evaluated with Horner's method.
pub fn obleq(tjm: f64) -> Radian {
    let ob0 = ((23.0 * 3600.0 + 26.0 * 60.0) + 21.448) * RADSEC;
    let ob1 = -46.815 * RADSEC;
    let ob2 = -0.0006 * RADSEC;
    let ob3 = 0.00181 * RADSEC;

    let t = (tjm - T2000) / JULIAN_CENTURY;

    ((ob3 * t + ob2) * t + ob1) * t + ob0
}

/// Nutation in longitude and obliquity, truncated IAU 1980 series.
///
/// Keeps the four leading terms of the Wahr series (lunar node, twice the mean longitudes of
/// the Sun and the Moon, twice the node), which brings the error under 0.5 arcsecond. That is
/// well below what eclipse contact timing needs.
///
/// Arguments
/// ---------
/// * `tjm`: Modified Julian Date (TT scale).
///
/// Returns
/// --------
/// * `(Δψ, Δε)` in arcseconds.
pub fn nutation(tjm: f64) -> (ArcSec, ArcSec) {
    let t = (tjm - T2000) / JULIAN_CENTURY;

    // longitude of the ascending node of the lunar orbit
    let omega = (125.04452 - 1934.136261 * t) * RADEG;
    // mean longitudes of the Sun and the Moon
    let l_sun = (280.4665 + 36000.7698 * t) * RADEG;
    let l_moon = (218.3165 + 481267.8813 * t) * RADEG;

    let dpsi = -17.20 * omega.sin() - 1.32 * (2.0 * l_sun).sin() - 0.23 * (2.0 * l_moon).sin()
        + 0.21 * (2.0 * omega).sin();
    let deps = 9.20 * omega.cos() + 0.57 * (2.0 * l_sun).cos() + 0.10 * (2.0 * l_moon).cos()
        - 0.09 * (2.0 * omega).cos();

    (dpsi, deps)
}

/// True obliquity of the ecliptic (mean obliquity plus nutation in obliquity), in radians.
pub fn true_obliquity(tjm: f64) -> Radian {
    let (_, deps) = nutation(tjm);
    obleq(tjm) + deps * RADSEC
}

/// Equation of the equinoxes, in radians.
///
/// Difference between apparent and mean sidereal time: `Δψ·cos(ε)`.
pub fn equequ(tjm: f64) -> Radian {
    let (dpsi, _) = nutation(tjm);
    (dpsi * RADSEC * true_obliquity(tjm).cos()).rem_euclid(DPI)
}
