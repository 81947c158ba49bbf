//! Built-in low-precision Sun and Moon ephemeris.
//!
//! Positions follow Meeus, *Astronomical Algorithms* (2nd ed.):
//!
//! * Sun: chapter 25 (geometric longitude from the equation of center), corrected for
//!   nutation and annual aberration. Error of a few arcseconds.
//! * Moon: chapter 47 with the complete table 47.A and the leading terms of table 47.B,
//!   plus the additive Venus/Jupiter/flattening terms. Error around 10 arcseconds.
//!
//! Both are converted to rectangular coordinates in the true equator and equinox of date.
//! Earth rotation uses GMST plus the equation of the equinoxes, on UT1 when Earth orientation
//! data is loaded and on UTC otherwise (|UT1 - UTC| < 0.9 s).
use std::collections::HashMap;

use hifitime::{ut1::Ut1Provider, Epoch};
use nalgebra::Vector3;
use parking_lot::Mutex;

use crate::{
    constants::{Kilometer, Radian, AU, JULIAN_CENTURY, RADEG, RADSEC, SECONDS_PER_DAY, T2000},
    earth_orientation::{equequ, nutation, true_obliquity},
    time::gmst,
};

use super::{Body, Ephemeris};

/// Periodic terms for the Moon's longitude and distance (Meeus table 47.A).
///
/// Each entry: (D, M, M', F, Σl coefficient in 1e-6 degree, Σr coefficient in 1e-3 km)
const TERMS_LR: [(i8, i8, i8, i8, f64, f64); 60] = [
    (0, 0, 1, 0, 6288774.0, -20905355.0),
    (2, 0, -1, 0, 1274027.0, -3699111.0),
    (2, 0, 0, 0, 658314.0, -2955968.0),
    (0, 0, 2, 0, 213618.0, -569925.0),
    (0, 1, 0, 0, -185116.0, 48888.0),
    (0, 0, 0, 2, -114332.0, -3149.0),
    (2, 0, -2, 0, 58793.0, 246158.0),
    (2, -1, -1, 0, 57066.0, -152138.0),
    (2, 0, 1, 0, 53322.0, -170733.0),
    (2, -1, 0, 0, 45758.0, -204586.0),
    (0, 1, -1, 0, -40923.0, -129620.0),
    (1, 0, 0, 0, -34720.0, 108743.0),
    (0, 1, 1, 0, -30383.0, 104755.0),
    (2, 0, 0, -2, 15327.0, 10321.0),
    (0, 0, 1, 2, -12528.0, 0.0),
    (0, 0, 1, -2, 10980.0, 79661.0),
    (4, 0, -1, 0, 10675.0, -34782.0),
    (0, 0, 3, 0, 10034.0, -23210.0),
    (4, 0, -2, 0, 8548.0, -21636.0),
    (2, 1, -1, 0, -7888.0, 24208.0),
    (2, 1, 0, 0, -6766.0, 30824.0),
    (1, 0, -1, 0, -5163.0, -8379.0),
    (1, 1, 0, 0, 4987.0, -16675.0),
    (2, -1, 1, 0, 4036.0, -12831.0),
    (2, 0, 2, 0, 3994.0, -10445.0),
    (4, 0, 0, 0, 3861.0, -11650.0),
    (2, 0, -3, 0, 3665.0, 14403.0),
    (0, 1, -2, 0, -2689.0, -7003.0),
    (2, 0, -1, 2, -2602.0, 0.0),
    (2, -1, -2, 0, 2390.0, 10056.0),
    (1, 0, 1, 0, -2348.0, 6322.0),
    (2, -2, 0, 0, 2236.0, -9884.0),
    (0, 1, 2, 0, -2120.0, 5751.0),
    (0, 2, 0, 0, -2069.0, 0.0),
    (2, -2, -1, 0, 2048.0, -4950.0),
    (2, 0, 1, -2, -1773.0, 4130.0),
    (2, 0, 0, 2, -1595.0, 0.0),
    (4, -1, -1, 0, 1215.0, -3958.0),
    (0, 0, 2, 2, -1110.0, 0.0),
    (3, 0, -1, 0, -892.0, 3258.0),
    (2, 1, 1, 0, -810.0, 2616.0),
    (4, -1, -2, 0, 759.0, -1897.0),
    (0, 2, -1, 0, -713.0, -2117.0),
    (2, 2, -1, 0, -700.0, 2354.0),
    (2, 1, -2, 0, 691.0, 0.0),
    (2, -1, 0, -2, 596.0, 0.0),
    (4, 0, 1, 0, 549.0, -1423.0),
    (0, 0, 4, 0, 537.0, -1117.0),
    (4, -1, 0, 0, 520.0, -1571.0),
    (1, 0, -2, 0, -487.0, -1739.0),
    (2, 1, 0, -2, -399.0, 0.0),
    (0, 0, 2, -2, -381.0, -4421.0),
    (1, 1, 1, 0, 351.0, 0.0),
    (3, 0, -2, 0, -340.0, 0.0),
    (4, 0, -3, 0, 330.0, 0.0),
    (2, -1, 2, 0, 327.0, 0.0),
    (0, 2, 1, 0, -323.0, 1165.0),
    (1, 1, -1, 0, 299.0, 0.0),
    (2, 0, 3, 0, 294.0, 0.0),
    (2, 0, -1, -2, 0.0, 8752.0),
];

/// Periodic terms for the Moon's latitude (Meeus table 47.B, leading terms).
///
/// Each entry: (D, M, M', F, Σb coefficient in 1e-6 degree)
const TERMS_B: [(i8, i8, i8, i8, f64); 30] = [
    (0, 0, 0, 1, 5128122.0),
    (0, 0, 1, 1, 280602.0),
    (0, 0, 1, -1, 277693.0),
    (2, 0, 0, -1, 173237.0),
    (2, 0, -1, 1, 55413.0),
    (2, 0, -1, -1, 46271.0),
    (2, 0, 0, 1, 32573.0),
    (0, 0, 2, 1, 17198.0),
    (2, 0, 1, -1, 9266.0),
    (0, 0, 2, -1, 8822.0),
    (2, -1, 0, -1, 8216.0),
    (2, 0, -2, -1, 4324.0),
    (2, 0, 1, 1, 4200.0),
    (2, 1, 0, -1, -3359.0),
    (2, -1, -1, 1, 2463.0),
    (2, -1, 0, 1, 2211.0),
    (2, -1, -1, -1, 2065.0),
    (0, 1, -1, -1, -1870.0),
    (4, 0, -1, -1, 1828.0),
    (0, 1, 0, 1, -1794.0),
    (0, 0, 0, 3, -1749.0),
    (0, 1, -1, 1, -1565.0),
    (1, 0, 0, 1, -1491.0),
    (0, 1, 1, 1, -1475.0),
    (0, 1, 1, -1, -1410.0),
    (0, 1, 0, -1, -1344.0),
    (1, 0, 0, -1, -1335.0),
    (0, 0, 3, 1, 1107.0),
    (4, 0, 0, -1, 1021.0),
    (4, 0, -1, 1, 833.0),
];

/// Apparent ecliptic coordinates of date: longitude, latitude (radians), distance (km).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EclipticPosition {
    pub longitude: Radian,
    pub latitude: Radian,
    pub distance: Kilometer,
}

impl EclipticPosition {
    /// Rectangular coordinates in the true equator and equinox of date.
    pub fn to_equatorial(&self, obliquity: Radian) -> Vector3<Kilometer> {
        let (sl, cl) = self.longitude.sin_cos();
        let (sb, cb) = self.latitude.sin_cos();
        let (se, ce) = obliquity.sin_cos();

        Vector3::new(
            self.distance * cb * cl,
            self.distance * (cb * sl * ce - sb * se),
            self.distance * (cb * sl * se + sb * ce),
        )
    }
}

/// Apparent geocentric ecliptic position of the Sun.
///
/// Arguments
/// ---------
/// * `tjm`: Modified Julian Date (TT scale).
pub fn sun_position(tjm: f64) -> EclipticPosition {
    let t = (tjm - T2000) / JULIAN_CENTURY;
    let t2 = t * t;

    let l0 = 280.46646 + 36000.76983 * t + 0.0003032 * t2;
    let m = (357.52911 + 35999.05029 * t - 0.0001537 * t2) * RADEG;
    let e = 0.016708634 - 0.000042037 * t - 0.0000001267 * t2;

    let c = (1.914602 - 0.004817 * t - 0.000014 * t2) * m.sin()
        + (0.019993 - 0.000101 * t) * (2.0 * m).sin()
        + 0.000289 * (3.0 * m).sin();

    let true_longitude = (l0 + c) * RADEG;
    let nu = m + c * RADEG;
    let radius_au = 1.000001018 * (1.0 - e * e) / (1.0 + e * nu.cos());

    let (dpsi, _) = nutation(tjm);
    let aberration = -20.4898 / radius_au;

    EclipticPosition {
        longitude: true_longitude + (dpsi + aberration) * RADSEC,
        latitude: 0.0,
        distance: radius_au * AU,
    }
}

/// Apparent geocentric ecliptic position of the Moon.
///
/// Arguments
/// ---------
/// * `tjm`: Modified Julian Date (TT scale).
pub fn moon_position(tjm: f64) -> EclipticPosition {
    let t = (tjm - T2000) / JULIAN_CENTURY;
    let t2 = t * t;
    let t3 = t2 * t;
    let t4 = t3 * t;

    let lp = 218.3164477 + 481267.88123421 * t - 0.0015786 * t2 + t3 / 538841.0 - t4 / 65194000.0;
    let d = 297.8501921 + 445267.1114034 * t - 0.0018819 * t2 + t3 / 545868.0 - t4 / 113065000.0;
    let m = 357.5291092 + 35999.0502909 * t - 0.0001536 * t2 + t3 / 24490000.0;
    let mp = 134.9633964 + 477198.8675055 * t + 0.0087414 * t2 + t3 / 69699.0 - t4 / 14712000.0;
    let f = 93.2720950 + 483202.0175233 * t - 0.0036539 * t2 - t3 / 3526000.0 + t4 / 863310000.0;

    let a1 = (119.75 + 131.849 * t) * RADEG;
    let a2 = (53.09 + 479264.290 * t) * RADEG;
    let a3 = (313.45 + 481266.484 * t) * RADEG;

    // eccentricity of the Earth's orbit, damping the terms in M
    let e = 1.0 - 0.002516 * t - 0.0000074 * t2;
    let e_factor = |mult: i8| match mult.abs() {
        1 => e,
        2 => e * e,
        _ => 1.0,
    };

    let (lp, d, m, mp, f) = (lp * RADEG, d * RADEG, m * RADEG, mp * RADEG, f * RADEG);
    let argument = |cd: i8, cm: i8, cmp: i8, cf: i8| {
        cd as f64 * d + cm as f64 * m + cmp as f64 * mp + cf as f64 * f
    };

    let (mut sum_l, sum_r) = TERMS_LR.iter().fold(
        (0.0, 0.0),
        |(sl, sr), &(cd, cm, cmp, cf, coeff_l, coeff_r)| {
            let arg = argument(cd, cm, cmp, cf);
            let scale = e_factor(cm);
            (sl + coeff_l * scale * arg.sin(), sr + coeff_r * scale * arg.cos())
        },
    );

    let mut sum_b = TERMS_B
        .iter()
        .map(|&(cd, cm, cmp, cf, coeff_b)| {
            coeff_b * e_factor(cm) * argument(cd, cm, cmp, cf).sin()
        })
        .sum::<f64>();

    sum_l += 3958.0 * a1.sin() + 1962.0 * (lp - f).sin() + 318.0 * a2.sin();
    sum_b += -2235.0 * lp.sin()
        + 382.0 * a3.sin()
        + 175.0 * (a1 - f).sin()
        + 175.0 * (a1 + f).sin()
        + 127.0 * (lp - mp).sin()
        - 115.0 * (lp + mp).sin();

    let (dpsi, _) = nutation(tjm);

    EclipticPosition {
        longitude: lp + (sum_l / 1e6) * RADEG + dpsi * RADSEC,
        latitude: (sum_b / 1e6) * RADEG,
        distance: 385000.56 + sum_r / 1000.0,
    }
}

/// Sun and Moon from closed-form series, with optional UT1 from JPL Earth orientation data.
#[derive(Debug)]
pub struct AnalyticEphemeris {
    ut1_provider: Option<Ut1Provider>,
    /// UT1 - UTC in days, memoized per integer MJD (UTC)
    ut1_offsets: Mutex<HashMap<i64, f64>>,
}

impl AnalyticEphemeris {
    pub fn new(ut1_provider: Option<Ut1Provider>) -> Self {
        AnalyticEphemeris {
            ut1_provider,
            ut1_offsets: Mutex::new(HashMap::new()),
        }
    }

    /// UT1 as a Modified Julian Date.
    ///
    /// The UT1 - UTC difference changes by a few milliseconds per day, so a single value per
    /// UTC day is used. Outside the span of the Earth orientation file, or without one, UT1 is
    /// approximated by UTC.
    fn mjd_ut1(&self, epoch: &Epoch) -> f64 {
        let mjd_utc = epoch.to_mjd_utc_days();
        let Some(provider) = &self.ut1_provider else {
            return mjd_utc;
        };

        let day = mjd_utc.floor() as i64;
        let offset = *self.ut1_offsets.lock().entry(day).or_insert_with(|| {
            epoch
                .ut1_offset(provider)
                .map(|tai_minus_ut1| {
                    let ut1 = epoch.to_mjd_tai_days() - tai_minus_ut1.to_seconds() / SECONDS_PER_DAY;
                    ut1 - mjd_utc
                })
                // |UT1 - UTC| is kept under 0.9 s; anything else is a lookup miss
                .filter(|dut1| dut1.abs() * SECONDS_PER_DAY < 1.0)
                .unwrap_or(0.0)
        });
        mjd_utc + offset
    }
}

impl Ephemeris for AnalyticEphemeris {
    fn name(&self) -> &str {
        "analytic-meeus"
    }

    fn data_version(&self) -> String {
        match self.ut1_provider {
            Some(_) => "meeus-25-47/ut1-eop".to_string(),
            None => "meeus-25-47/utc".to_string(),
        }
    }

    fn position(&self, body: Body, epoch: &Epoch) -> Vector3<Kilometer> {
        let tjm = epoch.to_mjd_tt_days();
        match body {
            Body::Sun => sun_position(tjm).to_equatorial(true_obliquity(tjm)),
            Body::Moon => moon_position(tjm).to_equatorial(true_obliquity(tjm)),
            Body::Earth => Vector3::zeros(),
        }
    }

    fn apparent_sidereal_time(&self, epoch: &Epoch) -> Radian {
        gmst(self.mjd_ut1(epoch)) + equequ(epoch.to_mjd_tt_days())
    }
}

#[cfg(test)]
mod analytic_ephemeris_test {
    use super::*;
    use crate::observer::ObserverLocation;
    use approx::assert_abs_diff_eq;
    use hifitime::TimeScale;

    fn wrap_degrees(x: f64) -> f64 {
        x.to_degrees().rem_euclid(360.0)
    }

    #[test]
    fn test_sun_meeus_example_25a() {
        // 1992 October 13, 0h TD
        let pos = sun_position(48908.0);
        assert_abs_diff_eq!(wrap_degrees(pos.longitude), 199.90895, epsilon = 2e-3);
        assert_abs_diff_eq!(pos.distance / AU, 0.99766, epsilon = 1e-4);

        let eq = pos.to_equatorial(true_obliquity(48908.0));
        let ra = wrap_degrees(eq.y.atan2(eq.x));
        let dec = (eq.z / eq.norm()).asin().to_degrees();
        assert_abs_diff_eq!(ra, 198.38083, epsilon = 3e-3);
        assert_abs_diff_eq!(dec, -7.78507, epsilon = 3e-3);
    }

    #[test]
    fn test_moon_meeus_example_47a() {
        // 1992 April 12, 0h TD
        let pos = moon_position(48724.0);
        assert_abs_diff_eq!(wrap_degrees(pos.longitude), 133.167265, epsilon = 1e-2);
        assert_abs_diff_eq!(pos.latitude.to_degrees(), -3.229126, epsilon = 1e-2);
        assert_abs_diff_eq!(pos.distance, 368409.7, epsilon = 5.0);
    }

    #[test]
    fn test_positions_are_deterministic() {
        let eph = AnalyticEphemeris::new(None);
        let t = Epoch::from_gregorian_utc_hms(2027, 8, 2, 10, 7, 0);
        assert_eq!(eph.position(Body::Moon, &t), eph.position(Body::Moon, &t));
        assert_eq!(eph.position(Body::Earth, &t), Vector3::zeros());
    }

    #[test]
    fn test_new_moon_conjunction_2027_08_02() {
        // greatest eclipse 2027-08-02 10:07:50 TD: Sun and Moon within half a degree geocentrically
        let eph = AnalyticEphemeris::new(None);
        let t = Epoch::from_gregorian(2027, 8, 2, 10, 7, 50, 0, TimeScale::TT);
        let sun = eph.position(Body::Sun, &t);
        let moon = eph.position(Body::Moon, &t);
        let separation = sun.angle(&moon).to_degrees();
        assert!(separation < 0.5, "geocentric separation {separation}°");
    }

    #[test]
    fn test_apparent_radii_near_eclipse() {
        let eph = AnalyticEphemeris::new(None);
        let luxor = ObserverLocation::new(25.69, 32.64).unwrap();
        let t = Epoch::from_gregorian_utc_hms(2027, 8, 2, 10, 6, 0);

        let sun = eph.apparent_radius(Body::Sun, &luxor, &t).to_degrees() * 60.0;
        let moon = eph.apparent_radius(Body::Moon, &luxor, &t).to_degrees() * 60.0;
        // arcminutes: the Sun is near aphelion, the Moon near perigee and high in the sky
        assert_abs_diff_eq!(sun, 15.76, epsilon = 0.05);
        assert!(moon > sun, "moon {moon}' vs sun {sun}'");
    }

    #[test]
    fn test_sidereal_time_uses_utc_without_eop() {
        let eph = AnalyticEphemeris::new(None);
        let t = Epoch::from_gregorian_utc_at_midnight(2030, 1, 1);
        let expected = gmst(t.to_mjd_utc_days()) + equequ(t.to_mjd_tt_days());
        assert_eq!(eph.apparent_sidereal_time(&t), expected);
    }
}
