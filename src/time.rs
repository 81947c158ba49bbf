use chrono::{Datelike, NaiveDate};
use hifitime::{Duration, Epoch, TimeScale};

use crate::{
    constants::{DPI, JULIAN_CENTURY, SECONDS_PER_DAY, T2000},
    engine_errors::EngineError,
};

/// Julian centuries of TT elapsed since J2000.0.
///
/// Argument
/// --------
/// * `epoch`: the instant, in any time scale (hifitime converts internally)
///
/// Return
/// ------
/// * `T = (MJD_TT - 51544.5) / 36525`
pub fn julian_centuries_tt(epoch: &Epoch) -> f64 {
    (epoch.to_mjd_tt_days() - T2000) / JULIAN_CENTURY
}

/// Midnight UTC at the start of a calendar date.
pub fn date_to_epoch(date: NaiveDate) -> Epoch {
    Epoch::from_gregorian_utc_at_midnight(date.year(), date.month() as u8, date.day() as u8)
}

/// Calendar date (UTC) of an instant.
pub fn epoch_to_date(epoch: &Epoch) -> Option<NaiveDate> {
    let (year, month, day, ..) = epoch.to_gregorian_utc();
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

/// Build an instant from a catalog date and a `HH:MM[:SS]` clock reading in the given time scale.
///
/// The NASA tables list the instant of greatest eclipse in Terrestrial Dynamical Time, which
/// hifitime models as [`TimeScale::TT`].
///
/// Arguments
/// ---------
/// * `date`: calendar date of the event
/// * `clock`: a `HH:MM` or `HH:MM:SS` string
/// * `scale`: the time scale of the clock reading
///
/// Return
/// ------
/// * `None` if the clock string is not a valid time of day
pub fn epoch_from_clock(date: NaiveDate, clock: &str, scale: TimeScale) -> Option<Epoch> {
    let mut parts = clock.trim().split(':');
    let hour: u8 = parts.next()?.trim().parse().ok()?;
    let minute: u8 = parts.next()?.trim().parse().ok()?;
    let second: u8 = match parts.next() {
        Some(s) => s.trim().parse().ok()?,
        None => 0,
    };
    if parts.next().is_some() || hour > 23 || minute > 59 || second > 59 {
        return None;
    }
    Some(Epoch::from_gregorian(
        date.year(),
        date.month() as u8,
        date.day() as u8,
        hour,
        minute,
        second,
        0,
        scale,
    ))
}

/// Shift an epoch by a signed number of seconds.
pub fn shift_seconds(epoch: &Epoch, seconds: f64) -> Epoch {
    *epoch + Duration::from_seconds(seconds)
}

/// Signed number of seconds from `from` to `to`.
pub fn seconds_between(from: &Epoch, to: &Epoch) -> f64 {
    (*to - *from).to_seconds()
}

/// Current instant, read from the system clock.
pub fn now_utc() -> Result<Epoch, EngineError> {
    Epoch::now().map_err(EngineError::ClockError)
}

/// Compute the Greenwich Mean Sidereal Time (GMST) in radians
/// for a given Modified Julian Date (UT1 time scale).
///
/// This function implements the IAU 1982 polynomial formula
/// for the mean sidereal time at 0h UT1, plus the fractional-day
/// correction term due to Earth's rotation rate.
///
/// # Arguments
/// * `tjm` - Modified Julian Date (MJD, UT1 time scale)
///
/// # Returns
/// * GMST angle in radians, normalized to the interval [0, 2π).
///
/// # References
/// * IAU 1982, IERS Conventions 1996/2000.
/// * Explanatory Supplement to the Astronomical Almanac (1992).
pub fn gmst(tjm: f64) -> f64 {
    // Polynomial coefficients for GMST at 0h UT1 (in seconds)
    const C0: f64 = 24110.54841;
    const C1: f64 = 8640184.812866;
    const C2: f64 = 9.3104e-2;
    const C3: f64 = -6.2e-6;

    // Ratio of sidereal day to solar day
    const RAP: f64 = 1.00273790934;

    let itjm = tjm.floor();
    let t = (itjm - T2000) / JULIAN_CENTURY;

    let gmst0 = (((C3 * t + C2) * t + C1) * t + C0) * DPI / SECONDS_PER_DAY;

    // fraction of the current day, scaled from solar to sidereal rotation
    let h = (tjm - itjm) * DPI;
    (gmst0 + h * RAP).rem_euclid(DPI)
}
