//! Embedded eclipse list used when no remote catalog can be read.
//!
//! Dates, types and visibility regions only; the instants of greatest eclipse are left out, so
//! local circumstances are searched over the whole day.
use chrono::NaiveDate;

use super::{
    EclipseKind::{self, Annular, Hybrid, Partial, Total},
    EclipseRecord,
};

/// Source identifier carried by every fallback record.
pub const FALLBACK_SOURCE_ID: &str = "fallback";

const FALLBACK_ECLIPSES: &[(i32, u32, u32, EclipseKind, &str)] = &[
    (2026, 2, 17, Annular, "s Argentina, s Chile, s Africa, Antarctica"),
    (2026, 8, 12, Total, "n N. America, w Africa, Europe [Total: Greenland, Iceland, Spain]"),
    (2027, 2, 6, Annular, "S. America, Antarctica, w & s Africa"),
    (2027, 8, 2, Total, "Africa, Europe, Mid East, w & s Asia [Total: Morocco, Spain, Algeria, Libya, Egypt, Saudi Arabia, Yemen, Somalia]"),
    (2028, 1, 26, Annular, "e N. America, C. & S. America, w Europe, nw Africa"),
    (2028, 7, 22, Total, "SE Asia, E. Indies, Australia, New Zealand [Total: Australia, New Zealand]"),
    (2029, 1, 14, Partial, "N. America, C. America"),
    (2029, 6, 12, Partial, "Arctic, Scandinavia, Alaska, n Asia, n Canada"),
    (2029, 7, 11, Partial, "s Chile, s Argentina"),
    (2029, 12, 5, Partial, "s Argentina, s Chile, Antarctica"),
    (2030, 6, 1, Annular, "Europe, n Africa, Mid East, Asia, Arctic, Alaska"),
    (2030, 11, 25, Total, "s Africa, s Indian Ocean, E. Indies, Australia, Antarctica"),
    (2031, 5, 21, Annular, "Africa, s Asia, E. Indies, Australia"),
    (2031, 11, 14, Hybrid, "Pacific, s US, C. America, nw S. America"),
    (2032, 5, 9, Annular, "s S. America, s Africa"),
    (2032, 11, 3, Partial, "Asia"),
    (2033, 3, 30, Total, "N. America [Total: e Russia, Alaska]"),
    (2033, 9, 23, Partial, "s S. America, Antarctica"),
    (2034, 3, 20, Total, "Africa, Europe, w Asia [Total: C. Africa, Egypt, Saudi Arabia, Iran, Pakistan, India, China]"),
    (2034, 9, 12, Annular, "C. & S. America"),
    (2035, 3, 9, Annular, "Australia, New Zealand, s Pacific, Mexico"),
    (2035, 9, 2, Total, "e Asia, Pacific [Total: China, Korea, Japan, Pacific]"),
];

/// All fallback records in date order, past ones included.
pub fn fallback_records() -> Vec<EclipseRecord> {
    FALLBACK_ECLIPSES
        .iter()
        .filter_map(|&(year, month, day, kind, regions)| {
            let date = NaiveDate::from_ymd_opt(year, month, day)?;
            Some(EclipseRecord::fallback(date, kind, regions))
        })
        .collect()
}

#[cfg(test)]
mod fallback_test {
    use super::*;

    #[test]
    fn test_fallback_is_tagged_and_ordered() {
        let records = fallback_records();
        assert_eq!(records.len(), FALLBACK_ECLIPSES.len());
        assert!(records.iter().all(|r| r.source_id == FALLBACK_SOURCE_ID));
        assert!(records.iter().all(|r| r.is_fallback()));
        assert!(records.windows(2).all(|w| w[0].date_utc < w[1].date_utc));
        assert!(records.iter().all(|r| r.maximum_utc.is_none()));
        assert!(records.iter().all(|r| r.global_region_text.is_some()));
    }

    #[test]
    fn test_fallback_spans_several_years() {
        let records = fallback_records();
        let first = records.first().unwrap().date_utc;
        let last = records.last().unwrap().date_utc;
        assert!((last - first).num_days() > 5 * 365);
    }
}
