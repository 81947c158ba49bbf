mod common;

use chrono::NaiveDate;
use hifitime::{Epoch, TimeScale};
use umbra::{
    catalog::{build_catalog, Catalog},
    EclipseKind,
};

use crate::common::{fixture_config, test_now, FixtureFetcher};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn test_decade_tables_only() {
    let fetcher = FixtureFetcher::new();
    let build = build_catalog(&fetcher, &fixture_config(false), test_now())
        .await
        .unwrap();

    assert!(!build.degraded);
    assert!(build.failed_sources.is_empty());
    assert_eq!(fetcher.calls(), 2);

    // 2026 Aug 12 is over at the test instant
    let dates: Vec<NaiveDate> = build.records.iter().map(|r| r.date_utc).collect();
    assert_eq!(
        dates,
        vec![
            date(2027, 8, 2),
            date(2028, 7, 22),
            date(2030, 6, 1),
            date(2030, 11, 25),
            date(2035, 9, 2)
        ]
    );

    let annular = &build.records[2];
    assert_eq!(annular.kind, EclipseKind::Annular);
    assert_eq!(
        annular.maximum_utc,
        Some(Epoch::from_gregorian(2030, 6, 1, 6, 29, 13, 0, TimeScale::TT))
    );
    assert_eq!(annular.saros, Some(128));
    assert_eq!(build.records[4].source_id, "SEdecade2031");
}

#[tokio::test]
async fn test_regional_listings_are_merged_below_decade_tables() {
    let fetcher = FixtureFetcher::new();
    let build = build_catalog(&fetcher, &fixture_config(true), test_now())
        .await
        .unwrap();

    // two decade tables, the index, then the two linked pages
    assert_eq!(fetcher.calls(), 5);
    assert_eq!(build.records.len(), 6);

    let shared = build
        .records
        .iter()
        .find(|r| r.date_utc == date(2027, 8, 2))
        .unwrap();
    assert_eq!(shared.source_id, "SEdecade2021");
    assert_eq!(shared.kind, EclipseKind::Total);
    assert!(shared
        .global_region_text
        .as_deref()
        .unwrap()
        .starts_with("Africa, Europe"));

    let regional_only = build
        .records
        .iter()
        .find(|r| r.date_utc == date(2028, 1, 26))
        .unwrap();
    assert_eq!(regional_only.source_id, "jsex:europe");
    assert_eq!(regional_only.kind, EclipseKind::Annular);
    assert_eq!(regional_only.maximum_utc, None);
    assert_eq!(regional_only.global_region_text.as_deref(), Some("Europe"));

    let catalog = Catalog::new(1, build);
    assert_eq!(
        catalog.source_ids(),
        vec!["SEdecade2021", "SEdecade2031", "jsex:europe"]
    );
    assert!(catalog
        .records()
        .windows(2)
        .all(|pair| pair[0].date_utc < pair[1].date_utc));
}

#[tokio::test]
async fn test_unreadable_source_is_skipped() {
    let fetcher =
        FixtureFetcher::new().with_document("SEdecade2031.html", "<html>Down for maintenance</html>");
    let build = build_catalog(&fetcher, &fixture_config(true), test_now())
        .await
        .unwrap();

    assert!(!build.degraded);
    assert_eq!(build.failed_sources, vec!["SEdecade2031".to_string()]);

    // still listed by the Asia page, without the decade details
    let late = build.records.last().unwrap();
    assert_eq!(late.date_utc, date(2035, 9, 2));
    assert_eq!(late.source_id, "jsex:asia");
    assert_eq!(late.saros, None);
}

#[tokio::test]
async fn test_total_failure_uses_fallback() {
    let fetcher = FixtureFetcher::offline();
    let build = build_catalog(&fetcher, &fixture_config(true), test_now())
        .await
        .unwrap();

    assert!(build.degraded);
    assert_eq!(build.failed_sources.len(), 3);
    assert!(!build.records.is_empty());
    assert!(build.records.iter().all(|r| r.is_fallback()));
    assert!(build.records.iter().all(|r| r.date_utc >= date(2026, 10, 16)));
    assert_eq!(build.records[0].date_utc, date(2027, 2, 6));
}
