mod common;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use umbra::{EngineError, EphemerisStatus, PredictionMode, PredictionRequest};

use crate::common::{dates, fixture_engine, FixtureFetcher};

fn region(name: &str, n: usize) -> PredictionRequest {
    PredictionRequest::new(n, PredictionMode::Region(name.into())).unwrap()
}

#[tokio::test]
async fn test_region_filter() {
    let engine = fixture_engine(Arc::new(FixtureFetcher::new()), true);
    let cancel = CancellationToken::new();

    let europe = engine.predict_next(&region("Europe", 5), &cancel).await.unwrap();
    assert_eq!(
        dates(&europe.events),
        vec!["2027-08-02", "2028-01-26", "2030-06-01"]
    );
    assert!(europe.iter().all(|event| event.visibility.is_none()));
    assert_eq!(europe.ephemeris, EphemerisStatus::NotUsed);

    let asia = engine.predict_next(&region("asia", 3), &cancel).await.unwrap();
    assert_eq!(
        dates(&asia.events),
        vec!["2027-08-02", "2028-07-22", "2030-06-01"]
    );

    let global = engine.predict_next(&region("Global", 10), &cancel).await.unwrap();
    assert_eq!(global.len(), 6);
}

#[tokio::test]
async fn test_region_spelling_shares_the_cache() {
    let fetcher = Arc::new(FixtureFetcher::new());
    let engine = fixture_engine(fetcher.clone(), true);
    let cancel = CancellationToken::new();

    let a = engine.predict_next(&region("Europe", 3), &cancel).await.unwrap();
    let b = engine.predict_next(&region(" EUROPE", 3), &cancel).await.unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(engine.status().computation_passes, 1);
    assert_eq!(fetcher.calls(), 5);
}

#[tokio::test]
async fn test_date_listed_on_two_regional_pages_matches_both() {
    let fetcher = FixtureFetcher::new()
        .with_document("SEdecade2021.html", "<html>down</html>")
        .with_document("SEdecade2031.html", "<html>down</html>")
        .with_document(
            "JSEX-AS.html",
            "<pre>2027 Aug 02   Total\n2028 Jul 22   Total\n</pre>",
        );
    let engine = fixture_engine(Arc::new(fetcher), true);
    let cancel = CancellationToken::new();

    let europe = engine.predict_next(&region("Europe", 5), &cancel).await.unwrap();
    assert_eq!(dates(&europe.events), vec!["2027-08-02", "2028-01-26"]);

    let asia = engine.predict_next(&region("Asia", 5), &cancel).await.unwrap();
    assert_eq!(dates(&asia.events), vec!["2027-08-02", "2028-07-22"]);
    assert_eq!(
        asia.events[0].record.global_region_text.as_deref(),
        Some("Europe, Asia")
    );
    assert!(!asia.degraded);
}

#[tokio::test]
async fn test_offline_engine_serves_the_fallback() {
    let engine = fixture_engine(Arc::new(FixtureFetcher::offline()), true);

    let result = engine
        .predict_next(&region("Europe", 3), &CancellationToken::new())
        .await
        .unwrap();

    assert!(result.degraded);
    assert!(result.complete);
    assert_eq!(
        dates(&result.events),
        vec!["2027-08-02", "2028-01-26", "2030-06-01"]
    );
    assert!(result.iter().all(|event| event.record.is_fallback()));

    let status = engine.status();
    assert!(status.degraded);
    assert!(status.catalog_loaded);
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let blank = PredictionRequest::new(3, PredictionMode::Region("  ".into()));
    assert!(matches!(blank, Err(EngineError::Configuration(_))));

    let too_many = PredictionRequest::new(11, PredictionMode::Region("Europe".into()));
    assert!(matches!(too_many, Err(EngineError::Configuration(_))));

    let engine = fixture_engine(Arc::new(FixtureFetcher::new()), true);
    let mut request = region("Europe", 3);
    request.n = 0;
    let err = engine
        .predict_next(&request, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Configuration(_)));
    assert!(!engine.status().catalog_loaded);
}
