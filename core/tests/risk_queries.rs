//! Read-side queries over stored risk scores: ranked listings, per-issuer
//! history, and evidence lookups.

use chrono::{Duration, NaiveDate};
use sec_risk_core::{
    config::ScoringConfig,
    store::{NewAlert, RiskHistoryQuery, RiskScoreQuery, RiskStore},
    ScoringEngine,
};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, d).unwrap()
}

fn build() -> ScoringEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = RiskStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    ScoringEngine::new(ScoringConfig::default(), store).expect("engine")
}

fn seed(engine: &ScoringEngine) {
    let store = &engine.store;
    store.upsert_company(1001, Some("High Risk Inc"), Some("HRI"), Some("Tech")).unwrap();
    store.upsert_company(1002, Some("Moderate Co"), Some("MOD"), Some("Industrials")).unwrap();
    store.upsert_company(1003, Some("Quiet Corp"), Some("QUI"), Some("Utilities")).unwrap();

    for (accession, cik, code, severity, on) in [
        ("acc-1001-a", 1001, "NT_FILING", 0.9, day(20)),
        ("acc-1001-b", 1001, "8K_SPIKE", 0.8, day(21)),
        ("acc-1002-a", 1002, "FRIDAY_BURYING", 0.65, day(20) - Duration::days(30)),
    ] {
        let at = on.and_hms_opt(16, 30, 0).unwrap().and_utc();
        store
            .insert_filing(accession, cik, "8-K", &at.to_rfc3339(), &on.to_string())
            .unwrap();
        store
            .insert_alert(&NewAlert::new(accession, code, severity).at(at))
            .unwrap();
    }

    engine.run(Some("2026-02-21")).expect("run 21st");
    engine.run(Some("2026-02-23")).expect("run 23rd");
}

/// Without a date the listing resolves to the newest scored date.
#[test]
fn top_scores_default_to_latest_date() {
    let engine = build();
    seed(&engine);

    let page = engine.store.top_risk_scores(&RiskScoreQuery::default()).unwrap();
    assert_eq!(page.as_of_date.as_deref(), Some("2026-02-23"));
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 3);
    assert_eq!(page.items[0].cik, 1001);
    assert_eq!(page.items[0].company_ticker.as_deref(), Some("HRI"));
    let ranks: Vec<_> = page.items.iter().map(|r| r.risk_rank.unwrap()).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
}

/// min_score filters rows and the total; limit/offset page through them.
#[test]
fn top_scores_filter_and_page() {
    let engine = build();
    seed(&engine);

    let page = engine
        .store
        .top_risk_scores(&RiskScoreQuery {
            as_of_date: Some(day(23)),
            min_score: Some(0.0001),
            ..RiskScoreQuery::default()
        })
        .unwrap();
    assert_eq!(page.total, 2);
    assert!(page.items.iter().all(|r| r.cik != 1003));

    let page = engine
        .store
        .top_risk_scores(&RiskScoreQuery {
            as_of_date: Some(day(23)),
            limit: 1,
            offset: 1,
            ..RiskScoreQuery::default()
        })
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].cik, 1002);
}

/// Unknown model versions and empty stores produce an empty page.
#[test]
fn top_scores_empty_cases() {
    let engine = build();
    let page = engine.store.top_risk_scores(&RiskScoreQuery::default()).unwrap();
    assert_eq!(page.total, 0);
    assert_eq!(page.as_of_date, None);

    seed(&engine);
    let page = engine
        .store
        .top_risk_scores(&RiskScoreQuery {
            model_version: Some("v0_missing".into()),
            ..RiskScoreQuery::default()
        })
        .unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.model_version.as_deref(), Some("v0_missing"));
}

/// History lists one row per scored date, newest first, within the bounds.
#[test]
fn history_is_newest_first() {
    let engine = build();
    seed(&engine);

    let rows = engine
        .store
        .risk_score_history(&RiskHistoryQuery::for_issuer(1001))
        .unwrap();
    let dates: Vec<_> = rows.iter().map(|r| r.as_of_date.as_str()).collect();
    assert_eq!(dates, vec!["2026-02-23", "2026-02-21"]);

    let rows = engine
        .store
        .risk_score_history(&RiskHistoryQuery {
            date_from: Some(day(22)),
            ..RiskHistoryQuery::for_issuer(1001)
        })
        .unwrap();
    assert_eq!(rows.len(), 1);

    let rows = engine
        .store
        .risk_score_history(&RiskHistoryQuery::for_issuer(4242))
        .unwrap();
    assert!(rows.is_empty());
}

/// Scores decay between runs as the same alerts age.
#[test]
fn older_alerts_score_lower_on_later_dates() {
    let engine = build();
    seed(&engine);

    let rows = engine
        .store
        .risk_score_history(&RiskHistoryQuery::for_issuer(1001))
        .unwrap();
    assert!(rows[0].risk_score < rows[1].risk_score);
}

/// Explanations return the stored evidence blob for a date or the latest one.
#[test]
fn explanation_returns_evidence() {
    let engine = build();
    seed(&engine);

    let latest = engine
        .store
        .risk_explanation(1001, None, None)
        .unwrap()
        .expect("score exists");
    assert_eq!(latest.as_of_date, "2026-02-23");
    assert_eq!(latest.evidence["as_of_date"], "2026-02-23");
    assert_eq!(latest.evidence["lookback_windows_days"], serde_json::json!([30, 90]));

    let earlier = engine
        .store
        .risk_explanation(1001, Some(day(21)), Some("v1_alert_composite"))
        .unwrap()
        .expect("score exists");
    assert_eq!(earlier.as_of_date, "2026-02-21");

    assert!(engine.store.risk_explanation(1001, Some(day(1)), None).unwrap().is_none());
    assert!(engine.store.risk_explanation(4242, None, None).unwrap().is_none());
    assert!(engine.store.company_exists(1001).unwrap());
    assert!(!engine.store.company_exists(4242).unwrap());
}
