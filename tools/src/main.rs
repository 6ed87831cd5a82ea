//! risk-runner: batch runner and read-side CLI for issuer risk scoring.
//!
//! Usage:
//!   risk-runner init-db  [--db path]
//!   risk-runner score    [--db path] [--as-of-date YYYY-MM-DD] [--config model.json]
//!   risk-runner top      [--db path] [--as-of-date YYYY-MM-DD] [--limit 50] [--min-score 0.2]
//!   risk-runner explain  --cik N [--db path] [--as-of-date YYYY-MM-DD]
//!   risk-runner history  --cik N [--db path] [--limit 100]
//!
//! `--db` falls back to $SEC_RISK_DB, then data/sec_anomaly.db.

use anyhow::{bail, Context, Result};
use sec_risk_core::{
    config::ScoringConfig,
    engine::normalize_as_of_date,
    store::{RiskHistoryQuery, RiskScoreQuery, RiskScoreRow, RiskStore},
    types::AsOfDate,
    RunSummary, ScoringEngine,
};
use std::env;

const DEFAULT_DB: &str = "data/sec_anomaly.db";

#[derive(serde::Serialize)]
struct ScoreReport<'a> {
    db:            &'a str,
    model_version: &'a str,
    elapsed_ms:    i64,
    #[serde(flatten)]
    summary:       RunSummary,
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if let Err(e) = run(&args) {
        eprintln!("risk-runner: {e:#}");
        std::process::exit(1);
    }
}

fn run(args: &[String]) -> Result<()> {
    let command = args.get(1).map(String::as_str).unwrap_or("score");
    let db = flag(args, "--db")
        .map(str::to_string)
        .or_else(|| env::var("SEC_RISK_DB").ok())
        .unwrap_or_else(|| DEFAULT_DB.to_string());

    if let Some(parent) = std::path::Path::new(&db).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
    }
    let store = RiskStore::open(&db).with_context(|| format!("cannot open {db}"))?;
    store.migrate()?;
    log::info!("risk-runner {command}: db={db}");

    match command {
        "init-db" => {
            println!("Ensured schema for DB at {db}");
        }
        "score" => {
            let config = match flag(args, "--config") {
                Some(path) => ScoringConfig::load(path)?,
                None => ScoringConfig::default(),
            };
            let engine = ScoringEngine::new(config, store)?;
            let started = chrono::Utc::now();
            let summary = engine
                .run(flag(args, "--as-of-date"))
                .context("risk scoring failed")?;
            let report = ScoreReport {
                db:            &db,
                model_version: &engine.config().model_version,
                elapsed_ms:    (chrono::Utc::now() - started).num_milliseconds(),
                summary,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        "top" => {
            let query = RiskScoreQuery {
                as_of_date: flag(args, "--as-of-date")
                    .map(|d| normalize_as_of_date(Some(d)))
                    .transpose()?,
                model_version: flag(args, "--model-version").map(str::to_string),
                min_score: parse_flag(args, "--min-score")?,
                limit: parse_flag(args, "--limit")?.unwrap_or(50),
                offset: parse_flag(args, "--offset")?.unwrap_or(0),
            };
            let page = store.top_risk_scores(&query)?;
            print_top(&page);
        }
        "explain" => {
            let cik = required_cik(args)?;
            let as_of = flag(args, "--as-of-date")
                .map(|d| normalize_as_of_date(Some(d)))
                .transpose()?;
            let row = explain(&store, cik, as_of, flag(args, "--model-version"))?;
            println!("{}", serde_json::to_string_pretty(&row)?);
        }
        "history" => {
            let cik = required_cik(args)?;
            let query = RiskHistoryQuery {
                model_version: flag(args, "--model-version").map(str::to_string),
                limit: parse_flag(args, "--limit")?.unwrap_or(100),
                ..RiskHistoryQuery::for_issuer(cik)
            };
            for row in store.risk_score_history(&query)? {
                println!(
                    "{} | {:<20} | score {:.4} | rank {:>4} | pct {:.3}",
                    row.as_of_date,
                    row.model_version,
                    row.risk_score,
                    row.risk_rank.unwrap_or_default(),
                    row.percentile.unwrap_or_default(),
                );
            }
        }
        other => bail!("unknown command '{other}' (expected init-db, score, top, explain, history)"),
    }
    Ok(())
}

/// Stored score and evidence for one issuer. An unknown CIK and a known
/// issuer without scores are reported separately.
fn explain(
    store: &RiskStore,
    cik: i64,
    as_of: Option<AsOfDate>,
    model_version: Option<&str>,
) -> Result<RiskScoreRow> {
    if !store.company_exists(cik)? {
        bail!("company not found: cik {cik}");
    }
    match store.risk_explanation(cik, as_of, model_version)? {
        Some(row) => Ok(row),
        None => bail!("no risk score stored for cik {cik}"),
    }
}

fn print_top(page: &sec_risk_core::store::RiskScorePage) {
    let Some(as_of) = &page.as_of_date else {
        println!("No risk scores stored yet.");
        return;
    };
    println!("=== TOP RISK ({as_of}, {} scored) ===", page.total);
    for row in &page.items {
        println!(
            "  #{:<4} cik {:<10} {:<8} score {:.4}  pct {:.3}  {}",
            row.risk_rank.unwrap_or_default(),
            row.cik,
            row.company_ticker.as_deref().unwrap_or("-"),
            row.risk_score,
            row.percentile.unwrap_or_default(),
            row.company_name.as_deref().unwrap_or(""),
        );
    }
}

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == name)
        .map(|w| w[1].as_str())
}

fn parse_flag<T>(args: &[String], name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    flag(args, name)
        .map(|v| v.parse::<T>().with_context(|| format!("invalid value for {name}: {v}")))
        .transpose()
}

fn required_cik(args: &[String]) -> Result<i64> {
    parse_flag(args, "--cik")?.context("--cik is required")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> RiskStore {
        let store = RiskStore::in_memory().unwrap();
        store.migrate().unwrap();
        store
    }

    #[test]
    fn explain_reports_unknown_company() {
        let err = explain(&store(), 4242, None, None).unwrap_err();
        assert_eq!(err.to_string(), "company not found: cik 4242");
    }

    #[test]
    fn explain_reports_missing_score_for_known_company() {
        let store = store();
        store.upsert_company(1001, Some("Quiet Corp"), None, None).unwrap();
        let err = explain(&store, 1001, None, None).unwrap_err();
        assert_eq!(err.to_string(), "no risk score stored for cik 1001");
    }

    #[test]
    fn explain_returns_the_stored_score() {
        let store = store();
        store.upsert_company(1001, Some("Quiet Corp"), None, None).unwrap();
        let engine = ScoringEngine::new(ScoringConfig::default(), store).unwrap();
        engine.run(Some("2026-02-23")).unwrap();

        let row = explain(&engine.store, 1001, None, None).unwrap();
        assert_eq!(row.cik, 1001);
        assert_eq!(row.as_of_date, "2026-02-23");
    }

    #[test]
    fn flags_are_read_by_name() {
        let args: Vec<String> = ["risk-runner", "top", "--limit", "5", "--min-score", "0.2"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(parse_flag::<u32>(&args, "--limit").unwrap(), Some(5));
        assert_eq!(parse_flag::<f64>(&args, "--min-score").unwrap(), Some(0.2));
        assert_eq!(flag(&args, "--db"), None);
        assert!(parse_flag::<i64>(&args, "--cik").unwrap().is_none());
    }
}
