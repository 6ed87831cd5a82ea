//! The scoring engine: one run = one as-of date, one transaction.
//!
//! RUN ORDER (fixed):
//!   1. Normalise the as-of date.
//!   2. Read tracked issuers; stop with an all-zero summary if there are none.
//!   3. Read alerts inside the longest lookback window.
//!   4. Build feature rows for every (issuer, window).
//!   5. Persist feature rows.
//!   6. Blend window scores into final scores, then rank.
//!   7. Persist one score row (with evidence) per issuer.
//!
//! Steps 2-7 share a single transaction: a failed run leaves the previous
//! run's rows untouched.

use crate::{
    anomaly::AlertEvent,
    combine::combine_windows,
    config::ScoringConfig,
    error::{ScoreError, ScoreResult},
    evidence::Evidence,
    features::{IssuerWindows, WindowFeatureBuilder, WindowFeatures},
    ranking::{assign_ranks, RankedScore},
    store::RiskStore,
    types::{AsOfDate, IssuerId, WindowDays},
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counters reported by a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub as_of_date:         AsOfDate,
    pub issuers_scored:     usize,
    pub snapshots_upserted: usize,
    pub scores_upserted:    usize,
    pub source_alerts:      usize,
}

impl RunSummary {
    fn empty(as_of_date: AsOfDate) -> Self {
        Self {
            as_of_date,
            issuers_scored:     0,
            snapshots_upserted: 0,
            scores_upserted:    0,
            source_alerts:      0,
        }
    }
}

/// Everything computed for a run before anything is written.
#[derive(Debug, Clone)]
pub struct ScoredRun {
    pub as_of_date: AsOfDate,
    pub features:   WindowFeatures,
    /// Score descending, then issuer id ascending.
    pub ranked:     Vec<RankedScore>,
}

impl ScoredRun {
    pub fn ranked_for(&self, issuer_id: IssuerId) -> Option<&RankedScore> {
        self.ranked.iter().find(|r| r.issuer_id == issuer_id)
    }

    pub fn window_score(&self, issuer_id: IssuerId, window: WindowDays) -> Option<f64> {
        self.features
            .get(&issuer_id)
            .and_then(|rows| rows.get(&window))
            .map(|row| row.window_score)
    }
}

pub struct ScoringEngine {
    config:    ScoringConfig,
    pub store: RiskStore,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig, store: RiskStore) -> ScoreResult<Self> {
        config.validate()?;
        Ok(Self { config, store })
    }

    /// The validated model this engine scores with.
    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score and persist every tracked issuer as of `as_of_date`
    /// (YYYY-MM-DD, default: today in UTC). Re-running a date rewrites the
    /// same rows with the same values.
    pub fn run(&self, as_of_date: Option<&str>) -> ScoreResult<RunSummary> {
        let as_of = normalize_as_of_date(as_of_date)?;
        let summary = self.store.in_transaction(|store| self.run_in(store, as_of))?;
        log::info!(
            "Risk scoring as_of={} issuers_scored={} snapshots_upserted={} scores_upserted={} source_alerts={}",
            summary.as_of_date,
            summary.issuers_scored,
            summary.snapshots_upserted,
            summary.scores_upserted,
            summary.source_alerts
        );
        Ok(summary)
    }

    fn run_in(&self, store: &RiskStore, as_of: AsOfDate) -> ScoreResult<RunSummary> {
        let issuers = store.list_tracked_issuers()?;
        if issuers.is_empty() {
            log::info!("No tracked issuers; nothing to score for {as_of}");
            return Ok(RunSummary::empty(as_of));
        }

        let max_lookback = self.max_lookback()?;
        let events = store.fetch_alert_events(as_of, max_lookback)?;
        log::info!(
            "Scoring {} issuers from {} alerts (as_of={as_of}, lookback={max_lookback}d, model={})",
            issuers.len(),
            events.len(),
            self.config.model_version
        );

        let scored = self.score(&issuers, &events, as_of)?;

        let mut snapshots_upserted = 0;
        for (&issuer_id, rows) in &scored.features {
            for (&window_days, row) in rows {
                store.upsert_feature_row(issuer_id, as_of, window_days, row)?;
                snapshots_upserted += 1;
            }
        }

        let mut scores_upserted = 0;
        for ranked in &scored.ranked {
            let evidence = Evidence::build(&self.config, as_of, &scored.features[&ranked.issuer_id])?;
            store.upsert_risk_score(
                ranked.issuer_id,
                as_of,
                &self.config.model_version,
                ranked.score,
                ranked.rank,
                ranked.percentile,
                &evidence,
            )?;
            scores_upserted += 1;
        }

        Ok(RunSummary {
            as_of_date: as_of,
            issuers_scored: scored.ranked.len(),
            snapshots_upserted,
            scores_upserted,
            source_alerts: events.len(),
        })
    }

    /// Pure computation: features, final scores, and ranks. No storage access.
    pub fn score(
        &self,
        issuers: &[IssuerId],
        events: &[AlertEvent],
        as_of: AsOfDate,
    ) -> ScoreResult<ScoredRun> {
        let features = WindowFeatureBuilder::new(&self.config).build(issuers, events, as_of)?;
        let finals: Vec<(IssuerId, f64)> = features
            .iter()
            .map(|(&issuer_id, rows)| (issuer_id, self.final_score(rows)))
            .collect();
        let ranked = assign_ranks(&finals);
        Ok(ScoredRun {
            as_of_date: as_of,
            features,
            ranked,
        })
    }

    /// Weighted blend of an issuer's window scores, clamped to [0, 1].
    pub fn final_score(&self, rows: &IssuerWindows) -> f64 {
        let window_scores: BTreeMap<WindowDays, f64> = rows
            .iter()
            .map(|(&days, row)| (days, row.window_score))
            .collect();
        combine_windows(&window_scores, &self.config.windows)
    }

    fn max_lookback(&self) -> ScoreResult<WindowDays> {
        self.config.longest_window().ok_or_else(|| ScoreError::Config {
            reason: "at least one lookback window is required".into(),
        })
    }
}

/// Parse a YYYY-MM-DD as-of date; `None` means today (UTC).
pub fn normalize_as_of_date(value: Option<&str>) -> ScoreResult<AsOfDate> {
    match value {
        None => Ok(Utc::now().date_naive()),
        Some(text) => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
            .map_err(|_| ScoreError::InvalidDate { value: text.to_string() }),
    }
}

/// One-shot run for callers that do not keep an engine around.
pub fn run_risk_scoring(
    store: RiskStore,
    config: ScoringConfig,
    as_of_date: Option<&str>,
) -> ScoreResult<RunSummary> {
    ScoringEngine::new(config, store)?.run(as_of_date)
}
