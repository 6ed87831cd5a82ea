//! Reads and upserts driven by a scoring run.

use super::{parse_timestamp, to_json_text, RiskStore};
use crate::{
    anomaly::{AlertEvent, AnomalyKind},
    error::ScoreResult,
    evidence::Evidence,
    features::FeatureRow,
    types::{AsOfDate, IssuerId, WindowDays},
};
use rusqlite::params;

impl RiskStore {
    // ── Inputs ─────────────────────────────────────────────────

    /// Every tracked issuer, ascending.
    pub fn list_tracked_issuers(&self) -> ScoreResult<Vec<IssuerId>> {
        let mut stmt = self.conn.prepare("SELECT cik FROM companies ORDER BY cik")?;
        let ciks = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<IssuerId>, _>>()?;
        Ok(ciks)
    }

    /// Alerts created in `[as_of - max_lookback_days, as_of + 1 day)`,
    /// attributed to the issuer of the underlying filing. Newest first.
    /// Bounds compare UTC instants, so offset-bearing timestamps land on
    /// the same day their age is computed from.
    pub fn fetch_alert_events(
        &self,
        as_of: AsOfDate,
        max_lookback_days: WindowDays,
    ) -> ScoreResult<Vec<AlertEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT f.cik, a.anomaly_type, a.severity_score, a.created_at
             FROM alerts a
             JOIN filing_events f ON f.accession_id = a.accession_id
             WHERE datetime(a.created_at) >= datetime(?1, ?2)
               AND datetime(a.created_at) <  datetime(?1, '+1 day')
             ORDER BY datetime(a.created_at) DESC, a.alert_id DESC",
        )?;
        let rows = stmt
            .query_map(
                params![as_of.to_string(), format!("-{max_lookback_days} days")],
                |row| {
                    Ok((
                        row.get::<_, IssuerId>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<f64>>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(issuer_id, code, severity, created_at)| -> ScoreResult<AlertEvent> {
                Ok(AlertEvent {
                    issuer_id,
                    anomaly:     AnomalyKind::parse(&code),
                    severity:    severity.unwrap_or(f64::NAN),
                    occurred_at: parse_timestamp(&created_at)?,
                })
            })
            .collect()
    }

    // ── Outputs ────────────────────────────────────────────────

    /// Idempotent on (cik, as_of_date, lookback_days).
    /// An identical row is left untouched, `updated_at` included.
    pub fn upsert_feature_row(
        &self,
        cik: IssuerId,
        as_of: AsOfDate,
        window_days: WindowDays,
        row: &FeatureRow,
    ) -> ScoreResult<()> {
        let features = to_json_text(row)?;
        self.conn.execute(
            "INSERT INTO feature_snapshots
                 (cik, as_of_date, lookback_days, features, source_alert_count)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(cik, as_of_date, lookback_days) DO UPDATE SET
                 features           = excluded.features,
                 source_alert_count = excluded.source_alert_count,
                 updated_at         = datetime('now')
             WHERE features IS NOT excluded.features
                OR source_alert_count IS NOT excluded.source_alert_count",
            params![cik, as_of.to_string(), window_days, features, row.total_alerts],
        )?;
        Ok(())
    }

    /// Idempotent on (cik, as_of_date, model_version).
    /// An identical row is left untouched, `updated_at` included.
    #[allow(clippy::too_many_arguments)]
    pub fn upsert_risk_score(
        &self,
        cik: IssuerId,
        as_of: AsOfDate,
        model_version: &str,
        risk_score: f64,
        rank: u32,
        percentile: f64,
        evidence: &Evidence,
    ) -> ScoreResult<()> {
        let evidence = to_json_text(evidence)?;
        self.conn.execute(
            "INSERT INTO issuer_risk_scores
                 (cik, as_of_date, model_version, risk_score, risk_rank, percentile, evidence)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(cik, as_of_date, model_version) DO UPDATE SET
                 risk_score = excluded.risk_score,
                 risk_rank  = excluded.risk_rank,
                 percentile = excluded.percentile,
                 evidence   = excluded.evidence,
                 updated_at = datetime('now')
             WHERE risk_score IS NOT excluded.risk_score
                OR risk_rank  IS NOT excluded.risk_rank
                OR percentile IS NOT excluded.percentile
                OR evidence   IS NOT excluded.evidence",
            params![
                cik,
                as_of.to_string(),
                model_version,
                risk_score,
                rank,
                percentile,
                evidence,
            ],
        )?;
        Ok(())
    }
}
