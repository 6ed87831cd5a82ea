//! Issuer, filing, and alert writes used by the ingestion and detection
//! collaborators (and by tests to seed data).

use super::{RiskStore, TIMESTAMP_FORMAT};
use crate::{error::ScoreResult, types::IssuerId};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

/// A detector output ready to be stored.
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub accession_id:   String,
    pub anomaly_type:   String,
    pub severity_score: f64,
    pub description:    String,
    pub details:        serde_json::Value,
    /// Defaults to `"{anomaly_type}:{accession_id}"`.
    pub dedupe_key:     Option<String>,
    /// Defaults to the database clock.
    pub created_at:     Option<DateTime<Utc>>,
}

impl NewAlert {
    pub fn new(accession_id: &str, anomaly_type: &str, severity_score: f64) -> Self {
        Self {
            accession_id:   accession_id.to_string(),
            anomaly_type:   anomaly_type.to_string(),
            severity_score,
            description:    format!("{anomaly_type} on {accession_id}"),
            details:        serde_json::json!({}),
            dedupe_key:     None,
            created_at:     None,
        }
    }

    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn dedupe_key(&self) -> String {
        self.dedupe_key
            .clone()
            .unwrap_or_else(|| format!("{}:{}", self.anomaly_type, self.accession_id))
    }
}

impl RiskStore {
    // ── Companies ──────────────────────────────────────────────

    pub fn upsert_company(
        &self,
        cik: IssuerId,
        name: Option<&str>,
        ticker: Option<&str>,
        industry: Option<&str>,
    ) -> ScoreResult<()> {
        self.conn.execute(
            "INSERT INTO companies (cik, name, ticker, industry, updated_at)
             VALUES (?1, ?2, ?3, ?4, datetime('now'))
             ON CONFLICT(cik) DO UPDATE SET
                 name       = excluded.name,
                 ticker     = excluded.ticker,
                 industry   = excluded.industry,
                 updated_at = datetime('now')",
            params![cik, name, ticker, industry],
        )?;
        Ok(())
    }

    pub fn company_exists(&self, cik: IssuerId) -> ScoreResult<bool> {
        let found = self
            .conn
            .query_row("SELECT 1 FROM companies WHERE cik = ?1", params![cik], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    // ── Filings ────────────────────────────────────────────────

    /// Insert a filing unless its accession id is already stored.
    pub fn insert_filing(
        &self,
        accession_id: &str,
        cik: IssuerId,
        filing_type: &str,
        filed_at: &str,
        filed_date: &str,
    ) -> ScoreResult<bool> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO filing_events
                 (accession_id, cik, filing_type, filed_at, filed_date)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![accession_id, cik, filing_type, filed_at, filed_date],
        )?;
        Ok(changed > 0)
    }

    // ── Alerts ─────────────────────────────────────────────────

    /// Insert an alert unless its dedupe key exists. Returns true if inserted.
    pub fn insert_alert(&self, alert: &NewAlert) -> ScoreResult<bool> {
        let details = super::to_json_text(&alert.details)?;
        let created_at = alert
            .created_at
            .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string());
        // NaN is not representable in SQLite; store NULL so scoring rejects it.
        let severity = Some(alert.severity_score).filter(|s| !s.is_nan());
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO alerts
                 (accession_id, anomaly_type, severity_score, description,
                  details, status, dedupe_key, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 'OPEN', ?6, COALESCE(?7, datetime('now')))",
            params![
                alert.accession_id,
                alert.anomaly_type,
                severity,
                alert.description,
                details,
                alert.dedupe_key(),
                created_at,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn alert_count(&self) -> ScoreResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM alerts", [], |row| row.get(0))?;
        Ok(count)
    }
}
