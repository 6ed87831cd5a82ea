//! Read-side queries over stored scores and feature snapshots.

use super::RiskStore;
use crate::{
    error::ScoreResult,
    features::FeatureRow,
    types::{AsOfDate, IssuerId, WindowDays},
};
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

const SCORE_COLUMNS: &str = "
    r.score_id, r.cik, r.as_of_date, r.model_version, r.risk_score,
    r.risk_rank, r.percentile, r.evidence, r.created_at, r.updated_at,
    c.name, c.ticker";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskScoreRow {
    pub score_id:       i64,
    pub cik:            IssuerId,
    pub as_of_date:     String,
    pub model_version:  String,
    pub risk_score:     f64,
    pub risk_rank:      Option<i64>,
    pub percentile:     Option<f64>,
    /// Decoded evidence blob; kept as a raw string if it is not valid JSON.
    pub evidence:       serde_json::Value,
    pub created_at:     String,
    pub updated_at:     String,
    pub company_name:   Option<String>,
    pub company_ticker: Option<String>,
}

impl RiskScoreRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let raw: String = row.get(7)?;
        let evidence = serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw));
        Ok(Self {
            score_id:       row.get(0)?,
            cik:            row.get(1)?,
            as_of_date:     row.get(2)?,
            model_version:  row.get(3)?,
            risk_score:     row.get(4)?,
            risk_rank:      row.get(5)?,
            percentile:     row.get(6)?,
            evidence,
            created_at:     row.get(8)?,
            updated_at:     row.get(9)?,
            company_name:   row.get(10)?,
            company_ticker: row.get(11)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSnapshotRow {
    pub cik:                IssuerId,
    pub as_of_date:         String,
    pub lookback_days:      WindowDays,
    pub source_alert_count: u32,
    pub features:           FeatureRow,
    pub updated_at:         String,
}

/// Filters for the ranked score listing.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskScoreQuery {
    /// Latest scored date when `None`.
    pub as_of_date:    Option<AsOfDate>,
    pub model_version: Option<String>,
    pub min_score:     Option<f64>,
    pub limit:         u32,
    pub offset:        u32,
}

impl Default for RiskScoreQuery {
    fn default() -> Self {
        Self {
            as_of_date:    None,
            model_version: None,
            min_score:     None,
            limit:         50,
            offset:        0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskScorePage {
    pub items:         Vec<RiskScoreRow>,
    pub total:         i64,
    pub limit:         u32,
    pub offset:        u32,
    pub as_of_date:    Option<String>,
    pub model_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskHistoryQuery {
    pub cik:           IssuerId,
    pub model_version: Option<String>,
    /// Inclusive.
    pub date_from:     Option<AsOfDate>,
    /// Inclusive.
    pub date_to:       Option<AsOfDate>,
    pub limit:         u32,
    pub offset:        u32,
}

impl RiskHistoryQuery {
    pub fn for_issuer(cik: IssuerId) -> Self {
        Self {
            cik,
            model_version: None,
            date_from:     None,
            date_to:       None,
            limit:         100,
            offset:        0,
        }
    }
}

impl RiskStore {
    /// Newest as-of date that has stored scores matching the filters.
    pub fn latest_score_date(
        &self,
        cik: Option<IssuerId>,
        model_version: Option<&str>,
        min_score: Option<f64>,
    ) -> ScoreResult<Option<String>> {
        let date = self.conn.query_row(
            "SELECT MAX(as_of_date) FROM issuer_risk_scores
             WHERE (?1 IS NULL OR cik = ?1)
               AND (?2 IS NULL OR model_version = ?2)
               AND (?3 IS NULL OR risk_score >= ?3)",
            params![cik, model_version, min_score],
            |row| row.get::<_, Option<String>>(0),
        )?;
        Ok(date)
    }

    /// One page of scores for a date, best rank first.
    pub fn top_risk_scores(&self, query: &RiskScoreQuery) -> ScoreResult<RiskScorePage> {
        let model_version = query.model_version.as_deref();
        let as_of_date = match query.as_of_date {
            Some(date) => Some(date.to_string()),
            None => self.latest_score_date(None, model_version, query.min_score)?,
        };
        let Some(as_of_date) = as_of_date else {
            return Ok(RiskScorePage {
                items:         Vec::new(),
                total:         0,
                limit:         query.limit,
                offset:        query.offset,
                as_of_date:    None,
                model_version: query.model_version.clone(),
            });
        };

        let filter = "WHERE r.as_of_date = ?1
               AND (?2 IS NULL OR r.model_version = ?2)
               AND (?3 IS NULL OR r.risk_score >= ?3)";

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM issuer_risk_scores r {filter}"),
            params![as_of_date, model_version, query.min_score],
            |row| row.get(0),
        )?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SCORE_COLUMNS}
             FROM issuer_risk_scores r
             LEFT JOIN companies c ON c.cik = r.cik
             {filter}
             ORDER BY
                 CASE WHEN r.risk_rank IS NULL THEN 1 ELSE 0 END,
                 r.risk_rank ASC,
                 r.risk_score DESC,
                 r.cik ASC
             LIMIT ?4 OFFSET ?5"
        ))?;
        let items = stmt
            .query_map(
                params![as_of_date, model_version, query.min_score, query.limit, query.offset],
                RiskScoreRow::from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RiskScorePage {
            items,
            total,
            limit:         query.limit,
            offset:        query.offset,
            as_of_date:    Some(as_of_date),
            model_version: query.model_version.clone(),
        })
    }

    /// An issuer's stored scores, newest first.
    pub fn risk_score_history(&self, query: &RiskHistoryQuery) -> ScoreResult<Vec<RiskScoreRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SCORE_COLUMNS}
             FROM issuer_risk_scores r
             LEFT JOIN companies c ON c.cik = r.cik
             WHERE r.cik = ?1
               AND (?2 IS NULL OR r.model_version = ?2)
               AND (?3 IS NULL OR r.as_of_date >= ?3)
               AND (?4 IS NULL OR r.as_of_date <= ?4)
             ORDER BY
                 r.as_of_date DESC,
                 CASE WHEN r.risk_rank IS NULL THEN 1 ELSE 0 END,
                 r.risk_rank ASC,
                 r.updated_at DESC
             LIMIT ?5 OFFSET ?6"
        ))?;
        let rows = stmt
            .query_map(
                params![
                    query.cik,
                    query.model_version,
                    query.date_from.map(|d| d.to_string()),
                    query.date_to.map(|d| d.to_string()),
                    query.limit,
                    query.offset,
                ],
                RiskScoreRow::from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// The stored score (with evidence) for one issuer, on `as_of`
    /// or on the issuer's latest scored date.
    pub fn risk_explanation(
        &self,
        cik: IssuerId,
        as_of: Option<AsOfDate>,
        model_version: Option<&str>,
    ) -> ScoreResult<Option<RiskScoreRow>> {
        let as_of_date = match as_of {
            Some(date) => Some(date.to_string()),
            None => self.latest_score_date(Some(cik), model_version, None)?,
        };
        let Some(as_of_date) = as_of_date else {
            return Ok(None);
        };

        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {SCORE_COLUMNS}
                     FROM issuer_risk_scores r
                     LEFT JOIN companies c ON c.cik = r.cik
                     WHERE r.cik = ?1 AND r.as_of_date = ?2
                       AND (?3 IS NULL OR r.model_version = ?3)
                     ORDER BY r.updated_at DESC, r.model_version DESC
                     LIMIT 1"
                ),
                params![cik, as_of_date, model_version],
                RiskScoreRow::from_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Stored feature rows for a date, by issuer then window.
    pub fn feature_snapshots_for(&self, as_of: AsOfDate) -> ScoreResult<Vec<FeatureSnapshotRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT cik, as_of_date, lookback_days, source_alert_count, features, updated_at
             FROM feature_snapshots
             WHERE as_of_date = ?1
             ORDER BY cik, lookback_days",
        )?;
        let raw = stmt
            .query_map(params![as_of.to_string()], |row| {
                Ok((
                    row.get::<_, IssuerId>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, WindowDays>(2)?,
                    row.get::<_, u32>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(
                |(cik, as_of_date, lookback_days, source_alert_count, features, updated_at)|
                 -> ScoreResult<FeatureSnapshotRow> {
                    Ok(FeatureSnapshotRow {
                        cik,
                        as_of_date,
                        lookback_days,
                        source_alert_count,
                        features: serde_json::from_str(&features)?,
                        updated_at,
                    })
                },
            )
            .collect()
    }

    pub fn risk_score_count(&self, as_of: AsOfDate, model_version: &str) -> ScoreResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM issuer_risk_scores WHERE as_of_date = ?1 AND model_version = ?2",
            params![as_of.to_string(), model_version],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn feature_snapshot_count(&self, as_of: AsOfDate) -> ScoreResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM feature_snapshots WHERE as_of_date = ?1",
            params![as_of.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
