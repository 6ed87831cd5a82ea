//! Alert events and the anomaly types they carry.
//!
//! Detectors write alerts with a string `anomaly_type` code. Codes the
//! scoring model knows about resolve to an `AnomalyType`; anything else is
//! kept verbatim as `AnomalyKind::Unrecognized` and only ever counts toward
//! an issuer's total alert count.

use crate::{
    error::{ScoreError, ScoreResult},
    types::{AsOfDate, IssuerId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AnomalyType {
    /// Notification of late filing (Form NT 10-K / NT 10-Q).
    #[serde(rename = "NT_FILING")]
    NtFiling,
    /// Material filing pushed out after Friday market close.
    #[serde(rename = "FRIDAY_BURYING")]
    FridayBurying,
    /// Burst of 8-K filings above the issuer's own baseline.
    #[serde(rename = "8K_SPIKE")]
    EightKSpike,
}

impl AnomalyType {
    pub const ALL: [AnomalyType; 3] = [
        AnomalyType::NtFiling,
        AnomalyType::FridayBurying,
        AnomalyType::EightKSpike,
    ];

    /// Stable wire code, as written by the detectors.
    pub fn code(self) -> &'static str {
        match self {
            AnomalyType::NtFiling      => "NT_FILING",
            AnomalyType::FridayBurying => "FRIDAY_BURYING",
            AnomalyType::EightKSpike   => "8K_SPIKE",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }
}

impl fmt::Display for AnomalyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The anomaly type of an alert as read from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnomalyKind {
    Known(AnomalyType),
    Unrecognized(String),
}

impl AnomalyKind {
    pub fn parse(code: &str) -> Self {
        match AnomalyType::from_code(code) {
            Some(t) => AnomalyKind::Known(t),
            None    => AnomalyKind::Unrecognized(code.to_string()),
        }
    }

    pub fn known(&self) -> Option<AnomalyType> {
        match self {
            AnomalyKind::Known(t) => Some(*t),
            AnomalyKind::Unrecognized(_) => None,
        }
    }
}

/// One detector output, attributed to the issuer that filed it.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub issuer_id:   IssuerId,
    pub anomaly:     AnomalyKind,
    pub severity:    f64,
    pub occurred_at: DateTime<Utc>,
}

impl AlertEvent {
    /// Severity must be a finite value in [0, 1].
    pub fn validate(&self) -> ScoreResult<()> {
        if self.severity.is_nan() || !(0.0..=1.0).contains(&self.severity) {
            return Err(ScoreError::Validation {
                issuer_id: self.issuer_id,
                severity:  self.severity,
            });
        }
        Ok(())
    }

    /// Whole calendar days between the event's UTC date and `as_of`.
    /// Negative for events dated after the as-of day.
    pub fn age_days(&self, as_of: AsOfDate) -> i64 {
        (as_of - self.occurred_at.date_naive()).num_days()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn event(severity: f64, y: i32, m: u32, d: u32, h: u32) -> AlertEvent {
        AlertEvent {
            issuer_id:   1,
            anomaly:     AnomalyKind::Known(AnomalyType::NtFiling),
            severity,
            occurred_at: Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap(),
        }
    }

    #[test]
    fn codes_round_trip_through_from_code() {
        for t in AnomalyType::ALL {
            assert_eq!(AnomalyType::from_code(t.code()), Some(t));
        }
        assert_eq!(AnomalyType::from_code("nt_filing"), None);
    }

    #[test]
    fn unknown_codes_are_kept_verbatim() {
        let kind = AnomalyKind::parse("INSIDER_DUMP");
        assert_eq!(kind, AnomalyKind::Unrecognized("INSIDER_DUMP".into()));
        assert_eq!(kind.known(), None);
        assert_eq!(AnomalyKind::parse("8K_SPIKE").known(), Some(AnomalyType::EightKSpike));
    }

    #[test]
    fn severity_bounds_are_inclusive() {
        assert!(event(0.0, 2026, 2, 22, 10).validate().is_ok());
        assert!(event(1.0, 2026, 2, 22, 10).validate().is_ok());
        assert!(event(42.0, 2026, 2, 22, 10).validate().is_err());
        assert!(event(-0.01, 2026, 2, 22, 10).validate().is_err());
        assert!(event(f64::NAN, 2026, 2, 22, 10).validate().is_err());
    }

    #[test]
    fn age_ignores_time_of_day() {
        let as_of = NaiveDate::from_ymd_opt(2026, 2, 23).unwrap();
        assert_eq!(event(0.5, 2026, 2, 23, 23).age_days(as_of), 0);
        assert_eq!(event(0.5, 2026, 2, 22, 0).age_days(as_of), 1);
        assert_eq!(event(0.5, 2026, 2, 22, 23).age_days(as_of), 1);
        assert_eq!(event(0.5, 2026, 2, 24, 1).age_days(as_of), -1);
    }
}
