//! Recency decay and per-type component saturation.
//!
//! Ages are whole calendar days. An alert filed the same day as the as-of
//! date (or, abnormally, after it) carries its full severity.

use std::f64::consts::LN_2;

/// Exponential half-life decay over calendar-day ages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecencyDecay {
    halflife_days: f64,
}

impl RecencyDecay {
    pub fn new(halflife_days: f64) -> Self {
        Self { halflife_days }
    }

    /// Weight in (0, 1]: 1.0 at age <= 0, 0.5 at one half-life.
    pub fn weight(&self, age_days: i64) -> f64 {
        if age_days <= 0 {
            return 1.0;
        }
        (-LN_2 * age_days as f64 / self.halflife_days).exp()
    }

    /// Severity scaled by its recency weight.
    pub fn decayed(&self, severity: f64, age_days: i64) -> f64 {
        severity * self.weight(age_days)
    }
}

/// Saturating map from accumulated decayed severity to [0, 1].
pub fn component_score(weighted_severity: f64, saturation_scale: f64) -> f64 {
    if weighted_severity <= 0.0 || saturation_scale <= 0.0 {
        return 0.0;
    }
    (weighted_severity / saturation_scale).min(1.0)
}
