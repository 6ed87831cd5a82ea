//! Window feature builder.
//!
//! Turns the run's alert events into one `FeatureRow` per
//! (issuer, lookback window), for every tracked issuer and every configured
//! window, in a single pass over the events. Rows are rebuilt from scratch
//! on every run.

use crate::{
    anomaly::{AlertEvent, AnomalyType},
    combine::combine_components,
    config::ScoringConfig,
    decay::{component_score, RecencyDecay},
    error::ScoreResult,
    types::{AsOfDate, IssuerId, WindowDays},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregates for one anomaly type inside one window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeFeatures {
    pub count: u32,
    pub weighted_severity: f64,
    pub component: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Every alert in the window, including unrecognised types.
    pub total_alerts: u32,
    pub per_type: BTreeMap<AnomalyType, TypeFeatures>,
    pub window_score: f64,
}

impl FeatureRow {
    /// All-zero row with an entry for every configured anomaly type.
    pub fn zeroed(config: &ScoringConfig) -> Self {
        Self {
            total_alerts: 0,
            per_type: config
                .anomaly_types
                .keys()
                .map(|&t| (t, TypeFeatures::default()))
                .collect(),
            window_score: 0.0,
        }
    }

    pub fn component(&self, anomaly_type: AnomalyType) -> f64 {
        self.per_type.get(&anomaly_type).map_or(0.0, |f| f.component)
    }

    /// Configured types, strongest signal first:
    /// component descending, then raw count descending.
    pub fn ranked_signals(&self) -> Vec<(AnomalyType, TypeFeatures)> {
        let mut signals: Vec<_> = self.per_type.iter().map(|(&t, &f)| (t, f)).collect();
        signals.sort_by(|(_, a), (_, b)| {
            b.component
                .total_cmp(&a.component)
                .then_with(|| b.count.cmp(&a.count))
        });
        signals
    }

    fn finalize(&mut self, config: &ScoringConfig) {
        let mut components = BTreeMap::new();
        for (anomaly_type, features) in self.per_type.iter_mut() {
            let scale = config
                .anomaly_types
                .get(anomaly_type)
                .map_or(0.0, |p| p.saturation_scale);
            features.component = component_score(features.weighted_severity, scale);
            components.insert(*anomaly_type, features.component);
        }
        self.window_score = combine_components(&components, &config.anomaly_types);
    }
}

/// Feature rows for one issuer, keyed by window length.
pub type IssuerWindows = BTreeMap<WindowDays, FeatureRow>;

/// Feature rows for the whole run.
pub type WindowFeatures = BTreeMap<IssuerId, IssuerWindows>;

pub struct WindowFeatureBuilder<'a> {
    config: &'a ScoringConfig,
    decay:  RecencyDecay,
}

impl<'a> WindowFeatureBuilder<'a> {
    pub fn new(config: &'a ScoringConfig) -> Self {
        Self {
            config,
            decay: RecencyDecay::new(config.recency_halflife_days),
        }
    }

    /// Build every (issuer, window) row for `as_of`.
    ///
    /// Events for untracked issuers, dated after `as_of`, or older than the
    /// longest window are skipped. An event counts in every window at least
    /// as long as its age. Fails on the first event with an invalid severity.
    pub fn build(
        &self,
        issuers: &[IssuerId],
        events: &[AlertEvent],
        as_of: AsOfDate,
    ) -> ScoreResult<WindowFeatures> {
        let mut features: WindowFeatures = issuers
            .iter()
            .map(|&issuer| {
                let rows = self
                    .config
                    .windows
                    .keys()
                    .map(|&days| (days, FeatureRow::zeroed(self.config)))
                    .collect();
                (issuer, rows)
            })
            .collect();

        let mut untracked = 0usize;
        let mut unrecognized = 0usize;

        for event in events {
            event.validate()?;

            let Some(rows) = features.get_mut(&event.issuer_id) else {
                untracked += 1;
                continue;
            };
            let age = event.age_days(as_of);
            if age < 0 {
                continue;
            }

            let decayed = self.decay.decayed(event.severity, age);
            let anomaly_type = event
                .anomaly
                .known()
                .filter(|t| self.config.anomaly_types.contains_key(t));
            if anomaly_type.is_none() {
                unrecognized += 1;
            }

            for (&days, row) in rows.iter_mut() {
                if i64::from(days) < age {
                    continue;
                }
                row.total_alerts += 1;
                if let Some(t) = anomaly_type {
                    let entry = row.per_type.entry(t).or_default();
                    entry.count += 1;
                    entry.weighted_severity += decayed;
                }
            }
        }

        for row in features.values_mut().flat_map(|rows| rows.values_mut()) {
            row.finalize(self.config);
        }

        if untracked > 0 {
            log::debug!("Skipped {untracked} alerts for untracked issuers");
        }
        if unrecognized > 0 {
            log::debug!("{unrecognized} alerts carry an unscored anomaly type (counted in totals only)");
        }

        Ok(features)
    }
}
