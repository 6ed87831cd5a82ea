//! Explanation payload stored alongside each risk score.
//!
//! The blob is keyed by plain strings so the read side can render it
//! without knowing the model. Window-specific keys carry the window length,
//! e.g. `top_signals_30d` and `source_alerts_90d`.

use crate::{
    anomaly::AnomalyType,
    config::ScoringConfig,
    error::{ScoreError, ScoreResult},
    features::IssuerWindows,
    types::{AsOfDate, WindowDays},
};
use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopSignal {
    pub signal:    AnomalyType,
    pub component: f64,
    pub count:     u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evidence {
    pub model_version:         String,
    pub as_of_date:            AsOfDate,
    pub window_weights:        BTreeMap<WindowDays, f64>,
    pub anomaly_weights:       BTreeMap<String, f64>,
    pub window_scores:         BTreeMap<WindowDays, f64>,
    /// Shortest configured window; the window `top_signals` describes.
    pub top_signals_window:    WindowDays,
    pub top_signals:           Vec<TopSignal>,
    pub lookback_windows_days: Vec<WindowDays>,
    /// Longest configured window; the window `source_alerts` counts.
    pub source_alerts_window:  WindowDays,
    pub source_alerts:         u32,
}

impl Evidence {
    pub fn build(
        config: &ScoringConfig,
        as_of: AsOfDate,
        windows: &IssuerWindows,
    ) -> ScoreResult<Self> {
        let (Some(shortest), Some(longest)) = (config.shortest_window(), config.longest_window())
        else {
            return Err(ScoreError::Config {
                reason: "at least one lookback window is required".into(),
            });
        };

        let top_signals = windows
            .get(&shortest)
            .map(|row| {
                row.ranked_signals()
                    .into_iter()
                    .map(|(signal, f)| TopSignal {
                        signal,
                        component: f.component,
                        count: f.count,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            model_version:         config.model_version.clone(),
            as_of_date:            as_of,
            window_weights:        config.windows.clone(),
            anomaly_weights:       config.anomaly_weights(),
            window_scores:         windows
                .iter()
                .map(|(&days, row)| (days, row.window_score))
                .collect(),
            top_signals_window:    shortest,
            top_signals,
            lookback_windows_days: config.window_lengths(),
            source_alerts_window:  longest,
            source_alerts:         windows.get(&longest).map_or(0, |row| row.total_alerts),
        })
    }

    pub fn top_signals_key(&self) -> String {
        format!("top_signals_{}d", self.top_signals_window)
    }

    pub fn source_alerts_key(&self) -> String {
        format!("source_alerts_{}d", self.source_alerts_window)
    }
}

impl Serialize for Evidence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(8))?;
        map.serialize_entry("model_version", &self.model_version)?;
        map.serialize_entry("as_of_date", &self.as_of_date)?;
        map.serialize_entry("window_weights", &self.window_weights)?;
        map.serialize_entry("anomaly_weights", &self.anomaly_weights)?;
        map.serialize_entry("window_scores", &self.window_scores)?;
        map.serialize_entry(&self.top_signals_key(), &self.top_signals)?;
        map.serialize_entry("lookback_windows_days", &self.lookback_windows_days)?;
        map.serialize_entry(&self.source_alerts_key(), &self.source_alerts)?;
        map.end()
    }
}
