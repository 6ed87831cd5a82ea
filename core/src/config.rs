//! Scoring model: lookback windows, recency half-life and per-type weights.

use crate::{
    anomaly::AnomalyType,
    error::{ScoreError, ScoreResult},
    types::WindowDays,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_MODEL_VERSION: &str = "v1_alert_composite";
pub const DEFAULT_HALFLIFE_DAYS: f64 = 30.0;

/// Per-anomaly-type scoring parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyTypeConfig {
    /// Contribution to the blended per-window score.
    pub weight: f64,
    /// Decayed severity needed before the component saturates at 1.0.
    /// Higher means a type needs more evidence to max out.
    pub saturation_scale: f64,
}

/// Immutable model parameters for one scoring run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub model_version: String,
    pub recency_halflife_days: f64,
    /// Lookback window length -> combination weight.
    pub windows: BTreeMap<WindowDays, f64>,
    pub anomaly_types: BTreeMap<AnomalyType, AnomalyTypeConfig>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            model_version: DEFAULT_MODEL_VERSION.into(),
            recency_halflife_days: DEFAULT_HALFLIFE_DAYS,
            windows: BTreeMap::from([(30, 0.65), (90, 0.35)]),
            anomaly_types: BTreeMap::from([
                (AnomalyType::NtFiling,      AnomalyTypeConfig { weight: 0.45, saturation_scale: 1.5 }),
                (AnomalyType::FridayBurying, AnomalyTypeConfig { weight: 0.20, saturation_scale: 2.5 }),
                (AnomalyType::EightKSpike,   AnomalyTypeConfig { weight: 0.35, saturation_scale: 1.2 }),
            ]),
        }
    }
}

impl ScoringConfig {
    /// Load a model definition from a JSON file.
    /// Fields missing from the file keep their v1 defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: ScoringConfig = serde_json::from_str(&content)?;
        config.validate()?;
        log::info!(
            "Loaded scoring config {} from {path} (windows={:?})",
            config.model_version,
            config.window_lengths()
        );
        Ok(config)
    }

    /// Reject configurations the pipeline cannot score with.
    /// A zero total weight is allowed and simply scores 0.0.
    pub fn validate(&self) -> ScoreResult<()> {
        let invalid = |reason: String| Err(ScoreError::Config { reason });

        if self.model_version.trim().is_empty() {
            return invalid("model_version must not be empty".into());
        }
        if !(self.recency_halflife_days > 0.0) {
            return invalid(format!(
                "recency_halflife_days must be positive, got {}",
                self.recency_halflife_days
            ));
        }
        if self.windows.is_empty() {
            return invalid("at least one lookback window is required".into());
        }
        for (&days, &weight) in &self.windows {
            if days == 0 {
                return invalid("lookback window length must be positive".into());
            }
            if !(weight >= 0.0 && weight.is_finite()) {
                return invalid(format!("window {days}d has invalid weight {weight}"));
            }
        }
        for (anomaly_type, params) in &self.anomaly_types {
            if !(params.weight >= 0.0 && params.weight.is_finite()) {
                return invalid(format!("{anomaly_type} has invalid weight {}", params.weight));
            }
            if !(params.saturation_scale > 0.0 && params.saturation_scale.is_finite()) {
                return invalid(format!(
                    "{anomaly_type} saturation_scale must be positive, got {}",
                    params.saturation_scale
                ));
            }
        }
        Ok(())
    }

    /// Configured window lengths, shortest first.
    pub fn window_lengths(&self) -> Vec<WindowDays> {
        self.windows.keys().copied().collect()
    }

    pub fn shortest_window(&self) -> Option<WindowDays> {
        self.windows.keys().next().copied()
    }

    pub fn longest_window(&self) -> Option<WindowDays> {
        self.windows.keys().next_back().copied()
    }

    /// Anomaly-type weight table keyed by wire code.
    pub fn anomaly_weights(&self) -> BTreeMap<String, f64> {
        self.anomaly_types
            .iter()
            .map(|(t, params)| (t.code().to_string(), params.weight))
            .collect()
    }
}
