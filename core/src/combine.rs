//! Weighted-average blending, shared by the two combination steps:
//! anomaly-type components into a window score, and window scores into
//! the final composite.

use crate::{anomaly::AnomalyType, config::AnomalyTypeConfig, types::WindowDays};
use std::collections::BTreeMap;

/// `sum(score_i * weight_i) / sum(weight_i)`, or 0.0 when the weights sum to zero.
pub fn weighted_average<I>(entries: I) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let (weighted_sum, weight_total) = entries
        .into_iter()
        .fold((0.0, 0.0), |(sum, total), (score, weight)| {
            (sum + score * weight, total + weight)
        });
    if weight_total == 0.0 {
        return 0.0;
    }
    weighted_sum / weight_total
}

/// Blend per-type component scores into one window score.
/// Every configured type participates; a type with no component scores 0.0.
pub fn combine_components(
    components: &BTreeMap<AnomalyType, f64>,
    anomaly_types: &BTreeMap<AnomalyType, AnomalyTypeConfig>,
) -> f64 {
    weighted_average(anomaly_types.iter().map(|(t, params)| {
        (components.get(t).copied().unwrap_or(0.0), params.weight)
    }))
}

/// Blend per-window scores into the final composite, clamped to [0, 1].
pub fn combine_windows(
    window_scores: &BTreeMap<WindowDays, f64>,
    window_weights: &BTreeMap<WindowDays, f64>,
) -> f64 {
    clamp_unit(weighted_average(window_weights.iter().map(|(days, &weight)| {
        (window_scores.get(days).copied().unwrap_or(0.0), weight)
    })))
}

/// Clamp into [0, 1]; NaN maps to 0.0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;

    const EPS: f64 = 1e-12;

    #[test]
    fn weighted_average_normalises_by_total_weight() {
        let blended = weighted_average([(1.0, 0.65), (0.0, 0.35)]);
        assert!((blended - 0.65).abs() < EPS);
        let blended = weighted_average([(0.5, 2.0), (0.5, 3.0)]);
        assert!((blended - 0.5).abs() < EPS);
    }

    #[test]
    fn zero_total_weight_scores_zero() {
        assert_eq!(weighted_average([(0.9, 0.0), (0.7, 0.0)]), 0.0);
        assert_eq!(weighted_average(std::iter::empty::<(f64, f64)>()), 0.0);
    }

    #[test]
    fn missing_components_count_as_zero() {
        let config = ScoringConfig::default();
        let components = BTreeMap::from([(AnomalyType::NtFiling, 0.6)]);
        let score = combine_components(&components, &config.anomaly_types);
        assert!((score - 0.45 * 0.6).abs() < EPS);
    }

    #[test]
    fn window_blend_is_clamped() {
        let weights = BTreeMap::from([(30, 1.0), (90, -0.5)]);
        let scores = BTreeMap::from([(30, 1.0), (90, 0.0)]);
        // 1.0 / 0.5 = 2.0 before the clamp
        assert_eq!(combine_windows(&scores, &weights), 1.0);
    }

    #[test]
    fn clamp_unit_handles_nan() {
        assert_eq!(clamp_unit(f64::NAN), 0.0);
        assert_eq!(clamp_unit(-0.2), 0.0);
        assert_eq!(clamp_unit(0.3), 0.3);
    }
}
