//! Score Calculator
//!
//! `score = clamp(100 * Σ weight_i * n_i, 0, 100)` where `n_i` is the
//! term's metric normalized into `[0, 1]` and shaped (rising, falling or
//! target). Weights are not divided by their sum; a definition whose weights
//! add up to zero scores 0.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EngineError, ResourceKind, Result};
use crate::types::{ScoreDefinition, ScoreTerm, Shape, Snapshot};

/// Score of `snapshot` for an entity without open alerts.
pub fn compute_score(snapshot: &Snapshot, def: &ScoreDefinition) -> Result<f64> {
    compute_score_with_alerts(snapshot, def, 0)
}

/// Score of `snapshot`, applying the definition's alert factor (if any)
/// according to how many alerts are still open.
pub fn compute_score_with_alerts(
    snapshot: &Snapshot,
    def: &ScoreDefinition,
    open_alerts: usize,
) -> Result<f64> {
    if def.total_weight() == 0.0 {
        return Ok(0.0);
    }

    let mut sum = 0.0;
    for term in &def.terms {
        let value = snapshot
            .get(&term.metric)
            .copied()
            .ok_or_else(|| EngineError::not_found(ResourceKind::Metric, &term.metric))?;
        sum += term.weight * normalized(term, value);
    }
    if let Some(factor) = def.alert_factor {
        let f = if open_alerts > 0 { factor.open_factor } else { 1.0 };
        sum += factor.weight * f;
    }

    Ok((sum * 100.0).clamp(0.0, 100.0))
}

/// Shaped contribution of one term, in `[0, 1]`.
fn normalized(term: &ScoreTerm, value: f64) -> f64 {
    let range = term.range;
    match term.shape {
        Shape::Rising => range.unit(value),
        Shape::Falling => 1.0 - range.unit(value),
        Shape::Target { ideal } => {
            let span = (ideal - range.lo).max(range.hi - ideal);
            if span <= 0.0 {
                return 1.0;
            }
            let clamped = value.clamp(range.lo, range.hi);
            (1.0 - (clamped - ideal).abs() / span).clamp(0.0, 1.0)
        }
    }
}

/// Qualitative band of a score, used for colouring and export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBand {
    Good,
    Fair,
    Poor,
}

impl ScoreBand {
    pub fn of(score: f64) -> Self {
        if score > 80.0 {
            ScoreBand::Good
        } else if score > 60.0 {
            ScoreBand::Fair
        } else {
            ScoreBand::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreBand::Good => "good",
            ScoreBand::Fair => "fair",
            ScoreBand::Poor => "poor",
        }
    }
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(pairs: &[(&str, f64)]) -> Snapshot {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn optimization() -> ScoreDefinition {
        ScoreDefinition::new(
            "optimization",
            vec![
                ScoreTerm::rising("efficiency", 0.4, 0.0, 100.0),
                ScoreTerm::falling("water_cut", 0.3, 0.0, 30.0),
                ScoreTerm::target("pressure", 0.2, 0.0, 2400.0, 1200.0),
            ],
        )
        .with_alert_factor(0.1, 0.5)
    }

    #[test]
    fn test_wells_optimization_formula() {
        let s = snap(&[("efficiency", 88.5), ("water_cut", 15.0), ("pressure", 1280.0)]);
        let expected = (0.885 * 0.4 + 0.5 * 0.3 + (1.0 - 80.0 / 1200.0) * 0.2 + 0.1) * 100.0;
        let got = compute_score(&s, &optimization()).unwrap();
        assert!((got - expected).abs() < 1e-9, "{got} vs {expected}");

        let with_alert = compute_score_with_alerts(&s, &optimization(), 1).unwrap();
        assert!((got - with_alert - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_is_clamped_to_100() {
        let def = ScoreDefinition::new(
            "over",
            vec![
                ScoreTerm::rising("a", 1.0, 0.0, 1.0),
                ScoreTerm::rising("b", 1.0, 0.0, 1.0),
            ],
        );
        let s = snap(&[("a", 1.0), ("b", 1.0)]);
        assert_eq!(compute_score(&s, &def).unwrap(), 100.0);
    }

    #[test]
    fn test_out_of_range_values_normalize_to_bounds() {
        let def = ScoreDefinition::new("x", vec![ScoreTerm::rising("a", 1.0, 0.0, 10.0)]);
        assert_eq!(compute_score(&snap(&[("a", -5.0)]), &def).unwrap(), 0.0);
        assert_eq!(compute_score(&snap(&[("a", 50.0)]), &def).unwrap(), 100.0);
    }

    #[test]
    fn test_zero_weights_score_zero() {
        let def = ScoreDefinition::new("x", vec![ScoreTerm::rising("a", 0.0, 0.0, 10.0)]);
        assert_eq!(compute_score(&snap(&[("a", 5.0)]), &def).unwrap(), 0.0);
    }

    #[test]
    fn test_missing_metric_is_not_found() {
        let def = ScoreDefinition::new("x", vec![ScoreTerm::rising("a", 1.0, 0.0, 10.0)]);
        assert!(compute_score(&snap(&[]), &def).unwrap_err().is_not_found());
    }

    #[test]
    fn test_bands() {
        assert_eq!(ScoreBand::of(80.1), ScoreBand::Good);
        assert_eq!(ScoreBand::of(80.0), ScoreBand::Fair);
        assert_eq!(ScoreBand::of(60.0), ScoreBand::Poor);
    }
}
