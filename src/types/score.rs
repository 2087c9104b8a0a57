//! Score definitions: weighted, normalized metric terms.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::MetricDefinition;
use crate::error::{EngineError, Result};

/// Normalization range for one score term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormRange {
    pub lo: f64,
    pub hi: f64,
}

impl NormRange {
    pub const fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    /// Position of `value` inside the range, clamped to [0, 1].
    pub fn unit(&self, value: f64) -> f64 {
        ((value - self.lo) / (self.hi - self.lo)).clamp(0.0, 1.0)
    }
}

/// How a normalized value maps onto a score contribution.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    /// Higher is better.
    #[default]
    Rising,
    /// Lower is better (water cut, emissions, volatility).
    Falling,
    /// Best at `ideal`, degrading linearly toward the far end of the range.
    Target { ideal: f64 },
}

/// One (metric, weight, normalization range) triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreTerm {
    pub metric: String,
    pub weight: f64,
    pub range: NormRange,
    #[serde(default)]
    pub shape: Shape,
}

impl ScoreTerm {
    pub fn rising(metric: &str, weight: f64, lo: f64, hi: f64) -> Self {
        Self {
            metric: metric.to_string(),
            weight,
            range: NormRange::new(lo, hi),
            shape: Shape::Rising,
        }
    }

    pub fn falling(metric: &str, weight: f64, lo: f64, hi: f64) -> Self {
        Self {
            shape: Shape::Falling,
            ..Self::rising(metric, weight, lo, hi)
        }
    }

    pub fn target(metric: &str, weight: f64, lo: f64, hi: f64, ideal: f64) -> Self {
        Self {
            shape: Shape::Target { ideal },
            ..Self::rising(metric, weight, lo, hi)
        }
    }
}

/// Contribution of the entity's alert state to a score.
///
/// Adds `weight` when no alert is open, `weight * open_factor` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertFactor {
    pub weight: f64,
    #[serde(default = "default_open_factor")]
    pub open_factor: f64,
}

fn default_open_factor() -> f64 {
    0.5
}

/// A named composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreDefinition {
    pub name: String,
    pub terms: Vec<ScoreTerm>,
    #[serde(default)]
    pub alert_factor: Option<AlertFactor>,
}

impl ScoreDefinition {
    pub fn new(name: &str, terms: Vec<ScoreTerm>) -> Self {
        Self {
            name: name.to_string(),
            terms,
            alert_factor: None,
        }
    }

    pub fn with_alert_factor(mut self, weight: f64, open_factor: f64) -> Self {
        self.alert_factor = Some(AlertFactor {
            weight,
            open_factor,
        });
        self
    }

    pub fn total_weight(&self) -> f64 {
        self.terms.iter().map(|t| t.weight).sum::<f64>()
            + self.alert_factor.map_or(0.0, |a| a.weight)
    }

    /// Refuse definitions that could never produce a meaningful score.
    pub fn validate(&self, metrics: &BTreeMap<String, MetricDefinition>) -> Result<()> {
        if self.terms.is_empty() {
            return Err(EngineError::invalid(format!(
                "score '{}' has no metric terms",
                self.name
            )));
        }
        for term in &self.terms {
            if !metrics.contains_key(&term.metric) {
                return Err(EngineError::invalid(format!(
                    "score '{}' references undeclared metric '{}'",
                    self.name, term.metric
                )));
            }
            if !term.weight.is_finite() || term.weight < 0.0 {
                return Err(EngineError::invalid(format!(
                    "score '{}': weight for '{}' must be finite and >= 0",
                    self.name, term.metric
                )));
            }
            let NormRange { lo, hi } = term.range;
            if !lo.is_finite() || !hi.is_finite() || lo >= hi {
                return Err(EngineError::invalid(format!(
                    "score '{}': range for '{}' must satisfy lo < hi (got {lo}..{hi})",
                    self.name, term.metric
                )));
            }
            if let Shape::Target { ideal } = term.shape {
                if !(lo..=hi).contains(&ideal) {
                    return Err(EngineError::invalid(format!(
                        "score '{}': ideal {ideal} for '{}' is outside {lo}..{hi}",
                        self.name, term.metric
                    )));
                }
            }
        }
        if let Some(factor) = self.alert_factor {
            if !factor.weight.is_finite()
                || factor.weight < 0.0
                || !(0.0..=1.0).contains(&factor.open_factor)
            {
                return Err(EngineError::invalid(format!(
                    "score '{}': alert factor needs weight >= 0 and open_factor in [0, 1]",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> BTreeMap<String, MetricDefinition> {
        let mut m = BTreeMap::new();
        m.insert("water".to_string(), MetricDefinition::new(0.0, 30.0, 0.5, 15.0));
        m
    }

    #[test]
    fn test_empty_definition_is_invalid() {
        let def = ScoreDefinition::new("empty", Vec::new());
        assert!(def.validate(&metrics()).is_err());
    }

    #[test]
    fn test_unknown_metric_is_invalid() {
        let def = ScoreDefinition::new("x", vec![ScoreTerm::rising("oil", 1.0, 0.0, 1.0)]);
        assert!(def.validate(&metrics()).is_err());
    }

    #[test]
    fn test_degenerate_range_is_invalid() {
        let def = ScoreDefinition::new("x", vec![ScoreTerm::rising("water", 1.0, 5.0, 5.0)]);
        assert!(def.validate(&metrics()).is_err());
    }

    #[test]
    fn test_total_weight_includes_alert_factor() {
        let def = ScoreDefinition::new("x", vec![ScoreTerm::falling("water", 0.3, 0.0, 30.0)])
            .with_alert_factor(0.1, 0.5);
        assert!((def.total_weight() - 0.4).abs() < 1e-12);
        assert!(def.validate(&metrics()).is_ok());
    }
}
