//! Metric definitions: bounds, per-tick delta and starting value.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Bounds and random-walk step of one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDefinition {
    pub min: f64,
    pub max: f64,
    /// Largest absolute change one tick may apply. Zero freezes the metric
    /// (setpoints such as choke size change only through adjustment).
    pub max_delta: f64,
    pub initial: f64,
    /// Counted quantities (bbl/d, shares, units) are kept whole.
    #[serde(default)]
    pub integral: bool,
    #[serde(default)]
    pub unit: Option<String>,
}

impl MetricDefinition {
    pub fn new(min: f64, max: f64, max_delta: f64, initial: f64) -> Self {
        Self {
            min,
            max,
            max_delta,
            initial,
            integral: false,
            unit: None,
        }
    }

    pub fn integral(mut self) -> Self {
        self.integral = true;
        self
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    /// Bring `value` into `[min, max]`, rounding first for integral metrics.
    pub fn clamp(&self, value: f64) -> f64 {
        let value = if self.integral { value.round() } else { value };
        value.clamp(self.min, self.max)
    }

    pub fn is_static(&self) -> bool {
        self.max_delta == 0.0
    }

    /// Check the definition for internal consistency.
    pub fn validate(&self, name: &str) -> Result<()> {
        if ![self.min, self.max, self.max_delta, self.initial]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(EngineError::invalid(format!(
                "metric '{name}': bounds, delta and starting value must be finite"
            )));
        }
        if self.min > self.max {
            return Err(EngineError::invalid(format!(
                "metric '{name}': min ({}) must be <= max ({})",
                self.min, self.max
            )));
        }
        if self.max_delta < 0.0 {
            return Err(EngineError::invalid(format!(
                "metric '{name}': max_delta ({}) cannot be negative",
                self.max_delta
            )));
        }
        if self.initial < self.min || self.initial > self.max {
            return Err(EngineError::invalid(format!(
                "metric '{name}': starting value {} is outside [{}, {}]",
                self.initial, self.min, self.max
            )));
        }
        Ok(())
    }
}
