//! Threshold rules: condition, limit, severity and message template.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Severity;

/// Comparison applied by a threshold rule.
///
/// Level conditions look at the current value only; change conditions
/// compare against the value observed on the previous tick and are never
/// met without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Above,
    Below,
    AtOrAbove,
    AtOrBelow,
    /// `current - previous > threshold`
    RiseExceeds,
    /// `previous - current > threshold`
    DropExceeds,
    /// `|current - previous| / |previous| * 100 > threshold`
    ChangePercentExceeds,
}

impl Condition {
    pub fn needs_previous(&self) -> bool {
        matches!(
            self,
            Condition::RiseExceeds | Condition::DropExceeds | Condition::ChangePercentExceeds
        )
    }

    pub fn is_met(&self, previous: Option<f64>, current: f64, threshold: f64) -> bool {
        match self {
            Condition::Above => current > threshold,
            Condition::Below => current < threshold,
            Condition::AtOrAbove => current >= threshold,
            Condition::AtOrBelow => current <= threshold,
            Condition::RiseExceeds => previous.is_some_and(|p| current - p > threshold),
            Condition::DropExceeds => previous.is_some_and(|p| p - current > threshold),
            Condition::ChangePercentExceeds => previous.is_some_and(|p| {
                p != 0.0 && ((current - p) / p).abs() * 100.0 > threshold
            }),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Condition::Above => "above",
            Condition::Below => "below",
            Condition::AtOrAbove => "at_or_above",
            Condition::AtOrBelow => "at_or_below",
            Condition::RiseExceeds => "rise_exceeds",
            Condition::DropExceeds => "drop_exceeds",
            Condition::ChangePercentExceeds => "change_percent_exceeds",
        };
        f.write_str(s)
    }
}

impl FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "above" | "gt" => Ok(Self::Above),
            "below" | "lt" => Ok(Self::Below),
            "at_or_above" | "gte" => Ok(Self::AtOrAbove),
            "at_or_below" | "lte" => Ok(Self::AtOrBelow),
            "rise_exceeds" => Ok(Self::RiseExceeds),
            "drop_exceeds" => Ok(Self::DropExceeds),
            "change_percent_exceeds" => Ok(Self::ChangePercentExceeds),
            _ => Err(format!("unknown condition: {s}")),
        }
    }
}

/// A named threshold predicate over one metric.
///
/// `message` may contain `{entity}`, `{metric}`, `{value}` and `{threshold}`
/// placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRule {
    pub id: String,
    pub metric: String,
    pub condition: Condition,
    pub threshold: f64,
    pub severity: Severity,
    pub message: String,
}

impl ThresholdRule {
    pub fn new(
        id: &str,
        metric: &str,
        condition: Condition,
        threshold: f64,
        severity: Severity,
        message: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            metric: metric.to_string(),
            condition,
            threshold,
            severity,
            message: message.to_string(),
        }
    }

    pub fn is_met(&self, previous: Option<f64>, current: f64) -> bool {
        self.condition.is_met(previous, current, self.threshold)
    }

    pub fn render_message(&self, entity: &str, value: f64) -> String {
        self.message
            .replace("{entity}", entity)
            .replace("{metric}", &self.metric)
            .replace("{value}", &format!("{value:.2}"))
            .replace("{threshold}", &format!("{}", self.threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_conditions() {
        assert!(Condition::Above.is_met(None, 22.0, 20.0));
        assert!(!Condition::Above.is_met(None, 20.0, 20.0));
        assert!(Condition::AtOrAbove.is_met(None, 20.0, 20.0));
        assert!(Condition::Below.is_met(None, 4.9, 5.0));
        assert!(Condition::AtOrBelow.is_met(None, 5.0, 5.0));
    }

    #[test]
    fn test_change_conditions_need_previous() {
        assert!(!Condition::DropExceeds.is_met(None, 80.0, 5.0));
        assert!(Condition::DropExceeds.is_met(Some(90.0), 84.0, 5.0));
        assert!(Condition::RiseExceeds.is_met(Some(10.0), 16.0, 5.0));
        assert!(Condition::ChangePercentExceeds.is_met(Some(100.0), 94.0, 5.0));
        assert!(!Condition::ChangePercentExceeds.is_met(Some(0.0), 94.0, 5.0));
    }

    #[test]
    fn test_render_message_fills_placeholders() {
        let rule = ThresholdRule::new(
            "fuel_low",
            "fuel_efficiency",
            Condition::Below,
            5.0,
            Severity::Medium,
            "Fuel efficiency on {entity} dropped below {threshold} mpg ({value})",
        );
        assert_eq!(
            rule.render_message("Truck-001", 4.876),
            "Fuel efficiency on Truck-001 dropped below 5 mpg (4.88)"
        );
    }
}
