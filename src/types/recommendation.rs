//! Operator advice: setpoint changes and maintenance scheduling.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Condition;

/// One clause of a setpoint rule: `metric <condition> value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub metric: String,
    pub condition: Condition,
    pub value: f64,
}

impl Criterion {
    pub fn new(metric: &str, condition: Condition, value: f64) -> Self {
        Self {
            metric: metric.to_string(),
            condition,
            value,
        }
    }
}

/// Step a setpoint metric (choke size, feed rate) up or down.
///
/// `decrease_when` is checked first; every criterion of a list must hold.
/// An empty list never matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetpointRule {
    pub metric: String,
    pub step: f64,
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub decrease_when: Vec<Criterion>,
    #[serde(default)]
    pub increase_when: Vec<Criterion>,
}

/// When to schedule maintenance for an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenancePolicy {
    /// Score whose value is checked against `score_below`.
    pub score: String,
    pub score_below: f64,
    pub max_days_since: i64,
    /// Days from today to the recommended date.
    #[serde(default = "default_lead_days")]
    pub lead_days: i64,
}

fn default_lead_days() -> i64 {
    7
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recommendation {
    Setpoint {
        metric: String,
        current: f64,
        recommended: f64,
    },
    Maintenance {
        due: NaiveDate,
        reason: String,
    },
}
