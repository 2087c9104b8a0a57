//! Threshold Alert Emitter
//!
//! Edge-triggered: each (entity, rule) pair is either Normal or Triggered,
//! and an alert is emitted only on the Normal → Triggered transition. The
//! way back to Normal is silent.
//!
//! Alert ids are allocated here so they increase strictly in creation order
//! across every entity of a domain, seeded and noise alerts included.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::{EngineError, ResourceKind, Result};
use crate::simulation::RandomSource;
use crate::types::{Alert, AlertId, Entity, EntityId, Severity, Snapshot, ThresholdRule};

/// Probabilistic alert emission, off unless a domain enables it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Chance per tick that one random live entity receives an alert.
    #[serde(default = "default_noise_probability")]
    pub probability: f64,
    #[serde(default = "default_noise_messages")]
    pub messages: Vec<String>,
}

fn default_noise_probability() -> f64 {
    0.05
}

fn default_noise_messages() -> Vec<String> {
    [
        "High pressure detected",
        "Water cut increasing",
        "Flow rate anomaly",
        "Maintenance required",
        "Performance degradation",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            probability: default_noise_probability(),
            messages: default_noise_messages(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleState {
    Normal,
    Triggered,
}

#[derive(Debug, Clone)]
pub struct AlertEmitter {
    rules: Vec<ThresholdRule>,
    states: HashMap<(EntityId, String), RuleState>,
    next_id: AlertId,
    noise: NoiseConfig,
}

impl AlertEmitter {
    pub fn new(rules: Vec<ThresholdRule>, noise: NoiseConfig) -> Self {
        Self {
            rules,
            states: HashMap::new(),
            next_id: 1,
            noise,
        }
    }

    pub fn rules(&self) -> &[ThresholdRule] {
        &self.rules
    }

    pub fn rule(&self, rule_id: &str) -> Result<&ThresholdRule> {
        self.rules
            .iter()
            .find(|r| r.id == rule_id)
            .ok_or_else(|| EngineError::not_found(ResourceKind::Rule, rule_id))
    }

    pub fn noise(&self) -> &NoiseConfig {
        &self.noise
    }

    /// Id the next alert will receive.
    pub fn next_id(&self) -> AlertId {
        self.next_id
    }

    /// Skip `count` ids already handed out (seeded alerts).
    pub fn advance(&mut self, count: usize) {
        self.next_id += count as u64;
    }

    /// Create an alert with a fresh id.
    pub fn new_alert(&mut self, severity: Severity, message: impl Into<String>, at: DateTime<Utc>) -> Alert {
        let alert = Alert::new(self.next_id, severity, message, at);
        self.next_id += 1;
        alert
    }

    /// Evaluate every rule against `entity`'s current metrics.
    ///
    /// `previous` is the snapshot from before this tick, used by the
    /// rate-of-change conditions. Returns the alerts to append, in rule order.
    pub fn evaluate(&mut self, entity: &Entity, previous: Option<&Snapshot>, at: DateTime<Utc>) -> Vec<Alert> {
        let mut raised = Vec::new();

        for rule in &self.rules {
            let Some(&current) = entity.metrics.get(&rule.metric) else {
                continue;
            };
            let prev = previous.and_then(|p| p.get(&rule.metric).copied());
            let met = rule.is_met(prev, current);

            let key = (entity.id, rule.id.clone());
            let state = self.states.get(&key).copied().unwrap_or(RuleState::Normal);

            match (state, met) {
                (RuleState::Normal, true) => {
                    let mut alert = Alert::new(
                        self.next_id,
                        rule.severity,
                        rule.render_message(&entity.name, current),
                        at,
                    );
                    alert.rule_id = Some(rule.id.clone());
                    alert.metric = Some(rule.metric.clone());
                    alert.value = Some(current);
                    debug!(
                        entity = %entity.name,
                        rule = %rule.id,
                        value = current,
                        alert_id = alert.id,
                        "Threshold crossed"
                    );
                    self.next_id += 1;
                    self.states.insert(key, RuleState::Triggered);
                    raised.push(alert);
                }
                (RuleState::Triggered, false) => {
                    self.states.insert(key, RuleState::Normal);
                }
                _ => {}
            }
        }

        raised
    }

    /// Possibly raise one noise alert on a random candidate.
    pub fn maybe_noise(
        &mut self,
        candidates: &[EntityId],
        rng: &mut dyn RandomSource,
        at: DateTime<Utc>,
    ) -> Option<(EntityId, Alert)> {
        if !self.noise.enabled || candidates.is_empty() || self.noise.messages.is_empty() {
            return None;
        }
        if rng.next_unit() >= self.noise.probability {
            return None;
        }
        let entity = candidates[rng.pick(candidates.len())];
        let severity = Severity::ALL[rng.pick(Severity::ALL.len())];
        let message = self.noise.messages[rng.pick(self.noise.messages.len())].clone();
        Some((entity, self.new_alert(severity, message, at)))
    }

    /// Replace a rule's threshold. Edge state is kept, so an already
    /// triggered pair does not re-alert just because the limit moved.
    ///
    /// Returns the previous threshold.
    pub fn update_threshold(&mut self, rule_id: &str, threshold: f64) -> Result<f64> {
        if !threshold.is_finite() {
            return Err(EngineError::InvalidValue {
                field: rule_id.to_string(),
                value: threshold,
            });
        }
        let rule = self
            .rules
            .iter_mut()
            .find(|r| r.id == rule_id)
            .ok_or_else(|| EngineError::not_found(ResourceKind::Rule, rule_id))?;
        let previous = std::mem::replace(&mut rule.threshold, threshold);
        info!(rule = %rule_id, previous, threshold, "Threshold updated");
        Ok(previous)
    }

    /// Drop edge state for a removed entity.
    pub fn forget(&mut self, entity: EntityId) {
        self.states.retain(|(id, _), _| *id != entity);
    }

    pub fn is_triggered(&self, entity: EntityId, rule_id: &str) -> bool {
        self.states.get(&(entity, rule_id.to_string())) == Some(&RuleState::Triggered)
    }
}
