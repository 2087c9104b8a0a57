//! Multi-domain dashboard: one engine per domain, one shared random source,
//! one generation counter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{DomainSummary, Engine, EngineOptions};
use crate::config::EngineConfig;
use crate::error::{EngineError, ResourceKind, Result};
use crate::export::EntityReport;
use crate::simulation::{RandomSource, SeededRandom};
use crate::types::{Alert, EntityId};

/// Dashboard behind a single lock. A tick holds the write half for its whole
/// duration, so readers never observe a partially stepped generation.
pub type SharedDashboard = Arc<RwLock<Dashboard>>;

/// Alert raised during a tick, with enough context to display it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaisedAlert {
    pub domain: String,
    pub entity_id: EntityId,
    pub entity: String,
    pub alert: Alert,
}

/// Notification published after every completed tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickEvent {
    pub generation: u64,
    pub timestamp: DateTime<Utc>,
    pub alerts: Vec<RaisedAlert>,
}

pub struct Dashboard {
    engines: Vec<Engine>,
    rng: Box<dyn RandomSource>,
    generation: u64,
}

impl Dashboard {
    pub fn new(engines: Vec<Engine>, rng: Box<dyn RandomSource>) -> Result<Self> {
        let mut seen = HashSet::new();
        for engine in &engines {
            if !seen.insert(engine.name().to_string()) {
                return Err(EngineError::invalid(format!(
                    "duplicate domain '{}'",
                    engine.name()
                )));
            }
        }
        Ok(Self {
            engines,
            rng,
            generation: 0,
        })
    }

    /// Build every configured domain, seeding the random source from
    /// `simulation.seed` when set.
    pub fn from_config(config: &EngineConfig, now: DateTime<Utc>) -> Result<Self> {
        let options = EngineOptions::from(&config.simulation);
        let engines = config
            .domains
            .iter()
            .map(|d| Engine::from_config(d, options, now))
            .collect::<Result<Vec<_>>>()?;
        info!(
            domains = engines.len(),
            seed = ?config.simulation.seed,
            "Dashboard ready"
        );
        Self::new(engines, Box::new(SeededRandom::new(config.simulation.seed)))
    }

    /// Replace the random source (tests inject a scripted one).
    pub fn set_random_source(&mut self, rng: Box<dyn RandomSource>) {
        self.rng = rng;
    }

    pub fn into_shared(self) -> SharedDashboard {
        Arc::new(RwLock::new(self))
    }

    /// Completed generations; increases by one per tick.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn domains(&self) -> &[Engine] {
        &self.engines
    }

    pub fn domain(&self, name: &str) -> Result<&Engine> {
        self.engines
            .iter()
            .find(|e| e.name() == name)
            .ok_or_else(|| EngineError::not_found(ResourceKind::Domain, name))
    }

    pub fn domain_mut(&mut self, name: &str) -> Result<&mut Engine> {
        self.engines
            .iter_mut()
            .find(|e| e.name() == name)
            .ok_or_else(|| EngineError::not_found(ResourceKind::Domain, name))
    }

    /// Advance every domain by one step, in configuration order.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickEvent {
        let mut alerts = Vec::new();
        for engine in &mut self.engines {
            let outcome = engine.tick(self.rng.as_mut(), now);
            for (entity_id, alert_id) in outcome.raised {
                let Ok(entity) = engine.entity(entity_id) else {
                    continue;
                };
                if let Some(alert) = entity.alert(alert_id) {
                    alerts.push(RaisedAlert {
                        domain: engine.name().to_string(),
                        entity_id,
                        entity: entity.name.clone(),
                        alert: alert.clone(),
                    });
                }
            }
        }
        self.generation += 1;
        debug!(generation = self.generation, alerts = alerts.len(), "Dashboard tick");
        TickEvent {
            generation: self.generation,
            timestamp: now,
            alerts,
        }
    }

    pub fn summaries(&self) -> Vec<DomainSummary> {
        self.engines.iter().map(Engine::summary).collect()
    }

    /// Reports of one domain, or of all domains when `domain` is `None`.
    pub fn reports(&self, domain: Option<&str>, now: DateTime<Utc>) -> Result<Vec<EntityReport>> {
        match domain {
            Some(name) => Ok(self.domain(name)?.reports(now)),
            None => Ok(self.engines.iter().flat_map(|e| e.reports(now)).collect()),
        }
    }
}
