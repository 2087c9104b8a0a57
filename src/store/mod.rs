//! Metric State Store
//!
//! Owns the entities of one domain together with the metric definitions
//! that bound their values. Every write passes through `MetricDefinition::clamp`,
//! so a stored value is always inside its declared `[min, max]`.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::error::{EngineError, ResourceKind, Result};
use crate::types::{Alert, Category, Entity, EntityId, EntitySeed, MetricDefinition, Snapshot};

#[derive(Debug, Clone)]
pub struct MetricStore {
    definitions: BTreeMap<String, MetricDefinition>,
    /// Insertion order is the collection order used by unsorted views.
    entities: Vec<Entity>,
    index: HashMap<EntityId, usize>,
}

impl MetricStore {
    /// Create an empty store; every definition is validated up front.
    pub fn new(definitions: BTreeMap<String, MetricDefinition>) -> Result<Self> {
        for (name, def) in &definitions {
            def.validate(name)?;
        }
        Ok(Self {
            definitions,
            entities: Vec::new(),
            index: HashMap::new(),
        })
    }

    pub fn definitions(&self) -> &BTreeMap<String, MetricDefinition> {
        &self.definitions
    }

    pub fn definition(&self, metric: &str) -> Result<&MetricDefinition> {
        self.definitions
            .get(metric)
            .ok_or_else(|| EngineError::not_found(ResourceKind::Metric, metric))
    }

    /// Register an entity. Metrics the seed omits start at their definition's
    /// starting value; seeded values are clamped into bounds.
    ///
    /// `first_alert_id` numbers the seed's initial alerts. Returns how many
    /// alerts were created.
    pub fn insert(&mut self, seed: EntitySeed, now: DateTime<Utc>, first_alert_id: u64) -> Result<usize> {
        if self.index.contains_key(&seed.id) {
            return Err(EngineError::invalid(format!(
                "duplicate entity id {} ({})",
                seed.id, seed.name
            )));
        }
        if let Some(unknown) = seed.metrics.keys().find(|m| !self.definitions.contains_key(*m)) {
            return Err(EngineError::not_found(ResourceKind::Metric, unknown));
        }

        let mut metrics = Snapshot::new();
        for (name, def) in &self.definitions {
            let raw = seed.metrics.get(name).copied().unwrap_or(def.initial);
            if !raw.is_finite() {
                return Err(EngineError::InvalidValue {
                    field: format!("{}.{name}", seed.name),
                    value: raw,
                });
            }
            metrics.insert(name.clone(), def.clamp(raw));
        }

        let alerts: Vec<Alert> = seed
            .alerts
            .iter()
            .zip(first_alert_id..)
            .map(|(a, id)| Alert::new(id, a.severity, a.message.clone(), now))
            .collect();
        let created = alerts.len();

        debug!(id = seed.id, name = %seed.name, category = %seed.category, "Entity registered");
        self.index.insert(seed.id, self.entities.len());
        self.entities.push(Entity {
            id: seed.id,
            name: seed.name,
            category: seed.category,
            attributes: seed.attributes,
            metrics,
            alerts,
            last_maintenance: seed.last_maintenance,
            last_updated: now,
        });
        Ok(created)
    }

    /// Remove an entity from the collection, returning it.
    pub fn remove(&mut self, id: EntityId) -> Result<Entity> {
        let pos = self
            .index
            .remove(&id)
            .ok_or_else(|| EngineError::not_found(ResourceKind::Entity, id))?;
        let entity = self.entities.remove(pos);
        for slot in self.index.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        Ok(entity)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entity(&self, id: EntityId) -> Result<&Entity> {
        self.index
            .get(&id)
            .map(|&i| &self.entities[i])
            .ok_or_else(|| EngineError::not_found(ResourceKind::Entity, id))
    }

    pub(crate) fn entity_mut(&mut self, id: EntityId) -> Result<&mut Entity> {
        match self.index.get(&id) {
            Some(&i) => Ok(&mut self.entities[i]),
            None => Err(EngineError::not_found(ResourceKind::Entity, id)),
        }
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Definitions and entities borrowed together, for the perturbation step.
    pub(crate) fn parts_mut(&mut self) -> (&BTreeMap<String, MetricDefinition>, &mut [Entity]) {
        (&self.definitions, &mut self.entities)
    }

    /// Current value of one metric.
    pub fn get(&self, id: EntityId, metric: &str) -> Result<f64> {
        let entity = self.entity(id)?;
        entity
            .metrics
            .get(metric)
            .copied()
            .ok_or_else(|| EngineError::not_found(ResourceKind::Metric, metric))
    }

    /// Clamp `value` into the metric's bounds and store it.
    ///
    /// Returns the value actually stored.
    pub fn set(&mut self, id: EntityId, metric: &str, value: f64, now: DateTime<Utc>) -> Result<f64> {
        if !value.is_finite() {
            return Err(EngineError::InvalidValue {
                field: metric.to_string(),
                value,
            });
        }
        let clamped = self.definition(metric)?.clamp(value);
        let entity = self.entity_mut(id)?;
        entity.metrics.insert(metric.to_string(), clamped);
        entity.last_updated = now;
        Ok(clamped)
    }

    /// Read-only copy of an entity's metric values.
    pub fn snapshot(&self, id: EntityId) -> Result<Snapshot> {
        Ok(self.entity(id)?.metrics.clone())
    }

    /// Move an entity to another category, returning the previous one.
    pub fn set_category(&mut self, id: EntityId, category: Category, now: DateTime<Utc>) -> Result<Category> {
        let entity = self.entity_mut(id)?;
        let previous = std::mem::replace(&mut entity.category, category);
        entity.last_updated = now;
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MetricStore {
        let mut defs = BTreeMap::new();
        defs.insert("fuel_efficiency".to_string(), MetricDefinition::new(4.0, 10.0, 0.2, 6.5));
        defs.insert("load".to_string(), MetricDefinition::new(0.0, 15_000.0, 0.0, 0.0).integral());
        MetricStore::new(defs).unwrap()
    }

    fn truck(id: EntityId) -> EntitySeed {
        EntitySeed::new(id, format!("Truck-{id:03}"), Category::EnRoute)
    }

    #[test]
    fn test_missing_seed_metrics_start_at_initial_value() {
        let mut s = store();
        s.insert(truck(1), Utc::now(), 1).unwrap();
        assert_eq!(s.get(1, "fuel_efficiency").unwrap(), 6.5);
        assert_eq!(s.get(1, "load").unwrap(), 0.0);
    }

    #[test]
    fn test_seed_values_are_clamped() {
        let mut s = store();
        s.insert(truck(1).with_metric("fuel_efficiency", 12.0), Utc::now(), 1)
            .unwrap();
        assert_eq!(s.get(1, "fuel_efficiency").unwrap(), 10.0);
    }

    #[test]
    fn test_duplicate_id_is_refused() {
        let mut s = store();
        s.insert(truck(1), Utc::now(), 1).unwrap();
        let err = s.insert(truck(1), Utc::now(), 1).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_set_clamps_and_rounds() {
        let mut s = store();
        s.insert(truck(1), Utc::now(), 1).unwrap();
        assert_eq!(s.set(1, "fuel_efficiency", 99.0, Utc::now()).unwrap(), 10.0);
        assert_eq!(s.set(1, "load", 5000.4, Utc::now()).unwrap(), 5000.0);
        assert!(matches!(
            s.set(1, "load", f64::NAN, Utc::now()),
            Err(EngineError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_unknown_entity_and_metric_are_not_found() {
        let mut s = store();
        s.insert(truck(1), Utc::now(), 1).unwrap();
        assert!(s.get(2, "load").unwrap_err().is_not_found());
        assert!(s.get(1, "rpm").unwrap_err().is_not_found());
        assert!(s.set(1, "rpm", 1.0, Utc::now()).unwrap_err().is_not_found());
        assert!(s.snapshot(7).unwrap_err().is_not_found());
    }

    #[test]
    fn test_seed_alerts_are_numbered_from_first_id() {
        let mut s = store();
        let seed = truck(1).with_alert(crate::types::Severity::Medium, "High fuel consumption");
        assert_eq!(s.insert(seed, Utc::now(), 5).unwrap(), 1);
        let entity = s.entity(1).unwrap();
        assert_eq!(entity.alerts[0].id, 5);
        assert_eq!(entity.open_alert_count(), 1);
    }

    #[test]
    fn test_remove_keeps_index_consistent() {
        let mut s = store();
        for id in 1..=3 {
            s.insert(truck(id), Utc::now(), 1).unwrap();
        }
        s.remove(1).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s.entity(3).unwrap().id, 3);
        assert!(s.remove(1).unwrap_err().is_not_found());
    }
}
