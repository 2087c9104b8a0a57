//! Domain engine: store, scores, alerts and recommendations of one domain
//!
//! An `Engine` ties the leaf components together for a single domain
//! (wells, logistics, refining, markets). `tick` runs perturbation, then
//! alert evaluation against the fresh values, then records history; scores
//! and recommendations are derived on every read. The `Dashboard` owns one
//! engine per domain and advances them together as one generation.

mod dashboard;
mod journal;

pub use dashboard::{Dashboard, RaisedAlert, SharedDashboard, TickEvent};
pub use journal::{ActivityKind, ActivityRecord, HistoryPoint, Ring};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::alerts::AlertEmitter;
use crate::config::{DomainConfig, SimulationConfig};
use crate::error::{EngineError, ResourceKind, Result};
use crate::export::EntityReport;
use crate::recommend;
use crate::scoring::{self, ScoreBand};
use crate::simulation::{self, RandomSource};
use crate::store::MetricStore;
use crate::types::{
    AlertId, Category, Entity, EntityId, EntitySeed, MaintenancePolicy, MetricDefinition,
    Recommendation, ScoreDefinition, SetpointRule, Snapshot, ThresholdRule, ViewSpec,
};
use crate::view;

/// Capacities of the bounded logs kept per domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub history_capacity: usize,
    pub activity_capacity: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            history_capacity: crate::config::defaults::HISTORY_CAPACITY,
            activity_capacity: crate::config::defaults::ACTIVITY_LOG_CAPACITY,
        }
    }
}

impl From<&SimulationConfig> for EngineOptions {
    fn from(sim: &SimulationConfig) -> Self {
        Self {
            history_capacity: sim.history_capacity,
            activity_capacity: sim.activity_log_capacity,
        }
    }
}

/// Result of one domain tick.
#[derive(Debug, Clone, Default)]
pub struct TickOutcome {
    pub stepped: usize,
    /// (entity, alert id) of every alert raised, in creation order.
    pub raised: Vec<(EntityId, AlertId)>,
}

/// Per-domain aggregate shown on dashboard cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainSummary {
    pub name: String,
    pub title: String,
    pub generation: u64,
    pub entities: usize,
    pub live: usize,
    pub open_alerts: usize,
    /// Mean of each score over live entities (0 when none are live).
    pub average_scores: BTreeMap<String, f64>,
    pub by_category: BTreeMap<Category, usize>,
}

#[derive(Debug, Clone)]
pub struct Engine {
    name: String,
    title: String,
    live: Vec<Category>,
    search_fields: Vec<String>,
    store: MetricStore,
    scores: Vec<ScoreDefinition>,
    emitter: AlertEmitter,
    setpoints: Vec<SetpointRule>,
    maintenance: Option<MaintenancePolicy>,
    history: HashMap<EntityId, Ring<HistoryPoint>>,
    activity: Ring<ActivityRecord>,
    options: EngineOptions,
    generation: u64,
}

impl Engine {
    /// Build a domain from its configuration, refusing any inconsistency.
    pub fn from_config(config: &DomainConfig, options: EngineOptions, now: DateTime<Utc>) -> Result<Self> {
        let store = MetricStore::new(config.metrics.clone())?;
        check_domain(config)?;

        let mut engine = Self {
            name: config.name.clone(),
            title: config.title.clone(),
            live: config.live_categories.clone(),
            search_fields: config.search_fields.clone(),
            store,
            scores: config.scores.clone(),
            emitter: AlertEmitter::new(config.thresholds.clone(), config.noise.clone()),
            setpoints: config.setpoints.clone(),
            maintenance: config.maintenance.clone(),
            history: HashMap::new(),
            activity: Ring::new(options.activity_capacity),
            options,
            generation: 0,
        };
        for seed in &config.entities {
            engine.register(seed.clone(), now)?;
        }

        info!(
            domain = %engine.name,
            entities = engine.store.len(),
            metrics = engine.store.definitions().len(),
            scores = engine.scores.len(),
            rules = engine.emitter.rules().len(),
            "Domain registered"
        );
        Ok(engine)
    }

    fn register(&mut self, seed: EntitySeed, now: DateTime<Utc>) -> Result<EntityId> {
        let id = seed.id;
        let created = self.store.insert(seed, now, self.emitter.next_id())?;
        self.emitter.advance(created);
        self.history.insert(id, Ring::new(self.options.history_capacity));
        Ok(id)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn live_categories(&self) -> &[Category] {
        &self.live
    }

    pub fn is_live(&self, category: Category) -> bool {
        self.live.contains(&category)
    }

    pub fn metric_definitions(&self) -> &BTreeMap<String, MetricDefinition> {
        self.store.definitions()
    }

    pub fn score_definitions(&self) -> &[ScoreDefinition] {
        &self.scores
    }

    pub fn rules(&self) -> &[ThresholdRule] {
        self.emitter.rules()
    }

    pub fn entities(&self) -> &[Entity] {
        self.store.entities()
    }

    pub fn entity(&self, id: EntityId) -> Result<&Entity> {
        self.store.entity(id)
    }

    // ------------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------------

    /// Perturb live entities, evaluate rules against the new values and
    /// record one history point per entity.
    pub fn tick(&mut self, rng: &mut dyn RandomSource, now: DateTime<Utc>) -> TickOutcome {
        let previous: HashMap<EntityId, Snapshot> = self
            .store
            .entities()
            .iter()
            .filter(|e| self.live.contains(&e.category))
            .map(|e| (e.id, e.metrics.clone()))
            .collect();

        let stepped = simulation::step(&mut self.store, &self.live, rng, now);
        let mut outcome = TickOutcome {
            stepped,
            raised: Vec::new(),
        };

        let (_, entities) = self.store.parts_mut();
        for entity in entities.iter_mut().filter(|e| self.live.contains(&e.category)) {
            let raised = self.emitter.evaluate(entity, previous.get(&entity.id), now);
            outcome.raised.extend(raised.iter().map(|a| (entity.id, a.id)));
            entity.alerts.extend(raised);
        }

        let mut candidates: Vec<EntityId> = previous.keys().copied().collect();
        candidates.sort_unstable();
        if let Some((id, alert)) = self.emitter.maybe_noise(&candidates, rng, now) {
            if let Ok(entity) = self.store.entity_mut(id) {
                debug!(domain = %self.name, entity = %entity.name, message = %alert.message, "Noise alert");
                outcome.raised.push((id, alert.id));
                entity.alerts.push(alert);
            }
        }

        self.generation += 1;
        self.record_history(now);

        debug!(
            domain = %self.name,
            generation = self.generation,
            stepped,
            alerts = outcome.raised.len(),
            "Tick complete"
        );
        outcome
    }

    fn record_history(&mut self, now: DateTime<Utc>) {
        for entity in self.store.entities() {
            let point = HistoryPoint {
                generation: self.generation,
                timestamp: now,
                metrics: entity.metrics.clone(),
                scores: self.entity_scores(entity),
            };
            self.history
                .entry(entity.id)
                .or_insert_with(|| Ring::new(self.options.history_capacity))
                .push(point);
        }
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    pub fn get(&self, id: EntityId, metric: &str) -> Result<f64> {
        self.store.get(id, metric)
    }

    pub fn snapshot(&self, id: EntityId) -> Result<Snapshot> {
        self.store.snapshot(id)
    }

    pub fn score_definition(&self, name: &str) -> Result<&ScoreDefinition> {
        self.scores
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| EngineError::not_found(ResourceKind::Score, name))
    }

    /// Current value of one score for one entity.
    pub fn score(&self, id: EntityId, score: &str) -> Result<f64> {
        let def = self.score_definition(score)?;
        let entity = self.store.entity(id)?;
        scoring::compute_score_with_alerts(&entity.metrics, def, entity.open_alert_count())
    }

    /// Every score of one entity.
    pub fn scores(&self, id: EntityId) -> Result<BTreeMap<String, f64>> {
        Ok(self.entity_scores(self.store.entity(id)?))
    }

    fn entity_scores(&self, entity: &Entity) -> BTreeMap<String, f64> {
        let open = entity.open_alert_count();
        self.scores
            .iter()
            .filter_map(|def| {
                scoring::compute_score_with_alerts(&entity.metrics, def, open)
                    .ok()
                    .map(|v| (def.name.clone(), v))
            })
            .collect()
    }

    pub fn recommendations(&self, id: EntityId, now: DateTime<Utc>) -> Result<Vec<Recommendation>> {
        let entity = self.store.entity(id)?;
        Ok(self.entity_recommendations(entity, &self.entity_scores(entity), now))
    }

    fn entity_recommendations(
        &self,
        entity: &Entity,
        scores: &BTreeMap<String, f64>,
        now: DateTime<Utc>,
    ) -> Vec<Recommendation> {
        let mut out: Vec<Recommendation> = self
            .setpoints
            .iter()
            .filter_map(|rule| recommend::setpoint(rule, &entity.metrics))
            .collect();
        if let Some(policy) = &self.maintenance {
            if let Some(&score) = scores.get(&policy.score) {
                out.extend(recommend::maintenance(
                    policy,
                    score,
                    entity.last_maintenance,
                    now.date_naive(),
                ));
            }
        }
        out
    }

    /// Flat report of one entity: metrics, scores, bands, alert counts.
    pub fn report(&self, id: EntityId, now: DateTime<Utc>) -> Result<EntityReport> {
        Ok(self.build_report(self.store.entity(id)?, now))
    }

    fn build_report(&self, entity: &Entity, now: DateTime<Utc>) -> EntityReport {
        let scores = self.entity_scores(entity);
        let bands = scores
            .iter()
            .map(|(k, v)| (k.clone(), ScoreBand::of(*v)))
            .collect();
        EntityReport {
            domain: self.name.clone(),
            id: entity.id,
            name: entity.name.clone(),
            category: entity.category,
            attributes: entity.attributes.clone(),
            metrics: entity.metrics.clone(),
            recommendations: self.entity_recommendations(entity, &scores, now),
            scores,
            bands,
            open_alerts: entity.open_alert_count(),
            total_alerts: entity.alerts.len(),
            last_maintenance: entity.last_maintenance,
            last_updated: entity.last_updated,
        }
    }

    /// Reports of every entity, in collection order.
    pub fn reports(&self, now: DateTime<Utc>) -> Vec<EntityReport> {
        self.store
            .entities()
            .iter()
            .map(|e| self.build_report(e, now))
            .collect()
    }

    /// Filtered and sorted reports. Sort keys may name scores as well as
    /// metrics and attributes.
    pub fn query(&self, spec: &ViewSpec, now: DateTime<Utc>) -> Vec<EntityReport> {
        let reports = self.reports(now);
        view::view(&reports, spec, &self.search_fields)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn summary(&self) -> DomainSummary {
        let entities = self.store.entities();
        let live: Vec<&Entity> = entities.iter().filter(|e| self.is_live(e.category)).collect();

        let mut average_scores = BTreeMap::new();
        for def in &self.scores {
            let values: Vec<f64> = live
                .iter()
                .filter_map(|e| {
                    scoring::compute_score_with_alerts(&e.metrics, def, e.open_alert_count()).ok()
                })
                .collect();
            let avg = if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            };
            average_scores.insert(def.name.clone(), avg);
        }

        let mut by_category = BTreeMap::new();
        for e in entities {
            *by_category.entry(e.category).or_insert(0) += 1;
        }

        DomainSummary {
            name: self.name.clone(),
            title: self.title.clone(),
            generation: self.generation,
            entities: entities.len(),
            live: live.len(),
            open_alerts: entities.iter().map(Entity::open_alert_count).sum(),
            average_scores,
            by_category,
        }
    }

    /// History points of one entity, oldest first.
    pub fn history(&self, id: EntityId) -> Result<Vec<HistoryPoint>> {
        self.store.entity(id)?;
        Ok(self
            .history
            .get(&id)
            .map(|ring| ring.iter().cloned().collect())
            .unwrap_or_default())
    }

    /// Most recent operator actions, newest first.
    pub fn activity(&self, limit: usize) -> Vec<ActivityRecord> {
        self.activity.iter().rev().take(limit).cloned().collect()
    }

    // ------------------------------------------------------------------------
    // Operator actions
    // ------------------------------------------------------------------------

    fn log(&mut self, kind: ActivityKind, entities: Vec<EntityId>, detail: String, now: DateTime<Utc>) {
        info!(domain = %self.name, ?kind, ?entities, %detail, "Operator action");
        self.activity.push(ActivityRecord {
            timestamp: now,
            kind,
            entities,
            detail,
        });
    }

    /// Set one metric, clamped exactly as the perturbation step clamps.
    /// Returns the stored value.
    pub fn adjust(&mut self, id: EntityId, field: &str, value: f64, now: DateTime<Utc>) -> Result<f64> {
        let stored = self.store.set(id, field, value, now)?;
        self.log(
            ActivityKind::Adjust,
            vec![id],
            format!("{field} set to {stored}"),
            now,
        );
        Ok(stored)
    }

    /// Apply one adjustment to several entities. Every id is checked before
    /// anything is written, so either all entities change or none do.
    pub fn adjust_many(&mut self, ids: &[EntityId], field: &str, value: f64, now: DateTime<Utc>) -> Result<f64> {
        if !value.is_finite() {
            return Err(EngineError::InvalidValue {
                field: field.to_string(),
                value,
            });
        }
        let def = self.store.definition(field)?.clone();
        if let Some(missing) = ids.iter().find(|id| !self.store.contains(**id)) {
            return Err(EngineError::not_found(ResourceKind::Entity, missing));
        }
        for &id in ids {
            self.store.set(id, field, value, now)?;
        }
        let stored = def.clamp(value);
        self.log(
            ActivityKind::BatchAdjust,
            ids.to_vec(),
            format!("{field} set to {stored} on {} entities", ids.len()),
            now,
        );
        Ok(stored)
    }

    /// Move an entity to another category (shut in a well, send a truck to
    /// maintenance). Returns the previous category.
    pub fn set_category(&mut self, id: EntityId, category: Category, now: DateTime<Utc>) -> Result<Category> {
        let previous = self.store.set_category(id, category, now)?;
        if previous != category {
            self.log(
                ActivityKind::CategoryChange,
                vec![id],
                format!("{previous} -> {category}"),
                now,
            );
        }
        Ok(previous)
    }

    /// Mark an alert resolved and attach the comment. Resolving an already
    /// resolved alert appends the comment and succeeds.
    pub fn resolve_alert(&mut self, id: EntityId, alert_id: AlertId, comment: &str, now: DateTime<Utc>) -> Result<()> {
        let entity = self.store.entity_mut(id)?;
        let alert = entity
            .alerts
            .iter_mut()
            .find(|a| a.id == alert_id)
            .ok_or_else(|| EngineError::not_found(ResourceKind::Alert, alert_id))?;
        alert.resolve(comment, now);
        self.log(
            ActivityKind::ResolveAlert,
            vec![id],
            format!("alert {alert_id} resolved: {comment}"),
            now,
        );
        Ok(())
    }

    /// Replace a rule's threshold. Returns the previous value.
    pub fn update_threshold(&mut self, rule_id: &str, threshold: f64, now: DateTime<Utc>) -> Result<f64> {
        let previous = self.emitter.update_threshold(rule_id, threshold)?;
        self.log(
            ActivityKind::ThresholdChange,
            Vec::new(),
            format!("{rule_id}: {previous} -> {threshold}"),
            now,
        );
        Ok(previous)
    }

    /// Register a new entity at runtime.
    pub fn add_entity(&mut self, seed: EntitySeed, now: DateTime<Utc>) -> Result<EntityId> {
        let name = seed.name.clone();
        let id = self.register(seed, now)?;
        self.log(ActivityKind::AddEntity, vec![id], format!("added {name}"), now);
        Ok(id)
    }

    /// Remove an entity together with its history and alert state.
    pub fn remove_entity(&mut self, id: EntityId, now: DateTime<Utc>) -> Result<Entity> {
        let entity = self.store.remove(id)?;
        self.emitter.forget(id);
        self.history.remove(&id);
        self.log(
            ActivityKind::RemoveEntity,
            vec![id],
            format!("removed {}", entity.name),
            now,
        );
        Ok(entity)
    }
}

/// Refuse a domain configuration with any consistency problem.
fn check_domain(config: &DomainConfig) -> Result<()> {
    let problems = config.problems();
    if problems.is_empty() {
        Ok(())
    } else {
        Err(EngineError::invalid(problems.join("; ")))
    }
}
