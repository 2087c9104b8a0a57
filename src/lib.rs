//! PETRO-PULSE: petroleum operations metric simulation
//!
//! Live metrics for wells, trucks, refinery units and market instruments,
//! driven by a bounded random walk and turned into composite scores,
//! edge-triggered threshold alerts and operator recommendations.
//!
//! ## Architecture
//!
//! - **Store**: per-domain entities with clamped metric values
//! - **Simulation**: one perturbation step per tick over live entities
//! - **Scoring / Alerts / Recommend**: derived views over a snapshot
//! - **Engine**: one domain; **Dashboard**: all domains, one generation
//! - **Clock**: periodic ticks on a background task
//! - **API**: axum REST surface and tick event stream

pub mod alerts;
pub mod api;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod recommend;
pub mod scoring;
pub mod simulation;
pub mod store;
pub mod types;
pub mod view;

// Re-export configuration
pub use config::{ConfigError, DomainConfig, EngineConfig};

// Re-export the engine surface
pub use engine::{Dashboard, DomainSummary, Engine, EngineOptions, SharedDashboard, TickEvent};
pub use error::{EngineError, ResourceKind, Result};

// Re-export commonly used types
pub use types::{
    Alert, Category, Entity, EntityId, EntitySeed, MetricDefinition, Recommendation,
    ScoreDefinition, Severity, ThresholdRule, ViewSpec,
};

pub use clock::SimulationClock;
pub use export::{EntityReport, ExportFormat};
pub use scoring::{compute_score, ScoreBand};
