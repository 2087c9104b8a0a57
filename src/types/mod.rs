//! Shared data structures for the metric simulation engine
//!
//! - Entity, Category, EntitySeed: monitored assets and their status
//! - MetricDefinition: bounds and random-walk step per metric
//! - ScoreDefinition: weighted composite scores
//! - Alert, ThresholdRule: edge-triggered alerting
//! - Recommendation: setpoint and maintenance advice
//! - ViewSpec: transient filter/sort query

mod entity;
mod metric;
mod score;
mod alert;
pub mod thresholds;
mod recommendation;
mod view;

pub use entity::*;
pub use metric::*;
pub use score::*;
pub use alert::*;
pub use thresholds::*;
pub use recommendation::*;
pub use view::*;
