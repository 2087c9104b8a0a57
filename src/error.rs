//! Engine error taxonomy.
//!
//! Two kinds matter to callers: a reference to something that was never
//! declared (`NotFound`), and a setup that must be refused before any
//! simulation runs (`InvalidConfiguration`). Non-finite operator input is
//! reported separately so the API layer can answer with a 400.

use std::fmt;
use thiserror::Error;

/// What kind of thing a `NotFound` error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Domain,
    Entity,
    Metric,
    Score,
    Alert,
    Rule,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Domain => write!(f, "domain"),
            ResourceKind::Entity => write!(f, "entity"),
            ResourceKind::Metric => write!(f, "metric"),
            ResourceKind::Score => write!(f, "score definition"),
            ResourceKind::Alert => write!(f, "alert"),
            ResourceKind::Rule => write!(f, "threshold rule"),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: ResourceKind, id: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: f64 },
}

impl EngineError {
    pub fn not_found(kind: ResourceKind, id: impl fmt::Display) -> Self {
        EngineError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        EngineError::InvalidConfiguration(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_kind_and_id() {
        let err = EngineError::not_found(ResourceKind::Entity, 42);
        assert_eq!(err.to_string(), "entity not found: 42");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_invalid_configuration_is_not_not_found() {
        let err = EngineError::invalid("min > max");
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("min > max"));
    }
}
