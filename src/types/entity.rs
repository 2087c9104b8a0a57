//! Entity types: Category, Entity, EntitySeed

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::{Alert, Severity};

/// Entity identifier, unique within a domain.
pub type EntityId = u32;

/// Current metric values of one entity, keyed by metric name.
///
/// A `BTreeMap` keeps iteration order stable, which also keeps the order in
/// which the perturbation step draws random samples stable.
pub type Snapshot = BTreeMap<String, f64>;

// ============================================================================
// Category
// ============================================================================

/// Operational status of a monitored asset.
///
/// One closed enumeration shared by every domain; each domain declares which
/// of these are actively simulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Producing,
    ShutIn,
    Drilling,
    Operational,
    Maintenance,
    EnRoute,
    Idle,
    Trading,
    Halted,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Producing,
        Category::ShutIn,
        Category::Drilling,
        Category::Operational,
        Category::Maintenance,
        Category::EnRoute,
        Category::Idle,
        Category::Trading,
        Category::Halted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Producing => "producing",
            Category::ShutIn => "shut-in",
            Category::Drilling => "drilling",
            Category::Operational => "operational",
            Category::Maintenance => "maintenance",
            Category::EnRoute => "en-route",
            Category::Idle => "idle",
            Category::Trading => "trading",
            Category::Halted => "halted",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}

// ============================================================================
// Entity
// ============================================================================

/// A monitored asset: well, truck, warehouse, refinery unit, ticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub category: Category,
    /// Free-text descriptive fields (location, operator, reservoir, sector...).
    pub attributes: BTreeMap<String, String>,
    pub metrics: Snapshot,
    /// Append-only alert log, oldest first.
    pub alerts: Vec<Alert>,
    pub last_maintenance: Option<NaiveDate>,
    pub last_updated: DateTime<Utc>,
}

impl Entity {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn open_alert_count(&self) -> usize {
        self.alerts.iter().filter(|a| !a.resolved).count()
    }

    pub fn alert(&self, alert_id: u64) -> Option<&Alert> {
        self.alerts.iter().find(|a| a.id == alert_id)
    }
}

/// Initial alert attached to an entity seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSeed {
    pub severity: Severity,
    pub message: String,
}

/// Declarative description of an entity, as found in configuration.
///
/// Metrics omitted here start at their definition's starting value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySeed {
    pub id: EntityId,
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    #[serde(default)]
    pub last_maintenance: Option<NaiveDate>,
    #[serde(default)]
    pub alerts: Vec<AlertSeed>,
}

impl EntitySeed {
    pub fn new(id: EntityId, name: impl Into<String>, category: Category) -> Self {
        Self {
            id,
            name: name.into(),
            category,
            attributes: BTreeMap::new(),
            metrics: BTreeMap::new(),
            last_maintenance: None,
            alerts: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_metric(mut self, name: &str, value: f64) -> Self {
        self.metrics.insert(name.to_string(), value);
        self
    }

    pub fn with_alert(mut self, severity: Severity, message: &str) -> Self {
        self.alerts.push(AlertSeed {
            severity,
            message: message.to_string(),
        });
        self
    }

    pub fn with_last_maintenance(mut self, date: NaiveDate) -> Self {
        self.last_maintenance = Some(date);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trips_through_str() {
        for c in Category::ALL {
            assert_eq!(c.as_str().parse::<Category>(), Ok(c));
        }
        assert_eq!("SHUT_IN".parse::<Category>(), Ok(Category::ShutIn));
        assert!("flying".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_serde_uses_kebab_case() {
        let json = serde_json::to_string(&Category::EnRoute).unwrap();
        assert_eq!(json, "\"en-route\"");
    }
}
