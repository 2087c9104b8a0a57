//! Filter/sort query for entity views.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(&self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(c) => *c == category,
        }
    }
}

impl TryFrom<String> for CategoryFilter {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s.trim().is_empty() || s.eq_ignore_ascii_case("all") {
            Ok(CategoryFilter::All)
        } else {
            s.parse().map(CategoryFilter::Only)
        }
    }
}

impl From<CategoryFilter> for String {
    fn from(f: CategoryFilter) -> Self {
        match f {
            CategoryFilter::All => "all".to_string(),
            CategoryFilter::Only(c) => c.as_str().to_string(),
        }
    }
}

/// Sort key. `Field` resolves against scores, then metrics, then attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SortKey {
    Id,
    Name,
    Category,
    OpenAlerts,
    Field(String),
}

impl From<String> for SortKey {
    fn from(s: String) -> Self {
        match s.as_str() {
            "id" => SortKey::Id,
            "name" => SortKey::Name,
            "category" | "status" => SortKey::Category,
            "open_alerts" | "alerts" => SortKey::OpenAlerts,
            _ => SortKey::Field(s),
        }
    }
}

impl From<&str> for SortKey {
    fn from(s: &str) -> Self {
        SortKey::from(s.to_string())
    }
}

impl From<SortKey> for String {
    fn from(k: SortKey) -> Self {
        k.to_string()
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::Id => f.write_str("id"),
            SortKey::Name => f.write_str("name"),
            SortKey::Category => f.write_str("category"),
            SortKey::OpenAlerts => f.write_str("open_alerts"),
            SortKey::Field(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "asc", alias = "ascending")]
    Ascending,
    #[serde(rename = "desc", alias = "descending")]
    Descending,
}

/// Transient query over an entity collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewSpec {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub category: CategoryFilter,
    /// `None` keeps collection order.
    #[serde(default)]
    pub sort: Option<SortKey>,
    #[serde(default)]
    pub direction: SortDirection,
    /// Exact-match attribute filters (e.g. `type = truck`, `sector = Energy`).
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl ViewSpec {
    pub fn search(mut self, text: &str) -> Self {
        self.search = text.to_string();
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = CategoryFilter::Only(category);
        self
    }

    pub fn sort_by(mut self, key: impl Into<SortKey>, direction: SortDirection) -> Self {
        self.sort = Some(key.into());
        self.direction = direction;
        self
    }

    pub fn attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }
}
