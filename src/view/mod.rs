//! Entity Collection Filter/Sort
//!
//! `view` retains records matching the category filter, the attribute
//! filters and the search text, then stable-sorts them by the requested key.
//! Records lacking the sort field always go last, whichever the direction.

use std::cmp::Ordering;

use crate::types::{Category, Entity, EntityId, SortDirection, SortKey, ViewSpec};

/// A sortable field value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SortValue<'a> {
    Number(f64),
    Text(&'a str),
}

impl SortValue<'_> {
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortValue::Number(a), SortValue::Number(b)) => a.total_cmp(b),
            (SortValue::Text(a), SortValue::Text(b)) => compare_text(a, b),
            (SortValue::Number(_), SortValue::Text(_)) => Ordering::Less,
            (SortValue::Text(_), SortValue::Number(_)) => Ordering::Greater,
        }
    }
}

/// Case-insensitive first, then byte order so the result is total.
fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Anything a view can filter and sort.
pub trait ViewRecord {
    fn id(&self) -> EntityId;
    fn name(&self) -> &str;
    fn category(&self) -> Category;
    fn attribute(&self, key: &str) -> Option<&str>;
    fn open_alerts(&self) -> usize;
    /// Named field for `SortKey::Field`: scores, then metrics, then attributes.
    fn field(&self, name: &str) -> Option<SortValue<'_>>;
}

impl ViewRecord for Entity {
    fn id(&self) -> EntityId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> Category {
        self.category
    }

    fn attribute(&self, key: &str) -> Option<&str> {
        Entity::attribute(self, key)
    }

    fn open_alerts(&self) -> usize {
        self.open_alert_count()
    }

    fn field(&self, name: &str) -> Option<SortValue<'_>> {
        self.metrics
            .get(name)
            .map(|v| SortValue::Number(*v))
            .or_else(|| Entity::attribute(self, name).map(SortValue::Text))
    }
}

fn sort_value<'a, T: ViewRecord>(record: &'a T, key: &SortKey) -> Option<SortValue<'a>> {
    match key {
        SortKey::Id => Some(SortValue::Number(f64::from(record.id()))),
        SortKey::Name => Some(SortValue::Text(record.name())),
        SortKey::Category => Some(SortValue::Text(record.category().as_str())),
        SortKey::OpenAlerts => Some(SortValue::Number(record.open_alerts() as f64)),
        SortKey::Field(name) => record.field(name),
    }
}

/// Whether `record` passes the category, attribute and search filters.
///
/// The search text is matched as given, ignoring case only. Blank text
/// (empty or whitespace) matches every record.
pub fn matches<T: ViewRecord>(record: &T, spec: &ViewSpec, search_fields: &[String]) -> bool {
    if !spec.category.matches(record.category()) {
        return false;
    }
    let attributes_ok = spec
        .attributes
        .iter()
        .all(|(k, v)| record.attribute(k).is_some_and(|a| a.eq_ignore_ascii_case(v)));
    if !attributes_ok {
        return false;
    }

    if spec.search.trim().is_empty() {
        return true;
    }
    let needle = spec.search.to_lowercase();
    record.name().to_lowercase().contains(&needle)
        || search_fields
            .iter()
            .filter_map(|f| record.attribute(f))
            .any(|v| v.to_lowercase().contains(&needle))
}

/// Filter then stable-sort `items`. Ties keep collection order.
pub fn view<'a, T: ViewRecord>(items: &'a [T], spec: &ViewSpec, search_fields: &[String]) -> Vec<&'a T> {
    let mut out: Vec<&T> = items
        .iter()
        .filter(|r| matches(*r, spec, search_fields))
        .collect();

    if let Some(key) = &spec.sort {
        out.sort_by(|a, b| {
            match (sort_value(*a, key), sort_value(*b, key)) {
                (Some(x), Some(y)) => match spec.direction {
                    SortDirection::Ascending => x.compare(&y),
                    SortDirection::Descending => x.compare(&y).reverse(),
                },
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        });
    }
    out
}

/// Default free-text fields searched besides the name.
pub fn default_search_fields() -> Vec<String> {
    vec!["location".to_string(), "operator".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn entity(id: EntityId, name: &str, category: Category, location: &str, oil: f64) -> Entity {
        let mut attributes = BTreeMap::new();
        attributes.insert("location".to_string(), location.to_string());
        let mut metrics = BTreeMap::new();
        metrics.insert("oil".to_string(), oil);
        Entity {
            id,
            name: name.to_string(),
            category,
            attributes,
            metrics,
            alerts: Vec::new(),
            last_maintenance: None,
            last_updated: Utc::now(),
        }
    }

    fn wells() -> Vec<Entity> {
        vec![
            entity(1, "ALPHA-1", Category::Producing, "A-12", 4200.0),
            entity(2, "BRAVO-3", Category::Producing, "B-07", 3800.0),
            entity(3, "CHARLIE-7", Category::ShutIn, "C-03", 0.0),
        ]
    }

    fn names(v: &[&Entity]) -> Vec<String> {
        v.iter().map(|e| e.name.clone()).collect()
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let items = wells();
        let spec = ViewSpec::default().search("alpha");
        assert_eq!(names(&view(&items, &spec, &default_search_fields())), ["ALPHA-1"]);
    }

    #[test]
    fn test_search_keeps_surrounding_whitespace() {
        let items = wells();
        let spec = ViewSpec::default().search(" alpha");
        assert!(view(&items, &spec, &default_search_fields()).is_empty());

        let blank = ViewSpec::default().search("   ");
        assert_eq!(view(&items, &blank, &default_search_fields()).len(), 3);
    }

    #[test]
    fn test_search_covers_location() {
        let items = wells();
        let spec = ViewSpec::default().search("b-07");
        assert_eq!(names(&view(&items, &spec, &default_search_fields())), ["BRAVO-3"]);
    }

    #[test]
    fn test_category_filter() {
        let items = wells();
        let spec = ViewSpec::default().category(Category::ShutIn);
        assert_eq!(names(&view(&items, &spec, &[])), ["CHARLIE-7"]);
    }

    #[test]
    fn test_numeric_sort_descending() {
        let items = wells();
        let spec = ViewSpec::default().sort_by("oil", SortDirection::Descending);
        assert_eq!(
            names(&view(&items, &spec, &[])),
            ["ALPHA-1", "BRAVO-3", "CHARLIE-7"]
        );
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        let items = vec![
            entity(1, "A", Category::Producing, "x", 10.0),
            entity(2, "B", Category::Producing, "x", 10.0),
            entity(3, "C", Category::Producing, "x", 5.0),
        ];
        let asc = ViewSpec::default().sort_by("oil", SortDirection::Ascending);
        assert_eq!(names(&view(&items, &asc, &[])), ["C", "A", "B"]);
        let desc = ViewSpec::default().sort_by("oil", SortDirection::Descending);
        assert_eq!(names(&view(&items, &desc, &[])), ["A", "B", "C"]);
    }

    #[test]
    fn test_missing_field_sorts_last_both_directions() {
        let items = wells();
        for dir in [SortDirection::Ascending, SortDirection::Descending] {
            let spec = ViewSpec::default().sort_by("pressure", dir);
            assert_eq!(names(&view(&items, &spec, &[])).len(), 3);
        }
        let mut items = wells();
        items[0].metrics.remove("oil");
        let spec = ViewSpec::default().sort_by("oil", SortDirection::Ascending);
        assert_eq!(names(&view(&items, &spec, &[])).last().map(String::as_str), Some("ALPHA-1"));
    }

    #[test]
    fn test_attribute_filter() {
        let items = wells();
        let spec = ViewSpec::default().attribute("location", "c-03");
        assert_eq!(names(&view(&items, &spec, &[])), ["CHARLIE-7"]);
    }
}
