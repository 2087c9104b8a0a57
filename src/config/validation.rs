//! Config validation: unknown-key detection with Levenshtein suggestions.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.
//!
//! Key paths mark array elements with `[]` (`domains[].entities[].name`).
//! Known patterns use `*` for user-chosen map keys such as metric names.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid key patterns for EngineConfig.
///
/// This is maintained manually to match the struct hierarchy in
/// engine_config.rs and the types it embeds.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [server]
        "server",
        "server.addr",
        // [simulation]
        "simulation",
        "simulation.tick_interval_ms",
        "simulation.seed",
        "simulation.history_capacity",
        "simulation.activity_log_capacity",
        "simulation.autostart",
        // [[domains]]
        "domains",
        "domains[].name",
        "domains[].title",
        "domains[].live_categories",
        "domains[].search_fields",
        // [domains.noise]
        "domains[].noise",
        "domains[].noise.enabled",
        "domains[].noise.probability",
        "domains[].noise.messages",
        // [domains.metrics.<name>]
        "domains[].metrics",
        "domains[].metrics.*",
        "domains[].metrics.*.min",
        "domains[].metrics.*.max",
        "domains[].metrics.*.max_delta",
        "domains[].metrics.*.initial",
        "domains[].metrics.*.integral",
        "domains[].metrics.*.unit",
        // [domains.maintenance]
        "domains[].maintenance",
        "domains[].maintenance.score",
        "domains[].maintenance.score_below",
        "domains[].maintenance.max_days_since",
        "domains[].maintenance.lead_days",
        // [[domains.scores]]
        "domains[].scores",
        "domains[].scores[].name",
        "domains[].scores[].terms",
        "domains[].scores[].terms[].metric",
        "domains[].scores[].terms[].weight",
        "domains[].scores[].terms[].range",
        "domains[].scores[].terms[].range.lo",
        "domains[].scores[].terms[].range.hi",
        "domains[].scores[].terms[].shape",
        "domains[].scores[].terms[].shape.kind",
        "domains[].scores[].terms[].shape.ideal",
        "domains[].scores[].alert_factor",
        "domains[].scores[].alert_factor.weight",
        "domains[].scores[].alert_factor.open_factor",
        // [[domains.thresholds]]
        "domains[].thresholds",
        "domains[].thresholds[].id",
        "domains[].thresholds[].metric",
        "domains[].thresholds[].condition",
        "domains[].thresholds[].threshold",
        "domains[].thresholds[].severity",
        "domains[].thresholds[].message",
        // [[domains.setpoints]]
        "domains[].setpoints",
        "domains[].setpoints[].metric",
        "domains[].setpoints[].step",
        "domains[].setpoints[].min",
        "domains[].setpoints[].max",
        "domains[].setpoints[].decrease_when",
        "domains[].setpoints[].decrease_when[].metric",
        "domains[].setpoints[].decrease_when[].condition",
        "domains[].setpoints[].decrease_when[].value",
        "domains[].setpoints[].increase_when",
        "domains[].setpoints[].increase_when[].metric",
        "domains[].setpoints[].increase_when[].condition",
        "domains[].setpoints[].increase_when[].value",
        // [[domains.entities]]
        "domains[].entities",
        "domains[].entities[].id",
        "domains[].entities[].name",
        "domains[].entities[].category",
        "domains[].entities[].attributes",
        "domains[].entities[].attributes.*",
        "domains[].entities[].metrics",
        "domains[].entities[].metrics.*",
        "domains[].entities[].last_maintenance",
        "domains[].entities[].alerts",
        "domains[].entities[].alerts[].severity",
        "domains[].entities[].alerts[].message",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1 }, c = [{ d = 2 }] }` yields:
/// `["a", "a.b", "c", "c[].d"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            match v {
                toml::Value::Table(_) => keys.extend(walk_toml_keys(v, &path)),
                toml::Value::Array(items) => {
                    let element = format!("{path}[]");
                    for item in items.iter().filter(|i| i.is_table()) {
                        keys.extend(walk_toml_keys(item, &element));
                    }
                }
                _ => {}
            }
        }
    }
    keys
}

/// Whether a concrete key path matches a known pattern.
fn matches_pattern(pattern: &str, key: &str) -> bool {
    let p: Vec<&str> = pattern.split('.').collect();
    let k: Vec<&str> = key.split('.').collect();
    p.len() == k.len() && p.iter().zip(&k).all(|(p, k)| *p == "*" || p == k)
}

/// Fill a pattern's `*` segments from the key, so suggestions read like the
/// user's own path.
fn instantiate(pattern: &str, key: &str) -> String {
    let k: Vec<&str> = key.split('.').collect();
    pattern
        .split('.')
        .enumerate()
        .map(|(i, seg)| match (seg, k.get(i)) {
            ("*", Some(actual)) => *actual,
            _ => seg,
        })
        .collect::<Vec<_>>()
        .join(".")
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let b_len = b_chars.len();
    if a.is_empty() {
        return b_len;
    }
    if b_len == 0 {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1)
                .min(curr[j] + 1)
                .min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    let mut best: Option<(String, usize)> = None;
    for &pattern in known {
        let candidate = instantiate(pattern, unknown);
        let dist = levenshtein(unknown, &candidate);
        if dist <= 3 && best.as_ref().map_or(true, |(_, d)| dist < *d) {
            best = Some((candidate, dist));
        }
    }
    best.map(|(k, _)| k)
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys; it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    let found = walk_toml_keys(&value, "");
    let mut warnings = Vec::new();

    for key in &found {
        if !known.iter().any(|pattern| matches_pattern(pattern, key)) {
            let suggestion = suggest_correction(key, &known);
            let message = format!("Unknown config key '{key}'");
            warnings.push(ValidationWarning {
                field: key.clone(),
                message,
                suggestion,
            });
        }
    }

    warnings
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("hello", "hello"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("max_detla", "max_delta"), 2);
        assert_eq!(levenshtein("intial", "initial"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_marks_array_elements() {
        let toml: toml::Value = r#"
            [[domains]]
            name = "wells"
            [domains.metrics.oil]
            min = 0.0
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"domains".to_string()));
        assert!(keys.contains(&"domains[].name".to_string()));
        assert!(keys.contains(&"domains[].metrics.oil".to_string()));
        assert!(keys.contains(&"domains[].metrics.oil.min".to_string()));
    }

    #[test]
    fn test_wildcard_metric_names_are_known() {
        let toml_str = r#"
[simulation]
tick_interval_ms = 1000

[[domains]]
name = "wells"
live_categories = ["producing"]

[domains.metrics.water_cut]
min = 0.0
max = 30.0
max_delta = 0.5
initial = 15.0

[[domains.entities]]
id = 1
name = "ALPHA-1"
category = "producing"
attributes = { location = "A-12" }
metrics = { water_cut = 15.0 }
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert!(warnings.is_empty(), "Expected 0 warnings, got: {:?}", warnings);
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let toml_str = r#"
[[domains]]
name = "wells"
[domains.metrics.oil]
max_detla = 25.0
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "domains[].metrics.oil.max_detla");
        assert_eq!(
            warnings[0].suggestion.as_deref(),
            Some("domains[].metrics.oil.max_delta")
        );
    }

    #[test]
    fn test_unknown_section_produces_warning() {
        let toml_str = r#"
[simulaton]
seed = 42
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert!(warnings.iter().any(|w| w.field == "simulaton"));
        assert!(warnings
            .iter()
            .any(|w| w.suggestion.as_deref() == Some("simulation.seed")));
    }

    #[test]
    fn test_suggest_correction_no_match_for_garbage() {
        let known = known_config_keys();
        let suggestion = suggest_correction("completely_unrelated_garbage_key_xyz", &known);
        assert!(suggestion.is_none());
    }

    #[test]
    fn test_known_keys_covers_all_sections() {
        let known = known_config_keys();
        assert!(known.contains("server"));
        assert!(known.contains("simulation"));
        assert!(known.contains("domains"));
        assert!(known.contains("domains[].thresholds[].condition"));
        assert!(known.contains("domains[].entities[].alerts[].message"));
    }
}
