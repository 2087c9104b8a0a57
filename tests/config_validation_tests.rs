//! Config Validation Tests
//!
//! Typo detection, file loading and consistency checks of the TOML
//! configuration layer, exercised independently of the engine.

use std::io::Write;

use petro_pulse::config::validation::{known_config_keys, suggest_correction, validate_unknown_keys};
use petro_pulse::config::{ConfigError, EngineConfig};
use petro_pulse::engine::Dashboard;

const PUMPS: &str = r#"
[simulation]
tick_interval_ms = 1000
seed = 42

[[domains]]
name = "pumps"
title = "Pump Station"
live_categories = ["operational"]

[domains.metrics.vibration]
min = 0.0
max = 10.0
max_delta = 0.5
initial = 2.0
unit = "mm/s"

[[domains.scores]]
name = "health"

[[domains.scores.terms]]
metric = "vibration"
weight = 1.0
range = { lo = 0.0, hi = 10.0 }
shape = { kind = "falling" }

[[domains.thresholds]]
id = "vibration_high"
metric = "vibration"
condition = "above"
threshold = 6.0
severity = "high"
message = "Vibration on {entity} above {threshold} mm/s"

[[domains.entities]]
id = 1
name = "P-101"
category = "operational"
attributes = { location = "North bay" }
metrics = { vibration = 3.5 }
"#;

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_simulation_key_warns_with_suggestion() {
    let warnings = validate_unknown_keys("[simulation]\ntick_intervl_ms = 100\n");
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert_eq!(warnings[0].field, "simulation.tick_intervl_ms");
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("simulation.tick_interval_ms")
    );
}

#[test]
fn typo_inside_named_metric_is_suggested_with_the_name() {
    let toml_str = r#"
[[domains]]
name = "pumps"
live_categories = []
[domains.metrics.vibration]
min = 0.0
max = 10.0
max_detla = 0.5
initial = 2.0
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "{warnings:?}");
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("domains[].metrics.vibration.max_delta")
    );
}

#[test]
fn valid_document_produces_no_warnings() {
    assert!(validate_unknown_keys(PUMPS).is_empty());
}

#[test]
fn unrelated_key_gets_no_suggestion() {
    let known = known_config_keys();
    assert!(suggest_correction("completely_unrelated_setting", &known).is_none());
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn custom_domain_loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(PUMPS.as_bytes()).unwrap();

    let config = EngineConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config.simulation.seed, Some(42));
    assert_eq!(config.domains.len(), 1);
    assert_eq!(config.domains[0].entities[0].name, "P-101");

    let dashboard = Dashboard::from_config(&config, chrono::Utc::now()).unwrap();
    let pumps = dashboard.domain("pumps").unwrap();
    // Falling shape: 1 - 3.5 / 10
    assert!((pumps.score(1, "health").unwrap() - 65.0).abs() < 1e-9);
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = EngineConfig::load_from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(..)));
}

#[test]
fn malformed_toml_is_parse_error_with_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"[simulation\ntick_interval_ms = 1").unwrap();

    match EngineConfig::load_from_file(file.path()) {
        Err(ConfigError::Parse(path, _)) => assert_eq!(path, file.path()),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn saved_config_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("petro_pulse.toml");
    EngineConfig::default().save_to_file(&path).unwrap();

    let back = EngineConfig::load_from_file(&path).unwrap();
    let names: Vec<&str> = back.domains.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["wells", "logistics", "refining", "markets", "field"]);
}

// ============================================================================
// Consistency
// ============================================================================

#[test]
fn undeclared_metric_in_rule_is_reported() {
    let broken = PUMPS.replace("metric = \"vibration\"\ncondition", "metric = \"vibraton\"\ncondition");
    match EngineConfig::from_toml_str(&broken) {
        Err(ConfigError::Validation(errors)) => {
            assert_eq!(errors.len(), 1, "{errors:?}");
            assert!(errors[0].contains("vibraton"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn inverted_bounds_and_zero_tick_are_both_reported() {
    let broken = PUMPS
        .replace("tick_interval_ms = 1000", "tick_interval_ms = 0")
        .replace("max = 10.0\nmax_delta", "max = -1.0\nmax_delta");
    match EngineConfig::from_toml_str(&broken) {
        Err(ConfigError::Validation(errors)) => {
            assert!(errors.len() >= 2, "{errors:?}");
            assert!(errors.iter().any(|e| e.contains("tick_interval_ms")));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn maintenance_lead_beyond_ten_years_is_refused() {
    let broken = format!(
        "{PUMPS}\n[domains.maintenance]\nscore = \"health\"\nscore_below = 80.0\nmax_days_since = 180\nlead_days = 100000000\n"
    );
    match EngineConfig::from_toml_str(&broken) {
        Err(ConfigError::Validation(errors)) => {
            assert_eq!(errors.len(), 1, "{errors:?}");
            assert!(errors[0].contains("lead_days"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    // Registration refuses it too, before any report is built.
    let mut config = EngineConfig::default();
    if let Some(policy) = config.domains[1].maintenance.as_mut() {
        policy.lead_days = 100_000_000;
    }
    assert!(Dashboard::from_config(&config, chrono::Utc::now()).is_err());
}
