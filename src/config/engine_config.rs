//! Engine Configuration - domains, metric bounds, scores and rules as TOML
//!
//! Every domain of the dashboard is described here: which categories are
//! simulated, how each metric walks, how scores weigh metrics, and when
//! alerts fire. With no file present the built-in presets are used.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::{defaults, presets};
use crate::alerts::NoiseConfig;
use crate::error::EngineError;
use crate::types::{
    Category, EntitySeed, MaintenancePolicy, MetricDefinition, ScoreDefinition, SetpointRule,
    ThresholdRule,
};

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration.
///
/// Load with `EngineConfig::load()` which searches:
/// 1. `$PETRO_PULSE_CONFIG` env var
/// 2. `./petro_pulse.toml`
/// 3. Built-in presets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Clock and log sizing
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Simulated domains, in display order
    #[serde(default = "presets::all")]
    pub domains: Vec<DomainConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            simulation: SimulationConfig::default(),
            domains: presets::all(),
        }
    }
}

impl EngineConfig {
    /// Load configuration using the standard search order:
    /// 1. `$PETRO_PULSE_CONFIG` environment variable
    /// 2. `./petro_pulse.toml` in the current working directory
    /// 3. Built-in presets
    pub fn load() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), domains = config.domains.len(), "Loaded config from PETRO_PULSE_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from PETRO_PULSE_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "PETRO_PULSE_CONFIG points to non-existent file, falling back");
            }
        }

        // 2. Check ./petro_pulse.toml
        let local = PathBuf::from(defaults::CONFIG_FILE_NAME);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(domains = config.domains.len(), "Loaded config from ./petro_pulse.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./petro_pulse.toml, using presets");
                }
            }
        }

        // 3. Presets
        info!("No petro_pulse.toml found, using built-in domains");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, err) => ConfigError::Parse(path.to_path_buf(), err),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        // Two-pass: check for unknown keys first (warnings only)
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Save config to a file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Validate every domain for internal consistency, collecting all problems.
    ///
    /// Rules:
    /// - Tick interval must be positive and the server address must parse
    /// - Domain names and, within a domain, entity ids must be unique
    /// - Metric bounds must satisfy min <= max with the start inside them
    /// - Scores, rules, setpoints and seeds may only name declared metrics
    /// - Maintenance lead time must lie within ten years, the overdue window
    ///   cannot be negative
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if self.simulation.tick_interval_ms == 0 {
            errors.push("simulation.tick_interval_ms must be > 0".to_string());
        }
        if self.server.addr.parse::<SocketAddr>().is_err() {
            errors.push(format!("server.addr '{}' is not a valid socket address", self.server.addr));
        }
        if self.domains.is_empty() {
            errors.push("at least one domain must be configured".to_string());
        }

        let mut names = HashSet::new();
        for domain in &self.domains {
            if domain.name.trim().is_empty() {
                errors.push("domain name cannot be empty".to_string());
            } else if !names.insert(domain.name.as_str()) {
                errors.push(format!("duplicate domain '{}'", domain.name));
            }
            errors.extend(domain.problems());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Domain Config
// ============================================================================

/// One simulated domain and its entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainConfig {
    pub name: String,

    #[serde(default)]
    pub title: String,

    /// Categories advanced by the clock; others keep their last values.
    pub live_categories: Vec<Category>,

    /// Attributes matched by free-text search besides the name.
    #[serde(default = "default_search_fields")]
    pub search_fields: Vec<String>,

    #[serde(default)]
    pub noise: NoiseConfig,

    pub metrics: BTreeMap<String, MetricDefinition>,

    #[serde(default)]
    pub maintenance: Option<MaintenancePolicy>,

    #[serde(default)]
    pub scores: Vec<ScoreDefinition>,

    #[serde(default)]
    pub thresholds: Vec<ThresholdRule>,

    #[serde(default)]
    pub setpoints: Vec<SetpointRule>,

    #[serde(default)]
    pub entities: Vec<EntitySeed>,
}

/// Message of a setup error without the error-kind prefix.
fn detail(e: EngineError) -> String {
    match e {
        EngineError::InvalidConfiguration(msg) => msg,
        other => other.to_string(),
    }
}

fn default_search_fields() -> Vec<String> {
    crate::view::default_search_fields()
}

impl DomainConfig {
    /// Every consistency problem of this domain, one message each.
    pub fn problems(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let d = &self.name;

        for (name, def) in &self.metrics {
            if let Err(e) = def.validate(name) {
                errors.push(format!("{d}: {}", detail(e)));
            }
        }

        let mut score_names = HashSet::new();
        for score in &self.scores {
            if let Err(e) = score.validate(&self.metrics) {
                errors.push(format!("{d}: {}", detail(e)));
            }
            if !score_names.insert(score.name.as_str()) {
                errors.push(format!("{d}: duplicate score '{}'", score.name));
            }
        }

        let mut rule_ids = HashSet::new();
        for rule in &self.thresholds {
            if !self.metrics.contains_key(&rule.metric) {
                errors.push(format!(
                    "{d}: rule '{}' references undeclared metric '{}'",
                    rule.id, rule.metric
                ));
            }
            if !rule.threshold.is_finite() {
                errors.push(format!("{d}: rule '{}' has a non-finite threshold", rule.id));
            }
            if !rule_ids.insert(rule.id.as_str()) {
                errors.push(format!("{d}: duplicate rule '{}'", rule.id));
            }
        }

        for sp in &self.setpoints {
            let named = std::iter::once(&sp.metric).chain(
                sp.decrease_when
                    .iter()
                    .chain(&sp.increase_when)
                    .map(|c| &c.metric),
            );
            for metric in named {
                if !self.metrics.contains_key(metric) {
                    errors.push(format!(
                        "{d}: setpoint '{}' references undeclared metric '{metric}'",
                        sp.metric
                    ));
                }
            }
            if !sp.step.is_finite() || sp.step <= 0.0 || sp.min > sp.max {
                errors.push(format!(
                    "{d}: setpoint '{}' needs step > 0 and min <= max",
                    sp.metric
                ));
            }
        }

        if let Some(policy) = &self.maintenance {
            if !score_names.contains(policy.score.as_str()) {
                errors.push(format!(
                    "{d}: maintenance policy references undeclared score '{}'",
                    policy.score
                ));
            }
            if !(0..=defaults::MAX_MAINTENANCE_LEAD_DAYS).contains(&policy.lead_days) {
                errors.push(format!(
                    "{d}: maintenance.lead_days {} must be within [0, {}]",
                    policy.lead_days,
                    defaults::MAX_MAINTENANCE_LEAD_DAYS
                ));
            }
            if policy.max_days_since < 0 {
                errors.push(format!(
                    "{d}: maintenance.max_days_since {} cannot be negative",
                    policy.max_days_since
                ));
            }
            if !policy.score_below.is_finite() {
                errors.push(format!("{d}: maintenance.score_below must be finite"));
            }
        }

        if !(0.0..=1.0).contains(&self.noise.probability) {
            errors.push(format!(
                "{d}: noise.probability {} must be within [0, 1]",
                self.noise.probability
            ));
        }

        let mut ids = HashSet::new();
        for seed in &self.entities {
            if !ids.insert(seed.id) {
                errors.push(format!("{d}: duplicate entity id {}", seed.id));
            }
            for (metric, value) in &seed.metrics {
                if !self.metrics.contains_key(metric) {
                    errors.push(format!(
                        "{d}: entity '{}' sets undeclared metric '{metric}'",
                        seed.name
                    ));
                } else if !value.is_finite() {
                    errors.push(format!(
                        "{d}: entity '{}' has non-finite {metric}",
                        seed.name
                    ));
                }
            }
        }
        errors
    }
}

// ============================================================================
// Simulation Config
// ============================================================================

/// Clock cadence, reproducibility and log sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Tick period in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Seed for the random walk; entropy when unset.
    #[serde(default)]
    pub seed: Option<u64>,

    /// History points kept per entity.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Operator actions kept per domain.
    #[serde(default = "default_activity_log_capacity")]
    pub activity_log_capacity: usize,

    /// Start the clock as soon as the server is up.
    #[serde(default = "default_autostart")]
    pub autostart: bool,
}

fn default_tick_interval_ms() -> u64 {
    defaults::TICK_INTERVAL_MS
}

fn default_history_capacity() -> usize {
    defaults::HISTORY_CAPACITY
}

fn default_activity_log_capacity() -> usize {
    defaults::ACTIVITY_LOG_CAPACITY
}

fn default_autostart() -> bool {
    true
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            seed: None,
            history_capacity: default_history_capacity(),
            activity_log_capacity: default_activity_log_capacity(),
            autostart: default_autostart(),
        }
    }
}

// ============================================================================
// Server Config
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server bind address.
    ///
    /// Can be overridden by `PETRO_PULSE_ADDR` env var or `--addr` CLI flag.
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

fn default_server_addr() -> String {
    defaults::SERVER_ADDR.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok(), "{:?}", config.validate());
        assert_eq!(config.domains.len(), 5);
        assert_eq!(config.simulation.tick_interval_ms, 3_000);
    }

    #[test]
    fn test_toml_round_trip_preserves_domains() {
        let config = EngineConfig::default();
        let toml_str = config.to_toml().unwrap();
        let back = EngineConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(back.domains.len(), config.domains.len());
        assert_eq!(back.domains[0].entities.len(), config.domains[0].entities.len());
    }

    #[test]
    fn test_empty_document_uses_presets() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config.domains.len(), 5);
        assert!(config.simulation.autostart);
    }

    #[test]
    fn test_validation_collects_every_problem() {
        let mut config = EngineConfig::default();
        config.simulation.tick_interval_ms = 0;
        config.domains[0]
            .metrics
            .insert("broken".to_string(), MetricDefinition::new(10.0, 1.0, 0.1, 5.0));
        config.domains[1].scores.push(ScoreDefinition::new("empty", Vec::new()));
        match config.validate() {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 3, "{errors:?}"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_maintenance_window_is_bounded() {
        let mut config = EngineConfig::default();
        let logistics = &mut config.domains[1];
        if let Some(policy) = logistics.maintenance.as_mut() {
            policy.lead_days = 100_000_000;
            policy.max_days_since = -1;
        }
        match config.validate() {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors.len(), 2, "{errors:?}");
                assert!(errors[0].contains("maintenance.lead_days"));
                assert!(errors[1].contains("maintenance.max_days_since"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_domain_is_rejected() {
        let mut config = EngineConfig::default();
        let dup = config.domains[0].clone();
        config.domains.push(dup);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate domain"));
    }
}
