//! Engine Configuration Module
//!
//! Domains, metric bounds, score weights and threshold rules loaded from
//! TOML, with the five built-in domains as the fallback.
//!
//! ## Loading Order
//!
//! 1. `PETRO_PULSE_CONFIG` environment variable (path to TOML file)
//! 2. `petro_pulse.toml` in the current working directory
//! 3. Built-in presets (wells, logistics, refining, markets)
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! // In main():
//! config::init(EngineConfig::load());
//!
//! // Anywhere in the codebase:
//! if let Some(cfg) = config::get() {
//!     let period = cfg.simulation.tick_interval_ms;
//! }
//! ```

mod engine_config;
pub mod defaults;
pub mod presets;
pub mod validation;

pub use engine_config::*;

use std::sync::OnceLock;

/// Global engine configuration, initialized once at startup.
static ENGINE_CONFIG: OnceLock<EngineConfig> = OnceLock::new();

/// Initialize the global engine configuration.
///
/// Later calls are ignored with a warning.
pub fn init(config: EngineConfig) {
    if ENGINE_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// Get the global engine configuration, if `init()` has been called.
pub fn get() -> Option<&'static EngineConfig> {
    ENGINE_CONFIG.get()
}

/// Check whether the config has been initialized.
pub fn is_initialized() -> bool {
    ENGINE_CONFIG.get().is_some()
}
