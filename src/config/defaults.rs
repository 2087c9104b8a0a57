//! System-wide default constants.
//!
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Simulation Clock
// ============================================================================

/// Tick period of the simulation clock (milliseconds).
pub const TICK_INTERVAL_MS: u64 = 3_000;

/// Capacity of the tick-event broadcast channel. Slow subscribers that fall
/// further behind than this skip events.
pub const TICK_EVENT_CHANNEL_CAPACITY: usize = 64;

// ============================================================================
// Engine Logs
// ============================================================================

/// History points kept per entity (30 ticks = 90 s at the default period).
pub const HISTORY_CAPACITY: usize = 30;

/// Operator actions kept per domain.
pub const ACTIVITY_LOG_CAPACITY: usize = 1_000;

/// Default `limit` for the activity endpoint.
pub const ACTIVITY_PAGE_SIZE: usize = 50;

// ============================================================================
// Recommendations
// ============================================================================

/// Longest accepted maintenance lead time (ten years).
pub const MAX_MAINTENANCE_LEAD_DAYS: i64 = 3_650;

// ============================================================================
// Server
// ============================================================================

/// HTTP server bind address.
pub const SERVER_ADDR: &str = "0.0.0.0:8080";

/// Largest request body accepted by the API (bytes).
pub const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

// ============================================================================
// Configuration
// ============================================================================

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV_VAR: &str = "PETRO_PULSE_CONFIG";

/// Configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "petro_pulse.toml";
