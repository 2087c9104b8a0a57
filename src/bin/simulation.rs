//! Headless Domain Simulation
//!
//! Runs the configured domains for a fixed number of ticks without the
//! server or clock, then prints the final entity reports. Tick progress and
//! raised alerts go to stderr; the export goes to stdout.
//!
//! # Usage
//! ```bash
//! ./simulation --ticks 100 --seed 42 --format csv > snapshot.csv
//! ./simulation --ticks 20 --domain wells --quiet | jq '.[].scores'
//! ```

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;

use petro_pulse::config::EngineConfig;
use petro_pulse::engine::Dashboard;
use petro_pulse::export::{self, ExportFormat};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "petro-pulse-simulation")]
#[command(about = "Headless PETRO-PULSE simulation with JSON/CSV export")]
#[command(version)]
struct Args {
    /// Number of ticks to run
    #[arg(short, long, default_value = "10")]
    ticks: u32,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Output format: json or csv
    #[arg(short, long, default_value = "json")]
    format: String,

    /// Export a single domain instead of all of them
    #[arg(short, long)]
    domain: Option<String>,

    /// Path to a TOML domain configuration (default: built-in domains)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Suppress the tick log (only output the export)
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let format: ExportFormat = args
        .format
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let mut cfg = match &args.config {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if args.seed.is_some() {
        cfg.simulation.seed = args.seed;
    }

    // Simulated time advances one tick period per step.
    let period = Duration::milliseconds(
        i64::try_from(cfg.simulation.tick_interval_ms).context("tick interval too large")?,
    );
    let mut now = Utc::now();
    let mut dashboard = Dashboard::from_config(&cfg, now).context("Failed to build dashboard")?;
    if let Some(name) = &args.domain {
        dashboard.domain(name)?;
    }

    info!(ticks = args.ticks, seed = ?cfg.simulation.seed, %format, "Simulation starting");
    let mut raised = 0usize;
    for _ in 0..args.ticks {
        now += period;
        let event = dashboard.tick(now);
        for a in &event.alerts {
            info!(
                generation = event.generation,
                domain = %a.domain,
                entity = %a.entity,
                severity = %a.alert.severity,
                "{}",
                a.alert.message
            );
        }
        raised += event.alerts.len();
    }
    info!(generation = dashboard.generation(), alerts = raised, "Simulation complete");

    let reports = dashboard.reports(args.domain.as_deref(), now)?;
    let body = export::render(&reports, format)?;

    let mut out = io::stdout().lock();
    out.write_all(body.as_bytes())?;
    if !body.ends_with('\n') {
        writeln!(out)?;
    }
    Ok(())
}
