//! PETRO-PULSE - Petroleum operations dashboard server
//!
//! Builds every configured domain, starts the simulation clock and serves
//! the REST API and tick event stream.
//!
//! # Usage
//!
//! ```bash
//! # Built-in domains, random seed, 3 s ticks
//! cargo run --release
//!
//! # Reproducible run at a faster cadence
//! cargo run --release -- --seed 42 --interval-ms 500
//!
//! # Custom domains from TOML
//! cargo run --release -- --config ./petro_pulse.toml
//! ```
//!
//! # Environment Variables
//!
//! - `PETRO_PULSE_CONFIG`: Path to the domain configuration file
//! - `PETRO_PULSE_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `PETRO_PULSE_CORS_ORIGINS`: Comma-separated allowed origins
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use petro_pulse::api::{create_app, DashboardState};
use petro_pulse::clock::SimulationClock;
use petro_pulse::config::{self, EngineConfig};
use petro_pulse::engine::Dashboard;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "petro-pulse")]
#[command(about = "Petroleum operations metric simulation and alerting server")]
#[command(version)]
struct CliArgs {
    /// Override the server address (default from config: "0.0.0.0:8080")
    #[arg(short, long, env = "PETRO_PULSE_ADDR")]
    addr: Option<String>,

    /// Path to a TOML domain configuration (skips the normal search order)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Random seed for a reproducible simulation
    #[arg(long)]
    seed: Option<u64>,

    /// Tick period in milliseconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    interval_ms: Option<u64>,

    /// Leave the clock stopped until POST /api/v1/clock/start
    #[arg(long)]
    no_autostart: bool,
}

/// Configuration file (or presets) with command-line overrides applied.
fn load_config(args: &CliArgs) -> Result<EngineConfig> {
    let mut cfg = match &args.config {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => EngineConfig::load(),
    };

    if let Some(addr) = &args.addr {
        cfg.server.addr = addr.clone();
    }
    if args.seed.is_some() {
        cfg.simulation.seed = args.seed;
    }
    if let Some(ms) = args.interval_ms {
        cfg.simulation.tick_interval_ms = ms;
    }
    if args.no_autostart {
        cfg.simulation.autostart = false;
    }

    cfg.validate().context("Invalid configuration")?;
    Ok(cfg)
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    config::init(load_config(&args)?);
    let cfg = config::get().context("Configuration was not initialized")?;

    let addr: SocketAddr = cfg
        .server
        .addr
        .parse()
        .with_context(|| format!("Invalid server address {}", cfg.server.addr))?;

    info!(
        domains = cfg.domains.len(),
        tick_ms = cfg.simulation.tick_interval_ms,
        seed = ?cfg.simulation.seed,
        "PETRO-PULSE starting"
    );

    let dashboard = Dashboard::from_config(cfg, Utc::now())
        .context("Failed to build dashboard")?
        .into_shared();
    let mut clock = SimulationClock::new(
        dashboard.clone(),
        Duration::from_millis(cfg.simulation.tick_interval_ms),
    );
    if cfg.simulation.autostart {
        clock.start();
    } else {
        info!("[Clock] Autostart disabled, waiting for POST /api/v1/clock/start");
    }

    let state = DashboardState::new(dashboard, clock);
    let app = create_app(state.clone());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    info!("[HttpServer] Listening on http://{addr}/api/v1");

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
        }
        info!("Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel_token.cancelled().await;
            info!("[HttpServer] Received shutdown signal");
        })
        .await;

    state.clock.lock().await.stop().await;

    match served {
        Ok(()) => {
            info!("PETRO-PULSE shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!("[HttpServer] Server error: {}", e);
            Err(anyhow::anyhow!("HTTP server error: {}", e))
        }
    }
}
