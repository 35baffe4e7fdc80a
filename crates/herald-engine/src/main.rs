//! Demo engine binary for Herald.
//!
//! Wires the propagation engine, the director, and a seeded demo world
//! together and runs the tick loop until the tick limit or Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `herald-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Seed the demo world and spawn actors
//! 4. Run the tick loop
//! 5. Log the result

mod error;
mod events;
mod runner;
mod spawner;

use std::path::Path;

use herald_core::{DecisionLog, HeraldConfig, LoggingConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Application entry point for the Herald engine.
///
/// # Errors
///
/// Returns an error if any initialization step or the simulation fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. Logging is not up yet, so remember whether the
    //    file was found and report it afterwards.
    let (config, from_file) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging)?;
    info!("herald-engine starting");
    if !from_file {
        info!("Config file not found, using defaults");
    }
    info!(
        seed = config.world.seed,
        width = config.world.width,
        height = config.world.height,
        regions_per_nation = config.world.regions_per_nation,
        tick_interval_ms = config.clock.tick_interval_ms,
        max_ticks = config.clock.max_ticks,
        "Configuration loaded"
    );

    // 3-4. Seed, spawn, and run until the limit or Ctrl-C.
    let log = DecisionLog::new(config.director.decision_log_capacity);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C, running to the tick limit");
            std::future::pending::<()>().await;
        }
    };
    let summary = runner::run_simulation(&config, &log, shutdown).await?;

    // 5. Log results.
    info!(
        end_reason = ?summary.end_reason,
        total_ticks = summary.total_ticks,
        nations = summary.spawned.nations,
        characters = summary.spawned.characters,
        frames = summary.metrics.total_frames,
        dropped = summary.propagation.total_dropped(),
        "herald-engine shutdown complete"
    );

    Ok(())
}

/// Load configuration from `herald-config.yaml` in the working directory,
/// falling back to defaults when the file is absent.
fn load_config() -> Result<(HeraldConfig, bool), EngineError> {
    let config_path = Path::new("herald-config.yaml");
    if config_path.exists() {
        Ok((HeraldConfig::from_file(config_path)?, true))
    } else {
        Ok((HeraldConfig::parse("")?, false))
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `logging.level` applies.
fn init_logging(config: &LoggingConfig) -> Result<(), EngineError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| EngineError::Logging {
        message: e.to_string(),
    })
}
