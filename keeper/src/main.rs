//! Prize vault keeper
//!
//! Off-chain trigger that walks every pool through its draw phases once the
//! round has ended: start, batch processing, randomness, completion and the
//! next round. Venues and randomness are simulated in-process.

mod config;
mod planner;
mod priority_queue;
mod service;
mod status;

use anyhow::{Context, Result};
use config::Config;
use prizevault_common::Timestamp;
use service::Keeper;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting prize vault keeper");

    let mut args = std::env::args().skip(1);
    if args.next().as_deref() == Some("--write-default-config") {
        let target = args.next().unwrap_or_else(|| "keeper-config.toml".to_string());
        return Config::write_default(&target);
    }

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({:#}), using default local config", e);
        Config::default_local()
    });

    let mut keeper = Keeper::from_config(&config, unix_now()).context("Failed to start keeper")?;
    log::info!(
        "Driving {} pool(s), tick every {}s, batch size {}",
        keeper.registry().len(),
        config.poll_interval_secs,
        config.batch_size
    );

    let period = Duration::from_secs(config.poll_interval_secs);
    tokio::select! {
        result = service::run(&mut keeper, period, unix_now, config.status_path.as_deref(), None) => result,
        _ = tokio::signal::ctrl_c() => {
            log::info!("Shutting down");
            Ok(())
        }
    }
}

fn unix_now() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
