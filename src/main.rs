//! Tourtrack - user tracking and reward attribution service
//!
//! Module structure:
//! - `domain/` - Core business types (Coordinate, Visit, Reward, User)
//! - `io/` - External interfaces (GPS, RewardCentral, TripPricer, Egress)
//! - `services/` - Business logic (Catalog, Rewards, Tracking, Background)
//! - `infra/` - Infrastructure (Config, Registry, Fixtures, Metrics)

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tourtrack::infra::{fixtures, Config, Metrics, UserRegistry};
use tourtrack::io::{SimGps, SimLatency, SimRewardCentral, SimTripPricer, SnapshotWriter};
use tourtrack::services::{BackgroundTracker, CatalogClient, RewardEngine, TrackingService};
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Tourtrack - user tracking and reward attribution service
#[derive(Parser, Debug)]
#[command(name = "tourtrack", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!("tourtrack starting");

    let args = Args::parse();
    let config = Config::load_from_path(&args.config);

    info!(
        config_file = %config.config_file(),
        tracking_interval_secs = %config.tracking_interval_secs(),
        provider_permits = %config.provider_permits(),
        reward_buffer_miles = %config.reward_buffer_miles(),
        attraction_range_miles = %config.attraction_range_miles(),
        user_count = %config.user_count(),
        egress_file = %config.egress_file(),
        "config_loaded"
    );

    // Shared components
    let metrics = Arc::new(Metrics::new());
    let permits = Arc::new(Semaphore::new(config.provider_permits()));

    // Simulated external providers
    let gps = Arc::new(SimGps::new(SimLatency {
        min_ms: config.gps_latency_min_ms(),
        max_ms: config.gps_latency_max_ms(),
        failure_rate: config.gps_failure_rate(),
    }));
    let reward_central = Arc::new(SimRewardCentral::new(SimLatency {
        min_ms: config.points_latency_min_ms(),
        max_ms: config.points_latency_max_ms(),
        failure_rate: config.points_failure_rate(),
    }));

    let catalog = Arc::new(CatalogClient::new(gps.clone()));
    let rewards = Arc::new(RewardEngine::new(
        catalog.clone(),
        reward_central,
        permits.clone(),
        metrics.clone(),
        &config,
    ));

    // Seed the synthetic population and grant rewards already owed
    // for the seeded visit history, before the first tracking cycle
    let registry = Arc::new(UserRegistry::new());
    fixtures::seed_users(&registry, config.user_count());
    info!(users = %registry.len(), "population_seeded");
    let backfilled = rewards.compute_all(registry.all()).await;
    info!(rewards = %backfilled, "seed_rewards_backfilled");

    let tracking = TrackingService::new(
        gps,
        catalog,
        rewards,
        Arc::new(SimTripPricer),
        registry,
        permits,
        metrics.clone(),
    );

    // Start the background tracking loop
    let egress = SnapshotWriter::new(config.egress_file());
    let tracker = BackgroundTracker::start(
        tracking,
        Some(egress),
        Duration::from_secs(config.tracking_interval_secs()),
        metrics.clone(),
    );
    info!("background_tracker_running");

    // Periodic metrics reporter
    let reporter_metrics = metrics.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(10));
        loop {
            interval.tick().await;
            reporter_metrics.report().log();
        }
    });

    // Stop the tracker on Ctrl+C; an in-flight cycle is allowed to
    // finish before shutdown completes
    tokio::signal::ctrl_c().await?;
    info!("shutdown_signal_received");
    tracker.stop().await;

    metrics.report().log();
    info!("tourtrack shutdown complete");
    Ok(())
}
