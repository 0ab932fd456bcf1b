//! Background population tracking
//!
//! A supervised task re-tracks the full user population on a fixed
//! interval and appends a location snapshot after each cycle.
//! `stop()` consumes the handle, signals the watch channel, and joins
//! the task: after it returns no further cycle can begin, though a
//! cycle already in flight completes first.

use crate::infra::metrics::Metrics;
use crate::io::egress::{PopulationSnapshot, SnapshotWriter};
use crate::services::tracking::TrackingService;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

pub struct BackgroundTracker {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl BackgroundTracker {
    /// Spawn the tracking loop. The first cycle starts immediately;
    /// later cycles follow the configured interval.
    pub fn start(
        tracking: TrackingService,
        egress: Option<SnapshotWriter>,
        interval: Duration,
        metrics: Arc<Metrics>,
    ) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            info!(interval_secs = %interval.as_secs(), "background_tracker_started");
            let mut tick = tokio::time::interval(interval);
            // Cycles may run longer than the interval at high
            // population; skip the backlog instead of bursting
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut cycle: u64 = 0;

            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        // Cancellation is re-checked at the top of
                        // every cycle
                        if *shutdown_rx.borrow() {
                            break;
                        }
                        cycle += 1;
                        let summary = tracking.track_all().await;
                        metrics.record_cycle();
                        info!(
                            cycle = %cycle,
                            attempted = %summary.attempted,
                            tracked = %summary.tracked,
                            failed = %summary.failed,
                            "background_cycle_complete"
                        );
                        if let Some(writer) = &egress {
                            let snapshot = PopulationSnapshot {
                                taken_at: Utc::now(),
                                cycle,
                                locations: tracking.all_current_locations().await,
                            };
                            writer.write(&snapshot);
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!(cycles = %cycle, "background_tracker_stopped");
        });

        Self { shutdown_tx, handle }
    }

    /// Request cancellation and wait for the loop to exit. Consuming
    /// `self` makes the tracker stoppable exactly once.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            error!(error = %e, "background_tracker_join_failed");
        }
    }
}
