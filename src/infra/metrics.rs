//! Lock-free pipeline counters
//!
//! Written from the hot tracking path, read by the periodic reporter.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

#[derive(Default)]
pub struct Metrics {
    visits_recorded: AtomicU64,
    rewards_granted: AtomicU64,
    position_failures: AtomicU64,
    points_failures: AtomicU64,
    cycles_completed: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_visit(&self) {
        self.visits_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rewards(&self, count: u64) {
        self.rewards_granted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_position_failure(&self) {
        self.position_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_points_failure(&self) {
        self.points_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cycle(&self) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn report(&self) -> MetricsSummary {
        MetricsSummary {
            visits_recorded: self.visits_recorded.load(Ordering::Relaxed),
            rewards_granted: self.rewards_granted.load(Ordering::Relaxed),
            position_failures: self.position_failures.load(Ordering::Relaxed),
            points_failures: self.points_failures.load(Ordering::Relaxed),
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MetricsSummary {
    pub visits_recorded: u64,
    pub rewards_granted: u64,
    pub position_failures: u64,
    pub points_failures: u64,
    pub cycles_completed: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            visits_recorded = %self.visits_recorded,
            rewards_granted = %self.rewards_granted,
            position_failures = %self.position_failures,
            points_failures = %self.points_failures,
            cycles_completed = %self.cycles_completed,
            "metrics_report"
        );
    }
}
