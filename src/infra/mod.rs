//! Infrastructure: configuration, user registry, fixtures, metrics

pub mod config;
pub mod fixtures;
pub mod metrics;
pub mod registry;

pub use config::Config;
pub use metrics::{Metrics, MetricsSummary};
pub use registry::{UserRegistry, UserSlot};
