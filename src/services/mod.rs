//! Business logic
//!
//! - `catalog` - read-through attraction catalog cache
//! - `rewards` - reward discovery and point attribution
//! - `tracking` - per-user and population tracking orchestration
//! - `background` - periodic full-population tracking loop

pub mod background;
pub mod catalog;
pub mod rewards;
pub mod tracking;

pub use background::BackgroundTracker;
pub use catalog::CatalogClient;
pub use rewards::RewardEngine;
pub use tracking::{NearbyAttraction, TrackSummary, TrackingService};
