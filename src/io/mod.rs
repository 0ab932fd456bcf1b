//! External interfaces
//!
//! Provider traits for the position/catalog, reward-points, and
//! trip-price services, their simulated implementations, and the
//! snapshot egress writer.

pub mod egress;
pub mod gps;
pub mod reward_central;
pub mod trip_pricer;

pub use egress::{PopulationSnapshot, SnapshotWriter};
pub use gps::{GpsProvider, SimGps, SimLatency};
pub use reward_central::{RewardPointsProvider, SimRewardCentral};
pub use trip_pricer::{SimTripPricer, TripPriceProvider};
