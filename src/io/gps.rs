//! Position and catalog provider interface
//!
//! The real service is remote and slow; `SimGps` models its latency
//! and its malformed-input failure mode so the tracking pipeline can
//! be exercised at full population scale without the network.

use crate::domain::types::{Attraction, Coordinate, UserId, Visit};
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use std::time::Duration;

/// External location provider: per-user positions plus the static
/// attraction catalog
#[async_trait]
pub trait GpsProvider: Send + Sync {
    /// Current position for a user, or an error when the provider
    /// cannot resolve one this cycle
    async fn user_position(&self, user_id: UserId) -> Result<Visit>;

    /// The full attraction catalog. Stable for the process lifetime;
    /// callers cache it.
    async fn attractions(&self) -> Result<Vec<Attraction>>;
}

/// Latency and failure knobs for a simulated provider
#[derive(Debug, Clone, Copy)]
pub struct SimLatency {
    pub min_ms: u64,
    pub max_ms: u64,
    /// Probability in [0, 1] that a call fails with a malformed-input
    /// style error
    pub failure_rate: f64,
}

impl SimLatency {
    pub const NONE: SimLatency = SimLatency { min_ms: 0, max_ms: 0, failure_rate: 0.0 };

    pub(crate) async fn apply(&self) -> Result<()> {
        // Draw outside the await so the rng guard is not held across it
        let (delay_ms, failed) = {
            let mut rng = rand::thread_rng();
            let delay = if self.max_ms > self.min_ms {
                rng.gen_range(self.min_ms..=self.max_ms)
            } else {
                self.min_ms
            };
            (delay, rng.gen_bool(self.failure_rate.clamp(0.0, 1.0)))
        };
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        if failed {
            bail!("malformed input: provider rejected request");
        }
        Ok(())
    }
}

/// Simulated GPS provider returning random positions
pub struct SimGps {
    latency: SimLatency,
    catalog: Vec<Attraction>,
}

impl SimGps {
    pub fn new(latency: SimLatency) -> Self {
        Self { latency, catalog: default_catalog() }
    }

    /// Replace the catalog, for tests that need known coordinates
    pub fn with_catalog(mut self, catalog: Vec<Attraction>) -> Self {
        self.catalog = catalog;
        self
    }
}

#[async_trait]
impl GpsProvider for SimGps {
    async fn user_position(&self, user_id: UserId) -> Result<Visit> {
        self.latency.apply().await?;
        Ok(Visit::new(user_id, random_coordinate(), Utc::now()))
    }

    async fn attractions(&self) -> Result<Vec<Attraction>> {
        self.latency.apply().await?;
        Ok(self.catalog.clone())
    }
}

/// Random coordinate within the web-mercator latitude bounds
pub fn random_coordinate() -> Coordinate {
    let mut rng = rand::thread_rng();
    Coordinate::new(rng.gen_range(-85.05112878..85.05112878), rng.gen_range(-180.0..180.0))
}

/// Built-in catalog mirroring the upstream provider's fixture list
fn default_catalog() -> Vec<Attraction> {
    [
        ("Disneyland", 33.817595, -117.922008),
        ("Jackson Hole", 43.582767, -110.821999),
        ("Mojave National Preserve", 35.141689, -115.510399),
        ("Joshua Tree National Park", 33.881866, -115.90065),
        ("Buffalo National River", 35.985512, -92.757652),
        ("Hot Springs National Park", 34.52153, -93.042267),
        ("Kartchner Caverns State Park", 31.837551, -110.347382),
        ("Legend Valley", 39.937778, -82.40667),
        ("Flatiron Building", 40.741112, -73.989723),
        ("Fallingwater", 39.906113, -79.468056),
        ("Union Station", 38.897095, -77.006332),
        ("Roger Dean Stadium", 26.890959, -80.116577),
        ("Texas Memorial Stadium", 30.283682, -97.732536),
        ("Bryant-Denny Stadium", 33.208973, -87.550438),
        ("Tiger Stadium", 30.412035, -91.183815),
        ("Neyland Stadium", 35.955013, -83.925011),
        ("Kyle Field", 30.61025, -96.339844),
        ("San Diego Zoo", 32.735317, -117.149048),
        ("Zoo Tampa at Lowry Park", 28.012804, -82.469269),
        ("Franklin Park Zoo", 42.302601, -71.086731),
        ("El Paso Zoo", 31.769125, -106.44487),
        ("Kansas City Zoo", 39.007504, -94.529625),
        ("St. Louis Zoo", 38.634834, -90.291019),
        ("Cinderella Castle", 28.419411, -81.5812),
        ("McKinley Tower", 61.218887, -149.877502),
        ("Mount Rushmore National Memorial", 43.879102, -103.459067),
    ]
    .into_iter()
    .map(|(name, lat, lon)| Attraction::new(name, Coordinate::new(lat, lon)))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sim_gps_returns_position_for_user() {
        let gps = SimGps::new(SimLatency::NONE);
        let user_id = UserId::new();
        let visit = gps.user_position(user_id).await.unwrap();

        assert_eq!(visit.user_id, user_id);
        assert!(visit.location.latitude.abs() <= 85.05112878);
        assert!(visit.location.longitude.abs() <= 180.0);
    }

    #[tokio::test]
    async fn test_sim_gps_failure_rate_one_always_fails() {
        let gps = SimGps::new(SimLatency { min_ms: 0, max_ms: 0, failure_rate: 1.0 });
        assert!(gps.user_position(UserId::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_catalog_is_non_empty_and_stable() {
        let gps = SimGps::new(SimLatency::NONE);
        let first = gps.attractions().await.unwrap();
        let second = gps.attractions().await.unwrap();

        assert!(first.len() >= 5);
        assert_eq!(first.len(), second.len());
        assert_eq!(first[0].id, second[0].id);
    }
}
