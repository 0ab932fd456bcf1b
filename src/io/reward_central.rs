//! Reward-points provider interface
//!
//! The contract does not guarantee deterministic point values for a
//! given (attraction, user) pair; each call is authoritative and the
//! result is cached only inside the Reward record.

use crate::domain::types::{AttractionId, UserId};
use crate::io::gps::SimLatency;
use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;

#[async_trait]
pub trait RewardPointsProvider: Send + Sync {
    /// Point value for earning the given attraction
    async fn points(&self, attraction_id: AttractionId, user_id: UserId) -> Result<i32>;
}

/// Simulated points provider: random value in 1..=1000 after a
/// latency draw
pub struct SimRewardCentral {
    latency: SimLatency,
}

impl SimRewardCentral {
    pub fn new(latency: SimLatency) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl RewardPointsProvider for SimRewardCentral {
    async fn points(&self, _attraction_id: AttractionId, _user_id: UserId) -> Result<i32> {
        self.latency.apply().await?;
        Ok(rand::thread_rng().gen_range(1..=1000))
    }
}
