//! Reward computation
//!
//! For each catalog attraction a user has not yet earned, the
//! engine scans the visit history for the first visit inside the
//! reward buffer, fetches a point value, and appends exactly one
//! reward. Point lookups fan out per attraction under the shared
//! provider permit pool.
//!
//! Callers hold the user's slot lock across the whole computation,
//! so the already-rewarded check and the append are one atomic step
//! per user. `User::add_reward` rejecting duplicates is a structural
//! backstop, not the primary guard.

use crate::domain::geo;
use crate::domain::types::{Attraction, AttractionId, Coordinate, Reward, UserId, Visit};
use crate::domain::user::User;
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::infra::registry::UserSlot;
use crate::io::reward_central::RewardPointsProvider;
use crate::services::catalog::CatalogClient;
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

/// Cheap to clone; all state is shared behind `Arc`.
#[derive(Clone)]
pub struct RewardEngine {
    catalog: Arc<CatalogClient>,
    reward_central: Arc<dyn RewardPointsProvider>,
    /// Shared provider permit pool; bounds point-lookup fan-out
    permits: Arc<Semaphore>,
    metrics: Arc<Metrics>,
    reward_buffer_miles: f64,
    attraction_range_miles: f64,
}

impl RewardEngine {
    pub fn new(
        catalog: Arc<CatalogClient>,
        reward_central: Arc<dyn RewardPointsProvider>,
        permits: Arc<Semaphore>,
        metrics: Arc<Metrics>,
        config: &Config,
    ) -> Self {
        Self {
            catalog,
            reward_central,
            permits,
            metrics,
            reward_buffer_miles: config.reward_buffer_miles(),
            attraction_range_miles: config.attraction_range_miles(),
        }
    }

    /// Override the reward buffer, mainly for tests that place visits
    /// at exact distances
    pub fn with_reward_buffer(mut self, miles: f64) -> Self {
        self.reward_buffer_miles = miles;
        self
    }

    pub fn reward_buffer_miles(&self) -> f64 {
        self.reward_buffer_miles
    }

    /// General nearby-POI check against the attraction range. This is
    /// not the awarding radius.
    pub fn is_within_attraction_proximity(
        &self,
        attraction: &Attraction,
        location: Coordinate,
    ) -> bool {
        geo::is_within(geo::distance(attraction.location, location), self.attraction_range_miles)
    }

    /// Point value the user would earn at an attraction, via the
    /// shared permit pool
    pub async fn points_for(&self, attraction_id: AttractionId, user_id: UserId) -> Result<i32> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| anyhow!("provider permit pool closed"))?;
        self.reward_central.points(attraction_id, user_id).await
    }

    /// Discover and append all newly-qualifying rewards for a user
    ///
    /// Returns the rewards created by this call. A failed point
    /// lookup skips that attraction only; a missing catalog fails the
    /// whole computation.
    pub async fn compute_rewards(&self, user: &mut User) -> Result<Vec<Reward>> {
        let catalog = self.catalog.list().await?;

        // Scan phase: pure math, no provider calls. First qualifying
        // visit in history order wins; remaining visits are skipped.
        let qualifying: Vec<(Attraction, Visit)> = catalog
            .iter()
            .filter(|attraction| !user.has_reward_for(attraction.id))
            .filter_map(|attraction| {
                user.history()
                    .iter()
                    .find(|visit| self.near_attraction(visit, attraction))
                    .map(|visit| (attraction.clone(), visit.clone()))
            })
            .collect();

        if qualifying.is_empty() {
            return Ok(Vec::new());
        }

        // Lookup phase: one point fetch per qualifying attraction,
        // bounded by the permit pool.
        let mut lookups = JoinSet::new();
        for (attraction, visit) in qualifying {
            let reward_central = self.reward_central.clone();
            let permits = self.permits.clone();
            let metrics = self.metrics.clone();
            let user_id = user.id;
            lookups.spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return None,
                };
                match reward_central.points(attraction.id, user_id).await {
                    Ok(points) => Some(Reward { visit, attraction, points }),
                    Err(e) => {
                        warn!(
                            user_id = %user_id,
                            attraction = %attraction.name,
                            error = %e,
                            "reward_points_unavailable"
                        );
                        metrics.record_points_failure();
                        None
                    }
                }
            });
        }

        let mut granted = Vec::new();
        while let Some(joined) = lookups.join_next().await {
            match joined {
                Ok(Some(reward)) => {
                    if user.add_reward(reward.clone()) {
                        debug!(
                            user_id = %user.id,
                            attraction = %reward.attraction.name,
                            points = %reward.points,
                            "reward_granted"
                        );
                        granted.push(reward);
                    } else {
                        debug!(
                            user_id = %user.id,
                            attraction = %reward.attraction.name,
                            "reward_duplicate_skipped"
                        );
                    }
                }
                Ok(None) => {}
                Err(e) => error!(error = %e, "reward_lookup_task_failed"),
            }
        }
        Ok(granted)
    }

    /// Batch reward computation over many users with bounded fan-out.
    /// Returns the total rewards granted; per-user failures are
    /// isolated.
    pub async fn compute_all(&self, slots: Vec<Arc<UserSlot>>) -> u64 {
        let mut tasks = JoinSet::new();
        for slot in slots {
            let engine = self.clone();
            tasks.spawn(async move {
                let mut user = slot.lock().await;
                match engine.compute_rewards(&mut user).await {
                    Ok(granted) => granted.len() as u64,
                    Err(e) => {
                        warn!(user_id = %slot.id, error = %e, "reward_computation_failed");
                        0
                    }
                }
            });
        }

        let mut total = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(count) => total += count,
                Err(e) => error!(error = %e, "reward_batch_task_failed"),
            }
        }
        self.metrics.record_rewards(total);
        total
    }

    fn near_attraction(&self, visit: &Visit, attraction: &Attraction) -> bool {
        geo::is_within(
            geo::distance(visit.location, attraction.location),
            self.reward_buffer_miles,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::UserId;
    use crate::io::gps::{SimGps, SimLatency};
    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;

    struct FixedPoints(i32);

    #[async_trait]
    impl RewardPointsProvider for FixedPoints {
        async fn points(&self, _attraction_id: AttractionId, _user_id: UserId) -> Result<i32> {
            Ok(self.0)
        }
    }

    /// Fails lookups for one attraction, succeeds for the rest
    struct PartialPoints {
        failing: AttractionId,
        calls: Mutex<Vec<AttractionId>>,
    }

    #[async_trait]
    impl RewardPointsProvider for PartialPoints {
        async fn points(&self, attraction_id: AttractionId, _user_id: UserId) -> Result<i32> {
            self.calls.lock().push(attraction_id);
            if attraction_id == self.failing {
                anyhow::bail!("points provider unavailable");
            }
            Ok(50)
        }
    }

    fn two_attraction_catalog() -> Vec<Attraction> {
        vec![
            Attraction::new("A", Coordinate::new(0.0, 0.0)),
            Attraction::new("B", Coordinate::new(10.0, 10.0)),
        ]
    }

    fn engine_with(
        catalog: Vec<Attraction>,
        reward_central: Arc<dyn RewardPointsProvider>,
    ) -> RewardEngine {
        let gps = Arc::new(SimGps::new(SimLatency::NONE).with_catalog(catalog));
        RewardEngine::new(
            Arc::new(CatalogClient::new(gps)),
            reward_central,
            Arc::new(Semaphore::new(64)),
            Arc::new(Metrics::new()),
            &Config::default(),
        )
    }

    fn visiting_user(locations: &[Coordinate]) -> User {
        let mut user = User::new(UserId::new(), "jon", "000", "jon@tourtrack.com");
        for &location in locations {
            user.add_visit(Visit::new(user.id, location, Utc::now()));
        }
        user
    }

    #[tokio::test]
    async fn test_visit_near_one_attraction_earns_exactly_that_reward() {
        let catalog = two_attraction_catalog();
        let expected = catalog[0].id;
        let engine = engine_with(catalog, Arc::new(FixedPoints(100)));
        let mut user = visiting_user(&[Coordinate::new(0.0, 0.0001)]);

        let granted = engine.compute_rewards(&mut user).await.unwrap();

        assert_eq!(granted.len(), 1);
        assert_eq!(granted[0].attraction.id, expected);
        assert_eq!(granted[0].points, 100);
        assert_eq!(user.rewards().len(), 1);
    }

    #[tokio::test]
    async fn test_two_qualifying_visits_yield_one_reward() {
        let catalog = vec![Attraction::new("A", Coordinate::new(0.0, 0.0))];
        let engine = engine_with(catalog, Arc::new(FixedPoints(100)));
        let first = Coordinate::new(0.0, 0.0001);
        let mut user = visiting_user(&[first, Coordinate::new(0.0, 0.0002)]);

        let granted = engine.compute_rewards(&mut user).await.unwrap();

        assert_eq!(granted.len(), 1);
        // First qualifying visit in history order triggers the reward
        assert_eq!(granted[0].visit.location, first);
    }

    #[tokio::test]
    async fn test_recomputation_never_duplicates_rewards() {
        let catalog = two_attraction_catalog();
        let engine = engine_with(catalog, Arc::new(FixedPoints(100)));
        let mut user = visiting_user(&[Coordinate::new(0.0, 0.0001)]);

        let first_pass = engine.compute_rewards(&mut user).await.unwrap();
        let second_pass = engine.compute_rewards(&mut user).await.unwrap();

        assert_eq!(first_pass.len(), 1);
        assert!(second_pass.is_empty());
        assert_eq!(user.rewards().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_lookup_does_not_block_other_attractions() {
        let catalog = vec![
            Attraction::new("A", Coordinate::new(0.0, 0.0)),
            Attraction::new("B", Coordinate::new(0.0, 0.1)),
        ];
        let failing = catalog[0].id;
        let surviving = catalog[1].id;
        let points = Arc::new(PartialPoints { failing, calls: Mutex::new(Vec::new()) });
        let engine = engine_with(catalog, points.clone());
        // One visit within the buffer of both attractions
        let mut user = visiting_user(&[Coordinate::new(0.0, 0.05)]);

        let granted = engine.compute_rewards(&mut user).await.unwrap();

        assert_eq!(granted.len(), 1);
        assert_eq!(granted[0].attraction.id, surviving);
        // Both lookups were attempted
        assert_eq!(points.calls.lock().len(), 2);

        // The failed attraction qualifies again on the next pass
        let retry = engine.compute_rewards(&mut user).await.unwrap();
        assert!(retry.iter().all(|r| r.attraction.id == failing) && retry.len() <= 1);
    }

    #[tokio::test]
    async fn test_distant_visits_earn_nothing() {
        let catalog = two_attraction_catalog();
        let engine = engine_with(catalog, Arc::new(FixedPoints(100)));
        let mut user = visiting_user(&[Coordinate::new(45.0, 45.0)]);

        let granted = engine.compute_rewards(&mut user).await.unwrap();
        assert!(granted.is_empty());
        assert!(user.rewards().is_empty());
    }

    #[tokio::test]
    async fn test_attraction_proximity_uses_range_not_buffer() {
        let attraction = Attraction::new("A", Coordinate::new(0.0, 0.0));
        let engine =
            engine_with(vec![attraction.clone()], Arc::new(FixedPoints(100)));

        // ~138 miles away: outside the 10 mile reward buffer, inside
        // the 200 mile attraction range
        let location = Coordinate::new(2.0, 0.0);
        assert!(engine.is_within_attraction_proximity(&attraction, location));

        let mut user = visiting_user(&[location]);
        let granted = engine.compute_rewards(&mut user).await.unwrap();
        assert!(granted.is_empty());
    }

    #[tokio::test]
    async fn test_widened_reward_buffer_awards_farther_visits() {
        let catalog = vec![Attraction::new("A", Coordinate::new(0.0, 0.0))];
        let engine =
            engine_with(catalog, Arc::new(FixedPoints(100))).with_reward_buffer(150.0);
        assert_eq!(engine.reward_buffer_miles(), 150.0);

        // ~138 miles out: beyond the default buffer, inside the
        // widened one
        let mut user = visiting_user(&[Coordinate::new(2.0, 0.0)]);
        let granted = engine.compute_rewards(&mut user).await.unwrap();
        assert_eq!(granted.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_compute_all_grants_across_users() {
        use crate::infra::registry::UserRegistry;

        let catalog = vec![Attraction::new("A", Coordinate::new(0.0, 0.0))];
        let engine = Arc::new(engine_with(catalog, Arc::new(FixedPoints(10))));

        let registry = UserRegistry::new();
        for _ in 0..20 {
            registry.insert(visiting_user(&[Coordinate::new(0.0, 0.0001)]));
        }

        let total = engine.compute_all(registry.all()).await;
        assert_eq!(total, 20);
        for slot in registry.all() {
            assert_eq!(slot.lock().await.rewards().len(), 1);
        }
    }
}
