//! Tracking orchestration
//!
//! `track_one` drives a single user through one tracking cycle:
//! fetch the current position, append it to history, and evaluate
//! rewards before reporting completion. `track_all` fans that out
//! over the whole registry with bounded provider concurrency and an
//! all-complete join; one user failing never aborts the batch.

use crate::domain::geo;
use crate::domain::types::{Attraction, Coordinate, Reward, TripOffer, UserId, Visit};
use crate::infra::metrics::Metrics;
use crate::infra::registry::{UserRegistry, UserSlot};
use crate::io::gps::GpsProvider;
use crate::io::trip_pricer::TripPriceProvider;
use crate::services::catalog::CatalogClient;
use crate::services::rewards::RewardEngine;
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Nearby-attraction query size
const NEARBY_ATTRACTION_COUNT: usize = 5;

const TRIP_PRICER_API_KEY: &str = "test-server-api-key";

/// Outcome of one `track_all` pass. Reported only after every user's
/// attempt has resolved.
#[derive(Debug, Clone, Copy)]
pub struct TrackSummary {
    pub attempted: usize,
    pub tracked: usize,
    pub failed: usize,
}

/// One entry of the nearby-attraction query result
#[derive(Debug, Clone, Serialize)]
pub struct NearbyAttraction {
    pub attraction_name: String,
    pub attraction_location: Coordinate,
    pub user_location: Coordinate,
    pub distance_miles: f64,
    pub reward_points: i32,
}

/// Orchestrates tracking cycles and the read API over user state
///
/// Cheap to clone; all state is shared behind `Arc`.
#[derive(Clone)]
pub struct TrackingService {
    gps: Arc<dyn GpsProvider>,
    catalog: Arc<CatalogClient>,
    rewards: Arc<RewardEngine>,
    trip_pricer: Arc<dyn TripPriceProvider>,
    registry: Arc<UserRegistry>,
    /// Shared provider permit pool; bounds position-fetch fan-out
    permits: Arc<Semaphore>,
    metrics: Arc<Metrics>,
}

impl TrackingService {
    pub fn new(
        gps: Arc<dyn GpsProvider>,
        catalog: Arc<CatalogClient>,
        rewards: Arc<RewardEngine>,
        trip_pricer: Arc<dyn TripPriceProvider>,
        registry: Arc<UserRegistry>,
        permits: Arc<Semaphore>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self { gps, catalog, rewards, trip_pricer, registry, permits, metrics }
    }

    pub fn registry(&self) -> &Arc<UserRegistry> {
        &self.registry
    }

    pub fn catalog(&self) -> &Arc<CatalogClient> {
        &self.catalog
    }

    pub fn rewards(&self) -> &Arc<RewardEngine> {
        &self.rewards
    }

    /// One tracking cycle for one user: fetch position, append the
    /// visit, evaluate rewards. Rewards are computed before this call
    /// returns, so callers observe up-to-date totals.
    ///
    /// Concurrent calls for the same user serialize on the slot lock;
    /// each appends its own visit.
    pub async fn track_one(&self, slot: &UserSlot) -> Result<Visit> {
        let visit = {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| anyhow!("provider permit pool closed"))?;
            match self.gps.user_position(slot.id).await {
                Ok(visit) => visit,
                Err(e) => {
                    self.metrics.record_position_failure();
                    return Err(e.context("no position available this cycle"));
                }
            }
        };

        let mut user = slot.lock().await;
        user.add_visit(visit.clone());
        self.metrics.record_visit();

        let granted = self.rewards.compute_rewards(&mut user).await?;
        self.metrics.record_rewards(granted.len() as u64);
        Ok(visit)
    }

    /// Track every registered user, returning once all attempts have
    /// resolved. Per-user failures are logged and counted, never
    /// propagated.
    pub async fn track_all(&self) -> TrackSummary {
        let slots = self.registry.all();
        let attempted = slots.len();

        let mut tasks = JoinSet::new();
        for slot in slots {
            let service = self.clone();
            tasks.spawn(async move {
                match service.track_one(&slot).await {
                    Ok(_) => true,
                    Err(e) => {
                        warn!(user_id = %slot.id, error = %e, "user_tracking_failed");
                        false
                    }
                }
            });
        }

        let mut tracked = 0;
        let mut failed = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => tracked += 1,
                Ok(false) => failed += 1,
                Err(e) => {
                    failed += 1;
                    error!(error = %e, "tracking_task_failed");
                }
            }
        }

        info!(
            attempted = %attempted,
            tracked = %tracked,
            failed = %failed,
            "tracking_cycle_complete"
        );
        TrackSummary { attempted, tracked, failed }
    }

    /// Last-known location, tracking on demand when the user has no
    /// history yet
    pub async fn user_location(&self, slot: &UserSlot) -> Result<Visit> {
        {
            let user = slot.lock().await;
            if let Some(visit) = user.last_visit() {
                return Ok(visit.clone());
            }
        }
        self.track_one(slot).await
    }

    /// The five attractions closest to a position, each with the
    /// point value this user would earn there. Visiting history is
    /// irrelevant; this is a preview, not an award.
    pub async fn nearby_attractions(
        &self,
        user_id: UserId,
        position: Coordinate,
    ) -> Result<Vec<NearbyAttraction>> {
        let catalog = self.catalog.list().await?;

        // Stable sort keeps catalog order for equal distances
        let mut by_distance: Vec<(&Attraction, f64)> = catalog
            .iter()
            .map(|attraction| (attraction, geo::distance(position, attraction.location)))
            .collect();
        by_distance
            .sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

        let mut nearby = Vec::with_capacity(NEARBY_ATTRACTION_COUNT);
        for (attraction, distance_miles) in by_distance.into_iter().take(NEARBY_ATTRACTION_COUNT) {
            let reward_points = self
                .rewards
                .points_for(attraction.id, user_id)
                .await
                .context("reward points unavailable for nearby attraction")?;
            nearby.push(NearbyAttraction {
                attraction_name: attraction.name.clone(),
                attraction_location: attraction.location,
                user_location: position,
                distance_miles,
                reward_points,
            });
        }
        Ok(nearby)
    }

    /// All rewards earned so far by a user
    pub async fn user_rewards(&self, slot: &UserSlot) -> Vec<Reward> {
        slot.lock().await.rewards().to_vec()
    }

    /// Last-known location per user across the population
    pub async fn all_current_locations(&self) -> HashMap<UserId, Coordinate> {
        self.registry.last_known_locations().await
    }

    /// Trip price quotes for a user's cumulative reward points,
    /// cached on the user
    pub async fn trip_deals(&self, slot: &UserSlot) -> Result<Vec<TripOffer>> {
        let (user_id, preferences, points) = {
            let user = slot.lock().await;
            (user.id, user.preferences, user.total_reward_points())
        };

        let offers = self
            .trip_pricer
            .price(TRIP_PRICER_API_KEY, user_id, preferences, points)
            .await
            .context("trip price provider unavailable")?;

        slot.lock().await.trip_offers = offers.clone();
        Ok(offers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::User;
    use crate::infra::config::Config;
    use crate::io::gps::{SimGps, SimLatency};
    use crate::io::reward_central::SimRewardCentral;
    use crate::io::trip_pricer::SimTripPricer;

    fn test_service(gps: SimGps) -> TrackingService {
        let gps: Arc<dyn GpsProvider> = Arc::new(gps);
        let catalog = Arc::new(CatalogClient::new(gps.clone()));
        let permits = Arc::new(Semaphore::new(256));
        let metrics = Arc::new(Metrics::new());
        let rewards = Arc::new(RewardEngine::new(
            catalog.clone(),
            Arc::new(SimRewardCentral::new(SimLatency::NONE)),
            permits.clone(),
            metrics.clone(),
            &Config::default(),
        ));
        TrackingService::new(
            gps,
            catalog,
            rewards,
            Arc::new(SimTripPricer),
            Arc::new(UserRegistry::new()),
            permits,
            metrics,
        )
    }

    fn register_user(service: &TrackingService, name: &str) -> Arc<UserSlot> {
        service
            .registry()
            .insert(User::new(UserId::new(), name, "000", format!("{name}@tourtrack.com")))
    }

    #[tokio::test]
    async fn test_track_one_appends_exactly_one_visit() {
        let service = test_service(SimGps::new(SimLatency::NONE));
        let slot = register_user(&service, "jon");

        let visit = service.track_one(&slot).await.unwrap();
        assert_eq!(visit.user_id, slot.id);
        assert_eq!(slot.lock().await.history().len(), 1);

        service.track_one(&slot).await.unwrap();
        assert_eq!(slot.lock().await.history().len(), 2);
    }

    #[tokio::test]
    async fn test_track_one_position_failure_leaves_history_untouched() {
        let service =
            test_service(SimGps::new(SimLatency { min_ms: 0, max_ms: 0, failure_rate: 1.0 }));
        let slot = register_user(&service, "jon");

        assert!(service.track_one(&slot).await.is_err());
        assert!(slot.lock().await.history().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_track_all_attempts_every_user() {
        let service = test_service(SimGps::new(SimLatency::NONE));
        for i in 0..50 {
            register_user(&service, &format!("user{i}"));
        }

        let summary = service.track_all().await;

        assert_eq!(summary.attempted, 50);
        assert_eq!(summary.tracked, 50);
        assert_eq!(summary.failed, 0);
        for slot in service.registry().all() {
            assert_eq!(slot.lock().await.history().len(), 1);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_track_all_completes_despite_failures() {
        // Every position fetch fails; the batch must still resolve
        let service =
            test_service(SimGps::new(SimLatency { min_ms: 0, max_ms: 0, failure_rate: 1.0 }));
        for i in 0..20 {
            register_user(&service, &format!("user{i}"));
        }

        let summary = service.track_all().await;

        assert_eq!(summary.attempted, 20);
        assert_eq!(summary.tracked, 0);
        assert_eq!(summary.failed, 20);
    }

    #[tokio::test]
    async fn test_user_location_prefers_existing_history() {
        let service = test_service(SimGps::new(SimLatency::NONE));
        let slot = register_user(&service, "jon");

        let tracked = service.track_one(&slot).await.unwrap();
        let location = service.user_location(&slot).await.unwrap();

        assert_eq!(location.location, tracked.location);
        // No extra visit was appended by the read
        assert_eq!(slot.lock().await.history().len(), 1);
    }

    #[tokio::test]
    async fn test_user_location_tracks_when_history_empty() {
        let service = test_service(SimGps::new(SimLatency::NONE));
        let slot = register_user(&service, "jon");

        let location = service.user_location(&slot).await.unwrap();
        assert_eq!(location.user_id, slot.id);
        assert_eq!(slot.lock().await.history().len(), 1);
    }

    #[tokio::test]
    async fn test_nearby_attractions_returns_five_sorted_entries() {
        let service = test_service(SimGps::new(SimLatency::NONE));
        let slot = register_user(&service, "jon");

        let nearby = service
            .nearby_attractions(slot.id, Coordinate::new(33.817595, -117.922008))
            .await
            .unwrap();

        assert_eq!(nearby.len(), 5);
        for pair in nearby.windows(2) {
            assert!(pair[0].distance_miles <= pair[1].distance_miles);
        }
        assert!(nearby.iter().all(|n| (1..=1000).contains(&n.reward_points)));
    }

    #[tokio::test]
    async fn test_nearby_attractions_equal_distance_keeps_catalog_order() {
        let twin_spot = Coordinate::new(1.0, 1.0);
        let catalog = vec![
            Attraction::new("Far Ridge", Coordinate::new(40.0, 40.0)),
            Attraction::new("North Gate", twin_spot),
            Attraction::new("South Gate", twin_spot),
            Attraction::new("Middle Falls", Coordinate::new(10.0, 10.0)),
            Attraction::new("Outer Banks", Coordinate::new(20.0, 20.0)),
            Attraction::new("Last Stop", Coordinate::new(30.0, 30.0)),
        ];
        let service = test_service(SimGps::new(SimLatency::NONE).with_catalog(catalog));
        let slot = register_user(&service, "jon");

        let nearby = service
            .nearby_attractions(slot.id, Coordinate::new(0.0, 0.0))
            .await
            .unwrap();

        // The co-located gates tie on distance; the stable sort keeps
        // their catalog order
        assert_eq!(nearby[0].distance_miles, nearby[1].distance_miles);
        assert_eq!(nearby[0].attraction_name, "North Gate");
        assert_eq!(nearby[1].attraction_name, "South Gate");
        assert_eq!(nearby[2].attraction_name, "Middle Falls");
    }

    #[tokio::test]
    async fn test_trip_deals_cached_on_user() {
        let service = test_service(SimGps::new(SimLatency::NONE));
        let slot = register_user(&service, "jon");

        let offers = service.trip_deals(&slot).await.unwrap();
        assert_eq!(offers.len(), 5);
        assert_eq!(slot.lock().await.trip_offers.len(), 5);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_track_one_same_user_both_append() {
        let service = test_service(SimGps::new(SimLatency::NONE));
        let slot = register_user(&service, "jon");

        let a = {
            let service = service.clone();
            let slot = slot.clone();
            tokio::spawn(async move { service.track_one(&slot).await })
        };
        let b = {
            let service = service.clone();
            let slot = slot.clone();
            tokio::spawn(async move { service.track_one(&slot).await })
        };

        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let user = slot.lock().await;
        assert_eq!(user.history().len(), 2);
        // Rewards stay unique per attraction even under the race
        let mut seen = std::collections::HashSet::new();
        assert!(user.rewards().iter().all(|r| seen.insert(r.attraction.id)));
    }
}
