//! Trip-price provider interface
//!
//! Consumed at the edge of the core pipeline: the tracking service
//! sums a user's reward points and asks for quotes. Out-of-scope
//! beyond this boundary.

use crate::domain::types::{TravelPreferences, TripOffer, UserId};
use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use uuid::Uuid;

#[async_trait]
pub trait TripPriceProvider: Send + Sync {
    /// Price quotes for a user given party preferences and cumulative
    /// reward points
    async fn price(
        &self,
        api_key: &str,
        user_id: UserId,
        preferences: TravelPreferences,
        reward_points: i32,
    ) -> Result<Vec<TripOffer>>;
}

const SIM_PROVIDERS: [&str; 5] = [
    "Holiday Travels",
    "Enterprize Ventures Limited",
    "Sunny Days",
    "FlyAway Trips",
    "United Partners Vacations",
];

/// Simulated trip pricer: one offer per partner, points discount
/// applied against a per-night base price
pub struct SimTripPricer;

#[async_trait]
impl TripPriceProvider for SimTripPricer {
    async fn price(
        &self,
        _api_key: &str,
        _user_id: UserId,
        preferences: TravelPreferences,
        reward_points: i32,
    ) -> Result<Vec<TripOffer>> {
        let mut rng = rand::thread_rng();
        let offers = SIM_PROVIDERS
            .iter()
            .map(|provider| {
                let per_night: f64 = rng.gen_range(80.0..320.0);
                let party = f64::from(preferences.adults) + 0.5 * f64::from(preferences.children);
                let base = per_night * f64::from(preferences.trip_nights) * party;
                let price = (base - f64::from(reward_points) * 0.1).max(1.0);
                TripOffer { provider: (*provider).to_string(), trip_id: Uuid::now_v7(), price }
            })
            .collect();
        Ok(offers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_one_offer_per_partner() {
        let pricer = SimTripPricer;
        let offers = pricer
            .price("test-server-api-key", UserId::new(), TravelPreferences::default(), 0)
            .await
            .unwrap();
        assert_eq!(offers.len(), SIM_PROVIDERS.len());
        assert!(offers.iter().all(|o| o.price >= 1.0));
    }

    #[tokio::test]
    async fn test_points_never_drive_price_below_floor() {
        let pricer = SimTripPricer;
        let offers = pricer
            .price("test-server-api-key", UserId::new(), TravelPreferences::default(), 1_000_000)
            .await
            .unwrap();
        assert!(offers.iter().all(|o| o.price >= 1.0));
    }
}
