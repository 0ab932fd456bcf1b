//! Shared types for the tracking and reward pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Newtype wrapper for user IDs to provide type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Newtype wrapper for attraction IDs to provide type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct AttractionId(pub Uuid);

impl AttractionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl std::fmt::Display for AttractionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A latitude/longitude pair in floating-point degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// A known point of interest from the attraction catalog
///
/// The catalog is fetched once and treated as read-only for the
/// process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attraction {
    pub id: AttractionId,
    pub name: String,
    pub location: Coordinate,
}

impl Attraction {
    pub fn new(name: impl Into<String>, location: Coordinate) -> Self {
        Self { id: AttractionId::new(), name: name.into(), location }
    }
}

/// One recorded position observation for a user
#[derive(Debug, Clone, Serialize)]
pub struct Visit {
    pub user_id: UserId,
    pub location: Coordinate,
    pub time: DateTime<Utc>,
}

impl Visit {
    pub fn new(user_id: UserId, location: Coordinate, time: DateTime<Utc>) -> Self {
        Self { user_id, location, time }
    }
}

/// A reward earned by a visit falling within the reward buffer of an
/// attraction
///
/// At most one exists per (user, attraction) pair. The point value is
/// fetched once from the points provider and cached here, never
/// re-derived.
#[derive(Debug, Clone, Serialize)]
pub struct Reward {
    pub visit: Visit,
    pub attraction: Attraction,
    pub points: i32,
}

/// Party-size and duration preferences used for trip price quotes
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TravelPreferences {
    pub adults: u32,
    pub children: u32,
    pub trip_nights: u32,
}

impl Default for TravelPreferences {
    fn default() -> Self {
        Self { adults: 1, children: 0, trip_nights: 1 }
    }
}

/// A priced trip offer from the trip-price provider
#[derive(Debug, Clone, Serialize)]
pub struct TripOffer {
    pub provider: String,
    pub trip_id: Uuid,
    pub price: f64,
}
