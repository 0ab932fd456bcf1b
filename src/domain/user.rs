//! User state: visit history and earned rewards
//!
//! A `User` is the sole owner of its history and reward set. All
//! mutation goes through the tracking service while that user's slot
//! lock is held, so these methods never see concurrent writers.

use crate::domain::types::{
    AttractionId, Coordinate, Reward, TravelPreferences, TripOffer, UserId, Visit,
};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

/// A tracked user with an append-only visit history and a
/// one-per-attraction reward set
#[derive(Debug)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub preferences: TravelPreferences,
    /// Time-ordered visit history; the last element is the current
    /// location. Fixture users start with three visits.
    history: SmallVec<[Visit; 4]>,
    rewards: Vec<Reward>,
    /// Attraction ids already rewarded, for O(1) membership checks
    rewarded: FxHashSet<AttractionId>,
    /// Offers from the last trip-deal quote
    pub trip_offers: Vec<TripOffer>,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>, phone: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            phone: phone.into(),
            email: email.into(),
            preferences: TravelPreferences::default(),
            history: SmallVec::new(),
            rewards: Vec::new(),
            rewarded: FxHashSet::default(),
            trip_offers: Vec::new(),
        }
    }

    /// Append a visit to the history
    pub fn add_visit(&mut self, visit: Visit) {
        self.history.push(visit);
    }

    /// Most recent visit, if any
    pub fn last_visit(&self) -> Option<&Visit> {
        self.history.last()
    }

    /// Last-known coordinate, if the user has ever been located
    pub fn last_location(&self) -> Option<Coordinate> {
        self.history.last().map(|v| v.location)
    }

    pub fn history(&self) -> &[Visit] {
        &self.history
    }

    pub fn rewards(&self) -> &[Reward] {
        &self.rewards
    }

    /// True if this attraction has already been rewarded
    pub fn has_reward_for(&self, attraction: AttractionId) -> bool {
        self.rewarded.contains(&attraction)
    }

    /// Append-if-absent: returns false and leaves the set untouched
    /// when the attraction is already rewarded
    pub fn add_reward(&mut self, reward: Reward) -> bool {
        if !self.rewarded.insert(reward.attraction.id) {
            return false;
        }
        self.rewards.push(reward);
        true
    }

    /// Cumulative reward points, summed for trip-price quotes
    pub fn total_reward_points(&self) -> i32 {
        self.rewards.iter().map(|r| r.points).sum()
    }
}
