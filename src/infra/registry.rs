//! Process-scoped user registry
//!
//! The registry maps user id to a slot holding that user behind an
//! async mutex. Tracking cycles for the same user serialize on the
//! slot lock, which is what keeps the one-reward-per-attraction
//! invariant safe under racing callers (single writer per user).

use crate::domain::types::{Coordinate, UserId};
use crate::domain::user::User;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// One user behind its writer lock
pub struct UserSlot {
    pub id: UserId,
    user: Mutex<User>,
}

impl UserSlot {
    pub fn new(user: User) -> Self {
        Self { id: user.id, user: Mutex::new(user) }
    }

    /// Acquire the per-user writer lock. Held for a whole tracking
    /// cycle, including reward computation.
    pub async fn lock(&self) -> MutexGuard<'_, User> {
        self.user.lock().await
    }
}

/// Shared, process-lifetime map of all known users
#[derive(Default)]
pub struct UserRegistry {
    users: RwLock<FxHashMap<UserId, Arc<UserSlot>>>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user. Returns the slot; an existing user with the
    /// same id is left untouched.
    pub fn insert(&self, user: User) -> Arc<UserSlot> {
        let mut users = self.users.write();
        users.entry(user.id).or_insert_with(|| Arc::new(UserSlot::new(user))).clone()
    }

    pub fn get(&self, id: UserId) -> Option<Arc<UserSlot>> {
        self.users.read().get(&id).cloned()
    }

    /// Snapshot of all user slots
    pub fn all(&self) -> Vec<Arc<UserSlot>> {
        self.users.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }

    /// Last-known coordinate per user, for the population snapshot.
    /// Users never located yet are omitted.
    pub async fn last_known_locations(&self) -> HashMap<UserId, Coordinate> {
        let slots = self.all();
        let mut locations = HashMap::with_capacity(slots.len());
        for slot in slots {
            let user = slot.lock().await;
            if let Some(location) = user.last_location() {
                locations.insert(slot.id, location);
            }
        }
        locations
    }
}
