//! Synthetic population seeding
//!
//! Users are provisioned once at startup with three random historical
//! visits each, matching the upstream internal-test fixture.

use crate::domain::types::{Coordinate, UserId, Visit};
use crate::domain::user::User;
use crate::infra::registry::UserRegistry;
use chrono::{Duration, Utc};
use rand::Rng;
use tracing::debug;

const SEED_VISITS_PER_USER: usize = 3;

/// Seed `count` users into the registry
pub fn seed_users(registry: &UserRegistry, count: usize) {
    let mut rng = rand::thread_rng();
    for i in 0..count {
        let name = format!("internalUser{i}");
        let email = format!("{name}@tourtrack.com");
        let mut user = User::new(UserId::new(), name, "000", email);
        seed_visit_history(&mut user, &mut rng);
        registry.insert(user);
    }
    debug!(count = %count, "users_seeded");
}

fn seed_visit_history(user: &mut User, rng: &mut impl Rng) {
    for _ in 0..SEED_VISITS_PER_USER {
        let location =
            Coordinate::new(rng.gen_range(-85.05112878..85.05112878), rng.gen_range(-180.0..180.0));
        let time = Utc::now() - Duration::days(rng.gen_range(0..30));
        user.add_visit(Visit::new(user.id, location, time));
    }
}
