//! Great-circle distance math
//!
//! Distances are statute miles computed via the spherical law of
//! cosines. Double precision is sufficient; no ellipsoidal correction.

use crate::domain::types::Coordinate;

const STATUTE_MILES_PER_NAUTICAL_MILE: f64 = 1.151_779_45;

/// Great-circle distance between two coordinates in statute miles
///
/// The acos argument is clamped to [-1, 1]: identical or antipodal
/// points can overshoot the domain by a few ulps and acos would
/// return NaN.
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lon1 = a.longitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let lon2 = b.longitude.to_radians();

    let cos_angle = lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * (lon1 - lon2).cos();
    let angle = cos_angle.clamp(-1.0, 1.0).acos();

    let nautical_miles = 60.0 * angle.to_degrees();
    STATUTE_MILES_PER_NAUTICAL_MILE * nautical_miles
}

/// Inclusive radius check: true iff `distance_miles <= radius_miles`
#[inline]
pub fn is_within(distance_miles: f64, radius_miles: f64) -> bool {
    distance_miles <= radius_miles
}
