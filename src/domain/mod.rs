//! Core business types and pure math
//!
//! No I/O and no async here. Everything that talks to a provider
//! lives in `io`, everything that orchestrates lives in `services`.

pub mod geo;
pub mod types;
pub mod user;
