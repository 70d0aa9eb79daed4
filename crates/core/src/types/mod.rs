//! Core types for Star Burger.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod geo;
pub mod id;
pub mod price;
pub mod status;

pub use geo::{Coordinates, CoordinatesError, EARTH_RADIUS_KM, distance_between};
pub use id::*;
pub use price::{Price, PriceError};
pub use status::*;
