//! Address geocoding.
//!
//! - [`client`]: the external geocoding provider behind the [`Geocoder`] trait
//! - [`store`]: persistent address → coordinates records behind [`LocationStore`]
//! - [`cache`]: the read-through [`GeocodeCache`] with TTL and negative caching
//!
//! Distances come from `star_burger_core` and are re-exported here.

pub mod cache;
pub mod client;
pub mod store;

pub use cache::{GeocodeCache, normalize_address};
pub use client::{GeocodeError, Geocoder, YandexGeocoder};
pub use star_burger_core::{Coordinates, EARTH_RADIUS_KM, distance_between};
pub use store::{LocationStore, MemoryLocationStore};
