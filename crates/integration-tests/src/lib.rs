//! Integration tests for Star Burger.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p star-burger-integration-tests
//! ```
//!
//! The tests drive the geocode cache and the matching engine together with
//! in-memory storage, either against [`CountingGeocoder`] or against a local
//! HTTP server standing in for the Yandex Geocoder. No database is needed.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use star_burger_core::{Coordinates, OrderId, ProductId, RestaurantId};
use star_burger_server::config::GeocodeCacheConfig;
use star_burger_server::geo::{GeocodeCache, GeocodeError, Geocoder, MemoryLocationStore};
use star_burger_server::matching::{PendingOrder, RestaurantOffer};

/// Geocoder answering from a fixed table and recording every call.
#[derive(Debug, Default)]
pub struct CountingGeocoder {
    known: HashMap<String, Coordinates>,
    calls: Mutex<Vec<String>>,
    total: AtomicUsize,
}

impl CountingGeocoder {
    /// Geocoder that knows `(address, lon, lat)` triples and fails for anything else.
    ///
    /// # Panics
    ///
    /// Panics if a coordinate pair is out of range.
    #[must_use]
    pub fn new(known: &[(&str, f64, f64)]) -> Self {
        Self {
            known: known
                .iter()
                .map(|(address, lon, lat)| {
                    let coordinates = Coordinates::new(*lon, *lat)
                        .unwrap_or_else(|e| panic!("bad fixture for {address}: {e}"));
                    ((*address).to_string(), coordinates)
                })
                .collect(),
            ..Self::default()
        }
    }

    /// Number of calls made so far.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    /// Number of calls made for `address`.
    #[must_use]
    pub fn calls_for(&self, address: &str) -> usize {
        self.calls
            .lock()
            .map_or(0, |calls| calls.iter().filter(|a| *a == address).count())
    }
}

#[async_trait]
impl Geocoder for CountingGeocoder {
    async fn geocode(&self, address: &str) -> Result<Coordinates, GeocodeError> {
        self.total.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(address.to_string());
        }
        self.known.get(address).copied().ok_or(GeocodeError::NotFound)
    }
}

/// Cache over an empty in-memory store with default TTL and concurrency.
#[must_use]
pub fn memory_cache<G: Geocoder>(geocoder: G) -> GeocodeCache<MemoryLocationStore, G> {
    GeocodeCache::new(
        MemoryLocationStore::new(),
        geocoder,
        GeocodeCacheConfig::default(),
    )
}

/// Build a pending order.
#[must_use]
pub fn order(id: i32, address: &str, products: &[i32]) -> PendingOrder {
    PendingOrder {
        order_id: OrderId::new(id),
        address: address.to_string(),
        products: product_set(products),
    }
}

/// Build a restaurant offer.
#[must_use]
pub fn restaurant(id: i32, address: &str, products: &[i32]) -> RestaurantOffer {
    RestaurantOffer {
        restaurant_id: RestaurantId::new(id),
        name: format!("Star Burger #{id}"),
        address: address.to_string(),
        available_products: product_set(products),
    }
}

fn product_set(ids: &[i32]) -> BTreeSet<ProductId> {
    ids.iter().copied().map(ProductId::new).collect()
}
