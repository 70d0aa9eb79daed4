//! Integration tests for one matching pass over the geocode cache.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use star_burger_core::Coordinates;
use star_burger_integration_tests::{CountingGeocoder, memory_cache, order, restaurant};
use star_burger_server::config::GeocodeCacheConfig;
use star_burger_server::geo::{GeocodeCache, LocationStore, MemoryLocationStore};
use star_burger_server::matching::MatchingEngine;
use star_burger_server::models::CachedLocation;

// =============================================================================
// End-to-end
// =============================================================================

#[tokio::test]
async fn test_single_order_single_restaurant() {
    let geocoder = Arc::new(CountingGeocoder::new(&[("A", 37.0, 55.0), ("B", 37.5, 55.5)]));
    let cache = memory_cache(Arc::clone(&geocoder));

    let matches = MatchingEngine::new(&cache)
        .match_orders(&[order(1, "A", &[1])], &[restaurant(1, "B", &[1, 2])])
        .await
        .unwrap();

    assert_eq!(matches.len(), 1);
    let m = &matches[0];
    assert!(!m.unresolvable);
    assert_eq!(m.candidates.len(), 1);
    assert_eq!(m.candidates[0].restaurant_id.as_i32(), 1);

    let expected = Coordinates::new(37.0, 55.0)
        .unwrap()
        .distance_km(&Coordinates::new(37.5, 55.5).unwrap());
    assert!((m.candidates[0].distance_km - expected).abs() < 1e-9);
    assert!((60.0..70.0).contains(&m.candidates[0].distance_km));

    // Both addresses are now cached
    assert_eq!(cache.store().len(), 2);
    assert_eq!(geocoder.total(), 2);
}

#[tokio::test]
async fn test_second_pass_is_served_from_cache() {
    let geocoder = Arc::new(CountingGeocoder::new(&[("A", 37.0, 55.0), ("B", 37.5, 55.5)]));
    let cache = memory_cache(Arc::clone(&geocoder));
    let engine = MatchingEngine::new(&cache);
    let orders = [order(1, "A", &[1]), order(2, "nowhere", &[1])];
    let restaurants = [restaurant(1, "B", &[1])];

    let first = engine.match_orders(&orders, &restaurants).await.unwrap();
    let calls_after_first = geocoder.total();
    let second = engine.match_orders(&orders, &restaurants).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(geocoder.total(), calls_after_first);
    assert!(second[1].unresolvable);
}

// =============================================================================
// Subset filtering and ranking
// =============================================================================

#[tokio::test]
async fn test_subset_filtering() {
    let geocoder = CountingGeocoder::new(&[
        ("order", 37.6, 55.7),
        ("r1", 37.61, 55.71),
        ("r2", 37.6, 55.7),
        ("r3", 37.6, 55.7),
    ]);
    let cache = memory_cache(geocoder);

    let matches = MatchingEngine::new(&cache)
        .match_orders(
            &[order(1, "order", &[1, 2])],
            &[
                restaurant(1, "r1", &[1, 2, 3]),
                restaurant(2, "r2", &[1]),
                restaurant(3, "r3", &[]),
            ],
        )
        .await
        .unwrap();

    let ids: Vec<i32> = matches[0]
        .candidates
        .iter()
        .map(|c| c.restaurant_id.as_i32())
        .collect();
    assert_eq!(ids, vec![1]);
}

#[tokio::test]
async fn test_ranking_by_distance() {
    let geocoder = CountingGeocoder::new(&[
        ("origin", 0.0, 0.0),
        ("two degrees", 0.0, 2.0),
        ("one degree", 0.0, 1.0),
    ]);
    let cache = memory_cache(geocoder);

    let matches = MatchingEngine::new(&cache)
        .match_orders(
            &[order(1, "origin", &[1])],
            &[
                restaurant(1, "two degrees", &[1]),
                restaurant(2, "one degree", &[1]),
            ],
        )
        .await
        .unwrap();

    let candidates = &matches[0].candidates;
    assert_eq!(candidates[0].restaurant_id.as_i32(), 2);
    assert_eq!(candidates[1].restaurant_id.as_i32(), 1);
    assert!(candidates[0].distance_km < candidates[1].distance_km);
}

// =============================================================================
// Deduplication and short circuits
// =============================================================================

#[tokio::test]
async fn test_shared_delivery_address_is_geocoded_once() {
    let geocoder = Arc::new(CountingGeocoder::new(&[
        ("Москва, Тверская 1", 37.61, 55.76),
        ("Москва, Арбат 10", 37.59, 55.75),
    ]));
    let cache = memory_cache(Arc::clone(&geocoder));

    MatchingEngine::new(&cache)
        .match_orders(
            &[
                order(1, "Москва, Тверская 1", &[1]),
                order(2, "Москва, Тверская 1", &[1]),
            ],
            &[restaurant(1, "Москва, Арбат 10", &[1])],
        )
        .await
        .unwrap();

    assert_eq!(geocoder.calls_for("Москва, Тверская 1"), 1);
    assert_eq!(geocoder.calls_for("Москва, Арбат 10"), 1);
}

#[tokio::test]
async fn test_restaurant_at_delivery_address_is_geocoded_once() {
    let geocoder = Arc::new(CountingGeocoder::new(&[("same", 37.61, 55.76)]));
    let cache = memory_cache(Arc::clone(&geocoder));

    let matches = MatchingEngine::new(&cache)
        .match_orders(&[order(1, "same", &[1])], &[restaurant(1, " same ", &[1])])
        .await
        .unwrap();

    assert_eq!(geocoder.total(), 1);
    assert!(matches[0].candidates[0].distance_km.abs() < 1e-9);
}

#[tokio::test]
async fn test_blank_address_short_circuits() {
    let geocoder = Arc::new(CountingGeocoder::new(&[("r", 37.6, 55.7)]));
    let cache = memory_cache(Arc::clone(&geocoder));

    let matches = MatchingEngine::new(&cache)
        .match_orders(&[order(1, "  ", &[1])], &[restaurant(1, "r", &[1])])
        .await
        .unwrap();

    assert!(matches[0].unresolvable);
    assert!(matches[0].candidates.is_empty());
    // Nothing can be ranked, so the restaurant is not looked up either
    assert_eq!(geocoder.total(), 0);
}

// =============================================================================
// TTL and negative caching
// =============================================================================

fn aged(address: &str, coordinates: Option<Coordinates>, days: i64) -> CachedLocation {
    CachedLocation {
        address: address.to_string(),
        coordinates,
        resolved_at: Utc::now() - Duration::days(days),
    }
}

#[tokio::test]
async fn test_fresh_entries_skip_the_geocoder() {
    let geocoder = Arc::new(CountingGeocoder::new(&[("A", 1.0, 1.0), ("B", 2.0, 2.0)]));
    let store = MemoryLocationStore::with_entries([
        aged("A", Some(Coordinates::new(37.0, 55.0).unwrap()), 10),
        aged("B", Some(Coordinates::new(37.5, 55.5).unwrap()), 29),
    ]);
    let cache = GeocodeCache::new(store, Arc::clone(&geocoder), GeocodeCacheConfig::default());

    let matches = MatchingEngine::new(&cache)
        .match_orders(&[order(1, "A", &[1])], &[restaurant(1, "B", &[1])])
        .await
        .unwrap();

    assert_eq!(geocoder.total(), 0);
    assert!((60.0..70.0).contains(&matches[0].candidates[0].distance_km));
}

#[tokio::test]
async fn test_stale_entries_are_refetched() {
    let geocoder = Arc::new(CountingGeocoder::new(&[("A", 37.0, 55.0)]));
    let store = MemoryLocationStore::with_entries([aged("A", Some(Coordinates::new(1.0, 1.0).unwrap()), 31)]);
    let cache = GeocodeCache::new(store, Arc::clone(&geocoder), GeocodeCacheConfig::default());

    let resolved = cache.resolve("A").await.unwrap();

    assert_eq!(resolved, Some(Coordinates::new(37.0, 55.0).unwrap()));
    assert_eq!(geocoder.total(), 1);
}

#[tokio::test]
async fn test_failed_resolution_is_cached() {
    let geocoder = Arc::new(CountingGeocoder::new(&[]));
    let cache = memory_cache(Arc::clone(&geocoder));
    let before = Utc::now();

    assert_eq!(cache.resolve("nowhere").await.unwrap(), None);

    let entry = cache.store().get("nowhere").await.unwrap().unwrap();
    assert_eq!(entry.coordinates, None);
    assert!(entry.resolved_at >= before);

    assert_eq!(cache.resolve("nowhere").await.unwrap(), None);
    assert_eq!(geocoder.total(), 1);
}

#[tokio::test]
async fn test_shorter_ttl_is_honored() {
    let geocoder = Arc::new(CountingGeocoder::new(&[("A", 37.0, 55.0)]));
    let store = MemoryLocationStore::with_entries([aged("A", None, 2)]);
    let config = GeocodeCacheConfig {
        ttl: Duration::days(1),
        concurrency: 2,
    };
    let cache = GeocodeCache::new(store, Arc::clone(&geocoder), config);

    assert!(cache.resolve("A").await.unwrap().is_some());
    assert_eq!(geocoder.total(), 1);
}
