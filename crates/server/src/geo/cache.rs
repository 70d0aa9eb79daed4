//! Read-through geocode cache.
//!
//! Entries live in a [`LocationStore`] keyed by normalized address. An entry
//! younger than the TTL is used as-is, including entries that record a failed
//! resolution, so a bad address costs at most one provider call per TTL window.
//! Stale or missing entries are re-resolved through the [`Geocoder`] and the
//! outcome (coordinates or failure) is written back with a fresh timestamp.
//!
//! Concurrent resolutions of the same address are serialized through a
//! per-address lock; whoever gets the lock second re-reads the store and reuses
//! the first caller's result.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use moka::future::Cache;
use star_burger_core::Coordinates;
use tokio::sync::Mutex;
use tracing::instrument;

use super::client::Geocoder;
use super::store::LocationStore;
use crate::config::GeocodeCacheConfig;
use crate::db::RepositoryError;

const MAX_TRACKED_ADDRESSES: u64 = 10_000;
const ADDRESS_LOCK_IDLE: StdDuration = StdDuration::from_secs(300);

/// Normalize an address for use as a cache key.
///
/// Returns `None` for empty or whitespace-only input.
#[must_use]
pub fn normalize_address(address: &str) -> Option<String> {
    let trimmed = address.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Geocode cache over a store `S` and a provider `G`.
pub struct GeocodeCache<S, G> {
    inner: Arc<GeocodeCacheInner<S, G>>,
}

struct GeocodeCacheInner<S, G> {
    store: S,
    geocoder: G,
    ttl: Duration,
    concurrency: usize,
    address_locks: Cache<String, Arc<Mutex<()>>>,
}

impl<S, G> Clone for GeocodeCache<S, G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, G> GeocodeCache<S, G>
where
    S: LocationStore,
    G: Geocoder,
{
    /// Create a cache.
    #[must_use]
    pub fn new(store: S, geocoder: G, config: GeocodeCacheConfig) -> Self {
        let address_locks = Cache::builder()
            .max_capacity(MAX_TRACKED_ADDRESSES)
            .time_to_idle(ADDRESS_LOCK_IDLE)
            .build();

        Self {
            inner: Arc::new(GeocodeCacheInner {
                store,
                geocoder,
                ttl: config.ttl,
                concurrency: config.concurrency.max(1),
                address_locks,
            }),
        }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Resolve one address.
    ///
    /// `Ok(None)` means the address is blank or could not be geocoded as of
    /// this call.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store fails.
    #[instrument(skip(self))]
    pub async fn resolve(&self, address: &str) -> Result<Option<Coordinates>, RepositoryError> {
        let Some(key) = normalize_address(address) else {
            return Ok(None);
        };

        let now = Utc::now();
        let cached = self.inner.store.get(&key).await?;
        if let Some(entry) = cached.filter(|entry| entry.is_fresh(now, self.inner.ttl)) {
            return Ok(entry.coordinates);
        }

        self.refresh(&key, false).await
    }

    /// Resolve a batch of addresses, each distinct normalized address once.
    ///
    /// The returned map is keyed by normalized address and holds an entry for
    /// every non-blank input. Existing entries are loaded with a single store
    /// query; the rest are resolved concurrently.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    #[instrument(skip_all)]
    pub async fn resolve_many<'a, I>(
        &self,
        addresses: I,
    ) -> Result<HashMap<String, Option<Coordinates>>, RepositoryError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let keys: Vec<String> = addresses
            .into_iter()
            .filter_map(normalize_address)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let now = Utc::now();
        let mut resolved: HashMap<String, Option<Coordinates>> = self
            .inner
            .store
            .filter_by_addresses(&keys)
            .await?
            .into_iter()
            .filter(|entry| entry.is_fresh(now, self.inner.ttl))
            .map(|entry| (entry.address, entry.coordinates))
            .collect();

        let total = keys.len();
        let missing: Vec<String> = keys
            .into_iter()
            .filter(|k| !resolved.contains_key(k))
            .collect();
        tracing::debug!(
            total,
            cached = resolved.len(),
            missing = missing.len(),
            "Resolving addresses"
        );

        // Each future owns its key and a handle to the cache
        let fetched: Vec<(String, Option<Coordinates>)> = stream::iter(missing)
            .map(|key| {
                let this = self.clone();
                async move {
                    this.refresh(&key, false)
                        .await
                        .map(|coordinates| (key, coordinates))
                }
            })
            .buffer_unordered(self.inner.concurrency)
            .try_collect()
            .await?;

        resolved.extend(fetched);
        Ok(resolved)
    }

    /// Re-resolve an address now, ignoring any fresh entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    #[instrument(skip(self))]
    pub async fn invalidate(&self, address: &str) -> Result<Option<Coordinates>, RepositoryError> {
        let Some(key) = normalize_address(address) else {
            return Ok(None);
        };
        self.refresh(&key, true).await
    }

    /// Fetch from the provider under the per-address lock and persist the outcome.
    ///
    /// With `force`, only an entry written after this call started is reused.
    async fn refresh(&self, key: &str, force: bool) -> Result<Option<Coordinates>, RepositoryError> {
        let requested_at = Utc::now();
        let lock = self
            .inner
            .address_locks
            .get_with(key.to_string(), async { Arc::new(Mutex::new(())) })
            .await;
        let _guard = lock.lock().await;

        if let Some(entry) = self.inner.store.get(key).await? {
            let reusable = if force {
                entry.resolved_at >= requested_at
            } else {
                entry.is_fresh(Utc::now(), self.inner.ttl)
            };
            if reusable {
                return Ok(entry.coordinates);
            }
        }

        let coordinates = match self.inner.geocoder.geocode(key).await {
            Ok(coordinates) => Some(coordinates),
            Err(e) => {
                // Addresses are customer data; keep them out of Sentry events
                tracing::debug!(address = %key, error = %e, "Geocoding failed, caching failure");
                None
            }
        };

        self.inner.store.upsert(key, coordinates, Utc::now()).await?;
        Ok(coordinates)
    }
}
