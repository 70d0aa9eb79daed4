//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::db::LocationRepository;
use crate::geo::{GeocodeCache, GeocodeError, YandexGeocoder};

/// Geocode cache backed by `PostgreSQL` and the Yandex Geocoder.
pub type LocationCache = GeocodeCache<LocationRepository, YandexGeocoder>;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pool: PgPool,
    locations: LocationCache,
}

impl AppState {
    /// Build the state, wiring the geocode cache to the pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the geocoder client cannot be built.
    pub fn new(config: &ServerConfig, pool: PgPool) -> Result<Self, GeocodeError> {
        let geocoder = YandexGeocoder::new(&config.geocoder)?;
        let locations = GeocodeCache::new(
            LocationRepository::new(pool.clone()),
            geocoder,
            config.geocode_cache,
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                pool,
                locations,
            }),
        })
    }

    /// Get a reference to the database pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the geocode cache.
    #[must_use]
    pub fn locations(&self) -> &LocationCache {
        &self.inner.locations
    }
}
