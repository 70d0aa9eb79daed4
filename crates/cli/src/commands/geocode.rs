//! Geocode cache commands.

use chrono::{DateTime, Duration, Utc};
use star_burger_server::config::ServerConfig;
use star_burger_server::db::{self, LocationRepository};
use star_burger_server::geo::{GeocodeCache, YandexGeocoder};
use tracing::{info, warn};

/// Resolve an address through the cache and log the outcome.
///
/// # Errors
///
/// Returns an error if configuration is missing, the database is unreachable
/// or the geocoder client cannot be built. A failed lookup is not an error.
pub async fn resolve(address: &str, refresh: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;
    for warning in &config.warnings {
        warn!("{warning}");
    }
    let pool = db::create_pool(&config.database_url).await?;

    let cache = GeocodeCache::new(
        LocationRepository::new(pool),
        YandexGeocoder::new(&config.geocoder)?,
        config.geocode_cache,
    );

    let coordinates = if refresh {
        cache.invalidate(address).await?
    } else {
        cache.resolve(address).await?
    };

    match coordinates {
        Some(c) => info!(address, lon = c.lon, lat = c.lat, "Resolved"),
        None => info!(address, "Address could not be resolved (cached as failure)"),
    }

    Ok(())
}

/// Delete cache entries last resolved more than `older_than_days` days ago.
///
/// # Errors
///
/// Returns an error if `DATABASE_URL` is missing or the delete fails.
pub async fn prune(older_than_days: u32) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")
        .map(secrecy::SecretString::from)
        .map_err(|_| "DATABASE_URL not set")?;
    let pool = db::create_pool(&database_url).await?;

    let cutoff = prune_cutoff(Utc::now(), older_than_days).ok_or("older-than-days is out of range")?;
    let deleted = LocationRepository::new(pool)
        .prune_resolved_before(cutoff)
        .await?;

    info!(deleted, %cutoff, "Pruned geocode cache");
    Ok(())
}

fn prune_cutoff(now: DateTime<Utc>, older_than_days: u32) -> Option<DateTime<Utc>> {
    Duration::try_days(i64::from(older_than_days)).and_then(|age| now.checked_sub_signed(age))
}
