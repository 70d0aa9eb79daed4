//! Database operations for the geocode cache.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use star_burger_core::Coordinates;
use tracing::instrument;

use super::RepositoryError;
use crate::geo::LocationStore;
use crate::models::CachedLocation;

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct LocationRow {
    address: String,
    lon: Option<f64>,
    lat: Option<f64>,
    resolved_at: DateTime<Utc>,
}

impl TryFrom<LocationRow> for CachedLocation {
    type Error = RepositoryError;

    fn try_from(row: LocationRow) -> Result<Self, Self::Error> {
        let coordinates = match (row.lon, row.lat) {
            (Some(lon), Some(lat)) => Some(Coordinates::new(lon, lat).map_err(|e| {
                RepositoryError::DataCorruption(format!("location {:?}: {e}", row.address))
            })?),
            (None, None) => None,
            _ => {
                return Err(RepositoryError::DataCorruption(format!(
                    "location {:?} has only one coordinate",
                    row.address
                )));
            }
        };

        Ok(Self {
            address: row.address,
            coordinates,
            resolved_at: row.resolved_at,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the `locations` table.
///
/// Holds its own pool handle so it can live inside the long-lived geocode cache.
#[derive(Clone)]
pub struct LocationRepository {
    pool: PgPool,
}

impl LocationRepository {
    /// Create a new location repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete entries last resolved before `cutoff`.
    ///
    /// Returns the number of deleted entries.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn prune_resolved_before(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM locations WHERE resolved_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl LocationStore for LocationRepository {
    async fn get(&self, address: &str) -> Result<Option<CachedLocation>, RepositoryError> {
        let row = sqlx::query_as::<_, LocationRow>(
            r"
            SELECT address, lon, lat, resolved_at
            FROM locations
            WHERE address = $1
            ",
        )
        .bind(address)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CachedLocation::try_from).transpose()
    }

    async fn upsert(
        &self,
        address: &str,
        coordinates: Option<Coordinates>,
        resolved_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO locations (address, lon, lat, resolved_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (address) DO UPDATE
            SET lon = EXCLUDED.lon, lat = EXCLUDED.lat, resolved_at = EXCLUDED.resolved_at
            ",
        )
        .bind(address)
        .bind(coordinates.map(|c| c.lon))
        .bind(coordinates.map(|c| c.lat))
        .bind(resolved_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn filter_by_addresses(
        &self,
        addresses: &[String],
    ) -> Result<Vec<CachedLocation>, RepositoryError> {
        let rows = sqlx::query_as::<_, LocationRow>(
            r"
            SELECT address, lon, lat, resolved_at
            FROM locations
            WHERE address = ANY($1)
            ",
        )
        .bind(addresses)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CachedLocation::try_from).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn row(lon: Option<f64>, lat: Option<f64>) -> LocationRow {
        LocationRow {
            address: "Москва, Арбат 1".to_string(),
            lon,
            lat,
            resolved_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_with_coordinates() {
        let entry = CachedLocation::try_from(row(Some(37.59), Some(55.75))).unwrap();
        assert_eq!(entry.coordinates, Some(Coordinates::new(37.59, 55.75).unwrap()));
    }

    #[test]
    fn test_row_failure_marker() {
        let entry = CachedLocation::try_from(row(None, None)).unwrap();
        assert_eq!(entry.coordinates, None);
    }

    #[test]
    fn test_row_corruption() {
        assert!(matches!(
            CachedLocation::try_from(row(Some(37.59), None)),
            Err(RepositoryError::DataCorruption(_))
        ));
        assert!(matches!(
            CachedLocation::try_from(row(Some(500.0), Some(55.0))),
            Err(RepositoryError::DataCorruption(_))
        ));
    }
}
