//! Persistent storage for geocode cache entries.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use star_burger_core::Coordinates;

use crate::db::RepositoryError;
use crate::models::CachedLocation;

/// Record store keyed by normalized address.
///
/// Errors are store-level failures and abort the whole matching pass.
#[async_trait]
pub trait LocationStore: Send + Sync {
    /// Fetch the entry for `address`, if one was ever written.
    async fn get(&self, address: &str) -> Result<Option<CachedLocation>, RepositoryError>;

    /// Create or overwrite the entry for `address`.
    async fn upsert(
        &self,
        address: &str,
        coordinates: Option<Coordinates>,
        resolved_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Fetch all existing entries whose address is in `addresses`.
    async fn filter_by_addresses(
        &self,
        addresses: &[String],
    ) -> Result<Vec<CachedLocation>, RepositoryError>;
}

/// In-process [`LocationStore`] for tests and one-off tooling.
#[derive(Debug, Default)]
pub struct MemoryLocationStore {
    entries: Mutex<HashMap<String, CachedLocation>>,
}

impl MemoryLocationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-built entries, replacing any with the same address.
    #[must_use]
    pub fn with_entries(entries: impl IntoIterator<Item = CachedLocation>) -> Self {
        let map = entries
            .into_iter()
            .map(|entry| (entry.address.clone(), entry))
            .collect();
        Self {
            entries: Mutex::new(map),
        }
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().map_or(0, |entries| entries.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, CachedLocation>>, RepositoryError> {
        self.entries
            .lock()
            .map_err(|_| RepositoryError::DataCorruption("location store lock poisoned".to_string()))
    }
}

#[async_trait]
impl LocationStore for MemoryLocationStore {
    async fn get(&self, address: &str) -> Result<Option<CachedLocation>, RepositoryError> {
        Ok(self.lock()?.get(address).cloned())
    }

    async fn upsert(
        &self,
        address: &str,
        coordinates: Option<Coordinates>,
        resolved_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.lock()?.insert(
            address.to_string(),
            CachedLocation {
                address: address.to_string(),
                coordinates,
                resolved_at,
            },
        );
        Ok(())
    }

    async fn filter_by_addresses(
        &self,
        addresses: &[String],
    ) -> Result<Vec<CachedLocation>, RepositoryError> {
        let entries = self.lock()?;
        Ok(addresses
            .iter()
            .filter_map(|address| entries.get(address).cloned())
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_overwrites_in_place() {
        let store = MemoryLocationStore::new();
        let first = Utc::now() - chrono::Duration::days(40);
        let second = Utc::now();
        let coords = Coordinates::new(37.6, 55.7).unwrap();

        store.upsert("Москва", None, first).await.unwrap();
        store.upsert("Москва", Some(coords), second).await.unwrap();

        let entry = store.get("Москва").await.unwrap().unwrap();
        assert_eq!(entry.coordinates, Some(coords));
        assert_eq!(entry.resolved_at, second);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_filter_by_addresses_skips_unknown() {
        let store = MemoryLocationStore::new();
        store.upsert("A", None, Utc::now()).await.unwrap();
        store.upsert("B", None, Utc::now()).await.unwrap();

        let found = store
            .filter_by_addresses(&["A".to_string(), "C".to_string()])
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].address, "A");
    }
}
