//! Database operations for restaurants and their menus.

use std::collections::{BTreeSet, HashMap};

use sqlx::PgPool;
use star_burger_core::{ProductId, RestaurantId};

use super::RepositoryError;
use crate::matching::RestaurantOffer;
use crate::models::Restaurant;

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
pub(super) struct RestaurantRow {
    id: RestaurantId,
    name: String,
    address: String,
    contact_phone: String,
}

impl From<RestaurantRow> for Restaurant {
    fn from(row: RestaurantRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            address: row.address,
            contact_phone: row.contact_phone,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for restaurant database operations.
pub struct RestaurantRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RestaurantRepository<'a> {
    /// Create a new restaurant repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All restaurants, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Restaurant>, RepositoryError> {
        let rows = sqlx::query_as::<_, RestaurantRow>(
            "SELECT id, name, address, contact_phone FROM restaurants ORDER BY name, id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Restaurant::from).collect())
    }

    /// Every restaurant with the products it currently offers, ordered by id.
    ///
    /// Restaurants with nothing available are included with an empty set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_offers(&self) -> Result<Vec<RestaurantOffer>, RepositoryError> {
        let restaurants = sqlx::query_as::<_, RestaurantRow>(
            "SELECT id, name, address, contact_phone FROM restaurants ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;

        let pairs = sqlx::query_as::<_, (RestaurantId, ProductId)>(
            "SELECT restaurant_id, product_id FROM restaurant_menu_items WHERE availability",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(group_offers(restaurants, pairs))
    }

    /// Create a restaurant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        name: &str,
        address: &str,
        contact_phone: &str,
    ) -> Result<RestaurantId, RepositoryError> {
        let id = sqlx::query_scalar::<_, RestaurantId>(
            r"
            INSERT INTO restaurants (name, address, contact_phone)
            VALUES ($1, $2, $3)
            RETURNING id
            ",
        )
        .bind(name)
        .bind(address)
        .bind(contact_phone)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    /// Mark a product as available or not at a restaurant, creating the menu item if needed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn set_availability(
        &self,
        restaurant_id: RestaurantId,
        product_id: ProductId,
        availability: bool,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO restaurant_menu_items (restaurant_id, product_id, availability)
            VALUES ($1, $2, $3)
            ON CONFLICT (restaurant_id, product_id) DO UPDATE
            SET availability = EXCLUDED.availability
            ",
        )
        .bind(restaurant_id)
        .bind(product_id)
        .bind(availability)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}

fn group_offers(
    restaurants: Vec<RestaurantRow>,
    pairs: Vec<(RestaurantId, ProductId)>,
) -> Vec<RestaurantOffer> {
    let mut menus: HashMap<RestaurantId, BTreeSet<ProductId>> = HashMap::new();
    for (restaurant_id, product_id) in pairs {
        menus.entry(restaurant_id).or_default().insert(product_id);
    }

    restaurants
        .into_iter()
        .map(|row| RestaurantOffer {
            available_products: menus.remove(&row.id).unwrap_or_default(),
            restaurant_id: row.id,
            name: row.name,
            address: row.address,
        })
        .collect()
}
