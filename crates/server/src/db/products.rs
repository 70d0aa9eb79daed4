//! Database operations for the product catalog.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use sqlx::PgPool;
use star_burger_core::{CategoryId, Price, ProductId, RestaurantId};

use super::RepositoryError;
use super::restaurants::RestaurantRow;
use crate::models::{AvailabilityMatrix, AvailabilityRow, Category, Product, Restaurant};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    price: Decimal,
    special_status: bool,
    description: String,
    image: Option<String>,
    category_id: Option<CategoryId>,
    category_name: Option<String>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("product {}: {e}", row.id))
        })?;

        let category = match (row.category_id, row.category_name) {
            (Some(id), Some(name)) => Some(Category { id, name }),
            _ => None,
        };

        Ok(Self {
            id: row.id,
            name: row.name,
            price,
            special_status: row.special_status,
            description: row.description,
            category,
            image: row.image,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PriceRow {
    id: ProductId,
    price: Decimal,
}

#[derive(Debug, sqlx::FromRow)]
struct MenuPairRow {
    restaurant_id: RestaurantId,
    product_id: ProductId,
}

/// Fields for a new catalog product.
#[derive(Debug, Clone)]
pub struct CreateProduct {
    pub name: String,
    pub category_id: Option<CategoryId>,
    pub price: Price,
    pub special_status: bool,
    pub description: String,
    pub image: Option<String>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Products offered by at least one restaurant, with their categories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_available(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT p.id, p.name, p.price, p.special_status, p.description, p.image,
                   c.id AS category_id, c.name AS category_name
            FROM products p
            LEFT JOIN product_categories c ON c.id = p.category_id
            WHERE EXISTS (
                SELECT 1 FROM restaurant_menu_items m
                WHERE m.product_id = p.id AND m.availability
            )
            ORDER BY p.id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    /// Current prices for the given products. Unknown ids are absent from the map.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, or
    /// `RepositoryError::DataCorruption` if a stored price is invalid.
    pub async fn prices(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, Price>, RepositoryError> {
        let raw: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let rows = sqlx::query_as::<_, PriceRow>("SELECT id, price FROM products WHERE id = ANY($1)")
            .bind(raw)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                Price::new(row.price)
                    .map(|price| (row.id, price))
                    .map_err(|e| RepositoryError::DataCorruption(format!("product {}: {e}", row.id)))
            })
            .collect()
    }

    /// Product × restaurant availability for the staff dashboard.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn availability_matrix(&self) -> Result<AvailabilityMatrix, RepositoryError> {
        let restaurants: Vec<Restaurant> = sqlx::query_as::<_, RestaurantRow>(
            "SELECT id, name, address, contact_phone FROM restaurants ORDER BY name, id",
        )
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(Restaurant::from)
        .collect();

        let products = sqlx::query_as::<_, (ProductId, String)>("SELECT id, name FROM products ORDER BY id")
            .fetch_all(self.pool)
            .await?;

        let available: HashSet<(RestaurantId, ProductId)> = sqlx::query_as::<_, MenuPairRow>(
            "SELECT restaurant_id, product_id FROM restaurant_menu_items WHERE availability",
        )
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(|row| (row.restaurant_id, row.product_id))
        .collect();

        Ok(build_matrix(restaurants, products, &available))
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_category(&self, name: &str) -> Result<CategoryId, RepositoryError> {
        let id = sqlx::query_scalar::<_, CategoryId>(
            "INSERT INTO product_categories (name) VALUES ($1) RETURNING id",
        )
        .bind(name)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, product: &CreateProduct) -> Result<ProductId, RepositoryError> {
        let id = sqlx::query_scalar::<_, ProductId>(
            r"
            INSERT INTO products (name, category_id, price, special_status, description, image)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            ",
        )
        .bind(&product.name)
        .bind(product.category_id)
        .bind(product.price.amount())
        .bind(product.special_status)
        .bind(&product.description)
        .bind(product.image.as_deref())
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }
}

fn build_matrix(
    restaurants: Vec<Restaurant>,
    products: Vec<(ProductId, String)>,
    available: &HashSet<(RestaurantId, ProductId)>,
) -> AvailabilityMatrix {
    let rows = products
        .into_iter()
        .map(|(product_id, product_name)| AvailabilityRow {
            available_at: restaurants
                .iter()
                .map(|r| available.contains(&(r.id, product_id)))
                .collect(),
            product_id,
            product_name,
        })
        .collect();

    AvailabilityMatrix { restaurants, rows }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn restaurant(id: i32, name: &str) -> Restaurant {
        Restaurant {
            id: RestaurantId::new(id),
            name: name.to_string(),
            address: String::new(),
            contact_phone: String::new(),
        }
    }

    #[test]
    fn test_build_matrix_aligns_columns() {
        let available = HashSet::from([
            (RestaurantId::new(2), ProductId::new(10)),
            (RestaurantId::new(1), ProductId::new(11)),
        ]);

        let matrix = build_matrix(
            vec![restaurant(2, "Арбат"), restaurant(1, "Тверская")],
            vec![
                (ProductId::new(10), "Чизбургер".to_string()),
                (ProductId::new(11), "Картофель фри".to_string()),
            ],
            &available,
        );

        assert_eq!(matrix.rows[0].available_at, vec![true, false]);
        assert_eq!(matrix.rows[1].available_at, vec![false, true]);
    }

    #[test]
    fn test_product_row_without_category() {
        let product = Product::try_from(ProductRow {
            id: ProductId::new(1),
            name: "Чизбургер".to_string(),
            price: Decimal::new(35_000, 2),
            special_status: false,
            description: String::new(),
            image: None,
            category_id: None,
            category_name: None,
        })
        .unwrap();

        assert!(product.category.is_none());
        assert_eq!(product.price.amount(), Decimal::new(35_000, 2));
    }

    #[test]
    fn test_product_row_negative_price_is_corruption() {
        let result = Product::try_from(ProductRow {
            id: ProductId::new(1),
            name: "Чизбургер".to_string(),
            price: Decimal::new(-1, 0),
            special_status: false,
            description: String::new(),
            image: None,
            category_id: None,
            category_name: None,
        });

        assert!(matches!(result, Err(RepositoryError::DataCorruption(_))));
    }
}
