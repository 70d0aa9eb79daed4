//! Database operations for orders.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use star_burger_core::{OrderId, OrderStatus, PaymentMethod, ProductId, RestaurantId};
use tracing::instrument;

use super::RepositoryError;
use crate::models::{NewOrder, UnfinishedOrder};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct UnfinishedOrderRow {
    id: OrderId,
    status: String,
    payment_method: String,
    firstname: String,
    lastname: String,
    phonenumber: String,
    address: String,
    comment: String,
    registered_at: DateTime<Utc>,
    cooking_restaurant_id: Option<RestaurantId>,
    total_cost: Decimal,
    product_ids: Vec<i32>,
}

impl TryFrom<UnfinishedOrderRow> for UnfinishedOrder {
    type Error = RepositoryError;

    fn try_from(row: UnfinishedOrderRow) -> Result<Self, Self::Error> {
        let status: OrderStatus = row
            .status
            .parse()
            .map_err(|e| RepositoryError::DataCorruption(format!("order {}: {e}", row.id)))?;
        let payment_method: PaymentMethod = row
            .payment_method
            .parse()
            .map_err(|e| RepositoryError::DataCorruption(format!("order {}: {e}", row.id)))?;

        Ok(Self {
            id: row.id,
            status,
            payment_method,
            firstname: row.firstname,
            lastname: row.lastname,
            phonenumber: row.phonenumber,
            address: row.address,
            comment: row.comment,
            total_cost: row.total_cost,
            registered_at: row.registered_at,
            cooking_restaurant_id: row.cooking_restaurant_id,
            product_ids: row.product_ids.into_iter().map(ProductId::new).collect::<BTreeSet<_>>(),
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order and its items in one transaction.
    ///
    /// Each item's price is copied from the product's current price, so later
    /// menu changes do not alter the order's total.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if an item references an unknown
    /// product, or `RepositoryError::Database` if a query fails.
    #[instrument(skip(self, order), fields(items = order.items.len()))]
    pub async fn create(&self, order: &NewOrder) -> Result<OrderId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let order_id = sqlx::query_scalar::<_, OrderId>(
            r"
            INSERT INTO orders (firstname, lastname, phonenumber, address, comment, payment_method)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            ",
        )
        .bind(order.firstname.trim())
        .bind(order.lastname.trim())
        .bind(order.phonenumber.trim())
        .bind(order.address.trim())
        .bind(&order.comment)
        .bind(order.payment_method.to_string())
        .fetch_one(&mut *tx)
        .await?;

        for item in &order.items {
            let quantity = i32::try_from(item.quantity).map_err(|_| {
                RepositoryError::Conflict(format!("quantity {} is too large", item.quantity))
            })?;

            let inserted = sqlx::query(
                r"
                INSERT INTO order_items (order_id, product_id, quantity, price)
                SELECT $1, p.id, $3, p.price
                FROM products p
                WHERE p.id = $2
                ",
            )
            .bind(order_id)
            .bind(item.product_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;

            if inserted.rows_affected() == 0 {
                return Err(RepositoryError::Conflict(format!(
                    "unknown product {}",
                    item.product_id
                )));
            }
        }

        tx.commit().await?;
        tracing::info!(order_id = %order_id, "Order registered");
        Ok(order_id)
    }

    /// Orders not yet finished, in dashboard order.
    ///
    /// New orders come first, then assembling, then delivering; within a
    /// status, the oldest order comes first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, or
    /// `RepositoryError::DataCorruption` if a stored status is unknown.
    pub async fn list_unfinished(&self) -> Result<Vec<UnfinishedOrder>, RepositoryError> {
        let rows = sqlx::query_as::<_, UnfinishedOrderRow>(
            r"
            SELECT o.id, o.status, o.payment_method, o.firstname, o.lastname,
                   o.phonenumber, o.address, o.comment, o.registered_at,
                   o.cooking_restaurant_id,
                   COALESCE(SUM(i.quantity * i.price), 0) AS total_cost,
                   COALESCE(
                       ARRAY_AGG(i.product_id) FILTER (WHERE i.product_id IS NOT NULL),
                       '{}'
                   ) AS product_ids
            FROM orders o
            LEFT JOIN order_items i ON i.order_id = o.id
            WHERE o.status <> 'FINISHED'
            GROUP BY o.id
            ORDER BY o.registered_at, o.id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        let mut orders = rows
            .into_iter()
            .map(UnfinishedOrder::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        sort_for_dashboard(&mut orders);
        Ok(orders)
    }

    /// Set the restaurant cooking an order. A new order moves to assembling.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist or is
    /// finished, `RepositoryError::Conflict` if the restaurant does not exist.
    #[instrument(skip(self))]
    pub async fn assign_restaurant(
        &self,
        order_id: OrderId,
        restaurant_id: RestaurantId,
    ) -> Result<OrderStatus, RepositoryError> {
        let status = sqlx::query_scalar::<_, String>(
            r"
            UPDATE orders
            SET cooking_restaurant_id = $2,
                status = CASE WHEN status = 'NEW' THEN 'ASSEMBLING' ELSE status END
            WHERE id = $1 AND status <> 'FINISHED'
            RETURNING status
            ",
        )
        .bind(order_id)
        .bind(restaurant_id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_foreign_key_violation() => {
                RepositoryError::Conflict(format!("unknown restaurant {restaurant_id}"))
            }
            _ => RepositoryError::Database(e),
        })?
        .ok_or(RepositoryError::NotFound)?;

        status
            .parse()
            .map_err(|e| RepositoryError::DataCorruption(format!("order {order_id}: {e}")))
    }
}

/// Stable sort by status priority; callers pass orders already sorted by age.
fn sort_for_dashboard(orders: &mut [UnfinishedOrder]) {
    orders.sort_by_key(|order| order.status.dashboard_priority().unwrap_or(u8::MAX));
}
