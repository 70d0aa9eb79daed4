//! Order models.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use star_burger_core::{OrderId, OrderStatus, PaymentMethod, ProductId, RestaurantId};
use thiserror::Error;

/// Reasons an incoming order is rejected before it reaches the database.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderValidationError {
    #[error("products: list must not be empty")]
    EmptyProducts,

    #[error("products: quantity for product {0} must be at least 1")]
    ZeroQuantity(ProductId),

    #[error("products: product {0} is listed more than once")]
    DuplicateProduct(ProductId),

    #[error("products: unknown product {0}")]
    UnknownProduct(ProductId),

    #[error("{0}: must not be blank")]
    BlankField(&'static str),

    #[error("{0}: must be at most {1} characters")]
    TooLong(&'static str, usize),
}

/// Column widths of the `orders` table.
const MAX_NAME_CHARS: usize = 50;
const MAX_PHONE_CHARS: usize = 32;
const MAX_ADDRESS_CHARS: usize = 200;

/// One line of an incoming order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewOrderItem {
    #[serde(rename = "product")]
    pub product_id: ProductId,
    pub quantity: u32,
}

/// An order as submitted by the storefront.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    pub phonenumber: String,
    /// Delivery address; may be blank, in which case the order cannot be matched.
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default = "default_payment_method")]
    pub payment_method: PaymentMethod,
    #[serde(rename = "products")]
    pub items: Vec<NewOrderItem>,
}

const fn default_payment_method() -> PaymentMethod {
    PaymentMethod::Cash
}

impl NewOrder {
    /// Check the parts of the order that do not need the database.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), OrderValidationError> {
        if self.firstname.trim().is_empty() {
            return Err(OrderValidationError::BlankField("firstname"));
        }
        if self.phonenumber.trim().is_empty() {
            return Err(OrderValidationError::BlankField("phonenumber"));
        }
        for (field, value, max) in [
            ("firstname", &self.firstname, MAX_NAME_CHARS),
            ("lastname", &self.lastname, MAX_NAME_CHARS),
            ("phonenumber", &self.phonenumber, MAX_PHONE_CHARS),
            ("address", &self.address, MAX_ADDRESS_CHARS),
        ] {
            if value.trim().chars().count() > max {
                return Err(OrderValidationError::TooLong(field, max));
            }
        }
        if self.items.is_empty() {
            return Err(OrderValidationError::EmptyProducts);
        }

        let mut seen = HashSet::with_capacity(self.items.len());
        for item in &self.items {
            if item.quantity == 0 {
                return Err(OrderValidationError::ZeroQuantity(item.product_id));
            }
            if !seen.insert(item.product_id) {
                return Err(OrderValidationError::DuplicateProduct(item.product_id));
            }
        }

        Ok(())
    }

    /// Distinct product ids in this order.
    #[must_use]
    pub fn product_ids(&self) -> Vec<ProductId> {
        self.items
            .iter()
            .map(|item| item.product_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// An order still on the staff dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct UnfinishedOrder {
    pub id: OrderId,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub firstname: String,
    pub lastname: String,
    pub phonenumber: String,
    pub address: String,
    pub comment: String,
    /// Sum of quantity × snapshotted price over all items.
    pub total_cost: Decimal,
    pub registered_at: DateTime<Utc>,
    pub cooking_restaurant_id: Option<RestaurantId>,
    /// Products the order needs, ignoring quantities.
    pub product_ids: BTreeSet<ProductId>,
}
