//! Catalog models.

use serde::Serialize;
use star_burger_core::{CategoryId, Price, ProductId};

use super::Restaurant;

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// A product on the menu.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub special_status: bool,
    pub description: String,
    pub category: Option<Category>,
    /// Image path relative to the media root.
    pub image: Option<String>,
}

/// Which restaurants currently offer which products.
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityMatrix {
    /// Column order for every row's `available_at`.
    pub restaurants: Vec<Restaurant>,
    pub rows: Vec<AvailabilityRow>,
}

/// One product's availability across all restaurants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailabilityRow {
    pub product_id: ProductId,
    pub product_name: String,
    pub available_at: Vec<bool>,
}
