//! Restaurant models.

use serde::Serialize;
use star_burger_core::RestaurantId;

/// A restaurant that can cook orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Restaurant {
    pub id: RestaurantId,
    pub name: String,
    pub address: String,
    pub contact_phone: String,
}
