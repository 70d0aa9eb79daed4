//! Storefront API handlers.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;
use star_burger_core::OrderId;

use crate::{
    db::{OrderRepository, ProductRepository},
    error::AppError,
    models::{NewOrder, OrderValidationError, Product},
    state::AppState,
};

/// Build the storefront API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/banners", get(banners))
        .route("/api/products", get(products))
        .route("/api/order", post(register_order))
}

/// A promo banner on the landing page.
#[derive(Debug, Clone, Serialize)]
pub struct Banner {
    pub title: &'static str,
    pub src: &'static str,
    pub text: &'static str,
}

const BANNERS: [Banner; 3] = [
    Banner {
        title: "Burger",
        src: "/static/burger.jpg",
        text: "Tasty Burger at your door step",
    },
    Banner {
        title: "Spices",
        src: "/static/food.jpg",
        text: "All Cuisines",
    },
    Banner {
        title: "New York",
        src: "/static/tasty.jpg",
        text: "Food is incomplete without a tasty dessert",
    },
];

/// Response for a registered order.
#[derive(Debug, Serialize)]
pub struct OrderCreated {
    pub order_id: OrderId,
}

/// Promo banners.
pub async fn banners() -> Json<[Banner; 3]> {
    Json(BANNERS)
}

/// Products currently offered by at least one restaurant.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, AppError> {
    let products = ProductRepository::new(state.pool()).list_available().await?;
    Ok(Json(products))
}

/// Register an order from the storefront.
///
/// # Errors
///
/// Returns `400` for an invalid order or an unknown product, `500` if the
/// database fails.
pub async fn register_order(
    State(state): State<AppState>,
    Json(order): Json<NewOrder>,
) -> Result<(StatusCode, Json<OrderCreated>), AppError> {
    order.validate()?;

    let ids = order.product_ids();
    let prices = ProductRepository::new(state.pool()).prices(&ids).await?;
    if let Some(unknown) = ids.iter().find(|id| !prices.contains_key(*id)) {
        return Err(OrderValidationError::UnknownProduct(*unknown).into());
    }

    let order_id = OrderRepository::new(state.pool()).create(&order).await?;
    Ok((StatusCode::CREATED, Json(OrderCreated { order_id })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_banners_payload() {
        let Json(banners) = banners().await;
        let json = serde_json::to_value(banners).unwrap();

        assert_eq!(json.as_array().unwrap().len(), 3);
        assert_eq!(json[0]["title"], "Burger");
        assert_eq!(json[2]["src"], "/static/tasty.jpg");
    }
}
