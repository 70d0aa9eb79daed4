//! Staff dashboard handlers.
//!
//! The orders view runs one matching pass per request over every unfinished
//! order that has no cooking restaurant yet.

use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use star_burger_core::{OrderId, OrderStatus, RestaurantId};

use crate::{
    db::{OrderRepository, ProductRepository, RestaurantRepository},
    error::AppError,
    matching::{MatchingEngine, OrderMatch, PendingOrder, RankedRestaurant},
    models::{AvailabilityMatrix, Restaurant, UnfinishedOrder},
    state::AppState,
};

/// Build the staff dashboard router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/manager/orders", get(orders))
        .route("/manager/orders/{id}/restaurant", post(assign_restaurant))
        .route("/manager/products", get(products))
        .route("/manager/restaurants", get(restaurants))
}

/// One row of the orders dashboard.
#[derive(Debug, Serialize)]
pub struct DashboardOrder {
    #[serde(flatten)]
    pub order: UnfinishedOrder,
    /// Candidate restaurants, nearest first. Empty once a restaurant is assigned.
    pub restaurants: Vec<RankedRestaurant>,
    /// No delivery route found for an unassigned order.
    pub unresolvable: bool,
}

/// Request body for assigning a restaurant.
#[derive(Debug, Deserialize)]
pub struct AssignRestaurant {
    pub restaurant_id: RestaurantId,
}

/// Response after assigning a restaurant.
#[derive(Debug, Serialize)]
pub struct AssignedRestaurant {
    pub order_id: OrderId,
    pub restaurant_id: RestaurantId,
    pub status: OrderStatus,
}

/// Unfinished orders with their restaurant candidates.
///
/// # Errors
///
/// Returns an error if the database or the location store fails.
pub async fn orders(State(state): State<AppState>) -> Result<Json<Vec<DashboardOrder>>, AppError> {
    let orders = OrderRepository::new(state.pool()).list_unfinished().await?;
    let offers = RestaurantRepository::new(state.pool()).list_offers().await?;

    let pending: Vec<PendingOrder> = orders
        .iter()
        .filter(|order| order.cooking_restaurant_id.is_none())
        .map(|order| PendingOrder {
            order_id: order.id,
            address: order.address.clone(),
            products: order.product_ids.clone(),
        })
        .collect();

    let matches = MatchingEngine::new(state.locations())
        .match_orders(&pending, &offers)
        .await?;

    Ok(Json(dashboard_rows(orders, matches)))
}

/// Assign the restaurant that will cook an order.
///
/// # Errors
///
/// Returns `404` if the order does not exist or is finished, `409` if the
/// restaurant does not exist.
pub async fn assign_restaurant(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
    Json(body): Json<AssignRestaurant>,
) -> Result<Json<AssignedRestaurant>, AppError> {
    let order_id = OrderId::new(order_id);
    let status = OrderRepository::new(state.pool())
        .assign_restaurant(order_id, body.restaurant_id)
        .await?;

    tracing::info!(order_id = %order_id, restaurant_id = %body.restaurant_id, %status, "Restaurant assigned");

    Ok(Json(AssignedRestaurant {
        order_id,
        restaurant_id: body.restaurant_id,
        status,
    }))
}

/// Product availability across restaurants.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn products(State(state): State<AppState>) -> Result<Json<AvailabilityMatrix>, AppError> {
    let matrix = ProductRepository::new(state.pool())
        .availability_matrix()
        .await?;
    Ok(Json(matrix))
}

/// Restaurant roster.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn restaurants(State(state): State<AppState>) -> Result<Json<Vec<Restaurant>>, AppError> {
    let restaurants = RestaurantRepository::new(state.pool()).list().await?;
    Ok(Json(restaurants))
}

fn dashboard_rows(orders: Vec<UnfinishedOrder>, matches: Vec<OrderMatch>) -> Vec<DashboardOrder> {
    let mut by_order: HashMap<OrderId, OrderMatch> =
        matches.into_iter().map(|m| (m.order_id, m)).collect();

    orders
        .into_iter()
        .map(|order| {
            let (restaurants, unresolvable) = by_order
                .remove(&order.id)
                .map_or((Vec::new(), false), |m| (m.candidates, m.unresolvable));
            DashboardOrder {
                order,
                restaurants,
                unresolvable,
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Utc;
    use rust_decimal::Decimal;
    use star_burger_core::PaymentMethod;

    use super::*;

    fn order(id: i32, cooking: Option<i32>) -> UnfinishedOrder {
        UnfinishedOrder {
            id: OrderId::new(id),
            status: OrderStatus::New,
            payment_method: PaymentMethod::Cash,
            firstname: "Иван".to_string(),
            lastname: String::new(),
            phonenumber: "+79291000000".to_string(),
            address: "Москва".to_string(),
            comment: String::new(),
            total_cost: Decimal::new(35_000, 2),
            registered_at: Utc::now(),
            cooking_restaurant_id: cooking.map(RestaurantId::new),
            product_ids: BTreeSet::new(),
        }
    }

    #[test]
    fn test_dashboard_rows_attach_matches() {
        let matches = vec![
            OrderMatch {
                order_id: OrderId::new(2),
                candidates: vec![],
                unresolvable: true,
            },
            OrderMatch {
                order_id: OrderId::new(1),
                candidates: vec![RankedRestaurant {
                    restaurant_id: RestaurantId::new(5),
                    name: "Star Burger Арбат".to_string(),
                    distance_km: 1.5,
                }],
                unresolvable: false,
            },
        ];

        let rows = dashboard_rows(vec![order(1, None), order(2, None), order(3, Some(5))], matches);

        assert_eq!(rows[0].restaurants.len(), 1);
        assert!(!rows[0].unresolvable);
        assert!(rows[1].unresolvable);
        assert!(rows[2].restaurants.is_empty());
        assert!(!rows[2].unresolvable);
    }

    #[test]
    fn test_dashboard_row_serializes_flat() {
        let rows = dashboard_rows(vec![order(1, None)], vec![]);
        let json = serde_json::to_value(&rows[0]).unwrap();

        assert_eq!(json["id"], 1);
        assert_eq!(json["status"], "NEW");
        assert_eq!(json["total_cost"], "350.00");
        assert!(json["restaurants"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_candidate_serialization() {
        let json = serde_json::to_value(RankedRestaurant {
            restaurant_id: RestaurantId::new(5),
            name: "Star Burger Арбат".to_string(),
            distance_km: 1.5,
        })
        .unwrap();

        assert_eq!(json["id"], 5);
        assert_eq!(json["distance_km"], 1.5);
    }
}
