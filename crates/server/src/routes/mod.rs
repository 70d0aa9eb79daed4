//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check (in main)
//! GET  /health/ready                    - Readiness check (in main)
//!
//! # Storefront API
//! GET  /api/banners                     - Promo banners
//! GET  /api/products                    - Products available at any restaurant
//! POST /api/order                       - Register an order
//!
//! # Staff dashboard
//! GET  /manager/orders                  - Unfinished orders with restaurant candidates
//! POST /manager/orders/{id}/restaurant  - Assign the cooking restaurant
//! GET  /manager/products                - Product × restaurant availability
//! GET  /manager/restaurants             - Restaurant roster
//! ```

use axum::Router;

use crate::state::AppState;

pub mod api;
pub mod manager;

/// Build the application router (health checks are added by the binary).
pub fn routes() -> Router<AppState> {
    Router::new().merge(api::router()).merge(manager::router())
}
