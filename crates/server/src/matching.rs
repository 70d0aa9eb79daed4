//! Order-to-restaurant matching.
//!
//! One matching pass takes every pending order and the restaurant roster,
//! resolves the distinct addresses that can affect the result through the
//! [`GeocodeCache`] in one batch, and ranks, per order, the restaurants whose
//! available products cover the whole order by distance.
//!
//! Failures are absorbed per order: an unknown address or an unsatisfiable
//! product set leaves that order with no candidates and `unresolvable` set.
//! Only store failures abort the pass.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use star_burger_core::{Coordinates, OrderId, ProductId, RestaurantId};
use tracing::instrument;

use crate::db::RepositoryError;
use crate::geo::{GeocodeCache, Geocoder, LocationStore, normalize_address};

/// An order as the matcher sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOrder {
    pub order_id: OrderId,
    pub address: String,
    pub products: BTreeSet<ProductId>,
}

/// A restaurant and the products it can cook right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestaurantOffer {
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub address: String,
    pub available_products: BTreeSet<ProductId>,
}

impl RestaurantOffer {
    /// Whether this restaurant can cook every product in `products`.
    #[must_use]
    pub fn can_fulfill(&self, products: &BTreeSet<ProductId>) -> bool {
        products.is_subset(&self.available_products)
    }
}

/// A candidate restaurant for one order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRestaurant {
    #[serde(rename = "id")]
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub distance_km: f64,
}

/// Matching result for one order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderMatch {
    pub order_id: OrderId,
    /// Nearest first.
    pub candidates: Vec<RankedRestaurant>,
    /// No candidate could be produced, either because the address is unknown
    /// or because no restaurant offers every product.
    pub unresolvable: bool,
}

impl OrderMatch {
    fn unresolvable(order_id: OrderId) -> Self {
        Self {
            order_id,
            candidates: Vec::new(),
            unresolvable: true,
        }
    }
}

/// Ranks restaurants for pending orders.
pub struct MatchingEngine<'a, S, G> {
    cache: &'a GeocodeCache<S, G>,
}

impl<'a, S, G> MatchingEngine<'a, S, G>
where
    S: LocationStore,
    G: Geocoder,
{
    #[must_use]
    pub const fn new(cache: &'a GeocodeCache<S, G>) -> Self {
        Self { cache }
    }

    /// Run one matching pass.
    ///
    /// Returns one [`OrderMatch`] per order, in input order. Ties in distance
    /// keep roster order.
    ///
    /// # Errors
    ///
    /// Returns an error if the location store fails.
    #[instrument(skip_all, fields(orders = orders.len(), restaurants = restaurants.len()))]
    pub async fn match_orders(
        &self,
        orders: &[PendingOrder],
        restaurants: &[RestaurantOffer],
    ) -> Result<Vec<OrderMatch>, RepositoryError> {
        let locations = self
            .cache
            .resolve_many(relevant_addresses(orders, restaurants))
            .await?;

        Ok(orders
            .iter()
            .map(|order| rank_order(order, restaurants, &locations))
            .collect())
    }
}

/// Addresses whose coordinates can influence a pass.
///
/// Every non-blank order address, plus the address of every restaurant that
/// can fulfill at least one order with a non-blank address.
fn relevant_addresses<'a>(
    orders: &'a [PendingOrder],
    restaurants: &'a [RestaurantOffer],
) -> impl Iterator<Item = &'a str> {
    let routable: Vec<&PendingOrder> = orders
        .iter()
        .filter(|order| !order.address.trim().is_empty())
        .collect();

    let restaurant_addresses: Vec<&'a str> = restaurants
        .iter()
        .filter(|restaurant| {
            routable
                .iter()
                .any(|order| restaurant.can_fulfill(&order.products))
        })
        .map(|restaurant| restaurant.address.as_str())
        .collect();

    routable
        .into_iter()
        .map(|order| order.address.as_str())
        .chain(restaurant_addresses)
}

fn lookup(locations: &HashMap<String, Option<Coordinates>>, address: &str) -> Option<Coordinates> {
    normalize_address(address).and_then(|key| locations.get(&key).copied().flatten())
}

fn rank_order(
    order: &PendingOrder,
    restaurants: &[RestaurantOffer],
    locations: &HashMap<String, Option<Coordinates>>,
) -> OrderMatch {
    if order.address.trim().is_empty() {
        tracing::debug!(order_id = %order.order_id, "Order has no delivery address");
        return OrderMatch::unresolvable(order.order_id);
    }

    let Some(origin) = lookup(locations, &order.address) else {
        tracing::debug!(order_id = %order.order_id, address = %order.address, "Order address could not be geocoded");
        return OrderMatch::unresolvable(order.order_id);
    };

    let mut candidates: Vec<RankedRestaurant> = restaurants
        .iter()
        .filter(|restaurant| restaurant.can_fulfill(&order.products))
        .filter_map(|restaurant| {
            let Some(location) = lookup(locations, &restaurant.address) else {
                tracing::debug!(
                    restaurant_id = %restaurant.restaurant_id,
                    address = %restaurant.address,
                    "Skipping restaurant with unknown location"
                );
                return None;
            };
            Some(RankedRestaurant {
                restaurant_id: restaurant.restaurant_id,
                name: restaurant.name.clone(),
                distance_km: origin.distance_km(&location),
            })
        })
        .collect();

    candidates.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));

    if candidates.is_empty() {
        tracing::debug!(order_id = %order.order_id, "No restaurant can fulfill order");
        return OrderMatch::unresolvable(order.order_id);
    }

    OrderMatch {
        order_id: order.order_id,
        candidates,
        unresolvable: false,
    }
}
