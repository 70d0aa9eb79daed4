//! Domain models for the server.
//!
//! Row types live next to their queries in `db`; these are the shapes the
//! rest of the crate works with.

pub mod location;
pub mod order;
pub mod product;
pub mod restaurant;

pub use location::CachedLocation;
pub use order::{NewOrder, NewOrderItem, OrderValidationError, UnfinishedOrder};
pub use product::{AvailabilityMatrix, AvailabilityRow, Category, Product};
pub use restaurant::Restaurant;
