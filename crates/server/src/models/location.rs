//! Geocode cache entries.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use star_burger_core::Coordinates;

/// A cached resolution of one normalized address.
///
/// `coordinates == None` records a failed resolution, not a missing one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedLocation {
    pub address: String,
    pub coordinates: Option<Coordinates>,
    pub resolved_at: DateTime<Utc>,
}

impl CachedLocation {
    /// Whether the entry may still be used at `now`.
    ///
    /// Entries stamped in the future (clock skew between hosts) count as fresh.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.signed_duration_since(self.resolved_at) < ttl
    }
}
