//! Geographic coordinates and great-circle distance.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula, in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6373.0;

/// Errors that can occur when parsing [`Coordinates`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CoordinatesError {
    /// The input does not contain exactly two whitespace-separated numbers.
    #[error("expected \"<longitude> <latitude>\", got {0:?}")]
    Malformed(String),
    /// A component is not a number.
    #[error("invalid number {0:?}")]
    InvalidNumber(String),
    /// Longitude is outside [-180, 180].
    #[error("longitude {0} is out of range")]
    LongitudeOutOfRange(f64),
    /// Latitude is outside [-90, 90].
    #[error("latitude {0} is out of range")]
    LatitudeOutOfRange(f64),
}

/// A point on the Earth's surface in decimal degrees.
///
/// Longitude comes first, matching the order geocoding providers return
/// positions in (`"37.617698 55.755864"`).
///
/// ## Examples
///
/// ```
/// use star_burger_core::Coordinates;
///
/// let kremlin: Coordinates = "37.617698 55.755864".parse().unwrap();
/// assert!((kremlin.lon - 37.617698).abs() < f64::EPSILON);
/// assert!((kremlin.lat - 55.755864).abs() < f64::EPSILON);
///
/// assert!("37.6".parse::<Coordinates>().is_err());
/// assert!("200.0 10.0".parse::<Coordinates>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Longitude in degrees (-180 to 180).
    pub lon: f64,
    /// Latitude in degrees (-90 to 90).
    pub lat: f64,
}

impl Coordinates {
    /// Create coordinates after checking both components are in range.
    ///
    /// # Errors
    ///
    /// Returns an error if either component is not finite or out of range.
    pub fn new(lon: f64, lat: f64) -> Result<Self, CoordinatesError> {
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(CoordinatesError::LongitudeOutOfRange(lon));
        }
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(CoordinatesError::LatitudeOutOfRange(lat));
        }
        Ok(Self { lon, lat })
    }

    /// Great-circle distance to `other` in kilometers (haversine).
    #[must_use]
    pub fn distance_km(&self, other: &Self) -> f64 {
        let lon1 = self.lon.to_radians();
        let lat1 = self.lat.to_radians();
        let lon2 = other.lon.to_radians();
        let lat2 = other.lat.to_radians();

        let dlon = lon2 - lon1;
        let dlat = lat2 - lat1;

        let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

        2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
    }
}

/// Distance between two optional locations.
///
/// Returns `None` when either side has no known location, so an unresolved
/// address can never turn into a plausible-looking number.
#[must_use]
pub fn distance_between(a: Option<Coordinates>, b: Option<Coordinates>) -> Option<f64> {
    Some(a?.distance_km(&b?))
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.lon, self.lat)
    }
}

impl std::str::FromStr for Coordinates {
    type Err = CoordinatesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let (Some(lon), Some(lat), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(CoordinatesError::Malformed(s.to_owned()));
        };

        let lon = lon
            .parse::<f64>()
            .map_err(|_| CoordinatesError::InvalidNumber(lon.to_owned()))?;
        let lat = lat
            .parse::<f64>()
            .map_err(|_| CoordinatesError::InvalidNumber(lat.to_owned()))?;

        Self::new(lon, lat)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn point(lon: f64, lat: f64) -> Coordinates {
        Coordinates::new(lon, lat).unwrap()
    }

    #[test]
    fn test_parse_provider_position() {
        let coords: Coordinates = "37.617698 55.755864".parse().unwrap();
        assert!((coords.lon - 37.617_698).abs() < 1e-9);
        assert!((coords.lat - 55.755_864).abs() < 1e-9);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            "".parse::<Coordinates>(),
            Err(CoordinatesError::Malformed(_))
        ));
        assert!(matches!(
            "1 2 3".parse::<Coordinates>(),
            Err(CoordinatesError::Malformed(_))
        ));
        assert!(matches!(
            "east 55.7".parse::<Coordinates>(),
            Err(CoordinatesError::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_new_rejects_out_of_range() {
        assert!(matches!(
            Coordinates::new(181.0, 0.0),
            Err(CoordinatesError::LongitudeOutOfRange(_))
        ));
        assert!(matches!(
            Coordinates::new(0.0, -90.5),
            Err(CoordinatesError::LatitudeOutOfRange(_))
        ));
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let p = point(37.6, 55.7);
        assert!(p.distance_km(&p).abs() < 1e-9);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        // 2 * pi * 6373 / 360
        let d = point(0.0, 0.0).distance_km(&point(0.0, 1.0));
        assert!((d - 111.229).abs() < 0.01, "got {d}");
    }

    #[test]
    fn test_distance_is_symmetric_and_monotonic() {
        let origin = point(0.0, 0.0);
        let near = point(0.0, 1.0);
        let far = point(0.0, 2.0);

        let d_near = origin.distance_km(&near);
        let d_far = origin.distance_km(&far);

        assert!(d_near < d_far);
        assert!((d_near - near.distance_km(&origin)).abs() < 1e-9);
    }

    #[test]
    fn test_moscow_pair_is_about_sixty_km() {
        let d = point(37.0, 55.0).distance_km(&point(37.5, 55.5));
        assert!((60.0..70.0).contains(&d), "got {d}");
    }

    #[test]
    fn test_distance_between_requires_both_points() {
        let p = point(37.0, 55.0);
        assert!(distance_between(Some(p), None).is_none());
        assert!(distance_between(None, Some(p)).is_none());
        assert!(distance_between(None, None).is_none());
        assert!(distance_between(Some(p), Some(p)).is_some());
    }

    #[test]
    fn test_display_matches_provider_format() {
        let p = point(37.5, 55.25);
        assert_eq!(p.to_string(), "37.5 55.25");
        assert_eq!(p.to_string().parse::<Coordinates>().unwrap(), p);
    }
}
