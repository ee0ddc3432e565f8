//! The identified geographic point stored by every index.

use std::fmt;

use geo::Point;
use serde::{Deserialize, Serialize};

/// An identified geographic point.
///
/// Identity is the `id`: two points with the same id are the same logical
/// entity even when their coordinates differ, so re-adding an id to an index
/// models a move. Id uniqueness is enforced per index, not globally.
///
/// The serialized form is the transport representation consumed by
/// collaborators such as map front ends: three named fields `id`, `lat`,
/// `lon`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(id: impl Into<String>, lat: f64, lon: f64) -> Self {
        GeoPoint {
            id: id.into(),
            lat,
            lon,
        }
    }

    /// The coordinates as a `geo` point (x = longitude, y = latitude).
    pub fn location(&self) -> Point {
        Point::new(self.lon, self.lat)
    }

    /// Whether both coordinates are finite numbers.
    pub(crate) fn has_finite_coords(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    /// Inclusive containment in the rectangle spanned by `top_left`
    /// (larger latitude, smaller longitude) and `bottom_right`.
    pub(crate) fn within(&self, top_left: &GeoPoint, bottom_right: &GeoPoint) -> bool {
        self.lat <= top_left.lat
            && self.lat >= bottom_right.lat
            && self.lon >= top_left.lon
            && self.lon <= bottom_right.lon
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.6} {:.6}", self.id, self.lat, self.lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_is_inclusive() {
        let top_left = GeoPoint::new("tl", 51.52, -0.15);
        let bottom_right = GeoPoint::new("br", 51.50, -0.10);

        assert!(GeoPoint::new("corner", 51.52, -0.15).within(&top_left, &bottom_right));
        assert!(GeoPoint::new("inside", 51.51, -0.12).within(&top_left, &bottom_right));
        assert!(!GeoPoint::new("north", 51.53, -0.12).within(&top_left, &bottom_right));
        assert!(!GeoPoint::new("east", 51.51, -0.09).within(&top_left, &bottom_right));
    }

    #[test]
    fn location_maps_lon_to_x() {
        let p = GeoPoint::new("p", 51.5, -0.12);
        assert_eq!(p.location().x(), -0.12);
        assert_eq!(p.location().y(), 51.5);
    }
}
